//! Outbound packet builders.
//!
//! Every builder validates its inputs, encodes the full packet into a fresh
//! [`Frame`] and fails with [`Error::BufferOverflow`] when the result would
//! not fit the fixed frame capacity. Builders never touch the transport; the
//! caller decides where the frame goes.

use super::{
    ConnectParams, Frame, PacketId, QoS, CONNECT, DISCONNECT, PINGREQ, PROTOCOL_LEVEL,
    PROTOCOL_NAME, PUBACK, PUBCOMP, PUBLISH, PUBREC, PUBREL, SUBSCRIBE, UNSUBSCRIBE,
};
use crate::codec::cursor::Writer;
use crate::codec::encode_remaining_length;
use crate::error::Error;

/// Build a CONNECT packet.
pub fn connect(params: &ConnectParams<'_>) -> Result<Frame, Error> {
    params.validate()?;

    let payload_len = params.payload_len();
    let encoded = encode_remaining_length(payload_len as u32)?;

    let mut frame = Frame::new();
    let mut w = Writer::new(&mut frame.data);
    w.put_u8(CONNECT)?;
    w.put_slice(encoded.as_slice())?;
    w.put_slice(PROTOCOL_NAME)?;
    w.put_u8(PROTOCOL_LEVEL)?;
    w.put_u8(params.flags())?;
    w.put_u16(params.keep_alive_seconds)?;
    w.put_str(params.client_id.unwrap_or(""))?;
    if let Some(will) = &params.will {
        w.put_str(will.topic)?;
        w.put_str(will.message)?;
    }
    if let Some(username) = params.username {
        w.put_str(username)?;
    }
    if let Some(password) = params.password {
        w.put_str(password)?;
    }
    Ok(frame)
}

/// Build a PUBLISH packet.
///
/// A packet identifier is drawn from `ids` only when `qos` is above
/// [`QoS::AtMostOnce`]; the identifier used, if any, is returned alongside
/// the frame. The payload is written raw, its length implied by the
/// remaining-length field.
pub fn publish(
    topic: &str,
    payload: &[u8],
    dup: bool,
    qos: QoS,
    retain: bool,
    ids: &mut PacketId,
) -> Result<(Frame, Option<u16>), Error> {
    if topic.is_empty() {
        return Err(Error::InvalidParameters);
    }
    // dup is only meaningful on a redelivery, which needs qos > 0
    if dup && qos == QoS::AtMostOnce {
        return Err(Error::InvalidParameters);
    }

    let id = (qos != QoS::AtMostOnce).then(|| ids.next_id());
    let remaining = 2 + topic.len() + if id.is_some() { 2 } else { 0 } + payload.len();
    let encoded = encode_remaining_length(remaining as u32)?;

    let mut frame = Frame::new();
    let mut w = Writer::new(&mut frame.data);
    w.put_u8(PUBLISH | (dup as u8) << 3 | (qos as u8) << 1 | retain as u8)?;
    w.put_slice(encoded.as_slice())?;
    w.put_str(topic)?;
    if let Some(id) = id {
        w.put_u16(id)?;
    }
    w.put_slice(payload)?;
    Ok((frame, id))
}

/// Build a SUBSCRIBE packet for a single topic filter, returning the
/// packet identifier used.
pub fn subscribe(topic: &str, qos: QoS, ids: &mut PacketId) -> Result<(Frame, u16), Error> {
    filtered(SUBSCRIBE, topic, Some(qos), ids)
}

/// Build an UNSUBSCRIBE packet for a single topic filter, returning the
/// packet identifier used.
pub fn unsubscribe(topic: &str, ids: &mut PacketId) -> Result<(Frame, u16), Error> {
    filtered(UNSUBSCRIBE, topic, None, ids)
}

fn filtered(
    kind: u8,
    topic: &str,
    qos: Option<QoS>,
    ids: &mut PacketId,
) -> Result<(Frame, u16), Error> {
    if topic.is_empty() {
        return Err(Error::InvalidParameters);
    }

    let id = ids.next_id();
    let remaining = 2 + 2 + topic.len() + if qos.is_some() { 1 } else { 0 };
    let encoded = encode_remaining_length(remaining as u32)?;

    let mut frame = Frame::new();
    let mut w = Writer::new(&mut frame.data);
    w.put_u8(kind)?;
    w.put_slice(encoded.as_slice())?;
    w.put_u16(id)?;
    w.put_str(topic)?;
    if let Some(qos) = qos {
        w.put_u8(qos as u8)?;
    }
    Ok((frame, id))
}

/// Build a PUBACK packet acknowledging an inbound QoS 1 publish.
pub fn puback(id: u16) -> Result<Frame, Error> {
    ack(PUBACK, id)
}

/// Build a PUBREC packet, first acknowledgment of an inbound QoS 2 publish.
pub fn pubrec(id: u16) -> Result<Frame, Error> {
    ack(PUBREC, id)
}

/// Build a PUBREL packet releasing an outbound QoS 2 publish.
pub fn pubrel(id: u16) -> Result<Frame, Error> {
    ack(PUBREL, id)
}

/// Build a PUBCOMP packet completing an inbound QoS 2 exchange.
pub fn pubcomp(id: u16) -> Result<Frame, Error> {
    ack(PUBCOMP, id)
}

fn ack(kind: u8, id: u16) -> Result<Frame, Error> {
    let mut frame = Frame::new();
    let mut w = Writer::new(&mut frame.data);
    w.put_u8(kind)?;
    w.put_u8(0x02)?;
    w.put_u16(id)?;
    Ok(frame)
}

/// Build a PINGREQ packet.
pub fn pingreq() -> Result<Frame, Error> {
    empty(PINGREQ)
}

/// Build a DISCONNECT packet.
pub fn disconnect() -> Result<Frame, Error> {
    empty(DISCONNECT)
}

fn empty(kind: u8) -> Result<Frame, Error> {
    let mut frame = Frame::new();
    let mut w = Writer::new(&mut frame.data);
    w.put_u8(kind)?;
    w.put_u8(0x00)?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_frames_are_four_bytes() {
        assert_eq!(puback(7).unwrap().as_bytes(), &[0x40, 0x02, 0x00, 0x07]);
        assert_eq!(pubrec(9).unwrap().as_bytes(), &[0x50, 0x02, 0x00, 0x09]);
        assert_eq!(pubrel(9).unwrap().as_bytes(), &[0x62, 0x02, 0x00, 0x09]);
        assert_eq!(
            pubcomp(0x1234).unwrap().as_bytes(),
            &[0x70, 0x02, 0x12, 0x34]
        );
    }

    #[test]
    fn control_frames_have_no_payload() {
        assert_eq!(pingreq().unwrap().as_bytes(), &[0xc0, 0x00]);
        assert_eq!(disconnect().unwrap().as_bytes(), &[0xe0, 0x00]);
    }

    #[test]
    fn unsubscribe_uses_its_own_type_byte() {
        let mut ids = PacketId::new();
        let (frame, id) = unsubscribe("a/b", &mut ids).unwrap();
        assert_eq!(id, 0);
        assert_eq!(
            frame.as_bytes(),
            &[0xa2, 0x07, 0x00, 0x00, 0x00, 0x03, b'a', b'/', b'b']
        );
    }

    #[test]
    fn publish_rejects_dup_without_qos() {
        let mut ids = PacketId::new();
        let err = publish("t", b"x", true, QoS::AtMostOnce, false, &mut ids);
        assert_eq!(err.unwrap_err(), Error::InvalidParameters);
    }

    #[test]
    fn oversized_publish_is_reported_not_fatal() {
        let mut ids = PacketId::new();
        let payload = [0u8; 140];
        let err = publish("t", &payload, false, QoS::AtMostOnce, false, &mut ids);
        assert_eq!(err.unwrap_err(), Error::BufferOverflow);
    }
}
