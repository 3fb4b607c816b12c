//! Inbound packet parsers.
//!
//! A received frame is decoded into [`Packet`], a tagged enum the engine
//! matches on. PUBLISH is recognized by masking the fixed-header byte with
//! `0xF0` since its low nibble carries flags; every other type must match
//! its full header byte, including the reserved nibbles (PUBREL is exactly
//! `0x62`). Unknown type bytes decode to `None` and are ignored upstream.

use super::{
    CONNACK, MAX_FRAME_SIZE, MAX_TOPIC_LEN, PINGRESP, PUBACK, PUBCOMP, PUBLISH, PUBREC, PUBREL,
    QoS, SUBACK, UNSUBACK,
};
use crate::codec::cursor::Reader;
use crate::codec::decode_remaining_length;
use crate::error::Error;
use heapless::{String, Vec};

/// A decoded inbound PUBLISH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPacket {
    /// Topic the message was published on.
    pub topic: String<MAX_TOPIC_LEN>,
    /// Raw message payload.
    pub payload: Vec<u8, MAX_FRAME_SIZE>,
    /// Delivery guarantee the sender requested.
    pub qos: QoS,
    /// Redelivery flag; only meaningful when `qos` is above at-most-once.
    pub dup: bool,
    /// Broker retain flag.
    pub retain: bool,
    /// Packet identifier, present whenever `qos` is above at-most-once.
    pub id: Option<u16>,
}

/// A decoded inbound control packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Connection acknowledgment with the broker's status byte.
    Connack {
        /// 0 on acceptance, a refusal code otherwise.
        status: u8,
    },
    /// Application message from the broker.
    Publish(PublishPacket),
    /// QoS 1 acknowledgment of a publish this engine sent.
    Puback {
        /// Identifier of the acknowledged publish.
        id: u16,
    },
    /// First QoS 2 acknowledgment of a publish this engine sent.
    Pubrec {
        /// Identifier of the acknowledged publish.
        id: u16,
    },
    /// QoS 2 release from the peer for a publish this engine received.
    Pubrel {
        /// Identifier being released.
        id: u16,
    },
    /// QoS 2 completion for a publish this engine sent.
    Pubcomp {
        /// Identifier of the completed exchange.
        id: u16,
    },
    /// Subscription acknowledgment.
    Suback {
        /// Granted QoS or failure code.
        status: u8,
        /// Identifier of the subscribe request.
        id: u16,
    },
    /// Unsubscription acknowledgment.
    Unsuback {
        /// Identifier of the unsubscribe request.
        id: u16,
    },
    /// Keep-alive response.
    Pingresp,
}

impl Packet {
    /// Decode one complete inbound frame.
    ///
    /// Returns `Ok(None)` for type bytes this engine does not handle.
    /// Frames shorter than, or inconsistent with, their advertised length
    /// yield [`Error::Truncated`] so the receive loop can observe the drop.
    pub fn parse(frame: &[u8]) -> Result<Option<Packet>, Error> {
        let first = *frame.first().ok_or(Error::Truncated)?;
        if first & 0xF0 == PUBLISH {
            return parse_publish(frame).map(|p| Some(Packet::Publish(p)));
        }
        let packet = match first {
            CONNACK => Packet::Connack {
                status: ack_status(frame)?,
            },
            PUBACK => Packet::Puback { id: ack_id(frame)? },
            PUBREC => Packet::Pubrec { id: ack_id(frame)? },
            PUBREL => Packet::Pubrel { id: ack_id(frame)? },
            PUBCOMP => Packet::Pubcomp { id: ack_id(frame)? },
            SUBACK => {
                let (status, id) = suback_fields(frame)?;
                Packet::Suback { status, id }
            }
            UNSUBACK => {
                expect_remaining(frame, 3, 4)?;
                Packet::Unsuback {
                    id: u16::from_be_bytes([frame[2], frame[3]]),
                }
            }
            PINGRESP => Packet::Pingresp,
            _ => return Ok(None),
        };
        Ok(Some(packet))
    }
}

fn expect_remaining(frame: &[u8], expected: u32, min_len: usize) -> Result<(), Error> {
    if frame.len() < min_len {
        return Err(Error::Truncated);
    }
    let (value, _) = decode_remaining_length(&frame[1..])?;
    if value != expected {
        return Err(Error::Truncated);
    }
    Ok(())
}

fn ack_id(frame: &[u8]) -> Result<u16, Error> {
    expect_remaining(frame, 2, 4)?;
    Ok(u16::from_be_bytes([frame[2], frame[3]]))
}

fn ack_status(frame: &[u8]) -> Result<u8, Error> {
    expect_remaining(frame, 2, 4)?;
    Ok(frame[3])
}

fn suback_fields(frame: &[u8]) -> Result<(u8, u16), Error> {
    expect_remaining(frame, 3, 5)?;
    Ok((frame[4], u16::from_be_bytes([frame[2], frame[3]])))
}

fn parse_publish(frame: &[u8]) -> Result<PublishPacket, Error> {
    let first = frame[0];
    let dup = (first >> 3) & 0x01 == 1;
    let qos = QoS::from_bits((first >> 1) & 0x03).map_err(|_| Error::Truncated)?;
    let retain = first & 0x01 == 1;

    let (remaining, consumed) = decode_remaining_length(&frame[1..])?;
    let body_start = 1 + consumed;
    let body_end = body_start + remaining as usize;
    if frame.len() < body_end {
        return Err(Error::Truncated);
    }

    let mut r = Reader::new(&frame[body_start..body_end]);
    let topic_len = r.read_u16()? as usize;
    let topic_bytes = r.read_bytes(topic_len)?;
    let topic_str = core::str::from_utf8(topic_bytes).map_err(|_| Error::InvalidParameters)?;
    let topic = String::try_from(topic_str).map_err(|_| Error::BufferOverflow)?;

    let id = if qos != QoS::AtMostOnce {
        Some(r.read_u16()?)
    } else {
        None
    };
    let payload = Vec::from_slice(r.rest()).map_err(|_| Error::BufferOverflow)?;

    Ok(PublishPacket {
        topic,
        payload,
        qos,
        dup,
        retain,
        id,
    })
}
