//! Control packet model: frame buffer, packet types, builders and parsers.
//!
//! Outbound packets are produced by the functions in [`build`] as complete,
//! ready-to-transmit [`Frame`]s. Inbound frames are decoded by
//! [`parse::Packet::parse`] into a tagged enum that the engine dispatches on.

pub mod build;
pub mod parse;

use crate::error::Error;
use heapless::Vec;

/// Fixed capacity of an encoded frame, header included.
pub const MAX_FRAME_SIZE: usize = 128;
/// Longest topic the engine will accept on an inbound PUBLISH.
pub const MAX_TOPIC_LEN: usize = 64;

// Fixed-header type bytes. PUBREL, SUBSCRIBE and UNSUBSCRIBE carry their
// reserved flag nibble in the constant.
pub(crate) const CONNECT: u8 = 0x10;
pub(crate) const CONNACK: u8 = 0x20;
pub(crate) const PUBLISH: u8 = 0x30;
pub(crate) const PUBACK: u8 = 0x40;
pub(crate) const PUBREC: u8 = 0x50;
pub(crate) const PUBREL: u8 = 0x62;
pub(crate) const PUBCOMP: u8 = 0x70;
pub(crate) const SUBSCRIBE: u8 = 0x82;
pub(crate) const SUBACK: u8 = 0x90;
pub(crate) const UNSUBSCRIBE: u8 = 0xa2;
pub(crate) const UNSUBACK: u8 = 0xb0;
pub(crate) const PINGREQ: u8 = 0xc0;
pub(crate) const PINGRESP: u8 = 0xd0;
pub(crate) const DISCONNECT: u8 = 0xe0;

// "MQTT" protocol name block and protocol level, MQTT 3.1.1.
pub(crate) const PROTOCOL_NAME: &[u8] = &[0x00, 0x04, b'M', b'Q', b'T', b'T'];
pub(crate) const PROTOCOL_LEVEL: u8 = 0x04;

/// A complete encoded control packet, the unit of work moved through the
/// outbound queue.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub(crate) data: Vec<u8, MAX_FRAME_SIZE>,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Quality of Service levels for MQTT messages.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// At most once delivery.
    AtMostOnce = 0,
    /// At least once delivery, acknowledged with PUBACK.
    AtLeastOnce = 1,
    /// Exactly once delivery, completed with PUBREC/PUBREL/PUBCOMP.
    ExactlyOnce = 2,
}

impl QoS {
    pub(crate) fn from_bits(bits: u8) -> Result<Self, Error> {
        match bits {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(Error::InvalidParameters),
        }
    }
}

/// Last-will registration carried in a CONNECT packet.
#[derive(Debug, Clone)]
pub struct Will<'a> {
    /// Topic the broker publishes the will message on.
    pub topic: &'a str,
    /// The will message body.
    pub message: &'a str,
    /// Delivery guarantee for the will message.
    pub qos: QoS,
    /// Whether the broker retains the will message.
    pub retain: bool,
}

/// Parameters for the CONNECT packet.
///
/// The connect-flags byte is derived from the optional fields; callers never
/// supply it directly, so a flag can not be set without its payload block.
#[derive(Debug, Clone, Default)]
pub struct ConnectParams<'a> {
    /// Client identifier. When absent, `clean_session` must be set and an
    /// empty identifier is sent for the broker to assign one.
    pub client_id: Option<&'a str>,
    /// Discard any previous session state on the broker.
    pub clean_session: bool,
    /// Keep-alive interval in seconds; 0 disables keep-alive.
    pub keep_alive_seconds: u16,
    /// Optional last-will registration.
    pub will: Option<Will<'a>>,
    /// Optional username.
    pub username: Option<&'a str>,
    /// Optional password.
    pub password: Option<&'a str>,
}

impl ConnectParams<'_> {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.client_id.is_none() && !self.clean_session {
            return Err(Error::InvalidParameters);
        }
        Ok(())
    }

    pub(crate) fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.clean_session {
            flags |= 0x02;
        }
        if let Some(will) = &self.will {
            flags |= 0x04;
            flags |= (will.qos as u8) << 3;
            if will.retain {
                flags |= 0x20;
            }
        }
        if self.password.is_some() {
            flags |= 0x40;
        }
        if self.username.is_some() {
            flags |= 0x80;
        }
        flags
    }

    /// Byte count of the variable header plus payload. The 2-byte length of
    /// the client identifier field is counted even when the identifier is
    /// absent, since an empty identifier is still written.
    pub(crate) fn payload_len(&self) -> usize {
        let mut len = PROTOCOL_NAME.len() + 4; // level, flags, keep-alive
        len += 2 + self.client_id.map_or(0, str::len);
        if let Some(will) = &self.will {
            len += 2 + will.topic.len();
            len += 2 + will.message.len();
        }
        if let Some(username) = self.username {
            len += 2 + username.len();
        }
        if let Some(password) = self.password {
            len += 2 + password.len();
        }
        len
    }
}

/// Monotonic 16-bit packet identifier generator.
///
/// One counter is shared across publish, subscribe and unsubscribe
/// operations. It wraps modulo 65536 and does not track which identifiers
/// are still in flight, so an identifier can be reused while an earlier
/// handshake is unresolved.
#[derive(Debug, Default)]
pub struct PacketId {
    counter: u16,
}

impl PacketId {
    /// A generator starting at 0.
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// Return the current identifier and advance the counter.
    pub fn next_id(&mut self) -> u16 {
        let id = self.counter;
        self.counter = self.counter.wrapping_add(1);
        id
    }
}
