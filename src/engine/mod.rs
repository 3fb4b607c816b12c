//! The protocol engine: driver registry, outbound queue and inbound dispatch.
//!
//! [`Engine`] owns the packet-identifier generator, the attached [`Driver`]
//! and a [`FrameSink`] for outbound frames. Application calls (connect,
//! publish, subscribe, ...) encode a frame and push it to the sink; inbound
//! frames go through [`Engine::dispatch`], which decodes them, completes the
//! QoS handshakes by pushing acknowledgment frames back into the same sink,
//! and notifies the driver.
//!
//! The engine is transport-agnostic and `no_std`; the `std` runtime in
//! [`crate::runtime`] wires it to worker threads and real transports.

use crate::error::Error;
use crate::packet::parse::Packet;
use crate::packet::{build, ConnectParams, Frame, PacketId, QoS};
use heapless::Deque;

/// Capacity of the outbound frame queue.
pub const QUEUE_DEPTH: usize = 6;

/// Application view of protocol events.
///
/// Every method has a no-op default body, so an implementation overrides
/// exactly the events it cares about and the remaining slots stay inert.
/// Detaching the driver makes all nine slots no-ops again.
pub trait Driver {
    /// Connection acknowledged with the broker's status byte.
    fn connack(&mut self, _status: u8) {}
    /// Application message arrived.
    fn publish(&mut self, _topic: &str, _payload: &[u8]) {}
    /// QoS 1 publish acknowledged.
    fn puback(&mut self, _id: u16) {}
    /// QoS 2 publish acknowledged by the peer (first leg).
    ///
    /// The engine does not answer with an automatic PUBREL; completing the
    /// publisher-side handshake is left to the application via
    /// [`Engine::pubrel`].
    fn pubrec(&mut self, _id: u16) {}
    /// Peer released an inbound QoS 2 exchange. The matching PUBCOMP has
    /// already been queued when this fires.
    fn pubrel(&mut self, _id: u16) {}
    /// QoS 2 exchange completed.
    fn pubcomp(&mut self, _id: u16) {}
    /// Subscription acknowledged.
    fn suback(&mut self, _status: u8, _id: u16) {}
    /// Unsubscription acknowledged.
    fn unsuback(&mut self, _id: u16) {}
    /// Keep-alive response arrived.
    fn pingresp(&mut self) {}
}

/// Destination for outbound frames.
///
/// Implemented by the in-memory [`FrameQueue`] and, under the `std`
/// feature, by the bounded channel feeding the sender worker.
pub trait FrameSink {
    /// Enqueue one frame, failing with [`Error::QueueFull`] when the
    /// bounded queue cannot take it.
    fn push(&mut self, frame: Frame) -> Result<(), Error>;
}

/// Bounded in-memory outbound queue holding up to [`QUEUE_DEPTH`] frames.
///
/// Single-threaded counterpart of the runtime's channel, used directly in
/// polling applications and tests.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: Deque<Frame, QUEUE_DEPTH>,
}

impl FrameQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self {
            frames: Deque::new(),
        }
    }

    /// Pop the oldest frame, if any.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSink for FrameQueue {
    fn push(&mut self, frame: Frame) -> Result<(), Error> {
        self.frames.push_back(frame).map_err(|_| Error::QueueFull)
    }
}

/// The protocol engine.
///
/// Generic over the attached driver `D` and the outbound sink `S` so
/// independent instances can run side by side, each with its own state.
#[derive(Debug)]
pub struct Engine<D: Driver, S: FrameSink> {
    driver: Option<D>,
    ids: PacketId,
    outbound: S,
}

impl<D: Driver, S: FrameSink> Engine<D, S> {
    /// An engine with no driver attached; every event slot is a no-op
    /// until [`Engine::attach`] is called.
    pub fn new(outbound: S) -> Self {
        Self {
            driver: None,
            ids: PacketId::new(),
            outbound,
        }
    }

    /// Attach a driver. Event slots the driver does not override keep
    /// their no-op defaults; a previously attached driver is replaced.
    pub fn attach(&mut self, driver: D) {
        self.driver = Some(driver);
    }

    /// Detach the current driver, returning every event slot to a no-op.
    pub fn detach(&mut self) {
        self.driver = None;
    }

    /// Mutable access to the outbound sink, for the consumer draining it.
    pub fn outbound_mut(&mut self) -> &mut S {
        &mut self.outbound
    }

    /// Queue a CONNECT packet.
    pub fn connect(&mut self, params: &ConnectParams<'_>) -> Result<(), Error> {
        self.outbound.push(build::connect(params)?)
    }

    /// Queue a PUBLISH packet, returning the identifier used when
    /// `qos` is above at-most-once.
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        dup: bool,
        qos: QoS,
        retain: bool,
    ) -> Result<Option<u16>, Error> {
        let (frame, id) = build::publish(topic, payload, dup, qos, retain, &mut self.ids)?;
        self.outbound.push(frame)?;
        Ok(id)
    }

    /// Queue a SUBSCRIBE packet, returning the identifier used.
    pub fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<u16, Error> {
        let (frame, id) = build::subscribe(topic, qos, &mut self.ids)?;
        self.outbound.push(frame)?;
        Ok(id)
    }

    /// Queue an UNSUBSCRIBE packet, returning the identifier used.
    pub fn unsubscribe(&mut self, topic: &str) -> Result<u16, Error> {
        let (frame, id) = build::unsubscribe(topic, &mut self.ids)?;
        self.outbound.push(frame)?;
        Ok(id)
    }

    /// Queue a PUBREL packet.
    ///
    /// The engine never sends this automatically in response to PUBREC;
    /// the application completes the outbound QoS 2 handshake explicitly.
    pub fn pubrel(&mut self, id: u16) -> Result<(), Error> {
        self.outbound.push(build::pubrel(id)?)
    }

    /// Queue a PINGREQ packet.
    pub fn pingreq(&mut self) -> Result<(), Error> {
        self.outbound.push(build::pingreq()?)
    }

    /// Queue a DISCONNECT packet.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        self.outbound.push(build::disconnect()?)
    }

    /// Decode one inbound frame, run its handshake step and notify the
    /// driver.
    ///
    /// Acknowledgments loop back through the outbound sink. Unknown packet
    /// types are ignored; malformed frames surface as errors for the caller
    /// to record, without disturbing engine state.
    pub fn dispatch(&mut self, frame: &[u8]) -> Result<(), Error> {
        let Some(packet) = Packet::parse(frame)? else {
            return Ok(());
        };
        match packet {
            Packet::Connack { status } => self.notify(|d| d.connack(status)),
            Packet::Publish(p) => {
                self.notify(|d| d.publish(p.topic.as_str(), &p.payload));
                match (p.qos, p.id) {
                    (QoS::AtLeastOnce, Some(id)) => self.outbound.push(build::puback(id)?)?,
                    (QoS::ExactlyOnce, Some(id)) => self.outbound.push(build::pubrec(id)?)?,
                    _ => {}
                }
            }
            Packet::Puback { id } => self.notify(|d| d.puback(id)),
            // no automatic PUBREL here; see Driver::pubrec
            Packet::Pubrec { id } => self.notify(|d| d.pubrec(id)),
            Packet::Pubrel { id } => {
                // acknowledgment goes out before the application hears of it
                self.outbound.push(build::pubcomp(id)?)?;
                self.notify(|d| d.pubrel(id));
            }
            Packet::Pubcomp { id } => self.notify(|d| d.pubcomp(id)),
            Packet::Suback { status, id } => self.notify(|d| d.suback(status, id)),
            Packet::Unsuback { id } => self.notify(|d| d.unsuback(id)),
            Packet::Pingresp => self.notify(|d| d.pingresp()),
        }
        Ok(())
    }

    fn notify(&mut self, event: impl FnOnce(&mut D)) {
        if let Some(driver) = self.driver.as_mut() {
            event(driver);
        }
    }
}
