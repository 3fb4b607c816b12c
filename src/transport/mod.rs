//! The transport contract the engine drives its frames over.
//!
//! Two modem-backed transports exist on the target device, one WiFi and one
//! cellular, but only one is active at a time. The engine does not manage
//! their connections; it assumes an established link and selects between
//! them per operation through a [`ModeSource`]. Switching mode while a
//! frame is in flight is undefined and must be avoided by callers.

use crate::error::Error;
use core::sync::atomic::{AtomicU8, Ordering};
use core::time::Duration;

/// Sentinel link identifier meaning "no link established".
pub const NO_LINK: u8 = 0xff;

/// The two-valued network mode condition selecting the active transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetMode {
    /// WiFi modem backend.
    Wifi,
    /// Cellular modem backend.
    Cellular,
}

/// Supplies the current [`NetMode`], read by the sender and receiver on
/// every operation.
pub trait ModeSource {
    /// The mode in effect right now.
    fn net_mode(&self) -> NetMode;
}

/// A fixed mode; convenient for devices with a single backend and for tests.
impl ModeSource for NetMode {
    fn net_mode(&self) -> NetMode {
        *self
    }
}

/// Byte-level contract a transport backend must satisfy.
///
/// The protocol is always TCP. `prepare_send` and `write` form the
/// two-phase send the modem command interfaces require; each call is
/// bounded by a backend-specific timeout and reports [`Error::Timeout`]
/// or a backend status code via [`Error::TransportFailure`].
pub trait Transport {
    /// Open a TCP connection to `host:port` on the given link.
    fn connect(&mut self, link_id: u8, host: &str, port: u16) -> Result<(), Error>;
    /// Announce an imminent write of `len` bytes on the given link.
    fn prepare_send(&mut self, link_id: u8, len: usize) -> Result<(), Error>;
    /// Transmit the prepared bytes.
    fn write(&mut self, data: &[u8]) -> Result<(), Error>;
    /// Block up to `timeout` for one complete inbound frame, returning the
    /// link it arrived on and its length in `buf`.
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(u8, usize), Error>;
}

/// Tracks the link identifier assigned by the active transport's
/// asynchronous link-lifecycle notifications.
#[derive(Debug)]
pub struct LinkState {
    id: AtomicU8,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkState {
    /// State with no link established.
    pub const fn new() -> Self {
        Self {
            id: AtomicU8::new(NO_LINK),
        }
    }

    /// Record that a link came up.
    pub fn notify_link_up(&self, id: u8) {
        self.id.store(id, Ordering::Relaxed);
    }

    /// Record that the link went down.
    pub fn notify_link_down(&self) {
        self.id.store(NO_LINK, Ordering::Relaxed);
    }

    /// The active link identifier, if one is established.
    pub fn active(&self) -> Option<u8> {
        match self.id.load(Ordering::Relaxed) {
            NO_LINK => None,
            id => Some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_state_tracks_notifications() {
        let link = LinkState::new();
        assert_eq!(link.active(), None);
        link.notify_link_up(3);
        assert_eq!(link.active(), Some(3));
        link.notify_link_down();
        assert_eq!(link.active(), None);
    }

    #[test]
    fn a_fixed_mode_is_its_own_source() {
        assert_eq!(NetMode::Wifi.net_mode(), NetMode::Wifi);
        assert_eq!(NetMode::Cellular.net_mode(), NetMode::Cellular);
    }
}
