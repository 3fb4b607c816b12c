//! Common error types for the protocol engine.

/// Errors reported by the codec, packet builders, engine, and transport layers.
///
/// The enum is `Copy` and carries no allocation so it is suitable for `no_std`
/// environments. Transport backends map their native status codes into
/// [`Error::TransportFailure`] without interpretation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A transport operation did not complete within its time bound.
    Timeout,
    /// The transport backend reported a failure status code, propagated as-is.
    TransportFailure(i16),
    /// A remaining-length field exceeded the 4-byte encoding limit.
    Overflow,
    /// An inbound frame is shorter than, or inconsistent with, its advertised length.
    Truncated,
    /// Caller-supplied parameters violate the packet invariants.
    InvalidParameters,
    /// An encoded frame would exceed the fixed frame capacity.
    BufferOverflow,
    /// The outbound frame queue is full.
    QueueFull,
    /// No active link is available for the operation.
    NotConnected,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::TransportFailure(code) => defmt::write!(f, "TransportFailure({})", code),
            Error::Overflow => defmt::write!(f, "Overflow"),
            Error::Truncated => defmt::write!(f, "Truncated"),
            Error::InvalidParameters => defmt::write!(f, "InvalidParameters"),
            Error::BufferOverflow => defmt::write!(f, "BufferOverflow"),
            Error::QueueFull => defmt::write!(f, "QueueFull"),
            Error::NotConnected => defmt::write!(f, "NotConnected"),
        }
    }
}
