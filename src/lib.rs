#![no_std]

use defmt::Format;

pub mod discover;
pub mod engine;
pub mod logger;
pub mod t4t;
pub mod transceive;

pub use discover::{PollState, TagPoller};
pub use engine::{
    ActiveDevice, DeactivateMode, DiscoverParams, DiscoveryEngine, FcDuration, NfcState, Techs,
};
pub use logger::{HexPool, Logger, SerialTransport, TraceTransport, Transport};
pub use t4t::T4tReader;
pub use transceive::transceive_blocking;

pub type Result<T> = core::result::Result<T, Error>;

/// Status codes crossing the engine and transport boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum Error {
    /// Exchange still in flight
    Busy,
    Timeout,
    Crc,
    Parity,
    Framing,
    CollisionDetected,
    LinkLost,
    NoMemory,
    /// Operation not valid in the engine's current state
    WrongState,
    /// Peer answered with an unexpected response
    Proto,
    /// The bound transport failed
    Transport,
    /// No transport has been attached yet
    TransportNotReady,
}
