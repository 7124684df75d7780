use core::cmp::min;
use core::fmt::{self, Write as _};

use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::{Error, Result};

pub const HEX_POOL_SLOTS: usize = 4;
pub const HEX_SLOT_LEN: usize = 128;
/// Bytes a single format call renders before silently truncating
pub const HEX_BYTE_CAP: usize = HEX_SLOT_LEN / 2 - 1;

#[cfg(feature = "logging")]
const LOG_BUFFER_LEN: usize = 256;

/// Byte sink for log output
pub trait Transport {
    fn transmit(&mut self, bytes: &[u8]) -> Result<()>;
}

/// USART-style path over any embedded-io writer
pub struct SerialTransport<W> {
    sink: W,
}

impl<W: embedded_io::Write> SerialTransport<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: embedded_io::Write> Transport for SerialTransport<W> {
    fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes).map_err(|_| Error::Transport)?;
        self.sink.flush().map_err(|_| Error::Transport)
    }
}

/// Trace-channel path, paced so slow trace viewers don't drop bytes
pub struct TraceTransport<W, D> {
    sink: W,
    delay: D,
}

impl<W: embedded_io::Write, D: DelayNs> TraceTransport<W, D> {
    pub fn new(sink: W, delay: D) -> Self {
        Self { sink, delay }
    }
}

impl<W: embedded_io::Write, D: DelayNs> Transport for TraceTransport<W, D> {
    fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes).map_err(|_| Error::Transport)?;
        // the channel drains at roughly 10 chars/ms
        self.delay.delay_ms((bytes.len() as u32 + 9) / 10);
        Ok(())
    }
}

/// Rotating pool of hex-string slots
///
/// Each format call claims the next slot, wrapping after
/// [`HEX_POOL_SLOTS`] calls; the returned string must be consumed before
/// its slot comes around again.
pub struct HexPool {
    slots: [String<HEX_SLOT_LEN>; HEX_POOL_SLOTS],
    idx: usize,
}

impl HexPool {
    pub const fn new() -> Self {
        Self {
            slots: [String::new(), String::new(), String::new(), String::new()],
            idx: 0,
        }
    }

    /// Formats up to [`HEX_BYTE_CAP`] bytes as uppercase hex
    ///
    /// Longer input is cut off at the cap, not reported as an error.
    pub fn format(&mut self, data: &[u8]) -> &str {
        let len = min(data.len(), HEX_BYTE_CAP);
        let slot = &mut self.slots[self.idx];
        slot.clear();
        for b in &data[..len] {
            // two chars per byte always fit in the slot
            let _ = write!(slot, "{:02X}", b);
        }
        let idx = self.idx;
        self.idx = (self.idx + 1) % HEX_POOL_SLOTS;
        &self.slots[idx]
    }
}

impl Default for HexPool {
    fn default() -> Self {
        Self::new()
    }
}

/// fmt sink that fills a fixed buffer and keeps counting past the end
#[cfg(feature = "logging")]
struct TruncatingWriter<'a, const N: usize> {
    buf: &'a mut String<N>,
    produced: usize,
}

#[cfg(feature = "logging")]
impl<const N: usize> fmt::Write for TruncatingWriter<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.produced += s.len();
        for c in s.chars() {
            if self.buf.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Diagnostic logger: a hex pool plus an optional output transport
///
/// Created transportless; [`attach`](Logger::attach) binds the hardware
/// path once it exists. Until then [`transmit`](Logger::transmit) reports
/// not ready and the emitters drop their output.
pub struct Logger<T> {
    transport: Option<T>,
    pool: HexPool,
}

impl<T: Transport> Logger<T> {
    pub const fn new() -> Self {
        Self {
            transport: None,
            pool: HexPool::new(),
        }
    }

    pub fn attach(&mut self, transport: T) {
        self.transport = Some(transport);
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Reclaims the transport handle
    pub fn detach(&mut self) -> Option<T> {
        self.transport.take()
    }

    /// Formats `data` as uppercase hex in the rotating pool
    pub fn hex(&mut self, data: &[u8]) -> &str {
        self.pool.format(data)
    }

    /// Forwards raw bytes to the transport
    pub fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        match self.transport.as_mut() {
            None => Err(Error::TransportNotReady),
            Some(t) => t.transmit(bytes),
        }
    }

    /// Renders into a fixed scratch buffer and transmits what fits
    ///
    /// Returns the length the rendering would have produced, which exceeds
    /// what was sent when the buffer truncates. Transport errors are
    /// swallowed; diagnostics never fail the caller. Returns 0 with the
    /// `logging` feature off.
    pub fn emit(&mut self, args: fmt::Arguments<'_>) -> usize {
        #[cfg(feature = "logging")]
        {
            let mut buf: String<LOG_BUFFER_LEN> = String::new();
            let mut w = TruncatingWriter {
                buf: &mut buf,
                produced: 0,
            };
            let _ = fmt::write(&mut w, args);
            let produced = w.produced;
            let _ = self.transmit(buf.as_bytes());
            produced
        }
        #[cfg(not(feature = "logging"))]
        {
            let _ = args;
            0
        }
    }

    /// One hex string, one CRLF line: the tag report path
    pub fn emit_hex_line(&mut self, data: &[u8]) -> usize {
        #[cfg(feature = "logging")]
        {
            let hex = self.pool.format(data);
            let mut buf: String<LOG_BUFFER_LEN> = String::new();
            let mut w = TruncatingWriter {
                buf: &mut buf,
                produced: 0,
            };
            let _ = write!(&mut w, "{}\r\n", hex);
            let produced = w.produced;
            if let Some(t) = self.transport.as_mut() {
                let _ = t.transmit(buf.as_bytes());
            }
            produced
        }
        #[cfg(not(feature = "logging"))]
        {
            let _ = data;
            0
        }
    }
}

impl<T: Transport> Default for Logger<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Formatted line through a [`Logger`], printf style
#[macro_export]
macro_rules! log_line {
    ($logger:expr, $($arg:tt)*) => {
        $logger.emit(core::format_args!($($arg)*))
    };
}

#[cfg(test)]
pub(crate) mod recording {
    extern crate std;

    use super::Transport;
    use crate::Result;

    pub(crate) struct RecordingTransport {
        pub sent: std::vec::Vec<u8>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self {
                sent: std::vec::Vec::new(),
            }
        }
    }

    impl Transport for RecordingTransport {
        fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
            self.sent.extend_from_slice(bytes);
            Ok(())
        }
    }
}
