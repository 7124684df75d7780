use crate::{
    engine::{DiscoveryEngine, FcDuration},
    transceive::transceive_blocking,
    Error, Result,
};

/// SELECT of the NDEF tag application (AID D2760000850101)
pub const NDEF_APP_SELECT: [u8; 13] = [
    0x00, 0xA4, 0x04, 0x00, 0x07, 0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01, 0x00,
];
/// SELECT of the capability container file (E103)
pub const CC_FILE_SELECT: [u8; 7] = [0x00, 0xA4, 0x00, 0x0C, 0x02, 0xE1, 0x03];
/// READ BINARY of the first 15 bytes of the selected file
pub const READ_BINARY: [u8; 5] = [0x00, 0xB0, 0x00, 0x00, 0x0F];

/// Frame wait time for T4T APDUs, 20 ms worth of carrier cycles
const T4T_FWT: FcDuration = FcDuration::from_ticks(271_200);

const SW_OK: [u8; 2] = [0x90, 0x00];

/// Reads the NDEF capability container of an activated Type-4 tag
///
/// Borrows the engine between detection and release, the same way a
/// protocol poller sits on top of the activated card. Every APDU runs
/// through the blocking transceive, so the discovery loop is stalled for
/// the duration.
pub struct T4tReader<'a, E> {
    engine: &'a mut E,
}

impl<'a, E: DiscoveryEngine> T4tReader<'a, E> {
    pub fn new(engine: &'a mut E) -> Self {
        Self { engine }
    }

    /// One APDU round trip; strips and checks the status trailer
    fn apdu(&mut self, cmd: &[u8], rx: &mut [u8]) -> Result<usize> {
        let len = transceive_blocking(self.engine, cmd, rx, T4T_FWT)?;
        if len >= 2 && rx[len - 2..len] == SW_OK {
            return Ok(len - 2);
        }
        defmt::warn!("Bad T4T response, {=usize} bytes", len);
        Err(Error::Proto)
    }

    pub fn select_ndef_app(&mut self, rx: &mut [u8]) -> Result<usize> {
        self.apdu(&NDEF_APP_SELECT, rx)
    }

    pub fn select_cc(&mut self, rx: &mut [u8]) -> Result<usize> {
        self.apdu(&CC_FILE_SELECT, rx)
    }

    pub fn read_cc(&mut self, rx: &mut [u8]) -> Result<usize> {
        self.apdu(&READ_BINARY, rx)
    }

    /// Select application, select CC file, read the container header
    ///
    /// Returns the payload length left at the front of `rx`.
    pub fn read_capability_container(&mut self, rx: &mut [u8]) -> Result<usize> {
        self.select_ndef_app(rx)?;
        self.select_cc(rx)?;
        self.read_cc(rx)
    }
}
