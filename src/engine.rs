use defmt::Format;
use heapless::Vec;

use crate::Result;

/// Duration in carrier cycles (1/fc, fc = 13.56 MHz)
///
/// Frame wait times are handed to the engine in this unit, matching the
/// NRT/FWT budgets of the underlying transceiver.
pub type FcDuration = fugit::Duration<u32, 1, 13_560_000>;

/// NFCID3 advertised during NFC-DEP ATR exchange
pub const NFCID3_DEFAULT: [u8; 10] = [0x01, 0xFE, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A];

/// General bytes advertising LLCP capabilities to a P2P peer
pub const GB_DEFAULT: [u8; 20] = [
    0x46, 0x66, 0x6d, 0x01, 0x01, 0x11, 0x02, 0x02, 0x07, 0x80, 0x03, 0x02, 0x00, 0x03, 0x04,
    0x01, 0x32, 0x07, 0x01, 0x03,
];

/// High-level engine state, as reported by [`DiscoveryEngine::state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum NfcState {
    NotInitialized,
    Idle,
    StartDiscovery,
    Discovery,
    Activated,
    DataExchange,
    Deactivation,
}

impl NfcState {
    /// A remote device has been activated and is ready for data exchange
    pub fn is_activated(self) -> bool {
        matches!(self, NfcState::Activated | NfcState::DataExchange)
    }
}

/// Target state of a deactivation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum DeactivateMode {
    /// Release the device and stop, field off
    Idle,
    /// Release the device and resume polling
    Discovery,
}

/// Bitmask of technologies to poll for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct Techs(u16);

impl Techs {
    pub const NONE: Techs = Techs(0);
    pub const POLL_A: Techs = Techs(1 << 0);
    pub const POLL_B: Techs = Techs(1 << 1);
    pub const POLL_F: Techs = Techs(1 << 2);
    pub const POLL_V: Techs = Techs(1 << 3);

    /// Union of the technologies enabled at build time
    pub const fn enabled() -> Techs {
        let mut bits = 0;
        #[cfg(feature = "nfc-a")]
        {
            bits |= Self::POLL_A.0;
        }
        #[cfg(feature = "nfc-b")]
        {
            bits |= Self::POLL_B.0;
        }
        #[cfg(feature = "nfc-f")]
        {
            bits |= Self::POLL_F.0;
        }
        #[cfg(feature = "nfc-v")]
        {
            bits |= Self::POLL_V.0;
        }
        Techs(bits)
    }

    pub const fn contains(self, other: Techs) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl core::ops::BitOr for Techs {
    type Output = Techs;

    fn bitor(self, rhs: Techs) -> Techs {
        Techs(self.0 | rhs.0)
    }
}

/// State-change notification, invoked by the engine during discovery
pub type NotifyCallback = fn(NfcState);

/// Default notification: does nothing
pub fn notify_nop(_: NfcState) {}

/// Discovery session parameters, handed to the engine once at start
///
/// Defaults reproduce a minimal single-device UID poll: one device at a
/// time, a 1 s polling round, every build-enabled technology.
#[derive(Debug, Clone)]
pub struct DiscoverParams {
    /// Maximum number of devices to resolve in one round
    pub dev_limit: u8,
    pub nfcid3: [u8; 10],
    pub gb: Vec<u8, 48>,
    pub notify: NotifyCallback,
    pub total_duration: fugit::MillisDurationU32,
    pub techs: Techs,
}

impl Default for DiscoverParams {
    fn default() -> Self {
        use fugit::ExtU32;
        Self {
            dev_limit: 1,
            nfcid3: NFCID3_DEFAULT,
            // 20 bytes into a 48 byte buffer
            gb: Vec::from_slice(&GB_DEFAULT).unwrap(),
            notify: notify_nop,
            total_duration: 1000.millis(),
            techs: Techs::enabled(),
        }
    }
}

/// Read-only view of the device the engine has activated
#[derive(Debug, Clone, PartialEq, Eq, Format)]
pub struct ActiveDevice {
    pub nfcid: Vec<u8, 10>,
}

/// The external discovery engine
///
/// Everything below this trait is a black box: RF polling, anticollision
/// and protocol activation all happen on the other side. Implementations
/// bind a vendor stack; tests script one.
pub trait DiscoveryEngine {
    /// Bring the engine up; must succeed before any other call
    fn initialize(&mut self) -> Result<()>;
    /// Begin a discovery session with the given parameters
    fn start_discovery(&mut self, params: &DiscoverParams) -> Result<()>;
    /// Drive the engine's internal state machine; call once per cycle
    fn step(&mut self);
    fn state(&self) -> NfcState;
    /// Handle of the currently activated device
    fn active_device(&mut self) -> Result<ActiveDevice>;
    fn deactivate(&mut self, mode: DeactivateMode) -> Result<()>;
    /// Start an asynchronous data exchange with the activated device
    fn exchange_start(&mut self, tx: &[u8], fwt: FcDuration) -> Result<()>;
    /// Sample the running exchange
    ///
    /// Returns [`Error::Busy`](crate::Error::Busy) while in flight; once
    /// complete, the response length written into `rx` or the error the
    /// exchange terminated with.
    fn exchange_result(&mut self, rx: &mut [u8]) -> Result<usize>;
}

#[cfg(test)]
pub(crate) mod mock {
    extern crate std;

    use super::*;
    use crate::Error;
    use std::vec::Vec as StdVec;

    /// Scripted engine for driving the controller and transceive tests
    pub(crate) struct MockEngine {
        pub init_result: Result<()>,
        pub discover_result: Result<()>,
        pub start_result: Result<()>,
        pub steps: usize,
        pub state: NfcState,
        pub device: Option<ActiveDevice>,
        pub deactivations: StdVec<DeactivateMode>,
        /// Drained front to back, one entry per exchange_result call
        pub exchange_script: StdVec<Result<StdVec<u8>>>,
        pub started: Option<(StdVec<u8>, FcDuration)>,
    }

    impl MockEngine {
        pub fn idle() -> Self {
            Self {
                init_result: Ok(()),
                discover_result: Ok(()),
                start_result: Ok(()),
                steps: 0,
                state: NfcState::NotInitialized,
                device: None,
                deactivations: StdVec::new(),
                exchange_script: StdVec::new(),
                started: None,
            }
        }

        pub fn with_activated(uid: &[u8]) -> Self {
            let mut eng = Self::idle();
            eng.state = NfcState::Activated;
            eng.device = Some(ActiveDevice {
                nfcid: Vec::from_slice(uid).unwrap(),
            });
            eng
        }
    }

    impl DiscoveryEngine for MockEngine {
        fn initialize(&mut self) -> Result<()> {
            self.init_result
        }

        fn start_discovery(&mut self, _params: &DiscoverParams) -> Result<()> {
            self.discover_result?;
            if self.state == NfcState::NotInitialized {
                self.state = NfcState::Discovery;
            }
            Ok(())
        }

        fn step(&mut self) {
            self.steps += 1;
        }

        fn state(&self) -> NfcState {
            self.state
        }

        fn active_device(&mut self) -> Result<ActiveDevice> {
            self.device.clone().ok_or(Error::WrongState)
        }

        fn deactivate(&mut self, mode: DeactivateMode) -> Result<()> {
            self.deactivations.push(mode);
            self.state = match mode {
                DeactivateMode::Idle => NfcState::Idle,
                DeactivateMode::Discovery => NfcState::Discovery,
            };
            Ok(())
        }

        fn exchange_start(&mut self, tx: &[u8], fwt: FcDuration) -> Result<()> {
            self.start_result?;
            self.started = Some((tx.to_vec(), fwt));
            Ok(())
        }

        fn exchange_result(&mut self, rx: &mut [u8]) -> Result<usize> {
            if self.exchange_script.is_empty() {
                return Err(Error::WrongState);
            }
            match self.exchange_script.remove(0) {
                Ok(bytes) => {
                    rx[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Err(e) => Err(e),
            }
        }
    }

    #[test]
    fn enabled_techs_default_to_all() {
        let techs = Techs::enabled();
        assert!(techs.contains(Techs::POLL_A));
        assert!(techs.contains(Techs::POLL_B | Techs::POLL_F | Techs::POLL_V));
    }

    #[test]
    fn default_params_match_demo_values() {
        let params = DiscoverParams::default();
        assert_eq!(params.dev_limit, 1);
        assert_eq!(params.gb.len(), GB_DEFAULT.len());
        assert_eq!(params.total_duration.to_millis(), 1000);
        assert_eq!(params.techs, Techs::enabled());
    }
}
