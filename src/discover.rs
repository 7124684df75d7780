use defmt::Format;

use crate::{
    engine::{DeactivateMode, DiscoverParams, DiscoveryEngine, FcDuration},
    logger::{Logger, Transport},
    Result,
};

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum PollState {
    NotInitialized,
    StartDiscovery,
    Discovering,
}

/// Polling session: owns the engine and reports every tag it activates
///
/// Lifecycle is [`start`](TagPoller::start), then
/// [`cycle`](TagPoller::cycle) from the caller's main loop, then
/// [`stop`](TagPoller::stop). Cooperative and single-threaded; `cycle`
/// must never be re-entered.
pub struct TagPoller<E> {
    engine: E,
    params: DiscoverParams,
    state: PollState,
    multi_sel: bool,
}

impl<E: DiscoveryEngine> TagPoller<E> {
    /// Initializes the engine and begins discovery
    ///
    /// Either step failing aborts construction with the engine's error;
    /// the caller must not poll a session that failed to start.
    pub fn start(mut engine: E, params: DiscoverParams) -> Result<Self> {
        engine.initialize()?;
        engine.start_discovery(&params)?;
        defmt::info!("Discovery started, techs {=u16:04b}", params.techs.bits());
        Ok(Self {
            engine,
            params,
            state: PollState::StartDiscovery,
            multi_sel: false,
        })
    }

    /// One cooperative pass
    ///
    /// Always drives the engine worker first, then services the
    /// controller state. When a device has been activated its UID goes
    /// out through the logger as one hex line, the engine is released
    /// back to discovery, and the next round starts.
    pub fn cycle<T: Transport>(&mut self, log: &mut Logger<T>) -> Result<()> {
        self.engine.step();

        match self.state {
            PollState::StartDiscovery => {
                self.multi_sel = false;
                self.state = PollState::Discovering;
            }
            PollState::Discovering => {
                if self.engine.state().is_activated() {
                    let dev = self.engine.active_device()?;
                    defmt::debug!("Activated device, {=usize} byte nfcid", dev.nfcid.len());
                    log.emit_hex_line(&dev.nfcid);
                    self.engine.deactivate(DeactivateMode::Discovery)?;
                    self.state = PollState::StartDiscovery;
                }
            }
            PollState::NotInitialized => (),
        }
        Ok(())
    }

    /// Deactivates to idle; the session is over until started again
    pub fn stop(&mut self) -> Result<()> {
        self.engine.deactivate(DeactivateMode::Idle)?;
        self.state = PollState::NotInitialized;
        Ok(())
    }

    /// Synchronous exchange with the activated device
    ///
    /// Blocks the whole loop, tag detection included, until the exchange
    /// settles; see [`transceive_blocking`](crate::transceive_blocking).
    pub fn transceive_blocking(
        &mut self,
        tx: &[u8],
        rx: &mut [u8],
        fwt: FcDuration,
    ) -> Result<usize> {
        crate::transceive::transceive_blocking(&mut self.engine, tx, rx, fwt)
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn params(&self) -> &DiscoverParams {
        &self.params
    }

    /// True while a multi-device selection is in progress; stays false
    /// with the default device limit of 1
    pub fn multi_select(&self) -> bool {
        self.multi_sel
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
