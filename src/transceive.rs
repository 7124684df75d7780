use crate::{
    engine::{DiscoveryEngine, FcDuration},
    Error, Result,
};

/// Runs one data exchange to completion by spinning on the engine
///
/// Starts the exchange and, if the start is accepted, drives the worker
/// until the status settles on anything other than busy. The terminal
/// status, response length or error, is returned verbatim. A start
/// failure returns immediately without a single poll.
///
/// This monopolizes the calling thread: nothing else runs, tag detection
/// included, until the exchange settles. Fine for a single-threaded demo
/// loop; keep it out of time-critical sections.
pub fn transceive_blocking<E: DiscoveryEngine>(
    engine: &mut E,
    tx: &[u8],
    rx: &mut [u8],
    fwt: FcDuration,
) -> Result<usize> {
    engine.exchange_start(tx, fwt)?;
    loop {
        engine.step();
        match engine.exchange_result(rx) {
            Err(Error::Busy) => continue,
            res => return res,
        }
    }
}
