use embassy_time::{Duration, Ticker};
use watchdog_core::time::TICK_PERIOD_MS;

use super::Engine;
use crate::gate::TICK_GATE;

/// Delivers the 1 ms tick while the engine keeps its tick source running.
#[embassy_executor::task]
pub async fn run(engine: &'static Engine) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(u64::from(TICK_PERIOD_MS)));
    loop {
        if !TICK_GATE.is_open() {
            TICK_GATE.wait_open().await;
            ticker.reset();
        }

        ticker.next().await;
        engine.tick();
    }
}
