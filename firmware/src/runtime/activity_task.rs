use embassy_futures::select::{Either, select};
use embassy_stm32::exti::ExtiInput;

use super::Engine;
use crate::gate::ACTIVITY_GATE;

/// Forwards falling edges on the drive activity input while a listener is
/// subscribed.
#[embassy_executor::task]
pub async fn run(engine: &'static Engine, mut input: ExtiInput<'static>) -> ! {
    loop {
        ACTIVITY_GATE.wait_open().await;

        match select(input.wait_for_falling_edge(), ACTIVITY_GATE.changed()).await {
            Either::First(()) => engine.activity_pulse(),
            Either::Second(()) => {}
        }
    }
}
