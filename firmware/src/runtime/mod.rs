use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::flash::Flash;
use embassy_stm32::gpio::{Level, Output, OutputOpenDrain, Pull, Speed};
use static_cell::StaticCell;
use watchdog_core::Watchdog;
use watchdog_core::sequencer::SequencerTiming;
use watchdog_core::settings::Settings;
use watchdog_core::watchdog::SharedWatchdog;

use crate::events::{EVENT_QUEUE, EventForwarder};
use crate::gate::{ACTIVITY_GATE, ActivityGate, TICK_GATE, TickGate};
use crate::hw::{FlashStore, HardwareLines};
use crate::logging;

mod activity_task;
mod tick_task;
mod uart_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) type Engine =
    SharedWatchdog<HardwareLines<'static>, TickGate, ActivityGate, EventForwarder>;

static ENGINE: StaticCell<Engine> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA2,
        PA4,
        PA5,
        PA6,
        EXTI6,
        FLASH,
        USART5,
        PB0,
        PB1,
        ..
    } = hal::init(config);

    let lines = HardwareLines::new(
        OutputOpenDrain::new(PA4, Level::High, Speed::Low),
        OutputOpenDrain::new(PA2, Level::High, Speed::Low),
        Output::new(PA5, Level::Low, Speed::Low),
    );

    let mut store = FlashStore::new(Flash::new_blocking(FLASH));
    let (settings, error) = Settings::load_or_default(&mut store);
    if let Some(error) = error {
        logging::settings_defaulted(error);
    }
    logging::boot(&settings);

    let watchdog = Watchdog::with_settings(
        lines,
        TickGate::new(&TICK_GATE),
        ActivityGate::new(&ACTIVITY_GATE),
        EventForwarder::new(&EVENT_QUEUE),
        settings,
        SequencerTiming::DEFAULT,
    );
    let engine: &'static Engine = ENGINE.init(SharedWatchdog::new(watchdog));

    let activity = ExtiInput::new(PA6, EXTI6, Pull::Up);

    spawner
        .spawn(tick_task::run(engine))
        .expect("failed to spawn tick task");

    spawner
        .spawn(activity_task::run(engine, activity))
        .expect("failed to spawn activity task");

    spawner
        .spawn(uart_task::run(engine, store, USART5, PB0, PB1))
        .expect("failed to spawn UART task");

    core::future::pending::<()>().await;
}
