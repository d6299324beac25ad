use embassy_futures::select::{Either, select};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{
    BufferedUart, BufferedUartTx, Config as UartConfig, DataBits, Parity, StopBits,
};
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};
use watchdog_core::protocol::{Command, CommandDecoder, Reply, encode_reply};
use watchdog_core::settings::{Settings, SettingsStore};
use watchdog_core::{Ack, Rejection};

use super::Engine;
use crate::events::EVENT_QUEUE;
use crate::hw::FlashStore;
use crate::{logging, status};

const UART_BUFFER_SIZE: usize = 64;
const COMMAND_UART_BAUD: u32 = 115_200;

static mut UART_TX_BUFFER: [u8; UART_BUFFER_SIZE] = [0; UART_BUFFER_SIZE];
static mut UART_RX_BUFFER: [u8; UART_BUFFER_SIZE] = [0; UART_BUFFER_SIZE];

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

#[embassy_executor::task]
pub async fn run(
    engine: &'static Engine,
    mut store: FlashStore<'static>,
    usart: Peri<'static, hal::peripherals::USART5>,
    tx_pin: Peri<'static, hal::peripherals::PB0>,
    rx_pin: Peri<'static, hal::peripherals::PB1>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = COMMAND_UART_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = unsafe {
        BufferedUart::new(
            usart,
            rx_pin,
            tx_pin,
            &mut UART_TX_BUFFER,
            &mut UART_RX_BUFFER,
            UartIrqs,
            config,
        )
        .expect("failed to initialize command UART")
    };

    let (mut uart_tx, mut uart_rx) = uart.split();
    let mut decoder = CommandDecoder::new();
    let mut ingress = [0u8; UART_BUFFER_SIZE];

    loop {
        match select(uart_rx.read(&mut ingress), EVENT_QUEUE.receive()).await {
            Either::First(Ok(count)) => {
                for &byte in &ingress[..count] {
                    let Some(decoded) = decoder.push(byte) else {
                        continue;
                    };

                    let result = match decoded {
                        Ok(command) => handle(engine, &mut store, command),
                        Err(rejection) => {
                            logging::unknown_command(byte);
                            Err(rejection)
                        }
                    };
                    status::record_command(&result);
                    send(&mut uart_tx, &encode_reply(&result)).await;
                }
            }
            Either::First(Err(_)) => {
                status::record_uart_error();
                logging::uart_error("read", status::snapshot());
                decoder.reset();
                Timer::after(Duration::from_millis(5)).await;
            }
            Either::Second(code) => send(&mut uart_tx, &[code]).await,
        }
    }
}

/// Runs one command. Flash access stays outside the engine's critical
/// section so a page erase never delays ticks.
fn handle<S: SettingsStore>(
    engine: &Engine,
    store: &mut S,
    command: Command,
) -> Result<Reply, Rejection> {
    match command {
        Command::SaveSettings => {
            let settings = engine.with(|watchdog| watchdog.settings());
            match settings.save(store) {
                Ok(()) => {
                    logging::settings_saved();
                    Ok(Reply::Ack(Ack::SettingsSaved))
                }
                Err(error) => {
                    logging::settings_save_failed(error);
                    Err(Rejection::SaveSettings)
                }
            }
        }
        Command::LoadSettings => {
            let (settings, error) = Settings::load_or_default(store);
            if let Some(error) = error {
                logging::settings_defaulted(error);
            }
            engine.with(|watchdog| watchdog.apply_settings(settings))?;
            Ok(Reply::Ack(Ack::SettingsLoaded))
        }
        command => engine.execute(command, store),
    }
}

async fn send(uart_tx: &mut BufferedUartTx<'static>, bytes: &[u8]) {
    if uart_tx.write_all(bytes).await.is_err() || uart_tx.flush().await.is_err() {
        status::record_uart_error();
        logging::uart_error("write", status::snapshot());
    }
}
