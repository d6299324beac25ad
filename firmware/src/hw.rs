//! Board bindings for the output lines and the settings flash page.

use embassy_stm32::flash::{Blocking, Error as FlashError, Flash};
use embassy_stm32::gpio::{Output, OutputOpenDrain};
use watchdog_core::lines::{LineAction, LineDriver, LineId};
use watchdog_core::settings::{RECORD_LEN, SettingsStore};

use crate::logging;

/// Last 2 KiB page of the STM32G0B1KE's 512 KiB flash.
pub const SETTINGS_OFFSET: u32 = 0x0007_F800;
pub const SETTINGS_PAGE_SIZE: u32 = 0x800;

/// RESET* and PWR* as open-drain outputs, the LED push-pull.
pub struct HardwareLines<'d> {
    reset: OutputOpenDrain<'d>,
    power: OutputOpenDrain<'d>,
    led: Output<'d>,
}

impl<'d> HardwareLines<'d> {
    pub fn new(reset: OutputOpenDrain<'d>, power: OutputOpenDrain<'d>, led: Output<'d>) -> Self {
        Self { reset, power, led }
    }
}

impl LineDriver for HardwareLines<'_> {
    fn apply(&mut self, line: LineId, action: LineAction) {
        match line {
            LineId::Reset => drive_open_drain(&mut self.reset, action),
            LineId::Power => drive_open_drain(&mut self.power, action),
            LineId::Led => {
                match action {
                    LineAction::AssertLow => self.led.set_low(),
                    LineAction::Release => self.led.set_high(),
                }
                return;
            }
        }
        logging::line_transition(line, action);
    }
}

fn drive_open_drain(output: &mut OutputOpenDrain<'_>, action: LineAction) {
    match action {
        LineAction::AssertLow => output.set_low(),
        LineAction::Release => output.set_high(),
    }
}

/// Settings record kept at the start of a dedicated flash page.
pub struct FlashStore<'d> {
    flash: Flash<'d, Blocking>,
}

impl<'d> FlashStore<'d> {
    pub fn new(flash: Flash<'d, Blocking>) -> Self {
        Self { flash }
    }
}

impl SettingsStore for FlashStore<'_> {
    type Error = FlashError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let count = buf.len().min(RECORD_LEN);
        self.flash.blocking_read(SETTINGS_OFFSET, &mut buf[..count])?;
        Ok(count)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.flash
            .blocking_erase(SETTINGS_OFFSET, SETTINGS_OFFSET + SETTINGS_PAGE_SIZE)?;
        self.flash.blocking_write(SETTINGS_OFFSET, data)
    }
}
