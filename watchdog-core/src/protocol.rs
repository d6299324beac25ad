//! Serial command protocol.
//!
//! Every command is one byte, except the drive timeout which carries its code
//! in a second byte. Configuration codes are packed into the high ranges of
//! the byte space:
//!
//! | bytes | command |
//! |-------|---------|
//! | `0x80..=0xFF` | reboot timeout, low 7 bits |
//! | `0x40..=0x7F` | response timeout, low 6 bits |
//! | `0x38..=0x3F` | hard attempts, low 3 bits |
//! | `0x30..=0x37` | soft attempts, low 3 bits |
//! | `0x28..=0x2F` | drive attempts, low 3 bits |
//! | `0x1F, code` | drive timeout |
//! | `0x01..=0x14`, `0x18..=0x1E` | single-byte operations |
//!
//! Each command is answered with one code byte (see [`Ack::code`] and
//! [`Rejection::code`]); status requests append the value little endian.

use heapless::Vec;

use crate::codes::StatusWord;
use crate::indicator::IndicatorMode;
use crate::response::{Ack, Rejection};

/// Longest encoded command.
pub const MAX_COMMAND_LEN: usize = 2;
/// Longest encoded reply.
pub const MAX_REPLY_LEN: usize = 5;

const REBOOT_TIMEOUT_BASE: u8 = 0x80;
const RESPONSE_TIMEOUT_BASE: u8 = 0x40;
const HARD_ATTEMPTS_BASE: u8 = 0x38;
const SOFT_ATTEMPTS_BASE: u8 = 0x30;
const DRIVE_ATTEMPTS_BASE: u8 = 0x28;
const DRIVE_TIMEOUT_PREFIX: u8 = 0x1F;
const INDICATOR_MODE_BASE: u8 = 0x18;

const GET_STATUS: u8 = 0x04;
const DRIVE_STATUS: u8 = 0x14;

/// Operations reachable through the command decoder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Start,
    Stop,
    Ping,
    GetStatus,
    EnableHardReset,
    DisableHardReset,
    EnableEvents,
    DisableEvents,
    LinkActivity,
    UnlinkActivity,
    SetResponseTimeout(u8),
    SetRebootTimeout(u8),
    SetSoftAttempts(u8),
    SetHardAttempts(u8),
    SoftReset,
    PowerPulse,
    HardReset,
    SaveSettings,
    LoadSettings,
    DriveStart,
    DriveStop,
    DrivePause,
    DriveResume,
    DriveStatus,
    SetDriveTimeout(u8),
    SetDriveAttempts(u8),
    Indicator(IndicatorMode),
    IndicatorEnable,
    IndicatorDisable,
}

impl Command {
    /// Decodes a single-byte command. Returns `None` for the drive timeout
    /// prefix and for bytes outside the protocol.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let command = match byte {
            REBOOT_TIMEOUT_BASE..=0xFF => Command::SetRebootTimeout(byte & 0x7F),
            RESPONSE_TIMEOUT_BASE..=0x7F => Command::SetResponseTimeout(byte & 0x3F),
            HARD_ATTEMPTS_BASE..=0x3F => Command::SetHardAttempts(byte & 0x07),
            SOFT_ATTEMPTS_BASE..=0x37 => Command::SetSoftAttempts(byte & 0x07),
            DRIVE_ATTEMPTS_BASE..=0x2F => Command::SetDriveAttempts(byte & 0x07),
            0x01 => Command::Start,
            0x02 => Command::Stop,
            0x03 => Command::Ping,
            GET_STATUS => Command::GetStatus,
            0x05 => Command::EnableHardReset,
            0x06 => Command::DisableHardReset,
            0x07 => Command::EnableEvents,
            0x08 => Command::DisableEvents,
            0x09 => Command::LinkActivity,
            0x0A => Command::UnlinkActivity,
            0x0B => Command::SoftReset,
            0x0C => Command::PowerPulse,
            0x0D => Command::HardReset,
            0x0E => Command::SaveSettings,
            0x0F => Command::LoadSettings,
            0x10 => Command::DriveStart,
            0x11 => Command::DriveStop,
            0x12 => Command::DrivePause,
            0x13 => Command::DriveResume,
            DRIVE_STATUS => Command::DriveStatus,
            INDICATOR_MODE_BASE..=0x1C => {
                Command::Indicator(IndicatorMode::from_index(usize::from(byte - INDICATOR_MODE_BASE))?)
            }
            0x1D => Command::IndicatorEnable,
            0x1E => Command::IndicatorDisable,
            _ => return None,
        };
        Some(command)
    }

    /// Encodes the command as it travels on the wire.
    pub fn encode(self) -> Vec<u8, MAX_COMMAND_LEN> {
        let mut bytes = Vec::new();
        let first = match self {
            Command::SetRebootTimeout(code) => REBOOT_TIMEOUT_BASE | (code & 0x7F),
            Command::SetResponseTimeout(code) => RESPONSE_TIMEOUT_BASE | (code & 0x3F),
            Command::SetHardAttempts(code) => HARD_ATTEMPTS_BASE | (code & 0x07),
            Command::SetSoftAttempts(code) => SOFT_ATTEMPTS_BASE | (code & 0x07),
            Command::SetDriveAttempts(code) => DRIVE_ATTEMPTS_BASE | (code & 0x07),
            Command::SetDriveTimeout(code) => {
                bytes.extend_from_slice(&[DRIVE_TIMEOUT_PREFIX, code]).ok();
                return bytes;
            }
            Command::Start => 0x01,
            Command::Stop => 0x02,
            Command::Ping => 0x03,
            Command::GetStatus => GET_STATUS,
            Command::EnableHardReset => 0x05,
            Command::DisableHardReset => 0x06,
            Command::EnableEvents => 0x07,
            Command::DisableEvents => 0x08,
            Command::LinkActivity => 0x09,
            Command::UnlinkActivity => 0x0A,
            Command::SoftReset => 0x0B,
            Command::PowerPulse => 0x0C,
            Command::HardReset => 0x0D,
            Command::SaveSettings => 0x0E,
            Command::LoadSettings => 0x0F,
            Command::DriveStart => 0x10,
            Command::DriveStop => 0x11,
            Command::DrivePause => 0x12,
            Command::DriveResume => 0x13,
            Command::DriveStatus => DRIVE_STATUS,
            Command::Indicator(mode) => INDICATOR_MODE_BASE + mode.as_index() as u8,
            Command::IndicatorEnable => 0x1D,
            Command::IndicatorDisable => 0x1E,
        };
        bytes.push(first).ok();
        bytes
    }
}

/// Streaming decoder fed one received byte at a time.
#[derive(Clone, Debug, Default)]
pub struct CommandDecoder {
    awaiting_drive_timeout: bool,
}

impl CommandDecoder {
    pub const fn new() -> Self {
        Self {
            awaiting_drive_timeout: false,
        }
    }

    /// Returns `true` while a two-byte command is half received.
    pub const fn is_pending(&self) -> bool {
        self.awaiting_drive_timeout
    }

    /// Feeds one byte. Returns `None` while a command is incomplete.
    pub fn push(&mut self, byte: u8) -> Option<Result<Command, Rejection>> {
        if self.awaiting_drive_timeout {
            self.awaiting_drive_timeout = false;
            return Some(Ok(Command::SetDriveTimeout(byte)));
        }

        if byte == DRIVE_TIMEOUT_PREFIX {
            self.awaiting_drive_timeout = true;
            return None;
        }

        Some(Command::from_byte(byte).ok_or(Rejection::UnknownCommand))
    }

    /// Drops a half-received command.
    pub fn reset(&mut self) {
        self.awaiting_drive_timeout = false;
    }
}

/// Successful command output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    Ack(Ack),
    Status(StatusWord),
    DriveStatus(u16),
}

/// Encodes a command outcome as it is written back to the host.
pub fn encode_reply(result: &Result<Reply, Rejection>) -> Vec<u8, MAX_REPLY_LEN> {
    let mut bytes = Vec::new();
    // Capacity covers the longest reply; pushes cannot fail.
    match result {
        Ok(Reply::Ack(ack)) => {
            bytes.push(ack.code()).ok();
        }
        Ok(Reply::Status(status)) => {
            bytes.push(GET_STATUS).ok();
            bytes.extend_from_slice(&status.to_le_bytes()).ok();
        }
        Ok(Reply::DriveStatus(status)) => {
            bytes.push(DRIVE_STATUS).ok();
            bytes.extend_from_slice(&status.to_le_bytes()).ok();
        }
        Err(rejection) => {
            bytes.push(rejection.code()).ok();
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_decodes_or_is_unknown() {
        let mut decoder = CommandDecoder::new();
        for byte in 0..=u8::MAX {
            if byte == DRIVE_TIMEOUT_PREFIX {
                continue;
            }
            let decoded = decoder.push(byte).expect("single byte command");
            if let Ok(command) = decoded {
                assert_eq!(command.encode().as_slice(), &[byte]);
            }
        }
    }

    #[test]
    fn code_ranges_extract_low_bits() {
        assert_eq!(Command::from_byte(0x80), Some(Command::SetRebootTimeout(0)));
        assert_eq!(Command::from_byte(0x9C), Some(Command::SetRebootTimeout(28)));
        assert_eq!(Command::from_byte(0x51), Some(Command::SetResponseTimeout(17)));
        assert_eq!(Command::from_byte(0x3A), Some(Command::SetHardAttempts(2)));
        assert_eq!(Command::from_byte(0x32), Some(Command::SetSoftAttempts(2)));
        assert_eq!(Command::from_byte(0x2F), Some(Command::SetDriveAttempts(7)));
    }

    #[test]
    fn unassigned_bytes_are_unknown() {
        let mut decoder = CommandDecoder::new();
        for byte in [0x00, 0x15, 0x16, 0x17, 0x20, 0x27] {
            assert_eq!(decoder.push(byte), Some(Err(Rejection::UnknownCommand)));
        }
    }

    #[test]
    fn drive_timeout_takes_two_bytes() {
        let mut decoder = CommandDecoder::new();
        assert_eq!(decoder.push(DRIVE_TIMEOUT_PREFIX), None);
        assert!(decoder.is_pending());
        assert_eq!(decoder.push(0x0B), Some(Ok(Command::SetDriveTimeout(0x0B))));
        assert!(!decoder.is_pending());
        assert_eq!(decoder.push(0x01), Some(Ok(Command::Start)));
    }

    #[test]
    fn status_reply_appends_little_endian_word() {
        let reply = encode_reply(&Ok(Reply::Status(StatusWord::from_raw(0x0048_441C))));
        assert_eq!(reply.as_slice(), &[0x04, 0x1C, 0x44, 0x48, 0x00]);

        let reply = encode_reply(&Ok(Reply::DriveStatus(0x020B)));
        assert_eq!(reply.as_slice(), &[0x14, 0x0B, 0x02]);

        let reply = encode_reply(&Err(Rejection::Busy));
        assert_eq!(reply.as_slice(), &[0xE0]);
    }
}
