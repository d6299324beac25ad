//! Persisted configuration record.
//!
//! Settings are stored as a fixed 8-byte record:
//!
//! | offset | content |
//! |--------|---------|
//! | 0 | magic `0xA5` |
//! | 1 | reboot timeout code |
//! | 2 | response timeout code |
//! | 3 | soft attempts code, hard attempts code `<< 3` |
//! | 4 | flags: bit 0 hard reset, bit 1 activity link, bit 2 events |
//! | 5 | drive timeout code |
//! | 6 | drive attempts code |
//! | 7 | XOR of bytes 1..=6 seeded with the magic |
//!
//! Saving writes the record and reads it back; a mismatch leaves the
//! in-memory configuration authoritative.

use core::fmt;

use crate::codes::{AttemptBudget, DEFAULT_DRIVE_ATTEMPTS, DEFAULT_DRIVE_TIMEOUT, RebootTimeout, ResponseTimeout};
use crate::supervisor::SupervisorConfig;

/// First byte of a valid record.
pub const MAGIC: u8 = 0xA5;
/// Size of an encoded record.
pub const RECORD_LEN: usize = 8;

const FLAG_HARD_RESET: u8 = 1 << 0;
const FLAG_ACTIVITY_LINK: u8 = 1 << 1;
const FLAG_EVENTS: u8 = 1 << 2;

/// Errors raised while loading or saving settings.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Fewer than [`RECORD_LEN`] bytes were available.
    Truncated,
    BadMagic,
    BadChecksum,
    /// The record read back after a write differs from what was written.
    VerifyMismatch,
    /// The backing store reported an I/O failure.
    Store,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Truncated => f.write_str("settings record truncated"),
            SettingsError::BadMagic => f.write_str("settings record has bad magic"),
            SettingsError::BadChecksum => f.write_str("settings record checksum mismatch"),
            SettingsError::VerifyMismatch => f.write_str("settings verify after write failed"),
            SettingsError::Store => f.write_str("settings store failure"),
        }
    }
}

/// Non-volatile storage holding one settings record.
pub trait SettingsStore {
    type Error;

    /// Reads the stored record into `buf`, returning the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Replaces the stored record.
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// RAM-backed store for hosts without non-volatile memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    data: [u8; RECORD_LEN],
    len: usize,
}

impl MemoryStore {
    pub const fn new() -> Self {
        Self {
            data: [0; RECORD_LEN],
            len: 0,
        }
    }

    /// Raw stored bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Mutable access to the stored bytes, for simulating corruption.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// Drops stored bytes beyond `len`.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }
}

impl SettingsStore for MemoryStore {
    type Error = core::convert::Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let count = buf.len().min(self.len);
        buf[..count].copy_from_slice(&self.data[..count]);
        Ok(count)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let count = data.len().min(RECORD_LEN);
        self.data[..count].copy_from_slice(&data[..count]);
        self.len = count;
        Ok(())
    }
}

/// Everything that survives a power cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    pub supervisor: SupervisorConfig,
    pub events_enabled: bool,
    pub drive_timeout: ResponseTimeout,
    pub drive_attempts: AttemptBudget,
}

impl Settings {
    pub const DEFAULT: Self = Self {
        supervisor: SupervisorConfig::DEFAULT,
        events_enabled: false,
        drive_timeout: DEFAULT_DRIVE_TIMEOUT,
        drive_attempts: DEFAULT_DRIVE_ATTEMPTS,
    };

    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let config = &self.supervisor;
        let mut flags = 0;
        if config.hard_reset_enabled {
            flags |= FLAG_HARD_RESET;
        }
        if config.activity_linked {
            flags |= FLAG_ACTIVITY_LINK;
        }
        if self.events_enabled {
            flags |= FLAG_EVENTS;
        }

        let mut record = [
            MAGIC,
            config.reboot.code(),
            config.response.code(),
            config.soft.code() | (config.hard.code() << 3),
            flags,
            self.drive_timeout.code(),
            self.drive_attempts.code(),
            0,
        ];
        record[RECORD_LEN - 1] = checksum(&record[1..RECORD_LEN - 1]);
        record
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SettingsError> {
        let record: &[u8; RECORD_LEN] = bytes
            .get(..RECORD_LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or(SettingsError::Truncated)?;

        if record[0] != MAGIC {
            return Err(SettingsError::BadMagic);
        }
        if record[RECORD_LEN - 1] != checksum(&record[1..RECORD_LEN - 1]) {
            return Err(SettingsError::BadChecksum);
        }

        let flags = record[4];
        Ok(Self {
            supervisor: SupervisorConfig {
                reboot: RebootTimeout::from_code(record[1]),
                response: ResponseTimeout::from_code(record[2]),
                soft: AttemptBudget::from_code(record[3]),
                hard: AttemptBudget::from_code(record[3] >> 3),
                hard_reset_enabled: flags & FLAG_HARD_RESET != 0,
                activity_linked: flags & FLAG_ACTIVITY_LINK != 0,
            },
            events_enabled: flags & FLAG_EVENTS != 0,
            drive_timeout: ResponseTimeout::from_code(record[5]),
            drive_attempts: AttemptBudget::from_code(record[6]),
        })
    }

    /// Writes the record and reads it back.
    pub fn save<S: SettingsStore>(&self, store: &mut S) -> Result<(), SettingsError> {
        let record = self.encode();
        store.write(&record).map_err(|_| SettingsError::Store)?;

        let mut readback = [0u8; RECORD_LEN];
        let count = store.read(&mut readback).map_err(|_| SettingsError::Store)?;
        if count != RECORD_LEN || readback != record {
            return Err(SettingsError::VerifyMismatch);
        }
        Ok(())
    }

    pub fn load<S: SettingsStore>(store: &mut S) -> Result<Self, SettingsError> {
        let mut record = [0u8; RECORD_LEN];
        let count = store.read(&mut record).map_err(|_| SettingsError::Store)?;
        Self::decode(&record[..count])
    }

    /// Loads the stored record, falling back to defaults and reporting why.
    pub fn load_or_default<S: SettingsStore>(store: &mut S) -> (Self, Option<SettingsError>) {
        match Self::load(store) {
            Ok(settings) => (settings, None),
            Err(err) => (Self::DEFAULT, Some(err)),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(MAGIC, |acc, byte| acc ^ byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom() -> Settings {
        Settings {
            supervisor: SupervisorConfig {
                response: ResponseTimeout::from_code(3),
                reboot: RebootTimeout::from_code(70),
                soft: AttemptBudget::from_code(0),
                hard: AttemptBudget::from_code(7),
                hard_reset_enabled: true,
                activity_linked: true,
            },
            events_enabled: true,
            drive_timeout: ResponseTimeout::from_code(40),
            drive_attempts: AttemptBudget::from_code(4),
        }
    }

    #[test]
    fn saved_settings_load_back() {
        let mut store = MemoryStore::new();
        custom().save(&mut store).unwrap();

        assert_eq!(Settings::load(&mut store), Ok(custom()));
    }

    #[test]
    fn truncated_record_falls_back_to_defaults() {
        let mut store = MemoryStore::new();
        custom().save(&mut store).unwrap();
        store.truncate(5);

        let (settings, error) = Settings::load_or_default(&mut store);
        assert_eq!(settings, Settings::DEFAULT);
        assert_eq!(error, Some(SettingsError::Truncated));
    }

    #[test]
    fn empty_store_is_truncated() {
        let mut store = MemoryStore::new();
        assert_eq!(Settings::load(&mut store), Err(SettingsError::Truncated));
    }

    #[test]
    fn corruption_is_detected() {
        let mut store = MemoryStore::new();
        custom().save(&mut store).unwrap();
        store.bytes_mut()[2] ^= 0x01;
        assert_eq!(Settings::load(&mut store), Err(SettingsError::BadChecksum));

        store.bytes_mut()[0] = 0x00;
        assert_eq!(Settings::load(&mut store), Err(SettingsError::BadMagic));
    }

    struct StuckStore;

    impl SettingsStore for StuckStore {
        type Error = ();

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
            buf.fill(0xFF);
            Ok(buf.len())
        }

        fn write(&mut self, _: &[u8]) -> Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn readback_mismatch_is_reported() {
        assert_eq!(
            Settings::DEFAULT.save(&mut StuckStore),
            Err(SettingsError::VerifyMismatch)
        );
    }
}
