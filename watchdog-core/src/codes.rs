//! Configuration codes carried in command bytes and their derived values.
//!
//! Timeouts and attempt budgets travel as small integer codes (6, 7 or 3
//! bits) so that a single command byte can carry them. The state machines
//! store the code and derive milliseconds or attempt counts on demand, which
//! keeps the status word a direct copy of the stored configuration.

/// Response window code: `((code & 0x3F) + 1) * 5000` ms.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResponseTimeout(u8);

impl ResponseTimeout {
    pub const MASK: u8 = 0x3F;
    pub const STEP_MS: u32 = 5_000;

    /// Masks `code` to its 6 significant bits.
    pub const fn from_code(code: u8) -> Self {
        Self(code & Self::MASK)
    }

    pub const fn code(self) -> u8 {
        self.0
    }

    pub const fn as_millis(self) -> u32 {
        (self.0 as u32 + 1) * Self::STEP_MS
    }
}

/// Reboot window code: `10000 + (code & 0x7F) * 5000` ms.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RebootTimeout(u8);

impl RebootTimeout {
    pub const MASK: u8 = 0x7F;
    pub const BASE_MS: u32 = 10_000;
    pub const STEP_MS: u32 = 5_000;

    /// Masks `code` to its 7 significant bits.
    pub const fn from_code(code: u8) -> Self {
        Self(code & Self::MASK)
    }

    pub const fn code(self) -> u8 {
        self.0
    }

    pub const fn as_millis(self) -> u32 {
        Self::BASE_MS + self.0 as u32 * Self::STEP_MS
    }
}

/// Attempt budget code: `(code & 0x07) + 1` attempts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttemptBudget(u8);

impl AttemptBudget {
    pub const MASK: u8 = 0x07;

    /// Masks `code` to its 3 significant bits.
    pub const fn from_code(code: u8) -> Self {
        Self(code & Self::MASK)
    }

    pub const fn code(self) -> u8 {
        self.0
    }

    /// Number of attempts the budget allows (1..=8).
    pub const fn attempts(self) -> u8 {
        self.0 + 1
    }
}

/// 90 s response window.
pub const DEFAULT_RESPONSE_TIMEOUT: ResponseTimeout = ResponseTimeout::from_code(17);
/// 150 s reboot window.
pub const DEFAULT_REBOOT_TIMEOUT: RebootTimeout = RebootTimeout::from_code(28);
/// Three soft resets.
pub const DEFAULT_SOFT_ATTEMPTS: AttemptBudget = AttemptBudget::from_code(2);
/// Three hard resets.
pub const DEFAULT_HARD_ATTEMPTS: AttemptBudget = AttemptBudget::from_code(2);
/// 60 s of drive inactivity.
pub const DEFAULT_DRIVE_TIMEOUT: ResponseTimeout = ResponseTimeout::from_code(11);
/// Three drive-monitor soft resets.
pub const DEFAULT_DRIVE_ATTEMPTS: AttemptBudget = AttemptBudget::from_code(2);

/// Packed supervisor status exposed to the command decoder.
///
/// | byte | bits |
/// |------|------|
/// | 0 | reboot timeout code |
/// | 1 | response timeout code `<< 2`, bit 1 response elapsed, bit 0 supervising |
/// | 2 | soft code `<< 5`, hard code `<< 2`, bit 1 activity linked, bit 0 hard reset enabled |
/// | 3 | bit 0 events enabled |
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusWord(u32);

/// Fields that make up a [`StatusWord`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusFields {
    pub reboot: RebootTimeout,
    pub response: ResponseTimeout,
    pub soft: AttemptBudget,
    pub hard: AttemptBudget,
    pub supervising: bool,
    pub response_elapsed: bool,
    pub hard_reset_enabled: bool,
    pub activity_linked: bool,
    pub events_enabled: bool,
}

impl StatusWord {
    pub const fn pack(fields: StatusFields) -> Self {
        let byte0 = fields.reboot.code() as u32;
        let byte1 = ((fields.response.code() as u32) << 2)
            | ((fields.response_elapsed as u32) << 1)
            | fields.supervising as u32;
        let byte2 = ((fields.soft.code() as u32) << 5)
            | ((fields.hard.code() as u32) << 2)
            | ((fields.activity_linked as u32) << 1)
            | fields.hard_reset_enabled as u32;
        let byte3 = fields.events_enabled as u32;

        Self(byte0 | (byte1 << 8) | (byte2 << 16) | (byte3 << 24))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub const fn reboot(self) -> RebootTimeout {
        RebootTimeout::from_code(self.0 as u8)
    }

    pub const fn response(self) -> ResponseTimeout {
        ResponseTimeout::from_code((self.0 >> 10) as u8)
    }

    pub const fn soft(self) -> AttemptBudget {
        AttemptBudget::from_code((self.0 >> 21) as u8)
    }

    pub const fn hard(self) -> AttemptBudget {
        AttemptBudget::from_code((self.0 >> 18) as u8)
    }

    pub const fn supervising(self) -> bool {
        self.0 & (1 << 8) != 0
    }

    pub const fn response_elapsed(self) -> bool {
        self.0 & (1 << 9) != 0
    }

    pub const fn hard_reset_enabled(self) -> bool {
        self.0 & (1 << 16) != 0
    }

    pub const fn activity_linked(self) -> bool {
        self.0 & (1 << 17) != 0
    }

    pub const fn events_enabled(self) -> bool {
        self.0 & (1 << 24) != 0
    }
}
