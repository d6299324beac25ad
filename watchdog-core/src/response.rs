//! Result codes returned by every mutating operation.
//!
//! Success carries the reason (which operation was accepted) so a command
//! decoder can echo a distinct byte per operation. Failures follow a small
//! taxonomy: precondition violations, persistence verify failures, and
//! undecodable commands. None of them is fatal.

use core::fmt;

use crate::indicator::IndicatorMode;

/// Accepted operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    SupervisorStarted,
    SupervisorStopped,
    PingAccepted,
    HardResetEnabled,
    HardResetDisabled,
    ResponseTimeoutSet,
    RebootTimeoutSet,
    SoftAttemptsSet,
    HardAttemptsSet,
    EventsEnabled,
    EventsDisabled,
    ActivityLinked,
    ActivityUnlinked,
    SoftResetStarted,
    PowerPulseStarted,
    HardResetStarted,
    DriveStarted,
    DriveStopped,
    DrivePaused,
    DriveResumed,
    DriveTimeoutSet,
    DriveAttemptsSet,
    IndicatorMode(IndicatorMode),
    IndicatorEnabled,
    IndicatorDisabled,
    SettingsSaved,
    SettingsLoaded,
}

impl Ack {
    /// Wire code echoed to the host.
    pub const fn code(self) -> u8 {
        match self {
            Ack::SupervisorStarted => 0x01,
            Ack::SupervisorStopped => 0x02,
            Ack::PingAccepted => 0x03,
            Ack::HardResetEnabled => 0x05,
            Ack::HardResetDisabled => 0x06,
            Ack::EventsEnabled => 0x07,
            Ack::EventsDisabled => 0x08,
            Ack::ActivityLinked => 0x09,
            Ack::ActivityUnlinked => 0x0A,
            Ack::SoftResetStarted => 0x0B,
            Ack::PowerPulseStarted => 0x0C,
            Ack::HardResetStarted => 0x0D,
            Ack::SettingsSaved => 0x0E,
            Ack::SettingsLoaded => 0x0F,
            Ack::DriveStarted => 0x10,
            Ack::DriveStopped => 0x11,
            Ack::DrivePaused => 0x12,
            Ack::DriveResumed => 0x13,
            Ack::IndicatorMode(mode) => 0x18 + mode.as_index() as u8,
            Ack::IndicatorEnabled => 0x1D,
            Ack::IndicatorDisabled => 0x1E,
            Ack::DriveTimeoutSet => 0x1F,
            Ack::DriveAttemptsSet => 0x28,
            Ack::SoftAttemptsSet => 0x30,
            Ack::HardAttemptsSet => 0x38,
            Ack::ResponseTimeoutSet => 0x40,
            Ack::RebootTimeoutSet => 0x80,
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ack::SupervisorStarted => f.write_str("supervisor-started"),
            Ack::SupervisorStopped => f.write_str("supervisor-stopped"),
            Ack::PingAccepted => f.write_str("ping-accepted"),
            Ack::HardResetEnabled => f.write_str("hard-reset-enabled"),
            Ack::HardResetDisabled => f.write_str("hard-reset-disabled"),
            Ack::ResponseTimeoutSet => f.write_str("response-timeout-set"),
            Ack::RebootTimeoutSet => f.write_str("reboot-timeout-set"),
            Ack::SoftAttemptsSet => f.write_str("soft-attempts-set"),
            Ack::HardAttemptsSet => f.write_str("hard-attempts-set"),
            Ack::EventsEnabled => f.write_str("events-enabled"),
            Ack::EventsDisabled => f.write_str("events-disabled"),
            Ack::ActivityLinked => f.write_str("activity-linked"),
            Ack::ActivityUnlinked => f.write_str("activity-unlinked"),
            Ack::SoftResetStarted => f.write_str("soft-reset-started"),
            Ack::PowerPulseStarted => f.write_str("power-pulse-started"),
            Ack::HardResetStarted => f.write_str("hard-reset-started"),
            Ack::DriveStarted => f.write_str("drive-started"),
            Ack::DriveStopped => f.write_str("drive-stopped"),
            Ack::DrivePaused => f.write_str("drive-paused"),
            Ack::DriveResumed => f.write_str("drive-resumed"),
            Ack::DriveTimeoutSet => f.write_str("drive-timeout-set"),
            Ack::DriveAttemptsSet => f.write_str("drive-attempts-set"),
            Ack::IndicatorMode(mode) => write!(f, "indicator-{mode}"),
            Ack::IndicatorEnabled => f.write_str("indicator-enabled"),
            Ack::IndicatorDisabled => f.write_str("indicator-disabled"),
            Ack::SettingsSaved => f.write_str("settings-saved"),
            Ack::SettingsLoaded => f.write_str("settings-loaded"),
        }
    }
}

/// Reason an operation was refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rejection {
    /// The operation needs the quiescent state but the machine is active.
    Busy,
    /// Persisted settings did not read back as written.
    SaveSettings,
    /// The command byte is not part of the protocol.
    UnknownCommand,
}

impl Rejection {
    /// Wire code echoed to the host.
    pub const fn code(self) -> u8 {
        match self {
            Rejection::Busy => 0xE0,
            Rejection::SaveSettings => 0xE1,
            Rejection::UnknownCommand => 0xEF,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Busy => f.write_str("busy"),
            Rejection::SaveSettings => f.write_str("save-settings-error"),
            Rejection::UnknownCommand => f.write_str("unknown-command"),
        }
    }
}

/// Outcome of a mutating operation.
pub type CommandResult = Result<Ack, Rejection>;
