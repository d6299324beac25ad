//! Parser for the text console.
//!
//! Console lines map onto the same [`Command`] values as the byte protocol,
//! plus a few console-only lines that drive the simulated clock and activity
//! input. Keywords are case-insensitive and separated by spaces:
//!
//! ```text
//! start | stop | ping | status | save | load
//! hard-reset on|off | events on|off | link on|off
//! set response|reboot|soft|hard <code>
//! reset soft|power|hard
//! drive start|stop|pause|resume|status | drive timeout|attempts <code>
//! led off|glow|blink-fast|blink-mid|blink-slow|enable|disable
//! advance <n>[ms|s] | activity | help [topic]
//! ```

use core::fmt;

use winnow::ascii::{dec_uint, space1};
use winnow::combinator::{alt, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::indicator::IndicatorMode;
use crate::protocol::Command;

/// A parsed console line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplLine<'a> {
    Command(Command),
    /// Advance the simulated clock by the given number of milliseconds.
    Advance(u32),
    /// Simulate one edge on the drive activity line.
    Activity,
    Help(Option<&'a str>),
}

/// Byte offset of the first character the grammar could not accept.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GrammarError {
    pub offset: usize,
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected input at column {}", self.offset + 1)
    }
}

/// Parses one console line. Surrounding whitespace is ignored.
pub fn parse(line: &str) -> Result<ReplLine<'_>, GrammarError> {
    let leading = line.len() - line.trim_start().len();
    repl_line.parse(line.trim()).map_err(|err| GrammarError {
        offset: leading + err.offset(),
    })
}

fn repl_line<'s>(input: &mut &'s str) -> ModalResult<ReplLine<'s>> {
    alt((
        preceded((keyword("advance"), space1), duration_ms).map(ReplLine::Advance),
        keyword("activity").value(ReplLine::Activity),
        preceded(keyword("help"), opt(preceded(space1, word))).map(ReplLine::Help),
        command.map(ReplLine::Command),
    ))
    .parse_next(input)
}

fn command(input: &mut &str) -> ModalResult<Command> {
    alt((
        keyword("start").value(Command::Start),
        keyword("stop").value(Command::Stop),
        keyword("ping").value(Command::Ping),
        keyword("status").value(Command::GetStatus),
        keyword("save").value(Command::SaveSettings),
        keyword("load").value(Command::LoadSettings),
        preceded(keyword("hard-reset"), switch).map(|on| {
            if on {
                Command::EnableHardReset
            } else {
                Command::DisableHardReset
            }
        }),
        preceded(keyword("events"), switch).map(|on| {
            if on {
                Command::EnableEvents
            } else {
                Command::DisableEvents
            }
        }),
        preceded(keyword("link"), switch).map(|on| {
            if on {
                Command::LinkActivity
            } else {
                Command::UnlinkActivity
            }
        }),
        preceded(keyword("set"), set_command),
        preceded(keyword("reset"), reset_command),
        preceded(keyword("drive"), drive_command),
        preceded(keyword("led"), led_command),
    ))
    .parse_next(input)
}

fn set_command(input: &mut &str) -> ModalResult<Command> {
    preceded(
        space1,
        alt((
            preceded(keyword("response"), code).map(Command::SetResponseTimeout),
            preceded(keyword("reboot"), code).map(Command::SetRebootTimeout),
            preceded(keyword("soft"), code).map(Command::SetSoftAttempts),
            preceded(keyword("hard"), code).map(Command::SetHardAttempts),
        )),
    )
    .parse_next(input)
}

fn reset_command(input: &mut &str) -> ModalResult<Command> {
    preceded(
        space1,
        alt((
            keyword("soft").value(Command::SoftReset),
            keyword("power").value(Command::PowerPulse),
            keyword("hard").value(Command::HardReset),
        )),
    )
    .parse_next(input)
}

fn drive_command(input: &mut &str) -> ModalResult<Command> {
    preceded(
        space1,
        alt((
            keyword("start").value(Command::DriveStart),
            keyword("stop").value(Command::DriveStop),
            keyword("pause").value(Command::DrivePause),
            keyword("resume").value(Command::DriveResume),
            keyword("status").value(Command::DriveStatus),
            preceded(keyword("timeout"), code).map(Command::SetDriveTimeout),
            preceded(keyword("attempts"), code).map(Command::SetDriveAttempts),
        )),
    )
    .parse_next(input)
}

fn led_command(input: &mut &str) -> ModalResult<Command> {
    preceded(
        space1,
        alt((
            keyword("off").value(Command::Indicator(IndicatorMode::Off)),
            keyword("glow").value(Command::Indicator(IndicatorMode::Glow)),
            keyword("blink-fast").value(Command::Indicator(IndicatorMode::BlinkFast)),
            keyword("blink-mid").value(Command::Indicator(IndicatorMode::BlinkMid)),
            keyword("blink-slow").value(Command::Indicator(IndicatorMode::BlinkSlow)),
            keyword("enable").value(Command::IndicatorEnable),
            keyword("disable").value(Command::IndicatorDisable),
        )),
    )
    .parse_next(input)
}

fn switch(input: &mut &str) -> ModalResult<bool> {
    preceded(
        space1,
        alt((keyword("on").value(true), keyword("off").value(false))),
    )
    .parse_next(input)
}

fn code(input: &mut &str) -> ModalResult<u8> {
    preceded(space1, dec_uint).parse_next(input)
}

fn duration_ms(input: &mut &str) -> ModalResult<u32> {
    let amount: u32 = dec_uint.parse_next(input)?;
    let scale = opt(alt(("ms".value(1u32), "s".value(1_000u32))))
        .parse_next(input)?
        .unwrap_or(1);
    Ok(amount.saturating_mul(scale))
}

fn word<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-').parse_next(input)
}

fn keyword<'s>(expected: &'static str) -> impl Parser<&'s str, &'s str, ErrMode<ContextError>> {
    word.verify(move |candidate: &str| candidate.eq_ignore_ascii_case(expected))
}
