use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant as HostInstant};

use watchdog_core::activity::ActivityInterrupt;
use watchdog_core::lines::{ALL_LINES, LineAction, LineDriver, LineId, line_by_id};
use watchdog_core::protocol::{Command, Reply};
use watchdog_core::repl::grammar::{self, ReplLine};
use watchdog_core::repl::status::{LineSample, StatusFormatter, StatusSnapshot};
use watchdog_core::settings::MemoryStore;
use watchdog_core::supervisor::{EventSink, SupervisorEvent};
use watchdog_core::telemetry::{EventId, TelemetryEvent, TelemetryRecorder};
use watchdog_core::time::TickSource;
use watchdog_core::{Rejection, Watchdog};

pub const DEFAULT_TRANSCRIPT_PATH: &str = "target/emulator-transcript.log";

/// Telemetry entries kept between two narrations.
const NARRATION_CAPACITY: usize = 256;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "start",
        "start | stop | ping              - control the reset supervisor",
    ),
    (
        "set",
        "set response|reboot|soft|hard <code> - configure supervisor timing",
    ),
    (
        "hard-reset",
        "hard-reset on|off | link on|off | events on|off - supervisor options",
    ),
    (
        "reset",
        "reset soft|power|hard           - pulse the host lines directly",
    ),
    (
        "drive",
        "drive start|stop|pause|resume|status | drive timeout|attempts <code>",
    ),
    (
        "led",
        "led off|glow|blink-fast|blink-mid|blink-slow|enable|disable",
    ),
    (
        "settings",
        "save | load                     - persist or restore the configuration",
    ),
    (
        "status",
        "status                          - display supervisor, drive and line state",
    ),
    (
        "advance",
        "advance <n>[ms|s]               - run the simulated clock forward",
    ),
    (
        "activity",
        "activity                        - simulate one drive activity edge",
    ),
    (
        "help",
        "help [topic]                    - show help for a command",
    ),
];

type HostWatchdog = Watchdog<HostLines, HostClock, HostActivity, SessionLog>;

pub struct Session {
    watchdog: HostWatchdog,
    store: MemoryStore,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
    next_unseen: EventId,
}

impl Session {
    /// Session without a transcript file.
    pub fn new() -> Self {
        Self {
            watchdog: Watchdog::new(
                HostLines::default(),
                HostClock::default(),
                HostActivity::default(),
                SessionLog::new(),
            ),
            store: MemoryStore::new(),
            transcript: None,
            started_at: HostInstant::now(),
            next_unseen: 0,
        }
    }

    pub fn with_transcript(path: &Path) -> io::Result<Self> {
        let mut session = Self::new();
        session.transcript = Some(TranscriptLogger::new(path)?);
        Ok(session)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.record(elapsed, TranscriptRole::Host, &[trimmed.to_string()])?;

        let lines = match grammar::parse(trimmed) {
            Ok(ReplLine::Help(topic)) => help_lines(topic),
            Ok(ReplLine::Advance(millis)) => self.advance(millis),
            Ok(ReplLine::Activity) => self.activity(),
            Ok(ReplLine::Command(command)) => self.execute(command),
            Err(err) => vec![format!("ERR syntax {err}")],
        };

        self.record(elapsed, TranscriptRole::Emulator, &lines)?;
        Ok(lines)
    }

    /// Simulated milliseconds since the session started.
    pub fn now_ms(&self) -> u32 {
        self.watchdog.events().now_ms
    }

    fn advance(&mut self, millis: u32) -> Vec<String> {
        for _ in 0..millis {
            let log = self.watchdog.events_mut();
            log.now_ms = log.now_ms.wrapping_add(1);
            self.watchdog.tick();
            self.collect_transitions();
        }

        let mut lines = self.narrate();
        lines.push(format!(
            "OK advanced {} now={}",
            format_millis(millis),
            format_millis(self.now_ms())
        ));
        lines
    }

    fn activity(&mut self) -> Vec<String> {
        let delivered = self.watchdog.activity().is_enabled();
        self.watchdog.activity_pulse();
        self.collect_transitions();

        let mut lines = self.narrate();
        lines.push(if delivered {
            "OK activity delivered".to_string()
        } else {
            "OK activity ignored (line masked)".to_string()
        });
        lines
    }

    fn execute(&mut self, command: Command) -> Vec<String> {
        let result = self.watchdog.execute(command, &mut self.store);
        self.collect_transitions();

        let mut lines = self.narrate();
        match result {
            Ok(Reply::Ack(ack)) => lines.push(format!("OK {ack} code=0x{:02X}", ack.code())),
            Ok(Reply::Status(word)) => {
                lines.push(format!("OK status 0x{:08X}", word.raw()));
                lines.extend(self.status_lines());
            }
            Ok(Reply::DriveStatus(status)) => {
                lines.push(format!("OK drive-status 0x{status:04X}"));
            }
            Err(rejection) => lines.push(describe_rejection(rejection)),
        }
        lines
    }

    fn status_lines(&self) -> Vec<String> {
        let snapshot = StatusSnapshot::capture(&self.watchdog, self.watchdog.lines().samples());
        let formatter = StatusFormatter::new(&snapshot);
        let mut lines = vec![String::from("  "); 5];

        // Writing into a String cannot fail.
        let _ = formatter.write_word_line(&mut lines[0]);
        let _ = formatter.write_supervisor_line(&mut lines[1]);
        let _ = formatter.write_drive_line(&mut lines[2]);
        let _ = formatter.write_indicator_line(&mut lines[3]);
        let _ = formatter.write_lines_line(&mut lines[4]);
        lines
    }

    /// Moves line transitions produced by the last operation into the log.
    fn collect_transitions(&mut self) {
        let pending = std::mem::take(&mut self.watchdog.lines_mut().pending);
        let log = self.watchdog.events_mut();
        for (line, action) in pending {
            log.recorder.record_line_transition(line, action, log.now_ms);
        }
    }

    /// Renders telemetry recorded since the previous narration.
    fn narrate(&mut self) -> Vec<String> {
        let recorder = &self.watchdog.events().recorder;
        let mut lines = Vec::new();
        let mut next_unseen = self.next_unseen;

        for record in recorder.oldest_first() {
            if record.id < self.next_unseen {
                continue;
            }
            if record.id > next_unseen {
                lines.push(format!("  ... {} earlier records dropped", record.id - next_unseen));
            }
            next_unseen = record.id.wrapping_add(1);

            let mut line = format!("  {} {}", format_millis(record.at_ms), describe_event(record.event));
            if let Some(since) = record.since_previous_ms {
                line.push_str(&format!(" (+{} since previous)", format_millis_plain(since)));
            }
            lines.push(line);
        }

        self.next_unseen = next_unseen;
        lines
    }

    fn record(&mut self, elapsed: Duration, role: TranscriptRole, lines: &[String]) -> io::Result<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            for line in lines {
                transcript.append_line(elapsed, &role, line)?;
            }
        }
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated open-drain outputs.
#[derive(Debug, Default)]
struct HostLines {
    asserted: [bool; 3],
    pending: Vec<(LineId, LineAction)>,
}

impl HostLines {
    fn samples(&self) -> [LineSample; 3] {
        ALL_LINES.map(|info| LineSample::new(info.id, self.asserted[info.id.as_index()]))
    }
}

impl LineDriver for HostLines {
    fn apply(&mut self, line: LineId, action: LineAction) {
        let asserted = action == LineAction::AssertLow;
        let slot = &mut self.asserted[line.as_index()];
        if *slot == asserted {
            return;
        }
        *slot = asserted;
        // LED blinking would drown the narration; its level shows in `status`.
        if line != LineId::Led {
            self.pending.push((line, action));
        }
    }
}

#[derive(Debug, Default)]
struct HostClock {
    running: bool,
}

impl TickSource for HostClock {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

#[derive(Debug, Default)]
struct HostActivity {
    unmasked: bool,
}

impl ActivityInterrupt for HostActivity {
    fn enable(&mut self) {
        self.unmasked = true;
    }

    fn disable(&mut self) {
        self.unmasked = false;
    }
}

/// Event sink stamping everything with the simulated session clock, which
/// keeps running while the engine's own tick source is stopped.
struct SessionLog {
    recorder: TelemetryRecorder<NARRATION_CAPACITY>,
    now_ms: u32,
}

impl SessionLog {
    const fn new() -> Self {
        Self {
            recorder: TelemetryRecorder::new(),
            now_ms: 0,
        }
    }
}

impl EventSink for SessionLog {
    fn emit(&mut self, event: SupervisorEvent, _uptime_ms: u32) {
        self.recorder.record_supervisor_event(event, self.now_ms);
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Host Watchdog Emulator transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: &TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_rejection(rejection: Rejection) -> String {
    format!("ERR {rejection} code=0x{:02X}", rejection.code())
}

fn describe_event(event: TelemetryEvent) -> String {
    match event {
        TelemetryEvent::LineAsserted(line) => {
            format!("{} {}", line_by_id(line).name, LineAction::AssertLow.label())
        }
        TelemetryEvent::LineReleased(line) => {
            format!("{} {}", line_by_id(line).name, LineAction::Release.label())
        }
        TelemetryEvent::Supervisor(event) => {
            format!("event {} (0x{:02X})", event.label(), event.code())
        }
        TelemetryEvent::Custom(code) => format!("custom 0x{code:04X}"),
    }
}

fn format_millis(millis: u32) -> String {
    format!("+{}", format_millis_plain(millis))
}

fn format_millis_plain(millis: u32) -> String {
    if millis < 1_000 {
        format!("{millis}ms")
    } else {
        format!("{:.3}s", f64::from(millis) / 1_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        session.handle_command(line).unwrap()
    }

    #[test]
    fn status_reports_default_word() {
        let mut session = Session::new();
        let lines = run(&mut session, "status");
        assert_eq!(lines[0], "OK status 0x0048441C");
        assert!(lines[1].starts_with("  status word=0x0048441C drive=0x020B"));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn advance_narrates_first_reset() {
        let mut session = Session::new();
        run(&mut session, "set response 0");
        run(&mut session, "start");

        let lines = run(&mut session, "advance 6s");
        assert_eq!(lines[0], "  +5.000s RESET* assert-low");
        assert_eq!(lines[1], "  +5.200s RESET* release (+200ms since previous)");
        assert_eq!(lines.last().unwrap(), "OK advanced +6.000s now=+6.000s");
    }

    #[test]
    fn events_are_narrated_when_enabled() {
        let mut session = Session::new();
        run(&mut session, "events on");
        run(&mut session, "set response 0");
        run(&mut session, "start");

        let lines = run(&mut session, "advance 5s");
        assert!(lines.iter().any(|line| line.contains("event first-reset")));
        assert!(lines.iter().any(|line| line.contains("event heartbeat")));
    }

    #[test]
    fn busy_configuration_reports_rejection() {
        let mut session = Session::new();
        run(&mut session, "start");
        let lines = run(&mut session, "hard-reset on");
        assert_eq!(lines, ["ERR busy code=0xE0"]);
    }

    #[test]
    fn activity_is_ignored_until_monitoring() {
        let mut session = Session::new();
        assert_eq!(run(&mut session, "activity"), ["OK activity ignored (line masked)"]);

        run(&mut session, "drive start");
        assert_eq!(run(&mut session, "activity"), ["OK activity delivered"]);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut session = Session::new();
        let lines = run(&mut session, "reset sideways");
        assert!(lines[0].starts_with("ERR syntax"));
    }

    #[test]
    fn help_lists_topics() {
        let lines = help_lines(Some("nope"));
        assert_eq!(lines[0], "No help available for `nope`.");
        assert!(lines[1].contains("drive"));
        assert_eq!(help_lines(Some("LED")).len(), 1);
    }
}
