#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Log helpers. defmt on the target, stdout on the host.

use watchdog_core::lines::{LineAction, LineId, line_by_id};
use watchdog_core::settings::{Settings, SettingsError};
use watchdog_core::supervisor::SupervisorEvent;

use crate::status::LinkCounters;

#[cfg(target_os = "none")]
pub fn boot(settings: &Settings) {
    let config = &settings.supervisor;
    defmt::info!(
        "watchdog: boot response={=u32}ms reboot={=u32}ms soft={=u8} hard={=u8} hard-reset={} link={} events={} drive-timeout={=u32}ms drive-attempts={=u8}",
        config.response.as_millis(),
        config.reboot.as_millis(),
        config.soft.attempts(),
        config.hard.attempts(),
        config.hard_reset_enabled,
        config.activity_linked,
        settings.events_enabled,
        settings.drive_timeout.as_millis(),
        settings.drive_attempts.attempts(),
    );
}

#[cfg(not(target_os = "none"))]
pub fn boot(settings: &Settings) {
    let config = &settings.supervisor;
    println!(
        "watchdog: boot response={}ms reboot={}ms soft={} hard={} hard-reset={} link={} events={} drive-timeout={}ms drive-attempts={}",
        config.response.as_millis(),
        config.reboot.as_millis(),
        config.soft.attempts(),
        config.hard.attempts(),
        config.hard_reset_enabled,
        config.activity_linked,
        settings.events_enabled,
        settings.drive_timeout.as_millis(),
        settings.drive_attempts.attempts(),
    );
}

#[cfg(target_os = "none")]
pub fn settings_defaulted(error: SettingsError) {
    defmt::warn!("settings: stored record rejected ({}), using defaults", error);
}

#[cfg(not(target_os = "none"))]
pub fn settings_defaulted(error: SettingsError) {
    println!("settings: stored record rejected ({error}), using defaults");
}

#[cfg(target_os = "none")]
pub fn settings_saved() {
    defmt::info!("settings: saved and verified");
}

#[cfg(not(target_os = "none"))]
pub fn settings_saved() {
    println!("settings: saved and verified");
}

#[cfg(target_os = "none")]
pub fn settings_save_failed(error: SettingsError) {
    defmt::warn!("settings: save failed ({}), keeping in-memory configuration", error);
}

#[cfg(not(target_os = "none"))]
pub fn settings_save_failed(error: SettingsError) {
    println!("settings: save failed ({error}), keeping in-memory configuration");
}

#[cfg(target_os = "none")]
pub fn line_transition(line: LineId, action: LineAction) {
    let info = line_by_id(line);
    defmt::info!("lines:{} {} pin={}", info.name, action.label(), info.mcu_pin);
}

#[cfg(not(target_os = "none"))]
pub fn line_transition(line: LineId, action: LineAction) {
    let info = line_by_id(line);
    println!("lines:{} {} pin={}", info.name, action.label(), info.mcu_pin);
}

#[cfg(target_os = "none")]
pub fn supervisor_event(event: SupervisorEvent, uptime_ms: u32) {
    defmt::info!("supervisor: {} t={=u32}ms", event.label(), uptime_ms);
}

#[cfg(not(target_os = "none"))]
pub fn supervisor_event(event: SupervisorEvent, uptime_ms: u32) {
    println!("supervisor: {} t={uptime_ms}ms", event.label());
}

#[cfg(target_os = "none")]
pub fn event_dropped(event: SupervisorEvent, total: u32) {
    defmt::warn!("events: queue full, dropped {} (total {=u32})", event.label(), total);
}

#[cfg(not(target_os = "none"))]
pub fn event_dropped(event: SupervisorEvent, total: u32) {
    println!("events: queue full, dropped {} (total {total})", event.label());
}

#[cfg(target_os = "none")]
pub fn unknown_command(byte: u8) {
    defmt::warn!("uart: unknown command byte {=u8:#04x}", byte);
}

#[cfg(not(target_os = "none"))]
pub fn unknown_command(byte: u8) {
    println!("uart: unknown command byte {byte:#04x}");
}

#[cfg(target_os = "none")]
pub fn uart_error(operation: &'static str, counters: LinkCounters) {
    defmt::warn!(
        "uart: {} error (errors={=u32} commands={=u32} rejected={=u32} dropped-events={=u32})",
        operation,
        counters.uart_errors,
        counters.commands,
        counters.rejected,
        counters.dropped_events,
    );
}

#[cfg(not(target_os = "none"))]
pub fn uart_error(operation: &'static str, counters: LinkCounters) {
    println!(
        "uart: {operation} error (errors={} commands={} rejected={} dropped-events={})",
        counters.uart_errors, counters.commands, counters.rejected, counters.dropped_events,
    );
}
