#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Supervisor event forwarding.
//!
//! Events are raised inside the engine's critical section, so they are only
//! queued here; the UART task writes them out as single bytes.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use watchdog_core::supervisor::{EventSink, SupervisorEvent};

use crate::{logging, status};

pub const EVENT_QUEUE_DEPTH: usize = 32;

pub type EventQueue = Channel<CriticalSectionRawMutex, u8, EVENT_QUEUE_DEPTH>;

/// Event bytes waiting for the UART writer.
pub static EVENT_QUEUE: EventQueue = Channel::new();

/// [`EventSink`] that logs events and queues their wire codes.
pub struct EventForwarder {
    queue: &'static EventQueue,
}

impl EventForwarder {
    pub const fn new(queue: &'static EventQueue) -> Self {
        Self { queue }
    }
}

impl EventSink for EventForwarder {
    fn emit(&mut self, event: SupervisorEvent, uptime_ms: u32) {
        if event != SupervisorEvent::Heartbeat {
            logging::supervisor_event(event, uptime_ms);
        }

        if self.queue.try_send(event.code()).is_err() {
            let dropped = status::record_dropped_event();
            logging::event_dropped(event, dropped);
        }
    }
}
