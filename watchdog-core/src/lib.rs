#![no_std]

// Shared logic for the host watchdog supervisor.
//
// Every state machine in this crate is tick-driven and allocation-free so the
// same code runs inside the firmware's interrupt context and under the host
// emulator and test suite.

pub mod activity;
pub mod codes;
pub mod drive;
pub mod indicator;
pub mod lines;
pub mod protocol;
pub mod registry;
pub mod repl;
pub mod response;
pub mod sequencer;
pub mod settings;
pub mod supervisor;
pub mod telemetry;
pub mod time;
pub mod watchdog;

pub use response::{Ack, CommandResult, Rejection};
pub use watchdog::{SharedWatchdog, Watchdog};
