//! Console tooling shared between the firmware and the emulator.
//!
//! The text grammar lives in [`grammar`] and produces the same
//! [`Command`](crate::protocol::Command) values as the byte protocol;
//! [`status`] renders engine snapshots as text.

pub mod grammar;
pub mod status;
