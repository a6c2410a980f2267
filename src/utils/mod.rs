//! Shared utilities.

mod synchronization;

pub use synchronization::LoadGate;
