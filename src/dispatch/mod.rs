//! Routes inbound commands to the handler and replies to the sender.

mod runner;

pub use runner::{CommandText, DispatchMessage, Trigger, TriggerDispatcher};
