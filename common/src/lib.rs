// Common library shared by the scheduler (controller) and worker binaries

pub mod checker;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod models;
pub mod probe;
pub mod queue;
pub mod schedule;
pub mod scheduler;
pub mod telemetry;
pub mod trigger;
pub mod worker;
