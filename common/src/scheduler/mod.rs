// Controller-side scheduling of trigger ticks

pub mod engine;

pub use engine::{ScheduledTrigger, TriggerScheduler};
