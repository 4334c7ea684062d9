// Build queue interface consumed by the trigger

pub mod publisher;

pub use publisher::{BuildQueue, BuildRequest, NatsBuildQueue};
