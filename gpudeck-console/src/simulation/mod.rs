pub mod failover;

pub use failover::{FailoverDelays, FailoverPhase, FailoverProgress, FailoverSimulation, PhaseDelay};
