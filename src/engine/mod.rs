pub mod activity;
pub mod controller;
pub mod debounce;
pub mod filter;
pub mod pacer;
pub mod quota;
pub mod stats;
pub mod status;
pub mod timers;
pub mod workflow;

pub use controller::{Controller, ControllerOptions};
pub use stats::Stats;
pub use status::StatusSnapshot;
pub use workflow::{Command, Phase, WorkflowState};
