pub mod config;
pub mod recurrence;
pub mod task;

pub use config::*;
pub use recurrence::*;
pub use task::*;
