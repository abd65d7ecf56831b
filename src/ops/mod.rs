pub mod check;
pub mod filter;
pub mod locate;
pub mod scan;
pub mod task_ops;

pub use locate::locate;
pub use scan::TaskScanner;
pub use task_ops::{MoveOutcome, Moved, TaskError, TaskMutator, TaskOp};
