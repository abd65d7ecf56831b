pub mod line_edit;
pub mod markers;
pub mod task_parser;

pub use task_parser::{display_text, is_task, parse_task, parse_tasks};
