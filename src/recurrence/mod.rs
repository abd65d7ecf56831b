pub mod engine;
pub mod grammar;
pub mod phrase;
pub mod regenerate;

pub use crate::model::recurrence::{
    ByWeekday, Frequency, RecurrenceBuilder, RecurrenceError, RecurrenceSpec,
};
pub use engine::{Occurrences, between, next_after};
pub use phrase::{interpret, next_occurrence, normalize_phrase};
pub use regenerate::{create_next_recurring_task_line, create_next_recurring_task_line_with_status};
