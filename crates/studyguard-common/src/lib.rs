pub mod course;
pub mod pattern;
pub mod protocol;

pub use course::{Course, StatusEvent, TabInfo};
pub use pattern::{CoursePattern, matches};
