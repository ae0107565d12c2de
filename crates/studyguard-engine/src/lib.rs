pub mod cache;
pub mod collector;
pub mod config;
pub mod control;
pub mod indicator;
pub mod observer;
pub mod registry;
pub mod reporter;
pub mod session;
pub mod source;

pub use studyguard_common::protocol;
pub use studyguard_common::{Course, StatusEvent, TabInfo};
