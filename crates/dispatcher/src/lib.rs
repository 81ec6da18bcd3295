//! Link scheduling
//!
//! Turns due links from the registry into paged fetch work.

pub mod scheduler;

pub use scheduler::{LinkScheduler, ScheduleReport};
