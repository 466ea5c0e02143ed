// src/display/mod.rs
//! Terminal output: the live recording view and activity reports

pub mod report;
pub mod terminal;

pub use report::{activity_details, activity_table, goal_table, stats_report};
pub use terminal::{key_command, LiveStatus, SessionCommand, SessionEnd, TerminalDisplay};
