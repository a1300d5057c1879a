//! MPM (Metra Potential Method) project-scheduling engine.
//!
//! A project is a directed acyclic graph of named tasks with whole-day
//! durations, bracketed by the virtual `Start` and `End` sentinels. Every
//! mutation runs the full pipeline synchronously (topological re-sort,
//! forward/backward passes, critical-path enumeration), so callers never
//! observe stale derived state. Layout is a pure function over a read-only
//! snapshot of the graph.
//!
//! Entry point is [`TaskGraph`]; the other modules hold the value types and
//! the individual pipeline stages.

pub mod calendar;
pub mod critical_path;
pub mod format;
pub mod graph;
pub mod layout;
pub mod logging;
pub mod schedule;
pub mod task;

pub use calendar::{add_days, is_valid_date, validate_date, DateError};
pub use critical_path::{enumerate_critical_paths, CriticalPath};
pub use format::{Dialect, ParseError, ParsedProject, TaskRow};
pub use graph::{TaskGraph, ValidationError};
pub use layout::{compute_layout, LayoutConfig, Point};
pub use schedule::{assign_levels, compute_schedule, ScheduleError};
pub use task::{Task, TaskArena, TaskId, TaskSnapshot, END, START};
