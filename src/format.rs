//! Pipe-delimited project file format.
//!
//! Two dialects share the same reader and are told apart by probing the
//! maximum field count across the whole file:
//! - "base" (2-3 fields): `name|duration[|predecessorsCsv]`
//! - "pos" (3-4 fields): adds a trailing `x,y` position; sentinel rows
//!   carry only their name, a filler field and the position.
//!
//! The save format writes one line per task:
//! `name|arcWeight|predecessorsCsv|x,y`, where the arc weight is the
//! duration carried on the task's first outgoing edge. A task with no
//! outgoing edge gets no weight field at all; this single-arc-weight line
//! is a known information-loss quirk of the persisted format and is kept
//! as-is rather than replaced by a versioned scheme.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::layout::Point;
use crate::schedule::ScheduleError;
use crate::task::{TaskArena, TaskId, END, START};

/// Error types for project file loading.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unreadable project file: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("file is neither base nor pos dialect")]
    UnknownDialect,
    #[error("line {line}: invalid duration '{value}'")]
    InvalidDuration { line: usize, value: String },
    #[error(transparent)]
    Cycle(#[from] ScheduleError),
}

/// Project file dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// `name|duration[|predecessorsCsv]`
    Base,
    /// `name|duration|predecessorsCsv|x,y` plus sentinel position rows
    Pos,
}

impl Dialect {
    /// Probe a whole file: the maximum field count over non-blank lines
    /// decides the dialect (4 fields means positions are present).
    pub fn detect(source: &str) -> Result<Dialect, ParseError> {
        let mut max_fields = 0;
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            max_fields = max_fields.max(line.split('|').count());
        }
        match max_fields {
            4 => Ok(Dialect::Pos),
            2 | 3 => Ok(Dialect::Base),
            _ => Err(ParseError::UnknownDialect),
        }
    }
}

/// One ordinary task row as read from a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskRow {
    pub name: String,
    pub duration: i64,
    pub predecessors: Vec<String>,
}

/// Everything extracted from a project file.
#[derive(Clone, Debug, Default)]
pub struct ParsedProject {
    pub rows: Vec<TaskRow>,
    /// Saved node positions, in file order (pos dialect only).
    pub positions: Vec<(String, Point)>,
}

/// Split a comma-separated name list, dropping blanks.
pub(crate) fn split_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse an `x,y` pair of unsigned decimal coordinates. Anything else is
/// `None`; callers decide whether that is tolerated or an error.
fn parse_point(field: &str) -> Option<Point> {
    let field = field.trim();
    let (x, y) = field.split_once(',')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(x.trim()) || !digits(y.trim()) {
        return None;
    }
    Some(Point {
        x: x.trim().parse().ok()?,
        y: y.trim().parse().ok()?,
    })
}

/// Parse a project file into rows and saved positions.
///
/// Blank lines are skipped, as are lines with fewer than two fields.
/// A duration that is not an
/// integer fails the whole parse; no partial result is returned.
pub fn parse(source: &str) -> Result<ParsedProject, ParseError> {
    let dialect = Dialect::detect(source)?;
    let mut project = ParsedProject::default();

    for (idx, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 2 {
            continue;
        }
        let name = parts[0].trim();

        // Sentinel rows in the pos dialect only restore a saved position.
        if dialect == Dialect::Pos && (name == START || name == END) {
            if parts.len() >= 3 {
                if let Some(point) = parse_point(parts[2]) {
                    project.positions.push((name.to_string(), point));
                }
            }
            continue;
        }

        let duration: i64 =
            parts[1]
                .trim()
                .parse()
                .map_err(|_| ParseError::InvalidDuration {
                    line: idx + 1,
                    value: parts[1].trim().to_string(),
                })?;
        let predecessors = parts.get(2).map(|p| split_csv(p)).unwrap_or_default();

        project.rows.push(TaskRow {
            name: name.to_string(),
            duration,
            predecessors,
        });

        if dialect == Dialect::Pos && parts.len() == 4 {
            if let Some(point) = parse_point(parts[3]) {
                project.positions.push((name.to_string(), point));
            }
        }
    }

    Ok(project)
}

/// Render every task as one save line, in display order.
///
/// Tasks without a saved position fall back to (0, 0).
pub fn serialize(
    arena: &TaskArena,
    order: &[TaskId],
    positions: &FxHashMap<TaskId, Point>,
) -> String {
    let mut out = String::new();
    for &id in order {
        let task = &arena[id];
        out.push_str(&task.name);
        // One arc weight per line: the first outgoing edge carries the
        // task's own duration. No successors, no weight field.
        if !task.successors.is_empty() {
            out.push_str(&format!("|{}", task.duration));
        }
        out.push('|');
        let pred_names: Vec<&str> = task
            .predecessors
            .iter()
            .map(|&p| arena[p].name.as_str())
            .collect();
        out.push_str(&pred_names.join(","));
        let point = positions.get(&id).copied().unwrap_or_default();
        out.push_str(&format!("|{},{}\n", point.x, point.y));
    }
    out
}
