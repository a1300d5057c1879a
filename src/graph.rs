//! The project graph: arena, display order, validation and the synchronous
//! recompute pipeline.
//!
//! Every mutation (add, remove, duration change, load) re-sorts the task
//! list topologically, reruns the forward/backward passes and re-enumerates
//! the critical paths before returning, so readers always observe a fully
//! consistent schedule. Validation is a separate, non-mutating step: the UI
//! asks `validate_new_task` first and only then calls `add_task`, which
//! trusts its input.

use std::fs;
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::calendar::{add_days, matches_full_date, DateError};
use crate::critical_path::{enumerate_critical_paths, CriticalPath};
use crate::format::{self, split_csv, ParseError};
use crate::layout::{compute_layout, LayoutConfig, Point};
use crate::schedule::{assign_levels, compute_schedule, ScheduleError};
use crate::task::{Task, TaskArena, TaskId, TaskSnapshot, END, START};
use crate::{log_changes, log_checks, log_debug};

/// Maximum accepted task-name length.
const MAX_NAME_LEN: usize = 50;

/// Error types for new-task validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task name is empty")]
    EmptyName,
    #[error("task name may not contain '|' or ','")]
    InvalidNameCharacter,
    #[error("a task named '{0}' already exists")]
    DuplicateName(String),
    #[error("task name exceeds {MAX_NAME_LEN} characters")]
    NameTooLong,
    #[error("'{0}' is a reserved task name")]
    ReservedName(String),
    #[error("no duration given")]
    MissingDuration,
    #[error("duration '{0}' is not an integer")]
    InvalidDuration(String),
    #[error("duration must be positive")]
    NonPositiveDuration,
    #[error("'{0}' may not be used as a predecessor")]
    PredecessorReserved(String),
    #[error("'{0}' may not be used as a successor")]
    SuccessorReserved(String),
    #[error("a task may not depend on itself")]
    SelfDependency,
    #[error("unknown predecessor '{0}'")]
    UnknownPredecessor(String),
    #[error("unknown successor '{0}'")]
    UnknownSuccessor(String),
    #[error("'{0}' is listed as both predecessor and successor")]
    PredecessorAndSuccessor(String),
    #[error("linking '{pred}' before '{succ}' would create a cycle")]
    WouldCreateCycle { pred: String, succ: String },
}

/// A scheduled project: tasks, their display order and the derived results.
#[derive(Clone, Debug)]
pub struct TaskGraph {
    arena: TaskArena,
    /// Live task ids in display order (ascending topological level, stable
    /// within a level).
    order: Vec<TaskId>,
    critical_paths: Vec<CriticalPath>,
    /// Project finish in days from the project start.
    finish: i64,
    /// Project start date as entered (`dd/mm/yyyy`) or back-computed
    /// (`dd/mm`).
    start_date: Option<String>,
    /// Node positions read from a pos-dialect file, in file order.
    saved_positions: Vec<(String, Point)>,
    last_error: Option<String>,
    verbosity: u8,
}

impl TaskGraph {
    /// An empty project: the two sentinels and nothing else.
    pub fn new() -> Self {
        let mut arena = TaskArena::new();
        let start = arena.insert(Task::new(START, 0));
        let end = arena.insert(Task::new(END, 0));
        let mut graph = Self {
            arena,
            order: vec![start, end],
            critical_paths: Vec::new(),
            finish: 0,
            start_date: None,
            saved_positions: Vec::new(),
            last_error: None,
            verbosity: 0,
        };
        // An edge-less sentinel pair cannot trip the cycle guard.
        let _ = graph.recompute();
        graph
    }

    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.verbosity = verbosity;
    }

    /// Message of the most recent failed validation or load, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn start_date(&self) -> Option<&str> {
        self.start_date.as_deref()
    }

    /// Project finish in days from the project start.
    pub fn finish(&self) -> i64 {
        self.finish
    }

    pub fn critical_paths(&self) -> &[CriticalPath] {
        &self.critical_paths
    }

    pub fn saved_positions(&self) -> &[(String, Point)] {
        &self.saved_positions
    }

    /// Live tasks in display order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|&id| self.arena.get(id))
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.arena.by_name(name)
    }

    pub fn task_id(&self, name: &str) -> Option<TaskId> {
        self.arena.id(name)
    }

    pub fn arena(&self) -> &TaskArena {
        &self.arena
    }

    /// Number of tasks, sentinels included.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Copy-on-read view of every task in display order; the only input
    /// the layout engine receives.
    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.order
            .iter()
            .filter_map(|&id| self.arena.snapshot_of(id))
            .collect()
    }

    /// Run the layout heuristic over the current snapshot.
    pub fn layout_positions(&self, config: &LayoutConfig) -> FxHashMap<TaskId, Point> {
        compute_layout(&self.snapshot(), config)
    }

    /// Render the project in the save format, one line per task in display
    /// order, with the given node positions.
    pub fn serialize(&self, positions: &FxHashMap<TaskId, Point>) -> String {
        format::serialize(&self.arena, &self.order, positions)
    }

    // ----- validation ---------------------------------------------------

    /// Validate a prospective task without mutating anything.
    ///
    /// Checks run in a fixed order and the first failure wins: name shape,
    /// uniqueness and reservations; duration text; each predecessor; each
    /// successor; finally, for every declared (predecessor, successor)
    /// pair, whether a directed path successor -> predecessor already
    /// exists (the new task would close it into a cycle).
    pub fn check_new_task(
        &self,
        name: &str,
        duration_text: &str,
        preds_csv: &str,
        succs_csv: &str,
    ) -> Result<(), ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.contains('|') || name.contains(',') {
            return Err(ValidationError::InvalidNameCharacter);
        }
        // The sentinels always occupy the arena; they fail as reserved
        // below, not as duplicates.
        if name != START && name != END && self.arena.contains(name) {
            return Err(ValidationError::DuplicateName(name.to_string()));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong);
        }
        if name == START || name == END {
            return Err(ValidationError::ReservedName(name.to_string()));
        }

        let duration_text = duration_text.trim();
        if duration_text.is_empty() {
            return Err(ValidationError::MissingDuration);
        }
        let duration: i64 = duration_text
            .parse()
            .map_err(|_| ValidationError::InvalidDuration(duration_text.to_string()))?;
        if duration <= 0 {
            return Err(ValidationError::NonPositiveDuration);
        }

        let preds = split_csv(preds_csv);
        let succs = split_csv(succs_csv);

        for pred in &preds {
            if pred == START || pred == END {
                return Err(ValidationError::PredecessorReserved(pred.clone()));
            }
            if pred == name {
                return Err(ValidationError::SelfDependency);
            }
            if !self.arena.contains(pred) {
                return Err(ValidationError::UnknownPredecessor(pred.clone()));
            }
        }
        for succ in &succs {
            if succ == START || succ == END {
                return Err(ValidationError::SuccessorReserved(succ.clone()));
            }
            if succ == name {
                return Err(ValidationError::SelfDependency);
            }
            if preds.contains(succ) {
                return Err(ValidationError::PredecessorAndSuccessor(succ.clone()));
            }
            if !self.arena.contains(succ) {
                return Err(ValidationError::UnknownSuccessor(succ.clone()));
            }
        }

        // The new task would add edges pred -> new -> succ; a pre-existing
        // path succ -> pred would close the loop.
        for pred in &preds {
            for succ in &succs {
                let (Some(p), Some(s)) = (self.arena.id(pred), self.arena.id(succ)) else {
                    continue;
                };
                if self.path_exists(s, p) {
                    return Err(ValidationError::WouldCreateCycle {
                        pred: pred.clone(),
                        succ: succ.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Boolean form of [`check_new_task`](Self::check_new_task); a failure
    /// is recorded and retrievable via [`last_error`](Self::last_error).
    pub fn validate_new_task(
        &mut self,
        name: &str,
        duration_text: &str,
        preds_csv: &str,
        succs_csv: &str,
    ) -> bool {
        match self.check_new_task(name, duration_text, preds_csv, succs_csv) {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                log_checks!(self.verbosity, "rejected task '{}': {}", name, err);
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    /// Whether a directed path `from` -> ... -> `to` exists.
    fn path_exists(&self, from: TaskId, to: TaskId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = FxHashSet::default();
        let mut frontier = vec![from];
        while let Some(id) = frontier.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(task) = self.arena.get(id) else {
                continue;
            };
            for &succ in &task.successors {
                if succ == to {
                    return true;
                }
                frontier.push(succ);
            }
        }
        false
    }

    // ----- mutation -----------------------------------------------------

    /// Add a task and rewire the graph around it.
    ///
    /// The input is trusted (callers validate first); unknown names in the
    /// lists are skipped. An empty predecessor list defaults to `Start`, an
    /// empty successor list to `End`; a sentinel link placed by an earlier
    /// default is dropped once a real edge supersedes it, so defaults track
    /// the graph instead of going stale. The cycle guard still backstops a
    /// caller that skipped validation.
    pub fn add_task(
        &mut self,
        name: &str,
        preds_csv: &str,
        succs_csv: &str,
        duration: i64,
    ) -> Result<(), ScheduleError> {
        let id = self.arena.insert(Task::new(name.trim(), duration));
        let start = self.arena.id(START);
        let end = self.arena.id(END);

        let preds = split_csv(preds_csv);
        if preds.is_empty() {
            if let Some(start) = start {
                self.arena.link(start, id);
            }
        } else {
            for pred in &preds {
                if let Some(p) = self.arena.id(pred) {
                    self.arena.link(p, id);
                    // The new edge supersedes p's default end link.
                    if Some(p) != start && Some(p) != end {
                        if let Some(end) = end {
                            self.arena.unlink(p, end);
                        }
                    }
                }
            }
        }

        let succs = split_csv(succs_csv);
        if succs.is_empty() {
            if let Some(end) = end {
                self.arena.link(id, end);
            }
        } else {
            for succ in &succs {
                if let Some(s) = self.arena.id(succ) {
                    self.arena.link(id, s);
                    if Some(s) != start && Some(s) != end {
                        if let Some(start) = start {
                            self.arena.unlink(start, s);
                        }
                    }
                }
            }
        }

        self.order.push(id);
        self.recompute()?;
        log_changes!(self.verbosity, "added task '{}' ({} days)", name.trim(), duration);
        Ok(())
    }

    /// Remove a task by name and repair the graph.
    ///
    /// After the task is detached, any task left with no successors is
    /// wired to `End` and any left with no predecessors to `Start`
    /// (sentinels excluded). Absent names are a no-op.
    pub fn remove_task(&mut self, name: &str) -> Result<(), ScheduleError> {
        let Some(id) = self.arena.id(name) else {
            return Ok(());
        };
        self.arena.detach(id);
        self.arena.remove(id);
        self.order.retain(|&t| t != id);

        let start = self.arena.id(START);
        let end = self.arena.id(END);
        let orphans: Vec<TaskId> = self
            .order
            .iter()
            .copied()
            .filter(|&t| !self.arena[t].is_sentinel())
            .collect();
        for &t in &orphans {
            if self.arena[t].successors.is_empty() {
                if let Some(end) = end {
                    self.arena.link(t, end);
                }
            }
        }
        for &t in &orphans {
            if self.arena[t].predecessors.is_empty() {
                if let Some(start) = start {
                    self.arena.link(start, t);
                }
            }
        }

        self.recompute()?;
        log_changes!(self.verbosity, "removed task '{}'", name);
        Ok(())
    }

    /// Change a task's duration in place. Absent names are a no-op.
    pub fn set_duration(&mut self, name: &str, duration: i64) -> Result<(), ScheduleError> {
        let Some(id) = self.arena.id(name) else {
            return Ok(());
        };
        if let Some(task) = self.arena.get_mut(id) {
            task.duration = duration;
        }
        self.recompute()?;
        log_changes!(self.verbosity, "set duration of '{}' to {} days", name, duration);
        Ok(())
    }

    /// Record the project start date. A valid `dd/mm/yyyy` start is stored
    /// verbatim; a valid `dd/mm/yyyy` end date back-computes the start as
    /// end minus the project duration (stored in `dd/mm` form) and takes
    /// precedence when both are given. Never triggers a recompute.
    pub fn set_project_start_date(&mut self, start: &str, end: &str) -> Result<(), DateError> {
        let start = start.trim();
        let end = end.trim();
        let mut stored = false;
        if matches_full_date(start) {
            self.start_date = Some(start.to_string());
            log_changes!(self.verbosity, "project start date set to {}", start);
            stored = true;
        }
        if matches_full_date(end) {
            let offset = self.arena.by_name(END).map(|t| t.latest_start).unwrap_or(0);
            let computed = add_days(end, -offset)?;
            log_changes!(
                self.verbosity,
                "project start date back-computed from end {}: {}",
                end,
                computed
            );
            self.start_date = Some(computed);
            stored = true;
        }
        if stored {
            return Ok(());
        }
        let given = if start.is_empty() { end } else { start };
        Err(DateError::UnrecognizedFormat(given.to_string()))
    }

    // ----- loading ------------------------------------------------------

    /// Replace this project with the contents of a project file.
    ///
    /// On any failure the graph is left empty (sentinels only) and the
    /// typed error is returned.
    pub fn try_load(&mut self, source: &str) -> Result<(), ParseError> {
        self.reset();
        let project = format::parse(source)?;
        self.saved_positions = project.positions;

        // First pass creates every task so forward references resolve.
        for row in &project.rows {
            let id = self.arena.insert(Task::new(row.name.as_str(), row.duration));
            if !self.order.contains(&id) {
                self.order.push(id);
            }
        }
        for row in &project.rows {
            let Some(id) = self.arena.id(&row.name) else {
                continue;
            };
            for pred in &row.predecessors {
                if let Some(p) = self.arena.id(pred) {
                    self.arena.link(p, id);
                }
            }
        }

        // Auto-wire orphans to the sentinels.
        let start = self.arena.id(START);
        let end = self.arena.id(END);
        let plain: Vec<TaskId> = self
            .order
            .iter()
            .copied()
            .filter(|&t| !self.arena[t].is_sentinel())
            .collect();
        for &t in &plain {
            if self.arena[t].predecessors.is_empty() {
                if let Some(start) = start {
                    self.arena.link(start, t);
                }
            }
            if self.arena[t].successors.is_empty() {
                if let Some(end) = end {
                    self.arena.link(t, end);
                }
            }
        }

        match self.recompute() {
            Ok(()) => {
                log_changes!(
                    self.verbosity,
                    "loaded project: {} tasks, {} days",
                    self.order.len(),
                    self.finish
                );
                Ok(())
            }
            Err(err) => {
                self.reset();
                Err(ParseError::Cycle(err))
            }
        }
    }

    /// Boolean form of [`try_load`](Self::try_load); a failure leaves the
    /// graph empty and records the message.
    pub fn load(&mut self, source: &str) -> bool {
        match self.try_load(source) {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                self.reset();
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    /// Load a project file from disk, with [`load`](Self::load) semantics.
    pub fn load_path(&mut self, path: &Path) -> bool {
        match fs::read_to_string(path) {
            Ok(source) => self.load(&source),
            Err(err) => {
                self.reset();
                self.last_error = Some(ParseError::Unreadable(err).to_string());
                false
            }
        }
    }

    /// Back to the sentinel-only state, dropping every derived result.
    fn reset(&mut self) {
        let mut arena = TaskArena::new();
        let start = arena.insert(Task::new(START, 0));
        let end = arena.insert(Task::new(END, 0));
        self.arena = arena;
        self.order = vec![start, end];
        self.critical_paths.clear();
        self.finish = 0;
        self.start_date = None;
        self.saved_positions.clear();
    }

    // ----- recompute pipeline -------------------------------------------

    /// Re-sort, rerun the CPM passes and re-enumerate the critical paths.
    fn recompute(&mut self) -> Result<(), ScheduleError> {
        let levels = assign_levels(&self.arena, &self.order)?;
        self.order.sort_by_key(|id| levels[id]);
        self.finish = compute_schedule(&mut self.arena, &self.order);
        self.critical_paths = enumerate_critical_paths(&self.arena);
        log_debug!(
            self.verbosity,
            "recomputed: {} tasks, finish {} days, {} critical path(s)",
            self.order.len(),
            self.finish,
            self.critical_paths.len()
        );
        Ok(())
    }

    // ----- reporting ----------------------------------------------------

    /// Multi-line textual report: project duration, per-task schedule and
    /// every critical path.
    pub fn summary(&self) -> String {
        let mut out = format!("Project duration: {} days\n", self.finish);
        if let Some(date) = &self.start_date {
            out.push_str(&format!("Project start: {date}\n"));
        }
        for task in self.tasks() {
            out.push_str(&format!(
                "{}: duration {}, earliest {}, latest {}, slack {}\n",
                task.name,
                task.duration,
                task.earliest_start,
                task.latest_start,
                task.slack()
            ));
        }
        for path in &self.critical_paths {
            out.push_str(&path.summary(&self.arena));
            out.push('\n');
        }
        out
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}
