//! Critical path enumeration: every zero-slack route from `Start` to `End`.

use crate::task::{TaskArena, TaskId, END, START};

/// One zero-slack route through the project, ordered `Start` to `End`.
///
/// Immutable once built; consecutive members are precedence-linked and
/// every member is critical at the time of enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CriticalPath {
    task_ids: Vec<TaskId>,
    total_duration: i64,
}

impl CriticalPath {
    /// Build a path whose total duration is derived from the terminal
    /// task's earliest start (the project finish when the path ends at
    /// `End`, which enumeration guarantees).
    pub fn new(task_ids: Vec<TaskId>, arena: &TaskArena) -> Self {
        let total_duration = task_ids
            .last()
            .map(|&id| arena[id].earliest_start)
            .unwrap_or(0);
        Self {
            task_ids,
            total_duration,
        }
    }

    /// Build a path with an explicit total duration override.
    pub fn with_total_duration(task_ids: Vec<TaskId>, total_duration: i64) -> Self {
        Self {
            task_ids,
            total_duration,
        }
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_ids
    }

    pub fn total_duration(&self) -> i64 {
        self.total_duration
    }

    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }

    /// One-line rendering, e.g.
    /// `Critical path (duration: 6 days): Start -> A(2) -> B(3) -> C(1) -> End`.
    /// Sentinels are shown without their (zero) duration.
    pub fn summary(&self, arena: &TaskArena) -> String {
        let mut out = format!("Critical path (duration: {} days): ", self.total_duration);
        for (i, &id) in self.task_ids.iter().enumerate() {
            let task = &arena[id];
            if task.is_sentinel() {
                out.push_str(&task.name);
            } else {
                out.push_str(&format!("{}({})", task.name, task.duration));
            }
            if i + 1 < self.task_ids.len() {
                out.push_str(" -> ");
            }
        }
        out
    }
}

/// Enumerate every critical path with an iterative depth-first search.
///
/// The search starts at `Start` (and yields nothing unless `Start` itself
/// is critical), follows only critical successors, and emits one path each
/// time `End` is reached. Successors are pushed in reverse declared order
/// so paths come out left-to-right relative to the adjacency lists.
pub fn enumerate_critical_paths(arena: &TaskArena) -> Vec<CriticalPath> {
    let mut paths = Vec::new();

    let start = match arena.id(START) {
        Some(id) if arena[id].is_critical() => id,
        _ => return paths,
    };

    let mut stack: Vec<(TaskId, Vec<TaskId>)> = vec![(start, vec![start])];

    while let Some((current, path)) = stack.pop() {
        let task = &arena[current];
        if task.name == END {
            paths.push(CriticalPath::new(path, arena));
            continue;
        }

        let critical_succs: Vec<TaskId> = task
            .successors
            .iter()
            .copied()
            .filter(|&s| arena[s].is_critical())
            .collect();

        for &succ in critical_succs.iter().rev() {
            let mut next_path = path.clone();
            next_path.push(succ);
            stack.push((succ, next_path));
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::compute_schedule;
    use crate::task::Task;

    /// Start -> each branch -> End, with the given durations.
    fn fan(branches: &[(&str, i64)]) -> (TaskArena, Vec<TaskId>) {
        let mut arena = TaskArena::new();
        let start = arena.insert(Task::new(START, 0));
        let mut order = vec![start];
        for &(name, d) in branches {
            let id = arena.insert(Task::new(name, d));
            arena.link(start, id);
            order.push(id);
        }
        let end = arena.insert(Task::new(END, 0));
        for &id in &order[1..] {
            arena.link(id, end);
        }
        order.push(end);
        compute_schedule(&mut arena, &order);
        (arena, order)
    }

    #[test]
    fn test_single_path_on_chain() {
        let mut arena = TaskArena::new();
        let start = arena.insert(Task::new(START, 0));
        let a = arena.insert(Task::new("a", 2));
        let end = arena.insert(Task::new(END, 0));
        arena.link(start, a);
        arena.link(a, end);
        compute_schedule(&mut arena, &[start, a, end]);

        let paths = enumerate_critical_paths(&arena);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].task_ids(), &[start, a, end]);
        assert_eq!(paths[0].total_duration(), 2);
    }

    #[test]
    fn test_only_critical_branch_is_followed() {
        let (arena, _order) = fan(&[("long", 5), ("short", 1)]);
        let paths = enumerate_critical_paths(&arena);

        assert_eq!(paths.len(), 1);
        let names: Vec<&str> = paths[0]
            .task_ids()
            .iter()
            .map(|&id| arena[id].name.as_str())
            .collect();
        assert_eq!(names, vec![START, "long", END]);
        assert_eq!(paths[0].total_duration(), 5);
    }

    #[test]
    fn test_tied_branches_emit_paths_left_to_right() {
        let (arena, _order) = fan(&[("a", 3), ("b", 3)]);
        let paths = enumerate_critical_paths(&arena);

        assert_eq!(paths.len(), 2);
        assert_eq!(arena[paths[0].task_ids()[1]].name, "a");
        assert_eq!(arena[paths[1].task_ids()[1]].name, "b");

        // Soundness: Start-first, End-last, members critical and linked.
        for path in &paths {
            let ids = path.task_ids();
            assert_eq!(arena[ids[0]].name, START);
            assert_eq!(arena[*ids.last().unwrap()].name, END);
            for &id in ids {
                assert!(arena[id].is_critical());
            }
            for pair in ids.windows(2) {
                assert!(arena[pair[0]].successors.contains(&pair[1]));
            }
        }
    }

    #[test]
    fn test_total_duration_override() {
        let path = CriticalPath::with_total_duration(vec![0, 1, 2], 9);
        assert_eq!(path.total_duration(), 9);
        assert_eq!(path.task_ids(), &[0, 1, 2]);
        assert_eq!(path.len(), 3);
        assert!(!path.is_empty());
    }

    #[test]
    fn test_no_paths_when_start_missing_or_not_critical() {
        let arena = TaskArena::new();
        assert!(enumerate_critical_paths(&arena).is_empty());

        let mut arena = TaskArena::new();
        let start = arena.insert(Task::new(START, 0));
        if let Some(t) = arena.get_mut(start) {
            t.latest_start = 3;
        }
        assert!(enumerate_critical_paths(&arena).is_empty());
    }

    #[test]
    fn test_summary_rendering() {
        let mut arena = TaskArena::new();
        let start = arena.insert(Task::new(START, 0));
        let a = arena.insert(Task::new("a", 2));
        let end = arena.insert(Task::new(END, 0));
        arena.link(start, a);
        arena.link(a, end);
        compute_schedule(&mut arena, &[start, a, end]);

        let paths = enumerate_critical_paths(&arena);
        assert_eq!(
            paths[0].summary(&arena),
            "Critical path (duration: 2 days): Start -> a(2) -> End"
        );
    }
}
