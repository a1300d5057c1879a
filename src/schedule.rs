//! Topological leveling and the CPM forward/backward passes.
//!
//! The level of a task is its longest-path distance (in edges) from any
//! source task; the graph's display order is the task list sorted by
//! ascending level, stable within a level. Leveling is also the point where
//! an unvalidated cyclic mutation is caught: a full pass that assigns no
//! new level means the remaining tasks form a cycle, and the caller gets a
//! typed error instead of a non-terminating loop.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::task::{TaskArena, TaskId};

/// Error types for schedule recomputation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("dependency cycle detected in task graph")]
    CycleDetected,
}

/// Assign each task its topological level: 0 for tasks without
/// predecessors, otherwise 1 + the maximum level among predecessors.
///
/// Iterates over `order` until every task has a level, deferring tasks
/// whose predecessors are not all leveled yet.
///
/// # Returns
/// * `Ok` with a map holding one level per task in `order`
/// * `Err(ScheduleError::CycleDetected)` if a pass makes no progress
pub fn assign_levels(
    arena: &TaskArena,
    order: &[TaskId],
) -> Result<FxHashMap<TaskId, u32>, ScheduleError> {
    let mut levels: FxHashMap<TaskId, u32> =
        FxHashMap::with_capacity_and_hasher(order.len(), Default::default());

    while levels.len() != order.len() {
        let mut progressed = false;

        for &id in order {
            if levels.contains_key(&id) {
                continue;
            }
            let task = &arena[id];
            if task.predecessors.is_empty() {
                levels.insert(id, 0);
                progressed = true;
                continue;
            }
            let mut max_pred = None;
            for pred in &task.predecessors {
                match levels.get(pred) {
                    Some(&lvl) => max_pred = Some(max_pred.map_or(lvl, |m: u32| m.max(lvl))),
                    None => {
                        max_pred = None;
                        break;
                    }
                }
            }
            if let Some(m) = max_pred {
                levels.insert(id, m + 1);
                progressed = true;
            }
        }

        if !progressed {
            return Err(ScheduleError::CycleDetected);
        }
    }

    Ok(levels)
}

/// Run the CPM forward and backward passes over tasks already in
/// topological order.
///
/// Forward: earliest start = max over predecessors of (earliest + duration),
/// 0 without predecessors. The project finish is the largest
/// (earliest + duration) among tasks with no successors; those tasks are
/// seeded with latest start = finish - duration, and the backward pass then
/// processes the remainder in reverse topological order with
/// latest start = min over successors of (successor latest) - duration.
///
/// # Returns
/// * the project finish in days from the project start
pub fn compute_schedule(arena: &mut TaskArena, order: &[TaskId]) -> i64 {
    // Forward pass.
    for &id in order {
        let earliest = arena[id]
            .predecessors
            .iter()
            .map(|&p| arena[p].earliest_start + arena[p].duration)
            .max()
            .unwrap_or(0);
        if let Some(t) = arena.get_mut(id) {
            t.earliest_start = earliest;
        }
    }

    // Project finish over terminal tasks.
    let mut finish = 0;
    for &id in order {
        let t = &arena[id];
        if t.successors.is_empty() {
            finish = finish.max(t.earliest_start + t.duration);
        }
    }

    // Seed terminal tasks, then walk backwards.
    for &id in order {
        if arena[id].successors.is_empty() {
            let duration = arena[id].duration;
            if let Some(t) = arena.get_mut(id) {
                t.latest_start = finish - duration;
            }
        }
    }
    for &id in order.iter().rev() {
        if arena[id].successors.is_empty() {
            continue;
        }
        let latest = arena[id]
            .successors
            .iter()
            .map(|&s| arena[s].latest_start)
            .min()
            .unwrap_or(0)
            - arena[id].duration;
        if let Some(t) = arena.get_mut(id) {
            t.latest_start = latest;
        }
    }

    finish
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn chain(arena: &mut TaskArena, durations: &[(&str, i64)]) -> Vec<TaskId> {
        let ids: Vec<TaskId> = durations
            .iter()
            .map(|&(name, d)| arena.insert(Task::new(name, d)))
            .collect();
        for pair in ids.windows(2) {
            arena.link(pair[0], pair[1]);
        }
        ids
    }

    #[test]
    fn test_levels_on_chain() {
        let mut arena = TaskArena::new();
        let ids = chain(&mut arena, &[("a", 2), ("b", 3), ("c", 1)]);

        let levels = assign_levels(&arena, &ids).unwrap();
        assert_eq!(levels[&ids[0]], 0);
        assert_eq!(levels[&ids[1]], 1);
        assert_eq!(levels[&ids[2]], 2);
    }

    #[test]
    fn test_levels_respect_longest_path() {
        // a -> b -> d and a -> d: d sits one past b, not one past a.
        let mut arena = TaskArena::new();
        let a = arena.insert(Task::new("a", 1));
        let b = arena.insert(Task::new("b", 1));
        let d = arena.insert(Task::new("d", 1));
        arena.link(a, b);
        arena.link(b, d);
        arena.link(a, d);

        let order = vec![a, b, d];
        let levels = assign_levels(&arena, &order).unwrap();
        assert_eq!(levels[&d], 2);

        // Levels are nondecreasing along every edge.
        for &id in &order {
            for &succ in &arena[id].successors {
                assert!(levels[&succ] > levels[&id]);
            }
        }
    }

    #[test]
    fn test_cycle_yields_error() {
        let mut arena = TaskArena::new();
        let a = arena.insert(Task::new("a", 1));
        let b = arena.insert(Task::new("b", 1));
        arena.link(a, b);
        arena.link(b, a);

        let result = assign_levels(&arena, &[a, b]);
        assert_eq!(result, Err(ScheduleError::CycleDetected));
    }

    #[test]
    fn test_forward_backward_on_chain() {
        let mut arena = TaskArena::new();
        let ids = chain(&mut arena, &[("a", 2), ("b", 3), ("c", 1)]);

        let finish = compute_schedule(&mut arena, &ids);
        assert_eq!(finish, 6);
        assert_eq!(arena[ids[0]].earliest_start, 0);
        assert_eq!(arena[ids[1]].earliest_start, 2);
        assert_eq!(arena[ids[2]].earliest_start, 5);

        // Single chain: everything is critical.
        for &id in &ids {
            assert!(arena[id].is_critical());
        }
    }

    #[test]
    fn test_slack_on_short_branch() {
        // a -> b(5) -> d, a -> c(1) -> d: c floats by 4 days.
        let mut arena = TaskArena::new();
        let a = arena.insert(Task::new("a", 0));
        let b = arena.insert(Task::new("b", 5));
        let c = arena.insert(Task::new("c", 1));
        let d = arena.insert(Task::new("d", 0));
        arena.link(a, b);
        arena.link(a, c);
        arena.link(b, d);
        arena.link(c, d);

        let order = vec![a, b, c, d];
        let finish = compute_schedule(&mut arena, &order);
        assert_eq!(finish, 5);
        assert_eq!(arena[c].slack(), 4);
        assert!(!arena[c].is_critical());
        assert!(arena[b].is_critical());

        // Invariants from the CPM definition.
        for &id in &order {
            assert!(arena[id].slack() >= 0);
            for &p in &arena[id].predecessors {
                assert!(arena[id].earliest_start >= arena[p].earliest_start + arena[p].duration);
            }
            for &s in &arena[id].successors {
                assert!(arena[id].latest_start <= arena[s].latest_start - arena[id].duration);
            }
        }
    }
}
