//! Core data types: tasks and the arena that owns them.
//!
//! Tasks reference each other a lot (predecessors and successors are
//! mutually linked), so they live in a slot arena addressed by interned
//! integer ids rather than holding direct references. The arena's name map
//! doubles as the interner: a removed task vacates its slot, and re-adding
//! the same name reuses the id.

use rustc_hash::FxHashMap;

/// Interned task id (u32 for compact storage and fast hashing).
pub type TaskId = u32;

/// Reserved name of the virtual project-start task.
pub const START: &str = "Start";
/// Reserved name of the virtual project-end task.
pub const END: &str = "End";

/// A node of the project graph.
///
/// `earliest_start` and `latest_start` are day offsets from the project
/// start, computed by the CPM passes; they default to 0 on a fresh task.
/// Adjacency lists are kept in declared order and always symmetric:
/// `a` lists `b` as successor exactly when `b` lists `a` as predecessor.
#[derive(Clone, Debug)]
pub struct Task {
    pub name: String,
    /// Duration in whole days (>= 0; sentinels are always 0).
    pub duration: i64,
    pub earliest_start: i64,
    pub latest_start: i64,
    pub predecessors: Vec<TaskId>,
    pub successors: Vec<TaskId>,
}

impl Task {
    pub fn new(name: impl Into<String>, duration: i64) -> Self {
        Self {
            name: name.into(),
            duration,
            earliest_start: 0,
            latest_start: 0,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    /// Scheduling margin: latest start minus earliest start.
    pub fn slack(&self) -> i64 {
        self.latest_start - self.earliest_start
    }

    /// A task is critical when it has no slack.
    pub fn is_critical(&self) -> bool {
        self.slack() == 0
    }

    pub fn is_sentinel(&self) -> bool {
        self.name == START || self.name == END
    }
}

/// Read-only copy of a task handed to the layout engine.
///
/// Taken while the graph is quiescent; the layout engine never sees live
/// graph state (no locking discipline exists, see the crate docs).
#[derive(Clone, Debug)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub duration: i64,
    pub earliest_start: i64,
    pub latest_start: i64,
    pub predecessors: Vec<TaskId>,
    pub successors: Vec<TaskId>,
}

/// Slot arena owning every task of a graph.
///
/// Ids are stable for the lifetime of a name: removing a task leaves its
/// slot vacant, and inserting the same name again reoccupies it.
#[derive(Clone, Debug, Default)]
pub struct TaskArena {
    ids: FxHashMap<String, TaskId>,
    slots: Vec<Option<Task>>,
}

impl TaskArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task, interning its name. Re-inserting an existing name
    /// replaces the task in place and keeps the id.
    pub fn insert(&mut self, task: Task) -> TaskId {
        if let Some(&id) = self.ids.get(&task.name) {
            self.slots[id as usize] = Some(task);
            return id;
        }
        let id = self.slots.len() as TaskId;
        self.ids.insert(task.name.clone(), id);
        self.slots.push(Some(task));
        id
    }

    /// Id of a live task by name, if present.
    pub fn id(&self, name: &str) -> Option<TaskId> {
        let id = *self.ids.get(name)?;
        self.slots[id as usize].as_ref().map(|_| id)
    }

    #[inline]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.slots.get(id as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.slots.get_mut(id as usize)?.as_mut()
    }

    pub fn by_name(&self, name: &str) -> Option<&Task> {
        self.get(self.id(name)?)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.id(name).is_some()
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    /// Iterate live tasks in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|t| (i as TaskId, t)))
    }

    /// Link a precedence edge pred -> succ, keeping both adjacency lists
    /// symmetric. Idempotent: an existing edge is left alone.
    pub fn link(&mut self, pred: TaskId, succ: TaskId) {
        if pred == succ {
            return;
        }
        if let Some(p) = self.get_mut(pred) {
            if !p.successors.contains(&succ) {
                p.successors.push(succ);
            }
        }
        if let Some(s) = self.get_mut(succ) {
            if !s.predecessors.contains(&pred) {
                s.predecessors.push(pred);
            }
        }
    }

    /// Remove the edge pred -> succ from both sides, if present.
    pub fn unlink(&mut self, pred: TaskId, succ: TaskId) {
        if let Some(p) = self.get_mut(pred) {
            p.successors.retain(|&t| t != succ);
        }
        if let Some(s) = self.get_mut(succ) {
            s.predecessors.retain(|&t| t != pred);
        }
    }

    /// Detach `id` from every neighbor's adjacency lists (its own lists are
    /// left as-is; the task is expected to be removed right after).
    pub fn detach(&mut self, id: TaskId) {
        let neighbors: Vec<TaskId> = self
            .iter()
            .filter(|&(other, _)| other != id)
            .map(|(other, _)| other)
            .collect();
        for other in neighbors {
            if let Some(t) = self.get_mut(other) {
                t.predecessors.retain(|&p| p != id);
                t.successors.retain(|&s| s != id);
            }
        }
    }

    /// Vacate a slot, returning the removed task.
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        self.slots.get_mut(id as usize)?.take()
    }

    pub fn snapshot_of(&self, id: TaskId) -> Option<TaskSnapshot> {
        let t = self.get(id)?;
        Some(TaskSnapshot {
            id,
            name: t.name.clone(),
            duration: t.duration,
            earliest_start: t.earliest_start,
            latest_start: t.latest_start,
            predecessors: t.predecessors.clone(),
            successors: t.successors.clone(),
        })
    }
}

impl std::ops::Index<TaskId> for TaskArena {
    type Output = Task;

    /// Panics on a vacant slot; callers index only with ids the arena
    /// currently holds.
    fn index(&self, id: TaskId) -> &Task {
        self.slots[id as usize]
            .as_ref()
            .unwrap_or_else(|| panic!("no task in slot {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut arena = TaskArena::new();
        let a = arena.insert(Task::new("a", 2));
        let b = arena.insert(Task::new("b", 3));

        assert_ne!(a, b);
        assert_eq!(arena.id("a"), Some(a));
        assert_eq!(arena.by_name("b").map(|t| t.duration), Some(3));
        assert_eq!(arena.id("missing"), None);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_reinsert_same_name_reuses_id() {
        let mut arena = TaskArena::new();
        let a = arena.insert(Task::new("a", 2));
        arena.remove(a);
        assert_eq!(arena.id("a"), None);

        let a2 = arena.insert(Task::new("a", 7));
        assert_eq!(a, a2);
        assert_eq!(arena[a2].duration, 7);
    }

    #[test]
    fn test_link_is_symmetric_and_idempotent() {
        let mut arena = TaskArena::new();
        let a = arena.insert(Task::new("a", 1));
        let b = arena.insert(Task::new("b", 1));

        arena.link(a, b);
        arena.link(a, b);

        assert_eq!(arena[a].successors, vec![b]);
        assert_eq!(arena[b].predecessors, vec![a]);

        // Self-links are refused outright.
        arena.link(a, a);
        assert_eq!(arena[a].successors, vec![b]);
        assert!(arena[a].predecessors.is_empty());
    }

    #[test]
    fn test_detach_clears_neighbor_lists() {
        let mut arena = TaskArena::new();
        let a = arena.insert(Task::new("a", 1));
        let b = arena.insert(Task::new("b", 1));
        let c = arena.insert(Task::new("c", 1));
        arena.link(a, b);
        arena.link(b, c);

        arena.detach(b);
        arena.remove(b);

        assert!(arena[a].successors.is_empty());
        assert!(arena[c].predecessors.is_empty());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_slack_and_criticality() {
        let mut t = Task::new("a", 4);
        t.earliest_start = 3;
        t.latest_start = 3;
        assert_eq!(t.slack(), 0);
        assert!(t.is_critical());

        t.latest_start = 5;
        assert_eq!(t.slack(), 2);
        assert!(!t.is_critical());
    }
}
