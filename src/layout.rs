//! Grid layout for visualizing the project graph.
//!
//! A pure function from a task snapshot to one pixel coordinate per task.
//! Columns are topological levels; rows are inferred from predecessor
//! medians, with sibling groups (tasks sharing the same successor-set
//! through their predecessors) fanned out symmetrically around the median.
//! Columns are processed in ascending numeric order so the result is
//! deterministic for a given snapshot.

use rustc_hash::FxHashMap;

use crate::task::{TaskId, TaskSnapshot};

/// A node position in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Geometry of the rendered grid.
#[derive(Clone, Debug)]
pub struct LayoutConfig {
    /// Side length of a node box in pixels.
    pub box_size: i32,
    /// Left margin of the first column.
    pub margin_x: i32,
    /// Vertical origin of row 0 (rows can be negative, fanning upwards).
    pub margin_y: i32,
    /// Horizontal gap between column boxes.
    pub column_gap: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            box_size: 80,
            margin_x: 5,
            margin_y: 375,
            column_gap: 100,
        }
    }
}

/// Compute one coordinate pair per snapshot entry.
///
/// x = margin_x + column * (box_size + column_gap);
/// y = margin_y + row * box_size.
pub fn compute_layout(
    tasks: &[TaskSnapshot],
    config: &LayoutConfig,
) -> FxHashMap<TaskId, Point> {
    let grid = Grid::new(tasks);
    let rows = grid.assign_rows();

    let mut points =
        FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default());
    for (i, task) in tasks.iter().enumerate() {
        points.insert(
            task.id,
            Point {
                x: config.margin_x
                    + grid.columns[i] as i32 * (config.box_size + config.column_gap),
                y: config.margin_y + rows[i] as i32 * config.box_size,
            },
        );
    }
    points
}

/// Index-based view of the snapshot, with adjacency resolved to snapshot
/// indices and columns assigned.
struct Grid {
    columns: Vec<u32>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
}

impl Grid {
    fn new(tasks: &[TaskSnapshot]) -> Self {
        let index_of: FxHashMap<TaskId, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i))
            .collect();
        let resolve = |ids: &[TaskId]| -> Vec<usize> {
            ids.iter().filter_map(|id| index_of.get(id).copied()).collect()
        };
        let predecessors: Vec<Vec<usize>> =
            tasks.iter().map(|t| resolve(&t.predecessors)).collect();
        let successors: Vec<Vec<usize>> =
            tasks.iter().map(|t| resolve(&t.successors)).collect();
        let columns = assign_columns(&predecessors);
        Self {
            columns,
            predecessors,
            successors,
        }
    }

    /// Mean predecessor row, truncated integer division (0 without
    /// predecessors; only column-0 nodes lack them in a well-formed
    /// snapshot).
    fn mean_pred_row(&self, node: usize, rows: &[i64]) -> i64 {
        let preds = &self.predecessors[node];
        if preds.is_empty() {
            return 0;
        }
        let sum: i64 = preds.iter().map(|&p| rows[p]).sum();
        sum / preds.len() as i64
    }

    /// Row of the middle predecessor once predecessors are ordered by row
    /// (equal rows keep the later insertion first).
    fn median_pred_row(&self, node: usize, rows: &[i64]) -> i64 {
        let preds = &self.predecessors[node];
        if preds.is_empty() {
            return 0;
        }
        let mut sorted: Vec<usize> = Vec::with_capacity(preds.len());
        for &p in preds {
            let at = sorted
                .iter()
                .position(|&q| rows[p] <= rows[q])
                .unwrap_or(sorted.len());
            sorted.insert(at, p);
        }
        rows[sorted[sorted.len() / 2]]
    }

    /// One adjacent-swap pass ordering `list` by ascending mean
    /// predecessor row (deliberately a single pass, not a full sort).
    fn mean_row_pass(&self, list: &mut [usize], rows: &[i64]) {
        for i in 0..list.len().saturating_sub(1) {
            if self.mean_pred_row(list[i + 1], rows) < self.mean_pred_row(list[i], rows) {
                list.swap(i, i + 1);
            }
        }
    }

    /// Order a column's members: one alternating-parity pass over
    /// predecessor counts, then the mean-row pass.
    fn order_members(&self, members: &mut [usize], rows: &[i64]) {
        for i in 0..members.len().saturating_sub(1) {
            let left = self.predecessors[members[i]].len();
            let right = self.predecessors[members[i + 1]].len();
            let swap = if i % 2 == 0 { left > right } else { left < right };
            if swap {
                members.swap(i, i + 1);
            }
        }
        self.mean_row_pass(members, rows);
    }

    /// Extend `group` with the successors of `through` whose predecessor
    /// sets contain every node of `probe`, then re-order it by mean row.
    fn siblings_through(
        &self,
        through: usize,
        probe: &[usize],
        group: &mut Vec<usize>,
        rows: &[i64],
    ) {
        for &s in &self.successors[through] {
            if probe.iter().all(|q| self.predecessors[s].contains(q)) && !group.contains(&s) {
                group.push(s);
            }
        }
        self.mean_row_pass(group, rows);
    }

    /// The sibling group of `node`: walk each predecessor's successors,
    /// with the probe set replaced by the group found so far after the
    /// first predecessor, then keep only nodes of `node`'s own column.
    fn sibling_group(&self, node: usize, rows: &[i64]) -> Vec<usize> {
        let preds = &self.predecessors[node];
        let mut group: Vec<usize> = Vec::new();
        let mut probe: Vec<usize> = preds.clone();
        for &p in preds {
            self.siblings_through(p, &probe, &mut group, rows);
            probe = group.clone();
        }
        group.retain(|&g| self.columns[g] == self.columns[node]);
        group
    }

    /// Assign one row per node. Column 0's first member takes row 0;
    /// every later column fans its sibling groups around predecessor
    /// medians, driven by running above/below counters that reset when a
    /// fresh group is encountered.
    fn assign_rows(&self) -> Vec<i64> {
        let n = self.columns.len();
        let mut rows: Vec<i64> = vec![0; n];
        let max_col = self.columns.iter().copied().max().unwrap_or(0);

        for col in 0..=max_col {
            let members: Vec<usize> = (0..n).filter(|&i| self.columns[i] == col).collect();
            if col == 0 {
                if let Some(&first) = members.first() {
                    rows[first] = 0;
                }
                continue;
            }

            let mut ordered = members;
            self.order_members(&mut ordered, &rows);

            let mut above: i64 = 0;
            let mut below: i64 = 0;
            let mut placed: Vec<usize> = Vec::new();

            for &node in &ordered {
                let group = self.sibling_group(node, &rows);

                if !group.iter().any(|g| placed.contains(g)) {
                    above = -1;
                    below = group.len() as i64 / 2;
                }
                if group.is_empty() {
                    continue;
                }
                let Some(pos) = group.iter().position(|&g| g == node) else {
                    continue;
                };

                let size = group.len() as i64;
                let pos = pos as i64;
                let row;
                if size % 2 != 0 {
                    if pos == size / 2 {
                        // The middle sibling sits exactly on the median
                        // (mean when its predecessor count is even).
                        row = if self.predecessors[node].len() % 2 == 0 {
                            self.mean_pred_row(node, &rows)
                        } else {
                            self.median_pred_row(node, &rows)
                        };
                    } else {
                        let half = (size + 1) / 2;
                        if pos >= half {
                            above += 1;
                            row = self.median_pred_row(node, &rows)
                                + ((pos + 1) - half + above + 1);
                        } else {
                            row = self.median_pred_row(node, &rows)
                                + ((pos + 1) - half - below);
                            below -= 1;
                        }
                    }
                } else {
                    let half = size / 2;
                    if pos >= half {
                        above += 1;
                        row = self.mean_pred_row(node, &rows) + (pos - half + above) + 1;
                    } else {
                        below -= 1;
                        row = self.mean_pred_row(node, &rows) + (pos - half - below);
                    }
                }

                placed.push(node);
                rows[node] = row;
            }
        }

        rows
    }
}

/// Longest-path column per node: 0 without predecessors, otherwise
/// 1 + the maximum predecessor column; iterated until settled. A snapshot
/// of a well-formed graph always settles; leftover nodes (possible only
/// for malformed input) stay in column 0.
fn assign_columns(predecessors: &[Vec<usize>]) -> Vec<u32> {
    let n = predecessors.len();
    let mut columns: Vec<Option<u32>> = vec![None; n];
    let mut remaining = n;

    while remaining > 0 {
        let mut progressed = false;
        for i in 0..n {
            if columns[i].is_some() {
                continue;
            }
            if predecessors[i].is_empty() {
                columns[i] = Some(0);
                remaining -= 1;
                progressed = true;
                continue;
            }
            let mut max_pred = Some(0);
            for &p in &predecessors[i] {
                match columns[p] {
                    Some(c) => max_pred = max_pred.map(|m: u32| m.max(c)),
                    None => {
                        max_pred = None;
                        break;
                    }
                }
            }
            if let Some(m) = max_pred {
                columns[i] = Some(m + 1);
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    columns.into_iter().map(|c| c.unwrap_or(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TaskGraph;

    fn layout_by_name(
        graph: &TaskGraph,
        config: &LayoutConfig,
    ) -> FxHashMap<String, Point> {
        let snapshot = graph.snapshot();
        let points = compute_layout(&snapshot, config);
        snapshot
            .iter()
            .map(|t| (t.name.clone(), points[&t.id]))
            .collect()
    }

    #[test]
    fn test_chain_stays_on_one_row() {
        let mut graph = TaskGraph::new();
        graph.add_task("a", "", "", 2).unwrap();
        graph.add_task("b", "a", "", 3).unwrap();
        graph.add_task("c", "b", "", 1).unwrap();

        let config = LayoutConfig::default();
        let by_name = layout_by_name(&graph, &config);

        for (i, name) in ["Start", "a", "b", "c", "End"].iter().enumerate() {
            let p = by_name[*name];
            assert_eq!(p.x, 5 + 180 * i as i32, "x of {name}");
            assert_eq!(p.y, 375, "y of {name}");
        }
    }

    #[test]
    fn test_diamond_fans_symmetrically() {
        let mut graph = TaskGraph::new();
        graph.add_task("a", "", "", 2).unwrap();
        graph.add_task("b", "", "", 2).unwrap();

        let by_name = layout_by_name(&graph, &LayoutConfig::default());

        // a and b share the sibling group under Start and fan one row
        // above and below the median; End returns to the middle.
        assert_eq!(by_name["Start"].y, 375);
        assert_eq!(by_name["a"].y, 375 - 80);
        assert_eq!(by_name["b"].y, 375 + 80);
        assert_eq!(by_name["End"].y, 375);
        assert_eq!(by_name["End"].x, 5 + 2 * 180);
    }

    #[test]
    fn test_three_siblings_fan_with_middle_on_median() {
        let mut graph = TaskGraph::new();
        graph.add_task("a", "", "", 1).unwrap();
        graph.add_task("b", "", "", 1).unwrap();
        graph.add_task("c", "", "", 1).unwrap();

        let by_name = layout_by_name(&graph, &LayoutConfig::default());

        assert_eq!(by_name["a"].y, 375 - 2 * 80);
        assert_eq!(by_name["b"].y, 375);
        assert_eq!(by_name["c"].y, 375 + 2 * 80);
    }

    #[test]
    fn test_every_task_receives_one_point() {
        let mut graph = TaskGraph::new();
        graph.add_task("a", "", "", 2).unwrap();
        graph.add_task("b", "a", "", 3).unwrap();
        graph.add_task("c", "", "b", 1).unwrap();

        let snapshot = graph.snapshot();
        let points = compute_layout(&snapshot, &LayoutConfig::default());
        assert_eq!(points.len(), snapshot.len());
        for task in &snapshot {
            assert!(points.contains_key(&task.id));
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let mut graph = TaskGraph::new();
        graph.add_task("a", "", "", 2).unwrap();
        graph.add_task("b", "", "", 4).unwrap();
        graph.add_task("c", "a,b", "", 1).unwrap();
        graph.add_task("d", "a", "c", 2).unwrap();

        let snapshot = graph.snapshot();
        let config = LayoutConfig::default();
        let first = compute_layout(&snapshot, &config);
        let second = compute_layout(&snapshot, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_columns_follow_longest_path() {
        // 0 -> 1 -> 3, 0 -> 3: node 3 lands one past node 1.
        let predecessors = vec![vec![], vec![0], vec![0], vec![1, 0]];
        let columns = assign_columns(&predecessors);
        assert_eq!(columns, vec![0, 1, 1, 2]);
    }
}
