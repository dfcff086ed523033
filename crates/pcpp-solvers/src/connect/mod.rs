/*!
Connecting a cycle cover into a single tour.

Cycles become nodes of a small graph: prizes are their greedily accumulated
coverage penalties minus their touring costs, edge weights the cheapest
direction-aware merge costs. Negative-weight connections are contracted
greedily, the cost graph is recomputed, a prize-collecting Steiner tree
selects the profitable connected subset (mandatory cycles forced), and the
selection is merged into one tour along a DFS postorder.
 */

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use pcpp_core::instance::GridInstance;
use pcpp_core::solution::Cycle;

use crate::error::SolverError;

mod dijkstra;
mod intersect;
mod merger;
mod pcst;
mod prizes;
mod shortest_path;

pub use dijkstra::{DirectedEdge, DirectedEdgeDijkstra, EdgeCostFunction};
pub use intersect::IntersectingPassageConnection;
pub use merger::{CheapestCycleConnection, CycleMerger};
pub use pcst::{PcstProblem, PcstSelection, solve_pcst};
pub use prizes::calculate_cycle_prizes;
pub use shortest_path::PassageShortestPath;

struct Slot<'a> {
    cycle: Cycle,
    merger: Option<CycleMerger<'a>>,
}

/// The merge bookkeeping over a cycle cover: alive cycles, their mergers,
/// and redirects from merged-away cycles to their successors.
struct CycleMergeGraph<'a> {
    instance: &'a GridInstance,
    slots: Vec<Slot<'a>>,
    alive: Vec<usize>,
    redirect: HashMap<usize, usize>,
}

impl<'a> CycleMergeGraph<'a> {
    fn new(instance: &'a GridInstance, cycle_cover: Vec<Cycle>) -> Self {
        let slots = cycle_cover
            .into_iter()
            .map(|cycle| Slot {
                merger: Some(CycleMerger::new(instance, cycle.clone())),
                cycle,
            })
            .collect::<Vec<_>>();
        let alive = (0..slots.len()).collect();
        Self {
            instance,
            slots,
            alive,
            redirect: HashMap::new(),
        }
    }

    fn resolve(&self, mut slot: usize) -> usize {
        while let Some(&next) = self.redirect.get(&slot) {
            slot = next;
        }
        slot
    }

    fn alive_cycles(&self) -> Vec<Cycle> {
        self.alive
            .iter()
            .map(|&slot| self.slots[slot].cycle.clone())
            .collect()
    }

    /// The current cost graph: alive slot ids, their prizes and the
    /// pairwise connection costs (indices into the returned slot list).
    fn cost_graph(&mut self) -> (Vec<usize>, Vec<f64>, Vec<(usize, usize, f64)>) {
        let cycles = self.alive_cycles();
        let refs: Vec<&Cycle> = cycles.iter().collect();
        let prizes = calculate_cycle_prizes(self.instance, &refs);
        let mut edges = Vec::new();
        for i in 0..self.alive.len() {
            let slot = self.alive[i];
            let merger = self.slots[slot]
                .merger
                .as_mut()
                .expect("alive slots keep their merger");
            for (j, cycle) in cycles.iter().enumerate().skip(i + 1) {
                edges.push((i, j, merger.estimate_cost(cycle)));
            }
        }
        (self.alive.clone(), prizes, edges)
    }

    /// Merges two cycles (slot ids; redirects are followed). No-op when
    /// both resolve to the same cycle.
    fn merge(&mut self, a: usize, b: usize) -> Result<(), SolverError> {
        let a = self.resolve(a);
        let b = self.resolve(b);
        if a == b {
            return Ok(());
        }
        let other = self.slots[b].cycle.clone();
        let mut merger = self.slots[a]
            .merger
            .take()
            .expect("alive slots keep their merger");
        let merged = merger.merge(&other)?;
        let new_slot = self.slots.len();
        self.slots.push(Slot {
            cycle: merged,
            merger: Some(merger),
        });
        self.alive.retain(|&slot| slot != a && slot != b);
        self.alive.push(new_slot);
        self.redirect.insert(a, new_slot);
        self.redirect.insert(b, new_slot);
        Ok(())
    }

    /// Contracts every connection that is profitable on its own.
    fn greedy_connect_free(&mut self) -> Result<(), SolverError> {
        let (slots, _, mut edges) = self.cost_graph();
        edges.sort_by(|a, b| a.2.total_cmp(&b.2));
        for (i, j, weight) in edges {
            if weight < 0.0 {
                self.merge(slots[i], slots[j])?;
            }
        }
        Ok(())
    }
}

/// Postorder of a DFS from `root` over the selected tree edges.
fn dfs_postorder(adjacency: &HashMap<usize, Vec<usize>>, root: usize) -> Vec<usize> {
    let mut order = Vec::new();
    let mut visited = HashSet::from([root]);
    let mut stack = vec![(root, false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        stack.push((node, true));
        for &next in adjacency.get(&node).into_iter().flatten() {
            if visited.insert(next) {
                stack.push((next, false));
            }
        }
    }
    order
}

/// Connects a cycle cover into a single tour, or `None` when no connection
/// is profitable (resp. the cover is empty).
pub fn connect_cycles_via_pcst(
    instance: &GridInstance,
    mut cycle_cover: Vec<Cycle>,
) -> Result<Option<Cycle>, SolverError> {
    if cycle_cover.is_empty() {
        return Ok(None);
    }
    if cycle_cover.len() == 1 {
        debug!("cycle cover is already connected");
        return Ok(cycle_cover.pop());
    }
    info!("connecting {} cycles", cycle_cover.len());
    let mut graph = CycleMergeGraph::new(instance, cycle_cover);
    graph.greedy_connect_free()?;
    debug!("{} cycles remain after free merges", graph.alive.len());

    // The free merges invalidated the old connection costs; rebuild the
    // graph before the tree selection.
    let (slots, prizes, edges) = graph.cost_graph();
    let kept: Vec<usize> = (0..slots.len()).filter(|&i| prizes[i] >= 0.0).collect();
    if kept.is_empty() {
        return Ok(None);
    }
    if kept.len() == 1 {
        return Ok(Some(graph.slots[slots[kept[0]]].cycle.clone()));
    }
    let local_of: HashMap<usize, usize> = kept.iter().enumerate().map(|(l, &i)| (i, l)).collect();
    let problem = PcstProblem {
        prizes: kept.iter().map(|&i| prizes[i]).collect(),
        edges: edges
            .iter()
            .filter_map(|&(i, j, w)| {
                Some((*local_of.get(&i)?, *local_of.get(&j)?, w))
            })
            .collect(),
    };
    let selection = solve_pcst(&problem)?;
    if selection.nodes.is_empty() {
        return Ok(None);
    }

    // Merge the selected cycles along the tree, children before parents.
    let selected_slots: Vec<usize> = selection.nodes.iter().map(|&l| slots[kept[l]]).collect();
    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(a, b) in &selection.edges {
        let (a, b) = (slots[kept[a]], slots[kept[b]]);
        adjacency.entry(a).or_default().push(b);
        adjacency.entry(b).or_default().push(a);
    }
    let root = selected_slots[0];
    let mut merger = CycleMerger::new(instance, graph.slots[root].cycle.clone());
    for slot in dfs_postorder(&adjacency, root) {
        if slot != root {
            merger.merge(&graph.slots[slot].cycle.clone())?;
        }
    }
    Ok(Some(merger.cycle().clone()))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pcpp_core::geometry::Point;
    use pcpp_core::instance::{
        CoverageNecessities, CoverageNecessity, Grid, SimpleTouringCosts, VertexId,
        VertexPassage,
    };

    use super::*;

    fn square_cycle(ids: &[VertexId; 4]) -> Cycle {
        Cycle::new(vec![
            VertexPassage::new(ids[0], ids[3], ids[1]),
            VertexPassage::new(ids[1], ids[0], ids[2]),
            VertexPassage::new(ids[2], ids[1], ids[3]),
            VertexPassage::new(ids[3], ids[2], ids[0]),
        ])
    }

    /// Two unit squares with a two-edge corridor and configurable coverage.
    fn dumbbell(
        coverage: CoverageNecessities,
    ) -> (GridInstance, Vec<Cycle>) {
        let mut grid = Grid::new();
        let a = [
            grid.add_vertex(Point::new(0.0, 0.0)),
            grid.add_vertex(Point::new(1.0, 0.0)),
            grid.add_vertex(Point::new(1.0, 1.0)),
            grid.add_vertex(Point::new(0.0, 1.0)),
        ];
        let b = [
            grid.add_vertex(Point::new(3.0, 0.0)),
            grid.add_vertex(Point::new(4.0, 0.0)),
            grid.add_vertex(Point::new(4.0, 1.0)),
            grid.add_vertex(Point::new(3.0, 1.0)),
        ];
        for ids in [&a, &b] {
            for i in 0..4 {
                grid.add_edge(ids[i], ids[(i + 1) % 4]).unwrap();
            }
        }
        let gap = grid.add_vertex(Point::new(2.0, 0.0));
        grid.add_edge(a[1], gap).unwrap();
        grid.add_edge(gap, b[0]).unwrap();
        let instance =
            GridInstance::new(grid, Box::new(SimpleTouringCosts::new(0.0, 1.0)), coverage)
                .unwrap();
        (instance, vec![square_cycle(&a), square_cycle(&b)])
    }

    #[test]
    fn test_mandatory_cycles_are_merged() {
        let mut coverage = CoverageNecessities::new(CoverageNecessity::optional());
        for i in [0usize, 1, 2, 3, 4, 5, 6, 7] {
            coverage.set(VertexId(i), CoverageNecessity::simple());
        }
        let (instance, cycles) = dumbbell(coverage);
        let tour = connect_cycles_via_pcst(&instance, cycles).unwrap().unwrap();
        assert!(tour.is_connected());
        // Both squares plus the doubled two-edge corridor.
        assert_abs_diff_eq!(tour.length(instance.grid()), 12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_unprofitable_connection_keeps_one_cycle() {
        // Each square nets one (five absorbed, four toured); connecting
        // costs the doubled corridor of four. The tree keeps one cycle.
        let coverage = {
            let mut c = CoverageNecessities::new(CoverageNecessity::optional());
            c.set(VertexId(0), CoverageNecessity::penalty(5.0));
            c.set(VertexId(4), CoverageNecessity::penalty(5.0));
            c
        };
        let (instance, cycles) = dumbbell(coverage);
        let tour = connect_cycles_via_pcst(&instance, cycles).unwrap().unwrap();
        assert!(tour.is_connected());
        assert_eq!(tour.len(), 4);
    }

    #[test]
    fn test_profitable_connection_is_made() {
        // Each square nets six; the corridor of four is worth paying.
        let coverage = {
            let mut c = CoverageNecessities::new(CoverageNecessity::optional());
            c.set(VertexId(0), CoverageNecessity::penalty(10.0));
            c.set(VertexId(4), CoverageNecessity::penalty(10.0));
            c
        };
        let (instance, cycles) = dumbbell(coverage);
        let tour = connect_cycles_via_pcst(&instance, cycles).unwrap().unwrap();
        assert!(tour.is_connected());
        assert_abs_diff_eq!(tour.length(instance.grid()), 12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_cover_yields_no_tour() {
        let (instance, _) = dumbbell(CoverageNecessities::new(CoverageNecessity::optional()));
        assert!(
            connect_cycles_via_pcst(&instance, Vec::new())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_worthless_cycles_yield_no_tour() {
        // All coverage optional and distances cost: both cycles have
        // negative prizes and are dropped.
        let (instance, cycles) = dumbbell(CoverageNecessities::new(CoverageNecessity::optional()));
        assert!(
            connect_cycles_via_pcst(&instance, cycles)
                .unwrap()
                .is_none()
        );
    }
}
