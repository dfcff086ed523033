//! The prize-collecting Steiner tree over cycles.
//!
//! A MIP with binary node and edge variables: selected edges must hang off
//! selected nodes, the selection forms a tree by cardinality, and
//! connectivity is enforced by cut-set constraints separated iteratively --
//! after each solve the selected components are computed and every
//! component pair gets a constraint forcing an outgoing edge, until one
//! component remains. Nodes with infinite prize are forced into the tree.

use std::collections::{HashMap, HashSet};

use good_lp::solvers::highs::highs;
use good_lp::{Expression, Solution, SolverModel, Variable, constraint, variable, variables};
use log::debug;

use crate::error::SolverError;

/// A PCST instance on cycle indices: node prizes (possibly infinite) and
/// weighted candidate connections.
pub struct PcstProblem {
    pub prizes: Vec<f64>,
    pub edges: Vec<(usize, usize, f64)>,
}

/// The selected subgraph.
pub struct PcstSelection {
    pub nodes: Vec<usize>,
    pub edges: Vec<(usize, usize)>,
}

/// One additional cut: the edges leaving a node set must carry flow if two
/// nodes on opposite sides are both selected.
struct CutSet {
    component: HashSet<usize>,
    inside: usize,
    outside: usize,
}

pub fn solve_pcst(problem: &PcstProblem) -> Result<PcstSelection, SolverError> {
    let node_count = problem.prizes.len();
    debug_assert!(node_count >= 1);
    let mut cuts: Vec<CutSet> = Vec::new();
    loop {
        let selection = solve_with_cuts(problem, &cuts)?;
        let components = connected_components(&selection);
        if components.len() <= 1 {
            debug!("prize-collecting tree selects {} cycles", selection.nodes.len());
            return Ok(selection);
        }
        debug!(
            "prize-collecting tree split into {} components, separating",
            components.len()
        );
        for i in 0..components.len() {
            for j in i + 1..components.len() {
                cuts.push(CutSet {
                    component: components[i].iter().copied().collect(),
                    inside: components[i][0],
                    outside: components[j][0],
                });
            }
        }
    }
}

fn solve_with_cuts(
    problem: &PcstProblem,
    cuts: &[CutSet],
) -> Result<PcstSelection, SolverError> {
    let node_count = problem.prizes.len();
    let mut vars = variables!();
    let mut objective = Expression::from(0.0);

    let mut node_vars: Vec<Variable> = Vec::with_capacity(node_count);
    for &prize in &problem.prizes {
        let var = vars.add(variable().binary());
        if prize.is_finite() {
            objective += -prize * var;
        }
        node_vars.push(var);
    }
    let mut edge_vars: Vec<Variable> = Vec::with_capacity(problem.edges.len());
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for (index, &(a, b, weight)) in problem.edges.iter().enumerate() {
        let var = vars.add(variable().binary());
        objective += weight * var;
        edge_vars.push(var);
        incident[a].push(index);
        incident[b].push(index);
    }

    let mut model = vars.minimise(objective).using(highs);

    for (n, &prize) in problem.prizes.iter().enumerate() {
        if prize.is_infinite() {
            let y = node_vars[n];
            model = model.with(constraint!(y == 1.0));
        }
        // Edges may only hang off selected nodes.
        let mut degree = Expression::from(0.0);
        for &index in &incident[n] {
            degree += edge_vars[index];
        }
        let activation = node_count as f64 * node_vars[n];
        model = model.with(constraint!(degree <= activation));
    }

    // Tree cardinality: one edge less than nodes.
    let mut edge_sum = Expression::from(0.0);
    for &var in &edge_vars {
        edge_sum += var;
    }
    let mut node_sum = Expression::from(0.0);
    for &var in &node_vars {
        node_sum += var;
    }
    model = model.with(constraint!(edge_sum == node_sum - 1.0));

    for cut in cuts {
        let mut outgoing = Expression::from(0.0);
        for (index, &(a, b, _)) in problem.edges.iter().enumerate() {
            if cut.component.contains(&a) != cut.component.contains(&b) {
                outgoing += edge_vars[index];
            }
        }
        let inside = node_vars[cut.inside];
        let outside = node_vars[cut.outside];
        model = model.with(constraint!(outgoing >= inside + outside - 1.0));
    }

    let solved = model.solve()?;

    let nodes: Vec<usize> = (0..node_count)
        .filter(|&n| solved.value(node_vars[n]) > 0.5)
        .collect();
    let edges: Vec<(usize, usize)> = problem
        .edges
        .iter()
        .zip(&edge_vars)
        .filter(|(_, &var)| solved.value(var) > 0.5)
        .map(|(&(a, b, _), _)| (a, b))
        .collect();
    Ok(PcstSelection { nodes, edges })
}

fn connected_components(selection: &PcstSelection) -> Vec<Vec<usize>> {
    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for &n in &selection.nodes {
        adjacency.entry(n).or_default();
    }
    for &(a, b) in &selection.edges {
        adjacency.entry(a).or_default().push(b);
        adjacency.entry(b).or_default().push(a);
    }
    let mut seen: HashSet<usize> = HashSet::new();
    let mut components = Vec::new();
    for &start in &selection.nodes {
        if seen.contains(&start) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        seen.insert(start);
        while let Some(n) = stack.pop() {
            component.push(n);
            for &next in adjacency.get(&n).into_iter().flatten() {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        components.push(component);
    }
    components
}
