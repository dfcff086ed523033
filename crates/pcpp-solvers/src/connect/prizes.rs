//! Net prizes of cycles: greedily accumulated coverage penalties minus the
//! cycle's touring cost.
//!
//! Penalties are absorbed first come, first served in the given cycle
//! order: the first cycle covering a vertex absorbs the head of its penalty
//! vector, later cycles (or repeated visits by the same cycle) absorb the
//! tail. A cycle covering a mandatory vertex first thereby gets an infinite
//! prize.

use std::collections::HashMap;

use pcpp_core::instance::{GridInstance, VertexId};
use pcpp_core::solution::Cycle;

pub fn calculate_cycle_prizes(instance: &GridInstance, cycles: &[&Cycle]) -> Vec<f64> {
    let mut absorbed: HashMap<VertexId, usize> = HashMap::new();
    let mut prizes = Vec::with_capacity(cycles.len());
    for cycle in cycles {
        let touring_cost: f64 = cycle
            .passages()
            .iter()
            .map(|vp| instance.passage_cost(vp, true))
            .sum();
        let mut prize = -touring_cost;
        for (v, usages) in cycle.covered_vertices() {
            let necessity = instance.coverage(v);
            let start = *absorbed.get(&v).unwrap_or(&0);
            let end = (start + usages).min(necessity.len());
            for i in start..end {
                prize += necessity.penalty_for_skipping(i);
            }
            *absorbed.entry(v).or_insert(0) += usages;
        }
        prizes.push(prize);
    }
    prizes
}
