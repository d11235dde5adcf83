//! Multipoint relay selection
//!
//! Chooses the smallest practical subset of symmetric neighbors through
//! which every two-hop neighbor can be reached. Only relays rebroadcast
//! flooded control traffic, which is what keeps flooding overhead linear
//! in the relay set instead of the neighbor set.
//!
//! Selection follows the classic heuristic: always-willing neighbors are
//! taken unconditionally, neighbors that are the sole path to some two-hop
//! node are forced picks, and the remainder is covered greedily by
//! whichever candidate reaches the most still-uncovered nodes. Ties go to
//! the higher willingness, then to table order, which keeps the result
//! stable across recomputations with unchanged input.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::domain::{NodeId, Willingness};
use crate::tables::{NeighborTable, TwoHopTable};

/// Result of one relay-set computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MprSelection {
    /// The chosen relays, in selection order.
    pub selected: Vec<NodeId>,
    /// Two-hop nodes no candidate could cover. Usually empty; non-empty
    /// means the two-hop set references neighbors that are gone or
    /// unwilling, which resolves itself as those entries age out.
    pub uncovered: Vec<NodeId>,
}

impl MprSelection {
    /// Whether `id` was chosen as a relay.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }
}

/// Recomputes the relay set from the current neighborhood.
///
/// Clears and re-marks the `is_mpr` flag on every neighbor. The relay set
/// is empty whenever there are no two-hop neighbors to cover.
pub fn recompute(neighbors: &mut NeighborTable, two_hop: &TwoHopTable) -> MprSelection {
    for neighbor in neighbors.iter_mut() {
        neighbor.is_mpr = false;
    }

    if two_hop.is_empty() {
        return MprSelection::default();
    }

    // Candidate relays and what each one reaches.
    let candidates: Vec<Candidate> = neighbors
        .symmetric()
        .filter(|n| n.willingness != Willingness::Never)
        .map(|n| Candidate {
            id: n.id,
            willingness: n.willingness,
            reaches: two_hop.reachable_via(n.id),
        })
        .collect();

    let mut uncovered: Vec<NodeId> = two_hop.ids();
    let mut selected: Vec<NodeId> = Vec::new();

    // Always-willing neighbors relay unconditionally.
    for candidate in &candidates {
        if candidate.willingness == Willingness::Always {
            cover(&mut uncovered, &candidate.reaches);
            selected.push(candidate.id);
        }
    }

    // A two-hop node with a single possible relay forces that pick.
    let forced: Vec<NodeId> = uncovered
        .iter()
        .filter_map(|&target| {
            let mut vias = candidates.iter().filter(|c| c.reaches.contains(&target));
            match (vias.next(), vias.next()) {
                (Some(only), None) => Some(only.id),
                _ => None,
            }
        })
        .collect();
    for via in forced {
        if !selected.contains(&via) {
            if let Some(candidate) = candidates.iter().find(|c| c.id == via) {
                cover(&mut uncovered, &candidate.reaches);
                selected.push(via);
            }
        }
    }

    // Greedy cover for the rest: most newly-covered nodes wins, then
    // willingness, then table order.
    while !uncovered.is_empty() {
        let mut best: Option<(&Candidate, usize)> = None;
        for candidate in &candidates {
            if selected.contains(&candidate.id) {
                continue;
            }
            let gain = candidate
                .reaches
                .iter()
                .filter(|id| uncovered.contains(id))
                .count();
            if gain == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, current_gain)) => {
                    gain > current_gain
                        || (gain == current_gain && candidate.willingness > current.willingness)
                }
            };
            if better {
                best = Some((candidate, gain));
            }
        }
        let Some((winner, gain)) = best else {
            debug!(remaining = uncovered.len(), "two-hop nodes left uncovered");
            break;
        };
        trace!(relay = %winner.id, covered = gain, "greedy relay pick");
        cover(&mut uncovered, &winner.reaches);
        selected.push(winner.id);
    }

    for &id in &selected {
        if let Some(neighbor) = neighbors.find_mut(id) {
            neighbor.is_mpr = true;
        }
    }

    MprSelection {
        selected,
        uncovered,
    }
}

struct Candidate {
    id: NodeId,
    willingness: Willingness,
    reaches: Vec<NodeId>,
}

fn cover(uncovered: &mut Vec<NodeId>, reached: &[NodeId]) {
    let reached: HashSet<&NodeId> = reached.iter().collect();
    uncovered.retain(|id| !reached.contains(id));
}
