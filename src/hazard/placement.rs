//! Fair anchor selection for the hazard.
//!
//! Every anchor whose lethal footprint is clear is scored by the summed
//! Manhattan distance to all live agent heads and by the variance of those
//! distances. The most remote `top_fraction` of candidates is kept, and the
//! least-variance one among them wins.

use crate::geometry::Cell;
use crate::grid::ItemKind;
use crate::query::EntityQuery;
use std::cmp::Ordering;

/// A scored anchor
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementCandidate {
    pub anchor: Cell,
    pub distance_sum: i64,
    pub distance_variance: f64,
}

/// Population variance
fn variance(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<i64>() as f64 / n;
    values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n
}

fn footprint_clear<Q: EntityQuery + ?Sized>(query: &Q, anchor: Cell, size: i32) -> bool {
    (0..size).all(|dx| {
        (0..size).all(|dy| {
            !query.is_position_occupied(
                Cell::new(anchor.x + dx, anchor.y + dy),
                &[ItemKind::Obstacle, ItemKind::Segment],
            )
        })
    })
}

/// Score every anchor in a `columns` x `rows` arena whose footprint is clear.
///
/// Candidates come back in scan order (column-major). Empty when there are no
/// live agents or no clear anchor.
pub fn rank_candidates<Q: EntityQuery + ?Sized>(
    query: &Q,
    columns: i32,
    rows: i32,
    lethal_size: i32,
) -> Vec<PlacementCandidate> {
    let heads: Vec<Cell> = query.live_agents().iter().map(|a| a.head()).collect();
    if heads.is_empty() {
        return Vec::new();
    }

    let size = lethal_size.max(1);
    let mut candidates = Vec::new();
    for cx in 0..=(columns - size) {
        for cy in 0..=(rows - size) {
            let anchor = Cell::new(cx, cy);
            if !footprint_clear(query, anchor, size) {
                continue;
            }
            let distances: Vec<i64> = heads.iter().map(|&h| anchor.manhattan(h) as i64).collect();
            candidates.push(PlacementCandidate {
                anchor,
                distance_sum: distances.iter().sum(),
                distance_variance: variance(&distances),
            });
        }
    }
    candidates
}

/// Pick the fairest remote anchor, or `None` when nothing qualifies
pub fn find_fair_anchor<Q: EntityQuery + ?Sized>(
    query: &Q,
    columns: i32,
    rows: i32,
    lethal_size: i32,
    top_fraction: f64,
) -> Option<PlacementCandidate> {
    let mut candidates = rank_candidates(query, columns, rows, lethal_size);
    if candidates.is_empty() {
        return None;
    }

    // Stable sorts keep scan order among ties
    candidates.sort_by(|a, b| b.distance_sum.cmp(&a.distance_sum));
    let keep = ((candidates.len() as f64 * top_fraction.clamp(0.0, 1.0)).floor() as usize).max(1);
    candidates.truncate(keep);

    candidates.sort_by(|a, b| {
        a.distance_variance
            .partial_cmp(&b.distance_variance)
            .unwrap_or(Ordering::Equal)
    });
    candidates.into_iter().next()
}
