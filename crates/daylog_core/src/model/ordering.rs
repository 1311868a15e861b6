//! Dense per-container ordering.
//!
//! # Responsibility
//! - Compute canonical member order for one container.
//! - Plan insert/move/delete resequencing as pure sort-order assignments.
//!
//! # Invariants
//! - Every plan assigns `0..n` to the container members it covers, once each.
//! - Canonical order is `sort_order ASC, created_at ASC, insertion_seq ASC`,
//!   so equal sort orders never flap between reads.
//! - Target indices are clamped against the container size after the moved
//!   item has been taken out.

use uuid::Uuid;

/// Ordering-relevant snapshot of one container member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEntry {
    pub id: Uuid,
    pub sort_order: i64,
    pub created_at: i64,
    /// Storage insertion sequence; last-resort tie-breaker.
    pub insertion_seq: i64,
}

/// New position for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub id: Uuid,
    /// Position before the plan; `None` when the member is new to the container.
    pub previous: Option<i64>,
    pub sort_order: i64,
}

impl Assignment {
    pub fn is_changed(&self) -> bool {
        self.previous != Some(self.sort_order)
    }
}

/// Result of planning a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    /// Full target container order, including the moved item.
    pub target: Vec<Assignment>,
    /// Remaining source container order; empty for same-container moves.
    pub source: Vec<Assignment>,
    /// Index the moved item landed at.
    pub placed_index: usize,
}

/// Returns members sorted into canonical display order.
pub fn canonical_order(entries: &[OrderEntry]) -> Vec<OrderEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.insertion_seq.cmp(&b.insertion_seq))
    });
    sorted
}

/// Reassigns `0..n` in canonical order.
pub fn normalize(entries: &[OrderEntry]) -> Vec<Assignment> {
    assign(&canonical_order(entries))
}

/// Clamps `index` into `0..=len`.
pub fn clamp_index(index: i64, len: usize) -> usize {
    index.clamp(0, len as i64) as usize
}

/// Splices `item` into `ids` at the clamped `index`; returns the landing index.
pub fn insert_at(ids: &mut Vec<Uuid>, item: Uuid, index: i64) -> usize {
    let position = clamp_index(index, ids.len());
    ids.insert(position, item);
    position
}

/// Plans adding a brand-new member at `index`.
///
/// Appending uses `index = n`.
pub fn plan_insert(container: &[OrderEntry], item: Uuid, index: i64) -> MovePlan {
    let ordered = canonical_order(container);
    let mut ids: Vec<Uuid> = ordered
        .iter()
        .map(|entry| entry.id)
        .filter(|id| *id != item)
        .collect();
    let placed_index = insert_at(&mut ids, item, index);
    MovePlan {
        target: assign_ids(&ids, &ordered),
        source: Vec::new(),
        placed_index,
    }
}

/// Plans moving `item` inside its own container.
pub fn plan_move_within(container: &[OrderEntry], item: Uuid, index: i64) -> MovePlan {
    plan_insert(container, item, index)
}

/// Plans moving `item` from `source` into `target` at `index`.
///
/// `target` is read without the moved item; any stray copy is ignored.
pub fn plan_move_across(
    source: &[OrderEntry],
    target: &[OrderEntry],
    item: Uuid,
    index: i64,
) -> MovePlan {
    let ordered_target: Vec<OrderEntry> = canonical_order(target)
        .into_iter()
        .filter(|entry| entry.id != item)
        .collect();
    let mut ids: Vec<Uuid> = ordered_target.iter().map(|entry| entry.id).collect();
    let placed_index = insert_at(&mut ids, item, index);

    let remaining: Vec<OrderEntry> = canonical_order(source)
        .into_iter()
        .filter(|entry| entry.id != item)
        .collect();

    MovePlan {
        target: assign_ids(&ids, &ordered_target),
        source: assign(&remaining),
        placed_index,
    }
}

/// Plans closing the gap left by removing `item`.
pub fn plan_remove(container: &[OrderEntry], item: Uuid) -> Vec<Assignment> {
    let remaining: Vec<OrderEntry> = canonical_order(container)
        .into_iter()
        .filter(|entry| entry.id != item)
        .collect();
    assign(&remaining)
}

/// Returns whether `orders` is exactly `{0, .., n-1}`.
pub fn is_dense(orders: &[i64]) -> bool {
    let mut sorted = orders.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(index, value)| *value == index as i64)
}

fn assign(ordered: &[OrderEntry]) -> Vec<Assignment> {
    ordered
        .iter()
        .enumerate()
        .map(|(index, entry)| Assignment {
            id: entry.id,
            previous: Some(entry.sort_order),
            sort_order: index as i64,
        })
        .collect()
}

fn assign_ids(ids: &[Uuid], known: &[OrderEntry]) -> Vec<Assignment> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| Assignment {
            id: *id,
            previous: known
                .iter()
                .find(|entry| entry.id == *id)
                .map(|entry| entry.sort_order),
            sort_order: index as i64,
        })
        .collect()
}
