//! Integer ordering keys for sibling groups.
//!
//! Lists, sections and tasks all carry a `position`; items sharing a
//! container form a sibling group ordered by it. Reordering always renumbers
//! the whole group to `10, 20, 30, ...`, so positions stay unique and leave
//! room for appends without touching existing rows.

/// Distance between consecutive positions after a renumber.
pub const POSITION_GAP: i64 = 10;

/// Position for an item appended after `max_position` (the group's current
/// maximum, or `None` for an empty group).
pub fn next_position(max_position: Option<i64>) -> i64 {
    max_position.map_or(POSITION_GAP, |max| max + POSITION_GAP)
}

/// Inserts `moved` into `siblings` at `target_index` and renumbers the group.
///
/// `siblings` is the rest of the group in current display order and must not
/// contain `moved`. A negative index clamps to the front and an index past the
/// end clamps to the back. Returns `(id, position)` for every member of the
/// group in the new order.
pub fn reorder(moved: i64, siblings: &[i64], target_index: i64) -> Vec<(i64, i64)> {
    let index = target_index.clamp(0, siblings.len() as i64) as usize;

    let mut ordered = Vec::with_capacity(siblings.len() + 1);
    ordered.extend_from_slice(&siblings[..index]);
    ordered.push(moved);
    ordered.extend_from_slice(&siblings[index..]);

    renumber(&ordered)
}

/// Assigns `10, 20, 30, ...` to `ids` in the given order.
pub fn renumber(ids: &[i64]) -> Vec<(i64, i64)> {
    ids.iter()
        .zip(1..)
        .map(|(id, rank)| (*id, rank * POSITION_GAP))
        .collect()
}
