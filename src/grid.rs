//! Bucketed spatial index for fast proximity lookups.
//!
//! The plane is partitioned into square buckets of `bucket_size` cells. Every
//! registered item lives in exactly one bucket; moving across a bucket
//! boundary transfers it in O(1) by swap-removing from the old bucket.
//! Queries union all buckets overlapping the query square, so they never miss
//! an item but may return extra ones: callers filter for the exact cell.

use crate::geometry::Cell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier handed out by [`SpatialIndex::insert`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// Category tag of a registered item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Segment,
    Obstacle,
    Food,
    Key,
    Chest,
}

/// A registered item
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridItem {
    pub id: ItemId,
    pub position: Cell,
    pub kind: ItemKind,
}

#[derive(Clone, Debug)]
struct Slot {
    item: GridItem,
    bucket: (i32, i32),
    /// Index of this item inside its bucket vector
    offset: usize,
}

/// Spatial index over grid items
#[derive(Clone, Debug)]
pub struct SpatialIndex {
    bucket_size: i32,
    buckets: HashMap<(i32, i32), Vec<ItemId>>,
    items: HashMap<ItemId, Slot>,
    next_id: u64,
}

impl SpatialIndex {
    /// Create an index whose buckets are `bucket_size` cells wide.
    ///
    /// The size should be at least the largest radius the caller will query
    /// with; values below 1 are raised to 1.
    pub fn new(bucket_size: i32) -> Self {
        Self {
            bucket_size: bucket_size.max(1),
            buckets: HashMap::new(),
            items: HashMap::new(),
            next_id: 0,
        }
    }

    #[inline]
    fn bucket_of(&self, cell: Cell) -> (i32, i32) {
        (cell.x.div_euclid(self.bucket_size), cell.y.div_euclid(self.bucket_size))
    }

    /// Remove all entries and restart id allocation
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.items.clear();
        self.next_id = 0;
    }

    /// Register an item and return its id
    pub fn insert(&mut self, position: Cell, kind: ItemKind) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;

        let bucket = self.bucket_of(position);
        let entries = self.buckets.entry(bucket).or_default();
        let offset = entries.len();
        entries.push(id);

        self.items.insert(
            id,
            Slot {
                item: GridItem { id, position, kind },
                bucket,
                offset,
            },
        );
        id
    }

    /// Detach `id` from its bucket, patching the offset of the item moved into its place
    fn detach(&mut self, id: ItemId, bucket: (i32, i32), offset: usize) {
        let mut emptied = false;
        if let Some(entries) = self.buckets.get_mut(&bucket) {
            if offset < entries.len() && entries[offset] == id {
                entries.swap_remove(offset);
                if let Some(&moved) = entries.get(offset) {
                    if let Some(slot) = self.items.get_mut(&moved) {
                        slot.offset = offset;
                    }
                }
            }
            emptied = entries.is_empty();
        }
        if emptied {
            self.buckets.remove(&bucket);
        }
    }

    /// Move an item. Unknown ids are ignored.
    pub fn update(&mut self, id: ItemId, position: Cell) {
        let new_bucket = self.bucket_of(position);
        let (old_bucket, old_offset) = match self.items.get_mut(&id) {
            Some(slot) => {
                slot.item.position = position;
                if slot.bucket == new_bucket {
                    return;
                }
                (slot.bucket, slot.offset)
            }
            None => return,
        };

        self.detach(id, old_bucket, old_offset);

        let entries = self.buckets.entry(new_bucket).or_default();
        let offset = entries.len();
        entries.push(id);
        if let Some(slot) = self.items.get_mut(&id) {
            slot.bucket = new_bucket;
            slot.offset = offset;
        }
    }

    /// Remove an item. Unknown ids and repeated removals are ignored.
    pub fn remove(&mut self, id: ItemId) {
        if let Some(slot) = self.items.remove(&id) {
            self.detach(id, slot.bucket, slot.offset);
        }
    }

    /// Look up a single item
    #[inline]
    pub fn get(&self, id: ItemId) -> Option<&GridItem> {
        self.items.get(&id).map(|slot| &slot.item)
    }

    #[inline]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Candidate items within `radius` cells of `position`, optionally filtered by kind.
    ///
    /// Superset of the exact answer: every item within Euclidean distance
    /// `radius` is included.
    pub fn query_near(&self, position: Cell, radius: i32, kind: Option<ItemKind>) -> Vec<GridItem> {
        let radius = radius.max(0);
        let (bx_min, by_min) = self.bucket_of(Cell::new(position.x - radius, position.y - radius));
        let (bx_max, by_max) = self.bucket_of(Cell::new(position.x + radius, position.y + radius));

        let mut results = Vec::new();
        for by in by_min..=by_max {
            for bx in bx_min..=bx_max {
                let Some(entries) = self.buckets.get(&(bx, by)) else {
                    continue;
                };
                for id in entries {
                    if let Some(slot) = self.items.get(id) {
                        if kind.map_or(true, |k| slot.item.kind == k) {
                            results.push(slot.item);
                        }
                    }
                }
            }
        }
        results
    }

    /// Items sitting exactly on `position`
    pub fn items_at(&self, position: Cell) -> Vec<GridItem> {
        let mut found = self.query_near(position, 0, None);
        found.retain(|item| item.position == position);
        found
    }

    /// Check whether `position` holds an item of any of `kinds`
    pub fn is_occupied(&self, position: Cell, kinds: &[ItemKind]) -> bool {
        let bucket = self.bucket_of(position);
        self.buckets.get(&bucket).map_or(false, |entries| {
            entries.iter().any(|id| {
                self.items
                    .get(id)
                    .map_or(false, |slot| slot.item.position == position && kinds.contains(&slot.item.kind))
            })
        })
    }

    /// Number of registered items
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn bucket_size(&self) -> i32 {
        self.bucket_size
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(2)
    }
}
