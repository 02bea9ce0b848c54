//! Last-broadcast snapshots per target, for suppressing unchanged pushes.
//!
//! Snapshots are compared with [`Snapshot::equivalent`], which ignores item
//! order inside a pool and pool order inside the aggregate list, and treats
//! floats as equal only when their bits match.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tradeup_sdk::objects::{Item, ItemData, Skin, Tradeup, TradeupId};

/// What a broadcast describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotTarget {
    /// The list of every open tradeup.
    AllOpen,
    /// One tradeup by id.
    Tradeup(TradeupId),
}

impl std::fmt::Display for SnapshotTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotTarget::AllOpen => write!(f, "all"),
            SnapshotTarget::Tradeup(id) => write!(f, "tradeup:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    AllOpen(Vec<Tradeup>),
    Tradeup(Tradeup),
}

impl Snapshot {
    pub fn equivalent(&self, other: &Snapshot) -> bool {
        match (self, other) {
            (Snapshot::AllOpen(a), Snapshot::AllOpen(b)) => same_tradeup_sets(a, b),
            (Snapshot::Tradeup(a), Snapshot::Tradeup(b)) => same_tradeup(a, b),
            _ => false,
        }
    }
}

fn same_tradeup_sets(a: &[Tradeup], b: &[Tradeup]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&Tradeup> = a.iter().collect();
    let mut b: Vec<&Tradeup> = b.iter().collect();
    a.sort_by_key(|t| t.id);
    b.sort_by_key(|t| t.id);
    a.iter().zip(&b).all(|(x, y)| same_tradeup(x, y))
}

pub fn same_tradeup(a: &Tradeup, b: &Tradeup) -> bool {
    a.id == b.id
        && a.rarity == b.rarity
        && a.capacity == b.capacity
        && a.status == b.status
        && a.stop_time == b.stop_time
        && a.mode == b.mode
        && a.winner == b.winner
        && same_items(&a.items, &b.items)
}

fn same_items(a: &[Item], b: &[Item]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&Item> = a.iter().collect();
    let mut b: Vec<&Item> = b.iter().collect();
    a.sort_by(|x, y| item_key(x).cmp(&item_key(y)));
    b.sort_by(|x, y| item_key(x).cmp(&item_key(y)));
    a.iter().zip(&b).all(|(x, y)| same_item(x, y))
}

fn item_key(item: &Item) -> (i64, u64) {
    (item.inv_id, item.quality().to_bits())
}

pub fn same_item(a: &Item, b: &Item) -> bool {
    a.inv_id == b.inv_id
        && a.owner == b.owner
        && a.visible == b.visible
        && match (&a.data, &b.data) {
            (ItemData::Skin(x), ItemData::Skin(y)) => same_skin(x, y),
        }
}

fn same_skin(a: &Skin, b: &Skin) -> bool {
    a.id == b.id
        && a.name == b.name
        && a.rarity == b.rarity
        && a.collection == b.collection
        && a.wear == b.wear
        && a.float.to_bits() == b.float.to_bits()
        && a.price == b.price
        && a.is_stat_trak == b.is_stat_trak
        && a.was_won == b.was_won
        && a.img_src == b.img_src
        && a.created_at == b.created_at
}

/// Orders fetches of the same target. Taken before reading the store, so a
/// snapshot fetched under an older ticket never overwrites one fetched
/// under a newer ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug)]
struct Entry {
    snapshot: Snapshot,
    ticket: FetchTicket,
}

/// Last snapshot broadcast for each target.
///
/// Shared by every subscriber of a target and by every task that publishes.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<SnapshotTarget, Entry>>,
    next_ticket: AtomicU64,
}

impl SnapshotCache {
    pub fn ticket(&self) -> FetchTicket {
        FetchTicket(self.next_ticket.fetch_add(1, Ordering::Relaxed))
    }

    /// Record `snapshot` if it differs from the cached one and nothing
    /// fetched under a later ticket is cached. Returns whether it was
    /// recorded, i.e. whether it should be broadcast.
    pub fn replace_if_changed(&self, target: SnapshotTarget, snapshot: Snapshot, ticket: FetchTicket) -> bool {
        let mut entries = self.lock();
        if let Some(last) = entries.get(&target) {
            if last.ticket > ticket || last.snapshot.equivalent(&snapshot) {
                return false;
            }
        }
        entries.insert(target, Entry { snapshot, ticket });
        true
    }

    /// Drop the entry recorded under `ticket`, if it is still the cached
    /// one. Used when its broadcast failed, so the next pass retries.
    pub fn discard(&self, target: SnapshotTarget, ticket: FetchTicket) {
        let mut entries = self.lock();
        if entries.get(&target).is_some_and(|entry| entry.ticket == ticket) {
            entries.remove(&target);
        }
    }

    /// Record `snapshot` only if nothing is cached for `target` yet.
    /// Returns whether it was stored.
    pub fn seed(&self, target: SnapshotTarget, snapshot: Snapshot, ticket: FetchTicket) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(&target) {
            return false;
        }
        entries.insert(target, Entry { snapshot, ticket });
        true
    }

    pub fn forget(&self, target: SnapshotTarget) {
        self.lock().remove(&target);
    }

    /// Drop every entry whose target is not in `keep`.
    pub fn retain(&self, keep: &HashSet<SnapshotTarget>) {
        self.lock().retain(|target, _| keep.contains(target));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SnapshotTarget, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeup_sdk::objects::{Rarity, TradeupMode, TradeupStatus, UserId, Wear};

    fn item(inv_id: i64, owner: &str, float: f64) -> Item {
        Item {
            inv_id,
            owner: UserId::from(owner),
            data: ItemData::Skin(Skin {
                id: 4,
                name: "Five-SeveN | Forest Night".to_string(),
                rarity: Rarity::Consumer,
                collection: "The Overpass Collection".to_string(),
                wear: Wear::from_float(float),
                float,
                price: Default::default(),
                is_stat_trak: false,
                was_won: false,
                img_src: String::new(),
                created_at: 1_700_000_000,
            }),
            visible: false,
        }
    }

    fn tradeup(id: i64, items: Vec<Item>) -> Tradeup {
        Tradeup {
            id,
            rarity: Rarity::Consumer,
            capacity: 10,
            status: TradeupStatus::Active,
            stop_time: None,
            mode: TradeupMode::Ffa,
            items,
            winner: None,
        }
    }

    #[test]
    fn test_item_order_does_not_matter() {
        let a = tradeup(1, vec![item(1, "a", 0.1), item(2, "b", 0.2), item(3, "a", 0.3)]);
        let b = tradeup(1, vec![item(3, "a", 0.3), item(1, "a", 0.1), item(2, "b", 0.2)]);
        assert!(Snapshot::Tradeup(a).equivalent(&Snapshot::Tradeup(b)));
    }

    #[test]
    fn test_pool_order_does_not_matter() {
        let a = vec![tradeup(1, vec![]), tradeup(2, vec![item(5, "c", 0.5)])];
        let b = vec![tradeup(2, vec![item(5, "c", 0.5)]), tradeup(1, vec![])];
        assert!(Snapshot::AllOpen(a).equivalent(&Snapshot::AllOpen(b)));
    }

    #[test]
    fn test_any_field_change_is_detected() {
        let base = tradeup(1, vec![item(1, "a", 0.1)]);

        let mut moved = base.clone();
        moved.items[0] = item(1, "a", 0.1 + f64::EPSILON);
        assert!(!same_tradeup(&base, &moved));

        let mut waiting = base.clone();
        waiting.status = TradeupStatus::Waiting;
        waiting.stop_time = Some(1_700_000_300);
        assert!(!same_tradeup(&base, &waiting));

        let mut grown = base.clone();
        grown.items.push(item(2, "b", 0.2));
        assert!(!same_tradeup(&base, &grown));

        assert!(!Snapshot::Tradeup(base.clone()).equivalent(&Snapshot::AllOpen(vec![base])));
    }

    #[test]
    fn test_cache_seed_and_retain() {
        let cache = SnapshotCache::default();
        let one = SnapshotTarget::Tradeup(1);
        let snapshot = Snapshot::Tradeup(tradeup(1, vec![]));

        assert!(cache.seed(one, snapshot.clone(), cache.ticket()));
        let changed = Snapshot::Tradeup(tradeup(1, vec![item(1, "a", 0.1)]));
        assert!(!cache.seed(one, changed, cache.ticket()));
        assert!(!cache.replace_if_changed(one, snapshot.clone(), cache.ticket()));

        cache.seed(SnapshotTarget::AllOpen, Snapshot::AllOpen(vec![]), cache.ticket());
        cache.retain(&HashSet::from([SnapshotTarget::AllOpen]));
        assert_eq!(cache.len(), 1);
        assert!(cache.replace_if_changed(one, snapshot, cache.ticket()));
    }

    #[test]
    fn test_stale_fetch_does_not_replace_newer_snapshot() {
        let cache = SnapshotCache::default();
        let one = SnapshotTarget::Tradeup(1);
        let waiting = {
            let mut t = tradeup(1, vec![item(1, "a", 0.1)]);
            t.status = TradeupStatus::Waiting;
            Snapshot::Tradeup(t)
        };
        let completed = {
            let mut t = tradeup(1, vec![item(1, "a", 0.1)]);
            t.status = TradeupStatus::Completed;
            t.winner = Some(UserId::from("a"));
            Snapshot::Tradeup(t)
        };

        let stale = cache.ticket();
        let fresh = cache.ticket();
        assert!(cache.replace_if_changed(one, completed.clone(), fresh));
        assert!(!cache.replace_if_changed(one, waiting, stale));
        assert!(!cache.replace_if_changed(one, completed, cache.ticket()));
    }

    #[test]
    fn test_discard_only_drops_own_entry() {
        let cache = SnapshotCache::default();
        let one = SnapshotTarget::Tradeup(1);
        let first = cache.ticket();
        assert!(cache.replace_if_changed(one, Snapshot::Tradeup(tradeup(1, vec![])), first));

        let second = cache.ticket();
        let grown = Snapshot::Tradeup(tradeup(1, vec![item(1, "a", 0.1)]));
        assert!(cache.replace_if_changed(one, grown, second));
        cache.discard(one, first);
        assert_eq!(cache.len(), 1);
        cache.discard(one, second);
        assert!(cache.is_empty());
    }
}
