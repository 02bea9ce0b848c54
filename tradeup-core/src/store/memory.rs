//! In-process [`TradeupStore`].
//!
//! All tradeup and inventory state sits behind one async mutex, so every
//! trait operation is atomic. Used by single-process deployments and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tradeup_sdk::objects::{
    InventoryId, Item, ItemData, Rarity, Skin, TradeupId, TradeupMode, UserId, Wear,
};

use super::{
    ContributionInsert, FillLevel, Resolution, ResolveOutcome, RewardRequest, StoreError, TradeupStore,
};
use crate::entities::{TradeupRecord, TradeupStatus};
use crate::utils::reward::{STAT_TRAK_CHANCE, wear_value};

/// A catalog skin that inventory entries are instantiated from.
#[derive(Debug, Clone)]
pub struct SkinTemplate {
    pub id: i64,
    pub name: String,
    pub rarity: Rarity,
    pub collection: String,
    pub wear_min: f64,
    pub wear_max: f64,
    pub can_be_stat_trak: bool,
    pub price: Decimal,
    pub img_src: String,
}

impl SkinTemplate {
    fn new(id: i64, name: &str, rarity: Rarity, collection: &str, wear: (f64, f64), price: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            rarity,
            collection: collection.to_string(),
            wear_min: wear.0,
            wear_max: wear.1,
            can_be_stat_trak: !collection.starts_with("Souvenir"),
            price: Decimal::new(price, 2),
            img_src: String::new(),
        }
    }

    fn instantiate(&self, float: f64, is_stat_trak: bool, was_won: bool) -> Skin {
        Skin {
            id: self.id,
            name: self.name.clone(),
            rarity: self.rarity,
            collection: self.collection.clone(),
            wear: Wear::from_float(float),
            float,
            price: self.price,
            is_stat_trak,
            was_won,
            img_src: self.img_src.clone(),
            created_at: OffsetDateTime::now_utc().unix_timestamp(),
        }
    }
}

/// A small catalog with two skins per tier.
pub fn default_catalog() -> Vec<SkinTemplate> {
    vec![
        SkinTemplate::new(1, "P250 | Sand Dune", Rarity::Consumer, "The Dust 2 Collection", (0.06, 0.8), 3),
        SkinTemplate::new(2, "Nova | Polar Mesh", Rarity::Consumer, "The Office Collection", (0.06, 0.8), 4),
        SkinTemplate::new(3, "MP7 | Forest DDPAT", Rarity::Industrial, "The Italy Collection", (0.06, 0.8), 9),
        SkinTemplate::new(4, "Sawed-Off | Forest DDPAT", Rarity::Industrial, "The Italy Collection", (0.06, 0.8), 8),
        SkinTemplate::new(5, "Glock-18 | Candy Apple", Rarity::MilSpec, "The Italy Collection", (0.0, 0.3), 95),
        SkinTemplate::new(6, "M4A1-S | Boreal Forest", Rarity::MilSpec, "The Lake Collection", (0.06, 0.8), 60),
        SkinTemplate::new(7, "USP-S | Guardian", Rarity::Restricted, "The Phoenix Collection", (0.0, 0.38), 410),
        SkinTemplate::new(8, "AK-47 | Elite Build", Rarity::Restricted, "The Wildfire Collection", (0.0, 1.0), 350),
        SkinTemplate::new(9, "AWP | Hyper Beast", Rarity::Classified, "The Falchion Collection", (0.0, 1.0), 4200),
        SkinTemplate::new(10, "M4A4 | Desolate Space", Rarity::Classified, "The Gamma Collection", (0.0, 1.0), 2900),
        SkinTemplate::new(11, "AK-47 | Fire Serpent", Rarity::Covert, "The Bravo Collection", (0.06, 0.76), 65000),
        SkinTemplate::new(12, "AWP | Dragon Lore", Rarity::Covert, "Souvenir Cobblestone Collection", (0.0, 0.7), 950000),
    ]
}

#[derive(Debug)]
struct StoredTradeup {
    id: TradeupId,
    rarity: Rarity,
    capacity: u32,
    status: TradeupStatus,
    stop_time: Option<OffsetDateTime>,
    mode: TradeupMode,
    items: Vec<InventoryId>,
    winner: Option<UserId>,
}

impl StoredTradeup {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.status == TradeupStatus::Waiting && self.stop_time.is_some_and(|stop| stop <= now)
    }
}

#[derive(Debug)]
struct InventoryEntry {
    item: Item,
    consumed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    next_tradeup_id: TradeupId,
    next_inv_id: InventoryId,
    tradeups: BTreeMap<TradeupId, StoredTradeup>,
    inventory: HashMap<InventoryId, InventoryEntry>,
}

impl Inner {
    fn record(&self, stored: &StoredTradeup) -> TradeupRecord {
        TradeupRecord {
            id: stored.id,
            rarity: stored.rarity,
            capacity: stored.capacity,
            status: stored.status,
            stop_time: stored.stop_time,
            mode: stored.mode,
            items: stored
                .items
                .iter()
                .filter_map(|inv_id| self.inventory.get(inv_id))
                .map(|entry| entry.item.clone())
                .collect(),
            winner: stored.winner.clone(),
        }
    }

    fn tradeup_mut(&mut self, id: TradeupId) -> Result<&mut StoredTradeup, StoreError> {
        self.tradeups.get_mut(&id).ok_or(StoreError::TradeupNotFound(id))
    }

    fn create_tradeup(&mut self, rarity: Rarity, capacity: u32, mode: TradeupMode) -> TradeupId {
        self.next_tradeup_id += 1;
        let id = self.next_tradeup_id;
        self.tradeups.insert(
            id,
            StoredTradeup {
                id,
                rarity,
                capacity,
                status: TradeupStatus::Active,
                stop_time: None,
                mode,
                items: Vec::new(),
                winner: None,
            },
        );
        id
    }

    fn add_inventory(&mut self, owner: UserId, skin: Skin) -> Item {
        self.next_inv_id += 1;
        let item = Item {
            inv_id: self.next_inv_id,
            owner,
            data: ItemData::Skin(skin),
            visible: true,
        };
        self.inventory.insert(
            item.inv_id,
            InventoryEntry {
                item: item.clone(),
                consumed: false,
            },
        );
        item
    }
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    catalog: Vec<SkinTemplate>,
    rng: StdMutex<StdRng>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(default_catalog())
    }
}

impl MemoryStore {
    pub fn new(catalog: Vec<SkinTemplate>) -> Self {
        Self::with_rng(catalog, StdRng::from_os_rng())
    }

    /// Reward picks and StatTrak rolls become reproducible.
    pub fn with_seed(catalog: Vec<SkinTemplate>, seed: u64) -> Self {
        Self::with_rng(catalog, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: Vec<SkinTemplate>, rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            catalog,
            rng: StdMutex::new(rng),
        }
    }

    pub async fn create_tradeup(&self, rarity: Rarity, capacity: u32, mode: TradeupMode) -> TradeupId {
        self.inner.lock().await.create_tradeup(rarity, capacity, mode)
    }

    /// Put a skin of `rarity` with the given float into `owner`'s inventory.
    pub async fn grant(&self, owner: &UserId, rarity: Rarity, float: f64) -> Result<Item, StoreError> {
        let template = self.pick_template(rarity)?;
        let skin = template.instantiate(float, false, false);
        Ok(self.inner.lock().await.add_inventory(owner.clone(), skin))
    }

    /// Put a skin of `rarity` with a random float into `owner`'s inventory.
    pub async fn grant_random(&self, owner: &UserId, rarity: Rarity) -> Result<Item, StoreError> {
        let template = self.pick_template(rarity)?;
        let float = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(template.wear_min..=template.wear_max);
        let skin = template.instantiate(float, false, false);
        Ok(self.inner.lock().await.add_inventory(owner.clone(), skin))
    }

    pub async fn item(&self, inv_id: InventoryId) -> Option<Item> {
        let inner = self.inner.lock().await;
        inner.inventory.get(&inv_id).map(|entry| entry.item.clone())
    }

    /// Unconsumed items owned by `owner`, by inventory id.
    pub async fn inventory_of(&self, owner: &UserId) -> Vec<Item> {
        let inner = self.inner.lock().await;
        let mut items: Vec<Item> = inner
            .inventory
            .values()
            .filter(|entry| !entry.consumed && &entry.item.owner == owner)
            .map(|entry| entry.item.clone())
            .collect();
        items.sort_by_key(|item| item.inv_id);
        items
    }

    fn reward_skin(&self, request: RewardRequest) -> Result<Skin, StoreError> {
        let template = self.pick_template(request.rarity)?;
        let float = wear_value(template.wear_min, template.wear_max, request.quality);
        let is_stat_trak = template.can_be_stat_trak
            && self
                .rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random_bool(STAT_TRAK_CHANCE);
        Ok(template.instantiate(float, is_stat_trak, true))
    }

    fn pick_template(&self, rarity: Rarity) -> Result<&SkinTemplate, StoreError> {
        let candidates: Vec<&SkinTemplate> = self.catalog.iter().filter(|t| t.rarity == rarity).collect();
        if candidates.is_empty() {
            return Err(StoreError::NoRewardTemplate(rarity));
        }
        let index = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..candidates.len());
        Ok(candidates[index])
    }
}

#[async_trait]
impl TradeupStore for MemoryStore {
    async fn open_tradeups(&self) -> Result<Vec<TradeupRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tradeups
            .values()
            .filter(|t| t.status.is_open())
            .map(|t| inner.record(t))
            .collect())
    }

    async fn tradeup(&self, id: TradeupId) -> Result<Option<TradeupRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.tradeups.get(&id).map(|t| inner.record(t)))
    }

    async fn owns_item(&self, inv_id: InventoryId, user: &UserId) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .inventory
            .get(&inv_id)
            .is_some_and(|entry| !entry.consumed && &entry.item.owner == user))
    }

    async fn contribution_count(&self, id: TradeupId, user: &UserId) -> Result<u32, StoreError> {
        let inner = self.inner.lock().await;
        let tradeup = inner.tradeups.get(&id).ok_or(StoreError::TradeupNotFound(id))?;
        Ok(tradeup
            .items
            .iter()
            .filter_map(|inv_id| inner.inventory.get(inv_id))
            .filter(|entry| &entry.item.owner == user)
            .count() as u32)
    }

    async fn insert_item(&self, insert: ContributionInsert) -> Result<FillLevel, StoreError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let tradeup = inner
            .tradeups
            .get_mut(&insert.tradeup_id)
            .ok_or(StoreError::TradeupNotFound(insert.tradeup_id))?;
        if tradeup.status == TradeupStatus::Completed {
            return Err(StoreError::TradeupClosed(tradeup.id));
        }
        if tradeup.items.len() >= tradeup.capacity as usize {
            return Err(StoreError::TradeupFull(tradeup.id));
        }

        let available = inner
            .inventory
            .get(&insert.inv_id)
            .is_some_and(|entry| !entry.consumed && entry.item.visible && entry.item.owner == insert.user_id);
        if !available {
            return Err(StoreError::ItemUnavailable(insert.inv_id));
        }

        let held = tradeup
            .items
            .iter()
            .filter_map(|inv_id| inner.inventory.get(inv_id))
            .filter(|entry| entry.item.owner == insert.user_id)
            .count() as u32;
        if held >= insert.max_per_user {
            return Err(StoreError::ContributionLimit {
                limit: insert.max_per_user,
            });
        }

        if let Some(entry) = inner.inventory.get_mut(&insert.inv_id) {
            entry.item.visible = false;
        }
        tradeup.items.push(insert.inv_id);
        Ok(FillLevel {
            items: tradeup.items.len() as u32,
            capacity: tradeup.capacity,
        })
    }

    async fn remove_item(&self, id: TradeupId, inv_id: InventoryId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let tradeup = inner.tradeup_mut(id)?;
        if tradeup.status == TradeupStatus::Completed {
            return Err(StoreError::TradeupClosed(id));
        }
        let position = tradeup
            .items
            .iter()
            .position(|held| *held == inv_id)
            .ok_or(StoreError::ItemNotInTradeup { tradeup_id: id, inv_id })?;
        tradeup.items.remove(position);

        let reopened = tradeup.status == TradeupStatus::Waiting;
        if reopened {
            tradeup.status = TradeupStatus::Active;
            tradeup.stop_time = None;
        }

        if let Some(entry) = inner.inventory.get_mut(&inv_id) {
            entry.item.visible = true;
        }
        Ok(reopened)
    }

    async fn start_timer(&self, id: TradeupId, deadline: OffsetDateTime) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let tradeup = inner.tradeup_mut(id)?;
        if tradeup.status == TradeupStatus::Completed {
            return Err(StoreError::TradeupClosed(id));
        }
        if tradeup.status != TradeupStatus::Active
            || tradeup.stop_time.is_some()
            || tradeup.items.len() < tradeup.capacity as usize
        {
            return Ok(false);
        }
        tradeup.status = TradeupStatus::Waiting;
        tradeup.stop_time = Some(deadline);
        Ok(true)
    }

    async fn expired(&self, now: OffsetDateTime) -> Result<Vec<TradeupRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tradeups
            .values()
            .filter(|t| t.is_expired(now))
            .map(|t| inner.record(t))
            .collect())
    }

    async fn resolve(&self, resolution: Resolution) -> Result<ResolveOutcome, StoreError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let id = resolution.tradeup_id;
        let tradeup = inner.tradeups.get_mut(&id).ok_or(StoreError::TradeupNotFound(id))?;
        if !tradeup.is_expired(resolution.now) {
            return Ok(ResolveOutcome::NotExpired);
        }
        // Everything fallible happens before the first mutation.
        let reward = resolution.reward.map(|request| self.reward_skin(request)).transpose()?;

        tradeup.status = TradeupStatus::Completed;
        tradeup.winner = Some(resolution.winner.clone());
        for inv_id in &tradeup.items {
            if let Some(entry) = inner.inventory.get_mut(inv_id) {
                entry.consumed = true;
            }
        }
        let reward = reward.map(|skin| inner.add_inventory(resolution.winner, skin));
        Ok(ResolveOutcome::Completed { reward })
    }

    async fn ensure_open(
        &self,
        rarity: Rarity,
        minimum: u32,
        capacity: u32,
        mode: TradeupMode,
    ) -> Result<u32, StoreError> {
        let mut inner = self.inner.lock().await;
        let open = inner
            .tradeups
            .values()
            .filter(|t| t.rarity == rarity && t.status.is_open())
            .count() as u32;
        let missing = minimum.saturating_sub(open);
        for _ in 0..missing {
            inner.create_tradeup(rarity, capacity, mode);
        }
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::with_seed(default_catalog(), 11)
    }

    async fn fill(store: &MemoryStore, id: TradeupId, owner: &UserId, n: usize) -> Vec<Item> {
        let mut items = Vec::new();
        for _ in 0..n {
            let item = store.grant(owner, Rarity::Consumer, 0.2).await.unwrap();
            store
                .insert_item(ContributionInsert {
                    tradeup_id: id,
                    inv_id: item.inv_id,
                    user_id: owner.clone(),
                    max_per_user: 5,
                })
                .await
                .unwrap();
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_insert_hides_item_and_rejects_reuse() {
        let store = store();
        let alice = UserId::from("alice");
        let a = store.create_tradeup(Rarity::Consumer, 3, TradeupMode::Ffa).await;
        let b = store.create_tradeup(Rarity::Consumer, 3, TradeupMode::Ffa).await;
        let item = fill(&store, a, &alice, 1).await.remove(0);

        assert!(!store.item(item.inv_id).await.unwrap().visible);
        let again = store
            .insert_item(ContributionInsert {
                tradeup_id: b,
                inv_id: item.inv_id,
                user_id: alice.clone(),
                max_per_user: 5,
            })
            .await;
        assert!(matches!(again, Err(StoreError::ItemUnavailable(_))));
    }

    #[tokio::test]
    async fn test_insert_rejects_full_pool_and_limit() {
        let store = store();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let id = store.create_tradeup(Rarity::Consumer, 3, TradeupMode::Ffa).await;
        fill(&store, id, &alice, 2).await;

        let extra = store.grant(&alice, Rarity::Consumer, 0.5).await.unwrap();
        let limited = store
            .insert_item(ContributionInsert {
                tradeup_id: id,
                inv_id: extra.inv_id,
                user_id: alice.clone(),
                max_per_user: 2,
            })
            .await;
        assert!(matches!(limited, Err(StoreError::ContributionLimit { limit: 2 })));

        fill(&store, id, &bob, 1).await;
        let late = store.grant(&bob, Rarity::Consumer, 0.5).await.unwrap();
        let full = store
            .insert_item(ContributionInsert {
                tradeup_id: id,
                inv_id: late.inv_id,
                user_id: bob,
                max_per_user: 5,
            })
            .await;
        assert!(matches!(full, Err(StoreError::TradeupFull(_))));
    }

    #[tokio::test]
    async fn test_timer_start_is_idempotent_and_removal_reopens() {
        let store = store();
        let alice = UserId::from("alice");
        let id = store.create_tradeup(Rarity::Consumer, 2, TradeupMode::Ffa).await;
        let items = fill(&store, id, &alice, 2).await;

        let deadline = OffsetDateTime::from_unix_timestamp(10_000).unwrap();
        assert!(store.start_timer(id, deadline).await.unwrap());
        assert!(!store
            .start_timer(id, deadline + time::Duration::seconds(5))
            .await
            .unwrap());
        let record = store.tradeup(id).await.unwrap().unwrap();
        assert_eq!(record.status, TradeupStatus::Waiting);
        assert_eq!(record.stop_time, Some(deadline));

        assert!(store.remove_item(id, items[0].inv_id).await.unwrap());
        let record = store.tradeup(id).await.unwrap().unwrap();
        assert_eq!(record.status, TradeupStatus::Active);
        assert_eq!(record.stop_time, None);
        assert!(store.item(items[0].inv_id).await.unwrap().visible);
    }

    async fn waiting_pool(store: &MemoryStore, owner: &UserId) -> (TradeupId, Vec<Item>, OffsetDateTime) {
        let id = store.create_tradeup(Rarity::Consumer, 2, TradeupMode::Ffa).await;
        let items = fill(store, id, owner, 2).await;
        let deadline = OffsetDateTime::from_unix_timestamp(10_000).unwrap();
        store.start_timer(id, deadline).await.unwrap();
        (id, items, deadline)
    }

    fn resolution(id: TradeupId, winner: &UserId, now: OffsetDateTime, reward: Option<RewardRequest>) -> Resolution {
        Resolution {
            tradeup_id: id,
            winner: winner.clone(),
            now,
            reward,
        }
    }

    #[tokio::test]
    async fn test_resolve_consumes_items_once() {
        let store = store();
        let alice = UserId::from("alice");
        let (id, _, deadline) = waiting_pool(&store, &alice).await;

        let early = deadline - time::Duration::seconds(1);
        assert!(store.expired(early).await.unwrap().is_empty());
        assert_eq!(
            store.resolve(resolution(id, &alice, early, None)).await.unwrap(),
            ResolveOutcome::NotExpired
        );

        assert_eq!(store.expired(deadline).await.unwrap().len(), 1);
        assert_eq!(
            store.resolve(resolution(id, &alice, deadline, None)).await.unwrap(),
            ResolveOutcome::Completed { reward: None }
        );
        assert_eq!(
            store.resolve(resolution(id, &alice, deadline, None)).await.unwrap(),
            ResolveOutcome::NotExpired
        );
        assert!(store.inventory_of(&alice).await.is_empty());
        assert!(store.open_tradeups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_mints_scaled_reward() {
        let store = store();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        let (id, _, deadline) = waiting_pool(&store, &alice).await;

        let reward = RewardRequest {
            rarity: Rarity::Industrial,
            quality: 0.5,
        };
        let ResolveOutcome::Completed { reward: Some(item) } =
            store.resolve(resolution(id, &bob, deadline, Some(reward))).await.unwrap()
        else {
            panic!("expected a minted reward");
        };
        let ItemData::Skin(skin) = &item.data;
        assert_eq!(skin.rarity, Rarity::Industrial);
        assert!((skin.float - 0.43).abs() < 1e-9);
        assert!(skin.was_won);
        assert!(item.visible);
        assert_eq!(item.owner, bob);
        assert_eq!(store.inventory_of(&bob).await, vec![item]);
        assert_eq!(store.tradeup(id).await.unwrap().unwrap().winner, Some(bob));
    }

    #[tokio::test]
    async fn test_failed_mint_leaves_pool_untouched() {
        let catalog = default_catalog()
            .into_iter()
            .filter(|t| t.rarity != Rarity::Industrial)
            .collect();
        let store = MemoryStore::with_seed(catalog, 11);
        let alice = UserId::from("alice");
        let (id, items, deadline) = waiting_pool(&store, &alice).await;

        let reward = RewardRequest {
            rarity: Rarity::Industrial,
            quality: 0.2,
        };
        let failed = store.resolve(resolution(id, &alice, deadline, Some(reward))).await;
        assert!(matches!(failed, Err(StoreError::NoRewardTemplate(Rarity::Industrial))));

        let record = store.tradeup(id).await.unwrap().unwrap();
        assert_eq!(record.status, TradeupStatus::Waiting);
        assert_eq!(record.stop_time, Some(deadline));
        assert_eq!(record.winner, None);
        for item in &items {
            assert!(store.owns_item(item.inv_id, &alice).await.unwrap());
        }
        assert_eq!(store.expired(deadline).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_open_tops_up() {
        let store = store();
        assert_eq!(store.ensure_open(Rarity::MilSpec, 3, 10, TradeupMode::Ffa).await.unwrap(), 3);
        assert_eq!(store.ensure_open(Rarity::MilSpec, 3, 10, TradeupMode::Ffa).await.unwrap(), 0);
        assert_eq!(store.open_tradeups().await.unwrap().len(), 3);
    }
}
