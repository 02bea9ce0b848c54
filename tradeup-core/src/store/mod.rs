//! Storage seam for tradeups and inventory.
//!
//! Persistence itself lives outside this crate. The engine only relies on
//! the operations below, each of which must be atomic with respect to
//! concurrent callers. [`MemoryStore`] is the in-process implementation.

pub mod memory;

pub use memory::{MemoryStore, SkinTemplate, default_catalog};

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use tradeup_sdk::objects::{InventoryId, Item, Rarity, TradeupId, TradeupMode, UserId};

use crate::entities::TradeupRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("tradeup {0} not found")]
    TradeupNotFound(TradeupId),

    #[error("tradeup {0} is full")]
    TradeupFull(TradeupId),

    #[error("tradeup {0} is completed")]
    TradeupClosed(TradeupId),

    #[error("contribution limit of {limit} items reached")]
    ContributionLimit { limit: u32 },

    #[error("item {0} is not available")]
    ItemUnavailable(InventoryId),

    #[error("item {inv_id} is not in tradeup {tradeup_id}")]
    ItemNotInTradeup {
        tradeup_id: TradeupId,
        inv_id: InventoryId,
    },

    #[error("no {0} skins to reward")]
    NoRewardTemplate(Rarity),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// An item placement, validated and applied in one step.
#[derive(Debug, Clone)]
pub struct ContributionInsert {
    pub tradeup_id: TradeupId,
    pub inv_id: InventoryId,
    pub user_id: UserId,
    pub max_per_user: u32,
}

/// Item count of a pool after a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillLevel {
    pub items: u32,
    pub capacity: u32,
}

impl FillLevel {
    pub fn is_full(&self) -> bool {
        self.items >= self.capacity
    }
}

/// Reward to mint for the winner of a pool.
#[derive(Debug, Clone, Copy)]
pub struct RewardRequest {
    pub rarity: Rarity,
    /// Average quality of the consumed items.
    pub quality: f64,
}

/// Completion of an expired pool: winner, consumed items and reward, all
/// applied in one step.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub tradeup_id: TradeupId,
    pub winner: UserId,
    pub now: OffsetDateTime,
    /// `None` for tiers without a successor.
    pub reward: Option<RewardRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// The pool was not waiting past its deadline. Nothing changed.
    NotExpired,
    /// The pool is completed; carries the minted reward, if any.
    Completed { reward: Option<Item> },
}

#[async_trait]
pub trait TradeupStore: Send + Sync {
    /// Active and waiting tradeups, by ascending id.
    async fn open_tradeups(&self) -> Result<Vec<TradeupRecord>, StoreError>;

    async fn tradeup(&self, id: TradeupId) -> Result<Option<TradeupRecord>, StoreError>;

    /// Whether `user` owns an unconsumed inventory entry `inv_id`.
    async fn owns_item(&self, inv_id: InventoryId, user: &UserId) -> Result<bool, StoreError>;

    /// Items `user` currently holds in the tradeup.
    async fn contribution_count(&self, id: TradeupId, user: &UserId) -> Result<u32, StoreError>;

    /// Place an item. Rejects with `TradeupFull`, `TradeupClosed`,
    /// `ContributionLimit` or `ItemUnavailable` if the pool changed since
    /// the caller's checks.
    async fn insert_item(&self, insert: ContributionInsert) -> Result<FillLevel, StoreError>;

    /// Take an item back out and make it visible again.
    ///
    /// A waiting pool goes back to `Active` and loses its deadline in the
    /// same step; the returned value says whether that happened.
    async fn remove_item(&self, id: TradeupId, inv_id: InventoryId) -> Result<bool, StoreError>;

    /// Move a full active pool to `Waiting` with `deadline`.
    ///
    /// Returns `false` without touching the pool when it is not active or
    /// already has a deadline.
    async fn start_timer(&self, id: TradeupId, deadline: OffsetDateTime) -> Result<bool, StoreError>;

    /// Waiting tradeups whose deadline is at or before `now`.
    async fn expired(&self, now: OffsetDateTime) -> Result<Vec<TradeupRecord>, StoreError>;

    /// Complete an expired pool: record the winner, consume its items and
    /// mint the reward into the winner's inventory.
    ///
    /// Conditional on the pool still being waiting with a passed deadline,
    /// so concurrent resolvers complete each pool at most once. On error
    /// nothing is changed and the pool stays waiting for the next scan.
    async fn resolve(&self, resolution: Resolution) -> Result<ResolveOutcome, StoreError>;

    /// Create empty pools until `rarity` has at least `minimum` open.
    /// Returns the number created.
    async fn ensure_open(
        &self,
        rarity: Rarity,
        minimum: u32,
        capacity: u32,
        mode: TradeupMode,
    ) -> Result<u32, StoreError>;
}
