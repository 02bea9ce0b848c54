//! Pool lifecycle: contributions, withdrawals, expiry and replenishment.
//!
//! Each operation is a [`Processor`] request handled by
//! [`ResolutionEngine`]:
//!
//! - [`AddContribution`]: place an item, start the timer once the pool fills
//! - [`RemoveContribution`]: take an item back, reopening a waiting pool
//! - [`ResolveExpired`]: draw winners for every pool past its deadline
//! - [`MaintainOpenTradeups`]: keep enough open pools per tier

use std::sync::{Arc, Mutex, PoisonError};

use kanau::processor::Processor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use tradeup_sdk::objects::{InventoryId, Rarity, TradeupId, UserId};

use crate::config::EngineConfig;
use crate::entities::{TradeupRecord, TradeupStatus};
use crate::events::{WinnerSender, WinningEvent};
use crate::store::{
    ContributionInsert, FillLevel, Resolution, ResolveOutcome, RewardRequest, StoreError, TradeupStore,
};
use crate::utils::{lottery, reward};

#[derive(Debug, Error)]
pub enum ContributionError {
    #[error("tradeup {0} not found")]
    TradeupNotFound(TradeupId),

    #[error("tradeup {0} is no longer open")]
    TradeupClosed(TradeupId),

    #[error("tradeup {0} is full")]
    PoolFull(TradeupId),

    #[error("item {0} does not belong to the user")]
    Ownership(InventoryId),

    #[error("contribution limit of {limit} items reached")]
    MaxContributionExceeded { limit: u32 },

    #[error("item {0} is already in a tradeup")]
    ItemUnavailable(InventoryId),

    #[error("item {inv_id} is not in tradeup {tradeup_id}")]
    NotInTradeup {
        tradeup_id: TradeupId,
        inv_id: InventoryId,
    },

    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ContributionError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::TradeupNotFound(id) => ContributionError::TradeupNotFound(id),
            StoreError::TradeupFull(id) => ContributionError::PoolFull(id),
            StoreError::TradeupClosed(id) => ContributionError::TradeupClosed(id),
            StoreError::ContributionLimit { limit } => ContributionError::MaxContributionExceeded { limit },
            StoreError::ItemUnavailable(inv_id) => ContributionError::ItemUnavailable(inv_id),
            StoreError::ItemNotInTradeup { tradeup_id, inv_id } => {
                ContributionError::NotInTradeup { tradeup_id, inv_id }
            }
            other => ContributionError::Storage(other),
        }
    }
}

/// Place `inv_id` into a tradeup on behalf of `user_id`.
#[derive(Debug, Clone)]
pub struct AddContribution {
    pub tradeup_id: TradeupId,
    pub inv_id: InventoryId,
    pub user_id: UserId,
}

/// Take `inv_id` back out of a tradeup on behalf of `user_id`.
#[derive(Debug, Clone)]
pub struct RemoveContribution {
    pub tradeup_id: TradeupId,
    pub inv_id: InventoryId,
    pub user_id: UserId,
}

/// Resolve every pool whose deadline is at or before `now`.
#[derive(Debug, Clone, Copy)]
pub struct ResolveExpired {
    pub now: OffsetDateTime,
}

/// Top up open pools for every tradeable tier.
#[derive(Debug, Clone, Copy)]
pub struct MaintainOpenTradeups;

#[derive(Debug, Default)]
pub struct ResolutionReport {
    /// Pools completed during the pass.
    pub completed: Vec<TradeupId>,
    /// Winners credited with a reward, one per completed pool below the
    /// top tier.
    pub winners: Vec<WinningEvent>,
    /// Pools that failed unchanged and are retried on the next pass.
    pub failed: usize,
}

enum Outcome {
    Skipped,
    /// Resolved, with the reward announcement if the tier has one.
    Completed(Option<WinningEvent>),
}

pub struct ResolutionEngine {
    store: Arc<dyn TradeupStore>,
    config: EngineConfig,
    winner_tx: WinnerSender,
    rng: Mutex<StdRng>,
}

impl ResolutionEngine {
    pub fn new(store: Arc<dyn TradeupStore>, config: EngineConfig, winner_tx: WinnerSender) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            store,
            config,
            winner_tx,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &Arc<dyn TradeupStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn draw(&self, record: &TradeupRecord) -> Option<UserId> {
        let contributors = lottery::contributors(&record.items);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        lottery::draw(&contributors, &mut *rng).cloned()
    }

    async fn resolve_one(&self, record: &TradeupRecord, now: OffsetDateTime) -> Result<Outcome, StoreError> {
        let Some(winner) = self.draw(record) else {
            warn!(tradeup_id = record.id, "Expired tradeup has no items, skipping");
            return Ok(Outcome::Skipped);
        };

        let request = record.rarity.next().map(|rarity| RewardRequest {
            rarity,
            quality: reward::average_quality(&record.items).unwrap_or_default(),
        });
        let outcome = self
            .store
            .resolve(Resolution {
                tradeup_id: record.id,
                winner: winner.clone(),
                now,
                reward: request,
            })
            .await?;
        let item = match outcome {
            ResolveOutcome::NotExpired => {
                debug!(tradeup_id = record.id, "Tradeup no longer expired, skipping");
                return Ok(Outcome::Skipped);
            }
            ResolveOutcome::Completed { reward: None } => {
                info!(tradeup_id = record.id, winner = %winner, rarity = %record.rarity, "Top tier tradeup resolved, no reward");
                return Ok(Outcome::Completed(None));
            }
            ResolveOutcome::Completed { reward: Some(item) } => item,
        };
        info!(tradeup_id = record.id, winner = %winner, inv_id = item.inv_id, "Tradeup resolved");

        let event = WinningEvent {
            tradeup_id: record.id,
            winner,
            item,
        };
        if self.winner_tx.send(event.clone()).is_err() {
            warn!(tradeup_id = record.id, "No winner listeners, announcement dropped");
        }
        Ok(Outcome::Completed(Some(event)))
    }
}

impl Processor<AddContribution> for ResolutionEngine {
    type Output = FillLevel;
    type Error = ContributionError;
    #[tracing::instrument(skip_all, err, name = "AddContribution")]
    async fn process(&self, request: AddContribution) -> Result<FillLevel, ContributionError> {
        let AddContribution {
            tradeup_id,
            inv_id,
            user_id,
        } = request;

        let record = self
            .store
            .tradeup(tradeup_id)
            .await?
            .ok_or(ContributionError::TradeupNotFound(tradeup_id))?;
        if record.status == TradeupStatus::Completed {
            return Err(ContributionError::TradeupClosed(tradeup_id));
        }
        if record.is_full() {
            return Err(ContributionError::PoolFull(tradeup_id));
        }
        if !self.store.owns_item(inv_id, &user_id).await? {
            return Err(ContributionError::Ownership(inv_id));
        }
        let limit = self.config.max_contribution_per_user;
        if self.store.contribution_count(tradeup_id, &user_id).await? >= limit {
            return Err(ContributionError::MaxContributionExceeded { limit });
        }

        let fill = self
            .store
            .insert_item(ContributionInsert {
                tradeup_id,
                inv_id,
                user_id: user_id.clone(),
                max_per_user: limit,
            })
            .await?;
        debug!(tradeup_id, inv_id, user = %user_id, items = fill.items, "Item contributed");

        if fill.is_full() {
            let deadline = OffsetDateTime::now_utc() + self.config.timer;
            if self.store.start_timer(tradeup_id, deadline).await? {
                info!(tradeup_id, deadline = %deadline, "Tradeup full, timer started");
            }
        }
        Ok(fill)
    }
}

impl Processor<RemoveContribution> for ResolutionEngine {
    type Output = ();
    type Error = ContributionError;
    #[tracing::instrument(skip_all, err, name = "RemoveContribution")]
    async fn process(&self, request: RemoveContribution) -> Result<(), ContributionError> {
        let RemoveContribution {
            tradeup_id,
            inv_id,
            user_id,
        } = request;

        if !self.store.owns_item(inv_id, &user_id).await? {
            return Err(ContributionError::Ownership(inv_id));
        }
        let reopened = self.store.remove_item(tradeup_id, inv_id).await?;
        if reopened {
            info!(tradeup_id, "Item withdrawn from waiting tradeup, timer stopped");
        } else {
            debug!(tradeup_id, inv_id, user = %user_id, "Item withdrawn");
        }
        Ok(())
    }
}

impl Processor<ResolveExpired> for ResolutionEngine {
    type Output = ResolutionReport;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "ResolveExpired")]
    async fn process(&self, request: ResolveExpired) -> Result<ResolutionReport, StoreError> {
        let expired = self.store.expired(request.now).await?;
        let mut report = ResolutionReport::default();

        for record in &expired {
            match self.resolve_one(record, request.now).await {
                Ok(Outcome::Completed(event)) => {
                    report.completed.push(record.id);
                    report.winners.extend(event);
                }
                Ok(Outcome::Skipped) => {}
                Err(e) => {
                    error!(tradeup_id = record.id, error = %e, "Failed to resolve tradeup");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

impl Processor<MaintainOpenTradeups> for ResolutionEngine {
    type Output = u32;
    type Error = StoreError;
    #[tracing::instrument(skip_all, err, name = "MaintainOpenTradeups")]
    async fn process(&self, _request: MaintainOpenTradeups) -> Result<u32, StoreError> {
        let mut created = 0;
        for rarity in Rarity::TRADEUP_TIERS {
            let n = self
                .store
                .ensure_open(
                    rarity,
                    self.config.min_open_per_tier,
                    self.config.capacity,
                    self.config.mode,
                )
                .await?;
            if n > 0 {
                debug!(rarity = %rarity, created = n, "Created open tradeups");
            }
            created += n;
        }
        Ok(created)
    }
}
