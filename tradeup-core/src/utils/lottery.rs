//! Weighted winner draw.
//!
//! Each contributor's weight is [`WEIGHT_PER_ITEM`] times the number of
//! items they hold in the pool. The roll is taken over the actual total
//! weight, so a contributor's chance is exactly their share of the pool.

use itertools::Itertools;
use rand::Rng;
use tradeup_sdk::objects::{Item, UserId};

pub const WEIGHT_PER_ITEM: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub user: UserId,
    pub weight: u64,
}

/// Group `items` by owner, in ascending user order.
pub fn contributors(items: &[Item]) -> Vec<Contributor> {
    items
        .iter()
        .map(|item| &item.owner)
        .counts()
        .into_iter()
        .map(|(user, count)| Contributor {
            user: user.clone(),
            weight: count as u64 * WEIGHT_PER_ITEM,
        })
        .sorted_by(|a, b| a.user.cmp(&b.user))
        .collect()
}

/// Pick a contributor with probability `weight / total`.
///
/// Returns `None` when there is no weight to draw from.
pub fn draw<'a, R: Rng + ?Sized>(contributors: &'a [Contributor], rng: &mut R) -> Option<&'a UserId> {
    let total: u64 = contributors.iter().map(|c| c.weight).sum();
    if total == 0 {
        return None;
    }
    let roll = rng.random_range(0..total);
    let mut cumulative = 0;
    for contributor in contributors {
        cumulative += contributor.weight;
        if roll < cumulative {
            return Some(&contributor.user);
        }
    }
    None
}
