//! Reward attribute derivation.

use tradeup_sdk::objects::Item;

/// Mean quality over the items actually in the pool.
pub fn average_quality(items: &[Item]) -> Option<f64> {
    if items.is_empty() {
        return None;
    }
    let sum: f64 = items.iter().map(Item::quality).sum();
    Some(sum / items.len() as f64)
}

/// Scale `quality` into a skin's wear range.
pub fn wear_value(min: f64, max: f64, quality: f64) -> f64 {
    (max - min) * quality + min
}

/// Chance that a reward of a skin that supports it is StatTrak.
pub const STAT_TRAK_CHANCE: f64 = 0.2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wear_value_scales_into_range() {
        assert_eq!(wear_value(0.0, 1.0, 0.25), 0.25);
        assert!((wear_value(0.06, 0.8, 0.5) - 0.43).abs() < 1e-9);
        assert_eq!(wear_value(0.1, 0.1, 0.9), 0.1);
    }

    #[test]
    fn test_average_of_nothing() {
        assert_eq!(average_quality(&[]), None);
    }
}
