//! Inventory items and the identities that own them.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rarity::Rarity;

/// Inventory entry id.
pub type InventoryId = i64;

/// Identity of a user, or of an anonymous viewer's session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(CompactString);

impl UserId {
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(CompactString::from(value))
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(CompactString::from(value))
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inventory entry as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "invId")]
    pub inv_id: InventoryId,
    #[serde(rename = "userId")]
    pub owner: UserId,
    pub data: ItemData,
    /// `false` while the item sits in a tradeup.
    pub visible: bool,
}

impl Item {
    /// The numeric quality attribute used when computing rewards.
    pub fn quality(&self) -> f64 {
        self.data.quality()
    }
}

/// Payload attached to an inventory entry, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemData {
    Skin(Skin),
}

impl ItemData {
    pub fn quality(&self) -> f64 {
        match self {
            ItemData::Skin(skin) => skin.float,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    pub id: i64,
    /// e.g. `AWP | Dragon Lore`
    pub name: String,
    pub rarity: Rarity,
    pub collection: String,
    pub wear: Wear,
    pub float: f64,
    pub price: Decimal,
    pub is_stat_trak: bool,
    pub was_won: bool,
    pub img_src: String,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wear {
    #[serde(rename = "Factory New")]
    FactoryNew,
    #[serde(rename = "Minimal Wear")]
    MinimalWear,
    #[serde(rename = "Field-Tested")]
    FieldTested,
    #[serde(rename = "Well-Worn")]
    WellWorn,
    #[serde(rename = "Battle-Scarred")]
    BattleScarred,
}

impl Wear {
    /// Map a float value to its wear name.
    pub fn from_float(value: f64) -> Self {
        match value {
            v if v < 0.07 => Wear::FactoryNew,
            v if v < 0.15 => Wear::MinimalWear,
            v if v < 0.38 => Wear::FieldTested,
            v if v < 0.45 => Wear::WellWorn,
            _ => Wear::BattleScarred,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wear_thresholds() {
        assert_eq!(Wear::from_float(0.0), Wear::FactoryNew);
        assert_eq!(Wear::from_float(0.07), Wear::MinimalWear);
        assert_eq!(Wear::from_float(0.2), Wear::FieldTested);
        assert_eq!(Wear::from_float(0.38), Wear::WellWorn);
        assert_eq!(Wear::from_float(0.45), Wear::BattleScarred);
        assert_eq!(Wear::from_float(0.99), Wear::BattleScarred);
    }

    #[test]
    fn test_item_payload_is_tagged() {
        let item = Item {
            inv_id: 7,
            owner: UserId::from("u-1"),
            data: ItemData::Skin(Skin {
                id: 3,
                name: "AK-47 | Redline".to_string(),
                rarity: Rarity::Classified,
                collection: "The Phoenix Collection".to_string(),
                wear: Wear::FieldTested,
                float: 0.21,
                price: Decimal::new(1234, 2),
                is_stat_trak: false,
                was_won: false,
                img_src: String::new(),
                created_at: 0,
            }),
            visible: true,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["invId"], 7);
        assert_eq!(value["userId"], "u-1");
        assert_eq!(value["data"]["kind"], "skin");
        assert_eq!(value["data"]["wear"], "Field-Tested");
        assert_eq!(value["data"]["isStatTrak"], false);

        let back: Item = serde_json::from_value(value).unwrap();
        assert_eq!(back.quality(), 0.21);
    }
}
