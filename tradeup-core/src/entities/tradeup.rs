use time::OffsetDateTime;
use tradeup_sdk::objects::{Item, Rarity, Tradeup, TradeupId, TradeupMode, UserId};

use super::TradeupStatus;

/// A tradeup as loaded from a store, items included.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeupRecord {
    pub id: TradeupId,
    pub rarity: Rarity,
    pub capacity: u32,
    pub status: TradeupStatus,
    /// Deadline of a waiting pool. Kept after resolution.
    pub stop_time: Option<OffsetDateTime>,
    pub mode: TradeupMode,
    /// Items in contribution order.
    pub items: Vec<Item>,
    pub winner: Option<UserId>,
}

impl TradeupRecord {
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity as usize
    }
}

impl From<TradeupRecord> for Tradeup {
    fn from(value: TradeupRecord) -> Self {
        Tradeup {
            id: value.id,
            rarity: value.rarity,
            capacity: value.capacity,
            status: value.status.into(),
            stop_time: value.stop_time.map(OffsetDateTime::unix_timestamp),
            mode: value.mode,
            items: value.items,
            winner: value.winner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeup_sdk::objects::{ItemData, Skin, Wear};

    fn item(inv_id: i64, owner: &str) -> Item {
        Item {
            inv_id,
            owner: UserId::from(owner),
            data: ItemData::Skin(Skin {
                id: 1,
                name: "P250 | Sand Dune".to_string(),
                rarity: Rarity::Consumer,
                collection: "The Dust 2 Collection".to_string(),
                wear: Wear::FieldTested,
                float: 0.3,
                price: Default::default(),
                is_stat_trak: false,
                was_won: false,
                img_src: String::new(),
                created_at: 0,
            }),
            visible: false,
        }
    }

    #[test]
    fn test_record_converts_to_wire_object() {
        let deadline = OffsetDateTime::from_unix_timestamp(1_001).unwrap();
        let record = TradeupRecord {
            id: 1,
            rarity: Rarity::Consumer,
            capacity: 2,
            status: TradeupStatus::Waiting,
            stop_time: Some(deadline),
            mode: TradeupMode::Ffa,
            items: vec![item(1, "a"), item(2, "b")],
            winner: None,
        };
        assert!(record.is_full());

        let object = Tradeup::from(record);
        assert_eq!(object.stop_time, Some(1_001));
        assert_eq!(object.status, tradeup_sdk::objects::TradeupStatus::Waiting);
        assert_eq!(object.items.len(), 2);
    }
}
