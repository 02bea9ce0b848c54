pub mod bus;
pub mod contribution;
pub mod item;
pub mod rarity;
pub mod tradeup;
pub mod ws;

pub use contribution::AddItemRequest;
pub use item::{InventoryId, Item, ItemData, Skin, UserId, Wear};
pub use rarity::Rarity;
pub use tradeup::{Tradeup, TradeupId, TradeupMode, TradeupStatus};
