//! REST request bodies for adding items to a tradeup.

use serde::{Deserialize, Serialize};

use super::item::InventoryId;

/// Request body for `POST /tradeups/{id}/items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddItemRequest {
    #[serde(rename = "invId")]
    pub inv_id: InventoryId,
}
