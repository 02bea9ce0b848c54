use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use kanau::processor::Processor;
use serde::Serialize;
use tradeup_core::processors::{AddContribution, RemoveContribution};
use tradeup_sdk::objects::{AddItemRequest, InventoryId, Tradeup, TradeupId};

use super::TradeupApiError;
use super::extractors::CallerId;
use crate::state::AppState;

/// Fill level returned after a successful contribution.
#[derive(Debug, Serialize)]
pub(super) struct FillResponse {
    items: u32,
    capacity: u32,
}

/// `GET /tradeups` — every open tradeup.
pub(super) async fn list_open(state: State<AppState>) -> Result<impl IntoResponse, TradeupApiError> {
    let pools: Vec<Tradeup> = state
        .engine
        .store()
        .open_tradeups()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(pools))
}

/// `GET /tradeups/{tradeup_id}` — one tradeup, including completed ones.
pub(super) async fn get_one(
    state: State<AppState>,
    Path(tradeup_id): Path<TradeupId>,
) -> Result<impl IntoResponse, TradeupApiError> {
    let record = state
        .engine
        .store()
        .tradeup(tradeup_id)
        .await?
        .ok_or(TradeupApiError::NotFound)?;
    Ok(Json(Tradeup::from(record)))
}

/// `POST /tradeups/{tradeup_id}/items` — contribute an item.
///
/// Filling the last slot starts the tradeup's timer. Subscribers see the
/// change on the next broadcast tick.
pub(super) async fn add_item(
    state: State<AppState>,
    CallerId(user_id): CallerId,
    Path(tradeup_id): Path<TradeupId>,
    Json(body): Json<AddItemRequest>,
) -> Result<impl IntoResponse, TradeupApiError> {
    let fill = state
        .engine
        .process(AddContribution {
            tradeup_id,
            inv_id: body.inv_id,
            user_id,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(FillResponse {
            items: fill.items,
            capacity: fill.capacity,
        }),
    ))
}

/// `DELETE /tradeups/{tradeup_id}/items/{inv_id}` — withdraw an item.
pub(super) async fn remove_item(
    state: State<AppState>,
    CallerId(user_id): CallerId,
    Path((tradeup_id, inv_id)): Path<(TradeupId, InventoryId)>,
) -> Result<impl IntoResponse, TradeupApiError> {
    state
        .engine
        .process(RemoveContribution {
            tradeup_id,
            inv_id,
            user_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
