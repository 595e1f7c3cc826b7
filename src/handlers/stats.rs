use crate::{errors::ServiceError, ApiResponse, AppState};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

/// Record counts shown in the page header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Stats {
    pub product_count: u64,
    pub customer_count: u64,
}

#[utoipa::path(
    get,
    path = "/stats",
    summary = "Record counts",
    responses((status = 200, description = "Product and customer totals", body = ApiResponse<Stats>)),
    tag = "Stats"
)]
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Stats>>, ServiceError> {
    let product_count = state.services.catalog.count().await?;
    let customer_count = state.services.customers.count().await?;
    Ok(Json(ApiResponse::success(Stats {
        product_count,
        customer_count,
    })))
}

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}
