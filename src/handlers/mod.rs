pub mod choices;
pub mod common;
pub mod customers;
pub mod products;
pub mod quotations;
pub mod stats;

use crate::AppState;
use axum::Router;

/// Every application route, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(products::product_routes())
        .merge(customers::customer_routes())
        .merge(quotations::quotation_routes())
        .merge(choices::choice_routes())
        .merge(stats::stats_routes())
}
