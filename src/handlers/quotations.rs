use super::common::pdf_attachment;
use crate::{
    errors::ServiceError,
    reports,
    services::{
        quotations::{QuotationRequest, QuotationSummary, QuotationView},
        reference_lists::{ChoiceOption, ReferenceListKind},
    },
    ApiResponse, AppState,
};
use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;

/// Result of the quotation builder, in the shape its page script expects
#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationSubmitResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuotationSubmitResponse {
    fn created(quotation_id: i32) -> Self {
        Self {
            success: true,
            redirect: Some(format!("/quotations/{}", quotation_id)),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            redirect: None,
            error: Some(error),
        }
    }
}

/// Data behind the quotation builder form
#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationFormData {
    #[schema(value_type = Vec<Object>)]
    pub customers: Vec<crate::entities::customer::Model>,
    #[schema(value_type = Vec<Object>)]
    pub products: Vec<crate::entities::product::Model>,
    pub tecnicas: Vec<ChoiceOption>,
}

#[utoipa::path(
    get,
    path = "/quotations",
    summary = "List quotations",
    description = "Newest first, with customer name and computed total",
    responses((status = 200, description = "Quotations retrieved", body = ApiResponse<Vec<QuotationSummary>>)),
    tag = "Quotations"
)]
pub async fn list_quotations(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<QuotationSummary>>>, ServiceError> {
    let quotations = state.services.quotations.list_quotations().await?;
    Ok(Json(ApiResponse::success(quotations)))
}

#[utoipa::path(
    get,
    path = "/quotations/create",
    summary = "Quotation builder data",
    description = "Customers by company name, available products by name and active printing techniques",
    responses((status = 200, description = "Form data", body = ApiResponse<QuotationFormData>)),
    tag = "Quotations"
)]
pub async fn new_quotation_form(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<QuotationFormData>>, ServiceError> {
    let customers = state.services.customers.search(None).await?;
    let products = state.services.catalog.list_available().await?;
    let tecnicas = state
        .services
        .reference_lists
        .list_active(ReferenceListKind::Impresion)
        .await?;
    info!(
        customers = customers.len(),
        products = products.len(),
        "Quotation form data loaded"
    );
    Ok(Json(ApiResponse::success(QuotationFormData {
        customers,
        products,
        tecnicas,
    })))
}

#[utoipa::path(
    post,
    path = "/quotations/create",
    summary = "Create quotation",
    description = "Stores the header and every line in one transaction. Any failure answers 500 with `success: false`.",
    request_body = QuotationRequest,
    responses(
        (status = 200, description = "Quotation created", body = QuotationSubmitResponse),
        (status = 500, description = "Nothing was stored", body = QuotationSubmitResponse),
    ),
    tag = "Quotations"
)]
pub async fn create_quotation(State(state): State<AppState>, body: Bytes) -> Response {
    let outcome = match serde_json::from_slice::<QuotationRequest>(&body) {
        Ok(request) => state.services.quotations.create_quotation(request).await,
        Err(e) => Err(ServiceError::ValidationError(format!(
            "Solicitud inválida: {}",
            e
        ))),
    };

    match outcome {
        Ok(quotation_id) => (
            StatusCode::OK,
            Json(QuotationSubmitResponse::created(quotation_id)),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Quotation rejected");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(QuotationSubmitResponse::failed(e.response_message())),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/quotations/{id}",
    summary = "Get quotation",
    params(("id" = i32, Path, description = "Quotation id")),
    responses(
        (status = 200, description = "Quotation with lines and total", body = ApiResponse<QuotationView>),
        (status = 404, description = "Quotation not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Quotations"
)]
pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<QuotationView>>, ServiceError> {
    let quotation = state.services.quotations.get_quotation(id).await?;
    Ok(Json(ApiResponse::success(quotation)))
}

#[utoipa::path(
    post,
    path = "/quotations/{id}/delete",
    summary = "Delete quotation",
    params(("id" = i32, Path, description = "Quotation id")),
    responses(
        (status = 200, description = "Quotation and its lines deleted", body = ApiResponse<Value>),
        (status = 404, description = "Quotation not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Quotations"
)]
pub async fn delete_quotation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.quotations.delete_quotation(id).await?;
    Ok(Json(ApiResponse::<()>::message("Cotización eliminada.")))
}

#[utoipa::path(
    get,
    path = "/quotations/{id}/print",
    summary = "Quotation document",
    params(("id" = i32, Path, description = "Quotation id")),
    responses(
        (status = 200, description = "PDF document"),
        (status = 404, description = "Quotation not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Quotations"
)]
pub async fn print_quotation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let quotation = state.services.quotations.get_quotation(id).await?;
    let bytes = reports::render_quotation(&quotation, &state.config.company_name, Utc::now())?;
    info!(quotation_id = id, size = bytes.len(), "Quotation document rendered");
    pdf_attachment(&reports::quotation_filename(id), bytes)
}

pub fn quotation_routes() -> Router<AppState> {
    Router::new()
        .route("/quotations", get(list_quotations))
        .route(
            "/quotations/create",
            get(new_quotation_form).post(create_quotation),
        )
        .route("/quotations/:id", get(get_quotation))
        .route("/quotations/:id/delete", post(delete_quotation))
        .route("/quotations/:id/print", get(print_quotation))
}
