use super::common::created_response;
use crate::{errors::ServiceError, services::customers::CustomerInput, ApiResponse, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CustomerSearchParams {
    /// Substring of company, contact, email or tax id
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/customers",
    summary = "List customers",
    params(CustomerSearchParams),
    responses((status = 200, description = "Customers ordered by company name", body = ApiResponse<Value>)),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerSearchParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let customers = state
        .services
        .customers
        .search(query.search.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(customers)))
}

#[utoipa::path(
    get,
    path = "/customer/create",
    summary = "Blank customer form",
    responses((status = 200, description = "Empty form values", body = ApiResponse<CustomerInput>)),
    tag = "Customers"
)]
pub async fn new_customer_form() -> Json<ApiResponse<CustomerInput>> {
    Json(ApiResponse::success(CustomerInput::default()))
}

#[utoipa::path(
    post,
    path = "/customer/create",
    summary = "Create customer",
    request_body = CustomerInput,
    responses(
        (status = 201, description = "Customer created", body = ApiResponse<Value>),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse),
    ),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> Result<Response, ServiceError> {
    let customer = state.services.customers.create(input).await?;
    Ok(created_response(Json(ApiResponse::success(customer))))
}

#[utoipa::path(
    get,
    path = "/customer/{id}",
    summary = "Get customer",
    params(("id" = i32, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer retrieved", body = ApiResponse<Value>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.get(id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    get,
    path = "/customer/{id}/edit",
    summary = "Customer edit form",
    params(("id" = i32, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Current values", body = ApiResponse<CustomerInput>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Customers"
)]
pub async fn edit_customer_form(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CustomerInput>>, ServiceError> {
    let customer = state.services.customers.get(id).await?;
    Ok(Json(ApiResponse::success(CustomerInput {
        nombre_empresa: customer.nombre_empresa,
        contacto_nombre: customer.contacto_nombre,
        email: customer.email,
        telefono: customer.telefono,
        rfc: customer.rfc,
    })))
}

#[utoipa::path(
    post,
    path = "/customer/{id}/edit",
    summary = "Update customer",
    params(("id" = i32, Path, description = "Customer id")),
    request_body = CustomerInput,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<Value>),
        (status = 400, description = "Invalid fields", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<CustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.update(id, input).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    post,
    path = "/customer/{id}/delete",
    summary = "Delete customer",
    params(("id" = i32, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer deleted", body = ApiResponse<Value>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Customer has quotations", body = crate::errors::ErrorResponse),
    ),
    tag = "Customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.customers.delete(id).await?;
    Ok(Json(ApiResponse::<()>::message("Cliente eliminado.")))
}

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers))
        .route("/customer/create", get(new_customer_form).post(create_customer))
        .route("/customer/:id", get(get_customer))
        .route("/customer/:id/edit", get(edit_customer_form).post(update_customer))
        .route("/customer/:id/delete", post(delete_customer))
}
