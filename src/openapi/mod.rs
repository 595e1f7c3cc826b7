use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Price List API",
        version = "0.1.0",
        description = r#"
# Promotional products price list

Catalog, customers and quotations for a promotional-products business, plus
printable PDF price sheets.

## Error Handling

Errors share one body shape:

```json
{
  "error": "Conflict",
  "message": "Duplicate key: La clave \"MUG-001\" ya existe.",
  "fields": { "clave_producto": ["..."] },
  "request_id": "…",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

`POST /quotations/create` is the exception: it always answers
`{ "success": false, "error": "..." }` with status 500 when nothing was stored.
        "#,
    ),
    tags(
        (name = "Products", description = "Catalog management and price sheets"),
        (name = "Customers", description = "Customer records"),
        (name = "Quotations", description = "Quotation builder and documents"),
        (name = "Reference lists", description = "Printing techniques and colors"),
        (name = "Stats", description = "Record counts"),
    ),
    paths(
        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::new_product_form,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::edit_product_form,
        crate::handlers::products::update_product,
        crate::handlers::products::toggle_availability,
        crate::handlers::products::delete_product,
        crate::handlers::products::print_product,
        crate::handlers::products::print_all_products,

        // Customers
        crate::handlers::customers::list_customers,
        crate::handlers::customers::new_customer_form,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::edit_customer_form,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::delete_customer,

        // Quotations
        crate::handlers::quotations::list_quotations,
        crate::handlers::quotations::new_quotation_form,
        crate::handlers::quotations::create_quotation,
        crate::handlers::quotations::get_quotation,
        crate::handlers::quotations::delete_quotation,
        crate::handlers::quotations::print_quotation,

        // Reference lists
        crate::handlers::choices::list_choices,
        crate::handlers::choices::list_active_choices,
        crate::handlers::choices::add_choice,
        crate::handlers::choices::toggle_choice,
        crate::handlers::choices::delete_choice,

        crate::handlers::stats::get_stats,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::ResponseMeta,
            crate::errors::ErrorResponse,

            // Catalog
            crate::services::catalog::ProductInput,
            crate::services::catalog::ProductPage,
            crate::handlers::products::ProductFormData,

            // Customers
            crate::services::customers::CustomerInput,

            // Quotations
            crate::services::quotations::QuotationRequest,
            crate::services::quotations::QuotationItemRequest,
            crate::services::quotations::QuotationView,
            crate::services::quotations::QuotationLine,
            crate::services::quotations::QuotationSummary,
            crate::entities::quotation::QuotationStatus,
            crate::handlers::quotations::QuotationSubmitResponse,
            crate::handlers::quotations::QuotationFormData,

            // Reference lists
            crate::services::reference_lists::ReferenceListKind,
            crate::services::reference_lists::ReferenceChoice,
            crate::services::reference_lists::ChoiceOption,
            crate::services::reference_lists::NewChoice,
            crate::entities::ChoiceState,

            crate::handlers::stats::Stats,
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_the_catalog_and_quotation_paths() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Price List API"));
        assert!(json.contains("/products/print-all"));
        assert!(json.contains("/quotations/create"));
        assert!(json.contains("/choices/{kind}/active"));
    }
}
