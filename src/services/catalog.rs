use crate::{
    db::{self, DbPool},
    entities::{
        product::{self, Entity as Product},
        quotation_detail,
    },
    errors::{FieldErrors, ServiceError},
    pricing::{round_money, MAX_MONEY},
    services::reference_lists::{label_is_offered, ReferenceListKind},
};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

lazy_static! {
    static ref CLAVE_PATTERN: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid clave regex");
}

fn validate_clave(clave: &str) -> Result<(), ValidationError> {
    if CLAVE_PATTERN.is_match(clave) {
        Ok(())
    } else {
        let mut err = ValidationError::new("clave_producto");
        err.message = Some("Solo letras, números, guiones y guiones bajos".into());
        Err(err)
    }
}

fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("Debe ser mayor o igual a 0".into());
        Err(err)
    } else if *value > MAX_MONEY {
        let mut err = ValidationError::new("range");
        err.message = Some(format!("Debe ser menor o igual a {}", MAX_MONEY).into());
        Err(err)
    } else {
        Ok(())
    }
}

fn default_available() -> bool {
    true
}

/// Product form submitted on create and edit
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductInput {
    #[validate(
        length(min = 2, max = 100, message = "Debe tener entre 2 y 100 caracteres"),
        custom = "validate_clave"
    )]
    pub clave_producto: String,

    /// Display name
    #[validate(length(min = 2, max = 255, message = "Debe tener entre 2 y 255 caracteres"))]
    pub tipo_producto: String,

    #[serde(default)]
    #[validate(length(max = 1000, message = "Máximo 1000 caracteres"))]
    pub descripcion: Option<String>,

    #[serde(default)]
    #[validate(length(max = 100, message = "Máximo 100 caracteres"))]
    pub medidas: Option<String>,

    #[serde(default)]
    #[validate(length(max = 100, message = "Máximo 100 caracteres"))]
    pub material: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "Debe ser mayor o igual a 0"))]
    pub empaque: Option<i32>,

    #[serde(default)]
    #[validate(length(min = 1, message = "Seleccione una opción"))]
    pub impresion: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Seleccione un color"))]
    pub colores: String,

    #[serde(default)]
    #[validate(required(message = "Campo requerido"), custom = "validate_price")]
    pub precio_unitario: Option<Decimal>,

    #[serde(default)]
    #[validate(custom = "validate_price")]
    pub precio_mayorista: Option<Decimal>,

    #[serde(default)]
    #[validate(custom = "validate_price")]
    pub precio_cliente: Option<Decimal>,

    #[serde(default)]
    #[validate(custom = "validate_price")]
    pub precio_promocion: Option<Decimal>,

    #[serde(default)]
    #[validate(custom = "validate_price")]
    pub precio_cliente_mayorista: Option<Decimal>,

    #[serde(default = "default_available")]
    pub available: bool,
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ProductInput {
    /// Trims text, turns blank optional fields into `None` and rounds prices to cents.
    pub fn normalized(self) -> Self {
        Self {
            clave_producto: self.clave_producto.trim().to_string(),
            tipo_producto: self.tipo_producto.trim().to_string(),
            descripcion: clean_text(self.descripcion),
            medidas: clean_text(self.medidas),
            material: clean_text(self.material),
            empaque: self.empaque,
            impresion: self.impresion.trim().to_string(),
            colores: self.colores.trim().to_string(),
            precio_unitario: self.precio_unitario.map(round_money),
            precio_mayorista: self.precio_mayorista.map(round_money),
            precio_cliente: self.precio_cliente.map(round_money),
            precio_promocion: self.precio_promocion.map(round_money),
            precio_cliente_mayorista: self.precio_cliente_mayorista.map(round_money),
            available: self.available,
        }
    }

    fn apply(self, model: &mut product::ActiveModel, precio_unitario: Decimal) {
        model.clave_producto = Set(self.clave_producto);
        model.tipo_producto = Set(self.tipo_producto);
        model.descripcion = Set(self.descripcion);
        model.medidas = Set(self.medidas);
        model.material = Set(self.material);
        model.empaque = Set(self.empaque);
        model.impresion = Set(Some(self.impresion));
        model.colores = Set(Some(self.colores));
        model.precio_unitario = Set(precio_unitario);
        model.precio_mayorista = Set(self.precio_mayorista);
        model.precio_cliente = Set(self.precio_cliente);
        model.precio_promocion = Set(self.precio_promocion);
        model.precio_cliente_mayorista = Set(self.precio_cliente_mayorista);
        model.available = Set(self.available);
    }
}

impl From<&product::Model> for ProductInput {
    fn from(model: &product::Model) -> Self {
        Self {
            clave_producto: model.clave_producto.clone(),
            tipo_producto: model.tipo_producto.clone(),
            descripcion: model.descripcion.clone(),
            medidas: model.medidas.clone(),
            material: model.material.clone(),
            empaque: model.empaque,
            impresion: model.impresion.clone().unwrap_or_default(),
            colores: model.colores.clone().unwrap_or_default(),
            precio_unitario: Some(model.precio_unitario),
            precio_mayorista: model.precio_mayorista,
            precio_cliente: model.precio_cliente,
            precio_promocion: model.precio_promocion,
            precio_cliente_mayorista: model.precio_cliente_mayorista,
            available: model.available,
        }
    }
}

/// Catalog listing filters
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductSearch {
    /// Case-insensitive substring of key, name or description
    pub text: Option<String>,
    /// Exact availability filter
    pub available: Option<bool>,
    /// 1-based page number
    pub page: u64,
}

/// One page of the catalog listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductPage {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<product::Model>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// Service for the product catalog
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    page_size: u64,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, page_size: u64) -> Self {
        Self {
            db_pool,
            page_size: page_size.max(1),
        }
    }

    /// Creates a product after validating the form and the selected labels.
    #[instrument(skip(self, input), fields(clave_producto = %input.clave_producto))]
    pub async fn create(&self, input: ProductInput) -> Result<product::Model, ServiceError> {
        let input = input.normalized();
        input.validate()?;
        let precio_unitario = required_price(&input)?;

        let txn = db::begin(&self.db_pool).await?;

        check_labels(&txn, &input, None).await?;

        // Advisory only; the unique index is the real guard
        if find_by_key(&txn, &input.clave_producto).await?.is_some() {
            warn!(clave_producto = %input.clave_producto, "Duplicate product key rejected");
            return Err(duplicate_key(&input.clave_producto));
        }

        let clave = input.clave_producto.clone();
        let mut model = <product::ActiveModel as Default>::default();
        input.apply(&mut model, precio_unitario);

        let created = model
            .insert(&txn)
            .await
            .map_err(|e| ServiceError::from_db(e, &format!("La clave \"{}\"", clave)))?;

        db::commit(txn).await?;

        info!(product_id = created.id, clave_producto = %created.clave_producto, "Product created");
        Ok(created)
    }

    /// Looks a product up by its natural key.
    #[instrument(skip(self))]
    pub async fn get(&self, clave: &str) -> Result<product::Model, ServiceError> {
        find_by_key(&*self.db_pool, clave)
            .await?
            .ok_or_else(|| not_found(clave))
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(product_id = id, error = %e, "Database error when fetching product");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Producto {} no encontrado", id)))
    }

    /// Resolves a path identifier that may be either the natural key or the surrogate id.
    /// An exact key match wins over a numeric id.
    #[instrument(skip(self))]
    pub async fn resolve(&self, identifier: &str) -> Result<product::Model, ServiceError> {
        if let Some(found) = find_by_key(&*self.db_pool, identifier).await? {
            return Ok(found);
        }
        match identifier.parse::<i32>() {
            Ok(id) => self.get_by_id(id).await,
            Err(_) => Err(not_found(identifier)),
        }
    }

    /// Replaces every editable field of the product stored under `clave`.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        clave: &str,
        input: ProductInput,
    ) -> Result<product::Model, ServiceError> {
        let input = input.normalized();
        input.validate()?;
        let precio_unitario = required_price(&input)?;

        let txn = db::begin(&self.db_pool).await?;

        let existing = find_by_key(&txn, clave)
            .await?
            .ok_or_else(|| not_found(clave))?;

        check_labels(&txn, &input, Some(&existing)).await?;

        if input.clave_producto != existing.clave_producto {
            if find_by_key(&txn, &input.clave_producto).await?.is_some() {
                warn!(clave_producto = %input.clave_producto, "Duplicate product key rejected");
                return Err(duplicate_key(&input.clave_producto));
            }
            if reference_count(&txn, &existing.clave_producto).await? > 0 {
                return Err(ServiceError::Conflict(format!(
                    "La clave \"{}\" está en uso por cotizaciones y no puede cambiarse",
                    existing.clave_producto
                )));
            }
        }

        let new_clave = input.clave_producto.clone();
        let mut model: product::ActiveModel = existing.into();
        input.apply(&mut model, precio_unitario);

        let updated = model
            .update(&txn)
            .await
            .map_err(|e| ServiceError::from_db(e, &format!("La clave \"{}\"", new_clave)))?;

        db::commit(txn).await?;

        info!(product_id = updated.id, clave_producto = %updated.clave_producto, "Product updated");
        Ok(updated)
    }

    /// Flips `available`. Existing quotation lines are unaffected.
    #[instrument(skip(self))]
    pub async fn toggle_availability(&self, clave: &str) -> Result<product::Model, ServiceError> {
        let txn = db::begin(&self.db_pool).await?;

        let existing = find_by_key(&txn, clave)
            .await?
            .ok_or_else(|| not_found(clave))?;
        let next = !existing.available;

        let mut model: product::ActiveModel = existing.into();
        model.available = Set(next);
        let updated = model.update(&txn).await?;

        db::commit(txn).await?;

        info!(
            clave_producto = %updated.clave_producto,
            available = updated.available,
            "Product availability toggled"
        );
        Ok(updated)
    }

    /// Hard delete, refused while quotation lines still reference the product.
    #[instrument(skip(self))]
    pub async fn delete(&self, clave: &str) -> Result<(), ServiceError> {
        let txn = db::begin(&self.db_pool).await?;

        let existing = find_by_key(&txn, clave)
            .await?
            .ok_or_else(|| not_found(clave))?;

        let references = reference_count(&txn, &existing.clave_producto).await?;
        if references > 0 {
            warn!(clave_producto = %clave, references, "Delete blocked by quotation lines");
            return Err(ServiceError::Conflict(format!(
                "El producto \"{}\" aparece en {} partida(s) de cotización",
                clave, references
            )));
        }

        Product::delete_by_id(existing.id)
            .exec(&txn)
            .await
            .map_err(|e| ServiceError::from_db(e, &format!("El producto \"{}\"", clave)))?;

        db::commit(txn).await?;

        info!(clave_producto = %clave, "Product deleted");
        Ok(())
    }

    /// Filtered, newest-first listing. Pages past the end come back empty.
    #[instrument(skip(self))]
    pub async fn search(&self, params: ProductSearch) -> Result<ProductPage, ServiceError> {
        let mut query = Product::find();

        if let Some(text) = params
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            let pattern = format!("%{}%", text.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(lower_like(product::Column::ClaveProducto, &pattern))
                    .add(lower_like(product::Column::TipoProducto, &pattern))
                    .add(lower_like(product::Column::Descripcion, &pattern)),
            );
        }

        if let Some(available) = params.available {
            query = query.filter(product::Column::Available.eq(available));
        }

        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .paginate(&*self.db_pool, self.page_size);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Database error when counting products");
            ServiceError::DatabaseError(e)
        })?;

        let page = params.page.max(1);
        let total_pages = total.div_ceil(self.page_size);
        let items = if page > total_pages {
            Vec::new()
        } else {
            paginator.fetch_page(page - 1).await.map_err(|e| {
                error!(page, error = %e, "Database error when fetching products");
                ServiceError::DatabaseError(e)
            })?
        };

        Ok(ProductPage {
            items,
            page,
            per_page: self.page_size,
            total,
            total_pages,
        })
    }

    /// Every product, ordered by key.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(Product::find()
            .order_by_asc(product::Column::ClaveProducto)
            .all(&*self.db_pool)
            .await?)
    }

    /// Products that can be quoted, ordered by display name.
    #[instrument(skip(self))]
    pub async fn list_available(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(Product::find()
            .filter(product::Column::Available.eq(true))
            .order_by_asc(product::Column::TipoProducto)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(Product::find().count(&*self.db_pool).await?)
    }
}

fn lower_like(column: product::Column, pattern: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(pattern)
}

fn not_found(clave: &str) -> ServiceError {
    ServiceError::NotFound(format!("Producto \"{}\" no encontrado", clave))
}

fn duplicate_key(clave: &str) -> ServiceError {
    ServiceError::DuplicateKey(format!("La clave \"{}\" ya existe.", clave))
}

fn required_price(input: &ProductInput) -> Result<Decimal, ServiceError> {
    input.precio_unitario.ok_or_else(|| {
        let mut fields = FieldErrors::new();
        fields.add("precio_unitario", "Campo requerido");
        ServiceError::InvalidFields(fields)
    })
}

pub(crate) async fn find_by_key<C: ConnectionTrait>(
    conn: &C,
    clave: &str,
) -> Result<Option<product::Model>, ServiceError> {
    Product::find()
        .filter(product::Column::ClaveProducto.eq(clave))
        .one(conn)
        .await
        .map_err(|e| {
            error!(clave_producto = %clave, error = %e, "Database error when fetching product by key");
            ServiceError::DatabaseError(e)
        })
}

pub(crate) async fn reference_count<C: ConnectionTrait>(
    conn: &C,
    clave: &str,
) -> Result<u64, ServiceError> {
    Ok(quotation_detail::Entity::find()
        .filter(quotation_detail::Column::ClaveProducto.eq(clave))
        .count(conn)
        .await?)
}

/// New labels must name an active entry; an unchanged stored label is kept even if retired.
async fn check_labels<C: ConnectionTrait>(
    conn: &C,
    input: &ProductInput,
    existing: Option<&product::Model>,
) -> Result<(), ServiceError> {
    let mut fields = FieldErrors::new();

    let checks = [
        (
            "impresion",
            ReferenceListKind::Impresion,
            &input.impresion,
            existing.and_then(|p| p.impresion.as_deref()),
        ),
        (
            "colores",
            ReferenceListKind::Colores,
            &input.colores,
            existing.and_then(|p| p.colores.as_deref()),
        ),
    ];

    for (field, kind, label, stored) in checks {
        if stored == Some(label.as_str()) {
            continue;
        }
        if !label_is_offered(conn, kind, label).await? {
            fields.add(field, format!("\"{}\" no es una opción válida", label));
        }
    }

    fields.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid_input() -> ProductInput {
        ProductInput {
            clave_producto: "MUG-001".into(),
            tipo_producto: "Taza cerámica".into(),
            impresion: "Serigrafia".into(),
            colores: "Blanco".into(),
            precio_unitario: Some(dec!(50.00)),
            available: true,
            ..Default::default()
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(valid_input().normalized().validate().is_ok());
    }

    #[test]
    fn clave_rejects_spaces_and_symbols() {
        let mut input = valid_input();
        input.clave_producto = "MUG 001!".into();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("clave_producto"));
    }

    #[test]
    fn short_fields_and_negative_prices_are_reported_per_field() {
        let mut input = valid_input();
        input.clave_producto = "M".into();
        input.tipo_producto = "T".into();
        input.empaque = Some(-1);
        input.precio_mayorista = Some(dec!(-0.01));
        let err: ServiceError = input.validate().unwrap_err().into();
        match err {
            ServiceError::InvalidFields(fields) => {
                assert!(fields.contains("clave_producto"));
                assert!(fields.contains("tipo_producto"));
                assert!(fields.contains("empaque"));
                assert!(fields.contains("precio_mayorista"));
                assert!(!fields.contains("precio_unitario"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_unit_price_is_required() {
        let mut input = valid_input();
        input.precio_unitario = None;
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("precio_unitario"));
    }

    #[test]
    fn normalization_blanks_and_rounds() {
        let mut input = valid_input();
        input.clave_producto = "  MUG-001 ".into();
        input.descripcion = Some("   ".into());
        input.precio_unitario = Some(dec!(10.005));
        input.precio_cliente = Some(dec!(0));
        let input = input.normalized();
        assert_eq!(input.clave_producto, "MUG-001");
        assert_eq!(input.descripcion, None);
        assert_eq!(input.precio_unitario, Some(dec!(10.01)));
        assert_eq!(input.precio_cliente, Some(dec!(0)));
    }

    #[test]
    fn available_defaults_to_true_when_omitted() {
        let input: ProductInput = serde_json::from_value(serde_json::json!({
            "clave_producto": "PEN-1",
            "tipo_producto": "Pluma",
            "impresion": "Tampografia",
            "colores": "Azul",
            "precio_unitario": "12.50"
        }))
        .unwrap();
        assert!(input.available);
        assert_eq!(input.precio_unitario, Some(dec!(12.50)));
    }
}
