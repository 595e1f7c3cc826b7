use crate::{
    db::{self, DbPool},
    entities::{
        customer,
        product,
        quotation::{self, QuotationStatus},
        quotation_detail,
    },
    errors::ServiceError,
    pricing,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

pub const DEFAULT_VIGENCIA_DIAS: i32 = 15;
pub const DEFAULT_TIEMPO_ENTREGA_DIAS: i32 = 5;
pub const DEFAULT_ANTICIPO: Decimal = dec!(50.00);

/// Form submissions send numbers either as JSON numbers or as strings.
mod flexible {
    use super::*;
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    fn to_i32<E: Error>(raw: Raw) -> Result<Option<i32>, E> {
        let value = match raw {
            Raw::Int(i) => i,
            Raw::Float(f) if f.fract() == 0.0 => f as i64,
            Raw::Float(f) => return Err(E::custom(format!("se esperaba un entero, no {}", f))),
            Raw::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                match s.parse::<i64>() {
                    Ok(i) => i,
                    Err(_) => match s.parse::<f64>() {
                        Ok(f) if f.fract() == 0.0 => f as i64,
                        _ => return Err(E::custom(format!("se esperaba un entero, no \"{}\"", s))),
                    },
                }
            }
        };
        i32::try_from(value)
            .map(Some)
            .map_err(|_| E::custom(format!("entero fuera de rango: {}", value)))
    }

    pub fn i32_required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        to_i32(Raw::deserialize(deserializer)?)?
            .ok_or_else(|| D::Error::custom("valor requerido"))
    }

    pub fn i32_optional<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i32>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            Some(raw) => to_i32(raw),
            None => Ok(None),
        }
    }

    pub fn decimal_optional<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Decimal>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Int(i)) => Ok(Some(Decimal::from(i))),
            Some(Raw::Float(f)) => Decimal::try_from(f)
                .map(Some)
                .map_err(|_| D::Error::custom(format!("importe inválido: {}", f))),
            Some(Raw::Text(s)) => {
                let s = s.trim().trim_start_matches('$').replace(',', "");
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<Decimal>()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("importe inválido: \"{}\"", s)))
            }
        }
    }
}

/// One requested line
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct QuotationItemRequest {
    pub clave_producto: String,
    #[serde(default, deserialize_with = "flexible::i32_optional")]
    pub cantidad: Option<i32>,
    /// Negotiated unit price
    #[serde(default, deserialize_with = "flexible::decimal_optional")]
    pub precio: Option<Decimal>,
    #[serde(default)]
    pub tecnica: Option<String>,
    #[serde(default, deserialize_with = "flexible::decimal_optional")]
    pub costo_personalizacion: Option<Decimal>,
    #[serde(default)]
    pub ubicacion: Option<String>,
    #[serde(default)]
    pub comentarios: Option<String>,
    #[serde(default)]
    pub logo_path: Option<String>,
}

/// Payload of the quotation builder
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct QuotationRequest {
    #[serde(deserialize_with = "flexible::i32_required")]
    pub customer_id: i32,
    #[serde(default, deserialize_with = "flexible::i32_optional")]
    pub vigencia_dias: Option<i32>,
    #[serde(default)]
    pub notas_generales: Option<String>,
    #[serde(default, deserialize_with = "flexible::i32_optional")]
    pub tiempo_entrega_dias: Option<i32>,
    /// Required deposit percentage
    #[serde(default, deserialize_with = "flexible::decimal_optional")]
    pub anticipo: Option<Decimal>,
    #[serde(default)]
    pub items: Vec<QuotationItemRequest>,
}

/// A line ready to be written.
#[derive(Debug)]
struct ValidatedItem {
    clave_producto: String,
    cantidad: i32,
    precio_pactado: Decimal,
    tecnica_personalizacion: Option<String>,
    costo_personalizacion: Decimal,
    ubicacion_impresion: Option<String>,
    comentarios_diseno: Option<String>,
    logo_path: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn validate_item(position: usize, item: QuotationItemRequest) -> Result<ValidatedItem, ServiceError> {
    let line = position + 1;
    let clave_producto = item.clave_producto.trim().to_string();
    if clave_producto.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "Partida {}: falta la clave del producto",
            line
        )));
    }

    let cantidad = item.cantidad.unwrap_or(1);
    if cantidad < 1 {
        return Err(ServiceError::ValidationError(format!(
            "Partida {}: la cantidad debe ser un entero positivo",
            line
        )));
    }

    let precio_pactado = item.precio.ok_or_else(|| {
        ServiceError::ValidationError(format!("Partida {}: falta el precio", line))
    })?;
    let costo_personalizacion = item.costo_personalizacion.unwrap_or(Decimal::ZERO);
    if precio_pactado < Decimal::ZERO || costo_personalizacion < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "Partida {}: los importes no pueden ser negativos",
            line
        )));
    }
    if !pricing::money_in_range(precio_pactado)
        || !pricing::money_in_range(costo_personalizacion)
    {
        return Err(ServiceError::ValidationError(format!(
            "Partida {}: los importes no pueden exceder {}",
            line,
            pricing::MAX_MONEY
        )));
    }

    Ok(ValidatedItem {
        clave_producto,
        cantidad,
        precio_pactado: pricing::round_money(precio_pactado),
        tecnica_personalizacion: clean(item.tecnica),
        costo_personalizacion: pricing::round_money(costo_personalizacion),
        ubicacion_impresion: clean(item.ubicacion),
        comentarios_diseno: clean(item.comentarios),
        logo_path: clean(item.logo_path),
    })
}

/// A quotation line as displayed, with its derived subtotal
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuotationLine {
    pub detail_id: i32,
    pub clave_producto: String,
    /// Current catalog name of the product
    pub tipo_producto: Option<String>,
    pub cantidad: i32,
    pub precio_pactado: Decimal,
    pub tecnica_personalizacion: Option<String>,
    pub costo_personalizacion: Decimal,
    pub ubicacion_impresion: Option<String>,
    pub comentarios_diseno: Option<String>,
    pub logo_path: Option<String>,
    pub subtotal: Decimal,
}

impl QuotationLine {
    fn new(
        detail: quotation_detail::Model,
        product: Option<product::Model>,
    ) -> Result<Self, ServiceError> {
        let subtotal = detail.subtotal()?;
        Ok(Self {
            detail_id: detail.detail_id,
            clave_producto: detail.clave_producto,
            tipo_producto: product.map(|p| p.tipo_producto),
            cantidad: detail.cantidad,
            precio_pactado: detail.precio_pactado,
            tecnica_personalizacion: detail.tecnica_personalizacion,
            costo_personalizacion: detail.costo_personalizacion,
            ubicacion_impresion: detail.ubicacion_impresion,
            comentarios_diseno: detail.comentarios_diseno,
            logo_path: detail.logo_path,
            subtotal,
        })
    }
}

/// A full quotation with its customer, lines and total
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuotationView {
    pub quotation_id: i32,
    pub fecha: DateTime<Utc>,
    pub vigencia_dias: i32,
    pub status: QuotationStatus,
    pub notas_generales: Option<String>,
    pub tiempo_entrega_dias: i32,
    pub anticipo_requerido_porcentaje: Decimal,
    #[schema(value_type = Object)]
    pub customer: customer::Model,
    pub details: Vec<QuotationLine>,
    pub total: Decimal,
}

/// A row of the quotation listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuotationSummary {
    pub quotation_id: i32,
    pub fecha: DateTime<Utc>,
    pub status: QuotationStatus,
    pub customer_id: i32,
    pub customer_name: String,
    pub vigencia_dias: i32,
    pub line_count: usize,
    pub total: Decimal,
}

/// Service for creating and reading quotations
#[derive(Clone)]
pub struct QuotationService {
    db_pool: Arc<DbPool>,
}

impl QuotationService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Writes the header and every line in one transaction and returns the new id.
    /// Nothing is persisted when any line fails.
    #[instrument(skip(self, request), fields(customer_id = request.customer_id, items = request.items.len()))]
    pub async fn create_quotation(&self, request: QuotationRequest) -> Result<i32, ServiceError> {
        let vigencia_dias = request.vigencia_dias.unwrap_or(DEFAULT_VIGENCIA_DIAS);
        let tiempo_entrega_dias = request
            .tiempo_entrega_dias
            .unwrap_or(DEFAULT_TIEMPO_ENTREGA_DIAS);
        let anticipo = request.anticipo.unwrap_or(DEFAULT_ANTICIPO);

        if vigencia_dias < 0 || tiempo_entrega_dias < 0 {
            return Err(ServiceError::ValidationError(
                "Los plazos no pueden ser negativos".to_string(),
            ));
        }
        if anticipo < Decimal::ZERO || anticipo > Decimal::ONE_HUNDRED {
            return Err(ServiceError::ValidationError(
                "El anticipo debe estar entre 0 y 100".to_string(),
            ));
        }

        let items = request
            .items
            .into_iter()
            .enumerate()
            .map(|(position, item)| validate_item(position, item))
            .collect::<Result<Vec<_>, _>>()?;

        let txn = db::begin(&self.db_pool).await?;

        if customer::Entity::find_by_id(request.customer_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Cliente {} no encontrado",
                request.customer_id
            )));
        }

        let header = quotation::ActiveModel {
            customer_id: Set(request.customer_id),
            fecha: Set(Utc::now()),
            vigencia_dias: Set(vigencia_dias),
            status: Set(QuotationStatus::Draft),
            notas_generales: Set(clean(request.notas_generales)),
            tiempo_entrega_dias: Set(tiempo_entrega_dias),
            anticipo_requerido_porcentaje: Set(pricing::round_money(anticipo)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert quotation header");
            ServiceError::DatabaseError(e)
        })?;

        for item in items {
            let exists = product::Entity::find()
                .filter(product::Column::ClaveProducto.eq(item.clave_producto.as_str()))
                .count(&txn)
                .await?
                > 0;
            if !exists {
                warn!(clave_producto = %item.clave_producto, "Quotation references unknown product");
                return Err(ServiceError::NotFound(format!(
                    "Producto \"{}\" no encontrado",
                    item.clave_producto
                )));
            }

            quotation_detail::ActiveModel {
                quotation_id: Set(header.quotation_id),
                clave_producto: Set(item.clave_producto),
                cantidad: Set(item.cantidad),
                precio_pactado: Set(item.precio_pactado),
                tecnica_personalizacion: Set(item.tecnica_personalizacion),
                costo_personalizacion: Set(item.costo_personalizacion),
                comentarios_diseno: Set(item.comentarios_diseno),
                logo_path: Set(item.logo_path),
                ubicacion_impresion: Set(item.ubicacion_impresion),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(quotation_id = header.quotation_id, error = %e, "Failed to insert quotation line");
                ServiceError::DatabaseError(e)
            })?;
        }

        db::commit(txn).await?;

        info!(quotation_id = header.quotation_id, "Quotation created");
        Ok(header.quotation_id)
    }

    /// Loads a quotation with its customer and lines, deriving subtotals and the total.
    #[instrument(skip(self))]
    pub async fn get_quotation(&self, quotation_id: i32) -> Result<QuotationView, ServiceError> {
        let db = &*self.db_pool;

        let (header, customer) = quotation::Entity::find_by_id(quotation_id)
            .find_also_related(customer::Entity)
            .one(db)
            .await
            .map_err(|e| {
                error!(quotation_id, error = %e, "Database error when fetching quotation");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| not_found(quotation_id))?;

        let customer = customer.ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Cotización {} sin cliente {}",
                quotation_id, header.customer_id
            ))
        })?;

        let details: Vec<QuotationLine> = quotation_detail::Entity::find()
            .filter(quotation_detail::Column::QuotationId.eq(quotation_id))
            .order_by_asc(quotation_detail::Column::DetailId)
            .find_also_related(product::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|(detail, product)| QuotationLine::new(detail, product))
            .collect::<Result<_, _>>()?;

        let total = pricing::quotation_total(details.iter().map(|line| line.subtotal))?;

        Ok(QuotationView {
            quotation_id: header.quotation_id,
            fecha: header.fecha,
            vigencia_dias: header.vigencia_dias,
            status: header.status,
            notas_generales: header.notas_generales,
            tiempo_entrega_dias: header.tiempo_entrega_dias,
            anticipo_requerido_porcentaje: header.anticipo_requerido_porcentaje,
            customer,
            details,
            total,
        })
    }

    /// Every quotation, newest first.
    #[instrument(skip(self))]
    pub async fn list_quotations(&self) -> Result<Vec<QuotationSummary>, ServiceError> {
        let db = &*self.db_pool;

        let headers = quotation::Entity::find()
            .find_also_related(customer::Entity)
            .order_by_desc(quotation::Column::Fecha)
            .order_by_desc(quotation::Column::QuotationId)
            .all(db)
            .await?;

        let ids: Vec<i32> = headers.iter().map(|(q, _)| q.quotation_id).collect();
        let mut lines: HashMap<i32, Vec<Decimal>> = HashMap::new();
        if !ids.is_empty() {
            for detail in quotation_detail::Entity::find()
                .filter(quotation_detail::Column::QuotationId.is_in(ids))
                .all(db)
                .await?
            {
                lines
                    .entry(detail.quotation_id)
                    .or_default()
                    .push(detail.subtotal()?);
            }
        }

        headers
            .into_iter()
            .map(|(header, customer)| {
                let subtotals = lines.remove(&header.quotation_id).unwrap_or_default();
                Ok(QuotationSummary {
                    quotation_id: header.quotation_id,
                    fecha: header.fecha,
                    status: header.status,
                    customer_id: header.customer_id,
                    customer_name: customer
                        .map(|c| c.display_name())
                        .unwrap_or_else(|| format!("Cliente #{}", header.customer_id)),
                    vigencia_dias: header.vigencia_dias,
                    line_count: subtotals.len(),
                    total: pricing::quotation_total(subtotals)?,
                })
            })
            .collect()
    }

    /// Deletes the header and all of its lines.
    #[instrument(skip(self))]
    pub async fn delete_quotation(&self, quotation_id: i32) -> Result<(), ServiceError> {
        let txn = db::begin(&self.db_pool).await?;

        if quotation::Entity::find_by_id(quotation_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(not_found(quotation_id));
        }

        let removed = quotation_detail::Entity::delete_many()
            .filter(quotation_detail::Column::QuotationId.eq(quotation_id))
            .exec(&txn)
            .await?;
        quotation::Entity::delete_by_id(quotation_id)
            .exec(&txn)
            .await?;

        db::commit(txn).await?;

        info!(quotation_id, lines = removed.rows_affected, "Quotation deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(quotation::Entity::find().count(&*self.db_pool).await?)
    }
}

fn not_found(quotation_id: i32) -> ServiceError {
    ServiceError::NotFound(format!("Cotización {} no encontrada", quotation_id))
}
