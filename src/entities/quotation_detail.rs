use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{errors::ServiceError, pricing};

/// One line of a quotation. `precio_pactado` is the negotiated price at the
/// time of the deal and never follows later catalog changes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotation_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub detail_id: i32,
    pub quotation_id: i32,
    /// Product natural key
    pub clave_producto: String,
    pub cantidad: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub precio_pactado: Decimal,
    pub tecnica_personalizacion: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub costo_personalizacion: Decimal,
    pub comentarios_diseno: Option<String>,
    /// Reference to an uploaded logo asset
    pub logo_path: Option<String>,
    pub ubicacion_impresion: Option<String>,
}

impl Model {
    pub fn subtotal(&self) -> Result<Decimal, ServiceError> {
        pricing::line_subtotal(
            self.precio_pactado,
            self.costo_personalizacion,
            self.cantidad,
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quotation::Entity",
        from = "Column::QuotationId",
        to = "super::quotation::Column::QuotationId",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Quotation,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ClaveProducto",
        to = "super::product::Column::ClaveProducto",
        on_update = "Restrict",
        on_delete = "Restrict"
    )]
    Product,
}

impl Related<super::quotation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotation.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
