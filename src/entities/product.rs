use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};

/// Catalog product, identified across the system by `clave_producto`
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Surrogate key
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Natural key, referenced by quotation details
    #[sea_orm(unique)]
    pub clave_producto: String,

    /// Display name
    pub tipo_producto: String,

    pub descripcion: Option<String>,
    pub medidas: Option<String>,
    pub material: Option<String>,

    /// Units per package
    pub empaque: Option<i32>,

    /// Printing technique label, stored as text
    pub impresion: Option<String>,

    /// Color label, stored as text
    pub colores: Option<String>,

    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub precio_unitario: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub precio_mayorista: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub precio_cliente: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub precio_promocion: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub precio_cliente_mayorista: Option<Decimal>,

    pub available: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::quotation_detail::Entity")]
    QuotationDetails,
}

impl Related<super::quotation_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuotationDetails.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.available {
                active_model.available = Set(true);
            }
            active_model.created_at = Set(now);
        }

        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}
