use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Quotation lifecycle state.
///
/// Only `Draft` is ever assigned; the remaining states are declared so stored
/// values round-trip, but no transition into them is defined.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum QuotationStatus {
    #[sea_orm(string_value = "Draft")]
    Draft,
    #[sea_orm(string_value = "Sent")]
    Sent,
    #[sea_orm(string_value = "Accepted")]
    Accepted,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl QuotationStatus {
    /// States reachable from `self`. No transitions are defined yet.
    pub fn allowed_transitions(self) -> &'static [QuotationStatus] {
        match self {
            QuotationStatus::Draft
            | QuotationStatus::Sent
            | QuotationStatus::Accepted
            | QuotationStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: QuotationStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuotationStatus::Draft => "Draft",
            QuotationStatus::Sent => "Sent",
            QuotationStatus::Accepted => "Accepted",
            QuotationStatus::Cancelled => "Cancelled",
        }
    }
}

impl Default for QuotationStatus {
    fn default() -> Self {
        QuotationStatus::Draft
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub quotation_id: i32,
    pub customer_id: i32,
    /// Creation timestamp
    pub fecha: DateTime<Utc>,
    /// Validity window in days
    pub vigencia_dias: i32,
    pub status: QuotationStatus,
    pub notas_generales: Option<String>,
    /// Delivery lead time in days
    pub tiempo_entrega_dias: i32,
    /// Required deposit, as a percentage
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub anticipo_requerido_porcentaje: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::CustomerId",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Customer,
    #[sea_orm(has_many = "super::quotation_detail::Entity")]
    Details,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::quotation_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Details.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.fecha {
                active_model.fecha = Set(Utc::now());
            }
            if let ActiveValue::NotSet = active_model.status {
                active_model.status = Set(QuotationStatus::Draft);
            }
        }

        Ok(active_model)
    }
}
