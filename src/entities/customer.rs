use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customer a quotation is addressed to. Every contact field is optional.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub customer_id: i32,
    pub nombre_empresa: Option<String>,
    pub contacto_nombre: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    /// Tax id
    pub rfc: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::quotation::Entity")]
    Quotations,
}

impl Related<super::quotation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Name shown in listings: company, then contact, then the id.
    pub fn display_name(&self) -> String {
        self.nombre_empresa
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                self.contacto_nombre
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
            })
            .map(str::to_string)
            .unwrap_or_else(|| format!("Cliente #{}", self.customer_id))
    }
}
