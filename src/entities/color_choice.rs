use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::ChoiceState;

/// Color offered on product forms
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "colors_choices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub nombre: String,
    pub activo: bool,
    pub orden: i32,
    /// `#RRGGBB`
    pub codigo_hex: Option<String>,
}

impl Model {
    pub fn state(&self) -> ChoiceState {
        ChoiceState::from_flag(self.activo)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
