use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::ChoiceState;

/// Printing technique offered on product and quotation forms
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "impresion_choices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub nombre: String,
    pub activo: bool,
    pub orden: i32,
}

impl Model {
    pub fn state(&self) -> ChoiceState {
        ChoiceState::from_flag(self.activo)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
