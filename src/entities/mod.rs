pub mod color_choice;
pub mod customer;
pub mod impresion_choice;
pub mod product;
pub mod quotation;
pub mod quotation_detail;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Whether a reference-list entry is still offered for new records.
///
/// Retired entries stay in the table so labels already stored on products
/// keep displaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceState {
    Active,
    Retired,
}

impl ChoiceState {
    pub fn from_flag(activo: bool) -> Self {
        if activo {
            ChoiceState::Active
        } else {
            ChoiceState::Retired
        }
    }

    pub fn is_offered(self) -> bool {
        matches!(self, ChoiceState::Active)
    }

    /// The stored flag for this state.
    pub fn as_flag(self) -> bool {
        self.is_offered()
    }

    pub fn toggled(self) -> Self {
        match self {
            ChoiceState::Active => ChoiceState::Retired,
            ChoiceState::Retired => ChoiceState::Active,
        }
    }
}
