use crate::{
    db::{self, DbPool},
    entities::{color_choice, impresion_choice, ChoiceState},
    errors::ServiceError,
};
use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

/// Printing techniques seeded on first start, in display order.
pub const DEFAULT_PRINTING_TECHNIQUES: &[&str] = &[
    "Grabado laser",
    "Serigrafia",
    "Tampografia",
    "Sublimacion",
    "Bordado",
    "Transfer",
    "Impresión digital",
    "Offset",
    "Grabado punta diamante",
    "Sandblast",
    "Troquelado",
    "Fundido",
];

/// Colors seeded on first start, in display order.
pub const DEFAULT_COLORS: &[(&str, Option<&str>)] = &[
    ("Rojo", Some("#FF0000")),
    ("Azul", Some("#0000FF")),
    ("Verde", Some("#00FF00")),
    ("Amarillo", Some("#FFFF00")),
    ("Negro", Some("#000000")),
    ("Blanco", Some("#FFFFFF")),
    ("Naranja", Some("#FFA500")),
    ("Rosa", Some("#FFC0CB")),
    ("Morado", Some("#800080")),
    ("Gris", Some("#808080")),
    ("Café", Some("#8B4513")),
    ("Dorado", Some("#FFD700")),
    ("Plateado", Some("#C0C0C0")),
    ("Turquesa", Some("#40E0D0")),
    ("Multicolor", None),
    ("Humo", None),
];

/// Label of the synthetic first entry of every selection list.
pub const PLACEHOLDER_LABEL: &str = "Seleccionar...";

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid hex color regex");
}

/// The two reference lists.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReferenceListKind {
    /// Printing techniques
    Impresion,
    /// Colors
    Colores,
}

impl ReferenceListKind {
    fn subject(self) -> &'static str {
        match self {
            ReferenceListKind::Impresion => "Tipo de impresión",
            ReferenceListKind::Colores => "Color",
        }
    }
}

/// A reference-list entry, whichever list it comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReferenceChoice {
    pub id: i32,
    pub nombre: String,
    pub activo: bool,
    pub state: ChoiceState,
    pub orden: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo_hex: Option<String>,
}

impl From<impresion_choice::Model> for ReferenceChoice {
    fn from(model: impresion_choice::Model) -> Self {
        Self {
            id: model.id,
            state: model.state(),
            nombre: model.nombre,
            activo: model.activo,
            orden: model.orden,
            codigo_hex: None,
        }
    }
}

impl From<color_choice::Model> for ReferenceChoice {
    fn from(model: color_choice::Model) -> Self {
        Self {
            id: model.id,
            state: model.state(),
            nombre: model.nombre,
            activo: model.activo,
            orden: model.orden,
            codigo_hex: model.codigo_hex,
        }
    }
}

/// One option of a selection field: `value` is what gets stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo_hex: Option<String>,
}

impl ChoiceOption {
    pub fn placeholder() -> Self {
        Self {
            value: String::new(),
            label: PLACEHOLDER_LABEL.to_string(),
            codigo_hex: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.value.is_empty()
    }
}

/// Request to add an entry to a reference list
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewChoice {
    pub nombre: String,
    #[serde(default)]
    pub orden: Option<i32>,
    /// `#RRGGBB`, colors only
    #[serde(default)]
    pub codigo_hex: Option<String>,
}

/// Rows inserted by [`ReferenceListService::seed_defaults`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SeedSummary {
    pub impresion_added: usize,
    pub colores_added: usize,
}

/// Keeps only entries still offered for new records, in display order.
fn offered(mut entries: Vec<ReferenceChoice>) -> Vec<ReferenceChoice> {
    entries.retain(|entry| entry.state.is_offered());
    entries.sort_by(|a, b| (a.orden, &a.nombre).cmp(&(b.orden, &b.nombre)));
    entries
}

/// Selection-list options: the placeholder followed by every offered entry.
pub fn selection_options(entries: Vec<ReferenceChoice>) -> Vec<ChoiceOption> {
    std::iter::once(ChoiceOption::placeholder())
        .chain(offered(entries).into_iter().map(|entry| ChoiceOption {
            value: entry.nombre.clone(),
            label: entry.nombre,
            codigo_hex: entry.codigo_hex,
        }))
        .collect()
}

/// Service for the printing-technique and color lists
#[derive(Clone)]
pub struct ReferenceListService {
    db_pool: Arc<DbPool>,
}

impl ReferenceListService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Every entry of a list, active or not, ordered by `(orden, nombre)`.
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        kind: ReferenceListKind,
    ) -> Result<Vec<ReferenceChoice>, ServiceError> {
        load_all(&*self.db_pool, kind).await
    }

    /// Options for a selection field.
    #[instrument(skip(self))]
    pub async fn list_active(
        &self,
        kind: ReferenceListKind,
    ) -> Result<Vec<ChoiceOption>, ServiceError> {
        let entries = load_all(&*self.db_pool, kind).await?;
        Ok(selection_options(entries))
    }

    /// Whether `label` names an entry that is currently offered.
    pub async fn is_offered(
        &self,
        kind: ReferenceListKind,
        label: &str,
    ) -> Result<bool, ServiceError> {
        label_is_offered(&*self.db_pool, kind, label).await
    }

    #[instrument(skip(self))]
    pub async fn add(
        &self,
        kind: ReferenceListKind,
        input: NewChoice,
    ) -> Result<ReferenceChoice, ServiceError> {
        let nombre = input.nombre.trim().to_string();
        if nombre.is_empty() {
            return Err(ServiceError::ValidationError(
                "El nombre no puede estar vacío".to_string(),
            ));
        }
        let orden = input.orden.unwrap_or(0);
        let codigo_hex = input
            .codigo_hex
            .map(|hex| hex.trim().to_string())
            .filter(|hex| !hex.is_empty());

        if let Some(hex) = &codigo_hex {
            if kind != ReferenceListKind::Colores {
                return Err(ServiceError::ValidationError(
                    "Solo los colores llevan código hexadecimal".to_string(),
                ));
            }
            if !HEX_COLOR.is_match(hex) {
                return Err(ServiceError::ValidationError(format!(
                    "Código hexadecimal inválido: {}",
                    hex
                )));
            }
        }

        let txn = db::begin(&self.db_pool).await?;

        if name_exists(&txn, kind, &nombre).await? {
            warn!(%kind, nombre = %nombre, "Duplicate reference-list entry rejected");
            return Err(ServiceError::DuplicateKey(format!(
                "'{}' ya existe",
                nombre
            )));
        }

        let created: ReferenceChoice = match kind {
            ReferenceListKind::Impresion => impresion_choice::ActiveModel {
                nombre: Set(nombre.clone()),
                activo: Set(ChoiceState::Active.as_flag()),
                orden: Set(orden),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| ServiceError::from_db(e, kind.subject()))?
            .into(),
            ReferenceListKind::Colores => color_choice::ActiveModel {
                nombre: Set(nombre.clone()),
                activo: Set(ChoiceState::Active.as_flag()),
                orden: Set(orden),
                codigo_hex: Set(codigo_hex),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| ServiceError::from_db(e, kind.subject()))?
            .into(),
        };

        db::commit(txn).await?;

        info!(%kind, id = created.id, nombre = %created.nombre, "Reference-list entry added");
        Ok(created)
    }

    /// Flips an entry between active and retired.
    #[instrument(skip(self))]
    pub async fn toggle_active(
        &self,
        kind: ReferenceListKind,
        id: i32,
    ) -> Result<ReferenceChoice, ServiceError> {
        let txn = db::begin(&self.db_pool).await?;
        let not_found = || ServiceError::NotFound(format!("{} {} no encontrado", kind.subject(), id));

        let updated: ReferenceChoice = match kind {
            ReferenceListKind::Impresion => {
                let model = impresion_choice::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(not_found)?;
                let next = model.state().toggled();
                let mut active: impresion_choice::ActiveModel = model.into();
                active.activo = Set(next.as_flag());
                active.update(&txn).await?.into()
            }
            ReferenceListKind::Colores => {
                let model = color_choice::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(not_found)?;
                let next = model.state().toggled();
                let mut active: color_choice::ActiveModel = model.into();
                active.activo = Set(next.as_flag());
                active.update(&txn).await?.into()
            }
        };

        db::commit(txn).await?;

        info!(%kind, id, state = ?updated.state, "Reference-list entry toggled");
        Ok(updated)
    }

    /// Hard delete. Products keep the label they stored.
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: ReferenceListKind, id: i32) -> Result<(), ServiceError> {
        let txn = db::begin(&self.db_pool).await?;

        let result = match kind {
            ReferenceListKind::Impresion => {
                impresion_choice::Entity::delete_by_id(id).exec(&txn).await
            }
            ReferenceListKind::Colores => color_choice::Entity::delete_by_id(id).exec(&txn).await,
        }
        .map_err(|e| {
            error!(%kind, id, error = %e, "Failed to delete reference-list entry");
            ServiceError::DatabaseError(e)
        })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "{} {} no encontrado",
                kind.subject(),
                id
            )));
        }

        db::commit(txn).await?;

        info!(%kind, id, "Reference-list entry deleted");
        Ok(())
    }

    /// Inserts the default entries whose names are not present yet.
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self) -> Result<SeedSummary, ServiceError> {
        let txn = db::begin(&self.db_pool).await?;
        let mut summary = SeedSummary::default();

        for (position, nombre) in DEFAULT_PRINTING_TECHNIQUES.iter().enumerate() {
            if name_exists(&txn, ReferenceListKind::Impresion, nombre).await? {
                continue;
            }
            impresion_choice::ActiveModel {
                nombre: Set((*nombre).to_string()),
                activo: Set(true),
                orden: Set(position as i32 + 1),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            summary.impresion_added += 1;
        }

        for (position, (nombre, hex)) in DEFAULT_COLORS.iter().enumerate() {
            if name_exists(&txn, ReferenceListKind::Colores, nombre).await? {
                continue;
            }
            color_choice::ActiveModel {
                nombre: Set((*nombre).to_string()),
                activo: Set(true),
                orden: Set(position as i32 + 1),
                codigo_hex: Set(hex.map(str::to_string)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            summary.colores_added += 1;
        }

        db::commit(txn).await?;

        info!(
            impresion_added = summary.impresion_added,
            colores_added = summary.colores_added,
            "Reference lists seeded"
        );
        Ok(summary)
    }
}

/// Whether `label` names an offered entry, read through `conn`.
pub async fn label_is_offered<C: ConnectionTrait>(
    conn: &C,
    kind: ReferenceListKind,
    label: &str,
) -> Result<bool, ServiceError> {
    let entries = load_all(conn, kind).await?;
    Ok(offered(entries).iter().any(|entry| entry.nombre == label))
}

async fn load_all<C: ConnectionTrait>(
    conn: &C,
    kind: ReferenceListKind,
) -> Result<Vec<ReferenceChoice>, ServiceError> {
    let entries = match kind {
        ReferenceListKind::Impresion => impresion_choice::Entity::find()
            .order_by_asc(impresion_choice::Column::Orden)
            .order_by_asc(impresion_choice::Column::Nombre)
            .all(conn)
            .await?
            .into_iter()
            .map(ReferenceChoice::from)
            .collect(),
        ReferenceListKind::Colores => color_choice::Entity::find()
            .order_by_asc(color_choice::Column::Orden)
            .order_by_asc(color_choice::Column::Nombre)
            .all(conn)
            .await?
            .into_iter()
            .map(ReferenceChoice::from)
            .collect(),
    };
    Ok(entries)
}

async fn name_exists<C: ConnectionTrait>(
    conn: &C,
    kind: ReferenceListKind,
    nombre: &str,
) -> Result<bool, ServiceError> {
    let count = match kind {
        ReferenceListKind::Impresion => {
            impresion_choice::Entity::find()
                .filter(impresion_choice::Column::Nombre.eq(nombre))
                .count(conn)
                .await?
        }
        ReferenceListKind::Colores => {
            color_choice::Entity::find()
                .filter(color_choice::Column::Nombre.eq(nombre))
                .count(conn)
                .await?
        }
    };
    Ok(count > 0)
}
