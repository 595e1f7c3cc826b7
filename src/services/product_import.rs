//! Bulk product loading from spreadsheet exports.
//!
//! Rows are committed one at a time so a bad row never undoes the good ones.
//! Reference-list membership is not checked here: imported catalogs often use
//! labels that were never added to the lists.

use crate::{
    db::{self, DbPool},
    entities::{product, quotation_detail},
    errors::ServiceError,
    pricing::{money_in_range, round_money},
    services::catalog::find_by_key,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Query, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{debug, info, instrument, warn};

pub const REQUIRED_COLUMNS: [&str; 3] = ["clave_producto", "nombre_producto", "precio_unitario"];

/// Error lines shown in the summary
const MAX_REPORTED_ERRORS: usize = 10;

const TRUTHY: [&str; 7] = ["yes", "sí", "si", "true", "1", "disponible", "available"];

/// What to do with rows whose key already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImportMode {
    /// Leave existing products untouched
    #[default]
    Skip,
    /// Overwrite existing products
    Update,
    /// Delete every unreferenced product before loading
    Replace,
}

/// Outcome of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Products removed up front in `replace` mode
    pub deleted: u64,
    pub error_details: Vec<String>,
}

impl ImportSummary {
    pub fn processed(&self) -> usize {
        self.imported + self.skipped + self.errors
    }

    fn fail(&mut self, message: String) {
        warn!("{}", message);
        self.errors += 1;
        self.error_details.push(message);
    }

    /// Human-readable summary, listing at most the first ten errors.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Importados:   {}", self.imported);
        let _ = writeln!(out, "Omitidos:     {}", self.skipped);
        let _ = writeln!(out, "Errores:      {}", self.errors);
        let _ = writeln!(out, "Procesados:   {}", self.processed());
        if self.deleted > 0 {
            let _ = writeln!(out, "Eliminados:   {}", self.deleted);
        }
        if !self.error_details.is_empty() {
            let _ = writeln!(out, "Detalle de errores:");
            for detail in self.error_details.iter().take(MAX_REPORTED_ERRORS) {
                let _ = writeln!(out, "  - {}", detail);
            }
            if self.error_details.len() > MAX_REPORTED_ERRORS {
                let _ = writeln!(
                    out,
                    "  ... y {} errores más",
                    self.error_details.len() - MAX_REPORTED_ERRORS
                );
            }
        }
        out
    }
}

/// Trims; blank cells are absent.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts `$1,234.50` style amounts.
pub fn clean_decimal(raw: Option<&str>) -> Option<Decimal> {
    let cleaned = raw?.replace('$', "").replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<Decimal>().ok()
}

/// Accepts `12` and `12.0`; anything else is absent.
pub fn clean_integer(raw: Option<&str>) -> Option<i32> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<i32>() {
        return Some(value);
    }
    trimmed.parse::<Decimal>().ok()?.trunc().to_i32()
}

/// Blank means available.
pub fn clean_available(raw: Option<&str>) -> bool {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(value) => {
            let value = value.to_lowercase();
            TRUTHY.contains(&value.as_str())
        }
    }
}

/// Spreadsheet exports are not always UTF-8; fall back to Latin-1.
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// A cleaned row, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub clave_producto: String,
    pub tipo_producto: String,
    pub descripcion: Option<String>,
    pub medidas: Option<String>,
    pub material: Option<String>,
    pub empaque: Option<i32>,
    pub impresion: Option<String>,
    pub colores: Option<String>,
    pub precio_unitario: Decimal,
    pub precio_mayorista: Option<Decimal>,
    pub precio_cliente: Option<Decimal>,
    pub precio_promocion: Option<Decimal>,
    pub precio_cliente_mayorista: Option<Decimal>,
    pub available: bool,
}

impl ImportRecord {
    /// Builds a record from one row; `Err` carries the reason the row is rejected.
    pub fn from_row(row: &HashMap<String, String>) -> Result<Self, String> {
        let cell = |name: &str| row.get(name).map(String::as_str);

        let clave_producto =
            clean_text(cell("clave_producto")).ok_or_else(|| "falta clave_producto".to_string())?;
        let precio_unitario = clean_decimal(cell("precio_unitario"))
            .filter(|p| money_in_range(*p))
            .ok_or_else(|| format!("precio_unitario inválido para '{}'", clave_producto))?;
        let optional_price = |name: &str| match clean_decimal(cell(name)) {
            Some(value) if !money_in_range(value) => {
                Err(format!("{} fuera de rango para '{}'", name, clave_producto))
            }
            value => Ok(value.map(round_money)),
        };

        Ok(Self {
            tipo_producto: clean_text(cell("nombre_producto"))
                .unwrap_or_else(|| "Sin nombre".to_string()),
            descripcion: clean_text(cell("descripcion")),
            medidas: clean_text(cell("medidas")),
            material: clean_text(cell("material")),
            empaque: clean_integer(cell("empaque")),
            impresion: clean_text(cell("impresion")),
            colores: clean_text(cell("colores")),
            precio_unitario: round_money(precio_unitario),
            precio_mayorista: optional_price("precio_mayorista")?,
            precio_cliente: optional_price("precio_cliente")?,
            precio_promocion: optional_price("precio_promocion")?,
            precio_cliente_mayorista: optional_price("precio_cliente_mayorista")?,
            available: clean_available(cell("available")),
            clave_producto,
        })
    }

    fn apply(self, model: &mut product::ActiveModel) {
        model.clave_producto = Set(self.clave_producto);
        model.tipo_producto = Set(self.tipo_producto);
        model.descripcion = Set(self.descripcion);
        model.medidas = Set(self.medidas);
        model.material = Set(self.material);
        model.empaque = Set(self.empaque);
        model.impresion = Set(self.impresion);
        model.colores = Set(self.colores);
        model.precio_unitario = Set(self.precio_unitario);
        model.precio_mayorista = Set(self.precio_mayorista);
        model.precio_cliente = Set(self.precio_cliente);
        model.precio_promocion = Set(self.precio_promocion);
        model.precio_cliente_mayorista = Set(self.precio_cliente_mayorista);
        model.available = Set(self.available);
    }
}

enum RowOutcome {
    Imported,
    Skipped,
}

/// Loads products from CSV files
#[derive(Clone)]
pub struct ProductImporter {
    db_pool: Arc<DbPool>,
}

impl ProductImporter {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn import_path(
        &self,
        path: &Path,
        mode: ImportMode,
    ) -> Result<ImportSummary, ServiceError> {
        let file = std::fs::File::open(path).map_err(|e| {
            ServiceError::ValidationError(format!("No se pudo abrir {}: {}", path.display(), e))
        })?;
        self.import_reader(file, mode).await
    }

    /// Reads every row before touching the store, then writes row by row.
    #[instrument(skip(self, reader))]
    pub async fn import_reader<R: Read>(
        &self,
        reader: R,
        mode: ImportMode,
    ) -> Result<ImportSummary, ServiceError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .byte_headers()
            .map_err(|e| ServiceError::ValidationError(format!("CSV inválido: {}", e)))?
            .iter()
            .map(|h| decode(h).trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|required| !headers.iter().any(|h| h == required))
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Faltan columnas requeridas: {}",
                missing.join(", ")
            )));
        }

        let mut rows = Vec::new();
        for record in csv_reader.byte_records() {
            let record =
                record.map_err(|e| ServiceError::ValidationError(format!("CSV inválido: {}", e)))?;
            let row: HashMap<String, String> = headers
                .iter()
                .cloned()
                .zip(record.iter().map(decode))
                .collect();
            rows.push(row);
        }
        info!(rows = rows.len(), %mode, "CSV parsed");

        let mut summary = ImportSummary::default();

        if mode == ImportMode::Replace {
            summary.deleted = self.delete_unreferenced().await?;
        }

        for (index, row) in rows.iter().enumerate() {
            // Header is line 1
            let line = index + 2;
            let record = match ImportRecord::from_row(row) {
                Ok(record) => record,
                Err(reason) => {
                    summary.fail(format!("Fila {}: {}", line, reason));
                    continue;
                }
            };
            let clave = record.clave_producto.clone();

            match self.write_row(record, mode).await {
                Ok(RowOutcome::Imported) => {
                    debug!(line, clave_producto = %clave, "Row imported");
                    summary.imported += 1;
                }
                Ok(RowOutcome::Skipped) => {
                    debug!(line, clave_producto = %clave, "Row skipped, key exists");
                    summary.skipped += 1;
                }
                Err(e) => summary.fail(format!("Fila {}: {} ({})", line, e, clave)),
            }
        }

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            errors = summary.errors,
            "Import finished"
        );
        Ok(summary)
    }

    async fn write_row(
        &self,
        record: ImportRecord,
        mode: ImportMode,
    ) -> Result<RowOutcome, ServiceError> {
        let txn = db::begin(&self.db_pool).await?;
        let subject = format!("La clave \"{}\"", record.clave_producto);

        match find_by_key(&txn, &record.clave_producto).await? {
            Some(_) if mode == ImportMode::Skip => return Ok(RowOutcome::Skipped),
            Some(existing) => {
                let mut model: product::ActiveModel = existing.into();
                record.apply(&mut model);
                model
                    .update(&txn)
                    .await
                    .map_err(|e| ServiceError::from_db(e, &subject))?;
            }
            None => {
                let mut model = <product::ActiveModel as Default>::default();
                record.apply(&mut model);
                model
                    .insert(&txn)
                    .await
                    .map_err(|e| ServiceError::from_db(e, &subject))?;
            }
        }

        db::commit(txn).await?;
        Ok(RowOutcome::Imported)
    }

    /// Products still quoted survive a replace.
    async fn delete_unreferenced(&self) -> Result<u64, ServiceError> {
        let txn = db::begin(&self.db_pool).await?;

        let result = product::Entity::delete_many()
            .filter(
                product::Column::ClaveProducto.not_in_subquery(
                    Query::select()
                        .column(quotation_detail::Column::ClaveProducto)
                        .from(quotation_detail::Entity)
                        .to_owned(),
                ),
            )
            .exec(&txn)
            .await?;

        db::commit(txn).await?;

        info!(deleted = result.rows_affected, "Unreferenced products removed");
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn decimals_drop_currency_symbols_and_separators() {
        assert_eq!(clean_decimal(Some("$1,234.50")), Some(dec!(1234.50)));
        assert_eq!(clean_decimal(Some(" 12 ")), Some(dec!(12)));
        assert_eq!(clean_decimal(Some("")), None);
        assert_eq!(clean_decimal(Some("n/a")), None);
        assert_eq!(clean_decimal(None), None);
    }

    #[test]
    fn integers_accept_float_notation() {
        assert_eq!(clean_integer(Some("12")), Some(12));
        assert_eq!(clean_integer(Some("12.0")), Some(12));
        assert_eq!(clean_integer(Some("50.9")), Some(50));
        assert_eq!(clean_integer(Some("doce")), None);
        assert_eq!(clean_integer(Some("  ")), None);
    }

    #[test]
    fn availability_defaults_to_true() {
        assert!(clean_available(None));
        assert!(clean_available(Some("")));
        assert!(clean_available(Some("Sí")));
        assert!(clean_available(Some("DISPONIBLE")));
        assert!(!clean_available(Some("no")));
        assert!(!clean_available(Some("agotado")));
    }

    #[test]
    fn record_requires_key_and_unit_price() {
        let missing_key = row(&[("clave_producto", " "), ("precio_unitario", "10")]);
        assert!(ImportRecord::from_row(&missing_key).is_err());

        let bad_price = row(&[("clave_producto", "MUG-1"), ("precio_unitario", "gratis")]);
        let reason = ImportRecord::from_row(&bad_price).unwrap_err();
        assert!(reason.contains("MUG-1"));
    }

    #[test]
    fn record_rejects_amounts_beyond_column_precision() {
        let huge_unit = row(&[("clave_producto", "MUG-1"), ("precio_unitario", "100000000")]);
        assert!(ImportRecord::from_row(&huge_unit).is_err());

        let huge_tier = row(&[
            ("clave_producto", "MUG-1"),
            ("precio_unitario", "10"),
            ("precio_promocion", "100000000000000000000"),
        ]);
        assert!(ImportRecord::from_row(&huge_tier).is_err());

        let negative_tier = row(&[
            ("clave_producto", "MUG-1"),
            ("precio_unitario", "10"),
            ("precio_mayorista", "-1"),
        ]);
        let reason = ImportRecord::from_row(&negative_tier).unwrap_err();
        assert!(reason.contains("precio_mayorista"));
    }

    #[test]
    fn record_fills_defaults() {
        let record = ImportRecord::from_row(&row(&[
            ("clave_producto", "MUG-1"),
            ("nombre_producto", ""),
            ("precio_unitario", "$45.5"),
            ("empaque", "100.0"),
        ]))
        .unwrap();
        assert_eq!(record.tipo_producto, "Sin nombre");
        assert_eq!(record.precio_unitario, dec!(45.50));
        assert_eq!(record.empaque, Some(100));
        assert!(record.available);
        assert_eq!(record.precio_mayorista, None);
    }

    #[test]
    fn mode_parses_from_cli_text() {
        assert_eq!(ImportMode::from_str("update").unwrap(), ImportMode::Update);
        assert_eq!(ImportMode::default(), ImportMode::Skip);
        assert!(ImportMode::from_str("merge").is_err());
    }

    #[test]
    fn report_lists_only_first_ten_errors() {
        let summary = ImportSummary {
            imported: 3,
            skipped: 1,
            errors: 12,
            deleted: 0,
            error_details: (0..12).map(|i| format!("Fila {}: error", i + 2)).collect(),
        };
        let report = summary.report();
        assert!(report.contains("Procesados:   16"));
        assert!(report.contains("Fila 11: error"));
        assert!(!report.contains("Fila 12: error"));
        assert!(report.contains("y 2 errores más"));
    }

    #[test]
    fn latin1_cells_are_decoded() {
        assert_eq!(decode(b"Caf\xe9"), "Café");
        assert_eq!(decode("Impresión".as_bytes()), "Impresión");
    }
}
