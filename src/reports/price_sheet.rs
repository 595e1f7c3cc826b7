//! Product, catalog and quotation documents.
//!
//! The builders are pure: they turn records into a [`Sheet`] that the
//! tests can inspect cell by cell, and `render_*` hands that sheet to
//! the PDF writer.

use super::pdf::{self, Align, Sheet, Table, TableColumn, A4, LETTER};
use crate::{
    entities::product,
    errors::ServiceError,
    pricing::format_currency,
    services::quotations::QuotationView,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Product names are cut to this many characters in multi-row tables
pub const NAME_MAX_CHARS: usize = 25;

const NOT_AVAILABLE: &str = "N/A";

/// Characters, not bytes, so accented names are never split mid-codepoint.
pub fn truncate_name(name: &str) -> String {
    name.chars().take(NAME_MAX_CHARS).collect()
}

fn generated_line(at: DateTime<Utc>) -> String {
    format!("Generado: {}", at.format("%d/%m/%Y %H:%M"))
}

fn or_na(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn price_or_na(value: Option<Decimal>) -> String {
    value
        .map(format_currency)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn price_or_blank(value: Option<Decimal>) -> String {
    value.map(format_currency).unwrap_or_default()
}

/// Single-product fact sheet: every field as a `Campo`/`Valor` row.
pub fn product_sheet(product: &product::Model, company: &str, at: DateTime<Utc>) -> Sheet {
    let rows = vec![
        ("Clave", product.clave_producto.clone()),
        ("Descripción", or_na(product.descripcion.as_deref())),
        ("Medidas", or_na(product.medidas.as_deref())),
        ("Material", or_na(product.material.as_deref())),
        (
            "Empaque",
            product
                .empaque
                .map(|e| e.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
        ("Impresión", or_na(product.impresion.as_deref())),
        ("Colores", or_na(product.colores.as_deref())),
        ("Precio Unitario", format_currency(product.precio_unitario)),
        ("Precio Mayorista", price_or_na(product.precio_mayorista)),
        ("Precio Cliente", price_or_na(product.precio_cliente)),
        ("Precio Promoción", price_or_na(product.precio_promocion)),
        (
            "Precio Cliente Mayorista",
            price_or_na(product.precio_cliente_mayorista),
        ),
        (
            "Disponible",
            if product.available { "Sí" } else { "No" }.to_string(),
        ),
    ];

    Sheet {
        page_size: LETTER,
        title: product.tipo_producto.clone(),
        subtitle: Some(company.to_string()),
        facts: vec![],
        table: Table {
            columns: vec![
                TableColumn::new("Campo", 2.5, Align::Left),
                TableColumn::new("Valor", 3.5, Align::Left),
            ],
            rows: rows
                .into_iter()
                .map(|(label, value)| vec![label.to_string(), value])
                .collect(),
            emphasized: vec![],
            header_font_size: 12.0,
            body_font_size: 10.0,
        },
        notes: vec![],
        footer: generated_line(at),
    }
}

/// Price list of the available products, ordered by key.
///
/// Unavailable products are dropped here as well, so callers may pass the
/// whole catalog.
pub fn catalog_sheet(products: &[product::Model], company: &str, at: DateTime<Utc>) -> Sheet {
    let mut listed: Vec<&product::Model> = products.iter().filter(|p| p.available).collect();
    listed.sort_by(|a, b| a.clave_producto.cmp(&b.clave_producto));

    let rows = listed
        .into_iter()
        .map(|p| {
            vec![
                p.clave_producto.clone(),
                truncate_name(&p.tipo_producto),
                p.impresion.clone().unwrap_or_default(),
                format_currency(p.precio_unitario),
                price_or_blank(p.precio_mayorista),
                price_or_blank(p.precio_cliente),
                price_or_blank(p.precio_promocion),
            ]
        })
        .collect();

    Sheet {
        page_size: A4,
        title: "LISTA DE PRECIOS".to_string(),
        subtitle: Some(format!("{} - {}", company, generated_line(at))),
        facts: vec![],
        table: Table {
            columns: vec![
                TableColumn::new("Clave", 1.0, Align::Center),
                TableColumn::new("Producto", 2.0, Align::Center),
                TableColumn::new("Impresión", 1.2, Align::Center),
                TableColumn::new("Unitario", 0.9, Align::Center),
                TableColumn::new("Mayorista", 0.9, Align::Center),
                TableColumn::new("Cliente", 0.9, Align::Center),
                TableColumn::new("Promo", 0.8, Align::Center),
            ],
            rows,
            emphasized: vec![],
            header_font_size: 9.0,
            body_font_size: 8.0,
        },
        notes: vec![],
        footer: generated_line(at),
    }
}

/// Detailed quotation document with a closing total row.
pub fn quotation_sheet(view: &QuotationView, company: &str, at: DateTime<Utc>) -> Sheet {
    let customer = &view.customer;
    let mut facts = vec![("Cliente".to_string(), customer.display_name())];
    if let Some(contact) = customer
        .contacto_nombre
        .as_ref()
        .filter(|_| customer.nombre_empresa.is_some())
    {
        facts.push(("Contacto".to_string(), contact.clone()));
    }
    if let Some(email) = &customer.email {
        facts.push(("Correo".to_string(), email.clone()));
    }
    facts.extend([
        (
            "Fecha".to_string(),
            view.fecha.format("%d/%m/%Y").to_string(),
        ),
        ("Vigencia".to_string(), format!("{} días", view.vigencia_dias)),
        (
            "Tiempo de entrega".to_string(),
            format!("{} días", view.tiempo_entrega_dias),
        ),
        (
            "Anticipo requerido".to_string(),
            format!("{}%", view.anticipo_requerido_porcentaje.normalize()),
        ),
        ("Estado".to_string(), view.status.as_str().to_string()),
    ]);

    let mut rows: Vec<Vec<String>> = view
        .details
        .iter()
        .map(|line| {
            let mut name = line
                .tipo_producto
                .as_deref()
                .map(truncate_name)
                .unwrap_or_default();
            if let Some(tecnica) = &line.tecnica_personalizacion {
                name = format!("{} ({})", name, tecnica);
            }
            vec![
                line.clave_producto.clone(),
                name,
                line.cantidad.to_string(),
                format_currency(line.precio_pactado),
                format_currency(line.costo_personalizacion),
                format_currency(line.subtotal),
            ]
        })
        .collect();
    let total_row = rows.len();
    rows.push(vec![
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        "TOTAL".to_string(),
        format_currency(view.total),
    ]);

    let mut notes = Vec::new();
    if let Some(general) = view.notas_generales.as_ref().filter(|n| !n.trim().is_empty()) {
        notes.push(format!("Notas: {}", general));
    }
    for line in &view.details {
        let mut parts = Vec::new();
        if let Some(ubicacion) = &line.ubicacion_impresion {
            parts.push(format!("ubicación {}", ubicacion));
        }
        if let Some(comentarios) = &line.comentarios_diseno {
            parts.push(comentarios.clone());
        }
        if !parts.is_empty() {
            notes.push(format!("{}: {}", line.clave_producto, parts.join("; ")));
        }
    }

    Sheet {
        page_size: LETTER,
        title: format!("COTIZACIÓN #{}", view.quotation_id),
        subtitle: Some(company.to_string()),
        facts,
        table: Table {
            columns: vec![
                TableColumn::new("Clave", 1.0, Align::Left),
                TableColumn::new("Producto", 2.2, Align::Left),
                TableColumn::new("Cantidad", 0.8, Align::Right),
                TableColumn::new("Precio", 0.9, Align::Right),
                TableColumn::new("Personalización", 1.1, Align::Right),
                TableColumn::new("Subtotal", 1.0, Align::Right),
            ],
            rows,
            emphasized: vec![total_row],
            header_font_size: 9.0,
            body_font_size: 9.0,
        },
        notes,
        footer: generated_line(at),
    }
}

pub fn render_product(
    product: &product::Model,
    company: &str,
    at: DateTime<Utc>,
) -> Result<Vec<u8>, ServiceError> {
    pdf::render(&product_sheet(product, company, at))
}

pub fn render_catalog(
    products: &[product::Model],
    company: &str,
    at: DateTime<Utc>,
) -> Result<Vec<u8>, ServiceError> {
    pdf::render(&catalog_sheet(products, company, at))
}

pub fn render_quotation(
    view: &QuotationView,
    company: &str,
    at: DateTime<Utc>,
) -> Result<Vec<u8>, ServiceError> {
    pdf::render(&quotation_sheet(view, company, at))
}

pub fn product_filename(clave_producto: &str) -> String {
    format!("Producto_{}.pdf", clave_producto)
}

pub fn catalog_filename(at: DateTime<Utc>) -> String {
    format!("ListaPrecios_{}.pdf", at.format("%Y%m%d"))
}

pub fn quotation_filename(quotation_id: i32) -> String {
    format!("Cotizacion_{}.pdf", quotation_id)
}
