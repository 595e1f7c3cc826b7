mod common;

use chrono::{TimeZone, Utc};
use common::{product_input, TestApp};
use lopdf::Document;
use pricelist_api::{
    reports::{self, price_sheet},
    services::quotations::{QuotationItemRequest, QuotationRequest},
};
use rust_decimal_macros::dec;

#[tokio::test]
async fn catalog_lists_only_available_products_by_key() {
    let app = TestApp::new().await;
    app.create_product("ZZZ-9", dec!(9.00)).await;
    app.create_product("AAA-1", dec!(1.00)).await;
    app.create_product("MMM-5", dec!(5.00)).await;
    app.state
        .services
        .catalog
        .toggle_availability("MMM-5")
        .await
        .unwrap();

    let products = app.state.services.catalog.list_all().await.unwrap();
    assert_eq!(products.len(), 3);

    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let sheet = price_sheet::catalog_sheet(&products, "Promocionales de Prueba", at);
    let keys: Vec<&str> = sheet.table.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(keys, vec!["AAA-1", "ZZZ-9"]);
    assert_eq!(sheet.table.rows[0][3], "$1.00");

    let bytes = reports::render_catalog(&products, "Promocionales de Prueba", at).unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    assert_eq!(reports::catalog_filename(at), "ListaPrecios_20240301.pdf");
}

#[tokio::test]
async fn product_sheet_renders_from_stored_row() {
    let app = TestApp::new().await;
    let mut input = product_input("MUG-001", dec!(50.00));
    input.precio_mayorista = Some(dec!(0));
    let stored = app.state.services.catalog.create(input).await.unwrap();

    let sheet = price_sheet::product_sheet(&stored, "Promocionales de Prueba", Utc::now());
    let mayorista = sheet
        .table
        .rows
        .iter()
        .find(|row| row[0].contains("Mayorista"))
        .unwrap();
    assert_eq!(mayorista[1], "$0.00");
    let promo = sheet
        .table
        .rows
        .iter()
        .find(|row| row[0].contains("Promoción"))
        .unwrap();
    assert_eq!(promo[1], "N/A");

    let bytes = reports::render_product(&stored, "Promocionales de Prueba", Utc::now()).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.5"));
    Document::load_mem(&bytes).unwrap();
}

#[tokio::test]
async fn quotation_document_closes_with_the_total() {
    let app = TestApp::new().await;
    app.create_product("MUG-001", dec!(50.00)).await;
    let acme = app.create_customer("Acme").await;

    let quotations = &app.state.services.quotations;
    let id = quotations
        .create_quotation(QuotationRequest {
            customer_id: acme.customer_id,
            notas_generales: Some("Entrega en almacén".into()),
            items: vec![QuotationItemRequest {
                clave_producto: "MUG-001".into(),
                cantidad: Some(10),
                precio: Some(dec!(45.00)),
                costo_personalizacion: Some(dec!(5.00)),
                ubicacion: Some("Frente".into()),
                ..Default::default()
            }],
            ..Default::default()
        })
        .await
        .unwrap();
    let view = quotations.get_quotation(id).await.unwrap();

    let sheet = price_sheet::quotation_sheet(&view, "Promocionales de Prueba", Utc::now());
    let last = sheet.table.rows.last().unwrap();
    assert_eq!(last.last().unwrap(), "$500.00");
    assert_eq!(sheet.table.emphasized, vec![sheet.table.rows.len() - 1]);
    assert!(sheet.notes.iter().any(|n| n.contains("Entrega en almacén")));
    assert!(sheet.notes.iter().any(|n| n.contains("Frente")));

    let bytes = reports::render_quotation(&view, "Promocionales de Prueba", Utc::now()).unwrap();
    Document::load_mem(&bytes).unwrap();
    assert_eq!(reports::quotation_filename(id), format!("Cotizacion_{id}.pdf"));
}
