mod common;

use std::io::Write;

use common::TestApp;
use pricelist_api::services::{
    product_import::{ImportMode, ProductImporter},
    quotations::{QuotationItemRequest, QuotationRequest},
};
use rust_decimal_macros::dec;

const HEADER: &str = "clave_producto,nombre_producto,descripcion,impresion,colores,precio_unitario,precio_mayorista,available";

fn importer(app: &TestApp) -> ProductImporter {
    ProductImporter::new(app.state.db.clone())
}

fn csv(rows: &[&str]) -> String {
    let mut body = String::from(HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    body
}

#[tokio::test]
async fn imports_rows_from_a_file() {
    let app = TestApp::new().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        csv(&[
            "MUG-001,Taza blanca,11 oz,Sublimacion,Blanco,\"$1,250.50\",,si",
            "PEN-001,Bolígrafo,,Tampografia,Azul,5,4.5,no",
        ])
    )
    .unwrap();

    let summary = importer(&app)
        .import_path(file.path(), ImportMode::Skip)
        .await
        .unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.errors, 0);

    let catalog = &app.state.services.catalog;
    let mug = catalog.get("MUG-001").await.unwrap();
    assert_eq!(mug.precio_unitario, dec!(1250.50));
    assert!(mug.available);
    let pen = catalog.get("PEN-001").await.unwrap();
    assert_eq!(pen.precio_mayorista, Some(dec!(4.50)));
    assert!(!pen.available);
    assert_eq!(pen.descripcion, None);
}

#[tokio::test]
async fn bad_rows_are_counted_and_good_rows_kept() {
    let app = TestApp::new().await;
    let body = csv(&[
        "OK-1,Uno,,,,10,,",
        ",Sin clave,,,,10,,",
        "BAD-2,Sin precio,,,,abc,,",
        "OK-3,Tres,,,,30,,",
    ]);

    let summary = importer(&app)
        .import_reader(body.as_bytes(), ImportMode::Skip)
        .await
        .unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.processed(), 4);
    assert!(summary.error_details[0].starts_with("Fila 3"));
    assert!(summary.report().contains("Errores:      2"));
}

#[tokio::test]
async fn skip_and_update_modes_treat_existing_keys_differently() {
    let app = TestApp::new().await;
    app.create_product("MUG-001", dec!(50.00)).await;
    let body = csv(&["MUG-001,Taza nueva,,,,60,,"]);

    let skipped = importer(&app)
        .import_reader(body.as_bytes(), ImportMode::Skip)
        .await
        .unwrap();
    assert_eq!(skipped.skipped, 1);
    assert_eq!(
        app.state
            .services
            .catalog
            .get("MUG-001")
            .await
            .unwrap()
            .precio_unitario,
        dec!(50.00)
    );

    let updated = importer(&app)
        .import_reader(body.as_bytes(), ImportMode::Update)
        .await
        .unwrap();
    assert_eq!(updated.imported, 1);
    let mug = app.state.services.catalog.get("MUG-001").await.unwrap();
    assert_eq!(mug.precio_unitario, dec!(60.00));
    assert_eq!(mug.tipo_producto, "Taza nueva");
}

#[tokio::test]
async fn replace_keeps_quoted_products() {
    let app = TestApp::new().await;
    app.create_product("OLD-1", dec!(1.00)).await;
    app.create_product("QUOTED-1", dec!(2.00)).await;
    let acme = app.create_customer("Acme").await;
    app.state
        .services
        .quotations
        .create_quotation(QuotationRequest {
            customer_id: acme.customer_id,
            items: vec![QuotationItemRequest {
                clave_producto: "QUOTED-1".into(),
                cantidad: Some(1),
                precio: Some(dec!(2.00)),
                ..Default::default()
            }],
            ..Default::default()
        })
        .await
        .unwrap();

    let body = csv(&["NEW-1,Nuevo,,,,3,,"]);
    let summary = importer(&app)
        .import_reader(body.as_bytes(), ImportMode::Replace)
        .await
        .unwrap();
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.imported, 1);

    let keys: Vec<String> = app
        .state
        .services
        .catalog
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.clave_producto)
        .collect();
    assert_eq!(keys, vec!["NEW-1".to_string(), "QUOTED-1".to_string()]);
}

#[tokio::test]
async fn missing_required_columns_abort_before_writing() {
    let app = TestApp::new().await;
    let body = "clave_producto,precio_unitario\nMUG-001,10\n";

    let err = importer(&app)
        .import_reader(body.as_bytes(), ImportMode::Skip)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("nombre_producto"));
    assert_eq!(app.state.services.catalog.count().await.unwrap(), 0);
}
