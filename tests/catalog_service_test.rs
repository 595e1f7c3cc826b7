mod common;

use assert_matches::assert_matches;
use common::{product_input, TestApp};
use pricelist_api::{
    entities::{impresion_choice, product},
    errors::ServiceError,
    services::{
        catalog::ProductSearch,
        quotations::{QuotationItemRequest, QuotationRequest},
        reference_lists::ReferenceListKind,
    },
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

fn raw_product(clave: &str) -> product::ActiveModel {
    product::ActiveModel {
        clave_producto: Set(clave.to_string()),
        tipo_producto: Set(format!("Producto {clave}")),
        precio_unitario: Set(dec!(1.00)),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_then_get_by_key() {
    let app = TestApp::new().await;
    let created = app.create_product("MUG-001", dec!(50.00)).await;

    let fetched = app.state.services.catalog.get("MUG-001").await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.precio_unitario, dec!(50.00));
    assert!(fetched.available);
    assert_eq!(fetched.impresion.as_deref(), Some("Serigrafia"));
}

#[tokio::test]
async fn duplicate_key_is_rejected_and_first_row_kept() {
    let app = TestApp::new().await;
    app.create_product("MUG-001", dec!(50.00)).await;

    let err = app
        .state
        .services
        .catalog
        .create(product_input("MUG-001", dec!(99.00)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::DuplicateKey(_));

    let kept = app.state.services.catalog.get("MUG-001").await.unwrap();
    assert_eq!(kept.precio_unitario, dec!(50.00));
    assert_eq!(app.state.services.catalog.count().await.unwrap(), 1);
}

#[tokio::test]
async fn invalid_form_reports_each_field() {
    let app = TestApp::new().await;
    let mut input = product_input("MUG 001", dec!(10.00));
    input.tipo_producto = "X".into();
    input.precio_unitario = None;

    let err = app.state.services.catalog.create(input).await.unwrap_err();
    match err {
        ServiceError::InvalidFields(fields) => {
            assert!(fields.contains("clave_producto"));
            assert!(fields.contains("tipo_producto"));
            assert!(fields.contains("precio_unitario"));
        }
        other => panic!("expected field errors, got {other:?}"),
    }
}

#[tokio::test]
async fn prices_beyond_column_precision_are_field_errors() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let mut input = product_input("MUG-001", dec!(99999999999999999999));
    input.precio_promocion = Some(dec!(100000000.00));
    match catalog.create(input).await.unwrap_err() {
        ServiceError::InvalidFields(fields) => {
            assert!(fields.contains("precio_unitario"));
            assert!(fields.contains("precio_promocion"));
        }
        other => panic!("expected field errors, got {other:?}"),
    }

    let stored = catalog
        .create(product_input("MUG-001", dec!(99999999.99)))
        .await
        .unwrap();
    assert_eq!(stored.precio_unitario, dec!(99999999.99));
}

#[tokio::test]
async fn money_survives_the_store_round_trip() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let mut input = product_input("MUG-001", dec!(12.35));
    input.precio_mayorista = Some(dec!(45.10));
    input.precio_cliente = Some(dec!(0.01));
    input.precio_promocion = Some(dec!(1234567.89));
    input.precio_cliente_mayorista = Some(dec!(99999999.99));
    catalog.create(input).await.unwrap();

    let stored = catalog.get("MUG-001").await.unwrap();
    assert_eq!(stored.precio_unitario, dec!(12.35));
    assert_eq!(stored.precio_mayorista, Some(dec!(45.10)));
    assert_eq!(stored.precio_cliente, Some(dec!(0.01)));
    assert_eq!(stored.precio_promocion, Some(dec!(1234567.89)));
    assert_eq!(stored.precio_cliente_mayorista, Some(dec!(99999999.99)));
}

#[tokio::test]
async fn unique_key_holds_without_the_service_check() {
    let app = TestApp::new().await;
    let db = &*app.state.db;

    raw_product("MUG-001").insert(db).await.unwrap();
    let err = raw_product("MUG-001").insert(db).await.unwrap_err();
    assert_matches!(
        ServiceError::from_db(err, "La clave \"MUG-001\""),
        ServiceError::DuplicateKey(msg) if msg.contains("MUG-001")
    );

    let err = impresion_choice::ActiveModel {
        nombre: Set("Serigrafia".into()),
        activo: Set(true),
        orden: Set(99),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap_err();
    assert_matches!(
        ServiceError::from_db(err, "La técnica"),
        ServiceError::DuplicateKey(_)
    );
}

#[tokio::test]
async fn quoted_product_row_is_protected_by_the_store() {
    let app = TestApp::new().await;
    let mug = app.create_product("MUG-001", dec!(50.00)).await;
    let acme = app.create_customer("Acme").await;
    app.state
        .services
        .quotations
        .create_quotation(QuotationRequest {
            customer_id: acme.customer_id,
            items: vec![QuotationItemRequest {
                clave_producto: "MUG-001".into(),
                precio: Some(dec!(45.00)),
                ..Default::default()
            }],
            ..Default::default()
        })
        .await
        .unwrap();

    let err = product::Entity::delete_by_id(mug.id)
        .exec(&*app.state.db)
        .await
        .unwrap_err();
    assert_matches!(
        ServiceError::from_db(err, "El producto \"MUG-001\""),
        ServiceError::Conflict(_)
    );
    app.state.services.catalog.get("MUG-001").await.unwrap();
}

#[tokio::test]
async fn labels_must_be_offered_on_create() {
    let app = TestApp::new().await;
    let mut input = product_input("PEN-001", dec!(5.00));
    input.colores = "Fucsia neón".into();

    let err = app.state.services.catalog.create(input).await.unwrap_err();
    match err {
        ServiceError::InvalidFields(fields) => {
            assert!(fields.contains("colores"));
            assert!(!fields.contains("impresion"));
        }
        other => panic!("expected field errors, got {other:?}"),
    }
}

#[tokio::test]
async fn retired_label_survives_an_unrelated_edit() {
    let app = TestApp::new().await;
    app.create_product("MUG-001", dec!(50.00)).await;

    let lists = &app.state.services.reference_lists;
    let rojo = lists
        .list_all(ReferenceListKind::Colores)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.nombre == "Rojo")
        .unwrap();
    lists
        .toggle_active(ReferenceListKind::Colores, rojo.id)
        .await
        .unwrap();

    let mut edit = product_input("MUG-001", dec!(55.00));
    edit.descripcion = Some("Taza de 11 oz".into());
    let updated = app
        .state
        .services
        .catalog
        .update("MUG-001", edit)
        .await
        .unwrap();
    assert_eq!(updated.colores.as_deref(), Some("Rojo"));
    assert_eq!(updated.precio_unitario, dec!(55.00));

    let mut switch = product_input("MUG-001", dec!(55.00));
    switch.colores = "Azul".into();
    app.state
        .services
        .catalog
        .update("MUG-001", switch)
        .await
        .unwrap();

    let mut back = product_input("MUG-001", dec!(55.00));
    back.colores = "Rojo".into();
    let err = app
        .state
        .services
        .catalog
        .update("MUG-001", back)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidFields(_));
}

#[tokio::test]
async fn toggling_twice_restores_availability() {
    let app = TestApp::new().await;
    app.create_product("MUG-001", dec!(50.00)).await;
    let catalog = &app.state.services.catalog;

    let first = catalog.toggle_availability("MUG-001").await.unwrap();
    assert!(!first.available);
    let second = catalog.toggle_availability("MUG-001").await.unwrap();
    assert!(second.available);
}

#[tokio::test]
async fn search_matches_text_and_availability() {
    let app = TestApp::new().await;
    app.create_product("MUG-001", dec!(50.00)).await;
    app.create_product("MUG-002", dec!(52.00)).await;
    app.create_product("PEN-001", dec!(5.00)).await;

    let mut gorra = product_input("CAP-010", dec!(80.00));
    gorra.descripcion = Some("Incluye mug de regalo".into());
    app.state.services.catalog.create(gorra).await.unwrap();

    let catalog = &app.state.services.catalog;
    catalog.toggle_availability("MUG-002").await.unwrap();
    catalog.toggle_availability("PEN-001").await.unwrap();

    let unavailable_mugs = catalog
        .search(ProductSearch {
            text: Some("MUG".into()),
            available: Some(false),
            page: 1,
        })
        .await
        .unwrap();
    let keys: Vec<_> = unavailable_mugs
        .items
        .iter()
        .map(|p| p.clave_producto.as_str())
        .collect();
    assert_eq!(keys, vec!["MUG-002"]);

    let any_mug = catalog
        .search(ProductSearch {
            text: Some("mug".into()),
            available: None,
            page: 1,
        })
        .await
        .unwrap();
    assert_eq!(any_mug.total, 3);
}

#[tokio::test]
async fn search_paginates_and_past_the_end_is_empty() {
    let app = TestApp::new().await;
    for n in 0..12 {
        app.create_product(&format!("ITEM-{n:02}"), dec!(1.00)).await;
    }
    let catalog = &app.state.services.catalog;

    let first = catalog
        .search(ProductSearch {
            page: 1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.total, 12);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.items[0].clave_producto, "ITEM-11");

    let second = catalog
        .search(ProductSearch {
            page: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);

    let past = catalog
        .search(ProductSearch {
            page: 9,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(past.items.is_empty());
    assert_eq!(past.total, 12);

    let far = catalog
        .search(ProductSearch {
            page: u64::MAX,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(far.items.is_empty());
    assert_eq!(far.page, u64::MAX);
    assert_eq!(far.total_pages, 2);
}

#[tokio::test]
async fn delete_is_blocked_while_quoted() {
    let app = TestApp::new().await;
    app.create_product("MUG-001", dec!(50.00)).await;
    app.create_product("PEN-001", dec!(5.00)).await;
    let customer = app.create_customer("Acme").await;

    app.state
        .services
        .quotations
        .create_quotation(QuotationRequest {
            customer_id: customer.customer_id,
            vigencia_dias: None,
            notas_generales: None,
            tiempo_entrega_dias: None,
            anticipo: None,
            items: vec![QuotationItemRequest {
                clave_producto: "MUG-001".into(),
                cantidad: Some(1),
                precio: Some(dec!(45.00)),
                ..Default::default()
            }],
        })
        .await
        .unwrap();

    let catalog = &app.state.services.catalog;
    assert_matches!(
        catalog.delete("MUG-001").await,
        Err(ServiceError::Conflict(_))
    );

    let mut renamed = product_input("MUG-100", dec!(50.00));
    renamed.tipo_producto = "Taza".into();
    assert_matches!(
        catalog.update("MUG-001", renamed).await,
        Err(ServiceError::Conflict(_))
    );

    catalog.delete("PEN-001").await.unwrap();
    assert_matches!(catalog.get("PEN-001").await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn resolve_prefers_key_over_numeric_id() {
    let app = TestApp::new().await;
    let first = app.create_product("A-1", dec!(1.00)).await;
    let numeric = app
        .create_product(&first.id.to_string().repeat(2), dec!(2.00))
        .await;

    let catalog = &app.state.services.catalog;
    assert_eq!(
        catalog.resolve(&first.id.to_string()).await.unwrap().id,
        first.id
    );
    assert_eq!(
        catalog
            .resolve(&numeric.clave_producto)
            .await
            .unwrap()
            .clave_producto,
        numeric.clave_producto
    );
    assert_matches!(
        catalog.resolve("missing").await,
        Err(ServiceError::NotFound(_))
    );
}
