mod common;

use assert_matches::assert_matches;
use common::TestApp;
use pricelist_api::{
    errors::ServiceError,
    services::reference_lists::{
        NewChoice, ReferenceListKind, DEFAULT_COLORS, DEFAULT_PRINTING_TECHNIQUES,
        PLACEHOLDER_LABEL,
    },
};
use rstest::rstest;

fn new_choice(nombre: &str, orden: i32) -> NewChoice {
    NewChoice {
        nombre: nombre.to_string(),
        orden: Some(orden),
        codigo_hex: None,
    }
}

#[rstest]
#[case(ReferenceListKind::Impresion, DEFAULT_PRINTING_TECHNIQUES.len())]
#[case(ReferenceListKind::Colores, DEFAULT_COLORS.len())]
#[tokio::test]
async fn fresh_store_is_seeded(#[case] kind: ReferenceListKind, #[case] expected: usize) {
    let app = TestApp::new().await;
    let entries = app
        .state
        .services
        .reference_lists
        .list_all(kind)
        .await
        .unwrap();
    assert_eq!(entries.len(), expected);
    assert!(entries.iter().all(|e| e.activo));
}

#[tokio::test]
async fn seeding_again_adds_nothing() {
    let app = TestApp::new().await;
    let summary = app
        .state
        .services
        .reference_lists
        .seed_defaults()
        .await
        .unwrap();
    assert_eq!(summary.impresion_added, 0);
    assert_eq!(summary.colores_added, 0);
}

#[tokio::test]
async fn seeding_restores_deleted_defaults_only() {
    let app = TestApp::new().await;
    let lists = &app.state.services.reference_lists;
    let rojo = lists
        .list_all(ReferenceListKind::Colores)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.nombre == "Rojo")
        .unwrap();
    lists.delete(ReferenceListKind::Colores, rojo.id).await.unwrap();

    let summary = lists.seed_defaults().await.unwrap();
    assert_eq!(summary.colores_added, 1);
    assert_eq!(summary.impresion_added, 0);
}

#[tokio::test]
async fn active_options_skip_retired_entries_and_follow_order() {
    let app = TestApp::new().await;
    let lists = &app.state.services.reference_lists;
    let kind = ReferenceListKind::Impresion;

    for existing in lists.list_all(kind).await.unwrap() {
        lists.delete(kind, existing.id).await.unwrap();
    }

    lists.add(kind, new_choice("Bordado", 2)).await.unwrap();
    lists.add(kind, new_choice("Tampografia", 1)).await.unwrap();
    let retired = lists.add(kind, new_choice("Offset", 0)).await.unwrap();
    lists.add(kind, new_choice("Alto relieve", 2)).await.unwrap();
    lists.toggle_active(kind, retired.id).await.unwrap();

    let labels: Vec<String> = lists
        .list_active(kind)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.label)
        .collect();
    assert_eq!(
        labels,
        vec![PLACEHOLDER_LABEL, "Tampografia", "Alto relieve", "Bordado"]
    );

    let all = lists.list_all(kind).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].nombre, "Offset");
    assert!(!all[0].activo);
}

#[tokio::test]
async fn toggle_flips_and_reports_state() {
    let app = TestApp::new().await;
    let lists = &app.state.services.reference_lists;
    let entry = lists
        .add(ReferenceListKind::Colores, new_choice("Vino", 99))
        .await
        .unwrap();

    let retired = lists
        .toggle_active(ReferenceListKind::Colores, entry.id)
        .await
        .unwrap();
    assert!(!retired.activo);
    assert!(!lists
        .is_offered(ReferenceListKind::Colores, "Vino")
        .await
        .unwrap());

    let restored = lists
        .toggle_active(ReferenceListKind::Colores, entry.id)
        .await
        .unwrap();
    assert!(restored.activo);
}

#[tokio::test]
async fn duplicate_and_invalid_entries_are_rejected() {
    let app = TestApp::new().await;
    let lists = &app.state.services.reference_lists;

    assert_matches!(
        lists
            .add(ReferenceListKind::Impresion, new_choice("Serigrafia", 1))
            .await,
        Err(ServiceError::DuplicateKey(_))
    );
    assert_matches!(
        lists
            .add(ReferenceListKind::Impresion, new_choice("   ", 1))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        lists
            .add(
                ReferenceListKind::Colores,
                NewChoice {
                    nombre: "Lila".into(),
                    orden: None,
                    codigo_hex: Some("purple".into()),
                },
            )
            .await,
        Err(ServiceError::ValidationError(_))
    );

    let lila = lists
        .add(
            ReferenceListKind::Colores,
            NewChoice {
                nombre: "Lila".into(),
                orden: None,
                codigo_hex: Some("#C8A2C8".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(lila.codigo_hex.as_deref(), Some("#C8A2C8"));
    assert_eq!(lila.orden, 0);
}

#[tokio::test]
async fn missing_entries_are_not_found() {
    let app = TestApp::new().await;
    let lists = &app.state.services.reference_lists;
    assert_matches!(
        lists.toggle_active(ReferenceListKind::Colores, 9_999).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        lists.delete(ReferenceListKind::Impresion, 9_999).await,
        Err(ServiceError::NotFound(_))
    );
}
