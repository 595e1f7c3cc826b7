use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_products_table::Migration),
            Box::new(m20240301_000002_create_customers_table::Migration),
            Box::new(m20240301_000003_create_quotations_table::Migration),
            Box::new(m20240301_000004_create_quotation_details_table::Migration),
            Box::new(m20240301_000005_create_choice_tables::Migration),
            Box::new(m20240301_000006_seed_choice_tables::Migration),
        ]
    }
}

mod m20240301_000001_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Products::ClaveProducto)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::TipoProducto).string_len(255).not_null())
                        .col(ColumnDef::new(Products::Descripcion).text().null())
                        .col(ColumnDef::new(Products::Medidas).string_len(100).null())
                        .col(ColumnDef::new(Products::Material).string_len(100).null())
                        .col(ColumnDef::new(Products::Empaque).integer().null())
                        .col(ColumnDef::new(Products::Impresion).string_len(100).null())
                        .col(ColumnDef::new(Products::Colores).string_len(100).null())
                        .col(
                            ColumnDef::new(Products::PrecioUnitario)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::PrecioMayorista).decimal_len(10, 2).null())
                        .col(ColumnDef::new(Products::PrecioCliente).decimal_len(10, 2).null())
                        .col(ColumnDef::new(Products::PrecioPromocion).decimal_len(10, 2).null())
                        .col(
                            ColumnDef::new(Products::PrecioClienteMayorista)
                                .decimal_len(10, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Products::Available)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Listing filters on availability and sorts by creation date
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_available")
                        .table(Products::Table)
                        .col(Products::Available)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_created_at")
                        .table(Products::Table)
                        .col(Products::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Products {
        Table,
        Id,
        ClaveProducto,
        TipoProducto,
        Descripcion,
        Medidas,
        Material,
        Empaque,
        Impresion,
        Colores,
        PrecioUnitario,
        PrecioMayorista,
        PrecioCliente,
        PrecioPromocion,
        PrecioClienteMayorista,
        Available,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_customers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_customers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::CustomerId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Customers::NombreEmpresa).string_len(255).null())
                        .col(ColumnDef::new(Customers::ContactoNombre).string_len(255).null())
                        .col(ColumnDef::new(Customers::Email).string_len(255).null())
                        .col(ColumnDef::new(Customers::Telefono).string_len(50).null())
                        .col(ColumnDef::new(Customers::Rfc).string_len(20).null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customers_nombre_empresa")
                        .table(Customers::Table)
                        .col(Customers::NombreEmpresa)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Customers {
        Table,
        CustomerId,
        NombreEmpresa,
        ContactoNombre,
        Email,
        Telefono,
        Rfc,
    }
}

mod m20240301_000003_create_quotations_table {

    use super::m20240301_000002_create_customers_table::Customers;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_quotations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Quotations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Quotations::QuotationId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Quotations::CustomerId).integer().not_null())
                        .col(
                            ColumnDef::new(Quotations::Fecha)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Quotations::VigenciaDias)
                                .integer()
                                .not_null()
                                .default(15),
                        )
                        .col(
                            ColumnDef::new(Quotations::Status)
                                .string_len(20)
                                .not_null()
                                .default("Draft"),
                        )
                        .col(ColumnDef::new(Quotations::NotasGenerales).text().null())
                        .col(
                            ColumnDef::new(Quotations::TiempoEntregaDias)
                                .integer()
                                .not_null()
                                .default(5),
                        )
                        .col(
                            ColumnDef::new(Quotations::AnticipoRequeridoPorcentaje)
                                .decimal_len(5, 2)
                                .not_null()
                                .default(50),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quotations_customer_id")
                                .from(Quotations::Table, Quotations::CustomerId)
                                .to(Customers::Table, Customers::CustomerId)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotations_customer_id")
                        .table(Quotations::Table)
                        .col(Quotations::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotations_fecha")
                        .table(Quotations::Table)
                        .col(Quotations::Fecha)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Quotations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Quotations {
        Table,
        QuotationId,
        CustomerId,
        Fecha,
        VigenciaDias,
        Status,
        NotasGenerales,
        TiempoEntregaDias,
        AnticipoRequeridoPorcentaje,
    }
}

mod m20240301_000004_create_quotation_details_table {

    use super::m20240301_000001_create_products_table::Products;
    use super::m20240301_000003_create_quotations_table::Quotations;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_quotation_details_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(QuotationDetails::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(QuotationDetails::DetailId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(QuotationDetails::QuotationId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationDetails::ClaveProducto)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationDetails::Cantidad)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(QuotationDetails::PrecioPactado)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QuotationDetails::TecnicaPersonalizacion)
                                .string_len(100)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(QuotationDetails::CostoPersonalizacion)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(QuotationDetails::ComentariosDiseno)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(QuotationDetails::LogoPath)
                                .string_len(255)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(QuotationDetails::UbicacionImpresion)
                                .string_len(100)
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quotation_details_quotation_id")
                                .from(QuotationDetails::Table, QuotationDetails::QuotationId)
                                .to(Quotations::Table, Quotations::QuotationId)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        // Reference by business key, not by surrogate id
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_quotation_details_clave_producto")
                                .from(QuotationDetails::Table, QuotationDetails::ClaveProducto)
                                .to(Products::Table, Products::ClaveProducto)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotation_details_quotation_id")
                        .table(QuotationDetails::Table)
                        .col(QuotationDetails::QuotationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_quotation_details_clave_producto")
                        .table(QuotationDetails::Table)
                        .col(QuotationDetails::ClaveProducto)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(QuotationDetails::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum QuotationDetails {
        Table,
        DetailId,
        QuotationId,
        ClaveProducto,
        Cantidad,
        PrecioPactado,
        TecnicaPersonalizacion,
        CostoPersonalizacion,
        ComentariosDiseno,
        LogoPath,
        UbicacionImpresion,
    }
}

mod m20240301_000005_create_choice_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_choice_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ImpresionChoices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ImpresionChoices::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ImpresionChoices::Nombre)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ImpresionChoices::Activo)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ImpresionChoices::Orden)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ColorsChoices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ColorsChoices::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ColorsChoices::Nombre)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ColorsChoices::Activo)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ColorsChoices::Orden)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ColorsChoices::CodigoHex).string_len(7).null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ColorsChoices::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ImpresionChoices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum ImpresionChoices {
        Table,
        Id,
        Nombre,
        Activo,
        Orden,
    }

    #[derive(DeriveIden)]
    pub(crate) enum ColorsChoices {
        Table,
        Id,
        Nombre,
        Activo,
        Orden,
        CodigoHex,
    }
}

mod m20240301_000006_seed_choice_tables {

    use super::m20240301_000005_create_choice_tables::{ColorsChoices, ImpresionChoices};
    use crate::services::reference_lists::{DEFAULT_COLORS, DEFAULT_PRINTING_TECHNIQUES};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_seed_choice_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut techniques = Query::insert();
            techniques
                .into_table(ImpresionChoices::Table)
                .columns([
                    ImpresionChoices::Nombre,
                    ImpresionChoices::Activo,
                    ImpresionChoices::Orden,
                ]);
            for (position, nombre) in DEFAULT_PRINTING_TECHNIQUES.iter().enumerate() {
                techniques
                    .values([
                        (*nombre).into(),
                        true.into(),
                        (position as i32 + 1).into(),
                    ])
                    .map_err(|e| DbErr::Migration(e.to_string()))?;
            }
            techniques.on_conflict(
                OnConflict::column(ImpresionChoices::Nombre)
                    .do_nothing()
                    .to_owned(),
            );
            manager.exec_stmt(techniques).await?;

            let mut colors = Query::insert();
            colors.into_table(ColorsChoices::Table).columns([
                ColorsChoices::Nombre,
                ColorsChoices::Activo,
                ColorsChoices::Orden,
                ColorsChoices::CodigoHex,
            ]);
            for (position, (nombre, hex)) in DEFAULT_COLORS.iter().enumerate() {
                colors
                    .values([
                        (*nombre).into(),
                        true.into(),
                        (position as i32 + 1).into(),
                        hex.map(str::to_string).into(),
                    ])
                    .map_err(|e| DbErr::Migration(e.to_string()))?;
            }
            colors.on_conflict(
                OnConflict::column(ColorsChoices::Nombre)
                    .do_nothing()
                    .to_owned(),
            );
            manager.exec_stmt(colors).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .exec_stmt(
                    Query::delete()
                        .from_table(ColorsChoices::Table)
                        .and_where(
                            Expr::col(ColorsChoices::Nombre)
                                .is_in(DEFAULT_COLORS.iter().map(|(nombre, _)| *nombre)),
                        )
                        .to_owned(),
                )
                .await?;
            manager
                .exec_stmt(
                    Query::delete()
                        .from_table(ImpresionChoices::Table)
                        .and_where(
                            Expr::col(ImpresionChoices::Nombre)
                                .is_in(DEFAULT_PRINTING_TECHNIQUES.iter().copied()),
                        )
                        .to_owned(),
                )
                .await
        }
    }
}

// Database migration CLI runner
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
