use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use pricelist_api::{
    config::{self, AppConfig},
    db::{self, DbPool},
    migrator,
    services::{
        product_import::{ImportMode, ProductImporter},
        reference_lists::{NewChoice, ReferenceChoice, ReferenceListKind, ReferenceListService},
    },
};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            migrator::run_migration(context.config.database_url())
                .await
                .context("failed to run migrations")?;
            println!("Migraciones aplicadas");
        }
        Commands::Choices(command) => handle_choices_command(&context, command, cli.json).await?,
        Commands::Import { file, mode } => {
            handle_import_command(&context, file, mode, cli.json).await?
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "pricelist",
    about = "Price list administration: reference lists, bulk import and migrations",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Manage printing techniques and colors
    #[command(subcommand)]
    Choices(ChoicesCommands),
    /// Load products from a CSV file
    Import {
        file: PathBuf,
        /// skip, update or replace
        #[arg(long, default_value = "skip")]
        mode: ImportMode,
    },
}

#[derive(Subcommand)]
enum ChoicesCommands {
    /// Show every entry of a list
    List { kind: ReferenceListKind },
    /// Add an entry
    Add {
        kind: ReferenceListKind,
        nombre: String,
        #[arg(long)]
        orden: Option<i32>,
        /// `#RRGGBB`, colors only
        #[arg(long)]
        hex: Option<String>,
    },
    /// Activate or retire an entry
    Toggle { kind: ReferenceListKind, id: i32 },
    /// Delete an entry
    Delete { kind: ReferenceListKind, id: i32 },
    /// Insert the default entries that are missing
    Seed,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        debug!(target: "pricelist_cli", "database connection ready");

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }

    fn reference_lists(&self) -> ReferenceListService {
        ReferenceListService::new(self.db.clone())
    }

    fn importer(&self) -> ProductImporter {
        ProductImporter::new(self.db.clone())
    }
}

async fn handle_choices_command(
    context: &CliContext,
    command: ChoicesCommands,
    json: bool,
) -> Result<()> {
    let service = context.reference_lists();

    match command {
        ChoicesCommands::List { kind } => {
            let entries = service
                .list_all(kind)
                .await
                .with_context(|| format!("failed to list {}", kind))?;
            if json {
                print_json(&entries)?;
            } else {
                println!("{} ({} entradas)", kind, entries.len());
                for entry in &entries {
                    render_choice(entry);
                }
            }
        }
        ChoicesCommands::Add {
            kind,
            nombre,
            orden,
            hex,
        } => {
            let entry = service
                .add(
                    kind,
                    NewChoice {
                        nombre,
                        orden,
                        codigo_hex: hex,
                    },
                )
                .await
                .context("failed to add entry")?;
            if json {
                print_json(&entry)?;
            } else {
                print!("Agregado: ");
                render_choice(&entry);
            }
        }
        ChoicesCommands::Toggle { kind, id } => {
            let entry = service
                .toggle_active(kind, id)
                .await
                .context("failed to toggle entry")?;
            if json {
                print_json(&entry)?;
            } else {
                render_choice(&entry);
            }
        }
        ChoicesCommands::Delete { kind, id } => {
            service
                .delete(kind, id)
                .await
                .context("failed to delete entry")?;
            println!("Eliminado {} #{}", kind, id);
        }
        ChoicesCommands::Seed => {
            let summary = service
                .seed_defaults()
                .await
                .context("failed to seed reference lists")?;
            if json {
                print_json(&summary)?;
            } else {
                for kind in ReferenceListKind::iter() {
                    let added = match kind {
                        ReferenceListKind::Impresion => summary.impresion_added,
                        ReferenceListKind::Colores => summary.colores_added,
                    };
                    println!("{}: {} agregados", kind, added);
                }
            }
        }
    }

    Ok(())
}

async fn handle_import_command(
    context: &CliContext,
    file: PathBuf,
    mode: ImportMode,
    json: bool,
) -> Result<()> {
    println!("Importando {} (modo {})", file.display(), mode);
    let summary = context
        .importer()
        .import_path(&file, mode)
        .await
        .with_context(|| format!("failed to import {}", file.display()))?;

    if json {
        print_json(&summary)?;
    } else {
        println!("{}", summary.report());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_choice(entry: &ReferenceChoice) {
    let state = if entry.activo { "activo" } else { "inactivo" };
    match &entry.codigo_hex {
        Some(hex) => println!(
            "- #{} {} {} • orden {} • {}",
            entry.id, entry.nombre, hex, entry.orden, state
        ),
        None => println!(
            "- #{} {} • orden {} • {}",
            entry.id, entry.nombre, entry.orden, state
        ),
    }
}
