use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use ilms_api::{
    config::{self, AppConfig},
    db::{self, DbPool},
    errors::ServiceError,
    events,
    labels::{self, render::data_from_json, CanvasDesign, RenderedLabel},
    services::{
        definitions::CreateDefinition, factory::ServiceFactory, locations::CreateLocation,
        materials::CreateMaterial,
    },
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Rendering is a pure function of the two files; no database needed.
        Commands::Render(args) => handle_render(args, cli.json)?,
        Commands::Migrate => {
            let context = CliContext::initialize().await?;
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::Seed => {
            let context = CliContext::initialize().await?;
            let report = seed(&context).await?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "Seeded {} definition(s), {} location(s), {} material(s); {} already present",
                    report.definitions, report.locations, report.materials, report.skipped
                );
            }
        }
        Commands::Trace(args) => {
            let context = CliContext::initialize().await?;
            let events = context
                .factory
                .trace()
                .get_history(&args.subject)
                .await
                .context("failed to load trace history")?;
            if cli.json {
                print_json(&events)?;
            } else if events.is_empty() {
                println!("No history for {}", args.subject);
            } else {
                for e in &events {
                    println!(
                        "- {} • {} {} • {}{}{}",
                        e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        e.subject_type,
                        e.subject_serial.as_deref().unwrap_or("-"),
                        e.event_type,
                        e.location
                            .as_deref()
                            .map(|l| format!(" @ {}", l))
                            .unwrap_or_default(),
                        e.notes
                            .as_deref()
                            .map(|n| format!(" ({})", n))
                            .unwrap_or_default(),
                    );
                }
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "ilms", about = "ILMS command line tools", version)]
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
    /// Apply pending database migrations
    Migrate,
    /// Insert sample definitions, a location tree and materials
    Seed,
    /// Render a label design against print data
    Render(RenderArgs),
    /// Show the history of a serial, container or shipment
    Trace(TraceArgs),
}

#[derive(Args)]
struct RenderArgs {
    #[arg(long, help = "Canvas design JSON file")]
    template: PathBuf,
    #[arg(long, help = "Print data JSON file (flat object)")]
    data: Option<PathBuf>,
    #[arg(long, default_value_t = 100.0, help = "Label width in millimetres")]
    width_mm: f64,
    #[arg(long, default_value_t = 50.0, help = "Label height in millimetres")]
    height_mm: f64,
}

#[derive(Args)]
struct TraceArgs {
    /// Serial number, container serial, shipment number or subject id
    subject: String,
}

struct CliContext {
    db: Arc<DbPool>,
    factory: ServiceFactory,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config: AppConfig =
            config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let (event_sender, mut event_rx) = events::channel(32);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "ilms_cli", event = event.name(), "received async event");
            }
        });

        let factory = ServiceFactory::new(db.clone(), event_sender, &config);
        Ok(Self { db, factory })
    }
}

fn handle_render(args: RenderArgs, json: bool) -> Result<()> {
    let design_raw: Value = read_json(&args.template)?;
    let design = CanvasDesign::parse(&design_raw).context("invalid canvas design")?;
    let data = match &args.data {
        Some(path) => data_from_json(&read_json(path)?),
        None => Default::default(),
    };

    let label = labels::render(args.width_mm, args.height_mm, &design, &data);
    if json {
        print_json(&label)?;
    } else {
        print_label(&label);
    }
    Ok(())
}

fn print_label(label: &RenderedLabel) {
    println!("Label {}x{} px", label.width_px, label.height_px);
    for el in &label.elements {
        println!(
            "- [{}] {} at ({}, {}) {}x{}: {}",
            el.id, el.element_type, el.x, el.y, el.width, el.height, el.content
        );
    }
}

fn read_json(path: &PathBuf) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Default, Serialize)]
struct SeedReport {
    definitions: usize,
    locations: usize,
    materials: usize,
    skipped: usize,
}

impl SeedReport {
    /// Counts an insert, treating "already exists" as a skip so seeding can
    /// be repeated.
    fn tally<T>(&mut self, result: Result<T, ServiceError>, counter: fn(&mut Self)) -> Result<()> {
        match result {
            Ok(_) => counter(self),
            Err(ServiceError::Conflict(_)) => self.skipped += 1,
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

const SEED_DEFINITIONS: &[(&str, &str, &str)] = &[
    ("LOCATION_TYPE", "WAREHOUSE", "Building that stores stock"),
    ("LOCATION_TYPE", "ZONE", "Area inside a warehouse"),
    ("LOCATION_TYPE", "BIN", "Single storage position"),
    ("LOCATION_CAT", "STORAGE", "Regular storage"),
    ("MATERIAL_TYPE", "FINISHED_GOOD", "Sellable product"),
    ("MATERIAL_TYPE", "RAW", "Raw material"),
    ("MATERIAL_CAT", "ELECTRONICS", "Electronic devices"),
];

async fn seed(context: &CliContext) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let definitions = context.factory.definitions();
    for (def_type, value, description) in SEED_DEFINITIONS {
        let result = definitions
            .create(CreateDefinition {
                def_type: def_type.to_string(),
                def_value: value.to_string(),
                description: Some(description.to_string()),
            })
            .await;
        report.tally(result, |r| r.definitions += 1)?;
    }

    let locations = context.factory.locations();
    let warehouse = CreateLocation {
        code: "WH-MAIN".into(),
        name: "Main Warehouse".into(),
        location_type: "WAREHOUSE".into(),
        category: Some("STORAGE".into()),
        city: Some("Rotterdam".into()),
        country: Some("NL".into()),
        ..Default::default()
    };
    report.tally(locations.create(warehouse).await, |r| r.locations += 1)?;

    let parent = locations.get("WH-MAIN").await?;
    let zone = CreateLocation {
        code: "ZN-A".into(),
        name: "Zone A".into(),
        location_type: "ZONE".into(),
        category: Some("STORAGE".into()),
        parent_id: Some(parent.id),
        ..Default::default()
    };
    report.tally(locations.create(zone).await, |r| r.locations += 1)?;

    let materials = context.factory.materials();
    let samples = [
        CreateMaterial {
            code: "MAT-001".into(),
            name: "Corrugated box 40x30x20".into(),
            material_type: Some("RAW".into()),
            base_uom: "EA".into(),
            ..Default::default()
        },
        CreateMaterial {
            code: "PROD-Phone-X".into(),
            name: "Phone X".into(),
            material_type: Some("FINISHED_GOOD".into()),
            category: Some("ELECTRONICS".into()),
            base_uom: "EA".into(),
            is_serial_managed: true,
            gross_weight: Some(0.42),
            net_weight: Some(0.19),
            weight_uom: Some("KG".into()),
            ..Default::default()
        },
    ];
    for material in samples {
        report.tally(materials.create(material).await, |r| r.materials += 1)?;
    }

    Ok(report)
}
