use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use species_range_pipeline::backend::BuiltinBackend;
use species_range_pipeline::catalog::HttpCatalogClient;
use species_range_pipeline::config::{ConfigLoader, INDEX_PATH, ResolvedConfig};
use species_range_pipeline::error::PipelineError;
use species_range_pipeline::layout::Workspace;
use species_range_pipeline::pipeline::{Pipeline, PoolWidths};
use species_range_pipeline::report::RunReport;
use species_range_pipeline::site::HttpSpeciesSite;
use species_range_pipeline::store::SqliteRangeStore;

#[derive(Parser)]
#[command(name = "range-etl")]
#[command(about = "Species range ETL: gridded predictions to dissolved polygon layers in a spatial store")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true)]
    database: Option<String>,

    #[arg(long, global = true)]
    wide_workers: Option<usize>,

    #[arg(long, global = true)]
    narrow_workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the full pipeline: setup, extract, transform, load")]
    Run,
    #[command(about = "Resolve the catalog and create species directories")]
    Setup,
    #[command(about = "Download and extract scenario archives")]
    Extract,
    #[command(about = "Normalize grids, convert rasters and polygonize thresholds")]
    Transform,
    #[command(about = "Dissolve polygon layers and load the destination table")]
    Load,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<PipelineError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PipelineError) -> u8 {
    match error {
        PipelineError::CatalogHttp(_)
        | PipelineError::CatalogStatus { .. }
        | PipelineError::SiteHttp(_)
        | PipelineError::SiteStatus { .. } => 3,
        PipelineError::CatalogRow { .. }
        | PipelineError::LayerName(_)
        | PipelineError::InvalidSlug(_)
        | PipelineError::ConfigRead(_)
        | PipelineError::ConfigParse(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let resolved = resolve(&cli)?;

    let workspace = Workspace::new(resolved.data_dir.clone());
    let catalog = HttpCatalogClient::new(&resolved.index_url).into_diagnostic()?;
    let site = HttpSpeciesSite::new(&resolved.base_url, &resolved.index_url).into_diagnostic()?;
    let pipeline = Pipeline::new(
        workspace,
        catalog,
        site,
        BuiltinBackend,
        PoolWidths {
            wide: resolved.wide_workers,
            narrow: resolved.narrow_workers,
        },
    );

    match cli.command {
        Command::Run => {
            let mut store =
                SqliteRangeStore::open(resolved.database.as_std_path()).into_diagnostic()?;
            let report = pipeline.run(&mut store).into_diagnostic()?;
            print_summary(&report);
        }
        Command::Setup => {
            let species = pipeline.resolve_catalog().into_diagnostic()?;
            let mut report = RunReport::new(species.len());
            pipeline.setup(&species, &mut report).into_diagnostic()?;
            report.finish();
            print_summary(&report);
        }
        Command::Extract => {
            let species = pipeline.resolve_catalog().into_diagnostic()?;
            let mut report = RunReport::new(species.len());
            pipeline.extract(&species, &mut report).into_diagnostic()?;
            report.finish();
            print_summary(&report);
        }
        Command::Transform => {
            let species = pipeline.resolve_catalog().into_diagnostic()?;
            let mut report = RunReport::new(species.len());
            pipeline.transform(&species, &mut report).into_diagnostic()?;
            report.finish();
            print_summary(&report);
        }
        Command::Load => {
            let species = pipeline.resolve_catalog().into_diagnostic()?;
            let mut report = RunReport::new(species.len());
            let mut store =
                SqliteRangeStore::open(resolved.database.as_std_path()).into_diagnostic()?;
            pipeline
                .load(&species, &mut store, &mut report)
                .into_diagnostic()?;
            report.finish();
            print_summary(&report);
        }
    }
    Ok(())
}

fn resolve(cli: &Cli) -> miette::Result<ResolvedConfig> {
    let mut resolved = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    if let Some(dir) = &cli.data_dir {
        resolved.data_dir = Utf8PathBuf::from(dir);
    }
    if let Some(base) = &cli.base_url {
        let base = base.trim_end_matches('/').to_string();
        resolved.index_url = format!("{base}/{INDEX_PATH}");
        resolved.base_url = base;
    }
    if let Some(database) = &cli.database {
        resolved.database = Utf8PathBuf::from(database);
    }
    if let Some(wide) = cli.wide_workers {
        resolved.wide_workers = wide;
    }
    if let Some(narrow) = cli.narrow_workers {
        resolved.narrow_workers = narrow;
    }
    Ok(resolved)
}

fn print_summary(report: &RunReport) {
    println!(
        "{} species, {} skipped units",
        report.species_total,
        report.skips.len()
    );
    for skip in &report.skips {
        println!(
            "  skipped [{}] {} / {}: {}",
            skip.stage, skip.species, skip.unit, skip.reason
        );
    }
}
