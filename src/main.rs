mod app;
mod config;
mod error;
mod ffs;
mod presets;

use anyhow::Result;
use clap::Parser;

use app::{Cli, read_query, resolve_options, substitute_bbox, write_output};
use presets::PresetCatalog;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = resolve_options(&cli)?;

    if let Some(path) = &options.presets {
        let catalog = PresetCatalog::load(path)?;
        presets::install_session_catalog(catalog);
    }

    let input = read_query(&cli.query)?;

    let start = std::time::Instant::now();
    let compilation = ffs::compile(&input, presets::session_catalog(), &options.compile)?;

    let query = match &options.bbox {
        Some(bbox) => substitute_bbox(&compilation.query, bbox)?,
        None => compilation.query.clone(),
    };

    write_output(&cli.output, &query)?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Compiled {} clauses into {} statements in {:.2}ms",
        compilation.clauses,
        compilation.statements,
        elapsed.as_secs_f64() * 1000.0
    );

    Ok(())
}
