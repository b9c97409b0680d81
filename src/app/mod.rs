use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::ffs::CompileOptions;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Search expression, or - to read it from stdin
    pub query: String,

    /// Preset catalog file (JSON)
    #[arg(short, long)]
    pub presets: Option<PathBuf>,

    /// Settings file (YAML); flags override it
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Bounding box south,west,north,east substituted for (bbox)
    #[arg(long)]
    pub bbox: Option<String>,

    /// Radius in meters for `around` regions
    #[arg(long)]
    pub around_radius: Option<u32>,

    /// Output file, - for stdout
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Settings after flag-over-file resolution.
pub struct RunOptions {
    pub presets: Option<PathBuf>,
    pub compile: CompileOptions,
    pub bbox: Option<String>,
}

/// Merge CLI flags over the settings file over built-in defaults.
pub fn resolve_options(cli: &Cli) -> Result<RunOptions> {
    let file = match &cli.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("CLI: Failed to load settings {}", path.display()))?,
        None => Settings::default(),
    };

    let around_radius = cli
        .around_radius
        .or(file.around_radius)
        .unwrap_or_else(|| CompileOptions::default().around_radius);

    Ok(RunOptions {
        presets: cli.presets.clone().or(file.presets),
        compile: CompileOptions { around_radius },
        bbox: cli.bbox.clone().or(file.bbox),
    })
}

/// The query argument, or stdin when it is `-`.
pub fn read_query(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("CLI: Failed to read query from stdin")?;
        Ok(buf)
    } else {
        Ok(arg.to_string())
    }
}

/// Replace the `(bbox)` placeholder with concrete coordinates.
pub fn substitute_bbox(query: &str, bbox: &str) -> Result<String> {
    let parts: Vec<&str> = bbox.split(',').map(str::trim).collect();
    if parts.len() != 4 || parts.iter().any(|p| p.parse::<f64>().is_err()) {
        anyhow::bail!("CLI: Invalid bbox '{bbox}'; expected south,west,north,east");
    }
    Ok(query.replace("(bbox)", &format!("({})", parts.join(","))))
}

/// Write the compiled query to a file, or stdout for `-`.
pub fn write_output(path: &Path, query: &str) -> Result<()> {
    if path == Path::new("-") {
        println!("{query}");
        Ok(())
    } else {
        std::fs::write(path, format!("{query}\n"))
            .with_context(|| format!("CLI: Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(query: &str) -> Cli {
        Cli {
            query: query.into(),
            presets: None,
            settings: None,
            bbox: None,
            around_radius: None,
            output: PathBuf::from("-"),
            verbose: false,
        }
    }

    #[test]
    fn test_substitute_bbox() {
        let query = "(node[\"a\"](bbox);way[\"a\"](bbox););out body;>;out skel qt;";
        let out = substitute_bbox(query, "48.1, 16.2, 48.3, 16.5").unwrap();
        assert_eq!(
            out,
            "(node[\"a\"](48.1,16.2,48.3,16.5);way[\"a\"](48.1,16.2,48.3,16.5););\
             out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_substitute_bbox_rejects_bad_input() {
        assert!(substitute_bbox("(bbox)", "1,2,3").is_err());
        assert!(substitute_bbox("(bbox)", "1,2,3,north").is_err());
        assert!(substitute_bbox("(bbox)", "").is_err());
    }

    #[test]
    fn test_substitute_bbox_without_placeholder_is_noop() {
        let query = "(node[\"a\"];);out body;>;out skel qt;";
        assert_eq!(substitute_bbox(query, "1,2,3,4").unwrap(), query);
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let opts = resolve_options(&cli("foo=bar")).unwrap();
        assert_eq!(opts.compile.around_radius, 1000);
        assert!(opts.presets.is_none());
        assert!(opts.bbox.is_none());
    }

    #[test]
    fn test_flags_override_settings_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "presets: /data/presets.json").unwrap();
        writeln!(file, "around_radius: 250").unwrap();
        writeln!(file, "bbox: \"1,2,3,4\"").unwrap();

        let mut cli = cli("foo=bar");
        cli.settings = Some(file.path().to_path_buf());
        cli.around_radius = Some(50);

        let opts = resolve_options(&cli).unwrap();
        // flag wins
        assert_eq!(opts.compile.around_radius, 50);
        // file fills the rest
        assert_eq!(opts.presets, Some(PathBuf::from("/data/presets.json")));
        assert_eq!(opts.bbox, Some("1,2,3,4".into()));
    }

    #[test]
    fn test_read_query_passes_plain_arguments_through() {
        assert_eq!(read_query("foo=bar").unwrap(), "foo=bar");
    }
}
