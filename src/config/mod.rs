//! Optional settings file.
//!
//! Everything here has a command-line counterpart; flags win over the
//! file, built-in defaults apply last.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings loaded from a YAML file passed via `--settings`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Settings {
    /// Path to the preset catalog JSON.
    pub presets: Option<PathBuf>,
    /// Radius in meters applied to `around` regions.
    pub around_radius: Option<u32>,
    /// Bounding box `south,west,north,east` substituted for the `(bbox)`
    /// placeholder in the emitted query.
    pub bbox: Option<String>,
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_full_settings() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "presets: /data/presets.json").unwrap();
        writeln!(file, "around_radius: 250").unwrap();
        writeln!(file, "bbox: \"48.1,16.2,48.3,16.5\"").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.presets, Some(PathBuf::from("/data/presets.json")));
        assert_eq!(settings.around_radius, Some(250));
        assert_eq!(settings.bbox, Some("48.1,16.2,48.3,16.5".into()));
    }

    #[test]
    fn test_missing_fields_default_to_none() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "around_radius: 50").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.around_radius, Some(50));
        assert!(settings.presets.is_none());
        assert!(settings.bbox.is_none());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        assert!(Settings::load(Path::new("/no/such/settings.yaml")).is_err());
    }
}
