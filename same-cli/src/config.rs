//! TOML config loading with a simple include-merge mechanism: a config
//! file may declare `include = ["base.toml", ...]`, and those files are
//! merged in first (later keys in the including file win) before the
//! whole thing is deserialized into a `same_core::config::MonitorConfig`.

use color_eyre::eyre::{eyre, Context, Result};
use same_core::config::MonitorConfig;
use std::path::{Path, PathBuf};
use toml::Value;

/// Load and merge a config file and everything it includes, returning the
/// fully materialized monitor configuration.
pub fn load_config(path: &Path) -> Result<MonitorConfig> {
    let merged = load_merged_value(path, &mut Vec::new())?;
    merged
        .try_into()
        .with_context(|| format!("failed to parse merged config from {}", path.display()))
}

fn load_merged_value(path: &Path, visited: &mut Vec<PathBuf>) -> Result<Value> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("config file not found: {}", path.display()))?;
    if visited.contains(&canonical) {
        return Err(eyre!("circular config include detected at {}", path.display()));
    }
    visited.push(canonical);

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let mut value: Value = toml::from_str(&raw)
        .with_context(|| format!("failed to parse TOML in {}", path.display()))?;

    let includes: Vec<String> = value
        .get("include")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    if let Value::Table(table) = &mut value {
        table.remove("include");
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut merged = Value::Table(Default::default());
    for include in includes {
        let include_path = base_dir.join(include);
        let included = load_merged_value(&include_path, visited)?;
        merge_tables(&mut merged, included);
    }
    merge_tables(&mut merged, value);

    Ok(merged)
}

/// Deep-merge `overlay` into `base`, with `overlay`'s scalar values and
/// array replacements taking precedence; nested tables merge recursively.
fn merge_tables(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_table), Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(base_value) => merge_tables(base_value, overlay_value),
                    None => {
                        base_table.insert(key, overlay_value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn loads_a_simple_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("station.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
            [station]
            callsign = "KRAJ/FM"
            sample_rate_hz = 22050
            "#
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.station.callsign, "KRAJ/FM");
        assert_eq!(config.station.sample_rate_hz, 22050);
    }

    #[test]
    fn merges_included_base_file() {
        let dir = tempdir().unwrap();
        let base_path = dir.path().join("base.toml");
        let mut base = std::fs::File::create(&base_path).unwrap();
        writeln!(
            base,
            r#"
            [jurisdiction]
            local_codes = ["039137"]
            "#
        )
        .unwrap();

        let overlay_path = dir.path().join("station.toml");
        let mut overlay = std::fs::File::create(&overlay_path).unwrap();
        writeln!(
            overlay,
            r#"
            include = ["base.toml"]

            [station]
            callsign = "KRAJ/FM"
            "#
        )
        .unwrap();

        let config = load_config(&overlay_path).unwrap();
        assert_eq!(config.jurisdiction.local_codes, vec!["039137".to_string()]);
        assert_eq!(config.station.callsign, "KRAJ/FM");
    }

    #[test]
    fn missing_file_errors() {
        let result = load_config(Path::new("/nonexistent/station.toml"));
        assert!(result.is_err());
    }
}
