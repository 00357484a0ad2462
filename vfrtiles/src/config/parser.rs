//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ini::{Ini, Properties};

use super::defaults::MAX_ZOOM_LEVEL;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the
/// INI. A `[fan_out]` section replaces the default rules entirely, so an
/// empty section disables splitting.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [catalog] section
    if let Some(section) = ini.section(Some("catalog")) {
        if let Some(v) = non_empty(section, "url") {
            if !v.starts_with("http://") && !v.starts_with("https://") {
                return Err(invalid("catalog", "url", v, "must be an http:// or https:// URL"));
            }
            config.catalog.url = v.to_string();
        }
    }

    // [paths] section
    if let Some(section) = ini.section(Some("paths")) {
        if let Some(v) = non_empty(section, "work_dir") {
            config.paths.work_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "tiles_dir") {
            config.paths.tiles_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "clipping_shapes_dir") {
            config.paths.clipping_shapes_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "tilers_tools_dir") {
            config.paths.tilers_tools_dir = expand_tilde(v);
        }
    }

    // [tiles] section
    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = non_empty(section, "min_zoom") {
            config.tiles.min_zoom = parse_zoom("min_zoom", v)?;
        }
        if let Some(v) = non_empty(section, "max_zoom") {
            config.tiles.max_zoom = parse_zoom("max_zoom", v)?;
        }
    }
    if config.tiles.min_zoom > config.tiles.max_zoom {
        return Err(invalid(
            "tiles",
            "min_zoom",
            &config.tiles.min_zoom.to_string(),
            &format!("must not exceed max_zoom ({})", config.tiles.max_zoom),
        ));
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = non_empty(section, "timeout") {
            config.download.timeout = v
                .parse()
                .ok()
                .filter(|&secs: &u64| secs > 0)
                .ok_or_else(|| {
                    invalid("download", "timeout", v, "must be a positive integer (seconds)")
                })?;
        }
    }

    // [tools] section
    if let Some(section) = ini.section(Some("tools")) {
        if let Some(v) = non_empty(section, "python") {
            config.tools.python = v.to_string();
        }
    }

    // [fan_out] section
    if let Some(section) = ini.section(Some("fan_out")) {
        let mut rules = BTreeMap::new();
        for (chart, value) in section.iter() {
            let parts: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if parts.is_empty() {
                return Err(invalid("fan_out", chart, value, "must list at least one part"));
            }
            rules.insert(chart.to_string(), parts);
        }
        config.fan_out.rules = rules;
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_zoom(key: &str, value: &str) -> Result<u8, ConfigFileError> {
    value
        .parse::<u8>()
        .ok()
        .filter(|&zoom| zoom <= MAX_ZOOM_LEVEL)
        .ok_or_else(|| {
            invalid(
                "tiles",
                key,
                value,
                &format!("must be an integer between 0 and {}", MAX_ZOOM_LEVEL),
            )
        })
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        parse_ini(&Ini::load_from_str(content).unwrap())
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_overlays_values() {
        let config = parse(
            "[paths]\n\
             work_dir = /srv/vfr/tmp\n\
             tiles_dir = /srv/vfr/tiles\n\
             [tiles]\n\
             min_zoom = 4\n\
             max_zoom = 11\n\
             [download]\n\
             timeout = 60\n\
             [tools]\n\
             python = python3\n",
        )
        .unwrap();

        assert_eq!(config.paths.work_dir, PathBuf::from("/srv/vfr/tmp"));
        assert_eq!(config.paths.tiles_dir, PathBuf::from("/srv/vfr/tiles"));
        assert_eq!(config.paths.clipping_shapes_dir, default_clipping_shapes_dir());
        assert_eq!(config.tiles.min_zoom, 4);
        assert_eq!(config.tiles.max_zoom, 11);
        assert_eq!(config.download.timeout, 60);
        assert_eq!(config.tools.python, "python3");
    }

    #[test]
    fn test_blank_value_keeps_default() {
        let config = parse("[paths]\nwork_dir =\n").unwrap();
        assert_eq!(config.paths.work_dir, default_work_dir());
    }

    #[test]
    fn test_tilde_expansion() {
        let config = parse("[paths]\ntiles_dir = ~/charts/tiles\n").unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.paths.tiles_dir, home.join("charts/tiles"));
        }
    }

    #[test]
    fn test_min_zoom_above_max_zoom() {
        let err = parse("[tiles]\nmin_zoom = 5\nmax_zoom = 3\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue {
                section, key, value, ..
            } => {
                assert_eq!(section, "tiles");
                assert_eq!(key, "min_zoom");
                assert_eq!(value, "5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_zoom() {
        assert!(parse("[tiles]\nmax_zoom = 99\n").is_err());
        assert!(parse("[tiles]\nmax_zoom = -1\n").is_err());
        assert!(parse("[tiles]\nmax_zoom = two\n").is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        let err = parse("[download]\ntimeout = 0\n").unwrap_err();
        assert!(err.to_string().contains("download.timeout"));
    }

    #[test]
    fn test_invalid_catalog_url() {
        assert!(parse("[catalog]\nurl = ftp://example.test/\n").is_err());
        let config = parse("[catalog]\nurl = https://example.test/vfr/\n").unwrap();
        assert_eq!(config.catalog.url, "https://example.test/vfr/");
    }

    #[test]
    fn test_fan_out_section_replaces_defaults() {
        let config = parse(
            "[fan_out]\n\
             Hawaiian_Islands = Hawaiian_Islands_North, Hawaiian_Islands_South\n",
        )
        .unwrap();

        let rules = config.fan_out_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules.parts("Hawaiian_Islands").unwrap(),
            ["Hawaiian_Islands_North", "Hawaiian_Islands_South"]
        );
        assert!(rules.parts("Western_Aleutian_Islands").is_none());
    }

    #[test]
    fn test_empty_fan_out_section_disables_splitting() {
        let config = parse("[fan_out]\n").unwrap();
        assert!(config.fan_out_rules().is_empty());
    }

    #[test]
    fn test_fan_out_without_parts() {
        let err = parse("[fan_out]\nSeattle = ,\n").unwrap_err();
        assert!(err.to_string().contains("fan_out.Seattle"));
    }
}
