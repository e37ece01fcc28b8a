use crate::error::FilterError;
use crate::options::Toggle;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref SETTING_RE: Regex = Regex::new(r"^\s*([A-Za-z0-9_]+)\s*=\s*(.*?)\s*$").unwrap();
}

/// Settings read from an options file. `None` means the file did not mention it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub uglifyjs_bin: Option<PathBuf>,
    pub node_bin: Option<PathBuf>,
    pub node_paths: Vec<PathBuf>,
    pub compress: Option<Toggle>,
    pub beautify: Option<bool>,
    pub mangle: Option<bool>,
    pub screw_ie8: Option<bool>,
    pub comments: Option<Toggle>,
    pub wrap: Option<String>,
    pub defines: Vec<String>,
}

/// Reads an options file with one `key = value` setting per line.
pub fn read_config(path: &Path) -> Result<FileConfig, FilterError> {
    info!("Reading config file: {}", path.display());
    let content = fs::read_to_string(path)
        .map_err(|e| FilterError::ConfigRead(path.display().to_string(), e))?;
    parse_config(&content, &path.display().to_string())
}

pub fn parse_config(content: &str, origin: &str) -> Result<FileConfig, FilterError> {
    let mut config = FileConfig::default();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parse_err = |reason: String| FilterError::ConfigParse {
            path: origin.to_string(),
            line: idx + 1,
            reason,
        };

        let captures = SETTING_RE
            .captures(trimmed)
            .ok_or_else(|| parse_err(format!("expected 'key = value', got '{}'", trimmed)))?;
        let key = &captures[1];
        let value = &captures[2];
        debug!("{}:{}: {} = {}", origin, idx + 1, key, value);

        let parse_flag = |value: &str| {
            parse_bool(value).ok_or_else(|| {
                parse_err(format!("'{}' expects a boolean, got '{}'", key, value))
            })
        };

        match key {
            "uglifyjs_bin" => config.uglifyjs_bin = Some(PathBuf::from(value)),
            "node_bin" => config.node_bin = Some(PathBuf::from(value)),
            "node_path" => config.node_paths.push(PathBuf::from(value)),
            "compress" => config.compress = Some(parse_toggle(value)),
            "beautify" => config.beautify = Some(parse_flag(value)?),
            "mangle" => config.mangle = Some(parse_flag(value)?),
            "screw_ie8" => config.screw_ie8 = Some(parse_flag(value)?),
            "comments" => config.comments = Some(parse_toggle(value)),
            "wrap" => config.wrap = Some(value.to_string()),
            "define" => {
                if !value.contains('=') {
                    return Err(parse_err(format!("define '{}' is not KEY=VALUE", value)));
                }
                config.defines.push(value.to_string());
            }
            _ => return Err(parse_err(format!("unknown setting '{}'", key))),
        }
    }

    Ok(config)
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}

/// A boolean turns the flag on or off; anything else becomes the flag's argument.
pub fn parse_toggle(value: &str) -> Toggle {
    match parse_bool(value) {
        Some(enabled) => Toggle::from(enabled),
        None => Toggle::EnabledWithValue(value.to_string()),
    }
}
