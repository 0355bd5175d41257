use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use remedy_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// Renders the effective configuration with per-field source attribution.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        ("pharmacy.phone", config.pharmacy.phone.clone(), Some("REMEDY_PHARMACY_PHONE")),
        ("pharmacy.hours", config.pharmacy.hours.clone(), Some("REMEDY_PHARMACY_HOURS")),
        (
            "session.timeout_secs",
            config.session.timeout_secs.to_string(),
            Some("REMEDY_SESSION_TIMEOUT_SECS"),
        ),
        ("logging.level", config.logging.level.clone(), Some("REMEDY_LOG_LEVEL")),
        ("logging.format", format!("{:?}", config.logging.format), Some("REMEDY_LOG_FORMAT")),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in fields {
        lines.push(render_line(
            key,
            &value,
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("remedy.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/remedy.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;
    use toml::Value;

    #[test]
    fn dotted_paths_resolve_into_nested_tables() {
        let doc: Value = "[pharmacy]\nphone = \"+1-555\"\n".parse().expect("parse");
        assert!(contains_path(&doc, "pharmacy.phone"));
        assert!(!contains_path(&doc, "pharmacy.hours"));
        assert!(!contains_path(&doc, "session.timeout_secs"));
    }
}
