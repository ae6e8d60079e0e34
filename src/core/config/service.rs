use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

/// `(section, field)` pairs of `AppConfig` kept in `secrets.yaml`, never in
/// `config.yml`.
const SECRET_FIELDS: [(&str, &str); 2] = [("llm", "api_key"), ("search", "api_key")];

/// Reads and writes the two YAML files behind `AppConfig`.
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// `RAGBOT_CONFIG_PATH`, else the data dir copy, else the project root.
    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAGBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    fn write_path(&self) -> PathBuf {
        match env::var("RAGBOT_CONFIG_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => self.paths.user_data_dir.join("config.yml"),
        }
    }

    /// The public document with API keys from the secrets file filled in.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let mut config = read_section_map(&self.config_path());
        let secrets = read_section_map(&self.paths.secrets_path);

        for (section, field) in SECRET_FIELDS {
            if let Some(value) = secrets.get(section).and_then(|s| s.get(field)) {
                if !value.is_null() {
                    insert_field(&mut config, section, field, value.clone());
                }
            }
        }

        Ok(Value::Object(config))
    }

    /// Loads, validates and types the merged configuration.
    pub fn load_settings(&self) -> Result<AppConfig, ApiError> {
        let merged = self.load_config()?;
        validate_config(&merged)?;
        AppConfig::from_value(&merged)
    }

    /// Stores `payload` as the new config. With `merge`, each section in the
    /// payload only overrides the fields it names. Redacted API keys keep
    /// their stored value.
    pub fn update_config(&self, payload: Value, merge: bool) -> Result<(), ApiError> {
        let Value::Object(incoming) = payload else {
            return Err(ApiError::BadRequest(
                "Config update must be a JSON object".to_string(),
            ));
        };
        let current = match self.load_config()? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut next = if merge { current.clone() } else { Map::new() };
        for (section, value) in incoming {
            if merge {
                if let (Value::Object(fields), Some(Value::Object(existing))) =
                    (&value, next.get_mut(&section))
                {
                    existing.extend(fields.clone());
                    continue;
                }
            }
            next.insert(section, value);
        }
        keep_redacted_secrets(&mut next, &current);

        let document = Value::Object(next);
        validate_config(&document)?;
        self.save(document)
    }

    /// Copy of `config` with every configured API key masked.
    pub fn redact_secrets(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Value::Object(map) = &mut redacted {
            for (section, field) in SECRET_FIELDS {
                if let Some(Value::Object(fields)) = map.get_mut(section) {
                    if fields.get(field).map(|v| !v.is_null()).unwrap_or(false) {
                        fields.insert(
                            field.to_string(),
                            Value::String(REDACT_PLACEHOLDER.to_string()),
                        );
                    }
                }
            }
        }
        redacted
    }

    fn save(&self, document: Value) -> Result<(), ApiError> {
        let (public, secrets) = split_secrets(document);
        write_yaml(&self.write_path(), &public)?;
        write_yaml(&self.paths.secrets_path, &secrets)
    }
}

fn read_section_map(path: &Path) -> Map<String, Value> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Map::new();
    };
    match serde_yaml::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) => Map::new(),
        Ok(_) => {
            tracing::warn!("{} is not a mapping; ignoring it", path.display());
            Map::new()
        }
        Err(err) => {
            tracing::warn!("Ignoring unreadable config file {}: {}", path.display(), err);
            Map::new()
        }
    }
}

fn write_yaml(path: &Path, value: &Value) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ApiError::internal)?;
    }
    let yaml = serde_yaml::to_string(value).map_err(ApiError::internal)?;
    fs::write(path, yaml).map_err(ApiError::internal)
}

fn insert_field(config: &mut Map<String, Value>, section: &str, field: &str, value: Value) {
    let entry = config
        .entry(section.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match entry {
        Value::Object(fields) => {
            fields.insert(field.to_string(), value);
        }
        other => {
            let mut fields = Map::new();
            fields.insert(field.to_string(), value);
            *other = Value::Object(fields);
        }
    }
}

fn keep_redacted_secrets(next: &mut Map<String, Value>, current: &Map<String, Value>) {
    for (section, field) in SECRET_FIELDS {
        let Some(Value::Object(fields)) = next.get_mut(section) else {
            continue;
        };
        if fields.get(field).and_then(Value::as_str) != Some(REDACT_PLACEHOLDER) {
            continue;
        }
        match current.get(section).and_then(|s| s.get(field)) {
            Some(stored) => {
                fields.insert(field.to_string(), stored.clone());
            }
            None => {
                fields.remove(field);
            }
        }
    }
}

/// Moves the API keys out of `document`, returning `(public, secrets)`.
fn split_secrets(document: Value) -> (Value, Value) {
    let mut public = match document {
        Value::Object(map) => map,
        other => return (other, Value::Object(Map::new())),
    };
    let mut secrets = Map::new();

    for (section, field) in SECRET_FIELDS {
        let Some(Value::Object(fields)) = public.get_mut(section) else {
            continue;
        };
        let Some(value) = fields.remove(field) else {
            continue;
        };
        if fields.is_empty() {
            public.remove(section);
        }
        if !value.is_null() {
            insert_field(&mut secrets, section, field, value);
        }
    }

    (Value::Object(public), Value::Object(secrets))
}
