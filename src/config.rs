use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_IMAGE_MODEL_URL: &str = "https://teachablemachine.withgoogle.com/models/KjXP4uvx0/";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub data_path: PathBuf,
    /// No artifact means heuristic mode.
    pub model_path: Option<PathBuf>,
    pub port: u16,
    pub log_predictions: bool,
    pub image_model_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("images/socal2.csv"),
            model_path: None,
            port: 8001,
            log_predictions: false,
            image_model_url: DEFAULT_IMAGE_MODEL_URL.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid config JSON in {}", path.display()))
    }

    /// `CONFIG_PATH` (or defaults), then `DATA_PATH`, `MODEL_PATH`, `PORT`,
    /// `LOG_PRED`, `IMAGE_MODEL_URL` on top.
    pub fn from_env() -> Result<Self> {
        let base = match std::env::var("CONFIG_PATH") {
            Ok(p) => Self::load(Path::new(&p))?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(p) = get("DATA_PATH") {
            self.data_path = PathBuf::from(p);
        }
        if let Some(p) = get("MODEL_PATH").filter(|p| !p.is_empty()) {
            self.model_path = Some(PathBuf::from(p));
        }
        if let Some(port) = get("PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(flag) = get("LOG_PRED") {
            self.log_predictions = flag == "1";
        }
        if let Some(url) = get("IMAGE_MODEL_URL") {
            self.image_model_url = url;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"data_path": "data/homes.csv", "model_path": "model.json"}}"#)
            .expect("write config");

        let cfg = ServiceConfig::load(file.path()).expect("load config");
        assert_eq!(cfg.data_path, PathBuf::from("data/homes.csv"));
        assert_eq!(cfg.model_path, Some(PathBuf::from("model.json")));
        assert_eq!(cfg.port, 8001);
        assert_eq!(cfg.image_model_url, DEFAULT_IMAGE_MODEL_URL);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(ServiceConfig::load(Path::new("/nonexistent/cfg.json")).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("DATA_PATH", "/srv/socal2.csv"),
            ("PORT", "9000"),
            ("LOG_PRED", "1"),
            ("MODEL_PATH", ""),
        ]
        .into_iter()
        .collect();

        let cfg = ServiceConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.data_path, PathBuf::from("/srv/socal2.csv"));
        assert_eq!(cfg.port, 9000);
        assert!(cfg.log_predictions);
        assert_eq!(cfg.model_path, None);
    }

    #[test]
    fn bad_port_is_rejected() {
        let res = ServiceConfig::default()
            .with_overrides(|k| (k == "PORT").then(|| "eighty".to_string()));
        assert!(res.is_err());
    }
}
