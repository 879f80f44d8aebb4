// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// A fixed two-section schema, built in three steps:
//
//   Config::default()          the defaults below
//   Config::from_file(path)    JSON file, missing keys keep defaults
//   merge_from_list(opts)      KEY.PATH=VALUE overrides from the CLI
//
// Keys are upper-case on disk and on the command line:
//
//   {"DATASET": {"ROOT": "./data"}, "SOLVER": {"SEED": 7}}
//   --opts SOLVER.MAX_EPOCHS=20 SOLVER.LR_MILESTONES=[10,15]
//
// Once validated the config is only handed out as &Config.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        err:  std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("override '{0}' is not of the form KEY=VALUE")]
    MalformedOverride(String),

    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ─── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields, default)]
pub struct DatasetConfig {
    pub root: String,
    pub name: String,
    pub url:  String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: "./data".to_string(),
            name: "pose".to_string(),
            url:  "https://github.com/pykale/data/raw/main/graphs/pose_pyg_2.pt".to_string(),
        }
    }
}

impl DatasetConfig {
    /// Cache file name: `NAME` plus the extension of the URL's last path
    /// segment, `safetensors` when the URL has none.
    pub fn file_name(&self) -> String {
        let last = self
            .url
            .split(['?', '#'])
            .next()
            .and_then(|u| u.rsplit('/').next())
            .unwrap_or_default();
        let ext = match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => ext,
            _ => "safetensors",
        };
        format!("{}.{ext}", self.name)
    }

    pub fn data_path(&self) -> PathBuf {
        Path::new(&self.root).join(self.file_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields, default)]
pub struct SolverConfig {
    pub seed:          u64,
    pub base_lr:       f64,
    pub lr_milestones: Vec<usize>,
    pub lr_gamma:      f64,
    pub max_epochs:    usize,
    pub warmup:        bool,
    pub warmup_epochs: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            seed:          2020,
            base_lr:       0.01,
            lr_milestones: vec![30, 60, 90],
            lr_gamma:      0.1,
            max_epochs:    5,
            warmup:        false,
            warmup_epochs: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields, default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub solver:  SolverConfig,
}

/// Fresh copy of the defaults.
pub fn get_cfg_defaults() -> Config {
    Config::default()
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|err| ConfigError::Io { path: path.to_path_buf(), err })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Apply overrides. Each entry is `KEY=VALUE`, or a bare `KEY`
    /// followed by its value as the next entry.
    pub fn merge_from_list<S: AsRef<str>>(&mut self, opts: &[S]) -> Result<(), ConfigError> {
        let mut tree = serde_json::to_value(&*self)?;

        for (key, raw) in pair_overrides(opts)? {
            let mut path: Vec<&str> = key.split('.').collect();
            let leaf = path.pop().unwrap_or_default();
            let slot = path
                .iter()
                .try_fold(&mut tree, |node, part| node.get_mut(*part))
                .and_then(|node| node.get_mut(leaf))
                .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;

            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            if slot.is_object() {
                return Err(ConfigError::UnknownKey(key));
            }
            tracing::debug!("Config override {} = {}", key, value);
            *slot = value;
        }

        *self = serde_json::from_value(tree)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.solver;
        let invalid = |key, reason: &str| Err(ConfigError::Invalid { key, reason: reason.to_string() });

        if self.dataset.name.trim().is_empty() {
            return invalid("DATASET.NAME", "must not be empty");
        }
        if !(s.base_lr > 0.0) {
            return invalid("SOLVER.BASE_LR", "must be positive");
        }
        if !(s.lr_gamma > 0.0 && s.lr_gamma <= 1.0) {
            return invalid("SOLVER.LR_GAMMA", "must lie in (0, 1]");
        }
        if s.lr_milestones.windows(2).any(|w| w[0] >= w[1]) {
            return invalid("SOLVER.LR_MILESTONES", "must be strictly increasing");
        }
        if s.max_epochs == 0 {
            return invalid("SOLVER.MAX_EPOCHS", "must be at least 1");
        }
        if s.warmup && s.warmup_epochs == 0 {
            return invalid("SOLVER.WARMUP_EPOCHS", "must be at least 1 when WARMUP is on");
        }
        Ok(())
    }
}

fn pair_overrides<S: AsRef<str>>(opts: &[S]) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs = Vec::with_capacity(opts.len());
    let mut iter = opts.iter().map(AsRef::as_ref);
    while let Some(item) = iter.next() {
        match item.split_once('=') {
            Some((key, value)) if !key.is_empty() => pairs.push((key.to_string(), value.to_string())),
            Some(_) => return Err(ConfigError::MalformedOverride(item.to_string())),
            None => {
                let value = iter.next().ok_or_else(|| ConfigError::MalformedOverride(item.to_string()))?;
                pairs.push((item.to_string(), value.to_string()));
            }
        }
    }
    Ok(pairs)
}
