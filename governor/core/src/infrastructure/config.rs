// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Engine Configuration - Environment-Driven Settings
//
// One immutable record produced at startup and shared read-only by every
// component. Invalid weight vectors or threshold pairs abort startup with
// ConfigError; components never see a half-validated configuration.

use std::path::PathBuf;

use crate::domain::error::ConfigError;
use crate::domain::verdict::{SriThresholds, SriWeights};

const ENV_PREFIX: &str = "SENTINEL_";

/// Engine settings, resolved once from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// File-backed stores when true; PostgreSQL-backed when false.
    pub use_local_mocks: bool,
    pub thresholds: SriThresholds,
    pub weights: SriWeights,
    /// Per-evaluator timeout before the neutral score is substituted.
    pub evaluator_timeout_seconds: u64,
    /// Streaming-surface admission bound.
    pub max_concurrent_evaluations: usize,
    /// Advertised in the agent card.
    pub server_url: String,
    /// Root of mock-mode data files (topology.json, policies.json, …).
    pub data_dir: PathBuf,
    /// PostgreSQL connection string for live mode.
    pub database_url: Option<String>,
    /// HTTP listen address.
    pub bind_addr: String,
    /// Optional narration LLM (OpenAI-compatible endpoint).
    pub narration_endpoint: Option<String>,
    pub narration_api_key: Option<String>,
    pub narration_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_local_mocks: true,
            thresholds: SriThresholds::default(),
            weights: SriWeights::default(),
            evaluator_timeout_seconds: 10,
            max_concurrent_evaluations: 64,
            server_url: "http://localhost:8900".to_string(),
            data_dir: PathBuf::from("./data"),
            database_url: None,
            bind_addr: "0.0.0.0:8900".to_string(),
            narration_endpoint: None,
            narration_api_key: None,
            narration_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl Settings {
    /// Build settings from `SENTINEL_*` environment variables and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        if let Some(v) = env_var("USE_LOCAL_MOCKS") {
            settings.use_local_mocks = parse_bool("USE_LOCAL_MOCKS", &v)?;
        }
        if let Some(v) = env_var("AUTO_APPROVE_THRESHOLD") {
            settings.thresholds.auto_approve = parse_f64("AUTO_APPROVE_THRESHOLD", &v)?;
        }
        if let Some(v) = env_var("HUMAN_REVIEW_THRESHOLD") {
            settings.thresholds.human_review = parse_f64("HUMAN_REVIEW_THRESHOLD", &v)?;
        }
        if let Some(v) = env_var("WEIGHT_INFRA") {
            settings.weights.infrastructure = parse_f64("WEIGHT_INFRA", &v)?;
        }
        if let Some(v) = env_var("WEIGHT_POLICY") {
            settings.weights.policy = parse_f64("WEIGHT_POLICY", &v)?;
        }
        if let Some(v) = env_var("WEIGHT_HISTORICAL") {
            settings.weights.historical = parse_f64("WEIGHT_HISTORICAL", &v)?;
        }
        if let Some(v) = env_var("WEIGHT_COST") {
            settings.weights.cost = parse_f64("WEIGHT_COST", &v)?;
        }
        if let Some(v) = env_var("EVALUATOR_TIMEOUT_SECONDS") {
            settings.evaluator_timeout_seconds = parse_u64("EVALUATOR_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = env_var("MAX_CONCURRENT_EVALUATIONS") {
            settings.max_concurrent_evaluations = parse_u64("MAX_CONCURRENT_EVALUATIONS", &v)? as usize;
        }
        if let Some(v) = env_var("SERVER_URL") {
            settings.server_url = v;
        }
        if let Some(v) = env_var("DATA_DIR") {
            settings.data_dir = PathBuf::from(v);
        }
        settings.database_url = env_var("DATABASE_URL");
        if let Some(v) = env_var("BIND_ADDR") {
            settings.bind_addr = v;
        }
        settings.narration_endpoint = env_var("NARRATION_ENDPOINT");
        settings.narration_api_key = env_var("NARRATION_API_KEY");
        if let Some(v) = env_var("NARRATION_MODEL") {
            settings.narration_model = v;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate weight and threshold invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::WeightSum(sum));
        }

        let SriThresholds {
            auto_approve,
            human_review,
        } = self.thresholds;
        let in_range = (0.0..=100.0).contains(&auto_approve) && (0.0..=100.0).contains(&human_review);
        if !in_range || auto_approve > human_review {
            return Err(ConfigError::Thresholds {
                auto: auto_approve,
                human: human_review,
            });
        }

        if self.max_concurrent_evaluations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_CONCURRENT_EVALUATIONS".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    pub fn evaluator_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.evaluator_timeout_seconds)
    }

    pub fn topology_path(&self) -> PathBuf {
        self.data_dir.join("topology.json")
    }

    pub fn policies_path(&self) -> PathBuf {
        self.data_dir.join("policies.json")
    }

    pub fn incidents_path(&self) -> PathBuf {
        self.data_dir.join("incidents.json")
    }

    pub fn verdicts_dir(&self) -> PathBuf {
        self.data_dir.join("verdicts")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.data_dir.join("agents")
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}"))
        .ok()
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
