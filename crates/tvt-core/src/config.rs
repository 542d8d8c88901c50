use serde::{Deserialize, Serialize};

use crate::state::OptimizationStrategy;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
    pub notices: NoticeConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Simulated latency of one optimization pass.
    pub delay_ms: u64,
    pub version: String,
    pub auto_optimize: bool,
    pub strategy: OptimizationStrategy,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1500,
            version: "v2".to_string(),
            auto_optimize: true,
            strategy: OptimizationStrategy::Balanced,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NoticeConfig {
    pub capacity: usize,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}
