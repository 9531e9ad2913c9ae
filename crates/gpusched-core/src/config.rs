//! Configuration types for gpusched

use serde::{Deserialize, Serialize};

use crate::{Policy, PreemptPolicy, SchedError, SchedResult};

/// Top-level configuration for one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedConfig {
    /// Seed shared by every randomized component of the run
    pub seed: u64,
    /// Per-job resource caps
    pub cluster: ClusterConfig,
    /// Active policy selection
    pub policy: PolicyConfig,
    /// Learned policy hyperparameters
    pub agent: AgentConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            cluster: ClusterConfig::default(),
            policy: PolicyConfig::default(),
            agent: AgentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SchedConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> SchedResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SchedError::Config(format!("Failed to read config file: {}", e)))?;
        let config: SchedConfig = toml::from_str(&content)
            .map_err(|e| SchedError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> SchedResult<()> {
        self.policy.validate()?;
        self.agent.validate()
    }
}

/// Per-job resource caps, in percent units (100 == one device or core)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Largest GPU request a single job may hold
    pub gpu_limit: u32,
    /// Largest CPU request a single job may hold
    pub cpu_limit: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            gpu_limit: 800,
            cpu_limit: 9600,
        }
    }
}

/// Policy selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Allocation policy applied at each decision point
    pub allocation: Policy,
    /// Preemption victim ordering
    pub preemption: PreemptPolicy,
    /// Ticket multiplier applied to `group_gpu_dur` by the lottery
    pub lottery_weight: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allocation: Policy::Fifo,
            preemption: PreemptPolicy::Sdf,
            lottery_weight: 1.0,
        }
    }
}

impl PolicyConfig {
    fn validate(&self) -> SchedResult<()> {
        if !self.lottery_weight.is_finite() || self.lottery_weight < 0.0 {
            return Err(SchedError::Config(format!(
                "lottery_weight must be a non-negative number, got {}",
                self.lottery_weight
            )));
        }
        Ok(())
    }
}

/// Optimizer used by the learned policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// Adam with default moment decay rates
    #[default]
    Adam,
    /// Plain stochastic gradient descent
    Sgd,
}

/// Hyperparameters of the learned policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Replay buffer capacity
    pub buffer_size: usize,
    /// Minibatch size for each learning step
    pub batch_size: usize,
    /// Discount factor
    pub gamma: f32,
    /// Soft update rate of the target network
    pub tau: f32,
    /// Optimizer learning rate
    pub learning_rate: f32,
    /// Learn once every this many recorded steps
    pub update_every: usize,
    /// Widths of the two hidden layers
    pub hidden_units: [usize; 2],
    /// Optimizer kind
    pub optimizer: OptimizerKind,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100_000,
            batch_size: 64,
            gamma: 0.99,
            tau: 1e-3,
            learning_rate: 5e-4,
            update_every: 4,
            hidden_units: [64, 64],
            optimizer: OptimizerKind::Adam,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> SchedResult<()> {
        if self.batch_size == 0 {
            return Err(SchedError::Config("batch_size must be positive".to_string()));
        }
        // Learning needs strictly more than one batch stored
        if self.buffer_size <= self.batch_size {
            return Err(SchedError::Config(format!(
                "buffer_size ({}) must exceed batch_size ({})",
                self.buffer_size, self.batch_size
            )));
        }
        if self.update_every == 0 {
            return Err(SchedError::Config("update_every must be positive".to_string()));
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return Err(SchedError::Config(format!("tau must be in (0, 1], got {}", self.tau)));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(SchedError::Config(format!("gamma must be in [0, 1], got {}", self.gamma)));
        }
        if !(self.learning_rate > 0.0) {
            return Err(SchedError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.hidden_units.contains(&0) {
            return Err(SchedError::Config("hidden layer width must be positive".to_string()));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    pub format: LogFormat,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RewardVariant;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SchedConfig::default();
        assert_eq!(config.agent.buffer_size, 100_000);
        assert_eq!(config.agent.batch_size, 64);
        assert_eq!(config.agent.update_every, 4);
        assert_eq!(config.policy.allocation, Policy::Fifo);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_partial() {
        let toml_str = r#"
seed = 42

[cluster]
gpu_limit = 100

[policy]
allocation = "RL2"
preemption = "LGF"

[agent]
buffer_size = 5000
hidden_units = [32, 16]
optimizer = "sgd"
"#;
        let config: SchedConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.cluster.gpu_limit, 100);
        assert_eq!(config.cluster.cpu_limit, 9600);
        assert_eq!(config.policy.allocation, Policy::Learned(RewardVariant::Rl2));
        assert_eq!(config.policy.preemption, PreemptPolicy::Lgf);
        assert_eq!(config.agent.buffer_size, 5000);
        assert_eq!(config.agent.hidden_units, [32, 16]);
        assert_eq!(config.agent.optimizer, OptimizerKind::Sgd);
        assert_eq!(config.agent.batch_size, 64);
    }

    #[test]
    fn test_logging_format() {
        let config: SchedConfig = toml::from_str("[logging]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert!(toml::from_str::<SchedConfig>("[logging]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn test_config_rejects_unknown_policy() {
        let result = toml::from_str::<SchedConfig>("[policy]\nallocation = \"EDF\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_agent_config_validation() {
        let mut config = AgentConfig::default();
        config.buffer_size = 10;
        assert!(config.validate().is_err());

        let mut config = AgentConfig::default();
        config.buffer_size = config.batch_size;
        assert!(config.validate().is_err());
        config.buffer_size += 1;
        assert!(config.validate().is_ok());

        let mut config = AgentConfig::default();
        config.tau = 0.0;
        assert!(config.validate().is_err());

        let mut config = AgentConfig::default();
        config.update_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\nbatch_size = 0").unwrap();
        let err = SchedConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SchedError::Config(_)));
    }
}
