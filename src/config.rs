use anyhow::{bail, Result};
use ::config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the laptop workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Flow metadata
    pub flow: FlowConfig,
    /// What gets purchased and who gets cash instead
    pub provisioning: ProvisioningConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlowConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProvisioningConfig {
    /// Model recorded on purchased laptops
    pub laptop_model: String,
    /// Prefix of generated asset tags
    pub asset_tag_prefix: String,
    /// Number of hex digits after the prefix
    pub asset_tag_length: usize,
    /// Employees located here receive a cash allowance instead of a laptop
    pub cash_allowance_country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            name: "Laptop Workflow".to_string(),
            description:
                "Automatically purchase, assign, and deliver a new laptop to a new employee"
                    .to_string(),
            version: "1.1.0".to_string(),
        }
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            laptop_model: "Dell Latitude".to_string(),
            asset_tag_prefix: "LP-".to_string(),
            asset_tag_length: 8,
            cash_allowance_country: "Japan".to_string(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl WorkflowConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (laptop-workflow.toml)
    /// 3. Environment variables (LAPTOP_WORKFLOW_<SECTION>__<KEY>)
    pub fn load() -> Result<Self> {
        let file = Path::new("laptop-workflow.toml");
        Self::build(file.exists().then_some(file), None)
    }

    /// Load with an explicit configuration file instead of the default one
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(Some(path.as_ref()), None)
    }

    /// `vars` replaces the process environment when set
    fn build(file: Option<&Path>, vars: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("LAPTOP_WORKFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(vars),
        );

        let config: WorkflowConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let provisioning = &self.provisioning;
        if provisioning.asset_tag_prefix.is_empty() {
            bail!("provisioning.asset_tag_prefix must not be empty");
        }
        if !(1..=32).contains(&provisioning.asset_tag_length) {
            bail!(
                "provisioning.asset_tag_length must be between 1 and 32, got {}",
                provisioning.asset_tag_length
            );
        }
        if provisioning.cash_allowance_country.trim().is_empty() {
            bail!("provisioning.cash_allowance_country must not be empty");
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<WorkflowConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = WorkflowConfig::load_env_file();
        WorkflowConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static WorkflowConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
