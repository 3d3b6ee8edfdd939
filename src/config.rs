use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::approval::ReviewerPolicy;

/// Main configuration structure for Form Approval
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FormApprovalConfig {
    /// Who may write which review field
    pub reviewers: ReviewerPolicy,
    /// Where records and derived tables live
    pub storage: StorageConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Database settings (optional, needs the `database` feature)
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the JSON files
    pub data_dir: PathBuf,
    /// Submissions file name inside `data_dir`
    pub submissions_file: String,
    /// Summary table file name inside `data_dir`
    pub summary_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".form-approval"),
            submissions_file: "forms.json".to_string(),
            summary_file: "summary.json".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn submissions_path(&self) -> PathBuf {
        self.data_dir.join(&self.submissions_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.data_dir.join(&self.summary_file)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level / filter directive
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite://.form-approval/forms.db`
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl FormApprovalConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (form-approval.toml, .form-approval-rc)
    /// 3. Environment variables (prefixed with FORM_APPROVAL__)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("form-approval.toml").exists() {
            builder = builder.add_source(File::with_name("form-approval"));
        }

        if Path::new(".form-approval-rc").exists() {
            builder = builder.add_source(File::with_name(".form-approval-rc").format(config::FileFormat::Toml));
        }

        builder = builder.add_source(Self::environment());

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load defaults overlaid with one explicit file and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path))
            .add_source(Self::environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    fn environment() -> Environment {
        Environment::with_prefix("FORM_APPROVAL")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("reviewers.validator_identities")
            .with_list_parse_key("reviewers.recommender_identities")
            .with_list_parse_key("reviewers.approver_roles")
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
static CONFIG: std::sync::LazyLock<Result<FormApprovalConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = FormApprovalConfig::load_env_file();
        FormApprovalConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static FormApprovalConfig> {
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
