use crate::domain::model::ConfigKey;
use crate::utils::error::{CharmError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Index-style repository kinds, passed straight to pip as `--index-url`.
pub const INDEX_REPO_TYPES: [&str; 3] = ["http", "https", "pypi"];

/// Declared configuration of the deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CharmConfig {
    pub version: String,
    pub backend: String,
    pub private_ssh_key: String,
    pub wheels_repo: String,
    pub wheels_repo_type: String,
    pub wheels_repo_revision: String,
    pub enable_webhooks: bool,
    pub plugin_repos: String,
    pub plugins_config: String,
    pub nagios_context: String,
    pub bot_identity: String,
    pub bot_admins: String,
    pub bot_prefix: String,
    /// Options without a dedicated field; forwarded to templates as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            backend: "irc".to_string(),
            private_ssh_key: String::new(),
            wheels_repo: String::new(),
            wheels_repo_type: "pypi".to_string(),
            wheels_repo_revision: String::new(),
            enable_webhooks: false,
            plugin_repos: String::new(),
            plugins_config: "{}".to_string(),
            nagios_context: "juju".to_string(),
            bot_identity: "{}".to_string(),
            bot_admins: "()".to_string(),
            bot_prefix: "!".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// Flattened view of the configuration, as stored between passes and fed to templates.
pub type ConfigSnapshot = BTreeMap<String, serde_json::Value>;

impl CharmConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CharmError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CharmError::ConfigParseError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SSH_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CharmError::ConfigParseError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn repo_type(&self) -> String {
        self.wheels_repo_type.trim().to_lowercase()
    }

    pub fn backend_name(&self) -> String {
        self.backend.trim().to_lowercase()
    }

    pub fn snapshot(&self) -> Result<ConfigSnapshot> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(CharmError::ConfigParseError {
                message: format!("configuration did not serialize to a table: {}", other),
            }),
        }
    }

    /// Keys whose value differs from `previous`; with no previous snapshot every key counts.
    pub fn changed_keys(&self, previous: Option<&ConfigSnapshot>) -> Result<BTreeSet<ConfigKey>> {
        let current = self.snapshot()?;
        Ok(ConfigKey::ALL
            .into_iter()
            .filter(|key| match previous {
                None => true,
                Some(prev) => prev.get(key.as_str()) != current.get(key.as_str()),
            })
            .collect())
    }

    pub fn validate_config(&self) -> Result<()> {
        if !self.wheels_repo.is_empty() {
            validation::validate_non_empty_string("wheels_repo_type", &self.wheels_repo_type)?;
            if INDEX_REPO_TYPES.contains(&self.repo_type().as_str()) {
                validation::validate_url("wheels_repo", &self.wheels_repo)?;
            }
        }

        if !self.private_ssh_key.is_empty() {
            validation::validate_base64("private_ssh_key", &self.private_ssh_key)?;
        }

        Ok(())
    }
}

impl Validate for CharmConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
