use crate::adapters::dispatch::DEFAULT_QUEUE_CAPACITY;
use crate::adapters::file_store::EXCEPTION_LOG_FILE;
use crate::domain::model::{OriginNumberId, PersonAliasId};
use crate::utils::error::{GroupTextError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    pub exception_log: Option<ExceptionLogConfig>,
}

/// 原本的 block 設定：From Number 與是否包含非活躍成員
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub origin_number: Option<String>,
    pub include_inactive_members: Option<bool>,
    pub sender_alias_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Channel,
    Http,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub mode: Option<DispatchMode>,
    pub endpoint: Option<String>,
    pub queue_capacity: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionLogConfig {
    pub path: String,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GroupTextError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| GroupTextError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GROUP_TEXT_FROM_NUMBER})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| GroupTextError::ConfigError {
            message: format!("invalid env var pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn origin_number_id(&self) -> Result<Option<OriginNumberId>> {
        parse_origin_number(self.messaging.origin_number.as_deref())
    }

    pub fn include_inactive_members(&self) -> bool {
        self.messaging.include_inactive_members.unwrap_or(false)
    }

    pub fn sender_alias_id(&self) -> Option<PersonAliasId> {
        self.messaging.sender_alias_id.map(PersonAliasId)
    }

    pub fn data_dir(&self) -> &str {
        self.storage.data_dir.as_deref().unwrap_or("./data")
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch.mode.unwrap_or_default()
    }

    pub fn queue_capacity(&self) -> usize {
        self.dispatch.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.timeout_seconds.unwrap_or(10))
    }

    /// Configured path, or `exceptions.jsonl` inside the data directory.
    pub fn exception_log_path(&self, data_dir: &Path) -> PathBuf {
        match &self.exception_log {
            Some(c) => PathBuf::from(&c.path),
            None => data_dir.join(EXCEPTION_LOG_FILE),
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_path("storage.data_dir", self.data_dir())?;
        self.origin_number_id()?;

        if let Some(capacity) = self.dispatch.queue_capacity {
            validate_positive_number("dispatch.queue_capacity", capacity, 1)?;
        }
        if let Some(timeout) = self.dispatch.timeout_seconds {
            validate_range("dispatch.timeout_seconds", timeout, 1, 300)?;
        }

        if self.dispatch_mode() == DispatchMode::Http {
            let endpoint = validate_required_field("dispatch.endpoint", &self.dispatch.endpoint)?;
            validate_url("dispatch.endpoint", endpoint)?;
        }

        if let Some(c) = &self.exception_log {
            validate_path("exception_log.path", &c.path)?;
        }

        Ok(())
    }
}

/// 空字串視為未設定
pub fn parse_origin_number(value: Option<&str>) -> Result<Option<OriginNumberId>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(|id| Some(OriginNumberId(id)))
            .map_err(|e| GroupTextError::InvalidConfigValueError {
                field: "messaging.origin_number".to_string(),
                value: raw.to_string(),
                reason: format!("not a valid UUID: {}", e),
            }),
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[messaging]
origin_number = "6f1c4a2e-93a4-4c36-8d4e-0c1d7d5f2b10"
include_inactive_members = true
sender_alias_id = 42

[storage]
data_dir = "/var/lib/group-text"

[dispatch]
mode = "http"
endpoint = "https://queue.example.com/sends"
timeout_seconds = 5

[exception_log]
path = "/var/log/group-text/exceptions.jsonl"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate().is_ok());
        assert!(config.origin_number_id().unwrap().is_some());
        assert!(config.include_inactive_members());
        assert_eq!(config.sender_alias_id(), Some(PersonAliasId(42)));
        assert_eq!(config.data_dir(), "/var/lib/group-text");
        assert_eq!(config.dispatch_mode(), DispatchMode::Http);
        assert_eq!(config.dispatch_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.exception_log_path(Path::new("/var/lib/group-text")),
            PathBuf::from("/var/log/group-text/exceptions.jsonl")
        );
    }

    #[test]
    fn test_exception_log_defaults_into_data_dir() {
        let config = TomlConfig::from_toml_str("[storage]\ndata_dir = \"/srv/texts\"\n").unwrap();
        assert_eq!(
            config.exception_log_path(Path::new(config.data_dir())),
            PathBuf::from("/srv/texts/exceptions.jsonl")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.origin_number_id().unwrap(), None);
        assert!(!config.include_inactive_members());
        assert_eq!(config.data_dir(), "./data");
        assert_eq!(config.dispatch_mode(), DispatchMode::Channel);
        assert_eq!(config.queue_capacity(), DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("GROUP_TEXT_TEST_FROM", "0b7d3c36-5c4e-4a52-9b0e-2b8b1b7f9f01");

        let toml_content = r#"
[messaging]
origin_number = "${GROUP_TEXT_TEST_FROM}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.messaging.origin_number.as_deref(),
            Some("0b7d3c36-5c4e-4a52-9b0e-2b8b1b7f9f01")
        );

        std::env::remove_var("GROUP_TEXT_TEST_FROM");
    }

    #[test]
    fn test_invalid_origin_number_fails_validation() {
        let config = TomlConfig::from_toml_str("[messaging]\norigin_number = \"not-a-uuid\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_mode_requires_endpoint() {
        let config = TomlConfig::from_toml_str("[dispatch]\nmode = \"http\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(GroupTextError::MissingConfigError { .. })
        ));

        let config = TomlConfig::from_toml_str(
            "[dispatch]\nmode = \"http\"\nendpoint = \"ftp://queue.example.com\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\ndata_dir = \"./fixtures\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.data_dir(), "./fixtures");
    }

    #[test]
    fn test_blank_origin_number_is_unconfigured() {
        assert_eq!(parse_origin_number(Some("  ")).unwrap(), None);
        assert_eq!(parse_origin_number(None).unwrap(), None);
    }
}
