use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod role;
pub use role::{ParseRoleError, Role};

/// Environment variable naming an alternate config file.
pub const CONFIG_PATH_ENV: &str = "KEYCHECK_CONFIG";

/// Environment variable overriding the configured endpoint.
pub const ENDPOINT_ENV: &str = "KEYCHECK_ENDPOINT";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found. Create ~/.keycheck/config.json or pass --config.")]
    NotFound,
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No credential configured for role '{0}'")]
    MissingCredential(Role),
    #[error("Duplicate credential for role '{0}'")]
    DuplicateCredential(Role),
    #[error("Invalid endpoint '{0}': only https:// (or http:// on localhost) is allowed")]
    InvalidEndpoint(String),
}

/// Harness configuration stored in ~/.keycheck/config.json
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HarnessConfig {
    /// Key manager base URL, e.g. https://keymanager.example.com:9311
    pub endpoint: String,
    pub credentials: Vec<CredentialConfig>,
    /// Role used to delete leftover resources at teardown. Must have a credential.
    #[serde(default = "default_cleanup_role")]
    pub cleanup_role: Role,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

/// A pre-issued token for one credential role.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CredentialConfig {
    pub role: Role,
    pub token: String,
    #[serde(default)]
    pub project_id: Option<String>, // Sent as X-Project-Id when present
}

fn default_cleanup_role() -> Role {
    Role::ProjectAdmin
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_verify_tls() -> bool {
    true
}

impl HarnessConfig {
    /// Load config from $KEYCHECK_CONFIG or the default path, then apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load config from custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Get default config path (~/.keycheck/config.json)
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".keycheck")
            .join("config.json")
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
    }

    /// Check the endpoint scheme and that the helper and cleanup roles are usable.
    ///
    /// Fixtures are always created as project admin, so that credential is
    /// required in addition to whatever `cleanup_role` names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.endpoint)?;

        let mut seen = Vec::with_capacity(self.credentials.len());
        for cred in &self.credentials {
            if seen.contains(&cred.role) {
                return Err(ConfigError::DuplicateCredential(cred.role));
            }
            seen.push(cred.role);
        }

        self.credential(Role::ProjectAdmin)?;
        self.cleanup_credential()?;
        Ok(())
    }

    /// Get the credential for a role
    pub fn credential(&self, role: Role) -> Result<&CredentialConfig, ConfigError> {
        self.credentials
            .iter()
            .find(|c| c.role == role)
            .ok_or(ConfigError::MissingCredential(role))
    }

    /// Get the credential used for teardown deletes
    pub fn cleanup_credential(&self) -> Result<&CredentialConfig, ConfigError> {
        self.credential(self.cleanup_role)
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let parsed =
        url::Url::parse(endpoint).map_err(|_| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" => match parsed.host_str() {
            Some("localhost") | Some("127.0.0.1") | Some("[::1]") => Ok(()),
            _ => Err(ConfigError::InvalidEndpoint(endpoint.to_string())),
        },
        _ => Err(ConfigError::InvalidEndpoint(endpoint.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cred(role: Role, token: &str) -> CredentialConfig {
        CredentialConfig {
            role,
            token: token.to_string(),
            project_id: Some("proj-1".to_string()),
        }
    }

    fn sample_config() -> HarnessConfig {
        HarnessConfig {
            endpoint: "https://keymanager.example.com:9311".to_string(),
            credentials: vec![
                cred(Role::ProjectAdmin, "admin-token"),
                cred(Role::ProjectMember, "member-token"),
                cred(Role::ProjectReader, "reader-token"),
            ],
            cleanup_role: Role::ProjectAdmin,
            timeout_secs: 30,
            verify_tls: true,
        }
    }

    #[test]
    fn config_defaults_applied() {
        let json = r#"{
            "endpoint": "https://kms.example.com",
            "credentials": [{ "role": "project_admin", "token": "t1" }]
        }"#;

        let config: HarnessConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cleanup_role, Role::ProjectAdmin);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.verify_tls);
        assert!(config.credentials[0].project_id.is_none());
    }

    #[test]
    fn credential_lookup() {
        let config = sample_config();
        assert_eq!(
            config.credential(Role::ProjectMember).unwrap().token,
            "member-token"
        );
        assert!(matches!(
            config.credential(Role::SystemAdmin),
            Err(ConfigError::MissingCredential(Role::SystemAdmin))
        ));
    }

    #[test]
    fn validate_ok() {
        sample_config().validate().unwrap();
    }

    #[test]
    fn validate_missing_cleanup_credential() {
        let mut config = sample_config();
        config.cleanup_role = Role::SystemAdmin;

        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::MissingCredential(Role::SystemAdmin))
        ));
    }

    #[test]
    fn validate_requires_project_admin() {
        let mut config = sample_config();
        config.credentials.retain(|c| c.role != Role::ProjectAdmin);
        config.cleanup_role = Role::ProjectMember;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredential(Role::ProjectAdmin))
        ));
    }

    #[test]
    fn validate_duplicate_credential() {
        let mut config = sample_config();
        config.credentials.push(cred(Role::ProjectReader, "again"));

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateCredential(Role::ProjectReader))
        ));
    }

    #[test]
    fn validate_endpoint_scheme() {
        assert!(validate_endpoint("https://kms.example.com").is_ok());
        assert!(validate_endpoint("http://localhost:9311").is_ok());
        assert!(validate_endpoint("http://127.0.0.1:9311").is_ok());
        assert!(matches!(
            validate_endpoint("http://kms.example.com"),
            Err(ConfigError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            validate_endpoint("ftp://kms.example.com"),
            Err(ConfigError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            validate_endpoint("not a url"),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let config = sample_config();

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            "{}",
            serde_json::to_string_pretty(&config).unwrap()
        )
        .unwrap();

        let loaded = HarnessConfig::load_from(temp_file.path()).unwrap();
        assert_eq!(loaded.endpoint, config.endpoint);
        assert_eq!(loaded.credentials.len(), 3);
        let roles: Vec<Role> = loaded.credentials.iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![Role::ProjectAdmin, Role::ProjectMember, Role::ProjectReader]
        );
    }

    #[test]
    fn load_from_nonexistent_file() {
        let result = HarnessConfig::load_from("/nonexistent/path/config.json");
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn load_from_invalid_json() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{{ invalid json }}").unwrap();

        let result = HarnessConfig::load_from(temp_file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_rejects_unknown_role() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{"endpoint": "https://kms", "credentials": [{{"role": "domain_admin", "token": "x"}}]}}"#
        )
        .unwrap();

        let result = HarnessConfig::load_from(temp_file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn config_error_display() {
        let missing = ConfigError::MissingCredential(Role::ProjectReader);
        assert!(missing.to_string().contains("project_reader"));

        let endpoint = ConfigError::InvalidEndpoint("http://evil".to_string());
        assert!(endpoint.to_string().contains("http://evil"));
    }

    #[test]
    fn default_path_returns_path() {
        let path = HarnessConfig::default_path();
        assert!(path.ends_with("config.json"));
        assert!(path.to_string_lossy().contains(".keycheck"));
    }
}
