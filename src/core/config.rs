//! Descriptor input parameters.
//!
//! Every field has a documented default. The process environment is never
//! read here directly: [`StackConfig::apply_env`] takes a lookup closure so
//! the CLI decides where values come from.

use super::error::{StackError, StackResult};
use super::types::Capacity;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the target account id.
pub const ENV_ACCOUNT: &str = "AWS_ACCOUNT";

/// Environment variable holding the target region.
pub const ENV_REGION: &str = "CDK_REGION";

pub const DEFAULT_STACK_NAME: &str = "SampleAsgAlbStack";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_KEY_PATH: &str = "/path/to/key.pub";
pub const DEFAULT_KEY_NAME: &str = "instanceKey";
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";

/// Input parameters of the stack descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Stack name
    #[serde(default = "default_stack_name")]
    pub stack_name: String,

    /// Target account id (unset = environment-agnostic)
    #[serde(default)]
    pub account: Option<String>,

    /// Target region
    #[serde(default = "default_region")]
    pub region: String,

    /// Local path of the public key file embedded in the key pair
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,

    /// Name the key pair is registered under
    #[serde(default = "default_key_name")]
    pub key_name: String,

    /// Network address block
    #[serde(default = "default_vpc_cidr")]
    pub vpc_cidr: String,

    /// Instance type as class.size
    #[serde(default = "default_instance_type")]
    pub instance_type: String,

    /// Auto-scaling capacity bounds
    #[serde(default = "default_capacity")]
    pub capacity: Capacity,

    /// EC2 health-check grace period after launch, in minutes
    #[serde(default = "default_grace_minutes")]
    pub health_check_grace_minutes: u32,

    /// Listener and target port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_stack_name() -> String {
    DEFAULT_STACK_NAME.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_key_path() -> PathBuf {
    PathBuf::from(DEFAULT_KEY_PATH)
}

fn default_key_name() -> String {
    DEFAULT_KEY_NAME.to_string()
}

fn default_vpc_cidr() -> String {
    DEFAULT_VPC_CIDR.to_string()
}

fn default_instance_type() -> String {
    DEFAULT_INSTANCE_TYPE.to_string()
}

fn default_capacity() -> Capacity {
    Capacity {
        min: 1,
        desired: Some(1),
        max: 2,
    }
}

fn default_grace_minutes() -> u32 {
    30
}

fn default_http_port() -> u16 {
    80
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: default_stack_name(),
            account: None,
            region: default_region(),
            key_path: default_key_path(),
            key_name: default_key_name(),
            vpc_cidr: default_vpc_cidr(),
            instance_type: default_instance_type(),
            capacity: default_capacity(),
            health_check_grace_minutes: default_grace_minutes(),
            http_port: default_http_port(),
        }
    }
}

impl StackConfig {
    /// Overlay account and region from an environment lookup.
    ///
    /// Empty values are treated as unset, so the configured region stays.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(account) = lookup(ENV_ACCOUNT).filter(|v| !v.is_empty()) {
            self.account = Some(account);
        }
        if let Some(region) = lookup(ENV_REGION).filter(|v| !v.is_empty()) {
            self.region = region;
        }
    }

    /// Grace period in seconds.
    pub fn health_check_grace_secs(&self) -> u32 {
        self.health_check_grace_minutes.saturating_mul(60)
    }
}

/// Parse a config from a YAML string.
pub fn parse_config(yaml: &str) -> StackResult<StackConfig> {
    serde_yaml_ng::from_str(yaml).map_err(|e| StackError::Config(format!("YAML parse error: {}", e)))
}

/// Parse a config file from disk.
pub fn parse_config_file(path: &Path) -> StackResult<StackConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| StackError::io(format!("failed to read {}", path.display()), e))?;
    parse_config(&content)
}

/// Load the config file if it exists, defaults otherwise.
pub fn load_or_default(path: &Path) -> StackResult<StackConfig> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "loading stack config");
        parse_config_file(path)
    } else {
        tracing::debug!(path = %path.display(), "no stack config, using defaults");
        Ok(StackConfig::default())
    }
}

/// JSON Schema of the config file.
pub fn config_schema() -> StackResult<String> {
    let schema = schemars::schema_for!(StackConfig);
    serde_json::to_string_pretty(&schema).map_err(|e| StackError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let c = StackConfig::default();
        assert_eq!(c.stack_name, "SampleAsgAlbStack");
        assert_eq!(c.region, "us-east-1");
        assert!(c.account.is_none());
        assert_eq!(c.key_name, "instanceKey");
        assert_eq!(c.capacity.min, 1);
        assert_eq!(c.capacity.desired, Some(1));
        assert_eq!(c.capacity.max, 2);
        assert_eq!(c.health_check_grace_secs(), 1800);
        assert_eq!(c.http_port, 80);
    }

    #[test]
    fn test_config_empty_yaml_is_defaults() {
        let c = parse_config("{}").unwrap();
        assert_eq!(c, StackConfig::default());
    }

    #[test]
    fn test_config_partial_yaml() {
        let c = parse_config(
            r#"
region: eu-west-1
key_path: /home/ops/.ssh/deploy.pub
capacity:
  min: 2
  desired: 3
  max: 4
"#,
        )
        .unwrap();
        assert_eq!(c.region, "eu-west-1");
        assert_eq!(c.key_path, PathBuf::from("/home/ops/.ssh/deploy.pub"));
        assert_eq!(c.capacity.desired, Some(3));
        assert_eq!(c.instance_type, "t2.micro");
    }

    #[test]
    fn test_config_unknown_field_rejected() {
        let err = parse_config("regoin: typo\n").unwrap_err();
        assert!(err.to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_config_apply_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_ACCOUNT, "123456789012"), (ENV_REGION, "ap-south-1")]);
        let mut c = StackConfig::default();
        c.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.account.as_deref(), Some("123456789012"));
        assert_eq!(c.region, "ap-south-1");
    }

    #[test]
    fn test_config_apply_env_region_fallback() {
        let mut c = StackConfig::default();
        c.apply_env(|k| (k == ENV_REGION).then(String::new));
        assert_eq!(c.region, DEFAULT_REGION);
        assert!(c.account.is_none());
    }

    #[test]
    fn test_config_load_or_default_missing() {
        let dir = tempfile::tempdir().unwrap();
        let c = load_or_default(&dir.path().join("stackform.yaml")).unwrap();
        assert_eq!(c, StackConfig::default());
    }

    #[test]
    fn test_config_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stackform.yaml");
        std::fs::write(&path, "stack_name: Demo\n").unwrap();
        let c = load_or_default(&path).unwrap();
        assert_eq!(c.stack_name, "Demo");
    }

    #[test]
    fn test_config_schema_mentions_fields() {
        let schema = config_schema().unwrap();
        assert!(schema.contains("key_path"));
        assert!(schema.contains("capacity"));
    }
}
