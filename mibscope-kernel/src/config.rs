use mibscope_agent_sim::ServiceKind;
use mibscope_core::{enterprise_tree, AgentAddress, MibError, MibTree};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "MIBSCOPE_CONFIG";
pub const API_KEY_ENV: &str = "MIBSCOPE_API_KEY";
const DEFAULT_CONFIG_PATH: &str = "mibscope.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid MIB definition: {0}")]
    Mib(#[from] MibError),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentStatus {
    Up,
    Down,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AgentConf {
    pub name: String,
    pub address: AgentAddress,
    pub status: AgentStatus,
    pub service: ServiceKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LatencyConf {
    pub get_ms: u64,
    pub set_ms: u64,
}

impl Default for LatencyConf {
    fn default() -> Self {
        Self {
            get_ms: 150,
            set_ms: 200,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct KernelConfig {
    pub listen: String,
    pub refresh_interval_secs: u64,
    pub trap_window_minutes: i64,
    pub chart_window: usize,
    pub session_idle_secs: u64,
    pub latency: LatencyConf,
    pub control_delay_ms: u64,
    pub agents: Vec<AgentConf>,
    pub mib_definition: Option<PathBuf>,
    pub api_key: Option<String>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".into(),
            refresh_interval_secs: 30,
            trap_window_minutes: 30,
            chart_window: 30,
            session_idle_secs: 1800,
            latency: LatencyConf::default(),
            control_delay_ms: 1000,
            agents: default_agents(),
            mib_definition: None,
            api_key: None,
        }
    }
}

fn default_agents() -> Vec<AgentConf> {
    [
        ("Authentication Service", "192.168.1.10", AgentStatus::Up, ServiceKind::AuthService),
        ("Database Service", "192.168.1.11", AgentStatus::Up, ServiceKind::DbService),
        ("Web Server", "192.168.1.12", AgentStatus::Down, ServiceKind::WebServer),
        ("Load Balancer", "192.168.1.13", AgentStatus::Up, ServiceKind::LoadBalancer),
        ("Cache Service", "192.168.1.14", AgentStatus::Up, ServiceKind::CacheService),
    ]
    .into_iter()
    .map(|(name, address, status, service)| AgentConf {
        name: name.into(),
        address: AgentAddress::from(address),
        status,
        service,
    })
    .collect()
}

impl KernelConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// A session nobody touched for this long is closed by its refresh task.
    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs.max(1))
    }

    pub fn control_delay(&self) -> Duration {
        Duration::from_millis(self.control_delay_ms)
    }

    pub fn trap_window(&self) -> time::Duration {
        time::Duration::minutes(self.trap_window_minutes)
    }

    /// Tree every dashboard session starts from.
    pub async fn mib_tree(&self) -> Result<MibTree, ConfigError> {
        match &self.mib_definition {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Io {
                        path: path.clone(),
                        source,
                    })?;
                Ok(MibTree::from_yaml(&text)?)
            }
            None => Ok(enterprise_tree()?),
        }
    }
}

/// Load `mibscope.yaml` (or `$MIBSCOPE_CONFIG`). A missing or broken file
/// falls back to defaults; `$MIBSCOPE_API_KEY` overrides the file's key.
pub async fn load_config() -> KernelConfig {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut cfg = read_config_file(Path::new(&path)).await;
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.is_empty() {
            cfg.api_key = Some(key);
        }
    }
    cfg
}

async fn read_config_file(path: &Path) -> KernelConfig {
    if !path.exists() {
        info!(path = %path.display(), "no config file, using defaults");
        return KernelConfig::default();
    }
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable config, using defaults");
            return KernelConfig::default();
        }
    };
    KernelConfig::parse(&text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "invalid config, using defaults");
        KernelConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = KernelConfig::default();
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(30));
        assert_eq!(cfg.chart_window, 30);
        assert_eq!(cfg.session_idle_ttl(), Duration::from_secs(1800));
        assert_eq!(cfg.latency.get_ms, 150);
        assert_eq!(cfg.latency.set_ms, 200);
        assert_eq!(cfg.agents.len(), 5);
        assert_eq!(cfg.agents[2].status, AgentStatus::Down);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(KernelConfig::parse("  \n").unwrap(), KernelConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let cfg = KernelConfig::parse(
            r#"
refresh_interval_secs: 5
latency:
  get_ms: 10
agents:
  - name: Edge Cache
    address: 10.0.0.7
    status: UP
    service: cache-service
"#,
        )
        .unwrap();
        assert_eq!(cfg.refresh_interval_secs, 5);
        assert_eq!(cfg.latency.get_ms, 10);
        assert_eq!(cfg.latency.set_ms, 200);
        assert_eq!(cfg.trap_window_minutes, 30);
        assert_eq!(cfg.agents.len(), 1);
        assert_eq!(cfg.agents[0].service, ServiceKind::CacheService);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(matches!(
            KernelConfig::parse("chart_window: [1, 2]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let cfg = read_config_file(Path::new("/nonexistent/mibscope.yaml")).await;
        assert_eq!(cfg, KernelConfig::default());
    }

    #[tokio::test]
    async fn test_unreadable_file_falls_back() {
        // a directory exists but cannot be read as a file
        let cfg = read_config_file(&std::env::temp_dir()).await;
        assert_eq!(cfg, KernelConfig::default());
    }

    #[tokio::test]
    async fn test_builtin_tree_when_no_definition() {
        let tree = KernelConfig::default().mib_tree().await.unwrap();
        assert_eq!(tree.roots()[0].name(), "enterprise");
    }

    #[tokio::test]
    async fn test_tree_from_definition_file() {
        let path = std::env::temp_dir().join(format!("mibscope-tree-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, mibscope_devkit::fixtures::SMALL_TREE_YAML).unwrap();
        let cfg = KernelConfig {
            mib_definition: Some(path.clone()),
            ..KernelConfig::default()
        };
        let tree = cfg.mib_tree().await.unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(tree, mibscope_devkit::fixtures::small_tree());
    }

    #[tokio::test]
    async fn test_missing_definition_file() {
        let cfg = KernelConfig {
            mib_definition: Some(PathBuf::from("/nonexistent/tree.yaml")),
            ..KernelConfig::default()
        };
        assert!(matches!(cfg.mib_tree().await, Err(ConfigError::Io { .. })));
    }
}
