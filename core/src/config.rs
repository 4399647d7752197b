use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Privileged (management) domain
    pub privileged_domain: DomainResources,

    /// Workload domain (absent on hosts that run containers only)
    pub workload_domain: Option<DomainResources>,

    /// Reboot watcher settings
    pub reboot: RebootConfig,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            privileged_domain: DomainResources::privileged_defaults(),
            workload_domain: Some(DomainResources::workload_defaults()),
            reboot: RebootConfig::default(),
            log_level: LogLevel::Info,
        }
    }
}

/// Declarative per-domain resources and device attachments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainResources {
    /// Domain name
    pub name: String,

    /// Memory in KiB
    pub memory_kb: u64,

    /// Number of virtual CPUs
    pub vcpus: u32,

    /// Kernel command line (None for firmware-driven domains)
    pub cmdline: Option<String>,

    /// Path to the kernel/firmware image loaded into the domain
    #[serde(default)]
    pub kernel_image: Option<PathBuf>,

    /// Path to the flattened device tree blob passed to the domain
    #[serde(default)]
    pub device_tree: Option<PathBuf>,

    /// Textual backend device records, attached in order
    #[serde(default)]
    pub backends: Vec<String>,
}

impl DomainResources {
    /// Default resources for the privileged domain: 2 GiB, 4 vCPUs, no
    /// backend records (it hosts the backends itself).
    pub fn privileged_defaults() -> Self {
        Self {
            name: "domain-d".to_string(),
            memory_kb: 0x20_0000, /* 2 GiB */
            vcpus: 4,
            cmdline: None,
            kernel_image: None,
            device_tree: None,
            backends: Vec::new(),
        }
    }

    /// Default resources for the workload domain: 256 MiB, 1 vCPU, one disk
    /// and one network interface served by the privileged domain.
    pub fn workload_defaults() -> Self {
        Self {
            name: "domain-u".to_string(),
            memory_kb: 0x4_0000, /* 256 MiB */
            vcpus: 1,
            cmdline: Some(
                "console=hvc0 clk_ignore_unused root=/dev/xvda rw rootwait ignore_loglevel"
                    .to_string(),
            ),
            kernel_image: None,
            device_tree: None,
            backends: vec![
                "disk=['backend=1, vdev=xvda, access=rw, target=/dev/sda7']".to_string(),
                "vif=['backend=1,bridge=xenbr0,mac=08:00:27:ff:cb:ce,ip=172.44.0.2 255.255.255.0 172.44.0.1']"
                    .to_string(),
            ],
        }
    }
}

/// Reboot watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebootConfig {
    /// Root directory of the persistent store
    pub store_root: PathBuf,

    /// Key holding the reboot request value
    pub key: String,

    /// Check period in seconds
    pub check_interval_secs: u64,
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("/var/lib/warden/store"),
            key: "control/reboot".to_string(),
            check_interval_secs: 5,
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.privileged_domain.name, "domain-d");
        assert_eq!(config.privileged_domain.vcpus, 4);
        let workload = config.workload_domain.unwrap();
        assert_eq!(workload.backends.len(), 2);
        assert_eq!(config.reboot.check_interval_secs, 5);
    }

    #[test]
    fn test_config_round_trip() {
        let config = HostConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: HostConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.privileged_domain.memory_kb, 0x20_0000);
        assert_eq!(parsed.reboot.key, "control/reboot");
    }

    #[test]
    fn test_backends_default_to_empty() {
        let json = r#"{"name": "domain-d", "memory_kb": 1024, "vcpus": 1, "cmdline": null}"#;
        let resources: DomainResources = serde_json::from_str(json).unwrap();
        assert!(resources.backends.is_empty());
    }
}
