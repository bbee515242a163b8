use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_MEMORY_LIMIT_BYTES: i64 = 2 * 1024 * 1024 * 1024;
pub const DEFAULT_CPU_NANO_CORES: i64 = 2_000_000_000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_WORKING_DIRECTORY: &str = "/workspace";

/// Hard caps for one ephemeral container run (spec §4.6). Every field is a
/// ceiling, never a recommendation: callers cannot opt into more resources
/// than the defaults allow, only less.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub image_name: String,
    pub memory_limit_bytes: i64,
    pub cpu_nano_cores: i64,
    pub timeout: Duration,
    pub working_directory: String,
    pub workspace_volume: Option<String>,
    pub read_only_root_filesystem: bool,
    pub auto_remove: bool,
    pub no_new_privileges: bool,
    pub privileged: bool,
    pub network_disabled: bool,
    pub command: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SandboxConfigBuilder {
    image_name: Option<String>,
    memory_limit_bytes: i64,
    cpu_nano_cores: i64,
    timeout: Duration,
    working_directory: String,
    workspace_volume: Option<String>,
    read_only_root_filesystem: bool,
    auto_remove: bool,
    no_new_privileges: bool,
    privileged: bool,
    network_disabled: bool,
    command: Vec<String>,
}

impl SandboxConfigBuilder {
    pub fn new() -> Self {
        Self {
            image_name: None,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            cpu_nano_cores: DEFAULT_CPU_NANO_CORES,
            timeout: DEFAULT_TIMEOUT,
            working_directory: DEFAULT_WORKING_DIRECTORY.to_string(),
            workspace_volume: None,
            read_only_root_filesystem: true,
            auto_remove: true,
            no_new_privileges: true,
            privileged: false,
            network_disabled: false,
            command: Vec::new(),
        }
    }

    pub fn image_name(mut self, image: impl Into<String>) -> Self {
        self.image_name = Some(image.into());
        self
    }

    pub fn memory_limit_bytes(mut self, bytes: i64) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    pub fn cpu_nano_cores(mut self, cores: i64) -> Self {
        self.cpu_nano_cores = cores;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn workspace_volume(mut self, volume: impl Into<String>) -> Self {
        self.workspace_volume = Some(volume.into());
        self
    }

    pub fn network_disabled(mut self, disabled: bool) -> Self {
        self.network_disabled = disabled;
        self
    }

    pub fn command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    /// `privileged` is intentionally not exposed as a builder setter:
    /// spec §4.6 requires it stay `false` on every config this builder
    /// produces.
    pub fn build(self) -> Result<SandboxConfig, ConfigError> {
        let image_name = self.image_name.ok_or(ConfigError::MissingImageName)?;
        if self.memory_limit_bytes < 0 {
            return Err(ConfigError::InvalidMemoryLimit(self.memory_limit_bytes));
        }
        if self.cpu_nano_cores <= 0 {
            return Err(ConfigError::InvalidCpuQuota(self.cpu_nano_cores));
        }
        if self.privileged {
            return Err(ConfigError::PrivilegedNotAllowed);
        }

        Ok(SandboxConfig {
            image_name,
            memory_limit_bytes: self.memory_limit_bytes,
            cpu_nano_cores: self.cpu_nano_cores,
            timeout: self.timeout,
            working_directory: self.working_directory,
            workspace_volume: self.workspace_volume,
            read_only_root_filesystem: self.read_only_root_filesystem,
            auto_remove: self.auto_remove,
            no_new_privileges: self.no_new_privileges,
            privileged: false,
            network_disabled: self.network_disabled,
            command: self.command,
        })
    }
}

impl Default for SandboxConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Network enabled, root FS read-only, no new privileges.
pub fn secure_defaults(image_name: impl Into<String>) -> SandboxConfigBuilder {
    SandboxConfigBuilder::new().image_name(image_name).network_disabled(false)
}

/// Network disabled entirely, otherwise identical to `secure_defaults`.
pub fn isolated_defaults(image_name: impl Into<String>) -> SandboxConfigBuilder {
    SandboxConfigBuilder::new().image_name(image_name).network_disabled(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_image_name() {
        let err = SandboxConfigBuilder::new().build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingImageName));
    }

    #[test]
    fn rejects_negative_memory_limit() {
        let err = SandboxConfigBuilder::new()
            .image_name("alpine")
            .memory_limit_bytes(-1)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMemoryLimit(-1)));
    }

    #[test]
    fn accepts_zero_memory_limit() {
        let cfg = SandboxConfigBuilder::new().image_name("alpine").memory_limit_bytes(0).build().unwrap();
        assert_eq!(cfg.memory_limit_bytes, 0);
    }

    #[test]
    fn rejects_non_positive_cpu_quota() {
        let err = SandboxConfigBuilder::new()
            .image_name("alpine")
            .cpu_nano_cores(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCpuQuota(0)));
    }

    #[test]
    fn secure_defaults_enable_network() {
        let cfg = secure_defaults("alpine").build().unwrap();
        assert!(!cfg.network_disabled);
        assert!(cfg.read_only_root_filesystem);
        assert!(!cfg.privileged);
    }

    #[test]
    fn isolated_defaults_disable_network() {
        let cfg = isolated_defaults("alpine").build().unwrap();
        assert!(cfg.network_disabled);
    }
}
