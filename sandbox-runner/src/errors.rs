use std::time::Duration;
use thiserror::Error;

pub type SandboxResult<T> = Result<T, SandboxError>;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("invalid sandbox configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("container runtime error: {0}")]
    Docker(#[from] bollard::errors::Error),
    #[error("container wall-clock timeout after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("imageName is required")]
    MissingImageName,
    #[error("memoryLimitBytes must be > 0, got {0}")]
    InvalidMemoryLimit(i64),
    #[error("cpuNanoCores must be > 0, got {0}")]
    InvalidCpuQuota(i64),
    #[error("privileged containers are not permitted")]
    PrivilegedNotAllowed,
}
