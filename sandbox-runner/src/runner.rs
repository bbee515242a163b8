use std::time::{Duration, Instant};

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions, WaitContainerOptions,
};
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use futures::StreamExt;
use tracing::{instrument, warn};

use crate::config::SandboxConfig;
use crate::errors::{SandboxError, SandboxResult};

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
}

pub struct SandboxRunner {
    docker: Docker,
}

impl SandboxRunner {
    pub fn connect() -> SandboxResult<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(SandboxError::Docker)?;
        Ok(Self { docker })
    }

    /// Creates, starts, waits for (bounded by `cfg.timeout`) and tears down
    /// one container. The container is removed on every exit path,
    /// including timeout and mid-run errors, regardless of `auto_remove`
    /// (a killed container may not auto-remove cleanly).
    #[instrument(skip(self, cfg), fields(image = %cfg.image_name))]
    pub async fn run(&self, cfg: &SandboxConfig) -> SandboxResult<ExecutionOutcome> {
        let name = format!("review-sandbox-{}", uuid_like());
        let container_id = self.create(&name, cfg).await?;

        let outcome = self.start_and_wait(&container_id, cfg).await;

        if let Err(e) = self.remove(&container_id).await {
            warn!(container = %container_id, error = %e, "failed to remove sandbox container after run");
        }

        outcome
    }

    async fn create(&self, name: &str, cfg: &SandboxConfig) -> SandboxResult<String> {
        let mut mounts = Vec::new();
        if let Some(volume) = &cfg.workspace_volume {
            mounts.push(Mount {
                target: Some(cfg.working_directory.clone()),
                source: Some(volume.clone()),
                typ: Some(MountTypeEnum::BIND),
                read_only: Some(false),
                ..Default::default()
            });
        }

        let host_config = HostConfig {
            memory: Some(cfg.memory_limit_bytes),
            nano_cpus: Some(cfg.cpu_nano_cores),
            readonly_rootfs: Some(cfg.read_only_root_filesystem),
            security_opt: if cfg.no_new_privileges {
                Some(vec!["no-new-privileges:true".to_string()])
            } else {
                None
            },
            privileged: Some(false),
            network_mode: if cfg.network_disabled { Some("none".to_string()) } else { None },
            auto_remove: Some(false),
            mounts: if mounts.is_empty() { None } else { Some(mounts) },
            ..Default::default()
        };

        let container_config = Config {
            image: Some(cfg.image_name.clone()),
            working_dir: Some(cfg.working_directory.clone()),
            cmd: if cfg.command.is_empty() { None } else { Some(cfg.command.clone()) },
            host_config: Some(host_config),
            network_disabled: Some(cfg.network_disabled),
            ..Default::default()
        };

        let options = CreateContainerOptions { name: name.to_string(), platform: None };
        let created = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(SandboxError::Docker)?;
        Ok(created.id)
    }

    async fn start_and_wait(&self, container_id: &str, cfg: &SandboxConfig) -> SandboxResult<ExecutionOutcome> {
        let started = Instant::now();
        self.docker
            .start_container::<String>(container_id, None)
            .await
            .map_err(SandboxError::Docker)?;

        let wait = async {
            let mut stream = self.docker.wait_container(container_id, None::<WaitContainerOptions<String>>);
            let mut exit_code = 0i64;
            while let Some(next) = stream.next().await {
                match next {
                    Ok(response) => exit_code = response.status_code,
                    Err(e) => return Err(SandboxError::Docker(e)),
                }
            }
            Ok(exit_code)
        };

        match tokio::time::timeout(cfg.timeout, wait).await {
            Ok(Ok(exit_code)) => {
                let (stdout, stderr) = self.collect_logs(container_id).await?;
                Ok(ExecutionOutcome { exit_code, stdout, stderr, duration: started.elapsed(), timed_out: false })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                if let Err(e) = self.docker.kill_container::<String>(container_id, None).await {
                    warn!(container = %container_id, error = %e, "failed to kill timed-out sandbox container");
                }
                let (stdout, stderr) = self.collect_logs(container_id).await.unwrap_or_default();
                Ok(ExecutionOutcome { exit_code: -1, stdout, stderr, duration: cfg.timeout, timed_out: true })
            }
        }
    }

    async fn collect_logs(&self, container_id: &str) -> SandboxResult<(String, String)> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            timestamps: false,
            ..Default::default()
        };
        let mut stream = self.docker.logs(container_id, Some(options));
        let mut stdout = String::new();
        let mut stderr = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk.map_err(SandboxError::Docker)? {
                bollard::container::LogOutput::StdOut { message } => {
                    stdout.push_str(&String::from_utf8_lossy(&message));
                }
                bollard::container::LogOutput::StdErr { message } => {
                    stderr.push_str(&String::from_utf8_lossy(&message));
                }
                _ => {}
            }
        }
        Ok((stdout, stderr))
    }

    async fn remove(&self, container_id: &str) -> SandboxResult<()> {
        let options = RemoveContainerOptions { force: true, v: true, ..Default::default() };
        self.docker
            .remove_container(container_id, Some(options))
            .await
            .map_err(SandboxError::Docker)
    }
}

fn uuid_like() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    format!("{nanos:x}")
}
