//! Unified workload interface.
//!
//! Guest domains and containers are driven through differently-shaped
//! external APIs; this module folds both behind one `Workload` trait so
//! supervision logic above it stays mechanism-agnostic.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use warden_core::{Result, WardenError};

use crate::domain::{DomainControl, DomainOrchestrator, OrchestratorState};
use crate::instance::{ContainerState, InstanceRunState, InstanceRunner};

/// Run-status of a supervised workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadStatus {
    Running,
    Paused,
    Stopped,
}

/// A supervised workload, independent of its isolation mechanism.
#[async_trait]
pub trait Workload: Send + Sync {
    /// Workload identifier (domain name or instance id).
    fn id(&self) -> &str;

    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    async fn status(&self) -> Result<WorkloadStatus>;
}

/// Hypervisor guest domain driven through the bring-up orchestrator.
pub struct GuestDomain {
    orchestrator: DomainOrchestrator,
    control: Arc<dyn DomainControl>,
}

impl GuestDomain {
    pub fn new(orchestrator: DomainOrchestrator, control: Arc<dyn DomainControl>) -> Self {
        Self {
            orchestrator,
            control,
        }
    }

    /// Assigned domain id, once created.
    pub fn domain_id(&self) -> Option<u32> {
        self.orchestrator.domain_id()
    }
}

#[async_trait]
impl Workload for GuestDomain {
    fn id(&self) -> &str {
        self.orchestrator.name()
    }

    async fn start(&mut self) -> Result<()> {
        self.orchestrator.run(self.control.as_ref()).await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        // Domain teardown is not part of the creation capability in this
        // generation; a created domain is cleaned up by the operator.
        Err(WardenError::Unsupported("guest domain teardown"))
    }

    async fn status(&self) -> Result<WorkloadStatus> {
        Ok(match self.orchestrator.state() {
            OrchestratorState::BackendsAttached { .. } => WorkloadStatus::Running,
            _ => WorkloadStatus::Stopped,
        })
    }
}

/// Container instance driven through the runtime adapter.
pub struct ContainerInstance {
    instance_id: String,
    runtime_dir: PathBuf,
    runner: Arc<InstanceRunner>,
}

impl ContainerInstance {
    pub fn new(instance_id: impl Into<String>, runtime_dir: PathBuf, runner: Arc<InstanceRunner>) -> Self {
        Self {
            instance_id: instance_id.into(),
            runtime_dir,
            runner,
        }
    }
}

#[async_trait]
impl Workload for ContainerInstance {
    fn id(&self) -> &str {
        &self.instance_id
    }

    async fn start(&mut self) -> Result<()> {
        let status = self
            .runner
            .start_instance(&self.instance_id, &self.runtime_dir);
        match status.state {
            InstanceRunState::Active => Ok(()),
            InstanceRunState::Failed => Err(status.error.unwrap_or_else(|| {
                WardenError::RuntimeInvocation { op: "run", code: -1 }
            })),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.runner.stop_instance(&self.instance_id)
    }

    async fn status(&self) -> Result<WorkloadStatus> {
        Ok(match self.runner.query_state(&self.instance_id)? {
            ContainerState::Running => WorkloadStatus::Running,
            ContainerState::Paused => WorkloadStatus::Paused,
            ContainerState::Destroyed => WorkloadStatus::Stopped,
        })
    }
}
