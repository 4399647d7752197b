//! Container instance adapter.
//!
//! Translates start/stop (and the declared pause/resume/state capabilities)
//! into uniform run-status results over the external OCI-style runtime
//! control surface. Every failure is surfaced wrapped, never retried.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use warden_core::{EventEmitter, HostEvent, Result, WardenError};

use crate::CONSOLE_SOCKET;

/// Container state reported by the external runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    Running,
    Paused,
    Destroyed,
}

/// External container runtime control surface.
///
/// Mirrors the OS-style contract of the underlying runtime: zero means
/// success, any other value is an error code. `state` reports the queried
/// state or the error code of the failed query.
pub trait ContainerControl: Send + Sync {
    fn run(&self, bundle: &Path, console_socket: i32, instance_id: &str) -> i32;
    fn kill(&self, instance_id: &str) -> i32;
    fn pause(&self, instance_id: &str) -> i32;
    fn resume(&self, instance_id: &str) -> i32;
    fn state(&self, instance_id: &str) -> std::result::Result<ContainerState, i32>;
}

/// Instance run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceRunState {
    Active,
    Failed,
}

/// Point-in-time outcome of a start request. Not a live handle: "Active"
/// means the launch was accepted, not that the workload finished
/// initializing.
#[derive(Debug)]
pub struct RunStatus {
    pub instance_id: String,
    pub state: InstanceRunState,
    pub error: Option<WardenError>,
}

/// Adapter over the external runtime control surface.
pub struct InstanceRunner {
    control: Arc<dyn ContainerControl>,
    events: EventEmitter,
}

impl InstanceRunner {
    pub fn new(control: Arc<dyn ContainerControl>, events: EventEmitter) -> Self {
        Self { control, events }
    }

    /// Start an instance from its runtime directory (the bundle path).
    ///
    /// Synchronous: returns once the runtime accepted or rejected the
    /// launch, without waiting for the workload to reach steady state.
    pub fn start_instance(&self, instance_id: &str, runtime_dir: &Path) -> RunStatus {
        tracing::debug!(instance_id, runtime_dir = %runtime_dir.display(), "Starting instance");

        let ret = self.control.run(runtime_dir, CONSOLE_SOCKET, instance_id);
        if ret != 0 {
            tracing::warn!(instance_id, code = ret, "Instance start rejected");
            return RunStatus {
                instance_id: instance_id.to_string(),
                state: InstanceRunState::Failed,
                error: Some(WardenError::RuntimeInvocation {
                    op: "run",
                    code: ret,
                }),
            };
        }

        self.events
            .emit(HostEvent::with_string("instance.started", instance_id));

        RunStatus {
            instance_id: instance_id.to_string(),
            state: InstanceRunState::Active,
            error: None,
        }
    }

    /// Stop an instance.
    pub fn stop_instance(&self, instance_id: &str) -> Result<()> {
        let ret = self.control.kill(instance_id);
        if ret != 0 {
            return Err(WardenError::RuntimeInvocation {
                op: "kill",
                code: ret,
            });
        }

        self.events
            .emit(HostEvent::with_string("instance.stopped", instance_id));
        Ok(())
    }

    /// Pause an instance.
    pub fn pause_instance(&self, instance_id: &str) -> Result<()> {
        let ret = self.control.pause(instance_id);
        if ret != 0 {
            return Err(WardenError::RuntimeInvocation {
                op: "pause",
                code: ret,
            });
        }
        Ok(())
    }

    /// Resume a paused instance.
    pub fn resume_instance(&self, instance_id: &str) -> Result<()> {
        let ret = self.control.resume(instance_id);
        if ret != 0 {
            return Err(WardenError::RuntimeInvocation {
                op: "resume",
                code: ret,
            });
        }
        Ok(())
    }

    /// Query the current state of an instance.
    pub fn query_state(&self, instance_id: &str) -> Result<ContainerState> {
        self.control
            .state(instance_id)
            .map_err(|code| WardenError::RuntimeInvocation { op: "state", code })
    }
}
