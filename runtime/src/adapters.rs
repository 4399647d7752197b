//! Stub adapters for the external capabilities.
//!
//! Hosts without a hypervisor (development machines, CI) and the test
//! suite drive the supervisor against these; the shipped system replaces
//! them with the real hypervisor and runtime bindings.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use warden_core::Result;

use crate::domain::{DomainConfig, DomainControl};
use crate::instance::{ContainerControl, ContainerState};
use crate::DOMID_ANY;

/// In-memory domain control: honors requested ids and assigns sequential
/// ids above the reserved range for don't-care requests.
pub struct StubDomainControl {
    next_id: AtomicU32,
    created: Mutex<Vec<u32>>,
    attached: Mutex<Vec<u32>>,
}

impl StubDomainControl {
    pub fn new() -> Self {
        Self {
            // Id 1 is reserved for the privileged domain.
            next_id: AtomicU32::new(2),
            created: Mutex::new(Vec::new()),
            attached: Mutex::new(Vec::new()),
        }
    }

    /// Ids of created domains, in creation order.
    pub fn created_ids(&self) -> Vec<u32> {
        self.created.lock().clone()
    }

    /// Ids whose backends were attached, in attachment order.
    pub fn attached_ids(&self) -> Vec<u32> {
        self.attached.lock().clone()
    }
}

impl Default for StubDomainControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainControl for StubDomainControl {
    async fn create(&self, config: &DomainConfig, requested_id: u32) -> Result<u32> {
        let assigned = if requested_id == DOMID_ANY {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        } else {
            requested_id
        };

        tracing::debug!(
            requested_id,
            assigned,
            mem_kb = config.mem_kb,
            vcpus = config.max_vcpus,
            "Stub domain created"
        );
        self.created.lock().push(assigned);
        Ok(assigned)
    }

    async fn attach_backends(&self, config: &DomainConfig, domain_id: u32) -> Result<()> {
        tracing::debug!(
            domain_id,
            backends = config.backends.len(),
            "Stub backends attached"
        );
        self.attached.lock().push(domain_id);
        Ok(())
    }
}

/// In-memory container runtime: every call succeeds, state transitions
/// are tracked per instance.
pub struct StubContainerRuntime {
    states: Mutex<HashMap<String, ContainerState>>,
}

impl StubContainerRuntime {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for StubContainerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerControl for StubContainerRuntime {
    fn run(&self, bundle: &Path, console_socket: i32, instance_id: &str) -> i32 {
        tracing::debug!(
            instance_id,
            bundle = %bundle.display(),
            console_socket,
            "Stub instance started"
        );
        self.states
            .lock()
            .insert(instance_id.to_string(), ContainerState::Running);
        0
    }

    fn kill(&self, instance_id: &str) -> i32 {
        match self.states.lock().get_mut(instance_id) {
            Some(state) => {
                *state = ContainerState::Destroyed;
                0
            }
            None => libc::ESRCH,
        }
    }

    fn pause(&self, instance_id: &str) -> i32 {
        let mut states = self.states.lock();
        match states.get_mut(instance_id) {
            Some(state) if *state == ContainerState::Running => {
                *state = ContainerState::Paused;
                0
            }
            Some(_) => libc::EINVAL,
            None => libc::ESRCH,
        }
    }

    fn resume(&self, instance_id: &str) -> i32 {
        let mut states = self.states.lock();
        match states.get_mut(instance_id) {
            Some(state) if *state == ContainerState::Paused => {
                *state = ContainerState::Running;
                0
            }
            Some(_) => libc::EINVAL,
            None => libc::ESRCH,
        }
    }

    fn state(&self, instance_id: &str) -> std::result::Result<ContainerState, i32> {
        self.states
            .lock()
            .get(instance_id)
            .copied()
            .ok_or(libc::ESRCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackendSet, GicVersion, MemoryImage, TeeMode};
    use crate::PRIVILEGED_DOMAIN_ID;
    use std::sync::Arc;

    fn config() -> DomainConfig {
        DomainConfig {
            mem_kb: 1024,
            max_vcpus: 1,
            max_evtchns: 10,
            gnt_frames: 32,
            max_maptrack_frames: 1,
            gic_version: GicVersion::V2,
            tee: TeeMode::None,
            image: Arc::new(MemoryImage::new(Vec::new())),
            dtb: Vec::new(),
            cmdline: None,
            backends: BackendSet::with_capacity(4),
        }
    }

    #[tokio::test]
    async fn test_stub_honors_requested_id() {
        let control = StubDomainControl::new();
        let assigned = control.create(&config(), PRIVILEGED_DOMAIN_ID).await.unwrap();
        assert_eq!(assigned, PRIVILEGED_DOMAIN_ID);
    }

    #[tokio::test]
    async fn test_stub_assigns_sequential_ids() {
        let control = StubDomainControl::new();
        let first = control.create(&config(), DOMID_ANY).await.unwrap();
        let second = control.create(&config(), DOMID_ANY).await.unwrap();
        assert_eq!(first, 2);
        assert_eq!(second, 3);
        assert_eq!(control.created_ids(), vec![2, 3]);
    }

    #[test]
    fn test_stub_runtime_state_transitions() {
        let runtime = StubContainerRuntime::new();
        assert_eq!(runtime.state("instance-0"), Err(libc::ESRCH));

        assert_eq!(runtime.run(Path::new("/bundles/0"), 0, "instance-0"), 0);
        assert_eq!(runtime.state("instance-0"), Ok(ContainerState::Running));

        assert_eq!(runtime.pause("instance-0"), 0);
        assert_eq!(runtime.state("instance-0"), Ok(ContainerState::Paused));

        // Pausing a paused instance is rejected.
        assert_eq!(runtime.pause("instance-0"), libc::EINVAL);

        assert_eq!(runtime.resume("instance-0"), 0);
        assert_eq!(runtime.kill("instance-0"), 0);
        assert_eq!(runtime.state("instance-0"), Ok(ContainerState::Destroyed));
    }

    #[test]
    fn test_stub_runtime_unknown_instance() {
        let runtime = StubContainerRuntime::new();
        assert_eq!(runtime.kill("missing"), libc::ESRCH);
        assert_eq!(runtime.resume("missing"), libc::ESRCH);
    }
}
