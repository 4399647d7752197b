//! Warden Runtime - Isolated workload lifecycle supervision.
//!
//! This crate turns declarative configuration into running, observable
//! workloads: it parses backend device records, orchestrates guest-domain
//! creation (privileged domain first), adapts the external container
//! runtime into uniform run-status results, and watches the persistent
//! store for host reboot requests.

pub mod adapters;
pub mod backend;
pub mod domain;
pub mod instance;
pub mod power;
pub mod reboot;
pub mod store;
pub mod workload;

// Re-export common types
pub use adapters::{StubContainerRuntime, StubDomainControl};
pub use backend::{parse_record, BackendRecord, DiskAccess};
pub use domain::{
    boot_domains, BackendSet, BringUpStep, DomainConfig, DomainControl, DomainOrchestrator,
    DomainRole, DomainSpec, GicVersion, ImageSource, MemoryImage, OrchestratorState, TeeMode,
};
pub use instance::{
    ContainerControl, ContainerState, InstanceRunState, InstanceRunner, RunStatus,
};
pub use power::{HostPower, NullPower};
pub use reboot::RebootSupervisor;
pub use store::{FsStore, SentinelStore};
pub use workload::{ContainerInstance, GuestDomain, Workload, WorkloadStatus};

#[cfg(target_os = "linux")]
pub use power::LinuxPower;

/// Warden Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reserved id of the privileged (management) domain. Workload backend
/// records reference this id as their backend.
pub const PRIVILEGED_DOMAIN_ID: u32 = 1;

/// "Don't care" domain id: the hypervisor assigns the next free one.
pub const DOMID_ANY: u32 = 0;

/// Persistent-store value that confirms a reboot request.
pub const REBOOT_SENTINEL: i64 = 2;

/// Console transport handle passed to the container runtime on start.
pub const CONSOLE_SOCKET: i32 = 0;

/// Default capacity of a domain's backend sequence.
pub const DEFAULT_BACKEND_CAPACITY: usize = 8;
