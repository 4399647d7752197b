//! Static domain descriptors for the boot sequence.
//!
//! The resource budgets below are fixed for this host generation; only
//! memory, vCPU count, command line, and the backend records come from the
//! host configuration.

use std::sync::Arc;

use warden_core::DomainResources;
use warden_runtime::{
    BackendSet, DomainConfig, DomainRole, DomainSpec, GicVersion, ImageSource, MemoryImage,
    TeeMode, DEFAULT_BACKEND_CAPACITY,
};

/// Build the pre-populated descriptor for the privileged domain.
pub fn privileged_spec(resources: &DomainResources, image: Arc<dyn ImageSource>, dtb: Vec<u8>) -> DomainSpec {
    domain_spec(resources, DomainRole::Privileged, image, dtb)
}

/// Build the pre-populated descriptor for a workload domain.
pub fn workload_spec(resources: &DomainResources, image: Arc<dyn ImageSource>, dtb: Vec<u8>) -> DomainSpec {
    domain_spec(resources, DomainRole::Workload, image, dtb)
}

fn domain_spec(
    resources: &DomainResources,
    role: DomainRole,
    image: Arc<dyn ImageSource>,
    dtb: Vec<u8>,
) -> DomainSpec {
    DomainSpec {
        name: resources.name.clone(),
        role,
        config: DomainConfig {
            mem_kb: resources.memory_kb,
            max_vcpus: resources.vcpus,
            max_evtchns: 10,
            gnt_frames: 32,
            max_maptrack_frames: 1,
            gic_version: GicVersion::V2,
            tee: TeeMode::None,
            image,
            dtb,
            cmdline: resources.cmdline.clone(),
            backends: BackendSet::with_capacity(DEFAULT_BACKEND_CAPACITY),
        },
        backend_records: resources.backends.clone(),
    }
}

/// Load the domain image from the configured path, or fall back to an
/// empty in-memory image when none is configured (stubbed hosts).
pub fn load_image(resources: &DomainResources) -> std::io::Result<Arc<dyn ImageSource>> {
    match &resources.kernel_image {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            tracing::debug!(path = %path.display(), len = bytes.len(), "Loaded domain image");
            Ok(Arc::new(MemoryImage::new(bytes)))
        }
        None => {
            tracing::warn!(domain = %resources.name, "No kernel image configured, using empty image");
            Ok(Arc::new(MemoryImage::new(Vec::new())))
        }
    }
}

/// Load the device tree blob from the configured path, if any.
pub fn load_dtb(resources: &DomainResources) -> std::io::Result<Vec<u8>> {
    match &resources.device_tree {
        Some(path) => std::fs::read(path),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privileged_spec_uses_configured_resources() {
        let resources = DomainResources::privileged_defaults();
        let spec = privileged_spec(&resources, Arc::new(MemoryImage::new(Vec::new())), Vec::new());

        assert_eq!(spec.role, DomainRole::Privileged);
        assert_eq!(spec.config.mem_kb, 0x20_0000);
        assert_eq!(spec.config.max_vcpus, 4);
        assert_eq!(spec.config.max_evtchns, 10);
        assert!(spec.backend_records.is_empty());
    }

    #[test]
    fn test_workload_spec_carries_backend_records() {
        let resources = DomainResources::workload_defaults();
        let spec = workload_spec(&resources, Arc::new(MemoryImage::new(Vec::new())), Vec::new());

        assert_eq!(spec.role, DomainRole::Workload);
        assert_eq!(spec.backend_records.len(), 2);
        assert_eq!(spec.config.backends.len(), 0);
    }
}
