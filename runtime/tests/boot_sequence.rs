//! End-to-end boot sequencing against mock capabilities.
//!
//! Drives the public API the way the host supervisor does: a privileged
//! domain with its reserved identity, then a workload domain whose backend
//! records reference the privileged domain.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use warden_core::{EventEmitter, Result, WardenError};
use warden_runtime::{
    boot_domains, BackendRecord, BackendSet, DomainConfig, DomainControl, DomainRole, DomainSpec,
    GicVersion, MemoryImage, TeeMode, DOMID_ANY, PRIVILEGED_DOMAIN_ID,
};

/// Records every call with the state of the descriptor at call time.
#[derive(Default)]
struct RecordingControl {
    /// (requested_id, assigned_id, backend count at creation)
    creations: Mutex<Vec<(u32, u32, usize)>>,
    /// (domain_id, backend records at attachment)
    attachments: Mutex<Vec<(u32, Vec<BackendRecord>)>>,
    /// Assigned id override for the next don't-care request
    next_any_id: Mutex<u32>,
}

impl RecordingControl {
    fn new() -> Self {
        Self {
            next_any_id: Mutex::new(2),
            ..Default::default()
        }
    }
}

#[async_trait]
impl DomainControl for RecordingControl {
    async fn create(&self, config: &DomainConfig, requested_id: u32) -> Result<u32> {
        let assigned = if requested_id == DOMID_ANY {
            let mut next = self.next_any_id.lock();
            let id = *next;
            *next += 1;
            id
        } else {
            requested_id
        };
        self.creations
            .lock()
            .push((requested_id, assigned, config.backends.len()));
        Ok(assigned)
    }

    async fn attach_backends(&self, config: &DomainConfig, domain_id: u32) -> Result<()> {
        self.attachments
            .lock()
            .push((domain_id, config.backends.records().to_vec()));
        Ok(())
    }
}

fn spec(name: &str, role: DomainRole, records: &[&str]) -> DomainSpec {
    DomainSpec {
        name: name.to_string(),
        role,
        config: DomainConfig {
            mem_kb: 0x4_0000,
            max_vcpus: 1,
            max_evtchns: 10,
            gnt_frames: 32,
            max_maptrack_frames: 1,
            gic_version: GicVersion::V2,
            tee: TeeMode::None,
            image: Arc::new(MemoryImage::new(vec![0u8; 64])),
            dtb: Vec::new(),
            cmdline: None,
            backends: BackendSet::with_capacity(8),
        },
        backend_records: records.iter().map(|r| r.to_string()).collect(),
    }
}

#[tokio::test]
async fn boot_brings_up_privileged_then_workload() {
    let control = RecordingControl::new();
    let events = EventEmitter::new(64);

    let started = boot_domains(
        vec![
            spec("domain-d", DomainRole::Privileged, &[]),
            spec(
                "domain-u",
                DomainRole::Workload,
                &[
                    "disk=['backend=1, vdev=xvda, access=rw, target=/dev/sda7']",
                    "vif=['backend=1,bridge=xenbr0,mac=08:00:27:ff:cb:ce,ip=172.44.0.2 255.255.255.0 172.44.0.1']",
                ],
            ),
        ],
        &control,
        &events,
    )
    .await
    .unwrap();

    assert_eq!(
        started,
        vec![
            ("domain-d".to_string(), PRIVILEGED_DOMAIN_ID),
            ("domain-u".to_string(), 2),
        ]
    );

    // The privileged domain was created with its reserved identity before
    // the workload domain was touched.
    let creations = control.creations.lock();
    assert_eq!(creations[0], (PRIVILEGED_DOMAIN_ID, PRIVILEGED_DOMAIN_ID, 0));
    assert_eq!(creations[1].0, DOMID_ANY);
    // Both workload records were parsed before its creation was requested.
    assert_eq!(creations[1].2, 2);

    // Workload attachment saw the parsed records, referencing the
    // privileged domain as their backend.
    let attachments = control.attachments.lock();
    assert_eq!(attachments.len(), 2);
    let (workload_id, records) = &attachments[1];
    assert_eq!(*workload_id, 2);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.backend_id() == PRIVILEGED_DOMAIN_ID));
}

#[tokio::test]
async fn workload_parse_failure_leaves_privileged_running() {
    let control = RecordingControl::new();
    let events = EventEmitter::new(64);

    let err = boot_domains(
        vec![
            spec("domain-d", DomainRole::Privileged, &[]),
            spec(
                "domain-u",
                DomainRole::Workload,
                &["disk=['vdev=xvda, access=rw, target=/dev/sda7']"],
            ),
        ],
        &control,
        &events,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, WardenError::Parse(_)));

    // Privileged domain completed its bring-up; the workload domain never
    // reached creation.
    assert_eq!(control.creations.lock().len(), 1);
    assert_eq!(control.attachments.lock().len(), 1);
}

/// Identity-mismatch control: assigns an off-by-one id for every request.
struct MismatchControl;

#[async_trait]
impl DomainControl for MismatchControl {
    async fn create(&self, _config: &DomainConfig, requested_id: u32) -> Result<u32> {
        Ok(requested_id + 1)
    }

    async fn attach_backends(&self, _config: &DomainConfig, _domain_id: u32) -> Result<()> {
        panic!("attachment must not run after an identity mismatch");
    }
}

#[tokio::test]
async fn privileged_identity_mismatch_aborts_boot() {
    let events = EventEmitter::new(64);

    let err = boot_domains(
        vec![
            spec("domain-d", DomainRole::Privileged, &[]),
            spec("domain-u", DomainRole::Workload, &[]),
        ],
        &MismatchControl,
        &events,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        WardenError::DomainIdentityMismatch {
            requested: 1,
            assigned: 2
        }
    ));
}
