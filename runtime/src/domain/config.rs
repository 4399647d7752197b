//! Static guest-domain descriptors.
//!
//! A [`DomainConfig`] is assembled once per domain role before boot and is
//! immutable afterwards, except for its backend sequence which is appended
//! to while the textual records are parsed.

use std::sync::Arc;

use warden_core::{Result, WardenError};

use crate::backend::BackendRecord;

/// Interrupt controller version exposed to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GicVersion {
    V2,
    V3,
}

/// Trusted execution mode of the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeMode {
    /// No trusted execution environment.
    None,
    /// OP-TEE mediated by the hypervisor.
    OpTee,
}

/// Image loader capability, injected per domain.
///
/// The domain-creation collaborator drives these calls while it builds the
/// guest address space; this crate never invokes them itself.
pub trait ImageSource: Send + Sync {
    /// Total image length in bytes.
    fn size(&self) -> u64;

    /// Copy exactly `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// Must have no side effects beyond the copy.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

/// Image held in host memory.
pub struct MemoryImage {
    bytes: Vec<u8>,
}

impl MemoryImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl ImageSource for MemoryImage {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| WardenError::Config(format!("image offset out of range: {offset}")))?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                WardenError::Config(format!(
                    "image read out of bounds: offset {offset}, len {}",
                    buf.len()
                ))
            })?;
        buf.copy_from_slice(&self.bytes[start..end]);
        Ok(())
    }
}

/// Fixed-capacity ordered sequence of backend records.
///
/// Append is all-or-nothing per record: an overflow leaves the already
/// stored records untouched.
#[derive(Debug)]
pub struct BackendSet {
    records: Vec<BackendRecord>,
    capacity: usize,
}

impl BackendSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a parsed record, in textual-record order.
    pub fn push(&mut self, record: BackendRecord) -> Result<()> {
        if self.records.len() >= self.capacity {
            return Err(WardenError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn records(&self) -> &[BackendRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Static guest-domain descriptor.
pub struct DomainConfig {
    /// Memory in KiB
    pub mem_kb: u64,

    /// Number of virtual CPUs
    pub max_vcpus: u32,

    /// Event channel budget
    pub max_evtchns: u32,

    /// Grant frame budget
    pub gnt_frames: u32,

    /// Map-track frame budget
    pub max_maptrack_frames: u32,

    /// Interrupt controller version
    pub gic_version: GicVersion,

    /// Trusted execution mode
    pub tee: TeeMode,

    /// Kernel/firmware image loader
    pub image: Arc<dyn ImageSource>,

    /// Flattened device tree blob passed to the guest
    pub dtb: Vec<u8>,

    /// Kernel command line (None for firmware-driven domains)
    pub cmdline: Option<String>,

    /// Backend device attachments, appended during parsing
    pub backends: BackendSet,
}

impl std::fmt::Debug for DomainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainConfig")
            .field("mem_kb", &self.mem_kb)
            .field("max_vcpus", &self.max_vcpus)
            .field("max_evtchns", &self.max_evtchns)
            .field("gnt_frames", &self.gnt_frames)
            .field("max_maptrack_frames", &self.max_maptrack_frames)
            .field("gic_version", &self.gic_version)
            .field("tee", &self.tee)
            .field("image_size", &self.image.size())
            .field("dtb_len", &self.dtb.len())
            .field("cmdline", &self.cmdline)
            .field("backends", &self.backends)
            .finish()
    }
}
