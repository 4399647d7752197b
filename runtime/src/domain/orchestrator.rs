//! Domain bring-up orchestration.
//!
//! One orchestrator drives one domain through parse → create → attach.
//! Boot sequencing across domains is strictly privileged-first: the
//! workload domain's backend records name the privileged domain as their
//! backend, so it must be fully up before anything else starts.

use async_trait::async_trait;

use warden_core::{EventEmitter, HostEvent, Result, WardenError};

use crate::backend::parse_record;
use crate::domain::config::DomainConfig;
use crate::{DOMID_ANY, PRIVILEGED_DOMAIN_ID};

/// External domain-creation capability.
///
/// Both calls may block on the hypervisor; bring-up accepts that as a
/// bounded one-shot cost during boot.
#[async_trait]
pub trait DomainControl: Send + Sync {
    /// Create a domain from `config`.
    ///
    /// `requested_id` is honored when non-zero; `DOMID_ANY` lets the
    /// hypervisor pick. Returns the assigned domain id.
    async fn create(&self, config: &DomainConfig, requested_id: u32) -> Result<u32>;

    /// Attach the configured backends to an already created domain.
    async fn attach_backends(&self, config: &DomainConfig, domain_id: u32) -> Result<()>;
}

/// Role of a domain in the boot sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainRole {
    /// Management domain hosting the device backends. Must come up first,
    /// with its reserved identity.
    Privileged,
    /// Workload domain whose devices are served by the privileged domain.
    Workload,
}

/// Bring-up step at which a domain failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpStep {
    Parse,
    Create,
    Attach,
}

/// Per-domain bring-up state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    NotStarted,
    BackendsParsed,
    Created { domain_id: u32 },
    BackendsAttached { domain_id: u32 },
    Failed { step: BringUpStep },
}

/// Everything needed to bring one domain up.
pub struct DomainSpec {
    /// Domain name
    pub name: String,

    /// Boot-sequence role
    pub role: DomainRole,

    /// Static descriptor (backend sequence starts empty)
    pub config: DomainConfig,

    /// Textual backend records, attached in this order
    pub backend_records: Vec<String>,
}

/// Drives one domain through its bring-up state machine.
pub struct DomainOrchestrator {
    spec: DomainSpec,
    state: OrchestratorState,
    events: EventEmitter,
}

impl DomainOrchestrator {
    pub fn new(spec: DomainSpec, events: EventEmitter) -> Self {
        Self {
            spec,
            state: OrchestratorState::NotStarted,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Assigned domain id, once creation succeeded.
    pub fn domain_id(&self) -> Option<u32> {
        match self.state {
            OrchestratorState::Created { domain_id }
            | OrchestratorState::BackendsAttached { domain_id } => Some(domain_id),
            _ => None,
        }
    }

    /// Run the full bring-up: parse all backend records, create the domain,
    /// attach the backends. Returns the assigned domain id.
    ///
    /// A created domain is not torn down when a later step fails; it is
    /// left for operator cleanup and the failing step is reported.
    pub async fn run(&mut self, control: &dyn DomainControl) -> Result<u32> {
        self.parse_backends()?;

        let requested_id = match self.spec.role {
            DomainRole::Privileged => PRIVILEGED_DOMAIN_ID,
            DomainRole::Workload => DOMID_ANY,
        };

        let assigned = match control.create(&self.spec.config, requested_id).await {
            Ok(id) => id,
            Err(e) => {
                self.state = OrchestratorState::Failed {
                    step: BringUpStep::Create,
                };
                tracing::error!(domain = %self.spec.name, error = %e, "Failed to create domain");
                return Err(e);
            }
        };

        if requested_id != DOMID_ANY && assigned != requested_id {
            // The domain now exists under the wrong id; backend records
            // reference the requested id, so this is fatal configuration.
            self.state = OrchestratorState::Failed {
                step: BringUpStep::Create,
            };
            tracing::error!(
                domain = %self.spec.name,
                requested = requested_id,
                assigned,
                "Domain came up with an unexpected id"
            );
            return Err(WardenError::DomainIdentityMismatch {
                requested: requested_id,
                assigned,
            });
        }

        self.state = OrchestratorState::Created {
            domain_id: assigned,
        };
        self.events.emit(HostEvent::with_string(
            "domain.created",
            format!("{} (id {})", self.spec.name, assigned),
        ));
        tracing::info!(domain = %self.spec.name, domain_id = assigned, "Domain created");

        if let Err(e) = control.attach_backends(&self.spec.config, assigned).await {
            self.state = OrchestratorState::Failed {
                step: BringUpStep::Attach,
            };
            tracing::error!(
                domain = %self.spec.name,
                domain_id = assigned,
                error = %e,
                "Failed to attach backends"
            );
            return Err(e);
        }

        self.state = OrchestratorState::BackendsAttached {
            domain_id: assigned,
        };
        self.events.emit(HostEvent::with_string(
            "domain.backends_attached",
            self.spec.name.clone(),
        ));
        tracing::debug!(
            domain = %self.spec.name,
            backends = self.spec.config.backends.len(),
            "Backends attached"
        );

        Ok(assigned)
    }

    /// Parse every configured record in order, appending into the
    /// descriptor. The first failure aborts the whole bring-up, carrying
    /// the index of the failing record; nothing partial is appended.
    fn parse_backends(&mut self) -> Result<()> {
        for (index, record) in self.spec.backend_records.iter().enumerate() {
            let parsed = match parse_record(record) {
                Ok(r) => self.spec.config.backends.push(r),
                Err(e) => Err(e),
            };

            if let Err(e) = parsed {
                self.state = OrchestratorState::Failed {
                    step: BringUpStep::Parse,
                };
                tracing::error!(
                    domain = %self.spec.name,
                    index,
                    error = %e,
                    "Failed to parse backend record"
                );
                return Err(WardenError::Parse(format!(
                    "record #{index} of domain '{}': {e}",
                    self.spec.name
                )));
            }
        }

        self.state = OrchestratorState::BackendsParsed;
        Ok(())
    }
}

/// Boot the configured domains: the privileged domain first, to completion,
/// then the workload domains in the given order.
///
/// Privileged-domain failure aborts the sequence before any workload domain
/// is started. A workload failure is returned to the caller, which owns any
/// retry policy; domains already up stay up.
pub async fn boot_domains(
    specs: Vec<DomainSpec>,
    control: &dyn DomainControl,
    events: &EventEmitter,
) -> Result<Vec<(String, u32)>> {
    let (privileged, workload): (Vec<_>, Vec<_>) = specs
        .into_iter()
        .partition(|s| s.role == DomainRole::Privileged);

    let mut started = Vec::new();

    for spec in privileged.into_iter().chain(workload) {
        let name = spec.name.clone();
        let mut orchestrator = DomainOrchestrator::new(spec, events.clone());

        match orchestrator.run(control).await {
            Ok(domain_id) => started.push((name, domain_id)),
            Err(e) => {
                events.emit(HostEvent::with_string("domain.boot_failed", name));
                return Err(e);
            }
        }
    }

    Ok(started)
}
