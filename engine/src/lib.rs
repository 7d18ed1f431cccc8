//! # Groundwork Engine
//!
//! An in-memory [`Provisioner`] that executes declarations the way a real
//! provisioning engine would, minus the cloud: every declared resource is
//! created by its own task, attributes are fabricated deterministically,
//! and independent resources resolve concurrently in unspecified order.
//!
//! The engine also keeps the declaration ledger — order, kinds, and the
//! dependency edges reconstructed from property origins — so deployments
//! can be statically checked ([`SimulatedCloud::verify_order`]) and
//! reported on.
//!
//! ## Lifecycle
//!
//! ```ignore
//! let cloud = SimulatedCloud::new();
//! let components = deploy(&cloud, &config)?;   // declaration phase, sync
//! cloud.run().await?;                          // resolution phase
//! let outputs = cloud.resolved_exports().await;
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use groundwork_core::{AttrMap, Output, Provisioner, Resource, ResourceSpec};

mod fabricate;

/// Errors surfaced by the engine itself.
///
/// Declaration-phase errors belong to builders; these cover the engine's
/// own ledger checks and resolution machinery.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    /// A declaration references a resource that was not declared earlier.
    ///
    /// In a correctly-sequenced deployment this cannot happen by
    /// construction; the check exists so that any reordering of the fixed
    /// sequence is detectable.
    #[error("`{resource}` depends on `{dependency}`, which was not declared before it")]
    OrderViolation {
        /// Resource whose inputs reference the out-of-order dependency.
        resource: String,
        /// The dependency that was missing at declaration time.
        dependency: String,
    },

    /// A resource-creation task panicked or was cancelled.
    #[error("creation task for `{resource}` failed")]
    TaskFailed {
        /// Resource whose creation task did not complete.
        resource: String,
    },
}

/// One row of the declaration ledger.
#[derive(Debug, Clone)]
pub struct DeclarationRecord {
    /// Logical resource name.
    pub name: String,
    /// Resource kind.
    pub kind: String,
    /// Owning component, when grouped.
    pub parent: Option<String>,
    /// Names of earlier resources this declaration's inputs derive from.
    pub depends_on: BTreeSet<String>,
}

struct PendingResource {
    spec: ResourceSpec,
    complete: oneshot::Sender<AttrMap>,
}

#[derive(Default)]
struct EngineState {
    pending: Vec<PendingResource>,
    records: Vec<DeclarationRecord>,
    exports: BTreeMap<String, Output<Value>>,
}

/// In-memory provisioning engine.
///
/// `declare` is synchronous and never blocks; [`SimulatedCloud::run`]
/// later drives all creations concurrently. Attribute values are
/// fabricated deterministically from the resource kind, its resolved
/// properties, and a creation sequence number.
#[derive(Default)]
pub struct SimulatedCloud {
    state: Mutex<EngineState>,
    sequence: AtomicU64,
    created: Arc<Mutex<BTreeMap<String, AttrMap>>>,
}

impl SimulatedCloud {
    /// A fresh engine with an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drive every declared resource to completion.
    ///
    /// One task per resource: each awaits its pending property inputs,
    /// fabricates attributes, and fulfils the resource's handle. Tasks for
    /// independent resources run concurrently and finish in unspecified
    /// order; dependent tasks implicitly wait on their inputs.
    ///
    /// # Errors
    ///
    /// [`EngineError::TaskFailed`] when a creation task panics or is
    /// cancelled.
    pub async fn run(&self) -> Result<(), EngineError> {
        let pending = std::mem::take(&mut self.state().pending);
        debug!(resources = pending.len(), "resolving declared resources");

        let mut tasks = Vec::with_capacity(pending.len());
        for PendingResource { spec, complete } in pending {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            let name = spec.name.clone();
            let created = Arc::clone(&self.created);
            let task = tokio::spawn(async move {
                let mut resolved = AttrMap::new();
                for (key, input) in spec.props {
                    resolved.insert(key, input.into_output().resolve().await);
                }
                let attrs = fabricate::attributes(&spec.kind, &spec.name, &resolved, sequence);
                debug!(resource = %spec.name, kind = %spec.kind, "created");
                created
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(spec.name.clone(), attrs.clone());
                // Receiver gone means nobody holds the handle; fine.
                let _ = complete.send(attrs);
            });
            tasks.push((name, task));
        }

        for (name, task) in tasks {
            if task.await.is_err() {
                return Err(EngineError::TaskFailed { resource: name });
            }
        }
        Ok(())
    }

    /// Check that every recorded dependency edge points strictly backwards
    /// in declaration order.
    ///
    /// # Errors
    ///
    /// [`EngineError::OrderViolation`] naming the first offending edge.
    pub fn verify_order(&self) -> Result<(), EngineError> {
        let state = self.state();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for record in &state.records {
            for dependency in &record.depends_on {
                if !seen.contains(dependency.as_str()) {
                    return Err(EngineError::OrderViolation {
                        resource: record.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
            seen.insert(record.name.as_str());
        }
        Ok(())
    }

    /// Snapshot of the declaration ledger, in declaration order.
    #[must_use]
    pub fn records(&self) -> Vec<DeclarationRecord> {
        self.state().records.clone()
    }

    /// Resolved attributes of a created resource, by logical name.
    /// `None` until a run has created it.
    #[must_use]
    pub fn created(&self, name: &str) -> Option<AttrMap> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Resolve every exported value into a flat name → value mapping.
    pub async fn resolved_exports(&self) -> BTreeMap<String, Value> {
        let exports: Vec<(String, Output<Value>)> = self
            .state()
            .exports
            .iter()
            .map(|(name, output)| (name.clone(), output.clone()))
            .collect();

        let mut resolved = BTreeMap::new();
        for (name, output) in exports {
            resolved.insert(name, output.resolve().await);
        }
        resolved
    }
}

impl Provisioner for SimulatedCloud {
    fn declare(&self, spec: ResourceSpec) -> Resource {
        let (complete, handle) = oneshot::channel::<AttrMap>();
        let attrs = Output::pending(
            // The sender is dropped unfulfilled only when a run aborts,
            // in which case dependents are never awaited.
            async move { handle.await.unwrap_or_default() },
            BTreeSet::from([spec.name.clone()]),
        );
        let resource = Resource::new(spec.kind.clone(), spec.name.clone(), attrs);

        debug!(resource = %spec.name, kind = %spec.kind, "declared");
        let record = DeclarationRecord {
            name: spec.name.clone(),
            kind: spec.kind.clone(),
            parent: spec.parent.clone(),
            depends_on: spec.dependencies(),
        };
        let mut state = self.state();
        state.records.push(record);
        state.pending.push(PendingResource { spec, complete });
        resource
    }

    fn export(&self, name: &str, value: Output<Value>) {
        self.state().exports.insert(name.to_string(), value);
    }
}
