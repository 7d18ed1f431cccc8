//! The provisioning-engine boundary.
//!
//! Declaration is synchronous: an engine registers desired state and
//! immediately returns a handle whose attributes resolve later, outside the
//! caller's control. Nothing in this trait blocks, retries, or recovers —
//! remote-side failure semantics belong to the engine behind the boundary.

use serde_json::Value;

use crate::output::Output;
use crate::resource::{Resource, ResourceSpec};

/// An engine that accepts resource declarations and aggregates exports.
pub trait Provisioner: Send + Sync {
    /// Register desired state for one resource and return its handle.
    ///
    /// Must not block for remote confirmation; the handle's attributes are
    /// not necessarily known when this returns.
    fn declare(&self, spec: ResourceSpec) -> Resource;

    /// Export a final value under a name for external reporting.
    fn export(&self, name: &str, value: Output<Value>);
}
