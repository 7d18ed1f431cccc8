//! # Groundwork Core
//!
//! Declaration vocabulary for the Groundwork provisioning toolkit.
//!
//! This crate defines *descriptions*, not execution. Component builders use
//! it to declare desired infrastructure against a [`Provisioner`] and to
//! wire one component's eventual outputs into another component's inputs,
//! without ever blocking on remote resource creation.
//!
//! ## Core Concepts
//!
//! - **[`Output<T>`]**: an opaque, eventually-resolved value. Cloning is
//!   cheap; combining is pure. An output also remembers which declared
//!   resources it derives from, which is how dependency edges are recorded.
//! - **[`Input`]**: a property handed to a resource declaration — either a
//!   literal value or a pending output of an earlier declaration.
//! - **[`ResourceSpec`] / [`Resource`]**: the record submitted to an engine
//!   and the handle it returns, exposing named attributes as outputs.
//! - **[`Provisioner`]**: the engine boundary. Declaring registers desired
//!   state synchronously; resolution happens later, outside the caller's
//!   control, possibly concurrently and in any order.
//!
//! ## Architecture Principles
//!
//! - Declaration is synchronous and never waits on resolution
//! - Values derived from many resources are pure joins of their outputs
//! - Dependency edges are implicit in handle-passing, explicit in `origins`
//! - No shared mutable state between components

pub mod output;
pub mod provisioner;
pub mod resource;

pub use output::Output;
pub use provisioner::Provisioner;
pub use resource::{AttrMap, Input, Resource, ResourceSpec};
