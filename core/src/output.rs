//! Deferred output values.
//!
//! An [`Output<T>`] is the result of declaring a resource: a value that is
//! not legible until the engine has created the resource, but that can be
//! mapped and combined freely during the declaration phase. The combining
//! primitives ([`Output::map`], [`Output::zip`], [`Output::all`]) build new
//! outputs that resolve exactly once, after every input has resolved, from
//! the inputs' final values — the arrival order of those inputs is
//! deliberately unobservable.
//!
//! Every output carries the set of resource names it derives from (its
//! *origins*). Mapping preserves origins, combining unions them, so an
//! engine can reconstruct the dependency edges of the declaration graph
//! from the inputs it is handed.
//!
//! # Example
//!
//! ```ignore
//! let url = registry.attr_string("repository_url");
//! let bucket = store.attr_string("bucket");
//! let script = Output::all(vec![url, bucket])
//!     .map(|values| render(&values[0], &values[1]));
//! // `script` resolves once both attributes are known, in either order.
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

/// An opaque, eventually-resolved value derived from declared resources.
///
/// Cloning an `Output` is cheap and shares the underlying resolution:
/// every clone observes the same final value. Consumers hold non-owning
/// clones purely for reading resolved attributes; only the engine that
/// created the output drives its resolution.
pub struct Output<T> {
    future: Shared<BoxFuture<'static, T>>,
    origins: Arc<BTreeSet<String>>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
            origins: Arc::clone(&self.origins),
        }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("origins", &self.origins)
            .finish_non_exhaustive()
    }
}

impl<T> Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// An already-resolved output with no resource origins.
    ///
    /// Used for compile-time-known scalars that participate in joins next
    /// to genuinely deferred values.
    pub fn ready(value: T) -> Self {
        Self {
            future: async move { value }.boxed().shared(),
            origins: Arc::new(BTreeSet::new()),
        }
    }

    /// An output that resolves when `future` completes.
    ///
    /// `origins` names the declared resources this value derives from.
    /// Engines call this when constructing resource handles; everything
    /// downstream composes via [`Output::map`] and friends.
    pub fn pending<F>(future: F, origins: BTreeSet<String>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: future.boxed().shared(),
            origins: Arc::new(origins),
        }
    }

    /// Derive a new output by applying a pure function to the resolved
    /// value. Origins are preserved.
    pub fn map<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let future = self.future.clone();
        Output {
            future: async move { f(future.await) }.boxed().shared(),
            origins: Arc::clone(&self.origins),
        }
    }

    /// Combine two outputs into one that resolves to the pair of their
    /// final values. Origins are unioned.
    pub fn zip<U>(&self, other: &Output<U>) -> Output<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        let a = self.future.clone();
        let b = other.future.clone();
        let origins = self.origins.union(&other.origins).cloned().collect();
        Output {
            future: async move { futures::join!(a, b) }.boxed().shared(),
            origins: Arc::new(origins),
        }
    }

    /// Join any number of outputs into one that resolves to all their
    /// final values, in input order, once every input has resolved.
    ///
    /// The inputs themselves may resolve in any order; the joined value
    /// reads each input's final value only.
    pub fn all(outputs: Vec<Output<T>>) -> Output<Vec<T>> {
        let origins = outputs
            .iter()
            .flat_map(|output| output.origins.iter().cloned())
            .collect();
        let joined: Vec<_> = outputs.into_iter().map(|output| output.future).collect();
        Output {
            future: async move { futures::future::join_all(joined).await }
                .boxed()
                .shared(),
            origins: Arc::new(origins),
        }
    }

    /// Await the final value. Only engines, aggregators and tests resolve;
    /// declaration-phase code composes without awaiting.
    pub async fn resolve(&self) -> T {
        self.future.clone().await
    }

    /// Names of the declared resources this value derives from.
    pub fn origins(&self) -> &BTreeSet<String> {
        &self.origins
    }
}
