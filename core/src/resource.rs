//! Resource declaration records and property inputs.
//!
//! A [`ResourceSpec`] is the unit a builder hands to the engine: a kind, a
//! unique logical name, an optional parent (grouping only, for reporting),
//! and a property map. Properties are [`Input`]s — either literal JSON
//! values or pending [`Output`]s from earlier declarations, which is how
//! one component's outputs become another's inputs before their values
//! exist.
//!
//! The engine answers with a [`Resource`], whose named attributes are read
//! as outputs. A missing attribute resolves to JSON null rather than
//! failing: whether an attribute exists for a kind is the engine's
//! contract, not this crate's.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::output::Output;

/// Resolved attribute map of a created resource.
pub type AttrMap = serde_json::Map<String, Value>;

/// A property value passed to a resource declaration.
#[derive(Debug, Clone)]
pub enum Input {
    /// A literal value, known at declaration time.
    Value(Value),
    /// A value that only exists once some earlier resource resolves.
    Pending(Output<Value>),
}

impl Input {
    /// Names of the declared resources this input derives from.
    /// Empty for literals.
    pub fn origins(&self) -> BTreeSet<String> {
        match self {
            Self::Value(_) => BTreeSet::new(),
            Self::Pending(output) => output.origins().clone(),
        }
    }

    /// View this input as an output, resolving immediately for literals.
    pub fn into_output(self) -> Output<Value> {
        match self {
            Self::Value(value) => Output::ready(value),
            Self::Pending(output) => output,
        }
    }

    /// Build a list property. Literal-only lists stay literal; a single
    /// pending element makes the whole list pending.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Input>,
    {
        let items: Vec<Input> = items.into_iter().collect();
        if items
            .iter()
            .all(|item| matches!(item, Self::Value(_)))
        {
            let values = items
                .into_iter()
                .map(|item| match item {
                    Self::Value(value) => value,
                    Self::Pending(_) => Value::Null,
                })
                .collect();
            Self::Value(Value::Array(values))
        } else {
            let outputs = items.into_iter().map(Input::into_output).collect();
            Self::Pending(Output::all(outputs).map(Value::Array))
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<u16> for Input {
    fn from(value: u16) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<u32> for Input {
    fn from(value: u32) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<Output<Value>> for Input {
    fn from(output: Output<Value>) -> Self {
        Self::Pending(output)
    }
}

impl From<Output<String>> for Input {
    fn from(output: Output<String>) -> Self {
        Self::Pending(output.map(Value::String))
    }
}

/// Desired state for one resource, submitted to a [`crate::Provisioner`].
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    /// Resource kind, e.g. `ec2/vpc` or `s3/bucket`.
    pub kind: String,
    /// Unique logical name within the deployment.
    pub name: String,
    /// Owning component name. Grouping for reporting only; no ownership
    /// semantics.
    pub parent: Option<String>,
    /// Property map; insertion-independent ordering keeps declarations
    /// deterministic.
    pub props: BTreeMap<String, Input>,
}

impl ResourceSpec {
    /// Start a declaration of `kind` named `name`.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            parent: None,
            props: BTreeMap::new(),
        }
    }

    /// Group this resource under a parent component.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Add a property.
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Input>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Union of the origins of all pending properties: the resources this
    /// declaration depends on.
    pub fn dependencies(&self) -> BTreeSet<String> {
        self.props
            .values()
            .flat_map(Input::origins)
            .collect()
    }
}

/// Handle to a declared resource, exposing its eventual attributes.
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    kind: String,
    attrs: Output<AttrMap>,
}

impl Resource {
    /// Construct a handle. Engines call this from `declare`; builders only
    /// ever receive handles.
    pub fn new(kind: impl Into<String>, name: impl Into<String>, attrs: Output<AttrMap>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            attrs,
        }
    }

    /// Logical name of this resource.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of this resource.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// A named attribute as a deferred value. Resolves to JSON null when
    /// the engine did not produce the attribute.
    pub fn attr(&self, key: &str) -> Output<Value> {
        let key = key.to_string();
        self.attrs
            .map(move |attrs| attrs.get(&key).cloned().unwrap_or(Value::Null))
    }

    /// A named attribute as a deferred string. Non-string and missing
    /// attributes resolve to the empty string.
    pub fn attr_string(&self, key: &str) -> Output<String> {
        self.attr(key)
            .map(|value| value.as_str().unwrap_or_default().to_string())
    }
}
