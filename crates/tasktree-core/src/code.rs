//! Call records and instrumented callables.
//!
//! A [`CallRecord`] is the immutable identity of one call: the operation
//! name, the effective arguments, and the callable itself so the call can be
//! re-executed later. [`instrument`] turns a plain body into a
//! [`Callable`] whose every invocation is recorded in a [`TaskTree`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::argument::{Argument, Arguments};
use crate::error::{BindError, TaskError};
use crate::tree::TaskTree;

type ErasedBody =
    dyn Fn(&mut TaskTree, &Arguments) -> Result<Box<dyn Any>, TaskError> + Send + Sync;

type Body<T> = dyn Fn(&mut TaskTree, &Arguments) -> Result<T, TaskError> + Send + Sync;

/// One instrumented invocation: operation identity plus bound arguments.
///
/// Equality is structural: two records are equal when the operation names
/// match and the arguments compare equal by value.
#[derive(Clone)]
pub struct CallRecord {
    operation: String,
    arguments: Arguments,
    body: Arc<ErasedBody>,
}

impl CallRecord {
    pub fn new<T, F>(operation: impl Into<String>, arguments: Arguments, body: F) -> Self
    where
        T: 'static,
        F: Fn(&mut TaskTree, &Arguments) -> Result<T, TaskError> + Send + Sync + 'static,
    {
        CallRecord {
            operation: operation.into(),
            arguments,
            body: Arc::new(move |tree: &mut TaskTree, args: &Arguments| {
                body(tree, args).map(|value| Box::new(value) as Box<dyn Any>)
            }),
        }
    }

    /// A record whose callable does nothing and takes no arguments.
    pub fn marker(operation: impl Into<String>) -> Self {
        CallRecord::new(operation, Arguments::new(), |_: &mut TaskTree, _: &Arguments| Ok(()))
    }

    /// The record of a synthetic root node.
    pub fn no_operation() -> Self {
        CallRecord::marker("no_operation")
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Re-runs the callable with the recorded arguments.
    ///
    /// Failures raised by the callable are returned unchanged.
    pub fn execute(&self, tree: &mut TaskTree) -> Result<Box<dyn Any>, TaskError> {
        (self.body)(tree, &self.arguments)
    }

    /// `{ "operation": ..., "arguments": {...} }`; unserializable arguments
    /// are omitted.
    pub fn serialize(&self) -> Value {
        json!({
            "operation": self.operation,
            "arguments": self.arguments.to_json(&self.operation),
        })
    }

    /// The designator bound as `self`, as `(designator_type, document)`.
    pub fn designator(&self) -> Option<(&str, Value)> {
        let receiver = self.arguments.get("self")?;
        let designator_type = receiver.designator_type()?;
        Some((designator_type, receiver.to_json()?))
    }
}

impl PartialEq for CallRecord {
    fn eq(&self, other: &Self) -> bool {
        self.operation == other.operation && self.arguments == other.arguments
    }
}

impl fmt::Debug for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRecord")
            .field("operation", &self.operation)
            .field("arguments", &self.arguments)
            .finish()
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.arguments.iter().map(|(name, _)| name).collect();
        names.sort_unstable();
        write!(f, "{}({})", self.operation, names.join(", "))
    }
}

/// A declared parameter, with its default if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Argument>,
}

/// Ordered parameter list of a callable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Signature::default()
    }

    /// Adds a required parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Adds a parameter with a default value.
    pub fn param_default(mut self, name: impl Into<String>, default: impl Into<Argument>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Resolves passed arguments against the declared parameters.
    ///
    /// The result holds the effective value of every parameter, in
    /// declaration order, with defaults filled in.
    pub fn bind(&self, operation: &str, mut passed: Arguments) -> Result<Arguments, BindError> {
        if let Some((name, _)) = passed
            .iter()
            .find(|(name, _)| !self.parameters.iter().any(|p| p.name == *name))
        {
            return Err(BindError::UnexpectedArgument {
                operation: operation.to_string(),
                name: name.to_string(),
            });
        }

        let mut bound = Arguments::new();
        for parameter in &self.parameters {
            let value = match passed.take(&parameter.name) {
                Some(value) => value,
                None => parameter.default.clone().ok_or_else(|| BindError::MissingArgument {
                    operation: operation.to_string(),
                    name: parameter.name.clone(),
                })?,
            };
            bound.insert(parameter.name.clone(), value);
        }
        Ok(bound)
    }
}

/// An instrumented callable. See [`instrument`].
pub struct Callable<T> {
    name: String,
    signature: Signature,
    body: Arc<Body<T>>,
}

impl<T> Clone for Callable<T> {
    fn clone(&self) -> Self {
        Callable {
            name: self.name.clone(),
            signature: self.signature.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

impl<T: 'static> Callable<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Binds `arguments`, records the call under the tree's cursor, and runs
    /// the body.
    ///
    /// Returns exactly what the body returns. Binding errors are returned
    /// before any node is created.
    pub fn call(&self, tree: &mut TaskTree, arguments: Arguments) -> Result<T, TaskError> {
        let bound = self.signature.bind(&self.name, arguments)?;
        let body = Arc::clone(&self.body);
        let record = CallRecord::new(
            self.name.clone(),
            bound,
            move |tree: &mut TaskTree, args: &Arguments| body(tree, args),
        );
        tree.with_tree(record, |tree, args| (self.body)(tree, args))
    }
}

/// Wraps `body` so that each call is recorded as a task tree node.
pub fn instrument<T, F>(name: impl Into<String>, signature: Signature, body: F) -> Callable<T>
where
    T: 'static,
    F: Fn(&mut TaskTree, &Arguments) -> Result<T, TaskError> + Send + Sync + 'static,
{
    Callable {
        name: name.into(),
        signature,
        body: Arc::new(body),
    }
}
