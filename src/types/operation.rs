//! Operation and request types

use serde::{Deserialize, Serialize};

/// Variable values supplied with an operation.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Read or write nature of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Read operation; eligible for caching.
    Query,
    /// Write operation; never cached, purges the entities it returns.
    Mutation,
    /// Long-lived read; passed through uncached.
    Subscription,
}

impl OperationKind {
    /// Name of the root type this kind of operation starts from.
    pub fn root_type(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }

    /// Lowercase label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

/// An operation as the cache sees it: its identity plus its top-level selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    /// Operation name, when the document names it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Operation document text.
    pub document: String,
    /// Root fields selected by the operation.
    ///
    /// Left empty, the keys of the result's root object stand in.
    #[serde(default)]
    pub root_fields: Vec<String>,
}

impl Operation {
    /// Create an operation of the given kind.
    pub fn new(kind: OperationKind, document: impl Into<String>) -> Self {
        Self {
            kind,
            name: None,
            document: document.into(),
            root_fields: Vec::new(),
        }
    }

    /// Create a read operation.
    pub fn query(document: impl Into<String>) -> Self {
        Self::new(OperationKind::Query, document)
    }

    /// Create a write operation.
    pub fn mutation(document: impl Into<String>) -> Self {
        Self::new(OperationKind::Mutation, document)
    }

    /// Create a subscription operation.
    pub fn subscription(document: impl Into<String>) -> Self {
        Self::new(OperationKind::Subscription, document)
    }

    /// Set the operation name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare a root field selected by this operation.
    pub fn root_field(mut self, field: impl Into<String>) -> Self {
        self.root_fields.push(field.into());
        self
    }
}

/// One execution request: an operation plus its variable values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub operation: Operation,
    #[serde(default)]
    pub variables: Variables,
}

impl Request {
    /// Create a request with no variables.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            variables: Variables::new(),
        }
    }

    /// Set one variable value.
    pub fn variable(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Replace all variable values.
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind
    }
}

impl From<Operation> for Request {
    fn from(operation: Operation) -> Self {
        Request::new(operation)
    }
}
