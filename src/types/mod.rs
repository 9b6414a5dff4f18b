//! Public types for the Mimir API.

mod entity;
mod operation;
mod result;
mod value;

pub use entity::{EntityKey, InvalidationTarget};
pub use operation::{Operation, OperationKind, Request, Variables};
pub use result::{ExecutionResult, GraphError};
pub use value::{Object, Scalar, TYPENAME_FIELD, Value};
