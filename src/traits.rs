//! Core Executor trait

use async_trait::async_trait;

use crate::{ExecutionResult, Request};

/// The operation-execution pipeline the cache wraps.
///
/// The cache treats execution as opaque: parsing, validation and field
/// resolution all happen behind this call. Execution errors belong in
/// [`ExecutionResult::errors`]; the cache never rewrites or suppresses them.
/// Timeouts and cancellation are the implementor's concern.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Per-request caller context (auth, session, tenant...).
    type Context: Send + Sync;

    /// Execute one operation.
    async fn execute(&self, request: &Request, context: &Self::Context) -> ExecutionResult;
}
