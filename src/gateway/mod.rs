//! Response cache orchestration

mod builder;
mod cached;

pub use builder::{Mimir, MimirBuilder};
pub use cached::{
    CacheOutcome, ContextPredicate, EXTENSION_KEY, Executed, ResponseCache, ResultPredicate,
    SkipReason,
};
