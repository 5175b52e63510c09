//! Remote sharded store: a two-level document hierarchy over a batched,
//! capacity-limited backend.
//!
//! Layout: top-level shard documents keyed by sanitized `client_city_area`,
//! each owning a dated child collection keyed by `YYYY-MM-DD`.

mod backend;
mod http;
mod memory;
mod store;

pub use backend::{DocOp, DocumentBackend, ShardDoc, ShardFilter, HARD_BATCH_CAP};
pub use http::HttpBackend;
pub use memory::MemoryBackend;
pub use store::{
    ClearOutcome, ShardedStore, WriteOutcome, ANALYSIS_SHARD_CAP, BROAD_SHARD_CAP, OP_CEILING,
    RESULT_CAP,
};
