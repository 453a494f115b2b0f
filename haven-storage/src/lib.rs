//! Haven Storage - Storage Seams and Implementations
//!
//! Defines the transaction traits the domain engines run against, the
//! object store gateway, an S3-compatible HTTP client, and in-memory
//! implementations used by tests. The PostgreSQL implementation lives in
//! haven-api.

pub mod memory;
pub mod object_store;
pub mod s3;
pub mod traits;

pub use memory::{FaultPlan, InMemoryStore, MemoryTx};
pub use object_store::{endpoint_host, object_key, InMemoryObjectStore, ObjectStore, StorageUrl};
pub use s3::{S3ObjectStore, S3Settings};
pub use traits::{
    AttachmentRepository, CascadeTx, LedgerTx, RequestState, Transaction, TransactionalStore,
    WorkflowTx,
};
