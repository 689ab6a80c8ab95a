//! Provider plumbing: admission control, retry and the backend registry.

pub mod admission;
pub mod registry;
pub mod retry;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use registry::{CallPolicy, ProviderRegistry};
pub use retry::RetryPolicy;
