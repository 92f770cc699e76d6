//! Raycheck core - renderer grading harness
//!
//! Provides the orchestration logic behind the `raycheck` binary:
//! - Discovers `.ray` scene files under a scene root
//! - Renders each scene with a candidate and a trusted reference executable
//! - Caches reference renders keyed by a digest of the reference binary
//! - Grades each scene by root-mean-square pixel error

pub mod compare;
pub mod digest;
pub mod harness;
pub mod layout;
pub mod runner;
pub mod scene;
pub mod signature;

// Re-export key types
pub use compare::{classify, compare, CompareError, Verdict};
pub use digest::{Digest, DigestError};
pub use harness::{Harness, HarnessConfig, HarnessError, Outcome, RunSummary, SceneReport};
pub use layout::OutputLayout;
pub use runner::{render, Capture, RenderPolicy, RunnerError};
pub use scene::{discover, SceneFile};
pub use signature::{validate_reference, FsSignatureStore, SignatureError, SignatureStore};
