//! Domain models.

pub mod analysis;
pub mod backend;
pub mod config;
pub mod derivative;
pub mod outlier;
pub mod request;
pub mod response;
pub mod result;
pub mod workflow;

pub use analysis::{
    Claim, ConsensusItem, ConsensusReport, Contradiction, Disagreement, Severity, UniqueClaim,
    VarianceReport,
};
pub use backend::{BackendCatalog, BackendId, BackendProfile};
pub use config::{
    AnalysisConfig, Config, DispatchConfig, LogFormat, LoggingConfig, ProjectionConfig,
    RetryConfig, RotationPolicy,
};
pub use derivative::{Derivative, DerivativeKind, Reliability};
pub use outlier::{DetectionPass, OutlierCategory, OutlierClassification, OutlierReport};
pub use request::{ResearchDepth, ResearchRequest};
pub use response::{ModelResponse, ResponseOrigin};
pub use result::{
    ConfidenceTier, ConfirmedFinding, CostBreakdown, DisputedFinding, ResearchResult,
    SlotFailure, Timing, UniqueFinding,
};
pub use workflow::{DispatchStrategy, RosterEntry, WorkflowPlan};
