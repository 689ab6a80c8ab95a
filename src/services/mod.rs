//! Pipeline services: selection, dispatch and the analysis stages.

pub mod consensus_calculator;
pub mod cost_tracker;
pub mod derivative_deriver;
pub mod dispatch_coordinator;
pub mod outlier_isolator;
pub mod result_assembler;
pub mod text_analysis;
pub mod variance_analyzer;
pub mod workflow_selector;

pub use consensus_calculator::ConsensusCalculator;
pub use cost_tracker::{format_summary, projected_cost, CostTracker};
pub use derivative_deriver::DerivativeDeriver;
pub use dispatch_coordinator::{synthesis_prompt, DispatchCoordinator, DispatchOutcome};
pub use outlier_isolator::OutlierIsolator;
pub use result_assembler::{confidence_score, AssemblyInput, ResultAssembler};
pub use variance_analyzer::VarianceAnalyzer;
pub use workflow_selector::WorkflowSelector;
