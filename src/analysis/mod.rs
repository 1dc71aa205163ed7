//! Analysis and result aggregation modules
//!
//! Sequences the feature extractors into a final analysis:
//! - Orchestration and stage tracking
//! - Result and metadata types

pub mod orchestrator;
pub mod result;

pub use orchestrator::{AnalysisOrchestrator, AnalysisStage};
pub use result::{AnalysisMetadata, AnalysisResult, Key, Mode, PitchClass};
