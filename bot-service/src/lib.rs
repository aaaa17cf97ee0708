pub mod artifacts;
pub mod catalog;
pub mod context;
pub mod orchestrator;
pub mod responded;

pub use artifacts::{ArtifactName, ArtifactStage, ArtifactStore};
pub use catalog::{Template, TemplateCatalog};
pub use context::PipelineContext;
pub use orchestrator::{
    Abandoned, Completed, Orchestrator, PassSummary, SubmissionOutcome, SubmissionStage,
};
pub use responded::RespondedLog;
