extern crate log;

pub mod config;
pub mod drugs;
pub mod error;
pub mod export;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod pathways;
pub mod report;
pub mod sources;
pub mod stats;
pub mod table;

pub use config::PipelineConfig;
pub use error::{KeyMismatch, SchemaIssue, SourceKind, TractomeError};
pub use merge::{merge, MergeOutcome, PipelineContext};
pub use model::{DrugInteractionRecord, GeneRecord, Overlap, PathwayRecord, TractabilityRecord};
pub use normalize::{normalize, GeneKey};
pub use report::{assemble, MergedReportRow, Report, ReportColumn};
pub use sources::{SourceAvailability, SourceData, SourceStatus};

/// Runs the merge and the report assembly over an already loaded context.
pub fn build_report(ctx: &PipelineContext, config: &PipelineConfig) -> Result<Report, TractomeError> {
    let outcome = merge(ctx, config)?;
    Ok(assemble(outcome, config))
}
