//! Shared data structures for the completion bounds pipeline
//!
//! - Retrieval: RawWellRow (as returned by a well data source)
//! - Cleaning: WellRecord, WellDataset
//! - Outlier stages: ScoredWell, OutlierFlagSet, ThresholdFit
//! - Output: FeatureBoundsSummary, PipelineOutcome

mod well;
mod bounds;

pub use well::*;
pub use bounds::*;
