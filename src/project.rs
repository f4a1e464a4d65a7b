use log::debug;

use crate::dataset::{Dataset, MergedDataset};

/// Restricts `data` to the columns of `canonical` it actually has, in
/// canonical order. Names the dataset lacks are skipped.
pub fn project(data: &Dataset, canonical: &[String]) -> Dataset {
    let indices = data.schema.project_indices(canonical);
    let skipped = canonical.len().saturating_sub(indices.len());
    if skipped > 0 {
        debug!(
            "Projection kept {} of {} canonical column(s)",
            indices.len(),
            canonical.len()
        );
    }
    Dataset::new(
        data.schema.select(&indices),
        data.records.iter().map(|r| r.select(&indices)).collect(),
    )
}

pub fn project_merged(merged: &MergedDataset, canonical: &[String]) -> MergedDataset {
    merged.narrowed(project(merged.data(), canonical))
}
