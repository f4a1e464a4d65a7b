use std::str::FromStr;

use crate::{
    dataset::Dataset,
    error::{ReconcileError, Result, Stage},
};

/// Keeps records whose `field`, read as a number, is strictly greater than
/// `threshold`. Missing and unparsable values fail the predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdFilter {
    pub field: String,
    pub threshold: f64,
}

impl ThresholdFilter {
    pub fn new(field: impl Into<String>, threshold: f64) -> Result<Self> {
        if !threshold.is_finite() {
            return Err(ReconcileError::InvalidThreshold {
                stage: Stage::Filter,
                value: threshold,
            });
        }
        Ok(Self {
            field: field.into(),
            threshold,
        })
    }

    pub fn apply(&self, data: &Dataset) -> Result<Dataset> {
        let idx = data.schema.require(&self.field, Stage::Filter, "dataset")?;
        Ok(data.retain_where(|record| {
            record
                .get(idx)
                .as_number()
                .is_some_and(|value| value > self.threshold)
        }))
    }
}

impl FromStr for ThresholdFilter {
    type Err = ReconcileError;

    /// Parses `field>threshold`, e.g. `Min>90`.
    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let Some((field, threshold)) = trimmed.split_once('>') else {
            return Err(ReconcileError::InvalidFilter(trimmed.to_string()));
        };
        let field = field.trim();
        let threshold = unquote(threshold.trim());
        if field.is_empty() || threshold.starts_with('=') {
            return Err(ReconcileError::InvalidFilter(trimmed.to_string()));
        }
        let threshold: f64 = threshold
            .parse()
            .map_err(|_| ReconcileError::InvalidFilter(trimmed.to_string()))?;
        ThresholdFilter::new(field, threshold)
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if value.len() >= 2
        && ((bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\''))
    {
        return &value[1..value.len() - 1];
    }
    value
}
