//! Error types shared by the reconciliation stages.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cleanse,
    Merge,
    Filter,
    Project,
    Match,
    Summary,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Cleanse => "cleanse",
            Stage::Merge => "merge",
            Stage::Filter => "filter",
            Stage::Project => "project",
            Stage::Match => "match",
            Stage::Summary => "summary",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A table lacks the identity key or another field the caller requires
    #[error("{stage}: required field '{field}' not found in '{source_label}'")]
    MissingRequiredField {
        stage: Stage,
        field: String,
        source_label: String,
    },

    /// The suffixed name of a colliding field is itself already taken
    #[error("{stage}: suffixed field '{field}' from '{source_label}' already exists")]
    SuffixCollision {
        stage: Stage,
        field: String,
        source_label: String,
    },

    #[error("{stage}: output field '{field}' already exists")]
    DuplicateField { stage: Stage, field: String },

    #[error("{stage}: threshold {value} is out of range")]
    InvalidThreshold { stage: Stage, value: f64 },

    #[error("Failed to parse filter expression '{0}'")]
    InvalidFilter(String),

    #[error("Identity key list '{0}' names no field")]
    EmptyKey(String),
}

impl ReconcileError {
    pub fn missing_field(stage: Stage, field: &str, source_label: &str) -> Self {
        ReconcileError::MissingRequiredField {
            stage,
            field: field.to_string(),
            source_label: source_label.to_string(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ReconcileError::MissingRequiredField { stage, .. }
            | ReconcileError::SuffixCollision { stage, .. }
            | ReconcileError::DuplicateField { stage, .. }
            | ReconcileError::InvalidThreshold { stage, .. } => *stage,
            ReconcileError::InvalidFilter(_) => Stage::Filter,
            ReconcileError::EmptyKey(_) => Stage::Merge,
        }
    }
}
