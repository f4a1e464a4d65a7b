//! Pipeline configuration persisted as YAML.
//!
//! Every knob the commands expose lives here with its default. A file
//! written by `squad-reconcile config` can be edited and passed back with
//! `--config`; explicit CLI flags still win over the file.

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    cleanse::{CleanseRules, DEFAULT_RANK_COLUMN},
    data::DEFAULT_MISSING_MARKER,
    fuzzy::{DEFAULT_SCORE_FIELD, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_VALUE_FIELD, Scorer},
    merge::IdentityKey,
};

pub const DEFAULT_MINUTES_COLUMN: &str = "Min";
pub const DEFAULT_MERGE_MIN_MINUTES: f64 = 90.0;
pub const DEFAULT_MATCH_MIN_MINUTES: f64 = 900.0;
pub const DEFAULT_CANDIDATE_NAME_COLUMN: &str = "Player";
pub const DEFAULT_CANDIDATE_VALUE_COLUMN: &str = "Value_Scraped";
pub const DEFAULT_SQUAD_COLUMN: &str = "Squad";
pub const DEFAULT_TOP_N: usize = 3;

/// Statistics categories in merge order, paired with their export file stem.
pub const DEFAULT_TABLES: &[(&str, &str)] = &[
    ("Standard", "stats_standard"),
    ("Goalkeeping", "stats_keeper"),
    ("Shooting", "stats_shooting"),
    ("Passing", "stats_passing"),
    ("GnS Creation", "stats_gca"),
    ("Defensive act", "stats_defense"),
    ("Possession", "stats_possession"),
    ("Misc", "stats_misc"),
];

/// Output fields of the merged report, in output order. Suffixed names refer
/// to the labels in [`DEFAULT_TABLES`].
#[rustfmt::skip]
pub const DEFAULT_CANONICAL_COLUMNS: &[&str] = &[
    // identity
    "Player", "Squad", "Nation", "Pos", "Age",
    // playing time
    "MP", "Starts", "Min",
    // performance
    "Gls", "Ast", "CrdY", "CrdR",
    "xG", "xAG",
    "PrgC", "PrgP", "PrgR",
    // per 90
    "Gls.1", "Ast.1", "xG.1", "xAG.1",
    // goalkeeping
    "GA90", "Save%", "CS%", "PKsv",
    // shooting
    "SoT%", "SoT/90", "G/Sh", "Dist",
    // passing
    "Cmp", "Cmp%", "TotDist",
    "Cmp%.1", "Cmp%.2", "Cmp%.3",
    "KP", "1/3", "PPA", "CrsPA", "PrgP_Passing",
    // shot and goal creation
    "SCA", "SCA90", "GCA", "GCA90",
    // defensive actions
    "Tkl", "TklW", "Att_Defensive act", "Lost",
    "Blocks", "Sh_Defensive act", "Pass", "Int",
    // possession
    "Touches", "Def Pen", "Def 3rd_Possession",
    "Mid 3rd_Possession", "Att 3rd_Possession", "Att Pen",
    "Att_Possession", "Succ%", "Tkld%",
    "Carries", "PrgDist_Possession", "PrgC_Possession",
    "1/3_Possession", "CPA", "Mis", "Dis",
    "Rec", "PrgR_Possession",
    // miscellaneous
    "Fls", "Fld_Misc", "Off", "Crs", "Recov",
    "Won", "Lost_Misc", "Won%",
];

/// Fields of the merged report kept ahead of the attached market value.
pub const DEFAULT_MATCH_COLUMNS: &[&str] = &["Player", "Nation", "Pos", "Squad", "Age", "Min"];

pub fn default_canonical_columns() -> Vec<String> {
    DEFAULT_CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub fn default_match_columns() -> Vec<String> {
    DEFAULT_MATCH_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// One input table of the merge, in fold order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSource {
    pub label: String,
    pub path: PathBuf,
    /// Leading rows above the real header (grouped over-headers).
    #[serde(default)]
    pub skip_rows: usize,
}

impl TableSource {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            skip_rows: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub key: Vec<String>,
    pub tables: Vec<TableSource>,
    pub rank_column: String,
    pub positional_cleanse: bool,
    pub minutes_column: String,
    pub merge_min_minutes: f64,
    pub match_min_minutes: f64,
    pub sort_by_first_name: bool,
    pub canonical_columns: Vec<String>,
    /// Columns kept by `match`; an empty list keeps every column.
    pub match_columns: Vec<String>,
    pub candidate_name_column: String,
    pub candidate_value_column: String,
    pub similarity_threshold: f64,
    pub scorer: Scorer,
    pub value_field: String,
    pub score_field: String,
    pub squad_column: String,
    pub top_n: usize,
    pub missing_marker: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            key: IdentityKey::default().fields,
            tables: DEFAULT_TABLES
                .iter()
                .map(|(label, stem)| TableSource::new(*label, format!("{stem}.csv")))
                .collect(),
            rank_column: DEFAULT_RANK_COLUMN.to_string(),
            positional_cleanse: false,
            minutes_column: DEFAULT_MINUTES_COLUMN.to_string(),
            merge_min_minutes: DEFAULT_MERGE_MIN_MINUTES,
            match_min_minutes: DEFAULT_MATCH_MIN_MINUTES,
            sort_by_first_name: true,
            canonical_columns: default_canonical_columns(),
            match_columns: default_match_columns(),
            candidate_name_column: DEFAULT_CANDIDATE_NAME_COLUMN.to_string(),
            candidate_value_column: DEFAULT_CANDIDATE_VALUE_COLUMN.to_string(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            scorer: Scorer::default(),
            value_field: DEFAULT_VALUE_FIELD.to_string(),
            score_field: DEFAULT_SCORE_FIELD.to_string(),
            squad_column: DEFAULT_SQUAD_COLUMN.to_string(),
            top_n: DEFAULT_TOP_N,
            missing_marker: DEFAULT_MISSING_MARKER.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let mut raw = String::new();
        file.read_to_string(&mut raw)?;
        let config: PipelineConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing YAML config {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Falls back to the defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = self.to_yaml()?;
        let mut file =
            File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(self.key.iter().cloned())
    }

    pub fn cleanse_rules(&self) -> CleanseRules {
        CleanseRules {
            rank_column: self.rank_column.clone(),
            positional_collisions: self.positional_cleanse,
            ..CleanseRules::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(anyhow!("Config 'key' must name at least one field"));
        }
        if !(0.0..=100.0).contains(&self.similarity_threshold) {
            return Err(anyhow!(
                "Config 'similarity_threshold' must lie within 0..=100 (got {})",
                self.similarity_threshold
            ));
        }
        if self.value_field == self.score_field {
            return Err(anyhow!(
                "Config 'value_field' and 'score_field' must differ"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_round_trips_through_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        let config = PipelineConfig::default();
        config.save(&path).unwrap();
        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.tables.len(), DEFAULT_TABLES.len());
        assert_eq!(loaded.tables[5].label, "Defensive act");
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "similarity_threshold: 75\nscorer: token-sort-levenshtein\n").unwrap();
        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.similarity_threshold, 75.0);
        assert_eq!(loaded.scorer, Scorer::TokenSortLevenshtein);
        assert_eq!(loaded.minutes_column, "Min");
        assert_eq!(loaded.key, vec!["Player", "Squad"]);
        assert_eq!(
            loaded.match_columns,
            vec!["Player", "Nation", "Pos", "Squad", "Age", "Min"]
        );
    }

    #[test]
    fn match_columns_are_configurable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "match_columns: [Player, Squad]\n").unwrap();
        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.match_columns, vec!["Player", "Squad"]);
        assert_eq!(loaded.canonical_columns, default_canonical_columns());
    }

    #[test]
    fn rejects_out_of_range_similarity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "similarity_threshold: 120\n").unwrap();
        assert!(PipelineConfig::load(&path).is_err());
    }

    #[test]
    fn canonical_list_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        assert!(DEFAULT_CANONICAL_COLUMNS.iter().all(|c| seen.insert(*c)));
    }
}
