//! Training dataset assembly from episode log files.
//!
//! Per file: load, reconcile schema, derive stage features, tag provenance.
//! Then concatenate in file order and drop rows with missing values in any
//! required column.

use crate::{
    config::PipelineConfig,
    csv::read_csv,
    error::{PolicyError, PolicyResult},
    matrix::Matrix,
    normalizer::normalize_episode,
    schema::reconcile,
    table::{Column, Table},
};
use std::path::{Path, PathBuf};

/// Columns computed by the normalizer rather than read from logs.
pub const DERIVED_COLUMNS: &[&str] = &["norm_day", "is_drain_stage", "is_flood_stage"];

/// Provenance column: the source file stem of each row.
/// Reserved; a log that already carries it is rejected.
pub const EPISODE_COLUMN: &str = "__ep__";

#[derive(Debug, Clone)]
pub struct Dataset {
    pub x:             Matrix,
    pub y:             Matrix,
    pub feature_names: Vec<String>,
    pub action_names:  Vec<String>,
    /// Source file stem per row, aligned with `x` and `y`.
    pub episodes:      Vec<String>,
    pub n_files:       usize,
}

impl Dataset {
    pub fn n_rows(&self) -> usize { self.x.rows() }
}

// ── File discovery ─────────────────────────────────────────────────

/// `*` matches any run of characters, `?` exactly one.
fn wildcard_match(pattern: &[char], name: &[char]) -> bool {
    match (pattern.first(), name.first()) {
        (None, None) => true,
        (Some('*'), _) => {
            wildcard_match(&pattern[1..], name)
                || (!name.is_empty() && wildcard_match(pattern, &name[1..]))
        }
        (Some('?'), Some(_)) => wildcard_match(&pattern[1..], &name[1..]),
        (Some(p), Some(n)) if p == n => wildcard_match(&pattern[1..], &name[1..]),
        _ => false,
    }
}

/// Expand a `dir/name-pattern` glob (wildcards in the file name only),
/// sorted lexicographically. No match is a data error.
pub fn list_episode_files(pattern: &str) -> PolicyResult<Vec<PathBuf>> {
    let path = Path::new(pattern);
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_pattern: Vec<char> = path
        .file_name()
        .map(|f| f.to_string_lossy().chars().collect())
        .unwrap_or_default();

    let mut files = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name: Vec<char> = entry.file_name().to_string_lossy().chars().collect();
            if entry.path().is_file() && wildcard_match(&file_pattern, &name) {
                files.push(entry.path());
            }
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(PolicyError::Data(format!("No CSVs found for pattern: {pattern}")));
    }
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ── Assembly ───────────────────────────────────────────────────────

/// Load one episode file and bring it to the training schema.
pub fn load_episode(path: &Path, config: &PipelineConfig) -> PolicyResult<Table> {
    let raw = read_csv(path)?;
    prepare_episode(raw, &file_stem(path), config)
}

/// Reconcile and derive features for an already-parsed episode table.
pub fn prepare_episode(raw: Table, stem: &str, config: &PipelineConfig) -> PolicyResult<Table> {
    // Derived columns are not expected in the log; stage always is.
    let mut required: Vec<String> = vec!["stage".to_string()];
    required.extend(
        config
            .required_columns()
            .into_iter()
            .filter(|c| !DERIVED_COLUMNS.contains(&c.as_str()) && c != "stage"),
    );

    if raw.has_column(EPISODE_COLUMN) {
        return Err(PolicyError::Data(format!(
            "{stem}: column '{EPISODE_COLUMN}' is reserved for provenance"
        )));
    }
    let mut table = reconcile(raw, &required, stem)?;
    normalize_episode(&mut table, &config.stages)?;

    if let Some(ratios) = table.column("pool_ratio").and_then(Column::as_numeric) {
        let clipped = ratios.iter().map(|r| r.clamp(0.0, 1.0)).collect();
        table.set_column("pool_ratio", Column::Numeric(clipped))?;
    }

    let n_rows = table.n_rows();
    table.set_column(EPISODE_COLUMN, Column::Text(vec![stem.to_string(); n_rows]))?;
    Ok(table)
}

/// Assemble X (features) and Y (actions) from episode files, row-synchronized.
pub fn assemble(files: &[PathBuf], config: &PipelineConfig) -> PolicyResult<Dataset> {
    if files.is_empty() {
        return Err(PolicyError::Data("no episode files given".into()));
    }
    let episodes = files
        .iter()
        .map(|f| load_episode(f, config))
        .collect::<PolicyResult<Vec<_>>>()?;
    assemble_tables(episodes, files.len(), config)
}

/// Concatenate prepared episode tables and split into X and Y.
pub fn assemble_tables(
    episodes: Vec<Table>,
    n_files: usize,
    config: &PipelineConfig,
) -> PolicyResult<Dataset> {
    let full = Table::concat(episodes);
    let before = full.n_rows();
    let full = full.drop_missing(&config.required_columns())?;
    if full.n_rows() == 0 {
        return Err(PolicyError::Data(format!(
            "all {before} rows dropped by missing-value filter"
        )));
    }
    if full.n_rows() < before {
        log::info!("dropped {} rows with missing values", before - full.n_rows());
    }

    let episodes = match full.column(EPISODE_COLUMN) {
        Some(Column::Text(v)) => v.clone(),
        _ => vec![String::new(); full.n_rows()],
    };

    Ok(Dataset {
        x:             full.to_matrix(&config.features)?,
        y:             full.to_matrix(&config.actions)?,
        feature_names: config.features.clone(),
        action_names:  config.actions.clone(),
        episodes,
        n_files,
    })
}
