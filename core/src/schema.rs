//! Schema reconciliation across episode-log versions.
//!
//! Log columns have been renamed and added over time. The optional-field
//! registry below is the single place that knows about that history; it is
//! applied to every episode before any derived value is computed.

use crate::{
    error::{PolicyError, PolicyResult},
    table::{Column, Table},
};

/// A column that older logs may lack or name differently.
#[derive(Debug, Clone, Copy)]
pub struct OptionalField {
    pub canonical:      &'static str,
    pub legacy_aliases: &'static [&'static str],
    pub default:        f64,
}

/// Optional-field registry. Weather columns default to 0.0.
pub const OPTIONAL_FIELDS: &[OptionalField] = &[
    OptionalField { canonical: "rain_mm", legacy_aliases: &["rain_today_mm"],  default: 0.0 },
    OptionalField { canonical: "loss_mm", legacy_aliases: &["actual_loss_mm"], default: 0.0 },
];

/// Rename legacy columns to their canonical names.
/// Returns the `(legacy, canonical)` pairs that were renamed.
pub fn apply_legacy_renames(table: &mut Table) -> Vec<(&'static str, &'static str)> {
    let mut renamed = Vec::new();
    for field in OPTIONAL_FIELDS {
        if table.has_column(field.canonical) {
            continue;
        }
        if let Some(alias) = field.legacy_aliases.iter().find(|a| table.has_column(a)) {
            table.rename_column(alias, field.canonical);
            renamed.push((*alias, field.canonical));
        }
    }
    renamed
}

/// Bring one raw episode table to the canonical schema.
///
/// Order: legacy renames, optional defaults, required-column check,
/// numeric coercion. Columns that cannot be coerced stay as text; the
/// failure surfaces later when the column is used as a number.
pub fn reconcile(mut table: Table, required: &[String], file: &str) -> PolicyResult<Table> {
    for (legacy, canonical) in apply_legacy_renames(&mut table) {
        log::warn!("{file}: renamed legacy column '{legacy}' -> '{canonical}'");
    }

    let n_rows = table.n_rows();
    for field in OPTIONAL_FIELDS {
        if !table.has_column(field.canonical) {
            log::debug!("{file}: filling '{}' with {}", field.canonical, field.default);
            table.set_column(field.canonical, Column::Numeric(vec![field.default; n_rows]))?;
        }
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|c| !table.has_column(c))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(PolicyError::Schema {
            file: file.to_string(),
            missing,
        });
    }

    for name in table.coerce_numeric() {
        log::warn!("{file}: column '{name}' is not numeric; left as text");
    }
    Ok(table)
}
