//! In-memory tabular data: ordered, named, typed columns.
//!
//! Numeric columns use NaN for a missing cell.
//! Text columns hold cells that could not be read as numbers;
//! an empty string is a missing cell.

use crate::{
    error::{PolicyError, PolicyResult},
    matrix::Matrix,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v)    => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric(v) => Some(v),
            Self::Text(_)    => None,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Numeric(v) => v[row].is_nan(),
            Self::Text(v)    => v[row].trim().is_empty(),
        }
    }

    /// Cell rendered as text, as written to CSV.
    pub fn cell_text(&self, row: usize) -> String {
        match self {
            Self::Numeric(v) if v[row].is_nan() => String::new(),
            Self::Numeric(v) => format!("{}", v[row]),
            Self::Text(v)    => v[row].clone(),
        }
    }

    /// Try to read every non-empty cell as a number.
    /// Returns None if any cell fails.
    fn coerced(&self) -> Option<Column> {
        match self {
            Self::Numeric(_) => None,
            Self::Text(cells) => cells
                .iter()
                .map(|c| {
                    let c = c.trim();
                    if c.is_empty() { Some(f64::NAN) } else { c.parse::<f64>().ok() }
                })
                .collect::<Option<Vec<_>>>()
                .map(Column::Numeric),
        }
    }

    fn filtered(&self, keep: &[bool]) -> Column {
        match self {
            Self::Numeric(v) => Self::Numeric(
                v.iter().zip(keep).filter(|(_, k)| **k).map(|(x, _)| *x).collect(),
            ),
            Self::Text(v) => Self::Text(
                v.iter().zip(keep).filter(|(_, k)| **k).map(|(x, _)| x.clone()).collect(),
            ),
        }
    }

    /// All-missing filler; renders as empty cells if joined into text.
    fn missing(len: usize) -> Column {
        Self::Numeric(vec![f64::NAN; len])
    }

    /// Numeric if every piece is numeric, otherwise text.
    fn join(pieces: Vec<Column>) -> Column {
        if pieces.iter().all(|p| p.as_numeric().is_some()) {
            Column::Numeric(pieces.iter().filter_map(Column::as_numeric).flatten().copied().collect())
        } else {
            Column::Text(pieces.into_iter().flat_map(Column::into_text).collect())
        }
    }

    fn into_text(self) -> Vec<String> {
        match self {
            Self::Text(v) => v,
            Self::Numeric(_) => (0..self.len()).map(|i| self.cell_text(i)).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names:   Vec<String>,
    columns: Vec<Column>,
    n_rows:  usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_rows(&self) -> usize { self.n_rows }
    pub fn n_cols(&self) -> usize { self.names.len() }
    pub fn names(&self) -> &[String] { &self.names }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    /// A numeric column by name. Absent or text columns are a data error.
    pub fn numeric(&self, name: &str) -> PolicyResult<&[f64]> {
        match self.column(name) {
            Some(Column::Numeric(v)) => Ok(v),
            Some(Column::Text(_)) => Err(PolicyError::Data(format!(
                "column '{name}' is not numeric"
            ))),
            None => Err(PolicyError::Data(format!("column '{name}' not found"))),
        }
    }

    /// Append a column, or replace an existing column of the same name in place.
    pub fn set_column(&mut self, name: &str, column: Column) -> PolicyResult<()> {
        if !self.names.is_empty() && column.len() != self.n_rows {
            return Err(PolicyError::Shape {
                context:  "table column",
                expected: self.n_rows,
                actual:   column.len(),
            });
        }
        if self.names.is_empty() {
            self.n_rows = column.len();
        }
        match self.position(name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name.to_string());
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Rename a column. Returns false if `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.position(from) {
            Some(i) => {
                self.names[i] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Coerce text columns to numeric where every cell parses.
    /// Returns the names of columns left as text.
    pub fn coerce_numeric(&mut self) -> Vec<String> {
        let mut left_as_text = Vec::new();
        for (name, column) in self.names.iter().zip(self.columns.iter_mut()) {
            if let Column::Text(_) = column {
                match column.coerced() {
                    Some(numeric) => *column = numeric,
                    None => left_as_text.push(name.clone()),
                }
            }
        }
        left_as_text
    }

    /// Keep rows whose mask entry is true.
    pub fn filter_rows(&self, keep: &[bool]) -> Table {
        Table {
            names:   self.names.clone(),
            columns: self.columns.iter().map(|c| c.filtered(keep)).collect(),
            n_rows:  keep.iter().filter(|k| **k).count(),
        }
    }

    /// Drop every row with a missing cell in any of `columns`.
    pub fn drop_missing(&self, columns: &[String]) -> PolicyResult<Table> {
        let mut keep = vec![true; self.n_rows];
        for name in columns {
            let column = self
                .column(name)
                .ok_or_else(|| PolicyError::Data(format!("column '{name}' not found")))?;
            for (row, k) in keep.iter_mut().enumerate() {
                if *k && column.is_missing(row) {
                    *k = false;
                }
            }
        }
        Ok(self.filter_rows(&keep))
    }

    /// Copy the named numeric columns, in order, into a matrix.
    pub fn to_matrix(&self, columns: &[String]) -> PolicyResult<Matrix> {
        let sources = columns
            .iter()
            .map(|c| self.numeric(c))
            .collect::<PolicyResult<Vec<_>>>()?;
        let mut data = Vec::with_capacity(self.n_rows * columns.len());
        for row in 0..self.n_rows {
            data.extend(sources.iter().map(|col| col[row]));
        }
        Matrix::new(self.n_rows, columns.len(), data)
    }

    pub fn row_text(&self, row: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.cell_text(row)).collect()
    }

    /// Row-wise concatenation. Columns are the union in first-seen order;
    /// cells absent from a part are missing. A column that is text in any
    /// part becomes text.
    pub fn concat(mut parts: Vec<Table>) -> Table {
        let mut names: Vec<String> = Vec::new();
        for part in &parts {
            for name in &part.names {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }

        let n_rows = parts.iter().map(|p| p.n_rows).sum();
        let columns = names
            .iter()
            .map(|name| {
                let pieces: Vec<Column> = parts
                    .iter_mut()
                    .map(|part| match part.position(name) {
                        Some(j) => std::mem::replace(&mut part.columns[j], Column::Text(Vec::new())),
                        None => Column::missing(part.n_rows),
                    })
                    .collect();
                Column::join(pieces)
            })
            .collect();

        Table { names, columns, n_rows }
    }
}
