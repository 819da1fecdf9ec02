//! Table model - in-memory CSV table
//!
//! Column-oriented table built from an uploaded CSV. The same type backs the
//! raw upload, the reconciled working table and the final result table.

use std::io::{Read, Write};

use ndarray::Array2;
use serde_json::Value;
use thiserror::Error;

/// Cell spellings treated as missing values in numeric columns
const NA_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No columns to parse from file")]
    NoColumns,

    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("Column '{column}' has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Column '{column}' contains non-numeric values")]
    NonNumeric { column: String },

    #[error("Column '{column}' contains a missing or non-finite value at row {row}")]
    NonFinite { column: String, row: usize },

    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Column storage
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Missing cells are NaN
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    #[cfg(test)]
    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    /// Cell rendered for CSV output. Missing numbers are empty cells.
    fn cell_text(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Numeric(v) if v[row].is_nan() => String::new(),
            ColumnData::Numeric(v) => v[row].to_string(),
            ColumnData::Text(v) => v[row].clone(),
        }
    }

    fn cell_json(&self, row: usize) -> Value {
        match &self.data {
            ColumnData::Numeric(v) => serde_json::Number::from_f64(v[row])
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ColumnData::Text(v) => Value::String(v[row].clone()),
        }
    }
}

/// Ordered set of equally long, uniquely named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Build a table from columns. All columns must have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        let mut table = Self {
            columns: Vec::with_capacity(columns.len()),
            rows,
        };
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Parse a CSV stream. The first record is the header.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
            return Err(TableError::NoColumns);
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            for (column, field) in cells.iter_mut().zip(record.iter()) {
                column.push(field.to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column {
                name,
                data: infer_column(values),
            })
            .collect();

        Self::from_columns(columns)
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        Self::from_csv(bytes)
    }

    /// Write header plus rows as comma-separated UTF-8
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in 0..self.rows {
            writer.write_record(self.columns.iter().map(|c| c.cell_text(row)))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, TableError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Append a column at the end
    pub fn push_column(&mut self, column: Column) -> Result<(), TableError> {
        if self.contains(&column.name) {
            return Err(TableError::DuplicateColumn(column.name));
        }
        let found = column.len();
        if found != self.rows {
            return Err(TableError::LengthMismatch {
                column: column.name,
                expected: self.rows,
                found,
            });
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(index))
    }

    /// Remove every column matching `predicate`, returning the removed ones in table order
    pub fn drop_columns_where<F>(&mut self, mut predicate: F) -> Vec<Column>
    where
        F: FnMut(&Column) -> bool,
    {
        let (dropped, kept): (Vec<Column>, Vec<Column>) = std::mem::take(&mut self.columns)
            .into_iter()
            .partition(|c| predicate(c));
        self.columns = kept;
        dropped
    }

    /// New table holding exactly `names`, in that order
    pub fn select(&self, names: &[String]) -> Result<Table, TableError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| !self.contains(n))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(TableError::MissingColumns(missing));
        }

        let columns = names
            .iter()
            .filter_map(|n| self.column(n).cloned())
            .collect();
        Ok(Table {
            columns,
            rows: self.rows,
        })
    }

    /// Strictly numeric row-major matrix in column order
    pub fn to_matrix(&self) -> Result<Array2<f32>, TableError> {
        let mut numeric = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let values = column.as_numeric().ok_or_else(|| TableError::NonNumeric {
                column: column.name.clone(),
            })?;
            if let Some(row) = values.iter().position(|v| !(*v as f32).is_finite()) {
                return Err(TableError::NonFinite {
                    column: column.name.clone(),
                    row,
                });
            }
            numeric.push(values);
        }

        Ok(Array2::from_shape_fn(
            (self.rows, numeric.len()),
            |(row, col)| numeric[col][row] as f32,
        ))
    }

    /// First `limit` rows as JSON cells
    pub fn preview(&self, limit: usize) -> Vec<Vec<Value>> {
        (0..self.rows.min(limit))
            .map(|row| self.columns.iter().map(|c| c.cell_json(row)).collect())
            .collect()
    }
}

/// Numeric when every non-missing cell parses as a float
fn infer_column(values: Vec<String>) -> ColumnData {
    let mut parsed = Vec::with_capacity(values.len());
    for value in &values {
        let trimmed = value.trim();
        if NA_TOKENS.contains(&trimmed) {
            parsed.push(f64::NAN);
            continue;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => parsed.push(v),
            Err(_) => return ColumnData::Text(values),
        }
    }
    ColumnData::Numeric(parsed)
}
