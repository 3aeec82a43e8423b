//! Column-oriented result table.
//!
//! Every value flowing between the engine, the cache and the executor is held
//! in a [`ColumnarTable`]: typed headers and one value sequence per column.
//! Columns are either grouping columns (the row's coordinates) or measures.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::{FieldType, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Column '{column}' has {actual} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("{headers} headers for {columns} columns")]
    HeaderCount { headers: usize, columns: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),
}

pub type TableResult<T> = Result<T, TableError>;

/// A typed column header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Header {
    pub name: String,
    pub field_type: FieldType,
    pub is_measure: bool,
}

impl Header {
    pub fn grouping(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_measure: false,
        }
    }

    pub fn measure(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_measure: true,
        }
    }
}

/// Column-oriented table. All columns have the same length and header order
/// matches column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ColumnarTable {
    headers: Vec<Header>,
    columns: Vec<Vec<Value>>,
}

impl ColumnarTable {
    pub fn new(headers: Vec<Header>, columns: Vec<Vec<Value>>) -> TableResult<Self> {
        if headers.len() != columns.len() {
            return Err(TableError::HeaderCount {
                headers: headers.len(),
                columns: columns.len(),
            });
        }
        let expected = columns.first().map_or(0, Vec::len);
        for (header, column) in headers.iter().zip(&columns) {
            if column.len() != expected {
                return Err(TableError::ColumnLength {
                    column: header.name.clone(),
                    expected,
                    actual: column.len(),
                });
            }
        }
        let mut seen = std::collections::HashSet::new();
        for header in &headers {
            if !seen.insert(header.name.as_str()) {
                return Err(TableError::DuplicateColumn(header.name.clone()));
            }
        }
        Ok(Self { headers, columns })
    }

    /// A table with the given headers and no rows.
    pub fn empty(headers: Vec<Header>) -> Self {
        let columns = vec![Vec::new(); headers.len()];
        Self { headers, columns }
    }

    /// Build from row-major values.
    pub fn from_rows(headers: Vec<Header>, rows: Vec<Vec<Value>>) -> TableResult<Self> {
        let mut columns = vec![Vec::with_capacity(rows.len()); headers.len()];
        for row in rows {
            if row.len() != headers.len() {
                return Err(TableError::HeaderCount {
                    headers: headers.len(),
                    columns: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Self::new(headers, columns)
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn columns(&self) -> &[Vec<Value>] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.name == name)
    }

    pub fn column(&self, name: &str) -> TableResult<&[Value]> {
        self.column_index(name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    pub fn column_mut(&mut self, name: &str) -> TableResult<&mut Vec<Value>> {
        match self.column_index(name) {
            Some(i) => Ok(&mut self.columns[i]),
            None => Err(TableError::UnknownColumn(name.to_string())),
        }
    }

    pub fn header(&self, name: &str) -> TableResult<&Header> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    pub fn grouping_indices(&self) -> Vec<usize> {
        (0..self.headers.len())
            .filter(|&i| !self.headers[i].is_measure)
            .collect()
    }

    pub fn measure_indices(&self) -> Vec<usize> {
        (0..self.headers.len())
            .filter(|&i| self.headers[i].is_measure)
            .collect()
    }

    pub fn grouping_headers(&self) -> Vec<&Header> {
        self.headers.iter().filter(|h| !h.is_measure).collect()
    }

    /// Append a column at the end.
    pub fn add_column(&mut self, header: Header, values: Vec<Value>) -> TableResult<()> {
        let index = self.headers.len();
        self.insert_column(index, header, values)
    }

    /// Insert a column before position `index`.
    pub fn insert_column(&mut self, index: usize, header: Header, values: Vec<Value>) -> TableResult<()> {
        if self.column_index(&header.name).is_some() {
            return Err(TableError::DuplicateColumn(header.name));
        }
        if !self.headers.is_empty() && values.len() != self.row_count() {
            return Err(TableError::ColumnLength {
                column: header.name,
                expected: self.row_count(),
                actual: values.len(),
            });
        }
        self.headers.insert(index, header);
        self.columns.insert(index, values);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> TableResult<(Header, Vec<Value>)> {
        let index = self
            .column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;
        Ok((self.headers.remove(index), self.columns.remove(index)))
    }

    /// Values of the grouping columns at `row`.
    pub fn point(&self, row: usize) -> Vec<Value> {
        self.grouping_indices()
            .into_iter()
            .map(|i| self.columns[i][row].clone())
            .collect()
    }

    /// Values of the named columns at `row`.
    pub fn values_at(&self, row: usize, indices: &[usize]) -> Vec<Value> {
        indices.iter().map(|&i| self.columns[i][row].clone()).collect()
    }

    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c[row].clone()).collect()
    }

    /// Index of every row by its grouping point.
    pub fn point_index(&self) -> HashMap<Vec<Value>, usize> {
        (0..self.row_count()).map(|r| (self.point(r), r)).collect()
    }

    /// New table with the rows at `indices`, in that order. Indices may repeat.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| indices.iter().map(|&r| c[r].clone()).collect())
            .collect();
        Self {
            headers: self.headers.clone(),
            columns,
        }
    }

    /// New table with only the named columns, in the given order.
    pub fn project(&self, names: &[String]) -> TableResult<Self> {
        let mut headers = Vec::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let index = self
                .column_index(name)
                .ok_or_else(|| TableError::UnknownColumn(name.clone()))?;
            headers.push(self.headers[index].clone());
            columns.push(self.columns[index].clone());
        }
        Ok(Self { headers, columns })
    }
}

impl fmt::Display for ColumnarTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.name.len()).collect();
        for (i, column) in self.columns.iter().enumerate() {
            for value in column {
                widths[i] = widths[i].max(value.to_string().len());
            }
        }
        let separator: String = widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(w + 2)))
            .collect::<String>()
            + "+";

        writeln!(f, "{}", separator)?;
        for (header, width) in self.headers.iter().zip(&widths) {
            write!(f, "| {:>width$} ", header.name, width = width)?;
        }
        writeln!(f, "|")?;
        writeln!(f, "{}", separator)?;
        for row in 0..self.row_count() {
            for (column, width) in self.columns.iter().zip(&widths) {
                write!(f, "| {:>width$} ", column[row].to_string(), width = width)?;
            }
            writeln!(f, "|")?;
        }
        write!(f, "{}", separator)
    }
}
