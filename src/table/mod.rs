//! In-memory data table: the dataset primitives the matcher core builds on.
//!
//! A `Table` has a `Domain` split into three roles (attributes, class
//! variables, metas), rows of `Value`s stored in that role order, and a map
//! of table-level attributes used to stamp provenance.

pub mod domain;

pub use domain::{Domain, Role, VarKind, Variable};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Row {row} has {found} values, domain has {expected} columns")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Cannot concatenate tables with {left} and {right} rows")]
    LengthMismatch { left: usize, right: usize },
}

// ═══════════════════════════════════════════
// Values
// ═══════════════════════════════════════════

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Missing cells are NaN numbers or absent values. Empty text is not missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(n) => n.is_nan(),
            Self::Text(_) => false,
        }
    }

    /// String form used when a cell is read as an identifier.
    /// Integral numbers print without a fractional part.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Number(n) if n.is_nan() => None,
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

// ═══════════════════════════════════════════
// Table
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    domain: Domain,
    rows: Vec<Vec<Value>>,
    attributes: BTreeMap<String, serde_json::Value>,
}

impl Table {
    /// Build a table, checking every row against the domain width.
    pub fn new(domain: Domain, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let expected = domain.len();
        for (row, values) in rows.iter().enumerate() {
            if values.len() != expected {
                return Err(TableError::RowLength {
                    row,
                    expected,
                    found: values.len(),
                });
            }
        }
        Ok(Self {
            domain,
            rows,
            attributes: BTreeMap::new(),
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Columns may be renamed or retagged through this, never added or
    /// removed: rows must stay as wide as the domain.
    pub(crate) fn domain_mut(&mut self) -> &mut Domain {
        &mut self.domain
    }

    /// Rename the first column called `from`.
    pub fn rename_column(&mut self, from: &str, to: impl Into<String>) -> Result<(), TableError> {
        let var = self
            .domain
            .attributes
            .iter_mut()
            .chain(self.domain.class_vars.iter_mut())
            .chain(self.domain.metas.iter_mut())
            .find(|v| v.name == from)
            .ok_or_else(|| TableError::ColumnNotFound(from.to_string()))?;
        var.name = to.into();
        Ok(())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn attributes(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Values of the first column called `name`, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, TableError> {
        let index = self
            .domain
            .index_of(name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Keep attribute columns for which `keep(position, variable)` holds.
    /// Class variables and metas are kept unchanged.
    pub fn retain_attributes<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(usize, &Variable) -> bool,
    {
        let n_attrs = self.domain.attributes.len();
        let mask: Vec<bool> = self
            .domain
            .attributes
            .iter()
            .enumerate()
            .map(|(i, var)| keep(i, var))
            .collect();

        let attributes = self
            .domain
            .attributes
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(var, _)| var.clone())
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(i, _)| *i >= n_attrs || mask[*i])
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .collect();

        Table {
            domain: Domain {
                attributes,
                class_vars: self.domain.class_vars.clone(),
                metas: self.domain.metas.clone(),
            },
            rows,
            attributes: self.attributes.clone(),
        }
    }

    /// Keep rows for which `keep(row)` holds.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            domain: self.domain.clone(),
            rows: self.rows.iter().filter(|row| keep(row)).cloned().collect(),
            attributes: self.attributes.clone(),
        }
    }

    /// Keep the rows at the given positions, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            domain: self.domain.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
            attributes: self.attributes.clone(),
        }
    }

    /// Append the columns of `other` role by role. Both tables must have the
    /// same number of rows. Table attributes of `self` win.
    pub fn concat_columns(&self, other: &Table) -> Result<Table, TableError> {
        if self.n_rows() != other.n_rows() {
            return Err(TableError::LengthMismatch {
                left: self.n_rows(),
                right: other.n_rows(),
            });
        }

        let mut domain = self.domain.clone();
        domain.attributes.extend(other.domain.attributes.iter().cloned());
        domain.class_vars.extend(other.domain.class_vars.iter().cloned());
        domain.metas.extend(other.domain.metas.iter().cloned());

        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(left, right)| {
                let (la, lc, lm) = self.domain.split_row(left);
                let (ra, rc, rm) = other.domain.split_row(right);
                la.iter()
                    .chain(ra)
                    .chain(lc)
                    .chain(rc)
                    .chain(lm)
                    .chain(rm)
                    .cloned()
                    .collect()
            })
            .collect();

        let mut attributes = other.attributes.clone();
        attributes.extend(self.attributes.clone());

        Ok(Table {
            domain,
            rows,
            attributes,
        })
    }
}
