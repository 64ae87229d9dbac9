use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Column value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Continuous,
    Discrete,
    Text,
}

/// Which part of the domain a column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Attribute,
    ClassVar,
    Meta,
}

/// A column: name, type and free-form string tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            attributes: BTreeMap::new(),
        }
    }

    pub fn continuous(name: impl Into<String>) -> Self {
        Self::new(name, VarKind::Continuous)
    }

    pub fn discrete(name: impl Into<String>) -> Self {
        Self::new(name, VarKind::Discrete)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, VarKind::Text)
    }

    /// Text and discrete columns can hold gene identifiers.
    pub fn holds_labels(&self) -> bool {
        matches!(self.kind, VarKind::Text | VarKind::Discrete)
    }
}

/// Column layout of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub attributes: Vec<Variable>,
    pub class_vars: Vec<Variable>,
    pub metas: Vec<Variable>,
}

impl Domain {
    pub fn with_attributes(attributes: Vec<Variable>) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    pub fn with_metas(metas: Vec<Variable>) -> Self {
        Self {
            metas,
            ..Self::default()
        }
    }

    /// Total number of columns.
    pub fn len(&self) -> usize {
        self.attributes.len() + self.class_vars.len() + self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All columns in storage order with their role.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &Variable)> {
        self.attributes
            .iter()
            .map(|v| (Role::Attribute, v))
            .chain(self.class_vars.iter().map(|v| (Role::ClassVar, v)))
            .chain(self.metas.iter().map(|v| (Role::Meta, v)))
    }

    /// Storage position of the first column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.iter().position(|(_, v)| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.iter().map(|(_, v)| v).find(|v| v.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|(_, v)| v.name.as_str()).collect()
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn meta_names(&self) -> Vec<&str> {
        self.metas.iter().map(|v| v.name.as_str()).collect()
    }

    /// Split a stored row into its attribute, class and meta parts.
    pub(crate) fn split_row<'a, T>(&self, row: &'a [T]) -> (&'a [T], &'a [T], &'a [T]) {
        let (attrs, rest) = row.split_at(self.attributes.len());
        let (class_vars, metas) = rest.split_at(self.class_vars.len());
        (attrs, class_vars, metas)
    }
}
