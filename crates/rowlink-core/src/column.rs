//! Column schema entries.

use serde::{Deserialize, Serialize};

use crate::cell::DataType;

/// One entry of a connector's declared column schema.
///
/// `name` is the column name on the external-system side; `new_name` is the
/// name the cell carries once the row is in wire form. When a schema is
/// declared without an explicit `new_name`, it defaults to `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name in the external system.
    pub name: String,
    /// Cell name in the wire-form row. Defaults to `name` when omitted.
    #[serde(default)]
    pub new_name: Option<String>,
    /// Declared cell type.
    pub data_type: DataType,
    /// Position of the column within the schema.
    pub order: u32,
}

impl Column {
    /// Creates a column whose wire name equals its source name.
    pub fn new(name: impl Into<String>, data_type: DataType, order: u32) -> Self {
        Self {
            name: name.into(),
            new_name: None,
            data_type,
            order,
        }
    }

    /// Sets an explicit wire-form name.
    #[must_use]
    pub fn with_new_name(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }

    /// Returns the wire-form cell name (`new_name`, falling back to `name`).
    #[must_use]
    pub fn output_name(&self) -> &str {
        self.new_name.as_deref().unwrap_or(&self.name)
    }
}
