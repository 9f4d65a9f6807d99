//! Rows.
//!
//! [`Row`] is an ordered sequence of named [`Cell`]s plus free-form string
//! tags. Cell names are unique within a row; construction rejects
//! duplicates.

use thiserror::Error;

use crate::cell::Cell;

/// Errors raised when constructing a row.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    /// Two cells in the same row share a name.
    #[error("duplicate cell name '{0}'")]
    DuplicateCell(String),
}

/// An ordered sequence of named cells plus tags.
///
/// Insertion order is preserved; lookups by name are linear, which is the
/// right trade for the handful of cells a typical row carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
    tags: Vec<String>,
}

impl Row {
    /// Creates a row from cells, rejecting duplicate cell names.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::DuplicateCell`] if two cells share a name.
    pub fn new(cells: Vec<Cell>) -> Result<Self, RowError> {
        Self::with_tags(cells, Vec::new())
    }

    /// Creates a row from cells and tags, rejecting duplicate cell names.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::DuplicateCell`] if two cells share a name.
    pub fn with_tags(cells: Vec<Cell>, tags: Vec<String>) -> Result<Self, RowError> {
        for (i, cell) in cells.iter().enumerate() {
            if cells[..i].iter().any(|c| c.name == cell.name) {
                return Err(RowError::DuplicateCell(cell.name.clone()));
            }
        }
        Ok(Self { cells, tags })
    }

    /// Returns an empty row.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            cells: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Looks up a cell by name.
    #[must_use]
    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.name == name)
    }

    /// Returns the cells in insertion order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns the cell names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|c| c.name.as_str())
    }

    /// Returns the tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the serialized width of the row in bytes.
    ///
    /// Sum of cell widths plus tag lengths. This is the size basis for
    /// metering records that never reach wire form.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        let cells: u64 = self.cells.iter().map(Cell::byte_size).sum();
        let tags: u64 = self.tags.iter().map(|t| t.len() as u64).sum();
        cells + tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellValue, DataType};

    fn sample_row() -> Row {
        Row::new(vec![
            Cell::new("id", 42i64),
            Cell::new("name", "alice"),
            Cell::new("active", true),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_cell_rejected() {
        let err = Row::new(vec![Cell::new("a", 1i32), Cell::new("a", 2i32)]).unwrap_err();
        assert_eq!(err, RowError::DuplicateCell("a".into()));
    }

    #[test]
    fn test_cell_lookup() {
        let row = sample_row();
        assert_eq!(row.cell("id").unwrap().value, CellValue::Long(42));
        assert!(row.cell("missing").is_none());
    }

    #[test]
    fn test_order_preserved() {
        let row = sample_row();
        let names: Vec<&str> = row.names().collect();
        assert_eq!(names, ["id", "name", "active"]);
    }

    #[test]
    fn test_byte_size() {
        let row = sample_row();
        // id: 2+8, name: 4+5, active: 6+1
        assert_eq!(row.byte_size(), 10 + 9 + 7);
    }

    #[test]
    fn test_byte_size_includes_tags() {
        let row = Row::with_tags(vec![Cell::new("a", 1i32)], vec!["etl".into()]).unwrap();
        assert_eq!(row.byte_size(), (1 + 4) + 3);
    }

    #[test]
    fn test_value_data_type_survives_lookup() {
        let row = sample_row();
        assert_eq!(row.cell("active").unwrap().value.data_type(), DataType::Boolean);
    }
}
