//! # Rowlink Core
//!
//! The row data model shared by every connector-facing Rowlink crate.
//!
//! A [`Row`] is an ordered sequence of named, typed [`Cell`]s plus free-form
//! string tags. [`Column`] describes one schema entry a connector declares
//! for its rows. These types are pure data: serde-serializable, no async,
//! no I/O.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cell;
pub mod column;
pub mod row;

pub use cell::{Cell, CellValue, DataType};
pub use column::Column;
pub use row::{Row, RowError};
