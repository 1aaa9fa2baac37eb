//! Editing models driven by user interfaces and scripts.

pub mod properties;

pub use properties::{
    CellData, Column, PropertiesModel, PropertyEntry, RowCategory, RowState,
};
