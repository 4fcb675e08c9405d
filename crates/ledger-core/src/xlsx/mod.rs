// ledger-core/src/xlsx/mod.rs
//! OOXML 工作簿的最小改动式写入

pub mod cell_ref;
pub mod package;
pub mod rels;
pub mod sheet;

pub use package::{Package, PartChanges, SheetPart};
