//! In-memory reference engine.
//!
//! Stores raw cell input per sheet, no formula evaluation. Bytes are the
//! model's JSON form; maps are ordered so unmodified content always
//! serializes to identical bytes. Selection is view state and is never
//! serialized, so navigating does not change the bytes.

use std::collections::BTreeMap;
use std::future::{ready, Future};

use serde::{Deserialize, Serialize};

use crate::{Engine, EngineError, Model, WorkbookSpec};

/// Engine producing `GridModel`s. Initialization completes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridEngine;

impl GridEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for GridEngine {
    type Model = GridModel;

    fn init(&self) -> impl Future<Output = Result<(), EngineError>> {
        ready(Ok(()))
    }

    fn new_model(&self, spec: &WorkbookSpec) -> Result<GridModel, EngineError> {
        if spec.name.trim().is_empty() {
            return Err(EngineError::Create("workbook name is empty".into()));
        }
        Ok(GridModel::new(spec))
    }

    fn model_from_bytes(&self, bytes: &[u8]) -> Result<GridModel, EngineError> {
        serde_json::from_slice(bytes).map_err(|e| EngineError::Corrupt(e.to_string()))
    }
}

/// A sheet: row -> col -> raw input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSheet {
    pub name: String,
    #[serde(default)]
    cells: BTreeMap<usize, BTreeMap<usize, String>>,
}

/// Workbook of the reference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridModel {
    name: String,
    locale: String,
    timezone: String,
    sheets: Vec<GridSheet>,
    #[serde(skip)]
    selection: (usize, usize, usize), // (sheet, row, col)
}

impl GridModel {
    pub fn new(spec: &WorkbookSpec) -> Self {
        Self {
            name: spec.name.clone(),
            locale: spec.locale.clone(),
            timezone: spec.timezone.clone(),
            sheets: vec![GridSheet {
                name: "Sheet1".to_string(),
                cells: BTreeMap::new(),
            }],
            selection: (0, 0, 0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn add_sheet(&mut self, name: &str) -> usize {
        self.sheets.push(GridSheet {
            name: name.to_string(),
            cells: BTreeMap::new(),
        });
        self.sheets.len() - 1
    }

    /// Raw input of a cell, if any.
    pub fn cell(&self, sheet: usize, row: usize, col: usize) -> Option<&str> {
        self.sheets
            .get(sheet)?
            .cells
            .get(&row)?
            .get(&col)
            .map(String::as_str)
    }

    /// Set a cell's raw input. An empty value clears the cell.
    pub fn set_cell(&mut self, sheet: usize, row: usize, col: usize, value: &str) {
        if value.is_empty() {
            self.clear_cell(sheet, row, col);
            return;
        }
        if let Some(s) = self.sheets.get_mut(sheet) {
            s.cells.entry(row).or_default().insert(col, value.to_string());
        }
    }

    pub fn clear_cell(&mut self, sheet: usize, row: usize, col: usize) {
        if let Some(s) = self.sheets.get_mut(sheet) {
            if let Some(cols) = s.cells.get_mut(&row) {
                cols.remove(&col);
                if cols.is_empty() {
                    s.cells.remove(&row);
                }
            }
        }
    }

    /// Move the selection. Does not affect the serialized bytes.
    pub fn select(&mut self, sheet: usize, row: usize, col: usize) {
        self.selection = (sheet, row, col);
    }

    pub fn selection(&self) -> (usize, usize, usize) {
        self.selection
    }
}

impl Model for GridModel {
    fn to_bytes(&self) -> Result<Vec<u8>, EngineError> {
        serde_json::to_vec(self).map_err(|e| EngineError::Serialize(e.to_string()))
    }
}
