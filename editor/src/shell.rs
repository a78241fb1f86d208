//! Presentation shell: which view the editor shows.
//!
//! ```text
//! AwaitingInit --engine ready--> Loading --workbook loaded--> Ready
//!      |
//!      +--engine failed--> Error (terminal)
//! ```
//!
//! Saving is only possible in `Ready`.

use crate::error::EngineInitError;

pub const LOADING_MESSAGE: &str = "Loading spreadsheet...";
pub const INIT_FAILED_MESSAGE: &str = "Failed to initialize spreadsheet engine";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Engine initialization has not completed.
    AwaitingInit,
    /// Engine ready, no workbook loaded yet.
    Loading,
    /// A workbook is loaded and the grid is interactive.
    Ready,
    /// Engine initialization failed. No retry.
    Error(String),
}

#[derive(Debug, Clone)]
pub struct Shell {
    phase: Phase,
}

impl Shell {
    pub fn new() -> Self {
        Self {
            phase: Phase::AwaitingInit,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn engine_ready(&mut self) {
        if self.phase == Phase::AwaitingInit {
            self.phase = Phase::Loading;
        }
    }

    pub fn engine_failed(&mut self, err: &EngineInitError) {
        log::error!("{}", err);
        if !matches!(self.phase, Phase::Error(_)) {
            self.phase = Phase::Error(INIT_FAILED_MESSAGE.to_string());
        }
    }

    pub fn workbook_loaded(&mut self) {
        if self.phase == Phase::Loading {
            self.phase = Phase::Ready;
        }
    }

    /// Text to show instead of the grid, if any.
    pub fn status_text(&self) -> Option<&str> {
        match &self.phase {
            Phase::AwaitingInit | Phase::Loading => Some(LOADING_MESSAGE),
            Phase::Ready => None,
            Phase::Error(msg) => Some(msg),
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}
