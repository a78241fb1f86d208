//! Engine lifecycle: one-time initialization and the per-note workbook.
//!
//! The engine is shared behind an `Rc` so its initialization future can run
//! while the session keeps handling host notifications. Execution is single
//! threaded; nothing here is `Send`.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use notegrid_engine::{Engine, EngineError, Model, WorkbookSpec};

use crate::error::{EngineInitError, SerializationError};

/// Identifies which note is loaded. Strictly increasing per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteIdentity(pub u64);

impl fmt::Display for NoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note#{}", self.0)
    }
}

/// The workbook for one loaded note. Replaced wholesale on every load.
pub struct WorkbookHandle<M> {
    identity: NoteIdentity,
    model: M,
    restored: bool,
}

impl<M: Model> WorkbookHandle<M> {
    pub fn identity(&self) -> NoteIdentity {
        self.identity
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Engine-side access for applying user interaction.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// True if the workbook was rebuilt from note content, false if fresh.
    pub fn is_restored(&self) -> bool {
        self.restored
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InitState {
    NotStarted,
    Pending,
    Ready,
    Failed(EngineInitError),
}

pub struct EngineLifecycle<E: Engine> {
    engine: Rc<E>,
    init: InitState,
    spec: WorkbookSpec,
    current: Option<WorkbookHandle<E::Model>>,
}

impl<E: Engine + 'static> EngineLifecycle<E> {
    pub fn new(engine: E, spec: WorkbookSpec) -> Self {
        Self {
            engine: Rc::new(engine),
            init: InitState::NotStarted,
            spec,
            current: None,
        }
    }

    /// Start initialization. Returns `None` if it was already started, so the
    /// engine's `init` runs at most once per lifecycle.
    pub fn begin_init(&mut self) -> Option<impl Future<Output = Result<(), EngineError>> + 'static> {
        if self.init != InitState::NotStarted {
            return None;
        }
        self.init = InitState::Pending;
        let engine = Rc::clone(&self.engine);
        Some(async move { engine.init().await })
    }

    /// Record the result of the future returned by `begin_init`.
    pub fn finish_init(&mut self, result: Result<(), EngineError>) -> Result<(), EngineInitError> {
        // The first result sticks
        match &self.init {
            InitState::Ready => return Ok(()),
            InitState::Failed(err) => return Err(err.clone()),
            InitState::NotStarted | InitState::Pending => {}
        }
        match result {
            Ok(()) => {
                self.init = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                let err = EngineInitError::from(e);
                self.init = InitState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Initialize the engine once. Later calls return the remembered result;
    /// a failure is never retried.
    pub async fn initialize_once(&mut self) -> Result<(), EngineInitError> {
        if let Some(init) = self.begin_init() {
            let result = init.await;
            return self.finish_init(result);
        }
        match &self.init {
            InitState::Ready => Ok(()),
            InitState::Failed(err) => Err(err.clone()),
            InitState::NotStarted | InitState::Pending => {
                Err(EngineInitError::new("initialization already in progress"))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.init == InitState::Ready
    }

    pub fn init_error(&self) -> Option<&EngineInitError> {
        match &self.init {
            InitState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Replace the current workbook with the one stored in `content`.
    ///
    /// Absent or undecodable content, and bytes the engine rejects, yield a
    /// fresh workbook. Fails only if the engine cannot create a fresh
    /// workbook either; the previous workbook is dropped regardless so it can
    /// never be saved under the new identity.
    pub fn load_workbook(
        &mut self,
        identity: NoteIdentity,
        content: Option<&str>,
    ) -> Result<&mut WorkbookHandle<E::Model>, EngineError> {
        self.current = None;

        let restored = content.and_then(|text| match notegrid_protocol::try_decode(text) {
            Ok(bytes) => match self.engine.model_from_bytes(&bytes) {
                Ok(model) => Some(model),
                Err(e) => {
                    log::warn!("{}: {}; starting from an empty workbook", identity, e);
                    None
                }
            },
            Err(e) => {
                log::debug!("{}: {}; starting from an empty workbook", identity, e);
                None
            }
        });

        let handle = match restored {
            Some(model) => WorkbookHandle {
                identity,
                model,
                restored: true,
            },
            None => WorkbookHandle {
                identity,
                model: self.engine.new_model(&self.spec)?,
                restored: false,
            },
        };

        Ok(self.current.insert(handle))
    }

    pub fn workbook(&self) -> Option<&WorkbookHandle<E::Model>> {
        self.current.as_ref()
    }

    pub fn workbook_mut(&mut self) -> Option<&mut WorkbookHandle<E::Model>> {
        self.current.as_mut()
    }

    /// Serialize the current workbook.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializationError> {
        let handle = self.current.as_ref().ok_or(SerializationError::NoWorkbook)?;
        handle.model.to_bytes().map_err(SerializationError::Engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notegrid_engine::{GridEngine, GridModel};
    use std::cell::Cell;
    use std::future::ready;

    fn lifecycle() -> EngineLifecycle<GridEngine> {
        EngineLifecycle::new(GridEngine::new(), WorkbookSpec::default())
    }

    /// Engine counting init calls, optionally failing them.
    struct CountingEngine {
        calls: Rc<Cell<u32>>,
        fail: bool,
    }

    impl Engine for CountingEngine {
        type Model = GridModel;

        fn init(&self) -> impl Future<Output = Result<(), EngineError>> {
            self.calls.set(self.calls.get() + 1);
            ready(if self.fail {
                Err(EngineError::Init("boom".into()))
            } else {
                Ok(())
            })
        }

        fn new_model(&self, spec: &WorkbookSpec) -> Result<GridModel, EngineError> {
            GridEngine.new_model(spec)
        }

        fn model_from_bytes(&self, bytes: &[u8]) -> Result<GridModel, EngineError> {
            GridEngine.model_from_bytes(bytes)
        }
    }

    #[test]
    fn test_init_runs_once() {
        let calls = Rc::new(Cell::new(0));
        let mut lc = EngineLifecycle::new(
            CountingEngine {
                calls: Rc::clone(&calls),
                fail: false,
            },
            WorkbookSpec::default(),
        );
        smol::block_on(async {
            assert!(lc.initialize_once().await.is_ok());
            assert!(lc.initialize_once().await.is_ok());
        });
        assert_eq!(calls.get(), 1);
        assert!(lc.is_ready());
    }

    #[test]
    fn test_init_failure_not_retried() {
        let calls = Rc::new(Cell::new(0));
        let mut lc = EngineLifecycle::new(
            CountingEngine {
                calls: Rc::clone(&calls),
                fail: true,
            },
            WorkbookSpec::default(),
        );
        smol::block_on(async {
            let first = lc.initialize_once().await.unwrap_err();
            let second = lc.initialize_once().await.unwrap_err();
            assert_eq!(first, second);
        });
        assert_eq!(calls.get(), 1);
        assert!(!lc.is_ready());
        assert_eq!(lc.init_error().map(|e| e.message()), Some("boom"));
    }

    #[test]
    fn test_first_init_result_sticks() {
        let mut lc = lifecycle();
        assert!(lc.finish_init(Err(EngineError::Init("boom".into()))).is_err());
        assert!(lc.finish_init(Ok(())).is_err());
        assert!(!lc.is_ready());
    }

    #[test]
    fn test_begin_init_only_once() {
        let mut lc = lifecycle();
        assert!(lc.begin_init().is_some());
        assert!(lc.begin_init().is_none());
    }

    #[test]
    fn test_absent_content_is_fresh_default_workbook() {
        let mut lc = lifecycle();
        let handle = lc.load_workbook(NoteIdentity(1), None).unwrap();
        assert!(!handle.is_restored());
        assert_eq!(handle.model().name(), "Spreadsheet");
        assert_eq!(handle.model().locale(), "en");
        assert_eq!(handle.model().timezone(), "UTC");
    }

    #[test]
    fn test_malformed_content_is_fresh_workbook() {
        let mut lc = lifecycle();
        for raw in ["", "not json", r#"{"foo":1}"#] {
            let handle = lc.load_workbook(NoteIdentity(1), Some(raw)).unwrap();
            assert!(!handle.is_restored(), "{raw:?}");
        }
    }

    #[test]
    fn test_engine_rejected_bytes_is_fresh_workbook() {
        let mut lc = lifecycle();
        let text = notegrid_protocol::encode(b"\x00not a grid");
        let handle = lc.load_workbook(NoteIdentity(1), Some(&text)).unwrap();
        assert!(!handle.is_restored());
    }

    #[test]
    fn test_restores_saved_workbook() {
        let mut lc = lifecycle();
        let handle = lc.load_workbook(NoteIdentity(1), None).unwrap();
        handle.model_mut().set_cell(0, 0, 0, "42");
        let text = notegrid_protocol::encode(&lc.serialize().unwrap());

        let handle = lc.load_workbook(NoteIdentity(2), Some(&text)).unwrap();
        assert!(handle.is_restored());
        assert_eq!(handle.identity(), NoteIdentity(2));
        assert_eq!(handle.model().cell(0, 0, 0), Some("42"));
    }

    #[test]
    fn test_failed_load_drops_previous_workbook() {
        let spec = WorkbookSpec {
            name: String::new(),
            ..Default::default()
        };
        let mut lc = EngineLifecycle::new(GridEngine::new(), spec);
        assert!(lc.load_workbook(NoteIdentity(1), None).is_err());
        assert!(lc.workbook().is_none());
        assert_eq!(lc.serialize(), Err(SerializationError::NoWorkbook));
    }
}
