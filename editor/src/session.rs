//! Editor session: one state machine owning every piece of editor state.
//!
//! All inputs go through `dispatch` (host notifications, engine-side edits,
//! triggers) or `tick` (timers). Nothing is global; a session is created when
//! the host starts the editor and dropped when it goes away.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use notegrid_config::{SavePolicy, Settings};
use notegrid_engine::{Engine, EngineError, WorkbookSpec};
use notegrid_protocol::HostOptions;

use crate::bridge::{BridgeConfig, HostApi, HostBridge, HostNotification, PendingNote};
use crate::coalesce::{fingerprint, Coalescer, CoalescerConfig, SaveOutcome, SaveTiming, TriggerAction};
use crate::error::EngineInitError;
use crate::lifecycle::{EngineLifecycle, NoteIdentity, WorkbookHandle};
use crate::shell::{Phase, Shell};
use crate::triggers::{LifecycleEvent, Trigger, TriggerScopes};

/// Engine-side mutation of the loaded workbook.
pub type EditFn<M> = Box<dyn FnOnce(&mut M)>;

/// Input to an editor session.
pub enum EditorEvent<M> {
    /// The host's update stream delivered a notification.
    Host(HostNotification),
    /// The engine applied user input to the workbook.
    Edit(EditFn<M>),
    /// A save trigger fired.
    Trigger(Trigger),
    /// The engine's initialization future completed.
    EngineInit(Result<(), EngineError>),
}

impl<M> fmt::Debug for EditorEvent<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(n) => f.debug_tuple("Host").field(n).finish(),
            Self::Edit(_) => f.write_str("Edit(..)"),
            Self::Trigger(t) => f.debug_tuple("Trigger").field(t).finish(),
            Self::EngineInit(r) => f.debug_tuple("EngineInit").field(r).finish(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditorConfig {
    pub coalescer: CoalescerConfig,
    pub bridge: BridgeConfig,
    pub workbook: WorkbookSpec,
}

impl EditorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let timing = match settings.save_policy {
            SavePolicy::NextTurn => SaveTiming::NextTurn,
            SavePolicy::Debounce => {
                SaveTiming::Debounce(Duration::from_millis(settings.save_debounce_ms))
            }
        };

        Self {
            coalescer: CoalescerConfig {
                timing,
                save_gate: Duration::from_millis(settings.save_gate_ms),
                autosave: settings.auto_save_interval(),
                scopes: TriggerScopes {
                    container: settings.container_triggers,
                    document: settings.document_triggers,
                },
            },
            bridge: BridgeConfig {
                host_options: HostOptions {
                    debounce_save: settings.host_debounce_save_ms,
                },
                preview: settings.preview.clone(),
                wait_for_content: settings.wait_for_content,
            },
            workbook: WorkbookSpec {
                name: settings.workbook_name.clone(),
                locale: settings.workbook_locale.clone(),
                timezone: settings.workbook_timezone.clone(),
            },
        }
    }
}

pub struct EditorSession<E: Engine, H> {
    lifecycle: EngineLifecycle<E>,
    coalescer: Coalescer,
    bridge: HostBridge<H>,
    shell: Shell,
    torn_down: bool,
    load_count: u64,
}

impl<E: Engine + 'static, H: HostApi> EditorSession<E, H> {
    /// Create a session and initialize the host.
    pub fn new(engine: E, host: H, config: EditorConfig) -> Self {
        let mut bridge = HostBridge::new(host, config.bridge);
        bridge.connect();

        Self {
            lifecycle: EngineLifecycle::new(engine, config.workbook),
            coalescer: Coalescer::new(config.coalescer),
            bridge,
            shell: Shell::new(),
            torn_down: false,
            load_count: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Engine initialization
    // ------------------------------------------------------------------------

    /// Start engine initialization; feed the result to `on_engine_init`.
    /// `None` if initialization was already started.
    pub fn begin_init(&mut self) -> Option<impl Future<Output = Result<(), EngineError>> + 'static> {
        self.lifecycle.begin_init()
    }

    pub fn on_engine_init(&mut self, result: Result<(), EngineError>, now: Instant) {
        match self.lifecycle.finish_init(result) {
            Ok(()) => {
                log::info!("Spreadsheet engine ready");
                self.shell.engine_ready();
                self.apply_pending(now);
            }
            Err(e) => self.shell.engine_failed(&e),
        }
    }

    /// Initialize the engine in place. For callers that do not need to handle
    /// host notifications while initialization is in flight.
    pub async fn initialize(&mut self) -> Result<(), EngineInitError> {
        if let Some(init) = self.begin_init() {
            let result = init.await;
            self.on_engine_init(result, Instant::now());
        }
        match self.lifecycle.init_error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Handle one input. Returns the outcome when a save was attempted.
    pub fn dispatch(&mut self, event: EditorEvent<E::Model>, now: Instant) -> Option<SaveOutcome> {
        if self.torn_down {
            log::debug!("Dropping {:?} after teardown", event);
            return None;
        }

        match event {
            EditorEvent::Host(notification) => {
                self.bridge.receive(notification);
                self.apply_pending(now);
                None
            }
            EditorEvent::Edit(apply) => {
                if let Some(handle) = self.lifecycle.workbook_mut() {
                    apply(handle.model_mut());
                }
                None
            }
            EditorEvent::Trigger(trigger) => self.on_trigger(trigger, now),
            EditorEvent::EngineInit(result) => {
                self.on_engine_init(result, now);
                None
            }
        }
    }

    fn on_trigger(&mut self, trigger: Trigger, now: Instant) -> Option<SaveOutcome> {
        if !self.shell.is_ready() {
            if trigger == Trigger::Lifecycle(LifecycleEvent::Unload) {
                self.teardown();
            }
            return None;
        }

        match self.coalescer.on_trigger(trigger, now) {
            TriggerAction::Ignored | TriggerAction::Scheduled => None,
            TriggerAction::Flush => Some(self.save(now)),
            TriggerAction::FlushAndTeardown => {
                let outcome = self.save(now);
                self.teardown();
                Some(outcome)
            }
        }
    }

    /// Fire due timers. Returns the outcome when a save was attempted.
    pub fn tick(&mut self, now: Instant) -> Option<SaveOutcome> {
        if self.torn_down || !self.coalescer.poll_timers(now) {
            return None;
        }
        Some(self.save(now))
    }

    /// Earliest instant `tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.torn_down {
            return None;
        }
        self.coalescer.next_deadline()
    }

    /// Save the loaded workbook if it changed.
    pub fn save(&mut self, now: Instant) -> SaveOutcome {
        if self.torn_down || !self.shell.is_ready() {
            return SaveOutcome::GateClosed;
        }
        let lifecycle = &self.lifecycle;
        let bridge = &mut self.bridge;
        self.coalescer
            .save(now, || lifecycle.serialize(), |envelope| bridge.publish(envelope))
    }

    /// Cancel every timer and stop accepting input.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.coalescer.close();
        self.torn_down = true;
        log::info!("Editor session torn down");
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    fn apply_pending(&mut self, now: Instant) {
        if !self.lifecycle.is_ready() {
            return;
        }
        if let Some(note) = self.bridge.take_load() {
            self.load(note, now);
        }
    }

    fn load(&mut self, note: PendingNote, now: Instant) {
        // Nothing armed for the previous note may fire after this point
        self.coalescer.close();

        let restored = match self
            .lifecycle
            .load_workbook(note.identity, note.content.as_deref())
        {
            Ok(handle) => handle.is_restored(),
            Err(e) => {
                log::error!("{}: cannot create workbook: {}", note.identity, e);
                return;
            }
        };

        let loaded_fingerprint = match self.lifecycle.serialize() {
            Ok(bytes) => Some(fingerprint(&bytes)),
            Err(e) => {
                log::warn!("{}: cannot fingerprint loaded workbook: {}", note.identity, e);
                None
            }
        };

        self.coalescer.reset_for_load(now, loaded_fingerprint);
        self.shell.workbook_loaded();
        self.load_count += 1;
        log::info!(
            "Loaded {} ({})",
            note.identity,
            if restored { "restored" } else { "new workbook" }
        );
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn phase(&self) -> &Phase {
        self.shell.phase()
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn host(&self) -> &H {
        self.bridge.host()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.bridge.host_mut()
    }

    pub fn workbook(&self) -> Option<&WorkbookHandle<E::Model>> {
        self.lifecycle.workbook()
    }

    /// Engine-side access to the loaded workbook.
    pub fn workbook_mut(&mut self) -> Option<&mut WorkbookHandle<E::Model>> {
        self.lifecycle.workbook_mut()
    }

    pub fn loaded_identity(&self) -> Option<NoteIdentity> {
        self.lifecycle.workbook().map(WorkbookHandle::identity)
    }

    /// Number of workbook loads performed.
    pub fn load_count(&self) -> u64 {
        self.load_count
    }

    pub fn is_dirty(&self) -> bool {
        self.coalescer.is_dirty()
    }

    pub fn save_gate_open(&self, now: Instant) -> bool {
        self.coalescer.gate_open(now)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RecordingHost;
    use crate::triggers::ContainerEvent;
    use notegrid_engine::{GridEngine, GridModel};

    fn ready_session() -> EditorSession<GridEngine, RecordingHost> {
        let mut session = EditorSession::new(GridEngine::new(), RecordingHost::new(), EditorConfig::default());
        smol::block_on(session.initialize()).unwrap();
        session
    }

    fn edit(f: impl FnOnce(&mut GridModel) + 'static) -> EditorEvent<GridModel> {
        EditorEvent::Edit(Box::new(f))
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings {
            save_policy: SavePolicy::Debounce,
            save_debounce_ms: 900,
            save_gate_ms: 250,
            auto_save_interval_ms: Some(10_000),
            document_triggers: false,
            preview: "Numbers".into(),
            workbook_locale: "de".into(),
            ..Default::default()
        };
        let config = EditorConfig::from_settings(&settings);
        assert_eq!(config.coalescer.timing, SaveTiming::Debounce(Duration::from_millis(900)));
        assert_eq!(config.coalescer.save_gate, Duration::from_millis(250));
        assert_eq!(config.coalescer.autosave, Some(Duration::from_secs(10)));
        assert!(!config.coalescer.scopes.document);
        assert_eq!(config.bridge.preview, "Numbers");
        assert_eq!(config.bridge.host_options.debounce_save, 400);
        assert_eq!(config.workbook.locale, "de");
    }

    #[test]
    fn test_initialize_connects_host() {
        let session = ready_session();
        assert_eq!(session.host().initialized_with.len(), 1);
        assert_eq!(session.phase(), &Phase::Loading);
    }

    #[test]
    fn test_edit_before_load_is_dropped() {
        let mut session = ready_session();
        let t0 = Instant::now();
        session.dispatch(edit(|m| m.set_cell(0, 0, 0, "x")), t0);
        assert!(session.workbook().is_none());
    }

    #[test]
    fn test_trigger_saves_on_next_tick() {
        let mut session = ready_session();
        let t0 = Instant::now();
        session.dispatch(EditorEvent::Host(HostNotification::Text(String::new())), t0);
        assert_eq!(session.phase(), &Phase::Ready);

        let t1 = t0 + Duration::from_millis(600);
        session.dispatch(edit(|m| m.set_cell(0, 1, 1, "7")), t1);
        let outcome = session.dispatch(EditorEvent::Trigger(Trigger::Container(ContainerEvent::KeyUp)), t1);
        assert_eq!(outcome, None);
        assert!(session.host().writes.is_empty());
        assert_eq!(session.next_deadline(), Some(t1));

        assert_eq!(session.tick(t1), Some(SaveOutcome::Written));
        assert_eq!(session.host().writes.len(), 1);
        assert_eq!(session.host().previews, vec!["Spreadsheet".to_string()]);
    }

    #[test]
    fn test_events_after_teardown_ignored() {
        let mut session = ready_session();
        let t0 = Instant::now();
        session.dispatch(EditorEvent::Host(HostNotification::Text(String::new())), t0);
        session.dispatch(EditorEvent::Trigger(Trigger::Lifecycle(LifecycleEvent::Unload)), t0);
        assert!(session.is_torn_down());

        session.dispatch(EditorEvent::Host(HostNotification::Text("other".into())), t0);
        assert_eq!(session.load_count(), 1);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_event_debug() {
        let ev: EditorEvent<GridModel> = edit(|_| {});
        assert_eq!(format!("{:?}", ev), "Edit(..)");
    }
}
