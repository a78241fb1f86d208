//! Save trigger signals.
//!
//! Every signal that may lead to a save is normalized into a `Trigger` before
//! it reaches the coalescer:
//!
//! - Container events bubble from the rendered grid.
//! - Document events are registered in the capture phase on the whole
//!   document, because some engine interactions (drag-fill, deletion) never
//!   bubble to the container.
//! - Lifecycle events are last-chance flushes.
//!
//! Timers are not triggers; the coalescer owns them.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerEvent {
    Click,
    KeyUp,
    Input,
    Change,
    PointerUp,
    MouseUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentEvent {
    PointerUp,
    MouseUp,
    KeyDown,
    KeyUp,
    Paste,
    Cut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Page visibility changed to hidden.
    Hidden,
    /// Page is unloading. Terminal.
    Unload,
}

/// A normalized save trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Container(ContainerEvent),
    Document(DocumentEvent),
    Lifecycle(LifecycleEvent),
}

/// Which interaction scopes are listened to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerScopes {
    pub container: bool,
    pub document: bool,
}

impl TriggerScopes {
    pub const ALL: Self = Self {
        container: true,
        document: true,
    };

    /// Lifecycle triggers are always enabled.
    pub fn enables(&self, trigger: &Trigger) -> bool {
        match trigger {
            Trigger::Container(_) => self.container,
            Trigger::Document(_) => self.document,
            Trigger::Lifecycle(_) => true,
        }
    }
}

impl Default for TriggerScopes {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes() {
        let doc_only = TriggerScopes {
            container: false,
            document: true,
        };
        assert!(!doc_only.enables(&Trigger::Container(ContainerEvent::Click)));
        assert!(doc_only.enables(&Trigger::Document(DocumentEvent::Paste)));
        assert!(doc_only.enables(&Trigger::Lifecycle(LifecycleEvent::Hidden)));
    }
}
