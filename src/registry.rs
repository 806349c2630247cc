//! Registration queue: ordered buffers feature modules append to during
//! process start-up, before the console exists.
//!
//! The queue is handed to each module's setup hook explicitly and drained
//! exactly once by [`crate::console::ConsoleBuilder::drain_queue`]. Draining
//! seals it; any registration arriving afterwards is a programming error
//! and fails loudly rather than being silently dropped, because a dropped
//! registration would produce a console missing functionality with no
//! diagnostic.

use std::sync::Arc;

use crate::console::{AdminAction, AdminView, Realm, SidebarModule};
use crate::error::ConsoleError;

/// Builds the concrete view object once the console exists.
pub type ViewFactory = Box<dyn FnOnce() -> Arc<dyn AdminView> + Send>;

/// A custom view waiting to be mounted: path template, route name, factory.
pub struct QueuedView {
    pub path: String,
    pub name: String,
    pub factory: ViewFactory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Collecting,
    Sealed,
}

/// Insertion-order-preserving buffers, one per registration kind.
pub struct RegistrationQueue {
    phase: Phase,
    autoregister: Vec<String>,
    sidebar_modules: Vec<SidebarModule>,
    views: Vec<QueuedView>,
    actions: Vec<Arc<dyn AdminAction>>,
    realms: Vec<Realm>,
}

/// Everything collected by the queue, in insertion order, handed to the
/// console build step.
pub struct RegistrationBuffers {
    pub autoregister: Vec<String>,
    pub sidebar_modules: Vec<SidebarModule>,
    pub views: Vec<QueuedView>,
    pub actions: Vec<Arc<dyn AdminAction>>,
    pub realms: Vec<Realm>,
}

impl RegistrationQueue {
    pub fn new() -> Self {
        Self {
            phase: Phase::Collecting,
            autoregister: Vec::new(),
            sidebar_modules: Vec::new(),
            views: Vec::new(),
            actions: Vec::new(),
            realms: Vec::new(),
        }
    }

    fn check_open(&self, op: &'static str) -> Result<(), ConsoleError> {
        if self.phase == Phase::Sealed {
            return Err(ConsoleError::SealedQueueViolation(op));
        }
        Ok(())
    }

    /// Request bulk registration of every entity type the named feature
    /// module exposes.
    pub fn enqueue_autoregister(&mut self, module_name: impl Into<String>) -> Result<(), ConsoleError> {
        self.check_open("enqueue_autoregister")?;
        self.autoregister.push(module_name.into());
        Ok(())
    }

    pub fn enqueue_sidebar_module(&mut self, module: SidebarModule) -> Result<(), ConsoleError> {
        self.check_open("enqueue_sidebar_module")?;
        self.sidebar_modules.push(module);
        Ok(())
    }

    /// Queue a custom view. `path` is the URL template the view is mounted
    /// at; `name` is the route name it resolves under.
    pub fn enqueue_view(
        &mut self,
        path: impl Into<String>,
        name: impl Into<String>,
        factory: ViewFactory,
    ) -> Result<(), ConsoleError> {
        self.check_open("enqueue_view")?;
        self.views.push(QueuedView {
            path: path.into(),
            name: name.into(),
            factory,
        });
        Ok(())
    }

    pub fn enqueue_action(&mut self, action: Arc<dyn AdminAction>) -> Result<(), ConsoleError> {
        self.check_open("enqueue_action")?;
        self.actions.push(action);
        Ok(())
    }

    pub fn enqueue_realm(&mut self, realm: Realm) -> Result<(), ConsoleError> {
        self.check_open("enqueue_realm")?;
        self.realms.push(realm);
        Ok(())
    }

    /// Return all buffers and seal the queue. Callable exactly once; a
    /// second call fails rather than returning empty buffers, to catch
    /// double-initialization early.
    pub fn drain(&mut self) -> Result<RegistrationBuffers, ConsoleError> {
        self.check_open("drain")?;
        self.phase = Phase::Sealed;
        Ok(RegistrationBuffers {
            autoregister: std::mem::take(&mut self.autoregister),
            sidebar_modules: std::mem::take(&mut self.sidebar_modules),
            views: std::mem::take(&mut self.views),
            actions: std::mem::take(&mut self.actions),
            realms: std::mem::take(&mut self.realms),
        })
    }
}

impl Default for RegistrationQueue {
    fn default() -> Self {
        Self::new()
    }
}
