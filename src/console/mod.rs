//! The admin console: registry of data-source handlers, sidebar modules,
//! custom views, actions and realms, built once at start-up.
//!
//! # Core Concepts
//!
//! ## Build phase
//!
//! Feature modules contribute registrations to a [`RegistrationQueue`]
//! during their own start-up. [`ConsoleBuilder::drain_queue`] drains the
//! queue exactly once, in a fixed order: autoregister requests first,
//! because later phases may assume the entity types they reference
//! already exist. [`ConsoleBuilder::finish`] then
//! produces the immutable [`AdminConsole`] that request handlers receive
//! by injection. Nothing is registered through ambient global state.
//!
//! ## Request phase
//!
//! Every page handler calls [`AdminConsole::each_request_context`] to get
//! consistent navigation; search fans out over the handler registry in
//! registration order.

pub mod nav;
pub mod search;

use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::Viewer;
use crate::error::{ConsoleError, RouteError};
use crate::registry::RegistrationQueue;
use crate::routes::{RouteResolver, RouteTable};

pub use nav::{NavFailurePolicy, ResolvedItem, ResolvedModule};
pub use search::SearchResult;

// ============================================================
// Data-source handlers
// ============================================================

/// What a handler can do. Handlers without the search capability are
/// skipped by the aggregator; handlers without the list capability have
/// no changelist page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub search: bool,
    pub list: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            search: true,
            list: true,
        }
    }
}

/// One record as exposed by a handler. Produced fresh per query, never
/// persisted by the console.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Primary key, stringified.
    pub key: String,
    /// Display name.
    pub title: String,
    /// Full text the excerpt is cut from.
    pub body: String,
}

/// Per-entity-type adapter giving the console a uniform view over a
/// feature module's records.
///
/// Handlers enforce their own visibility rules (e.g. per-user ownership)
/// inside `search` and `list`; the console applies no additional
/// filtering.
pub trait DataSourceHandler: Send + Sync {
    /// Stable entity type identifier, e.g. `finance.transaction`.
    fn entity_type(&self) -> &str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Record set matching a free-text query, scoped to what `viewer` may
    /// see.
    fn search(&self, viewer: &Viewer, query: &str) -> anyhow::Result<Vec<Record>>;

    /// All records visible to `viewer`.
    fn list(&self, viewer: &Viewer) -> anyhow::Result<Vec<Record>>;

    /// Short textual excerpt of one record.
    fn excerpt(&self, record: &Record) -> String {
        let mut excerpt: String = record.body.chars().take(60).collect();
        if excerpt.len() < record.body.len() {
            excerpt.push('…');
        }
        excerpt
    }

    /// Canonical detail URL for one record.
    fn detail_url(
        &self,
        record: &Record,
        routes: &dyn RouteResolver,
    ) -> Result<String, RouteError> {
        routes.resolve(
            &format!("admin:{}:detail", self.entity_type()),
            &[&record.key],
        )
    }
}

/// A feature module: owns entity types and contributes registrations
/// during start-up.
pub trait FeatureModule: Send + Sync {
    fn name(&self) -> &str;

    /// Handlers for every entity type the module owns, in a stable order.
    fn handlers(&self) -> Vec<Arc<dyn DataSourceHandler>>;

    /// Start-up hook: append this module's contributions to the queue.
    fn setup(&self, queue: &mut RegistrationQueue) -> Result<(), ConsoleError> {
        queue.enqueue_autoregister(self.name())
    }
}

// ============================================================
// Sidebar descriptors
// ============================================================

/// Where a sidebar item points: a named route resolved per request, or a
/// literal URL used as-is. Exactly one, by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    Route { name: String, args: Vec<String> },
    Url(String),
}

impl LinkTarget {
    pub fn route(name: impl Into<String>) -> Self {
        Self::Route {
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidebarItem {
    pub label: String,
    pub target: LinkTarget,
}

/// Declarative navigation group. Immutable after registration; read on
/// every request by the extension resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidebarModule {
    pub id: String,
    pub title: String,
    pub items: Vec<SidebarItem>,
}

// ============================================================
// Realms, actions, custom views
// ============================================================

/// Named grouping of entity types shown on the console index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Realm {
    pub id: String,
    pub title: String,
    pub entity_types: Vec<String>,
}

/// Input for running an admin action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionInput {
    /// Entity type the action applies to, if any.
    pub entity_type: Option<String>,
    /// Selected record keys, if any.
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

/// A server-side action registered console-wide.
pub trait AdminAction: Send + Sync {
    /// Stable identifier used in the action URL.
    fn name(&self) -> &str;

    /// Human-readable label.
    fn label(&self) -> &str;

    fn run(
        &self,
        console: &AdminConsole,
        viewer: &Viewer,
        input: &ActionInput,
    ) -> anyhow::Result<ActionOutcome>;
}

/// A custom console page contributed by a module.
pub trait AdminView: Send + Sync {
    /// Page title merged into the response context.
    fn title(&self) -> &str;

    /// Page payload. The surrounding handler adds the per-request console
    /// context (navigation, viewer) around it.
    fn render(&self, console: &AdminConsole, viewer: &Viewer) -> anyhow::Result<serde_json::Value>;
}

/// A mounted custom view: URL path, route name, implementation.
#[derive(Clone)]
pub struct CustomView {
    pub path: String,
    pub name: String,
    pub view: Arc<dyn AdminView>,
}

// ============================================================
// Builder
// ============================================================

/// Conflict policy for [`ConsoleBuilder::register_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Duplicate manual ownership is a fatal error.
    Error,
    /// Keep the existing handler.
    Skip,
    /// Replace the existing handler.
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Installed by bulk autoregistration; a later manual registration of
    /// the same entity type is a no-op skip, not an error.
    Auto,
    Manual,
}

struct Registration {
    handler: Arc<dyn DataSourceHandler>,
    origin: Origin,
}

/// Collects registrations and produces the immutable [`AdminConsole`].
pub struct ConsoleBuilder {
    site_header: String,
    site_title: String,
    nav_policy: NavFailurePolicy,
    registrations: Vec<Registration>,
    index: HashMap<String, usize>,
    sidebar_modules: Vec<SidebarModule>,
    views: Vec<CustomView>,
    actions: Vec<Arc<dyn AdminAction>>,
    realms: Vec<Realm>,
}

impl ConsoleBuilder {
    pub fn new() -> Self {
        Self {
            site_header: "Admin console".to_string(),
            site_title: "Admin console".to_string(),
            nav_policy: NavFailurePolicy::LogOnly,
            registrations: Vec::new(),
            index: HashMap::new(),
            sidebar_modules: Vec::new(),
            views: Vec::new(),
            actions: Vec::new(),
            realms: Vec::new(),
        }
    }

    pub fn site_header(mut self, header: impl Into<String>) -> Self {
        self.site_header = header.into();
        self
    }

    pub fn site_title(mut self, title: impl Into<String>) -> Self {
        self.site_title = title.into();
        self
    }

    pub fn nav_failure_policy(mut self, policy: NavFailurePolicy) -> Self {
        self.nav_policy = policy;
        self
    }

    /// Install a handler. Registering over an entity type that was
    /// manually registered fails with
    /// [`ConsoleError::DuplicateRegistration`]; registering over an
    /// autoregistered default is a logged no-op.
    pub fn register(&mut self, handler: Arc<dyn DataSourceHandler>) -> Result<(), ConsoleError> {
        self.register_with(handler, OnConflict::Error)
    }

    pub fn register_with(
        &mut self,
        handler: Arc<dyn DataSourceHandler>,
        on_conflict: OnConflict,
    ) -> Result<(), ConsoleError> {
        self.install(handler, Origin::Manual, on_conflict)
    }

    /// Register every handler the module exposes, skipping entity types
    /// already present. This lets a module manually customize one handler
    /// and still be included in bulk autoregistration.
    pub fn autoregister_module(&mut self, module: &dyn FeatureModule) -> Result<(), ConsoleError> {
        for handler in module.handlers() {
            self.install(handler, Origin::Auto, OnConflict::Skip)?;
        }
        Ok(())
    }

    fn install(
        &mut self,
        handler: Arc<dyn DataSourceHandler>,
        origin: Origin,
        on_conflict: OnConflict,
    ) -> Result<(), ConsoleError> {
        let entity_type = handler.entity_type().to_string();
        if let Some(&slot) = self.index.get(&entity_type) {
            let existing = &mut self.registrations[slot];
            return match on_conflict {
                OnConflict::Replace => {
                    existing.handler = handler;
                    existing.origin = origin;
                    Ok(())
                }
                OnConflict::Skip => Ok(()),
                OnConflict::Error if existing.origin == Origin::Auto => {
                    tracing::debug!(
                        entity_type = %entity_type,
                        "Entity type already autoregistered; keeping existing handler"
                    );
                    Ok(())
                }
                OnConflict::Error => Err(ConsoleError::DuplicateRegistration(entity_type)),
            };
        }

        self.index.insert(entity_type, self.registrations.len());
        self.registrations.push(Registration { handler, origin });
        Ok(())
    }

    pub fn add_sidebar_module(&mut self, module: SidebarModule) {
        self.sidebar_modules.push(module);
    }

    pub fn add_view(&mut self, path: impl Into<String>, name: impl Into<String>, view: Arc<dyn AdminView>) {
        self.views.push(CustomView {
            path: path.into(),
            name: name.into(),
            view,
        });
    }

    pub fn add_action(&mut self, action: Arc<dyn AdminAction>) {
        self.actions.push(action);
    }

    pub fn add_realm(&mut self, realm: Realm) {
        self.realms.push(realm);
    }

    /// Drain the registration queue, exactly once, applying buffers in
    /// the fixed order: autoregister requests, sidebar modules, views,
    /// actions, realms. Later phases may assume entity types from
    /// autoregistration already exist.
    pub fn drain_queue(
        &mut self,
        queue: &mut RegistrationQueue,
        modules: &[Arc<dyn FeatureModule>],
    ) -> Result<(), ConsoleError> {
        let buffers = queue.drain()?;

        for module_name in buffers.autoregister {
            let module = modules
                .iter()
                .find(|m| m.name() == module_name)
                .ok_or_else(|| ConsoleError::UnknownModule(module_name.clone()))?;
            self.autoregister_module(module.as_ref())?;
        }

        for module in buffers.sidebar_modules {
            self.add_sidebar_module(module);
        }

        for queued in buffers.views {
            let view = (queued.factory)();
            self.add_view(queued.path, queued.name, view);
        }

        for action in buffers.actions {
            self.add_action(action);
        }

        for realm in buffers.realms {
            self.add_realm(realm);
        }

        Ok(())
    }

    /// Produce the immutable console. Registers the built-in and
    /// per-entity route names; after this point the registry is read-only
    /// and shared across request threads without locks.
    pub fn finish(self) -> AdminConsole {
        let mut routes = RouteTable::new();
        routes.register("admin:index", "/admin/");
        routes.register("admin:search", "/admin/search");

        for registration in &self.registrations {
            let entity_type = registration.handler.entity_type();
            routes.register(
                format!("admin:{}:list", entity_type),
                format!("/admin/{}/", entity_type),
            );
            routes.register(
                format!("admin:{}:detail", entity_type),
                format!("/admin/{}/{{key}}/", entity_type),
            );
        }

        for view in &self.views {
            routes.register(view.name.clone(), view.path.clone());
        }

        let nav_failures = self
            .sidebar_modules
            .iter()
            .map(|_| AtomicU32::new(0))
            .collect();

        AdminConsole {
            site_header: self.site_header,
            site_title: self.site_title,
            nav_policy: self.nav_policy,
            handlers: self
                .registrations
                .into_iter()
                .map(|r| r.handler)
                .collect(),
            index: self.index,
            sidebar_modules: self.sidebar_modules,
            nav_failures,
            views: self.views,
            actions: self.actions,
            realms: self.realms,
            routes,
        }
    }
}

impl Default for ConsoleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Console
// ============================================================

/// Base template context plus per-request navigation. Every admin page
/// response carries one of these.
#[derive(Debug, Clone, Serialize)]
pub struct ConsoleContext {
    pub site_header: String,
    pub site_title: String,
    pub viewer: Viewer,
    pub extra_modules: Vec<ResolvedModule>,
}

/// The long-lived console. Immutable after [`ConsoleBuilder::finish`];
/// concurrent requests read it without locks.
pub struct AdminConsole {
    site_header: String,
    site_title: String,
    nav_policy: NavFailurePolicy,
    handlers: Vec<Arc<dyn DataSourceHandler>>,
    index: HashMap<String, usize>,
    sidebar_modules: Vec<SidebarModule>,
    nav_failures: Vec<AtomicU32>,
    views: Vec<CustomView>,
    actions: Vec<Arc<dyn AdminAction>>,
    realms: Vec<Realm>,
    routes: RouteTable,
}

impl AdminConsole {
    pub fn site_header(&self) -> &str {
        &self.site_header
    }

    pub fn site_title(&self) -> &str {
        &self.site_title
    }

    /// Handlers in registration order.
    pub fn handlers(&self) -> &[Arc<dyn DataSourceHandler>] {
        &self.handlers
    }

    pub fn handler(&self, entity_type: &str) -> Option<&Arc<dyn DataSourceHandler>> {
        self.index.get(entity_type).map(|&slot| &self.handlers[slot])
    }

    pub fn sidebar_modules(&self) -> &[SidebarModule] {
        &self.sidebar_modules
    }

    pub fn views(&self) -> &[CustomView] {
        &self.views
    }

    pub fn action(&self, name: &str) -> Option<&Arc<dyn AdminAction>> {
        self.actions.iter().find(|a| a.name() == name)
    }

    pub fn actions(&self) -> &[Arc<dyn AdminAction>] {
        &self.actions
    }

    pub fn realms(&self) -> &[Realm] {
        &self.realms
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The single seam through which every admin page receives consistent
    /// navigation. Must be called by every page-rendering handler.
    pub fn each_request_context(&self, viewer: &Viewer) -> ConsoleContext {
        let extra_modules = nav::resolve_modules(
            &self.sidebar_modules,
            &self.nav_failures,
            self.nav_policy,
            &self.routes,
            viewer,
        );

        ConsoleContext {
            site_header: self.site_header.clone(),
            site_title: self.site_title.clone(),
            viewer: viewer.clone(),
            extra_modules,
        }
    }

    /// Fan a free-text query out to every registered handler. See
    /// [`search::aggregate`].
    pub fn search(&self, viewer: &Viewer, query: &str) -> Vec<SearchResult> {
        search::aggregate(self, viewer, query)
    }
}
