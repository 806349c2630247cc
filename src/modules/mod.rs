//! Built-in feature modules and console-level wiring.
//!
//! Each module owns its entity types and contributes registrations
//! through the queue during start-up; the console never knows about them
//! in advance. Visibility rules live inside each module's handlers: the
//! users directory is staff-only, finance and notes records are scoped
//! to their owner.

mod finance;
mod notes;
mod users;

pub use finance::FinanceModule;
pub use notes::NotesModule;
pub use users::UsersModule;

use std::sync::Arc;

use crate::auth::Viewer;
use crate::console::{
    ActionInput, ActionOutcome, AdminAction, AdminConsole, AdminView, FeatureModule, LinkTarget,
    SidebarItem, SidebarModule,
};
use crate::db::Store;
use crate::error::ConsoleError;
use crate::registry::RegistrationQueue;

/// Install the built-in modules and console-level extras into the queue.
/// Returns the module list the console build step resolves autoregister
/// requests against.
pub fn install_default_modules(
    store: &Store,
    queue: &mut RegistrationQueue,
) -> Result<Vec<Arc<dyn FeatureModule>>, ConsoleError> {
    let modules: Vec<Arc<dyn FeatureModule>> = vec![
        Arc::new(UsersModule::new(store.clone())),
        Arc::new(FinanceModule::new(store.clone())),
        Arc::new(NotesModule::new(store.clone())),
    ];

    for module in &modules {
        module.setup(queue)?;
    }

    install_console_extras(store, queue)?;

    Ok(modules)
}

/// Console-level contributions that belong to no single feature module:
/// the tools and reports sidebars, the system dashboard view and the
/// export action.
fn install_console_extras(
    store: &Store,
    queue: &mut RegistrationQueue,
) -> Result<(), ConsoleError> {
    queue.enqueue_sidebar_module(SidebarModule {
        id: "tools".to_string(),
        title: "Tools".to_string(),
        items: vec![
            SidebarItem {
                label: "System dashboard".to_string(),
                target: LinkTarget::route("admin:system-dashboard"),
            },
            // Resolves only when a background-task module is installed.
            SidebarItem {
                label: "Background tasks".to_string(),
                target: LinkTarget::route("admin:background-tasks:list"),
            },
        ],
    })?;

    queue.enqueue_sidebar_module(SidebarModule {
        id: "reports".to_string(),
        title: "Reports".to_string(),
        items: vec![SidebarItem {
            label: "Finance report".to_string(),
            target: LinkTarget::route("admin:finance.transaction:list"),
        }],
    })?;

    let dashboard_store = store.clone();
    queue.enqueue_view(
        "/admin/dashboard/",
        "admin:system-dashboard",
        Box::new(move || Arc::new(DashboardView::new(dashboard_store)) as Arc<dyn AdminView>),
    )?;

    queue.enqueue_action(Arc::new(ExportEverythingAction))?;

    Ok(())
}

/// System dashboard: record counts across the stores.
pub struct DashboardView {
    store: Store,
}

impl DashboardView {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl AdminView for DashboardView {
    fn title(&self) -> &str {
        "System dashboard"
    }

    fn render(
        &self,
        _console: &AdminConsole,
        _viewer: &Viewer,
    ) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::json!({
            "stats": {
                "users": self.store.count_users()?,
                "transactions": self.store.count_transactions()?,
                "notes": self.store.count_notes()?,
            }
        }))
    }
}

/// Global action reporting, per entity type, how many records the acting
/// viewer could export.
pub struct ExportEverythingAction;

impl AdminAction for ExportEverythingAction {
    fn name(&self) -> &str {
        "export-everything"
    }

    fn label(&self) -> &str {
        "Export all data"
    }

    fn run(
        &self,
        console: &AdminConsole,
        viewer: &Viewer,
        _input: &ActionInput,
    ) -> anyhow::Result<ActionOutcome> {
        let mut counts = serde_json::Map::new();
        for handler in console.handlers() {
            if !handler.capabilities().list {
                continue;
            }
            let records = handler.list(viewer)?;
            counts.insert(
                handler.entity_type().to_string(),
                serde_json::Value::from(records.len()),
            );
        }

        Ok(ActionOutcome {
            message: "Export prepared".to_string(),
            data: serde_json::Value::Object(counts),
        })
    }
}
