//! Extension resolver: turns declarative sidebar descriptors into
//! concrete navigation entries for one request.
//!
//! Navigation must degrade gracefully as modules are added and removed
//! independently; a single misconfigured link never breaks the console.
//! Unresolvable routes are logged with enough context for audit and the
//! item is dropped; a module whose every item was dropped is omitted
//! entirely.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;

use crate::auth::Viewer;
use crate::console::{LinkTarget, SidebarModule};
use crate::routes::RouteResolver;

/// What to do about repeated resolution failures of a module's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavFailurePolicy {
    /// Log every failure and keep attempting resolution on later requests.
    LogOnly,
    /// After this many failed resolutions, stop attempting the module for
    /// the remainder of the process.
    DisableAfter(u32),
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedItem {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedModule {
    pub id: String,
    pub title: String,
    pub items: Vec<ResolvedItem>,
}

/// Resolve every descriptor for the current request, preserving
/// descriptor and item insertion order. `failures` is the per-module
/// failure counter slice, parallel to `modules`.
pub fn resolve_modules(
    modules: &[SidebarModule],
    failures: &[AtomicU32],
    policy: NavFailurePolicy,
    routes: &dyn RouteResolver,
    viewer: &Viewer,
) -> Vec<ResolvedModule> {
    let mut resolved = Vec::with_capacity(modules.len());

    for (module, failure_count) in modules.iter().zip(failures) {
        if let NavFailurePolicy::DisableAfter(limit) = policy {
            if failure_count.load(Ordering::Relaxed) >= limit {
                continue;
            }
        }

        let mut items = Vec::with_capacity(module.items.len());
        for item in &module.items {
            let url = match &item.target {
                LinkTarget::Url(url) => url.clone(),
                LinkTarget::Route { name, args } => {
                    let args: Vec<&str> = args.iter().map(String::as_str).collect();
                    match routes.resolve(name, &args) {
                        Ok(url) => url,
                        Err(err) => {
                            tracing::warn!(
                                module = %module.id,
                                item = %item.label,
                                viewer = %viewer.username,
                                error = %err,
                                "Dropping unresolvable sidebar item"
                            );
                            if let NavFailurePolicy::DisableAfter(limit) = policy {
                                let seen = failure_count.fetch_add(1, Ordering::Relaxed) + 1;
                                if seen == limit {
                                    tracing::warn!(
                                        module = %module.id,
                                        failures = seen,
                                        "Disabling sidebar module after repeated resolution failures"
                                    );
                                }
                            }
                            continue;
                        }
                    }
                }
            };
            items.push(ResolvedItem {
                label: item.label.clone(),
                url,
            });
        }

        // No empty navigation groups.
        if items.is_empty() {
            continue;
        }

        resolved.push(ResolvedModule {
            id: module.id.clone(),
            title: module.title.clone(),
            items,
        });
    }

    resolved
}
