//! Named-route resolution.
//!
//! axum routes by path template but has no reverse lookup, so the console
//! keeps its own table of route names. Sidebar descriptors, search results
//! and custom views all refer to routes by name; resolution happens per
//! request and may fail when a dependent module was not installed.

use std::collections::HashMap;

use crate::error::RouteError;

/// Capability: resolve a route name plus positional arguments to a URL.
pub trait RouteResolver: Send + Sync {
    fn resolve(&self, name: &str, args: &[&str]) -> Result<String, RouteError>;
}

/// Route name -> path template, e.g. `"/admin/finance.transaction/{key}/"`.
///
/// Templates use `{placeholder}` segments filled positionally. The table is
/// populated during console build and immutable afterwards.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    templates: HashMap<String, String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under a name. Later registrations win, which
    /// lets wiring override a default entity route with a custom view.
    pub fn register(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(name.into(), template.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

impl RouteResolver for RouteTable {
    fn resolve(&self, name: &str, args: &[&str]) -> Result<String, RouteError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))?;

        let expected = template.matches('{').count();
        if expected != args.len() {
            return Err(RouteError::ArityMismatch {
                name: name.to_string(),
                expected,
                got: args.len(),
            });
        }

        let mut url = String::with_capacity(template.len());
        let mut next_arg = args.iter();
        let mut rest = template.as_str();
        while let Some(open) = rest.find('{') {
            url.push_str(&rest[..open]);
            let close = rest[open..]
                .find('}')
                .map(|i| open + i)
                .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))?;
            // arity was checked above
            url.push_str(next_arg.next().expect("checked arity"));
            rest = &rest[close + 1..];
        }
        url.push_str(rest);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_static_route() {
        let mut table = RouteTable::new();
        table.register("admin:index", "/admin/");
        assert_eq!(table.resolve("admin:index", &[]).unwrap(), "/admin/");
    }

    #[test]
    fn substitutes_positional_args() {
        let mut table = RouteTable::new();
        table.register("admin:finance.transaction:detail", "/admin/finance.transaction/{key}/");
        assert_eq!(
            table
                .resolve("admin:finance.transaction:detail", &["42"])
                .unwrap(),
            "/admin/finance.transaction/42/"
        );
    }

    #[test]
    fn unknown_route_is_an_error() {
        let table = RouteTable::new();
        assert!(matches!(
            table.resolve("admin:missing", &[]),
            Err(RouteError::UnknownRoute(_))
        ));
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let mut table = RouteTable::new();
        table.register("admin:users.user:detail", "/admin/users.user/{key}/");
        assert!(matches!(
            table.resolve("admin:users.user:detail", &[]),
            Err(RouteError::ArityMismatch { .. })
        ));
    }
}
