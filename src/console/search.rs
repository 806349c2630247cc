//! Cross-module search aggregation.
//!
//! Fans a free-text query out to every registered handler in registration
//! order and concatenates the results: handler order first, then record
//! order as returned by the handler. There is no global relevance
//! ranking; this is a union, not a search engine. A failing handler is
//! logged and excluded so one unhealthy data backend never fails the
//! whole search.

use serde::Serialize;

use crate::auth::Viewer;
use crate::console::AdminConsole;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    pub url: String,
}

pub fn aggregate(console: &AdminConsole, viewer: &Viewer, query: &str) -> Vec<SearchResult> {
    let mut results = Vec::new();

    for handler in console.handlers() {
        if !handler.capabilities().search {
            continue;
        }

        let records = match handler.search(viewer, query) {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(
                    entity_type = %handler.entity_type(),
                    error = %err,
                    "Search handler failed; dropping its contribution"
                );
                continue;
            }
        };
        if records.is_empty() {
            continue;
        }

        for record in records {
            let url = match handler.detail_url(&record, console.routes()) {
                Ok(url) => url,
                Err(err) => {
                    tracing::warn!(
                        entity_type = %handler.entity_type(),
                        key = %record.key,
                        error = %err,
                        "Dropping search result without a resolvable detail URL"
                    );
                    continue;
                }
            };
            results.push(SearchResult {
                title: record.title.clone(),
                content: handler.excerpt(&record),
                url,
            });
        }
    }

    results
}
