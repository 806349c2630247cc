use std::sync::Arc;

use opsconsole::auth::Viewer;
use opsconsole::console::{
    Capabilities, ConsoleBuilder, DataSourceHandler, FeatureModule, LinkTarget, OnConflict,
    Record, SidebarItem, SidebarModule,
};
use opsconsole::db::{CreateNoteInput, CreateTransactionInput, CreateUserInput, Store};
use opsconsole::error::ConsoleError;
use opsconsole::registry::RegistrationQueue;
use speculate2::speculate;

/// A handler with canned records, for exercising the registry and the
/// aggregator without a store.
struct StubHandler {
    entity: &'static str,
    records: Vec<Record>,
    capabilities: Capabilities,
    failing: bool,
}

impl StubHandler {
    fn new(entity: &'static str, keys: &[&str]) -> Self {
        Self {
            entity,
            records: keys
                .iter()
                .map(|key| Record {
                    key: key.to_string(),
                    title: format!("{} {}", entity, key),
                    body: format!("record {} of {}", key, entity),
                })
                .collect(),
            capabilities: Capabilities::default(),
            failing: false,
        }
    }

    fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn unsearchable(mut self) -> Self {
        self.capabilities.search = false;
        self
    }
}

impl DataSourceHandler for StubHandler {
    fn entity_type(&self) -> &str {
        self.entity
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn search(&self, _viewer: &Viewer, _query: &str) -> anyhow::Result<Vec<Record>> {
        if self.failing {
            anyhow::bail!("backend unavailable");
        }
        Ok(self.records.clone())
    }

    fn list(&self, _viewer: &Viewer) -> anyhow::Result<Vec<Record>> {
        Ok(self.records.clone())
    }
}

struct StubModule {
    name: &'static str,
    entities: Vec<&'static str>,
}

impl FeatureModule for StubModule {
    fn name(&self) -> &str {
        self.name
    }

    fn handlers(&self) -> Vec<Arc<dyn DataSourceHandler>> {
        self.entities
            .iter()
            .map(|e| Arc::new(StubHandler::new(e, &["1"])) as Arc<dyn DataSourceHandler>)
            .collect()
    }
}

fn route_item(label: &str, route: &str) -> SidebarItem {
    SidebarItem {
        label: label.to_string(),
        target: LinkTarget::route(route),
    }
}

speculate! {
    describe "registration queue" {
        it "rejects a second drain" {
            let mut queue = RegistrationQueue::new();
            queue.enqueue_autoregister("finance").unwrap();
            queue.drain().unwrap();

            assert!(matches!(
                queue.drain(),
                Err(ConsoleError::SealedQueueViolation(_))
            ));
        }

        it "rejects registrations after drain" {
            let mut queue = RegistrationQueue::new();
            queue.drain().unwrap();

            assert!(matches!(
                queue.enqueue_autoregister("finance"),
                Err(ConsoleError::SealedQueueViolation(_))
            ));
            assert!(matches!(
                queue.enqueue_sidebar_module(SidebarModule {
                    id: "late".to_string(),
                    title: "Late".to_string(),
                    items: vec![],
                }),
                Err(ConsoleError::SealedQueueViolation(_))
            ));
        }

        it "preserves insertion order through drain" {
            let mut queue = RegistrationQueue::new();
            queue.enqueue_autoregister("b").unwrap();
            queue.enqueue_autoregister("a").unwrap();

            let buffers = queue.drain().unwrap();
            assert_eq!(buffers.autoregister, vec!["b", "a"]);
        }

        it "fails the build when an autoregister request names an unknown module" {
            let mut queue = RegistrationQueue::new();
            queue.enqueue_autoregister("ghost").unwrap();

            let mut builder = ConsoleBuilder::new();
            assert!(matches!(
                builder.drain_queue(&mut queue, &[]),
                Err(ConsoleError::UnknownModule(_))
            ));
        }
    }

    describe "handler registry" {
        it "rejects duplicate manual registration" {
            let mut builder = ConsoleBuilder::new();
            builder.register(Arc::new(StubHandler::new("finance.transaction", &[]))).unwrap();

            let result = builder.register(Arc::new(StubHandler::new("finance.transaction", &[])));
            assert!(matches!(result, Err(ConsoleError::DuplicateRegistration(_))));
        }

        it "skips manual registration over an autoregistered default" {
            let module = StubModule {
                name: "finance",
                entities: vec!["finance.transaction"],
            };

            let mut builder = ConsoleBuilder::new();
            builder.autoregister_module(&module).unwrap();
            // Already present from autoregistration: a no-op, not an error.
            builder.register(Arc::new(StubHandler::new("finance.transaction", &[]))).unwrap();

            let console = builder.finish();
            assert_eq!(console.handlers().len(), 1);
        }

        it "autoregistration skips entity types that were registered manually" {
            let module = StubModule {
                name: "finance",
                entities: vec!["finance.transaction", "finance.unit"],
            };

            let mut builder = ConsoleBuilder::new();
            builder.register(Arc::new(StubHandler::new("finance.transaction", &["custom"]))).unwrap();
            builder.autoregister_module(&module).unwrap();

            let console = builder.finish();
            assert_eq!(console.handlers().len(), 2);
            // The manual handler survives bulk registration.
            let handler = console.handler("finance.transaction").unwrap();
            let records = handler.list(&Viewer::staff("1", "alice")).unwrap();
            assert_eq!(records[0].key, "custom");
        }

        it "replace overrides an existing handler" {
            let mut builder = ConsoleBuilder::new();
            builder.register(Arc::new(StubHandler::new("notes.note", &["old"]))).unwrap();
            builder.register_with(
                Arc::new(StubHandler::new("notes.note", &["new"])),
                OnConflict::Replace,
            ).unwrap();

            let console = builder.finish();
            let records = console.handler("notes.note").unwrap()
                .list(&Viewer::staff("1", "alice")).unwrap();
            assert_eq!(records[0].key, "new");
        }
    }

    describe "navigation resolution" {
        it "keeps only modules whose routes resolve" {
            let mut builder = ConsoleBuilder::new();
            builder.register(Arc::new(StubHandler::new("finance.transaction", &[]))).unwrap();
            builder.add_sidebar_module(SidebarModule {
                id: "finance".to_string(),
                title: "Finance".to_string(),
                items: vec![
                    route_item("Transactions", "admin:finance.transaction:list"),
                    route_item("Ledger export", "admin:finance.export"),
                ],
            });
            builder.add_sidebar_module(SidebarModule {
                id: "broken".to_string(),
                title: "Broken".to_string(),
                items: vec![route_item("Nowhere", "admin:missing:list")],
            });

            let console = builder.finish();
            let context = console.each_request_context(&Viewer::staff("1", "alice"));

            assert_eq!(context.extra_modules.len(), 1);
            assert_eq!(context.extra_modules[0].id, "finance");
            assert_eq!(context.extra_modules[0].items.len(), 1);
            assert_eq!(
                context.extra_modules[0].items[0].url,
                "/admin/finance.transaction/"
            );
        }

        it "preserves item order within a module" {
            let mut builder = ConsoleBuilder::new();
            builder.register(Arc::new(StubHandler::new("a.x", &[]))).unwrap();
            builder.register(Arc::new(StubHandler::new("b.y", &[]))).unwrap();
            builder.add_sidebar_module(SidebarModule {
                id: "links".to_string(),
                title: "Links".to_string(),
                items: vec![
                    route_item("Second entity", "admin:b.y:list"),
                    route_item("First entity", "admin:a.x:list"),
                ],
            });

            let console = builder.finish();
            let context = console.each_request_context(&Viewer::staff("1", "alice"));
            let labels: Vec<_> = context.extra_modules[0]
                .items
                .iter()
                .map(|i| i.label.as_str())
                .collect();
            assert_eq!(labels, vec!["Second entity", "First entity"]);
        }
    }

    describe "search aggregation" {
        before {
            let viewer = Viewer::staff("1", "alice");
        }

        it "returns the union of healthy handlers in registration order" {
            let mut builder = ConsoleBuilder::new();
            builder.register(Arc::new(StubHandler::new("a.first", &["1", "2"]))).unwrap();
            builder.register(Arc::new(StubHandler::new("b.failing", &["3"]).failing())).unwrap();
            builder.register(Arc::new(StubHandler::new("c.last", &["4"]))).unwrap();
            let console = builder.finish();

            let results = console.search(&viewer, "anything");

            let urls: Vec<_> = results.iter().map(|r| r.url.as_str()).collect();
            assert_eq!(
                urls,
                vec![
                    "/admin/a.first/1/",
                    "/admin/a.first/2/",
                    "/admin/c.last/4/",
                ]
            );
        }

        it "skips handlers without the search capability" {
            let mut builder = ConsoleBuilder::new();
            builder.register(Arc::new(StubHandler::new("a.hidden", &["1"]).unsearchable())).unwrap();
            builder.register(Arc::new(StubHandler::new("b.shown", &["2"]))).unwrap();
            let console = builder.finish();

            let results = console.search(&viewer, "anything");
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].url, "/admin/b.shown/2/");
        }

        it "returns an empty list when every handler fails" {
            let mut builder = ConsoleBuilder::new();
            builder.register(Arc::new(StubHandler::new("a.down", &["1"]).failing())).unwrap();
            builder.register(Arc::new(StubHandler::new("b.down", &["2"]).failing())).unwrap();
            let console = builder.finish();

            assert!(console.search(&viewer, "anything").is_empty());
        }
    }

    describe "store" {
        before {
            let store = Store::open_memory().expect("Failed to create in-memory store");
            store.migrate().expect("Failed to run migrations");
        }

        it "scopes transaction search to the owner" {
            store.create_transaction(CreateTransactionInput {
                owner: "alice".to_string(),
                payee: "Corner Cafe".to_string(),
                amount_minor: -450,
                currency: "USD".to_string(),
                memo: "coffee".to_string(),
            }).unwrap();
            store.create_transaction(CreateTransactionInput {
                owner: "bob".to_string(),
                payee: "Corner Cafe".to_string(),
                amount_minor: -450,
                currency: "USD".to_string(),
                memo: "coffee".to_string(),
            }).unwrap();

            let mine = store.search_transactions("alice", "coffee").unwrap();
            assert_eq!(mine.len(), 1);
            assert_eq!(mine[0].owner, "alice");
        }

        it "scopes note listing to the owner" {
            store.create_note(CreateNoteInput {
                owner: "alice".to_string(),
                content: "renew passport".to_string(),
            }).unwrap();
            store.create_note(CreateNoteInput {
                owner: "bob".to_string(),
                content: "renew passport".to_string(),
            }).unwrap();

            let notes = store.list_notes("bob").unwrap();
            assert_eq!(notes.len(), 1);
            assert_eq!(notes[0].owner, "bob");
        }

        it "matches users on username or email" {
            store.create_user(CreateUserInput {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                is_staff: true,
            }).unwrap();
            store.create_user(CreateUserInput {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                is_staff: false,
            }).unwrap();

            assert_eq!(store.search_users("alice").unwrap().len(), 1);
            assert_eq!(store.search_users("example.com").unwrap().len(), 2);
            assert!(store.search_users("carol").unwrap().is_empty());
        }
    }
}
