//! User directory module. The record set is the staff-facing user list;
//! non-staff viewers get an empty set from the handler itself rather than
//! relying on any outer filtering.

use std::sync::Arc;

use crate::auth::Viewer;
use crate::console::{DataSourceHandler, FeatureModule, Record};
use crate::db::{Store, User};

pub struct UsersModule {
    store: Store,
}

impl UsersModule {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl FeatureModule for UsersModule {
    fn name(&self) -> &str {
        "users"
    }

    fn handlers(&self) -> Vec<Arc<dyn DataSourceHandler>> {
        vec![Arc::new(UserHandler {
            store: self.store.clone(),
        })]
    }
}

struct UserHandler {
    store: Store,
}

fn to_record(user: User) -> Record {
    Record {
        key: user.id.to_string(),
        title: user.username.clone(),
        body: format!("{} <{}>", user.username, user.email),
    }
}

impl DataSourceHandler for UserHandler {
    fn entity_type(&self) -> &str {
        "users.user"
    }

    fn search(&self, viewer: &Viewer, query: &str) -> anyhow::Result<Vec<Record>> {
        if !viewer.is_staff {
            return Ok(Vec::new());
        }
        let users = self.store.search_users(query)?;
        Ok(users.into_iter().map(to_record).collect())
    }

    fn list(&self, viewer: &Viewer) -> anyhow::Result<Vec<Record>> {
        if !viewer.is_staff {
            return Ok(Vec::new());
        }
        let users = self.store.list_users()?;
        Ok(users.into_iter().map(to_record).collect())
    }
}
