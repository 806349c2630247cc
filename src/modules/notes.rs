//! Notes module: owner-scoped free-text notes. The default 60-character
//! excerpt matches how note content is abbreviated in list views.

use std::sync::Arc;

use crate::auth::Viewer;
use crate::console::{DataSourceHandler, FeatureModule, Record};
use crate::db::{Note, Store};

pub struct NotesModule {
    store: Store,
}

impl NotesModule {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl FeatureModule for NotesModule {
    fn name(&self) -> &str {
        "notes"
    }

    fn handlers(&self) -> Vec<Arc<dyn DataSourceHandler>> {
        vec![Arc::new(NoteHandler {
            store: self.store.clone(),
        })]
    }
}

struct NoteHandler {
    store: Store,
}

fn to_record(note: Note) -> Record {
    let title = note
        .content
        .lines()
        .next()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "Note".to_string());

    Record {
        key: note.id.to_string(),
        title,
        body: note.content,
    }
}

impl DataSourceHandler for NoteHandler {
    fn entity_type(&self) -> &str {
        "notes.note"
    }

    fn search(&self, viewer: &Viewer, query: &str) -> anyhow::Result<Vec<Record>> {
        if !viewer.is_authenticated {
            return Ok(Vec::new());
        }
        let notes = self.store.search_notes(&viewer.username, query)?;
        Ok(notes.into_iter().map(to_record).collect())
    }

    fn list(&self, viewer: &Viewer) -> anyhow::Result<Vec<Record>> {
        if !viewer.is_authenticated {
            return Ok(Vec::new());
        }
        let notes = self.store.list_notes(&viewer.username)?;
        Ok(notes.into_iter().map(to_record).collect())
    }
}
