//! Editor and viewer lifecycles over a key-value store.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::EditorConfig;
use crate::core::{Document, Editor};
use crate::serde_value::{LoadError, document_from_json_str, document_to_json_string};

pub const DATA_KEY: &str = "DATA";
pub const TITLE_KEY: &str = "TITLE";

/// Host storage, e.g. browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// Parses and shapes stored content. `None` when the store has no document; errors for
/// content that cannot be read or does not fit the schema.
fn load_editor(
    store: &impl KeyValueStore,
    config: EditorConfig,
) -> Option<Result<Editor, LoadError>> {
    let raw = store.get(DATA_KEY)?;
    let doc = match document_from_json_str(&raw) {
        Ok(doc) => doc,
        Err(err) => return Some(Err(err)),
    };
    let editor = Editor::from_config(doc, config);
    Some(
        editor
            .schema()
            .check(editor.doc())
            .map(|()| editor)
            .map_err(LoadError::from),
    )
}

fn plain_title(title: &str) -> String {
    title.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}

/// A mounted editor: loads on mount, persists every document change.
pub struct EditorSession<S: KeyValueStore> {
    store: S,
    editor: Editor,
    title: String,
    persisted_revision: u64,
}

impl<S: KeyValueStore> EditorSession<S> {
    pub fn mount(store: S, config: EditorConfig) -> Self {
        let editor = match load_editor(&store, config.clone()) {
            Some(Ok(editor)) => editor,
            Some(Err(err)) => {
                warn!(%err, "stored document skipped, starting empty");
                Editor::from_config(Document::default(), config)
            }
            None => Editor::from_config(Document::default(), config),
        };
        let title = store.get(TITLE_KEY).map(|t| plain_title(&t)).unwrap_or_default();
        debug!(blocks = editor.doc().children.len(), "editor session mounted");
        Self {
            persisted_revision: editor.revision(),
            store,
            editor,
            title,
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Runs `f` against the editor and persists the document if it changed.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Editor) -> R) -> R {
        let out = f(&mut self.editor);
        if self.editor.revision() != self.persisted_revision {
            self.persist();
        }
        out
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Stores the title as plain text with line breaks removed.
    pub fn set_title(&mut self, title: &str) {
        self.title = plain_title(title);
        self.store.set(TITLE_KEY, self.title.clone());
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Final persist; hands the store back.
    pub fn unmount(mut self) -> S {
        self.persist();
        self.store
    }

    fn persist(&mut self) {
        match document_to_json_string(self.editor.doc()) {
            Ok(json) => {
                self.store.set(DATA_KEY, json);
                self.persisted_revision = self.editor.revision();
            }
            Err(err) => warn!(%err, "failed to encode document"),
        }
    }
}

/// Read-only replay of stored content.
pub struct Viewer {
    editor: Editor,
    title: String,
}

impl Viewer {
    pub fn open(store: &impl KeyValueStore) -> Option<Viewer> {
        let editor = match load_editor(store, EditorConfig::read_only())? {
            Ok(editor) => editor,
            Err(err) => {
                warn!(%err, "stored document cannot be shown");
                return None;
            }
        };
        let title = store.get(TITLE_KEY).map(|t| plain_title(&t)).unwrap_or_default();
        Some(Viewer { editor, title })
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Mutations fail with [`crate::ApplyError::ReadOnly`].
    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}
