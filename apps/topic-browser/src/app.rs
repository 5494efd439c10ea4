use anyhow::Result;
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rest_widgets::{
    Catalog, ColumnWidth, ComboAction, ComboboxState, Confirmation, Field, Fields, FileModel,
    Filter, FormAction, IdType, InputKind, ListAction, ListModel, LocalFiles, MemoryBackend,
    PagedStore, ResourceTable, ScrollList, ScrollListState, SearchableCombobox, SubmitOutcome,
    TableAction, TableState, Translator,
};
use serde_json::Value as Json;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::github::GitHubTopics;
use crate::models::{Bookmark, Topic};

pub type TopicStore = ListModel<GitHubTopics>;
pub type BookmarkStore = ListModel<MemoryBackend<Bookmark>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Picker,
    Feed,
    Bookmarks,
}

impl Pane {
    fn next(self) -> Self {
        match self {
            Pane::Picker => Pane::Feed,
            Pane::Feed => Pane::Bookmarks,
            Pane::Bookmarks => Pane::Picker,
        }
    }

    fn prev(self) -> Self {
        match self {
            Pane::Picker => Pane::Bookmarks,
            Pane::Feed => Pane::Picker,
            Pane::Bookmarks => Pane::Feed,
        }
    }
}

/// A question waiting for y/n.
pub struct Prompt {
    pub message: String,
    answer: oneshot::Sender<bool>,
}

/// Confirmation answered through the dialog drawn by the main loop.
struct DialogConfirm {
    prompts: mpsc::UnboundedSender<Prompt>,
}

#[async_trait]
impl Confirmation for DialogConfirm {
    async fn confirm(&self, message: &str) -> bool {
        let (answer, reply) = oneshot::channel();
        let prompt = Prompt {
            message: message.to_string(),
            answer,
        };
        if self.prompts.send(prompt).is_err() {
            return false;
        }
        reply.await.unwrap_or(false)
    }
}

pub fn bookmark_columns() -> Vec<Field<Bookmark>> {
    vec![
        Field::new("id")
            .label("ID")
            .kind(InputKind::Number)
            .read_only(true)
            .width(ColumnWidth::Fixed(4)),
        Field::new("topic").label("Topic").required(true),
        Field::new("url").label("URL").kind(InputKind::Url),
        Field::new("tags").label("Tags").multiple(true),
        Field::new("note")
            .label("Note")
            .kind(InputKind::LongText)
            .width(ColumnWidth::Flex(2)),
        Field::new("attachments")
            .label("Files")
            .kind(InputKind::File)
            .multiple(true),
    ]
}

pub struct App {
    pub config: Config,
    pub translator: Arc<dyn Translator>,
    pub picker: SearchableCombobox<TopicStore>,
    pub picker_state: ComboboxState,
    pub feed: ScrollList<TopicStore>,
    pub feed_state: ScrollListState,
    pub bookmarks: Arc<ResourceTable<BookmarkStore>>,
    pub table_state: TableState,
    pub focus: Pane,
    pub prompt: Option<Prompt>,
    pub status_message: Option<String>,
    pub should_quit: bool,
    prompts: mpsc::UnboundedReceiver<Prompt>,
    confirm: Arc<DialogConfirm>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let translator: Arc<dyn Translator> = Arc::new(Catalog::en_us());

        let search = ListModel::with_config(GitHubTopics::new(&config.github)?, "name", &config.list);
        let picker = SearchableCombobox::new(Arc::new(search), "name", "name")
            .multiple(true)
            .placeholder("search GitHub topics")
            .config(&config.list)
            .translator(Arc::clone(&translator));

        let feed_store =
            ListModel::with_config(GitHubTopics::new(&config.github)?, "name", &config.list);
        let feed = ScrollList::builder(Arc::new(feed_store))
            .filter(Filter::new().with("name", config.github.feed_query.clone()))
            .config(config.list.clone())
            .build();

        let saved = MemoryBackend::with_records("id", config.bookmarks.clone())?;
        let bookmarks = ResourceTable::new(
            Arc::new(ListModel::with_config(saved, "id", &config.list)),
            bookmark_columns(),
        )
        .editable(true)
        .deletable(true)
        .on_check(|keys| debug!(count = keys.len(), "bookmarks checked"))
        .uploader(Arc::new(FileModel::new(LocalFiles)))
        .translator(Arc::clone(&translator))
        .config(&config.list);

        let (tx, prompts) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            translator,
            picker,
            picker_state: ComboboxState::new(),
            feed,
            feed_state: ScrollListState::new(),
            bookmarks: Arc::new(bookmarks),
            table_state: TableState::new(),
            focus: Pane::Picker,
            prompt: None,
            status_message: None,
            should_quit: false,
            prompts,
            confirm: Arc::new(DialogConfirm { prompts: tx }),
        })
    }

    /// Boot the feed and load the first page of bookmarks.
    pub async fn mount(&mut self) {
        drop(self.feed.mount());
        if let Err(e) = self.bookmarks.mount().await {
            warn!(error = %e, "bookmarks failed to load");
            self.status_message = Some(format!("Bookmarks: {e}"));
        }
    }

    /// Pick up work finished in the background.
    pub fn tick(&mut self) {
        if self.prompt.is_none() {
            if let Ok(prompt) = self.prompts.try_recv() {
                self.prompt = Some(prompt);
            }
        }
    }

    fn focus_to(&mut self, pane: Pane) {
        if self.focus == Pane::Picker && pane != Pane::Picker {
            self.picker.on_blur(false);
        }
        self.focus = pane;
    }

    pub async fn handle_key(&mut self, key: KeyEvent) {
        if let Some(prompt) = self.prompt.take() {
            let yes = match key.code {
                KeyCode::Char('y') | KeyCode::Enter => true,
                KeyCode::Char('n') | KeyCode::Esc => false,
                _ => {
                    self.prompt = Some(prompt);
                    return;
                }
            };
            if prompt.answer.send(yes).is_err() {
                debug!("confirmation no longer awaited");
            }
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        let editing = self.focus == Pane::Bookmarks && self.bookmarks.is_editing();
        if !editing {
            match key.code {
                KeyCode::Tab => return self.focus_to(self.focus.next()),
                KeyCode::BackTab => return self.focus_to(self.focus.prev()),
                KeyCode::Char('q') if self.focus != Pane::Picker => {
                    self.should_quit = true;
                    return;
                }
                _ => {}
            }
        }

        match self.focus {
            Pane::Picker => self.picker_key(key),
            Pane::Feed => self.feed_key(key).await,
            Pane::Bookmarks => self.bookmarks_key(key).await,
        }
    }

    fn picker_key(&mut self, key: KeyEvent) {
        match self.picker.handle_key(key, &mut self.picker_state) {
            Some(ComboAction::Added(option)) => {
                self.status_message = Some(format!("Picked {}", option.label));
            }
            Some(ComboAction::Removed(option)) => {
                self.status_message = Some(format!("Dropped {}", option.label));
            }
            _ => {}
        }
    }

    async fn feed_key(&mut self, key: KeyEvent) {
        if let Some(ListAction::Activated(index)) = self.feed.handle_key(key, &mut self.feed_state) {
            let topic = self.feed.store().state().all_items.get(index).cloned();
            if let Some(topic) = topic {
                self.bookmark(&topic).await;
            }
        }
    }

    /// Save `topic` as a new bookmark.
    pub async fn bookmark(&mut self, topic: &Topic) {
        let mut fields = Fields::new();
        fields.insert("topic".into(), Json::String(topic.name.clone()));
        fields.insert("url".into(), Json::String(topic.url()));
        fields.insert(
            "note".into(),
            Json::String(topic.short_description.clone().unwrap_or_default()),
        );

        match self.bookmarks.store().update_one(fields, None).await {
            Ok(saved) => {
                info!(topic = %saved.topic, id = saved.id, "bookmark added");
                self.status_message = Some(format!("Bookmarked {}", saved.topic));
            }
            Err(e) => self.status_message = Some(format!("Bookmark failed: {e}")),
        }
    }

    async fn bookmarks_key(&mut self, key: KeyEvent) {
        match self.bookmarks.handle_key(key, &mut self.table_state) {
            Some(TableAction::Delete(keys)) => self.delete(keys),
            Some(TableAction::Form(action)) => self.form_action(action).await,
            _ => {}
        }
    }

    /// Delete in the background; the confirmation arrives as a prompt.
    fn delete(&mut self, keys: Vec<IdType>) {
        let table = Arc::clone(&self.bookmarks);
        let confirm = Arc::clone(&self.confirm);
        tokio::spawn(async move {
            match table.delete_list(&keys, confirm.as_ref()).await {
                Ok(true) => info!(count = keys.len(), "bookmarks deleted"),
                Ok(false) => debug!("delete cancelled"),
                Err(e) => warn!(error = %e, "delete stopped"),
            }
        });
    }

    async fn form_action(&mut self, action: FormAction) {
        let Some(form) = self.bookmarks.editor() else {
            return;
        };
        match action {
            FormAction::Submit => {
                let Some(values) = form.check(&mut self.table_state.form) else {
                    return;
                };
                match form.submit(&values).await {
                    Ok(SubmitOutcome::Saved(saved)) => {
                        self.status_message = Some(format!("Saved {}", saved.topic));
                    }
                    Ok(SubmitOutcome::Invalid(errors)) => {
                        self.table_state.form.errors = errors;
                    }
                    Err(e) => self.status_message = Some(format!("Save failed: {e}")),
                }
            }
            FormAction::Reset => {
                form.reset(&self.table_state.form);
                self.bookmarks.close_editor();
            }
            FormAction::Upload { key, action } => {
                if let Err(e) = form.upload(&mut self.table_state.form, &key, action).await {
                    self.status_message = Some(format!("Upload failed: {e}"));
                }
            }
            FormAction::Moved | FormAction::Edited => {}
        }
    }

    /// Key hints and the latest status for the bottom line.
    pub fn status_text(&self) -> String {
        let hints = match self.focus {
            Pane::Picker => "type to search  ↑↓ move  Enter pick  Esc close",
            Pane::Feed => "↑↓ move  Enter bookmark",
            Pane::Bookmarks if self.bookmarks.is_editing() => "Tab next  Ctrl-S save  Esc cancel",
            Pane::Bookmarks => "Space check  e edit  n new  d delete  ←→ page",
        };
        let error = self.feed.store().state().last_error.clone();
        match (&self.status_message, error) {
            (Some(message), _) => format!("{message} | {hints}"),
            (None, Some(e)) => format!("{e} | {hints}"),
            (None, None) => format!("{hints} | Tab switch  q quit"),
        }
    }
}
