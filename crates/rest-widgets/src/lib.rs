//! # rest-widgets
//!
//! Data-bound TUI components for paged REST resources.
//!
//! Every widget reads and drives a [`PagedStore`]: a paged, deduplicated
//! record cache with loading counters and a single edit slot. Views are
//! derived from the store's observable state on every frame.
//!
//! ## Components
//!
//! - [`ScrollList`] - infinite list that pages in as its bottom edge nears
//! - [`ResourceTable`] - paged table with check boxes, delete and a modal editor
//! - [`ResourceForm`] - edits or creates the store's current record
//! - [`SearchableCombobox`] - debounced remote search with badge selection
//! - [`BadgeInput`], [`FileUploader`], [`PagerView`] - inputs and chrome
//!
//! ## Architecture
//!
//! All widgets:
//! - Keep cursor and scroll state in a `*State` value owned by the caller
//! - Implement Ratatui's `StatefulWidget` trait
//! - Translate user-visible text through a [`Translator`]
//! - Take timing from a shared [`ListConfig`]

mod badge_input;
mod boundary;
mod config;
mod debounce;
mod error;
mod form;
mod input;
mod pager;
mod scroll_list;
mod searchable;
mod table;
mod uploader;

pub mod i18n;
pub mod store;

pub use badge_input::{chips, BadgeInput, BadgeInputState, TAG_KINDS};
pub use boundary::{EdgePosition, Overflow, ScrollBoundary, ScrollFrame, Scrollport};
pub use config::ListConfig;
pub use debounce::Debouncer;
pub use error::{StoreError, StoreResult, WidgetError, WidgetResult};
pub use form::{
    validate_field, BodyRenderer, Column, ColumnWidth, Field, FormAction, FormData, FormState,
    InputKind, InputRenderer, InputWidget, LabelRenderer, RangeIcon, RangeScale, ResetHandler,
    ResourceForm, SelectOption, SubmitHandler, SubmitOutcome, Validator, Value,
};
pub use i18n::{Catalog, Translator};
pub use input::{ChangeHandler, Controlled};
pub use pager::{page_bounds, pager_items, PageRequest, Pager, PagerItem, PagerView};
pub use scroll_list::{
    ListAction, ListPhase, ScrollList, ScrollListBuilder, ScrollListState, ScrollListView,
};
pub use searchable::{ComboAction, ComboboxState, OptionData, SearchableCombobox};
pub use store::{
    Backend, Fields, Filter, IdType, ListModel, MemoryBackend, Page, PagedStore, Record,
    StoreState,
};
pub use table::{
    calculate_column_widths, CellContent, CheckHandler, CheckedKeys, Confirmation, HeadCheck,
    ResourceTable, TableAction, TableColumn, TableState,
};
pub use uploader::{
    file_name, FileModel, FileTransport, FileUploader, FileUploaderState, LocalFiles,
    UploadAction, UploaderEvent,
};
