//! Terminal UI for kubenav
//!
//! This crate holds the wizard controller, keybindings, terminal plumbing
//! and every widget and screen of the interface. It performs no I/O against
//! the cluster: the controller emits [`Effect`]s and the host feeds the
//! results back as [`Message`]s.

pub mod app;
pub mod config;
pub mod fuzzy;
pub mod tui;
pub mod ui;

pub use app::{
    Action, ContextKind, Effect, InputPurpose, Message, Notice, NoticeLevel, Selection,
    SubtargetKind, Wizard, WizardOptions, WizardState,
};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{FuzzySelector, LogViewer, SelectorView, StatusBar, TextInput};
pub use ui::screens::{LogScreen, PromptScreen, WizardScreen};
pub use ui::{Layout, Theme};
