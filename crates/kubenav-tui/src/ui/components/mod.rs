mod fuzzy_selector;
mod help_overlay;
mod log_viewer;
mod status_bar;
mod text_input;

pub use fuzzy_selector::{FuzzySelector, MAX_VISIBLE, Row, Section, SelectorView};
pub use help_overlay::HelpOverlay;
pub use log_viewer::LogViewer;
pub use status_bar::{StatusBar, log_viewer_hints, selector_hints};
pub use text_input::TextInput;
