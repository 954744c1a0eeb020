mod log_screen;
mod prompt_screen;
mod wizard_screen;

pub use log_screen::{LogScreen, highlight_line};
pub use prompt_screen::PromptScreen;
pub use wizard_screen::WizardScreen;
