mod action;
mod message;
mod state;
mod wizard;

pub use action::Action;
pub use message::{Effect, Message};
pub use state::{ContextKind, InputPurpose, Selection, Step, SubtargetKind, WizardState};
pub use wizard::{Notice, NoticeLevel, Wizard, WizardOptions};
