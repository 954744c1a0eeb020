use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use crate::app::Action;

/// A key combination
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }
}

/// Context for keybindings
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Global,
    /// Wizard steps: selectors, input prompt, result screen
    Wizard,
    /// Log viewer with the list focused
    LogViewer,
    /// Log viewer with the search box focused
    LogSearch,
}

/// Keybinding configuration
pub struct KeyBindings {
    bindings: HashMap<KeyContext, HashMap<KeyBinding, Action>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        let mut bindings = HashMap::new();

        // Global bindings
        let mut global = HashMap::new();
        global.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::Quit);
        global.insert(KeyBinding::new(KeyCode::F(1)), Action::ToggleHelp);
        bindings.insert(KeyContext::Global, global);

        // Wizard bindings; everything else goes to the active text field
        let mut wizard = HashMap::new();
        wizard.insert(KeyBinding::new(KeyCode::Esc), Action::GoBack);
        wizard.insert(KeyBinding::new(KeyCode::Backspace), Action::Erase);
        wizard.insert(KeyBinding::new(KeyCode::Enter), Action::Confirm);
        wizard.insert(KeyBinding::new(KeyCode::Tab), Action::Confirm);
        wizard.insert(KeyBinding::ctrl(KeyCode::Char('k')), Action::ChangeKubeconfig);
        wizard.insert(KeyBinding::ctrl(KeyCode::Char('n')), Action::ChangeNamespace);
        bindings.insert(KeyContext::Wizard, wizard);

        // Log viewer bindings; navigation is handled by the viewer itself
        let mut log_viewer = HashMap::new();
        log_viewer.insert(KeyBinding::new(KeyCode::Esc), Action::ExitLogs);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('q')), Action::ExitLogs);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('e')), Action::ExportLogs);
        bindings.insert(KeyContext::LogViewer, log_viewer);

        // Search box focused: letters are typed
        let mut log_search = HashMap::new();
        log_search.insert(KeyBinding::new(KeyCode::Esc), Action::ExitLogs);
        bindings.insert(KeyContext::LogSearch, log_search);

        Self { bindings }
    }

    /// Look up action for key event in given context
    pub fn get_action(&self, context: KeyContext, key: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(key);

        // First check context-specific bindings
        if let Some(action) = self.bindings.get(&context).and_then(|b| b.get(&binding)) {
            return Some(*action);
        }

        // Fall back to global bindings
        self.bindings
            .get(&KeyContext::Global)?
            .get(&binding)
            .copied()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}
