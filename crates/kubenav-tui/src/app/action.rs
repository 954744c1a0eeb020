/// User intents resolved from key presses (command pattern)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    // Navigation
    Quit,
    GoBack,
    /// Backspace: edits the active query, or goes back when it is empty
    Erase,
    Confirm,

    // Side-channel detours
    ChangeKubeconfig,
    ChangeNamespace,

    // UI toggles
    ToggleHelp,

    // Log viewer actions
    ExitLogs,
    ExportLogs,
}
