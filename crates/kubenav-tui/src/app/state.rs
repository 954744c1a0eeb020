use kubenav_types::{ActionInput, ActionSpec};

/// Which context list a context selector shows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Config,
    Namespace,
}

/// Secondary target picked after the action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubtargetKind {
    /// A pod of the deployment
    Instance,
    /// A container of the pod
    Subresource,
    /// A folder under the action's nested base path
    AssetFolder,
}

/// What the free-form prompt is collecting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputPurpose {
    /// A kubeconfig path typed by hand
    ContextPath,
    /// The parameter of the selected action
    ActionParameter,
}

/// Wizard state; exactly one is current
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardState {
    SelectContext(ContextKind),
    SelectResource,
    SelectAction,
    SelectSubtarget(SubtargetKind),
    AwaitInput(InputPurpose),
    Executing,
    ShowResult,
    ViewLogs,
}

impl WizardState {
    /// Header label for the step
    pub fn label(&self) -> &'static str {
        match self {
            WizardState::SelectContext(ContextKind::Config) => "Kubeconfig",
            WizardState::SelectContext(ContextKind::Namespace) => "Namespace",
            WizardState::SelectResource => "Deployment",
            WizardState::SelectAction => "Action",
            WizardState::SelectSubtarget(SubtargetKind::Instance) => "Pod",
            WizardState::SelectSubtarget(SubtargetKind::Subresource) => "Container",
            WizardState::SelectSubtarget(SubtargetKind::AssetFolder) => "Asset folder",
            WizardState::AwaitInput(_) => "Input",
            WizardState::Executing => "Running",
            WizardState::ShowResult => "Result",
            WizardState::ViewLogs => "Logs",
        }
    }

    /// Detours may start from here
    pub fn allows_detour(&self) -> bool {
        matches!(
            self,
            WizardState::SelectResource
                | WizardState::SelectAction
                | WizardState::SelectSubtarget(_)
                | WizardState::AwaitInput(InputPurpose::ActionParameter)
                | WizardState::ShowResult
        )
    }
}

/// What the selected action still needs before it can run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Subtarget(SubtargetKind),
    Input,
    Execute,
}

/// Choices accumulated while walking the wizard
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pub kubeconfig: Option<String>,
    pub namespace: Option<String>,
    pub resource: Option<String>,
    pub action: Option<&'static ActionSpec>,
    /// Pod name without the status suffix
    pub instance: Option<String>,
    pub subresource: Option<String>,
    pub folder: Option<String>,
    pub input: Option<ActionInput>,
}

impl Selection {
    /// Resolve what the current action still requires. Checked in order:
    /// instance, subresource, nested folder, free-form input.
    pub fn next_step(&self) -> Step {
        let Some(action) = self.action else {
            return Step::Execute;
        };
        if action.needs_instance && self.instance.is_none() {
            Step::Subtarget(SubtargetKind::Instance)
        } else if action.needs_subresource && self.subresource.is_none() {
            Step::Subtarget(SubtargetKind::Subresource)
        } else if action.nested_folder.is_some() && self.folder.is_none() {
            Step::Subtarget(SubtargetKind::AssetFolder)
        } else if action.input.is_some() && self.input.is_none() {
            Step::Input
        } else {
            Step::Execute
        }
    }

    /// Forget the choice for `kind` and everything resolved after it
    pub fn clear_from(&mut self, kind: SubtargetKind) {
        if kind == SubtargetKind::Instance {
            self.instance = None;
        }
        if kind != SubtargetKind::AssetFolder {
            self.subresource = None;
        }
        self.folder = None;
        self.input = None;
    }
}
