use crossterm::event::KeyEvent;
use kubenav_k8s::{NEW_KUBECONFIG_ENTRY, Subresources, expand_home};
use kubenav_logs::{StreamEvent, StreamEventKind};
use kubenav_types::{
    ActionInput, ActionOutcome, ActionOutput, ActionSpec, ClientError, FOLLOW_LOG_TAIL, HandOff,
    Invocation, LogTarget, PreferenceStore, RecentCategory, STATIC_LOG_TAIL, WizardError,
    action_display_list, pod_name,
};

use super::state::{ContextKind, InputPurpose, Selection, Step, SubtargetKind, WizardState};
use super::{Action, Effect, Message};
use crate::config::{KeyBindings, KeyContext};
use crate::ui::components::{FuzzySelector, LogViewer, TextInput};

/// Severity of a transient status note
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient note shown in the status bar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Where the wizard starts and what is already known
#[derive(Clone, Debug, Default)]
pub struct WizardOptions {
    pub kubeconfig: Option<String>,
    /// The host already holds a working client
    pub connected: bool,
    pub namespace: Option<String>,
    pub resource: Option<String>,
    /// Pod used by every action that needs one
    pub instance: Option<String>,
    /// Container used by every action that needs one
    pub subresource: Option<String>,
    /// Why the startup connection failed
    pub startup_error: Option<String>,
}

/// The wizard controller.
///
/// Owns one selector per step plus the log viewer. Key presses and
/// background completions go in; [`Effect`]s describing background work come
/// out. All state mutation happens here, on the UI thread.
pub struct Wizard<P: PreferenceStore> {
    prefs: P,
    keys: KeyBindings,
    state: WizardState,
    /// States interrupted by a kubeconfig or namespace detour
    detours: Vec<WizardState>,
    /// Subtarget steps the user confirmed for the current action, in order
    trail: Vec<SubtargetKind>,
    selection: Selection,
    pinned_instance: Option<String>,
    pinned_subresource: Option<String>,
    connected: bool,
    connecting: bool,
    startup_error: Option<String>,

    config_selector: FuzzySelector,
    namespace_selector: FuzzySelector,
    resource_selector: FuzzySelector,
    action_selector: FuzzySelector,
    instance_selector: FuzzySelector,
    subresource_selector: FuzzySelector,
    folder_selector: FuzzySelector,
    input: TextInput,

    log_viewer: Option<LogViewer>,
    log_target: Option<LogTarget>,
    /// Id of the current log stream; events from older streams are dropped
    stream_id: u64,

    result: Option<Result<String, WizardError>>,
    notice: Option<Notice>,
    hand_off: Option<HandOff>,
    help_visible: bool,
    should_quit: bool,
    spinner: usize,
    size: (u16, u16),
}

impl<P: PreferenceStore> Wizard<P> {
    pub fn new(prefs: P, options: WizardOptions) -> Self {
        let namespace = options.namespace.or_else(|| prefs.last_namespace());
        let mut action_selector = FuzzySelector::new("Select Action");
        action_selector.set_candidates(action_display_list());

        Self {
            prefs,
            keys: KeyBindings::new(),
            state: WizardState::SelectContext(ContextKind::Config),
            detours: Vec::new(),
            trail: Vec::new(),
            selection: Selection {
                kubeconfig: options.kubeconfig,
                namespace,
                resource: options.resource,
                ..Default::default()
            },
            pinned_instance: options.instance,
            pinned_subresource: options.subresource,
            connected: options.connected,
            connecting: false,
            startup_error: options.startup_error,

            config_selector: FuzzySelector::new("Select Kubeconfig"),
            namespace_selector: FuzzySelector::new("Select Namespace"),
            resource_selector: FuzzySelector::new("Select Deployment"),
            action_selector,
            instance_selector: FuzzySelector::new("Select Pod"),
            subresource_selector: FuzzySelector::new("Select Container"),
            folder_selector: FuzzySelector::new("Select Asset Folder"),
            input: TextInput::new(),

            log_viewer: None,
            log_target: None,
            stream_id: 0,

            result: None,
            notice: None,
            hand_off: None,
            help_visible: false,
            should_quit: false,
            spinner: 0,
            size: (80, 24),
        }
    }

    /// Pick the first step from what is already known
    pub fn start(&mut self) -> Vec<Effect> {
        if !self.connected {
            if let Some(err) = &self.startup_error {
                self.notice = Some(Notice::new(
                    NoticeLevel::Warning,
                    format!("No usable kubeconfig: {}", err),
                ));
            }
            return self.enter(WizardState::SelectContext(ContextKind::Config));
        }
        match (&self.selection.namespace, &self.selection.resource) {
            (None, _) => self.enter(WizardState::SelectContext(ContextKind::Namespace)),
            (Some(_), Some(_)) => self.enter(WizardState::SelectAction),
            (Some(_), None) => self.enter(WizardState::SelectResource),
        }
    }

    // ------------------------------------------------------------------
    // Accessors used by the presentation layer
    // ------------------------------------------------------------------

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    pub fn in_detour(&self) -> bool {
        !self.detours.is_empty()
    }

    pub fn active_selector(&self) -> Option<&FuzzySelector> {
        self.selector(self.state)
    }

    pub fn input(&self) -> &TextInput {
        &self.input
    }

    /// Prompt of the free-form input step
    pub fn input_prompt(&self) -> &'static str {
        match self.state {
            WizardState::AwaitInput(InputPurpose::ContextPath) => "Enter kubeconfig file path:",
            _ => self
                .selection
                .action
                .and_then(ActionSpec::input_prompt)
                .unwrap_or(""),
        }
    }

    pub fn result(&self) -> Option<&Result<String, WizardError>> {
        self.result.as_ref()
    }

    pub fn log_viewer(&self) -> Option<&LogViewer> {
        self.log_viewer.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_help_visible(&self) -> bool {
        self.help_visible
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn spinner_frame(&self) -> usize {
        self.spinner
    }

    pub fn preferences(&self) -> &P {
        &self.prefs
    }

    /// Outcome of the session: the pending hand-off, if any, or a startup
    /// failure when no cluster connection was ever made.
    pub fn finish(self) -> Result<Option<HandOff>, WizardError> {
        if !self.connected {
            let reason = self
                .startup_error
                .unwrap_or_else(|| "no kubeconfig selected".to_string());
            return Err(WizardError::FatalStartup(reason));
        }
        Ok(self.hand_off)
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.size = (width, height);
        if let Some(viewer) = self.log_viewer.as_mut() {
            viewer.set_size(width, height);
        }
    }

    pub fn tick(&mut self) {
        self.spinner = self.spinner.wrapping_add(1);
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    pub fn handle_key(&mut self, key: &KeyEvent) -> Vec<Effect> {
        if self.help_visible {
            if self.keys.get_action(KeyContext::Global, key) == Some(Action::Quit) {
                return self.quit();
            }
            self.help_visible = false;
            return Vec::new();
        }

        if self.state == WizardState::ViewLogs {
            return self.handle_log_key(key);
        }

        match self.keys.get_action(KeyContext::Wizard, key) {
            Some(Action::Quit) => self.quit(),
            Some(Action::ToggleHelp) => {
                self.help_visible = true;
                Vec::new()
            }
            Some(Action::GoBack) => {
                if self.active_query().is_empty() {
                    self.go_back()
                } else {
                    self.clear_query();
                    Vec::new()
                }
            }
            Some(Action::Erase) => {
                if self.active_query().is_empty() {
                    self.go_back()
                } else {
                    self.forward_key(key);
                    Vec::new()
                }
            }
            Some(Action::Confirm) => self.confirm(),
            Some(Action::ChangeKubeconfig) => self.detour(ContextKind::Config),
            Some(Action::ChangeNamespace) => self.detour(ContextKind::Namespace),
            _ => {
                self.forward_key(key);
                Vec::new()
            }
        }
    }

    fn handle_log_key(&mut self, key: &KeyEvent) -> Vec<Effect> {
        let Some(viewer) = self.log_viewer.as_mut() else {
            return self.exit_logs();
        };
        let context = if viewer.is_search_focused() {
            KeyContext::LogSearch
        } else {
            KeyContext::LogViewer
        };

        match self.keys.get_action(context, key) {
            Some(Action::Quit) => self.quit(),
            Some(Action::ToggleHelp) => {
                self.help_visible = true;
                Vec::new()
            }
            Some(Action::ExitLogs) => self.exit_logs(),
            Some(Action::ExportLogs) => {
                let pod = self
                    .log_target
                    .as_ref()
                    .map(|t| t.pod.clone())
                    .unwrap_or_else(|| "logs".to_string());
                let lines = viewer.buffer().visible_lines().map(str::to_string).collect();
                vec![Effect::ExportLogs { pod, lines }]
            }
            _ => {
                viewer.handle_key(key);
                Vec::new()
            }
        }
    }

    fn quit(&mut self) -> Vec<Effect> {
        self.should_quit = true;
        if self.state == WizardState::ViewLogs {
            vec![Effect::StopLogStream]
        } else {
            Vec::new()
        }
    }

    fn selector(&self, state: WizardState) -> Option<&FuzzySelector> {
        match state {
            WizardState::SelectContext(ContextKind::Config) => Some(&self.config_selector),
            WizardState::SelectContext(ContextKind::Namespace) => Some(&self.namespace_selector),
            WizardState::SelectResource => Some(&self.resource_selector),
            WizardState::SelectAction => Some(&self.action_selector),
            WizardState::SelectSubtarget(SubtargetKind::Instance) => Some(&self.instance_selector),
            WizardState::SelectSubtarget(SubtargetKind::Subresource) => {
                Some(&self.subresource_selector)
            }
            WizardState::SelectSubtarget(SubtargetKind::AssetFolder) => Some(&self.folder_selector),
            _ => None,
        }
    }

    fn selector_mut(&mut self, state: WizardState) -> Option<&mut FuzzySelector> {
        match state {
            WizardState::SelectContext(ContextKind::Config) => Some(&mut self.config_selector),
            WizardState::SelectContext(ContextKind::Namespace) => {
                Some(&mut self.namespace_selector)
            }
            WizardState::SelectResource => Some(&mut self.resource_selector),
            WizardState::SelectAction => Some(&mut self.action_selector),
            WizardState::SelectSubtarget(SubtargetKind::Instance) => {
                Some(&mut self.instance_selector)
            }
            WizardState::SelectSubtarget(SubtargetKind::Subresource) => {
                Some(&mut self.subresource_selector)
            }
            WizardState::SelectSubtarget(SubtargetKind::AssetFolder) => {
                Some(&mut self.folder_selector)
            }
            _ => None,
        }
    }

    /// Text typed into the active step
    fn active_query(&self) -> &str {
        match self.state {
            WizardState::AwaitInput(_) => self.input.value(),
            state => self.selector(state).map(FuzzySelector::query).unwrap_or(""),
        }
    }

    fn clear_query(&mut self) {
        match self.state {
            WizardState::AwaitInput(_) => self.input.clear(),
            state => {
                if let Some(selector) = self.selector_mut(state) {
                    selector.clear_query();
                }
            }
        }
    }

    fn forward_key(&mut self, key: &KeyEvent) {
        match self.state {
            WizardState::AwaitInput(_) => {
                self.input.handle_key(key);
            }
            state => {
                if let Some(selector) = self.selector_mut(state) {
                    selector.handle_key(key);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Make `state` current, preparing its step and issuing its load
    fn enter(&mut self, state: WizardState) -> Vec<Effect> {
        tracing::debug!("wizard: {:?} -> {:?}", self.state, state);
        self.state = state;

        match state {
            WizardState::SelectContext(ContextKind::Config) => {
                let recent = self.prefs.recent(RecentCategory::Contexts, "");
                let selector = &mut self.config_selector;
                selector.reset();
                selector.set_loading(true);
                selector.set_recent(recent);
                vec![Effect::LoadContexts]
            }
            WizardState::SelectContext(ContextKind::Namespace) => {
                self.namespace_selector.reset();
                self.namespace_selector.set_loading(true);
                vec![Effect::LoadNamespaces]
            }
            WizardState::SelectResource => {
                let Some(namespace) = self.selection.namespace.clone() else {
                    return self.enter(WizardState::SelectContext(ContextKind::Namespace));
                };
                let recent = self.prefs.recent(RecentCategory::Resources, &namespace);
                let selector = &mut self.resource_selector;
                selector.reset();
                selector.set_loading(true);
                selector.set_recent(recent);
                vec![Effect::LoadResources { namespace }]
            }
            WizardState::SelectAction => {
                let recent = self.prefs.recent(RecentCategory::Actions, "");
                self.action_selector.reset();
                self.action_selector.set_recent(recent);
                Vec::new()
            }
            WizardState::SelectSubtarget(kind) => self.enter_subtarget(kind),
            WizardState::AwaitInput(_) => {
                self.input.clear();
                Vec::new()
            }
            WizardState::Executing | WizardState::ShowResult | WizardState::ViewLogs => {
                Vec::new()
            }
        }
    }

    fn enter_subtarget(&mut self, kind: SubtargetKind) -> Vec<Effect> {
        let (Some(namespace), Some(resource)) =
            (self.selection.namespace.clone(), self.selection.resource.clone())
        else {
            return self.enter(WizardState::SelectResource);
        };

        match kind {
            SubtargetKind::Instance => {
                let recent = self.prefs.recent(RecentCategory::Instances, &resource);
                let selector = &mut self.instance_selector;
                selector.reset();
                selector.set_loading(true);
                selector.set_recent(recent);
                vec![Effect::LoadInstances {
                    namespace,
                    resource,
                }]
            }
            SubtargetKind::Subresource => {
                self.subresource_selector.reset();
                self.subresource_selector.set_loading(true);
                vec![Effect::LoadSubresources {
                    namespace,
                    resource,
                    instance: self.selection.instance.clone(),
                }]
            }
            SubtargetKind::AssetFolder => {
                self.folder_selector.reset();
                let base_path = self.selection.action.and_then(|a| a.nested_folder);
                match (
                    base_path,
                    self.selection.instance.clone(),
                    self.selection.subresource.clone(),
                ) {
                    (Some(base_path), Some(instance), Some(subresource)) => {
                        self.folder_selector.set_loading(true);
                        vec![Effect::LoadFolders {
                            namespace,
                            instance,
                            subresource,
                            base_path,
                        }]
                    }
                    _ => {
                        self.folder_selector.set_error("no container selected");
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Resume target after a detour, falling back to the deepest step whose
    /// prerequisites still hold
    fn resumable(&self, state: WizardState) -> WizardState {
        let needs_resource = !matches!(
            state,
            WizardState::SelectContext(_) | WizardState::SelectResource
        );
        if self.selection.namespace.is_none() {
            WizardState::SelectContext(ContextKind::Namespace)
        } else if needs_resource && self.selection.resource.is_none() {
            WizardState::SelectResource
        } else {
            state
        }
    }

    fn detour(&mut self, kind: ContextKind) -> Vec<Effect> {
        if !self.connected || self.connecting || !self.state.allows_detour() {
            return Vec::new();
        }
        self.detours.push(self.state);
        self.enter(WizardState::SelectContext(kind))
    }

    fn go_back(&mut self) -> Vec<Effect> {
        match self.state {
            WizardState::SelectContext(_) => {
                if self.connecting || !self.connected || self.selection.namespace.is_none() {
                    return Vec::new();
                }
                match self.detours.pop() {
                    Some(previous) => {
                        let resume = self.resumable(previous);
                        if resume == previous {
                            self.state = previous;
                            Vec::new()
                        } else {
                            self.enter(resume)
                        }
                    }
                    None => Vec::new(),
                }
            }
            WizardState::SelectResource => Vec::new(),
            WizardState::SelectAction => self.enter(WizardState::SelectResource),
            WizardState::SelectSubtarget(_) | WizardState::AwaitInput(InputPurpose::ActionParameter) => {
                self.step_back()
            }
            WizardState::AwaitInput(InputPurpose::ContextPath) => {
                self.state = WizardState::SelectContext(ContextKind::Config);
                Vec::new()
            }
            WizardState::ShowResult => {
                self.result = None;
                self.enter(WizardState::SelectAction)
            }
            WizardState::Executing | WizardState::ViewLogs => Vec::new(),
        }
    }

    /// Return to the previous prompted subtarget, skipping auto-selected ones,
    /// and reload its candidates
    fn step_back(&mut self) -> Vec<Effect> {
        match self.trail.pop() {
            Some(kind) => {
                self.selection.clear_from(kind);
                self.enter(WizardState::SelectSubtarget(kind))
            }
            None => self.enter(WizardState::SelectAction),
        }
    }

    fn confirm(&mut self) -> Vec<Effect> {
        if !self.connecting {
            self.notice = None;
        }
        match self.state {
            WizardState::AwaitInput(purpose) => self.confirm_input(purpose),
            WizardState::ShowResult => {
                self.result = None;
                self.enter(WizardState::SelectAction)
            }
            WizardState::Executing | WizardState::ViewLogs => Vec::new(),
            state => {
                let Some(selected) = self
                    .selector(state)
                    .filter(|s| !s.is_loading())
                    .and_then(FuzzySelector::current_selection)
                    .map(str::to_string)
                else {
                    return Vec::new();
                };
                self.confirm_selection(state, selected)
            }
        }
    }

    fn confirm_selection(&mut self, state: WizardState, selected: String) -> Vec<Effect> {
        match state {
            WizardState::SelectContext(ContextKind::Config) => {
                if self.connecting {
                    return Vec::new();
                }
                if selected == NEW_KUBECONFIG_ENTRY {
                    return self.enter(WizardState::AwaitInput(InputPurpose::ContextPath));
                }
                self.connect(selected)
            }
            WizardState::SelectContext(ContextKind::Namespace) => {
                if self.selection.namespace.as_deref() != Some(selected.as_str()) {
                    self.selection.resource = None;
                }
                self.prefs.set_last_namespace(&selected);
                self.selection.namespace = Some(selected);
                match self.detours.pop() {
                    Some(previous) => {
                        let resume = self.resumable(previous);
                        self.enter(resume)
                    }
                    None => self.enter(WizardState::SelectResource),
                }
            }
            WizardState::SelectResource => {
                if let Some(namespace) = &self.selection.namespace {
                    self.prefs
                        .record_recent(RecentCategory::Resources, namespace, &selected);
                }
                self.selection.resource = Some(selected);
                self.enter(WizardState::SelectAction)
            }
            WizardState::SelectAction => {
                let Some(spec) = ActionSpec::from_display(&selected) else {
                    return Vec::new();
                };
                self.prefs.record_recent(RecentCategory::Actions, "", &selected);
                self.begin_action(spec)
            }
            WizardState::SelectSubtarget(kind) => {
                match kind {
                    SubtargetKind::Instance => {
                        if let Some(resource) = &self.selection.resource {
                            self.prefs
                                .record_recent(RecentCategory::Instances, resource, &selected);
                        }
                        self.selection.instance = Some(pod_name(&selected).to_string());
                    }
                    SubtargetKind::Subresource => self.selection.subresource = Some(selected),
                    SubtargetKind::AssetFolder => self.selection.folder = Some(selected),
                }
                self.trail.push(kind);
                self.advance()
            }
            _ => Vec::new(),
        }
    }

    fn confirm_input(&mut self, purpose: InputPurpose) -> Vec<Effect> {
        let raw = self.input.value().trim().to_string();
        if raw.is_empty() {
            return Vec::new();
        }

        match purpose {
            InputPurpose::ContextPath => {
                let path = expand_home(&raw).display().to_string();
                self.connect(path)
            }
            InputPurpose::ActionParameter => {
                let Some(input) = self.selection.action.and_then(|a| a.input) else {
                    return self.advance();
                };
                match ActionInput::parse(input.kind, &raw) {
                    Ok(value) => {
                        self.selection.input = Some(value);
                        self.advance()
                    }
                    Err(msg) => {
                        self.result = Some(Err(WizardError::Execution(msg)));
                        self.enter(WizardState::ShowResult)
                    }
                }
            }
        }
    }

    fn connect(&mut self, path: String) -> Vec<Effect> {
        self.connecting = true;
        self.notice = Some(Notice::new(
            NoticeLevel::Info,
            format!("Connecting with {}...", path),
        ));
        self.state = WizardState::SelectContext(ContextKind::Config);
        vec![Effect::Connect { path }]
    }

    fn begin_action(&mut self, spec: &'static ActionSpec) -> Vec<Effect> {
        self.selection.action = Some(spec);
        self.selection.instance = self.pinned_instance.clone();
        self.selection.subresource = self.pinned_subresource.clone();
        self.selection.folder = None;
        self.selection.input = None;
        self.trail.clear();
        self.advance()
    }

    /// Move to whatever the current action still needs
    fn advance(&mut self) -> Vec<Effect> {
        match self.selection.next_step() {
            Step::Subtarget(kind) => self.enter(WizardState::SelectSubtarget(kind)),
            Step::Input => self.enter(WizardState::AwaitInput(InputPurpose::ActionParameter)),
            Step::Execute => self.execute(),
        }
    }

    fn invocation(&self) -> Option<Invocation> {
        Some(Invocation {
            action: self.selection.action?,
            namespace: self.selection.namespace.clone()?,
            resource: self.selection.resource.clone()?,
            instance: self.selection.instance.clone(),
            subresource: self.selection.subresource.clone(),
            folder: self.selection.folder.clone(),
            input: self.selection.input.clone(),
        })
    }

    fn execute(&mut self) -> Vec<Effect> {
        let Some(invocation) = self.invocation() else {
            return self.enter(WizardState::SelectResource);
        };

        match invocation.action.output {
            ActionOutput::Logs { follow } => {
                let Some(target) = invocation.log_target() else {
                    self.result = Some(Err(WizardError::Execution("no pod selected".to_string())));
                    return self.enter(WizardState::ShowResult);
                };
                self.log_target = Some(target.clone());
                if follow {
                    self.stream_id += 1;
                    let mut viewer = self.new_log_viewer(&target);
                    viewer.set_streaming(true);
                    self.log_viewer = Some(viewer);
                    self.enter(WizardState::ViewLogs);
                    vec![Effect::StartLogStream {
                        target,
                        tail: FOLLOW_LOG_TAIL,
                        stream: self.stream_id,
                    }]
                } else {
                    self.enter(WizardState::Executing);
                    vec![Effect::FetchLogs {
                        target,
                        tail: STATIC_LOG_TAIL,
                    }]
                }
            }
            ActionOutput::Text | ActionOutput::HandOff => {
                self.enter(WizardState::Executing);
                vec![Effect::Execute(invocation)]
            }
        }
    }

    fn new_log_viewer(&self, target: &LogTarget) -> LogViewer {
        let title = match &target.container {
            Some(container) => format!("{}/{}", target.pod, container),
            None => target.pod.clone(),
        };
        let mut viewer = LogViewer::new(title);
        viewer.set_size(self.size.0, self.size.1);
        viewer.set_recent_searches(self.prefs.recent(RecentCategory::LogSearches, ""));
        viewer
    }

    fn exit_logs(&mut self) -> Vec<Effect> {
        if let Some(viewer) = self.log_viewer.take() {
            let query = viewer.search_query();
            if !query.is_empty() {
                self.prefs.record_recent(RecentCategory::LogSearches, "", query);
            }
        }
        self.log_target = None;
        let mut effects = vec![Effect::StopLogStream];
        effects.extend(self.enter(WizardState::SelectAction));
        effects
    }

    fn build_hand_off(&self, detail: Option<String>) -> Option<HandOff> {
        let action = self.selection.action?;
        Some(HandOff {
            op: action.op,
            action: action.name.to_string(),
            kubeconfig: self.selection.kubeconfig.clone(),
            namespace: self.selection.namespace.clone()?,
            resource: self.selection.resource.clone()?,
            instance: self.selection.instance.clone(),
            subresource: self.selection.subresource.clone(),
            input: self.selection.input.clone(),
            detail,
        })
    }

    // ------------------------------------------------------------------
    // Background completions
    // ------------------------------------------------------------------

    pub fn handle_message(&mut self, message: Message) -> Vec<Effect> {
        match message {
            Message::ContextsLoaded(result) => {
                apply_list(&mut self.config_selector, result);
                Vec::new()
            }
            Message::Connected { path, result } => self.on_connected(path, result),
            Message::NamespacesLoaded(result) => {
                apply_list(&mut self.namespace_selector, result);
                Vec::new()
            }
            Message::ResourcesLoaded { namespace, result } => {
                if self.selection.namespace.as_deref() == Some(namespace.as_str()) {
                    apply_list(&mut self.resource_selector, result);
                }
                Vec::new()
            }
            Message::InstancesLoaded { resource, result } => {
                if self.selection.resource.as_deref() == Some(resource.as_str()) {
                    apply_list(&mut self.instance_selector, result);
                }
                Vec::new()
            }
            Message::SubresourcesLoaded {
                resource,
                instance,
                result,
            } => {
                if self.selection.resource.as_deref() != Some(resource.as_str())
                    || self.selection.instance != instance
                {
                    tracing::debug!("dropping container list for {:?}", instance);
                    return Vec::new();
                }
                self.on_subresources(result)
            }
            Message::FoldersLoaded {
                instance,
                subresource,
                result,
            } => {
                let current = self.state == WizardState::SelectSubtarget(SubtargetKind::AssetFolder)
                    && self.selection.instance.as_deref() == Some(instance.as_str())
                    && self.selection.subresource.as_deref() == Some(subresource.as_str());
                if current {
                    apply_list(&mut self.folder_selector, result);
                }
                Vec::new()
            }
            Message::LogsFetched(result) => self.on_logs_fetched(result),
            Message::ExecutionFinished(result) => self.on_execution_finished(result),
            Message::LogsExported(result) => {
                self.notice = Some(match result {
                    Ok(path) => Notice::new(NoticeLevel::Info, format!("Exported logs to {}", path)),
                    Err(err) => Notice::new(NoticeLevel::Error, format!("Export failed: {}", err)),
                });
                Vec::new()
            }
            Message::Stream(event) => {
                self.on_stream_event(event);
                Vec::new()
            }
        }
    }

    fn on_connected(&mut self, path: String, result: Result<(), ClientError>) -> Vec<Effect> {
        self.connecting = false;
        match result {
            Ok(()) => {
                self.connected = true;
                self.prefs.record_recent(RecentCategory::Contexts, "", &path);
                self.prefs.set_last_context_path(&path);
                self.notice = Some(Notice::new(NoticeLevel::Info, format!("Connected with {}", path)));
                self.selection.kubeconfig = Some(path);
                self.selection.namespace = None;
                self.selection.resource = None;
                self.enter(WizardState::SelectContext(ContextKind::Namespace))
            }
            Err(err) => {
                tracing::warn!("connect with {} failed: {}", path, err);
                self.notice = Some(Notice::new(
                    NoticeLevel::Error,
                    format!("Failed to connect: {}", err),
                ));
                Vec::new()
            }
        }
    }

    fn on_subresources(&mut self, result: Result<Subresources, ClientError>) -> Vec<Effect> {
        if self.state != WizardState::SelectSubtarget(SubtargetKind::Subresource) {
            return Vec::new();
        }
        match result {
            Ok(found) => {
                if self.selection.instance.is_none() {
                    self.selection.instance = Some(found.instance);
                }
                if let [only] = found.names.as_slice() {
                    self.selection.subresource = Some(only.clone());
                    self.subresource_selector.set_candidates(found.names);
                    return self.advance();
                }
                self.subresource_selector.set_candidates(found.names);
            }
            Err(err) => self.subresource_selector.set_error(err.to_string()),
        }
        Vec::new()
    }

    fn on_logs_fetched(&mut self, result: Result<String, ClientError>) -> Vec<Effect> {
        if self.state != WizardState::Executing {
            return Vec::new();
        }
        match (result, self.log_target.clone()) {
            (Ok(text), Some(target)) => {
                let mut viewer = self.new_log_viewer(&target);
                viewer.set_static_content(&text);
                self.log_viewer = Some(viewer);
                self.enter(WizardState::ViewLogs)
            }
            (Ok(_), None) => Vec::new(),
            (Err(err), _) => {
                self.result = Some(Err(err.into()));
                self.enter(WizardState::ShowResult)
            }
        }
    }

    fn on_execution_finished(&mut self, result: Result<ActionOutcome, ClientError>) -> Vec<Effect> {
        if self.state != WizardState::Executing {
            return Vec::new();
        }
        match result {
            Ok(ActionOutcome::Text(text)) => {
                self.result = Some(Ok(text));
                self.enter(WizardState::ShowResult)
            }
            Ok(ActionOutcome::HandOff { detail }) => {
                self.hand_off = self.build_hand_off(detail);
                self.should_quit = true;
                Vec::new()
            }
            Err(err) => {
                self.result = Some(Err(err.into()));
                self.enter(WizardState::ShowResult)
            }
        }
    }

    fn on_stream_event(&mut self, event: StreamEvent) {
        if self.state != WizardState::ViewLogs || event.stream != self.stream_id {
            return;
        }
        let Some(viewer) = self.log_viewer.as_mut() else {
            return;
        };
        match event.kind {
            StreamEventKind::Line(line) => viewer.append_line(line),
            StreamEventKind::Ended(err) => {
                viewer.set_streaming(false);
                self.notice = Some(match err {
                    Some(err) => {
                        Notice::new(NoticeLevel::Warning, WizardError::Stream(err).to_string())
                    }
                    None => Notice::new(NoticeLevel::Info, "Log stream ended"),
                });
            }
        }
    }
}

/// Apply a list load to a selector: candidates on success, inline error otherwise
fn apply_list(selector: &mut FuzzySelector, result: Result<Vec<String>, ClientError>) {
    match result {
        Ok(items) => selector.set_candidates(items),
        Err(err) => selector.set_error(WizardError::Load(err.to_string()).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use kubenav_types::{ActionOp, push_recent};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryPreferences {
        recent: HashMap<(RecentCategory, String), Vec<String>>,
        namespace: Option<String>,
        context: Option<String>,
    }

    impl PreferenceStore for MemoryPreferences {
        fn recent(&self, category: RecentCategory, scope: &str) -> Vec<String> {
            self.recent
                .get(&(category, scope.to_string()))
                .cloned()
                .unwrap_or_default()
        }

        fn record_recent(&mut self, category: RecentCategory, scope: &str, item: &str) {
            push_recent(
                self.recent.entry((category, scope.to_string())).or_default(),
                item,
            );
        }

        fn last_namespace(&self) -> Option<String> {
            self.namespace.clone()
        }

        fn set_last_namespace(&mut self, namespace: &str) {
            self.namespace = Some(namespace.to_string());
        }

        fn last_context_path(&self) -> Option<String> {
            self.context.clone()
        }

        fn set_last_context_path(&mut self, path: &str) {
            self.context = Some(path.to_string());
        }
    }

    type TestWizard = Wizard<MemoryPreferences>;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_str(wizard: &mut TestWizard, text: &str) {
        for c in text.chars() {
            wizard.handle_key(&key(KeyCode::Char(c)));
        }
    }

    fn items(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Container list for deployment "web", answering a request for `requested`
    fn containers(requested: Option<&str>, found: &str, names: &[&str]) -> Message {
        Message::SubresourcesLoaded {
            resource: "web".into(),
            instance: requested.map(str::to_string),
            result: Ok(Subresources {
                instance: found.into(),
                names: items(names),
            }),
        }
    }

    fn folders(names: &[&str]) -> Message {
        Message::FoldersLoaded {
            instance: "web-1".into(),
            subresource: "app".into(),
            result: Ok(items(names)),
        }
    }

    fn options() -> WizardOptions {
        WizardOptions {
            kubeconfig: Some("/home/me/.kube/config".into()),
            connected: true,
            namespace: Some("default".into()),
            ..Default::default()
        }
    }

    /// Move the active selector onto `item` and press enter
    fn choose(wizard: &mut TestWizard, item: &str) -> Vec<Effect> {
        let state = wizard.state();
        let selector = wizard.selector_mut(state).expect("no active selector");
        for _ in 0..selector.total() {
            selector.move_up();
        }
        while selector.current_selection() != Some(item) {
            let before = selector.cursor();
            selector.move_down();
            assert_ne!(before, selector.cursor(), "{} is not listed", item);
        }
        wizard.handle_key(&key(KeyCode::Enter))
    }

    fn choose_action(wizard: &mut TestWizard, name: &str) -> Vec<Effect> {
        let display = ActionSpec::find(name).expect("unknown action").display();
        choose(wizard, &display)
    }

    /// Wizard sitting on action selection for deployment "web"
    fn at_actions(options: WizardOptions) -> TestWizard {
        let mut wizard = Wizard::new(MemoryPreferences::default(), options);
        wizard.start();
        wizard.handle_message(Message::ResourcesLoaded {
            namespace: "default".into(),
            result: Ok(items(&["api", "web"])),
        });
        choose(&mut wizard, "web");
        assert_eq!(wizard.state(), WizardState::SelectAction);
        wizard
    }

    fn executed(effects: &[Effect]) -> &Invocation {
        match effects {
            [Effect::Execute(invocation)] => invocation,
            other => panic!("expected execute, got {:?}", other),
        }
    }

    #[test]
    fn test_startup_without_client_selects_kubeconfig() {
        let mut wizard = Wizard::new(
            MemoryPreferences::default(),
            WizardOptions {
                startup_error: Some("file not found".into()),
                ..Default::default()
            },
        );
        let effects = wizard.start();

        assert!(matches!(effects.as_slice(), [Effect::LoadContexts]));
        assert_eq!(wizard.state(), WizardState::SelectContext(ContextKind::Config));
        assert_eq!(wizard.notice().map(|n| n.level), Some(NoticeLevel::Warning));
        assert_eq!(
            wizard.finish(),
            Err(WizardError::FatalStartup("file not found".into()))
        );
    }

    #[test]
    fn test_startup_uses_last_namespace() {
        let prefs = MemoryPreferences {
            namespace: Some("prod".into()),
            ..Default::default()
        };
        let mut wizard = Wizard::new(
            prefs,
            WizardOptions {
                connected: true,
                ..Default::default()
            },
        );
        let effects = wizard.start();
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadResources { namespace }] if namespace == "prod"
        ));
    }

    #[test]
    fn test_startup_with_deployment_skips_to_actions() {
        let mut wizard = Wizard::new(
            MemoryPreferences::default(),
            WizardOptions {
                resource: Some("web".into()),
                ..options()
            },
        );
        assert!(wizard.start().is_empty());
        assert_eq!(wizard.state(), WizardState::SelectAction);
    }

    #[test]
    fn test_resource_confirm_records_recent() {
        let wizard = at_actions(options());
        assert_eq!(wizard.selection().resource.as_deref(), Some("web"));
        assert_eq!(
            wizard.preferences().recent(RecentCategory::Resources, "default"),
            vec!["web"]
        );
    }

    #[test]
    fn test_confirm_ignored_while_loading() {
        let mut wizard = Wizard::new(MemoryPreferences::default(), options());
        wizard.start();
        assert!(wizard.handle_key(&key(KeyCode::Enter)).is_empty());
        assert_eq!(wizard.state(), WizardState::SelectResource);
    }

    #[test]
    fn test_load_error_stays_inline() {
        let mut wizard = Wizard::new(MemoryPreferences::default(), options());
        wizard.start();
        wizard.handle_message(Message::ResourcesLoaded {
            namespace: "default".into(),
            result: Err(ClientError::Permission("deployments is forbidden".into())),
        });
        assert_eq!(wizard.state(), WizardState::SelectResource);
        let error = wizard.active_selector().and_then(FuzzySelector::error);
        assert_eq!(error, Some("permission denied: deployments is forbidden"));
    }

    #[test]
    fn test_stale_resource_list_ignored() {
        let mut wizard = Wizard::new(MemoryPreferences::default(), options());
        wizard.start();
        wizard.handle_message(Message::ResourcesLoaded {
            namespace: "kube-system".into(),
            result: Ok(items(&["coredns"])),
        });
        assert!(wizard.active_selector().is_some_and(FuzzySelector::is_loading));
    }

    #[test]
    fn test_escape_clears_query_before_going_back() {
        let mut wizard = at_actions(options());
        type_str(&mut wizard, "sc");
        wizard.handle_key(&key(KeyCode::Esc));
        assert_eq!(wizard.state(), WizardState::SelectAction);
        assert_eq!(wizard.active_selector().map(FuzzySelector::query), Some(""));

        let effects = wizard.handle_key(&key(KeyCode::Esc));
        assert_eq!(wizard.state(), WizardState::SelectResource);
        assert!(matches!(effects.as_slice(), [Effect::LoadResources { .. }]));
    }

    #[test]
    fn test_backspace_edits_before_going_back() {
        let mut wizard = at_actions(options());
        type_str(&mut wizard, "s");
        assert!(wizard.handle_key(&key(KeyCode::Backspace)).is_empty());
        assert_eq!(wizard.state(), WizardState::SelectAction);

        wizard.handle_key(&key(KeyCode::Backspace));
        assert_eq!(wizard.state(), WizardState::SelectResource);
    }

    #[test]
    fn test_back_from_first_step_is_noop() {
        let mut wizard = Wizard::new(MemoryPreferences::default(), options());
        wizard.start();
        assert!(wizard.handle_key(&key(KeyCode::Esc)).is_empty());
        assert_eq!(wizard.state(), WizardState::SelectResource);
    }

    #[test]
    fn test_action_needing_instance_loads_pods() {
        let mut wizard = at_actions(options());
        let effects = choose_action(&mut wizard, "logs");
        assert_eq!(wizard.state(), WizardState::SelectSubtarget(SubtargetKind::Instance));
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadInstances { namespace, resource }] if namespace == "default" && resource == "web"
        ));
        assert_eq!(
            wizard.preferences().recent(RecentCategory::Actions, ""),
            vec!["logs - View container logs"]
        );
    }

    #[test]
    fn test_single_subresource_auto_advances() {
        let mut wizard = at_actions(options());
        let effects = choose_action(&mut wizard, "list-env");
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadSubresources { instance: None, .. }]
        ));

        let effects = wizard.handle_message(containers(None, "web-1", &["app"]));
        let invocation = executed(&effects);
        assert_eq!(invocation.action.op, ActionOp::ListEnv);
        assert_eq!(invocation.instance.as_deref(), Some("web-1"));
        assert_eq!(invocation.subresource.as_deref(), Some("app"));
        assert_eq!(wizard.state(), WizardState::Executing);
    }

    #[test]
    fn test_multiple_subresources_prompt() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "list-env");
        let effects = wizard.handle_message(containers(None, "web-1", &["app", "sidecar"]));
        assert!(effects.is_empty());
        assert_eq!(
            wizard.state(),
            WizardState::SelectSubtarget(SubtargetKind::Subresource)
        );

        let effects = choose(&mut wizard, "sidecar");
        assert_eq!(executed(&effects).subresource.as_deref(), Some("sidecar"));
    }

    #[test]
    fn test_pinned_targets_skip_prompts() {
        let mut wizard = at_actions(WizardOptions {
            instance: Some("web-1".into()),
            subresource: Some("app".into()),
            ..options()
        });
        let effects = choose_action(&mut wizard, "logs");
        assert!(matches!(
            effects.as_slice(),
            [Effect::FetchLogs { target, tail: 500 }] if target.pod == "web-1" && target.container.as_deref() == Some("app")
        ));
    }

    #[test]
    fn test_empty_input_is_noop() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "scale");
        assert_eq!(
            wizard.state(),
            WizardState::AwaitInput(InputPurpose::ActionParameter)
        );
        assert_eq!(wizard.input_prompt(), "Enter replica count:");

        type_str(&mut wizard, "  ");
        assert!(wizard.handle_key(&key(KeyCode::Enter)).is_empty());
        assert_eq!(
            wizard.state(),
            WizardState::AwaitInput(InputPurpose::ActionParameter)
        );
    }

    #[test]
    fn test_invalid_input_reports_without_remote_call() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "scale");
        type_str(&mut wizard, "abc");
        let effects = wizard.handle_key(&key(KeyCode::Enter));

        assert!(effects.is_empty());
        assert_eq!(wizard.state(), WizardState::ShowResult);
        assert_eq!(
            wizard.result(),
            Some(&Err(WizardError::Execution("invalid replica count: abc".into())))
        );
    }

    #[test]
    fn test_valid_input_executes() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "scale");
        type_str(&mut wizard, "3");
        let effects = wizard.handle_key(&key(KeyCode::Enter));
        let invocation = executed(&effects);
        assert_eq!(invocation.input, Some(ActionInput::Replicas(3)));
        assert_eq!(invocation.resource, "web");
    }

    #[test]
    fn test_result_confirm_returns_to_actions() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "describe");
        assert_eq!(wizard.state(), WizardState::Executing);

        // Keys other than quit are ignored while running
        assert!(wizard.handle_key(&key(KeyCode::Esc)).is_empty());
        assert_eq!(wizard.state(), WizardState::Executing);

        wizard.handle_message(Message::ExecutionFinished(Ok(ActionOutcome::Text(
            "Name: web".into(),
        ))));
        assert_eq!(wizard.state(), WizardState::ShowResult);
        assert_eq!(wizard.result(), Some(&Ok("Name: web".to_string())));

        wizard.handle_key(&key(KeyCode::Enter));
        assert_eq!(wizard.state(), WizardState::SelectAction);
        assert!(wizard.result().is_none());
    }

    #[test]
    fn test_execution_error_goes_to_result() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "list-pods");
        wizard.handle_message(Message::ExecutionFinished(Err(ClientError::NotFound(
            "deployments \"web\"".into(),
        ))));
        assert_eq!(wizard.state(), WizardState::ShowResult);
        assert!(matches!(wizard.result(), Some(Err(WizardError::Execution(_)))));
    }

    #[test]
    fn test_hand_off_ends_session() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "shell");
        wizard.handle_message(Message::InstancesLoaded {
            resource: "web".into(),
            result: Ok(items(&["web-1 (Running)", "web-2 (Pending)"])),
        });
        let effects = choose(&mut wizard, "web-1 (Running)");
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadSubresources { instance: Some(pod), .. }] if pod == "web-1"
        ));
        assert_eq!(
            wizard.preferences().recent(RecentCategory::Instances, "web"),
            vec!["web-1 (Running)"]
        );

        wizard.handle_message(containers(Some("web-1"), "web-1", &["app"]));
        wizard.handle_message(Message::ExecutionFinished(Ok(ActionOutcome::HandOff {
            detail: Some("/bin/bash".into()),
        })));
        assert!(wizard.should_quit());

        let hand_off = wizard.finish().unwrap().expect("hand-off");
        assert_eq!(hand_off.op, ActionOp::Shell);
        assert_eq!(hand_off.instance.as_deref(), Some("web-1"));
        assert_eq!(hand_off.subresource.as_deref(), Some("app"));
        assert_eq!(hand_off.detail.as_deref(), Some("/bin/bash"));
    }

    #[test]
    fn test_back_skips_auto_selected_step() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "fast-deploy");
        wizard.handle_message(Message::InstancesLoaded {
            resource: "web".into(),
            result: Ok(items(&["web-1 (Running)"])),
        });
        choose(&mut wizard, "web-1 (Running)");
        let effects = wizard.handle_message(containers(Some("web-1"), "web-1", &["app"]));
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadFolders { base_path: "/app/assets", .. }]
        ));
        assert_eq!(
            wizard.state(),
            WizardState::SelectSubtarget(SubtargetKind::AssetFolder)
        );

        // The container was never prompted, so back lands on the pod list
        let effects = wizard.handle_key(&key(KeyCode::Esc));
        assert!(matches!(effects.as_slice(), [Effect::LoadInstances { .. }]));
        assert_eq!(wizard.state(), WizardState::SelectSubtarget(SubtargetKind::Instance));
        assert!(wizard.selection().instance.is_none());
        assert!(wizard.selection().subresource.is_none());

        wizard.handle_key(&key(KeyCode::Esc));
        assert_eq!(wizard.state(), WizardState::SelectAction);
    }

    #[test]
    fn test_container_list_for_previous_pod_is_dropped() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "shell");
        let pods = || Message::InstancesLoaded {
            resource: "web".into(),
            result: Ok(items(&["web-1 (Running)", "web-2 (Running)"])),
        };
        wizard.handle_message(pods());
        choose(&mut wizard, "web-1 (Running)");

        let effects = wizard.handle_key(&key(KeyCode::Esc));
        assert!(matches!(effects.as_slice(), [Effect::LoadInstances { .. }]));
        wizard.handle_message(pods());
        let effects = choose(&mut wizard, "web-2 (Running)");
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadSubresources { instance: Some(pod), .. }] if pod == "web-2"
        ));

        // The reply for web-1 lands after web-2 was chosen
        let effects = wizard.handle_message(containers(Some("web-1"), "web-1", &["web1-only"]));
        assert!(effects.is_empty());
        assert_eq!(
            wizard.state(),
            WizardState::SelectSubtarget(SubtargetKind::Subresource)
        );
        assert!(wizard.active_selector().is_some_and(FuzzySelector::is_loading));

        let effects = wizard.handle_message(containers(Some("web-2"), "web-2", &["app"]));
        let invocation = executed(&effects);
        assert_eq!(invocation.instance.as_deref(), Some("web-2"));
        assert_eq!(invocation.subresource.as_deref(), Some("app"));
    }

    #[test]
    fn test_back_reloads_step_and_drops_stale_folders() {
        let mut wizard = at_actions(options());
        choose_action(&mut wizard, "fast-deploy");
        wizard.handle_message(Message::InstancesLoaded {
            resource: "web".into(),
            result: Ok(items(&["web-1 (Running)"])),
        });
        choose(&mut wizard, "web-1 (Running)");
        wizard.handle_message(containers(Some("web-1"), "web-1", &["app", "sidecar"]));
        let effects = choose(&mut wizard, "app");
        assert!(matches!(effects.as_slice(), [Effect::LoadFolders { .. }]));

        // Back while the folder load is still in flight
        let effects = wizard.handle_key(&key(KeyCode::Esc));
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadSubresources { instance: Some(pod), .. }] if pod == "web-1"
        ));
        assert!(wizard.active_selector().is_some_and(FuzzySelector::is_loading));

        wizard.handle_message(containers(Some("web-1"), "web-1", &["app", "sidecar"]));
        let effects = choose(&mut wizard, "sidecar");
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadFolders { subresource, .. }] if subresource == "sidecar"
        ));

        // Folders listed for "app" do not fill the "sidecar" step
        wizard.handle_message(folders(&["admin"]));
        assert!(wizard.active_selector().is_some_and(FuzzySelector::is_loading));
    }

    #[test]
    fn test_fast_deploy_collects_folder_then_path() {
        let mut wizard = at_actions(WizardOptions {
            instance: Some("web-1".into()),
            subresource: Some("app".into()),
            ..options()
        });
        choose_action(&mut wizard, "fast-deploy");
        wizard.handle_message(folders(&["admin", "shop"]));
        choose(&mut wizard, "shop");
        assert_eq!(wizard.input_prompt(), "Enter local dist folder path:");

        type_str(&mut wizard, "./dist");
        let effects = wizard.handle_key(&key(KeyCode::Enter));
        let invocation = executed(&effects);
        assert_eq!(invocation.folder.as_deref(), Some("shop"));
        assert_eq!(invocation.input, Some(ActionInput::LocalPath("./dist".into())));

        // Back from the input goes to the folder list
        let mut wizard = at_actions(WizardOptions {
            instance: Some("web-1".into()),
            subresource: Some("app".into()),
            ..options()
        });
        choose_action(&mut wizard, "fast-deploy");
        wizard.handle_message(folders(&["admin", "shop"]));
        choose(&mut wizard, "admin");
        wizard.handle_key(&key(KeyCode::Esc));
        assert_eq!(
            wizard.state(),
            WizardState::SelectSubtarget(SubtargetKind::AssetFolder)
        );
    }

    #[test]
    fn test_static_logs_open_viewer() {
        let mut wizard = at_actions(WizardOptions {
            instance: Some("web-1".into()),
            subresource: Some("app".into()),
            ..options()
        });
        choose_action(&mut wizard, "logs");
        wizard.handle_message(Message::LogsFetched(Ok(
            "connect ok\nerror: timeout\nretry ok".into()
        )));
        assert_eq!(wizard.state(), WizardState::ViewLogs);

        let viewer = wizard.log_viewer().expect("viewer");
        assert_eq!(viewer.buffer().total_len(), 3);
        assert!(!viewer.is_streaming());
        assert_eq!(viewer.title(), "web-1/app");
    }

    #[test]
    fn test_follow_logs_stream_and_drop_stale_events() {
        let mut wizard = at_actions(WizardOptions {
            instance: Some("web-1".into()),
            subresource: Some("app".into()),
            ..options()
        });
        let effects = choose_action(&mut wizard, "logs-follow");
        assert!(matches!(
            effects.as_slice(),
            [Effect::StartLogStream { tail: 100, stream: 1, .. }]
        ));
        assert_eq!(wizard.state(), WizardState::ViewLogs);

        for i in 0..3 {
            wizard.handle_message(Message::Stream(StreamEvent {
                stream: 1,
                kind: StreamEventKind::Line(format!("line {}", i)),
            }));
            let viewer = wizard.log_viewer().expect("viewer");
            assert_eq!(viewer.selected(), i);
        }
        wizard.handle_message(Message::Stream(StreamEvent {
            stream: 0,
            kind: StreamEventKind::Line("old stream".into()),
        }));

        let viewer = wizard.log_viewer().expect("viewer");
        assert_eq!(viewer.buffer().total_len(), 3);
        assert!(viewer.is_streaming());
    }

    #[test]
    fn test_stream_failure_is_a_note() {
        let mut wizard = at_actions(WizardOptions {
            instance: Some("web-1".into()),
            subresource: Some("app".into()),
            ..options()
        });
        choose_action(&mut wizard, "logs-follow");
        wizard.handle_message(Message::Stream(StreamEvent {
            stream: 1,
            kind: StreamEventKind::Ended(Some("connection reset".into())),
        }));

        assert_eq!(wizard.state(), WizardState::ViewLogs);
        assert!(!wizard.log_viewer().expect("viewer").is_streaming());
        let notice = wizard.notice().expect("notice");
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.text, "log stream ended: connection reset");
    }

    #[test]
    fn test_exit_logs_stops_stream_and_saves_search() {
        let mut wizard = at_actions(WizardOptions {
            instance: Some("web-1".into()),
            subresource: Some("app".into()),
            ..options()
        });
        choose_action(&mut wizard, "logs-follow");
        type_str(&mut wizard, "err");
        // Typed while the search box is focused, so 'e' did not export
        assert_eq!(wizard.log_viewer().map(LogViewer::search_query), Some("err"));

        let effects = wizard.handle_key(&key(KeyCode::Esc));
        assert!(matches!(effects.first(), Some(Effect::StopLogStream)));
        assert_eq!(wizard.state(), WizardState::SelectAction);
        assert!(wizard.log_viewer().is_none());
        assert_eq!(
            wizard.preferences().recent(RecentCategory::LogSearches, ""),
            vec!["err"]
        );

        // Late lines from the stopped stream are dropped
        wizard.handle_message(Message::Stream(StreamEvent {
            stream: 1,
            kind: StreamEventKind::Line("late".into()),
        }));
        assert!(wizard.log_viewer().is_none());
    }

    #[test]
    fn test_log_viewer_export_and_quit_keys() {
        let mut wizard = at_actions(WizardOptions {
            instance: Some("web-1".into()),
            subresource: Some("app".into()),
            ..options()
        });
        choose_action(&mut wizard, "logs");
        wizard.handle_message(Message::LogsFetched(Ok("a\nb".into())));
        wizard.handle_key(&key(KeyCode::Tab));

        let effects = wizard.handle_key(&key(KeyCode::Char('e')));
        assert!(matches!(
            effects.as_slice(),
            [Effect::ExportLogs { pod, lines }] if pod == "web-1" && lines.len() == 2
        ));

        // Detour keys do nothing inside the viewer
        assert!(wizard.handle_key(&ctrl('n')).is_empty());
        assert_eq!(wizard.state(), WizardState::ViewLogs);

        let effects = wizard.handle_key(&ctrl('c'));
        assert!(matches!(effects.as_slice(), [Effect::StopLogStream]));
        assert!(wizard.should_quit());
    }

    #[test]
    fn test_namespace_detour_returns_to_previous_state() {
        let mut wizard = at_actions(options());
        let effects = wizard.handle_key(&ctrl('n'));
        assert!(matches!(effects.as_slice(), [Effect::LoadNamespaces]));
        assert!(wizard.in_detour());

        // Already choosing a namespace
        assert!(wizard.handle_key(&ctrl('n')).is_empty());

        wizard.handle_message(Message::NamespacesLoaded(Ok(items(&["default", "prod"]))));
        let effects = choose(&mut wizard, "default");
        assert!(effects.is_empty());
        assert_eq!(wizard.state(), WizardState::SelectAction);
        assert!(!wizard.in_detour());
        assert_eq!(wizard.selection().resource.as_deref(), Some("web"));
    }

    #[test]
    fn test_namespace_change_restarts_at_resources() {
        let mut wizard = at_actions(options());
        wizard.handle_key(&ctrl('n'));
        wizard.handle_message(Message::NamespacesLoaded(Ok(items(&["default", "prod"]))));
        let effects = choose(&mut wizard, "prod");

        assert_eq!(wizard.state(), WizardState::SelectResource);
        assert!(matches!(
            effects.as_slice(),
            [Effect::LoadResources { namespace }] if namespace == "prod"
        ));
        assert_eq!(wizard.preferences().last_namespace().as_deref(), Some("prod"));
    }

    #[test]
    fn test_escape_leaves_detour_without_reload() {
        let mut wizard = at_actions(options());
        wizard.handle_key(&ctrl('k'));
        assert_eq!(wizard.state(), WizardState::SelectContext(ContextKind::Config));

        let effects = wizard.handle_key(&key(KeyCode::Esc));
        assert!(effects.is_empty());
        assert_eq!(wizard.state(), WizardState::SelectAction);
        assert!(!wizard.in_detour());
    }

    #[test]
    fn test_kubeconfig_detour_continues_with_namespace() {
        let mut wizard = at_actions(options());
        wizard.handle_key(&ctrl('k'));
        wizard.handle_message(Message::ContextsLoaded(Ok(vec![
            NEW_KUBECONFIG_ENTRY.to_string(),
            "/home/me/.kube/config-prod".to_string(),
        ])));

        let effects = choose(&mut wizard, "/home/me/.kube/config-prod");
        assert!(matches!(
            effects.as_slice(),
            [Effect::Connect { path }] if path == "/home/me/.kube/config-prod"
        ));
        assert!(wizard.is_connecting());

        let effects = wizard.handle_message(Message::Connected {
            path: "/home/me/.kube/config-prod".into(),
            result: Ok(()),
        });
        assert!(matches!(effects.as_slice(), [Effect::LoadNamespaces]));
        assert_eq!(wizard.state(), WizardState::SelectContext(ContextKind::Namespace));
        assert_eq!(
            wizard.preferences().last_context_path().as_deref(),
            Some("/home/me/.kube/config-prod")
        );

        wizard.handle_message(Message::NamespacesLoaded(Ok(items(&["default"]))));
        let effects = choose(&mut wizard, "default");
        // The deployment belonged to the old cluster
        assert_eq!(wizard.state(), WizardState::SelectResource);
        assert!(matches!(effects.as_slice(), [Effect::LoadResources { .. }]));
        assert!(!wizard.in_detour());
    }

    #[test]
    fn test_new_kubeconfig_path_entry() {
        let mut wizard = Wizard::new(MemoryPreferences::default(), WizardOptions::default());
        wizard.start();
        wizard.handle_message(Message::ContextsLoaded(Ok(vec![NEW_KUBECONFIG_ENTRY.to_string()])));

        choose(&mut wizard, NEW_KUBECONFIG_ENTRY);
        assert_eq!(wizard.state(), WizardState::AwaitInput(InputPurpose::ContextPath));
        assert_eq!(wizard.input_prompt(), "Enter kubeconfig file path:");

        // Back returns to the kubeconfig list
        wizard.handle_key(&key(KeyCode::Esc));
        assert_eq!(wizard.state(), WizardState::SelectContext(ContextKind::Config));

        choose(&mut wizard, NEW_KUBECONFIG_ENTRY);
        type_str(&mut wizard, "/tmp/kubeconfig");
        let effects = wizard.handle_key(&key(KeyCode::Enter));
        assert!(matches!(
            effects.as_slice(),
            [Effect::Connect { path }] if path == "/tmp/kubeconfig"
        ));

        wizard.handle_message(Message::Connected {
            path: "/tmp/kubeconfig".into(),
            result: Err(ClientError::Transport("connection refused".into())),
        });
        assert_eq!(wizard.state(), WizardState::SelectContext(ContextKind::Config));
        assert_eq!(wizard.notice().map(|n| n.level), Some(NoticeLevel::Error));
        assert!(matches!(wizard.finish(), Err(WizardError::FatalStartup(_))));
    }

    #[test]
    fn test_detours_need_a_connection() {
        let mut wizard = Wizard::new(MemoryPreferences::default(), WizardOptions::default());
        wizard.start();
        assert!(wizard.handle_key(&ctrl('n')).is_empty());
        assert_eq!(wizard.state(), WizardState::SelectContext(ContextKind::Config));
    }

    #[test]
    fn test_help_overlay_swallows_next_key() {
        let mut wizard = at_actions(options());
        wizard.handle_key(&key(KeyCode::F(1)));
        assert!(wizard.is_help_visible());
        wizard.handle_key(&key(KeyCode::Esc));
        assert!(!wizard.is_help_visible());
        assert_eq!(wizard.state(), WizardState::SelectAction);
    }
}
