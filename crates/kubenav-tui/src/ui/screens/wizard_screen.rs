use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use kubenav_types::PreferenceStore;

use super::{LogScreen, PromptScreen};
use crate::app::{Notice, NoticeLevel, Wizard, WizardState};
use crate::ui::{
    Layout, Theme,
    components::{HelpOverlay, SelectorView, StatusBar, selector_hints},
};

/// Top-level renderer: picks the screen for the wizard's current state
pub struct WizardScreen;

impl WizardScreen {
    pub fn render<P: PreferenceStore>(frame: &mut Frame, wizard: &Wizard<P>, theme: &Theme) {
        if wizard.state() == WizardState::ViewLogs {
            if let Some(viewer) = wizard.log_viewer() {
                LogScreen::render(frame, frame.area(), viewer, wizard.notice(), theme);
            }
        } else {
            let (header_area, content_area, status_area) = Layout::main(frame.area());
            Self::render_header(frame, header_area, wizard, theme);
            Self::render_content(frame, content_area, wizard, theme);
            Self::render_status_bar(frame, status_area, wizard, theme);
        }

        if wizard.is_help_visible() {
            HelpOverlay::render(frame, theme);
        }
    }

    fn render_header<P: PreferenceStore>(
        frame: &mut Frame,
        area: Rect,
        wizard: &Wizard<P>,
        theme: &Theme,
    ) {
        let selection = wizard.selection();
        let separator = || Span::styled(" │ ", theme.text_dim);

        let mut spans = vec![Span::styled("kubenav", theme.title)];
        if !wizard.is_connected() {
            spans.push(separator());
            spans.push(Span::styled(
                "⚠ No kubeconfig found or configured",
                theme.warning,
            ));
        } else {
            let kubeconfig = selection
                .kubeconfig
                .as_deref()
                .map(short_path)
                .unwrap_or("default");
            spans.push(separator());
            spans.push(Span::styled(kubeconfig, theme.text));
            spans.push(separator());
            spans.push(Span::styled(
                selection.namespace.as_deref().unwrap_or("-"),
                theme.text,
            ));
            if let Some(resource) = &selection.resource {
                spans.push(separator());
                spans.push(Span::styled(resource.as_str(), theme.list_item_selected));
            }
        }

        spans.push(separator());
        spans.push(Span::styled(wizard.state().label(), theme.prompt));
        if wizard.in_detour() {
            spans.push(Span::styled(" (detour)", theme.text_dim));
        }

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border),
        );
        frame.render_widget(header, area);
    }

    fn render_content<P: PreferenceStore>(
        frame: &mut Frame,
        area: Rect,
        wizard: &Wizard<P>,
        theme: &Theme,
    ) {
        let body = Layout::centered(area, 80);
        match wizard.state() {
            WizardState::AwaitInput(_) => {
                PromptScreen::render_input(frame, body, wizard.input_prompt(), wizard.input(), theme)
            }
            WizardState::Executing => {
                let name = wizard.selection().action.map(|a| a.name).unwrap_or("action");
                PromptScreen::render_executing(frame, body, name, wizard.spinner_frame(), theme)
            }
            WizardState::ShowResult => {
                if let Some(result) = wizard.result() {
                    PromptScreen::render_result(frame, body, result, theme);
                }
            }
            _ => {
                if let Some(selector) = wizard.active_selector() {
                    frame.render_widget(SelectorView::new(selector, theme), body);
                }
            }
        }
    }

    fn render_status_bar<P: PreferenceStore>(
        frame: &mut Frame,
        area: Rect,
        wizard: &Wizard<P>,
        theme: &Theme,
    ) {
        let hints = match wizard.state() {
            WizardState::AwaitInput(_) => vec![("Enter", "Submit"), ("Esc", "Back"), ("^C", "Quit")],
            WizardState::Executing => vec![("^C", "Quit")],
            WizardState::ShowResult => vec![("Enter", "Continue"), ("Esc", "Back"), ("^C", "Quit")],
            _ => selector_hints(),
        };

        let mut status = StatusBar::new(theme).hints(hints);
        if let Some(notice) = wizard.notice() {
            status = status.right(notice.text.clone(), notice_style(notice, theme));
        }
        frame.render_widget(status, area);
    }
}

/// Style for a status note
pub(crate) fn notice_style(notice: &Notice, theme: &Theme) -> Style {
    match notice.level {
        NoticeLevel::Info => theme.success,
        NoticeLevel::Warning => theme.warning,
        NoticeLevel::Error => theme.error,
    }
}

/// File name of a kubeconfig path
fn short_path(path: &str) -> &str {
    path.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(path)
}
