use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

use kubenav_types::WizardError;

use crate::ui::{Theme, components::TextInput};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Free-form input, the running indicator and action results
pub struct PromptScreen;

impl PromptScreen {
    pub fn render_input(
        frame: &mut Frame,
        area: Rect,
        prompt: &str,
        input: &TextInput,
        theme: &Theme,
    ) {
        let lines = vec![
            Line::from(Span::styled(prompt, theme.title)),
            Line::from(""),
            input.line("> ", "", true, theme),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to submit, Esc to go back",
                theme.text_dim,
            )),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    pub fn render_executing(
        frame: &mut Frame,
        area: Rect,
        action: &str,
        spinner: usize,
        theme: &Theme,
    ) {
        let glyph = SPINNER[spinner % SPINNER.len()];
        let line = Line::from(vec![
            Span::styled(glyph, theme.prompt),
            Span::styled(format!(" Running {}...", action), theme.text),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    pub fn render_result(
        frame: &mut Frame,
        area: Rect,
        result: &Result<String, WizardError>,
        theme: &Theme,
    ) {
        let mut lines = Vec::new();
        match result {
            Ok(text) => {
                lines.push(Line::from(Span::styled("✓ Done", theme.success)));
                lines.push(Line::from(""));
                lines.extend(text.lines().map(|l| Line::from(Span::styled(l, theme.text))));
            }
            Err(err) => {
                lines.push(Line::from(Span::styled("✗ Failed", theme.error)));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(err.to_string(), theme.error)));
            }
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter to pick another action, Esc to go back",
            theme.text_dim,
        )));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }
}
