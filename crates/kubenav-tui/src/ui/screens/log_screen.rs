use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use kubenav_logs::{LineFilter, truncate};

use super::wizard_screen::notice_style;
use crate::app::Notice;
use crate::ui::{
    Layout, Theme,
    components::{LogViewer, StatusBar, log_viewer_hints},
};

/// Search, line list and detail panes of the log viewer
pub struct LogScreen;

impl LogScreen {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        viewer: &LogViewer,
        notice: Option<&Notice>,
        theme: &Theme,
    ) {
        let areas = Layout::log_viewer(area, viewer.list_height());
        let filter = viewer.buffer().filter();

        Self::render_search(frame, areas.search, areas.hint, viewer, theme);
        Self::render_list(frame, areas.list, viewer, filter, theme);
        Self::render_detail(frame, areas.detail, viewer, filter, theme);

        let mut status = StatusBar::new(theme).hints(log_viewer_hints(viewer.is_search_focused()));
        if let Some(notice) = notice {
            status = status.right(notice.text.clone(), notice_style(notice, theme));
        }
        frame.render_widget(status, areas.status);
    }

    fn render_search(
        frame: &mut Frame,
        search_area: Rect,
        hint_area: Rect,
        viewer: &LogViewer,
        theme: &Theme,
    ) {
        let line = viewer.search_input().line(
            "🔍 ",
            "Type to search...",
            viewer.is_search_focused(),
            theme,
        );
        frame.render_widget(Paragraph::new(line), search_area);

        if !viewer.recent_searches().is_empty() {
            let hint = format!("Recent: {}", viewer.recent_searches().join(", "));
            let hint = truncate(&hint, hint_area.width as usize).into_owned();
            frame.render_widget(
                Paragraph::new(Span::styled(hint, theme.text_dim)),
                hint_area,
            );
        }
    }

    fn render_list(
        frame: &mut Frame,
        area: Rect,
        viewer: &LogViewer,
        filter: &LineFilter,
        theme: &Theme,
    ) {
        let buffer = viewer.buffer();
        let width = viewer.list_width();

        let mut lines = Vec::new();
        for index in viewer.visible_range() {
            let Some(text) = buffer.visible_line(index) else {
                break;
            };
            let selected = index == viewer.selected();
            let base = if selected {
                theme.list_item_selected
            } else {
                theme.list_item
            };
            let marker = if selected { "▶ " } else { "  " };
            let shown = truncate(text, width.saturating_sub(2));

            let mut spans = vec![Span::styled(marker, base)];
            spans.extend(
                highlight_line(&shown, filter, base, theme.search_match)
                    .spans
                    .into_iter()
                    .map(|s| Span::styled(s.content.into_owned(), s.style)),
            );
            lines.push(Line::from(spans));
        }
        if lines.is_empty() {
            let text = if buffer.total_len() == 0 {
                "No log lines"
            } else {
                "No matching lines"
            };
            lines.push(Line::from(Span::styled(text, theme.text_dim)));
        }

        let mut title = vec![Span::styled(format!(" {} ", viewer.title()), theme.title)];
        if viewer.is_streaming() {
            title.push(Span::styled("● LIVE ", theme.live));
            if !viewer.is_following() {
                title.push(Span::styled("(paused) ", theme.text_dim));
            }
        }

        let counts = format!(
            " {}/{} lines • Selected: {} ",
            buffer.visible_len(),
            buffer.total_len(),
            if buffer.visible_len() == 0 {
                0
            } else {
                viewer.selected() + 1
            }
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if viewer.is_search_focused() {
                theme.border
            } else {
                theme.border_focused
            })
            .title(Line::from(title))
            .title_bottom(Line::from(Span::styled(counts, theme.text_dim)).right_aligned());

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_detail(
        frame: &mut Frame,
        area: Rect,
        viewer: &LogViewer,
        filter: &LineFilter,
        theme: &Theme,
    ) {
        let wrapped = viewer.detail_lines();
        let height = viewer.detail_height();
        // The last row gives way to a marker when the entry does not fit
        let shown = if wrapped.len() > height {
            height.saturating_sub(1)
        } else {
            wrapped.len()
        };
        let mut lines: Vec<Line> = wrapped
            .iter()
            .take(shown)
            .map(|l| highlight_line(l, filter, theme.text, theme.search_match))
            .collect();
        if shown < wrapped.len() {
            let more = format!("… {} more lines", wrapped.len() - shown);
            lines.push(Line::from(Span::styled(more, theme.text_dim)));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border)
            .title(Span::styled(" Full entry ", theme.title));

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

/// Split `text` into spans, styling every occurrence of the filter query
pub fn highlight_line<'a>(
    text: &'a str,
    filter: &LineFilter,
    base: Style,
    highlight: Style,
) -> Line<'a> {
    let mut spans = Vec::new();
    let mut last = 0;
    for (start, end) in filter.find_matches(text) {
        if start > last {
            spans.push(Span::styled(&text[last..start], base));
        }
        spans.push(Span::styled(&text[start..end], base.patch(highlight)));
        last = end;
    }
    if last < text.len() {
        spans.push(Span::styled(&text[last..], base));
    }
    Line::from(spans)
}
