//! Input widgets bound to the form state

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::App;

fn field_block<'a>(label: &'a str, focused: bool, app: &App) -> Block<'a> {
    let t = &app.theme;
    let (border, title) = if focused {
        (t.accent, Style::default().fg(t.accent).add_modifier(Modifier::BOLD))
    } else {
        (t.inactive, Style::default().fg(t.text_dim))
    };

    Block::default()
        .title(Span::styled(format!(" {} ", label), title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

/// Borderless variant: the label leads the value on the same line
fn with_label<'a>(label: &'a str, focused: bool, app: &App, mut line: Line<'a>) -> Line<'a> {
    let t = &app.theme;
    let style = if focused {
        Style::default().fg(t.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(t.text_dim)
    };
    line.spans.insert(0, Span::styled(format!("{}: ", label), style));
    line
}

fn framed<'a>(label: &'a str, focused: bool, compact: bool, app: &App, line: Line<'a>) -> Paragraph<'a> {
    if compact {
        Paragraph::new(with_label(label, focused, app, line))
    } else {
        Paragraph::new(line).block(field_block(label, focused, app))
    }
}

/// Free-form number input showing the raw value
pub fn number_field<'a>(label: &'a str, key: &str, compact: bool, app: &'a App) -> Paragraph<'a> {
    let t = &app.theme;
    let focused = app.is_focused(key);
    let value = app.form.get(key).unwrap_or_default();

    let mut spans = vec![Span::styled(value, Style::default().fg(t.text))];
    if focused {
        spans.push(Span::styled("_", Style::default().fg(t.accent)));
    }

    framed(label, focused, compact, app, Line::from(spans))
}

/// Dropdown-style input limited to `options`
pub fn select_field<'a>(
    label: &'a str,
    key: &str,
    options: &[&str],
    compact: bool,
    app: &'a App,
) -> Paragraph<'a> {
    let t = &app.theme;
    let focused = app.is_focused(key);
    let value = app.form.get(key).unwrap_or_default();
    let position = options
        .iter()
        .position(|o| *o == value)
        .map(|i| format!("  {}/{}", i + 1, options.len()))
        .unwrap_or_default();

    let line = if focused {
        Line::from(vec![
            Span::styled("◀ ", Style::default().fg(t.accent)),
            Span::styled(value, Style::default().fg(t.text).add_modifier(Modifier::BOLD)),
            Span::styled(" ▶", Style::default().fg(t.accent)),
            Span::styled(position, Style::default().fg(t.text_dim)),
        ])
    } else {
        Line::from(Span::styled(value, Style::default().fg(t.text)))
    };

    framed(label, focused, compact, app, line)
}
