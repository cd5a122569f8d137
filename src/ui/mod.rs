mod components;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Popup, PredictionResult};
use crate::form::{self, CATEGORICAL_LAYOUT, NUMERIC_LAYOUT};
use crate::predict::display_score;

/// Each field box is a bordered single line
const FIELD_HEIGHT: u16 = 3;

/// Result or error panel, reserved whenever there is something to show
const PANEL_HEIGHT: u16 = 4;

/// Info line, title, section borders, submit button and footer
const CHROME_HEIGHT: u16 = 1 + 1 + 2 + 2 + 3 + 1;

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let numeric_rows = NUMERIC_LAYOUT.len().div_ceil(2) as u16;
    let categorical_rows = CATEGORICAL_LAYOUT.len().div_ceil(2) as u16;
    let panel_height = if app.result.is_some() { PANEL_HEIGHT } else { 0 };

    // Responsive layout based on terminal height: short terminals drop the
    // field borders so the result panel always fits
    let full_height = CHROME_HEIGHT + (numeric_rows + categorical_rows) * FIELD_HEIGHT + panel_height;
    let compact = area.height < full_height;
    let field_height = if compact { 1 } else { FIELD_HEIGHT };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),                                  // Info line
            Constraint::Length(1),                                  // Title
            Constraint::Length(numeric_rows * field_height + 2),    // Numeric section
            Constraint::Length(categorical_rows * field_height + 2), // Categorical section
            Constraint::Length(3),                                  // Submit button
            Constraint::Length(panel_height),                       // Result / error panel
            Constraint::Min(0),
            Constraint::Length(1),                                  // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_title(f, app, chunks[1]);
    draw_section(f, app, chunks[2], " Numeric Variables ", &NUMERIC_LAYOUT, compact);
    draw_section(f, app, chunks[3], " Categorical Variables ", &CATEGORICAL_LAYOUT, compact);
    draw_submit_button(f, app, chunks[4]);
    draw_result_panel(f, app, chunks[5]);
    draw_footer(f, app, chunks[7]);

    if app.popup == Popup::Help {
        draw_help_popup(f, app);
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    // Priority: status message > request in flight > endpoint
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status, Style::default().fg(t.danger)))
    } else if app.in_flight > 0 {
        Line::from(vec![
            Span::styled("󰔟 ", Style::default().fg(t.accent)),
            Span::styled("Submitting…", Style::default().fg(t.text)),
        ])
    } else {
        Line::from(vec![
            Span::styled("Ready", Style::default().fg(t.text_dim)),
            Span::styled(" │ ", Style::default().fg(t.inactive)),
            Span::styled(app.endpoint(), Style::default().fg(t.text_dim)),
        ])
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_title(f: &mut Frame, app: &App, area: Rect) {
    let title = Paragraph::new(Span::styled(
        "Exam Score Predictor",
        Style::default().fg(app.theme.text).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    f.render_widget(title, area);
}

/// Bordered section laying its fields out two per row. In compact mode each
/// field is a single `Label: value` line.
fn draw_section(f: &mut Frame, app: &App, area: Rect, title: &str, keys: &[&str], compact: bool) {
    let t = &app.theme;
    let has_focus = app.focused_key().is_some_and(|k| keys.contains(&k));
    let border = if has_focus { t.accent } else { t.inactive };

    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(t.accent).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(keys.chunks(2).map(|_| Constraint::Length(if compact { 1 } else { FIELD_HEIGHT })))
        .split(inner);

    for (row, pair) in rows.iter().zip(keys.chunks(2)) {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(*row);

        for (cell, key) in cells.iter().zip(pair) {
            let Some(field) = form::field(key) else { continue };
            if field.is_numeric() {
                f.render_widget(components::number_field(field.label, field.key, compact, app), *cell);
            } else {
                f.render_widget(
                    components::select_field(field.label, field.key, field.options(), compact, app),
                    *cell,
                );
            }
        }
    }
}

fn draw_submit_button(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let focused = app.focused_key().is_none();
    let (border, style) = if focused {
        (
            t.accent,
            Style::default().fg(t.text).bg(t.bg_selected).add_modifier(Modifier::BOLD),
        )
    } else {
        (t.inactive, Style::default().fg(t.accent).add_modifier(Modifier::BOLD))
    };

    let button = Paragraph::new(Span::styled("Predict Score", style))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        );
    f.render_widget(button, area);
}

fn draw_result_panel(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let Some(result) = &app.result else { return };

    let panel = match result {
        PredictionResult::Score(score) => Paragraph::new(vec![
            Line::from(Span::styled(
                display_score(*score),
                Style::default().fg(t.success).add_modifier(Modifier::BOLD),
            )),
        ])
        .block(
            Block::default()
                .title(Span::styled(" PREDICTED SCORE ", Style::default().fg(t.success)))
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(t.success)),
        ),
        PredictionResult::Error(message) => Paragraph::new(Line::from(Span::styled(
            format!("Error: {}", message),
            Style::default().fg(t.danger).add_modifier(Modifier::BOLD),
        )))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(t.danger)),
        ),
    };

    f.render_widget(panel.alignment(Alignment::Center), area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;
    let hints: Vec<(&str, &str)> = match app.focused_key().and_then(form::field) {
        Some(field) if field.is_numeric() => vec![
            ("0-9", "Edit"),
            ("⌫", "Erase"),
            ("↑↓", "Nav"),
            ("Enter", "Predict"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
        Some(_) => vec![
            ("←→", "Choose"),
            ("↑↓", "Nav"),
            ("Enter", "Predict"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
        None => vec![
            ("Enter", "Predict"),
            ("↑↓", "Nav"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 4 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(t.accent)),
                Span::styled(format!(" {} │ ", action), Style::default().fg(t.text_dim)),
            ]
        })
        .collect();

    f.render_widget(Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center), area);
}

fn draw_help_popup(f: &mut Frame, app: &App) {
    let t = &app.theme;
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 30 { 90 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(title, Style::default().fg(t.accent).add_modifier(Modifier::BOLD)))
    };
    let binding = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(keys, Style::default().fg(t.accent)),
            Span::styled(what, Style::default().fg(t.text)),
        ])
    };

    let help_text = vec![
        section("═══ Navigation ═══"),
        binding("  Tab/↓ j   ", "Next input"),
        binding("  S-Tab/↑ k ", "Previous input"),
        Line::from(""),
        section("═══ Editing ═══"),
        binding("  0-9 . - e ", "Type into a number field"),
        binding("  Backspace ", "Erase last character"),
        binding("  Delete    ", "Clear number field"),
        binding("  ←/→ Space ", "Change a categorical choice"),
        Line::from(""),
        section("═══ Prediction ═══"),
        binding("  Enter     ", "Send the form to the prediction service"),
        Line::from(vec![
            Span::styled("  Endpoint: ", Style::default().fg(t.text_dim)),
            Span::styled(app.endpoint(), Style::default().fg(t.text)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(t.text_dim)),
            Span::styled("?", Style::default().fg(t.accent)),
            Span::styled("/", Style::default().fg(t.text_dim)),
            Span::styled("Esc", Style::default().fg(t.accent)),
            Span::styled(" to close", Style::default().fg(t.text_dim)),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" 󰋖 examscore Help ", Style::default().fg(t.accent)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(t.accent)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        render_at(app, 90, 40)
    }

    fn render_at(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_form_layout() {
        let app = App::new(AppConfig::default()).unwrap();
        let screen = render(&app);

        for expected in [
            "Exam Score Predictor",
            "Numeric Variables",
            "Categorical Variables",
            "Attendance (%)",
            "Internet Access",
            "self-study",
            "Predict Score",
        ] {
            assert!(screen.contains(expected), "missing {expected:?}");
        }
        assert!(!screen.contains("PREDICTED SCORE"));
        assert!(!screen.contains("Error:"));
    }

    #[test]
    fn test_score_panel_rounds() {
        let mut app = App::new(AppConfig::default()).unwrap();
        app.result = Some(PredictionResult::Score(87.456));
        let screen = render(&app);

        assert!(screen.contains("PREDICTED SCORE"));
        assert!(screen.contains("87.46"));
        assert!(!screen.contains("87.456"));
    }

    #[test]
    fn test_error_panel() {
        let mut app = App::new(AppConfig::default()).unwrap();
        app.result = Some(PredictionResult::Error("bad input".into()));
        let screen = render(&app);

        assert!(screen.contains("Error: bad input"));
        assert!(!screen.contains("PREDICTED SCORE"));
    }

    #[test]
    fn test_score_fits_small_terminal() {
        let mut app = App::new(AppConfig::default()).unwrap();
        app.result = Some(PredictionResult::Score(87.456));
        let screen = render_at(&app, 80, 24);

        assert!(screen.contains("PREDICTED SCORE"));
        assert!(screen.contains("87.46"));
        for label in ["Age", "Attendance (%)", "Exam Difficulty", "Internet Access", "Predict Score"] {
            assert!(screen.contains(label), "missing {label:?}");
        }
    }

    #[test]
    fn test_error_fits_small_terminal() {
        let mut app = App::new(AppConfig::default()).unwrap();
        app.result = Some(PredictionResult::Error("bad input".into()));
        let screen = render_at(&app, 80, 24);

        assert!(screen.contains("Error: bad input"));
        assert!(screen.contains("Sleep Quality: average"));
    }

    #[test]
    fn test_tall_terminal_keeps_field_boxes() {
        let mut app = App::new(AppConfig::default()).unwrap();
        app.result = Some(PredictionResult::Score(90.0));
        let screen = render_at(&app, 90, 40);

        assert!(screen.contains(" Sleep Quality "));
        assert!(!screen.contains("Sleep Quality:"));
    }

    #[test]
    fn test_help_popup_renders() {
        let mut app = App::new(AppConfig::default()).unwrap();
        app.popup = Popup::Help;
        let screen = render(&app);

        assert!(screen.contains("examscore Help"));
        assert!(screen.contains("localhost:5000/predict"));
    }
}
