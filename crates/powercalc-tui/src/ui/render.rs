use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use powercalc_core::calculators::Calculator;
use powercalc_core::utils::truncate_string;

use crate::app::{App, AppState, Focus, ResultLine};

use super::styles;

/// Width of the label column in the form
const LABEL_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Calculator selector
            Constraint::Min(8),    // Form
            Constraint::Length(4), // Result
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_selector(frame, app, chunks[1]);
    render_form(frame, app, chunks[2]);
    render_result(frame, app, chunks[3]);
    render_status_bar(frame, app, chunks[4]);

    // Render overlays
    match app.state {
        AppState::SelectingCalculator => render_dropdown_overlay(frame, app, chunks[1]),
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("  {}", app.title);
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title.clone(), styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.chars().count() + help_hint.len() + 4),
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_selector(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Selector;

    let line = Line::from(vec![
        Span::styled(" ▼ ", styles::muted_style()),
        Span::styled(app.calculator.name(), styles::input_style(focused)),
    ]);

    let block = Block::default()
        .title(" Calculator ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_form(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::from("")];

    for (i, (field, value)) in app.inputs().iter().zip(&app.field_values).enumerate() {
        let focused = app.focus == Focus::Field(i);
        let marker = if focused { "▶ " } else { "  " };

        let mut spans = vec![
            Span::styled(marker, styles::highlight_style()),
            Span::styled(
                format!("{:<width$}", field.label, width = LABEL_WIDTH),
                styles::label_style(),
            ),
            Span::styled("[", styles::muted_style()),
        ];
        if value.is_empty() && !focused {
            spans.push(Span::styled(field.hint, styles::muted_style()));
        } else {
            spans.push(Span::styled(value.clone(), styles::input_style(focused)));
        }
        if focused {
            spans.push(Span::styled("_", styles::highlight_style()));
        }
        spans.push(Span::styled("]", styles::muted_style()));

        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(
            "[ Compute ]",
            styles::button_style(app.focus == Focus::Compute),
        ),
        Span::raw("  "),
        Span::styled("[ Clear ]", styles::button_style(app.focus == Focus::Clear)),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(matches!(
            app.focus,
            Focus::Field(_) | Focus::Compute | Focus::Clear
        )));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_result(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.result {
        Some(result) => {
            let style = match result {
                ResultLine::Value(_) => styles::success_style(),
                ResultLine::Error(_) => styles::error_style(),
            };
            Line::from(Span::styled(format!(" {}", result.text()), style))
        }
        None => Line::from(Span::styled(
            " Fill in the fields and press Enter",
            styles::muted_style(),
        )),
    };

    let block = Block::default()
        .title(" Result ")
        .borders(Borders::ALL)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(line).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[Tab] next | [Enter] compute | [Esc] clear | [q]uit";

    let right_text = format!(" {} ", shortcuts);
    let width = area.width as usize;

    let message = match app.status_message {
        Some(ref msg) => msg.clone(),
        None => app.cache_status.summary(),
    };
    let room = width.saturating_sub(right_text.len() + 2);
    let left_text = format!(" {} ", truncate_string(&message, room));

    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn render_dropdown_overlay(frame: &mut Frame, app: &App, anchor: Rect) {
    let height = Calculator::ALL.len() as u16 + 2;
    let frame_area = frame.area();
    let area = Rect::new(
        anchor.x,
        anchor.y + anchor.height.saturating_sub(1),
        anchor.width.min(40),
        height.min(frame_area.height.saturating_sub(anchor.y + anchor.height)),
    );

    frame.render_widget(Clear, area);

    let lines: Vec<Line> = Calculator::ALL
        .iter()
        .enumerate()
        .map(|(i, calculator)| {
            if i == app.dropdown_selection {
                Line::from(Span::styled(
                    format!(" {} ", calculator.name()),
                    styles::selected_style(),
                ))
            } else {
                Line::from(Span::styled(
                    format!(" {} ", calculator.name()),
                    styles::label_style(),
                ))
            }
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(50, 17, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  PowerCalc", styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Form", styles::highlight_style())),
        help_line("Tab/↓", "Next field"),
        help_line("S-Tab/↑", "Previous field"),
        help_line("Enter", "Compute / open selector"),
        help_line("c", "Choose calculator"),
        help_line("Esc", "Clear fields"),
        Line::from(""),
        Line::from(Span::styled(" Inputs", styles::highlight_style())),
        help_line("0-9 . , -", "Numbers; commas are ignored"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 7, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect_fixed(40, 10, outer), Rect::new(30, 15, 40, 10));

        // Clamped to a small terminal
        let small = Rect::new(0, 0, 20, 5);
        assert_eq!(centered_rect_fixed(40, 10, small), Rect::new(0, 0, 20, 5));
    }
}
