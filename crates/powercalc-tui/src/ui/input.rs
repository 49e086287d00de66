//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use powercalc_core::calculators::Calculator;

use crate::app::{App, AppState, Focus};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    if matches!(app.state, AppState::SelectingCalculator) {
        handle_selector_input(app, key);
        return Ok(false);
    }

    handle_form_input(app, key);
    Ok(false)
}

fn handle_selector_input(app: &mut App, key: KeyEvent) {
    let count = Calculator::ALL.len();
    match key.code {
        KeyCode::Up | KeyCode::BackTab => {
            app.dropdown_selection = (app.dropdown_selection + count - 1) % count;
        }
        KeyCode::Down | KeyCode::Tab => {
            app.dropdown_selection = (app.dropdown_selection + 1) % count;
        }
        KeyCode::Home => app.dropdown_selection = 0,
        KeyCode::End => app.dropdown_selection = count - 1,
        KeyCode::Enter => app.select_calculator(app.dropdown_selection),
        KeyCode::Esc => app.state = AppState::Normal,
        _ => {}
    }
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::Down => app.focus_next(),
        KeyCode::BackTab | KeyCode::Up => app.focus_prev(),
        KeyCode::Enter => match app.focus {
            Focus::Selector => app.open_selector(),
            Focus::Field(_) | Focus::Compute => app.compute(),
            Focus::Clear => app.clear(),
        },
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Esc => app.clear(),
        KeyCode::Char(c) => {
            // Numeric characters go to the focused field, anything else is a shortcut
            if app.push_char(c) {
                return;
            }
            match c {
                'q' => app.state = AppState::ConfirmingQuit,
                '?' => app.state = AppState::ShowingHelp,
                'c' => app.open_selector(),
                _ => {}
            }
        }
        _ => {}
    }
}
