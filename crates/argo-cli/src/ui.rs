//! UI utilities for the interactive query loop

use std::io::{self, IsTerminal, Write};

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};

use argo_core::Result;

const PROMPT: &str = "argo>";

/// What the user asked the query loop to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Exit,
    Help,
    /// Blank input, ignored.
    Skip,
    Ask(String),
}

/// Classify one line of user input.
pub fn parse_input(input: &str) -> ReplCommand {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "" => ReplCommand::Skip,
        "exit" | "quit" => ReplCommand::Exit,
        "help" => ReplCommand::Help,
        _ => ReplCommand::Ask(trimmed.to_string()),
    }
}

/// Display startup banner
pub fn display_banner(model_id: &str, documents: usize) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = 60.min(terminal_width.saturating_sub(4)).max(30);
    let inner = banner_width - 2;

    let top_border = format!("┌{}┐", "─".repeat(inner));
    let bottom_border = format!("└{}┘", "─".repeat(inner));
    let empty_line = format!("│{}│", " ".repeat(inner));
    let padded = |text: &str| {
        let width = text.chars().count();
        format!("│  {}{}│", text, " ".repeat(inner.saturating_sub(width + 2)))
    };

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());
    println!("{}", padded("ARGO RAG - ask your float database").blue().bold());
    println!("{}", empty_line.blue());
    println!("{}", padded(&format!("Documents indexed: {}", documents)).blue());
    println!("{}", padded(&format!("Answer model: {}", model_id)).blue());
    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "💡 Tip: Ask a question in plain language, 'help' for commands, 'exit' to leave".dimmed()
    );
    println!();
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask about the indexed tables", "<question>".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  which platforms reported profiles in March?");
    println!("  what is the deepest pressure recorded for float 5900400?");
}

pub fn print_answer(answer: &str) {
    println!("{} {}", "🤖 Answer:".cyan().bold(), answer);
    println!();
}

struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn redraw(input: &str) -> Result<()> {
    print!("\r\x1b[2K{} {}", PROMPT.green().bold(), input);
    io::stdout().flush()?;
    Ok(())
}

/// Read one question, with ↑/↓ history navigation on a terminal.
///
/// Piped input is read line by line. Returns `None` at end of input or on
/// Ctrl-C / Ctrl-D.
pub fn read_question(history: &mut Vec<String>) -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    let raw = RawMode::enable()?;
    let mut input = String::new();
    let mut history_index: Option<usize> = None;
    redraw(&input)?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
        match key_event.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => {
                drop(raw);
                println!();
                return Ok(None);
            }
            KeyCode::Enter => {
                drop(raw);
                println!();
                let input = input.trim().to_string();
                if !input.is_empty() {
                    history.push(input.clone());
                }
                return Ok(Some(input));
            }
            KeyCode::Esc => {
                input.clear();
                history_index = None;
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Up if !history.is_empty() => {
                let idx = match history_index {
                    None => history.len() - 1,
                    Some(idx) => idx.saturating_sub(1),
                };
                history_index = Some(idx);
                input = history[idx].clone();
            }
            KeyCode::Down => match history_index {
                Some(idx) if idx + 1 < history.len() => {
                    history_index = Some(idx + 1);
                    input = history[idx + 1].clone();
                }
                Some(_) => {
                    history_index = None;
                    input.clear();
                }
                None => {}
            },
            _ => continue,
        }
        redraw(&input)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("   "), ReplCommand::Skip);
        assert_eq!(parse_input("EXIT"), ReplCommand::Exit);
        assert_eq!(parse_input(" quit\n"), ReplCommand::Exit);
        assert_eq!(parse_input("help"), ReplCommand::Help);
        assert_eq!(
            parse_input("  how deep did float 5900400 go? "),
            ReplCommand::Ask("how deep did float 5900400 go?".to_string())
        );
    }
}
