//! Terminal output: status notes and aligned tables.

use std::io::{self, IsTerminal, Write};

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Success => "OK",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Level::Info => "\x1b[36m",
            Level::Success => "\x1b[32m",
            Level::Warn => "\x1b[33m",
            Level::Error => "\x1b[31m",
        }
    }

    /// Warnings and errors go to stderr so stdout stays parseable.
    fn to_stderr(self) -> bool {
        matches!(self, Level::Warn | Level::Error)
    }
}

fn color_enabled(terminal: bool) -> bool {
    terminal && std::env::var_os("NO_COLOR").is_none()
}

fn format_note(level: Level, msg: &str, color: bool) -> String {
    if color {
        format!("{}{BOLD}{}{RESET} {msg}", level.color(), level.label())
    } else {
        format!("{}: {msg}", level.label())
    }
}

fn note(level: Level, msg: &str) {
    if level.to_stderr() {
        let color = color_enabled(io::stderr().is_terminal());
        let _ = writeln!(io::stderr(), "{}", format_note(level, msg, color));
    } else {
        let color = color_enabled(io::stdout().is_terminal());
        let _ = writeln!(io::stdout(), "{}", format_note(level, msg, color));
    }
}

pub fn note_info(msg: &str) {
    note(Level::Info, msg);
}

pub fn note_success(msg: &str) {
    note(Level::Success, msg);
}

pub fn note_warn(msg: &str) {
    note(Level::Warn, msg);
}

pub fn note_error(msg: &str) {
    note(Level::Error, msg);
}

/// Wrap `text` in `style` when stdout is a color terminal.
pub fn styled(style: &str, text: &str) -> String {
    if color_enabled(io::stdout().is_terminal()) {
        format!("{style}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Left-aligned columns under a header and a dashed rule. Cells are plain
/// text; only the header is styled, after padding.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    table(headers, rows, color_enabled(io::stdout().is_terminal()))
}

fn table(headers: &[&str], rows: &[Vec<String>], color: bool) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = line(&widths, headers.iter().copied());
    let mut out = if color {
        format!("{BOLD}{header}{RESET}")
    } else {
        header
    };
    out.push('\n');
    let rules: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(&widths, rules.iter().map(String::as_str)));
    out.push('\n');
    for row in rows {
        out.push_str(&line(&widths, row.iter().map(String::as_str)));
        out.push('\n');
    }
    out
}

fn line<'a>(widths: &[usize], mut cells: impl Iterator<Item = &'a str>) -> String {
    let padded: Vec<String> = widths
        .iter()
        .map(|&width| format!("{:<width$}", cells.next().unwrap_or("")))
        .collect();
    format!("  {}", padded.join("  ").trim_end())
}
