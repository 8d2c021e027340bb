//! Output formatting helpers for the `formulary` CLI.
//!
//! JSON output, aligned tables, and a small colour palette that switches
//! itself off when stdout is not a terminal.

use std::env;
use std::io::{self, Write};

use owo_colors::OwoColorize;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// Determines if ANSI colour codes should be used.
///
/// `NO_COLOR` (any value) and `TERM=dumb` disable colour; `CLICOLOR_FORCE`
/// forces it. Otherwise colour follows TTY detection.
pub fn supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if env::var("TERM").as_deref() == Ok("dumb") {
        return false;
    }
    if env::var_os("CLICOLOR_FORCE").is_some() {
        return true;
    }
    crossterm::tty::IsTty::is_tty(&io::stdout())
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c);
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54);
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78);
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80);
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff);

fn paint(text: &str, (r, g, b): (u8, u8, u8)) -> String {
    if supports_color() {
        text.truecolor(r, g, b).to_string()
    } else {
        text.to_string()
    }
}

/// Section heading.
pub fn heading(text: &str) -> String {
    if supports_color() {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// A formula or function name.
pub fn accent(text: &str) -> String {
    paint(text, ACCENT)
}

pub fn muted(text: &str) -> String {
    paint(text, MUTED)
}

pub fn warn(text: &str) -> String {
    paint(text, WARN)
}

pub fn pass_fail(passed: bool) -> String {
    if passed {
        paint("PASS", PASS)
    } else {
        paint("FAIL", FAIL)
    }
}

/// A `[0, 1]` score with two decimals, coloured by band.
pub fn score(value: f64) -> String {
    let text = format!("{value:.2}");
    if value >= 0.8 {
        paint(&text, PASS)
    } else if value >= 0.5 {
        paint(&text, WARN)
    } else {
        paint(&text, FAIL)
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Serialize `value` as pretty JSON to stdout.
///
/// Exits with status 1 if serialization fails.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a simple table with headers and rows.
///
/// Column widths are computed from the data for alignment.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = handle.write_all(render_table(headers, rows).as_bytes());
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<String>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths.get(i).copied().unwrap_or(0)))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = line(headers.iter().map(|h| h.to_string()).collect());
    out.push_str(&line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        out.push_str(&line(row.clone()));
    }
    out
}

/// Print `label: value` with the label padded to `width`.
pub fn field(label: &str, value: impl std::fmt::Display, width: usize) {
    println!("  {}  {}", muted(&format!("{label:<width$}")), value);
}

/// Print a bulleted list under a heading; nothing when empty.
pub fn list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{}", heading(title));
    for item in items {
        println!("  - {item}");
    }
}
