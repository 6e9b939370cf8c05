//! Terminal output.
//!
//! `log!` prints a line with a colored `[module]` prefix, `debug!` does the
//! same only in verbose mode. Watch mode reports each reconciliation round
//! on a status line that overwrites the previous one.
//!
//! ```ignore
//! log!("schema"; "loaded {} types", count);
//! debug!("import"; "cache hit: {}", path);
//! logger::status(Status::Unchanged(&paths));
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::{AnsiColors, OwoColorize};
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, Ordering},
    time::SystemTime,
};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Toggle `debug!` output (`--verbose` or `[log] verbose`).
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

// ============================================================================
// Macros
// ============================================================================

/// Print `message` under a colored `[module]` prefix.
///
/// ```ignore
/// log!("watch"; "watching {}", root.display());
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like [`log!`], but silent unless verbose mode is on.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Prefix colors per log module. Anything else is yellow.
const PREFIX_COLORS: &[(&str, AnsiColors)] = &[
    ("schema", AnsiColors::BrightBlue),
    ("watch", AnsiColors::BrightGreen),
    ("error", AnsiColors::BrightRed),
    ("import", AnsiColors::BrightMagenta),
    ("script", AnsiColors::BrightMagenta),
    ("config", AnsiColors::BrightCyan),
];

fn prefix_color(module: &str) -> AnsiColors {
    PREFIX_COLORS
        .iter()
        .find(|(name, _)| module.eq_ignore_ascii_case(name))
        .map_or(AnsiColors::BrightYellow, |(_, color)| *color)
}

pub fn log(module: &str, message: &str) {
    let prefix = format!("[{module}]");
    let colored = prefix.color(prefix_color(module));
    let prefix = colored.bold();

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

// ============================================================================
// Watch status
// ============================================================================

/// Result of one watch round, as shown on the status line.
#[derive(Debug, Clone, Copy)]
pub enum Status<'a> {
    /// Files were applied and the schema built.
    Updated { types: usize, paths: &'a [String] },
    /// Only files nobody reads changed.
    Unchanged(&'a [String]),
    /// The config was reloaded and the schema rebuilt.
    Reloaded { types: usize },
    /// Building failed; `detail` holds one diagnostic per line.
    Failed { summary: &'a str, detail: &'a str },
}

/// Lines printed by the previous status, cleared before the next one.
static LAST_LINES: Mutex<usize> = Mutex::new(0);

/// Replace the previous status line with `status`.
pub fn status(status: Status<'_>) {
    let text = render(status, &clock(unix_secs()));
    let mut last = LAST_LINES.lock();
    let mut stdout = stdout().lock();

    if *last > 0 {
        let lines = u16::try_from(*last).unwrap_or(u16::MAX);
        execute!(stdout, cursor::MoveUp(lines), Clear(ClearType::FromCursorDown)).ok();
    }
    writeln!(stdout, "{text}").ok();
    stdout.flush().ok();

    *last = text.lines().count();
}

fn render(status: Status<'_>, clock: &str) -> String {
    let timestamp = format!("[{clock}]").dimmed().to_string();
    match status {
        Status::Updated { types, paths } => format!(
            "{timestamp} {} rebuilt ({}): {}",
            "✓".green(),
            plural(types, "type"),
            paths.join(", ")
        ),
        Status::Unchanged(paths) => {
            format!("{timestamp} {}", format!("unchanged: {}", paths.join(", ")).dimmed())
        }
        Status::Reloaded { types } => format!(
            "{timestamp} {} config reloaded ({})",
            "✓".green(),
            plural(types, "type")
        ),
        Status::Failed { summary, detail } if detail.is_empty() => {
            format!("{timestamp} {} {summary}", "✗".red())
        }
        Status::Failed { summary, detail } => {
            format!("{timestamp} {} {summary}\n{detail}", "✗".red())
        }
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 { format!("1 {word}") } else { format!("{n} {word}s") }
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// `HH:MM:SS` (UTC) of a unix timestamp.
fn clock(secs: u64) -> String {
    let (h, m, s) = ((secs / 3600) % 24, (secs / 60) % 60, secs % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock() {
        assert_eq!(clock(0), "00:00:00");
        assert_eq!(clock(86400 + 3600 * 13 + 60 * 4 + 9), "13:04:09");
    }

    #[test]
    fn test_prefix_color() {
        assert_eq!(prefix_color("Schema"), AnsiColors::BrightBlue);
        assert_eq!(prefix_color("script"), AnsiColors::BrightMagenta);
        assert_eq!(prefix_color("warning"), AnsiColors::BrightYellow);
    }

    #[test]
    fn test_render_updated() {
        let paths = vec!["typing.otl".to_string(), "meta/base.otl".to_string()];
        let text = render(Status::Updated { types: 1, paths: &paths }, "10:00:00");
        assert!(text.contains("10:00:00"));
        assert!(text.contains("(1 type): typing.otl, meta/base.otl"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_render_failed_keeps_diagnostics() {
        let detail = "typing.otl:4-9: Unknown type: Tsk\ntyping.otl:12-20: Duplicate symbol: status";
        let text = render(
            Status::Failed {
                summary: "schema typing.otl failed",
                detail,
            },
            "10:00:00",
        );
        assert_eq!(text.lines().count(), 3);
        assert!(text.ends_with("Duplicate symbol: status"));

        let text = render(
            Status::Failed {
                summary: "config reload failed",
                detail: "",
            },
            "10:00:00",
        );
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_render_reloaded() {
        let text = render(Status::Reloaded { types: 3 }, "10:00:00");
        assert!(text.contains("config reloaded (3 types)"));
    }
}
