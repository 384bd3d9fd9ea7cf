//! Themed stderr reporter for [crate::CcsError] and [crate::Diagnostic].
//!
//! The library itself never panics on malformed input (parse and query
//! failures are ordinary [Result]s), so unlike the teacher's `panic.rs` this
//! formats `Result::Err` values rather than a `PanicHookInfo`. The theming
//! (colored vs. plain, `NO_COLOR`/terminal detection) follows the teacher's
//! pattern.

use std::io::IsTerminal;

use crate::{CcsError, Diagnostic};

#[derive(Clone, Copy)]
struct Theme {
    reset: &'static str,
    header: &'static str,
    label: &'static str,
    message: &'static str,
}

impl Theme {
    fn plain() -> Self {
        Self {
            reset: "",
            header: "",
            label: "",
            message: "",
        }
    }

    fn colored() -> Self {
        Self {
            reset: "\x1b[0m",
            header: "\x1b[1;31m",
            label: "\x1b[1;36m",
            message: "\x1b[97m",
        }
    }
}

fn use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stderr().is_terminal()
}

fn theme() -> Theme {
    if use_color() {
        Theme::colored()
    } else {
        Theme::plain()
    }
}

/// Prints a fatal construction or query error to stderr, themed like the
/// teacher's panic hook.
pub(crate) fn report_error(err: &CcsError) {
    let theme = theme();
    eprintln!("{}ccs error{}", theme.header, theme.reset);
    eprintln!(
        "{}Message{}   {}{}{}",
        theme.label, theme.reset, theme.message, err, theme.reset
    );
}

/// Prints a non-fatal [Diagnostic] (a circular `@import` or a parse failure
/// in one of several imported files) to stderr.
pub(crate) fn report_diagnostic(diagnostic: &Diagnostic) {
    let theme = theme();
    eprintln!(
        "{}warning{}  {}{}{}",
        theme.label, theme.reset, theme.message, diagnostic, theme.reset
    );
}
