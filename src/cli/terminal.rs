//! Terminal capability detection and colored output

use owo_colors::{OwoColorize, colors::css};
use permit::Status;

/// Detects whether colored output should be enabled
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Check if terminal is narrow (< 60 columns)
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|w| w < 60)
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Color as success (green)
    fn success(&self) -> String;
    /// Color as warning (amber)
    fn warning(&self) -> String;
    /// Color as info (blue)
    fn info(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::Green>().to_string())
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::Orange>().to_string())
    }

    fn info(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::LightBlue>().to_string())
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), |s| s.dimmed().to_string())
    }
}

fn paint(text: &str, style: impl Fn(&str) -> String) -> String {
    if supports_color() {
        style(text)
    } else {
        text.to_string()
    }
}

/// A check mark or cross, colored to match.
pub fn mark(ok: bool) -> String {
    if ok { "✓".success() } else { "✗".warning() }
}

/// The status, colored by how far along the permit is.
pub fn status(status: Status) -> String {
    match status {
        Status::Draft => status.as_str().info(),
        Status::Submitted => status.as_str().warning(),
        Status::Approved => status.as_str().success(),
    }
}
