//! Colored terminal output for the freeze CLI.
//!
//! Uses `termcolor` for cross-platform colored terminal output.
//! Respects `NO_COLOR` environment variable and `--color` flag.

use raya_freeze::{FileStatus, FileUpdate, ModuleSummary};
use std::io::Write;
use std::path::Path;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Status verb and color for a regenerated file.
pub fn status_verb(status: FileStatus) -> (&'static str, Color) {
    match status {
        FileStatus::Updated => ("Updating", Color::Green),
        FileStatus::Unchanged => ("Fresh", Color::White),
    }
}

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    fn write_styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Right-aligned status verb followed by a message, cargo style.
    pub fn status(&mut self, verb: &str, color: Color, message: &str) {
        self.write_styled(&format!("{:>12}", verb), Some(color), true);
        let _ = writeln!(self.stdout, " {}", message);
    }

    /// One status line per regenerated file.
    pub fn file_updates(&mut self, updates: &[FileUpdate], root: &Path) {
        for update in updates {
            let path = update.path.strip_prefix(root).unwrap_or(&update.path);
            let (verb, color) = status_verb(update.status);
            self.status(verb, color, &path.display().to_string());
        }
    }

    /// Module summary as an aligned table.
    pub fn summary_table(&mut self, summaries: &[ModuleSummary]) {
        let width = |f: fn(&ModuleSummary) -> usize, header: &str| {
            summaries.iter().map(f).chain([header.len()]).max().unwrap_or(0)
        };
        let module_w = width(|s| s.module.len(), "module");
        let source_w = width(|s| s.source.len(), "source");
        let frozen_w = width(|s| s.frozen.len(), "frozen");

        self.write_styled(
            &format!(
                "{:<module_w$}  {:<5}  {:<source_w$}  {:<frozen_w$}  checksum",
                "module", "ispkg", "source", "frozen"
            ),
            None,
            true,
        );
        let _ = writeln!(self.stdout);

        for summary in summaries {
            let checksum = summary
                .checksum
                .as_deref()
                .map(|c| &c[..c.len().min(12)])
                .unwrap_or("-");
            let _ = writeln!(
                self.stdout,
                "{:<module_w$}  {:<5}  {:<source_w$}  {:<frozen_w$}  {}",
                summary.module,
                if summary.ispkg { "yes" } else { "no" },
                summary.source,
                summary.frozen,
                checksum
            );
        }
        let _ = self.stdout.flush();
    }

    /// Write plain text followed by a newline.
    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{}", text);
    }

    /// Write error message to stderr.
    pub fn stderr_error(&mut self, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        let _ = self.stderr.set_color(&spec);
        let _ = write!(self.stderr, "error");
        let _ = self.stderr.reset();
        let _ = writeln!(self.stderr, ": {}", text);
    }
}
