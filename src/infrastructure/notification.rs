use async_trait::async_trait;
use std::io::{self, Write};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::domain::ports::notification::*;

// ============================================================================
// MESSAGE STYLING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Info,
    Warning,
    Error,
    Success,
}

impl Tone {
    fn color(self) -> &'static str {
        match self {
            Tone::Info => "\x1b[34m",
            Tone::Warning => "\x1b[33m",
            Tone::Error => "\x1b[31m",
            Tone::Success => "\x1b[32m",
        }
    }

    fn emoji(self) -> &'static str {
        match self {
            Tone::Info => "ℹ️ ",
            Tone::Warning => "⚠️ ",
            Tone::Error => "❌",
            Tone::Success => "✅",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Tone::Info => "INFO:",
            Tone::Warning => "WARNING:",
            Tone::Error => "ERROR:",
            Tone::Success => "OK:",
        }
    }
}

impl From<StatusLevel> for Tone {
    fn from(level: StatusLevel) -> Self {
        match level {
            StatusLevel::Info => Tone::Info,
            StatusLevel::Ok => Tone::Success,
            StatusLevel::Error => Tone::Error,
        }
    }
}

/// Colour and emoji switches shared by the console adapters
#[derive(Debug, Clone, Copy)]
struct Style {
    use_colors: bool,
    emoji_enabled: bool,
}

impl Style {
    fn detect() -> Self {
        Self {
            use_colors: supports_colors(),
            emoji_enabled: true,
        }
    }

    fn line(&self, tone: Tone, message: &str) -> String {
        let prefix = if self.emoji_enabled {
            tone.emoji()
        } else {
            tone.label()
        };

        if self.use_colors {
            format!("{}{} {}\x1b[0m", tone.color(), prefix, message)
        } else {
            format!("{} {}", prefix, message)
        }
    }
}

fn supports_colors() -> bool {
    std::env::var("TERM").map_or(false, |term| !term.is_empty() && term != "dumb")
        && std::env::var_os("NO_COLOR").is_none()
}

// ============================================================================
// CONSOLE USER NOTIFICATION IMPLEMENTATION
// ============================================================================

/// Concrete implementation for console-based user notifications
pub struct ConsoleUserNotification {
    style: Style,
    assume_yes: bool,
}

#[async_trait]
impl UserNotification for ConsoleUserNotification {
    async fn show_info(&self, message: &str) -> crate::Result<()> {
        println!("{}", self.style.line(Tone::Info, message));
        Ok(())
    }

    async fn show_warning(&self, message: &str) -> crate::Result<()> {
        eprintln!("{}", self.style.line(Tone::Warning, message));
        Ok(())
    }

    async fn show_error(&self, message: &str) -> crate::Result<()> {
        eprintln!("{}", self.style.line(Tone::Error, message));
        Ok(())
    }

    async fn show_success(&self, message: &str) -> crate::Result<()> {
        println!("{}", self.style.line(Tone::Success, message));
        Ok(())
    }

    async fn ask_confirmation(&self, message: &str) -> crate::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        let prompt = if self.style.emoji_enabled {
            format!("❓ {} (y/N): ", message)
        } else {
            format!("{} (y/N): ", message)
        };

        print!("{}", prompt);
        io::stdout().flush()?;

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut input = String::new();

        reader.read_line(&mut input).await?;

        Ok(is_affirmative(&input))
    }
}

impl ConsoleUserNotification {
    pub fn new() -> Self {
        Self {
            style: Style::detect(),
            assume_yes: false,
        }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.style.use_colors = use_colors;
        self
    }

    pub fn with_emoji(mut self, emoji_enabled: bool) -> Self {
        self.style.emoji_enabled = emoji_enabled;
        self
    }

    /// Answer every confirmation with yes (`--yes`)
    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }
}

fn is_affirmative(input: &str) -> bool {
    let trimmed = input.trim().to_lowercase();
    trimmed == "y" || trimmed == "yes"
}

// ============================================================================
// CONSOLE STATUS SINK IMPLEMENTATION
// ============================================================================

/// Renders scheduler status lines and a single rewritten countdown line.
pub struct ConsoleStatusSink {
    style: Style,
}

impl ConsoleStatusSink {
    pub fn new() -> Self {
        Self {
            style: Style::detect(),
        }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.style.use_colors = use_colors;
        self
    }

    pub fn with_emoji(mut self, emoji_enabled: bool) -> Self {
        self.style.emoji_enabled = emoji_enabled;
        self
    }

    fn countdown_line(remaining: Option<Duration>) -> String {
        format!("Next rotation in {}", format_countdown(remaining))
    }
}

impl StatusSink for ConsoleStatusSink {
    fn status(&self, message: &str, level: StatusLevel) {
        // clear the countdown line first
        let stamp = chrono::Local::now().format("%H:%M:%S");
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "\r\x1b[2K[{}] {}", stamp, self.style.line(level.into(), message));
        let _ = stdout.flush();
    }

    fn countdown(&self, remaining: Option<Duration>) {
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "\r\x1b[2K{}", Self::countdown_line(remaining));
        let _ = stdout.flush();
    }
}

// ============================================================================
// DEFAULT IMPLEMENTATIONS
// ============================================================================

impl Default for ConsoleUserNotification {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ConsoleStatusSink {
    fn default() -> Self {
        Self::new()
    }
}
