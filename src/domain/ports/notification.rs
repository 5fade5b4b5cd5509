use async_trait::async_trait;

// ============================================================================
// NOTIFICATION PORTS
// ============================================================================

/// Port for user notifications and feedback
#[async_trait]
pub trait UserNotification {
    /// Show informational message to user
    async fn show_info(&self, message: &str) -> crate::Result<()>;

    /// Show warning message to user
    async fn show_warning(&self, message: &str) -> crate::Result<()>;

    /// Show error message to user
    async fn show_error(&self, message: &str) -> crate::Result<()>;

    /// Show success message to user
    async fn show_success(&self, message: &str) -> crate::Result<()>;

    /// Ask user for confirmation (yes/no)
    async fn ask_confirmation(&self, message: &str) -> crate::Result<bool>;
}

/// Synchronous status line sink, used where a report must not suspend
/// (scheduler callbacks, countdown renderers).
pub trait StatusSink {
    fn status(&self, message: &str, level: StatusLevel);

    /// Redraw the remaining time until the next rotation; `None` when stopped.
    fn countdown(&self, remaining: Option<std::time::Duration>);
}

// ============================================================================
// SUPPORTING TYPES
// ============================================================================

/// Severity of a status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Ok,
    Error,
}

/// Render a countdown as `MM:SS`, or an em dash when rotation is off.
pub fn format_countdown(remaining: Option<std::time::Duration>) -> String {
    match remaining {
        None => "—".to_string(),
        Some(remaining) => {
            // round up so a fresh 5-minute deadline reads 05:00, not 04:59
            let millis = remaining.as_millis();
            let total = ((millis + 999) / 1000) as u64;
            format!("{:02}:{:02}", total / 60, total % 60)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(None), "—");
        assert_eq!(format_countdown(Some(Duration::from_secs(300))), "05:00");
        assert_eq!(format_countdown(Some(Duration::from_millis(59_001))), "01:00");
        assert_eq!(format_countdown(Some(Duration::from_millis(1))), "00:01");
        assert_eq!(format_countdown(Some(Duration::ZERO)), "00:00");
        assert_eq!(format_countdown(Some(Duration::from_secs(3725))), "62:05");
    }
}
