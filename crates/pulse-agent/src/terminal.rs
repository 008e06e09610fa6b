//! Notification sink that prints to the terminal.

use std::io::Write;

use async_trait::async_trait;
use pulse_client::{NotificationLevel, NotificationSink, Permission, UserNotification};

/// Prints in-app notifications as one line each on stdout.
///
/// The terminal has no separate OS-level surface. With `bell` set, host
/// notifications are permitted and ring the terminal bell.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalSink {
    /// Ring the bell for host-level notifications.
    pub bell: bool,
}

#[async_trait]
impl NotificationSink for TerminalSink {
    fn show(&self, n: &UserNotification) {
        println!("{}", render(n));
    }

    fn host_permission(&self) -> Permission {
        if self.bell {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn show_host(&self, _n: &UserNotification) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }
}

fn render(n: &UserNotification) -> String {
    let marker = match n.level {
        NotificationLevel::Success => "✓",
        NotificationLevel::Info => "i",
        NotificationLevel::Warning => "!",
        NotificationLevel::Error => "✗",
    };
    format!("[{marker}] {}: {}", n.title, n.message)
}
