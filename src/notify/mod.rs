//! User-facing notifications and the changelog.
//!
//! The [`Dispatcher`] turns session transitions into toasts and hands them
//! to a fire-and-forget [`NotificationSink`]. Toast actions carry a
//! [`UserIntent`] that the host feeds back into the session.

pub mod changelog;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Header of the toast shown when a scan found updates.
pub const UPDATES_AVAILABLE: &str = "Updates are available";

/// Header of the toast shown when some updates failed.
pub const UPDATES_FAILED: &str = "Some updates failed to install";

/// Confirmation text shown before a force update.
pub const FORCE_UPDATE_WARNING: &str =
    "Are you sure you want to force update? Any local edit will be overwritten!";

/// What the user asked for by clicking a toast action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIntent {
    UpdateNow,
    /// Only valid after the user confirmed [`FORCE_UPDATE_WARNING`].
    ForceUpdate,
    Dismiss,
    OpenUpdater,
    /// The full updater view was closed.
    CloseUpdater,
}

/// Visual emphasis of a toast action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStyle {
    Primary,
    Danger,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastAction {
    pub label: &'static str,
    pub style: ActionStyle,
    pub intent: UserIntent,
}

/// A transient notification with up to three actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub header: String,
    pub actions: Vec<ToastAction>,
}

/// Presentation layer for toasts.
pub trait NotificationSink: Send + Sync {
    fn show(&self, toast: Toast);

    /// Whether a shown toast stays up until dismissed. Sinks that only
    /// write a line return false and never block the next toast.
    fn stays_presented(&self) -> bool {
        true
    }
}

/// Emits toasts for session transitions, at most one at a time.
pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
    active: AtomicBool,
    view_open: AtomicBool,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            active: AtomicBool::new(false),
            view_open: AtomicBool::new(false),
        }
    }

    /// Whether a toast is currently presented.
    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// The toast was closed; the next transition may notify again.
    pub fn dismiss(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Track whether the full updater view is open.
    pub fn set_view_open(&self, open: bool) {
        self.view_open.store(open, Ordering::SeqCst);
    }

    /// A scan found updates and automatic mode is off.
    pub fn updates_available(&self, count: usize) {
        debug!("{} update(s) available", count);
        self.emit(Toast {
            header: UPDATES_AVAILABLE.to_string(),
            actions: vec![
                ToastAction {
                    label: "Update now",
                    style: ActionStyle::Primary,
                    intent: UserIntent::UpdateNow,
                },
                ToastAction {
                    label: "Open Updater",
                    style: ActionStyle::Plain,
                    intent: UserIntent::OpenUpdater,
                },
            ],
        });
    }

    /// Some updates failed; offer a force update.
    pub fn updates_failed(&self, count: usize) {
        if self.view_open.load(Ordering::SeqCst) {
            debug!("Updater view is open, not notifying about {} failure(s)", count);
            return;
        }
        self.emit(Toast {
            header: UPDATES_FAILED.to_string(),
            actions: vec![
                ToastAction {
                    label: "Force Update",
                    style: ActionStyle::Danger,
                    intent: UserIntent::ForceUpdate,
                },
                ToastAction {
                    label: "Ignore",
                    style: ActionStyle::Plain,
                    intent: UserIntent::Dismiss,
                },
                ToastAction {
                    label: "Open Updater",
                    style: ActionStyle::Plain,
                    intent: UserIntent::OpenUpdater,
                },
            ],
        });
    }

    fn emit(&self, toast: Toast) {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Toast already presented, dropping \"{}\"", toast.header);
            return;
        }
        self.sink.show(toast);
        if !self.sink.stays_presented() {
            self.active.store(false, Ordering::SeqCst);
        }
    }
}

/// Sink that writes toasts to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show(&self, toast: Toast) {
        let actions: Vec<_> = toast.actions.iter().map(|a| a.label).collect();
        info!("🔔 {} [{}]", toast.header, actions.join(" | "));
    }

    fn stays_presented(&self) -> bool {
        false
    }
}

/// Sink that prints toasts with the CLI command matching each action.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn show(&self, toast: Toast) {
        println!("🔔 {}", toast.header);
        for action in &toast.actions {
            let hint = match action.intent {
                UserIntent::UpdateNow => "mod-updater update",
                UserIntent::ForceUpdate => "mod-updater update --force",
                UserIntent::OpenUpdater => "mod-updater status",
                UserIntent::Dismiss | UserIntent::CloseUpdater => continue,
            };
            let marker = match action.style {
                ActionStyle::Danger => "⚠️ ",
                ActionStyle::Primary | ActionStyle::Plain => "  ",
            };
            println!(" {} {:<14} {}", marker, action.label, hint);
        }
    }

    fn stays_presented(&self) -> bool {
        false
    }
}

/// Sink that keeps every toast.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    toasts: std::sync::Mutex<Vec<Toast>>,
    transient: bool,
}

#[cfg(test)]
impl RecordingSink {
    /// A sink whose toasts disappear as soon as they are shown.
    pub fn transient() -> Self {
        Self {
            transient: true,
            ..Default::default()
        }
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl NotificationSink for RecordingSink {
    fn show(&self, toast: Toast) {
        if let Ok(mut toasts) = self.toasts.lock() {
            toasts.push(toast);
        }
    }

    fn stays_presented(&self) -> bool {
        !self.transient
    }
}
