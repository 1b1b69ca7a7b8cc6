use log::{error, info, warn};
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// What dismissing a toast should trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastAction {
    Logout,
}

/// A non-blocking user notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    /// Stays on screen until the user dismisses it.
    pub persistent: bool,
    pub on_dismiss: Option<ToastAction>,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self::transient(ToastLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::transient(ToastLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::transient(ToastLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::transient(ToastLevel::Error, message)
    }

    /// Persistent error whose dismissal signs the user out.
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
            persistent: true,
            on_dismiss: Some(ToastAction::Logout),
        }
    }

    fn transient(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            persistent: false,
            on_dismiss: None,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Writes toasts to the log; used where no UI is attached.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Error => error!("{}", toast.message),
            ToastLevel::Warning => warn!("{}", toast.message),
            ToastLevel::Info | ToastLevel::Success => info!("{}", toast.message),
        }
    }
}

/// Forwards toasts to whatever renders them.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Toast>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Toast>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, toast: Toast) {
        if self.tx.send(toast).is_err() {
            warn!("Toast dropped: no receiver attached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expired_toast_logs_out_on_dismiss() {
        let toast = Toast::session_expired("Please sign in again");
        assert!(toast.persistent);
        assert_eq!(toast.on_dismiss, Some(ToastAction::Logout));
        assert_eq!(toast.level, ToastLevel::Error);

        assert!(!Toast::error("x").persistent);
        assert!(Toast::warning("x").on_dismiss.is_none());
    }

    #[tokio::test]
    async fn test_channel_notifier_delivers() {
        let (notifier, mut rx) = ChannelNotifier::channel();
        notifier.notify(Toast::info("hello"));

        let toast = rx.recv().await.unwrap();
        assert_eq!(toast.message, "hello");
    }

    #[test]
    fn test_channel_notifier_without_receiver_does_not_panic() {
        let (notifier, rx) = ChannelNotifier::channel();
        drop(rx);
        notifier.notify(Toast::error("nobody listening"));
    }
}
