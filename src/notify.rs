//! User notifications
//!
//! Transient success/error toasts. Fire-and-forget: the sink is never
//! queried and a closed sink is not an error.

use tokio::sync::mpsc;

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

/// A notification shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

/// Notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);

    fn success(&self, message: &str) {
        self.notify(Toast::success(message));
    }

    fn error(&self, message: &str) {
        self.notify(Toast::error(message));
    }
}

/// Delivers toasts over a channel to whoever renders them
#[derive(Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Toast>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Toast>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, toast: Toast) {
        if self.sender.send(toast).is_err() {
            tracing::debug!("Toast dropped: no receiver");
        }
    }
}

/// Drain every toast currently queued on `receiver`
pub fn drain(receiver: &mut mpsc::UnboundedReceiver<Toast>) -> Vec<Toast> {
    let mut toasts = Vec::new();
    while let Ok(toast) = receiver.try_recv() {
        toasts.push(toast);
    }
    toasts
}
