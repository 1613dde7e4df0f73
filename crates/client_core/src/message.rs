//! User-facing messages surfaced next to relayed state.

use std::{fmt, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Error,
}

/// Callback attached to a confirmation dialog. Exactly one of the two
/// methods is invoked by the presentation layer.
pub trait ConfirmCallback: Send + Sync {
    fn proceed(&self);
    fn cancel(&self);
}

/// How the presentation layer should show a message.
#[derive(Clone)]
pub enum UiComponentType {
    None,
    Toast,
    Dialog,
    ConfirmDialog(Arc<dyn ConfirmCallback>),
}

impl fmt::Debug for UiComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Toast => f.write_str("Toast"),
            Self::Dialog => f.write_str("Dialog"),
            Self::ConfirmDialog(_) => f.write_str("ConfirmDialog(..)"),
        }
    }
}

impl PartialEq for UiComponentType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::Toast, Self::Toast) | (Self::Dialog, Self::Dialog) => {
                true
            }
            (Self::ConfirmDialog(a), Self::ConfirmDialog(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub text: String,
    pub message_type: MessageType,
    pub ui_component_type: UiComponentType,
}

impl Message {
    pub fn new(
        text: impl Into<String>,
        message_type: MessageType,
        ui_component_type: UiComponentType,
    ) -> Self {
        Self {
            text: text.into(),
            message_type,
            ui_component_type,
        }
    }

    pub fn dialog_error(text: impl Into<String>) -> Self {
        Self::new(text, MessageType::Error, UiComponentType::Dialog)
    }

    /// Error that is recorded in the queue but not shown.
    pub fn silent_error(text: impl Into<String>) -> Self {
        Self::new(text, MessageType::Error, UiComponentType::None)
    }

    pub fn toast_success(text: impl Into<String>) -> Self {
        Self::new(text, MessageType::Success, UiComponentType::Toast)
    }

    pub fn dialog_success(text: impl Into<String>) -> Self {
        Self::new(text, MessageType::Success, UiComponentType::Dialog)
    }

    pub fn confirm(text: impl Into<String>, callback: Arc<dyn ConfirmCallback>) -> Self {
        Self::new(
            text,
            MessageType::Info,
            UiComponentType::ConfirmDialog(callback),
        )
    }

    pub fn is_error(&self) -> bool {
        self.message_type == MessageType::Error
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
