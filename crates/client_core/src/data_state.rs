//! Normalized outcome of a dispatched request.

use std::fmt;

use crate::{
    event::SharedEvent,
    message::{Message, MessageType, UiComponentType},
};

/// Outcome relayed to the presentation layer, always tagged with the event
/// that produced it.
#[derive(Clone)]
pub enum DataState<S> {
    Data {
        data: Option<S>,
        message: Option<Message>,
        event: SharedEvent,
    },
    Error {
        message: Message,
        event: SharedEvent,
    },
}

impl<S> DataState<S> {
    pub fn data(data: Option<S>, message: Option<Message>, event: SharedEvent) -> Self {
        Self::Data {
            data,
            message,
            event,
        }
    }

    /// Terminal state carrying neither payload nor message.
    pub fn noop(event: SharedEvent) -> Self {
        Self::data(None, None, event)
    }

    /// Error outcome. Empty texts are replaced so that an error never
    /// reaches the queue without a reason.
    pub fn error(message: Message, event: SharedEvent) -> Self {
        let message = if message.text.trim().is_empty() {
            Message {
                text: format!("{}\n\nReason: {}", event.error_info(), crate::constants::ERROR_UNKNOWN),
                ..message
            }
        } else {
            message
        };
        Self::Error { message, event }
    }

    /// Error prefixed with the event's `error_info`, shown as a dialog.
    pub fn failure(reason: &str, event: SharedEvent) -> Self {
        let text = format!("{}\n\nReason: {}", event.error_info(), reason);
        Self::error(Message::dialog_error(text), event)
    }

    pub fn event(&self) -> &SharedEvent {
        match self {
            Self::Data { event, .. } | Self::Error { event, .. } => event,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Data { message, .. } => message.as_ref(),
            Self::Error { message, .. } => Some(message),
        }
    }

    pub fn payload(&self) -> Option<&S> {
        match self {
            Self::Data { data, .. } => data.as_ref(),
            Self::Error { .. } => None,
        }
    }

    pub fn into_payload(self) -> Option<S> {
        match self {
            Self::Data { data, .. } => data,
            Self::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            Self::Data {
                data: None,
                message: None,
                ..
            }
        )
    }

    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> DataState<T> {
        match self {
            Self::Data {
                data,
                message,
                event,
            } => DataState::Data {
                data: data.map(f),
                message,
                event,
            },
            Self::Error { message, event } => DataState::Error { message, event },
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for DataState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data {
                data,
                message,
                event,
            } => f
                .debug_struct("Data")
                .field("data", data)
                .field("message", message)
                .field("event", &event.kind())
                .finish(),
            Self::Error { message, event } => f
                .debug_struct("Error")
                .field("message", message)
                .field("event", &event.kind())
                .finish(),
        }
    }
}

/// Error outcome whose text is used as-is, without the `error_info` prefix.
pub fn build_error<S>(
    text: impl Into<String>,
    ui_component_type: UiComponentType,
    event: SharedEvent,
) -> DataState<S> {
    DataState::error(
        Message::new(text, MessageType::Error, ui_component_type),
        event,
    )
}
