//! Keeps the one published list message in step with the store.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    domain::{ChatId, MessageRef},
    errors::Error,
    formatting::fit_lines,
    messaging::port::MessagingPort,
    Result,
};

/// Owns the reference to the single outbound list message.
///
/// The message itself belongs to the chat platform; we only remember where it
/// is. Once set, the reference is reused for the life of the process unless
/// the messenger reports it gone (e.g. someone deleted it), in which case a
/// new message is posted and tracked instead.
pub struct SyncPublisher {
    messenger: Arc<dyn MessagingPort>,
    tracked: Mutex<Option<MessageRef>>,
}

impl SyncPublisher {
    pub fn new(messenger: Arc<dyn MessagingPort>) -> Self {
        Self {
            messenger,
            tracked: Mutex::new(None),
        }
    }

    pub async fn tracked(&self) -> Option<MessageRef> {
        *self.tracked.lock().await
    }

    /// Push `html` to the tracked message, creating it in `chat_id` if none
    /// is tracked yet.
    ///
    /// Messengers that cannot edit get a fresh message every time; the newest
    /// one is tracked.
    pub async fn refresh(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let caps = self.messenger.capabilities();
        let html = fit_lines(html, caps.max_message_len);
        let mut tracked = self.tracked.lock().await;

        if let Some(msg) = (*tracked).filter(|_| caps.supports_edit) {
            match self.messenger.edit_html(msg, &html).await {
                Ok(()) => {
                    debug!(
                        chat_id = msg.chat_id.0,
                        message_id = msg.message_id.0,
                        "list message edited"
                    );
                    return Ok(msg);
                }
                Err(Error::MessageGone(reason)) => {
                    warn!(
                        chat_id = msg.chat_id.0,
                        message_id = msg.message_id.0,
                        reason = %reason,
                        "list message is gone; posting a new one"
                    );
                    *tracked = None;
                }
                Err(e) => {
                    // The message still exists; the next refresh edits it again.
                    warn!(
                        chat_id = msg.chat_id.0,
                        message_id = msg.message_id.0,
                        error = %e,
                        "failed to edit list message"
                    );
                    return Err(e);
                }
            }
        }

        match self.messenger.send_html(chat_id, &html).await {
            Ok(msg) => {
                info!(
                    chat_id = msg.chat_id.0,
                    message_id = msg.message_id.0,
                    "tracking list message"
                );
                *tracked = Some(msg);
                Ok(msg)
            }
            Err(e) => {
                warn!(chat_id = chat_id.0, error = %e, "failed to post list message");
                Err(e)
            }
        }
    }
}
