//! Command dispatch: parse arguments, mutate the list, publish, acknowledge.

use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    domain::ChatId,
    formatting::{code, escape_html, truncate_text},
    grocery::{
        format_list, render::bought_glyph, BoughtStatus, GroceryList, ItemKey, KeyScheme,
        ListError,
    },
    messaging::port::MessagingPort,
    sync::SyncPublisher,
};

/// Commands advertised to the chat platform, in menu order.
pub const COMMANDS: &[(&str, &str)] = &[
    ("add", "Add an item to the grocery list"),
    ("remove", "Remove an item from the grocery list"),
    ("toggle", "Mark an item as bought or not bought"),
    ("check", "Set an item's status (bought / not bought)"),
    ("list", "Show the current grocery list"),
    ("clear", "Clear the entire grocery list"),
    ("help", "Show available commands"),
];

const STATUS_WORDS: &[&str] = &["not bought", "uncheck", "bought", "check", "yes", "no"];

/// A parsed command, validated against the active key scheme but not yet
/// applied to the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroceryCommand {
    Add { item: String },
    Remove { key: ItemKey },
    Toggle { key: ItemKey },
    Check { key: ItemKey, status: Option<BoughtStatus> },
    List,
    Clear,
    Help,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    List(#[from] ListError),

    #[error("usage: {0}")]
    Usage(String),

    #[error("unknown command: /{0}")]
    Unknown(String),
}

impl CommandError {
    /// User-facing HTML for the error reply.
    pub fn to_html(&self) -> String {
        match self {
            CommandError::List(ListError::NotFound(key)) => {
                format!("⚠️ Item {} not found.", code(&key.to_string()))
            }
            CommandError::List(ListError::DuplicateItem(name)) => {
                format!("⚠️ {} is already on the list.", code(name))
            }
            CommandError::List(ListError::InvalidStatus(word)) => format!(
                "⚠️ Unknown status {}. Use bought/check/yes or not bought/uncheck/no.",
                code(word)
            ),
            CommandError::Usage(usage) => format!("⚠️ Usage: {}", code(usage)),
            CommandError::Unknown(cmd) => format!("Unknown command: /{}", escape_html(cmd)),
        }
    }
}

impl GroceryCommand {
    /// Parse `/name args` into a command for the given key scheme.
    ///
    /// Status words are validated here so a bad `/check` never reaches the list.
    pub fn parse(scheme: KeyScheme, name: &str, args: &str) -> Result<Self, CommandError> {
        let args = args.trim();
        let key_usage = match scheme {
            KeyScheme::Sequential => "<number>",
            KeyScheme::ByName => "<item>",
        };
        let parse_key = |raw: &str, cmd: &str| {
            scheme
                .parse_key(raw)
                .ok_or_else(|| CommandError::Usage(format!("/{cmd} {key_usage}")))
        };

        match name {
            "add" => {
                if args.is_empty() {
                    return Err(CommandError::Usage("/add <item>".to_string()));
                }
                Ok(Self::Add {
                    item: args.to_string(),
                })
            }
            "remove" => Ok(Self::Remove {
                key: parse_key(args, "remove")?,
            }),
            "toggle" => Ok(Self::Toggle {
                key: parse_key(args, "toggle")?,
            }),
            "check" => {
                let (raw_key, raw_status) = split_check_args(scheme, args);
                if raw_status.as_deref() == Some("") {
                    return Err(CommandError::Usage(format!("/check {key_usage} | <status>")));
                }
                let key = parse_key(&raw_key, "check")?;
                let status = raw_status.as_deref().map(BoughtStatus::parse).transpose()?;
                Ok(Self::Check { key, status })
            }
            "list" => Ok(Self::List),
            "clear" => Ok(Self::Clear),
            "start" | "help" => Ok(Self::Help),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Split `/check` arguments into the item reference and an optional status.
///
/// Numbered lists take `<number> [status]`. Named lists take
/// `<item> | <status>`, or `<item> <status>` when the tail is a known status
/// word; anything else is the item alone.
fn split_check_args(scheme: KeyScheme, args: &str) -> (String, Option<String>) {
    match scheme {
        KeyScheme::Sequential => match args.split_once(char::is_whitespace) {
            Some((key, status)) if !status.trim().is_empty() => {
                (key.to_string(), Some(status.trim().to_string()))
            }
            _ => (args.to_string(), None),
        },
        KeyScheme::ByName => {
            if let Some((item, status)) = args.split_once('|') {
                return (item.trim().to_string(), Some(status.trim().to_string()));
            }
            let words: Vec<&str> = args.split_whitespace().collect();
            for status in STATUS_WORDS {
                let n = status.split(' ').count();
                if words.len() <= n {
                    continue;
                }
                let (item, tail) = words.split_at(words.len() - n);
                let tail = tail.join(" ");
                if tail.to_lowercase() == *status {
                    return (item.join(" "), Some(tail));
                }
            }
            (args.to_string(), None)
        }
    }
}

/// What a handled command produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub html: String,
    /// Whether the list message was republished.
    pub published: bool,
    /// Transient replies are deleted after the acknowledgment lifetime.
    pub transient: bool,
}

/// Routes commands to the grocery list and keeps the published message in sync.
///
/// All commands run under one lock, so a mutation and its publish are never
/// interleaved with another command.
pub struct CommandRouter {
    list: Mutex<GroceryList>,
    publisher: SyncPublisher,
    messenger: Arc<dyn MessagingPort>,
    ack_ttl: Duration,
}

impl CommandRouter {
    pub fn new(scheme: KeyScheme, messenger: Arc<dyn MessagingPort>, ack_ttl: Duration) -> Self {
        Self {
            list: Mutex::new(GroceryList::new(scheme)),
            publisher: SyncPublisher::new(messenger.clone()),
            messenger,
            ack_ttl,
        }
    }

    pub fn publisher(&self) -> &SyncPublisher {
        &self.publisher
    }

    /// Handle `/name args` from `chat_id` and send the reply.
    pub async fn dispatch(&self, chat_id: ChatId, name: &str, args: &str) -> Reply {
        let mut list = self.list.lock().await;

        let outcome = GroceryCommand::parse(list.key_scheme(), name, args)
            .and_then(|cmd| apply(&mut list, cmd));

        let reply = match outcome {
            Ok(applied) => {
                info!(
                    chat_id = chat_id.0,
                    command = name,
                    items = list.len(),
                    "command applied"
                );
                if applied.publish {
                    let html = format_list(&list.snapshot());
                    // Transport failures are logged by the publisher and not surfaced here.
                    let _ = self.publisher.refresh(chat_id, &html).await;
                }
                Reply {
                    html: applied.html,
                    published: applied.publish,
                    transient: applied.transient,
                }
            }
            Err(err) => {
                info!(chat_id = chat_id.0, command = name, error = %err, "command rejected");
                Reply {
                    html: err.to_html(),
                    published: false,
                    transient: true,
                }
            }
        };
        drop(list);

        self.send_reply(chat_id, &reply).await;
        reply
    }

    async fn send_reply(&self, chat_id: ChatId, reply: &Reply) {
        let sent = match self.messenger.send_html(chat_id, &reply.html).await {
            Ok(msg) => msg,
            Err(e) => {
                warn!(chat_id = chat_id.0, error = %e, "failed to send reply");
                return;
            }
        };

        if !reply.transient
            || self.ack_ttl.is_zero()
            || !self.messenger.capabilities().supports_delete
        {
            return;
        }

        let messenger = self.messenger.clone();
        let ttl = self.ack_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = messenger.delete_message(sent).await {
                warn!(
                    chat_id = sent.chat_id.0,
                    message_id = sent.message_id.0,
                    error = %e,
                    "failed to delete acknowledgment"
                );
            }
        });
    }
}

struct Applied {
    html: String,
    publish: bool,
    transient: bool,
}

impl Applied {
    fn ack(html: String) -> Self {
        Self {
            html,
            publish: true,
            transient: true,
        }
    }
}

fn apply(list: &mut GroceryList, cmd: GroceryCommand) -> Result<Applied, CommandError> {
    match cmd {
        GroceryCommand::Add { item } => {
            list.add(&item)?;
            Ok(Applied::ack(format!(
                "✅ Added {} to the list!",
                code(&truncate_text(&item, 64))
            )))
        }
        GroceryCommand::Remove { key } => {
            if !list.remove(&key) {
                return Err(ListError::NotFound(key).into());
            }
            Ok(Applied::ack(format!("🗑 Removed item {}.", code(&key.to_string()))))
        }
        GroceryCommand::Toggle { key } | GroceryCommand::Check { key, status: None } => {
            let (name, bought) = list.toggle(&key)?;
            Ok(Applied::ack(status_ack(&name, bought)))
        }
        GroceryCommand::Check {
            key,
            status: Some(BoughtStatus(bought)),
        } => {
            let name = list.set_bought(&key, bought)?;
            Ok(Applied::ack(status_ack(&name, bought)))
        }
        GroceryCommand::List => Ok(Applied::ack("📋 List updated!".to_string())),
        GroceryCommand::Clear => {
            list.clear();
            Ok(Applied::ack("🗑 Grocery list cleared!".to_string()))
        }
        GroceryCommand::Help => Ok(Applied {
            html: help_html(list.key_scheme()),
            publish: false,
            transient: false,
        }),
    }
}

fn status_ack(name: &str, bought: bool) -> String {
    format!(
        "🔄 Toggled {} to {} {}.",
        code(name),
        bought_glyph(bought),
        if bought { "Bought" } else { "Not Bought" }
    )
}

fn help_html(scheme: KeyScheme) -> String {
    let (key, check) = match scheme {
        KeyScheme::Sequential => ("&lt;number&gt;", "/check &lt;number&gt; [status]"),
        KeyScheme::ByName => ("&lt;item&gt;", "/check &lt;item&gt; [| status]"),
    };
    format!(
        "🛒 <b>Grocery List Bot</b>\n\n\
<b>📋 Commands:</b>\n\
/add &lt;item&gt; - Add an item\n\
/remove {key} - Remove an item\n\
/toggle {key} - Flip bought / not bought\n\
{check} - Set status (bought, check, yes / not bought, uncheck, no)\n\
/list - Re-post the list\n\
/clear - Clear the list"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageId, MessageRef},
        grocery::EMPTY_LIST_HTML,
        messaging::types::MessagingCapabilities,
        Result,
    };
    use async_trait::async_trait;

    #[derive(Default)]
    struct FakeMessenger {
        next_id: std::sync::Mutex<i32>,
        sends: std::sync::Mutex<Vec<(MessageRef, String)>>,
        edits: std::sync::Mutex<Vec<(MessageRef, String)>>,
        deletes: std::sync::Mutex<Vec<MessageRef>>,
    }

    impl FakeMessenger {
        fn sent_html(&self) -> Vec<String> {
            self.sends.lock().unwrap().iter().map(|(_, h)| h.clone()).collect()
        }

        fn edited_html(&self) -> Vec<String> {
            self.edits.lock().unwrap().iter().map(|(_, h)| h.clone()).collect()
        }

        /// Current content of the list message as the chat would show it.
        fn list_message(&self) -> Option<String> {
            let first_list = self
                .sends
                .lock()
                .unwrap()
                .iter()
                .find(|(_, h)| h.starts_with("📝"))
                .cloned()?;
            let latest_edit = self
                .edits
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(m, _)| *m == first_list.0)
                .map(|(_, h)| h.clone());
            Some(latest_edit.unwrap_or(first_list.1))
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_edit: true,
                supports_delete: true,
                max_message_len: 4096,
            }
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            // Yield so concurrent dispatches get a chance to interleave.
            tokio::time::sleep(Duration::from_millis(5)).await;
            let msg = {
                let mut id = self.next_id.lock().unwrap();
                *id += 1;
                MessageRef {
                    chat_id,
                    message_id: MessageId(*id),
                }
            };
            self.sends.lock().unwrap().push((msg, html.to_string()));
            Ok(msg)
        }

        async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.edits.lock().unwrap().push((msg, html.to_string()));
            Ok(())
        }

        async fn delete_message(&self, msg: MessageRef) -> Result<()> {
            self.deletes.lock().unwrap().push(msg);
            Ok(())
        }
    }

    fn router(scheme: KeyScheme) -> (CommandRouter, Arc<FakeMessenger>) {
        let messenger = Arc::new(FakeMessenger::default());
        let router = CommandRouter::new(scheme, messenger.clone(), Duration::from_secs(5));
        (router, messenger)
    }

    const CHAT: ChatId = ChatId(42);

    #[tokio::test(start_paused = true)]
    async fn add_toggle_remove_end_to_end() {
        let (router, messenger) = router(KeyScheme::Sequential);

        let reply = router.dispatch(CHAT, "add", "Milk").await;
        assert_eq!(reply.html, "✅ Added <code>Milk</code> to the list!");
        assert!(reply.published);
        assert_eq!(
            messenger.list_message().unwrap(),
            "📝 <b>Grocery List:</b>\n1. ❌ Milk"
        );

        router.dispatch(CHAT, "toggle", "1").await;
        assert_eq!(
            messenger.list_message().unwrap(),
            "📝 <b>Grocery List:</b>\n1. ✅ Milk"
        );

        let reply = router.dispatch(CHAT, "remove", "1").await;
        assert_eq!(reply.html, "🗑 Removed item <code>1</code>.");
        assert_eq!(messenger.list_message().unwrap(), EMPTY_LIST_HTML);

        // One list message, edited in place.
        let list_sends = messenger
            .sent_html()
            .into_iter()
            .filter(|h| h.starts_with("📝"))
            .count();
        assert_eq!(list_sends, 1);
        assert_eq!(messenger.edited_html().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_renumbers_what_the_list_shows() {
        let (router, messenger) = router(KeyScheme::Sequential);
        router.dispatch(CHAT, "add", "Milk").await;
        router.dispatch(CHAT, "add", "Eggs").await;
        router.dispatch(CHAT, "remove", "1").await;

        assert_eq!(
            messenger.list_message().unwrap(),
            "📝 <b>Grocery List:</b>\n1. ❌ Eggs"
        );
        let reply = router.dispatch(CHAT, "toggle", "1").await;
        assert_eq!(reply.html, "🔄 Toggled <code>Eggs</code> to ✅ Bought.");
    }

    #[tokio::test(start_paused = true)]
    async fn failures_reply_without_publishing() {
        let (router, messenger) = router(KeyScheme::Sequential);
        router.dispatch(CHAT, "add", "Milk").await;
        let edits_before = messenger.edited_html().len();

        let reply = router.dispatch(CHAT, "toggle", "7").await;
        assert_eq!(reply.html, "⚠️ Item <code>7</code> not found.");
        assert!(!reply.published);
        assert!(reply.transient);

        let reply = router.dispatch(CHAT, "remove", "7").await;
        assert_eq!(reply.html, "⚠️ Item <code>7</code> not found.");

        let reply = router.dispatch(CHAT, "check", "1 perhaps").await;
        assert!(reply.html.starts_with("⚠️ Unknown status <code>perhaps</code>"));

        let reply = router.dispatch(CHAT, "remove", "milk").await;
        assert_eq!(reply.html, "⚠️ Usage: <code>/remove &lt;number&gt;</code>");

        let reply = router.dispatch(CHAT, "add", "   ").await;
        assert_eq!(reply.html, "⚠️ Usage: <code>/add &lt;item&gt;</code>");

        assert_eq!(messenger.edited_html().len(), edits_before);
        assert_eq!(
            messenger.list_message().unwrap(),
            "📝 <b>Grocery List:</b>\n1. ❌ Milk"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn list_command_creates_message_on_empty_list_then_edits() {
        let (router, messenger) = router(KeyScheme::Sequential);

        let reply = router.dispatch(CHAT, "list", "").await;
        assert_eq!(reply.html, "📋 List updated!");
        assert_eq!(messenger.list_message().unwrap(), EMPTY_LIST_HTML);
        let tracked = router.publisher().tracked().await.unwrap();

        router.dispatch(CHAT, "list", "").await;
        assert_eq!(router.publisher().tracked().await, Some(tracked));
        assert_eq!(messenger.edited_html(), vec![EMPTY_LIST_HTML.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_publishes_empty_list() {
        let (router, messenger) = router(KeyScheme::Sequential);
        router.dispatch(CHAT, "add", "Milk").await;
        router.dispatch(CHAT, "add", "Eggs").await;

        let reply = router.dispatch(CHAT, "clear", "").await;
        assert_eq!(reply.html, "🗑 Grocery list cleared!");
        assert_eq!(messenger.list_message().unwrap(), EMPTY_LIST_HTML);
    }

    #[tokio::test(start_paused = true)]
    async fn by_name_scheme_uses_names_and_status_words() {
        let (router, messenger) = router(KeyScheme::ByName);
        router.dispatch(CHAT, "add", "Oat Milk").await;

        let reply = router.dispatch(CHAT, "add", "oat milk").await;
        assert_eq!(reply.html, "⚠️ <code>oat milk</code> is already on the list.");
        assert!(!reply.published);

        let reply = router.dispatch(CHAT, "check", "OAT MILK bought").await;
        assert_eq!(reply.html, "🔄 Toggled <code>Oat Milk</code> to ✅ Bought.");
        // Explicit status is a set, not a flip.
        router.dispatch(CHAT, "check", "oat milk | yes").await;
        assert_eq!(
            messenger.list_message().unwrap(),
            "📝 <b>Grocery List:</b>\n1. ✅ Oat Milk"
        );

        router.dispatch(CHAT, "check", "oat milk not bought").await;
        assert_eq!(
            messenger.list_message().unwrap(),
            "📝 <b>Grocery List:</b>\n1. ❌ Oat Milk"
        );

        let reply = router.dispatch(CHAT, "check", "oat milk | later").await;
        assert!(reply.html.starts_with("⚠️ Unknown status <code>later</code>"));

        let reply = router.dispatch(CHAT, "remove", "Oat Milk").await;
        assert_eq!(reply.html, "🗑 Removed item <code>oat milk</code>.");
        assert_eq!(messenger.list_message().unwrap(), EMPTY_LIST_HTML);
    }

    #[tokio::test(start_paused = true)]
    async fn check_without_status_toggles() {
        let (router, messenger) = router(KeyScheme::Sequential);
        router.dispatch(CHAT, "add", "Milk").await;
        router.dispatch(CHAT, "check", "1").await;
        assert_eq!(
            messenger.list_message().unwrap(),
            "📝 <b>Grocery List:</b>\n1. ✅ Milk"
        );
        router.dispatch(CHAT, "check", "1 no").await;
        assert_eq!(
            messenger.list_message().unwrap(),
            "📝 <b>Grocery List:</b>\n1. ❌ Milk"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_replies_are_deleted_after_ttl() {
        let (router, messenger) = router(KeyScheme::Sequential);
        router.dispatch(CHAT, "add", "Milk").await;
        let help = router.dispatch(CHAT, "help", "").await;
        assert!(!help.transient);
        assert!(messenger.deletes.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;

        let deleted = messenger.deletes.lock().unwrap().clone();
        assert_eq!(deleted.len(), 1);
        let ack = messenger
            .sends
            .lock()
            .unwrap()
            .iter()
            .find(|(_, h)| h.starts_with("✅ Added"))
            .map(|(m, _)| *m)
            .unwrap();
        assert_eq!(deleted[0], ack);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_commands_do_not_interleave() {
        let (router, messenger) = router(KeyScheme::Sequential);
        let router = Arc::new(router);

        let a = {
            let r = router.clone();
            tokio::spawn(async move { r.dispatch(CHAT, "add", "Milk").await })
        };
        let b = {
            let r = router.clone();
            tokio::spawn(async move { r.dispatch(CHAT, "add", "Eggs").await })
        };
        a.await.unwrap();
        b.await.unwrap();

        let list_sends = messenger
            .sent_html()
            .into_iter()
            .filter(|h| h.starts_with("📝"))
            .count();
        assert_eq!(list_sends, 1, "second command must edit the first's message");
        let shown = messenger.list_message().unwrap();
        assert!(shown.contains("1. ❌") && shown.contains("2. ❌"));
        assert!(shown.contains("Milk") && shown.contains("Eggs"));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_command_is_reported() {
        let (router, _messenger) = router(KeyScheme::Sequential);
        let reply = router.dispatch(CHAT, "frobnicate", "").await;
        assert_eq!(reply.html, "Unknown command: /frobnicate");
        assert!(!reply.published);
    }

    #[test]
    fn parse_validates_before_touching_the_list() {
        assert_eq!(
            GroceryCommand::parse(KeyScheme::Sequential, "check", "2 yes"),
            Ok(GroceryCommand::Check {
                key: ItemKey::Index(2),
                status: Some(BoughtStatus(true)),
            })
        );
        assert_eq!(
            GroceryCommand::parse(KeyScheme::Sequential, "check", "2 maybe"),
            Err(CommandError::List(ListError::InvalidStatus("maybe".to_string())))
        );
        assert_eq!(
            GroceryCommand::parse(KeyScheme::ByName, "toggle", "  Eggs "),
            Ok(GroceryCommand::Toggle {
                key: ItemKey::Name("eggs".to_string())
            })
        );
    }

    #[test]
    fn check_with_empty_status_after_pipe_is_a_usage_error() {
        assert_eq!(
            GroceryCommand::parse(KeyScheme::ByName, "check", "Eggs |"),
            Err(CommandError::Usage("/check <item> | <status>".to_string()))
        );
        assert_eq!(
            GroceryCommand::parse(KeyScheme::ByName, "check", "Eggs | bought"),
            Ok(GroceryCommand::Check {
                key: ItemKey::Name("eggs".to_string()),
                status: Some(BoughtStatus(true)),
            })
        );
    }

    #[test]
    fn by_name_check_splits_trailing_status_words() {
        let split = |args: &str| split_check_args(KeyScheme::ByName, args);
        let owned = |item: &str, status: Option<&str>| {
            (item.to_string(), status.map(str::to_string))
        };

        assert_eq!(
            split("Oat Milk not bought"),
            owned("Oat Milk", Some("not bought"))
        );
        assert_eq!(split("Eggs YES"), owned("Eggs", Some("YES")));
        assert_eq!(split("no"), owned("no", None));
        assert_eq!(split("Tofu"), owned("Tofu", None));
        assert_eq!(split("Tofu | bought"), owned("Tofu", Some("bought")));
        assert_eq!(
            split_check_args(KeyScheme::Sequential, "3   check"),
            owned("3", Some("check"))
        );
    }
}
