use std::sync::Arc;

use teloxide::prelude::*;
use tracing::debug;

use gbot_core::domain::ChatId;

use crate::router::AppState;

struct ParsedCommand {
    name: String,
    /// Bot named in `/cmd@botname`, if any.
    target: Option<String>,
    args: String,
}

fn parse_command(text: &str) -> ParsedCommand {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let args = parts.next().unwrap_or("").trim().to_string();

    let (name, target) = match first.trim_start_matches('/').split_once('@') {
        Some((name, target)) => (name, Some(target.to_string())),
        None => (first.trim_start_matches('/'), None),
    };

    ParsedCommand {
        name: name.to_lowercase(),
        target,
        args,
    }
}

/// Commands without a mention are for everyone; mentions must name us.
fn is_addressed_to(target: Option<&str>, bot_username: &str) -> bool {
    target.map_or(true, |t| t.eq_ignore_ascii_case(bot_username))
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let cmd = parse_command(text);
    if cmd.name.is_empty() {
        return Ok(());
    }
    if !is_addressed_to(cmd.target.as_deref(), &state.bot_username) {
        debug!(chat_id = msg.chat.id.0, target = ?cmd.target, "command for another bot ignored");
        return Ok(());
    }

    let user = msg.from().and_then(|u| u.username.clone());
    debug!(chat_id = msg.chat.id.0, user = ?user, command = %cmd.name, "command received");

    state
        .commands
        .dispatch(ChatId(msg.chat.id.0), &cmd.name, &cmd.args)
        .await;
    Ok(())
}
