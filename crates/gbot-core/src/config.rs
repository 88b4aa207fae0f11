use std::{env, fs, net::SocketAddr, path::Path, time::Duration};

use crate::{errors::Error, grocery::KeyScheme, Result};

/// Typed configuration for the bot, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub key_scheme: KeyScheme,

    // Transient replies
    pub ack_delete_after: Duration,

    // Liveness responder
    pub liveness_enabled: bool,
    pub liveness_addr: SocketAddr,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::load_from(env_str)
    }

    /// Build the config from `lookup`, which maps variable names to values.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Required env vars (`TOKEN` is accepted for older deployments).
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| lookup("TOKEN").and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let key_scheme = match lookup("GROCERY_KEY_SCHEME").and_then(non_empty) {
            Some(raw) => raw.parse::<KeyScheme>()?,
            None => KeyScheme::default(),
        };

        let ack_secs = lookup("ACK_DELETE_AFTER_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(5);
        let ack_delete_after = Duration::from_secs(ack_secs);

        let liveness_enabled = lookup("LIVENESS_ENABLED")
            .map(|s| parse_bool(&s))
            .unwrap_or(true);
        let raw_addr = lookup("LIVENESS_ADDR")
            .and_then(non_empty)
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let liveness_addr = raw_addr.trim().parse::<SocketAddr>().map_err(|e| {
            Error::Config(format!("LIVENESS_ADDR is not a socket address ({raw_addr}): {e}"))
        })?;

        Ok(Self {
            telegram_bot_token,
            key_scheme,
            ack_delete_after,
            liveness_enabled,
            liveness_addr,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
