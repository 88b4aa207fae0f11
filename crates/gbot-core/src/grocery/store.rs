use std::{fmt, str::FromStr};

use crate::errors::Error;

/// How items are identified by users.
///
/// Exactly one scheme is active per list; they are not interchangeable since
/// renumbering and duplicate handling contradict each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyScheme {
    /// Items are numbered `1..N` in insertion order and renumbered on removal.
    /// Duplicate names are allowed.
    #[default]
    Sequential,
    /// Items are keyed by their lowercased name. Duplicates are rejected and
    /// removal never re-keys other items.
    ByName,
}

impl FromStr for KeyScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" | "number" | "numbered" => Ok(Self::Sequential),
            "name" | "by-name" | "by_name" => Ok(Self::ByName),
            other => Err(Error::Config(format!(
                "unknown key scheme `{other}` (expected `sequential` or `name`)"
            ))),
        }
    }
}

impl KeyScheme {
    /// Parse user input into a key for this scheme.
    ///
    /// Returns `None` when the input cannot name any item (not a positive
    /// number, or blank).
    pub fn parse_key(self, raw: &str) -> Option<ItemKey> {
        match self {
            KeyScheme::Sequential => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .map(ItemKey::Index),
            KeyScheme::ByName => {
                let name = normalize_name(raw);
                if name.is_empty() {
                    None
                } else {
                    Some(ItemKey::Name(name))
                }
            }
        }
    }
}

/// Identity by which users refer to an item.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Index(u32),
    Name(String),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Index(n) => write!(f, "{n}"),
            ItemKey::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroceryItem {
    pub key: ItemKey,
    pub name: String,
    pub bought: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("item {0} not found")]
    NotFound(ItemKey),

    #[error("{0} is already on the list")]
    DuplicateItem(String),

    #[error("unknown status: {0}")]
    InvalidStatus(String),
}

/// Free-text bought/not-bought status accepted by `/check`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoughtStatus(pub bool);

impl BoughtStatus {
    pub fn parse(raw: &str) -> Result<Self, ListError> {
        let word = raw.trim().to_lowercase();
        let word = word.split_whitespace().collect::<Vec<_>>().join(" ");
        match word.as_str() {
            "bought" | "check" | "yes" => Ok(Self(true)),
            "not bought" | "uncheck" | "no" => Ok(Self(false)),
            _ => Err(ListError::InvalidStatus(raw.trim().to_string())),
        }
    }
}

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    bought: bool,
}

/// Ordered in-memory grocery list.
///
/// Entries are kept in insertion order. Under [`KeyScheme::Sequential`] the
/// key of an entry is its 1-based position, so removing an entry re-keys
/// everything after it.
#[derive(Clone, Debug)]
pub struct GroceryList {
    scheme: KeyScheme,
    entries: Vec<Entry>,
}

impl GroceryList {
    pub fn new(scheme: KeyScheme) -> Self {
        Self {
            scheme,
            entries: Vec::new(),
        }
    }

    pub fn key_scheme(&self) -> KeyScheme {
        self.scheme
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parse_key(&self, raw: &str) -> Option<ItemKey> {
        self.scheme.parse_key(raw)
    }

    pub fn add(&mut self, name: &str) -> Result<ItemKey, ListError> {
        let name = name.trim().to_string();
        if self.scheme == KeyScheme::ByName {
            let key = ItemKey::Name(normalize_name(&name));
            if self.position(&key).is_some() {
                return Err(ListError::DuplicateItem(name));
            }
        }

        self.entries.push(Entry {
            name,
            bought: false,
        });
        Ok(self.key_at(self.entries.len() - 1))
    }

    pub fn remove(&mut self, key: &ItemKey) -> bool {
        match self.position(key) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, key: &ItemKey) -> Result<(String, bool), ListError> {
        let entry = self.entry_mut(key)?;
        entry.bought = !entry.bought;
        Ok((entry.name.clone(), entry.bought))
    }

    pub fn set_bought(&mut self, key: &ItemKey, bought: bool) -> Result<String, ListError> {
        let entry = self.entry_mut(key)?;
        entry.bought = bought;
        Ok(entry.name.clone())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn snapshot(&self) -> Vec<GroceryItem> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, e)| GroceryItem {
                key: self.key_at(idx),
                name: e.name.clone(),
                bought: e.bought,
            })
            .collect()
    }

    fn entry_mut(&mut self, key: &ItemKey) -> Result<&mut Entry, ListError> {
        let idx = self
            .position(key)
            .ok_or_else(|| ListError::NotFound(key.clone()))?;
        Ok(&mut self.entries[idx])
    }

    fn key_at(&self, idx: usize) -> ItemKey {
        match self.scheme {
            KeyScheme::Sequential => ItemKey::Index(idx as u32 + 1),
            KeyScheme::ByName => ItemKey::Name(normalize_name(&self.entries[idx].name)),
        }
    }

    fn position(&self, key: &ItemKey) -> Option<usize> {
        match (self.scheme, key) {
            (KeyScheme::Sequential, ItemKey::Index(n)) => {
                let idx = (*n as usize).checked_sub(1)?;
                (idx < self.entries.len()).then_some(idx)
            }
            (KeyScheme::ByName, ItemKey::Name(name)) => {
                let wanted = normalize_name(name);
                self.entries
                    .iter()
                    .position(|e| normalize_name(&e.name) == wanted)
            }
            // A key from the other scheme never names anything here.
            _ => None,
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
