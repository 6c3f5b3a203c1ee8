use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use shared::model::{ChatMessage, Notice, Track, TypingNotice};

pub const REVEAL_MS_PER_CHAR: u64 = 50;
pub const TYPING_IDLE_MS: u64 = 2_000;
pub const MAX_DRAFT_CHARS: usize = 200;
pub const SEARCH_COMMAND: &str = "/search";

/// What a submitted draft turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum Compose {
    Ignore,
    Search(String),
    Message(String),
}

pub fn compose(draft: &str, authenticated: bool) -> Compose {
    let text = draft.trim();
    if text.is_empty() || !authenticated {
        return Compose::Ignore;
    }

    match text.strip_prefix(SEARCH_COMMAND) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            let query = rest.trim();
            if query.is_empty() {
                Compose::Ignore
            } else {
                Compose::Search(query.to_string())
            }
        }
        _ => Compose::Message(text.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    Remote,
    SearchResults { query: String, tracks: Vec<Track> },
    Notice,
}

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub message: ChatMessage,
    pub kind: EntryKind,
    arrived_at: u64,
    revealed: usize,
    total: usize,
}

impl ChatEntry {
    fn new(message: ChatMessage, kind: EntryKind, arrived_at: u64, animate: bool) -> Self {
        let total = message.message.chars().count();
        ChatEntry {
            message,
            kind,
            arrived_at,
            revealed: if animate { 0 } else { total },
            total,
        }
    }

    pub fn is_animating(&self) -> bool {
        self.revealed < self.total
    }

    pub fn displayed(&self) -> &str {
        let text = &self.message.message;
        match text.char_indices().nth(self.revealed) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }

    fn advance(&mut self, now_ms: u64) {
        if self.is_animating() {
            let due = (now_ms.saturating_sub(self.arrived_at) / REVEAL_MS_PER_CHAR) as usize;
            self.revealed = due.min(self.total);
        }
    }

    fn sender_key(&self) -> &str {
        if self.message.user_id.is_empty() {
            &self.message.username
        } else {
            &self.message.user_id
        }
    }
}

/// Consecutive entries from one sender.
#[derive(Debug)]
pub struct Group<'a> {
    pub username: &'a str,
    pub avatar: Option<&'a str>,
    pub entries: Vec<&'a ChatEntry>,
}

#[derive(Debug, Default)]
pub struct TypingIndicator {
    active: bool,
    last_keystroke: u64,
}

impl TypingIndicator {
    /// Returns the `isTyping` value to emit, if any.
    pub fn keystroke(&mut self, now_ms: u64) -> Option<bool> {
        self.last_keystroke = now_ms;
        if self.active {
            None
        } else {
            self.active = true;
            Some(true)
        }
    }

    pub fn tick(&mut self, now_ms: u64) -> Option<bool> {
        if self.active && now_ms.saturating_sub(self.last_keystroke) >= TYPING_IDLE_MS {
            self.active = false;
            Some(false)
        } else {
            None
        }
    }

    pub fn stop(&mut self) -> Option<bool> {
        if self.active {
            self.active = false;
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct ChatView {
    entries: Vec<ChatEntry>,
    draft: String,
    typing: TypingIndicator,
    typists: BTreeMap<String, String>,
    local_ids: u64,
}

impl ChatView {
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Updates the draft and returns a typing event to emit, if any.
    pub fn edit_draft(&mut self, text: String, now_ms: u64) -> Option<bool> {
        self.draft = text.chars().take(MAX_DRAFT_CHARS).collect();
        if self.draft.is_empty() {
            self.typing.stop()
        } else {
            self.typing.keystroke(now_ms)
        }
    }

    /// Classifies the draft; anything but `Ignore` clears it.
    pub fn submit(&mut self, authenticated: bool) -> (Compose, Option<bool>) {
        let compose = compose(&self.draft, authenticated);
        if compose == Compose::Ignore {
            return (compose, None);
        }
        self.draft.clear();
        (compose, self.typing.stop())
    }

    pub fn set_history(&mut self, messages: Vec<ChatMessage>, now_ms: u64) {
        self.entries = messages
            .into_iter()
            .map(|message| ChatEntry::new(message, EntryKind::Remote, now_ms, false))
            .collect();
    }

    pub fn push_message(&mut self, message: ChatMessage, now_ms: u64) {
        self.typists.remove(&message.user_id);
        self.entries
            .push(ChatEntry::new(message, EntryKind::Remote, now_ms, true));
    }

    pub fn push_search_results(&mut self, query: String, tracks: Vec<Track>, now_ms: u64) {
        let text = if tracks.is_empty() {
            format!("No results for \"{}\"", query)
        } else {
            format!("Results for \"{}\":", query)
        };
        let message = self.local_message("Radio", text);
        self.entries.push(ChatEntry::new(
            message,
            EntryKind::SearchResults { query, tracks },
            now_ms,
            true,
        ));
    }

    pub fn push_notice(&mut self, notice: Notice, now_ms: u64) {
        let message = self.local_message("System", notice.message);
        self.entries
            .push(ChatEntry::new(message, EntryKind::Notice, now_ms, false));
    }

    fn local_message(&mut self, username: &str, text: String) -> ChatMessage {
        self.local_ids += 1;
        ChatMessage {
            id: format!("local-{}", self.local_ids),
            user_id: String::new(),
            username: username.to_string(),
            avatar: None,
            message: text,
            timestamp: None,
        }
    }

    pub fn set_typist(&mut self, notice: TypingNotice, own_user_id: &str) {
        if notice.user_id == own_user_id {
            return;
        }
        if notice.is_typing {
            self.typists.insert(notice.user_id, notice.username);
        } else {
            self.typists.remove(&notice.user_id);
        }
    }

    pub fn typists(&self) -> impl Iterator<Item = &str> {
        self.typists.values().map(String::as_str)
    }

    /// Advances reveal effects and the typing debounce.
    pub fn tick(&mut self, now_ms: u64) -> Option<bool> {
        for entry in &mut self.entries {
            entry.advance(now_ms);
        }
        self.typing.tick(now_ms)
    }

    pub fn groups(&self) -> Vec<Group<'_>> {
        let mut groups: Vec<Group<'_>> = Vec::new();
        let mut last_key: Option<&str> = None;

        for entry in &self.entries {
            let key = entry.sender_key();
            let continues = last_key == Some(key) && entry.kind == EntryKind::Remote;
            match groups.last_mut() {
                Some(group) if continues => group.entries.push(entry),
                _ => groups.push(Group {
                    username: &entry.message.username,
                    avatar: entry.message.avatar.as_deref(),
                    entries: vec![entry],
                }),
            }
            last_key = match entry.kind {
                EntryKind::Remote => Some(key),
                _ => None,
            };
        }

        groups
    }
}

/// Local `HH:MM` for an RFC 3339 string or a unix millisecond timestamp.
pub fn clock_label(timestamp: &str) -> Option<String> {
    clock_label_in(timestamp, &Local)
}

fn clock_label_in<Tz: TimeZone>(timestamp: &str, zone: &Tz) -> Option<String>
where
    Tz::Offset: fmt::Display,
{
    let instant = parse_instant(timestamp.trim())?;
    Some(instant.with_timezone(zone).format("%H:%M").to_string())
}

fn parse_instant(timestamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = timestamp.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(instant.with_timezone(&Utc));
    }
    // Zone-less database timestamps are UTC.
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(timestamp, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
