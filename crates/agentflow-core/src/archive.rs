use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::state::ChatMessage;
use super::state::MessageRole;
use super::state::TransparencyLevel;

pub const TITLE_MAX_CHARS: usize = 40;
pub const FALLBACK_TITLE: &str = "New conversation";

/// A finished transcript, kept read-only in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub transparency_level: TransparencyLevel,
}

/// Archived conversations, newest first.
///
/// `revision` moves on every mutation so observers can tell whether the
/// archive needs to be written again without comparing entries. Clones share
/// the entries until one side mutates.
#[derive(Debug, Clone, Default)]
pub struct ConversationArchive {
    entries: Arc<Vec<Conversation>>,
    revision: u64,
}

impl PartialEq for ConversationArchive {
    fn eq(&self, other: &Self) -> bool {
        self.revision == other.revision
            && (Arc::ptr_eq(&self.entries, &other.entries) || self.entries == other.entries)
    }
}

impl ConversationArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Conversation>) -> Self {
        Self {
            entries: Arc::new(entries),
            revision: 0,
        }
    }

    pub fn entries(&self) -> &[Conversation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Prepends a snapshot of `messages`. An empty transcript is not archived.
    pub fn archive(
        &mut self,
        messages: &[ChatMessage],
        transparency_level: TransparencyLevel,
    ) -> Option<&Conversation> {
        if messages.is_empty() {
            return None;
        }
        let created_at = messages
            .first()
            .map(|message| message.timestamp)
            .unwrap_or_else(Utc::now);
        Arc::make_mut(&mut self.entries).insert(
            0,
            Conversation {
                id: uuid::Uuid::new_v4().to_string(),
                title: derive_title(messages),
                messages: messages.to_vec(),
                created_at,
                transparency_level,
            },
        );
        self.revision += 1;
        self.entries.first()
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        Arc::make_mut(&mut self.entries).remove(index);
        self.revision += 1;
        true
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        if removed > 0 {
            self.entries = Arc::new(Vec::new());
            self.revision += 1;
        }
        removed
    }
}

/// First user message, cut to [`TITLE_MAX_CHARS`] characters with a trailing
/// ellipsis when longer.
pub fn derive_title(messages: &[ChatMessage]) -> String {
    let Some(first) = messages
        .iter()
        .find(|message| message.role == MessageRole::User)
        .map(|message| message.content.trim())
        .filter(|content| !content.is_empty())
    else {
        return FALLBACK_TITLE.to_string();
    };

    if first.chars().count() > TITLE_MAX_CHARS {
        let cut: String = first.chars().take(TITLE_MAX_CHARS).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::InputModality;

    fn user(content: &str) -> ChatMessage {
        ChatMessage::new(MessageRole::User, content, InputModality::Text)
    }

    #[test]
    fn archive_prepends_newest_first() {
        let mut archive = ConversationArchive::new();
        archive.archive(&[user("first")], TransparencyLevel::FullTransparency);
        archive.archive(&[user("second")], TransparencyLevel::BlackBox);

        let titles: Vec<_> = archive.entries().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert_eq!(archive.entries()[0].transparency_level, TransparencyLevel::BlackBox);
        assert_eq!(archive.revision(), 2);
    }

    #[test]
    fn empty_transcript_is_not_archived() {
        let mut archive = ConversationArchive::new();
        assert!(archive
            .archive(&[], TransparencyLevel::FullTransparency)
            .is_none());
        assert!(archive.is_empty());
        assert_eq!(archive.revision(), 0);
    }

    #[test]
    fn long_titles_are_truncated_on_char_boundaries() {
        let text = "é".repeat(50);
        let title = derive_title(&[user(&text)]);
        assert_eq!(title, format!("{}...", "é".repeat(40)));
    }

    #[test]
    fn title_falls_back_without_user_message() {
        let title = derive_title(&[ChatMessage::assistant("hello")]);
        assert_eq!(title, FALLBACK_TITLE);
    }

    #[test]
    fn delete_and_clear_report_changes() {
        let mut archive = ConversationArchive::new();
        let id = archive
            .archive(&[user("keep me")], TransparencyLevel::PlanPreview)
            .map(|c| c.id.clone())
            .expect("archived");

        assert!(!archive.delete("missing"));
        assert_eq!(archive.revision(), 1);
        assert!(archive.delete(&id));
        assert_eq!(archive.clear(), 0);
        assert_eq!(archive.revision(), 2);
    }

    #[test]
    fn clones_share_entries_until_mutated() {
        let mut archive = ConversationArchive::new();
        archive.archive(&[user("shared")], TransparencyLevel::FullTransparency);

        let mut copy = archive.clone();
        assert!(Arc::ptr_eq(&archive.entries, &copy.entries));
        assert_eq!(copy, archive);

        copy.archive(&[user("only in copy")], TransparencyLevel::FullTransparency);
        assert!(!Arc::ptr_eq(&archive.entries, &copy.entries));
        assert_eq!(archive.len(), 1);
        assert_eq!(copy.len(), 2);
        assert_ne!(copy, archive);
    }
}
