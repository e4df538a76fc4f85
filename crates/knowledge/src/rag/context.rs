//! Prompt context assembly: conversation window and retrieved passages.

use crate::types::{HistoryEntry, ScoredChunk};

/// Number of most recent exchanges kept in the prompt.
pub const HISTORY_WINDOW: usize = 3;

pub const NO_HISTORY: &str = "No previous conversation.";
pub const NO_CONTEXT: &str = "No relevant context found in the cookbook.";

/// Render the last [`HISTORY_WINDOW`] non-blank exchanges, oldest first.
pub fn format_history(entries: &[HistoryEntry]) -> String {
    let usable: Vec<&HistoryEntry> = entries.iter().filter(|e| !e.is_blank()).collect();
    let window = &usable[usable.len().saturating_sub(HISTORY_WINDOW)..];

    if window.is_empty() {
        return NO_HISTORY.to_string();
    }

    window
        .iter()
        .map(|e| format!("User: {}\nAssistant: {}", e.question.trim(), e.answer.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Join retrieved chunk texts in retrieval order.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }

    chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn scored(text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                text: text.to_string(),
                source_page: 1,
                chunk_index: 0,
            },
            score,
        }
    }

    #[test]
    fn test_empty_history_placeholder() {
        assert_eq!(format_history(&[]), NO_HISTORY);
        assert_eq!(format_history(&[HistoryEntry::new(" ", "")]), NO_HISTORY);
    }

    #[test]
    fn test_history_keeps_last_three() {
        let entries: Vec<HistoryEntry> = (1..=5)
            .map(|i| HistoryEntry::new(format!("question {}", i), format!("answer {}", i)))
            .collect();

        let rendered = format_history(&entries);
        assert!(!rendered.contains("question 1"));
        assert!(!rendered.contains("question 2"));
        assert!(rendered.starts_with("User: question 3\nAssistant: answer 3"));
        assert!(rendered.ends_with("User: question 5\nAssistant: answer 5"));
        assert_eq!(rendered.matches("User: ").count(), 3);
    }

    #[test]
    fn test_blank_entries_do_not_use_window_slots() {
        let entries = vec![
            HistoryEntry::new("Which recipes use rice?", "Recipe A: risotto."),
            HistoryEntry::new("", ""),
            HistoryEntry::new("And pasta?", "Recipe B: carbonara."),
            HistoryEntry::new("  ", " "),
            HistoryEntry::new("Any soups?", "Recipe C: minestrone."),
        ];

        let rendered = format_history(&entries);
        assert!(rendered.contains("Recipe A"));
        assert_eq!(rendered.matches("User: ").count(), 3);
    }

    #[test]
    fn test_context_placeholder_and_order() {
        assert_eq!(format_context(&[]), NO_CONTEXT);

        let chunks = vec![scored("Knead the dough.", 0.9), scored("Bake for 30 minutes.", 0.7)];
        assert_eq!(
            format_context(&chunks),
            "Knead the dough.\n\nBake for 30 minutes."
        );
    }
}
