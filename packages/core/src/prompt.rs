//! Prompt assembly from page context and ranked notes.

use std::fmt::Write;

use crate::{PageContext, RelatedNote};

const UNTITLED: &str = "Untitled";
const NO_CONTENT: &str = "No content";
const TASK: &str = "Task: Explain how these related notes connect to the current page. What insights or patterns emerge? Be concise and use Markdown.";

/// Builds the user prompt for a synthesis request.
///
/// Notes are rendered in the order given, truncated to `max_notes`. Ranking
/// is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    max_notes: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self { max_notes: 5 }
    }
}

impl PromptBuilder {
    pub fn new(max_notes: usize) -> Self {
        Self { max_notes }
    }

    pub fn max_notes(&self) -> usize {
        self.max_notes
    }

    pub fn construct_prompt(&self, context: &PageContext, notes: &[RelatedNote]) -> String {
        let mut prompt = String::new();

        let _ = writeln!(prompt, "Current Page: **{}**", context.title().unwrap_or_default());
        if let Some(url) = context.url() {
            let _ = writeln!(prompt, "URL: {}", url);
        }

        prompt.push_str("\nRelated Notes from Your Library:\n");
        let entries: Vec<String> = notes
            .iter()
            .take(self.max_notes)
            .enumerate()
            .map(|(index, note)| render_note(index + 1, note))
            .collect();
        prompt.push_str(&entries.join("\n\n"));

        prompt.push_str("\n\n");
        prompt.push_str(TASK);
        prompt
    }
}

fn render_note(ordinal: usize, note: &RelatedNote) -> String {
    let relevance = note
        .relevance_percent()
        .map(|pct| format!(" ({}% relevant)", pct))
        .unwrap_or_default();
    format!(
        "{}. **{}**{}\n   {}",
        ordinal,
        note.title().unwrap_or(UNTITLED),
        relevance,
        note.body().unwrap_or(NO_CONTENT)
    )
}
