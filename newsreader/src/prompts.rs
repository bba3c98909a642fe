// Prompt templates for summarizing an article and answering questions about it.

use crate::sessions::ConversationTurn;

/// Turns replayed into a chat prompt when not configured otherwise.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

pub const NO_HISTORY_MARKER: &str = "No previous conversation.";

/// Renders prompts for the generation backend. Pure and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    history_window: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl PromptBuilder {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    pub fn summary_prompt(&self, article_content: &str) -> String {
        format!(
            r#"
You are an expert news analyst. Please analyze the following news article and provide a comprehensive summary.

ARTICLE CONTENT:
{article_content}

INSTRUCTIONS:
1. Create a clear, concise summary highlighting the key points
2. Include important statistics, quotes, and facts mentioned
3. Identify the main stakeholders and their perspectives
4. Note any significant implications or consequences discussed
5. Maintain objectivity and factual accuracy
6. Use bullet points for easy readability

Please provide your analysis:
"#
        )
    }

    pub fn chat_prompt(&self, article_content: &str, question: &str, turns: &[ConversationTurn]) -> String {
        let chat_history = self.render_transcript(turns);
        format!(
            r#"
You are a helpful AI assistant specialized in analyzing news articles. You have been provided with a news article and should answer questions about it based ONLY on the information contained in the article.

ARTICLE CONTENT:
{article_content}

PREVIOUS CONVERSATION:
{chat_history}

CURRENT QUESTION: {question}

INSTRUCTIONS:
1. Answer based ONLY on information from the provided article
2. If the question cannot be answered from the article, say so clearly
3. Be accurate and specific in your responses
4. Include relevant quotes or statistics when appropriate
5. Maintain a conversational but informative tone
6. If asked for your opinion, clarify that you're providing analysis based on the article content

Your response:
"#
        )
    }

    /// Last `history_window` turns, oldest first. Older turns are dropped.
    pub fn render_transcript(&self, turns: &[ConversationTurn]) -> String {
        let start = turns.len().saturating_sub(self.history_window);
        let transcript: String = turns[start..]
            .iter()
            .map(|t| format!("Q: {}\nA: {}\n\n", t.question, t.answer))
            .collect();

        if transcript.is_empty() {
            NO_HISTORY_MARKER.to_string()
        } else {
            transcript
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn turns(n: usize) -> Vec<ConversationTurn> {
        (1..=n)
            .map(|i| ConversationTurn {
                question: format!("question {i}"),
                answer: format!("answer {i}"),
                timestamp: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_transcript_keeps_last_five_oldest_first() {
        let builder = PromptBuilder::default();
        let transcript = builder.render_transcript(&turns(7));

        assert!(!transcript.contains("question 1\n"));
        assert!(!transcript.contains("question 2\n"));
        for i in 3..=7 {
            assert!(transcript.contains(&format!("Q: question {i}\nA: answer {i}\n\n")));
        }
        assert_eq!(transcript.matches("Q: ").count(), 5);
        let third = transcript.find("question 3").unwrap();
        let seventh = transcript.find("question 7").unwrap();
        assert!(third < seventh);
    }

    #[test]
    fn test_empty_history_uses_marker() {
        let builder = PromptBuilder::default();
        assert_eq!(builder.render_transcript(&[]), NO_HISTORY_MARKER);

        let prompt = builder.chat_prompt("Article body", "What happened?", &[]);
        assert!(prompt.contains("PREVIOUS CONVERSATION:\nNo previous conversation.\n"));
        assert!(prompt.contains("CURRENT QUESTION: What happened?"));
        assert!(prompt.contains("ARTICLE CONTENT:\nArticle body\n"));
    }

    #[test]
    fn test_custom_window() {
        let builder = PromptBuilder::new(2);
        let transcript = builder.render_transcript(&turns(4));
        assert_eq!(transcript, "Q: question 3\nA: answer 3\n\nQ: question 4\nA: answer 4\n\n");
    }

    #[test]
    fn test_summary_prompt_wraps_content() {
        let prompt = PromptBuilder::default().summary_prompt("Some {braced} content");
        assert!(prompt.contains("ARTICLE CONTENT:\nSome {braced} content\n"));
        assert!(prompt.contains("6. Use bullet points for easy readability"));
    }
}
