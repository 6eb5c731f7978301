//! Conversation assembly.
//!
//! [`build_messages`] produces the exact message sequence sent to the chat
//! model: one fixed system turn, at most the last eight history turns in
//! original order, then one user turn rendered from a template. The
//! template differs on whether grounding context was retrieved; when it
//! was not, the model is told to answer from general knowledge and never
//! mention that nothing was found.

use crate::models::ChatMessage;

/// History turns included in an assembled prompt.
pub const HISTORY_WINDOW: usize = 8;

/// Fixed assistant persona and ground rules, always the first message.
pub const SYSTEM_PROMPT: &str = "\
You are UniAssist, an expert and supportive university assistant for students of the institution.

ROLE: help students with every aspect of campus life.
TOPICS: enrollment, certificates, scholarships, internships, absences, exams, payments, campus regulations, the academic calendar, final-year projects, and study guidance.

RULES:
1. Language: reply in the language the student writes in (including French and Arabic).
2. Structure: clear answers, with numbered or bulleted lists where helpful.
3. Accuracy: when document context is provided, base your answer on it FIRST.
4. Honesty: if you do not know, say so and refer the student to the administration office.
5. Tone: warm, professional, encouraging.
6. Format: use **bold** for key information.";

/// Assemble the message list for one question.
///
/// `history` should already be sanitized and length-capped by the caller;
/// only its final [`HISTORY_WINDOW`] turns are kept, order preserved.
pub fn build_messages(
    question: &str,
    context: &str,
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2 + HISTORY_WINDOW);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));

    let skip = history.len().saturating_sub(HISTORY_WINDOW);
    for turn in &history[skip..] {
        messages.push(turn.clone());
    }

    messages.push(ChatMessage::user(render_user_turn(question, context)));
    messages
}

fn render_user_turn(question: &str, context: &str) -> String {
    if context.is_empty() {
        format!(
            "Question: {}\n\n\
             Answer precisely and with clear structure. Do NOT mention any absence of documents or context. Answer directly from your knowledge of the institution and of universities in general.",
            question
        )
    } else {
        format!(
            "Question: {}\n\n\
             === OFFICIAL CONTEXT ===\n\
             {}\n\
             ========================\n\n\
             Base your answer on this context first. Supplement with your general knowledge only where needed.",
            question, context
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn history(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(&format!("question {}", i))
                } else {
                    ChatMessage::assistant(&format!("answer {}", i))
                }
            })
            .collect()
    }

    #[test]
    fn starts_with_system_and_ends_with_user() {
        let msgs = build_messages("when are exams?", "", &history(2));
        assert_eq!(msgs.first().map(|m| m.role), Some(Role::System));
        assert_eq!(msgs.last().map(|m| m.role), Some(Role::User));
        assert_eq!(msgs.len(), 4);
    }

    #[test]
    fn keeps_only_the_last_eight_history_turns() {
        let full = history(12);
        let msgs = build_messages("q", "", &full);
        assert_eq!(msgs.len(), 10);
        // The first kept turn is the 5th of the original history.
        assert_eq!(msgs[1].content, "question 4");
        assert_eq!(msgs[8].content, "answer 11");
    }

    #[test]
    fn preserves_history_order_and_content() {
        let full = history(4);
        let msgs = build_messages("q", "", &full);
        for (i, turn) in full.iter().enumerate() {
            assert_eq!(&msgs[1 + i], turn);
        }
    }

    #[test]
    fn context_template_embeds_both_verbatim() {
        let msgs = build_messages(
            "when are exams?",
            "[Source: calendar, Page 2]\nExams start in June.",
            &[],
        );
        let user = &msgs.last().unwrap().content;
        assert!(user.contains("when are exams?"));
        assert!(user.contains("Exams start in June."));
        assert!(user.contains("OFFICIAL CONTEXT"));
    }

    #[test]
    fn no_context_template_hides_the_absence() {
        let msgs = build_messages("when are exams?", "", &[]);
        let user = &msgs.last().unwrap().content;
        assert!(user.contains("when are exams?"));
        assert!(!user.contains("CONTEXT"));
        assert!(user.contains("Do NOT mention"));
    }
}
