//! Prompt template for grounded loan-product answers.

/// Fixed answer used whenever retrieval yields no grounding context.
pub const FALLBACK_ANSWER: &str = "Sorry, I do not have enough information.";

/// Separator placed between retrieved chunks in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Join chunk texts, in rank order, into a single context block.
pub fn build_context<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts.into_iter().collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Render the full prompt for `question` grounded on `context`.
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "\nYou are an expert assistant for the Bank of Maharashtra. Use ONLY the context \
         provided below to answer the user's loan product question as accurately as \
         possible.\n\n\
         Context:\n{context}\n\n\
         User Question:\n{question}\n\n\
         If you do not know the answer from the provided context, reply \"{FALLBACK_ANSWER}\"\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_joined_with_separator() {
        let context = build_context(["a", "b", "c"]);
        assert_eq!(context, "a\n---\nb\n---\nc");
    }

    #[test]
    fn prompt_contains_context_question_and_fallback() {
        let prompt = render_prompt("Interest rate is 8.5%.", "What is the rate?");
        assert!(prompt.contains("Context:\nInterest rate is 8.5%.\n"));
        assert!(prompt.contains("User Question:\nWhat is the rate?\n"));
        assert!(prompt.contains(FALLBACK_ANSWER));
    }

    #[test]
    fn question_placeholder_in_context_is_not_substituted() {
        let prompt = render_prompt("literal {question} marker", "Q?");
        assert!(prompt.contains("literal {question} marker"));
        assert!(prompt.contains("User Question:\nQ?"));
    }
}
