//! Query plan selection.

/// Engine-independent shape of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Single-word input, scored by the engine's default free-text parser
    /// over the whole document.
    FreeText(String),
    /// Multi-word input, matched as an exact ordered phrase over the body.
    Phrase(Vec<String>),
}

impl QueryPlan {
    /// Choose a plan for user input.
    ///
    /// Input with whitespace is split on single spaces and always becomes
    /// a phrase, never an implicit AND. Returns `None` for blank input.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if !text.contains(char::is_whitespace) {
            return Some(Self::FreeText(text.to_string()));
        }

        let tokens: Vec<String> = text
            .split(' ')
            .filter(|token| !token.is_empty())
            .map(String::from)
            .collect();

        if tokens.len() < 2 {
            // Separated only by tabs or newlines.
            return Some(Self::FreeText(text.to_string()));
        }

        Some(Self::Phrase(tokens))
    }

    /// Check whether this is a phrase plan.
    #[must_use]
    pub const fn is_phrase(&self) -> bool {
        matches!(self, Self::Phrase(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_word_is_free_text() {
        assert_eq!(
            QueryPlan::from_text("hello"),
            Some(QueryPlan::FreeText("hello".to_string()))
        );
    }

    #[test]
    fn test_multi_word_is_phrase() {
        assert_eq!(
            QueryPlan::from_text("hello world"),
            Some(QueryPlan::Phrase(vec![
                "hello".to_string(),
                "world".to_string()
            ]))
        );
    }

    #[test]
    fn test_phrase_keeps_token_order() {
        let plan = QueryPlan::from_text("easy is indexing").unwrap();
        assert_eq!(
            plan,
            QueryPlan::Phrase(vec![
                "easy".to_string(),
                "is".to_string(),
                "indexing".to_string()
            ])
        );
        assert!(plan.is_phrase());
    }

    #[test]
    fn test_repeated_spaces_collapse() {
        assert_eq!(
            QueryPlan::from_text("  hello   world "),
            Some(QueryPlan::Phrase(vec![
                "hello".to_string(),
                "world".to_string()
            ]))
        );
    }

    #[test]
    fn test_blank_input_has_no_plan() {
        assert_eq!(QueryPlan::from_text(""), None);
        assert_eq!(QueryPlan::from_text("   "), None);
    }

    #[test]
    fn test_tab_separated_falls_back_to_free_text() {
        let plan = QueryPlan::from_text("hello\tworld").unwrap();
        assert!(!plan.is_phrase());
    }
}
