pub(crate) const THINK_OPEN: &str = "<think>";
pub(crate) const THINK_CLOSE: &str = "</think>";

/// Split a generated text into its `<think>` block and the answer after it.
///
/// Returns `(think_content, response_content)`. Without a complete think block
/// the whole text is the response. An empty text has neither.
pub fn split_think(text: &str) -> (Option<String>, Option<String>) {
    if text.is_empty() {
        return (None, None);
    }
    match (text.find(THINK_OPEN), text.find(THINK_CLOSE)) {
        (Some(start), Some(end)) if end > start => {
            let think_end = end + THINK_CLOSE.len();
            (
                Some(text[start..think_end].to_owned()),
                Some(text[think_end..].trim().to_owned()),
            )
        }
        _ => (None, Some(text.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_think_block_from_answer() {
        let (think, answer) = split_think("<think>let me see</think>\n\nThe answer is 42.");
        assert_eq!(think.as_deref(), Some("<think>let me see</think>"));
        assert_eq!(answer.as_deref(), Some("The answer is 42."));
    }

    #[test]
    fn text_without_think_is_all_answer() {
        let (think, answer) = split_think("plain answer");
        assert_eq!(think, None);
        assert_eq!(answer.as_deref(), Some("plain answer"));
    }

    #[test]
    fn unclosed_think_is_all_answer() {
        let (think, answer) = split_think("<think>still going");
        assert_eq!(think, None);
        assert_eq!(answer.as_deref(), Some("<think>still going"));
    }

    #[test]
    fn close_before_open_is_ignored() {
        let text = "</think> stray <think>";
        assert_eq!(split_think(text), (None, Some(text.to_owned())));
    }

    #[test]
    fn only_first_close_tag_counts() {
        let text = "</think> a <think> b </think>";
        assert_eq!(split_think(text), (None, Some(text.to_owned())));
    }

    #[test]
    fn text_before_think_block_is_dropped() {
        let (think, answer) = split_think("intro <think>hmm</think> done ");
        assert_eq!(think.as_deref(), Some("<think>hmm</think>"));
        assert_eq!(answer.as_deref(), Some("done"));
    }

    #[test]
    fn empty_text() {
        assert_eq!(split_think(""), (None, None));
    }
}
