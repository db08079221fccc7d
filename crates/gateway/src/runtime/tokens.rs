//! Heuristic token accounting.
//!
//! Not model-accurate by design: roughly four characters per token,
//! which is close enough for budget displays and last-resort metrics
//! when the provider reports nothing. All results are flagged
//! approximate.

use mc_domain::TokenUsage;
use mc_providers::ChatMessage;

/// ~4 chars per token.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / 4) as u64
}

/// The canonical input text a turn is billed against: labeled system
/// and developer sections, then every message as `<role>:\n<text>`,
/// blank-line separated.
pub fn canonical_input_text(
    system_text: &str,
    developer_text: &str,
    messages: &[ChatMessage],
) -> String {
    let mut input = String::new();
    if !system_text.is_empty() {
        input.push_str("system:\n");
        input.push_str(system_text);
        input.push_str("\n\n");
    }
    if !developer_text.is_empty() {
        input.push_str("developer:\n");
        input.push_str(developer_text);
        input.push_str("\n\n");
    }
    for m in messages {
        input.push_str(&m.role);
        input.push_str(":\n");
        input.push_str(&m.text);
        input.push_str("\n\n");
    }
    input
}

/// Internal usage for a completed turn, marked approximate.
pub fn internal_usage(
    system_text: &str,
    developer_text: &str,
    messages: &[ChatMessage],
    assistant_text: &str,
) -> TokenUsage {
    let input = estimate_tokens(&canonical_input_text(system_text, developer_text, messages));
    let output = estimate_tokens(assistant_text);
    TokenUsage {
        input_tokens: input,
        output_tokens: output,
        total_tokens: input + output,
        approximate: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_chars_per_token() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcdefg"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn canonical_text_layout() {
        let messages = vec![
            ChatMessage { role: "user".into(), text: "hi".into() },
            ChatMessage { role: "assistant".into(), text: "hello".into() },
        ];
        let text = canonical_input_text("sys", "dev", &messages);
        assert_eq!(
            text,
            "system:\nsys\n\ndeveloper:\ndev\n\nuser:\nhi\n\nassistant:\nhello\n\n"
        );
    }

    #[test]
    fn empty_sections_are_omitted() {
        let messages = vec![ChatMessage { role: "user".into(), text: "hi".into() }];
        assert_eq!(canonical_input_text("", "", &messages), "user:\nhi\n\n");
    }

    #[test]
    fn internal_usage_is_approximate() {
        let messages = vec![ChatMessage { role: "user".into(), text: "abcdefgh".into() }];
        let usage = internal_usage("", "", &messages, "abcdabcd");
        assert!(usage.approximate);
        assert_eq!(usage.output_tokens, 2);
        assert_eq!(usage.total_tokens, usage.input_tokens + usage.output_tokens);
    }
}
