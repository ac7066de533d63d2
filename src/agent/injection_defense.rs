//! Prompt injection defense for user-generated content.

/// Chat-template control tokens that would let embedded text pose as a
/// different speaker.
const ROLE_TOKENS: &[&str] = &[
    "<|im_start|>",
    "<|im_end|>",
    "<|system|>",
    "<|user|>",
    "<|assistant|>",
    "<|endoftext|>",
    "<start_of_turn>",
    "<end_of_turn>",
];

/// Sanitize user messages and history before embedding them in a prompt.
///
/// Role-control tokens are removed and line-leading speaker labels that
/// mimic the history format (`User:` / `Bot:`) are neutralized, so a
/// message cannot forge earlier turns.
pub fn sanitize_context(content: &str) -> String {
    let mut cleaned = content.to_string();
    for token in ROLE_TOKENS {
        cleaned = cleaned.replace(token, "");
    }

    cleaned
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("User:") || trimmed.starts_with("Bot:") {
                format!("> {}", trimmed)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
