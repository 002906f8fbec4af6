pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

const CHAT_SEGMENT: &str = "/chat";
const COMPLETIONS_SEGMENT: &str = "/completions";

/// Resolves the POST target for a configured base URL.
///
/// Callers may configure the API root (`.../api/v1`), the chat root
/// (`.../api/v1/chat`), or the full endpoint; all three resolve to the same
/// `.../chat/completions` URL. A blank value means the public OpenRouter API.
pub fn normalize_completions_url(input: &str) -> String {
    let configured = input.trim();
    let root = match configured {
        "" => DEFAULT_OPENROUTER_BASE_URL,
        other => other.trim_end_matches('/'),
    };

    match root.strip_suffix(COMPLETIONS_SEGMENT) {
        Some(chat) if chat.ends_with(CHAT_SEGMENT) => root.to_owned(),
        _ if root.ends_with(CHAT_SEGMENT) => format!("{root}{COMPLETIONS_SEGMENT}"),
        _ => format!("{root}{CHAT_SEGMENT}{COMPLETIONS_SEGMENT}"),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_completions_url;

    #[test]
    fn full_endpoint_with_trailing_slash_is_kept_once() {
        assert_eq!(
            normalize_completions_url(" http://127.0.0.1:8080/api/v1/chat/completions/ "),
            "http://127.0.0.1:8080/api/v1/chat/completions"
        );
    }
}
