use openrouter_api::headers::{
    build_headers, HEADER_ACCEPT, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE, HEADER_REFERER,
    HEADER_TITLE,
};
use openrouter_api::{OpenRouterConfig, TransportError};

#[test]
fn header_map_contains_caller_identification() {
    let config = OpenRouterConfig::new()
        .with_referer("https://ide.example/editor")
        .with_title("Web IDE")
        .insert_header("X-Extra", "value");

    let headers = build_headers(&config, "sk-or-v1-token", false).expect("header construction");
    assert_eq!(
        headers.get(HEADER_AUTHORIZATION).expect("authorization"),
        "Bearer sk-or-v1-token"
    );
    assert_eq!(
        headers.get(HEADER_CONTENT_TYPE).expect("content-type"),
        "application/json"
    );
    assert_eq!(
        headers.get(HEADER_REFERER).expect("referer"),
        "https://ide.example/editor"
    );
    assert_eq!(headers.get(HEADER_TITLE).expect("title"), "Web IDE");
    assert_eq!(headers.get("x-extra").expect("custom"), "value");
    assert!(headers.get(HEADER_ACCEPT).is_none());
}

#[test]
fn header_map_requests_event_stream_when_streaming() {
    let headers =
        build_headers(&OpenRouterConfig::default(), "anything", true).expect("header construction");
    assert_eq!(
        headers.get(HEADER_ACCEPT).expect("accept"),
        "text/event-stream"
    );
    assert_eq!(headers.get(HEADER_TITLE).expect("title"), "Advanced Web IDE");
}

#[test]
fn header_map_accepts_any_non_blank_token() {
    let headers = build_headers(&OpenRouterConfig::default(), "not-an-sk-key", false)
        .expect("format is not enforced");
    assert_eq!(
        headers.get(HEADER_AUTHORIZATION).expect("authorization"),
        "Bearer not-an-sk-key"
    );
}

#[test]
fn header_map_rejects_blank_credential() {
    let error = build_headers(&OpenRouterConfig::default(), "  ", false)
        .expect_err("blank credential must fail");
    assert!(matches!(error, TransportError::MissingCredential));
}
