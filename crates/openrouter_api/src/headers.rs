use std::collections::BTreeMap;

use crate::config::OpenRouterConfig;
use crate::error::TransportError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_REFERER: &str = "HTTP-Referer";
pub const HEADER_TITLE: &str = "X-Title";

/// Build a deterministic header map for one exchange.
///
/// The credential is opaque: any non-blank token is sent as-is and the
/// endpoint decides whether it is valid.
pub fn build_headers(
    config: &OpenRouterConfig,
    credential: &str,
    streaming: bool,
) -> Result<BTreeMap<String, String>, TransportError> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(TransportError::MissingCredential);
    }

    let mut headers = BTreeMap::new();
    headers.insert(
        HEADER_AUTHORIZATION.to_owned(),
        format!("Bearer {credential}"),
    );
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );
    if streaming {
        headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
    }

    if !config.referer.trim().is_empty() {
        headers.insert(HEADER_REFERER.to_owned(), config.referer.trim().to_owned());
    }
    if !config.title.trim().is_empty() {
        headers.insert(HEADER_TITLE.to_owned(), config.title.trim().to_owned());
    }

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    Ok(headers)
}
