//! Device advisory sent to subscribers browsing from a phone.

use axum::http::{HeaderMap, header::USER_AGENT};

use crate::dto::sse::Advisory;

/// Message shown to participants on phones. Nothing is blocked.
pub const MOBILE_ADVISORY: &str = "This game doesn’t work on phones, only computers.";

const MOBILE_MARKERS: [&str; 2] = ["mobi", "android"];

/// Whether a user agent string looks like a phone browser.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let lowered = user_agent.to_ascii_lowercase();
    MOBILE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Advisory for the request, if its `User-Agent` identifies a phone.
pub fn mobile_advisory(headers: &HeaderMap) -> Option<Advisory> {
    let user_agent = headers.get(USER_AGENT)?.to_str().ok()?;
    is_mobile_user_agent(user_agent).then(|| Advisory {
        message: MOBILE_ADVISORY.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn detects_phone_user_agents() {
        assert!(is_mobile_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148"
        ));
        assert!(is_mobile_user_agent("Mozilla/5.0 (Linux; ANDROID 14)"));
        assert!(!is_mobile_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
        ));
    }

    #[test]
    fn advisory_requires_a_user_agent() {
        let mut headers = HeaderMap::new();
        assert!(mobile_advisory(&headers).is_none());

        headers.insert(USER_AGENT, HeaderValue::from_static("SomethingMobi/1.0"));
        let advisory = mobile_advisory(&headers).unwrap();
        assert_eq!(advisory.message, MOBILE_ADVISORY);
        assert_eq!(
            advisory.message,
            "This game doesn\u{2019}t work on phones, only computers."
        );
    }
}
