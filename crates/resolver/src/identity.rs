//! Randomised client identities for outbound requests.
//!
//! A fresh [`SpoofedIdentity`] is generated for every outbound request attempt
//! and never reused, so no two calls share device ids or cookie values.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngExt;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

const DIGITS: &[u8] = b"0123456789";
const HEX: &[u8] = b"0123456789abcdef";
const MS_TOKEN_CHARS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

const DEVICE_ID_LEN: usize = 16;
const TOKEN_LEN: usize = 32;
const MS_TOKEN_LEN: usize = 107;

/// Desktop browser user agent used for page and redirect requests.
pub const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Pool of mobile browser user agents; one is picked uniformly per identity.
pub const MOBILE_UAS: [&str; 5] = [
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_7_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 11; SM-G998B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.120 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/93.0.4577.63 Mobile Safari/604.1",
    "Mozilla/5.0 (Linux; Android 10; SM-G980F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.120 Mobile Safari/537.36",
    "Mozilla/5.0 (iPad; CPU OS 14_7_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.2 Mobile/15E148 Safari/604.1",
];

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const JSON_ACCEPT: &str = "application/json, text/plain, */*";
const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Picks one of [`MOBILE_UAS`] uniformly at random.
pub fn random_mobile_user_agent() -> &'static str {
    let mut rng = rand::rng();
    MOBILE_UAS[rng.random_range(0..MOBILE_UAS.len())]
}

fn random_string(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

/// Random string over `[a-z0-9]`, used as a cache-busting suffix.
pub fn random_suffix(len: usize) -> String {
    random_string(b"abcdefghijklmnopqrstuvwxyz0123456789", len)
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Which header set a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Full browser page request with the cookie jar.
    Page,
    /// XHR-style JSON request with the cookie jar.
    Api,
    /// Only user agent and referer; used for play-endpoint probes.
    Minimal,
}

/// A randomised browser/app fingerprint attached to one outbound request.
#[derive(Debug, Clone)]
pub struct SpoofedIdentity {
    pub device_id: String,
    pub install_id: String,
    pub ttreq: String,
    pub passport_csrf_token: String,
    pub passport_csrf_token_default: String,
    pub uid_tt: String,
    pub sid_tt: String,
    pub session_id: String,
    pub ms_token: String,
    pub sid_guard: String,
    pub user_agent: &'static str,
}

impl SpoofedIdentity {
    /// Fresh identity carrying `user_agent`.
    pub fn new(user_agent: &'static str) -> Self {
        let guard_prefix = rand::rng().random_range(1_000_000..10_000_000u32);
        Self {
            device_id: random_string(DIGITS, DEVICE_ID_LEN),
            install_id: random_string(DIGITS, DEVICE_ID_LEN),
            ttreq: random_string(HEX, TOKEN_LEN),
            passport_csrf_token: random_string(HEX, TOKEN_LEN),
            passport_csrf_token_default: random_string(HEX, TOKEN_LEN),
            uid_tt: random_string(HEX, TOKEN_LEN),
            sid_tt: random_string(HEX, TOKEN_LEN),
            session_id: random_string(HEX, TOKEN_LEN),
            ms_token: random_string(MS_TOKEN_CHARS, MS_TOKEN_LEN),
            sid_guard: format!(
                "{guard_prefix}%7C{}%7C5184000%7CSat%2C+13-May-2023+07%3A50%3A38+GMT",
                unix_timestamp()
            ),
            user_agent,
        }
    }

    pub fn desktop() -> Self {
        Self::new(DESKTOP_UA)
    }

    pub fn mobile() -> Self {
        Self::new(random_mobile_user_agent())
    }

    /// The identity's cookie jar as a single `Cookie` header value.
    pub fn cookie_header(&self) -> String {
        [
            ("device_id", self.device_id.as_str()),
            ("install_id", self.install_id.as_str()),
            ("ttreq", self.ttreq.as_str()),
            ("passport_csrf_token", self.passport_csrf_token.as_str()),
            (
                "passport_csrf_token_default",
                self.passport_csrf_token_default.as_str(),
            ),
            ("sid_guard", self.sid_guard.as_str()),
            ("uid_tt", self.uid_tt.as_str()),
            ("sid_tt", self.sid_tt.as_str()),
            ("sessionid", self.session_id.as_str()),
            ("msToken", self.ms_token.as_str()),
        ]
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
    }

    /// Request headers for `profile`.
    pub fn headers(&self, profile: HeaderProfile, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(self.user_agent));
        insert_header(&mut headers, header::REFERER, referer);
        if profile == HeaderProfile::Minimal {
            return headers;
        }

        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        insert_header(&mut headers, header::COOKIE, &self.cookie_header());
        match profile {
            HeaderProfile::Page => {
                headers.insert(header::ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
                headers.insert(
                    header::UPGRADE_INSECURE_REQUESTS,
                    HeaderValue::from_static("1"),
                );
            }
            HeaderProfile::Api => {
                headers.insert(header::ACCEPT, HeaderValue::from_static(JSON_ACCEPT));
                headers.insert(
                    HeaderName::from_static("x-requested-with"),
                    HeaderValue::from_static("XMLHttpRequest"),
                );
            }
            HeaderProfile::Minimal => {}
        }
        headers
    }
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => {
            debug!(error = %e, header = %name, "Invalid header value; skipping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_shapes() {
        let identity = SpoofedIdentity::mobile();
        assert_eq!(identity.device_id.len(), 16);
        assert!(identity.device_id.bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(identity.install_id.len(), 16);
        for token in [
            &identity.ttreq,
            &identity.passport_csrf_token,
            &identity.uid_tt,
            &identity.sid_tt,
            &identity.session_id,
        ] {
            assert_eq!(token.len(), 32);
            assert!(token.bytes().all(|b| HEX.contains(&b)));
        }
        assert_eq!(identity.ms_token.len(), 107);
        assert!(identity.ms_token.bytes().all(|b| MS_TOKEN_CHARS.contains(&b)));
        assert!(MOBILE_UAS.contains(&identity.user_agent));
    }

    #[test]
    fn sid_guard_embeds_current_time() {
        let before = unix_timestamp();
        let identity = SpoofedIdentity::desktop();
        let ts: u64 = identity.sid_guard.split("%7C").nth(1).unwrap().parse().unwrap();
        assert!(ts >= before && ts <= unix_timestamp());
        assert_eq!(identity.user_agent, DESKTOP_UA);
    }

    #[test]
    fn identities_are_not_reused() {
        let a = SpoofedIdentity::desktop();
        let b = SpoofedIdentity::desktop();
        assert_ne!(a.ms_token, b.ms_token);
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn cookie_header_lists_every_cookie() {
        let identity = SpoofedIdentity::desktop();
        let cookie = identity.cookie_header();
        assert!(cookie.starts_with(&format!("device_id={}", identity.device_id)));
        assert!(cookie.contains(&format!("msToken={}", identity.ms_token)));
        assert_eq!(cookie.split("; ").count(), 10);
    }

    #[test]
    fn minimal_profile_has_no_cookie() {
        let identity = SpoofedIdentity::mobile();
        let headers = identity.headers(HeaderProfile::Minimal, "https://www.douyin.com/");
        assert!(headers.get(header::COOKIE).is_none());
        assert_eq!(headers.get(header::REFERER).unwrap(), "https://www.douyin.com/");

        let api = identity.headers(HeaderProfile::Api, "https://www.douyin.com/");
        assert_eq!(api.get("x-requested-with").unwrap(), "XMLHttpRequest");
        assert!(api.get(header::COOKIE).is_some());
    }

    #[test]
    fn random_suffix_alphabet() {
        let suffix = random_suffix(8);
        assert_eq!(suffix.len(), 8);
        assert!(suffix.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }
}
