//! Ordered regular-expression families for pulling identifiers and media
//! candidates out of URLs and page markup.
//!
//! The upstream markup is undocumented and shifts over time, so every field is
//! matched by a list of shapes tried in order rather than by a single parser.
//! Denser, more specific shapes come first; the first match wins.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Numeric token naming a video upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, compiled pattern. The name is what ends up in the trace.
struct Pattern {
    name: &'static str,
    regex: Regex,
}

impl Pattern {
    fn new(name: &'static str, re: &str) -> Self {
        Self {
            name,
            regex: Regex::new(re).unwrap(),
        }
    }

    fn capture<'a>(&self, input: &'a str) -> Option<&'a str> {
        self.regex
            .captures(input)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
    }
}

fn first_match<'a>(patterns: &'a [Pattern], input: &'a str) -> Option<(&'a Pattern, &'a str)> {
    patterns
        .iter()
        .find_map(|p| p.capture(input).map(|m| (p, m)))
}

static VIDEO_ID_PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        Pattern::new("path_video", r"/video/(\d+)"),
        Pattern::new("modal_id", r"modal_id=(\d+)"),
        Pattern::new("item_ids", r"item_ids=(\d+)"),
        Pattern::new("vid", r"vid=(\d+)"),
    ]
});

const PERCENT_ESCAPED: &str = "percent_escaped_mp4";

static MEDIA_URL_PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        Pattern::new("play_addr_escaped", r#"playAddr: \\"(.*?)\\""#),
        Pattern::new("play_addr_js", r#"playAddr: "(.*?)""#),
        Pattern::new("play_addr_json", r#""playAddr":"(.*?)""#),
        Pattern::new("play_addr_url_list", r#""play_addr":.*?"url_list":\["(.*?)""#),
        Pattern::new("json_url_mp4", r#""url":"(https://.*?\.mp4.*?)""#),
        Pattern::new("src_aweme", r#"src="(https://www.douyin.com/aweme/.*?)""#),
        Pattern::new("src_short_link", r#"src="(https://v.douyin.com/.*?)""#),
        Pattern::new("cdn_literal", r#""(https://v\d+-\w+\.douyinvod\.com/[^"]+)""#),
        Pattern::new(
            "share_page_href",
            r#"href="(https://www.iesdouyin.com/share/video/\d+/)""#,
        ),
        Pattern::new("video_tag_src", r#"<video [^>]*src="([^"]+)""#),
        Pattern::new("source_tag_src", r#"<source [^>]*src="([^"]+)""#),
        Pattern::new("play_addr_http", r#"playAddr: "(http[^"]+)""#),
        Pattern::new("json_url_any_mp4", r#""url":"([^"]+\.mp4[^"]*)""#),
        Pattern::new("play_addr_uri", r#""play_addr":\{"uri":"([^"]+)""#),
        Pattern::new("src_mp4", r#"src="(https?://[^"]+\.mp4[^"]*)""#),
        Pattern::new(
            PERCENT_ESCAPED,
            r#"(https?%3A%2F%2F[^"'&\s]+?\.mp4[^"'&\s]*)"#,
        ),
    ]
});

static TITLE_PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        Pattern::new("html_title", r"<title>(.*?)</title>"),
        Pattern::new("json_title", r#""title":"(.*?)""#),
        Pattern::new("json_desc", r#""desc":"(.*?)""#),
    ]
});

static COVER_PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    vec![
        Pattern::new("cover_escaped", r#"cover: \\"(.*?)\\""#),
        Pattern::new("cover_js", r#"cover: "(.*?)""#),
        Pattern::new("cover_json", r#""cover":"(.*?)""#),
        Pattern::new("cover_url_json", r#""cover_url":"(.*?)""#),
        Pattern::new("poster_attr", r#"poster="([^"]+)""#),
        Pattern::new("origin_cover_uri", r#""origin_cover":\{"uri":"([^"]+)""#),
    ]
});

static ABSOLUTE_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^"'\s<>\\]+"#).unwrap());

static SHARE_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s，。！？“”【】]+").unwrap());

static PLAY_API_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""playApi":\s*"([^"]+)""#).unwrap());

static VIDEO_ID_PARAM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"video_id=([^&]+)").unwrap());

/// Extracts a video identifier from a URL or block of text.
///
/// Tries `/video/<digits>`, `modal_id=`, `item_ids=` and `vid=` in that order
/// and returns the first capture.
pub fn extract_video_id(text: &str) -> Option<VideoId> {
    first_match(&VIDEO_ID_PATTERNS, text).map(|(_, id)| VideoId::new(id))
}

/// Turns whatever the user pasted into a URL.
///
/// Share text from the app wraps the link in prose ("7.43 复制打开抖音 ...
/// https://v.douyin.com/ABC/ ..."), so the first embedded URL wins. Bare
/// `v.douyin.com/ABC/` input gets an `https://` scheme.
pub fn normalize_input(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(found) = SHARE_URL_REGEX.find(trimmed) {
        return found.as_str().to_string();
    }
    if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Undoes JSON-style escaping of `/` (and `&`) in an embedded URL.
pub fn unescape_url(raw: &str) -> String {
    raw.replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace("\\/", "/")
        .replace("\\u0026", "&")
}

/// Unescapes a URL captured by `pattern`. Only the percent-escaped family is
/// percent-decoded; elsewhere an encoded nested URL belongs to the query.
fn clean_media_url(pattern: &Pattern, raw: &str) -> String {
    let unescaped = unescape_url(raw);
    if pattern.name == PERCENT_ESCAPED
        && let Ok(decoded) = urlencoding::decode(&unescaped)
    {
        return decoded.into_owned();
    }
    unescaped
}

/// Best-effort media fields scraped from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaCandidates {
    pub video_url: Option<String>,
    pub title: Option<String>,
    pub cover_image: Option<String>,
    /// Name of the pattern that produced `video_url`.
    pub matched_pattern: Option<&'static str>,
}

/// Runs the media, title and cover pattern families over `html`.
///
/// Each field is filled by its first matching pattern. Extracted URLs have
/// `\/` and `\u002F` escapes resolved.
pub fn extract_media_candidates(html: &str) -> MediaCandidates {
    let (video_url, matched_pattern) = match first_match(&MEDIA_URL_PATTERNS, html) {
        Some((pattern, raw)) => (Some(clean_media_url(pattern, raw)), Some(pattern.name)),
        None => (None, None),
    };
    MediaCandidates {
        video_url,
        title: first_match(&TITLE_PATTERNS, html).map(|(_, t)| t.trim().to_string()),
        cover_image: first_match(&COVER_PATTERNS, html).map(|(_, c)| unescape_url(c)),
        matched_pattern,
    }
}

/// First absolute URL in `html` containing `marker`, unescaped.
pub fn find_marked_url(html: &str, marker: &str) -> Option<String> {
    let text = unescape_url(html);
    ABSOLUTE_URL_REGEX
        .find_iter(&text)
        .map(|m| m.as_str())
        .find(|url| url.contains(marker))
        .map(ToOwned::to_owned)
}

/// The page's embedded `playApi` URL, unescaped.
pub fn extract_play_api(html: &str) -> Option<String> {
    PLAY_API_REGEX
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape_url(m.as_str()))
}

/// The `video_id` query parameter of a play URL.
pub fn extract_video_id_param(url: &str) -> Option<&str> {
    VIDEO_ID_PARAM_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
