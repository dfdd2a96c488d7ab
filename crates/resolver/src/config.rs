use std::time::Duration;

/// Per outbound call budget, calibrated against upstream latency.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Budget for one whole resolution call.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Upstream surfaces the strategies talk to.
///
/// All of them are undocumented third-party endpoints. Defaults point at the
/// real upstream; tests point them at a local server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Referer sent with every spoofed request.
    pub referer: String,
    /// JSON item-info endpoint, queried with `item_ids=<id>`.
    pub item_info: String,
    /// Canonical video page prefix; the identifier is appended.
    pub video_page: String,
    /// Watermarked play endpoint used by the universal probe.
    pub play_watermarked: String,
    /// Non-watermarked play endpoint ("special API").
    pub play: String,
    /// CDN path prefix for the playApi reconstruction; the id is appended.
    pub cdn_template: String,
    /// Substring identifying a URL on the media CDN.
    pub cdn_host_marker: String,
    /// Identifier used by the generic, input-agnostic probe.
    pub probe_video_id: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            referer: "https://www.douyin.com/".to_string(),
            item_info: "https://www.iesdouyin.com/web/api/v2/aweme/iteminfo/".to_string(),
            video_page: "https://www.douyin.com/video/".to_string(),
            play_watermarked: "https://aweme.snssdk.com/aweme/v1/playwm/".to_string(),
            play: "https://aweme.snssdk.com/aweme/v1/play/".to_string(),
            cdn_template: "https://v26-web.douyinvod.com/video/tos/cn/tos-cn-ve-15c001-alinc2/"
                .to_string(),
            cdn_host_marker: "douyinvod.com".to_string(),
            probe_video_id: "v0200fg10000cvpmqdvog65o3idulk8g".to_string(),
        }
    }
}

impl Endpoints {
    /// Rebase every upstream URL onto `base` (e.g. `http://127.0.0.1:8080`).
    ///
    /// Paths are kept so a single local server can stand in for all hosts.
    pub fn rebased(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            referer: format!("{base}/"),
            item_info: format!("{base}/web/api/v2/aweme/iteminfo/"),
            video_page: format!("{base}/video/"),
            play_watermarked: format!("{base}/aweme/v1/playwm/"),
            play: format!("{base}/aweme/v1/play/"),
            cdn_template: format!("{base}/cdn/video/tos/cn/tos-cn-ve-15c001-alinc2/"),
            cdn_host_marker: "/cdn/".to_string(),
            probe_video_id: "v0200fg10000cvpmqdvog65o3idulk8g".to_string(),
        }
    }

    pub fn is_cdn_url(&self, url: &str) -> bool {
        url.contains(&self.cdn_host_marker)
    }
}

/// Tunables for a [`Resolver`](crate::Resolver).
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub request_timeout: Duration,
    /// Overall budget for the strategy chain. `None` disables the deadline.
    pub deadline: Option<Duration>,
    pub max_redirects: usize,
    pub endpoints: Endpoints,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            deadline: Some(DEFAULT_DEADLINE),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            endpoints: Endpoints::default(),
        }
    }
}

impl ResolverConfig {
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}
