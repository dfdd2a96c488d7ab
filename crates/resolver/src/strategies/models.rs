use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub(crate) struct ItemInfoResponse {
    #[serde(default)]
    pub item_list: Vec<ItemInfo>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ItemInfo {
    pub desc: Option<String>,
    pub cover_data: Option<UrlList>,
    pub video: Option<ItemVideo>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ItemVideo {
    pub play_addr: Option<UrlList>,
    pub cover: Option<UrlList>,
    pub origin_cover: Option<UrlList>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct UrlList {
    #[serde(default)]
    pub url_list: Vec<String>,
}

impl UrlList {
    pub fn first(&self) -> Option<&str> {
        self.url_list
            .iter()
            .map(String::as_str)
            .find(|url| !url.is_empty())
    }
}

impl ItemInfo {
    pub fn play_url(&self) -> Option<&str> {
        self.video.as_ref()?.play_addr.as_ref()?.first()
    }

    /// `cover_data`, then the video cover, then the origin cover.
    pub fn cover_url(&self) -> Option<&str> {
        let from_cover_data = self.cover_data.as_ref().and_then(UrlList::first);
        from_cover_data.or_else(|| {
            let video = self.video.as_ref()?;
            video
                .cover
                .as_ref()
                .and_then(UrlList::first)
                .or_else(|| video.origin_cover.as_ref().and_then(UrlList::first))
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.desc.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }
}
