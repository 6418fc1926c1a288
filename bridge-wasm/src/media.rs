//! Media source reading a `<video>` element and the watch page DOM.

use bridge_traits::playback::{ContentInfo, MediaSource, PlaybackSnapshot};
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlMediaElement};

/// CSS selectors used to find the player and the content metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelectors {
    pub video: String,
    pub title: String,
    pub channel: String,
    /// Query parameter carrying the content id
    pub id_param: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            video: "video".into(),
            title: "h1.title, h1.ytd-watch-metadata".into(),
            channel: "ytd-channel-name a, ytd-channel-name yt-formatted-string".into(),
            id_param: "v".into(),
        }
    }
}

/// [`MediaSource`] over the first `<video>` of the current document.
///
/// The element is looked up on every call since single-page navigation can
/// replace it.
#[derive(Debug, Clone, Default)]
pub struct HtmlMediaSource {
    selectors: PageSelectors,
}

impl HtmlMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selectors(selectors: PageSelectors) -> Self {
        Self { selectors }
    }

    fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn element(&self) -> Option<HtmlMediaElement> {
        Self::document()?
            .query_selector(&self.selectors.video)
            .ok()??
            .dyn_into::<HtmlMediaElement>()
            .ok()
    }

    fn text_of(&self, selector: &str) -> String {
        Self::document()
            .and_then(|doc| doc.query_selector(selector).ok().flatten())
            .and_then(|el| el.text_content())
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }

    fn content_id(&self) -> Option<String> {
        let href = web_sys::window()?.location().href().ok()?;
        let url = web_sys::Url::new(&href).ok()?;
        url.search_params()
            .get(&self.selectors.id_param)
            .filter(|id| !id.is_empty())
    }
}

impl MediaSource for HtmlMediaSource {
    fn snapshot(&self) -> Option<PlaybackSnapshot> {
        let video = self.element()?;
        Some(
            PlaybackSnapshot::new(video.current_time(), video.duration(), video.playback_rate())
                .paused(video.paused()),
        )
    }

    fn current_content(&self) -> Option<ContentInfo> {
        let id = self.content_id()?;
        Some(
            ContentInfo::new(id)
                .with_title(self.text_of(&self.selectors.title))
                .with_channel(self.text_of(&self.selectors.channel)),
        )
    }
}
