use crate::markup::{extract_iframe_sources, extract_image_sources, MarkupQuery};
use crate::probe::ImageProbe;
use crate::video::{extract_video_info, video_thumbnail};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub manual_thumbnail: Option<String>,
    pub content: Option<String>,
    /// Overrides the resolver's placeholder for this request.
    pub default_thumbnail: Option<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Tier {
    Manual,
    Video,
    Image,
}

impl Tier {
    const ORDERED: [Tier; 3] = [Tier::Manual, Tier::Video, Tier::Image];
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Manual => write!(f, "manual"),
            Tier::Video => write!(f, "video"),
            Tier::Image => write!(f, "image"),
        }
    }
}

pub struct ThumbnailResolver {
    markup: Arc<dyn MarkupQuery>,
    probe: Arc<dyn ImageProbe>,
    default_thumbnail: String,
}

impl ThumbnailResolver {
    pub fn new(
        markup: Arc<dyn MarkupQuery>,
        probe: Arc<dyn ImageProbe>,
        default_thumbnail: impl Into<String>,
    ) -> Self {
        Self {
            markup,
            probe,
            default_thumbnail: default_thumbnail.into(),
        }
    }

    /// Resolves a thumbnail, accepting only candidates that probe as images.
    ///
    /// Candidates are probed one at a time in priority and document order and
    /// the first one that passes wins. Probe failures count as rejections, so
    /// this always ends with a URL.
    pub async fn resolve(&self, request: &ResolveRequest) -> String {
        for tier in Tier::ORDERED {
            for candidate in self.candidates(tier, request) {
                if self.is_valid_image(&candidate).await {
                    debug!(%tier, url = %candidate, "Thumbnail resolved");
                    return candidate;
                }
            }
        }

        debug!("No valid thumbnail candidate found, using default");

        self.default_for(request)
    }

    /// Resolves a thumbnail without any network checks: the first candidate
    /// of the highest non-empty tier wins.
    pub fn resolve_sync(&self, request: &ResolveRequest) -> String {
        Tier::ORDERED
            .into_iter()
            .find_map(|tier| self.candidates(tier, request).into_iter().next())
            .unwrap_or_else(|| self.default_for(request))
    }

    fn candidates(&self, tier: Tier, request: &ResolveRequest) -> Vec<String> {
        let content = request.content.as_deref().unwrap_or_default();

        match tier {
            Tier::Manual => request
                .manual_thumbnail
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(ToString::to_string)
                .into_iter()
                .collect(),
            Tier::Video => extract_iframe_sources(self.markup.as_ref(), content)
                .iter()
                .filter_map(|src| extract_video_info(src))
                .filter_map(|video| video_thumbnail(&video))
                .collect(),
            Tier::Image => extract_image_sources(self.markup.as_ref(), content),
        }
    }

    async fn is_valid_image(&self, url: &str) -> bool {
        match self.probe.probe(url).await {
            Ok(response) if response.is_image() => true,
            Ok(response) => {
                debug!(url, ?response, "Thumbnail candidate is not an image");
                false
            }
            Err(error) => {
                debug!(url, ?error, "Thumbnail candidate could not be probed");
                false
            }
        }
    }

    fn default_for(&self, request: &ResolveRequest) -> String {
        request
            .default_thumbnail
            .clone()
            .unwrap_or_else(|| self.default_thumbnail.clone())
    }
}
