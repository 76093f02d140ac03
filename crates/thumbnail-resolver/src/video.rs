use regex::Regex;
use std::ops::Deref;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum VideoPlatform {
    YouTube,
    Vimeo,
    Dailymotion,
}

impl std::fmt::Display for VideoPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoPlatform::YouTube => write!(f, "youtube"),
            VideoPlatform::Vimeo => write!(f, "vimeo"),
            VideoPlatform::Dailymotion => write!(f, "dailymotion"),
        }
    }
}

#[derive(Eq, PartialEq, Clone, Hash, Debug)]
pub struct VideoId(pub(crate) String);

impl Deref for VideoId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A video embedded from one of the known hosting platforms.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VideoReference {
    pub platform: VideoPlatform,
    pub video_id: VideoId,
}

struct VideoPattern {
    platform: VideoPlatform,
    regex: Regex,
}

// Scheme, then any subdomains, so the platform host has to start the URL.
const HOST_PREFIX: &str = r"^(?:(?:https?:)?//)?(?:[A-Za-z0-9-]+\.)*";

fn video_patterns() -> &'static [VideoPattern] {
    static PATTERNS: OnceLock<Vec<VideoPattern>> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        [
            (
                VideoPlatform::YouTube,
                r"(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#\s]*&)?v=|embed/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
            ),
            (VideoPlatform::Vimeo, r"vimeo\.com/(?:video/)?(\d+)"),
            (
                VideoPlatform::Dailymotion,
                r"(?:dailymotion\.com/(?:embed/)?video/|dai\.ly/)([A-Za-z0-9]+)",
            ),
        ]
        .into_iter()
        .map(|(platform, pattern)| VideoPattern {
            platform,
            regex: Regex::new(&format!("{}{}", HOST_PREFIX, pattern))
                .expect("Invalid video URL pattern"),
        })
        .collect()
    })
}

/// Recognizes an embed or watch URL of a supported platform.
///
/// Returns `None` for anything that is not a known video URL shape.
pub fn extract_video_info(url: &str) -> Option<VideoReference> {
    video_patterns().iter().find_map(|pattern| {
        let video_id = pattern.regex.captures(url)?.get(1)?.as_str();

        Some(VideoReference {
            platform: pattern.platform,
            video_id: VideoId(video_id.to_string()),
        })
    })
}

/// Maps a video reference to the platform's conventional thumbnail URL.
pub fn video_thumbnail(video: &VideoReference) -> Option<String> {
    let id = &video.video_id;

    match video.platform {
        VideoPlatform::YouTube => Some(format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", id)),
        VideoPlatform::Vimeo => Some(format!("https://vumbnail.com/{}.jpg", id)),
        VideoPlatform::Dailymotion => Some(format!(
            "https://www.dailymotion.com/thumbnail/video/{}",
            id
        )),
    }
}
