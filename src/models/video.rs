use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

static YOUTUBE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .unwrap()
});

static REMOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/]+").unwrap());

static LOCAL_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[^:\s]+\.(?:mp4|m4v|mov|webm|mkv)$").unwrap());

/// Where a course video is played from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VideoSource {
    YouTube {
        #[serde(rename = "videoId")]
        video_id: String,
    },
    Local { path: String },
    Remote { url: String },
}

impl VideoSource {
    /// Classifies a stored video URL. Returns `None` for values that are neither a
    /// YouTube link, an http(s) URL, nor a local video file path.
    pub fn classify(raw: &str) -> Option<Self> {
        let url = raw.trim();
        if url.is_empty() {
            return None;
        }

        if let Some(caps) = YOUTUBE_RE.captures(url) {
            return Some(VideoSource::YouTube {
                video_id: caps[1].to_string(),
            });
        }

        if REMOTE_RE.is_match(url) {
            return Some(VideoSource::Remote {
                url: url.to_string(),
            });
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        if LOCAL_FILE_RE.is_match(path) {
            return Some(VideoSource::Local {
                path: path.to_string(),
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_youtube_link_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=42",
            "youtube.com/embed/dQw4w9WgXcQ",
            "https://m.youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            assert_eq!(
                VideoSource::classify(url),
                Some(VideoSource::YouTube {
                    video_id: "dQw4w9WgXcQ".into()
                }),
                "{url}"
            );
        }
    }

    #[test]
    fn other_http_urls_are_remote() {
        assert_eq!(
            VideoSource::classify("https://cdn.example.com/courses/intro.mp4"),
            Some(VideoSource::Remote {
                url: "https://cdn.example.com/courses/intro.mp4".into()
            })
        );
    }

    #[test]
    fn file_paths_are_local() {
        assert_eq!(
            VideoSource::classify("file:///data/videos/lesson1.MOV"),
            Some(VideoSource::Local {
                path: "/data/videos/lesson1.MOV".into()
            })
        );
        assert_eq!(
            VideoSource::classify("videos/lesson2.mp4"),
            Some(VideoSource::Local {
                path: "videos/lesson2.mp4".into()
            })
        );
    }

    #[test]
    fn unrecognized_values_are_rejected() {
        assert_eq!(VideoSource::classify(""), None);
        assert_eq!(VideoSource::classify("ftp://host/video.mp4"), None);
        assert_eq!(VideoSource::classify("notes.pdf"), None);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(VideoSource::YouTube {
            video_id: "abc".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "youtube");
        assert_eq!(json["videoId"], "abc");
    }
}
