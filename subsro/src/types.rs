use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default catalog endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.subs.ro/v1.0";

/// Archive entry extensions treated as subtitles
pub const SUBTITLE_EXTENSIONS: [&str; 5] = ["srt", "sub", "ass", "ssa", "vtt"];

/// A single subtitle file pulled out of an archive.
///
/// The content is an owned copy, independent of the archive it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleFile {
    pub file_name: String,
    pub content: Bytes,
}

impl SubtitleFile {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Subtitle format inferred from the file extension
    pub fn format(&self) -> SubtitleFormat {
        SubtitleFormat::from_file_name(&self.file_name)
    }
}

/// What the archive reader should look for when an archive holds several
/// subtitle files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchContext {
    Episode { episode_number: u32 },
    Movie { media_file_name: String },
}

/// Subtitle file formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Sub,
    Ass,
    Ssa,
    Vtt,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Sub => "sub",
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Ssa => "ssa",
            SubtitleFormat::Vtt => "vtt",
        }
    }

    /// Infer the format from a file name, defaulting to SRT
    pub fn from_file_name(file_name: &str) -> Self {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("sub") => SubtitleFormat::Sub,
            Some("ass") => SubtitleFormat::Ass,
            Some("ssa") => SubtitleFormat::Ssa,
            Some("vtt") => SubtitleFormat::Vtt,
            _ => SubtitleFormat::Srt,
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Kind of media a subtitle search is made for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Episode,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Movie => write!(f, "movie"),
            ContentType::Episode => write!(f, "episode"),
        }
    }
}

/// Search request as received from the host media system
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Movie title, or episode title for episodes
    pub media_name: String,
    pub content_type: Option<ContentType>,
    /// Free-form 2 or 3 letter language code
    pub language: String,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
    pub series_name: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Path or file name of the media being played
    pub media_path: Option<String>,
}

impl SearchRequest {
    pub fn movie(media_name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            media_name: media_name.into(),
            content_type: Some(ContentType::Movie),
            language: language.into(),
            ..Default::default()
        }
    }

    pub fn episode(
        series_name: impl Into<String>,
        season: u32,
        episode: u32,
        language: impl Into<String>,
    ) -> Self {
        let series_name = series_name.into();
        Self {
            media_name: series_name.clone(),
            content_type: Some(ContentType::Episode),
            language: language.into(),
            series_name: Some(series_name),
            season: Some(season),
            episode: Some(episode),
            ..Default::default()
        }
    }

    pub fn with_imdb_id(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    pub fn with_tmdb_id(mut self, tmdb_id: impl Into<String>) -> Self {
        self.tmdb_id = Some(tmdb_id.into());
        self
    }

    pub fn with_media_path(mut self, media_path: impl Into<String>) -> Self {
        self.media_path = Some(media_path.into());
        self
    }

    /// File name component of the media path, if one was given
    pub fn media_file_name(&self) -> Option<String> {
        let path = self.media_path.as_deref()?;
        Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .filter(|name| !name.is_empty())
    }
}

/// One search hit, as handed back to the host media system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSubtitleInfo {
    /// Opaque identifier passed back to `fetch`
    pub id: String,
    pub display_name: String,
    /// ISO 639-2 language code
    pub language: String,
    pub format: SubtitleFormat,
    pub author: Option<String>,
    pub comment: Option<String>,
    pub created_at: Option<String>,
}

/// A downloaded and matched subtitle, ready to be streamed to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleDownload {
    pub format: SubtitleFormat,
    /// ISO 639-2 language code
    pub language: String,
    pub file_name: String,
    pub content: Bytes,
}

/// Configuration passed explicitly to the client and provider
#[derive(Debug, Clone)]
pub struct SubsroOptions {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
    /// Lowercase extensions, without the dot
    pub subtitle_extensions: Vec<String>,
}

impl Default for SubsroOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
            user_agent: None,
            proxy: None,
            subtitle_extensions: SUBTITLE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SubsroOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    pub fn subtitle_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.subtitle_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }
}
