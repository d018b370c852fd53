use crate::error::{SubsroError, SubsroResult};
use crate::types::MatchContext;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

const PREFIX: &str = "subsro";

static SEASON_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)S(\d+)E(\d+)").expect("Valid season/episode regex"));

static STRICT_SEASON_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^S\d{2}E\d{2}$").expect("Valid strict locator regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonEpisode {
    pub season: u32,
    pub episode: u32,
}

/// Which file inside the downloaded archive the identifier points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Episode(SeasonEpisode),
    /// A media file name; `episode` is set when the name itself carries an
    /// `S##E##` marker.
    FileName {
        file_name: String,
        episode: Option<SeasonEpisode>,
    },
}

/// Opaque handle passed from search to download:
/// `subsro-{catalog_id}-{language}[-{locator}]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleIdentifier {
    pub catalog_id: u64,
    pub language: String,
    pub locator: Option<Locator>,
}

impl SubtitleIdentifier {
    pub fn new(catalog_id: u64, language: impl Into<String>) -> Self {
        Self {
            catalog_id,
            language: language.into(),
            locator: None,
        }
    }

    pub fn with_episode(mut self, season: u32, episode: u32) -> Self {
        self.locator = Some(Locator::Episode(SeasonEpisode { season, episode }));
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let episode = parse_season_episode(&file_name);
        self.locator = Some(Locator::FileName { file_name, episode });
        self
    }

    pub fn season_episode(&self) -> Option<SeasonEpisode> {
        match &self.locator {
            Some(Locator::Episode(se)) => Some(*se),
            Some(Locator::FileName { episode, .. }) => *episode,
            None => None,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match &self.locator {
            Some(Locator::FileName { file_name, .. }) => Some(file_name),
            _ => None,
        }
    }

    /// Match context for the archive reader.
    ///
    /// A file name carrying `S##E##` selects by episode number; any other
    /// file name selects by movie file name.
    pub fn match_context(&self) -> Option<MatchContext> {
        match &self.locator {
            Some(Locator::Episode(se))
            | Some(Locator::FileName {
                episode: Some(se), ..
            }) => Some(MatchContext::Episode {
                episode_number: se.episode,
            }),
            Some(Locator::FileName {
                file_name,
                episode: None,
            }) => Some(MatchContext::Movie {
                media_file_name: file_name.clone(),
            }),
            None => None,
        }
    }

    pub fn encode(&self) -> String {
        let mut id = format!("{}-{}-{}", PREFIX, self.catalog_id, self.language);
        match &self.locator {
            Some(Locator::Episode(se)) => {
                id.push_str(&format!("-S{:02}E{:02}", se.season, se.episode));
            }
            Some(Locator::FileName { file_name, .. }) => {
                id.push('-');
                id.push_str(&urlencoding::encode(file_name));
            }
            None => {}
        }
        id
    }

    pub fn decode(identifier: &str) -> SubsroResult<Self> {
        let invalid = || SubsroError::InvalidIdentifier {
            identifier: identifier.to_string(),
        };

        let segments: Vec<&str> = identifier.splitn(4, '-').collect();
        if segments.len() < 3 || segments[0] != PREFIX {
            return Err(invalid());
        }

        let digits = segments[1];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let catalog_id = digits
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(invalid)?;
        let language = segments[2].to_string();

        let locator = match segments.get(3).filter(|raw| !raw.is_empty()) {
            Some(raw) => {
                let decoded = urlencoding::decode(raw).map_err(|_| invalid())?;
                Some(decode_locator(raw, &decoded))
            }
            None => None,
        };

        Ok(Self {
            catalog_id,
            language,
            locator,
        })
    }
}

fn decode_locator(raw: &str, decoded: &str) -> Locator {
    match parse_season_episode(decoded) {
        Some(se) if STRICT_SEASON_EPISODE.is_match(raw) => Locator::Episode(se),
        episode => Locator::FileName {
            file_name: decoded.to_string(),
            episode,
        },
    }
}

fn parse_season_episode(text: &str) -> Option<SeasonEpisode> {
    let caps = SEASON_EPISODE.captures(text)?;
    let season = caps.get(1)?.as_str().parse().ok()?;
    let episode = caps.get(2)?.as_str().parse().ok()?;
    Some(SeasonEpisode { season, episode })
}

impl fmt::Display for SubtitleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for SubtitleIdentifier {
    type Err = SubsroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plain() {
        assert_eq!(SubtitleIdentifier::new(42, "ro").encode(), "subsro-42-ro");
    }

    #[test]
    fn test_encode_episode() {
        let id = SubtitleIdentifier::new(123, "en").with_episode(1, 2);
        assert_eq!(id.encode(), "subsro-123-en-S01E02");
    }

    #[test]
    fn test_episode_round_trip() {
        let original = SubtitleIdentifier::new(98765, "ro").with_episode(3, 14);
        let decoded: SubtitleIdentifier = original.encode().parse().unwrap();

        assert_eq!(decoded.catalog_id, 98765);
        assert_eq!(decoded.language, "ro");
        assert_eq!(
            decoded.locator,
            Some(Locator::Episode(SeasonEpisode {
                season: 3,
                episode: 14
            }))
        );
        assert_eq!(
            decoded.match_context(),
            Some(MatchContext::Episode { episode_number: 14 })
        );
    }

    #[test]
    fn test_file_name_round_trip() {
        let name = "Movie Name (2024) - 1080p.BluRay.x264.mkv";
        let original = SubtitleIdentifier::new(7, "ita").with_file_name(name);
        let encoded = original.encode();
        assert!(!encoded.contains(' '));

        let decoded = SubtitleIdentifier::decode(&encoded).unwrap();
        assert_eq!(decoded.catalog_id, 7);
        assert_eq!(decoded.language, "ita");
        assert_eq!(decoded.file_name(), Some(name));
        assert_eq!(
            decoded.match_context(),
            Some(MatchContext::Movie {
                media_file_name: name.to_string()
            })
        );
    }

    #[test]
    fn test_file_name_with_season_episode() {
        let name = "Show.S02E05.720p.WEB.mkv";
        let encoded = SubtitleIdentifier::new(5, "ro").with_file_name(name).encode();
        let decoded = SubtitleIdentifier::decode(&encoded).unwrap();

        assert_eq!(decoded.file_name(), Some(name));
        assert_eq!(
            decoded.season_episode(),
            Some(SeasonEpisode {
                season: 2,
                episode: 5
            })
        );
        assert_eq!(
            decoded.match_context(),
            Some(MatchContext::Episode { episode_number: 5 })
        );
    }

    #[test]
    fn test_lowercase_locator_is_not_strict() {
        let decoded = SubtitleIdentifier::decode("subsro-5-ro-s01e02").unwrap();
        assert!(matches!(decoded.locator, Some(Locator::FileName { .. })));
        assert_eq!(decoded.season_episode().map(|se| se.episode), Some(2));
    }

    #[test]
    fn test_no_locator() {
        let decoded = SubtitleIdentifier::decode("subsro-10-en").unwrap();
        assert_eq!(decoded.catalog_id, 10);
        assert!(decoded.locator.is_none());
        assert!(decoded.match_context().is_none());

        let decoded = SubtitleIdentifier::decode("subsro-10-en-").unwrap();
        assert!(decoded.locator.is_none());
    }

    #[test]
    fn test_non_numeric_id_rejected() {
        let err = SubtitleIdentifier::decode("subsro-abc-ro").unwrap_err();
        assert!(matches!(err, SubsroError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_malformed_identifiers_rejected() {
        for bad in [
            "",
            "subsro",
            "subsro-12",
            "other-12-ro",
            "subsro-0-ro",
            "subsro--ro",
            "subsro-12.5-ro",
        ] {
            assert!(
                SubtitleIdentifier::decode(bad).is_err(),
                "Should reject: {}",
                bad
            );
        }
    }

    #[test]
    fn test_signed_or_padded_id_rejected() {
        for bad in ["subsro-+12-ro", "subsro- 12-ro", "subsro-12 -ro", "subsro-١٢-ro"] {
            assert!(
                matches!(
                    SubtitleIdentifier::decode(bad),
                    Err(SubsroError::InvalidIdentifier { .. })
                ),
                "Should reject: {}",
                bad
            );
        }
    }

    #[test]
    fn test_hyphenated_file_name_kept_whole() {
        let decoded = SubtitleIdentifier::decode("subsro-1-ro-Some-Movie-2024.mkv").unwrap();
        assert_eq!(decoded.file_name(), Some("Some-Movie-2024.mkv"));
    }

    #[test]
    fn test_display_matches_encode() {
        let id = SubtitleIdentifier::new(1, "ro").with_episode(10, 11);
        assert_eq!(id.to_string(), "subsro-1-ro-S10E11");
    }
}
