use crate::cascade::Cascade;
use crate::levenshtein;
use crate::release_format::contains_ignore_case;
use regex::Regex;
use tracing::debug;

/// Selects the archive entry belonging to one episode of a season pack
#[derive(Clone)]
pub struct EpisodeMatcher {
    season_episode_regex: Regex,
}

impl Default for EpisodeMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EpisodeMatcher {
    pub fn new() -> Self {
        let season_episode_regex =
            Regex::new(r"(?i)S(\d+)E(\d+)").expect("Valid season/episode regex");

        Self {
            season_episode_regex,
        }
    }

    /// Choose the filename for `episode`.
    ///
    /// Tiers, in order: exact `S##E##` extraction, literal episode patterns,
    /// then closest edit distance to `E{ep:02}`. Only an empty list yields
    /// `None`.
    pub fn select<'a, S: AsRef<str>>(&self, filenames: &'a [S], episode: u32) -> Option<&'a str> {
        debug!(
            "Matching episode {} among {} candidates",
            episode,
            filenames.len()
        );

        Cascade::new("episode matcher")
            .tier("season/episode extraction", || {
                self.exact_episode(filenames, episode)
            })
            .tier("literal pattern scan", || pattern_scan(filenames, episode))
            .tier("fuzzy fallback", || fuzzy_fallback(filenames, episode))
            .resolve()
    }

    /// Tier 1: a filename whose `S##E##` episode equals the target.
    ///
    /// Other episodes are ignored, even if they are the only evidence present.
    fn exact_episode<'a, S: AsRef<str>>(
        &self,
        filenames: &'a [S],
        episode: u32,
    ) -> Option<&'a str> {
        filenames.iter().map(|name| name.as_ref()).find(|name| {
            self.season_episode_regex
                .captures(name)
                .and_then(|caps| caps.get(2))
                .and_then(|m| m.as_str().parse::<u32>().ok())
                == Some(episode)
        })
    }
}

/// Literal substrings tried by tier 2, strongest first
fn episode_patterns(episode: u32) -> [(String, bool); 6] {
    [
        (format!("E{:02}", episode), true),
        (format!("e{:02}", episode), true),
        (format!("E{}", episode), true),
        (format!("e{}", episode), true),
        (format!(".{:02}.", episode), false),
        (format!(" {:02} ", episode), false),
    ]
}

/// Tier 2: first pattern with any candidate decides; ties go to the name
/// closest to `Episode{ep:02}`.
fn pattern_scan<S: AsRef<str>>(filenames: &[S], episode: u32) -> Option<&str> {
    let reference = format!("Episode{:02}", episode);

    for (pattern, ignore_case) in episode_patterns(episode) {
        let candidates: Vec<&str> = filenames
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| {
                if ignore_case {
                    contains_ignore_case(name, &pattern)
                } else {
                    name.contains(pattern.as_str())
                }
            })
            .collect();

        match candidates.as_slice() {
            [] => continue,
            [only] => {
                debug!("Pattern {:?} matched a single file", pattern);
                return Some(*only);
            }
            _ => {
                debug!(
                    "Pattern {:?} matched {} files, ranking by distance",
                    pattern,
                    candidates.len()
                );
                return levenshtein::closest(candidates.iter().copied(), &reference)
                    .map(|(name, _)| name);
            }
        }
    }

    None
}

/// Tier 4: closest filename to `E{ep:02}`
fn fuzzy_fallback<S: AsRef<str>>(filenames: &[S], episode: u32) -> Option<&str> {
    let reference = format!("E{:02}", episode);
    levenshtein::closest(filenames.iter().map(|name| name.as_ref()), &reference)
        .map(|(name, _)| name)
}
