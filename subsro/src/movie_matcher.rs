use crate::cascade::Cascade;
use crate::levenshtein;
use crate::release_format::{ReleaseFormat, extract_format};
use tracing::debug;

/// A fuzzy match is accepted when its distance is at most
/// `chars(media_file_name) / MOVIE_DISTANCE_DIVISOR`.
pub const MOVIE_DISTANCE_DIVISOR: usize = 2;

/// Choose the archive entry that best fits a movie's media filename.
///
/// Order: same release format, edit distance within the threshold, release
/// format priority, then the first filename. Only an empty list yields `None`.
pub fn select_movie<'a, S: AsRef<str>>(
    filenames: &'a [S],
    media_file_name: &str,
) -> Option<&'a str> {
    let media_format = extract_format(media_file_name);
    debug!(
        "Matching movie {:?} (format {:?}) among {} candidates",
        media_file_name,
        media_format,
        filenames.len()
    );

    let first = filenames.first().map(|name| name.as_ref())?;

    let selected = Cascade::new("movie matcher")
        .tier("release format", || {
            media_format.and_then(|format| same_format(filenames, format, media_file_name))
        })
        .tier("edit distance", || within_distance(filenames, media_file_name))
        .tier("format priority", || format_priority(filenames))
        .resolve_or(first);

    Some(selected)
}

fn same_format<'a, S: AsRef<str>>(
    filenames: &'a [S],
    format: ReleaseFormat,
    media_file_name: &str,
) -> Option<&'a str> {
    let candidates: Vec<&str> = filenames
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| format.occurs_in(name))
        .collect();

    match candidates.as_slice() {
        [] => None,
        [only] => Some(*only),
        _ => levenshtein::closest(candidates.iter().copied(), media_file_name)
            .map(|(name, _)| name),
    }
}

fn within_distance<'a, S: AsRef<str>>(
    filenames: &'a [S],
    media_file_name: &str,
) -> Option<&'a str> {
    let threshold = media_file_name.chars().count() / MOVIE_DISTANCE_DIVISOR;

    levenshtein::closest(filenames.iter().map(|name| name.as_ref()), media_file_name).and_then(
        |(name, distance)| {
            debug!(
                "Closest candidate {:?} at distance {} (threshold {})",
                name, distance, threshold
            );
            (distance <= threshold).then_some(name)
        },
    )
}

fn format_priority<S: AsRef<str>>(filenames: &[S]) -> Option<&str> {
    ReleaseFormat::PRIORITY.into_iter().find_map(|format| {
        filenames
            .iter()
            .map(|name| name.as_ref())
            .find(|name| format.occurs_in(name))
    })
}
