use crate::episode_matcher::EpisodeMatcher;
use crate::error::{SubsroError, SubsroResult};
use crate::movie_matcher::select_movie;
use crate::types::{MatchContext, SUBTITLE_EXTENSIONS, SubtitleFile};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const ZIP_MAGIC: [u8; 2] = [0x50, 0x4B];
const RAR_MAGIC: [u8; 4] = [0x52, 0x61, 0x72, 0x21];
const READ_CHUNK: usize = 8 * 1024;

/// Container formats recognized by their leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Rar,
}

impl ArchiveKind {
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&ZIP_MAGIC) {
            Some(ArchiveKind::Zip)
        } else if bytes.starts_with(&RAR_MAGIC) {
            Some(ArchiveKind::Rar)
        } else {
            None
        }
    }
}

/// Minimal view of an archive: enumerate entries, open one for reading
pub trait SubtitleArchive {
    /// Non-directory entry names, in the order the container lists them
    fn entry_names(&mut self) -> SubsroResult<Vec<String>>;

    /// Open a reader over one entry's uncompressed content
    fn open_entry(&mut self, name: &str) -> SubsroResult<Box<dyn Read + '_>>;
}

/// ZIP archive read straight from memory
pub struct ZipSource<'a> {
    archive: zip::ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> ZipSource<'a> {
    pub fn new(bytes: &'a [u8]) -> SubsroResult<Self> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self { archive })
    }
}

impl SubtitleArchive for ZipSource<'_> {
    fn entry_names(&mut self) -> SubsroResult<Vec<String>> {
        let mut names = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let entry = self.archive.by_index_raw(index)?;
            if !entry.is_dir() {
                names.push(entry.name().to_string());
            }
        }
        Ok(names)
    }

    fn open_entry(&mut self, name: &str) -> SubsroResult<Box<dyn Read + '_>> {
        Ok(Box::new(self.archive.by_name(name)?))
    }
}

/// RAR archive. The unrar library only reads from disk, so the bytes are
/// spooled into a temporary file that is removed when the source is dropped.
pub struct RarSource {
    file: NamedTempFile,
}

impl RarSource {
    pub fn new(bytes: &[u8]) -> SubsroResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("subsro-")
            .suffix(".rar")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file })
    }
}

impl SubtitleArchive for RarSource {
    fn entry_names(&mut self) -> SubsroResult<Vec<String>> {
        let listing = unrar::Archive::new(self.file.path()).open_for_listing()?;
        let mut names = Vec::new();
        for header in listing {
            let header = header?;
            if !header.is_directory() {
                names.push(header.filename.to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    fn open_entry(&mut self, name: &str) -> SubsroResult<Box<dyn Read + '_>> {
        let mut archive = unrar::Archive::new(self.file.path()).open_for_processing()?;
        while let Some(header) = archive.read_header()? {
            if header.entry().filename.to_string_lossy() == name {
                let (data, _rest) = header.read()?;
                return Ok(Box::new(Cursor::new(data)));
            }
            archive = header.skip()?;
        }
        Err(SubsroError::Archive {
            message: format!("Entry not found in RAR archive: {}", name),
        })
    }
}

/// Open the archive matching the magic bytes of `bytes`
pub fn open_archive(bytes: &[u8]) -> SubsroResult<Box<dyn SubtitleArchive + '_>> {
    match ArchiveKind::detect(bytes) {
        Some(ArchiveKind::Zip) => {
            info!("Archive detected: ZIP ({} bytes)", bytes.len());
            Ok(Box::new(ZipSource::new(bytes)?))
        }
        Some(ArchiveKind::Rar) => {
            info!("Archive detected: RAR ({} bytes)", bytes.len());
            Ok(Box::new(RarSource::new(bytes)?))
        }
        None => Err(SubsroError::UnrecognizedArchive),
    }
}

/// Pulls the right subtitle out of a downloaded archive
#[derive(Clone)]
pub struct ArchiveExtractor {
    extensions: Vec<String>,
    episode_matcher: EpisodeMatcher,
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self::with_extensions(SUBTITLE_EXTENSIONS)
    }

    /// Extractor keeping only entries with one of `extensions` (no dot,
    /// compared case-insensitively)
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            episode_matcher: EpisodeMatcher::new(),
        }
    }

    pub fn is_subtitle(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Select and read one subtitle from `bytes`.
    ///
    /// Returns `Ok(None)` when the container is unknown, holds no subtitle, or
    /// no entry matches the requested episode. Decompression failures and
    /// cancellation are errors.
    pub fn extract(
        &self,
        bytes: &[u8],
        context: Option<&MatchContext>,
        cancel: &CancellationToken,
    ) -> SubsroResult<Option<SubtitleFile>> {
        let mut archive = match open_archive(bytes) {
            Ok(archive) => archive,
            Err(SubsroError::UnrecognizedArchive) => {
                warn!("Unrecognized archive format");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let candidates: Vec<String> = archive
            .entry_names()?
            .into_iter()
            .filter(|name| self.is_subtitle(name))
            .collect();

        debug!("Archive holds {} subtitle entries", candidates.len());

        let Some(selected) = self.select(&candidates, context) else {
            if candidates.is_empty() {
                warn!("No subtitle in archive");
            } else {
                warn!("No archive entry matches the requested episode");
            }
            return Ok(None);
        };

        info!("Selected subtitle entry: {}", selected);
        let content = {
            let mut reader = archive.open_entry(selected)?;
            read_cancellable(&mut reader, cancel)?
        };

        Ok(Some(SubtitleFile::new(base_name(selected), content)))
    }

    fn select<'a>(
        &self,
        candidates: &'a [String],
        context: Option<&MatchContext>,
    ) -> Option<&'a str> {
        match (candidates, context) {
            ([], _) => None,
            ([only], _) => Some(only.as_str()),
            (_, Some(MatchContext::Episode { episode_number })) => {
                self.episode_matcher.select(candidates, *episode_number)
            }
            (_, Some(MatchContext::Movie { media_file_name })) => {
                select_movie(candidates, media_file_name)
            }
            (_, None) => {
                debug!("No match context, using the first subtitle entry");
                candidates.first().map(String::as_str)
            }
        }
    }
}

/// Copy a whole entry into memory, checking for cancellation between chunks
fn read_cancellable(reader: &mut dyn Read, cancel: &CancellationToken) -> SubsroResult<Vec<u8>> {
    let mut content = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        if cancel.is_cancelled() {
            return Err(SubsroError::Cancelled);
        }
        let read = reader.read(&mut chunk).map_err(|e| SubsroError::Archive {
            message: format!("Failed to read archive entry: {}", e),
        })?;
        if read == 0 {
            break;
        }
        content.extend_from_slice(&chunk[..read]);
    }

    Ok(content)
}

fn base_name(entry_name: &str) -> &str {
    entry_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(entry_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, SimpleFileOptions::default())
                    .unwrap();
            } else {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn episode(n: u32) -> MatchContext {
        MatchContext::Episode { episode_number: n }
    }

    fn extract(bytes: &[u8], context: Option<&MatchContext>) -> Option<SubtitleFile> {
        ArchiveExtractor::new()
            .extract(bytes, context, &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn test_detect_magic() {
        assert_eq!(ArchiveKind::detect(b"PK\x03\x04rest"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::detect(b"Rar!\x1a\x07\x00"), Some(ArchiveKind::Rar));
        assert_eq!(ArchiveKind::detect(b"7z\xbc\xaf"), None);
        assert_eq!(ArchiveKind::detect(b"P"), None);
        assert_eq!(ArchiveKind::detect(b""), None);
    }

    #[test]
    fn test_unrecognized_format_is_no_subtitle() {
        let result = ArchiveExtractor::new().extract(
            b"this is not an archive",
            Some(&episode(1)),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_single_candidate_bypasses_matching() {
        let bytes = build_zip(&[
            ("readme.txt", "ignore me"),
            ("Show.S01E09.srt", "only one"),
        ]);

        for context in [
            Some(episode(2)),
            Some(MatchContext::Movie {
                media_file_name: "Other.Movie.mkv".to_string(),
            }),
            None,
        ] {
            let file = extract(&bytes, context.as_ref()).unwrap();
            assert_eq!(file.file_name, "Show.S01E09.srt");
            assert_eq!(file.content.as_ref(), b"only one");
        }
    }

    #[test]
    fn test_episode_context_dispatch() {
        let bytes = build_zip(&[
            ("Show.S01E01.srt", "one"),
            ("Show.S01E02.srt", "two"),
            ("Show.S01E03.srt", "three"),
        ]);

        let file = extract(&bytes, Some(&episode(2))).unwrap();
        assert_eq!(file.file_name, "Show.S01E02.srt");
        assert_eq!(file.content.as_ref(), b"two");
    }

    #[test]
    fn test_movie_context_dispatch() {
        let bytes = build_zip(&[
            ("Movie.2024.DVDRip.srt", "dvd"),
            ("Movie.2024.HDRip.srt", "hd"),
        ]);
        let context = MatchContext::Movie {
            media_file_name: "Movie.2024.HDRip.x264.mkv".to_string(),
        };

        let file = extract(&bytes, Some(&context)).unwrap();
        assert_eq!(file.file_name, "Movie.2024.HDRip.srt");
        assert_eq!(file.content.as_ref(), b"hd");
    }

    #[test]
    fn test_no_context_uses_first_candidate() {
        let bytes = build_zip(&[("b.srt", "b"), ("a.srt", "a")]);
        let file = extract(&bytes, None).unwrap();
        assert_eq!(file.file_name, "b.srt");
    }

    #[test]
    fn test_skips_directories_and_other_files() {
        let bytes = build_zip(&[
            ("Season 1/", ""),
            ("Season 1/cover.jpg", "jpg"),
            ("Season 1/Show.S01E04.ASS", "ass"),
            ("Season 1/Show.S01E05.ass", "ass5"),
            ("Season 1/notes.nfo", "nfo"),
        ]);

        let file = extract(&bytes, Some(&episode(4))).unwrap();
        assert_eq!(file.file_name, "Show.S01E04.ASS");
        assert_eq!(file.content.as_ref(), b"ass");
    }

    #[test]
    fn test_no_subtitle_in_archive() {
        let bytes = build_zip(&[("readme.txt", "x"), ("poster.png", "y")]);
        assert!(extract(&bytes, Some(&episode(1))).is_none());
    }

    #[test]
    fn test_custom_extensions() {
        let bytes = build_zip(&[("a.srt", "srt"), ("a.vtt", "vtt")]);
        let file = ArchiveExtractor::with_extensions([".VTT"])
            .extract(&bytes, None, &CancellationToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(file.file_name, "a.vtt");
    }

    #[test]
    fn test_cancelled_read() {
        let bytes = build_zip(&[("a.srt", "content")]);
        let token = CancellationToken::new();
        token.cancel();

        let result = ArchiveExtractor::new().extract(&bytes, None, &token);
        assert!(matches!(result, Err(SubsroError::Cancelled)));
    }

    #[test]
    fn test_corrupt_zip_is_error() {
        let result =
            ArchiveExtractor::new().extract(b"PK\x03\x04garbage", None, &CancellationToken::new());
        assert!(matches!(result, Err(SubsroError::Archive { .. })));
    }

    // Stored (uncompressed) RAR 4 archives
    const SEASON_RAR: &[u8] = include_bytes!("../tests/fixtures/season.rar");
    const MOVIE_RAR: &[u8] = include_bytes!("../tests/fixtures/movie.rar");

    #[test]
    fn test_rar_entry_names_skip_directories() {
        let mut source = RarSource::new(SEASON_RAR).unwrap();
        assert_eq!(
            source.entry_names().unwrap(),
            vec![
                "Show.S01E01.srt",
                "Show.S01E02.srt",
                "Show.S01E03.srt",
                "readme.txt"
            ]
        );
    }

    #[test]
    fn test_rar_episode_context_dispatch() {
        assert_eq!(ArchiveKind::detect(SEASON_RAR), Some(ArchiveKind::Rar));

        let file = extract(SEASON_RAR, Some(&episode(2))).unwrap();
        assert_eq!(file.file_name, "Show.S01E02.srt");
        assert_eq!(
            file.content.as_ref(),
            b"1\n00:00:01,000 --> 00:00:02,000\nsecond\n"
        );

        let file = extract(SEASON_RAR, Some(&episode(3))).unwrap();
        assert_eq!(file.file_name, "Show.S01E03.srt");
    }

    #[test]
    fn test_rar_single_candidate_bypasses_matching() {
        let context = MatchContext::Movie {
            media_file_name: "Unrelated.Title.CAM.mkv".to_string(),
        };
        let file = extract(MOVIE_RAR, Some(&context)).unwrap();
        assert_eq!(file.file_name, "Movie.2024.1080p.BluRay.srt");
        assert_eq!(file.content.as_ref(), b"1\n00:00:01,000 --> 00:00:02,000\nmovie\n");
    }

    #[test]
    fn test_rar_missing_entry_is_error() {
        let mut source = RarSource::new(SEASON_RAR).unwrap();
        let result = source.open_entry("Show.S01E09.srt");
        assert!(matches!(result, Err(SubsroError::Archive { .. })));
    }

    #[test]
    fn test_rar_spool_removed_on_drop() {
        let source = RarSource::new(MOVIE_RAR).unwrap();
        let path = source.file.path().to_path_buf();
        assert!(path.exists());

        drop(source);
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_rar_is_error() {
        let result = ArchiveExtractor::new().extract(
            b"Rar!\x1a\x07\x00garbage",
            Some(&episode(1)),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(SubsroError::Archive { .. })));
    }

    #[test]
    fn test_content_outlives_archive() {
        let file = {
            let bytes = build_zip(&[("x.srt", "kept")]);
            extract(&bytes, None).unwrap()
        };
        assert_eq!(file.content.as_ref(), b"kept");
    }

    #[test]
    fn test_is_subtitle() {
        let extractor = ArchiveExtractor::new();
        assert!(extractor.is_subtitle("a.SRT"));
        assert!(extractor.is_subtitle("dir/a.ssa"));
        assert!(!extractor.is_subtitle("a.srt.txt"));
        assert!(!extractor.is_subtitle("srt"));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("Season 1/Show.srt"), "Show.srt");
        assert_eq!(base_name("a\\b.srt"), "b.srt");
        assert_eq!(base_name("plain.srt"), "plain.srt");
    }
}
