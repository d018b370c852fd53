pub mod archive;
pub mod cascade;
pub mod catalog;
pub mod episode_matcher;
pub mod error;
pub mod language;
pub mod levenshtein;
pub mod movie_matcher;
pub mod release_format;
pub mod subtitle_id;
pub mod types;

pub use archive::{ArchiveExtractor, ArchiveKind, SubtitleArchive};
pub use catalog::{CatalogRecord, Quota, RecordType, SearchField, SubsRoClient, SubtitleCatalog};
pub use episode_matcher::EpisodeMatcher;
pub use error::{SubsroError, SubsroResult};
pub use movie_matcher::select_movie;
pub use release_format::{ReleaseFormat, extract_format};
pub use subtitle_id::{Locator, SeasonEpisode, SubtitleIdentifier};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    ContentType, MatchContext, RemoteSubtitleInfo, SearchRequest, SubsroOptions,
    SubtitleDownload, SubtitleFile, SubtitleFormat,
};

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Subtitle provider: searches the catalog and resolves identifiers to a
/// single subtitle file
pub struct Subsro<C = SubsRoClient> {
    catalog: C,
    extractor: Arc<ArchiveExtractor>,
}

impl Subsro<SubsRoClient> {
    /// Create a provider backed by the subs.ro HTTP API
    pub fn new(options: SubsroOptions) -> SubsroResult<Self> {
        info!("Initializing subs.ro provider at {}", options.base_url);
        let catalog = SubsRoClient::new(&options)?;
        Ok(Self::with_catalog(catalog, &options))
    }
}

impl<C: SubtitleCatalog> Subsro<C> {
    /// Create a provider over any catalog implementation
    pub fn with_catalog(catalog: C, options: &SubsroOptions) -> Self {
        let extractor = Arc::new(ArchiveExtractor::with_extensions(
            &options.subtitle_extensions,
        ));
        Self { catalog, extractor }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Search the catalog for subtitles matching the request
    pub async fn search(&self, request: &SearchRequest) -> SubsroResult<Vec<RemoteSubtitleInfo>> {
        let Some((field, value)) = search_query(request) else {
            warn!("Search request has no IMDb id, TMDb id or title");
            return Ok(Vec::new());
        };

        let language = language::to_catalog_code(&request.language);
        info!(
            "Searching subtitles by {} {:?} in language {}",
            field, value, language
        );

        let records = self.catalog.search(field, &value, Some(language)).await?;
        let wanted = wanted_record_type(request);

        let results: Vec<RemoteSubtitleInfo> = records
            .iter()
            .filter(|record| match wanted {
                Some(kind) => {
                    record.record_type == kind || record.record_type == RecordType::Unknown
                }
                None => true,
            })
            .map(|record| remote_info(record, request, language))
            .collect();

        debug!(
            "{} of {} catalog records kept",
            results.len(),
            records.len()
        );
        Ok(results)
    }

    /// Download the archive behind `identifier` and return the matching
    /// subtitle.
    ///
    /// Every failure except cancellation is logged and reported as `Ok(None)`.
    pub async fn fetch(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> SubsroResult<Option<SubtitleDownload>> {
        match self.try_fetch(identifier, cancel).await {
            Ok(download) => Ok(download),
            Err(SubsroError::Cancelled) => {
                info!("Fetch of {} cancelled", identifier);
                Err(SubsroError::Cancelled)
            }
            Err(e) if e.is_no_subtitle() => {
                info!("No subtitle found for {}: {}", identifier, e);
                Ok(None)
            }
            Err(e) => {
                error!("Failed to fetch subtitle {}: {}", identifier, e);
                Ok(None)
            }
        }
    }

    async fn try_fetch(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> SubsroResult<Option<SubtitleDownload>> {
        let id = SubtitleIdentifier::decode(identifier)?;
        let context = id.match_context();
        debug!(
            "Fetching catalog id {} ({}) with context {:?}",
            id.catalog_id, id.language, context
        );

        let bytes = self.catalog.download(id.catalog_id, cancel).await?;

        let extractor = Arc::clone(&self.extractor);
        let token = cancel.clone();
        let file = tokio::task::spawn_blocking(move || {
            extractor.extract(&bytes, context.as_ref(), &token)
        })
        .await
        .map_err(|e| SubsroError::Archive {
            message: format!("Extraction task failed: {}", e),
        })??;

        let Some(file) = file else {
            return Ok(None);
        };

        info!(
            "Resolved {} to {} ({} bytes)",
            identifier,
            file.file_name,
            file.content.len()
        );

        Ok(Some(SubtitleDownload {
            format: file.format(),
            language: language::to_iso639_2(&id.language).to_string(),
            file_name: file.file_name,
            content: file.content,
        }))
    }

    /// Remaining download allowance for the configured key
    pub async fn quota(&self) -> SubsroResult<Quota> {
        self.catalog.quota().await
    }
}

/// Catalog field and value to search by: IMDb id, then TMDb id, then title
fn search_query(request: &SearchRequest) -> Option<(SearchField, String)> {
    fn non_empty(value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    if let Some(imdb_id) = non_empty(request.imdb_id.as_deref()) {
        return Some((SearchField::ImdbId, imdb_id));
    }
    if let Some(tmdb_id) = non_empty(request.tmdb_id.as_deref()) {
        return Some((SearchField::TmdbId, tmdb_id));
    }

    let title = match request.content_type {
        Some(ContentType::Episode) => request
            .series_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(Some(request.media_name.as_str())),
        _ => Some(request.media_name.as_str()),
    };
    non_empty(title).map(|title| (SearchField::Title, title))
}

fn wanted_record_type(request: &SearchRequest) -> Option<RecordType> {
    match request.content_type {
        Some(ContentType::Movie) => Some(RecordType::Movie),
        Some(ContentType::Episode) => Some(RecordType::Series),
        None => None,
    }
}

/// Identifier locator: `S##E##` when both numbers are known, otherwise the
/// media file name when there is one
fn identifier_for(
    record: &CatalogRecord,
    request: &SearchRequest,
    language: &str,
) -> SubtitleIdentifier {
    let record_language = if record.language.trim().is_empty() {
        language
    } else {
        record.language.trim()
    };
    let id = SubtitleIdentifier::new(record.id, record_language);

    match (request.content_type, request.season, request.episode) {
        (Some(ContentType::Episode), Some(season), Some(episode)) => {
            id.with_episode(season, episode)
        }
        _ => match request.media_file_name() {
            Some(file_name) => id.with_file_name(file_name),
            None => id,
        },
    }
}

fn remote_info(
    record: &CatalogRecord,
    request: &SearchRequest,
    language: &str,
) -> RemoteSubtitleInfo {
    let identifier = identifier_for(record, request, language);
    let translator = record
        .translator
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let display_name = match translator {
        Some(translator) => format!("{} - {}", record.title, translator),
        None => record.title.clone(),
    };

    RemoteSubtitleInfo {
        id: identifier.encode(),
        display_name,
        language: language::to_iso639_2(&identifier.language).to_string(),
        format: SubtitleFormat::Srt,
        author: translator.map(str::to_string),
        comment: record.description.clone(),
        created_at: record.created_at.clone(),
    }
}

// Convenience functions for one-off operations

/// Quick function to search subtitles with an API key
pub async fn search_subtitles(
    api_key: &str,
    request: &SearchRequest,
) -> SubsroResult<Vec<RemoteSubtitleInfo>> {
    let provider = Subsro::new(SubsroOptions::new().api_key(api_key))?;
    provider.search(request).await
}

/// Quick function to fetch the subtitle behind an identifier
pub async fn fetch_subtitle(
    api_key: &str,
    identifier: &str,
) -> SubsroResult<Option<SubtitleDownload>> {
    let provider = Subsro::new(SubsroOptions::new().api_key(api_key))?;
    provider.fetch(identifier, &CancellationToken::new()).await
}
