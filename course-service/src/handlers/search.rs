use crate::config::SearchMode;
use crate::dtos::{SearchRequest, SearchResponse};
use crate::services::store::Filters;
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{extract::State, Json};
use service_core::error::AppError;
use std::time::Instant;

/// Longest query text sent to the embedding model.
const MAX_EMBED_CHARS: usize = 500;

pub async fn search_courses(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let limit = request.limit();
    let filters: Filters = request.filters.clone().unwrap_or_default();
    let mode = state.config.search.mode;

    tracing::info!(
        mode = ?mode,
        limit,
        filter_count = filters.len(),
        query_len = request.query.chars().count(),
        "Searching courses"
    );

    let start = Instant::now();
    let results = match mode {
        SearchMode::Title => {
            state
                .store
                .search_by_title(&request.query, limit, &filters)
                .await?
        }
        SearchMode::Semantic => {
            let text: String = request.query.chars().take(MAX_EMBED_CHARS).collect();
            let embedding = state.embedder.embed(&text).await?;
            state
                .store
                .match_by_embedding(&embedding, limit, &filters)
                .await?
        }
    };
    let took_ms = start.elapsed().as_millis() as u64;

    tracing::info!(result_count = results.len(), took_ms, "Search completed");

    Ok(Json(SearchResponse { results, took_ms }))
}
