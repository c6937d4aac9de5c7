use crate::dtos::{RecommendRequest, RecommendResponse};
use crate::services::metrics::{record_dropped_recommendations, record_unparseable_reply};
use crate::services::recommender::{build_prompt, generation_params, parse_recommendations};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{extract::State, Json};
use service_core::error::AppError;
use std::time::Instant;

pub async fn recommend_courses(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RecommendRequest>,
) -> Result<Json<RecommendResponse>, AppError> {
    let top_k = request.effective_top_k(state.config.recommend.max_top_k);
    let messages = build_prompt(&request.query, &request.results, top_k);
    let params = generation_params(state.config.openai.temperature, top_k);

    tracing::info!(
        candidates = request.results.len(),
        top_k,
        model = state.text_provider.model(),
        "Generating recommendations"
    );

    let start = Instant::now();
    let response = state.text_provider.generate(&messages, &params).await?;
    let took_ms = start.elapsed().as_millis() as u64;

    tracing::debug!(
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        finish_reason = ?response.finish_reason,
        took_ms,
        "Generation completed"
    );

    let raw = response.text.unwrap_or_default();
    let recommendations = match parse_recommendations(&raw, &request.results, top_k) {
        Ok(parsed) => {
            if parsed.dropped > 0 {
                tracing::warn!(dropped = parsed.dropped, "Discarded invalid model entries");
            }
            record_dropped_recommendations(parsed.dropped);
            parsed.recommendations
        }
        Err(e) => {
            tracing::warn!(error = %e, output_len = raw.len(), "Model output could not be parsed");
            record_unparseable_reply();
            Vec::new()
        }
    };

    tracing::info!(returned = recommendations.len(), top_k, took_ms, "Recommendations ready");

    Ok(Json(RecommendResponse {
        recommendations,
        took_ms,
    }))
}
