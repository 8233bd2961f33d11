use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json,
};
use serde::Serialize;
use viewline_core::Rating;

use crate::{
    errors::ServerResult,
    schemas::{AccountQuery, RateSchema, ValidatedJson},
    serialized::{RatingResultBody, ToSerialized},
    Router, ServerContext,
};

#[derive(Debug, Serialize)]
struct RatingsBody {
    total_ratings: usize,
    ratings: Vec<Rating>,
}

async fn rate(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RateSchema>,
) -> ServerResult<Json<RatingResultBody>> {
    let outcome = context
        .coordinator
        .submit_rating(
            &body.account_id,
            &body.content_id,
            body.rating,
            &body.session_id,
        )
        .await?;

    Ok(Json(outcome.to_serialized()))
}

async fn ratings(
    State(context): State<ServerContext>,
    Query(query): Query<AccountQuery>,
) -> Json<RatingsBody> {
    let ratings = context.coordinator.ratings.all_for(&query.account_id);

    Json(RatingsBody {
        total_ratings: ratings.len(),
        ratings,
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/rate", post(rate))
        .route("/ratings", get(ratings))
}
