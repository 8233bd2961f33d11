use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json,
};
use serde::Serialize;

use crate::{
    errors::ServerResult,
    schemas::{BonusQuery, StartSessionSchema, ValidatedJson, WatchVideoSchema},
    serialized::{BonusBody, ToSerialized, VideosWatchedBody},
    Router, ServerContext,
};

#[derive(Debug, Serialize)]
struct SessionStartedBody {
    session_id: String,
}

async fn start_session(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<StartSessionSchema>,
) -> Json<SessionStartedBody> {
    let session = context.coordinator.start_session(&body.account_id);

    Json(SessionStartedBody {
        session_id: session.id().to_string(),
    })
}

async fn watch_video(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<WatchVideoSchema>,
) -> ServerResult<Json<VideosWatchedBody>> {
    let outcome = context
        .coordinator
        .record_video(&body.session_id, &body.content_id)
        .await?;

    Ok(Json(outcome.to_serialized()))
}

async fn binge_bonus(
    State(context): State<ServerContext>,
    Query(query): Query<BonusQuery>,
) -> Json<BonusBody> {
    let outcome = context
        .coordinator
        .claim_binge_bonus(&query.session_id, query.account_id.as_deref())
        .await;

    Json(outcome.to_serialized())
}

pub fn router() -> Router {
    Router::new()
        .route("/session/start", post(start_session))
        .route("/session/video", post(watch_video))
        .route("/session/bonus", get(binge_bonus))
}
