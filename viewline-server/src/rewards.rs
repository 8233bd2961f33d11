use axum::{extract::State, routing::post, Json};

use crate::{
    schemas::{RewardSchema, ValidatedJson},
    serialized::{RewardBody, ToSerialized},
    Router, ServerContext,
};

async fn grant_reward(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RewardSchema>,
) -> Json<RewardBody> {
    let reason = body.reason.as_deref().unwrap_or("Reward");

    let outcome = context
        .coordinator
        .grant_reward(&body.account_id, body.amount, reason)
        .await;

    Json(outcome.to_serialized())
}

pub fn router() -> Router {
    Router::new().route("/reward", post(grant_reward))
}
