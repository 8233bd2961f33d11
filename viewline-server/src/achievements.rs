use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json,
};
use serde::Serialize;

use crate::{
    schemas::{AccountQuery, CheckAchievementsSchema, ValidatedJson},
    serialized::{AwardedBadgeBody, BadgeBody, ToSerialized},
    Router, ServerContext,
};

#[derive(Debug, Serialize)]
struct BadgesBody {
    account_id: String,
    owned_count: usize,
    total_badges: usize,
    owned_badges: Vec<BadgeBody>,
    available_badges: Vec<BadgeBody>,
}

#[derive(Debug, Serialize)]
struct NewBadgesBody {
    new_badges: Vec<AwardedBadgeBody>,
    total_new: usize,
}

async fn badges(
    State(context): State<ServerContext>,
    Query(query): Query<AccountQuery>,
) -> Json<BadgesBody> {
    let statuses = context.coordinator.badges_for(&query.account_id);
    let total_badges = statuses.len();

    let (owned, available): (Vec<_>, Vec<_>) = statuses.into_iter().partition(|s| s.owned);

    Json(BadgesBody {
        account_id: query.account_id,
        owned_count: owned.len(),
        total_badges,
        owned_badges: owned.to_serialized(),
        available_badges: available.to_serialized(),
    })
}

async fn check_achievements(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<CheckAchievementsSchema>,
) -> Json<NewBadgesBody> {
    let new_badges = context.coordinator.check_achievements(&body.account_id).await;

    Json(NewBadgesBody {
        total_new: new_badges.len(),
        new_badges: new_badges.to_serialized(),
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/badges", get(badges))
        .route("/achievements/check", post(check_achievements))
}
