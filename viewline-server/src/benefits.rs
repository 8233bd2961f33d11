use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json,
};
use serde::Serialize;
use viewline_core::CatalogEntry;

use crate::{
    errors::ServerResult,
    schemas::{AccountQuery, RedeemSchema, ValidatedJson},
    serialized::{BenefitBody, RedeemBody, ToSerialized},
    Router, ServerContext,
};

#[derive(Debug, Serialize)]
struct BenefitsBody {
    has_benefit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    benefit: Option<BenefitBody>,
}

#[derive(Debug, Serialize)]
struct CatalogBody {
    redemptions: Vec<CatalogEntry>,
}

async fn redeem(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RedeemSchema>,
) -> ServerResult<Json<RedeemBody>> {
    let outcome = context
        .coordinator
        .redeem(&body.account_id, body.benefit_type)
        .await?;

    Ok(Json(outcome.to_serialized()))
}

async fn benefits(
    State(context): State<ServerContext>,
    Query(query): Query<AccountQuery>,
) -> Json<BenefitsBody> {
    let benefit = context.coordinator.benefits.current(&query.account_id);

    Json(BenefitsBody {
        has_benefit: benefit.is_some(),
        benefit: benefit.map(|b| b.to_serialized()),
    })
}

async fn redemptions(State(context): State<ServerContext>) -> Json<CatalogBody> {
    Json(CatalogBody {
        redemptions: context.coordinator.catalog.entries().to_vec(),
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/redeem", post(redeem))
        .route("/benefits", get(benefits))
        .route("/redemptions", get(redemptions))
}
