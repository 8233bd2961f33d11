use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json,
};
use serde::Serialize;
use viewline_core::DeviceBinding;

use crate::{
    schemas::{OptionalAccountQuery, RegisterDeviceSchema, ValidatedJson, VerifyDeviceQuery},
    Router, ServerContext,
};

#[derive(Debug, Serialize)]
struct RegistrationBody {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VerificationBody {
    verified: bool,
    reason: &'static str,
}

#[derive(Debug, Serialize)]
struct AccountDeviceBody {
    account_id: String,
    device_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeviceTableBody {
    total_devices: usize,
    registrations: Vec<DeviceBinding>,
}

async fn register_device(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterDeviceSchema>,
) -> Response {
    let outcome = context
        .coordinator
        .register_device(&body.account_id, &body.device_id);

    // Conflicting bindings are refused outright, the caller treats them as
    // fraud signals
    let code = if outcome.is_conflict() {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::OK
    };

    (
        code,
        Json(RegistrationBody {
            status: outcome.as_str(),
        }),
    )
        .into_response()
}

async fn verify_device(
    State(context): State<ServerContext>,
    Query(query): Query<VerifyDeviceQuery>,
) -> Json<VerificationBody> {
    let verification = context
        .coordinator
        .verify_device(&query.account_id, &query.device_id);

    Json(VerificationBody {
        verified: verification.verified(),
        reason: verification.reason(),
    })
}

async fn device_info(
    State(context): State<ServerContext>,
    Query(query): Query<OptionalAccountQuery>,
) -> Response {
    if let Some(account_id) = query.account_id {
        let device_id = context.coordinator.devices.device_for(&account_id);

        return Json(AccountDeviceBody {
            account_id,
            device_id,
        })
        .into_response();
    }

    let registrations = context.coordinator.devices.bindings();

    Json(DeviceTableBody {
        total_devices: registrations.len(),
        registrations,
    })
    .into_response()
}

pub fn router() -> Router {
    Router::new()
        .route("/device/register", post(register_device))
        .route("/device/verify", get(verify_device))
        .route("/device/info", get(device_info))
}
