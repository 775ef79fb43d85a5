use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::app_error::AppError;

/// Header set by the authenticating gateway in front of this service.
pub const STAFF_ID_HEADER: &str = "x-staff-id";

/// Staff account id of the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffId(pub i32);

/// Rejects requests that carry no staff identity and exposes it as `Extension<StaffId>`.
pub async fn staff_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let staff_id = parse_staff_id(req.headers()).ok_or(AppError::Unauthorized)?;
    tracing::debug!(staff_id = staff_id.0, "Authorized staff request");
    req.extensions_mut().insert(staff_id);
    Ok(next.run(req).await)
}

fn parse_staff_id(headers: &HeaderMap) -> Option<StaffId> {
    headers
        .get(STAFF_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .map(StaffId)
}
