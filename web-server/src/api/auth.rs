// web-server/src/api/auth.rs
use actix_web::{get, post, web, HttpResponse, Responder};
use farm_common::auth::VerifiedToken;
use farm_common::models::auth::{
    AuthCheckResponse, CallerStatusResponse, TokenRequest, TokenResponse,
};

use crate::error::ApiError;
use crate::state::AppState;

// Reached only through BearerAuth::required
#[get("/check")]
pub async fn check(auth: web::ReqData<VerifiedToken>) -> impl Responder {
    HttpResponse::Ok().json(AuthCheckResponse {
        success: true,
        auth: auth.into_inner(),
    })
}

// Known and anonymous callers alike
#[get("/status")]
pub async fn caller_status(auth: Option<web::ReqData<VerifiedToken>>) -> impl Responder {
    let auth = auth.map(web::ReqData::into_inner);
    HttpResponse::Ok().json(CallerStatusResponse::from(auth))
}

/// Server-side issuance for internal callers and test clients
#[post("/token")]
pub async fn issue_token(
    state: web::Data<AppState>,
    body: web::Json<TokenRequest>,
) -> Result<HttpResponse, ApiError> {
    if !state.expose_issuer {
        return Err(ApiError::NotFound);
    }

    let request = body.into_inner();
    let token = state
        .issuer
        .issue(&request.endpoint, request.referral_code.as_deref())
        .map_err(|e| {
            tracing::error!("Token issuance failed: {}", e);
            ApiError::Internal
        })?;

    tracing::info!("Issued token for endpoint {}", request.endpoint);
    Ok(HttpResponse::Ok().json(TokenResponse {
        success: true,
        token,
    }))
}
