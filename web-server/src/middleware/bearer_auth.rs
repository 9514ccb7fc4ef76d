// web-server/src/middleware/bearer_auth.rs
use std::sync::Arc;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use farm_common::auth::{TokenVerifier, VerifiedToken};
use futures_util::future::{ready, LocalBoxFuture, Ready};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the caller's referral code
pub const REFERRAL_HEADER: &str = "X-Referral-Code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Reject on any verification failure
    Required,
    /// Attach the token when it verifies, otherwise carry on anonymously
    Optional,
}

/// Verifies `Authorization: Bearer` tokens and stores the accepted
/// [`VerifiedToken`] in request extensions.
#[derive(Clone)]
pub struct BearerAuth {
    verifier: Arc<TokenVerifier>,
    mode: Mode,
    accept_caller_referral: bool,
    enforce_endpoint_match: bool,
}

impl BearerAuth {
    pub fn required(state: &AppState) -> Self {
        Self::with_mode(state, Mode::Required)
    }

    pub fn optional(state: &AppState) -> Self {
        Self::with_mode(state, Mode::Optional)
    }

    fn with_mode(state: &AppState, mode: Mode) -> Self {
        Self {
            verifier: state.verifier.clone(),
            mode,
            accept_caller_referral: state.accept_caller_referral,
            enforce_endpoint_match: state.enforce_endpoint_match,
        }
    }

    fn check(&self, req: &ServiceRequest) -> Result<VerifiedToken, ApiError> {
        let headers = req.headers();
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let referral = if self.accept_caller_referral {
            headers
                .get(REFERRAL_HEADER)
                .and_then(|value| value.to_str().ok())
                .filter(|code| !code.is_empty())
        } else {
            None
        };

        let token = match referral {
            Some(code) => self.verifier.verify_with_referral(authorization, code)?,
            None => self.verifier.verify(authorization)?,
        };

        if self.enforce_endpoint_match && token.endpoint != req.path() {
            return Err(ApiError::EndpointMismatch);
        }
        Ok(token)
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = BearerAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthMiddleware {
            service,
            auth: self.clone(),
        }))
    }
}

pub struct BearerAuthMiddleware<S> {
    service: S,
    auth: BearerAuth,
}

impl<S, B> Service<ServiceRequest> for BearerAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.auth.check(&req) {
            Ok(token) => {
                tracing::debug!(endpoint = %token.endpoint, "Bearer token accepted");
                req.extensions_mut().insert(token);
            }
            Err(err) if self.auth.mode == Mode::Required => {
                let kind = match &err {
                    ApiError::Auth(auth) => auth.code(),
                    _ => "endpoint_mismatch",
                };
                tracing::warn!("Rejected request to {}: {}", req.path(), kind);
                return Box::pin(async move { Err(err.into()) });
            }
            Err(_) => {
                tracing::trace!("No valid bearer token for {}, continuing anonymously", req.path());
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            fut.await
        })
    }
}
