// web-server/src/api/mod.rs
pub mod auth;

use actix_web::web;

use crate::middleware::BearerAuth;
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig, state: &web::Data<AppState>) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .wrap(BearerAuth::required(state))
                    .service(auth::check),
            )
            .service(
                web::scope("/public")
                    .wrap(BearerAuth::optional(state))
                    .service(auth::caller_status),
            )
            .service(auth::issue_token),
    );
}
