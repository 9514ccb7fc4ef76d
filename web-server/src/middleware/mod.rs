pub mod bearer_auth;

pub use bearer_auth::BearerAuth;
