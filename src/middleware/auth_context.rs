use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, Error, FromRequest, HttpMessage, HttpRequest};

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::auth::{claims_from_headers, Claims};
use crate::models::user::UserRole;

/// The caller behind a request. Uses the claims left by `AuthMiddleware`
/// when the route sits in a protected scope, and otherwise verifies the
/// bearer token itself, so it also works on routes that mix public and
/// protected methods.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Self-service check: the caller acts on their own account, or is an admin.
    pub fn can_act_for(&self, username: &str) -> bool {
        self.is_admin() || self.username.eq_ignore_ascii_case(username)
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        AuthenticatedUser {
            user_id: claims.user_id,
            email: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    if let Some(claims) = req.extensions().get::<Claims>() {
        return Ok(claims.clone().into());
    }

    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| AppError::Server("Authentication is not configured".to_string()))?;

    claims_from_headers(req.headers(), config).map(AuthenticatedUser::from)
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(Error::from))
    }
}

/// An authenticated caller holding the admin role.
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = authenticate(req).and_then(|user| {
            if user.is_admin() {
                Ok(AdminUser(user))
            } else {
                Err(AppError::forbidden("Admin access required"))
            }
        });
        ready(result.map_err(Error::from))
    }
}
