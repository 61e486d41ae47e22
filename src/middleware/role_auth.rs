use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, warn};

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::models::user::UserRole;

/// Restricts a scope to one role. Must sit inside `AuthMiddleware`, i.e. be
/// registered with `.wrap()` before it, so the claims are already present.
pub struct RequireRole {
    required_role: UserRole,
}

impl RequireRole {
    pub fn new(role: UserRole) -> Self {
        RequireRole {
            required_role: role,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequireRoleService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleService {
            service,
            required_role: self.required_role,
        }))
    }
}

pub struct RequireRoleService<S> {
    service: S,
    required_role: UserRole,
}

impl<S, B> Service<ServiceRequest> for RequireRoleService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();

        match claims {
            Some(claims) if claims.role == self.required_role || claims.role == UserRole::Admin => {
                debug!("Role check passed for {} ({:?})", claims.username, claims.role);
                Box::pin(self.service.call(req))
            }
            Some(claims) => {
                warn!(
                    "User {} with role {:?} denied access to {}",
                    claims.username,
                    claims.role,
                    req.path()
                );
                Box::pin(ready(Err(
                    AppError::forbidden("Insufficient permissions").into()
                )))
            }
            None => Box::pin(ready(Err(AppError::unauthorized("No authorization").into()))),
        }
    }
}
