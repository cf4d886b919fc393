use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures_util::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::cache::status_cache;
use crate::error::AppError;
use crate::middleware::jwt_auth::UserId;
use crate::models::AccountStatus;
use crate::state::AppState;

/// Rejects requests from banned accounts.
///
/// Registered inside `JwtAuthMiddleware` so the `UserId` extension is
/// already populated; anonymous requests (public paths) pass through
/// untouched. The check goes through the status cache, so the common case
/// costs one Redis read.
pub struct BanGuardMiddleware;

impl<S, B> Transform<S, ServiceRequest> for BanGuardMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = BanGuardMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BanGuardMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct BanGuardMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for BanGuardMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let user = req.extensions().get::<UserId>().copied();

            if let Some(UserId(account_id)) = user {
                let state = req
                    .app_data::<web::Data<AppState>>()
                    .cloned()
                    .ok_or_else(|| {
                        actix_web::error::ErrorInternalServerError("app state missing")
                    })?;

                match status_cache::get_status(
                    &state.redis,
                    &state.db,
                    account_id,
                    state.config.status_cache_ttl_secs,
                )
                .await
                {
                    Ok(AccountStatus::Banned) => {
                        tracing::info!(account_id = %account_id, "request from banned account rejected");
                        return Err(AppError::Forbidden.into());
                    }
                    Ok(AccountStatus::Normal) => {}
                    Err(AppError::NotFound) => {
                        // Token subject without an account row; downstream
                        // handlers will fail their own lookups.
                        tracing::warn!(account_id = %account_id, "authenticated account missing from store");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            service.call(req).await
        })
    }
}
