use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures_util::future::{ready, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Paths served without a bearer token: liveness, the payment gateway's
/// signed callback, and the websocket handshake (which authenticates via a
/// query-string token of its own).
const PUBLIC_PATHS: [&str; 3] = ["/health", "/api/v1/wallet/callback", "/ws"];

/// Account id extracted from JWT
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Validate an HS256 bearer token and extract the account id from `sub`.
pub fn decode_user_id(secret: &str, token: &str) -> Result<Uuid, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized)?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)
}

/// JWT Authentication Middleware
pub struct JwtAuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
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
            if PUBLIC_PATHS.contains(&req.path()) {
                return service.call(req).await;
            }

            let secret = req
                .app_data::<web::Data<AppState>>()
                .map(|state| state.config.jwt_secret.clone())
                .ok_or_else(|| {
                    actix_web::error::ErrorInternalServerError("app state missing")
                })?;

            let auth_header = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .ok_or(AppError::Unauthorized)?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(AppError::Unauthorized)?;

            let user_id = decode_user_id(&secret, token).map_err(|e| {
                tracing::warn!("JWT validation failed");
                e
            })?;

            req.extensions_mut().insert(UserId(user_id));

            service.call(req).await
        })
    }
}

/// FromRequest implementation for UserId
impl actix_web::FromRequest for UserId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<UserId>() {
            Some(user_id) => ready(Ok(*user_id)),
            None => ready(Err(AppError::Unauthorized.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(secret: &str, sub: &str) -> String {
        let claims = serde_json::json!({
            "sub": sub,
            "exp": (chrono::Utc::now().timestamp() + 3600) as usize,
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_account_id() {
        let id = Uuid::new_v4();
        let token = token_for("secret", &id.to_string());
        assert_eq!(decode_user_id("secret", &token).unwrap(), id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = token_for("secret", &Uuid::new_v4().to_string());
        assert!(matches!(
            decode_user_id("other", &token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let token = token_for("secret", "not-a-uuid");
        assert!(matches!(
            decode_user_id("secret", &token),
            Err(AppError::Unauthorized)
        ));
    }
}
