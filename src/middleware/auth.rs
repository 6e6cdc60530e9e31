use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::identity::{Identity, Role};
use crate::services::identity_service::RevocationList;
use crate::AppState;

/// Claims of tokens minted by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub role: Role,
    pub iat: i64,
    pub exp: usize,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            uid: self.sub.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            role: self.role,
        }
    }
}

#[derive(Clone)]
pub struct AuthKeys {
    decoding: DecodingKey,
    pub revocations: RevocationList,
}

impl AuthKeys {
    pub fn new(jwt_secret: &str, revocations: RevocationList) -> Self {
        Self {
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
            revocations,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| Error::Unauthorized("invalid_token".to_string()))?
            .claims;

        if self.revocations.is_revoked(&claims.sub, claims.iat) {
            return Err(Error::Unauthorized("token_revoked".to_string()));
        }
        if !claims.email_verified {
            return Err(Error::Forbidden("email_not_verified".to_string()));
        }
        Ok(claims)
    }
}

fn bearer_token(req: &Request) -> Result<&str, Error> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("missing_authorization".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| Error::Unauthorized("bad_authorization".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("unsupported_scheme".to_string()))
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = match bearer_token(&req).and_then(|token| state.auth.verify(token)) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };
    req.extensions_mut().insert(claims);
    next.run(req).await
}

/// Must run after `require_auth`.
pub async fn require_teacher(req: Request, next: Next) -> Response {
    match req.extensions().get::<Claims>() {
        Some(claims) if claims.role == Role::Teacher => next.run(req).await,
        Some(_) => Error::Forbidden("forbidden".to_string()).into_response(),
        None => Error::Unauthorized("missing_authorization".to_string()).into_response(),
    }
}
