//! Bearer-token identity.
//!
//! Tokens are issued elsewhere; this service only verifies HS256 JWTs and
//! turns them into a [`RequestContext`] that handlers check against a
//! [`Permission`].
use actix_web::dev::Payload;
use actix_web::http::{header, Method};
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::db::Visibility;
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    #[serde(default)]
    pub is_staff: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i64, username: impl Into<String>, expires_in: Duration) -> Self {
        let now = Utc::now();
        Claims {
            sub: user_id.to_string(),
            username: username.into(),
            is_staff: false,
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }

    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }
}

/// HS256 signer/verifier sharing one secret.
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuth {
    pub fn new(secret: &[u8]) -> Self {
        JwtAuth {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }

    /// Verifies `token` and resolves the caller it names.
    pub fn identify(&self, token: &str) -> Result<Identity, ApiError> {
        let claims = self.decode(token).map_err(|e| {
            debug!("[AUTH] Rejected token: {}", e);
            invalid_token()
        })?;
        let user_id = claims.sub.parse::<i64>().map_err(|_| {
            warn!("[AUTH] Token subject is not a user id: {:?}", claims.sub);
            invalid_token()
        })?;
        Ok(Identity {
            user_id,
            username: claims.username,
            is_staff: claims.is_staff,
        })
    }
}

fn invalid_token() -> ApiError {
    ApiError::Unauthorized("Given token not valid for any token type".to_string())
}

/// The verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
}

impl Identity {
    /// Staff see every row of an owned resource, everyone else only theirs.
    pub fn visibility(&self) -> Visibility {
        if self.is_staff {
            Visibility::All
        } else {
            Visibility::Owner(self.user_id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Safe methods are open to anonymous callers; anything else needs a
    /// verified identity.
    AuthenticatedOrReadOnly,
    Authenticated,
}

/// Per-request caller context, extracted from the `Authorization` header.
///
/// A missing header (or a non-Bearer scheme) yields an anonymous context; a
/// Bearer token that fails verification rejects the request with 401.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: Option<Identity>,
    method: Method,
}

impl RequestContext {
    pub fn anonymous(method: Method) -> Self {
        RequestContext {
            identity: None,
            method,
        }
    }

    pub fn authenticated(identity: Identity, method: Method) -> Self {
        RequestContext {
            identity: Some(identity),
            method,
        }
    }

    fn is_safe_method(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    pub fn authorize(&self, permission: Permission) -> Result<(), ApiError> {
        match (permission, &self.identity) {
            (_, Some(_)) => Ok(()),
            (Permission::AuthenticatedOrReadOnly, None) if self.is_safe_method() => Ok(()),
            _ => Err(ApiError::unauthenticated()),
        }
    }

    pub fn require_identity(&self) -> Result<&Identity, ApiError> {
        self.identity.as_ref().ok_or_else(ApiError::unauthenticated)
    }

    fn from_http(req: &HttpRequest) -> Result<Self, ApiError> {
        let method = req.method().clone();
        let Some(value) = req.headers().get(header::AUTHORIZATION) else {
            return Ok(Self::anonymous(method));
        };
        let value = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid Authorization header.".to_string()))?;

        let mut parts = value.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
                let auth = req.app_data::<web::Data<JwtAuth>>().ok_or_else(|| {
                    ApiError::Internal("token verifier is not registered".to_string())
                })?;
                Ok(Self::authenticated(auth.identify(token)?, method))
            }
            (Some(scheme), _, _) if scheme.eq_ignore_ascii_case("bearer") => Err(
                ApiError::Unauthorized("Authorization header must contain one token.".to_string()),
            ),
            _ => Ok(Self::anonymous(method)),
        }
    }
}

impl FromRequest for RequestContext {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_http(req))
    }
}
