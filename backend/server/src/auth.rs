//! # Authentication
//!
//! Passwords are stored as bcrypt hashes. Sessions are bearer tokens:
//!
//! ```text
//! base64url(claims JSON) "." base64url(HMAC-SHA256(claims JSON))
//! ```
//!
//! Claims carry the account id, its role and, for students and branch admins,
//! the branch.
//! The branch in the token is what scopes an admin's requests; nothing in the
//! request body can widen it.
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use catalog::{Branch, Role};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tokio::task::spawn_blocking;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    Ok(spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    Ok(spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    #[serde(flatten)]
    pub role: Role,
    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("bad signature")]
    BadSignature,

    #[error("token expired")]
    Expired,
}

pub struct TokenCodec {
    key: Vec<u8>,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    fn mac(&self) -> Result<Hmac<Sha256>, TokenError> {
        <Hmac<Sha256>>::new_from_slice(&self.key).map_err(|_| TokenError::Malformed)
    }

    pub fn issue(&self, id: Uuid, role: Role) -> Result<String, AppError> {
        let claims = Claims {
            id,
            role,
            exp: (Utc::now() + self.ttl).timestamp(),
        };

        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        let payload =
            serde_json::to_vec(claims).map_err(|e| AppError::Internal(e.to_string()))?;

        let mut mac = self
            .mac()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Data visible to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Branch(Branch),
    All,
}

impl Scope {
    pub fn admits(self, branch: Branch) -> bool {
        match self {
            Scope::Branch(own) => own == branch,
            Scope::All => true,
        }
    }

    pub fn branch(self) -> Option<Branch> {
        match self {
            Scope::Branch(branch) => Some(branch),
            Scope::All => None,
        }
    }
}

/// Administrative scope of a role; students have none.
pub fn scope_of(role: Role) -> Option<Scope> {
    match role {
        Role::Student { .. } => None,
        Role::Admin { branch } => Some(Scope::Branch(branch)),
        Role::SuperAdmin => Some(Scope::All),
    }
}

/// Identity of the caller, resolved from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub id: Uuid,
    pub role: Role,
}

impl RequestContext {
    pub fn require_student(&self) -> Result<Uuid, AppError> {
        match self.role {
            Role::Student { .. } => Ok(self.id),
            _ => Err(AppError::AccessDenied(
                "Access denied: Students only".to_string(),
            )),
        }
    }

    pub fn require_admin(&self) -> Result<Scope, AppError> {
        scope_of(self.role)
            .ok_or_else(|| AppError::AccessDenied("Access denied: Admins only".to_string()))
    }

    /// Any admin account, whatever its scope.
    pub fn require_staff(&self) -> Result<Uuid, AppError> {
        self.require_admin().map(|_| self.id)
    }

    pub fn require_super_admin(&self) -> Result<Uuid, AppError> {
        match self.role {
            Role::SuperAdmin => Ok(self.id),
            _ => Err(AppError::AccessDenied(
                "Access denied: Super admins only".to_string(),
            )),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthenticated("No token provided".to_string()))?;

        let claims = state
            .tokens
            .verify(token)
            .map_err(|_| AppError::Unauthenticated("Invalid token".to_string()))?;

        Ok(Self {
            id: claims.id,
            role: claims.role,
        })
    }
}
