//! Authentication and authorization utilities
//!
//! Provides:
//! - Role parsing from identity-provider role strings
//! - JWT token generation and validation
//! - Caller identity extraction for handlers
//! - Role and state permission checks

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Role attached to a principal by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Approver,
    HelpDesk,
    StateRep,
    StateUser,
}

impl UserRole {
    /// All roles in precedence order; the first match wins when a
    /// principal carries several
    pub const PRECEDENCE: [UserRole; 5] = [
        UserRole::Admin,
        UserRole::Approver,
        UserRole::HelpDesk,
        UserRole::StateRep,
        UserRole::StateUser,
    ];

    /// Identity-provider role string
    pub fn as_idp_role(&self) -> &'static str {
        match self {
            UserRole::Admin => "mdctmcr-bor",
            UserRole::Approver => "mdctmcr-approver",
            UserRole::HelpDesk => "mdctmcr-help-desk",
            UserRole::StateRep => "mdctmcr-state-rep",
            UserRole::StateUser => "mdctmcr-state-user",
        }
    }

    /// Roles scoped to a single state
    pub fn is_state_level(&self) -> bool {
        matches!(self, UserRole::StateRep | UserRole::StateUser)
    }

    /// Pick the highest-precedence recognized role from a claim list
    pub fn from_claims(roles: &[String]) -> Option<UserRole> {
        UserRole::PRECEDENCE
            .into_iter()
            .find(|role| roles.iter().any(|r| r.parse::<UserRole>().ok() == Some(*role)))
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        UserRole::PRECEDENCE
            .into_iter()
            .find(|role| role.as_idp_role() == s)
            .ok_or_else(|| AppError::Unauthenticated {
                message: format!("unrecognized role {}", s),
            })
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_idp_role())
    }
}

/// Caller identity available to handlers
#[derive(Debug, Clone, Serialize)]
pub struct UserContext {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    /// Home state for state-level users
    pub state: Option<String>,
    pub role: UserRole,
}

impl UserContext {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Read access: non-state roles see every state, state roles only their own
    pub fn can_read_state(&self, state: &str) -> bool {
        has_permissions(self, &UserRole::PRECEDENCE, Some(state))
    }

    /// Write access: only state-level users of the report's state
    pub fn can_write_state(&self, state: &str) -> bool {
        has_permissions(self, &WRITE_ROLES, Some(state))
    }

    pub fn require_read(&self, state: &str) -> Result<()> {
        if self.can_read_state(state) {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }

    pub fn require_write(&self, state: &str) -> Result<()> {
        if self.can_write_state(state) {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }

    pub fn require_admin(&self) -> Result<()> {
        if has_permissions(self, &ADMIN_ROLES, None) {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

/// Roles allowed to edit a report of their own state
pub const WRITE_ROLES: [UserRole; 2] = [UserRole::StateRep, UserRole::StateUser];

/// Roles allowed to archive reports
pub const ADMIN_ROLES: [UserRole; 1] = [UserRole::Admin];

/// Check a caller against an allowed role set, optionally pinned to a state
pub fn has_permissions(user: &UserContext, allowed: &[UserRole], state: Option<&str>) -> bool {
    if !allowed.contains(&user.role) {
        return false;
    }
    match state {
        Some(state) if user.role.is_state_level() => user.state.as_deref() == Some(state),
        _ => true,
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    pub email: String,

    #[serde(default)]
    pub full_name: String,

    /// Home state for state-level users
    #[serde(default)]
    pub state: Option<String>,

    /// Identity-provider role strings
    #[serde(default)]
    pub roles: Vec<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a token for a user
    pub fn generate_token(&self, user: &UserContext) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user.user_id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            state: user.state.clone(),
            roles: vec![user.role.as_idp_role().to_string()],
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }

    /// Decode a token into a caller identity
    pub fn authenticate(&self, token: &str) -> Result<UserContext> {
        let claims = self.validate_token(token)?;
        let role = UserRole::from_claims(&claims.roles).ok_or_else(|| AppError::Unauthenticated {
            message: "token carries no recognized role".to_string(),
        })?;

        Ok(UserContext {
            user_id: claims.sub,
            email: claims.email,
            full_name: claims.full_name,
            state: claims.state.map(|s| s.to_ascii_uppercase()),
            role,
        })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Axum extractor for UserContext
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthenticated {
            message: "Authorization header is not a bearer token".to_string(),
        })?;

        let jwt = Arc::<JwtManager>::from_ref(state);
        let user = jwt.authenticate(token)?;

        tracing::debug!(user_id = %user.user_id, role = %user.role, "Caller authenticated");

        Ok(user)
    }
}
