use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Service-account roles a caller may present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Workload-management-system service identity
    Wms,
    /// Ordinary, non-privileged caller
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Wms => "WMS",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WMS" => Ok(Role::Wms),
            "USER" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The set of roles an operation accepts. A caller passes when it holds any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSet(&'static [Role]);

impl RoleSet {
    pub const WMS: RoleSet = RoleSet(&[Role::Wms]);
    pub const USER: RoleSet = RoleSet(&[Role::User]);

    pub const fn new(roles: &'static [Role]) -> Self {
        Self(roles)
    }

    pub fn permits(&self, held: &[Role]) -> bool {
        held.iter().any(|role| self.0.contains(role))
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Role::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Verified caller identity, attached to the request by the authorization gate
#[derive(Clone, Debug)]
pub struct ServiceAccount {
    pub subject: String,
    pub roles: Vec<Role>,
}

impl From<Claims> for ServiceAccount {
    fn from(claims: Claims) -> Self {
        // Roles this service does not know about grant nothing
        let roles = claims
            .roles
            .iter()
            .filter_map(|r| r.parse::<Role>().ok())
            .collect();

        Self {
            subject: claims.sub,
            roles,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("Invalid JWT token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// Verifies bearer credentials. Issuing them is someone else's job.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_config(security: &SecurityConfig) -> Result<Self, TokenError> {
        if security.jwt_secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = security.jwt_leeway_secs;
        match &security.jwt_audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &security.jwt_issuer {
            validation.set_issuer(&[iss]);
        }

        Ok(Self {
            key: DecodingKey::from_secret(security.jwt_secret.as_bytes()),
            validation,
        })
    }

    pub fn verify(&self, token: &str) -> Result<ServiceAccount, TokenError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(ServiceAccount::from(data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";

    fn security() -> SecurityConfig {
        let mut security = AppConfig::development().security;
        security.jwt_secret = SECRET.to_string();
        security
    }

    fn token(roles: &[&str], exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "svc-test".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: now + exp_offset,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    #[test]
    fn role_set_requires_intersection() {
        assert!(RoleSet::WMS.permits(&[Role::Wms]));
        assert!(RoleSet::WMS.permits(&[Role::User, Role::Wms]));
        assert!(!RoleSet::WMS.permits(&[Role::User]));
        assert!(!RoleSet::USER.permits(&[]));
    }

    #[test]
    fn verifier_requires_secret() {
        let security = AppConfig::development().security;
        assert!(matches!(TokenVerifier::from_config(&security), Err(TokenError::MissingSecret)));
    }

    #[test]
    fn verify_keeps_known_roles_only() {
        let verifier = TokenVerifier::from_config(&security()).unwrap();
        let account = verifier.verify(&token(&["WMS", "ADMIN"], 300)).unwrap();
        assert_eq!(account.subject, "svc-test");
        assert_eq!(account.roles, vec![Role::Wms]);
    }

    #[test]
    fn verify_rejects_expired_and_foreign_tokens() {
        let verifier = TokenVerifier::from_config(&security()).unwrap();
        assert!(verifier.verify(&token(&["USER"], -3600)).is_err());

        let now = chrono::Utc::now().timestamp();
        let claims = Claims { sub: "x".into(), roles: vec!["USER".into()], exp: now + 300, iat: now };
        let foreign = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"other")).unwrap();
        assert!(verifier.verify(&foreign).is_err());
    }

    #[test]
    fn role_set_display_lists_names() {
        assert_eq!(RoleSet::new(&[Role::Wms, Role::User]).to_string(), "[WMS, USER]");
    }
}
