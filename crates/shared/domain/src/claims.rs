//! Token claim set and the authorization context derived from it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::{User, UserRole};

/// Kind of a signed token. Access and refresh tokens are never interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded token payload.
///
/// Field names are the wire format: custom claims plus the registered
/// `sub`, `iat`, `exp`, `iss`, `aud` and `jti`. A payload naming a role
/// outside [`UserRole`] does not deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    pub sub: String,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub token_type: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub jti: Uuid,
}

impl ClaimSet {
    /// Build a claim set for `subject` valid for `ttl` from `issued_at`.
    pub fn issue(
        subject: &UserContext,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        ttl: Duration,
        issuer: &str,
        audience: &str,
    ) -> Self {
        Self {
            sub: subject.user_id.to_string(),
            user_id: subject.user_id,
            organization_id: subject.organization_id,
            email: subject.email.clone(),
            role: subject.role,
            token_type: kind,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            jti: Uuid::new_v4(),
        }
    }

    pub fn is_access_token(&self) -> bool {
        self.token_type == TokenKind::Access
    }

    pub fn is_refresh_token(&self) -> bool {
        self.token_type == TokenKind::Refresh
    }

    /// True once `now` has reached `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }

    /// Project the identity used by downstream authorization checks.
    pub fn to_user_context(&self) -> UserContext {
        UserContext {
            user_id: self.user_id,
            organization_id: self.organization_id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl UserContext {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// True if the role is at least `required`
    pub fn has_role(&self, required: UserRole) -> bool {
        self.role.can_access(&required)
    }

    /// Tenant scope check: own organization, or any organization for super admins
    pub fn can_access_organization(&self, organization_id: Uuid) -> bool {
        self.role.is_super_admin() || self.organization_id == organization_id
    }
}

impl From<&User> for UserContext {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            organization_id: user.organization_id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: UserRole) -> UserContext {
        UserContext {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            email: "dispatch@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_issue_sets_kind_and_expiry() {
        let now = Utc::now();
        let subject = context(UserRole::Dispatcher);
        let claims = ClaimSet::issue(
            &subject,
            TokenKind::Refresh,
            now,
            Duration::days(7),
            "iss",
            "aud",
        );

        assert!(claims.is_refresh_token());
        assert!(!claims.is_access_token());
        assert_eq!(claims.sub, subject.user_id.to_string());
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
        assert!(!claims.is_expired_at(now));
        assert!(claims.is_expired_at(now + Duration::days(8)));
        assert_eq!(claims.to_user_context(), subject);
    }

    #[test]
    fn test_wire_field_names() {
        let claims = ClaimSet::issue(
            &context(UserRole::Admin),
            TokenKind::Access,
            Utc::now(),
            Duration::minutes(15),
            "iss",
            "aud",
        );
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["token_type"], "access");
        assert_eq!(json["role"], "admin");
        for field in ["user_id", "organization_id", "email", "iat", "exp", "sub", "iss", "aud"] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_unknown_role_does_not_deserialize() {
        let claims = ClaimSet::issue(
            &context(UserRole::Technician),
            TokenKind::Access,
            Utc::now(),
            Duration::minutes(15),
            "iss",
            "aud",
        );
        let mut json = serde_json::to_value(&claims).unwrap();
        json["role"] = serde_json::Value::from("root");

        assert!(serde_json::from_value::<ClaimSet>(json).is_err());
    }

    #[test]
    fn test_organization_scope() {
        let admin = context(UserRole::Admin);
        let root = context(UserRole::SuperAdmin);
        let other_org = Uuid::new_v4();

        assert!(admin.can_access_organization(admin.organization_id));
        assert!(!admin.can_access_organization(other_org));
        assert!(root.can_access_organization(other_org));
        assert!(admin.has_role(UserRole::Dispatcher));
        assert!(!admin.has_role(UserRole::SuperAdmin));
    }
}
