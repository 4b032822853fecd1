use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::decode_token;
use crate::errors::AppError;
use crate::models::user::Role;
use crate::state::AppState;

/// The authenticated caller, decoded from `Authorization: Bearer <jwt>`.
///
/// The role comes from the token and stays fixed until it expires. Employee
/// self-service writes re-read the account through
/// `accounts::require_active_employee`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    /// Fails with `Forbidden` unless the caller holds one of `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            warn!(
                user_id = %self.user_id,
                role = self.role.as_str(),
                "Role not permitted for this operation"
            );
            Err(AppError::Forbidden)
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Hr | Role::Admin)
    }
}

pub const STAFF: &[Role] = &[Role::Hr, Role::Admin];

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let claims = decode_token(token, &state.auth).map_err(|e| {
            warn!("Rejected bearer token: {e}");
            AppError::Unauthorized
        })?;
        Ok(CurrentUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_require_roles() {
        let hr = CurrentUser {
            user_id: Uuid::new_v4(),
            email: "hr@example.com".into(),
            role: Role::Hr,
        };
        assert!(hr.require(STAFF).is_ok());
        assert!(hr.require(&[Role::Employee]).is_err());
        assert!(hr.is_staff());
    }
}
