use crate::domain::value_objects::PatronId;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::error::ApiError;

/// 上流のセッションサービスが付与する利用者IDのヘッダー
pub const PATRON_ID_HEADER: &str = "x-patron-id";
/// 上流のセッションサービスが付与するロールのヘッダー
pub const PATRON_ROLE_HEADER: &str = "x-patron-role";

/// 利用者のロール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// 認証済みの呼び出し元
///
/// 認証そのものは上流で済んでおり、ここではヘッダーをそのまま信頼する。
/// 権限の判定はゲートウェイで1回だけ行い、エンジンには利用者IDだけを渡す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claims {
    pub patron_id: PatronId,
    pub role: Role,
}

impl Claims {
    /// 管理者でなければ403
    pub fn require_admin(&self) -> Result<(), ApiError> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Member => Err(ApiError::Forbidden),
        }
    }

    /// 本人または管理者でなければ403
    pub fn require_self_or_admin(&self, patron_id: PatronId) -> Result<(), ApiError> {
        if self.role == Role::Admin || self.patron_id == patron_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let patron_id = parts
            .headers
            .get(PATRON_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(PatronId::from_uuid)
            .ok_or(ApiError::Unauthenticated)?;

        let role = match parts.headers.get(PATRON_ROLE_HEADER) {
            None => Role::Member,
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|value| value.trim().parse().ok())
                .ok_or(ApiError::Unauthenticated)?,
        };

        Ok(Claims { patron_id, role })
    }
}
