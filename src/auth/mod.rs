/// 요청 주체 인증.
/// 토큰 발급은 외부 신원 서비스의 몫이고, 여기서는 공유 비밀키로 서명된
/// Bearer 토큰을 검증해 주체(id, role)만 복원한다. 역할 판정은
/// 미들웨어가 아니라 커맨드 계층에서 한다.
// region:    --- Imports
use crate::auction::model::Role;
use crate::handlers::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// endregion: --- Imports

// region:    --- Claims

/// 토큰에 실리는 커스텀 클레임. subject 는 사용자 id 다.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthClaims {
    pub role: Role,
}

/// 검증을 통과한 요청 주체
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

// endregion: --- Claims

// region:    --- Token Helpers

/// 토큰 발급. 비밀키를 공유하는 신뢰된 호출자(테스트 포함)용 헬퍼다.
pub fn issue_token(key: &HS256Key, user_id: i64, role: Role) -> Result<String, jwt_simple::Error> {
    let claims = Claims::with_custom_claims(AuthClaims { role }, Duration::from_hours(24))
        .with_subject(user_id.to_string());
    key.authenticate(claims)
}

/// Bearer 토큰 검증
pub fn verify_token(key: &HS256Key, token: &str) -> Option<Actor> {
    let claims = key.verify_token::<AuthClaims>(token, None).ok()?;
    let id = claims.subject.as_deref()?.parse::<i64>().ok()?;
    Some(Actor {
        id,
        role: claims.custom.role,
    })
}

// endregion: --- Token Helpers

// region:    --- Extractor

#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("인증 토큰이 없습니다.")]
    MissingToken,
    #[error("인증 토큰이 유효하지 않습니다.")]
    InvalidToken,
}

impl AuthRejection {
    fn code(&self) -> &'static str {
        match self {
            AuthRejection::MissingToken => "MISSING_TOKEN",
            AuthRejection::InvalidToken => "INVALID_TOKEN",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": self.to_string(),
                "code": self.code(),
            })),
        )
            .into_response()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthRejection::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthRejection::MissingToken)?;
        verify_token(&state.auth_key, token).ok_or(AuthRejection::InvalidToken)
    }
}

// endregion: --- Extractor

// region:    --- Tests


// endregion: --- Tests
