/// 요청 처리 오류 분류.
/// 거부(RejectReason)는 호출자가 입력이나 상태를 고쳐 재시도할 수 있고,
/// 저장소 장애만 5xx 로 나간다.
// region:    --- Imports
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- Reject Reason

/// 구체적인 거부 사유. 비교-추가 경합에서 밀린 경우도 호출자 입장에서는
/// "최고가가 아니다" 와 구별되지 않으므로 NotHighestBid 로 합쳐 응답한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("경매를 찾을 수 없습니다.")]
    AuctionNotFound,
    #[error("진행 중인 경매가 아닙니다.")]
    AuctionNotActive,
    #[error("입찰 금액이 올바르지 않습니다.")]
    InvalidAmount,
    #[error("입찰 금액이 최저 입찰가보다 낮습니다.")]
    BelowReserve,
    #[error("입찰 금액이 현재 최고가보다 높아야 합니다.")]
    NotHighestBid,
    #[error("요청 권한이 없습니다.")]
    NotAuthorized,
    #[error("이미 종료된 경매입니다.")]
    AlreadyClosed,
    #[error("최저 입찰가를 충족한 입찰이 없습니다.")]
    ReserveNotMet,
    #[error("상품명은 비어 있을 수 없습니다.")]
    InvalidProductName,
    #[error("최저 입찰가는 0보다 커야 합니다.")]
    InvalidReservePrice,
}

impl RejectReason {
    /// 기계 판독용 코드
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::AuctionNotFound => "AUCTION_NOT_FOUND",
            RejectReason::AuctionNotActive => "AUCTION_NOT_ACTIVE",
            RejectReason::InvalidAmount => "INVALID_AMOUNT",
            RejectReason::BelowReserve => "BELOW_RESERVE",
            RejectReason::NotHighestBid => "NOT_HIGHEST_BID",
            RejectReason::NotAuthorized => "NOT_AUTHORIZED",
            RejectReason::AlreadyClosed => "ALREADY_CLOSED",
            RejectReason::ReserveNotMet => "RESERVE_NOT_MET",
            RejectReason::InvalidProductName => "INVALID_PRODUCT_NAME",
            RejectReason::InvalidReservePrice => "INVALID_RESERVE_PRICE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            RejectReason::AuctionNotFound => StatusCode::NOT_FOUND,
            RejectReason::NotAuthorized => StatusCode::FORBIDDEN,
            RejectReason::AuctionNotActive
            | RejectReason::NotHighestBid
            | RejectReason::AlreadyClosed
            | RejectReason::ReserveNotMet => StatusCode::CONFLICT,
            RejectReason::InvalidAmount
            | RejectReason::BelowReserve
            | RejectReason::InvalidProductName
            | RejectReason::InvalidReservePrice => StatusCode::BAD_REQUEST,
        }
    }
}

// endregion: --- Reject Reason

// region:    --- Service Error

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Reject(#[from] RejectReason),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Reject(reason) => (
                reason.status(),
                Json(serde_json::json!({
                    "error": reason.to_string(),
                    "code": reason.code(),
                })),
            )
                .into_response(),
            ServiceError::Store(e) => {
                error!("{:<12} --> 저장소 오류: {:?}", "Error", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": "내부 오류가 발생했습니다.",
                        "code": "INTERNAL",
                    })),
                )
                    .into_response()
            }
        }
    }
}

// endregion: --- Service Error
