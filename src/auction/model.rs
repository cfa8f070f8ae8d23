use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// region:    --- Auction

/// 경매 상태. ACTIVE -> CLOSED 단방향이며 되돌릴 수 없다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuctionStatus {
    Active,
    Closed,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Active => "ACTIVE",
            AuctionStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for AuctionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AuctionStatus::Active),
            "CLOSED" => Ok(AuctionStatus::Closed),
            other => Err(format!("알 수 없는 경매 상태: {other}")),
        }
    }
}

// 경매 모델. 금액은 최소 화폐 단위의 정수로 다룬다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: i64,
    pub product_name: String,
    pub reserve_price: i64,
    pub status: AuctionStatus,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// 경매 생성 입력
#[derive(Debug, Clone)]
pub struct NewAuction {
    pub product_name: String,
    pub reserve_price: i64,
    pub created_by: i64,
}

// endregion: --- Auction

// region:    --- Bid

// 입찰 모델. 승인 시각은 경매 내에서 단조 비감소한다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// 입찰 승인 입력
#[derive(Debug, Clone)]
pub struct NewBid {
    pub bidder_id: i64,
    pub amount: i64,
}

// endregion: --- Bid

// region:    --- User Role

/// 사용자 역할. 계정 생성 시 고정되며 한 신원은 하나의 역할만 가진다.
/// ADMIN 은 경매를 생성/종료하고, USER 는 입찰한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

// endregion: --- User Role

// region:    --- Read Views

/// 경매 목록 항목. 현재 최고 입찰을 함께 내려준다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSummary {
    #[serde(flatten)]
    pub auction: Auction,
    pub highest_bid: Option<Bid>,
}

/// 경매 상세. 입찰 이력은 금액 내림차순 랭킹이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDetail {
    #[serde(flatten)]
    pub auction: Auction,
    pub bids: Vec<Bid>,
}

// endregion: --- Read Views
