/// 경매 저장소 추상화.
/// 상위 계층이 의존하는 동시성 임계 연산은 비교-추가(append_bid)와
/// 상태 비교-교환(set_status) 둘뿐이고, 나머지는 단순 읽기/쓰기다.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, AuctionSummary, Bid, NewAuction, NewBid};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

// endregion: --- Imports

pub mod memory;
pub mod postgres;

// region:    --- Store Error

/// 저장소 장애. 거부 사유와 달리 호출자가 복구할 수 없다.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("존재하지 않는 경매입니다: {0}")]
    AuctionMissing(i64),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("손상된 레코드: {0}")]
    Corrupt(String),
}

// endregion: --- Store Error

// region:    --- Append Outcome

/// 비교-추가 결과
#[derive(Debug)]
pub enum AppendOutcome {
    /// 기대한 최고가가 그대로여서 입찰이 추가됨
    Appended(Bid),
    /// 기대한 최고가가 이미 달라져 추가 거부
    Conflict,
}

// endregion: --- Append Outcome

// region:    --- Auction Store Trait

/// 경매 저장소 트레이트
#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// 경매 생성 (상태는 ACTIVE 로 시작)
    async fn create_auction(&self, data: NewAuction) -> Result<Auction, StoreError>;

    /// 경매 조회
    async fn get_auction(&self, auction_id: i64) -> Result<Option<Auction>, StoreError>;

    /// 경매 목록 조회 (최신 생성 순, 현재 최고 입찰 포함)
    async fn list_auctions(&self) -> Result<Vec<AuctionSummary>, StoreError>;

    /// 입찰 이력 조회 (금액 내림차순 랭킹). 없는 경매는 빈 목록.
    async fn get_bids(&self, auction_id: i64) -> Result<Vec<Bid>, StoreError>;

    /// 최고 입찰 조회. 입찰이 없거나 경매가 없으면 None.
    async fn get_highest_bid(&self, auction_id: i64) -> Result<Option<Bid>, StoreError>;

    /// 비교-추가: 현재 최고가가 expected_highest 와 일치할 때만 입찰을
    /// 원자적으로 추가한다. 일치하지 않으면 부수효과 없이 Conflict.
    async fn append_bid(
        &self,
        auction_id: i64,
        bid: NewBid,
        expected_highest: Option<i64>,
    ) -> Result<AppendOutcome, StoreError>;

    /// 상태 비교-교환: 현재 상태가 expected 일 때만 new 로 전이한다.
    async fn set_status(
        &self,
        auction_id: i64,
        expected: AuctionStatus,
        new: AuctionStatus,
    ) -> Result<bool, StoreError>;
}

// endregion: --- Auction Store Trait

// region:    --- Auction Locks

/// 경매별 배타 구간 (auctionId 기준 아레나).
/// 한 경매의 승인/종료는 여기서 직렬화되고, 경매가 다르면 서로 차단하지 않는다.
pub struct AuctionLocks {
    locks: StdMutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl AuctionLocks {
    pub fn new() -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// 해당 경매의 배타 구간 획득. 대기는 같은 경매의 진행 중인
    /// 승인/종료 한 건 길이로 한정된다.
    pub async fn acquire(&self, auction_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("auction lock table poisoned");
            Arc::clone(locks.entry(auction_id).or_default())
        };
        lock.lock_owned().await
    }
}

impl Default for AuctionLocks {
    fn default() -> Self {
        Self::new()
    }
}

// endregion: --- Auction Locks
