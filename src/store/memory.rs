/// 인메모리 참조 구현체.
/// 경매마다 독립된 뮤텍스 뒤의 레코드를 두고, 비교-추가와 상태
/// 비교-교환을 그 레코드 잠금 아래에서 수행한다.
// region:    --- Imports
use super::{AppendOutcome, AuctionStore, StoreError};
use crate::auction::model::{Auction, AuctionStatus, AuctionSummary, Bid, NewAuction, NewBid};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

// endregion: --- Imports

// region:    --- Auction Entry

/// 경매 단위 레코드. 입찰은 승인 순서(= 금액 오름차순)로 보관하므로
/// 마지막 원소가 곧 최고 입찰이다.
struct AuctionEntry {
    auction: Auction,
    bids: Vec<Bid>,
}

impl AuctionEntry {
    fn highest(&self) -> Option<&Bid> {
        self.bids.last()
    }
}

// endregion: --- Auction Entry

// region:    --- Memory Store

pub struct MemoryAuctionStore {
    next_auction_id: AtomicI64,
    next_bid_id: AtomicI64,
    auctions: RwLock<HashMap<i64, Arc<Mutex<AuctionEntry>>>>,
}

impl MemoryAuctionStore {
    pub fn new() -> Self {
        Self {
            next_auction_id: AtomicI64::new(1),
            next_bid_id: AtomicI64::new(1),
            auctions: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, auction_id: i64) -> Option<Arc<Mutex<AuctionEntry>>> {
        self.auctions
            .read()
            .expect("auction map poisoned")
            .get(&auction_id)
            .cloned()
    }
}

impl Default for MemoryAuctionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuctionStore for MemoryAuctionStore {
    async fn create_auction(&self, data: NewAuction) -> Result<Auction, StoreError> {
        let auction = Auction {
            id: self.next_auction_id.fetch_add(1, Ordering::Relaxed),
            product_name: data.product_name,
            reserve_price: data.reserve_price,
            status: AuctionStatus::Active,
            created_by: data.created_by,
            created_at: Utc::now(),
        };
        self.auctions.write().expect("auction map poisoned").insert(
            auction.id,
            Arc::new(Mutex::new(AuctionEntry {
                auction: auction.clone(),
                bids: Vec::new(),
            })),
        );
        Ok(auction)
    }

    async fn get_auction(&self, auction_id: i64) -> Result<Option<Auction>, StoreError> {
        Ok(self
            .entry(auction_id)
            .map(|e| e.lock().expect("auction entry poisoned").auction.clone()))
    }

    async fn list_auctions(&self) -> Result<Vec<AuctionSummary>, StoreError> {
        let entries: Vec<_> = self
            .auctions
            .read()
            .expect("auction map poisoned")
            .values()
            .cloned()
            .collect();

        let mut summaries: Vec<AuctionSummary> = entries
            .iter()
            .map(|e| {
                let entry = e.lock().expect("auction entry poisoned");
                AuctionSummary {
                    auction: entry.auction.clone(),
                    highest_bid: entry.highest().cloned(),
                }
            })
            .collect();

        // 최신 생성 순. 생성 시각이 같으면 id 가 큰 쪽이 먼저다.
        summaries.sort_by(|a, b| {
            b.auction
                .created_at
                .cmp(&a.auction.created_at)
                .then(b.auction.id.cmp(&a.auction.id))
        });
        Ok(summaries)
    }

    async fn get_bids(&self, auction_id: i64) -> Result<Vec<Bid>, StoreError> {
        Ok(self
            .entry(auction_id)
            .map(|e| {
                let entry = e.lock().expect("auction entry poisoned");
                // 금액 내림차순 랭킹
                entry.bids.iter().rev().cloned().collect()
            })
            .unwrap_or_default())
    }

    async fn get_highest_bid(&self, auction_id: i64) -> Result<Option<Bid>, StoreError> {
        Ok(self.entry(auction_id).and_then(|e| {
            e.lock()
                .expect("auction entry poisoned")
                .highest()
                .cloned()
        }))
    }

    async fn append_bid(
        &self,
        auction_id: i64,
        bid: NewBid,
        expected_highest: Option<i64>,
    ) -> Result<AppendOutcome, StoreError> {
        let entry = self
            .entry(auction_id)
            .ok_or(StoreError::AuctionMissing(auction_id))?;
        let mut entry = entry.lock().expect("auction entry poisoned");

        if entry.highest().map(|b| b.amount) != expected_highest {
            return Ok(AppendOutcome::Conflict);
        }
        debug_assert!(bid.amount > expected_highest.unwrap_or(0));

        // 승인 시각은 경매 내에서 단조 비감소
        let now = Utc::now();
        let created_at = match entry.highest() {
            Some(last) => last.created_at.max(now),
            None => now,
        };

        let bid = Bid {
            id: self.next_bid_id.fetch_add(1, Ordering::Relaxed),
            auction_id,
            bidder_id: bid.bidder_id,
            amount: bid.amount,
            created_at,
        };
        entry.bids.push(bid.clone());
        Ok(AppendOutcome::Appended(bid))
    }

    async fn set_status(
        &self,
        auction_id: i64,
        expected: AuctionStatus,
        new: AuctionStatus,
    ) -> Result<bool, StoreError> {
        let Some(entry) = self.entry(auction_id) else {
            return Ok(false);
        };
        let mut entry = entry.lock().expect("auction entry poisoned");
        if entry.auction.status != expected {
            return Ok(false);
        }
        entry.auction.status = new;
        Ok(true)
    }
}

// endregion: --- Memory Store

// region:    --- Tests


// endregion: --- Tests
