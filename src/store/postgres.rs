/// PostgreSQL 구현체.
/// 비교-추가는 경매 행의 조건부 UPDATE(행 잠금) + 입찰 INSERT 를 한
/// 트랜잭션으로 묶어 수행하므로 프로세스가 여럿이어도 직렬화된다.
// region:    --- Imports
use super::{AppendOutcome, AuctionStore, StoreError};
use crate::auction::model::{
    Auction, AuctionStatus, AuctionSummary, Bid, NewAuction, NewBid,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- Queries

mod queries {
    /// 경매 생성
    pub const CREATE_AUCTION: &str = "INSERT INTO auctions (product_name, reserve_price, status, current_amount, created_by, created_at)
        VALUES ($1, $2, 'ACTIVE', 0, $3, $4)
        RETURNING id, product_name, reserve_price, status, created_by, created_at";

    /// 경매 조회
    pub const GET_AUCTION: &str = "SELECT id, product_name, reserve_price, status, created_by, created_at
        FROM auctions WHERE id = $1";

    /// 경매 목록 조회 (최신 생성 순)
    pub const LIST_AUCTIONS: &str = "SELECT id, product_name, reserve_price, status, created_by, created_at
        FROM auctions ORDER BY created_at DESC, id DESC";

    /// 입찰 이력 조회 (금액 내림차순 랭킹)
    pub const GET_BIDS: &str = "SELECT id, auction_id, bidder_id, amount, created_at
        FROM bids WHERE auction_id = $1 ORDER BY amount DESC";

    /// 최고 입찰 조회
    pub const GET_HIGHEST_BID: &str = "SELECT id, auction_id, bidder_id, amount, created_at
        FROM bids WHERE auction_id = $1 ORDER BY amount DESC LIMIT 1";

    /// 비교-추가의 비교 단계. 기대 최고가가 그대로이고 경매가 진행 중일
    /// 때만 경매 행을 갱신하며, 그 행 잠금이 같은 경매의 경쟁 쓰기를
    /// 직렬화한다.
    pub const COMPARE_AND_SET_AMOUNT: &str = "UPDATE auctions SET current_amount = $2
        WHERE id = $1 AND current_amount = $3 AND status = 'ACTIVE' RETURNING id";

    /// 입찰 추가
    pub const INSERT_BID: &str = "INSERT INTO bids (auction_id, bidder_id, amount, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, auction_id, bidder_id, amount, created_at";

    /// 상태 비교-교환
    pub const COMPARE_AND_SET_STATUS: &str = "UPDATE auctions SET status = $3
        WHERE id = $1 AND status = $2 RETURNING id";

    /// 경매 존재 확인
    pub const AUCTION_EXISTS: &str = "SELECT id FROM auctions WHERE id = $1";
}

// endregion: --- Queries

// region:    --- Postgres Store

pub struct PostgresAuctionStore {
    pool: Arc<PgPool>,
}

impl PostgresAuctionStore {
    /// 풀 생성
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// 스키마 초기화
    pub async fn initialize_database(&self) -> Result<(), StoreError> {
        let schema_sql = include_str!("../sql/01-create-schema.sql");
        self.execute_multi_query(schema_sql).await?;
        info!("{:<12} --> 스키마 초기화 완료", "PgStore");
        Ok(())
    }

    /// 여러 쿼리 실행
    async fn execute_multi_query(&self, sql: &str) -> Result<(), StoreError> {
        for query in sql.split(';') {
            let query = query.trim();
            if !query.is_empty() {
                sqlx::query(query).execute(&*self.pool).await?;
            }
        }
        Ok(())
    }

    fn auction_from_row(row: &PgRow) -> Result<Auction, StoreError> {
        let status: String = row.get("status");
        let status = status.parse::<AuctionStatus>().map_err(StoreError::Corrupt)?;
        Ok(Auction {
            id: row.get("id"),
            product_name: row.get("product_name"),
            reserve_price: row.get("reserve_price"),
            status,
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl AuctionStore for PostgresAuctionStore {
    async fn create_auction(&self, data: NewAuction) -> Result<Auction, StoreError> {
        let row = sqlx::query(queries::CREATE_AUCTION)
            .bind(&data.product_name)
            .bind(data.reserve_price)
            .bind(data.created_by)
            .bind(Utc::now())
            .fetch_one(&*self.pool)
            .await?;
        Self::auction_from_row(&row)
    }

    async fn get_auction(&self, auction_id: i64) -> Result<Option<Auction>, StoreError> {
        let row = sqlx::query(queries::GET_AUCTION)
            .bind(auction_id)
            .fetch_optional(&*self.pool)
            .await?;
        row.as_ref().map(Self::auction_from_row).transpose()
    }

    async fn list_auctions(&self) -> Result<Vec<AuctionSummary>, StoreError> {
        let rows = sqlx::query(queries::LIST_AUCTIONS)
            .fetch_all(&*self.pool)
            .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let auction = Self::auction_from_row(row)?;
            let highest_bid = self.get_highest_bid(auction.id).await?;
            summaries.push(AuctionSummary {
                auction,
                highest_bid,
            });
        }
        Ok(summaries)
    }

    async fn get_bids(&self, auction_id: i64) -> Result<Vec<Bid>, StoreError> {
        Ok(sqlx::query_as::<_, Bid>(queries::GET_BIDS)
            .bind(auction_id)
            .fetch_all(&*self.pool)
            .await?)
    }

    async fn get_highest_bid(&self, auction_id: i64) -> Result<Option<Bid>, StoreError> {
        Ok(sqlx::query_as::<_, Bid>(queries::GET_HIGHEST_BID)
            .bind(auction_id)
            .fetch_optional(&*self.pool)
            .await?)
    }

    async fn append_bid(
        &self,
        auction_id: i64,
        bid: NewBid,
        expected_highest: Option<i64>,
    ) -> Result<AppendOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(queries::COMPARE_AND_SET_AMOUNT)
            .bind(auction_id)
            .bind(bid.amount)
            .bind(expected_highest.unwrap_or(0))
            .fetch_optional(&mut *tx)
            .await?;

        if updated.is_none() {
            tx.rollback().await?;
            // 없는 경매와 비교 실패를 구분한다.
            let exists = sqlx::query(queries::AUCTION_EXISTS)
                .bind(auction_id)
                .fetch_optional(&*self.pool)
                .await?;
            return if exists.is_some() {
                Ok(AppendOutcome::Conflict)
            } else {
                Err(StoreError::AuctionMissing(auction_id))
            };
        }

        let bid = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
            .bind(auction_id)
            .bind(bid.bidder_id)
            .bind(bid.amount)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(AppendOutcome::Appended(bid))
    }

    async fn set_status(
        &self,
        auction_id: i64,
        expected: AuctionStatus,
        new: AuctionStatus,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(queries::COMPARE_AND_SET_STATUS)
            .bind(auction_id)
            .bind(expected.as_str())
            .bind(new.as_str())
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.is_some())
    }
}

// endregion: --- Postgres Store
