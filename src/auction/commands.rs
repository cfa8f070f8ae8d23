/// 경매 수명주기 커맨드 처리.
/// 1. 경매 생성
/// 2. 경매 종료 (최저 입찰가 충족 시에만)
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::auction::model::{Auction, AuctionStatus, NewAuction, Role};
use crate::auth::Actor;
use crate::error::{RejectReason, ServiceError};
use crate::hub::NotificationHub;
use crate::store::{AuctionLocks, AuctionStore};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// 경매 생성 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuctionCommand {
    pub product_name: String,
    pub reserve_price: i64,
}

/// 경매 생성. ADMIN 역할만 가능하며 상태는 ACTIVE 로 시작한다.
pub async fn handle_create_auction(
    actor: Actor,
    cmd: CreateAuctionCommand,
    store: &dyn AuctionStore,
) -> Result<Auction, ServiceError> {
    info!(
        "{:<12} --> 경매 생성 요청: admin={}, product={:?}",
        "Lifecycle", actor.id, cmd.product_name
    );

    if actor.role != Role::Admin {
        return Err(RejectReason::NotAuthorized.into());
    }
    if cmd.product_name.trim().is_empty() {
        return Err(RejectReason::InvalidProductName.into());
    }
    if cmd.reserve_price <= 0 {
        return Err(RejectReason::InvalidReservePrice.into());
    }

    let auction = store
        .create_auction(NewAuction {
            product_name: cmd.product_name.trim().to_string(),
            reserve_price: cmd.reserve_price,
            created_by: actor.id,
        })
        .await?;
    info!("{:<12} --> 경매 생성 완료: id={}", "Lifecycle", auction.id);
    Ok(auction)
}

/// 경매 종료.
/// 생성자만 종료할 수 있고, 최저 입찰가를 충족한 입찰이 있어야 한다.
/// 같은 경매의 입찰 승인과 동일한 배타 구간에서 ACTIVE -> CLOSED 로
/// 전이하므로, 종료가 보인 뒤에 입찰이 끼어드는 일은 없다.
pub async fn handle_close_auction(
    auction_id: i64,
    actor: Actor,
    store: &dyn AuctionStore,
    hub: &NotificationHub,
    locks: &AuctionLocks,
) -> Result<Auction, ServiceError> {
    info!(
        "{:<12} --> 경매 종료 요청: auction={}, requester={}",
        "Lifecycle", auction_id, actor.id
    );

    let _guard = locks.acquire(auction_id).await;

    let auction = store
        .get_auction(auction_id)
        .await?
        .ok_or(RejectReason::AuctionNotFound)?;

    // 종료 권한은 생성자에게만 있다 (정책 지점: 모든 ADMIN 으로 넓힐 수 있음).
    if actor.role != Role::Admin || actor.id != auction.created_by {
        return Err(RejectReason::NotAuthorized.into());
    }
    if auction.status == AuctionStatus::Closed {
        return Err(RejectReason::AlreadyClosed.into());
    }

    let highest = store.get_highest_bid(auction_id).await?;
    if highest.map(|b| b.amount).unwrap_or(0) < auction.reserve_price {
        return Err(RejectReason::ReserveNotMet.into());
    }

    // 단방향 전이. 비교-교환이 어긋났다면 이미 종료된 것이다.
    if !store
        .set_status(auction_id, AuctionStatus::Active, AuctionStatus::Closed)
        .await?
    {
        return Err(RejectReason::AlreadyClosed.into());
    }

    let closed = Auction {
        status: AuctionStatus::Closed,
        ..auction
    };
    hub.publish(auction_id, &AuctionEvent::AuctionClosed(closed.clone()));
    info!("{:<12} --> 경매 종료 완료: auction={}", "Lifecycle", auction_id);
    Ok(closed)
}

// endregion: --- Commands

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::model::NewBid;
    use crate::store::memory::MemoryAuctionStore;
    use std::sync::Arc;

    fn admin(id: i64) -> Actor {
        Actor {
            id,
            role: Role::Admin,
        }
    }

    struct Ctx {
        store: Arc<MemoryAuctionStore>,
        hub: Arc<NotificationHub>,
        locks: Arc<AuctionLocks>,
    }

    fn ctx() -> Ctx {
        Ctx {
            store: Arc::new(MemoryAuctionStore::new()),
            hub: Arc::new(NotificationHub::new()),
            locks: Arc::new(AuctionLocks::new()),
        }
    }

    fn create_cmd(reserve_price: i64) -> CreateAuctionCommand {
        CreateAuctionCommand {
            product_name: "테스트 상품".to_string(),
            reserve_price,
        }
    }

    fn rejected_with(result: Result<Auction, ServiceError>, reason: RejectReason) -> bool {
        matches!(result, Err(ServiceError::Reject(r)) if r == reason)
    }

    async fn seed_bid(ctx: &Ctx, auction_id: i64, amount: i64, expected: Option<i64>) {
        ctx.store
            .append_bid(
                auction_id,
                NewBid {
                    bidder_id: 2,
                    amount,
                },
                expected,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_validates_input_and_role() {
        let ctx = ctx();

        let user = Actor {
            id: 2,
            role: Role::User,
        };
        assert!(rejected_with(
            handle_create_auction(user, create_cmd(100), &*ctx.store).await,
            RejectReason::NotAuthorized
        ));
        assert!(rejected_with(
            handle_create_auction(
                admin(1),
                CreateAuctionCommand {
                    product_name: "   ".to_string(),
                    reserve_price: 100,
                },
                &*ctx.store
            )
            .await,
            RejectReason::InvalidProductName
        ));
        assert!(rejected_with(
            handle_create_auction(admin(1), create_cmd(0), &*ctx.store).await,
            RejectReason::InvalidReservePrice
        ));

        let auction = handle_create_auction(admin(1), create_cmd(100), &*ctx.store)
            .await
            .unwrap();
        assert_eq!(auction.status, AuctionStatus::Active);
        assert_eq!(auction.created_by, 1);
    }

    #[tokio::test]
    async fn close_requires_creator() {
        let ctx = ctx();
        let auction = handle_create_auction(admin(1), create_cmd(100), &*ctx.store)
            .await
            .unwrap();
        seed_bid(&ctx, auction.id, 120, None).await;

        // 다른 ADMIN 도, USER 도 종료할 수 없다.
        assert!(rejected_with(
            handle_close_auction(auction.id, admin(9), &*ctx.store, &ctx.hub, &ctx.locks).await,
            RejectReason::NotAuthorized
        ));
        let user = Actor {
            id: 1,
            role: Role::User,
        };
        assert!(rejected_with(
            handle_close_auction(auction.id, user, &*ctx.store, &ctx.hub, &ctx.locks).await,
            RejectReason::NotAuthorized
        ));

        let closed = handle_close_auction(auction.id, admin(1), &*ctx.store, &ctx.hub, &ctx.locks)
            .await
            .unwrap();
        assert_eq!(closed.status, AuctionStatus::Closed);
    }

    #[tokio::test]
    async fn close_is_gated_on_reserve() {
        let ctx = ctx();
        let auction = handle_create_auction(admin(1), create_cmd(100), &*ctx.store)
            .await
            .unwrap();

        // 입찰이 없으면 종료 불가, 상태는 그대로 ACTIVE 다.
        assert!(rejected_with(
            handle_close_auction(auction.id, admin(1), &*ctx.store, &ctx.hub, &ctx.locks).await,
            RejectReason::ReserveNotMet
        ));
        let current = ctx.store.get_auction(auction.id).await.unwrap().unwrap();
        assert_eq!(current.status, AuctionStatus::Active);

        seed_bid(&ctx, auction.id, 100, None).await;
        let closed = handle_close_auction(auction.id, admin(1), &*ctx.store, &ctx.hub, &ctx.locks)
            .await
            .unwrap();
        assert_eq!(closed.status, AuctionStatus::Closed);
    }

    #[tokio::test]
    async fn close_twice_reports_already_closed() {
        let ctx = ctx();
        let auction = handle_create_auction(admin(1), create_cmd(100), &*ctx.store)
            .await
            .unwrap();
        seed_bid(&ctx, auction.id, 150, None).await;

        handle_close_auction(auction.id, admin(1), &*ctx.store, &ctx.hub, &ctx.locks)
            .await
            .unwrap();
        assert!(rejected_with(
            handle_close_auction(auction.id, admin(1), &*ctx.store, &ctx.hub, &ctx.locks).await,
            RejectReason::AlreadyClosed
        ));
    }

    #[tokio::test]
    async fn close_publishes_lifecycle_event() {
        let ctx = ctx();
        let auction = handle_create_auction(admin(1), create_cmd(100), &*ctx.store)
            .await
            .unwrap();
        seed_bid(&ctx, auction.id, 150, None).await;

        let mut sub = ctx.hub.subscribe(auction.id);
        handle_close_auction(auction.id, admin(1), &*ctx.store, &ctx.hub, &ctx.locks)
            .await
            .unwrap();

        let event = sub.receiver.try_recv().expect("이벤트 수신 실패");
        match event {
            AuctionEvent::AuctionClosed(closed) => {
                assert_eq!(closed.id, auction.id);
                assert_eq!(closed.status, AuctionStatus::Closed);
            }
            other => panic!("종료 이벤트가 아님: {other:?}"),
        }
    }
}

// endregion: --- Tests
