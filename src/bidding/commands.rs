/// 입찰 승인 커맨드 처리.
/// 최고가 읽기와 비교-추가를 경매 단위 배타 구간 안에서 한 단위로
/// 수행하고, 승인된 입찰은 같은 구간 안에서 허브에 발행한다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::auction::model::{AuctionStatus, Bid, NewBid, Role};
use crate::auth::Actor;
use crate::error::{RejectReason, ServiceError};
use crate::hub::NotificationHub;
use crate::store::{AppendOutcome, AuctionLocks, AuctionStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidCommand {
    pub amount: i64,
}

/// 입찰 승인.
/// 전제조건은 순서대로 검사되고 각각 고유한 거부 사유로 응답한다.
/// 실패하면 어떤 상태도 바뀌지 않으며, 재시도는 호출자 몫이다.
pub async fn handle_place_bid(
    auction_id: i64,
    actor: Actor,
    cmd: PlaceBidCommand,
    store: &dyn AuctionStore,
    hub: &NotificationHub,
    locks: &AuctionLocks,
) -> Result<Bid, ServiceError> {
    info!(
        "{:<12} --> 입찰 요청: auction={}, bidder={}, amount={}",
        "Bid", auction_id, actor.id, cmd.amount
    );

    // 입찰은 USER 역할만 가능
    if actor.role != Role::User {
        return Err(RejectReason::NotAuthorized.into());
    }

    // 같은 경매의 승인/종료와 직렬화. 다른 경매는 차단하지 않는다.
    let _guard = locks.acquire(auction_id).await;

    let auction = store
        .get_auction(auction_id)
        .await?
        .ok_or(RejectReason::AuctionNotFound)?;

    if auction.status != AuctionStatus::Active {
        return Err(RejectReason::AuctionNotActive.into());
    }
    if cmd.amount <= 0 {
        return Err(RejectReason::InvalidAmount.into());
    }
    if cmd.amount < auction.reserve_price {
        return Err(RejectReason::BelowReserve.into());
    }

    // 입찰이 없으면 최저 입찰가 검사만 적용된다.
    let highest = store.get_highest_bid(auction_id).await?;
    if let Some(h) = &highest {
        // 동일 금액도 거부한다 (엄격 증가).
        if cmd.amount <= h.amount {
            return Err(RejectReason::NotHighestBid.into());
        }
    }

    let outcome = store
        .append_bid(
            auction_id,
            NewBid {
                bidder_id: actor.id,
                amount: cmd.amount,
            },
            highest.map(|b| b.amount),
        )
        .await?;

    match outcome {
        AppendOutcome::Appended(bid) => {
            // 배타 구간 안에서 발행해야 승인 순서와 전달 순서가 일치한다.
            hub.publish(auction_id, &AuctionEvent::NewBid(bid.clone()));
            info!(
                "{:<12} --> 입찰 승인: auction={}, bid={}, amount={}",
                "Bid", auction_id, bid.id, bid.amount
            );
            Ok(bid)
        }
        AppendOutcome::Conflict => {
            // 비교-추가 경합에서 밀린 경우. 호출자에게는 최고가 미달과
            // 동일하게 응답한다.
            warn!(
                "{:<12} --> 비교-추가 경합 탈락: auction={}, bidder={}",
                "Bid", auction_id, actor.id
            );
            Err(RejectReason::NotHighestBid.into())
        }
    }
}

// endregion: --- Commands

// region:    --- Tests


// endregion: --- Tests
