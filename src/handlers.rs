// region:    --- Imports
use crate::auction::commands::{
    handle_close_auction, handle_create_auction, CreateAuctionCommand,
};
use crate::auction::model::AuctionDetail;
use crate::auth::Actor;
use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
use crate::error::{RejectReason, ServiceError};
use crate::hub::{NotificationHub, Subscription};
use crate::store::{AuctionLocks, AuctionStore};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use jwt_simple::prelude::HS256Key;
use std::sync::Arc;
use tracing::{debug, info};

// endregion: --- Imports

// region:    --- App State

/// 핸들러가 공유하는 상태
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuctionStore>,
    pub hub: Arc<NotificationHub>,
    pub locks: Arc<AuctionLocks>,
    pub auth_key: Arc<HS256Key>,
}

/// 라우터 구성
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/auctions", post(handle_create).get(handle_list))
        .route("/auctions/:id", get(handle_detail))
        .route("/auctions/:id/bid", post(handle_bid))
        .route("/auctions/:id/close", post(handle_close))
        .route("/auctions/:id/subscribe", get(handle_subscribe))
        .with_state(state)
}

// endregion: --- App State

// region:    --- Command Handlers

/// 경매 생성 요청 처리 (ADMIN)
async fn handle_create(
    State(state): State<AppState>,
    actor: Actor,
    Json(cmd): Json<CreateAuctionCommand>,
) -> Result<impl IntoResponse, ServiceError> {
    info!("{:<12} --> 경매 생성 요청: {:?}", "Handler", cmd);
    let auction = handle_create_auction(actor, cmd, &*state.store).await?;
    Ok(Json(auction))
}

/// 입찰 요청 처리 (USER)
async fn handle_bid(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
    actor: Actor,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<impl IntoResponse, ServiceError> {
    info!(
        "{:<12} --> 입찰 요청: auction={}, {:?}",
        "Handler", auction_id, cmd
    );
    let bid = handle_place_bid(
        auction_id,
        actor,
        cmd,
        &*state.store,
        &state.hub,
        &state.locks,
    )
    .await?;
    Ok(Json(bid))
}

/// 경매 종료 요청 처리 (ADMIN, 생성자)
async fn handle_close(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
    actor: Actor,
) -> Result<impl IntoResponse, ServiceError> {
    info!("{:<12} --> 경매 종료 요청: auction={}", "Handler", auction_id);
    let auction =
        handle_close_auction(auction_id, actor, &*state.store, &state.hub, &state.locks).await?;
    Ok(Json(auction))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 경매 목록 조회 (현재 최고 입찰 포함)
async fn handle_list(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    info!("{:<12} --> 경매 목록 조회", "Handler");
    let auctions = state.store.list_auctions().await?;
    Ok(Json(auctions))
}

/// 경매 상세 조회 (입찰 이력은 금액 내림차순)
async fn handle_detail(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    info!("{:<12} --> 경매 상세 조회 id: {}", "Handler", auction_id);
    let auction = state
        .store
        .get_auction(auction_id)
        .await?
        .ok_or(RejectReason::AuctionNotFound)?;
    let bids = state.store.get_bids(auction_id).await?;
    Ok(Json(AuctionDetail { auction, bids }))
}

// endregion: --- Query Handlers

// region:    --- Subscription Handler

/// 실시간 구독 채널 (WebSocket).
/// 연결 시점 이후 승인된 이벤트만 승인 순서 그대로 전달한다.
async fn handle_subscribe(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_subscription(state, auction_id, socket))
}

/// 구독 전달 루프. 소켓이 끊기면 구독을 해제한다.
async fn run_subscription(state: AppState, auction_id: i64, socket: WebSocket) {
    let Subscription {
        observer_id,
        receiver: mut events,
        ..
    } = state.hub.subscribe(auction_id);
    info!(
        "{:<12} --> 구독 시작: auction={}, observer={}",
        "Subscribe", auction_id, observer_id
    );

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            event = events.recv() => {
                // 허브가 느린 관찰자로 판단해 제거하면 채널이 닫힌다.
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        debug!("{:<12} --> 이벤트 직렬화 실패: {:?}", "Subscribe", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            msg = stream.next() => {
                // 구독 채널은 수신 전용. 클라이언트 메시지는 무시하고 종료만 처리한다.
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unsubscribe(auction_id, observer_id);
    info!(
        "{:<12} --> 구독 종료: auction={}, observer={}",
        "Subscribe", auction_id, observer_id
    );
}

// endregion: --- Subscription Handler
