use crate::auction::model::{Auction, Bid};
use serde::{Deserialize, Serialize};

/// 실시간 채널로 전파되는 경매 이벤트.
/// 구독자는 승인 순서 그대로 수신한다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum AuctionEvent {
    // 입찰 승인 이벤트
    NewBid(Bid),
    // 경매 종료 이벤트
    AuctionClosed(Auction),
}
