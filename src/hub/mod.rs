/// 경매별 이벤트 팬아웃 허브.
/// 발행은 발행 시점의 구독자 스냅샷에 대해 이뤄지고, 어떤 관찰자도
/// 발행자나 다른 관찰자를 차단하지 못한다. 전달 순서는 한 경매 안에서
/// 발행 순서(= 승인 순서)와 같다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// endregion: --- Imports

/// 관찰자별 이벤트 큐 길이. 가득 차면 느린 관찰자로 보고 제거한다.
const OBSERVER_QUEUE_CAPACITY: usize = 64;

// region:    --- Subscription

/// 구독 핸들. receiver 로 등록 이후에 발행된 이벤트만 순서대로 받는다.
/// 이력 재전송은 없다 (이력은 저장소 읽기 경로의 몫).
pub struct Subscription {
    pub observer_id: u64,
    pub auction_id: i64,
    pub receiver: mpsc::Receiver<AuctionEvent>,
}

// endregion: --- Subscription

// region:    --- Notification Hub

pub struct NotificationHub {
    next_observer_id: AtomicU64,
    auctions: RwLock<HashMap<i64, HashMap<u64, mpsc::Sender<AuctionEvent>>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            next_observer_id: AtomicU64::new(1),
            auctions: RwLock::new(HashMap::new()),
        }
    }

    /// 구독 등록
    pub fn subscribe(&self, auction_id: i64) -> Subscription {
        let observer_id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(OBSERVER_QUEUE_CAPACITY);
        self.auctions
            .write()
            .expect("observer registry poisoned")
            .entry(auction_id)
            .or_default()
            .insert(observer_id, tx);
        debug!(
            "{:<12} --> 구독 등록: auction={}, observer={}",
            "Hub", auction_id, observer_id
        );
        Subscription {
            observer_id,
            auction_id,
            receiver: rx,
        }
    }

    /// 구독 해제. 이미 해제된 핸들에 대해서도 안전하다 (멱등).
    pub fn unsubscribe(&self, auction_id: i64, observer_id: u64) {
        let mut auctions = self.auctions.write().expect("observer registry poisoned");
        if let Some(observers) = auctions.get_mut(&auction_id) {
            observers.remove(&observer_id);
            if observers.is_empty() {
                auctions.remove(&auction_id);
            }
        }
    }

    /// 해당 경매의 모든 구독자에게 이벤트 전달.
    /// try_send 라 발행자는 절대 대기하지 않는다. 큐가 가득 찼거나
    /// 수신이 끊긴 관찰자는 제거하고 나머지에는 계속 전달한다.
    pub fn publish(&self, auction_id: i64, event: &AuctionEvent) {
        let snapshot: Vec<(u64, mpsc::Sender<AuctionEvent>)> = {
            let auctions = self.auctions.read().expect("observer registry poisoned");
            match auctions.get(&auction_id) {
                Some(observers) => observers
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect(),
                None => return,
            }
        };

        let mut stale = Vec::new();
        for (observer_id, tx) in snapshot {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "{:<12} --> 느린 관찰자 제거: auction={}, observer={}",
                        "Hub", auction_id, observer_id
                    );
                    stale.push(observer_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    stale.push(observer_id);
                }
            }
        }
        for observer_id in stale {
            self.unsubscribe(auction_id, observer_id);
        }
    }

    /// 현재 구독자 수
    pub fn observer_count(&self, auction_id: i64) -> usize {
        self.auctions
            .read()
            .expect("observer registry poisoned")
            .get(&auction_id)
            .map(|observers| observers.len())
            .unwrap_or(0)
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

// endregion: --- Notification Hub

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::model::Bid;
    use chrono::Utc;

    fn new_bid_event(auction_id: i64, amount: i64) -> AuctionEvent {
        AuctionEvent::NewBid(Bid {
            id: amount,
            auction_id,
            bidder_id: 2,
            amount,
            created_at: Utc::now(),
        })
    }

    fn amount_of(event: &AuctionEvent) -> i64 {
        match event {
            AuctionEvent::NewBid(bid) => bid.amount,
            other => panic!("입찰 이벤트가 아님: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe(1);

        for amount in [100, 150, 151] {
            hub.publish(1, &new_bid_event(1, amount));
        }

        for expected in [100, 150, 151] {
            let event = sub.receiver.recv().await.expect("이벤트 수신 실패");
            assert_eq!(amount_of(&event), expected);
        }
    }

    #[tokio::test]
    async fn no_replay_for_late_subscriber() {
        let hub = NotificationHub::new();
        hub.publish(1, &new_bid_event(1, 100));

        let mut sub = hub.subscribe(1);
        hub.publish(1, &new_bid_event(1, 150));

        // 등록 이후에 발행된 이벤트만 도착한다.
        let event = sub.receiver.recv().await.expect("이벤트 수신 실패");
        assert_eq!(amount_of(&event), 150);
        assert!(sub.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let hub = NotificationHub::new();
        let sub = hub.subscribe(1);

        hub.unsubscribe(1, sub.observer_id);
        hub.unsubscribe(1, sub.observer_id);
        hub.unsubscribe(99, sub.observer_id);

        assert_eq!(hub.observer_count(1), 0);
    }

    #[tokio::test]
    async fn slow_observer_is_evicted() {
        let hub = NotificationHub::new();
        let mut slow = hub.subscribe(1);

        // 큐를 넘길 때까지 수신하지 않으면 제거된다.
        for amount in 0..=(OBSERVER_QUEUE_CAPACITY as i64) {
            hub.publish(1, &new_bid_event(1, amount + 1));
        }
        assert_eq!(hub.observer_count(1), 0);

        // 큐에 쌓인 이벤트까지는 수신 가능하고, 이후 채널이 닫힌다.
        let mut received = 0;
        while slow.receiver.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, OBSERVER_QUEUE_CAPACITY);
    }

    #[tokio::test]
    async fn dead_observer_does_not_affect_others() {
        let hub = NotificationHub::new();
        let dead = hub.subscribe(1);
        let mut live = hub.subscribe(1);

        drop(dead.receiver);
        hub.publish(1, &new_bid_event(1, 100));

        let event = live.receiver.recv().await.expect("이벤트 수신 실패");
        assert_eq!(amount_of(&event), 100);
        assert_eq!(hub.observer_count(1), 1);
    }

    #[tokio::test]
    async fn no_cross_auction_delivery() {
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe(1);

        hub.publish(2, &new_bid_event(2, 100));
        assert!(sub.receiver.try_recv().is_err());
    }
}

// endregion: --- Tests
