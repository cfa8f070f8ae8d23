// region:    --- Imports
use jwt_simple::prelude::HS256Key;
use live_auction_service::handlers::{self, AppState};
use live_auction_service::hub::NotificationHub;
use live_auction_service::store::memory::MemoryAuctionStore;
use live_auction_service::store::postgres::PostgresAuctionStore;
use live_auction_service::store::{AuctionLocks, AuctionStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Main

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 저장소 선택: DATABASE_URL 이 있으면 PostgreSQL, 없으면 인메모리 참조 구현
    let store: Arc<dyn AuctionStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let store = PostgresAuctionStore::connect(&database_url).await?;
            if let Err(e) = store.initialize_database().await {
                error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
                return Err(e.into());
            }
            info!("{:<12} --> PostgreSQL 저장소 초기화 성공", "Main");
            Arc::new(store)
        }
        Err(_) => {
            info!("{:<12} --> 인메모리 저장소 사용", "Main");
            Arc::new(MemoryAuctionStore::new())
        }
    };

    // 토큰 검증용 공유 비밀키 (외부 신원 서비스와 공유)
    let auth_secret =
        std::env::var("AUTH_SECRET").unwrap_or_else(|_| "your-secret-key".to_string());

    let state = AppState {
        store,
        hub: Arc::new(NotificationHub::new()),
        locks: Arc::new(AuctionLocks::new()),
        auth_key: Arc::new(HS256Key::from_bytes(auth_secret.as_bytes())),
    };

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = handlers::routes(state).layer(cors);

    // 리스너 생성
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}

// endregion: --- Main
