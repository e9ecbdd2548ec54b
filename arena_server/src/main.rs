use std::sync::Arc;

use actix::{Actor, System};
use actix_web::{web, App, HttpServer};
use arena_server::{
    arena::ArenaService,
    circuit_breaker::CircuitBreaker,
    env::{Settings, StorageBackend, StorageSettings},
    ledger::{
        model::User,
        redis_store::RedisUserRepository,
        repository::{MemoryUserRepository, UserRepository},
        LedgerGateway,
    },
    routes,
    settlement::{BattleResolver, DuelService, UniformDraw},
    AppState, LoggerManager,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn seed_user(seed: &arena_server::env::SeedUser) -> User {
    let mut user = User::new(&seed.id, &seed.nickname, seed.balance);
    user.banned = seed.banned;
    user.avatars = seed.avatars.clone();
    user
}

async fn build_repository(storage: &StorageSettings) -> std::io::Result<Arc<dyn UserRepository>> {
    match storage.backend {
        StorageBackend::Memory => {
            let repo = MemoryUserRepository::with_users(storage.seed_users.iter().map(seed_user));
            info!(
                "Using in-memory user repository with {} seeded users",
                storage.seed_users.len()
            );
            Ok(Arc::new(repo))
        }
        StorageBackend::Redis => {
            let client = redis::Client::open(storage.redis_url.as_str())
                .map_err(|e| std::io::Error::other(format!("invalid redis url: {}", e)))?;
            let conn = redis::aio::ConnectionManager::new(client)
                .await
                .map_err(|e| std::io::Error::other(format!("redis connection failed: {}", e)))?;
            info!("Redis connection established: {}", storage.redis_url);

            let circuit = Arc::new(CircuitBreaker::new(
                storage.circuit_failure_threshold,
                storage.circuit_cooldown_seconds,
            ));
            let repo = RedisUserRepository::new(conn, storage.audit_log_cap, circuit);
            let mut created = 0;
            for seed in &storage.seed_users {
                match repo.seed(&seed_user(seed)).await {
                    Ok(true) => created += 1,
                    Ok(false) => {}
                    Err(e) => warn!("Failed to seed user {}: {}", seed.id, e),
                }
            }
            info!(
                "Seeded {} of {} configured users into redis",
                created,
                storage.seed_users.len()
            );
            Ok(Arc::new(repo))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 1. 환경변수 로드
    dotenv::dotenv().ok();

    // 2. 설정 파일 로드
    let settings = Settings::new()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {}", e)))?;

    // 3. 로거 초기화
    let logger_manager = Arc::new(LoggerManager::setup(&settings));

    // 4. 저장소와 정산 컴포넌트
    let repo = build_repository(&settings.storage).await?;
    let ledger = LedgerGateway::new(repo, settings.ledger.clone());
    let resolver = BattleResolver::new(ledger.clone(), Arc::new(UniformDraw));
    let duel = DuelService::new(ledger.clone());

    // 5. 전역 Shutdown Token 과 ArenaService
    let shutdown_token = CancellationToken::new();
    let arena_addr = ArenaService::new(resolver, settings.arena.clone())
        .with_shutdown(shutdown_token.clone())
        .start();
    info!("ArenaService actor started");

    // 6. Metrics
    let metrics_registry = prometheus::Registry::new();
    arena_metrics::register_custom_metrics(&metrics_registry)
        .map_err(|e| std::io::Error::other(format!("Failed to register metrics: {}", e)))?;
    info!("Metrics initialized and registered");

    let app_state = AppState {
        settings: settings.clone(),
        arena_addr,
        ledger,
        duel,
        logger_manager: Some(logger_manager),
        metrics_registry,
    };

    // 7. HTTP 서버 시작
    let bind_address = format!("{}:{}", settings.server.bind_address, settings.server.port);
    info!("Starting HTTP server on {}", bind_address);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .configure(routes::configure)
    })
    .bind(&bind_address)?
    .run();

    info!("Arena Server is running on {}", bind_address);

    // 8. 종료 신호 대기
    tokio::select! {
        res = &mut server => {
            error!("Server exited unexpectedly");
            return res;
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received. Initiating graceful shutdown...");
            shutdown_token.cancel();
            System::current().stop();
        },
    }

    server.await?;
    info!("System has shut down gracefully");

    Ok(())
}
