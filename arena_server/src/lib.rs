use std::{io, sync::Arc};

use actix::Addr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    arena::ArenaService, env::Settings, ledger::LedgerGateway, settlement::DuelService,
};

pub mod arena;
pub mod circuit_breaker;
pub mod env;
pub mod errors;
pub mod ledger;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod settlement;

pub struct LoggerManager {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

impl LoggerManager {
    pub fn setup(settings: &Settings) -> Self {
        // 1. 파일 로거 설정
        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            &settings.logging.directory,
            &settings.logging.filename,
        );
        let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(file_appender);

        // 2. RUST_LOG 가 있으면 우선, 없으면 설정 파일의 log_level
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.server.log_level));

        // 3. 콘솔 출력
        let console_layer = fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .pretty();

        // 4. 파일 출력 (ANSI 제외)
        let file_layer = fmt::layer()
            .with_writer(non_blocking_file_writer)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        tracing::info!(
            "로거 초기화 완료: 콘솔 및 파일({}/{}) 출력 활성화.",
            settings.logging.directory,
            settings.logging.filename
        );

        Self { _guard: guard }
    }
}

/// 핸들러가 공유하는 서버 상태
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub arena_addr: Addr<ArenaService>,
    pub ledger: LedgerGateway,
    pub duel: DuelService,
    /// 테스트에서는 로거 없이 구성한다.
    pub logger_manager: Option<Arc<LoggerManager>>,
    pub metrics_registry: prometheus::Registry,
}
