//! 시세 감시 CLI.

use clap::{Parser, Subcommand};
use std::time::Instant;
use ticker_core::{init_logging, AssetRegistry, LogConfig, LogFormat};
use ticker_feed::{PollStatus, PollingScheduler};
use ticker_watch::{asset_set_from_arg, CycleSummary, Snapshot, WatchConfig};

#[derive(Parser)]
#[command(name = "ticker-watch")]
#[command(about = "Market Ticker Watcher", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error). 설정 파일 값을 덮어씁니다
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// 등록된 자산 목록 출력
    Assets,

    /// 사이클 한 번을 실행하고 상태를 JSON으로 출력
    Snapshot {
        /// 조회할 심볼 (쉼표로 구분, 예: "BTC,ETH"). 생략 시 추천 자산
        #[arg(long)]
        symbols: Option<String>,
    },

    /// Ctrl-C까지 주기적으로 폴링
    Watch {
        /// 감시할 심볼 (쉼표로 구분). 생략 시 추천 자산
        #[arg(long)]
        symbols: Option<String>,

        /// 폴링 주기 (초). 최소 주기보다 짧으면 최소 주기로 올림
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 설정 로드
    let config = WatchConfig::from_env()?;

    // 로깅 초기화
    let mut log_config = LogConfig::from_settings(&config.app.logging).override_from_env();
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    if let Some(format) = cli.log_format {
        log_config = log_config.with_format(format);
    }
    init_logging(log_config)?;

    tracing::info!("Market Ticker Watcher 시작");
    tracing::debug!(config_path = %config.config_path.display(), "설정 로드 완료");

    let registry = AssetRegistry::builtin();

    // 명령 실행
    match cli.command {
        Commands::Assets => {
            for asset in registry.list_all() {
                println!(
                    "{:<6} {:<16} pair={:<10} {}",
                    asset.display_symbol,
                    asset.provider_id,
                    asset.spot_pair.as_deref().unwrap_or("-"),
                    asset.icon_url()
                );
            }
        }
        Commands::Snapshot { symbols } => {
            let scheduler = PollingScheduler::from_config(&config.app, registry)?;
            let set = asset_set_from_arg(symbols.as_deref());

            let snapshot = Snapshot::capture(&scheduler, &set).await?;
            snapshot.summary.log_summary("스냅샷");

            println!("{}", snapshot.to_json()?);
        }
        Commands::Watch {
            symbols,
            interval_secs,
        } => {
            let config = config.with_interval_secs(interval_secs);
            let polling = &config.app.polling;
            let scheduler = PollingScheduler::from_config(&config.app, registry)?;
            let set = asset_set_from_arg(symbols.as_deref());

            tracing::info!(
                "=== 감시 시작: {} (주기: {}초) ===",
                set.name,
                polling.effective_interval(polling.interval()).as_secs()
            );

            let mut subscription = scheduler.subscribe(&set)?;
            let mut last_cycle = Instant::now();

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 감시 종료 중...");
                        break;
                    }
                    changed = subscription.changed() => {
                        if !changed {
                            tracing::warn!("상태 채널이 닫혀 감시를 종료합니다");
                            break;
                        }

                        let state = subscription.state();
                        match state.status {
                            PollStatus::Loading => last_cycle = Instant::now(),
                            PollStatus::Ready | PollStatus::Error => {
                                CycleSummary::from_state(&set.name, &state)
                                    .with_elapsed(last_cycle.elapsed())
                                    .log_summary("감시");
                            }
                            PollStatus::Idle => {}
                        }
                    }
                }
            }

            subscription.unsubscribe();
        }
    }

    tracing::info!("Market Ticker Watcher 종료");

    Ok(())
}
