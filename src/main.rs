use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use ytbridge::archival::{ArchivalConfig, ArchivalCoordinator};
use ytbridge::archival::platform::PlatformClient;
use ytbridge::config::{Config, StorageBackend};
use ytbridge::handlers::DataHandler;
use ytbridge::ingress::{build_router, IngressState};
use ytbridge::resubscribe::ResubscribeWorker;
use ytbridge::schedule::{RedeliveryStrategy, ScheduleEngine};
use ytbridge::sinks::{AmqpSink, RedisSink};

use blob_sink::{BlobSink, Disk, Gcs, NoneSink, S3};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();

    let blob: Arc<dyn BlobSink> = build_blob_sink(&config).await?;
    let platform = PlatformClient::new(config.youtube_api_key.clone());

    let schedule = build_schedule_engine(&config)?;

    let archival_config = ArchivalConfig {
        filename_template: config.filename_template.clone(),
        video_quality: config.video_format_quality.clone(),
        video_extension: config.video_format_extension.clone(),
        temp_dir: std::path::PathBuf::from(&config.temporary_file_dir),
        downloader_binary: config.downloader_binary.clone(),
        retry_delay: config.video_download_retry_delay,
        max_retries: config.video_download_max_retries.max(0) as u32,
    };
    let coordinator: Arc<dyn DataHandler> = Arc::new(ArchivalCoordinator::new(
        blob,
        platform,
        archival_config,
        schedule.clone(),
    ));

    let mut handlers: Vec<Arc<dyn DataHandler>> = vec![coordinator];
    if let Some(redis_config) = &config.redis {
        match RedisSink::connect(&redis_config.addr, redis_config.channel.clone()).await {
            Ok(sink) => handlers.push(Arc::new(sink)),
            Err(e) => error!(error = %e, "failed to connect redis sink, continuing without it"),
        }
    }
    if let Some(amqp_config) = &config.amqp {
        match AmqpSink::connect(
            &amqp_config.dsn,
            amqp_config.exchange.clone(),
            amqp_config.key.clone(),
            &amqp_config.exchange_kind,
            amqp_config.exchange_durable,
            amqp_config.exchange_auto_delete,
            amqp_config.exchange_internal,
            amqp_config.exchange_no_wait,
        )
        .await
        {
            Ok(sink) => handlers.push(Arc::new(sink)),
            Err(e) => error!(error = %e, "failed to connect amqp sink, continuing without it"),
        }
    }
    let handlers = Arc::new(handlers);

    let mut tasks = tokio::task::JoinSet::new();

    if let Some(schedule) = schedule {
        let cancel = cancel.clone();
        tasks.spawn(async move {
            schedule.run_worker(cancel).await;
        });
    }

    let resubscribe = ResubscribeWorker::new(
        config.resub_target_addr.clone(),
        config.resub_topic.clone(),
        config.resub_callback_addr.clone(),
        config.verification_token.clone(),
        config.resub_secret.clone(),
        config.resub_interval,
    );
    {
        let cancel = cancel.clone();
        tasks.spawn(async move {
            resubscribe.run(cancel).await;
        });
    }

    let state = IngressState {
        verification_token: Arc::new(config.verification_token.clone()),
        hmac_secret: config.resub_secret.clone().map(Arc::new),
        handlers,
        cancel: cancel.clone(),
    };
    let app = build_router(state);

    let bind_addr = normalize_host(&config.host);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(host = %bind_addr, "listening");

    let server_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_cancel.cancel();
        })
        .await?;

    tokio::time::sleep(SHUTDOWN_DRAIN).await;
    tasks.shutdown().await;

    Ok(())
}

/// `":8123"`-style addresses (all interfaces, Go `net.Listen` convention)
/// need an explicit host for Rust's `ToSocketAddrs`.
fn normalize_host(host: &str) -> String {
    match host.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => host.to_owned(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

async fn build_blob_sink(config: &Config) -> Result<Arc<dyn BlobSink>, Box<dyn std::error::Error>> {
    Ok(match config.storage_backend {
        StorageBackend::Disk => {
            let dir = config
                .disk_directory
                .clone()
                .ok_or("disk storage backend configured without a directory")?;
            Arc::new(Disk::new(dir))
        }
        StorageBackend::S3 => {
            let s3 = config.s3.as_ref().ok_or("s3 storage backend configured without s3 settings")?;
            Arc::new(
                S3::new(&s3.endpoint, &s3.access_key_id, &s3.secret_access_key, &s3.bucket_name).await,
            )
        }
        StorageBackend::Gcs => {
            let gcs = config.gcs.as_ref().ok_or("gcs storage backend configured without gcs settings")?;
            Arc::new(Gcs::new(&gcs.bucket_name, gcs.credential_json_file_path.as_deref()).await?)
        }
        StorageBackend::None => Arc::new(NoneSink::new()),
    })
}

/// The schedule engine redelivers due entries by re-POSTing the original raw
/// XML to this process's own ingress endpoint, rather than holding a direct
/// reference to the handler fan-out — this sidesteps the circular
/// dependency between the archival coordinator (which registers schedule
/// entries) and the handler list (which includes the coordinator).
fn build_schedule_engine(config: &Config) -> Result<Option<Arc<ScheduleEngine>>, Box<dyn std::error::Error>> {
    let Some(scheduler) = &config.scheduler else {
        return Ok(None);
    };

    let target = Url::parse(&config.resub_callback_addr)?;
    let strategy = RedeliveryStrategy::Http {
        target,
        retry_delay: scheduler.retry_delay,
        max_retries: scheduler.max_retries.max(0) as u32,
    };

    let engine = ScheduleEngine::open(
        std::path::Path::new(&scheduler.database_path),
        strategy,
        scheduler.worker_interval,
    )?;
    Ok(Some(Arc::new(engine)))
}
