mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::{path::PathBuf, sync::Arc, time::Duration};

use config::{Config, StorageDriver};
use db::db::DBClient;
use dotenv::dotenv;
use mail::sendmail::Mailer;
use routes::create_router;
use service::{
    aura_service::AuraService,
    error_log::ErrorLog,
    notification_service::NotificationService,
    session_activity::SessionActivity,
    storage::{LocalStorage, StorageBackend, StorageError, SupabaseStorage},
    upload_service::UploadService,
    watermark_service::WatermarkService,
};
use sqlx::postgres::PgPoolOptions;

const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub upload_service: Arc<UploadService>,
    pub watermark_service: Arc<WatermarkService>,
    pub aura_service: Arc<AuraService>,
    pub mailer: Arc<Mailer>,
    pub notification_service: Arc<NotificationService>,
    pub error_log: Arc<ErrorLog>,
    pub session_activity: Arc<SessionActivity>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Result<Self, StorageError> {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let db_client = Arc::new(db_client);

        let storage: Arc<dyn StorageBackend> = match config.storage_driver {
            StorageDriver::Supabase => Arc::new(SupabaseStorage::new(
                &config.storage_url,
                &config.storage_service_key,
                timeout,
            )?),
            StorageDriver::Local => Arc::new(LocalStorage::new(
                PathBuf::from(&config.local_storage_path),
                config.storage_url.clone(),
            )),
        };

        let watermark_service = Arc::new(WatermarkService::new(
            storage.clone(),
            &config.watermark_font_path,
            &config.watermark_text,
            timeout,
        ));
        let upload_service = Arc::new(UploadService::new(storage.clone(), watermark_service.clone()));

        let mailer = Arc::new(Mailer::new(
            config.resend_api_key.clone(),
            config.from_email.clone(),
            timeout,
        ));
        if !mailer.is_configured() {
            tracing::warn!("RESEND_API_KEY is not set, outgoing email is disabled");
        }

        let notification_service = Arc::new(NotificationService::new(
            db_client.clone(),
            mailer.clone(),
            config.app_url.clone(),
            config.office_inbox_email.clone(),
        ));

        Ok(AppState {
            aura_service: Arc::new(AuraService::new(&config)),
            error_log: Arc::new(ErrorLog::new(config.error_log_capacity)),
            session_activity: Arc::new(SessionActivity::new(config.inactivity_timeout_minutes)),
            env: config,
            db_client,
            upload_service,
            watermark_service,
            mailer,
            notification_service,
        })
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("🔥 Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let port = config.port;
    let app_state = match AppState::new(DBClient::new(pool), config) {
        Ok(app_state) => Arc::new(app_state),
        Err(err) => {
            tracing::error!("🔥 Failed to set up storage: {}", err);
            std::process::exit(1);
        }
    };

    let session_activity = app_state.session_activity.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let pruned = session_activity.prune();
            if pruned > 0 {
                tracing::debug!("Forgot {} expired session(s)", pruned);
            }
        }
    });

    let app = create_router(app_state);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("🔥 Failed to bind port {}: {}", port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("🚀 Server is running on http://localhost:{}", port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("🔥 Server error: {}", err);
        std::process::exit(1);
    }
}
