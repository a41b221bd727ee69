use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::SecretString;
use sqlx::postgres::PgPool;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use subscription_sync::adapters::auth::JwtSessionValidator;
use subscription_sync::adapters::http::billing::RouteTimeouts;
use subscription_sync::adapters::http::{app_router, BillingAppState, WebhookGuard};
use subscription_sync::adapters::postgres::{
    PostgresEventLedger, PostgresStripeLedger, PostgresSubscriptionStore, PostgresUserDirectory,
};
use subscription_sync::adapters::stripe::{
    StripeConfig, StripePaymentAdapter, StripeSignatureVerifier,
};
use subscription_sync::application::handlers::billing::CheckoutSettings;
use subscription_sync::config::AppConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        tracing::error!(error = %error, "subscription-sync exited with error");
        eprintln!("subscription-sync: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config);

    let pool = config.database.pool_options().connect(&config.database.url).await?;
    info!("Postgres connection pool established");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    let state = build_state(&config, pool);
    let auth = Arc::new(JwtSessionValidator::new(
        &SecretString::new(config.auth.jwt_secret.clone()),
        config.auth.issuer.as_deref(),
    ));
    let timeouts = RouteTimeouts {
        request: config.server.request_timeout(),
        webhook: config.server.webhook_timeout(),
    };
    let app = app_router(state, auth, timeouts);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, environment = ?config.server.environment, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_state(config: &AppConfig, pool: PgPool) -> BillingAppState {
    let payment = &config.payment;

    let stripe = StripePaymentAdapter::new(
        StripeConfig::new(SecretString::new(payment.stripe_api_key.clone()))
            .with_base_url(payment.stripe_api_base_url.clone()),
    );
    if payment.is_test_mode() {
        info!("Stripe running in test mode");
    }

    let mut guard = WebhookGuard::new(
        payment.allowed_ips(),
        SecretString::new(payment.revenuecat_auth_secret.clone()),
    )
    .trusting_forwarded_for(config.server.trust_forwarded_for);
    if let Some(secret) = &payment.stripe_webhook_secret {
        guard = guard.with_stripe_signature(StripeSignatureVerifier::new(SecretString::new(
            secret.clone(),
        )));
    }

    BillingAppState {
        subscriptions: Arc::new(PostgresSubscriptionStore::new(pool.clone())),
        stripe_ledger: Arc::new(PostgresStripeLedger::new(pool.clone())),
        event_ledger: Arc::new(PostgresEventLedger::new(pool.clone())),
        users: Arc::new(PostgresUserDirectory::new(pool)),
        payment_provider: Arc::new(stripe),
        checkout: CheckoutSettings {
            price_ids: payment.price_ids(),
            success_url: payment.success_url.clone(),
            cancel_url: payment.cancel_url.clone(),
        },
        webhook_guard: Arc::new(guard),
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
