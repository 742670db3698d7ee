use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::anyhow;
use auth::PasswordHasher;
use auth::PrincipalKind;
use auth::Role;
use auth::TokenCodec;
use chrono::Duration;
use identity_service::config::BootstrapConfig;
use identity_service::config::Config;
use identity_service::domain::identity::gate::RoleGate;
use identity_service::domain::identity::models::EmailAddress;
use identity_service::domain::identity::models::NewAccountUser;
use identity_service::domain::identity::ports::PrincipalRepository;
use identity_service::domain::identity::resolver::PrincipalResolver;
use identity_service::domain::identity::revocation::RevocationStore;
use identity_service::domain::identity::service::IdentityService;
use identity_service::domain::identity::service::TokenPolicy;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::email::LogMailer;
use identity_service::outbound::repositories::PostgresPrincipalRepository;
use identity_service::outbound::stores::InMemoryEphemeralStore;
use jsonwebtoken::Algorithm;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        algorithm = %config.token.algorithm,
        access_ttl_minutes = config.token.access_ttl_minutes,
        refresh_ttl_days = config.token.refresh_ttl_days,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let algorithm = Algorithm::from_str(&config.token.algorithm)
        .map_err(|_| anyhow!("Unknown signing algorithm {:?}", config.token.algorithm))?;
    let codec = Arc::new(TokenCodec::with_algorithm(
        config.token.secret.as_bytes(),
        algorithm,
    )?);

    let repository = Arc::new(PostgresPrincipalRepository::new(pg_pool.clone()));
    // Process-scoped: created once here, shared by every request handler.
    let store = Arc::new(InMemoryEphemeralStore::new());
    let mailer = Arc::new(LogMailer::new());

    let policy = TokenPolicy {
        access_ttl: Duration::minutes(config.token.access_ttl_minutes),
        refresh_ttl: Duration::days(config.token.refresh_ttl_days),
        reset_ttl: StdDuration::from_secs(config.token.reset_ttl_minutes * 60),
        revocation_ttl: StdDuration::from_secs(config.token.revocation_ttl_days * 24 * 3600),
    };

    let identity_service = Arc::new(IdentityService::new(
        Arc::clone(&repository),
        Arc::clone(&store),
        mailer,
        Arc::clone(&codec),
        policy.clone(),
        config.mail.reset_link_base.clone(),
    ));

    let role_gate = Arc::new(RoleGate::new(
        codec,
        RevocationStore::new(Arc::clone(&store), policy.revocation_ttl),
        PrincipalResolver::new(
            Arc::clone(&repository),
            StdDuration::from_secs(config.token.resolver_timeout_secs),
        ),
        store,
        StdDuration::from_secs(config.token.role_cache_ttl_secs),
    ));

    if let Some(bootstrap) = &config.bootstrap {
        ensure_initial_admin(repository.as_ref(), bootstrap).await?;
    }

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let application = create_router(identity_service, role_gate);
    axum::serve(http_listener, application).await?;

    pg_pool.close().await;

    Ok(())
}

/// Create the initial admin account unless an admin already exists.
async fn ensure_initial_admin(
    repository: &PostgresPrincipalRepository,
    bootstrap: &BootstrapConfig,
) -> Result<(), anyhow::Error> {
    if repository.admin_exists().await? {
        tracing::info!("Admin account already exists; skipping bootstrap");
        return Ok(());
    }

    let email = EmailAddress::new(bootstrap.admin_email.clone())
        .map_err(|e| anyhow!("Invalid bootstrap admin email: {}", e))?;

    let hasher = PasswordHasher::new();
    let password = bootstrap.admin_password.clone();
    let credential_hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

    let admin = repository
        .create_user(NewAccountUser {
            full_name: bootstrap.admin_name.clone(),
            email,
            credential_hash,
            role: Role::Admin,
        })
        .await?;

    tracing::warn!(
        principal_id = admin.id,
        kind = %PrincipalKind::User,
        "Initial admin account created; change its password after first login"
    );

    Ok(())
}
