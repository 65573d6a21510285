use std::{process, sync::Arc, time::Duration as StdDuration};

use blogicum::{
    application::{
        accounts::{AccountService, PrivilegeChange},
        blog::BlogService,
        catalog::{CatalogService, NewCategory},
        comments::CommentService,
        error::AppError,
        pagination::Paginator,
        posts::PostService,
        sessions::SessionService,
    },
    config,
    infra::{
        db::PostgresRepositories, error::InfraError, http, passwords::Argon2PasswordService,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SESSION_PURGE_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Grant(args) => run_grant(settings, args).await,
        config::Command::Category(args) => match args.command {
            config::CategoryCommand::Create(create) => run_create_category(settings, create).await,
        },
        config::Command::Location(args) => match args.command {
            config::LocationCommand::Create(create) => run_create_location(settings, create).await,
        },
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or(InfraError::MissingDatabaseUrl)?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::Connect)?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn apply_migrations(repositories: &PostgresRepositories) -> Result<(), AppError> {
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(InfraError::Migrate)?;
    info!(target = "blogicum::migrations", "migrations applied");
    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    apply_migrations(&repositories).await
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    apply_migrations(&repositories).await?;

    let state = build_http_state(repositories, &settings)?;
    let purge_handle = spawn_session_purge(state.sessions.clone());

    let result = serve_http(&settings, state).await;

    purge_handle.abort();
    let _ = purge_handle.await;

    result
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<http::HttpState, AppError> {
    let session_ttl = time::Duration::try_from(settings.session.ttl)
        .map_err(|err| AppError::unexpected(format!("invalid session ttl: {err}")))?;
    let paginator = Paginator::new(settings.blog.posts_per_page);

    let blog = BlogService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        paginator,
    );
    let posts = PostService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
    );
    let comments = CommentService::new(repositories.clone(), repositories.clone());
    let accounts = AccountService::new(
        repositories.clone(),
        Arc::new(Argon2PasswordService::default()),
    );
    let sessions = SessionService::new(repositories.clone(), repositories.clone(), session_ttl);

    Ok(http::HttpState {
        blog: Arc::new(blog),
        posts: Arc::new(posts),
        comments: Arc::new(comments),
        accounts: Arc::new(accounts),
        sessions: Arc::new(sessions),
        health: repositories,
        secure_cookie: settings.session.secure_cookie,
    })
}

fn spawn_session_purge(sessions: Arc<SessionService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(
                    target = "blogicum::sessions",
                    removed, "expired sessions purged"
                ),
                Err(err) => warn!(
                    target = "blogicum::sessions",
                    error = %err,
                    "failed to purge expired sessions"
                ),
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, state: http::HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let addr = settings.server.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;

    info!(
        target = "blogicum::server",
        addr = %settings.server.addr,
        "listening"
    );

    let stopping = Arc::new(Notify::new());
    let signal = {
        let stopping = stopping.clone();
        async move {
            shutdown_signal().await;
            stopping.notify_waiters();
        }
    };
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(signal);
    let grace = settings.server.graceful_shutdown;

    tokio::select! {
        result = server.into_future() => {
            result.map_err(|err| AppError::from(InfraError::Serve(err)))
        }
        _ = async {
            stopping.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "blogicum::server",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "blogicum::server", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "blogicum::server", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(target = "blogicum::server", "shutdown requested");
}

async fn run_grant(settings: config::Settings, args: config::GrantArgs) -> Result<(), AppError> {
    let change = privilege_change(&args)?;
    let repositories = init_repositories(&settings).await?;
    let accounts = AccountService::new(repositories, Arc::new(Argon2PasswordService::default()));

    let user = accounts.change_privileges(&args.username, change).await?;
    info!(
        target = "blogicum::grant",
        username = %user.username,
        is_staff = user.is_staff,
        is_superuser = user.is_superuser,
        "privileges updated"
    );
    Ok(())
}

fn privilege_change(args: &config::GrantArgs) -> Result<PrivilegeChange, AppError> {
    if !args.staff && !args.superuser {
        return Err(AppError::validation(
            "grant requires at least one of --staff or --superuser",
        ));
    }
    let value = !args.revoke;
    Ok(PrivilegeChange {
        staff: args.staff.then_some(value),
        superuser: args.superuser.then_some(value),
    })
}

async fn run_create_category(
    settings: config::Settings,
    args: config::CreateCategoryArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let catalog = CatalogService::new(repositories.clone(), repositories);

    let category = catalog
        .create_category(NewCategory {
            title: args.title,
            slug: args.slug,
            description: args.description,
            is_published: !args.unpublished,
        })
        .await?;
    info!(
        target = "blogicum::catalog",
        id = category.id,
        slug = %category.slug,
        "category ready at /category/{}/",
        category.slug
    );
    Ok(())
}

async fn run_create_location(
    settings: config::Settings,
    args: config::CreateLocationArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let catalog = CatalogService::new(repositories.clone(), repositories);

    let location = catalog
        .create_location(&args.name, !args.unpublished)
        .await?;
    info!(
        target = "blogicum::catalog",
        id = location.id,
        name = %location.name,
        "location created"
    );
    Ok(())
}
