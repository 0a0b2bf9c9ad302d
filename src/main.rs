use std::process;
use std::sync::Arc;

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vetrina::{
    application::error::AppError,
    application::gallery::GalleryService,
    application::mapping::MappingResolver,
    cache::{CacheConfig, MappingStore},
    config,
    domain::gallery::GalleryId,
    infra::{error::InfraError, fetch::HttpUpstreamFetcher, http, telemetry},
};
use vetrina_api_types::{GalleryInfoBody, GalleryResponse};

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
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Resolve(args) => run_resolve(settings, args).await,
    }
}

fn build_gallery_service(settings: &config::Settings) -> Result<Arc<GalleryService>, AppError> {
    let fetcher = Arc::new(HttpUpstreamFetcher::new(&settings.upstream)?);
    let store = Arc::new(MappingStore::new(&CacheConfig::from(&settings.cache)));
    let mappings = Arc::new(MappingResolver::new(
        fetcher.clone(),
        store,
        settings.upstream.mapping_script_url.clone(),
    ));

    Ok(Arc::new(GalleryService::new(
        fetcher,
        mappings,
        settings.upstream.metadata_base_url.clone(),
        settings.upstream.user_agent.clone(),
    )))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let gallery = build_gallery_service(&settings)?;
    let router = http::build_router(http::ApiState { gallery });

    let listener = tokio::net::TcpListener::bind(settings.server.listen_addr)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))?;

    info!(
        target = "vetrina::serve",
        addr = %settings.server.listen_addr,
        "Listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_resolve(
    settings: config::Settings,
    args: config::ResolveArgs,
) -> Result<(), AppError> {
    let gallery = build_gallery_service(&settings)?;
    let id = GalleryId::from_album_url(&args.album_url)?;

    info!(
        target = "vetrina::resolve",
        gallery = %id,
        "Resolving album"
    );

    let listing = gallery.fetch_gallery(&id, &args.album_url).await?;
    let body = GalleryResponse {
        gallery_info: GalleryInfoBody {
            files: listing.files,
            tags: listing.tags,
            headers: listing.headers,
        },
    };
    let rendered = serde_json::to_string_pretty(&body)
        .map_err(|err| AppError::unexpected(format!("failed to render listing: {err}")))?;
    println!("{rendered}");

    Ok(())
}
