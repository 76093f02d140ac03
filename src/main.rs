use crate::config::Config;
use actix_rt::signal::unix;
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use futures_lite::FutureExt;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use thumbnail_resolver::{HtmlMarkup, HttpImageProbe, ThumbnailResolver};
use tracing::{error, info};

mod catalog;
mod config;
mod http;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    let mut terminate = unix::signal(unix::SignalKind::terminate())?;
    let mut interrupt = unix::signal(unix::SignalKind::interrupt())?;

    dotenv::dotenv().ok();
    env_logger::init();

    let config = Arc::from(Config::from_env());

    info!(version = VERSION, "Starting application...");

    let site_base_url = config
        .site_base_url
        .as_deref()
        .map(Url::parse)
        .transpose()
        .expect("Invalid SITE_BASE_URL");
    let image_probe = HttpImageProbe::create(
        Duration::from_secs(config.thumbnail_probe_timeout),
        site_base_url,
    )
    .expect("Unable to initialize thumbnail probe HTTP client");
    let thumbnail_resolver = Arc::new(ThumbnailResolver::new(
        Arc::new(HtmlMarkup),
        Arc::new(image_probe),
        config.default_thumbnail.clone(),
    ));
    let sound_catalog = Arc::new(
        catalog::load_catalog(config.sound_catalog_path.as_deref())
            .expect("Unable to load sound catalog"),
    );

    let shutdown_timeout = config.shutdown_timeout;
    let bind_address = config.bind_address.clone();

    let server = HttpServer::new({
        move || {
            App::new()
                .app_data(Data::new(Arc::clone(&thumbnail_resolver)))
                .app_data(Data::new(Arc::clone(&sound_catalog)))
                .service(web::resource("/health").route(web::get().to(http::readiness_check)))
                .service(
                    web::resource("/thumbnails/resolve")
                        .route(web::post().to(http::resolve_thumbnail)),
                )
                .service(
                    web::resource("/thumbnails/resolve-batch")
                        .route(web::post().to(http::resolve_thumbnails)),
                )
                .service(
                    web::resource("/sounds/catalog").route(web::get().to(http::get_sound_catalog)),
                )
        }
    })
    .shutdown_timeout(shutdown_timeout)
    .bind(bind_address)?
    .run();

    let server_handle = server.handle();

    actix_rt::spawn({
        async move {
            if let Err(error) = server.await {
                error!(?error, "Error on http server");
            }
        }
    });

    info!("Application started");

    interrupt.recv().or(terminate.recv()).await;

    info!("Received shutdown signal. Shutting down gracefully...");

    server_handle.stop(true).await;

    Ok(())
}
