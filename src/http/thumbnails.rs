use actix_web::web::{Data, Json};
use actix_web::{HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thumbnail_resolver::{ResolveRequest, ThumbnailResolver};
use tracing::{debug, warn};

pub(crate) const MAX_BATCH_ITEMS: usize = 100;

#[derive(Debug, Deserialize)]
pub(crate) struct ThumbnailItem {
    manual_thumbnail: Option<String>,
    content: Option<String>,
    default_thumbnail: Option<String>,
}

impl From<ThumbnailItem> for ResolveRequest {
    fn from(item: ThumbnailItem) -> Self {
        ResolveRequest {
            manual_thumbnail: item.manual_thumbnail,
            content: item.content,
            default_thumbnail: item.default_thumbnail,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveThumbnailBody {
    #[serde(flatten)]
    item: ThumbnailItem,
    #[serde(default)]
    validate: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveThumbnailsBody {
    items: Vec<ThumbnailItem>,
    #[serde(default)]
    validate: bool,
}

#[derive(Debug, Serialize)]
struct ThumbnailResponse {
    thumbnail: String,
}

#[derive(Debug, Serialize)]
struct ThumbnailsResponse {
    thumbnails: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

async fn resolve(resolver: &ThumbnailResolver, request: &ResolveRequest, validate: bool) -> String {
    if validate {
        resolver.resolve(request).await
    } else {
        resolver.resolve_sync(request)
    }
}

pub(crate) async fn resolve_thumbnail(
    resolver: Data<Arc<ThumbnailResolver>>,
    body: Json<ResolveThumbnailBody>,
) -> impl Responder {
    let ResolveThumbnailBody { item, validate } = body.into_inner();

    let thumbnail = resolve(&resolver, &item.into(), validate).await;
    debug!(%thumbnail, validate, "Thumbnail resolved");

    HttpResponse::Ok().json(ThumbnailResponse { thumbnail })
}

pub(crate) async fn resolve_thumbnails(
    resolver: Data<Arc<ThumbnailResolver>>,
    body: Json<ResolveThumbnailsBody>,
) -> impl Responder {
    let ResolveThumbnailsBody { items, validate } = body.into_inner();

    if items.len() > MAX_BATCH_ITEMS {
        warn!(items = items.len(), "Thumbnail batch is too large");
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: format!("At most {} items can be resolved at once", MAX_BATCH_ITEMS),
        });
    }

    let mut thumbnails = Vec::with_capacity(items.len());
    for item in items {
        thumbnails.push(resolve(&resolver, &item.into(), validate).await);
    }

    HttpResponse::Ok().json(ThumbnailsResponse { thumbnails })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};
    use serde_json::{json, Value};
    use std::time::Duration;
    use thumbnail_resolver::{HtmlMarkup, HttpImageProbe};

    fn resolver() -> Arc<ThumbnailResolver> {
        let probe = HttpImageProbe::create(Duration::from_secs(1), None).unwrap();

        Arc::new(ThumbnailResolver::new(
            Arc::new(HtmlMarkup),
            Arc::new(probe),
            "/images/default-thumbnail.jpg",
        ))
    }

    #[actix_rt::test]
    async fn test_resolve_thumbnail_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(resolver()))
                .service(web::resource("/thumbnails/resolve").route(web::post().to(resolve_thumbnail))),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/thumbnails/resolve")
            .set_json(json!({
                "content": "<img src='a.jpg'><iframe src='https://youtu.be/dQw4w9WgXcQ'></iframe>"
            }))
            .to_request();
        let response: Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(
            response,
            json!({"thumbnail": "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"})
        );
    }

    #[actix_rt::test]
    async fn test_validated_resolution_falls_back_to_default() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(resolver()))
                .service(web::resource("/thumbnails/resolve-batch").route(web::post().to(resolve_thumbnails))),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/thumbnails/resolve-batch")
            .set_json(json!({
                "items": [
                    {"content": "<img src='relative.jpg'>"},
                    {"content": "<p>no media</p>", "default_thumbnail": "/images/sounds.jpg"}
                ],
                "validate": true
            }))
            .to_request();
        let response: Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(
            response,
            json!({"thumbnails": ["/images/default-thumbnail.jpg", "/images/sounds.jpg"]})
        );
    }

    #[actix_rt::test]
    async fn test_batch_above_limit_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(resolver()))
                .service(web::resource("/thumbnails/resolve-batch").route(web::post().to(resolve_thumbnails))),
        )
        .await;

        let items: Vec<Value> = (0..=MAX_BATCH_ITEMS)
            .map(|_| json!({"content": "<img src='https://cdn.example/a.jpg'>"}))
            .collect();
        let request = test::TestRequest::post()
            .uri("/thumbnails/resolve-batch")
            .set_json(json!({"items": items, "validate": true}))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let items: Vec<Value> = (0..MAX_BATCH_ITEMS)
            .map(|_| json!({"content": "<p>no media</p>"}))
            .collect();
        let request = test::TestRequest::post()
            .uri("/thumbnails/resolve-batch")
            .set_json(json!({"items": items}))
            .to_request();
        let response: Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(response["thumbnails"].as_array().map(Vec::len), Some(MAX_BATCH_ITEMS));
    }
}
