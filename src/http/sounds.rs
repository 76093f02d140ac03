use actix_web::web::Data;
use actix_web::{HttpResponse, Responder};
use sound_mixer::SoundCatalog;
use std::sync::Arc;

pub(crate) async fn get_sound_catalog(catalog: Data<Arc<SoundCatalog>>) -> impl Responder {
    HttpResponse::Ok().json(catalog.channels())
}
