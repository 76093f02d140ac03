mod health;
mod sounds;
mod thumbnails;

pub(crate) use health::readiness_check;
pub(crate) use sounds::get_sound_catalog;
pub(crate) use thumbnails::{resolve_thumbnail, resolve_thumbnails};
