use serde::Deserialize;

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30u64
}

fn default_thumbnail() -> String {
    thumbnail_resolver::DEFAULT_THUMBNAIL.to_string()
}

fn default_thumbnail_probe_timeout() -> u64 {
    5u64
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Config {
    #[serde(default = "default_bind_address")]
    pub(crate) bind_address: String,
    #[serde(default = "default_shutdown_timeout")]
    pub(crate) shutdown_timeout: u64,
    #[serde(default = "default_thumbnail")]
    pub(crate) default_thumbnail: String,
    #[serde(default = "default_thumbnail_probe_timeout")]
    pub(crate) thumbnail_probe_timeout: u64,
    pub(crate) site_base_url: Option<String>,
    pub(crate) sound_catalog_path: Option<String>,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        match envy::from_env::<Self>() {
            Ok(config) => config,
            Err(error) => panic!("Missing environment variable: {:#?}", error),
        }
    }
}
