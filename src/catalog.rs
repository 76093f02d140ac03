use sound_mixer::{CatalogError, SoundCatalog};
use tracing::info;

const BUILTIN_CATALOG: &str = include_str!("../assets/sounds.json");

#[derive(Debug, thiserror::Error)]
pub(crate) enum LoadCatalogError {
    #[error("Unable to read sound catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    CatalogError(#[from] CatalogError),
}

pub(crate) fn load_catalog(path: Option<&str>) -> Result<SoundCatalog, LoadCatalogError> {
    let catalog = match path {
        Some(path) => {
            let raw_json = std::fs::read_to_string(path).map_err(|source| LoadCatalogError::Io {
                path: path.to_string(),
                source,
            })?;
            SoundCatalog::from_json(&raw_json)?
        }
        None => SoundCatalog::from_json(BUILTIN_CATALOG)?,
    };

    info!(
        channels = catalog.channels().len(),
        ?path, "Sound catalog loaded"
    );

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_load_builtin_catalog() {
        let catalog = load_catalog(None).expect("Expected builtin catalog to be valid");

        assert_eq!(catalog.channels()[0].id.to_string(), "rain");
        assert_eq!(catalog.channels().len(), 6);
    }

    #[test]
    fn should_fail_on_missing_catalog_file() {
        assert!(matches!(
            load_catalog(Some("/nonexistent/sounds.json")),
            Err(LoadCatalogError::Io { .. })
        ));
    }
}
