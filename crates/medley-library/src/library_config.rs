use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use derive_builder::Builder;
use medley_core::DatasetVersion;
use medley_paths::{ENV_DATA_DIR, MedleyPaths};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Backends de base de datos para el espejo SQL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "path", rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite(PathBuf),
    Memory,
}

impl Default for DatabaseBackend {
    fn default() -> Self {
        DatabaseBackend::Sqlite(medley_paths::PATHS.database_file.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default)]
#[serde(default)]
pub struct LibraryConfig {
    /// Raíz de los datos (`MEDLEYDB_PATH`).
    pub path: Option<PathBuf>,
    /// Raíz del catálogo (`MEDLEYDB_CATALOG_PATH`); por defecto igual a `path`.
    pub catalog_path: Option<PathBuf>,
    pub database: DatabaseBackend,
    /// Filtro de versiones por defecto; vacío = todas.
    pub dataset_versions: Vec<DatasetVersion>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            path: None,
            catalog_path: None,
            database: DatabaseBackend::default(),
            dataset_versions: Vec::new(),
        }
    }
}

impl LibraryConfig {
    /// Lee solo el fichero TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let cfg = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml))
            .build()?;
        Ok(cfg.try_deserialize::<LibraryConfig>()?)
    }

    /// Fichero TOML opcional + variables `MEDLEYDB_*` (p. ej. `MEDLEYDB_PATH`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            let path = path.to_string_lossy().into_owned();
            builder = builder.add_source(File::new(&path, FileFormat::Toml).required(false));
        }
        let cfg = builder
            .add_source(Environment::with_prefix("MEDLEYDB").try_parsing(false))
            .build()?;
        Ok(cfg.try_deserialize::<LibraryConfig>()?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        medley_paths::ensure_parent(path.as_ref())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Resuelve las rutas del dataset. Lo que no venga en la config sale del entorno.
    pub fn paths(&self) -> MedleyPaths {
        match (&self.path, &self.catalog_path) {
            (None, None) => medley_paths::PATHS.clone(),
            (data, catalog) => {
                let data_root = data
                    .clone()
                    .or_else(|| std::env::var_os(ENV_DATA_DIR).map(PathBuf::from));
                let catalog_root = catalog
                    .clone()
                    .or_else(|| data_root.clone())
                    .unwrap_or_else(|| PathBuf::from("."));
                MedleyPaths::with_roots(data_root, catalog_root)
            }
        }
    }

    /// Ruta del fichero de base de datos, si el backend es SQLite.
    pub fn database_file(&self) -> Option<&Path> {
        match &self.database {
            DatabaseBackend::Sqlite(path) => Some(path),
            DatabaseBackend::Memory => None,
        }
    }
}
