use std::{
    env,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use tracing::warn;

use crate::errors::Error;

/// Variable de entorno con la raíz de los datos (audio + base de datos).
pub const ENV_DATA_DIR: &str = "MEDLEYDB_PATH";
/// Variable de entorno con la raíz del catálogo (metadatos, anotaciones, recursos).
pub const ENV_CATALOG_DIR: &str = "MEDLEYDB_CATALOG_PATH";

const AUDIO_DIR: &str = "Audio";
const METADATA_DIR: &str = "Metadata";
const ANNOTATION_DIR: &str = "Annotations";
const RESOURCES_DIR: &str = "resources";
const DATABASE_FILE: &str = "database.sql";

/// Nivel de anotación de melodía.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MelodyLevel {
    One,
    Two,
    Three,
}

impl MelodyLevel {
    pub const ALL: [MelodyLevel; 3] = [MelodyLevel::One, MelodyLevel::Two, MelodyLevel::Three];

    pub fn number(&self) -> u8 {
        match self {
            MelodyLevel::One => 1,
            MelodyLevel::Two => 2,
            MelodyLevel::Three => 3,
        }
    }
}

/// Contenedor de todas las rutas y convenciones de nombres del dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedleyPaths {
    // data_root
    pub data_root: Option<PathBuf>,
    pub audio_dir: PathBuf,
    pub database_file: PathBuf,

    // catalog_root
    pub catalog_root: PathBuf,
    pub metadata_dir: PathBuf,
    pub annotation_dir: PathBuf,
    pub activation_conf_dir: PathBuf,
    pub melody_dir: PathBuf,
    pub intervals_dir: PathBuf,
    pub ranking_dir: PathBuf,
    pub pitch_dir: PathBuf,
    pub pitch_pyin_dir: PathBuf,
    pub source_id_dir: PathBuf,

    // resources
    pub resources_dir: PathBuf,
    pub taxonomy_file: PathBuf,
    pub f0_type_file: PathBuf,
    pub mixing_coefficients_file: PathBuf,
    pub artist_index_file: PathBuf,
}

impl MedleyPaths {
    /// Construye las rutas a partir de `MEDLEYDB_PATH` y `MEDLEYDB_CATALOG_PATH`.
    ///
    /// Nunca falla: si la raíz de datos no existe el audio queda marcado como no disponible.
    pub fn from_env() -> Self {
        let data_root = match env::var(ENV_DATA_DIR) {
            Ok(value) if !value.is_empty() => {
                let root = PathBuf::from(value);
                if !root.exists() {
                    warn!(
                        "The value set for {}: {} does not exist. Audio access is disabled.",
                        ENV_DATA_DIR,
                        root.display()
                    );
                }
                Some(root)
            }
            _ => {
                warn!(
                    "The environment variable {} is not set. Audio access is disabled.",
                    ENV_DATA_DIR
                );
                None
            }
        };

        let catalog_root = match env::var(ENV_CATALOG_DIR) {
            Ok(value) if !value.is_empty() => PathBuf::from(value),
            _ => data_root.clone().unwrap_or_else(|| PathBuf::from(".")),
        };

        Self::with_roots(data_root, catalog_root)
    }

    /// Construye las rutas con raíces explícitas (sin tocar el entorno).
    pub fn with_roots(data_root: Option<PathBuf>, catalog_root: impl Into<PathBuf>) -> Self {
        let catalog_root = catalog_root.into();

        let audio_dir = match &data_root {
            Some(root) => root.join(AUDIO_DIR),
            None => PathBuf::from(AUDIO_DIR),
        };

        let database_file = match &data_root {
            Some(root) => root.join(DATABASE_FILE),
            None => default_database_file(),
        };

        let annotation_dir = catalog_root.join(ANNOTATION_DIR);
        let melody_dir = annotation_dir.join("Melody");
        let resources_dir = catalog_root.join(RESOURCES_DIR);

        MedleyPaths {
            data_root,
            audio_dir,
            database_file,

            metadata_dir: catalog_root.join(METADATA_DIR),
            activation_conf_dir: annotation_dir.join("Activation_Confidence"),
            intervals_dir: melody_dir.join("Intervals"),
            ranking_dir: melody_dir.join("Rankings"),
            pitch_dir: annotation_dir.join("Pitch"),
            pitch_pyin_dir: annotation_dir.join("Pitch_Pyin"),
            source_id_dir: annotation_dir.join("Source_ID"),
            melody_dir,
            annotation_dir,

            taxonomy_file: resources_dir.join("taxonomy.yaml"),
            f0_type_file: resources_dir.join("instrument_f0_type.json"),
            mixing_coefficients_file: resources_dir.join("mixing_coefficients.yaml"),
            artist_index_file: resources_dir.join("artist_index.json"),
            resources_dir,

            catalog_root,
        }
    }

    /// True si la carpeta de audio existe en disco.
    pub fn audio_available(&self) -> bool {
        self.data_root.is_some() && self.audio_dir.is_dir()
    }
}

impl MedleyPaths {
    pub fn metadata_file(&self, track_id: &str) -> PathBuf {
        self.metadata_dir.join(format!("{track_id}_METADATA.yaml"))
    }

    pub fn tracklist_file(&self, version: &str) -> PathBuf {
        self.resources_dir
            .join(format!("tracklist_{}.txt", version.to_ascii_lowercase()))
    }

    /// Carpeta con todo el audio de una multipista.
    pub fn multitrack_audio_dir(&self, track_id: &str) -> PathBuf {
        self.audio_dir.join(track_id)
    }

    pub fn mix_file(&self, track_id: &str) -> PathBuf {
        self.multitrack_audio_dir(track_id)
            .join(format!("{track_id}_MIX.wav"))
    }

    pub fn stem_dir(&self, track_id: &str) -> PathBuf {
        self.multitrack_audio_dir(track_id)
            .join(format!("{track_id}_STEMS"))
    }

    pub fn raw_dir(&self, track_id: &str) -> PathBuf {
        self.multitrack_audio_dir(track_id)
            .join(format!("{track_id}_RAW"))
    }

    /// Ruta canónica de un stem:
    ///   <audio>/<id>/<id>_STEMS/<id>_STEM_<NN>.wav
    pub fn stem_file(&self, track_id: &str, stem_idx: u32) -> Result<PathBuf, Error> {
        let idx = two_digits(stem_idx)?;
        Ok(self
            .stem_dir(track_id)
            .join(format!("{track_id}_STEM_{idx}.wav")))
    }

    /// Ruta canónica de una grabación raw:
    ///   <audio>/<id>/<id>_RAW/<id>_RAW_<NN>_<MM>.wav
    pub fn raw_file(&self, track_id: &str, stem_idx: u32, raw_idx: u32) -> Result<PathBuf, Error> {
        let s = two_digits(stem_idx)?;
        let r = two_digits(raw_idx)?;
        Ok(self
            .raw_dir(track_id)
            .join(format!("{track_id}_RAW_{s}_{r}.wav")))
    }
}

impl MedleyPaths {
    pub fn melody_file(&self, track_id: &str, level: MelodyLevel) -> PathBuf {
        let n = level.number();
        self.melody_dir
            .join(format!("Melody{n}"))
            .join(format!("{track_id}_MELODY{n}.csv"))
    }

    pub fn intervals_file(&self, track_id: &str) -> PathBuf {
        self.intervals_dir.join(format!("{track_id}_INTERVALS.txt"))
    }

    pub fn ranking_file(&self, track_id: &str) -> PathBuf {
        self.ranking_dir.join(format!("{track_id}_RANKING.txt"))
    }

    pub fn activation_conf_file(&self, track_id: &str) -> PathBuf {
        self.activation_conf_dir
            .join(format!("{track_id}_ACTIVATION_CONF.lab"))
    }

    pub fn source_id_file(&self, track_id: &str) -> PathBuf {
        self.source_id_dir.join(format!("{track_id}_SOURCEID.lab"))
    }

    /// Anotación manual de pitch para un fichero de stem (`..._STEM_03.wav` -> `..._STEM_03.csv`).
    pub fn pitch_file(&self, audio_file: &Path) -> PathBuf {
        self.pitch_dir.join(format!("{}.csv", file_stem(audio_file)))
    }

    pub fn pitch_pyin_file(&self, audio_file: &Path) -> PathBuf {
        self.pitch_pyin_dir.join(format!(
            "{}_vamp_pyin_pyin_smoothedpitchtrack.csv",
            file_stem(audio_file)
        ))
    }
}

/// Separa un track id en (artista, título). El artista es todo lo anterior al primer `_`.
pub fn split_track_id(track_id: &str) -> Result<(&str, &str), Error> {
    match track_id.split_once('_') {
        Some((artist, title)) if !artist.is_empty() && !title.is_empty() => Ok((artist, title)),
        _ => Err(Error::InvalidTrackId(track_id.to_string())),
    }
}

/// Nombre de la carpeta más baja de una ruta (ignora separadores finales).
pub fn path_basedir(path: &Path) -> Option<String> {
    path.components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .last()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
}

fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    // `a.b.wav` -> `a`, como en los nombres del dataset
    name.split('.').next().unwrap_or_default().to_string()
}

fn two_digits(idx: u32) -> Result<String, Error> {
    if idx == 0 || idx > 99 {
        return Err(Error::InvalidIndex(idx));
    }
    Ok(format!("{idx:02}"))
}

fn default_database_file() -> PathBuf {
    ProjectDirs::from("edu", "MARL", "MedleyDB")
        .map(|proj| proj.data_dir().join(DATABASE_FILE))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
}
