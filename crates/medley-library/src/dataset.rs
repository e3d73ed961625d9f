use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::PathBuf,
};

use medley_core::{DatasetVersion, MultiTrack};
use medley_paths::{MedleyPaths, PATHS, split_track_id};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    library_config::LibraryConfig,
    metadata::{MetadataContext, MixingCoefficients},
    query,
    split::{ArtistIndex, Split, artist_conditional_split, load_artist_index},
    taxonomy::{F0TypeTable, Taxonomy},
};

/// Punto de entrada al dataset: rutas, recursos y listas de pistas.
#[derive(Debug, Clone)]
pub struct Dataset {
    paths: MedleyPaths,
    taxonomy: Taxonomy,
    f0_types: F0TypeTable,
    mixing: MixingCoefficients,
    tracklists: BTreeMap<DatasetVersion, Vec<String>>,
    versions: HashMap<String, DatasetVersion>,
}

impl Dataset {
    /// Abre el dataset y carga los recursos. Los recursos que falten se
    /// sustituyen por tablas vacías con un aviso.
    pub fn open(paths: MedleyPaths) -> Result<Self> {
        let taxonomy = if paths.taxonomy_file.exists() {
            Taxonomy::load(&paths.taxonomy_file)?
        } else {
            warn!("No existe la taxonomía en {}", paths.taxonomy_file.display());
            Taxonomy::default()
        };

        let f0_types = if paths.f0_type_file.exists() {
            F0TypeTable::load(&paths.f0_type_file)?
        } else {
            warn!("No existe la tabla de f0 en {}", paths.f0_type_file.display());
            F0TypeTable::default()
        };

        let mixing = if paths.mixing_coefficients_file.exists() {
            MixingCoefficients::load(&paths.mixing_coefficients_file)?
        } else {
            warn!(
                "No existen coeficientes de mezcla en {}",
                paths.mixing_coefficients_file.display()
            );
            MixingCoefficients::default()
        };

        let mut tracklists = BTreeMap::new();
        let mut versions = HashMap::new();
        for version in DatasetVersion::ALL {
            let file = paths.tracklist_file(version.as_str());
            if !file.exists() {
                debug!("Sin lista de pistas para {}: {}", version, file.display());
                continue;
            }
            let ids: Vec<String> = fs::read_to_string(&file)?
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            for id in &ids {
                versions.entry(id.clone()).or_insert(*version);
            }
            tracklists.insert(*version, ids);
        }

        info!(
            "Dataset abierto en {} ({} pistas en listas)",
            paths.catalog_root.display(),
            versions.len()
        );

        Ok(Dataset {
            paths,
            taxonomy,
            f0_types,
            mixing,
            tracklists,
            versions,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::open(PATHS.clone())
    }

    pub fn from_config(config: &LibraryConfig) -> Result<Self> {
        Self::open(config.paths())
    }

    pub fn paths(&self) -> &MedleyPaths {
        &self.paths
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn f0_types(&self) -> &F0TypeTable {
        &self.f0_types
    }

    fn context(&self) -> MetadataContext<'_> {
        MetadataContext {
            paths: &self.paths,
            f0_types: &self.f0_types,
            mixing: &self.mixing,
        }
    }

    /// Versión del dataset en la que aparece el id, si está en alguna lista.
    pub fn dataset_version(&self, track_id: &str) -> Option<DatasetVersion> {
        self.versions.get(track_id).copied()
    }

    pub fn multitrack(&self, track_id: &str) -> Result<MultiTrack> {
        self.context()
            .load_multitrack(track_id, self.dataset_version(track_id))
    }

    pub fn track_list(&self, version: DatasetVersion) -> &[String] {
        self.tracklists
            .get(&version)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Ids de las versiones pedidas, sin repetir; vacío = todas.
    pub fn track_ids(&self, versions: &[DatasetVersion]) -> Vec<String> {
        let wanted: &[DatasetVersion] = if versions.is_empty() {
            DatasetVersion::ALL
        } else {
            versions
        };

        let mut ids = Vec::new();
        for version in wanted {
            for id in self.track_list(*version) {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }

    /// Carga perezosa de las multipistas de las versiones pedidas.
    pub fn all_multitracks<'a>(
        &'a self,
        versions: &[DatasetVersion],
    ) -> impl Iterator<Item = Result<MultiTrack>> + use<'a> {
        self.multitracks(self.track_ids(versions))
    }

    pub fn multitracks<'a, I, S>(&'a self, track_ids: I) -> impl Iterator<Item = Result<MultiTrack>> + 'a
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: 'a,
        S: AsRef<str>,
    {
        track_ids
            .into_iter()
            .map(move |id| self.multitrack(id.as_ref()))
    }

    /// Multipistas con anotación de melodía.
    pub fn melody_multitracks(&self, versions: &[DatasetVersion]) -> Result<Vec<MultiTrack>> {
        let mut out = Vec::new();
        for mtrack in self.all_multitracks(versions) {
            let mtrack = mtrack?;
            if mtrack.has_melody {
                out.push(mtrack);
            }
        }
        Ok(out)
    }

    /// Ids con carpeta de audio en disco.
    pub fn available_track_ids(&self) -> Result<Vec<String>> {
        if !self.paths.audio_available() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.paths.audio_dir)
            .min_depth(1)
            .max_depth(1)
        {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if split_track_id(&name).is_ok() {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn is_valid_instrument(&self, instrument: &str) -> bool {
        self.taxonomy.is_valid_instrument(instrument)
    }

    /// Ficheros de stem con el instrumento. Sin `mtracks` se recorren todas las multipistas.
    pub fn files_for_instrument(
        &self,
        instrument: &str,
        mtracks: Option<&[MultiTrack]>,
    ) -> Result<Vec<PathBuf>> {
        if !self.is_valid_instrument(instrument) {
            return Err(Error::InvalidInstrument(instrument.to_string()));
        }

        match mtracks {
            Some(mtracks) => Ok(query::stem_files_with_instrument(mtracks, instrument)),
            None => {
                let mut files = Vec::new();
                for mtrack in self.all_multitracks(&[]) {
                    let mtrack = mtrack?;
                    files.extend(query::stem_files_with_instrument([&mtrack], instrument));
                }
                Ok(files)
            }
        }
    }

    pub fn artist_index(&self) -> Result<Option<ArtistIndex>> {
        let path = &self.paths.artist_index_file;
        if !path.exists() {
            return Ok(None);
        }
        load_artist_index(path).map(Some)
    }

    /// Split por artista de las pistas de las versiones pedidas.
    pub fn artist_conditional_split(
        &self,
        versions: &[DatasetVersion],
        test_size: f64,
        num_splits: usize,
        seed: Option<u64>,
    ) -> Result<Vec<Split>> {
        let ids = self.track_ids(versions);
        let index = self.artist_index()?;
        artist_conditional_split(&ids, test_size, num_splits, seed, index.as_ref())
    }
}
