mod embedded;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use medley_core::MultiTrack;
use rusqlite::Connection;
use tracing::{info, trace, warn};

use embedded::migrations::runner;

use crate::{
    dataset::Dataset,
    error::{Error, Result},
    library_config::{DatabaseBackend, LibraryConfig},
    taxonomy::Taxonomy,
};

pub use queries::{StemRow, TrackRow};

/// Espejo relacional del catálogo en SQLite.
#[derive(Debug, Clone)]
pub struct CatalogStorage {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogStorage {
    /// Abre una base existente. Con `raising`, que no exista es un error.
    pub fn open(path: &Path, raising: bool) -> Result<Self> {
        if !path.exists() && raising {
            return Err(Error::DatabaseMissing(path.to_path_buf()));
        }
        medley_paths::ensure_parent(path)?;
        info!("Abriendo conexión con la base de datos en {}", path.display());
        let mut conn = Connection::open(path)?;
        Self::initialize_connection(&mut conn, true)?;

        Ok(CatalogStorage {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Base efímera en memoria.
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        Self::initialize_connection(&mut conn, false)?;

        Ok(CatalogStorage {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_config(config: &LibraryConfig, raising: bool) -> Result<Self> {
        match &config.database {
            DatabaseBackend::Sqlite(path) => Self::open(path, raising),
            DatabaseBackend::Memory => Self::in_memory(),
        }
    }

    fn initialize_connection(conn: &mut Connection, on_disk: bool) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        if on_disk {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
        }
        conn.pragma_update(None, "busy_timeout", 5000)?;

        info!("Ejecutando migraciones de la base de datos...");

        let report = runner().run(conn)?;
        for migration in report.applied_migrations() {
            trace!("Migración aplicada: {:?}", migration);
        }

        info!("Migraciones completadas exitosamente.");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CatalogStorage {
    /// Vuelca el árbol de taxones y sus instrumentos. Devuelve el número de instrumentos.
    pub fn import_taxonomy(&self, taxonomy: &Taxonomy) -> Result<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let mut count = 0;
        for root in &taxonomy.roots {
            count += queries::walk_taxonomy(&tx, root, None)?;
        }

        tx.commit()?;
        info!("Taxonomía importada: {} instrumentos", count);
        Ok(count)
    }

    /// Inserta (o reemplaza) una multipista con sus stems, raws, melodías y créditos.
    pub fn import_multitrack(&self, mtrack: &MultiTrack) -> Result<i64> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM track WHERE name = ?1", [&mtrack.track_id])?;
        let track_id = queries::insert_track(&tx, mtrack)?;

        for stem in mtrack.stems.values() {
            let stem_id = queries::insert_stem(&tx, track_id, stem)?;
            for instrument in &stem.instrument {
                let instrument_id = queries::find_or_create_instrument(&tx, instrument)?;
                queries::link(&tx, "stem_instrument", ("stem_id", stem_id), ("instrument_id", instrument_id))?;
            }

            for raw in mtrack.raw_from_stem(stem.stem_idx) {
                let raw_id = queries::insert_raw(&tx, stem_id, raw)?;
                for instrument in &raw.instrument {
                    let instrument_id = queries::find_or_create_instrument(&tx, instrument)?;
                    queries::link(&tx, "raw_instrument", ("raw_id", raw_id), ("instrument_id", instrument_id))?;
                }
            }
        }

        for (level, path) in [
            (1, &mtrack.melody1_path),
            (2, &mtrack.melody2_path),
            (3, &mtrack.melody3_path),
        ] {
            if path.exists() {
                queries::insert_melody(&tx, track_id, level, path)?;
            }
        }

        for name in mtrack.composer.iter().filter(|n| !n.is_empty()) {
            let composer_id = queries::find_or_create_named(&tx, "composer", name)?;
            queries::link(&tx, "track_composer", ("track_id", track_id), ("composer_id", composer_id))?;
        }
        for name in mtrack.producer.iter().filter(|n| !n.is_empty()) {
            let producer_id = queries::find_or_create_named(&tx, "producer", name)?;
            queries::link(&tx, "track_producer", ("track_id", track_id), ("producer_id", producer_id))?;
        }

        tx.commit()?;
        trace!("Multipista {} importada con id {}", mtrack.track_id, track_id);
        Ok(track_id)
    }

    pub fn track(&self, name: &str) -> Result<Option<TrackRow>> {
        queries::get_track(&self.lock(), name)
    }

    pub fn track_names(&self) -> Result<Vec<String>> {
        queries::get_track_names(&self.lock())
    }

    pub fn stems_of(&self, name: &str) -> Result<Vec<StemRow>> {
        queries::get_stems(&self.lock(), name)
    }

    pub fn tracks_with_instrument(&self, instrument: &str) -> Result<Vec<String>> {
        queries::get_tracks_with_instrument(&self.lock(), instrument)
    }

    pub fn taxon_of(&self, instrument: &str) -> Result<Option<String>> {
        queries::get_taxon_of(&self.lock(), instrument)
    }

    pub fn composers_of(&self, name: &str) -> Result<Vec<String>> {
        queries::get_credits(&self.lock(), "composer", "track_composer", name)
    }

    pub fn producers_of(&self, name: &str) -> Result<Vec<String>> {
        queries::get_credits(&self.lock(), "producer", "track_producer", name)
    }
}

/// Resumen de una exportación.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub instruments: usize,
    pub tracks: usize,
    pub skipped: usize,
}

/// Genera el espejo SQL del dataset desde cero en `output`.
///
/// Borra el fichero previo. `on_track(hechas, total, id)` se llama tras cada multipista.
pub fn export_dataset<F>(
    dataset: &Dataset,
    output: &Path,
    limit: Option<usize>,
    mut on_track: F,
) -> Result<ExportSummary>
where
    F: FnMut(usize, usize, &str),
{
    medley_paths::ensure_parent(output)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        medley_paths::check_writable(parent)?;
    }

    if output.exists() {
        info!("Eliminando base de datos previa en {}", output.display());
        fs::remove_file(output)?;
    }

    let storage = CatalogStorage::open(output, false)?;
    let instruments = storage.import_taxonomy(dataset.taxonomy())?;

    let mut ids = dataset.track_ids(&[]);
    if let Some(limit) = limit {
        ids.truncate(limit);
    }

    let total = ids.len();
    let mut summary = ExportSummary {
        output: output.to_path_buf(),
        instruments,
        ..Default::default()
    };

    for (i, id) in ids.iter().enumerate() {
        match dataset.multitrack(id) {
            Ok(mtrack) => {
                storage.import_multitrack(&mtrack)?;
                summary.tracks += 1;
            }
            Err(e) => {
                warn!("No se pudo exportar {}: {}", id, e);
                summary.skipped += 1;
            }
        }
        on_track(i + 1, total, id);
    }

    info!(
        "Exportación completada: {} multipistas ({} omitidas) en {}",
        summary.tracks,
        summary.skipped,
        output.display()
    );
    Ok(summary)
}

mod queries {
    use std::path::Path;

    use medley_core::{MultiTrack, Track};
    use rusqlite::{Connection, OptionalExtension, Transaction, params};

    use crate::{error::Result, taxonomy::TaxonNode};

    #[derive(Debug, Clone, PartialEq)]
    pub struct TrackRow {
        pub id: i64,
        pub name: String,
        pub artist: String,
        pub title: String,
        pub genre: String,
        pub has_bleed: bool,
        pub has_melody: bool,
        pub dataset_version: Option<String>,
        pub duration: Option<f64>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct StemRow {
        pub id: i64,
        pub stem_idx: u32,
        pub filename: String,
        pub component: String,
        pub rank: Option<u32>,
        pub instruments: Vec<String>,
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Inserta el taxón y, recursivamente, sus hijos e instrumentos.
    pub fn walk_taxonomy(tx: &Transaction, node: &TaxonNode, parent: Option<i64>) -> Result<usize> {
        tx.execute(
            "INSERT INTO taxon (name, parent_id) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET parent_id = excluded.parent_id",
            params![node.name, parent],
        )?;
        let taxon_id: i64 =
            tx.query_row("SELECT id FROM taxon WHERE name = ?1", [&node.name], |row| row.get(0))?;

        let mut count = 0;
        let mut stmt = tx.prepare(
            "INSERT INTO instrument (name, taxon_id) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET taxon_id = excluded.taxon_id",
        )?;
        for instrument in &node.instruments {
            stmt.execute(params![instrument, taxon_id])?;
            count += 1;
        }

        for child in &node.children {
            count += walk_taxonomy(tx, child, Some(taxon_id))?;
        }
        Ok(count)
    }

    pub fn find_or_create_instrument(tx: &Transaction, name: &str) -> Result<i64> {
        find_or_create_named(tx, "instrument", name)
    }

    /// Busca por nombre en una tabla `(id, name UNIQUE)` y la crea si no existe.
    pub fn find_or_create_named(tx: &Transaction, table: &str, name: &str) -> Result<i64> {
        let existing: Option<i64> = tx
            .query_row(
                &format!("SELECT id FROM {table} WHERE name = ?1"),
                [name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        tx.execute(&format!("INSERT INTO {table} (name) VALUES (?1)"), [name])?;
        Ok(tx.last_insert_rowid())
    }

    /// Inserta una fila en una tabla de enlace `(owner_col, other_col)`.
    pub fn link(
        tx: &Transaction,
        table: &str,
        (owner_col, owner): (&str, i64),
        (other_col, other): (&str, i64),
    ) -> Result<()> {
        tx.execute(
            &format!("INSERT OR IGNORE INTO {table} ({owner_col}, {other_col}) VALUES (?1, ?2)"),
            params![owner, other],
        )?;
        Ok(())
    }

    pub fn insert_track(tx: &Transaction, mtrack: &MultiTrack) -> Result<i64> {
        tx.execute(
            "INSERT INTO track (name, artist, title, album, genre, origin, website, excerpt, has_bleed,
                instrumental, has_melody, version, dataset_version, data_dir, metadata_filename,
                mix_filename, stem_dir, raw_dir, duration)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                mtrack.track_id,
                mtrack.artist,
                mtrack.title,
                mtrack.album,
                mtrack.genre,
                mtrack.origin,
                mtrack.website.join(", "),
                mtrack.is_excerpt,
                mtrack.has_bleed,
                mtrack.is_instrumental,
                mtrack.has_melody,
                mtrack.metadata_version,
                mtrack.dataset_version.map(|v| v.as_str()),
                mtrack.track_id,
                file_name(&mtrack.metadata_path),
                file_name(&mtrack.mix_path),
                file_name(&mtrack.stem_dir),
                file_name(&mtrack.raw_dir),
                mtrack.duration,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    pub fn insert_stem(tx: &Transaction, track_id: i64, stem: &Track) -> Result<i64> {
        tx.execute(
            "INSERT INTO stem (track_id, stem_idx, filename, component, rank, mixing_coefficient)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                track_id,
                stem.stem_idx,
                file_name(&stem.file_path),
                stem.component.as_str(),
                stem.ranking,
                stem.mixing_coefficient,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    pub fn insert_raw(tx: &Transaction, stem_id: i64, raw: &Track) -> Result<i64> {
        tx.execute(
            "INSERT INTO raw (stem_id, raw_idx, filename) VALUES (?1, ?2, ?3)",
            params![stem_id, raw.raw_idx, file_name(&raw.file_path)],
        )?;
        Ok(tx.last_insert_rowid())
    }

    pub fn insert_melody(tx: &Transaction, track_id: i64, level: u8, path: &Path) -> Result<()> {
        tx.execute(
            "INSERT INTO melody (track_id, level, filename) VALUES (?1, ?2, ?3)",
            params![track_id, level, file_name(path)],
        )?;
        Ok(())
    }

    pub fn get_track(conn: &Connection, name: &str) -> Result<Option<TrackRow>> {
        let row = conn
            .query_row(
                "SELECT id, name, artist, title, genre, has_bleed, has_melody, dataset_version, duration
                 FROM track WHERE name = ?1",
                [name],
                |row| {
                    Ok(TrackRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        artist: row.get(2)?,
                        title: row.get(3)?,
                        genre: row.get(4)?,
                        has_bleed: row.get(5)?,
                        has_melody: row.get(6)?,
                        dataset_version: row.get(7)?,
                        duration: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn get_track_names(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM track ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn get_stems(conn: &Connection, name: &str) -> Result<Vec<StemRow>> {
        let mut stmt = conn.prepare(
            "SELECT s.id, s.stem_idx, s.filename, s.component, s.rank
             FROM stem s JOIN track t ON s.track_id = t.id
             WHERE t.name = ?1
             ORDER BY s.stem_idx",
        )?;
        let mut stems = stmt
            .query_map([name], |row| {
                Ok(StemRow {
                    id: row.get(0)?,
                    stem_idx: row.get(1)?,
                    filename: row.get(2)?,
                    component: row.get(3)?,
                    rank: row.get(4)?,
                    instruments: Vec::new(),
                })
            })?
            .collect::<Result<Vec<StemRow>, _>>()?;

        let mut stmt_instruments = conn.prepare(
            "SELECT i.name FROM instrument i
             JOIN stem_instrument si ON si.instrument_id = i.id
             WHERE si.stem_id = ?1
             ORDER BY i.name",
        )?;
        for stem in &mut stems {
            stem.instruments = stmt_instruments
                .query_map([stem.id], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
        }
        Ok(stems)
    }

    pub fn get_tracks_with_instrument(conn: &Connection, instrument: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT t.name FROM track t
             JOIN stem s ON s.track_id = t.id
             JOIN stem_instrument si ON si.stem_id = s.id
             JOIN instrument i ON i.id = si.instrument_id
             WHERE i.name = ?1
             ORDER BY t.name",
        )?;
        let names = stmt
            .query_map([instrument], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn get_taxon_of(conn: &Connection, instrument: &str) -> Result<Option<String>> {
        let taxon = conn
            .query_row(
                "SELECT t.name FROM instrument i JOIN taxon t ON t.id = i.taxon_id WHERE i.name = ?1",
                [instrument],
                |row| row.get(0),
            )
            .optional()?;
        Ok(taxon)
    }

    pub fn get_credits(conn: &Connection, table: &str, link: &str, name: &str) -> Result<Vec<String>> {
        let fk = format!("{table}_id");
        let mut stmt = conn.prepare(&format!(
            "SELECT c.name FROM {table} c
             JOIN {link} l ON l.{fk} = c.id
             JOIN track t ON t.id = l.track_id
             WHERE t.name = ?1
             ORDER BY c.name"
        ))?;
        let names = stmt
            .query_map([name], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medley_core::{Component, Track};

    fn fixture() -> MultiTrack {
        let mut mtrack = MultiTrack {
            track_id: "Artist_Song".into(),
            artist: "Artist".into(),
            title: "Song".into(),
            genre: "Pop".into(),
            composer: vec!["Ann".into(), "Bob".into()],
            producer: vec!["Pat".into()],
            mix_path: PathBuf::from("Artist_Song_MIX.wav"),
            has_melody: true,
            ..Default::default()
        };
        mtrack.stems.insert(
            1,
            Track {
                track_id: "Artist_Song".into(),
                instrument: vec!["violin".into()],
                file_path: PathBuf::from("Artist_Song_STEM_01.wav"),
                component: Component::Melody,
                stem_idx: 1,
                ranking: Some(1),
                ..Default::default()
            },
        );
        mtrack.raw_audio.entry(1).or_default().insert(
            1,
            Track {
                instrument: vec!["violin".into()],
                file_path: PathBuf::from("Artist_Song_RAW_01_01.wav"),
                stem_idx: 1,
                raw_idx: Some(1),
                ..Default::default()
            },
        );
        mtrack
    }

    fn taxonomy() -> Taxonomy {
        Taxonomy::from_yaml_str("strings:\n  bowed:\n    - violin\n    - cello\n").unwrap()
    }

    #[test]
    fn open_missing_file_with_raising_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing.sql");
        assert!(matches!(
            CatalogStorage::open(&path, true),
            Err(Error::DatabaseMissing(p)) if p == path
        ));
        assert!(CatalogStorage::open(&path, false).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn taxonomy_and_multitrack_round_trip() {
        let storage = CatalogStorage::in_memory().unwrap();
        assert_eq!(storage.import_taxonomy(&taxonomy()).unwrap(), 2);
        storage.import_multitrack(&fixture()).unwrap();

        let track = storage.track("Artist_Song").unwrap().unwrap();
        assert_eq!(track.artist, "Artist");
        assert!(track.has_melody);

        let stems = storage.stems_of("Artist_Song").unwrap();
        assert_eq!(stems.len(), 1);
        assert_eq!(stems[0].component, "melody");
        assert_eq!(stems[0].rank, Some(1));
        assert_eq!(stems[0].instruments, vec!["violin"]);

        assert_eq!(storage.tracks_with_instrument("violin").unwrap(), vec!["Artist_Song"]);
        assert!(storage.tracks_with_instrument("cello").unwrap().is_empty());
        assert_eq!(storage.taxon_of("violin").unwrap().as_deref(), Some("bowed"));
        assert_eq!(storage.composers_of("Artist_Song").unwrap(), vec!["Ann", "Bob"]);
        assert_eq!(storage.producers_of("Artist_Song").unwrap(), vec!["Pat"]);
    }

    #[test]
    fn reimport_replaces_track() {
        let storage = CatalogStorage::in_memory().unwrap();
        storage.import_multitrack(&fixture()).unwrap();
        storage.import_multitrack(&fixture()).unwrap();
        assert_eq!(storage.track_names().unwrap(), vec!["Artist_Song"]);
        assert_eq!(storage.stems_of("Artist_Song").unwrap().len(), 1);
    }

    #[test]
    fn unknown_instrument_is_created_without_taxon() {
        let storage = CatalogStorage::in_memory().unwrap();
        let mut mtrack = fixture();
        mtrack.stems.get_mut(&1).unwrap().instrument = vec!["theremin".into()];
        storage.import_multitrack(&mtrack).unwrap();
        assert_eq!(storage.tracks_with_instrument("theremin").unwrap(), vec!["Artist_Song"]);
        assert_eq!(storage.taxon_of("theremin").unwrap(), None);
    }
}
