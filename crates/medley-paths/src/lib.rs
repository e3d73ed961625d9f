//! Crate `medley_paths`: rutas y convenciones de nombres de MedleyDB

mod errors;
mod fs_utils;
mod paths;

pub use errors::Error;
pub use fs_utils::{check_writable, ensure_dir, ensure_parent};
pub use paths::{ENV_CATALOG_DIR, ENV_DATA_DIR, MedleyPaths, MelodyLevel, path_basedir, split_track_id};

use once_cell::sync::Lazy;

/// Singleton global, leído del entorno la primera vez que se usa
pub static PATHS: Lazy<MedleyPaths> = Lazy::new(MedleyPaths::from_env);

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    /// RAII-guard que setea y luego restaura (o elimina) una variable de entorno.
    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn new(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            // set_var es unsafe en edition 2024:
            unsafe { std::env::set_var(key, value) };
            EnvVarGuard {
                key: key.to_owned(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(val) => unsafe { std::env::set_var(&self.key, val) },
                None => unsafe { std::env::remove_var(&self.key) },
            }
        }
    }

    fn fixture_paths() -> MedleyPaths {
        MedleyPaths::with_roots(Some(PathBuf::from("/data")), "/catalog")
    }

    #[test]
    fn from_env_reads_both_roots() {
        let data = tempdir().unwrap();
        let catalog = tempdir().unwrap();
        std::fs::create_dir(data.path().join("Audio")).unwrap();

        let _data = EnvVarGuard::new(ENV_DATA_DIR, data.path().to_str().unwrap());
        let _catalog = EnvVarGuard::new(ENV_CATALOG_DIR, catalog.path().to_str().unwrap());

        let paths = MedleyPaths::from_env();
        assert_eq!(paths.data_root.as_deref(), Some(data.path()));
        assert_eq!(paths.audio_dir, data.path().join("Audio"));
        assert_eq!(paths.metadata_dir, catalog.path().join("Metadata"));
        assert_eq!(paths.database_file, data.path().join("database.sql"));
        assert!(paths.audio_available());
    }

    #[test]
    fn audio_unavailable_without_data_root() {
        let paths = MedleyPaths::with_roots(None, "/catalog");
        assert!(!paths.audio_available());
        assert_eq!(paths.audio_dir, PathBuf::from("Audio"));
    }

    #[test]
    fn audio_paths_follow_naming_convention() {
        let paths = fixture_paths();

        assert_eq!(
            paths.mix_file("NightPanther_Fire"),
            Path::new("/data/Audio/NightPanther_Fire/NightPanther_Fire_MIX.wav")
        );
        assert_eq!(
            paths.stem_file("NightPanther_Fire", 8).unwrap(),
            Path::new("/data/Audio/NightPanther_Fire/NightPanther_Fire_STEMS/NightPanther_Fire_STEM_08.wav")
        );
        assert_eq!(
            paths.raw_file("NightPanther_Fire", 8, 1).unwrap(),
            Path::new("/data/Audio/NightPanther_Fire/NightPanther_Fire_RAW/NightPanther_Fire_RAW_08_01.wav")
        );
    }

    #[test]
    fn stem_index_out_of_range() {
        let paths = fixture_paths();
        match paths.stem_file("A_B", 100).unwrap_err() {
            Error::InvalidIndex(i) => assert_eq!(i, 100),
            other => panic!("Esperaba InvalidIndex, recibí {other:?}"),
        }
        assert!(paths.raw_file("A_B", 1, 0).is_err());
    }

    #[test]
    fn annotation_paths() {
        let paths = fixture_paths();

        assert_eq!(
            paths.melody_file("LizNelson_Rainfall", MelodyLevel::Three),
            Path::new("/catalog/Annotations/Melody/Melody3/LizNelson_Rainfall_MELODY3.csv")
        );
        assert_eq!(
            paths.ranking_file("LizNelson_Rainfall"),
            Path::new("/catalog/Annotations/Melody/Rankings/LizNelson_Rainfall_RANKING.txt")
        );
        assert_eq!(
            paths.pitch_file(Path::new("/x/LizNelson_Rainfall_STEM_01.wav")),
            Path::new("/catalog/Annotations/Pitch/LizNelson_Rainfall_STEM_01.csv")
        );
        assert_eq!(
            paths.tracklist_file("V1"),
            Path::new("/catalog/resources/tracklist_v1.txt")
        );
    }

    #[test]
    fn split_track_id_on_first_underscore() {
        assert_eq!(split_track_id("NightPanther_Fire").unwrap(), ("NightPanther", "Fire"));
        assert_eq!(
            split_track_id("MusicDelta_80sRock_Live").unwrap(),
            ("MusicDelta", "80sRock_Live")
        );
        assert!(split_track_id("RickAstley").is_err());
        assert!(split_track_id("_Title").is_err());
    }

    #[test]
    fn basedir_ignores_trailing_separator() {
        assert_eq!(path_basedir(Path::new("this/is/a/path")).as_deref(), Some("path"));
        assert_eq!(path_basedir(Path::new("this/is/a/second/path/")).as_deref(), Some("path"));
        assert_eq!(
            path_basedir(Path::new("this/is/a/path/with/an/ending/file.txt")).as_deref(),
            Some("file.txt")
        );
    }

    #[test]
    fn ensure_dir_creates_nested_and_is_writable() {
        let tmp = tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        check_writable(&nested).unwrap();

        let file = tmp.path().join("c").join("d").join("out.csv");
        ensure_parent(&file).unwrap();
        assert!(file.parent().unwrap().is_dir());
    }
}
