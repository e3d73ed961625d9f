use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    fields::{Component, DatasetVersion},
    track::{RawIndex, StemIndex, Track},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    #[error("Duplicate ranking {rank} (stems {first} and {second})")]
    Duplicate { rank: u32, first: StemIndex, second: StemIndex },

    #[error("Rankings are not a contiguous sequence starting at 1: {0:?}")]
    NotContiguous(Vec<u32>),
}

/// La multipista: mezcla, stems, grabaciones raw y metadatos de una canción.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultiTrack {
    pub track_id: String,
    pub artist: String,
    pub title: String,

    // --- Metadatos ---
    pub album: Option<String>,
    pub composer: Vec<String>,
    pub producer: Vec<String>,
    pub website: Vec<String>,
    pub genre: String,
    pub origin: String,
    pub is_excerpt: bool,
    pub has_bleed: bool,
    pub is_instrumental: bool,
    /// Campo `version` del YAML de metadatos.
    pub metadata_version: Option<String>,
    /// Lista de pistas en la que aparece el id.
    pub dataset_version: Option<DatasetVersion>,

    // --- Rutas ---
    pub audio_path: PathBuf,
    pub mix_path: PathBuf,
    pub stem_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub melody1_path: PathBuf,
    pub melody2_path: PathBuf,
    pub melody3_path: PathBuf,
    pub intervals_path: PathBuf,
    pub ranking_path: PathBuf,
    pub activation_conf_path: PathBuf,
    pub source_id_path: PathBuf,

    // --- Contenido ---
    pub stems: BTreeMap<StemIndex, Track>,
    pub raw_audio: BTreeMap<StemIndex, BTreeMap<RawIndex, Track>>,
    pub melody_rankings: BTreeMap<StemIndex, u32>,
    pub has_melody: bool,
    /// Duración de la mezcla en segundos (solo si el audio está disponible).
    pub duration: Option<f64>,
}

impl MultiTrack {
    pub fn stem_instruments(&self) -> Vec<&str> {
        self.stems
            .values()
            .flat_map(|s| s.instrument.iter().map(String::as_str))
            .collect()
    }

    pub fn raw_instruments(&self) -> Vec<&str> {
        self.raw_tracks()
            .flat_map(|r| r.instrument.iter().map(String::as_str))
            .collect()
    }

    /// Todas las grabaciones raw, ordenadas por (stem, raw).
    pub fn raw_tracks(&self) -> impl Iterator<Item = &Track> {
        self.raw_audio.values().flat_map(|raws| raws.values())
    }

    pub fn melody_stems(&self) -> Vec<&Track> {
        self.stems_with_component(Component::Melody)
    }

    pub fn bass_stems(&self) -> Vec<&Track> {
        self.stems_with_component(Component::Bass)
    }

    fn stems_with_component(&self, component: Component) -> Vec<&Track> {
        self.stems
            .values()
            .filter(|s| s.component == component)
            .collect()
    }

    pub fn num_stems(&self) -> usize {
        self.stems.len()
    }

    pub fn num_raw(&self) -> usize {
        self.raw_audio.values().map(BTreeMap::len).sum()
    }

    pub fn stem_filepaths(&self) -> Vec<&PathBuf> {
        self.stems.values().map(|s| &s.file_path).collect()
    }

    pub fn raw_filepaths(&self) -> Vec<&PathBuf> {
        self.raw_tracks().map(|r| &r.file_path).collect()
    }

    pub fn raw_from_stem(&self, stem_idx: StemIndex) -> Vec<&Track> {
        self.raw_audio
            .get(&stem_idx)
            .map(|raws| raws.values().collect())
            .unwrap_or_default()
    }

    pub fn get_stem(&self, stem_idx: StemIndex) -> Option<&Track> {
        self.stems.get(&stem_idx)
    }

    pub fn get_raw(&self, stem_idx: StemIndex, raw_idx: RawIndex) -> Option<&Track> {
        self.raw_audio.get(&stem_idx)?.get(&raw_idx)
    }

    /// El stem con ranking 1, si hay rankings.
    pub fn predominant_stem(&self) -> Option<&Track> {
        self.melody_rankings
            .iter()
            .find(|(_, rank)| **rank == 1)
            .and_then(|(idx, _)| self.stems.get(idx))
    }

    /// Stems ordenados por ranking ascendente.
    pub fn ranked_stems(&self) -> Vec<(u32, &Track)> {
        let mut ranked: Vec<(u32, &Track)> = self
            .melody_rankings
            .iter()
            .filter_map(|(idx, rank)| self.stems.get(idx).map(|s| (*rank, s)))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked
    }
}

/// Comprueba que los rankings no se repiten y forman la secuencia 1..=N.
pub fn validate_rankings(rankings: &BTreeMap<StemIndex, u32>) -> Result<(), RankingError> {
    let mut seen: BTreeMap<u32, StemIndex> = BTreeMap::new();
    for (stem, rank) in rankings {
        if let Some(first) = seen.insert(*rank, *stem) {
            return Err(RankingError::Duplicate {
                rank: *rank,
                first,
                second: *stem,
            });
        }
    }

    let ranks: Vec<u32> = seen.keys().copied().collect();
    let contiguous = ranks.iter().zip(1u32..).all(|(rank, expected)| *rank == expected);
    if !contiguous {
        return Err(RankingError::NotContiguous(ranks));
    }

    Ok(())
}
