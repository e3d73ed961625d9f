pub mod model;

use std::{collections::BTreeMap, fs, path::Path};

use medley_core::{
    Component, DatasetVersion, MultiTrack, RawIndex, StemIndex, Track, parse_index,
    validate_rankings,
};
use medley_paths::{MedleyPaths, MelodyLevel, split_track_id};
use tracing::{debug, trace, warn};

use crate::{
    annotations::read_rankings,
    error::{Error, Result},
    taxonomy::F0TypeTable,
};

use model::{MetadataFile, StemEntry};

/// Coeficientes de mezcla: `{fichero de mezcla: {fichero de stem: coeficiente}}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MixingCoefficients {
    entries: BTreeMap<String, BTreeMap<String, f64>>,
}

impl MixingCoefficients {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let entries = serde_yaml::from_str::<Option<BTreeMap<String, BTreeMap<String, f64>>>>(&text)
            .map_err(|source| Error::Yaml {
                path: path.to_path_buf(),
                source,
            })?
            .unwrap_or_default();
        Ok(MixingCoefficients { entries })
    }

    pub fn get(&self, mix_file: &str, stem_file: &str) -> Option<f64> {
        self.entries.get(mix_file)?.get(stem_file).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recursos compartidos que necesita el cargador de multipistas.
#[derive(Debug, Clone, Copy)]
pub struct MetadataContext<'a> {
    pub paths: &'a MedleyPaths,
    pub f0_types: &'a F0TypeTable,
    pub mixing: &'a MixingCoefficients,
}

impl MetadataContext<'_> {
    /// Carga y completa una multipista a partir de su YAML de metadatos.
    pub fn load_multitrack(
        &self,
        track_id: &str,
        dataset_version: Option<DatasetVersion>,
    ) -> Result<MultiTrack> {
        let (artist, title) = split_track_id(track_id)?;
        let paths = self.paths;

        let metadata_path = paths.metadata_file(track_id);
        if !metadata_path.exists() {
            return Err(Error::TrackNotFound(track_id.to_string(), metadata_path));
        }

        trace!("Leyendo metadatos {}", metadata_path.display());
        let text = fs::read_to_string(&metadata_path)?;
        let metadata: MetadataFile = serde_yaml::from_str(&text).map_err(|source| Error::Yaml {
            path: metadata_path.clone(),
            source,
        })?;

        let mut mtrack = MultiTrack {
            track_id: track_id.to_string(),
            artist: metadata.artist.clone().unwrap_or_else(|| artist.to_string()),
            title: metadata.title.clone().unwrap_or_else(|| title.to_string()),
            album: metadata.album.clone(),
            composer: metadata.composer.clone(),
            producer: metadata.producer.clone(),
            website: metadata.website.clone(),
            genre: metadata.genre.clone(),
            origin: metadata.origin.clone(),
            is_excerpt: metadata.excerpt,
            has_bleed: metadata.has_bleed,
            is_instrumental: metadata.instrumental,
            metadata_version: metadata.version.clone(),
            dataset_version,

            audio_path: paths.multitrack_audio_dir(track_id),
            mix_path: paths.mix_file(track_id),
            stem_dir: paths.stem_dir(track_id),
            raw_dir: paths.raw_dir(track_id),
            metadata_path,
            melody1_path: paths.melody_file(track_id, MelodyLevel::One),
            melody2_path: paths.melody_file(track_id, MelodyLevel::Two),
            melody3_path: paths.melody_file(track_id, MelodyLevel::Three),
            intervals_path: paths.intervals_file(track_id),
            ranking_path: paths.ranking_file(track_id),
            activation_conf_path: paths.activation_conf_file(track_id),
            source_id_path: paths.source_id_file(track_id),
            ..Default::default()
        };

        let rankings = read_rankings(&mtrack.ranking_path)?.unwrap_or_default();
        validate_rankings(&rankings).map_err(|source| Error::InvalidRankings {
            track_id: track_id.to_string(),
            source,
        })?;

        let mix_name = mtrack
            .mix_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for (key, entry) in &metadata.stems {
            let stem_idx = parse_index(key)?;
            require_filename(&mtrack.metadata_path, key, &entry.filename)?;
            let stem = self.build_stem(&mtrack, stem_idx, entry, &mix_name, &rankings)?;

            let mut raws: BTreeMap<RawIndex, Track> = BTreeMap::new();
            for (raw_key, raw_entry) in &entry.raw {
                let raw_idx = parse_index(raw_key)?;
                require_filename(&mtrack.metadata_path, &format!("{key}/{raw_key}"), &raw_entry.filename)?;
                let raw = Track {
                    track_id: track_id.to_string(),
                    f0_type: self.f0_types.lookup_all(&raw_entry.instrument),
                    instrument: raw_entry.instrument.clone(),
                    file_path: mtrack.raw_dir.join(&raw_entry.filename),
                    component: Component::None,
                    stem_idx,
                    raw_idx: Some(raw_idx),
                    mix_path: mtrack.mix_path.clone(),
                    ..Default::default()
                };
                raws.insert(raw_idx, raw);
            }

            if !raws.is_empty() {
                mtrack.raw_audio.insert(stem_idx, raws);
            }
            mtrack.stems.insert(stem_idx, stem);
        }

        for stem_idx in rankings.keys() {
            if !mtrack.stems.contains_key(stem_idx) {
                warn!("{}: ranking para el stem {} que no existe", track_id, stem_idx);
            }
        }

        mtrack.has_melody = mtrack.melody1_path.exists() || !rankings.is_empty();
        mtrack.melody_rankings = rankings;
        mtrack.duration = read_duration(&mtrack.mix_path)?;

        debug!(
            "Multipista {} cargada: {} stems, {} raws",
            track_id,
            mtrack.num_stems(),
            mtrack.num_raw()
        );
        Ok(mtrack)
    }

    fn build_stem(
        &self,
        mtrack: &MultiTrack,
        stem_idx: StemIndex,
        entry: &StemEntry,
        mix_name: &str,
        rankings: &BTreeMap<StemIndex, u32>,
    ) -> Result<Track> {
        let file_path = mtrack.stem_dir.join(&entry.filename);

        let pitch_path = Some(self.paths.pitch_file(&file_path)).filter(|p| p.exists());
        let pitch_pyin_path = Some(self.paths.pitch_pyin_file(&file_path)).filter(|p| p.exists());

        let mixing_coefficient = self.mixing.get(mix_name, &entry.filename);
        if mixing_coefficient.is_none() {
            trace!("Sin coeficiente de mezcla para {}", entry.filename);
        }

        Ok(Track {
            track_id: mtrack.track_id.clone(),
            f0_type: self.f0_types.lookup_all(&entry.instrument),
            instrument: entry.instrument.clone(),
            file_path,
            component: entry.component.parse()?,
            stem_idx,
            raw_idx: None,
            mix_path: mtrack.mix_path.clone(),
            pitch_path,
            pitch_pyin_path,
            ranking: rankings.get(&stem_idx).copied(),
            mixing_coefficient,
        })
    }
}

fn require_filename(metadata_path: &Path, key: &str, filename: &str) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(Error::MalformedMetadata {
            path: metadata_path.to_path_buf(),
            reason: format!("{key} has no filename"),
        });
    }
    Ok(())
}

/// Duración de un WAV en segundos; `None` si el fichero no existe.
pub fn read_duration(path: &Path) -> Result<Option<f64>> {
    if !path.exists() {
        return Ok(None);
    }
    let reader = hound::WavReader::open(path)?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return Ok(None);
    }
    Ok(Some(f64::from(reader.duration()) / f64::from(rate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn mixing_coefficients_lookup() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("mixing_coefficients.yaml");
        fs::write(
            &path,
            "A_B_MIX.wav:\n  A_B_STEM_01.wav: 0.5\n  A_B_STEM_02.wav: 1.25\n",
        )
        .unwrap();

        let coefs = MixingCoefficients::load(&path).unwrap();
        assert_eq!(coefs.len(), 1);
        assert_eq!(coefs.get("A_B_MIX.wav", "A_B_STEM_02.wav"), Some(1.25));
        assert_eq!(coefs.get("A_B_MIX.wav", "A_B_STEM_03.wav"), None);
    }

    #[test]
    fn duration_from_header() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..4000 {
            writer.write_sample(0i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        assert_eq!(read_duration(&path).unwrap(), Some(0.5));
        assert_eq!(read_duration(&PathBuf::from("/does/not/exist.wav")).unwrap(), None);
    }
}
