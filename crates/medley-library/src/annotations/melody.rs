//! Generación de las anotaciones de melodía 1, 2 y 3 a partir del pitch de los stems.

use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use medley_core::MultiTrack;
use medley_paths::{MelodyLevel, MedleyPaths, check_writable, ensure_parent};
use tracing::{info, warn};

use crate::{
    annotations::{TrackAnnotations, read_intervals},
    error::{Error, Result},
};

/// Salto entre frames, en muestras.
pub const HOP: f64 = 256.0;
/// Frecuencia de muestreo de referencia.
pub const FS: f64 = 44100.0;

/// Una fila por frame: `[tiempo, f0_1, f0_2, ...]`.
pub type MelodySequence = Vec<Vec<f64>>;

pub fn time_stamps(duration: f64) -> Vec<f64> {
    let n = (duration * FS / HOP).ceil().max(0.0) as usize;
    (0..n).map(|i| i as f64 * (HOP / FS)).collect()
}

/// Secuencia a cero con la columna de tiempos rellena.
pub fn blank_melody_sequence(duration: f64) -> MelodySequence {
    time_stamps(duration)
        .into_iter()
        .map(|t| vec![t, 0.0])
        .collect()
}

/// Índice de frame más cercano; los empates van al par.
pub fn sec_to_idx(seconds: f64) -> i64 {
    (seconds * FS / HOP).round_ties_even() as i64
}

/// Escribe los valores de `f0` en la columna `dim` de `melody`, solo para los
/// frames en `[start_t, end_t)`. `start_t` se recorta a 0 y `end_t` a la
/// duración; `None` significa hasta el final.
pub fn add_sequence_to_melody(
    duration: f64,
    f0: &[Vec<f64>],
    melody: &mut MelodySequence,
    dim: usize,
    start_t: f64,
    end_t: Option<f64>,
) {
    let start_t = start_t.max(0.0);
    let end_t = end_t.map_or(duration, |t| t.min(duration));

    let start_idx = sec_to_idx(start_t);
    let end_idx = sec_to_idx(end_t);

    for point in f0 {
        let (Some(time), Some(freq)) = (point.first(), point.get(1)) else {
            continue;
        };
        let idx = sec_to_idx(*time);
        if idx < start_idx || idx >= end_idx || idx < 0 {
            continue;
        }
        if let Some(row) = melody.get_mut(idx as usize) {
            if row.len() <= dim {
                row.resize(dim + 1, 0.0);
            }
            row[dim] = *freq;
        }
    }
}

fn require_duration(mtrack: &MultiTrack) -> Result<f64> {
    mtrack
        .duration
        .ok_or_else(|| Error::AudioUnavailable(mtrack.track_id.clone()))
}

/// Melodía 1: el pitch del stem predominante. `None` si no hay rankings.
pub fn create_melody1(mtrack: &MultiTrack) -> Result<Option<MelodySequence>> {
    let Some(stem) = mtrack.predominant_stem() else {
        return Ok(None);
    };
    let duration = require_duration(mtrack)?;

    let mut melody = blank_melody_sequence(duration);
    if let Some(f0) = stem.pitch_annotation()? {
        add_sequence_to_melody(duration, &f0.rows, &mut melody, 1, 0.0, None);
    } else {
        warn!("El stem {} no tiene anotación de pitch", stem.stem_idx);
    }
    Ok(Some(melody))
}

/// Melodía 2: el pitch de cada stem dentro de sus intervalos. `None` si no hay fichero de intervalos.
pub fn create_melody2(mtrack: &MultiTrack) -> Result<Option<MelodySequence>> {
    let Some(intervals) = read_intervals(&mtrack.intervals_path)? else {
        return Ok(None);
    };
    let duration = require_duration(mtrack)?;

    let mut melody = blank_melody_sequence(duration);
    for interval in intervals {
        let stem = mtrack
            .get_stem(interval.stem_idx)
            .ok_or_else(|| Error::StemNotFound(mtrack.track_id.clone(), interval.stem_idx))?;

        match stem.pitch_annotation()? {
            Some(f0) => add_sequence_to_melody(
                duration,
                &f0.rows,
                &mut melody,
                1,
                interval.start,
                Some(interval.end),
            ),
            None => warn!("El stem {} no tiene anotación de pitch", interval.stem_idx),
        }
    }
    Ok(Some(melody))
}

/// Melodía 3: una columna por stem, en orden de ranking. `None` si no hay rankings.
pub fn create_melody3(mtrack: &MultiTrack) -> Result<Option<MelodySequence>> {
    let ranked = mtrack.ranked_stems();
    if ranked.is_empty() {
        return Ok(None);
    }
    let duration = require_duration(mtrack)?;

    let width = ranked.len() + 1;
    let mut melody: MelodySequence = time_stamps(duration)
        .into_iter()
        .map(|t| {
            let mut row = vec![0.0; width];
            row[0] = t;
            row
        })
        .collect();

    for (dim, (_, stem)) in ranked.iter().enumerate() {
        match stem.pitch_annotation()? {
            Some(f0) => add_sequence_to_melody(duration, &f0.rows, &mut melody, dim + 1, 0.0, None),
            None => warn!("El stem {} no tiene anotación de pitch", stem.stem_idx),
        }
    }
    Ok(Some(melody))
}

/// Escribe una secuencia como CSV sin cabecera.
pub fn write_melody_csv(path: &Path, melody: &MelodySequence) -> Result<()> {
    ensure_parent(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        check_writable(parent)?;
    }
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    for row in melody {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Genera las tres melodías y escribe las que existan. Con `out_dir` se escriben
/// todas en esa carpeta; si no, en su ubicación canónica del catálogo.
pub fn generate_melodies(
    mtrack: &MultiTrack,
    paths: &MedleyPaths,
    out_dir: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let melodies = [
        (MelodyLevel::One, create_melody1(mtrack)?),
        (MelodyLevel::Two, create_melody2(mtrack)?),
        (MelodyLevel::Three, create_melody3(mtrack)?),
    ];

    let mut written = Vec::new();
    for (level, melody) in melodies {
        let Some(melody) = melody else {
            info!("Melodía {} vacía para {}", level.number(), mtrack.track_id);
            continue;
        };
        let canonical = paths.melody_file(&mtrack.track_id, level);
        let path = match (out_dir, canonical.file_name()) {
            (Some(dir), Some(name)) => dir.join(name),
            _ => canonical,
        };
        info!("Escribiendo melodía {} en {}", level.number(), path.display());
        write_melody_csv(&path, &melody)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_follows_hop() {
        let stamps = time_stamps(1.0);
        assert_eq!(stamps.len(), (44100.0f64 / 256.0).ceil() as usize);
        assert_eq!(stamps[0], 0.0);
        assert!((stamps[1] - 256.0 / 44100.0).abs() < 1e-12);
        assert!(time_stamps(0.0).is_empty());
    }

    #[test]
    fn sec_to_idx_rounds() {
        assert_eq!(sec_to_idx(0.0), 0);
        assert_eq!(sec_to_idx(256.0 / 44100.0), 1);
        assert_eq!(sec_to_idx(1.4 * 256.0 / 44100.0), 1);
        assert_eq!(sec_to_idx(1.6 * 256.0 / 44100.0), 2);
    }

    #[test]
    fn sec_to_idx_half_hops_round_to_even() {
        let step = HOP / FS;
        assert_eq!(sec_to_idx(0.5 * step), 0);
        assert_eq!(sec_to_idx(1.5 * step), 2);
        assert_eq!(sec_to_idx(2.5 * step), 2);
        assert_eq!(sec_to_idx(3.5 * step), 4);
    }

    #[test]
    fn add_sequence_respects_window() {
        let step = HOP / FS;
        let duration = 10.0 * step;
        let mut melody = blank_melody_sequence(duration);
        assert_eq!(melody.len(), 10);

        let f0: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 * step, 100.0 + i as f64]).collect();
        add_sequence_to_melody(duration, &f0, &mut melody, 1, 2.0 * step, Some(5.0 * step));

        let written: Vec<usize> = melody
            .iter()
            .enumerate()
            .filter(|(_, row)| row[1] > 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(written, vec![2, 3, 4]);
        assert_eq!(melody[3][1], 103.0);
    }

    #[test]
    fn add_sequence_clamps_bounds() {
        let step = HOP / FS;
        let duration = 4.0 * step;
        let mut melody = blank_melody_sequence(duration);
        let f0: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64 * step, 50.0]).collect();

        add_sequence_to_melody(duration, &f0, &mut melody, 1, -3.0, Some(100.0));
        assert!(melody.iter().all(|row| row[1] == 50.0));
        assert_eq!(melody.len(), 4);
    }

    #[test]
    fn add_sequence_widens_rows_for_new_dims() {
        let step = HOP / FS;
        let mut melody = blank_melody_sequence(2.0 * step);
        add_sequence_to_melody(2.0 * step, &[vec![step, 440.0]], &mut melody, 3, 0.0, None);
        assert_eq!(melody[1], vec![step, 0.0, 0.0, 440.0]);
    }

    #[test]
    fn writes_csv_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("X_MELODY1.csv");
        write_melody_csv(&path, &vec![vec![0.0, 0.0], vec![0.5, 220.0]]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "0,0\n0.5,220\n");
    }
}
