pub mod melody;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, Trim};
use medley_core::{
    ActivationConf, Annotation, MelodyInterval, MultiTrack, SourceSegment, StemIndex, Track,
    parse_index,
};
use medley_paths::MelodyLevel;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};

/// Lee un fichero de anotación delimitado como filas de `f64`.
///
/// Devuelve `Ok(None)` si el fichero no existe. Con `num_cols` solo se
/// conservan las primeras columnas de cada fila; con `header` la primera
/// fila se guarda como cabecera.
pub fn read_annotation_file(
    path: &Path,
    num_cols: Option<usize>,
    header: bool,
    delimiter: u8,
) -> Result<Option<Annotation>> {
    if !path.exists() {
        trace!("Anotación inexistente: {}", path.display());
        return Ok(None);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(header)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let header = if header {
        Some(reader.headers()?.iter().map(str::to_string).collect())
    } else {
        None
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let take = num_cols.unwrap_or(record.len());
        let row = record
            .iter()
            .take(take)
            .map(|field| parse_float(path, field))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    Ok(Some(Annotation { header, rows }))
}

fn parse_float(path: &Path, field: &str) -> Result<f64> {
    field.parse::<f64>().map_err(|_| Error::MalformedAnnotation {
        path: path.to_path_buf(),
        reason: format!("`{field}` is not a number"),
    })
}

fn malformed(path: &Path, reason: impl Into<String>) -> Error {
    Error::MalformedAnnotation {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Pitch (tiempo, f0) de un stem.
pub fn read_pitch(path: &Path) -> Result<Option<Annotation>> {
    read_annotation_file(path, Some(2), false, b',')
}

/// Melodía 1 y 2 tienen dos columnas; la 3 una columna por stem con ranking.
pub fn read_melody(path: &Path, level: MelodyLevel) -> Result<Option<Annotation>> {
    match level {
        MelodyLevel::One | MelodyLevel::Two => read_annotation_file(path, Some(2), false, b','),
        MelodyLevel::Three => read_annotation_file(path, None, false, b','),
    }
}

/// Intervalos de melodía: `inicio<TAB>fin<TAB>stem`.
pub fn read_intervals(path: &Path) -> Result<Option<Vec<MelodyInterval>>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut intervals = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < 3 {
            return Err(malformed(path, "expected `start end stem_idx`"));
        }
        intervals.push(MelodyInterval {
            start: parse_float(path, &record[0])?,
            end: parse_float(path, &record[1])?,
            stem_idx: parse_index(&record[2])?,
        });
    }
    Ok(Some(intervals))
}

/// Rankings de melodía: `fichero de stem,rank`. El índice sale del sufijo `_NN` del fichero.
pub fn read_rankings(path: &Path) -> Result<Option<BTreeMap<StemIndex, u32>>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut rankings = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < 2 {
            return Err(malformed(path, "expected `stem_file,rank`"));
        }
        let stem_idx = stem_index_from_filename(&record[0])
            .ok_or_else(|| malformed(path, format!("no stem index in `{}`", &record[0])))?;
        let rank = record[1]
            .parse::<f64>()
            .ok()
            .filter(|r| r.fract() == 0.0 && *r >= 1.0)
            .map(|r| r as u32)
            .ok_or_else(|| malformed(path, format!("invalid rank `{}`", &record[1])))?;
        rankings.insert(stem_idx, rank);
    }
    Ok(Some(rankings))
}

static STEM_SUFFIX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(\d+)(?:\.[^.]*)?$").unwrap());

/// `Artist_Song_STEM_03.wav` -> 3
pub fn stem_index_from_filename(name: &str) -> Option<StemIndex> {
    let base = Path::new(name).file_name()?.to_string_lossy().into_owned();
    let caps = STEM_SUFFIX_REGEX.captures(&base)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Confianza de activación: cabecera `time,S01,S02,...`.
pub fn read_activation_conf(path: &Path) -> Result<Option<ActivationConf>> {
    let Some(annotation) = read_annotation_file(path, None, true, b',')? else {
        return Ok(None);
    };

    let header = annotation.header.unwrap_or_default();
    let stems = header
        .iter()
        .skip(1)
        .map(|h| parse_index(h))
        .collect::<std::result::Result<Vec<StemIndex>, _>>()?;

    let mut times = Vec::with_capacity(annotation.rows.len());
    let mut values = Vec::with_capacity(annotation.rows.len());
    for mut row in annotation.rows {
        if row.is_empty() {
            continue;
        }
        times.push(row.remove(0));
        values.push(row);
    }

    Ok(Some(ActivationConf {
        stems,
        times,
        values,
    }))
}

/// Identificación de fuentes: `start_time,end_time,instrument_label`, con cabecera opcional.
pub fn read_source_id(path: &Path) -> Result<Option<Vec<SourceSegment>>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut segments = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record: StringRecord = record?;
        if record.len() < 3 {
            return Err(malformed(path, "expected `start_time,end_time,instrument_label`"));
        }
        if i == 0 && record[0].parse::<f64>().is_err() {
            continue;
        }
        segments.push(SourceSegment {
            start_time: parse_float(path, &record[0])?,
            end_time: parse_float(path, &record[1])?,
            instrument_label: record[2].to_string(),
        });
    }
    Ok(Some(segments))
}

/// Carga perezosa de las anotaciones de un stem.
pub trait TrackAnnotations {
    fn pitch_annotation(&self) -> Result<Option<Annotation>>;
    fn pitch_pyin_annotation(&self) -> Result<Option<Annotation>>;
}

impl TrackAnnotations for Track {
    fn pitch_annotation(&self) -> Result<Option<Annotation>> {
        read_optional(self.pitch_path.as_ref(), read_pitch)
    }

    fn pitch_pyin_annotation(&self) -> Result<Option<Annotation>> {
        read_optional(self.pitch_pyin_path.as_ref(), read_pitch)
    }
}

/// Carga perezosa de las anotaciones de una multipista.
pub trait MultiTrackAnnotations {
    fn melody_annotation(&self, level: MelodyLevel) -> Result<Option<Annotation>>;
    fn melody_intervals(&self) -> Result<Option<Vec<MelodyInterval>>>;
    fn activation_conf(&self) -> Result<Option<ActivationConf>>;
    fn activation_conf_from_stem(&self, stem_idx: StemIndex) -> Result<Option<Vec<(f64, f64)>>>;
    fn source_id(&self) -> Result<Option<Vec<SourceSegment>>>;
}

impl MultiTrackAnnotations for MultiTrack {
    fn melody_annotation(&self, level: MelodyLevel) -> Result<Option<Annotation>> {
        let path = match level {
            MelodyLevel::One => &self.melody1_path,
            MelodyLevel::Two => &self.melody2_path,
            MelodyLevel::Three => &self.melody3_path,
        };
        read_melody(path, level)
    }

    fn melody_intervals(&self) -> Result<Option<Vec<MelodyInterval>>> {
        read_intervals(&self.intervals_path)
    }

    fn activation_conf(&self) -> Result<Option<ActivationConf>> {
        read_activation_conf(&self.activation_conf_path)
    }

    fn activation_conf_from_stem(&self, stem_idx: StemIndex) -> Result<Option<Vec<(f64, f64)>>> {
        Ok(self
            .activation_conf()?
            .and_then(|conf| conf.from_stem(stem_idx)))
    }

    fn source_id(&self) -> Result<Option<Vec<SourceSegment>>> {
        read_source_id(&self.source_id_path)
    }
}

fn read_optional<T>(
    path: Option<&PathBuf>,
    read: impl FnOnce(&Path) -> Result<Option<T>>,
) -> Result<Option<T>> {
    match path {
        Some(path) => read(path),
        None => Ok(None),
    }
}
