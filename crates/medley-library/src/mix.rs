use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use derive_builder::Builder;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use medley_core::{F0Type, MultiTrack, StemIndex};
use medley_paths::ensure_parent;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

const DEFAULT_MAX_MELODY_STEMS: usize = 100;

/// Opciones para una mezcla nueva a partir de los stems.
#[derive(Debug, Clone, PartialEq, Default, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct MixOptions {
    /// Stems a incluir; `None` = todos.
    pub stem_indices: Option<Vec<StemIndex>>,
    /// Pesos que sustituyen al coeficiente estimado.
    pub alternate_weights: BTreeMap<StemIndex, f64>,
    /// Ficheros que sustituyen al stem original.
    pub alternate_files: BTreeMap<StemIndex, PathBuf>,
    /// Ficheros extra `(ruta, peso)` añadidos al final.
    pub additional_files: Vec<(PathBuf, f64)>,
}

/// Ficheros y pesos de una mezcla, en el mismo orden.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MixPlan {
    pub files: Vec<PathBuf>,
    pub weights: Vec<f64>,
}

impl MixPlan {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn mix_plan(mtrack: &MultiTrack, options: &MixOptions) -> Result<MixPlan> {
    let indices: Vec<StemIndex> = match &options.stem_indices {
        Some(indices) => indices.clone(),
        None => mtrack.stems.keys().copied().collect(),
    };

    let mut plan = MixPlan::default();
    for idx in indices {
        let stem = mtrack
            .get_stem(idx)
            .ok_or_else(|| Error::StemNotFound(mtrack.track_id.clone(), idx))?;

        let file = options
            .alternate_files
            .get(&idx)
            .cloned()
            .unwrap_or_else(|| stem.file_path.clone());

        let weight = match options.alternate_weights.get(&idx) {
            Some(w) => *w,
            None => stem.mixing_coefficient.unwrap_or_else(|| {
                warn!(
                    "{}: stem {} sin coeficiente de mezcla, se usa 1.0",
                    mtrack.track_id, idx
                );
                1.0
            }),
        };

        plan.files.push(file);
        plan.weights.push(weight);
    }

    for (file, weight) in &options.additional_files {
        plan.files.push(file.clone());
        plan.weights.push(*weight);
    }

    Ok(plan)
}

/// Opciones de la mezcla de stems de melodía.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
#[builder(default)]
pub struct MelodyMixOptions {
    pub max_melody_stems: usize,
    pub include_percussion: bool,
    pub require_mono: bool,
}

impl Default for MelodyMixOptions {
    fn default() -> Self {
        MelodyMixOptions {
            max_melody_stems: DEFAULT_MAX_MELODY_STEMS,
            include_percussion: false,
            require_mono: false,
        }
    }
}

/// Stems de melodía por orden de ranking, opcionalmente con la percusión.
pub fn melody_stems_plan(mtrack: &MultiTrack, options: &MelodyMixOptions) -> Result<MixPlan> {
    let mut indices: Vec<StemIndex> = mtrack
        .ranked_stems()
        .into_iter()
        .take(options.max_melody_stems)
        .filter(|(_, stem)| !options.require_mono || stem.f0_type.contains(&F0Type::Monophonic))
        .map(|(_, stem)| stem.stem_idx)
        .collect();

    if options.include_percussion {
        indices.extend(
            mtrack
                .stems
                .values()
                .filter(|s| s.f0_type.contains(&F0Type::Unpitched))
                .map(|s| s.stem_idx),
        );
    }

    let options = MixOptions {
        stem_indices: Some(indices),
        ..Default::default()
    };
    mix_plan(mtrack, &options)
}

/// Stems monofónicos (y opcionalmente los de percusión).
pub fn mono_stems_plan(mtrack: &MultiTrack, include_percussion: bool) -> Result<MixPlan> {
    let indices: Vec<StemIndex> = mtrack
        .stems
        .values()
        .filter(|s| {
            s.f0_type.contains(&F0Type::Monophonic)
                || (include_percussion && s.f0_type.contains(&F0Type::Unpitched))
        })
        .map(|s| s.stem_idx)
        .collect();

    let options = MixOptions {
        stem_indices: Some(indices),
        ..Default::default()
    };
    mix_plan(mtrack, &options)
}

/// Suma ponderada de los ficheros del plan. Todos deben compartir frecuencia
/// de muestreo y número de canales; los más cortos se completan con silencio.
/// La salida es WAV en coma flotante de 32 bits.
pub fn render(plan: &MixPlan, output: &Path) -> Result<()> {
    if plan.is_empty() {
        return Err(Error::IncompatibleAudio {
            path: output.to_path_buf(),
            reason: "nothing to mix".to_string(),
        });
    }

    let mut reference: Option<(PathBuf, WavSpec)> = None;
    let mut mixed: Vec<f32> = Vec::new();

    for (file, weight) in plan.files.iter().zip(&plan.weights) {
        let reader = WavReader::open(file)?;
        let spec = reader.spec();

        match &reference {
            None => reference = Some((file.clone(), spec)),
            Some((first, expected)) => {
                if spec.sample_rate != expected.sample_rate || spec.channels != expected.channels {
                    return Err(Error::IncompatibleAudio {
                        path: file.clone(),
                        reason: format!(
                            "{} Hz / {} ch, but {} is {} Hz / {} ch",
                            spec.sample_rate,
                            spec.channels,
                            first.display(),
                            expected.sample_rate,
                            expected.channels
                        ),
                    });
                }
            }
        }

        let samples = read_normalized(reader)?;
        debug!("Mezclando {} ({} muestras, peso {})", file.display(), samples.len(), weight);

        if samples.len() > mixed.len() {
            mixed.resize(samples.len(), 0.0);
        }
        let weight = *weight as f32;
        for (acc, sample) in mixed.iter_mut().zip(samples) {
            *acc += weight * sample;
        }
    }

    let Some((_, spec)) = reference else {
        return Ok(());
    };
    let out_spec = WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    ensure_parent(output)?;
    let mut writer = WavWriter::create(output, out_spec)?;
    for sample in &mixed {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    info!("Mezcla de {} ficheros escrita en {}", plan.len(), output.display());
    Ok(())
}

fn read_normalized<R: std::io::Read>(mut reader: WavReader<R>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    match spec.sample_format {
        SampleFormat::Float => Ok(reader.samples::<f32>().collect::<std::result::Result<_, _>>()?),
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale).map_err(Error::from))
                .collect()
        }
    }
}

/// Planifica y renderiza una mezcla de la multipista.
pub fn mix_multitrack(mtrack: &MultiTrack, output: &Path, options: &MixOptions) -> Result<MixPlan> {
    let plan = mix_plan(mtrack, options)?;
    render(&plan, output)?;
    Ok(plan)
}
