use std::path::PathBuf;

use medley_core::{DatasetVersion, F0Type, MultiTrack};

/// Multipistas en las que algún stem tiene el instrumento.
pub fn with_instrument<'a>(
    mtracks: impl IntoIterator<Item = &'a MultiTrack>,
    instrument: &'a str,
) -> impl Iterator<Item = &'a MultiTrack> {
    mtracks
        .into_iter()
        .filter(move |m| m.stems.values().any(|s| s.has_instrument(instrument)))
}

pub fn in_versions<'a>(
    mtracks: impl IntoIterator<Item = &'a MultiTrack>,
    versions: &'a [DatasetVersion],
) -> impl Iterator<Item = &'a MultiTrack> {
    mtracks.into_iter().filter(move |m| {
        versions.is_empty() || m.dataset_version.is_some_and(|v| versions.contains(&v))
    })
}

pub fn with_melody<'a>(
    mtracks: impl IntoIterator<Item = &'a MultiTrack>,
) -> impl Iterator<Item = &'a MultiTrack> {
    mtracks.into_iter().filter(|m| m.has_melody)
}

pub fn without_bleed<'a>(
    mtracks: impl IntoIterator<Item = &'a MultiTrack>,
) -> impl Iterator<Item = &'a MultiTrack> {
    mtracks.into_iter().filter(|m| !m.has_bleed)
}

/// Multipistas con al menos un stem de ese tipo de f0.
pub fn with_f0_type<'a>(
    mtracks: impl IntoIterator<Item = &'a MultiTrack>,
    f0_type: F0Type,
) -> impl Iterator<Item = &'a MultiTrack> {
    mtracks
        .into_iter()
        .filter(move |m| m.stems.values().any(|s| s.f0_type.contains(&f0_type)))
}

/// Rutas de los stems que contienen el instrumento, en orden de multipista y stem.
///
/// No valida la etiqueta; ver `Dataset::files_for_instrument`.
pub fn stem_files_with_instrument<'a>(
    mtracks: impl IntoIterator<Item = &'a MultiTrack>,
    instrument: &str,
) -> Vec<PathBuf> {
    mtracks
        .into_iter()
        .flat_map(|m| m.stems.values())
        .filter(|s| s.has_instrument(instrument))
        .map(|s| s.file_path.clone())
        .collect()
}
