use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::fields::{Component, F0Type};

pub type StemIndex = u32;
pub type RawIndex = u32;

/// Un stem o una grabación raw dentro de una multipista.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    /// Id de la multipista a la que pertenece.
    pub track_id: String,
    /// Uno o más instrumentos de la taxonomía.
    pub instrument: Vec<String>,
    pub f0_type: Vec<F0Type>,
    pub file_path: PathBuf,
    pub component: Component,
    pub stem_idx: StemIndex,
    /// `None` para stems.
    pub raw_idx: Option<RawIndex>,
    pub mix_path: PathBuf,
    /// Anotación manual de pitch, si existe.
    pub pitch_path: Option<PathBuf>,
    /// Estimación de pitch con pYIN, si existe.
    pub pitch_pyin_path: Option<PathBuf>,
    /// Posición en el ranking de melodía (1 = predominante).
    pub ranking: Option<u32>,
    pub mixing_coefficient: Option<f64>,
}

impl Track {
    pub fn is_stem(&self) -> bool {
        self.raw_idx.is_none()
    }

    pub fn has_instrument(&self, instrument: &str) -> bool {
        self.instrument.iter().any(|i| i == instrument)
    }

    pub fn is_monophonic(&self) -> bool {
        !self.f0_type.is_empty() && self.f0_type.iter().all(|f| *f == F0Type::Monophonic)
    }

    pub fn is_unpitched(&self) -> bool {
        !self.f0_type.is_empty() && self.f0_type.iter().all(|f| *f == F0Type::Unpitched)
    }

    /// Nombre del fichero de audio sin carpeta.
    pub fn file_name(&self) -> Option<String> {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}
