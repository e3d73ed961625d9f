use serde::{Deserialize, Serialize};

use crate::StemIndex;

/// Serie temporal leída de un CSV de anotación: una fila por frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Annotation {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<f64>>,
}

impl Annotation {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Annotation { header: None, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Número de columnas de la primera fila.
    pub fn num_cols(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Pares (tiempo, valor) usando la columna `col` como valor.
    pub fn time_value_pairs(&self, col: usize) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| Some((*row.first()?, *row.get(col)?)))
            .collect()
    }
}

/// Matriz de confianza de activación: una columna por stem.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivationConf {
    pub stems: Vec<StemIndex>,
    pub times: Vec<f64>,
    /// `values[t][i]` es la confianza del stem `stems[i]` en `times[t]`.
    pub values: Vec<Vec<f64>>,
}

impl ActivationConf {
    pub fn from_stem(&self, stem_idx: StemIndex) -> Option<Vec<(f64, f64)>> {
        let col = self.stems.iter().position(|s| *s == stem_idx)?;
        Some(
            self.times
                .iter()
                .zip(self.values.iter())
                .filter_map(|(t, row)| row.get(col).map(|v| (*t, *v)))
                .collect(),
        )
    }
}

/// Intervalo en el que un stem lleva la melodía.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelodyInterval {
    pub start: f64,
    pub end: f64,
    pub stem_idx: StemIndex,
}

/// Segmento de la anotación de identificación de fuentes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub instrument_label: String,
}
