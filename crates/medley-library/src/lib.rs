//! Acceso al dataset multipista MedleyDB: metadatos, anotaciones, consultas,
//! mezclas y espejo SQL del catálogo.

pub mod annotations;
pub mod dataset;
pub mod error;
pub mod library_config;
pub mod metadata;
pub mod mix;
pub mod query;
pub mod split;
pub mod storage;
pub mod taxonomy;

pub use annotations::{MultiTrackAnnotations, TrackAnnotations, read_annotation_file};
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use library_config::{DatabaseBackend, LibraryConfig, LibraryConfigBuilder};
pub use mix::{MelodyMixOptions, MixOptions, MixOptionsBuilder, MixPlan, mix_multitrack};
pub use split::{Split, artist_conditional_split};
pub use storage::{CatalogStorage, ExportSummary, export_dataset};
pub use taxonomy::{F0TypeTable, TaxonNode, Taxonomy};

pub use medley_core::{
    Annotation, Component, DatasetVersion, F0Type, MultiTrack, RawIndex, StemIndex, Track,
};
pub use medley_paths::{MedleyPaths, MelodyLevel, PATHS};
