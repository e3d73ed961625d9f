use std::{io, path::PathBuf};

/// Errores genéricos del crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// El identificador no tiene la forma `<Artista>_<Título>`
    #[error("Invalid track id: {0}. Expected `<Artist>_<Title>`.")]
    InvalidTrackId(String),

    /// Índice de stem/raw fuera de rango para el formato `NN`
    #[error("Invalid file index: {0}. Must be between 1 and 99.")]
    InvalidIndex(u32),

    /// La carpeta existe pero no se puede escribir en ella
    #[error("No write permission for {}", .0.display())]
    NotWritable(PathBuf),

    /// Error de IO al crear dirs o comprobar permisos
    #[error(transparent)]
    Io(#[from] io::Error),
}
