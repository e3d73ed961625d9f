use std::{fmt::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use medley_library::{
    Dataset, LibraryConfig, MultiTrack, annotations::melody::generate_melodies, storage::export_dataset,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "medleydb")]
#[command(about = "Herramientas para el dataset multipista MedleyDB")]
#[command(version)]
struct Cli {
    /// Fichero de configuración TOML.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Genera el espejo SQL del catálogo.
    Export {
        output: Option<PathBuf>,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Muestra una multipista.
    Show { track_id: String },

    /// Lista los ficheros de stem de un instrumento.
    Files { instrument: String },

    /// Particiones train/test por artista.
    Split {
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        #[arg(long, default_value = "1")]
        splits: usize,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Regenera las anotaciones de melodía de una multipista.
    Melody {
        track_id: String,

        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LibraryConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let dataset = Dataset::from_config(&config)?;

    match cli.command {
        Commands::Export { output, limit } => {
            let output = output
                .or_else(|| config.database_file().map(PathBuf::from))
                .unwrap_or_else(|| dataset.paths().database_file.clone());

            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.cyan} [{bar:40.green/dim}] {pos}/{len} {msg:.dim}")?
                    .progress_chars("█▓▒░ "),
            );

            let summary = export_dataset(&dataset, &output, limit, |done, total, id| {
                pb.set_length(total as u64);
                pb.set_position(done as u64);
                pb.set_message(id.to_string());
            })?;
            pb.finish_and_clear();

            println!(
                "Exported {} multitracks ({} skipped, {} instruments) to {}",
                summary.tracks,
                summary.skipped,
                summary.instruments,
                summary.output.display()
            );
        }

        Commands::Show { track_id } => {
            let mtrack = dataset.multitrack(&track_id)?;
            print!("{}", describe(&mtrack));
        }

        Commands::Files { instrument } => {
            for file in dataset.files_for_instrument(&instrument, None)? {
                println!("{}", file.display());
            }
        }

        Commands::Split {
            test_size,
            splits,
            seed,
        } => {
            let splits = dataset.artist_conditional_split(
                &config.dataset_versions,
                test_size,
                splits,
                seed,
            )?;
            println!("{}", serde_json::to_string_pretty(&splits)?);
        }

        Commands::Melody { track_id, out_dir } => {
            let mtrack = dataset.multitrack(&track_id)?;
            let written = generate_melodies(&mtrack, dataset.paths(), out_dir.as_deref())?;
            info!("{} ficheros de melodía escritos", written.len());
            for path in written {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn describe(mtrack: &MultiTrack) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - {}", mtrack.artist, mtrack.title);
    let _ = writeln!(out, "  genre:        {}", mtrack.genre);
    if let Some(version) = mtrack.dataset_version {
        let _ = writeln!(out, "  version:      {version}");
    }
    let _ = writeln!(out, "  excerpt:      {}", mtrack.is_excerpt);
    let _ = writeln!(out, "  bleed:        {}", mtrack.has_bleed);
    let _ = writeln!(out, "  instrumental: {}", mtrack.is_instrumental);
    let _ = writeln!(out, "  melody:       {}", mtrack.has_melody);
    if let Some(duration) = mtrack.duration {
        let _ = writeln!(out, "  duration:     {duration:.2}s");
    }
    let _ = writeln!(out, "  stems ({}):", mtrack.num_stems());
    for stem in mtrack.stems.values() {
        let rank = stem.ranking.map(|r| format!(" rank {r}")).unwrap_or_default();
        let _ = writeln!(
            out,
            "    S{:02} [{}] {}{}",
            stem.stem_idx,
            stem.component,
            stem.instrument.join(", "),
            rank
        );
        for raw in mtrack.raw_from_stem(stem.stem_idx) {
            let _ = writeln!(
                out,
                "      R{:02} {}",
                raw.raw_idx.unwrap_or_default(),
                raw.instrument.join(", ")
            );
        }
    }
    out
}
