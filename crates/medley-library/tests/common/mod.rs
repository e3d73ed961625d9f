#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use hound::{SampleFormat, WavSpec, WavWriter};
use medley_library::{Dataset, MedleyPaths};
use tempfile::TempDir;

pub const SAMPLE_RATE: u32 = 44100;
/// Muestras de cada fichero de audio del fixture (0.1 s).
pub const NUM_SAMPLES: usize = 4410;
pub const HOP_SECONDS: f64 = 256.0 / 44100.0;

pub const MAIN_TRACK: &str = "Artist_Song";
pub const OTHER_TRACK: &str = "Other_Tune";

const TAXONOMY: &str = r#"
percussion:
  drums:
    - drum set
voice:
  - female singer
  - male singer
strings:
  bowed:
    - violin
    - cello
"#;

const F0_TYPES: &str = r#"{
  "drum set": ["u"],
  "female singer": ["m"],
  "male singer": ["m"],
  "violin": ["m"],
  "cello": ["m"]
}"#;

const MIXING: &str = r#"
Artist_Song_MIX.wav:
  Artist_Song_STEM_01.wav: 0.5
  Artist_Song_STEM_02.wav: 1.0
"#;

const MAIN_METADATA: &str = r#"
album: First
artist: Artist
title: Song
composer: [Ann, Bob]
producer: Pat
website: http://example.com
genre: Pop
origin: Studio
excerpt: no
has_bleed: no
instrumental: no
mix_filename: Artist_Song_MIX.wav
raw_dir: Artist_Song_RAW
stem_dir: Artist_Song_STEMS
version: 1.2
stems:
  S01:
    component: ''
    filename: Artist_Song_STEM_01.wav
    instrument: drum set
    raw:
      R01:
        filename: Artist_Song_RAW_01_01.wav
        instrument: drum set
  S02:
    component: melody
    filename: Artist_Song_STEM_02.wav
    instrument: female singer
    raw:
      R01:
        filename: Artist_Song_RAW_02_01.wav
        instrument: female singer
      R02:
        filename: Artist_Song_RAW_02_02.wav
        instrument: female singer
  S03:
    component: melody
    filename: Artist_Song_STEM_03.wav
    instrument: violin
    raw:
      R01:
        filename: Artist_Song_RAW_03_01.wav
        instrument: violin
"#;

const OTHER_METADATA: &str = r#"
artist: Other
title: Tune
composer: ~
producer: []
genre: Jazz
origin: Live
excerpt: yes
has_bleed: yes
instrumental: yes
version: '2'
stems:
  S01:
    component: bass
    filename: Other_Tune_STEM_01.wav
    instrument: cello
    raw: {}
"#;

/// Un catálogo MedleyDB mínimo en un directorio temporal.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture { dir };
        fixture.write_catalog();
        fixture.write_audio();
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> MedleyPaths {
        MedleyPaths::with_roots(Some(self.root().to_path_buf()), self.root())
    }

    pub fn dataset(&self) -> Dataset {
        Dataset::open(self.paths()).unwrap()
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn write_catalog(&self) {
        self.write("resources/taxonomy.yaml", TAXONOMY);
        self.write("resources/instrument_f0_type.json", F0_TYPES);
        self.write("resources/mixing_coefficients.yaml", MIXING);
        self.write("resources/tracklist_v1.txt", "Artist_Song\n");
        self.write("resources/tracklist_v2.txt", "Other_Tune\n\n");

        self.write("Metadata/Artist_Song_METADATA.yaml", MAIN_METADATA);
        self.write("Metadata/Other_Tune_METADATA.yaml", OTHER_METADATA);

        self.write(
            "Annotations/Melody/Rankings/Artist_Song_RANKING.txt",
            "Artist_Song_STEM_02.wav,1\nArtist_Song_STEM_03.wav,2\n",
        );
        self.write(
            "Annotations/Melody/Intervals/Artist_Song_INTERVALS.txt",
            &format!("0.0\t{:.6}\t2\n{:.6}\t0.1\t3\n", 8.0 * HOP_SECONDS, 8.0 * HOP_SECONDS),
        );
        self.write("Annotations/Pitch/Artist_Song_STEM_02.csv", &pitch_csv(200.0));
        self.write("Annotations/Pitch/Artist_Song_STEM_03.csv", &pitch_csv(400.0));
        self.write(
            "Annotations/Activation_Confidence/Artist_Song_ACTIVATION_CONF.lab",
            "time,S01,S02,S03\n0.0,0.9,0.1,0.0\n0.05,0.8,0.7,0.2\n",
        );
        self.write(
            "Annotations/Source_ID/Artist_Song_SOURCEID.lab",
            "start_time,end_time,instrument_label\n0.0,0.05,drum set\n0.05,0.1,female singer\n",
        );
    }

    fn write_audio(&self) {
        let audio = self.root().join("Audio").join(MAIN_TRACK);
        let stems = audio.join("Artist_Song_STEMS");
        let raws = audio.join("Artist_Song_RAW");
        fs::create_dir_all(&stems).unwrap();
        fs::create_dir_all(&raws).unwrap();

        write_wav(&audio.join("Artist_Song_MIX.wav"), 1000);
        for idx in 1..=3 {
            write_wav(&stems.join(format!("Artist_Song_STEM_{idx:02}.wav")), 1000 * idx as i16);
        }
        for name in [
            "Artist_Song_RAW_01_01.wav",
            "Artist_Song_RAW_02_01.wav",
            "Artist_Song_RAW_02_02.wav",
            "Artist_Song_RAW_03_01.wav",
        ] {
            write_wav(&raws.join(name), 0);
        }

        // Carpeta sin formato de id: no debe listarse.
        fs::create_dir_all(self.root().join("Audio").join("scratch")).unwrap();
    }
}

/// Pitch con un valor por frame: `base + i`.
fn pitch_csv(base: f64) -> String {
    let frames = (NUM_SAMPLES as f64 / 256.0).ceil() as usize;
    (0..frames)
        .map(|i| format!("{:.6},{}\n", i as f64 * HOP_SECONDS, base + i as f64))
        .collect()
}

/// WAV mono de 16 bits con un valor constante.
pub fn write_wav(path: &Path, value: i16) {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for _ in 0..NUM_SAMPLES {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}
