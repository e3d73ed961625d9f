mod common;

use common::{Fixture, MAIN_TRACK, NUM_SAMPLES};
use hound::WavReader;
use medley_library::{
    MelodyMixOptions, MixOptions, MixOptionsBuilder, mix::mono_stems_plan, mix::melody_stems_plan,
    mix_multitrack,
};

#[test]
fn renders_weighted_mix_of_stems() {
    let fixture = Fixture::new();
    let mtrack = fixture.dataset().multitrack(MAIN_TRACK).unwrap();
    let output = fixture.root().join("mixes").join("full.wav");

    let plan = mix_multitrack(&mtrack, &output, &MixOptions::default()).unwrap();
    // S03 no tiene coeficiente: peso 1.0
    assert_eq!(plan.weights, vec![0.5, 1.0, 1.0]);

    let mut reader = WavReader::open(&output).unwrap();
    assert_eq!(reader.spec().sample_rate, 44100);
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), NUM_SAMPLES);

    let expected = (0.5 * 1000.0 + 2000.0 + 3000.0) / 32768.0;
    assert!((samples[0] - expected as f32).abs() < 1e-6);
}

#[test]
fn selected_stems_with_alternate_weights() {
    let fixture = Fixture::new();
    let mtrack = fixture.dataset().multitrack(MAIN_TRACK).unwrap();
    let output = fixture.root().join("two.wav");

    let options = MixOptionsBuilder::default()
        .stem_indices(vec![1, 2])
        .alternate_weights([(2, 0.0)].into_iter().collect::<std::collections::BTreeMap<_, _>>())
        .build()
        .unwrap();
    mix_multitrack(&mtrack, &output, &options).unwrap();

    let mut reader = WavReader::open(&output).unwrap();
    let first = reader.samples::<f32>().next().unwrap().unwrap();
    assert!((first - 500.0 / 32768.0).abs() < 1e-6);
}

#[test]
fn melody_and_mono_plans_from_fixture() {
    let fixture = Fixture::new();
    let mtrack = fixture.dataset().multitrack(MAIN_TRACK).unwrap();

    let melody = melody_stems_plan(&mtrack, &MelodyMixOptions::default()).unwrap();
    assert_eq!(melody.len(), 2);
    assert!(melody.files[0].ends_with("Artist_Song_STEM_02.wav"));

    let with_drums = melody_stems_plan(
        &mtrack,
        &MelodyMixOptions {
            include_percussion: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(with_drums.files[2].ends_with("Artist_Song_STEM_01.wav"));

    assert_eq!(mono_stems_plan(&mtrack, false).unwrap().len(), 2);
    assert_eq!(mono_stems_plan(&mtrack, true).unwrap().len(), 3);
}
