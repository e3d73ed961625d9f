use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use medley_paths::split_track_id;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Índice `{track_id: artista}` (`artist_index.json`).
pub type ArtistIndex = HashMap<String, String>;

pub fn load_artist_index(path: &Path) -> Result<ArtistIndex> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Split {
    pub train: Vec<String>,
    pub test: Vec<String>,
}

/// Particiones train/test en las que ningún artista aparece en ambos lados.
///
/// El artista de cada pista sale de `artist_index` o, si no está, del prefijo
/// del id. Con `seed` las particiones son reproducibles.
pub fn artist_conditional_split(
    track_ids: &[String],
    test_size: f64,
    num_splits: usize,
    seed: Option<u64>,
    artist_index: Option<&ArtistIndex>,
) -> Result<Vec<Split>> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::InvalidSplit(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for track_id in track_ids {
        let artist = match artist_index.and_then(|idx| idx.get(track_id)) {
            Some(artist) => artist.clone(),
            None => split_track_id(track_id)?.0.to_string(),
        };
        groups.entry(artist).or_default().push(track_id.clone());
    }

    if groups.len() < 2 {
        return Err(Error::InvalidSplit(format!(
            "need at least two artists, got {}",
            groups.len()
        )));
    }

    let artists: Vec<&String> = groups.keys().collect();
    // Ambos lados conservan al menos un artista.
    let n_test = ((test_size * artists.len() as f64).ceil() as usize).clamp(1, artists.len() - 1);
    debug!(
        "Split por artista: {} artistas, {} en test",
        artists.len(),
        n_test
    );

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut splits = Vec::with_capacity(num_splits);
    for _ in 0..num_splits {
        let mut order = artists.clone();
        order.shuffle(&mut rng);

        let (test_artists, train_artists) = order.split_at(n_test);
        let collect = |side: &[&String]| -> Vec<String> {
            let mut ids: Vec<String> = side
                .iter()
                .flat_map(|artist| groups[*artist].iter().cloned())
                .collect();
            ids.sort();
            ids
        };

        splits.push(Split {
            train: collect(train_artists),
            test: collect(test_artists),
        });
    }
    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ids() -> Vec<String> {
        [
            "Alpha_One",
            "Alpha_Two",
            "Beta_One",
            "Gamma_One",
            "Gamma_Two",
            "Gamma_Three",
            "Delta_One",
            "Eps_One",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn artist(id: &str) -> &str {
        id.split_once('_').unwrap().0
    }

    #[test]
    fn no_artist_on_both_sides() {
        let splits = artist_conditional_split(&ids(), 0.3, 5, Some(7), None).unwrap();
        assert_eq!(splits.len(), 5);
        for split in &splits {
            let train: HashSet<&str> = split.train.iter().map(|s| artist(s)).collect();
            let test: HashSet<&str> = split.test.iter().map(|s| artist(s)).collect();
            assert!(train.is_disjoint(&test));
            assert_eq!(split.train.len() + split.test.len(), 8);
            assert_eq!(test.len(), 2);
        }
    }

    #[test]
    fn seeded_splits_are_reproducible() {
        let a = artist_conditional_split(&ids(), 0.5, 3, Some(42), None).unwrap();
        let b = artist_conditional_split(&ids(), 0.5, 3, Some(42), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn artist_index_overrides_prefix() {
        let mut index = ArtistIndex::new();
        index.insert("Alpha_One".into(), "Same".into());
        index.insert("Beta_One".into(), "Same".into());
        let ids: Vec<String> = vec!["Alpha_One".into(), "Beta_One".into(), "Gamma_One".into()];

        let splits = artist_conditional_split(&ids, 0.5, 4, Some(1), Some(&index)).unwrap();
        for split in splits {
            let alpha_test = split.test.contains(&"Alpha_One".to_string());
            let beta_test = split.test.contains(&"Beta_One".to_string());
            assert_eq!(alpha_test, beta_test);
        }
    }

    #[test]
    fn large_test_size_keeps_one_training_artist() {
        let ids: Vec<String> = vec!["A_1".into(), "B_1".into(), "C_1".into()];
        for split in artist_conditional_split(&ids, 0.99, 4, Some(5), None).unwrap() {
            assert_eq!(split.test.len(), 2);
            assert_eq!(split.train.len(), 1);
        }

        let small = artist_conditional_split(&ids, 0.01, 1, Some(5), None).unwrap();
        assert_eq!(small[0].test.len(), 1);
        assert_eq!(small[0].train.len(), 2);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            artist_conditional_split(&ids(), 0.0, 1, None, None),
            Err(Error::InvalidSplit(_))
        ));
        assert!(matches!(
            artist_conditional_split(&ids(), 1.0, 1, None, None),
            Err(Error::InvalidSplit(_))
        ));
        let single: Vec<String> = vec!["Solo_A".into(), "Solo_B".into()];
        assert!(matches!(
            artist_conditional_split(&single, 0.5, 1, None, None),
            Err(Error::InvalidSplit(_))
        ));
    }
}
