pub mod annotation;
pub mod fields;
pub mod multitrack;
pub mod track;

pub use annotation::{ActivationConf, Annotation, MelodyInterval, SourceSegment};
pub use fields::{Component, DatasetVersion, F0Type, ParseLabelError, parse_index};
pub use multitrack::{MultiTrack, RankingError, validate_rankings};
pub use track::{RawIndex, StemIndex, Track};
