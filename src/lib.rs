//! IrisCode is a CPU-first iris-template comparison engine.
//!
//! This crate provides the bit-packed template codec, cyclic angular
//! registration, a family of Hamming-style distance metrics with fragile-bit
//! weighting, and matching/ranking orchestration with CMC/ROC aggregation.
//! Feature extraction and segmentation are external collaborators: the
//! engine consumes per-sample code and confidence byte planes.

pub mod database;
pub mod distance;
pub mod eval;
pub mod grid;
pub mod matching;
pub mod packed;
pub mod registration;
pub mod threshold;
pub(crate) mod trace;
pub mod util;

mod template;

pub use database::{EnrolledEntry, LabelledTemplate, TemplateDatabase};
pub use distance::{DistanceScore, Metric, MetricKind};
pub use eval::{evaluate, EvalConfig, EvalReport};
pub use grid::{GridView, OwnedGrid};
pub use matching::{match_probe, EntryScore, MatchConfig, PackedProbe, Ranking};
pub use packed::{PackedPlane, Word};
pub use registration::{registering, Registration, RegistrationInput, RotationScratch};
pub use template::{IrisTemplate, PackedBundle};
pub use threshold::fragile_bit_threshold;
pub use util::{IrisCodeError, IrisCodeResult};

#[cfg(feature = "image-io")]
pub use grid::io::load_gray_plane;
