//! Technical attribute inference: shot type, camera angle and movement,
//! depth of field, lighting, composition and color tone.

mod classifier;
mod details;
mod vocabulary;

pub use classifier::TechnicalClassifier;
pub use details::{
    CameraAngle, CameraMovement, ColorTone, Composition, DepthOfField, Dimension, Lighting,
    ShotType, TechnicalDetails,
};
pub(crate) use details::has_annotation;
pub use vocabulary::{PhraseTable, TechnicalVocabulary};
