//! 核心类型定义：图像输入、单次提供者结果与最终分类结果。
//!
//! Core type definitions.
//!
//! | Type | Role |
//! |------|------|
//! | [`ImagePayload`] | Opaque image bytes plus optional file name |
//! | [`ClassificationOutcome`] | One provider's normalized answer |
//! | [`FinalClassification`] | The single answer returned to callers |
//! | [`Taxonomy`] | Kingdom → species ranks |

pub mod classification;
pub mod image;
pub mod outcome;

pub use classification::{
    FinalClassification, ResultSource, LOW_CONFIDENCE_THRESHOLD, UNIDENTIFIED_LABEL,
};
pub use image::{ImageFormat, ImagePayload, DEFAULT_MAX_IMAGE_BYTES};
pub use outcome::{ClassificationOutcome, Taxonomy, UNKNOWN_RANK};
