//! OCR (Optical Character Recognition) Module
//!
//! Turns an uploaded image into text in two steps: a fixed
//! preprocessing pipeline (`preprocessing`) that cleans the image up
//! for recognition, and a provider (`provider`) wrapping the local
//! Tesseract engine behind a small adapter.
//!
//! The recognition language is fixed per deployment via `OcrConfig`
//! (see `config.rs`); there is no per-request override and no
//! automatic language detection.

mod preprocessing;
mod provider;

pub use preprocessing::{decode_image, encode_png, preprocess};
pub use provider::{OcrProvider, Recognition};
