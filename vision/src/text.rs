//! Label recognition: OCR wrapper plus fuzzy string matching.
//!
//! OCR output on game UI text is noisy: spaces get merged or dropped, thin
//! glyphs misread. Everything downstream therefore matches labels either by
//! space-insensitive substring (`contains_text`) or by normalized edit
//! distance (`similarity`), never by equality.

use std::path::Path;

use anyhow::{Context, Result};

use crate::image::OwnedImage;

/// Source of recognized text. The production implementation is [`Ocr`];
/// scenario tests script this with canned token lists.
pub trait TextReader {
    /// Recognized text fragments in reading order. Empty means "no text",
    /// which deliberately also covers engine failure: the two are
    /// operationally indistinguishable to callers.
    fn read_text(&mut self, image: &OwnedImage) -> Vec<String>;
}

/// OCR engine (PaddleOCR via `ocr-rs`).
pub struct Ocr {
    engine: ocr_rs::OcrEngine,
}

/// OCR performs better on larger glyphs; crops below this height are
/// upscaled before recognition.
const MIN_OCR_HEIGHT: u32 = 80;

impl Ocr {
    /// Initialize the OCR engine with the given model paths.
    pub fn try_new(
        detection: impl AsRef<Path>,
        recognition: impl AsRef<Path>,
        charset: impl AsRef<Path>,
    ) -> Result<Self> {
        let thread_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let engine = ocr_rs::OcrEngine::new(
            detection,
            recognition,
            charset,
            Some(ocr_rs::OcrEngineConfig {
                backend: ocr_rs::Backend::CPU,
                thread_count: thread_count as i32,
                // Small stylized fonts benefit from High precision at an
                // acceptable CPU cost for a once-per-second pipeline.
                precision_mode: ocr_rs::PrecisionMode::High,
                enable_parallel: thread_count > 1,
                min_result_confidence: 0.5,
                ..Default::default()
            }),
        )
        .context("failed to initialize OCR engine (missing or invalid model files?)")?;

        Ok(Self { engine })
    }
}

impl TextReader for Ocr {
    fn read_text(&mut self, image: &OwnedImage) -> Vec<String> {
        let mut img = image.clone();
        if img.height() < MIN_OCR_HEIGHT {
            img.resize_h(MIN_OCR_HEIGHT);
        }

        let view = img.as_image();
        let input = ocr_rs::preprocess::rgb_to_image(&view.get_bytes(), view.width(), view.height());

        match self.engine.recognize(&input) {
            Ok(results) => results.into_iter().map(|v| v.text).collect(),
            Err(err) => {
                // An engine failure and a blank crop look the same to callers.
                log::warn!("OCR failed: {err}");
                Vec::new()
            }
        }
    }
}

/// Similarity of two strings in `[0.0, 1.0]` after normalization; 1.0 means
/// identical. Normalization uppercases and strips list/quote punctuation and
/// all whitespace, since OCR routinely mangles case and spacing both.
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = normalize(a);
    let b = normalize(b);

    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }

    let dist = levenshtein::levenshtein(&a, &b);
    1.0 - dist as f32 / longest as f32
}

/// Case- and whitespace-insensitive substring test against the stringified
/// token list. Tolerates OCR merging or dropping spaces on either side.
pub fn contains_text(needle: &str, tokens: &[String]) -> bool {
    let needle = normalize(needle);
    if needle.is_empty() {
        return false;
    }
    normalize(&tokens.join(" ")).contains(&needle)
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '[' | ']' | '\'' | '"' | '<' | '>' | ','))
        .flat_map(char::to_uppercase)
        .collect()
}
