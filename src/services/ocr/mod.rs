// OCR service - local image-to-text inference for CJK captures
//
// The model directory named by OCR_MODEL holds an `ocr.onnx` recognition
// model and a `vocab.txt` charset. Inference runs through whichever backend
// services::onnx selects.

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::{session::Session, value::Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::core::types::RecognizedText;
use crate::services::onnx;

const MODEL_FILE: &str = "ocr.onnx";
const CHARSET_FILE: &str = "vocab.txt";

/// Model input dimensions
const TARGET_HEIGHT: u32 = 60;
const MIN_WIDTH: u32 = 10;
/// One logit column per 4 pixels of width (LSTM stride).
const SEQ_STRIDE: u32 = 4;

/// Local OCR pipeline producing the top candidate transcription of an image.
pub struct OcrService {
    session: Mutex<Session>,
    charset: HashMap<usize, String>,
    blank_index: usize,
    backend: String,
}

impl OcrService {
    /// Load the model and charset from `model_dir`. The inference backend is
    /// auto-detected unless `forced_backend` pins one.
    pub fn new(model_dir: &Path, forced_backend: Option<&str>) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let charset_path = model_dir.join(CHARSET_FILE);

        if !model_path.exists() {
            anyhow::bail!("OCR model not found at: {}", model_path.display());
        }
        if !charset_path.exists() {
            anyhow::bail!("OCR charset not found at: {}", charset_path.display());
        }

        info!("loading OCR model from {}", model_path.display());
        let (backend, session) = onnx::build_session(&model_path, "ocr", forced_backend)?;

        let raw = std::fs::read_to_string(&charset_path)
            .with_context(|| format!("failed to read OCR charset {}", charset_path.display()))?;
        let charset = parse_charset(&raw);
        let blank_index = charset.len().saturating_sub(1);

        info!(
            "OCR service initialized: backend={}, charset_size={}, blank_index={}",
            backend,
            charset.len(),
            blank_index
        );

        Ok(Self {
            session: Mutex::new(session),
            charset,
            blank_index,
            backend,
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Run OCR on an already decoded image.
    pub fn recognize(&self, image: &DynamicImage) -> Result<RecognizedText> {
        let (tensor, seq_length) = preprocess(image);

        let input_shape: Vec<usize> = tensor.shape().to_vec();
        let (data, _offset) = tensor.into_raw_vec_and_offset();
        let shape_arr: [usize; 4] = [
            input_shape[0],
            input_shape[1],
            input_shape[2],
            input_shape[3],
        ];
        let data_value = Value::from_array((shape_arr, data))?;
        let seq_lengths_value = Value::from_array(([1usize], vec![seq_length]))?;

        // Extract owned logits while the session lock is held, then release
        let (dims, logits) = {
            let mut session = self.session.lock();
            let outputs = session.run(ort::inputs![
                "data" => data_value,
                "seq_lengths" => seq_lengths_value
            ])?;

            let (shape, logits_data) = if let Some(output) = outputs.get("output") {
                output.try_extract_tensor::<f32>()?
            } else {
                let first_key = outputs
                    .keys()
                    .next()
                    .context("OCR model produced no outputs")?;
                outputs[first_key].try_extract_tensor::<f32>()?
            };

            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            (dims, logits_data.to_vec())
        };

        // Output is [S, 1, V], [1, S, V], or [S, V]
        let (seq_len, vocab_size) = match dims.as_slice() {
            [s, 1, v] => (*s, *v),
            [1, s, v] => (*s, *v),
            [s, v] => (*s, *v),
            other => anyhow::bail!("unexpected logits shape: {:?}", other),
        };

        let recognized = ctc_decode(&self.charset, self.blank_index, &logits, seq_len, vocab_size);
        debug!(
            "OCR result: '{}' (confidence: {:.2})",
            recognized.text, recognized.confidence
        );
        Ok(recognized)
    }

    /// Open an image from disk and recognize it. This is the call the poll
    /// loop makes for each newly detected capture.
    pub fn recognize_file(&self, path: &Path) -> Result<RecognizedText> {
        let image = image::open(path)
            .with_context(|| format!("failed to open capture {}", path.display()))?;
        self.recognize(&image)
    }
}

impl crate::orchestration::TextRecognizer for OcrService {
    fn recognize_file(&self, path: &Path) -> Result<RecognizedText> {
        OcrService::recognize_file(self, path)
    }
}

/// Resize to the model's fixed input height preserving aspect ratio and
/// normalize RGB to a [1, 3, H, W] float tensor in [0, 1].
fn preprocess(image: &DynamicImage) -> (Array4<f32>, i32) {
    let (w, h) = image.dimensions();

    let scale = TARGET_HEIGHT as f32 / h as f32;
    let new_w = ((w as f32 * scale) as u32).max(MIN_WIDTH);

    let resized = image.resize_exact(new_w, TARGET_HEIGHT, image::imageops::FilterType::Lanczos3);
    let rgb = resized.to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, 3, TARGET_HEIGHT as usize, new_w as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] = pixel[channel] as f32 / 255.0;
        }
    }

    (tensor, (new_w / SEQ_STRIDE) as i32)
}

/// CTC greedy decode: collapse repeated classes and drop blanks. The result
/// is the single best candidate with its mean per-character confidence.
fn ctc_decode(
    charset: &HashMap<usize, String>,
    blank_index: usize,
    logits: &[f32],
    seq_len: usize,
    vocab_size: usize,
) -> RecognizedText {
    let mut text = String::new();
    let mut confidences = Vec::new();
    let mut prev: Option<usize> = None;

    for step in logits.chunks(vocab_size).take(seq_len) {
        let (best_index, best_value) = step.iter().enumerate().fold(
            (0, f32::NEG_INFINITY),
            |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) },
        );

        if best_index != blank_index && prev != Some(best_index) {
            match charset.get(&best_index) {
                Some(ch) => text.push_str(ch),
                None => text.push('?'),
            }
            // Log prob to confidence
            confidences.push(best_value.exp().min(1.0));
        }
        prev = Some(best_index);
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    RecognizedText { text, confidence }
}

/// Charset format: `index\tchar` per line, `<space>` for the space glyph,
/// `<blank>` for the CTC blank (skipped). Printable ASCII is pre-seeded so
/// charset files only need to list the CJK range.
fn parse_charset(raw: &str) -> HashMap<usize, String> {
    let mut charset = HashMap::new();

    charset.insert(0, " ".to_string());
    for i in 32..127usize {
        charset.insert(i, ((i as u8) as char).to_string());
    }

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((index, ch)) = line.split_once('\t') else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };
        match ch {
            "<blank>" => {}
            "<space>" => {
                charset.insert(index, " ".to_string());
            }
            ch => {
                charset.insert(index, ch.to_string());
            }
        }
    }

    charset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_parsing_seeds_ascii_and_reads_cjk() {
        let raw = "0\t<space>\n7000\t漢\n7001\t<blank>\nnot-a-line\n";
        let charset = parse_charset(raw);

        assert_eq!(charset.get(&7000).map(String::as_str), Some("漢"));
        assert_eq!(charset.get(&65).map(String::as_str), Some("A"));
        assert_eq!(charset.get(&0).map(String::as_str), Some(" "));
        assert!(!charset.contains_key(&7001));
    }

    #[test]
    fn ctc_collapses_repeats_and_drops_blanks() {
        let mut charset = HashMap::new();
        charset.insert(0, "a".to_string());
        charset.insert(1, "b".to_string());
        let blank = 2;

        // Timesteps: a, a, <blank>, b  =>  "ab"
        #[rustfmt::skip]
        let logits = [
              0.0, -10.0, -10.0,
              0.0, -10.0, -10.0,
            -10.0, -10.0,   0.0,
            -10.0,   0.0, -10.0,
        ];

        let out = ctc_decode(&charset, blank, &logits, 4, 3);
        assert_eq!(out.text, "ab");
        assert!(out.confidence > 0.9);
    }

    #[test]
    fn ctc_decode_of_all_blanks_is_empty() {
        let mut charset = HashMap::new();
        charset.insert(0, "a".to_string());

        let logits = [-10.0, 0.0, -10.0, 0.0];
        let out = ctc_decode(&charset, 1, &logits, 2, 2);
        assert_eq!(out.text, "");
        assert_eq!(out.confidence, 0.0);
    }

    #[test]
    fn preprocess_scales_to_target_height() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            120,
            30,
            image::Rgb([255, 255, 255]),
        ));

        let (tensor, seq_length) = preprocess(&image);
        // 30px tall scaled to 60px doubles the width to 240
        assert_eq!(tensor.shape(), &[1, 3, 60, 240]);
        assert_eq!(seq_length, 60);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < f32::EPSILON);
    }
}
