//! Image comparison by root-mean-square pixel error.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use thiserror::Error;

/// Errors from comparing two rendered images.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image shape mismatch: candidate {candidate}, reference {reference}")]
    DimensionMismatch {
        candidate: String,
        reference: String,
    },
}

/// Pass/warn classification of a scene's RMS error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Warning,
}

/// Classify an RMS value against the allowed maximum.
pub fn classify(rms: f64, max_rms: f64) -> Verdict {
    if rms < max_rms {
        Verdict::Pass
    } else {
        Verdict::Warning
    }
}

/// Compute the root-mean-square error between two images.
///
/// Both images are decoded and flattened to their raw 8-bit sample buffers;
/// the result is `sqrt(sum((a[i]-b[i])^2) / N)` with N = width x height x
/// channels. The images must have identical dimensions and colour layout -
/// mismatched shapes are an error, not an implicit resize. Pure: reads the
/// two files and nothing else.
pub fn compare(candidate: &Path, reference: &Path) -> Result<f64, CompareError> {
    let candidate_img = decode(candidate)?;
    let reference_img = decode(reference)?;

    if candidate_img.dimensions() != reference_img.dimensions()
        || candidate_img.color() != reference_img.color()
    {
        return Err(CompareError::DimensionMismatch {
            candidate: shape(&candidate_img),
            reference: shape(&reference_img),
        });
    }

    let a = candidate_img.as_bytes();
    let b = reference_img.as_bytes();
    if a.is_empty() {
        return Ok(0.0);
    }

    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let delta = f64::from(x) - f64::from(y);
            delta * delta
        })
        .sum();
    Ok((sum / a.len() as f64).sqrt())
}

fn decode(path: &Path) -> Result<DynamicImage, CompareError> {
    image::open(path).map_err(|source| CompareError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn shape(img: &DynamicImage) -> String {
    let (w, h) = img.dimensions();
    format!("{w}x{h} {:?}", img.color())
}
