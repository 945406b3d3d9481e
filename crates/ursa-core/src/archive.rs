//! Capture Archive
//!
//! One self-describing file per capture: a magic/version preamble, a
//! length-prefixed JSON metadata header, then the sample payload as
//! little-endian f64 (complex payloads interleave re/im). The metadata is
//! a flat record of scalars loaded back by key name, so archives written
//! by older lab code stay readable as fields accrete.
//!
//! Also provides the on-disk layout helpers: every collection run gets a
//! `label__YYYYmmdd_HHMMSS/` directory under the data root, and archive
//! names embed the tuning in filesystem-safe scientific notation
//! (`3.5e6` becomes `3p500e06`).

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{IQSample, SampleBuffer};

/// File magic for capture archives.
pub const MAGIC: &[u8; 4] = b"URSA";
/// Current archive format version.
pub const FORMAT_VERSION: u16 = 1;
/// Archive file extension.
pub const EXTENSION: &str = "ursa";

/// Errors while reading or writing capture archives.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("not a capture archive (bad magic)")]
    BadMagic,

    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u16),

    #[error("payload shape mismatch: metadata says {expected} samples, payload holds {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// Stimulus/front-end mode of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// Signal-generator sine into the direct-sampled input.
    Sine,
    /// Noise generator into the direct-sampled input.
    Noise,
    /// Mixer output captured as complex baseband.
    IqMixer,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Sine => "sine",
            CaptureMode::Noise => "noise",
            CaptureMode::IqMixer => "iq-mixer",
        }
    }
}

/// Flat metadata record stored with every capture. Scalars only; fields
/// that do not apply to a mode stay unset rather than holding sentinels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureMeta {
    /// Stimulus/front-end mode.
    pub mode: CaptureMode,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Samples per block.
    pub num_samples: usize,
    /// Number of equal-length blocks in the payload.
    pub num_blocks: usize,
    /// Generator frequency in Hz, for sine captures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_freq: Option<f64>,
    /// Local-oscillator frequency in Hz, for mixer captures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lo_freq: Option<f64>,
    /// Whether the tuner was bypassed (direct sampling).
    pub direct_sampling: bool,
    /// Whether the anti-alias FIR was replaced with a pass-through set.
    pub filter_bypassed: bool,
    /// RFC 3339 UTC timestamp taken at capture time.
    pub timestamp: String,
}

impl CaptureMeta {
    /// Total payload length in samples.
    pub fn total_samples(&self) -> usize {
        self.num_blocks * self.num_samples
    }
}

/// A capture: metadata record plus sample payload, shape-checked at
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    meta: CaptureMeta,
    data: SampleBuffer,
}

impl Capture {
    /// Bind metadata to a payload. The payload length must be exactly
    /// `num_blocks * num_samples`; anything else is rejected.
    pub fn new(meta: CaptureMeta, data: SampleBuffer) -> Result<Self, ArchiveError> {
        let expected = meta.total_samples();
        if data.len() != expected {
            return Err(ArchiveError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { meta, data })
    }

    pub fn meta(&self) -> &CaptureMeta {
        &self.meta
    }

    /// Whole payload as one flat buffer (blocks collapsed).
    pub fn samples(&self) -> &SampleBuffer {
        &self.data
    }

    /// Flat real payload; `None` for mixer captures.
    pub fn real_samples(&self) -> Option<&[f64]> {
        self.data.as_real()
    }

    /// One block of a real capture.
    pub fn block(&self, index: usize) -> Option<&[f64]> {
        if self.meta.num_samples == 0 {
            return None;
        }
        let real = self.data.as_real()?;
        let start = index.checked_mul(self.meta.num_samples)?;
        real.get(start..start + self.meta.num_samples)
    }

    /// All blocks of a real capture.
    pub fn real_blocks(&self) -> Option<Vec<&[f64]>> {
        if self.meta.num_samples == 0 {
            return None;
        }
        let real = self.data.as_real()?;
        Some(real.chunks_exact(self.meta.num_samples).collect())
    }

    pub fn into_parts(self) -> (CaptureMeta, SampleBuffer) {
        (self.meta, self.data)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PayloadFormat {
    Real,
    Iq,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveHeader {
    format: PayloadFormat,
    meta: CaptureMeta,
}

/// Write one capture to `path`.
pub fn write_archive(path: &Path, capture: &Capture) -> Result<(), ArchiveError> {
    let header = ArchiveHeader {
        format: match capture.samples() {
            SampleBuffer::Real(_) => PayloadFormat::Real,
            SampleBuffer::Iq(_) => PayloadFormat::Iq,
        },
        meta: capture.meta().clone(),
    };
    let header_bytes = serde_json::to_vec(&header)?;

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(MAGIC)?;
    writer.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_u32::<LittleEndian>(header_bytes.len() as u32)?;
    writer.write_all(&header_bytes)?;

    match capture.samples() {
        SampleBuffer::Real(values) => {
            for &x in values {
                writer.write_f64::<LittleEndian>(x)?;
            }
        }
        SampleBuffer::Iq(values) => {
            for s in values {
                writer.write_f64::<LittleEndian>(s.re)?;
                writer.write_f64::<LittleEndian>(s.im)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read a capture archive, validating magic, version, and payload shape.
pub fn read_archive(path: &Path) -> Result<Capture, ArchiveError> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ArchiveError::BadMagic);
    }
    let version = reader.read_u16::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(ArchiveError::UnsupportedVersion(version));
    }
    let header_len = reader.read_u32::<LittleEndian>()? as usize;
    let mut header_bytes = vec![0u8; header_len];
    reader.read_exact(&mut header_bytes)?;
    let header: ArchiveHeader = serde_json::from_slice(&header_bytes)?;

    let expected = header.meta.total_samples();
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    if raw.len() % 8 != 0 {
        return Err(ArchiveError::ShapeMismatch {
            expected,
            actual: raw.len() / 8,
        });
    }

    let mut cursor = io::Cursor::new(&raw);
    let count = raw.len() / 8;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(cursor.read_f64::<LittleEndian>()?);
    }

    let data = match header.format {
        PayloadFormat::Real => {
            if values.len() != expected {
                return Err(ArchiveError::ShapeMismatch {
                    expected,
                    actual: values.len(),
                });
            }
            SampleBuffer::Real(values)
        }
        PayloadFormat::Iq => {
            if values.len() != 2 * expected {
                return Err(ArchiveError::ShapeMismatch {
                    expected,
                    actual: values.len() / 2,
                });
            }
            SampleBuffer::Iq(
                values
                    .chunks_exact(2)
                    .map(|pair| IQSample::new(pair[0], pair[1]))
                    .collect(),
            )
        }
    };

    Capture::new(header.meta, data)
}

/// Create `base/label__YYYYmmdd_HHMMSS/` and return its path.
pub fn create_run_dir(base: &Path, label: &str) -> io::Result<PathBuf> {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let dir = base.join(format!("{}__{}", label, stamp));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Filesystem-safe scientific-notation token with three significant
/// decimals: `3.5e6` becomes `"3p500e06"`, `-2.0e-3` becomes
/// `"m2p000em03"`.
pub fn sci_token(value: f64) -> String {
    let formatted = format!("{:.3e}", value);
    let (mantissa, exponent) = match formatted.split_once('e') {
        Some(parts) => parts,
        None => (formatted.as_str(), "0"),
    };
    let mantissa = mantissa.replace('-', "m").replace('.', "p");
    let (exp_sign, digits) = match exponent.strip_prefix('-') {
        Some(rest) => ("m", rest),
        None => ("", exponent),
    };
    let exp: u32 = digits.parse().unwrap_or(0);
    format!("{}e{}{:02}", mantissa, exp_sign, exp)
}

/// Default archive file name for a capture: the mode plus tuning tokens.
pub fn default_archive_name(meta: &CaptureMeta) -> String {
    let mut name = format!("{}_fs{}", meta.mode.as_str(), sci_token(meta.sample_rate));
    if let Some(freq) = meta.signal_freq {
        name.push_str(&format!("_f{}", sci_token(freq)));
    }
    if let Some(lo) = meta.lo_freq {
        name.push_str(&format!("_lo{}", sci_token(lo)));
    }
    if meta.filter_bypassed {
        name.push_str("_nofir");
    }
    format!("{}.{}", name, EXTENSION)
}
