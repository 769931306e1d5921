// Audio module - audio items, buffers and the loading seam
//
// Readers return all channels as a (frames, channels) matrix; channel
// selection happens in the extractor so that out-of-range selectors are
// reported instead of silently mixed down.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;

/// One audio source to extract features from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioItem {
    /// Location handed to the audio reader
    pub path: PathBuf,
    /// Unique identifier used in diagnostics (defaults to the path)
    #[serde(default)]
    pub uri: Option<String>,
    /// 1-based channel selector (defaults to 1)
    #[serde(default)]
    pub channel: Option<usize>,
}

impl AudioItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            uri: None,
            channel: None,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Identifier reported in diagnostics
    pub fn identifier(&self) -> String {
        self.uri
            .clone()
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Requested 1-based channel
    pub fn channel(&self) -> usize {
        self.channel.unwrap_or(1)
    }
}

/// Decoded audio: samples laid out as (frames, channels)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Array2<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Single-channel buffer from a flat sample vector
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        let frames = samples.len();
        let samples = Array2::from_shape_vec((frames, 1), samples)
            .unwrap_or_else(|_| Array2::zeros((0, 1)));
        Self {
            samples,
            sample_rate,
        }
    }

    /// Multi-channel buffer from interleaved samples
    ///
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        let samples = Array2::from_shape_fn((frames, channels), |(f, c)| samples[f * channels + c]);
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.samples.nrows()
    }

    pub fn num_channels(&self) -> usize {
        self.samples.ncols()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Extract one channel (1-based) as f64 samples
    pub fn channel(&self, channel: usize) -> Result<Array1<f64>, FeatureError> {
        let available = self.num_channels();
        if channel == 0 || channel > available {
            return Err(FeatureError::ChannelOutOfRange { channel, available });
        }

        Ok(self.samples.column(channel - 1).mapv(f64::from))
    }
}

/// Audio loading collaborator
pub trait AudioReader {
    /// Read all channels of the audio at `path`
    fn read(&self, path: &Path) -> io::Result<AudioBuffer>;
}

/// WAV reader backed by `hound`
#[derive(Debug, Clone, Copy, Default)]
pub struct WavReader;

impl AudioReader for WavReader {
    fn read(&self, path: &Path) -> io::Result<AudioBuffer> {
        let mut reader = hound::WavReader::open(path).map_err(hound_to_io)?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} has zero channels", path.display()),
            ));
        }

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<f32>, _>>()
                .map_err(hound_to_io)?,
            hound::SampleFormat::Int => match spec.bits_per_sample {
                8 => reader
                    .samples::<i8>()
                    .map(|sample| sample.map(|v| v as f32 / i8::MAX as f32))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(hound_to_io)?,
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|v| v as f32 / i16::MAX as f32))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(hound_to_io)?,
                24 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 / 8_388_607.0))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(hound_to_io)?,
                32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 / i32::MAX as f32))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(hound_to_io)?,
                bits => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "unsupported bits_per_sample={} for {}",
                            bits,
                            path.display()
                        ),
                    ))
                }
            },
        };

        Ok(AudioBuffer::from_interleaved(
            &samples,
            spec.channels as usize,
            spec.sample_rate,
        ))
    }
}

fn hound_to_io(err: hound::Error) -> io::Error {
    match err {
        hound::Error::IoError(err) => err,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    }
}

/// In-memory reader keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    buffers: HashMap<PathBuf, AudioBuffer>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, buffer: AudioBuffer) {
        self.buffers.insert(path.into(), buffer);
    }
}

impl AudioReader for MemoryReader {
    fn read(&self, path: &Path) -> io::Result<AudioBuffer> {
        self.buffers.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no audio registered for {}", path.display()),
            )
        })
    }
}

impl<R: AudioReader + ?Sized> AudioReader for Box<R> {
    fn read(&self, path: &Path) -> io::Result<AudioBuffer> {
        (**self).read(path)
    }
}
