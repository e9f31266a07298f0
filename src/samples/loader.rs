// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Sample decoding and caching.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer as DecodedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info};

use super::SampleBuffer;

/// Error types for sample loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Unable to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: SymphoniaError,
    },

    #[error("No audio track found in {0}")]
    NoTrack(PathBuf),

    #[error("Sample rate not specified in {0}")]
    NoSampleRate(PathBuf),

    #[error("No audio frames in {0}")]
    Empty(PathBuf),
}

/// Loads samples relative to a base directory and caches them by path.
pub struct SampleLoader {
    base_path: PathBuf,
    cache: HashMap<PathBuf, Arc<SampleBuffer>>,
}

impl SampleLoader {
    pub fn new(base_path: &Path) -> SampleLoader {
        SampleLoader {
            base_path: base_path.to_path_buf(),
            cache: HashMap::new(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Loads a sample, returning the cached copy if it was loaded before.
    pub fn load(&mut self, path: &Path) -> Result<Arc<SampleBuffer>, LoadError> {
        let path = self.resolve(path);
        if let Some(sample) = self.cache.get(&path) {
            debug!(path = ?path, "Using cached sample");
            return Ok(sample.clone());
        }

        info!(path = ?path, "Loading sample into memory");
        let sample = Arc::new(decode(&path)?);
        info!(
            path = ?path,
            sample_rate = sample.sample_rate(),
            duration_ms = sample.duration().as_millis(),
            memory_kb = sample.memory_size() / 1024,
            "Sample loaded"
        );

        self.cache.insert(path, sample.clone());
        Ok(sample)
    }

    /// Returns the total memory used by cached samples.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(|s| s.memory_size()).sum()
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("base_path", &self.base_path)
            .field("cached_samples", &self.cache.len())
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Decodes every packet of the first audio track and mixes it to mono.
pub fn decode(path: &Path) -> Result<SampleBuffer, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let decode_error = |source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| LoadError::NoTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| LoadError::NoSampleRate(path.to_path_buf()))?;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channels = 0;
    let mut decoded_buffer: Option<DecodedBuffer<f32>> = None;

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            // Some decoders return DecodeError at EOF instead of IoError
            Err(SymphoniaError::DecodeError(_)) => break,
            Err(e) => return Err(decode_error(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(path = ?path, err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_error(e)),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count();
        let too_small = decoded_buffer
            .as_ref()
            .map_or(true, |buffer| buffer.capacity() < decoded.capacity() * channels);
        if too_small {
            decoded_buffer = Some(DecodedBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buffer) = decoded_buffer.as_mut() {
            buffer.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buffer.samples());
        }
    }

    if interleaved.is_empty() || channels == 0 {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    Ok(SampleBuffer::from_interleaved(
        &interleaved,
        channels,
        sample_rate,
    ))
}
