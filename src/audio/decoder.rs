//! Symphonia-backed PCM decoding
//!
//! Decodes any container symphonia can probe to mono f32 samples and
//! resamples to the engine's analysis rate with rubato.

use crate::error::{EngineError, Result};
use crate::types::AudioBuffer;
use rubato::{FftFixedInOut, Resampler};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Maximum file size we'll attempt to decode (2GB)
/// Prevents OOM on extremely large files
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Decode an audio file to a mono buffer at `target_rate`
pub fn decode_mono(path: &Path, target_rate: u32) -> Result<AudioBuffer> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EngineError::FileNotFound(path.to_path_buf()),
        _ => EngineError::decode_error(path, format!("Failed to read file metadata: {}", e)),
    })?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(EngineError::decode_error(
            path,
            format!(
                "File too large ({:.1} GB). Maximum supported size is 2 GB.",
                metadata.len() as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
        ));
    }

    let mut format = open_format(path)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::decode_error(path, "No audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_sample_rate = codec_params.sample_rate.unwrap_or(44100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    debug!(
        "Decoding: {} @ {}Hz, {} channels",
        path.display(),
        source_sample_rate,
        channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| EngineError::decode_error(path, format!("Failed to create decoder: {}", e)))?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(EngineError::decode_error(
                    path,
                    format!("Failed to read packet: {}", e),
                ));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(EngineError::decode_error(path, format!("Decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        mono.extend(to_mono(sample_buf.samples(), spec.channels.count()));
    }

    if mono.is_empty() {
        return Err(EngineError::decode_error(path, "Stream contains no audio samples"));
    }

    let samples = resample(&mono, source_sample_rate, target_rate);

    debug!(
        "Decoded {} samples ({:.2}s at {}Hz)",
        samples.len(),
        samples.len() as f64 / target_rate as f64,
        target_rate
    );

    Ok(AudioBuffer::new(samples, target_rate))
}

/// Probe the container and return its format reader
fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = std::fs::File::open(path)
        .map_err(|e| EngineError::decode_error(path, format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| EngineError::decode_error(path, format!("Failed to probe format: {}", e)))?;

    Ok(probed.format)
}

/// Average interleaved frames down to one channel
fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 | 1 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect(),
    }
}

/// Resample mono audio with rubato's FFT resampler.
///
/// The final partial chunk is zero-padded and only the output frames that
/// correspond to real input are kept. Falls back to linear interpolation if
/// rubato rejects the rate pair.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    const CHUNK_SIZE: usize = 1024;

    let mut resampler =
        match FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 1) {
            Ok(r) => r,
            Err(e) => {
                debug!("Rubato initialization failed ({}), using linear fallback", e);
                return resample_linear(samples, from_rate, to_rate);
            }
        };

    let chunk_in = resampler.input_frames_next();
    let chunk_out = resampler.output_frames_next();
    let ratio = to_rate as f64 / from_rate as f64;
    let mut output = Vec::with_capacity((samples.len() as f64 * ratio).ceil() as usize);

    for (index, chunk) in samples.chunks(chunk_in).enumerate() {
        let mut block = chunk.to_vec();
        block.resize(chunk_in, 0.0);

        match resampler.process(&[block], None) {
            Ok(mut resampled) => {
                let channel = resampled.swap_remove(0);
                let keep = if chunk.len() < chunk_in {
                    ((chunk.len() as f64 * ratio).ceil() as usize).min(chunk_out)
                } else {
                    chunk_out
                };
                output.extend_from_slice(&channel[..keep.min(channel.len())]);
            }
            Err(e) => {
                debug!("Rubato processing error ({}), finishing with linear fallback", e);
                output.extend(resample_linear(&samples[index * chunk_in..], from_rate, to_rate));
                break;
            }
        }
    }

    output
}

/// Linear interpolation resampler, only used when rubato is unavailable
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / step) as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            let next = samples[(idx + 1).min(last)];
            samples[idx] * (1.0 - frac) + next * frac
        })
        .collect()
}
