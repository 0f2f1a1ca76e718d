//! Signal loader
//!
//! Decodes an audio file or in-memory upload with symphonia, downmixes to
//! mono, keeps at most `CLIP_DURATION_SECS` of audio and resamples to the
//! extractor's sample rate with rubato. Short clips are returned as-is; the
//! feature extractor pads them in the frame domain.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use sndcls_common::extraction::CLIP_DURATION_SECS;
use sndcls_common::{Error, ExtractionConfig, Result};
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Mono PCM clip at a known sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Mono samples (f32, normalized -1.0 to 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Silent clip of `num_samples` samples
    pub fn silence(num_samples: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; num_samples], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Fixed-duration mono loader
#[derive(Debug, Clone)]
pub struct SignalLoader {
    /// Sample rate of the produced waveform
    target_sample_rate: u32,
    /// Maximum clip length in seconds
    max_duration_secs: u32,
}

impl SignalLoader {
    /// Create a loader producing at most `CLIP_DURATION_SECS` at `target_sample_rate`
    pub fn new(target_sample_rate: u32) -> Self {
        Self {
            target_sample_rate,
            max_duration_secs: CLIP_DURATION_SECS,
        }
    }

    /// Loader matching an extraction configuration
    pub fn for_config(config: &ExtractionConfig) -> Self {
        Self::new(config.sample_rate)
    }

    /// Maximum number of samples in a produced waveform
    pub fn max_samples(&self) -> usize {
        self.target_sample_rate as usize * self.max_duration_secs as usize
    }

    /// Load an audio file from disk
    ///
    /// # Errors
    /// * `Error::Io` - file cannot be opened
    /// * `Error::Decode` - contents are not decodable audio
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<Waveform> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading audio file");

        let file = std::fs::File::open(path)?;

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        self.load_source(Box::new(file), hint)
    }

    /// Load audio from an in-memory buffer (e.g. an uploaded file)
    ///
    /// `extension` is an optional container hint such as `"wav"` or `"mp3"`.
    pub fn load_bytes(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<Waveform> {
        debug!(bytes = bytes.len(), ?extension, "Loading audio from memory");

        let mut hint = Hint::new();
        if let Some(extension) = extension {
            hint.with_extension(extension);
        }

        self.load_source(Box::new(Cursor::new(bytes)), hint)
    }

    fn load_source(&self, source: Box<dyn MediaSource>, hint: Hint) -> Result<Waveform> {
        let mss = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to probe audio format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let native_sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not specified in codec params".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        // Only the first `max_duration_secs` of the source are needed
        let native_limit = native_sample_rate as usize * self.max_duration_secs as usize;

        debug!(
            "Native sample rate: {} Hz, Target: {} Hz, decode limit: {} samples",
            native_sample_rate, self.target_sample_rate, native_limit
        );

        let mut mono: Vec<f32> = Vec::with_capacity(native_limit);
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        while mono.len() < native_limit {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(Error::Decode(format!("Failed to read packet: {}", e))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = decoder
                .decode(&packet)
                .map_err(|e| Error::Decode(format!("Failed to decode packet: {}", e)))?;

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let buf = sample_buf.get_or_insert_with(|| {
                SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
            });
            if buf.capacity() < decoded.capacity() * channels {
                *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            }
            buf.copy_interleaved_ref(decoded);

            // Average channels to mono
            for frame in buf.samples().chunks_exact(channels) {
                mono.push(frame.iter().sum::<f32>() / channels as f32);
            }
        }

        mono.truncate(native_limit);

        if mono.is_empty() {
            return Err(Error::Decode("Audio stream contains no samples".to_string()));
        }

        let mut samples = if native_sample_rate != self.target_sample_rate {
            self.resample(mono, native_sample_rate)?
        } else {
            mono
        };
        samples.truncate(self.max_samples());

        let waveform = Waveform::new(samples, self.target_sample_rate);
        if waveform.len() < self.max_samples() {
            warn!(
                "Clip is {:.2}s, shorter than {}s; features will be zero-padded",
                waveform.duration_seconds(),
                self.max_duration_secs
            );
        }

        debug!(
            "Loaded {} samples ({:.2}s at {} Hz)",
            waveform.len(),
            waveform.duration_seconds(),
            waveform.sample_rate
        );

        Ok(waveform)
    }

    /// Resample mono PCM to the target sample rate
    ///
    /// Sinc interpolation with a 256-tap BlackmanHarris2 window, processed
    /// in a single chunk covering the whole input. The filter delay is
    /// trimmed and its tail flushed, so `n` input samples yield
    /// `round(n * ratio)` output samples aligned with the input.
    fn resample(&self, samples: Vec<f32>, source_rate: u32) -> Result<Vec<f32>> {
        if samples.is_empty() {
            return Ok(samples);
        }

        let num_frames = samples.len();

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resample_ratio = self.target_sample_rate as f64 / source_rate as f64;

        let mut resampler = SincFixedIn::<f32>::new(resample_ratio, 2.0, params, num_frames, 1)
            .map_err(|e| Error::Internal(format!("Failed to create resampler: {}", e)))?;

        let expected = (num_frames as f64 * resample_ratio).round() as usize;
        let delay = resampler.output_delay();

        let mut resampled = resampler
            .process(&[samples], None)
            .map_err(|e| Error::Internal(format!("Resampling failed: {}", e)))?
            .pop()
            .unwrap_or_default();

        // Flush the filter tail with zero input until the delayed output
        // covers every input sample
        while resampled.len() < delay + expected {
            let tail = resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| Error::Internal(format!("Resampling failed: {}", e)))?
                .pop()
                .unwrap_or_default();
            if tail.is_empty() {
                break;
            }
            resampled.extend_from_slice(&tail);
        }

        resampled.drain(..delay.min(resampled.len()));
        resampled.truncate(expected);

        debug!(
            "Resampled {} samples ({} Hz) → {} samples ({} Hz)",
            num_frames,
            source_rate,
            resampled.len(),
            self.target_sample_rate
        );

        Ok(resampled)
    }
}
