mod decode;
mod engine;

use std::sync::Arc;

use atmomix_tracks::TrackId;

pub use decode::decode_asset;
pub use engine::{EngineHandle, start};

/// Shared, immutable decoded sample data.
///
/// Cloning only bumps a refcount, so the audio callback and the rest of the
/// system can hold the same buffer without copying.
#[derive(Clone)]
pub struct AudioData {
    /// Interleaved samples. For stereo the layout is [L, R, L, R, ...].
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioData {
    /// # Panics
    ///
    /// Panics if `channels` is 0 or `samples.len()` is not divisible by it.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        assert!(channels > 0, "channels must be greater than 0");
        assert_eq!(
            samples.len() % channels as usize,
            0,
            "samples.len() must be divisible by channels"
        );
        Self {
            samples: Arc::from(samples),
            sample_rate,
            channels,
        }
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel).
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

impl std::fmt::Debug for AudioData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioData")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

/// A decoded ambient loop bound to its track id.
#[derive(Debug, Clone)]
pub struct SoundSource {
    pub id: TrackId,
    pub audio: AudioData,
}

/// The narrow seam between mix bookkeeping and the audio engine.
///
/// `start` restarts the loop from position zero and may be rejected by the
/// engine; every other operation is best-effort and infallible. None of these
/// calls block: the real implementation pushes commands onto a lock-free
/// queue drained by the audio callback.
pub trait Player {
    /// Begin looping playback from the start of the sound.
    fn start(&mut self, id: &TrackId) -> anyhow::Result<()>;

    /// Pause playback, keeping the current position.
    fn pause(&mut self, id: &TrackId);

    /// Apply an effective gain in 0.0-1.0, audible immediately.
    fn set_gain(&mut self, id: &TrackId, gain: f32);

    /// Pause every sound and reset all positions to zero.
    fn stop_all(&mut self);
}
