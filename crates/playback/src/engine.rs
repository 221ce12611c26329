use atmomix_tracks::TrackId;
use cpal::{
    FromSample, SizedSample,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use crate::{Player, SoundSource};

enum Command {
    Start(usize),
    Pause(usize),
    SetGain(usize, f32),
    StopAll,
}

struct Voice {
    audio: crate::AudioData,
    /// Fractional frame position into the source; advances by the
    /// source-rate / output-rate ratio each output frame and wraps (loop).
    position: f64,
    step: f64,
    gain: f32,
    playing: bool,
}

/// Handle to the running audio engine.
///
/// Implements [`Player`] by pushing commands onto a lock-free queue that the
/// cpal callback drains. `start` is the only fallible operation: a full queue
/// means the engine rejected the request and the sound stays stopped.
pub struct EngineHandle {
    ids: Vec<TrackId>,
    commands: rtrb::Producer<Command>,
    _stream: cpal::Stream,
}

impl EngineHandle {
    fn index_of(&self, id: &TrackId) -> Option<usize> {
        self.ids.iter().position(|known| known == id)
    }
}

impl Player for EngineHandle {
    fn start(&mut self, id: &TrackId) -> anyhow::Result<()> {
        let index = self
            .index_of(id)
            .ok_or_else(|| anyhow::anyhow!("no sound loaded for track '{id}'"))?;
        self.commands
            .push(Command::Start(index))
            .map_err(|_| anyhow::anyhow!("playback engine rejected start for '{id}'"))
    }

    fn pause(&mut self, id: &TrackId) {
        if let Some(index) = self.index_of(id) {
            let _ = self.commands.push(Command::Pause(index));
        }
    }

    fn set_gain(&mut self, id: &TrackId, gain: f32) {
        if let Some(index) = self.index_of(id) {
            let _ = self.commands.push(Command::SetGain(index, gain));
        }
    }

    fn stop_all(&mut self) {
        let _ = self.commands.push(Command::StopAll);
    }
}

/// Start the audio engine with a fixed set of looping sources.
///
/// The source set never changes after startup, so the decoded buffers move
/// into the callback once and all later control flows through the command
/// queue.
pub fn start(sources: Vec<SoundSource>) -> anyhow::Result<EngineHandle> {
    let (command_tx, command_rx) = rtrb::RingBuffer::<Command>::new(256);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("no output device found"))?;

    let config = device.default_output_config()?;

    let ids = sources.iter().map(|s| s.id.clone()).collect();

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            build_stream::<f32>(&device, &config.into(), sources, command_rx)?
        }
        sample_format => anyhow::bail!("unsupported sample format '{sample_format}'"),
    };

    stream.play()?;

    Ok(EngineHandle {
        ids,
        commands: command_tx,
        _stream: stream,
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sources: Vec<SoundSource>,
    mut command_rx: rtrb::Consumer<Command>,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let output_channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;

    let mut voices: Vec<Voice> = sources
        .into_iter()
        .map(|source| Voice {
            step: source.audio.sample_rate() as f64 / sample_rate as f64,
            audio: source.audio,
            position: 0.0,
            gain: 0.0,
            playing: false,
        })
        .collect();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = command_rx.pop() {
                match cmd {
                    Command::Start(i) => {
                        if let Some(voice) = voices.get_mut(i) {
                            voice.position = 0.0;
                            voice.playing = true;
                        }
                    }
                    Command::Pause(i) => {
                        if let Some(voice) = voices.get_mut(i) {
                            voice.playing = false;
                        }
                    }
                    Command::SetGain(i, gain) => {
                        if let Some(voice) = voices.get_mut(i) {
                            voice.gain = gain;
                        }
                    }
                    Command::StopAll => {
                        for voice in &mut voices {
                            voice.playing = false;
                            voice.position = 0.0;
                        }
                    }
                }
            }

            for frame in data.chunks_mut(output_channels) {
                let mut mixed = vec![0.0f32; output_channels];

                for voice in &mut voices {
                    if !voice.playing || voice.audio.is_empty() {
                        continue;
                    }

                    let channels = voice.audio.channels() as usize;
                    let samples = voice.audio.samples();
                    let total_frames = voice.audio.frames();
                    let frame_index = voice.position as usize;

                    for (ch, mix_sample) in mixed.iter_mut().enumerate() {
                        let voice_ch = ch % channels;
                        let idx = frame_index * channels + voice_ch;
                        if idx < samples.len() {
                            *mix_sample += samples[idx] * voice.gain;
                        }
                    }

                    voice.position += voice.step;
                    if voice.position >= total_frames as f64 {
                        // Ambient loops wrap back to the start.
                        voice.position -= total_frames as f64;
                    }
                }

                for (ch, sample) in frame.iter_mut().enumerate() {
                    *sample = T::from_sample(mixed[ch]);
                }
            }
        },
        |err| log::error!("stream error: {err}"),
        None,
    )?;

    Ok(stream)
}
