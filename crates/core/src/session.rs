use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use atmomix_playback::{Player, SoundSource};
use atmomix_premix::{PremixStore, SlotId, StoreError};
use atmomix_tracks::{RegistryError, Track, TrackId, TrackRegistry};

use crate::config::Config;
use crate::event::Event;
use crate::premix::{DEFAULT_SLOTS, SlotState};
use crate::timer::SessionTimer;

/// Global volume multiplier applied when nothing else is configured, and the
/// value unmute falls back to when no pre-mute snapshot exists.
pub const DEFAULT_MULTIPLIER: f32 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("unknown premix slot '{0}'")]
    UnknownSlot(SlotId),

    #[error("slot '{0}' has no saved premix")]
    EmptySlot(SlotId),

    #[error("premix title is empty")]
    EmptyTitle,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Global gain state: one multiplier over every track, plus the mute latch.
///
/// While muted every effective gain is 0 regardless of slider positions; the
/// pre-mute snapshot remembers the per-track percents so unmute can put them
/// back.
#[derive(Debug)]
pub(crate) struct GlobalVolume {
    pub(crate) multiplier: f32,
    pub(crate) muted: bool,
    pub(crate) premute: Option<Vec<(TrackId, u8)>>,
}

impl GlobalVolume {
    fn new(multiplier: f32) -> Self {
        Self {
            multiplier: multiplier.clamp(0.0, 1.0),
            muted: false,
            premute: None,
        }
    }

    /// Effective gain for a slider position: percent/100 x multiplier,
    /// forced to 0 while muted.
    pub(crate) fn effective(&self, percent: u8) -> f32 {
        if self.muted {
            0.0
        } else {
            percent.min(100) as f32 / 100.0 * self.multiplier
        }
    }

    fn percent(&self) -> u8 {
        (self.multiplier * 100.0).round() as u8
    }
}

/// The mixer session: the single owner of track state, playback, premix
/// slots, and the sleep timer.
///
/// Every method runs to completion synchronously on the caller's thread; the
/// audio engine is only ever reached through the [`Player`] seam. The
/// presentation layer calls intents and drains [`poll_events`] afterwards.
///
/// [`poll_events`]: Mixer::poll_events
pub struct Mixer {
    pub(crate) registry: TrackRegistry,
    pub(crate) player: Box<dyn Player>,
    pub(crate) volume: GlobalVolume,
    pub(crate) store: PremixStore,
    pub(crate) slots: Vec<(SlotId, SlotState)>,
    pub(crate) pending_delete: Option<SlotId>,
    pub(crate) timer: SessionTimer,
    pub(crate) events: VecDeque<Event>,
}

impl Mixer {
    pub fn new(registry: TrackRegistry, player: Box<dyn Player>, store: PremixStore) -> Self {
        let slots = DEFAULT_SLOTS.iter().map(|id| SlotId::from(*id)).collect();
        Self::with_slots(registry, player, store, slots)
    }

    /// Build a mixer over an explicit set of premix slots. Slots holding a
    /// persisted premix come up `Saved`; everything else starts `Empty`.
    pub fn with_slots(
        registry: TrackRegistry,
        player: Box<dyn Player>,
        store: PremixStore,
        slot_ids: Vec<SlotId>,
    ) -> Self {
        let saved = store.load_all();
        let slots = slot_ids
            .into_iter()
            .map(|id| {
                let state = match saved.get(&id) {
                    Some(premix) => SlotState::Saved(premix.clone()),
                    None => SlotState::Empty,
                };
                (id, state)
            })
            .collect();

        let mut mixer = Self {
            registry,
            player,
            volume: GlobalVolume::new(DEFAULT_MULTIPLIER),
            store,
            slots,
            pending_delete: None,
            timer: SessionTimer::new(),
            events: VecDeque::new(),
        };
        mixer.sync_all_gains();
        mixer
    }

    /// Assemble a full session: default roster, decoded assets, live cpal
    /// engine, config-resolved premix store.
    ///
    /// A track whose asset fails to decode stays visible but silently
    /// disabled: the engine has no source for it, so starting it is rejected
    /// and reported.
    pub fn start(assets_root: &Path) -> anyhow::Result<Self> {
        let config = Config::load();
        let registry = TrackRegistry::with_default_tracks(assets_root);

        let mut sources = Vec::new();
        for track in registry.list() {
            match atmomix_playback::decode_asset(&track.asset) {
                Ok(audio) => sources.push(SoundSource {
                    id: track.id.clone(),
                    audio,
                }),
                Err(e) => log::warn!(
                    "unable to load {}: {e}; '{}' disabled",
                    track.asset.display(),
                    track.id
                ),
            }
        }

        let player = atmomix_playback::start(sources)?;

        let store_path = config
            .premix_path
            .clone()
            .or_else(PremixStore::default_path)
            .unwrap_or_else(|| PathBuf::from("premixes.json"));

        let mut mixer = Self::new(registry, Box::new(player), PremixStore::new(store_path));
        if let Some(percent) = config.global_volume {
            mixer.set_global_volume(percent);
        }
        Ok(mixer)
    }

    // ------------------------------------------------------------------
    // Track playback
    // ------------------------------------------------------------------

    /// Toggle one track between stopped and playing.
    ///
    /// Starting restarts the loop from position zero, with the gain applied
    /// before the start request so the sound comes in at its slider level.
    /// A rejected start is reported and leaves the track stopped; the user
    /// can simply click again.
    pub fn toggle_track(&mut self, id: &TrackId) -> Result<(), MixerError> {
        let (playing, percent) = {
            let track = self.registry.get(id)?;
            (track.playing, track.volume)
        };

        if playing {
            self.player.pause(id);
            self.registry.set_playing(id, false)?;
            self.emit(Event::TrackStopped(id.clone()));
        } else {
            self.player.set_gain(id, self.volume.effective(percent));
            match self.player.start(id) {
                Ok(()) => {
                    self.registry.set_playing(id, true)?;
                    self.emit(Event::TrackStarted(id.clone()));
                }
                Err(e) => log::warn!("unable to start '{id}': {e}"),
            }
        }
        Ok(())
    }

    /// Move a track's volume slider. The effective gain changes immediately
    /// whether or not the track is playing.
    pub fn set_track_volume(&mut self, id: &TrackId, percent: u8) -> Result<(), MixerError> {
        self.registry.set_volume(id, percent)?;
        let percent = self.registry.get(id)?.volume;
        self.player.set_gain(id, self.volume.effective(percent));
        self.emit(Event::TrackVolumeChanged {
            id: id.clone(),
            percent,
        });
        Ok(())
    }

    /// Move the global volume slider (0-100); re-applies every track's gain
    /// from its last-set percent.
    pub fn set_global_volume(&mut self, percent: u8) {
        let percent = percent.min(100);
        self.volume.multiplier = percent as f32 / 100.0;
        self.sync_all_gains();
        self.emit(Event::GlobalVolumeChanged { percent });
    }

    /// Mute everything, remembering each track's slider position first.
    /// Calling mute while already muted never overwrites the snapshot.
    pub fn mute_all(&mut self) {
        if self.volume.muted {
            return;
        }
        self.volume.premute = Some(
            self.registry
                .list()
                .iter()
                .map(|t| (t.id.clone(), t.volume))
                .collect(),
        );
        self.volume.muted = true;
        self.sync_all_gains();
        self.emit(Event::MuteChanged(true));
    }

    /// Unmute, restoring the pre-mute slider positions. With no snapshot
    /// (unmute as the very first action) the multiplier falls back to the
    /// 0.7 default and current percents are re-applied.
    pub fn unmute_all(&mut self) {
        let was_muted = self.volume.muted;
        self.volume.muted = false;

        match self.volume.premute.take() {
            Some(saved) => {
                for (id, percent) in saved {
                    let _ = self.registry.set_volume(&id, percent);
                    self.player.set_gain(&id, self.volume.effective(percent));
                    self.emit(Event::TrackVolumeChanged { id, percent });
                }
            }
            None => {
                self.volume.multiplier = DEFAULT_MULTIPLIER;
                self.sync_all_gains();
                self.emit(Event::GlobalVolumeChanged {
                    percent: self.volume.percent(),
                });
            }
        }

        if was_muted {
            self.emit(Event::MuteChanged(false));
        }
    }

    pub fn mute_toggle(&mut self) {
        if self.volume.muted {
            self.unmute_all();
        } else {
            self.mute_all();
        }
    }

    /// Stop every track and reset positions; also demotes any `Playing`
    /// premix slot back to `Saved`. Precondition of every premix restore and
    /// the sleep timer's shutoff action.
    pub fn stop_all(&mut self) {
        self.player.stop_all();
        let playing: Vec<TrackId> = self
            .registry
            .list()
            .iter()
            .filter(|t| t.playing)
            .map(|t| t.id.clone())
            .collect();
        for id in playing {
            let _ = self.registry.set_playing(&id, false);
            self.emit(Event::TrackStopped(id));
        }
        self.demote_playing_slots();
    }

    /// Re-apply the effective gain of every track from its current percent.
    pub(crate) fn sync_all_gains(&mut self) {
        let tracks: Vec<(TrackId, u8)> = self
            .registry
            .list()
            .iter()
            .map(|t| (t.id.clone(), t.volume))
            .collect();
        for (id, percent) in tracks {
            self.player.set_gain(&id, self.volume.effective(percent));
        }
    }

    // ------------------------------------------------------------------
    // Sleep timer
    // ------------------------------------------------------------------

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn timer_toggle(&mut self) {
        self.timer.toggle();
    }

    pub fn timer_reset(&mut self) {
        self.timer.reset();
    }

    /// One-second host tick. When the countdown reaches zero every sound is
    /// stopped.
    pub fn timer_tick(&mut self) {
        if self.timer.tick() {
            self.stop_all();
            self.emit(Event::TimerFinished);
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn tracks(&self) -> &[Track] {
        self.registry.list()
    }

    pub fn track(&self, id: &TrackId) -> Result<&Track, MixerError> {
        Ok(self.registry.get(id)?)
    }

    pub fn global_volume_percent(&self) -> u8 {
        self.volume.percent()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.muted
    }

    /// Drain queued state-change notifications for the presentation layer.
    pub fn poll_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push_back(event);
    }
}
