pub mod config;
pub mod event;
pub mod premix;
pub mod session;
pub mod timer;

pub use config::Config;
pub use event::Event;
pub use premix::{DEFAULT_SLOTS, SlotState};
pub use session::{DEFAULT_MULTIPLIER, Mixer, MixerError};
pub use timer::SessionTimer;

pub use atmomix_playback::{AudioData, Player, SoundSource, decode_asset};
pub use atmomix_premix::{
    MAX_TITLE_LEN, MixSnapshot, Premix, PremixStore, SlotId, SoundSetting, StoreError,
};
pub use atmomix_tracks::{DEFAULT_TRACKS, RegistryError, Track, TrackId, TrackRegistry};
