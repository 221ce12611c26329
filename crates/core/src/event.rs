use atmomix_premix::SlotId;
use atmomix_tracks::TrackId;

use crate::premix::SlotState;

/// State-change notification for the presentation layer.
///
/// The mixer queues these as side effects of each intent; the host drains
/// them with [`crate::Mixer::poll_events`] after every call and renders
/// whatever changed. The core never touches the presentation directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TrackStarted(TrackId),
    TrackStopped(TrackId),
    TrackVolumeChanged { id: TrackId, percent: u8 },
    GlobalVolumeChanged { percent: u8 },
    MuteChanged(bool),
    SlotChanged { slot: SlotId, state: SlotState },
    TimerFinished,
}
