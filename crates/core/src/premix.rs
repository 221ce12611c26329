use atmomix_premix::{MAX_TITLE_LEN, MixSnapshot, Premix, SlotId, SoundSetting};

use crate::event::Event;
use crate::session::{Mixer, MixerError};

/// The fixed premix slots, in display order.
pub const DEFAULT_SLOTS: &[&str] = &["mix1", "mix2", "mix3", "mix4"];

/// Transient per-slot UI state. Never persisted; rebuilt from the store at
/// startup. The presentation layer maps its affordances (plus icon, text
/// input, title card) onto these variants instead of inferring state from
/// markup.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    Empty,
    Editing { draft: String },
    Saved(Premix),
    Playing(Premix),
}

impl SlotState {
    pub fn is_playing(&self) -> bool {
        matches!(self, SlotState::Playing(_))
    }

    pub fn premix(&self) -> Option<&Premix> {
        match self {
            SlotState::Saved(premix) | SlotState::Playing(premix) => Some(premix),
            SlotState::Empty | SlotState::Editing { .. } => None,
        }
    }
}

/// Trim, reject empty, truncate to [`MAX_TITLE_LEN`] characters. The same
/// policy runs at every save path.
fn sanitize_title(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_TITLE_LEN).collect())
}

impl Mixer {
    // ------------------------------------------------------------------
    // Slot observation
    // ------------------------------------------------------------------

    pub fn slots(&self) -> &[(SlotId, SlotState)] {
        &self.slots
    }

    pub fn slot_state(&self, slot: &SlotId) -> Result<&SlotState, MixerError> {
        let index = self.slot_index(slot)?;
        Ok(&self.slots[index].1)
    }

    /// The slot awaiting delete confirmation, if any.
    pub fn delete_pending(&self) -> Option<&SlotId> {
        self.pending_delete.as_ref()
    }

    fn slot_index(&self, slot: &SlotId) -> Result<usize, MixerError> {
        self.slots
            .iter()
            .position(|(id, _)| id == slot)
            .ok_or_else(|| MixerError::UnknownSlot(slot.clone()))
    }

    fn set_slot_state(&mut self, index: usize, state: SlotState) {
        self.slots[index].1 = state.clone();
        let slot = self.slots[index].0.clone();
        self.emit(Event::SlotChanged { slot, state });
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Primary click on a slot card: empty slots open the title editor,
    /// occupied slots restore their premix.
    pub fn slot_clicked(&mut self, slot: &SlotId) -> Result<(), MixerError> {
        let index = self.slot_index(slot)?;
        match &self.slots[index].1 {
            SlotState::Empty => self.begin_edit(slot),
            SlotState::Saved(_) | SlotState::Playing(_) => self.restore_premix(slot),
            SlotState::Editing { .. } => Ok(()),
        }
    }

    /// `Empty` -> `Editing` with a blank draft; any other state is left
    /// alone.
    pub fn begin_edit(&mut self, slot: &SlotId) -> Result<(), MixerError> {
        let index = self.slot_index(slot)?;
        if matches!(self.slots[index].1, SlotState::Empty) {
            self.set_slot_state(
                index,
                SlotState::Editing {
                    draft: String::new(),
                },
            );
        }
        Ok(())
    }

    pub fn edit_draft(&mut self, slot: &SlotId, text: impl Into<String>) -> Result<(), MixerError> {
        let index = self.slot_index(slot)?;
        if let SlotState::Editing { draft } = &mut self.slots[index].1 {
            *draft = text.into();
        }
        Ok(())
    }

    /// Commit the editor (Enter key or focus loss). A usable draft becomes a
    /// saved premix; an empty one returns the slot to `Empty` without
    /// touching persistence.
    pub fn commit_edit(&mut self, slot: &SlotId) -> Result<(), MixerError> {
        let index = self.slot_index(slot)?;
        let SlotState::Editing { draft } = self.slots[index].1.clone() else {
            return Ok(());
        };

        match sanitize_title(&draft) {
            Some(title) => self.save_premix(slot, &title),
            None => {
                self.set_slot_state(index, SlotState::Empty);
                Ok(())
            }
        }
    }

    /// Snapshot the current mix from the registry: one entry per known
    /// track, in registry order.
    pub fn capture_snapshot(&self) -> MixSnapshot {
        MixSnapshot::new(
            self.registry
                .list()
                .iter()
                .map(|t| SoundSetting {
                    id: t.id.clone(),
                    volume: t.volume,
                    is_playing: t.playing,
                })
                .collect(),
        )
    }

    /// Capture and persist the current mix into a slot. The slot only
    /// transitions once the store write succeeded; a failed write leaves
    /// everything visibly unchanged.
    pub fn save_premix(&mut self, slot: &SlotId, title: &str) -> Result<(), MixerError> {
        let index = self.slot_index(slot)?;
        let title = sanitize_title(title).ok_or(MixerError::EmptyTitle)?;

        let premix = Premix::new(title, self.capture_snapshot());
        self.store.save(slot, premix.clone())?;

        if self.pending_delete.as_ref() == Some(slot) {
            self.pending_delete = None;
        }
        self.set_slot_state(index, SlotState::Saved(premix));
        Ok(())
    }

    /// Re-drive the whole mix to a saved premix: stop everything, demote any
    /// other playing slot, apply every saved volume, then start the tracks
    /// that were playing. Volumes go in strictly before starts so each sound
    /// begins at its saved level.
    pub fn restore_premix(&mut self, slot: &SlotId) -> Result<(), MixerError> {
        let index = self.slot_index(slot)?;
        let premix = self.slots[index]
            .1
            .premix()
            .cloned()
            .ok_or_else(|| MixerError::EmptySlot(slot.clone()))?;

        self.stop_all();

        for entry in &premix.sounds {
            if !self.registry.contains(&entry.id) {
                // Stale snapshot entry; the roster no longer has this track.
                log::debug!("skipping unknown track '{}' in premix", entry.id);
                continue;
            }
            let _ = self.registry.set_volume(&entry.id, entry.volume);
            let gain = self.volume.effective(entry.volume);
            self.player.set_gain(&entry.id, gain);
            self.emit(Event::TrackVolumeChanged {
                id: entry.id.clone(),
                percent: entry.volume.min(100),
            });
        }

        for entry in &premix.sounds {
            if !entry.is_playing || !self.registry.contains(&entry.id) {
                continue;
            }
            match self.player.start(&entry.id) {
                Ok(()) => {
                    let _ = self.registry.set_playing(&entry.id, true);
                    self.emit(Event::TrackStarted(entry.id.clone()));
                }
                Err(e) => log::warn!("unable to start '{}': {e}", entry.id),
            }
        }

        self.set_slot_state(index, SlotState::Playing(premix));
        Ok(())
    }

    /// First half of the two-step delete: arm the confirmation. Slots
    /// without a premix are left alone.
    pub fn request_delete(&mut self, slot: &SlotId) -> Result<(), MixerError> {
        let index = self.slot_index(slot)?;
        if self.slots[index].1.premix().is_some() {
            self.pending_delete = Some(slot.clone());
        }
        Ok(())
    }

    /// Second half: only a confirmation matching the armed slot deletes
    /// anything.
    pub fn confirm_delete(&mut self, slot: &SlotId) -> Result<(), MixerError> {
        let index = self.slot_index(slot)?;
        if self.pending_delete.as_ref() != Some(slot) {
            return Ok(());
        }
        self.pending_delete = None;
        self.store.delete(slot)?;
        self.set_slot_state(index, SlotState::Empty);
        Ok(())
    }

    /// Cancel an armed delete; premix and persisted record stay unchanged.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// `Playing` slots drop back to `Saved`; part of `stop_all` and the
    /// single-active-premix invariant.
    pub(crate) fn demote_playing_slots(&mut self) {
        for index in 0..self.slots.len() {
            if let SlotState::Playing(premix) = self.slots[index].1.clone() {
                self.set_slot_state(index, SlotState::Saved(premix));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::session::test_player::{Call, FakePlayer, PlayerLog};
    use atmomix_premix::PremixStore;
    use atmomix_tracks::{TrackId, TrackRegistry};
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::{TempDir, tempdir};

    fn mixer_at(dir: &TempDir) -> (Mixer, Rc<RefCell<PlayerLog>>) {
        let (player, log) = FakePlayer::new();
        let mixer = Mixer::new(
            TrackRegistry::with_default_tracks(Path::new("assets")),
            Box::new(player),
            PremixStore::new(dir.path().join("premixes.json")),
        );
        (mixer, log)
    }

    fn mixer() -> (Mixer, Rc<RefCell<PlayerLog>>, TempDir) {
        let dir = tempdir().expect("tempdir");
        let (mixer, log) = mixer_at(&dir);
        (mixer, log, dir)
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn save_captures_one_entry_per_track_in_order() {
        let (mut mixer, _log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer.toggle_track(&TrackId::from("sound1")).expect("toggle");
        mixer
            .set_track_volume(&TrackId::from("sound1"), 30)
            .expect("volume");

        mixer.save_premix(&slot, "Focus").expect("save");

        let premix = mixer.slot_state(&slot).unwrap().premix().unwrap().clone();
        assert_eq!(premix.title, "Focus");
        assert_eq!(premix.sounds.len(), 6);
        let ids: Vec<&str> = premix.sounds.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["sound1", "sound2", "sound3", "sound4", "sound5", "sound6"]
        );
        assert_eq!(premix.sounds[0].volume, 30);
        assert!(premix.sounds[0].is_playing);
        assert!(!premix.sounds[1].is_playing);
    }

    #[test]
    fn restore_roundtrips_volume_and_playing_state() {
        let (mut mixer, log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer.toggle_track(&TrackId::from("sound1")).expect("toggle");
        mixer
            .set_track_volume(&TrackId::from("sound1"), 30)
            .expect("volume");
        mixer
            .set_track_volume(&TrackId::from("sound2"), 90)
            .expect("volume");
        mixer.save_premix(&slot, "Focus").expect("save");

        // Drift away from the saved mix.
        mixer.toggle_track(&TrackId::from("sound1")).expect("toggle");
        mixer
            .set_track_volume(&TrackId::from("sound1"), 5)
            .expect("volume");
        mixer.toggle_track(&TrackId::from("sound3")).expect("toggle");

        mixer.restore_premix(&slot).expect("restore");

        let sound1 = mixer.track(&TrackId::from("sound1")).unwrap();
        assert_eq!(sound1.volume, 30);
        assert!(sound1.playing);
        assert!(log.borrow().is_playing("sound1"));
        assert_close(log.borrow().gain("sound1"), 0.3 * 0.7);

        let sound2 = mixer.track(&TrackId::from("sound2")).unwrap();
        assert_eq!(sound2.volume, 90);
        assert!(!sound2.playing);

        let sound3 = mixer.track(&TrackId::from("sound3")).unwrap();
        assert!(!sound3.playing, "sound3 was stopped in the snapshot");
    }

    #[test]
    fn restore_applies_volumes_before_any_start() {
        let (mut mixer, log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer.toggle_track(&TrackId::from("sound1")).expect("toggle");
        mixer.toggle_track(&TrackId::from("sound2")).expect("toggle");
        mixer.save_premix(&slot, "Both").expect("save");

        log.borrow_mut().calls.clear();
        mixer.restore_premix(&slot).expect("restore");

        let log_ref = log.borrow();
        let calls = &log_ref.calls;
        let first_start = calls
            .iter()
            .position(|c| matches!(c, Call::Start(_)))
            .expect("start call");
        let last_gain = calls
            .iter()
            .rposition(|c| matches!(c, Call::SetGain(..)))
            .expect("gain call");
        assert!(
            last_gain < first_start,
            "every volume must be applied before the first start"
        );
    }

    #[test]
    fn restore_begins_with_stop_all() {
        let (mut mixer, log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer.save_premix(&slot, "Quiet").expect("save");
        log.borrow_mut().calls.clear();

        mixer.restore_premix(&slot).expect("restore");
        assert_eq!(log.borrow().calls.first(), Some(&Call::StopAll));
    }

    #[test]
    fn reload_scenario_restores_saved_premix() {
        let dir = tempdir().expect("tempdir");
        let slot = SlotId::from("mix1");

        {
            let (mut mixer, _log) = mixer_at(&dir);
            mixer.toggle_track(&TrackId::from("sound1")).expect("toggle");
            mixer
                .set_track_volume(&TrackId::from("sound1"), 30)
                .expect("volume");
            mixer
                .set_track_volume(&TrackId::from("sound2"), 0)
                .expect("volume");
            mixer.save_premix(&slot, "Focus").expect("save");
        }

        // Fresh session over the same blob, as after a page reload.
        let (mut mixer, log) = mixer_at(&dir);
        let state = mixer.slot_state(&slot).unwrap().clone();
        let premix = state.premix().expect("slot restored as Saved");
        assert_eq!(premix.title, "Focus");
        assert_eq!(premix.sounds[0].volume, 30);
        assert!(premix.sounds[0].is_playing);
        assert_eq!(premix.sounds[1].volume, 0);
        assert!(!premix.sounds[1].is_playing);

        mixer.slot_clicked(&slot).expect("click restores");
        assert!(log.borrow().is_playing("sound1"));
        assert!(!log.borrow().is_playing("sound2"));
        assert_close(log.borrow().gain("sound1"), 0.3 * 0.7);
    }

    #[test]
    fn at_most_one_slot_is_playing() {
        let (mut mixer, _log, _dir) = mixer();
        let a = SlotId::from("mix1");
        let b = SlotId::from("mix2");

        mixer.save_premix(&a, "First").expect("save");
        mixer.save_premix(&b, "Second").expect("save");

        mixer.restore_premix(&a).expect("restore");
        assert!(mixer.slot_state(&a).unwrap().is_playing());

        mixer.restore_premix(&b).expect("restore");
        let playing: Vec<&SlotId> = mixer
            .slots()
            .iter()
            .filter(|(_, state)| state.is_playing())
            .map(|(id, _)| id)
            .collect();
        assert_eq!(playing, vec![&b]);
        assert_eq!(
            mixer.slot_state(&a).unwrap().premix().unwrap().title,
            "First"
        );
    }

    #[test]
    fn whitespace_title_is_rejected() {
        let (mut mixer, _log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        let err = mixer.save_premix(&slot, "   ").unwrap_err();
        assert!(matches!(err, MixerError::EmptyTitle));
        assert_eq!(mixer.slot_state(&slot).unwrap(), &SlotState::Empty);
        assert!(mixer.store.load_all().is_empty());
    }

    #[test]
    fn long_title_is_truncated_to_20_chars() {
        let (mut mixer, _log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer
            .save_premix(&slot, "abcdefghijklmnopqrstuvwxy")
            .expect("save");

        let premix = mixer.slot_state(&slot).unwrap().premix().unwrap().clone();
        assert_eq!(premix.title, "abcdefghijklmnopqrst");
        assert_eq!(premix.title.chars().count(), 20);

        // The persisted copy carries the same policy.
        let stored = mixer.store.load_all();
        assert_eq!(stored[&slot].title, "abcdefghijklmnopqrst");
    }

    #[test]
    fn delete_requested_then_cancelled_changes_nothing() {
        let (mut mixer, _log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer.save_premix(&slot, "Keep me").expect("save");
        mixer.request_delete(&slot).expect("request");
        assert_eq!(mixer.delete_pending(), Some(&slot));

        mixer.cancel_delete();

        assert!(mixer.delete_pending().is_none());
        assert_eq!(
            mixer.slot_state(&slot).unwrap().premix().unwrap().title,
            "Keep me"
        );
        assert!(mixer.store.exists(&slot));
    }

    #[test]
    fn delete_confirmed_empties_slot_and_store() {
        let (mut mixer, _log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer.save_premix(&slot, "Old mix").expect("save");
        mixer.request_delete(&slot).expect("request");
        mixer.confirm_delete(&slot).expect("confirm");

        assert_eq!(mixer.slot_state(&slot).unwrap(), &SlotState::Empty);
        assert!(!mixer.store.exists(&slot));
        assert!(mixer.delete_pending().is_none());
    }

    #[test]
    fn confirm_without_request_is_a_noop() {
        let (mut mixer, _log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer.save_premix(&slot, "Survivor").expect("save");
        mixer.confirm_delete(&slot).expect("confirm");

        assert!(mixer.store.exists(&slot));
        assert!(mixer.slot_state(&slot).unwrap().premix().is_some());
    }

    #[test]
    fn request_delete_on_empty_slot_is_ignored() {
        let (mut mixer, _log, _dir) = mixer();
        mixer.request_delete(&SlotId::from("mix1")).expect("request");
        assert!(mixer.delete_pending().is_none());
    }

    #[test]
    fn empty_commit_returns_to_empty_without_persisting() {
        let (mut mixer, _log, dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer.begin_edit(&slot).expect("edit");
        mixer.edit_draft(&slot, "   ").expect("draft");
        mixer.commit_edit(&slot).expect("commit");

        assert_eq!(mixer.slot_state(&slot).unwrap(), &SlotState::Empty);
        assert!(!dir.path().join("premixes.json").exists());
    }

    #[test]
    fn commit_with_content_saves_the_premix() {
        let (mut mixer, _log, _dir) = mixer();
        let slot = SlotId::from("mix2");

        mixer.slot_clicked(&slot).expect("click opens editor");
        assert!(matches!(
            mixer.slot_state(&slot).unwrap(),
            SlotState::Editing { .. }
        ));

        mixer.edit_draft(&slot, "Evening rain").expect("draft");
        mixer.commit_edit(&slot).expect("commit");

        let premix = mixer.slot_state(&slot).unwrap().premix().unwrap().clone();
        assert_eq!(premix.title, "Evening rain");
        assert!(mixer.store.exists(&slot));
    }

    #[test]
    fn restore_skips_unknown_snapshot_entries() {
        let dir = tempdir().expect("tempdir");
        let slot = SlotId::from("mix1");

        // Blob written by an older roster that still had "sound99".
        let store = PremixStore::new(dir.path().join("premixes.json"));
        store
            .save(
                &slot,
                Premix {
                    title: "Stale".to_string(),
                    sounds: vec![
                        SoundSetting {
                            id: TrackId::from("sound99"),
                            volume: 80,
                            is_playing: true,
                        },
                        SoundSetting {
                            id: TrackId::from("sound1"),
                            volume: 40,
                            is_playing: true,
                        },
                    ],
                    timestamp: 0,
                },
            )
            .expect("seed blob");

        let (mut mixer, log) = mixer_at(&dir);
        mixer.restore_premix(&slot).expect("restore");

        assert!(log.borrow().is_playing("sound1"));
        assert!(!log.borrow().is_playing("sound99"));
        assert_close(log.borrow().gain("sound1"), 0.4 * 0.7);
    }

    #[test]
    fn restore_empty_slot_is_a_typed_noop() {
        let (mut mixer, _log, _dir) = mixer();
        let err = mixer.restore_premix(&SlotId::from("mix1")).unwrap_err();
        assert!(matches!(err, MixerError::EmptySlot(_)));
    }

    #[test]
    fn unknown_slot_is_a_typed_noop() {
        let (mut mixer, _log, _dir) = mixer();
        let err = mixer.slot_clicked(&SlotId::from("mix99")).unwrap_err();
        assert!(matches!(err, MixerError::UnknownSlot(_)));
    }

    #[test]
    fn manual_tweak_does_not_resnapshot_active_premix() {
        let (mut mixer, _log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer
            .set_track_volume(&TrackId::from("sound1"), 30)
            .expect("volume");
        mixer.save_premix(&slot, "Frozen").expect("save");
        mixer.restore_premix(&slot).expect("restore");

        // Diverge from the active premix; its content stays frozen.
        mixer
            .set_track_volume(&TrackId::from("sound1"), 95)
            .expect("volume");

        let premix = mixer.slot_state(&slot).unwrap().premix().unwrap().clone();
        assert_eq!(premix.sounds[0].volume, 30);
        let stored = mixer.store.load_all();
        assert_eq!(stored[&slot].sounds[0].volume, 30);
    }

    #[test]
    fn slot_changed_events_follow_transitions() {
        let (mut mixer, _log, _dir) = mixer();
        let slot = SlotId::from("mix1");

        mixer.begin_edit(&slot).expect("edit");
        mixer.edit_draft(&slot, "Night").expect("draft");
        mixer.commit_edit(&slot).expect("commit");

        let states: Vec<SlotState> = mixer
            .poll_events()
            .into_iter()
            .filter_map(|e| match e {
                Event::SlotChanged { slot: s, state } if s == slot => Some(state),
                _ => None,
            })
            .collect();

        assert!(matches!(states.first(), Some(SlotState::Editing { .. })));
        assert!(matches!(states.last(), Some(SlotState::Saved(_))));
    }
}
