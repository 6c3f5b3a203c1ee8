use std::collections::HashMap;

use shared::model::{QueueSnapshot, Track};
use thiserror::Error;

/// How long an add stays in flight, whatever the server answers.
pub const IN_FLIGHT_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddRejection {
    #[error("That song is already in the queue")]
    AlreadyQueued,
    #[error("That song is playing right now")]
    CurrentlyPlaying,
    #[error("That song is already being added")]
    InFlight,
}

#[derive(Debug, Default)]
pub struct QueueView {
    tracks: Vec<Track>,
    current: Option<Track>,
    in_flight: HashMap<String, u64>,
    loading: bool,
    last_error: Option<String>,
}

impl QueueView {
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    pub fn replace_snapshot(&mut self, snapshot: QueueSnapshot) {
        self.loading = false;
        self.last_error = None;
        self.tracks = snapshot.playlist;
        self.current = snapshot.current_track;
    }

    /// Keeps the stale snapshot around.
    pub fn fetch_failed(&mut self, error: String) {
        self.loading = false;
        self.last_error = Some(error);
    }

    pub fn apply_playlist(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }

    pub fn set_current(&mut self, track: Option<Track>) {
        self.current = track;
    }

    /// Radio pushes only ever fill in the current track; an empty one says
    /// nothing about what the queue last reported.
    pub fn follow_playback(&mut self, track: Option<&Track>) {
        if let Some(track) = track {
            self.current = Some(track.clone());
        }
    }

    pub fn is_in_queue(&self, track_id: &str) -> bool {
        self.tracks.iter().any(|track| track.id == track_id)
            || self.current.as_ref().map_or(false, |track| track.id == track_id)
    }

    pub fn is_adding(&self, track_id: &str) -> bool {
        self.in_flight.contains_key(track_id)
    }

    /// Marks `track_id` as in flight, or says why no request should be made.
    pub fn begin_add(&mut self, track_id: &str, now_ms: u64) -> Result<(), AddRejection> {
        if self.current.as_ref().map_or(false, |track| track.id == track_id) {
            return Err(AddRejection::CurrentlyPlaying);
        }
        if self.tracks.iter().any(|track| track.id == track_id) {
            return Err(AddRejection::AlreadyQueued);
        }
        if self.is_adding(track_id) {
            return Err(AddRejection::InFlight);
        }

        self.in_flight
            .insert(track_id.to_string(), now_ms + IN_FLIGHT_MS);
        Ok(())
    }

    /// Drops in-flight marks whose delay has run out.
    pub fn expire(&mut self, now_ms: u64) -> usize {
        let before = self.in_flight.len();
        self.in_flight.retain(|_, expires_at| *expires_at > now_ms);
        before - self.in_flight.len()
    }

    pub fn removal_target(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: id.into(),
            title: id.to_uppercase(),
            artist: "Artist".into(),
            album: None,
            duration_seconds: 120.0,
            thumbnail_url: None,
            stream_url: None,
        }
    }

    fn queue() -> QueueView {
        let mut queue = QueueView::default();
        queue.replace_snapshot(QueueSnapshot {
            playlist: vec![track("a"), track("b")],
            current_track: Some(track("now")),
        });
        queue
    }

    #[test]
    fn test_rejects_known_tracks_without_request() {
        let mut queue = queue();

        assert_eq!(queue.begin_add("a", 0), Err(AddRejection::AlreadyQueued));
        assert_eq!(queue.begin_add("now", 0), Err(AddRejection::CurrentlyPlaying));
        assert!(!queue.is_adding("a"));
        assert!(!queue.is_adding("now"));
    }

    #[test]
    fn test_rapid_double_add() {
        let mut queue = queue();

        assert_eq!(queue.begin_add("t1", 0), Ok(()));
        assert_eq!(queue.begin_add("t1", 40), Err(AddRejection::InFlight));
        assert!(queue.is_adding("t1"));
    }

    #[test]
    fn test_in_flight_expires_after_fixed_delay() {
        let mut queue = queue();
        queue.begin_add("t1", 0).unwrap();

        assert_eq!(queue.expire(IN_FLIGHT_MS - 1), 0);
        assert!(queue.is_adding("t1"));

        assert_eq!(queue.expire(IN_FLIGHT_MS), 1);
        assert_eq!(queue.begin_add("t1", IN_FLIGHT_MS), Ok(()));
    }

    #[test]
    fn test_push_makes_added_track_unaddable() {
        let mut queue = queue();
        queue.begin_add("t1", 0).unwrap();
        queue.apply_playlist(vec![track("a"), track("b"), track("t1")]);
        queue.expire(5_000);

        assert_eq!(queue.begin_add("t1", 5_000), Err(AddRejection::AlreadyQueued));
    }

    #[test]
    fn test_failed_fetch_keeps_snapshot() {
        let mut queue = queue();
        queue.begin_fetch();
        queue.fetch_failed("offline".into());

        assert!(!queue.loading());
        assert_eq!(queue.tracks().len(), 2);
        assert_eq!(queue.current().map(|t| t.id.as_str()), Some("now"));
        assert_eq!(queue.last_error(), Some("offline"));
    }

    #[test]
    fn test_snapshot_replaces_wholesale() {
        let mut queue = queue();
        queue.replace_snapshot(QueueSnapshot {
            playlist: vec![track("z")],
            current_track: None,
        });

        assert_eq!(queue.tracks(), &[track("z")]);
        assert!(queue.current().is_none());
        assert!(!queue.is_in_queue("a"));
    }

    #[test]
    fn test_current_track_survives_empty_radio_state() {
        let mut queue = queue();
        queue.follow_playback(None);
        assert_eq!(queue.begin_add("now", 0), Err(AddRejection::CurrentlyPlaying));

        queue.follow_playback(Some(&track("next")));
        assert_eq!(queue.current().map(|t| t.id.as_str()), Some("next"));
        assert_eq!(queue.begin_add("next", 0), Err(AddRejection::CurrentlyPlaying));

        queue.set_current(None);
        assert_eq!(queue.begin_add("next", 0), Ok(()));
    }

    #[test]
    fn test_removal_target() {
        let queue = queue();

        assert_eq!(queue.removal_target(1).map(|t| t.id.as_str()), Some("b"));
        assert!(queue.removal_target(2).is_none());
    }
}
