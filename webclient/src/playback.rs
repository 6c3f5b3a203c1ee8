use log::{debug, info};
use shared::model::{PlaybackState, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Source attached and playback requested, nothing audible yet.
    Prepared,
    Playing,
}

/// Server position captured together with the local clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub position_seconds: f64,
    pub captured_at_ms: u64,
}

impl Anchor {
    fn extrapolate(&self, now_ms: u64) -> f64 {
        self.position_seconds + now_ms.saturating_sub(self.captured_at_ms) as f64 / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    Load { url: String },
    Play,
    Pause,
}

#[derive(Debug)]
pub struct PlaybackSync {
    stream_url: String,
    state: PlaybackState,
    phase: Phase,
    audio_enabled: bool,
    source_attached: bool,
    anchor: Anchor,
    elapsed_seconds: f64,
    listeners: u32,
}

impl PlaybackSync {
    pub fn new(stream_url: String) -> Self {
        PlaybackSync {
            stream_url,
            state: PlaybackState::default(),
            phase: Phase::Idle,
            audio_enabled: false,
            source_attached: false,
            anchor: Anchor {
                position_seconds: 0.0,
                captured_at_ms: 0,
            },
            elapsed_seconds: 0.0,
            listeners: 0,
        }
    }

    pub fn track(&self) -> Option<&Track> {
        self.state.current_track.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing && self.state.current_track.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn listener_count(&self) -> u32 {
        self.listeners
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn duration_seconds(&self) -> f64 {
        self.track()
            .map(|track| track.duration_seconds.max(0.0))
            .unwrap_or(0.0)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn progress_percent(&self) -> f64 {
        let duration = self.duration_seconds();
        if duration > 0.0 {
            (self.elapsed_seconds / duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub fn formatted_elapsed(&self) -> String {
        format_clock(self.elapsed_seconds)
    }

    pub fn formatted_duration(&self) -> String {
        format_clock(self.duration_seconds())
    }

    fn clamp_to_track(&self, seconds: f64) -> f64 {
        let duration = self.duration_seconds();
        if duration > 0.0 {
            seconds.clamp(0.0, duration)
        } else {
            seconds.max(0.0)
        }
    }

    fn re_anchor(&mut self, now_ms: u64) {
        self.anchor = Anchor {
            position_seconds: self.state.position_seconds,
            captured_at_ms: now_ms,
        };
        self.elapsed_seconds = self.clamp_to_track(self.anchor.position_seconds);
    }

    /// Applies an authoritative radio state push.
    pub fn apply(&mut self, mut state: PlaybackState, now_ms: u64) -> Vec<AudioCommand> {
        let previous_id = self.track().map(|track| track.id.clone());
        let track_changed = previous_id.as_deref() != state.current_track.as_ref().map(|t| t.id.as_str());

        if let Some(count) = state.listener_count.take() {
            self.listeners = count;
        }
        self.state = state;
        self.re_anchor(now_ms);

        if track_changed {
            debug!(
                "track changed: {:?} -> {:?}",
                previous_id,
                self.track().map(|track| &track.id)
            );
        }

        if !self.is_playing() {
            return self.halt();
        }

        if track_changed || !self.source_attached {
            return self.start_stream();
        }

        if self.phase == Phase::Idle && self.audio_enabled {
            self.phase = Phase::Prepared;
            return vec![AudioCommand::Play];
        }

        Vec::new()
    }

    /// Progress pushes keep the current track when they don't carry one.
    pub fn apply_progress(&mut self, mut state: PlaybackState, now_ms: u64) -> Vec<AudioCommand> {
        if state.current_track.is_none() {
            state.current_track = self.state.current_track.clone();
        }
        self.apply(state, now_ms)
    }

    pub fn apply_current_track(&mut self, track: Option<Track>, now_ms: u64) -> Vec<AudioCommand> {
        let mut state = self.state.clone();
        let same_track = match (&track, self.track()) {
            (Some(next), Some(current)) => next.id == current.id,
            _ => false,
        };
        if !same_track {
            state.position_seconds = 0.0;
        }
        if track.is_none() {
            state.is_playing = false;
        }
        state.current_track = track;
        self.apply(state, now_ms)
    }

    pub fn set_listener_count(&mut self, count: u32) {
        self.listeners = count;
    }

    fn halt(&mut self) -> Vec<AudioCommand> {
        let was_active = self.phase != Phase::Idle;
        self.phase = Phase::Idle;
        if self.state.current_track.is_none() {
            self.source_attached = false;
        }

        if was_active {
            vec![AudioCommand::Pause]
        } else {
            Vec::new()
        }
    }

    fn start_stream(&mut self) -> Vec<AudioCommand> {
        if !self.audio_enabled {
            return Vec::new();
        }

        self.source_attached = true;
        self.phase = Phase::Prepared;
        vec![
            AudioCommand::Load {
                url: self.stream_url.clone(),
            },
            AudioCommand::Play,
        ]
    }

    /// Called from the user gesture that unlocks audio output.
    pub fn enable_audio(&mut self) -> Vec<AudioCommand> {
        self.audio_enabled = true;
        if self.is_playing() {
            self.start_stream()
        } else {
            Vec::new()
        }
    }

    /// `play()` was refused, usually by the autoplay policy.
    pub fn audio_blocked(&mut self) {
        self.audio_enabled = false;
        self.source_attached = false;
        self.phase = Phase::Idle;
    }

    /// The element actually started producing sound.
    pub fn on_audible(&mut self, now_ms: u64) {
        if !self.is_playing() {
            return;
        }
        self.phase = Phase::Playing;
        self.re_anchor(now_ms);
        info!("stream audible at {}", self.formatted_elapsed());
    }

    /// Stall or end of the stream while the radio is still live.
    pub fn on_interrupted(&mut self) -> Vec<AudioCommand> {
        if !self.is_playing() || !self.audio_enabled {
            return Vec::new();
        }
        info!("stream interrupted, requesting it again");
        self.start_stream()
    }

    pub fn tick(&mut self, now_ms: u64) {
        let position = if self.is_playing() {
            self.anchor.extrapolate(now_ms)
        } else {
            self.anchor.position_seconds
        };
        self.elapsed_seconds = self.clamp_to_track(position);
    }
}

pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0).floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "http://localhost:5000/api/radio/stream";

    fn track(id: &str, duration_seconds: f64) -> Track {
        Track {
            id: id.into(),
            title: format!("Track {}", id),
            artist: "Artist".into(),
            album: None,
            duration_seconds,
            thumbnail_url: None,
            stream_url: None,
        }
    }

    fn live(id: &str, duration: f64, position: f64) -> PlaybackState {
        PlaybackState {
            current_track: Some(track(id, duration)),
            is_playing: true,
            position_seconds: position,
            listener_count: Some(3),
        }
    }

    fn enabled() -> PlaybackSync {
        let mut sync = PlaybackSync::new(STREAM.into());
        sync.enable_audio();
        sync
    }

    #[test]
    fn test_anchor_extrapolation_scenario() {
        let mut sync = PlaybackSync::new(STREAM.into());
        sync.apply(live("t1", 180.0, 30.0), 10_000);
        assert_eq!(sync.elapsed_seconds(), 30.0);

        sync.tick(15_000);
        assert!((sync.elapsed_seconds() - 35.0).abs() < 1e-9);
        assert!((sync.progress_percent() - 19.444).abs() < 0.01);
        assert_eq!(sync.formatted_elapsed(), "0:35");
        assert_eq!(sync.formatted_duration(), "3:00");
    }

    #[test]
    fn test_elapsed_never_exceeds_duration() {
        let mut sync = PlaybackSync::new(STREAM.into());
        sync.apply(live("t1", 180.0, 170.0), 0);

        for now in (0..60_000).step_by(700) {
            sync.tick(now);
            assert!(sync.elapsed_seconds() >= 0.0);
            assert!(sync.elapsed_seconds() <= 180.0);
            assert!((0.0..=100.0).contains(&sync.progress_percent()));
        }
        assert_eq!(sync.progress_percent(), 100.0);
    }

    #[test]
    fn test_bogus_positions_are_clamped() {
        let mut sync = PlaybackSync::new(STREAM.into());
        sync.apply(live("t1", 120.0, -4.0), 0);
        assert_eq!(sync.elapsed_seconds(), 0.0);

        sync.apply(live("t1", 120.0, 500.0), 0);
        assert_eq!(sync.elapsed_seconds(), 120.0);
        assert_eq!(sync.progress_percent(), 100.0);
    }

    #[test]
    fn test_unknown_duration_reports_no_progress() {
        let mut sync = PlaybackSync::new(STREAM.into());
        sync.apply(live("t1", 0.0, 12.0), 0);
        sync.tick(3_000);

        assert_eq!(sync.elapsed_seconds(), 15.0);
        assert_eq!(sync.progress_percent(), 0.0);
    }

    #[test]
    fn test_push_resets_drift() {
        let mut sync = PlaybackSync::new(STREAM.into());
        sync.apply(live("t1", 300.0, 10.0), 0);
        sync.tick(20_000);
        assert_eq!(sync.elapsed_seconds(), 30.0);

        sync.apply(live("t1", 300.0, 27.0), 20_000);
        assert_eq!(sync.elapsed_seconds(), 27.0);
    }

    #[test]
    fn test_nothing_plays_before_audio_is_enabled() {
        let mut sync = PlaybackSync::new(STREAM.into());
        assert!(sync.apply(live("t1", 180.0, 0.0), 0).is_empty());
        assert_eq!(sync.phase(), Phase::Idle);

        assert_eq!(
            sync.enable_audio(),
            vec![
                AudioCommand::Load { url: STREAM.into() },
                AudioCommand::Play
            ]
        );
        assert_eq!(sync.phase(), Phase::Prepared);
    }

    #[test]
    fn test_track_lifecycle() {
        let mut sync = enabled();

        let commands = sync.apply(live("t1", 180.0, 0.0), 0);
        assert_eq!(
            commands,
            vec![
                AudioCommand::Load { url: STREAM.into() },
                AudioCommand::Play
            ]
        );

        sync.on_audible(1_200);
        assert_eq!(sync.phase(), Phase::Playing);

        // Same track again: the source is already attached.
        assert!(sync.apply(live("t1", 180.0, 5.0), 5_000).is_empty());

        // New track re-points the element.
        assert_eq!(sync.apply(live("t2", 200.0, 0.0), 9_000).len(), 2);
        sync.on_audible(9_500);

        let mut ended = live("t2", 200.0, 0.0);
        ended.current_track = None;
        ended.is_playing = false;
        assert_eq!(sync.apply(ended, 12_000), vec![AudioCommand::Pause]);
        assert_eq!(sync.phase(), Phase::Idle);
        assert_eq!(sync.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_pause_and_resume_same_track() {
        let mut sync = enabled();
        sync.apply(live("t1", 180.0, 0.0), 0);
        sync.on_audible(100);

        let mut paused = live("t1", 180.0, 42.0);
        paused.is_playing = false;
        assert_eq!(sync.apply(paused, 40_000), vec![AudioCommand::Pause]);
        sync.tick(60_000);
        assert_eq!(sync.elapsed_seconds(), 42.0);

        assert_eq!(
            sync.apply(live("t1", 180.0, 42.0), 61_000),
            vec![AudioCommand::Play]
        );
    }

    #[test]
    fn test_audible_start_re_anchors_to_server_position() {
        let mut sync = enabled();
        sync.apply(live("t1", 180.0, 30.0), 0);
        sync.tick(2_500);
        assert_eq!(sync.elapsed_seconds(), 32.5);

        sync.on_audible(2_500);
        assert_eq!(sync.elapsed_seconds(), 30.0);
        assert_eq!(
            sync.anchor(),
            Anchor {
                position_seconds: 30.0,
                captured_at_ms: 2_500
            }
        );
    }

    #[test]
    fn test_interruption_retries_while_live() {
        let mut sync = enabled();
        sync.apply(live("t1", 180.0, 0.0), 0);
        sync.on_audible(100);

        for _ in 0..3 {
            assert_eq!(
                sync.on_interrupted(),
                vec![
                    AudioCommand::Load { url: STREAM.into() },
                    AudioCommand::Play
                ]
            );
        }

        let mut paused = live("t1", 180.0, 10.0);
        paused.is_playing = false;
        sync.apply(paused, 10_000);
        assert!(sync.on_interrupted().is_empty());
    }

    #[test]
    fn test_blocked_audio_waits_for_gesture() {
        let mut sync = enabled();
        sync.apply(live("t1", 180.0, 0.0), 0);
        sync.audio_blocked();

        assert!(!sync.audio_enabled());
        assert!(sync.on_interrupted().is_empty());
        assert!(sync.apply(live("t1", 180.0, 3.0), 3_000).is_empty());
        assert_eq!(sync.enable_audio().len(), 2);
    }

    #[test]
    fn test_progress_push_keeps_track() {
        let mut sync = PlaybackSync::new(STREAM.into());
        sync.apply(live("t1", 180.0, 0.0), 0);

        let progress = PlaybackState {
            current_track: None,
            is_playing: true,
            position_seconds: 64.0,
            listener_count: None,
        };
        sync.apply_progress(progress, 64_000);

        assert_eq!(sync.track().map(|t| t.id.as_str()), Some("t1"));
        assert_eq!(sync.elapsed_seconds(), 64.0);
        assert_eq!(sync.listener_count(), 3);
    }

    #[test]
    fn test_radio_update_keeps_listener_count() {
        let mut sync = PlaybackSync::new(STREAM.into());
        sync.set_listener_count(5);

        let pushed: PlaybackState = serde_json::from_str(
            r#"{"currentSong":{"id":"t1","title":"A","duration":180},"isPlaying":true,"currentPosition":12}"#,
        )
        .unwrap();
        sync.apply(pushed, 0);
        assert_eq!(sync.listener_count(), 5);

        sync.set_listener_count(6);
        sync.apply_current_track(Some(track("t2", 90.0)), 1_000);
        assert_eq!(sync.listener_count(), 6);

        let mut counted = live("t2", 90.0, 2.0);
        counted.listener_count = Some(8);
        sync.apply(counted, 2_000);
        assert_eq!(sync.listener_count(), 8);
    }

    #[test]
    fn test_current_track_update() {
        let mut sync = PlaybackSync::new(STREAM.into());
        sync.apply(live("t1", 180.0, 50.0), 0);

        sync.apply_current_track(Some(track("t2", 90.0)), 1_000);
        assert_eq!(sync.elapsed_seconds(), 0.0);
        assert!(sync.is_playing());

        sync.apply_current_track(None, 2_000);
        assert!(!sync.is_playing());
        assert_eq!(sync.track(), None);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(59.9), "0:59");
        assert_eq!(format_clock(222.0), "3:42");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }
}
