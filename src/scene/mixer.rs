//! Clip mixer: looping playback with linear crossfades

use super::{AnimationClip, AnimationPlayer};

#[derive(Debug, Clone, Copy)]
struct Track {
    clip: usize,
    time: f32,
    weight: f32,
}

/// Concrete [`AnimationPlayer`] tracking clip time and blend weights
#[derive(Debug, Clone)]
pub struct ClipMixer {
    clips: Vec<AnimationClip>,
    active: Option<Track>,
    outgoing: Option<Track>,
    fade_duration: f32,
    fade_elapsed: f32,
}

impl ClipMixer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            active: None,
            outgoing: None,
            fade_duration: 0.0,
            fade_elapsed: 0.0,
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.clips
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Current blend weight of a clip (0 when not playing)
    pub fn weight(&self, name: &str) -> f32 {
        let Some(index) = self.find(name) else {
            return 0.0;
        };
        [self.active, self.outgoing]
            .iter()
            .flatten()
            .filter(|t| t.clip == index)
            .map(|t| t.weight)
            .sum()
    }

    /// Playback position of the active clip, seconds
    pub fn time(&self) -> Option<f32> {
        self.active.map(|t| t.time)
    }

    fn step(&self, track: &mut Track, dt: f32) {
        let duration = self.clips[track.clip].duration;
        track.time += dt;
        if duration > 0.0 {
            track.time %= duration;
        }
    }
}

impl AnimationPlayer for ClipMixer {
    fn advance(&mut self, dt: f32) {
        if let Some(mut track) = self.active {
            self.step(&mut track, dt);
            self.active = Some(track);
        }
        if let Some(mut track) = self.outgoing {
            self.step(&mut track, dt);
            self.outgoing = Some(track);
        }

        if self.outgoing.is_some() {
            self.fade_elapsed += dt;
            let w = (self.fade_elapsed / self.fade_duration).min(1.0);
            if let Some(active) = self.active.as_mut() {
                active.weight = w;
            }
            if w >= 1.0 {
                self.outgoing = None;
            } else if let Some(out) = self.outgoing.as_mut() {
                out.weight = 1.0 - w;
            }
        }
    }

    fn play(&mut self, clip: &str, fade: f32) -> bool {
        let Some(index) = self.find(clip) else {
            return false;
        };

        if self.active.map(|t| t.clip) == Some(index) {
            return true;
        }

        let previous = self.active.take();
        if fade > 0.0 && previous.is_some() {
            self.outgoing = previous;
            self.fade_duration = fade;
            self.fade_elapsed = 0.0;
            self.active = Some(Track {
                clip: index,
                time: 0.0,
                weight: 0.0,
            });
        } else {
            self.outgoing = None;
            self.active = Some(Track {
                clip: index,
                time: 0.0,
                weight: 1.0,
            });
        }
        true
    }

    fn active_clip(&self) -> Option<&str> {
        self.active.map(|t| self.clips[t.clip].name.as_str())
    }

    fn stop_all(&mut self) {
        self.active = None;
        self.outgoing = None;
    }
}
