#![forbid(unsafe_code)]

//! Concrete animation items: a ticked [`Fade`] and a zero-time [`Immediate`].

use std::fmt;
use std::time::Duration;

use super::{AnimationItem, CompletionCallback, Easing, sanitize_position};

/// Playback of one range.
#[derive(Debug, Clone, Copy)]
struct Range {
    from: f64,
    to: f64,
    duration: Duration,
    elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Fade
// ---------------------------------------------------------------------------

/// A real, tick-driven scalar animation (opacity fades, scroll-off effects).
pub struct Fade {
    easing: Easing,
    value: f64,
    range: Option<Range>,
    callback: Option<CompletionCallback>,
    disposed: bool,
}

impl fmt::Debug for Fade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fade")
            .field("easing", &self.easing)
            .field("value", &self.value)
            .field("range", &self.range)
            .field("has_callback", &self.callback.is_some())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Fade {
    /// Create a fade resting at `initial`.
    #[must_use]
    pub fn new(initial: f64) -> Self {
        Self {
            easing: Easing::EaseOutCubic,
            value: sanitize_position(initial),
            range: None,
            callback: None,
            disposed: false,
        }
    }

    /// Set the easing curve (builder pattern).
    #[must_use]
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    fn finish(&mut self) {
        if let Some(range) = self.range.take() {
            self.value = range.to;
        }
        if let Some(cb) = self.callback.take() {
            cb();
        }
    }
}

impl AnimationItem for Fade {
    fn seek(&mut self, position: f64) {
        if self.disposed {
            return;
        }
        self.range = None;
        self.callback = None;
        self.value = sanitize_position(position);
    }

    fn play_range(&mut self, from: f64, to: f64, duration: Duration) {
        if self.disposed {
            return;
        }
        self.callback = None;
        let from = sanitize_position(from);
        self.value = from;
        self.range = Some(Range {
            from,
            to: sanitize_position(to),
            duration,
            elapsed: Duration::ZERO,
        });
    }

    fn on_complete(&mut self, callback: CompletionCallback) {
        if self.disposed || self.range.is_none() {
            return;
        }
        self.callback = Some(callback);
    }

    fn tick(&mut self, dt: Duration) {
        if self.disposed {
            return;
        }
        let Some(range) = self.range.as_mut() else {
            return;
        };
        range.elapsed = range.elapsed.saturating_add(dt);
        if range.duration.is_zero() || range.elapsed >= range.duration {
            self.finish();
            return;
        }
        let t = range.elapsed.as_secs_f64() / range.duration.as_secs_f64();
        let eased = self.easing.apply(t);
        self.value = range.from + (range.to - range.from) * eased;
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn is_playing(&self) -> bool {
        self.range.is_some()
    }

    fn dispose(&mut self) {
        self.range = None;
        self.callback = None;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

// ---------------------------------------------------------------------------
// Immediate
// ---------------------------------------------------------------------------

/// Headless / reduced-motion item: every range completes immediately.
///
/// `on_complete` registered right after `play_range` fires synchronously,
/// because the range is already finished.
#[derive(Default)]
pub struct Immediate {
    value: f64,
    disposed: bool,
}

impl fmt::Debug for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Immediate")
            .field("value", &self.value)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Immediate {
    /// Create an item resting at `initial`.
    #[must_use]
    pub fn new(initial: f64) -> Self {
        Self {
            value: sanitize_position(initial),
            disposed: false,
        }
    }
}

impl AnimationItem for Immediate {
    fn seek(&mut self, position: f64) {
        if !self.disposed {
            self.value = sanitize_position(position);
        }
    }

    fn play_range(&mut self, _from: f64, to: f64, _duration: Duration) {
        if !self.disposed {
            self.value = sanitize_position(to);
        }
    }

    fn on_complete(&mut self, callback: CompletionCallback) {
        if !self.disposed {
            callback();
        }
    }

    fn tick(&mut self, _dt: Duration) {}

    fn value(&self) -> f64 {
        self.value
    }

    fn is_playing(&self) -> bool {
        false
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    const MS_100: Duration = Duration::from_millis(100);

    #[test]
    fn fade_reaches_target() {
        let mut fade = Fade::new(0.0);
        fade.play_range(0.0, 1.0, MS_100);
        fade.tick(Duration::from_millis(50));
        assert!(fade.value() > 0.5, "ease-out is ahead at midpoint");
        assert!(fade.is_playing());
        fade.tick(Duration::from_millis(50));
        assert_eq!(fade.value(), 1.0);
        assert!(!fade.is_playing());
    }

    #[test]
    fn completion_fires_once() {
        let hits = Rc::new(Cell::new(0));
        let mut fade = Fade::new(1.0);
        fade.play_range(1.0, 0.0, MS_100);
        let h = Rc::clone(&hits);
        fade.on_complete(Box::new(move || h.set(h.get() + 1)));
        fade.tick(MS_100);
        fade.tick(MS_100);
        assert_eq!(hits.get(), 1);
        assert_eq!(fade.value(), 0.0);
    }

    #[test]
    fn replaced_range_drops_callback() {
        let hits = Rc::new(Cell::new(0));
        let mut fade = Fade::new(0.0);
        fade.play_range(0.0, 1.0, MS_100);
        let h = Rc::clone(&hits);
        fade.on_complete(Box::new(move || h.set(h.get() + 1)));
        fade.tick(Duration::from_millis(40));
        let mid = fade.value();
        fade.play_range(mid, 0.0, MS_100);
        fade.tick(MS_100);
        assert_eq!(hits.get(), 0);
        assert_eq!(fade.value(), 0.0);
    }

    #[test]
    fn seek_stops_playback() {
        let mut fade = Fade::new(0.0);
        fade.play_range(0.0, 1.0, MS_100);
        fade.seek(0.25);
        assert!(!fade.is_playing());
        fade.tick(MS_100);
        assert_eq!(fade.value(), 0.25);
    }

    #[test]
    fn disposed_fade_ignores_everything() {
        let hits = Rc::new(Cell::new(0));
        let mut fade = Fade::new(0.0);
        fade.play_range(0.0, 1.0, MS_100);
        let h = Rc::clone(&hits);
        fade.on_complete(Box::new(move || h.set(h.get() + 1)));
        fade.dispose();
        fade.tick(MS_100);
        fade.play_range(0.0, 1.0, MS_100);
        assert_eq!(hits.get(), 0);
        assert!(fade.is_disposed());
        assert!(!fade.is_playing());
    }

    #[test]
    fn zero_duration_completes_on_tick() {
        let mut fade = Fade::new(0.0);
        fade.play_range(0.0, 1.0, Duration::ZERO);
        fade.tick(Duration::ZERO);
        assert_eq!(fade.value(), 1.0);
    }

    #[test]
    fn instant_completes_synchronously() {
        let hits = Rc::new(Cell::new(0));
        let mut item = Immediate::new(0.0);
        item.play_range(0.0, 1.0, MS_100);
        assert_eq!(item.value(), 1.0);
        let h = Rc::clone(&hits);
        item.on_complete(Box::new(move || h.set(h.get() + 1)));
        assert_eq!(hits.get(), 1);
        assert!(!item.is_playing());
    }
}
