//! Path-reveal animation
//!
//! An [`Animation`] tracks progress through a repeating reveal cycle.  It
//! never schedules itself: the host calls [`Animation::tick`] with elapsed
//! time (or [`Animation::frame`] with a timestamp) once per frame.
//!
//! ```
//! use std::time::Duration;
//! use tangent::{animate::Animation, config::AnimationConfig};
//!
//! let mut anim = Animation::new(AnimationConfig::default());
//! anim.start();
//! anim.tick(Duration::from_secs(1));
//! assert_eq!(anim.progress(), 0.25);
//! ```
use crate::{
    config::AnimationConfig,
    sample::{Sample, SampleSet},
    Error,
};
use log::warn;
use std::time::Duration;

/// Animation state
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Animation {
    progress: f64,
    running: bool,
    speed: f64,
    period: Duration,
    last: Option<Duration>,
}

impl Default for Animation {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

impl Animation {
    /// Builds a stopped animation at progress 0
    ///
    /// A non-positive speed in the config is replaced by 1.
    pub fn new(config: AnimationConfig) -> Self {
        let speed = if config.speed.is_finite() && config.speed > 0.0 {
            config.speed
        } else {
            1.0
        };
        Self {
            progress: 0.0,
            running: false,
            speed,
            period: config.period,
            last: None,
        }
    }

    /// Returns progress through the current cycle, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Checks whether the animation is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns the speed multiplier
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Starts (or resumes) the animation
    pub fn start(&mut self) {
        self.running = true;
        self.last = None;
    }

    /// Stops the animation, keeping its progress
    pub fn stop(&mut self) {
        self.running = false;
        self.last = None;
    }

    /// Rewinds to progress 0, without changing whether it's running
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.last = None;
    }

    /// Sets the speed multiplier, which must be finite and positive
    pub fn set_speed(&mut self, speed: f64) -> Result<(), Error> {
        if !(speed.is_finite() && speed > 0.0) {
            warn!("rejecting animation speed {speed}");
            return Err(Error::BadSpeed(speed));
        }
        self.speed = speed;
        Ok(())
    }

    /// Advances the animation by the given elapsed time
    ///
    /// Does nothing if the animation is stopped.  When progress passes 1, it
    /// wraps to exactly 0 (rather than carrying over the remainder).
    pub fn tick(&mut self, dt: Duration) {
        if !self.running {
            return;
        }
        let cycle = self.period.as_secs_f64() / self.speed;
        if cycle > 0.0 {
            self.progress += dt.as_secs_f64() / cycle;
        } else {
            self.progress = f64::INFINITY;
        }
        if self.progress > 1.0 {
            self.progress = 0.0;
        }
    }

    /// Advances the animation given an absolute timestamp
    ///
    /// The first frame after [`start`](Self::start) only records the time.
    /// Timestamps that go backwards are treated as zero elapsed time.
    pub fn frame(&mut self, now: Duration) {
        if !self.running {
            return;
        }
        if let Some(last) = self.last {
            self.tick(now.saturating_sub(last));
        }
        self.last = Some(now);
    }
}

/// Returns the part of a sample set revealed at the given progress
///
/// With `n` samples, this is empty when `floor(n * progress) == 0`, and
/// otherwise the first `floor(n * progress) + 1` samples (capped at `n`).
pub fn visible_prefix(set: &SampleSet, progress: f64) -> &[Sample] {
    let samples = set.samples();
    let n = samples.len();
    let index = (n as f64 * progress.clamp(0.0, 1.0)).floor() as usize;
    if index == 0 {
        &[]
    } else {
        &samples[..(index + 1).min(n)]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        backend::NativeBackend,
        config::SampleConfig,
        eval::Evaluator,
        sample::{sample, Domain},
    };
    use std::num::NonZeroUsize;

    fn set(n: usize) -> SampleSet {
        let eval = Evaluator::new(NativeBackend);
        let f = eval.parse("x").unwrap();
        let cfg = SampleConfig {
            resolution: NonZeroUsize::new(n - 1).unwrap(),
            ceiling: None,
        };
        sample(&eval, &f, None, Domain::new(0.0, 1.0).unwrap(), &cfg)
    }

    #[test]
    fn tick_while_stopped() {
        let mut a = Animation::default();
        a.tick(Duration::from_secs(1));
        assert_eq!(a.progress(), 0.0);

        a.start();
        a.tick(Duration::from_secs(1));
        a.stop();
        a.tick(Duration::from_secs(1));
        assert_eq!(a.progress(), 0.25);
        assert!(!a.is_running());
    }

    #[test]
    fn speed() {
        let mut a = Animation::default();
        a.set_speed(2.0).unwrap();
        a.start();
        a.tick(Duration::from_secs(1));
        assert_eq!(a.progress(), 0.5);

        for s in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(a.set_speed(s), Err(Error::BadSpeed(..))));
        }
        assert_eq!(a.speed(), 2.0);
    }

    #[test]
    fn wraps_to_zero() {
        let mut a = Animation::default();
        a.start();
        let mut prev = 0.0;
        let mut wrapped = 0;
        for _ in 0..1000 {
            a.tick(Duration::from_millis(37));
            let p = a.progress();
            assert!((0.0..1.0).contains(&p) || p == 1.0);
            if p < prev {
                assert_eq!(p, 0.0);
                wrapped += 1;
            }
            prev = p;
        }
        assert!(wrapped >= 8);

        // A single huge step also lands on 0
        a.tick(Duration::from_secs(60));
        assert_eq!(a.progress(), 0.0);
    }

    #[test]
    fn frame_timestamps() {
        let mut a = Animation::default();
        a.frame(Duration::from_secs(10));
        assert_eq!(a.progress(), 0.0);

        a.start();
        a.frame(Duration::from_secs(10));
        assert_eq!(a.progress(), 0.0);
        a.frame(Duration::from_secs(11));
        assert_eq!(a.progress(), 0.25);

        // Stopping forgets the timestamp, so the pause isn't counted
        a.stop();
        a.start();
        a.frame(Duration::from_secs(100));
        a.frame(Duration::from_secs(101));
        assert_eq!(a.progress(), 0.5);

        // Going backwards doesn't move progress
        a.frame(Duration::from_secs(50));
        assert_eq!(a.progress(), 0.5);
    }

    #[test]
    fn reset() {
        let mut a = Animation::default();
        a.start();
        a.tick(Duration::from_secs(2));
        a.reset();
        assert_eq!(a.progress(), 0.0);
        assert!(a.is_running());
    }

    #[test]
    fn prefix() {
        let s = set(10);
        assert_eq!(s.len(), 10);
        assert!(visible_prefix(&s, 0.0).is_empty());
        assert!(visible_prefix(&s, 0.05).is_empty());
        assert_eq!(visible_prefix(&s, 0.1).len(), 2);
        assert_eq!(visible_prefix(&s, 0.55).len(), 6);
        assert_eq!(visible_prefix(&s, 0.95).len(), 10);
        assert_eq!(visible_prefix(&s, 1.0).len(), 10);
        assert!(visible_prefix(&SampleSet::default(), 0.5).is_empty());
    }
}
