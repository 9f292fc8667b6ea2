//! Central animation scheduler.
//!
//! Animations are plain records advanced by one [`Animator`] per owner,
//! instead of callbacks that reschedule themselves. The owner reacts to the
//! [`Tick`]s returned by [`Animator::advance`], which plays the role of the
//! tick and completion callbacks. Starting an animation under a key that is
//! already running replaces it, so cancelling or redirecting is a single
//! operation.

/// Easing curve applied to linear progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    Linear,
    #[default]
    CubicInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::CubicInOut => ease_in_out_cubic(t),
        }
    }
}

/// `t < 0.5 ? 4t³ : 1 - (-2t + 2)³ / 2`
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Animation {
    elapsed: f32,
    delay: f32,
    duration: f32,
    easing: Easing,
}

impl Animation {
    fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((self.elapsed - self.delay) / self.duration).clamp(0.0, 1.0)
    }
}

/// One frame of a running animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick<K> {
    pub key: K,
    /// Linear progress in `[0, 1]`.
    pub progress: f32,
    /// Progress after easing.
    pub eased: f32,
    /// Last tick of this animation; it has been removed.
    pub finished: bool,
}

#[derive(Clone, Debug)]
pub struct Animator<K> {
    animations: Vec<(K, Animation)>,
}

impl<K> Default for Animator<K> {
    fn default() -> Self {
        Self {
            animations: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq> Animator<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, key: K, duration: f32, easing: Easing) {
        self.start_delayed(key, 0.0, duration, easing);
    }

    /// Starts an animation that begins ticking after `delay` seconds.
    pub fn start_delayed(&mut self, key: K, delay: f32, duration: f32, easing: Easing) {
        let animation = Animation {
            elapsed: 0.0,
            delay: delay.max(0.0),
            duration: duration.max(0.0),
            easing,
        };
        match self.animations.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = animation,
            None => self.animations.push((key, animation)),
        }
    }

    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.animations.len();
        self.animations.retain(|(k, _)| *k != key);
        self.animations.len() != before
    }

    pub fn is_running(&self, key: K) -> bool {
        self.animations.iter().any(|(k, _)| *k == key)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn clear(&mut self) {
        self.animations.clear();
    }

    /// Advances every animation by `dt` seconds.
    ///
    /// Animations still inside their delay produce no tick. Finished
    /// animations produce a final tick and are removed. Ticks come out in
    /// start order.
    pub fn advance(&mut self, dt: f32) -> Vec<Tick<K>> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut ticks = Vec::with_capacity(self.animations.len());

        for (key, animation) in &mut self.animations {
            animation.elapsed += dt;
            if animation.elapsed < animation.delay {
                continue;
            }
            let progress = animation.progress();
            ticks.push(Tick {
                key: *key,
                progress,
                eased: animation.easing.apply(progress),
                finished: progress >= 1.0,
            });
        }

        self.animations
            .retain(|(_, animation)| animation.elapsed < animation.delay || animation.progress() < 1.0);
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_in_out_cubic_shape() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        assert!((ease_in_out_cubic(0.25) - 0.0625).abs() < 1e-6);
        assert!((ease_in_out_cubic(0.75) - 0.9375).abs() < 1e-6);
    }

    #[test]
    fn test_advance_until_finished() {
        let mut animator = Animator::new();
        animator.start("fade", 1.0, Easing::Linear);

        let ticks = animator.advance(0.25);
        assert_eq!(ticks.len(), 1);
        assert!((ticks[0].progress - 0.25).abs() < 1e-6);
        assert!(!ticks[0].finished);

        let ticks = animator.advance(2.0);
        assert!(ticks[0].finished);
        assert_eq!(ticks[0].eased, 1.0);
        assert!(animator.is_empty());
    }

    #[test]
    fn test_delay_holds_ticks() {
        let mut animator = Animator::new();
        animator.start_delayed(1, 0.5, 1.0, Easing::Linear);

        assert!(animator.advance(0.3).is_empty());
        let ticks = animator.advance(0.3);
        assert_eq!(ticks.len(), 1);
        assert!((ticks[0].progress - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_restart_replaces_running_animation() {
        let mut animator = Animator::new();
        animator.start(1, 1.0, Easing::Linear);
        animator.advance(0.8);

        animator.start(1, 1.0, Easing::Linear);
        assert_eq!(animator.len(), 1);
        let ticks = animator.advance(0.1);
        assert!((ticks[0].progress - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_cancel_and_variable_dt() {
        let mut animator = Animator::new();
        animator.start(1, 1.0, Easing::CubicInOut);
        animator.start(2, 1.0, Easing::CubicInOut);

        assert!(animator.cancel(1));
        assert!(!animator.cancel(1));
        assert!(animator.advance(f32::NAN).iter().all(|t| t.progress == 0.0));
        assert!(animator.advance(-1.0).iter().all(|t| t.progress == 0.0));
        assert!(animator.is_running(2));
    }

    #[test]
    fn test_zero_duration_finishes_immediately() {
        let mut animator = Animator::new();
        animator.start(1, 0.0, Easing::Linear);
        let ticks = animator.advance(0.0);
        assert!(ticks[0].finished);
        assert!(animator.is_empty());
    }
}
