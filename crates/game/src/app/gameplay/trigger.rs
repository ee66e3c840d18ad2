use engine::Rect;

pub(crate) const DEFAULT_TRIGGER_DELAY_SECONDS: f32 = 20.0;

/// A named map region that fires at most once per `delay` seconds of
/// simulation time. A non-zero `max_fires` disables it once reached.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Trigger {
    name: String,
    region: Rect,
    delay: f32,
    max_fires: u32,
    disabled: bool,
    last_fired_at: f32,
    fire_count: u32,
}

impl Trigger {
    pub(crate) fn new(name: impl Into<String>, region: Rect, delay: f32, max_fires: u32, now: f32) -> Self {
        let delay = delay.max(0.0);
        Self {
            name: name.into(),
            region,
            delay,
            max_fires,
            disabled: false,
            last_fired_at: now - delay,
            fire_count: 0,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn region(&self) -> Rect {
        self.region
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[cfg(test)]
    pub(crate) fn fire_count(&self) -> u32 {
        self.fire_count
    }

    pub(crate) fn is_ready(&self, now: f32) -> bool {
        !self.disabled && now - self.last_fired_at >= self.delay
    }

    /// Fires if the cooldown has elapsed; returns the trigger name on success.
    pub(crate) fn try_fire(&mut self, now: f32) -> Option<&str> {
        if !self.is_ready(now) {
            return None;
        }
        self.last_fired_at = now;
        self.fire_count = self.fire_count.saturating_add(1);
        if self.max_fires != 0 && self.fire_count >= self.max_fires {
            self.disabled = true;
        }
        Some(&self.name)
    }

    /// Restarts the cooldown without counting a fire.
    pub(crate) fn defer(&mut self, now: f32) {
        self.last_fired_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door(delay: f32, max_fires: u32) -> Trigger {
        Trigger::new("door", Rect::new(0.0, 0.0, 32.0, 32.0), delay, max_fires, 0.0)
    }

    #[test]
    fn fires_immediately_then_waits_for_delay() {
        let mut trigger = door(5.0, 0);
        assert_eq!(trigger.try_fire(0.0), Some("door"));
        assert_eq!(trigger.try_fire(4.9), None);
        assert_eq!(trigger.try_fire(5.0), Some("door"));
        assert_eq!(trigger.fire_count(), 2);
    }

    #[test]
    fn max_fires_disables_permanently() {
        let mut trigger = door(1.0, 2);
        assert!(trigger.try_fire(0.0).is_some());
        assert!(trigger.try_fire(1.0).is_some());
        assert!(trigger.is_disabled());
        assert!(trigger.try_fire(100.0).is_none());
    }

    #[test]
    fn deferring_waits_a_full_delay_without_counting() {
        let mut trigger = door(5.0, 1);
        assert!(trigger.is_ready(0.0));

        trigger.defer(0.0);
        assert!(!trigger.is_ready(4.9));
        assert_eq!(trigger.fire_count(), 0);
        assert!(!trigger.is_disabled());
        assert_eq!(trigger.try_fire(5.0), Some("door"));
        assert!(trigger.is_disabled());
    }
}
