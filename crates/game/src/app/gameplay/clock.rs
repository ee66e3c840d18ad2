use super::shadow::{DAY_CYCLE_LENGTH, SUNSET_TIME};

const REAL_SECONDS_PER_DAY: f32 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DayEvent {
    Sunrise,
    Sunset,
}

impl DayEvent {
    pub(crate) fn message(self) -> &'static str {
        match self {
            DayEvent::Sunrise => "The sun rises.",
            DayEvent::Sunset => "The sun sets.",
        }
    }
}

/// Day-time in `0..400`. Each boundary crossing reports its event once.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DayClock {
    day_time: f32,
}

impl DayClock {
    pub(crate) fn new(day_time: f32) -> Self {
        Self {
            day_time: day_time.rem_euclid(DAY_CYCLE_LENGTH),
        }
    }

    pub(crate) fn day_time(&self) -> f32 {
        self.day_time
    }

    pub(crate) fn is_night(&self) -> bool {
        self.day_time >= SUNSET_TIME
    }

    /// Darkness overlay alpha for outdoor maps.
    pub(crate) fn darkness(&self) -> u8 {
        if self.is_night() {
            120
        } else {
            0
        }
    }

    pub(crate) fn advance(&mut self, dt_seconds: f32) -> Option<DayEvent> {
        let before = self.day_time;
        let raw = before + dt_seconds.max(0.0) * DAY_CYCLE_LENGTH / REAL_SECONDS_PER_DAY;
        if raw >= DAY_CYCLE_LENGTH {
            self.day_time = raw - DAY_CYCLE_LENGTH;
            return Some(DayEvent::Sunrise);
        }
        self.day_time = raw;
        if before < SUNSET_TIME && raw >= SUNSET_TIME {
            return Some(DayEvent::Sunset);
        }
        None
    }
}
