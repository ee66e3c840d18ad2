use engine::ShadowDesc;

use super::character::AnimState;

pub(crate) const DAY_CYCLE_LENGTH: f32 = 400.0;
pub(crate) const SUNSET_TIME: f32 = 200.0;
const NOON: f32 = 100.0;
const SHADOW_BUCKET_SIZE: f32 = 10.0;
const NOON_SHADOW_LENGTH: f32 = 8.0;
const DAWN_DUSK_EXTRA_LENGTH: f32 = 24.0;
const INDOOR_SHADOW_LENGTH: f32 = 12.0;
const SHADOW_ALPHA: u8 = 150;
const DEAD_SHADOW_ALPHA: u8 = 90;

/// Shadow cast at `day_time` in `0..400`. Outdoors there is none at night.
pub(crate) fn shadow_for_day_time(day_time: f32, outdoors: bool) -> Option<ShadowDesc> {
    if !outdoors {
        return Some(ShadowDesc {
            length: INDOOR_SHADOW_LENGTH,
            alpha: SHADOW_ALPHA,
            flattened: false,
        });
    }
    let day_time = day_time.rem_euclid(DAY_CYCLE_LENGTH);
    if day_time >= SUNSET_TIME {
        return None;
    }
    let distance_from_noon = ((day_time - NOON).abs() / NOON).clamp(0.0, 1.0);
    Some(ShadowDesc {
        length: NOON_SHADOW_LENGTH + DAWN_DUSK_EXTRA_LENGTH * distance_from_noon,
        alpha: SHADOW_ALPHA,
        flattened: false,
    })
}

fn day_time_bucket(day_time: f32) -> i32 {
    (day_time.rem_euclid(DAY_CYCLE_LENGTH) / SHADOW_BUCKET_SIZE).floor() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShadowKey {
    state: AnimState,
    frame: u32,
    bucket: i32,
    outdoors: bool,
}

/// Holds the last computed shadow and only recomputes it when the animation
/// frame, the state or the day-time bucket changes.
#[derive(Debug, Clone, Default)]
pub(crate) struct ShadowCache {
    key: Option<ShadowKey>,
    shadow: Option<ShadowDesc>,
    #[cfg(test)]
    recomputations: u32,
}

impl ShadowCache {
    pub(crate) fn update(
        &mut self,
        state: AnimState,
        frame: u32,
        day_time: f32,
        outdoors: bool,
    ) -> Option<ShadowDesc> {
        let key = ShadowKey {
            state,
            frame,
            bucket: day_time_bucket(day_time),
            outdoors,
        };
        if self.key != Some(key) {
            self.shadow = if state == AnimState::Dead {
                Some(ShadowDesc {
                    length: 2.0,
                    alpha: DEAD_SHADOW_ALPHA,
                    flattened: true,
                })
            } else {
                shadow_for_day_time(day_time, outdoors)
            };
            self.key = Some(key);
            #[cfg(test)]
            {
                self.recomputations += 1;
            }
        }
        self.shadow
    }

    pub(crate) fn current(&self) -> Option<ShadowDesc> {
        self.shadow
    }

    #[cfg(test)]
    pub(crate) fn recomputations(&self) -> u32 {
        self.recomputations
    }
}
