// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Health insurance bonus score from daily step counts

use crate::config::fitness_config::BonusScoreConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusScore {
    /// Days at or above the daily step goal
    pub qualifying_days: u32,
    /// Qualifying days counted back from the most recent day
    pub current_streak: u32,
    pub days_required: u32,
    /// Progress toward `days_required`, capped at 100
    pub percent: f64,
    pub eligible: bool,
}

/// Score the most recent `days_tracked` entries of `daily_steps` (oldest first)
pub fn score(daily_steps: &[u64], config: &BonusScoreConfig) -> BonusScore {
    let window_start = daily_steps.len().saturating_sub(config.days_tracked as usize);
    let window = &daily_steps[window_start..];
    let qualifies = |steps: &u64| *steps >= config.daily_step_goal;

    let qualifying_days = window.iter().filter(|s| qualifies(s)).count() as u32;
    let current_streak = window.iter().rev().take_while(|s| qualifies(s)).count() as u32;

    let percent = if config.days_required == 0 {
        100.0
    } else {
        (f64::from(qualifying_days) / f64::from(config.days_required) * 100.0).min(100.0)
    };

    BonusScore {
        qualifying_days,
        current_streak,
        days_required: config.days_required,
        percent,
        eligible: qualifying_days >= config.days_required,
    }
}
