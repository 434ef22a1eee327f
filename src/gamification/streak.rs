// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Calendar-day streak rules

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    /// First recorded activity
    Started,
    /// Same calendar day as the last activity
    Unchanged,
    /// Exactly one day after the last activity
    Extended,
    /// Gap of two or more days
    Reset,
}

/// Next streak value and last-activity date for an event on `today`.
///
/// Events dated before the last activity (clock changes, replays) leave both
/// the streak and the last-activity date untouched.
pub fn advance(
    streak: u32,
    last_activity: Option<NaiveDate>,
    today: NaiveDate,
) -> (u32, NaiveDate, StreakChange) {
    let Some(last) = last_activity else {
        return (1, today, StreakChange::Started);
    };

    match (today - last).num_days() {
        d if d <= 0 => (streak, last, StreakChange::Unchanged),
        1 => (streak + 1, today, StreakChange::Extended),
        _ => (1, today, StreakChange::Reset),
    }
}
