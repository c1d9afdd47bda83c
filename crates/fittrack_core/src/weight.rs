//! Daily weight series with gaps carried forward.

use chrono::{Days, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::WeightEntry;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight: f64,
    pub body_fat_percentage: Option<f64>,
    /// False when the value was carried over from an earlier weigh-in.
    pub is_actual: bool,
}

/// One point per day for the `days` days ending at `today`.
///
/// Days without a weigh-in repeat the latest earlier entry (entries before
/// the window count as seeds). Leading days with nothing to repeat are
/// omitted.
pub fn fill_weight_history(entries: &[WeightEntry], today: NaiveDate, days: u32) -> Vec<WeightPoint> {
    if days == 0 {
        return Vec::new();
    }
    let start = today
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .unwrap_or(NaiveDate::MIN);

    let mut sorted: Vec<&WeightEntry> = entries.iter().filter(|e| e.date <= today).collect();
    sorted.sort_by_key(|e| e.date);

    let mut last: Option<&WeightEntry> = None;
    let mut iter = sorted.into_iter().peekable();
    while let Some(e) = iter.next_if(|e| e.date < start) {
        last = Some(e);
    }

    // Without a seed the series begins at the first weigh-in in the window.
    let first = match (last, iter.peek()) {
        (Some(_), _) => start,
        (None, Some(e)) => e.date,
        (None, None) => return Vec::new(),
    };

    let mut points = Vec::new();
    for day in first.iter_days().take_while(|d| *d <= today) {
        let mut actual = false;
        while let Some(e) = iter.next_if(|e| e.date == day) {
            last = Some(e);
            actual = true;
        }
        if let Some(e) = last {
            points.push(WeightPoint {
                date: day,
                weight: e.weight,
                body_fat_percentage: e.body_fat_percentage,
                is_actual: actual,
            });
        }
    }
    points
}
