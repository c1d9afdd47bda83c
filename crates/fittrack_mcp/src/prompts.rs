use fittrack_core::Period;
use rmcp::model::{GetPromptResult, PromptMessage, PromptMessageRole};

pub fn review_streak_prompt(days: u32) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Review my fitness streak over the past {days} days.\n\nCover:\n1. Current and longest streak\n2. Which goal (water, calories within 10% of target, exercise minutes) breaks my streak most often\n3. Patterns by weekday\n4. One concrete change for next week\n\nCall get_streak_stats with days={days} and get_today for the current day, then keep the answer short and specific."
            ),
        )])
    .with_description(format!("Streak review over the past {days} days"))
}

pub fn analyze_period_prompt(period: Period) -> GetPromptResult {
    let label = period.label().to_ascii_lowercase();
    GetPromptResult::new(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Analyze my tracking for {label}.\n\nInclude:\n1. Water, calorie and exercise attainment against goals\n2. Macro balance (carbs, fats, protein)\n3. How many days were perfect and what the others missed\n4. Two or three actionable recommendations\n\nCall get_period_summary with period=\"{period}\" and list_meals for any day that stands out."
            ),
        )])
    .with_description(format!("Nutrition and activity analysis for {label}"))
}
