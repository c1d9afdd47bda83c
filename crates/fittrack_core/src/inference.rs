//! AI estimation of meals and exercises from free text.
//!
//! The engine never depends on this module; it only fills in numbers that
//! the user can still edit before logging.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use schemars::JsonSchema;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TrackerError;
use crate::analysis::{CoachAnalysis, PeriodDigest};
use crate::config::Config;
use crate::models::{ExerciseCategory, ExerciseSet, MuscleGroup, NewExercise};
use crate::retry::RetryPolicy;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct NutritionEstimate {
    pub calories: f64,
    pub carbs: f64,
    pub fats: f64,
    pub protein: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ExerciseEstimate {
    pub name: String,
    pub category: ExerciseCategory,
    pub muscle_group: Option<MuscleGroup>,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    /// Kilograms per rep.
    pub weight: Option<f64>,
    /// Minutes.
    pub duration: Option<f64>,
    /// Kilometres.
    pub distance: Option<f64>,
    pub calories_burned: Option<f64>,
    pub notes: Option<String>,
}

impl ExerciseEstimate {
    /// Expand the estimate into a loggable entry for `date`.
    pub fn into_new_exercise(self, date: NaiveDate) -> NewExercise {
        let sets = match (self.sets, self.reps) {
            (Some(n), reps) if n > 0 => (1..=n)
                .map(|set_number| ExerciseSet {
                    set_number,
                    weight: self.weight.unwrap_or(0.0),
                    reps: reps.unwrap_or(0),
                    completed: true,
                })
                .collect(),
            _ => Vec::new(),
        };
        NewExercise {
            date,
            name: self.name,
            category: self.category,
            muscle_group: self.muscle_group,
            sets,
            duration_minutes: self.duration,
            distance_km: self.distance,
            calories_burned: self.calories_burned,
            notes: self.notes,
        }
    }
}

#[async_trait]
pub trait InferenceClient: Send + Sync + 'static {
    async fn estimate_meal(&self, description: &str) -> Result<NutritionEstimate, TrackerError>;

    async fn estimate_exercise(&self, description: &str)
    -> Result<ExerciseEstimate, TrackerError>;

    /// Coaching feedback for a period digest. An unusable reply is an
    /// [`TrackerError::Inference`] so callers can fall back.
    async fn analyze_period(&self, digest: &PeriodDigest) -> Result<CoachAnalysis, TrackerError>;
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone, Debug)]
pub struct ReqwestInferenceClient {
    base_url: String,
    model: String,
    api_key: SecretString,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ReqwestInferenceClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: SecretString,
    ) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Build a client from config, or `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, TrackerError> {
        config
            .inference_api_key
            .clone()
            .map(|key| Self::new(&config.inference_base_url, &config.inference_model, key))
            .transpose()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send one prompt and return the first candidate's text.
    async fn generate(&self, prompt: &str) -> Result<String, TrackerError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = serde_json::json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let (url, body) = (&url, &body);
        let resp: GenerateResponse = self
            .retry
            .retry_transient(move || async move {
                let resp = self
                    .client
                    .post(url)
                    .query(&[("key", self.api_key.expose_secret())])
                    .json(body)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(resp.json::<GenerateResponse>().await?)
            })
            .await?;

        resp.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| TrackerError::Inference("model returned no candidates".into()))
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl InferenceClient for ReqwestInferenceClient {
    async fn estimate_meal(&self, description: &str) -> Result<NutritionEstimate, TrackerError> {
        let description = required(description, "food description")?;
        let result = match self.generate(&meal_prompt(description)).await {
            Ok(text) => parse_nutrition(&text),
            Err(e) => Err(e),
        };
        record_outcome("meal", &result);
        result
    }

    async fn estimate_exercise(
        &self,
        description: &str,
    ) -> Result<ExerciseEstimate, TrackerError> {
        let description = required(description, "exercise description")?;
        let result = match self.generate(&exercise_prompt(description)).await {
            Ok(text) => parse_exercise(&text),
            Err(e) => Err(e),
        };
        record_outcome("exercise", &result);
        result
    }

    async fn analyze_period(&self, digest: &PeriodDigest) -> Result<CoachAnalysis, TrackerError> {
        let result = match self.generate(&analysis_prompt(digest)).await {
            Ok(text) => parse_analysis(&text),
            Err(e) => Err(e),
        };
        record_outcome("analysis", &result);
        result
    }
}

fn required<'a>(text: &'a str, what: &str) -> Result<&'a str, TrackerError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::InvalidInput(format!("{what} is required")));
    }
    Ok(trimmed)
}

fn record_outcome<T>(kind: &'static str, result: &Result<T, TrackerError>) {
    let outcome = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!("fittrack_inference_requests_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
    if let Err(e) = result {
        tracing::warn!(kind, error = %e, "inference request failed");
    }
}

fn meal_prompt(description: &str) -> String {
    format!(
        r#"Analyze the following food/meal description and provide nutritional information.
Return ONLY a valid JSON object with the exact format shown below, no additional text or markdown:

{{"calories": number, "carbs": number, "fats": number, "protein": number}}

Units: calories in kcal; carbs, fats and protein in grams.

Food description: "{description}""#
    )
}

fn exercise_prompt(description: &str) -> String {
    format!(
        r#"You are a fitness expert. Extract structured data from this exercise description.

Exercise description: "{description}"

Return ONLY a valid JSON object (no markdown) with this structure:
{{
  "name": "Exercise name",
  "category": "cardio" or "weight-training",
  "muscleGroup": "chest" | "back" | "shoulders" | "legs" | "arms" | "core" | "full-body" (weight-training only),
  "sets": number (weight-training, default 3),
  "reps": number per set (weight-training, default 10),
  "weight": kg (weight-training, default 0),
  "duration": minutes,
  "distance": km,
  "caloriesBurned": estimated kcal,
  "notes": "extra details"
}}

Treat "4x12" as 4 sets of 12 reps and convert lbs to kg and miles to km."#
    )
}

fn analysis_prompt(d: &PeriodDigest) -> String {
    let label = &d.label;
    let days = d.total_days;
    format!(
        r#"You are a fitness coach analyzing a user's fitness data for {label}. Based on the following data, provide personalized insights, recommendations, and encouragement.

FITNESS DATA FOR {upper}:
- Total Days Tracked: {days}
- Streak Days (all goals met): {streak}

HYDRATION:
- Total Water Consumed: {water_total:.1} L
- Daily Average: {water_avg:.2} L
- Days Met Goal: {water_met}/{days}

NUTRITION:
- Total Calories: {kcal_total} kcal
- Daily Average: {kcal_avg} kcal
- Days Met Goal: {kcal_met}/{days}
- Avg Carbs: {carbs}g
- Avg Fats: {fats}g
- Avg Protein: {protein}g
- Meals Logged: Breakfast({breakfast}), Lunch({lunch}), Dinner({dinner}), Snacks({snack})

EXERCISE:
- Total Minutes: {minutes} min
- Daily Average: {minutes_avg} min
- Days Met Goal: {exercise_met}/{days}
- Cardio Sessions: {cardio}
- Weight Training Sessions: {weights}

Please provide your analysis in the following JSON format ONLY, no additional text:
{{
  "overallScore": <number 0-100>,
  "highlights": [<array of 2-3 positive achievements as strings>],
  "areasToImprove": [<array of 2-3 areas needing improvement as strings>],
  "hydrationInsight": "<specific insight about hydration habits>",
  "nutritionInsight": "<specific insight about nutrition and macros>",
  "exerciseInsight": "<specific insight about exercise patterns>",
  "weeklyTip": "<actionable tip for the upcoming period>",
  "motivationalMessage": "<personalized encouraging message>"
}}"#,
        upper = label.to_uppercase(),
        streak = d.streak_days,
        water_total = d.water.total,
        water_avg = d.water.daily_average,
        water_met = d.water.days_met_goal,
        kcal_total = d.calories.total.round(),
        kcal_avg = d.calories.daily_average.round(),
        kcal_met = d.calories.days_met_goal,
        carbs = d.macros.avg_carbs.round(),
        fats = d.macros.avg_fats.round(),
        protein = d.macros.avg_protein.round(),
        breakfast = d.meals.breakfast,
        lunch = d.meals.lunch,
        dinner = d.meals.dinner,
        snack = d.meals.snack,
        minutes = d.exercise.total.round(),
        minutes_avg = d.exercise.daily_average.round(),
        exercise_met = d.exercise.days_met_goal,
        cardio = d.exercises.cardio,
        weights = d.exercises.weight_training,
    )
}

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*").expect("static regex is valid"));

/// Remove markdown code fences a model may wrap around its JSON.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Numbers or numeric strings; anything else is `None`.
fn number(v: Option<&Value>) -> Option<f64> {
    let n: f64 = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_json(text: &str) -> Result<Value, TrackerError> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| {
        let snippet: String = cleaned.chars().take(200).collect();
        TrackerError::Inference(format!("unparsable model output ({e}): {snippet}"))
    })
}

/// Parse the model's nutrition JSON. All four values must be numbers.
pub fn parse_nutrition(text: &str) -> Result<NutritionEstimate, TrackerError> {
    let value = parse_json(text)?;
    let field = |name: &str| match value.get(name) {
        Some(Value::Number(n)) => n
            .as_f64()
            .map(round1)
            .ok_or_else(|| TrackerError::Inference(format!("{name} is not a finite number"))),
        _ => Err(TrackerError::Inference(format!(
            "invalid nutrition data: {name} missing or not a number"
        ))),
    };
    Ok(NutritionEstimate {
        calories: field("calories")?,
        carbs: field("carbs")?,
        fats: field("fats")?,
        protein: field("protein")?,
    })
}

/// Parse the model's exercise JSON. Name and category are required; zero or
/// missing numbers are treated as absent.
pub fn parse_exercise(text: &str) -> Result<ExerciseEstimate, TrackerError> {
    let value = parse_json(text)?;
    let get = |snake: &str, camel: &str| value.get(camel).or_else(|| value.get(snake));

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TrackerError::Inference("could not extract exercise name".into()))?
        .to_string();
    let category: ExerciseCategory = value
        .get("category")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| TrackerError::Inference("could not extract exercise category".into()))?;
    let muscle_group: Option<MuscleGroup> = get("muscle_group", "muscleGroup")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok());

    let positive = |v: Option<f64>| v.filter(|n| *n > 0.0);
    let count = |v: Option<f64>| positive(v).map(|n| n.round() as u32);

    Ok(ExerciseEstimate {
        name,
        category,
        muscle_group,
        sets: count(number(get("sets", "sets"))),
        reps: count(number(get("reps", "reps"))),
        weight: positive(number(get("weight", "weight"))),
        duration: positive(number(get("duration", "duration"))),
        distance: positive(number(get("distance", "distance"))),
        calories_burned: positive(number(get("calories_burned", "caloriesBurned"))),
        notes: get("notes", "notes")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    })
}

/// Parse the model's coaching JSON. The score is clamped to 0..=100 and every
/// text field must be present.
pub fn parse_analysis(text: &str) -> Result<CoachAnalysis, TrackerError> {
    let value = parse_json(text)?;
    let get = |snake: &str, camel: &str| value.get(camel).or_else(|| value.get(snake));
    let missing = |name: &str| TrackerError::Inference(format!("analysis is missing {name}"));

    let text_field = |snake: &str, camel: &str| {
        get(snake, camel)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .ok_or_else(|| missing(camel))
    };
    let list_field = |snake: &str, camel: &str| {
        get(snake, camel)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .ok_or_else(|| missing(camel))
    };

    let score = number(get("overall_score", "overallScore")).ok_or_else(|| missing("overallScore"))?;
    Ok(CoachAnalysis {
        overall_score: score.clamp(0.0, 100.0).round() as u32,
        highlights: list_field("highlights", "highlights")?,
        areas_to_improve: list_field("areas_to_improve", "areasToImprove")?,
        hydration_insight: text_field("hydration_insight", "hydrationInsight")?,
        nutrition_insight: text_field("nutrition_insight", "nutritionInsight")?,
        exercise_insight: text_field("exercise_insight", "exerciseInsight")?,
        weekly_tip: text_field("weekly_tip", "weeklyTip")?,
        motivational_message: text_field("motivational_message", "motivationalMessage")?,
    })
}
