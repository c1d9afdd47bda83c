//! MCP and HTTP surfaces for the fitness tracker.

use chrono::NaiveDate;
use rmcp::Json;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, GetPromptRequestParams, GetPromptResult, ListPromptsResult, ListResourcesResult,
    PaginatedRequestParams, RawResource, ReadResourceRequestParams, ReadResourceResult,
    ResourceContents,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer};
use rmcp::{prompt, prompt_handler, prompt_router, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fittrack_core::analysis::PeriodAnalysis;
use fittrack_core::inference::{ExerciseEstimate, NutritionEstimate};
use fittrack_core::models::{ExerciseUpdate, MealUpdate, NewExercise, NewMeal};
use fittrack_core::utils::{local_today, parse_day};
use fittrack_core::weight::WeightPoint;
use fittrack_core::{DailyRecord, DailyUpdate, ExerciseEntry, Period, PeriodSummary, WeightEntry};

pub mod error;
pub mod http;
pub mod middleware;
mod prompts;
pub mod services;

use services::{
    DEFAULT_STREAK_WINDOW_DAYS, ExerciseLogged, MealLogged, MealsForDay, StreakReport,
    TrackerService, WeightLogged,
};

pub const STREAK_RESOURCE_URI: &str = "fittrack://streak";

#[derive(Clone)]
pub struct FitTrackMcpHandler {
    service: TrackerService,
    tool_router: rmcp::handler::server::tool::ToolRouter<FitTrackMcpHandler>,
    prompt_router: rmcp::handler::server::router::prompt::PromptRouter<FitTrackMcpHandler>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DateParams {
    /// YYYY-MM-DD; defaults to today.
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateDayParams {
    /// YYYY-MM-DD; defaults to today.
    pub date: Option<String>,
    #[serde(flatten)]
    pub fields: DailyUpdate,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct LogWaterParams {
    pub date: Option<String>,
    /// Litres to add. Negative values remove water.
    pub liters: f64,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct IdParams {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateMealParams {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: MealUpdate,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateExerciseParams {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: ExerciseUpdate,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DateRangeParams {
    /// Defaults to `end_date`.
    pub start_date: Option<String>,
    /// Defaults to today.
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DaysParams {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct PeriodParams {
    /// day, week, month or year. Defaults to day.
    pub period: Option<Period>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DescriptionParams {
    pub description: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ExerciseList {
    pub exercises: Vec<ExerciseEntry>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct WeightHistory {
    pub points: Vec<WeightPoint>,
}

/// Parse an optional day argument, falling back to today.
pub fn day_or_today(date: Option<&str>) -> Result<NaiveDate, String> {
    match date.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(local_today()),
        Some(raw) => parse_day(raw).ok_or_else(|| format!("invalid date: {raw}")),
    }
}

#[tool_router]
#[prompt_router]
impl FitTrackMcpHandler {
    pub fn new(service: TrackerService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    pub fn service(&self) -> &TrackerService {
        &self.service
    }

    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompt_router.list_all().len()
    }

    #[tool(
        name = "get_today",
        description = "Get a day's record with its goal completion (defaults to today)"
    )]
    async fn get_today(&self, params: Parameters<DateParams>) -> Result<Json<DailyRecord>, String> {
        let date = day_or_today(params.0.date.as_deref())?;
        let rec = self.service.get_day(date).await?;
        Ok(Json(rec))
    }

    #[tool(
        name = "update_day",
        description = "Set water, calories, macros, exercise minutes, weight or goals for a day"
    )]
    async fn update_day(
        &self,
        params: Parameters<UpdateDayParams>,
    ) -> Result<Json<DailyRecord>, String> {
        let p = params.0;
        let date = day_or_today(p.date.as_deref())?;
        let rec = self.service.update_day(date, p.fields).await?;
        Ok(Json(rec))
    }

    #[tool(name = "log_water", description = "Add water (litres) to a day")]
    async fn log_water(
        &self,
        params: Parameters<LogWaterParams>,
    ) -> Result<Json<DailyRecord>, String> {
        let p = params.0;
        let date = day_or_today(p.date.as_deref())?;
        let rec = self.service.add_water(date, p.liters).await?;
        Ok(Json(rec))
    }

    #[tool(
        name = "log_meal",
        description = "Log a meal; its calories and macros are added to the day"
    )]
    async fn log_meal(&self, params: Parameters<NewMeal>) -> Result<Json<MealLogged>, String> {
        let logged = self.service.log_meal(params.0).await?;
        Ok(Json(logged))
    }

    #[tool(name = "list_meals", description = "List a day's meals with totals")]
    async fn list_meals(&self, params: Parameters<DateParams>) -> Result<Json<MealsForDay>, String> {
        let date = day_or_today(params.0.date.as_deref())?;
        let meals = self.service.list_meals(date).await?;
        Ok(Json(meals))
    }

    #[tool(
        name = "update_meal",
        description = "Edit a meal by id; its day's totals move by the difference"
    )]
    async fn update_meal(
        &self,
        params: Parameters<UpdateMealParams>,
    ) -> Result<Json<MealLogged>, String> {
        let p = params.0;
        let logged = self.service.update_meal(p.id, p.fields).await?;
        Ok(Json(logged))
    }

    #[tool(
        name = "delete_meal",
        description = "Delete a meal by id and subtract it from its day"
    )]
    async fn delete_meal(&self, params: Parameters<IdParams>) -> Result<Json<DailyRecord>, String> {
        let rec = self.service.delete_meal(params.0.id).await?;
        Ok(Json(rec))
    }

    #[tool(
        name = "log_exercise",
        description = "Log an exercise; its duration counts towards exercise minutes"
    )]
    async fn log_exercise(
        &self,
        params: Parameters<NewExercise>,
    ) -> Result<Json<ExerciseLogged>, String> {
        let logged = self.service.log_exercise(params.0).await?;
        Ok(Json(logged))
    }

    #[tool(name = "list_exercises", description = "List exercises in a date range")]
    async fn list_exercises(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ExerciseList>, String> {
        let p = params.0;
        let end = day_or_today(p.end_date.as_deref())?;
        let start = match p.start_date.as_deref() {
            Some(raw) => day_or_today(Some(raw))?,
            None => end,
        };
        let exercises = self.service.list_exercises(start, end).await?;
        Ok(Json(ExerciseList { exercises }))
    }

    #[tool(
        name = "update_exercise",
        description = "Edit an exercise by id; its day's minutes move by the difference"
    )]
    async fn update_exercise(
        &self,
        params: Parameters<UpdateExerciseParams>,
    ) -> Result<Json<ExerciseLogged>, String> {
        let p = params.0;
        let logged = self.service.update_exercise(p.id, p.fields).await?;
        Ok(Json(logged))
    }

    #[tool(
        name = "delete_exercise",
        description = "Delete an exercise by id and subtract its minutes from its day"
    )]
    async fn delete_exercise(
        &self,
        params: Parameters<IdParams>,
    ) -> Result<Json<DailyRecord>, String> {
        let rec = self.service.delete_exercise(params.0.id).await?;
        Ok(Json(rec))
    }

    #[tool(name = "log_weight", description = "Record a weigh-in (one per day)")]
    async fn log_weight(&self, params: Parameters<WeightEntry>) -> Result<Json<WeightLogged>, String> {
        let logged = self.service.log_weight(params.0).await?;
        Ok(Json(logged))
    }

    #[tool(
        name = "get_weight_history",
        description = "Daily weight series with gaps filled from the previous weigh-in"
    )]
    async fn get_weight_history(
        &self,
        params: Parameters<DaysParams>,
    ) -> Result<Json<WeightHistory>, String> {
        let days = params.0.days.unwrap_or(30);
        let points = self.service.weight_history(days, local_today()).await?;
        Ok(Json(WeightHistory { points }))
    }

    #[tool(
        name = "get_streak_stats",
        description = "Current and longest streak plus active and perfect days in the window"
    )]
    async fn get_streak_stats(
        &self,
        params: Parameters<DaysParams>,
    ) -> Result<Json<StreakReport>, String> {
        let days = params.0.days.unwrap_or(DEFAULT_STREAK_WINDOW_DAYS);
        let report = self.service.streak_report(days, local_today()).await?;
        Ok(Json(report))
    }

    #[tool(
        name = "get_period_summary",
        description = "Totals and goal attainment for the current day, week, month or year"
    )]
    async fn get_period_summary(
        &self,
        params: Parameters<PeriodParams>,
    ) -> Result<Json<PeriodSummary>, String> {
        let period = params.0.period.unwrap_or_default();
        let summary = self.service.period_summary(period, local_today()).await?;
        Ok(Json(summary))
    }

    #[tool(
        name = "analyze_period",
        description = "Coaching feedback for a period from the AI model, computed locally if the reply is unusable"
    )]
    async fn analyze_summary(
        &self,
        params: Parameters<PeriodParams>,
    ) -> Result<Json<PeriodAnalysis>, String> {
        let period = params.0.period.unwrap_or_default();
        let analysis = self.service.analyze_period(period, local_today()).await?;
        Ok(Json(analysis))
    }

    #[tool(
        name = "estimate_meal",
        description = "Estimate calories and macros from a meal description"
    )]
    async fn estimate_meal(
        &self,
        params: Parameters<DescriptionParams>,
    ) -> Result<Json<NutritionEstimate>, String> {
        let est = self.service.estimate_meal(&params.0.description).await?;
        Ok(Json(est))
    }

    #[tool(
        name = "estimate_exercise",
        description = "Turn a free-text workout description into structured exercise data"
    )]
    async fn estimate_exercise(
        &self,
        params: Parameters<DescriptionParams>,
    ) -> Result<Json<ExerciseEstimate>, String> {
        let est = self.service.estimate_exercise(&params.0.description).await?;
        Ok(Json(est))
    }

    // === MCP Prompts ===

    #[prompt(
        name = "review-streak",
        description = "Review the current streak and what keeps breaking it"
    )]
    async fn review_streak(&self, params: Parameters<DaysParams>) -> GetPromptResult {
        prompts::review_streak_prompt(params.0.days.unwrap_or(30))
    }

    #[prompt(
        name = "analyze-period",
        description = "Analyze goal attainment and macros for a period"
    )]
    async fn analyze_period(&self, params: Parameters<PeriodParams>) -> GetPromptResult {
        prompts::analyze_period_prompt(params.0.period.unwrap_or_default())
    }
}

#[tool_handler]
#[prompt_handler(router = self.prompt_router)]
impl rmcp::ServerHandler for FitTrackMcpHandler {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        let mut info = rmcp::model::ServerInfo::default();
        info.instructions = Some(
            "FitTrack MCP server - log water, meals, exercise and weight, and read \
             daily goal completion, streaks and period summaries."
                .into(),
        );
        info.capabilities = rmcp::model::ServerCapabilities::builder()
            .enable_tools()
            .enable_prompts()
            .enable_resources()
            .build();
        info
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let mut res = RawResource::new(STREAK_RESOURCE_URI, "Streak").no_annotation();
        res.description =
            Some("Current and longest streak with the last 90 days of daily records".to_string());
        res.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![res],
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        if request.uri != STREAK_RESOURCE_URI {
            return Err(ErrorData::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ));
        }
        let report = self
            .service
            .streak_report(DEFAULT_STREAK_WINDOW_DAYS, local_today())
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

        Ok(ReadResourceResult::new(vec![
            ResourceContents::TextResourceContents {
                uri: request.uri.clone(),
                mime_type: Some("application/json".to_string()),
                text,
                meta: None,
            },
        ]))
    }
}
