use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::{PageQuery, Paginated};

use crate::models::{CreateExerciseRequest, Exercise, ExerciseSearchQuery, UpdateExerciseRequest};

pub struct ExerciseService {
    supabase: SupabaseClient,
}

impl ExerciseService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_exercise(
        &self,
        request: CreateExerciseRequest,
        auth_token: &str,
    ) -> Result<Exercise> {
        debug!("Creating exercise: {}", request.name);

        let exercise_data = json!({
            "name": request.name,
            "description": request.description,
            "category": request.category,
            "difficulty": request.difficulty,
            "default_sets": request.default_sets,
            "default_reps": request.default_reps,
            "default_hold_seconds": request.default_hold_seconds,
            "video_url": request.video_url,
            "equipment": request.equipment,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/exercises",
            Some(auth_token),
            Some(exercise_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create exercise"));
        }

        let exercise: Exercise = serde_json::from_value(result[0].clone())?;
        Ok(exercise)
    }

    pub async fn get_exercise(&self, exercise_id: &str, auth_token: &str) -> Result<Exercise> {
        let path = format!("/rest/v1/exercises?id=eq.{}", exercise_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Exercise not found"));
        }

        let exercise: Exercise = serde_json::from_value(result[0].clone())?;
        Ok(exercise)
    }

    pub async fn search_exercises(
        &self,
        query: &ExerciseSearchQuery,
        auth_token: &str,
    ) -> Result<Paginated<Exercise>> {
        let page_query = PageQuery { page: query.page, limit: query.limit };

        let mut query_parts = Vec::new();
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = urlencoding::encode(search).into_owned();
            query_parts.push(format!("name=ilike.*{}*", pattern));
        }
        if let Some(category) = query.category {
            query_parts.push(format!("category=eq.{}", category));
        }
        if let Some(difficulty) = query.difficulty {
            query_parts.push(format!("difficulty=eq.{}", difficulty));
        }
        query_parts.push("order=name.asc".to_string());
        query_parts.push(page_query.to_range_params());

        let path = format!("/rest/v1/exercises?{}", query_parts.join("&"));
        debug!("Searching exercises: {}", path);

        let counted = self.supabase.get_with_count(&path, Some(auth_token)).await?;
        let exercises: Vec<Exercise> = counted.rows.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Exercise>, _>>()?;

        Ok(Paginated::new(exercises, counted.total, &page_query))
    }

    pub async fn update_exercise(
        &self,
        exercise_id: &str,
        request: UpdateExerciseRequest,
        auth_token: &str,
    ) -> Result<Exercise> {
        debug!("Updating exercise: {}", exercise_id);

        let mut update_data = serde_json::Map::new();
        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(description) = request.description {
            update_data.insert("description".to_string(), json!(description));
        }
        if let Some(category) = request.category {
            update_data.insert("category".to_string(), json!(category));
        }
        if let Some(difficulty) = request.difficulty {
            if !(1..=5).contains(&difficulty) {
                return Err(anyhow!("Difficulty must be between 1 and 5"));
            }
            update_data.insert("difficulty".to_string(), json!(difficulty));
        }
        if let Some(sets) = request.default_sets {
            update_data.insert("default_sets".to_string(), json!(sets));
        }
        if let Some(reps) = request.default_reps {
            update_data.insert("default_reps".to_string(), json!(reps));
        }
        if let Some(hold) = request.default_hold_seconds {
            update_data.insert("default_hold_seconds".to_string(), json!(hold));
        }
        if let Some(video_url) = request.video_url {
            update_data.insert("video_url".to_string(), json!(video_url));
        }
        if let Some(equipment) = request.equipment {
            update_data.insert("equipment".to_string(), json!(equipment));
        }

        if update_data.is_empty() {
            return Err(anyhow!("No fields to update"));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/exercises?id=eq.{}", exercise_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to update exercise"));
        }

        let exercise: Exercise = serde_json::from_value(result[0].clone())?;
        Ok(exercise)
    }

    pub async fn delete_exercise(&self, exercise_id: &str, auth_token: &str) -> Result<()> {
        debug!("Deleting exercise: {}", exercise_id);

        let path = format!("/rest/v1/exercises?id=eq.{}", exercise_id);
        let _: Vec<Value> = self.supabase.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(())
    }
}
