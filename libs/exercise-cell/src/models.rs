use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: ExerciseCategory,
    /// 1 (easiest) to 5 (hardest)
    pub difficulty: i32,
    pub default_sets: Option<i32>,
    pub default_reps: Option<i32>,
    pub default_hold_seconds: Option<i32>,
    pub video_url: Option<String>,
    pub equipment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Stretching,
    Strengthening,
    Mobility,
    Balance,
    Cardio,
}

impl fmt::Display for ExerciseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExerciseCategory::Stretching => write!(f, "stretching"),
            ExerciseCategory::Strengthening => write!(f, "strengthening"),
            ExerciseCategory::Mobility => write!(f, "mobility"),
            ExerciseCategory::Balance => write!(f, "balance"),
            ExerciseCategory::Cardio => write!(f, "cardio"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExerciseRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: ExerciseCategory,
    pub difficulty: i32,
    pub default_sets: Option<i32>,
    pub default_reps: Option<i32>,
    pub default_hold_seconds: Option<i32>,
    pub video_url: Option<String>,
    pub equipment: Option<String>,
}

impl CreateExerciseRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Exercise name is required".to_string());
        }
        if !(1..=5).contains(&self.difficulty) {
            return Err("Difficulty must be between 1 and 5".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateExerciseRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ExerciseCategory>,
    pub difficulty: Option<i32>,
    pub default_sets: Option<i32>,
    pub default_reps: Option<i32>,
    pub default_hold_seconds: Option<i32>,
    pub video_url: Option<String>,
    pub equipment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExerciseSearchQuery {
    pub search: Option<String>,
    pub category: Option<ExerciseCategory>,
    pub difficulty: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExercisePrescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub physiotherapist_id: Uuid,
    pub items: Vec<PrescriptionItem>,
    pub status: PrescriptionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub exercise_id: Uuid,
    pub sets: i32,
    pub reps: i32,
    pub hold_seconds: Option<i32>,
    pub frequency_per_week: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: Uuid,
    pub items: Vec<PrescriptionItem>,
    pub notes: Option<String>,
}

impl CreatePrescriptionRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.patient_id.is_nil() {
            return Err("patient_id is required".to_string());
        }
        if self.items.is_empty() {
            return Err("A prescription needs at least one exercise".to_string());
        }
        for item in &self.items {
            if item.sets <= 0 || item.reps <= 0 {
                return Err("Sets and reps must be positive".to_string());
            }
            if item.frequency_per_week <= 0 || item.frequency_per_week > 7 {
                return Err("Frequency must be between 1 and 7 days per week".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub status: Option<PrescriptionStatus>,
    pub items: Option<Vec<PrescriptionItem>>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> PrescriptionItem {
        PrescriptionItem {
            exercise_id: Uuid::new_v4(),
            sets: 3,
            reps: 12,
            hold_seconds: None,
            frequency_per_week: 3,
            notes: None,
        }
    }

    #[test]
    fn exercise_difficulty_bounds() {
        let mut request = CreateExerciseRequest {
            name: "Wall slide".to_string(),
            description: None,
            category: ExerciseCategory::Mobility,
            difficulty: 2,
            default_sets: Some(3),
            default_reps: Some(10),
            default_hold_seconds: None,
            video_url: None,
            equipment: None,
        };
        assert!(request.validate().is_ok());

        request.difficulty = 0;
        assert!(request.validate().is_err());
        request.difficulty = 6;
        assert!(request.validate().is_err());
    }

    #[test]
    fn prescription_needs_items_with_sane_dosage() {
        let mut request = CreatePrescriptionRequest {
            patient_id: Uuid::new_v4(),
            items: vec![item()],
            notes: None,
        };
        assert!(request.validate().is_ok());

        request.items.clear();
        assert!(request.validate().is_err());

        request.items = vec![PrescriptionItem { sets: 0, ..item() }];
        assert!(request.validate().is_err());

        request.items = vec![PrescriptionItem { frequency_per_week: 9, ..item() }];
        assert!(request.validate().is_err());
    }
}
