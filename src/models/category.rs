use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub lab_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn belongs_to(&self, lab_id: i32) -> bool {
        self.lab_id == Some(lab_id)
    }
}

/// Category listing row with the owning lab's name and aggregate stock figures.
#[derive(Debug, Serialize, FromRow)]
pub struct CategorySummary {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub lab_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub component_count: i64,
    pub total_quantity: i64,
}

impl CategorySummary {
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn lab_text(&self) -> &str {
        self.lab_name.as_deref().unwrap_or("-")
    }
}
