use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lab {
    pub id: i32,
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lab {
    pub fn location_text(&self) -> &str {
        self.location.as_deref().unwrap_or_default()
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

// Dashboard row: one per lab, including labs with no components
#[derive(Debug, Serialize, FromRow)]
pub struct LabComponentCount {
    pub lab_name: String,
    pub component_count: i64,
}
