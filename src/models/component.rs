use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};

pub const DEFAULT_COMPONENT_TYPE: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Component {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    pub lab_id: i32,
    pub quantity: i32,
    pub min_stock_level: i32,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub component_type: Option<String>,
    pub date_added: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Component {
    pub fn stock_state(&self) -> StockState {
        StockState::of(self.quantity, self.min_stock_level)
    }

    pub fn unit_text(&self) -> &str {
        self.unit.as_deref().unwrap_or_default()
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn type_text(&self) -> &str {
        self.component_type.as_deref().unwrap_or(DEFAULT_COMPONENT_TYPE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StockState {
    OutOfStock,
    Low,
    InStock,
}

impl StockState {
    pub fn of(quantity: i32, min_stock_level: i32) -> Self {
        if quantity <= 0 {
            StockState::OutOfStock
        } else if quantity <= min_stock_level {
            StockState::Low
        } else {
            StockState::InStock
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockState::OutOfStock => "Out of Stock",
            StockState::Low => "Low Stock",
            StockState::InStock => "In Stock",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            StockState::OutOfStock => "out",
            StockState::Low => "low",
            StockState::InStock => "instock",
        }
    }
}

/// Component joined with its category and lab names for listing screens.
#[derive(Debug, Serialize, FromRow)]
pub struct ComponentDisplay {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    pub category_name: String,
    pub lab_id: i32,
    pub lab_name: String,
    pub quantity: i32,
    pub min_stock_level: i32,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub component_type: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl ComponentDisplay {
    pub fn stock_state(&self) -> StockState {
        StockState::of(self.quantity, self.min_stock_level)
    }

    pub fn unit_text(&self) -> &str {
        self.unit.as_deref().unwrap_or_default()
    }

    pub fn type_text(&self) -> &str {
        self.component_type.as_deref().unwrap_or(DEFAULT_COMPONENT_TYPE)
    }
}

// Shape returned by the JSON component lookup
#[derive(Debug, Serialize, FromRow)]
pub struct ComponentOption {
    pub id: i32,
    pub name: String,
    pub quantity: i32,
    pub unit: Option<String>,
}
