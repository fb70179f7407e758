// Record types stored in the durable collections.
//
// Field names serialize in camelCase so the stored JSON blobs keep the
// layout the web client reads and writes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// How a listing changes hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingType {
    Sell,
    Rent,
    Free,
}

/// Marketplace categories. Serialized with their display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Engineering Graphics Kits")]
    EngineeringGraphicsKits,
    #[serde(rename = "Drawing Sheet Containers")]
    DrawingSheetContainers,
    #[serde(rename = "Vehicle Sensors")]
    Sensors,
    #[serde(rename = "Hardware/Tools")]
    Hardware,
    #[serde(rename = "Electronic Components")]
    Components,
    #[serde(rename = "General Student Essentials")]
    GeneralEssentials,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::EngineeringGraphicsKits,
        Category::DrawingSheetContainers,
        Category::Sensors,
        Category::Hardware,
        Category::Components,
        Category::GeneralEssentials,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::EngineeringGraphicsKits => "Engineering Graphics Kits",
            Category::DrawingSheetContainers => "Drawing Sheet Containers",
            Category::Sensors => "Vehicle Sensors",
            Category::Hardware => "Hardware/Tools",
            Category::Components => "Electronic Components",
            Category::GeneralEssentials => "General Student Essentials",
        }
    }

    /// Parse a display label (as returned by the appraisal service).
    /// Unknown labels map to `None`.
    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Physical form of a shared note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteFormat {
    #[serde(rename = "PDF (Softcopy)")]
    Digital,
    #[serde(rename = "Hardcopy (Handwritten)")]
    Physical,
}

/// Year of study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassYear {
    FE,
    SE,
    TE,
    BE,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Inspector report attached to a listing after an AI appraisal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HonestReview {
    #[serde(default)]
    pub specs: Vec<String>,
    #[serde(default)]
    pub faults: Vec<String>,
    #[serde(default)]
    pub grading_explanation: String,
}

/// A physical item offered on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub listing_type: ListingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_deposit: Option<f64>,
    pub category: Category,
    pub department: String,
    pub owner: String,
    pub owner_email: String,
    /// Owner's karma at the time of listing. Not kept in sync.
    pub owner_karma: i64,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honest_review: Option<HonestReview>,
    pub condition: String,
    pub created_at: DateTime<Utc>,
    /// Estimated kg of CO2 saved by reuse.
    pub carbon_saved: f64,
}

// ---------------------------------------------------------------------------
// Note
// ---------------------------------------------------------------------------

/// A shared set of study notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub department: String,
    pub semester: u8,
    pub author: String,
    pub author_email: String,
    #[serde(default)]
    pub is_author_verified: bool,
    pub file_url: String,
    pub format: NoteFormat,
    #[serde(default)]
    pub downloads: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A campus account. Overwritten in full on every profile or karma change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_year: Option<ClassYear>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub is_logged_in: bool,
    pub karma: i64,
    #[serde(default)]
    pub total_carbon_saved: f64,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Exchange lifecycle stage of a listing or note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Active,
    Requested,
    Accepted,
    Completed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Active => "active",
            TradeStatus::Requested => "requested",
            TradeStatus::Accepted => "accepted",
            TradeStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counterparty recorded when the caller does not name one.
pub const SYSTEM_COUNTERPARTY: &str = "system";

/// The entire trade state for one item: current status and counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub status: TradeStatus,
    pub buyer_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_record_uses_buyer_id_key() {
        let rec = TradeRecord {
            status: TradeStatus::Requested,
            buyer_id: "u1".into(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json, serde_json::json!({"status": "requested", "buyerId": "u1"}));
    }

    #[test]
    fn category_labels_round_trip_through_serde() {
        for cat in Category::ALL {
            let json = serde_json::to_string(&cat).unwrap();
            assert_eq!(json, format!("\"{}\"", cat.label()));
            assert_eq!(Category::from_label(cat.label()), Some(cat));
        }
        assert_eq!(Category::from_label("hardware/tools"), Some(Category::Hardware));
        assert_eq!(Category::from_label("Spaceships"), None);
    }

    #[test]
    fn note_format_uses_display_labels() {
        let json = serde_json::to_string(&NoteFormat::Physical).unwrap();
        assert_eq!(json, "\"Hardcopy (Handwritten)\"");
    }

    #[test]
    fn user_tolerates_missing_optional_fields() {
        let user: User = serde_json::from_str(
            r#"{"uid":"abc","email":"a@bvuniversity.edu.in","karma":-5}"#,
        )
        .unwrap();
        assert_eq!(user.karma, -5);
        assert!(user.avatar_url.is_none());
        assert!(!user.is_logged_in);
        assert_eq!(user.total_carbon_saved, 0.0);
    }
}
