use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a string does not name a member of one of the ticket enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} '{value}'. Must be one of: {allowed}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub allowed: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Billing,
    Technical,
    Account,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Billing,
        Category::Technical,
        Category::Account,
        Category::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Billing => "billing",
            Category::Technical => "technical",
            Category::Account => "account",
            Category::General => "general",
        }
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "billing" => Ok(Category::Billing),
            "technical" => Ok(Category::Technical),
            "account" => Ok(Category::Account),
            "general" => Ok(Category::General),
            _ => Err(ParseEnumError {
                kind: "category",
                value: s.to_string(),
                allowed: "billing, technical, account, general",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(ParseEnumError {
                kind: "priority",
                value: s.to_string(),
                allowed: "low, medium, high, critical",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Open,
        Status::InProgress,
        Status::Resolved,
        Status::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::Resolved => "resolved",
            Status::Closed => "closed",
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Status::Open),
            "in_progress" => Ok(Status::InProgress),
            "resolved" => Ok(Status::Resolved),
            "closed" => Ok(Status::Closed),
            _ => Err(ParseEnumError {
                kind: "status",
                value: s.to_string(),
                allowed: "open, in_progress, resolved, closed",
            }),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub ai_response: Option<String>,
}

/// Fields accepted when a ticket is submitted. Status is not settable here.
#[derive(Debug, Clone, Default)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub ai_response: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketUpdate {
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.priority.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Description,
    Category,
    Priority,
    Status,
    CreatedAt,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Description => "description",
            SortField::Category => "category",
            SortField::Priority => "priority",
            SortField::Status => "status",
            SortField::CreatedAt => "created_at",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(SortField::Id),
            "title" => Some(SortField::Title),
            "description" => Some(SortField::Description),
            "category" => Some(SortField::Category),
            "priority" => Some(SortField::Priority),
            "status" => Some(SortField::Status),
            "created_at" => Some(SortField::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    /// Parses an `ordering` parameter such as `"-priority,title"`.
    /// Unknown field names are dropped rather than rejected.
    pub fn parse_list(raw: &str) -> Vec<SortKey> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|term| {
                let (descending, name) = match term.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, term),
                };
                SortField::from_name(name).map(|field| SortKey { field, descending })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub search: Option<String>,
    /// Empty means newest first.
    pub ordering: Vec<SortKey>,
}

/// Advisory triage produced by the classifier. Never persisted as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub suggested_category: Category,
    pub suggested_priority: Priority,
    pub ai_response: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub critical: i64,
}

impl PriorityBreakdown {
    pub fn record(&mut self, priority: Priority, count: i64) {
        match priority {
            Priority::Low => self.low += count,
            Priority::Medium => self.medium += count,
            Priority::High => self.high += count,
            Priority::Critical => self.critical += count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub billing: i64,
    pub technical: i64,
    pub account: i64,
    pub general: i64,
}

impl CategoryBreakdown {
    pub fn record(&mut self, category: Category, count: i64) {
        match category {
            Category::Billing => self.billing += count,
            Category::Technical => self.technical += count,
            Category::Account => self.account += count,
            Category::General => self.general += count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketStats {
    pub total_tickets: i64,
    pub open_tickets: i64,
    pub avg_tickets_per_day: f64,
    pub priority_breakdown: PriorityBreakdown,
    pub category_breakdown: CategoryBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_enum_strings_roundtrip() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        for p in Priority::ALL {
            assert_eq!(p.as_str().parse::<Priority>().unwrap(), p);
        }
        for s in Status::ALL {
            assert_eq!(s.as_str().parse::<Status>().unwrap(), s);
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Category::default(), Category::General);
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Status::default(), Status::Open);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Billing".parse::<Category>().is_err());
        assert!("HIGH".parse::<Priority>().is_err());
        assert!("in-progress".parse::<Status>().is_err());
    }

    #[test]
    fn test_parse_error_message() {
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid priority 'urgent'. Must be one of: low, medium, high, critical"
        );
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_sort_key_parse() {
        let keys = SortKey::parse_list("-priority, title,-description");
        assert_eq!(
            keys,
            vec![
                SortKey { field: SortField::Priority, descending: true },
                SortKey { field: SortField::Title, descending: false },
                SortKey { field: SortField::Description, descending: true },
            ]
        );
    }

    #[test]
    fn test_sort_key_ignores_unknown_fields() {
        let keys = SortKey::parse_list("bogus,-created_at,;DROP TABLE tickets");
        assert_eq!(
            keys,
            vec![SortKey { field: SortField::CreatedAt, descending: true }]
        );
        assert!(SortKey::parse_list("").is_empty());
    }

    #[test]
    fn test_breakdown_record_is_exhaustive() {
        let mut pb = PriorityBreakdown::default();
        for p in Priority::ALL {
            pb.record(p, 2);
        }
        assert_eq!(pb, PriorityBreakdown { low: 2, medium: 2, high: 2, critical: 2 });

        let json = serde_json::to_value(CategoryBreakdown::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"billing": 0, "technical": 0, "account": 0, "general": 0})
        );
    }

    proptest! {
        #[test]
        fn prop_unknown_category_rejected(
            value in "[a-zA-Z_]{0,12}"
                .prop_filter("Exclude valid categories", |s| {
                    !["billing", "technical", "account", "general"].contains(&s.as_str())
                })
        ) {
            prop_assert!(value.parse::<Category>().is_err());
        }

        #[test]
        fn prop_unknown_status_rejected(
            value in "[a-z_]{0,12}"
                .prop_filter("Exclude valid statuses", |s| {
                    !["open", "in_progress", "resolved", "closed"].contains(&s.as_str())
                })
        ) {
            prop_assert!(value.parse::<Status>().is_err());
        }
    }
}
