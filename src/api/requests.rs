use serde::Deserialize;
use serde_json::{Map, Value};
use std::str::FromStr;

use super::error::{ApiError, FieldErrors};
use crate::models::{NewTicket, ParseEnumError, SortKey, TicketFilter, TicketUpdate};

pub const TITLE_MAX_CHARS: usize = 200;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

#[derive(Debug, Default, Deserialize)]
pub struct ListTicketsParams {
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl ListTicketsParams {
    pub fn into_filter(self) -> Result<TicketFilter, ApiError> {
        let mut errors = FieldErrors::default();

        let filter = TicketFilter {
            category: parse_optional(self.category.as_deref(), &mut errors),
            priority: parse_optional(self.priority.as_deref(), &mut errors),
            status: parse_optional(self.status.as_deref(), &mut errors),
            search: self.search.filter(|s| !s.trim().is_empty()),
            ordering: self
                .ordering
                .as_deref()
                .map(SortKey::parse_list)
                .unwrap_or_default(),
        };

        errors.into_result()?;
        Ok(filter)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
}

impl CreateTicketRequest {
    /// Checks every field and returns the insertable ticket. Any `status` in the
    /// body was already discarded by deserialization.
    pub fn validate(self) -> Result<NewTicket, ApiError> {
        let mut errors = FieldErrors::default();

        let title = required_text("title", self.title, &mut errors);
        if title.chars().count() > TITLE_MAX_CHARS {
            errors.add(
                "title",
                format!("Ensure this field has no more than {} characters.", TITLE_MAX_CHARS),
            );
        }
        let description = required_text("description", self.description, &mut errors);
        let category = parse_optional(self.category.as_deref(), &mut errors);
        let priority = parse_optional(self.priority.as_deref(), &mut errors);

        errors.into_result()?;
        Ok(NewTicket {
            title,
            description,
            category,
            priority,
            ai_response: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl UpdateTicketRequest {
    pub fn validate(self) -> Result<TicketUpdate, ApiError> {
        let mut errors = FieldErrors::default();

        for field in self.other.keys() {
            errors.add(
                field,
                "This field cannot be changed. Only category, priority and status are editable.",
            );
        }

        let update = TicketUpdate {
            category: parse_strict(self.category.as_deref(), &mut errors),
            priority: parse_strict(self.priority.as_deref(), &mut errors),
            status: parse_strict(self.status.as_deref(), &mut errors),
        };

        errors.into_result()?;
        Ok(update)
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub description: Option<String>,
}

impl ClassifyRequest {
    pub fn validate(self) -> Result<String, ApiError> {
        let mut errors = FieldErrors::default();
        let description = required_text("description", self.description, &mut errors);
        errors.into_result()?;
        Ok(description)
    }
}

fn required_text(field: &str, value: Option<String>, errors: &mut FieldErrors) -> String {
    match value {
        None => {
            errors.add(field, REQUIRED);
            String::new()
        }
        Some(v) if v.trim().is_empty() => {
            errors.add(field, BLANK);
            String::new()
        }
        Some(v) => v,
    }
}

/// Empty strings count as absent, the way query-string filters behave.
fn parse_optional<T>(value: Option<&str>, errors: &mut FieldErrors) -> Option<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    parse_strict(value.filter(|v| !v.is_empty()), errors)
}

fn parse_strict<T>(value: Option<&str>, errors: &mut FieldErrors) -> Option<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    match value?.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            errors.add(e.kind, e.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Priority, Status};

    fn create(title: Option<&str>, description: Option<&str>) -> CreateTicketRequest {
        CreateTicketRequest {
            title: title.map(String::from),
            description: description.map(String::from),
            category: None,
            priority: None,
        }
    }

    fn field_errors(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation { fields, .. } => fields.into_keys().collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_requires_title_and_description() {
        let err = create(None, Some("  ")).validate().unwrap_err();
        assert_eq!(field_errors(err), vec!["description", "title"]);
    }

    #[test]
    fn test_create_title_length_counts_chars() {
        let title = "é".repeat(TITLE_MAX_CHARS);
        assert!(create(Some(&title), Some("d")).validate().is_ok());

        let title = "a".repeat(TITLE_MAX_CHARS + 1);
        let err = create(Some(&title), Some("d")).validate().unwrap_err();
        assert_eq!(field_errors(err), vec!["title"]);
    }

    #[test]
    fn test_create_rejects_bad_enums() {
        let req = CreateTicketRequest {
            category: Some("shipping".to_string()),
            priority: Some("urgent".to_string()),
            ..create(Some("t"), Some("d"))
        };
        let err = req.validate().unwrap_err();
        assert_eq!(field_errors(err), vec!["category", "priority"]);
    }

    #[test]
    fn test_create_ignores_status_in_body() {
        let req: CreateTicketRequest = serde_json::from_value(serde_json::json!({
            "title": "t", "description": "d", "status": "closed", "priority": "low"
        }))
        .unwrap();
        let ticket = req.validate().unwrap();
        assert_eq!(ticket.priority, Some(Priority::Low));
        assert_eq!(ticket.category, None);
    }

    #[test]
    fn test_update_rejects_other_fields() {
        let req: UpdateTicketRequest = serde_json::from_value(serde_json::json!({
            "status": "closed", "title": "sneaky", "created_at": "2020-01-01T00:00:00Z"
        }))
        .unwrap();
        let err = req.validate().unwrap_err();
        assert_eq!(field_errors(err), vec!["created_at", "title"]);
    }

    #[test]
    fn test_update_empty_string_is_invalid() {
        let req: UpdateTicketRequest =
            serde_json::from_value(serde_json::json!({ "status": "" })).unwrap();
        let err = req.validate().unwrap_err();
        assert_eq!(field_errors(err), vec!["status"]);
    }

    #[test]
    fn test_update_parses_enums() {
        let req: UpdateTicketRequest = serde_json::from_value(serde_json::json!({
            "status": "in_progress", "category": "account"
        }))
        .unwrap();
        assert_eq!(
            req.validate().unwrap(),
            TicketUpdate {
                category: Some(Category::Account),
                priority: None,
                status: Some(Status::InProgress),
            }
        );
    }

    #[test]
    fn test_list_params_blank_values_ignored() {
        let params = ListTicketsParams {
            category: Some(String::new()),
            search: Some("  ".to_string()),
            ordering: Some("-priority".to_string()),
            ..Default::default()
        };
        let filter = params.into_filter().unwrap();
        assert_eq!(filter.category, None);
        assert_eq!(filter.search, None);
        assert_eq!(filter.ordering.len(), 1);
    }

    #[test]
    fn test_list_params_invalid_filter() {
        let params = ListTicketsParams {
            status: Some("pending".to_string()),
            ..Default::default()
        };
        let err = params.into_filter().unwrap_err();
        assert_eq!(field_errors(err), vec!["status"]);
    }

    #[test]
    fn test_classify_requires_description() {
        let req = ClassifyRequest { description: None };
        assert!(req.validate().is_err());
        let req = ClassifyRequest {
            description: Some("Cannot log in".to_string()),
        };
        assert_eq!(req.validate().unwrap(), "Cannot log in");
    }
}
