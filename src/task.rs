use crate::user::User;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Write as _};

/// Canonical calendar-date format used by both storage backends.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const NO_TAGS: &str = "No Tags";

/// Formats `date` with an arbitrary chrono format string.
///
/// Fails instead of panicking when `fmt` contains an invalid specifier.
pub fn format_date(date: NaiveDate, fmt: &str) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write!(out, "{}", date.format(fmt))?;
    Ok(out)
}

pub fn parse_date(text: &str, fmt: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(text.trim(), fmt)
}

/// `yyyy-MM-dd`, the form written to the database and the backup file.
pub fn canonical_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Pending,
    Completed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Completed => "Completed",
        }
    }

    /// Lenient parse: any casing of "completed" is `Completed`, anything
    /// else (blank, missing, unknown words) is `Pending`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some(text) if text.trim().eq_ignore_ascii_case("completed") => Status::Completed,
            _ => Status::Pending,
        }
    }

    /// Strict parse for user input; `None` unless the text names a status.
    pub fn parse_strict(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("pending") {
            Some(Status::Pending)
        } else if text.eq_ignore_ascii_case("completed") {
            Some(Status::Completed)
        } else {
            None
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Status::from_raw(raw.as_deref()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Database identity; 0 until the task has been inserted.
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, deserialize_with = "unique_tags")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user: Option<String>,
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        due_date: Option<NaiveDate>,
        category: impl Into<String>,
        status: Option<&str>,
    ) -> Self {
        Self {
            id: 0,
            title: title.into(),
            description: description.into(),
            due_date,
            category: category.into(),
            status: Status::from_raw(status),
            tags: Vec::new(),
            assigned_user: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns `false` when the tag was already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        match self.tags.iter().position(|t| t == tag) {
            Some(index) => {
                self.tags.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn mark_completed(&mut self) {
        self.status = Status::Completed;
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// Case-insensitive category match.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.to_lowercase() == category.to_lowercase()
    }

    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.due_date == Some(date)
    }

    pub fn assign_to(&mut self, user: &User) {
        self.assigned_user = Some(user.username().to_string());
    }

    pub fn formatted_tags(&self) -> String {
        if self.tags.is_empty() {
            NO_TAGS.to_string()
        } else {
            self.tags.join(", ")
        }
    }

    pub fn formatted_due_date(&self) -> Option<String> {
        self.due_date.map(canonical_date)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - Due: {} - Status: {} - Tags: {}",
            self.title,
            self.category,
            self.formatted_due_date().as_deref().unwrap_or("none"),
            self.status,
            self.formatted_tags()
        )
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn unique_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn blank_status_defaults_to_pending(#[case] status: Option<&str>) {
        let task = Task::new("Write report", "", Some(date(2025, 3, 20)), "Work", status);
        assert_eq!(task.status, Status::Pending);
    }

    #[rstest]
    #[case("Completed", Status::Completed)]
    #[case("completed", Status::Completed)]
    #[case("COMPLETED", Status::Completed)]
    #[case("Pending", Status::Pending)]
    #[case("In Progress", Status::Pending)]
    fn status_parsing_is_case_insensitive(#[case] raw: &str, #[case] expected: Status) {
        assert_eq!(Status::from_raw(Some(raw)), expected);
    }

    #[test]
    fn add_tag_is_idempotent() {
        let mut task = Task::new("Gym", "", None, "Personal", None);
        assert!(task.add_tag("health"));
        assert!(!task.add_tag("health"));
        assert_eq!(task.tags(), ["health"]);
    }

    #[test]
    fn remove_tag_ignores_unknown_tags() {
        let mut task = Task::new("Gym", "", None, "Personal", None);
        task.add_tag("health");
        task.add_tag("morning");
        assert!(!task.remove_tag("evening"));
        assert!(task.remove_tag("health"));
        assert_eq!(task.tags(), ["morning"]);
    }

    #[test]
    fn formatted_tags_uses_sentinel_when_empty() {
        let mut task = Task::new("Read", "", None, "Study", None);
        assert_eq!(task.formatted_tags(), "No Tags");
        task.add_tag("books");
        task.add_tag("evening");
        assert_eq!(task.formatted_tags(), "books, evening");
    }

    #[test]
    fn mark_completed_overrides_status() {
        let mut task = Task::new("Read", "", None, "Study", Some("pending"));
        task.mark_completed();
        assert!(task.is_completed());
        assert_eq!(task.status.to_string(), "Completed");
    }

    #[test]
    fn display_includes_all_fields() {
        let mut task = Task::new("Pay rent", "", Some(date(2025, 4, 1)), "Personal", None);
        task.add_tag("money");
        assert_eq!(
            task.to_string(),
            "Pay rent (Personal) - Due: 2025-04-01 - Status: Pending - Tags: money"
        );
    }

    #[test]
    fn missing_due_date_formats_to_none() {
        let task = Task::new("Someday", "", None, "Personal", None);
        assert_eq!(task.formatted_due_date(), None);
    }

    #[test]
    fn format_date_accepts_custom_patterns() {
        let day = date(2025, 3, 9);
        assert_eq!(format_date(day, "%d/%m/%Y").unwrap(), "09/03/2025");
        assert_eq!(canonical_date(day), "2025-03-09");
        assert!(format_date(day, "%Q").is_err());
    }

    #[test]
    fn parse_date_trims_input() {
        assert_eq!(parse_date(" 2025-03-09 ", DATE_FORMAT).unwrap(), date(2025, 3, 9));
        assert!(parse_date("Mar 09, 2025", DATE_FORMAT).is_err());
    }

    #[test]
    fn deserialization_collapses_duplicate_tags_and_nulls() {
        let json = r#"{
            "id": 3,
            "title": "Plan trip",
            "description": null,
            "dueDate": "2025-06-01",
            "category": "Personal",
            "status": null,
            "tags": ["travel", "travel", "summer"],
            "formattedTags": "ignored"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, 3);
        assert_eq!(task.description, "");
        assert_eq!(task.status, Status::Pending);
        assert_eq!(task.tags(), ["travel", "summer"]);
        assert_eq!(task.due_date, Some(date(2025, 6, 1)));
    }
}
