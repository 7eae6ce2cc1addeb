use serde::{Deserialize, Serialize};

pub type FormId = i64;
pub type SubmissionId = i64;
pub type NotificationId = i64;
pub type FieldId = i64;

/// One completed instance of a form's answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub form_id: FormId,
    /// Answers in the order they were submitted
    #[serde(default)]
    pub fields: Vec<Field>,
    pub form: Form,
}

impl Submission {
    /// Find the answer recorded for a form field
    pub fn field(&self, field_id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|field| field.field_id == field_id)
    }
}

/// A single named answer within a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub field_id: FieldId,
    #[serde(default)]
    pub content: Option<FieldContent>,
}

/// Dynamically typed answer content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldContent {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<serde_json::Value>),
    Object(serde_json::Map<String, serde_json::Value>),
}

impl FieldContent {
    /// Borrow the content as text, if it is a plain string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldContent::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for FieldContent {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldContent::Null,
            serde_json::Value::Bool(b) => FieldContent::Bool(b),
            serde_json::Value::Number(n) => FieldContent::Number(n),
            serde_json::Value::String(s) => FieldContent::Text(s),
            serde_json::Value::Array(items) => FieldContent::List(items),
            serde_json::Value::Object(map) => FieldContent::Object(map),
        }
    }
}

/// The form a submission belongs to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Form {
    pub id: FormId,
    #[serde(default)]
    pub notifications: Vec<NotificationRule>,
}

/// Reference to a form field by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub id: FieldId,
}

/// Form-level configuration describing one email to send upon submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRule {
    pub id: NotificationId,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_field: Option<FieldRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_field: Option<FieldRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html_template: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_content_variants_from_json() {
        let submission: Submission = serde_json::from_value(json!({
            "id": 7,
            "form_id": 3,
            "fields": [
                {"field_id": 1, "content": "a@x.com"},
                {"field_id": 2, "content": 42},
                {"field_id": 3, "content": {"value": "a@x.com"}},
                {"field_id": 4, "content": null},
                {"field_id": 5, "content": ["a", "b"]},
                {"field_id": 6}
            ],
            "form": {"id": 3, "notifications": []}
        }))
        .unwrap();

        assert_eq!(
            submission.field(1).unwrap().content,
            Some(FieldContent::Text("a@x.com".to_string()))
        );
        assert!(matches!(
            submission.field(2).unwrap().content,
            Some(FieldContent::Number(_))
        ));
        assert!(matches!(
            submission.field(3).unwrap().content,
            Some(FieldContent::Object(_))
        ));
        assert!(matches!(
            submission.field(5).unwrap().content,
            Some(FieldContent::List(_))
        ));
        // serde maps an explicit null on an Option to None
        assert_eq!(submission.field(4).unwrap().content, None);
        assert_eq!(submission.field(6).unwrap().content, None);
        assert!(submission.field(99).is_none());
    }

    #[test]
    fn test_as_text_only_for_strings() {
        assert_eq!(FieldContent::Text("hi".into()).as_text(), Some("hi"));
        assert_eq!(FieldContent::from(json!(1)).as_text(), None);
        assert_eq!(FieldContent::from(json!({"a": 1})).as_text(), None);
        assert_eq!(FieldContent::Null.as_text(), None);
    }

    #[test]
    fn test_rule_defaults() {
        let rule: NotificationRule = serde_json::from_value(json!({"id": 1})).unwrap();
        assert!(!rule.enabled);
        assert!(rule.to_field.is_none());
        assert!(rule.to_email.is_none());
        assert!(rule.subject.is_empty());
    }
}
