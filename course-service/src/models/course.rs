use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A course row as returned by the store.
///
/// Everything other than the id and title is carried through untouched in
/// `metadata` (instructor, credits, vector distance, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CourseRecord {
    /// Shape one store row. Fails when the row has no usable identifier,
    /// since an id cannot be made up.
    pub fn from_row(row: Value) -> Result<Self, String> {
        let Value::Object(mut fields) = row else {
            return Err("row is not a JSON object".to_string());
        };

        let course_id = match fields.remove("course_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err("row has no course_id".to_string()),
        };

        let title = match fields.remove("title") {
            Some(Value::String(title)) => title,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Ok(Self {
            course_id,
            title,
            metadata: fields,
        })
    }
}
