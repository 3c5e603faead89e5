use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MESSAGE: &str = "Great experience with CI GPT!";
pub const DEFAULT_NAME: &str = "Anonymous User";
pub const DEFAULT_LOCATION: &str = "Verified User";
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Testimonial {
    pub name: String,
    pub message: String,
    pub rating: u8,
    pub location: String,
}

impl Testimonial {
    /// Builds a testimonial from whichever field names the backend used.
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let first = |keys: &[&str]| keys.iter().find_map(|&k| text(k));

        let location = match (text("country"), text("program")) {
            (Some(country), Some(program)) => format!("{} • {}", country, program),
            _ => text("location").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        };

        let rating = value
            .get("rating")
            .and_then(Value::as_u64)
            .filter(|r| *r > 0)
            .map(|r| r.min(u64::from(MAX_RATING)) as u8)
            .unwrap_or(MAX_RATING);

        Self {
            name: first(&["user_name", "name", "author"]).unwrap_or_else(|| DEFAULT_NAME.to_string()),
            message: first(&["message", "text", "content"])
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            rating,
            location,
        }
    }
}
