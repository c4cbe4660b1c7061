#![forbid(unsafe_code)]

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

/// Accepts a JSON string or number for scalar text fields (`itemNumber: 3`
/// and `itemNumber: "3"` are the same item, `technician: 42` reads as `"42"`).
/// `null` and absence both map to `None`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Scalar>::deserialize(deserializer)?;
    Ok(raw.map(|scalar| match scalar {
        Scalar::Text(text) => text,
        Scalar::Number(number) => number.to_string(),
    }))
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
