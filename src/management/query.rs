//! Query string assembly for Management API requests.

use url::form_urlencoded;

use super::error::ApiError;

/// A query string parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Text(String),
    Bool(bool),
    Int(i64),
    /// `(field, direction)` pairs, encoded as `sort[field]=DIRECTION`.
    Sort(Vec<(String, String)>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

/// Builds a form-encoded query string, one parameter at a time, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct QueryStringBuilder {
    pairs: Vec<(String, String)>,
}

impl QueryStringBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name=value`. `None` and blank strings are skipped.
    pub fn add<V: Into<QueryValue>>(
        &mut self,
        name: &str,
        value: Option<V>,
    ) -> Result<&mut Self, ApiError> {
        let Some(value) = value else {
            return Ok(self);
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidParameter("parameter name is empty".into()));
        }

        match value.into() {
            QueryValue::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(self);
                }
                let text = match name {
                    "fields" | "group" => text.split_whitespace().collect::<String>(),
                    "filter" => text.split_whitespace().collect::<Vec<_>>().join(" "),
                    _ => text.to_string(),
                };
                self.encode(name, &text);
            }
            QueryValue::Bool(flag) => {
                self.encode(name, if flag { "true" } else { "false" });
            }
            QueryValue::Int(n) => {
                self.encode(name, &n.to_string());
            }
            QueryValue::Sort(pairs) => {
                for (field, direction) in pairs {
                    let direction = direction.trim().to_uppercase();
                    if direction != "ASC" && direction != "DESC" {
                        return Err(ApiError::InvalidParameter(format!(
                            "sort has invalid direction: '{direction}'"
                        )));
                    }
                    self.encode(&format!("{name}[{}]", field.trim()), &direction);
                }
            }
        }

        Ok(self)
    }

    fn encode(&mut self, name: &str, value: &str) {
        self.pairs.push((name.to_string(), value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn build(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish()
    }
}
