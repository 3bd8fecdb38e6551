use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Shortfall, TrackerError};

// ============================================================================
// Requests
// ============================================================================
//
// Fields arrive as loose JSON values: clients send levels and counts both as
// numbers and as numeric strings.

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLevelRequest {
    pub module: Option<Value>,
    pub level: Option<Value>,
}

impl UpdateLevelRequest {
    /// (module name, target level)
    pub fn parse(&self) -> Result<(String, i64), TrackerError> {
        let module = required(&self.module, "module", "level")?;
        let level = required(&self.level, "module", "level")?;
        Ok((text(module, "module")?, integer(level, "level")?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateHaveRequest {
    pub item: Option<Value>,
    pub have: Option<Value>,
}

impl UpdateHaveRequest {
    /// (material name, quantity)
    pub fn parse(&self) -> Result<(String, i64), TrackerError> {
        let item = required(&self.item, "item", "have")?;
        let have = required(&self.have, "item", "have")?;
        Ok((text(item, "item")?, integer(have, "have")?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleQuestRequest {
    pub quest_id: Option<Value>,
    pub completed: Option<Value>,
}

impl ToggleQuestRequest {
    /// (quest id, completed flag)
    pub fn parse(&self) -> Result<(i64, bool), TrackerError> {
        let quest_id = required(&self.quest_id, "quest_id", "completed")?;
        let completed = required(&self.completed, "quest_id", "completed")?;
        Ok((integer(quest_id, "quest_id")?, flag(completed, "completed")?))
    }
}

fn required<'a>(
    value: &'a Option<Value>,
    first: &str,
    second: &str,
) -> Result<&'a Value, TrackerError> {
    match value {
        Some(v) if !v.is_null() => Ok(v),
        _ => Err(TrackerError::invalid(format!(
            "Missing '{}' or '{}' in request",
            first, second
        ))),
    }
}

fn text(value: &Value, field: &str) -> Result<String, TrackerError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(TrackerError::invalid(format!("'{}' must be a string", field))),
    }
}

/// Integers, integral floats and numeric strings
fn integer(value: &Value, field: &str) -> Result<i64, TrackerError> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| is_integral(*f)).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| TrackerError::invalid(format!("'{}' must be an integer", field)))
}

/// Whole and exactly representable as an i64
fn is_integral(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn flag(value: &Value, field: &str) -> Result<bool, TrackerError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64().is_some() => Ok(n.as_i64() != Some(0)),
        _ => Err(TrackerError::invalid(format!("'{}' must be a boolean", field))),
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Outcome of a mutating request
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<Shortfall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> ActionResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            error: None,
            missing: Vec::new(),
            result: Some(result),
        }
    }

    pub fn failed(error: String, missing: Vec<Shortfall>) -> Self {
        Self {
            success: false,
            error: Some(error),
            missing,
            result: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn level_request(body: Value) -> UpdateLevelRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_level_accepts_numbers_and_numeric_strings() {
        assert_eq!(
            level_request(json!({"module": "Workshop", "level": 2})).parse().unwrap(),
            ("Workshop".to_string(), 2)
        );
        assert_eq!(
            level_request(json!({"module": "Workshop", "level": " 3 "})).parse().unwrap(),
            ("Workshop".to_string(), 3)
        );
        assert_eq!(
            level_request(json!({"module": "Workshop", "level": 4.0})).parse().unwrap().1,
            4
        );
    }

    #[test]
    fn test_level_rejects_garbage() {
        for body in [
            json!({"module": "Workshop"}),
            json!({"level": 1}),
            json!({"module": "Workshop", "level": null}),
            json!({"module": "Workshop", "level": "two"}),
            json!({"module": "Workshop", "level": 1.5}),
            json!({"module": "Workshop", "level": 1e300}),
            json!({"module": "Workshop", "level": -1e300}),
            json!({"module": ["Workshop"], "level": 1}),
        ] {
            assert!(
                matches!(level_request(body.clone()).parse(), Err(TrackerError::InvalidInput(_))),
                "accepted {}",
                body
            );
        }
    }

    #[test]
    fn test_toggle_quest_parsing() {
        let req: ToggleQuestRequest =
            serde_json::from_value(json!({"quest_id": "12", "completed": true})).unwrap();
        assert_eq!(req.parse().unwrap(), (12, true));

        let req: ToggleQuestRequest =
            serde_json::from_value(json!({"quest_id": 12, "completed": 0})).unwrap();
        assert_eq!(req.parse().unwrap(), (12, false));

        let req: ToggleQuestRequest =
            serde_json::from_value(json!({"quest_id": 12, "completed": "yes"})).unwrap();
        assert!(req.parse().is_err());
    }

    #[test]
    fn test_failed_response_shape() {
        let response: ActionResponse<()> = ActionResponse::failed(
            "not enough".to_string(),
            vec![Shortfall {
                material: "wood".to_string(),
                required: 15,
                available: 10,
            }],
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": false,
                "error": "not enough",
                "missing": [{"material": "wood", "required": 15, "available": 10}]
            })
        );
    }
}
