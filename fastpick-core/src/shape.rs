//! Argument shaping: turns a module's test data into positional arguments.

use serde_json::Value;

/// Key of the first argument in the two-argument shape
pub const INDEX_MAPPING_KEY: &str = "indexMapping";
/// Key of the second argument in the two-argument shape
pub const RESOLUTION_INFO_KEY: &str = "resolutionInfo";

/// Derive the positional argument list for the entry point.
///
/// An object carrying both `indexMapping` and `resolutionInfo` is spread
/// into those two arguments (other keys are ignored). Everything else,
/// arrays included, is passed as a single argument.
pub fn shape_arguments(test_data: &Value) -> Vec<Value> {
    if let Value::Object(map) = test_data {
        if let (Some(index_mapping), Some(resolution_info)) =
            (map.get(INDEX_MAPPING_KEY), map.get(RESOLUTION_INFO_KEY))
        {
            return vec![index_mapping.clone(), resolution_info.clone()];
        }
    }
    vec![test_data.clone()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_is_single_argument() {
        assert_eq!(shape_arguments(&json!([1, 2, 3])), vec![json!([1, 2, 3])]);
    }

    #[test]
    fn test_primitives_pass_through() {
        assert_eq!(shape_arguments(&json!(42)), vec![json!(42)]);
        assert_eq!(shape_arguments(&Value::Null), vec![Value::Null]);
        assert_eq!(shape_arguments(&json!("text")), vec![json!("text")]);
    }

    #[test]
    fn test_two_argument_shape() {
        let data = json!({"indexMapping": {"a": 1}, "resolutionInfo": {"b": 2}});
        assert_eq!(shape_arguments(&data), vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn test_two_argument_shape_ignores_extra_keys() {
        let data = json!({"indexMapping": [], "resolutionInfo": null, "extra": true});
        assert_eq!(shape_arguments(&data), vec![json!([]), Value::Null]);
    }

    #[test]
    fn test_partial_shape_is_single_argument() {
        let data = json!({"indexMapping": {"a": 1}});
        assert_eq!(shape_arguments(&data), vec![data.clone()]);
    }
}
