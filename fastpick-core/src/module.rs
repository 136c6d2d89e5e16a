//! Module Loader & Validator
//!
//! Reads a benchmark module description from disk and validates it once:
//! - `.json` files are parsed directly
//! - `.js`/`.cjs`/`.mjs` files are evaluated in a throwaway sandbox that
//!   provides `module`/`exports`, and the exported object is read back as JSON
//!
//! The result is an ordered, immutable [`BenchmarkModule`].

use crate::sandbox::{Sandbox, SandboxConfig};
use regex::Regex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Load and validation failures. All are fatal for a run.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// No path was supplied at all
    #[error("no module path provided")]
    MissingPath,

    /// The path does not exist
    #[error("module file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read
    #[error("failed to read module {}: {source}", .path.display())]
    Unreadable {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file could not be parsed or evaluated
    #[error("failed to parse module: {0}")]
    Parse(String),

    /// The description is not an object
    #[error("module must evaluate to an object, found {0}")]
    NotAnObject(&'static str),

    /// `implementations` is present but empty
    #[error("no implementations found")]
    NoImplementations,

    /// `implementations` is missing or not an object
    #[error("`implementations` must be an object mapping names to source code, found {0}")]
    InvalidImplementations(&'static str),

    /// One implementation is not a source string
    #[error("implementation '{name}' must be a source string, found {found}")]
    InvalidImplementation {
        /// Implementation name
        name: String,
        /// JSON type found instead
        found: &'static str,
    },

    /// `testData` is required but absent
    #[error("missing testData")]
    MissingTestData,

    /// `entryPointName` is required but absent
    #[error("missing entryPointName")]
    MissingEntryPoint,

    /// `entryPointName` is present but unusable
    #[error("entryPointName must be a non-empty string, found {0}")]
    InvalidEntryPoint(&'static str),

    /// A filter removed every implementation
    #[error("no implementations match the filter")]
    NoneMatchFilter,
}

/// Which optional fields a pipeline requires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadRequirements {
    /// Fail when `testData` is absent
    pub require_test_data: bool,
    /// Fail when `entryPointName` is absent
    pub require_entry_point: bool,
}

/// A validated module description.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkModule {
    /// `(name, source)` pairs in file order
    pub implementations: Vec<(String, String)>,
    /// Input handed to every candidate (`null` when absent)
    pub test_data: Value,
    /// Name of the function to benchmark in each snippet
    pub entry_point: Option<String>,
}

const JS_EXTENSIONS: &[&str] = &["js", "cjs", "mjs"];

impl BenchmarkModule {
    /// Load and validate the module at `path`.
    pub fn load(path: Option<&Path>, requirements: &LoadRequirements) -> Result<Self, ModuleError> {
        let path = path.ok_or(ModuleError::MissingPath)?;
        if !path.exists() {
            return Err(ModuleError::NotFound(path.to_path_buf()));
        }

        let text = std::fs::read_to_string(path).map_err(|source| ModuleError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let is_script = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| JS_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));

        let value = if is_script {
            evaluate_script(&text)?
        } else {
            serde_json::from_str(&text).map_err(|e| ModuleError::Parse(e.to_string()))?
        };

        let module = Self::from_value(value, requirements)?;
        tracing::debug!(
            path = %path.display(),
            implementations = module.implementations.len(),
            entry_point = ?module.entry_point,
            "loaded module"
        );
        Ok(module)
    }

    /// Validate an already-parsed description.
    pub fn from_value(value: Value, requirements: &LoadRequirements) -> Result<Self, ModuleError> {
        let mut root = match value {
            Value::Object(root) => root,
            other => return Err(ModuleError::NotAnObject(json_type_name(&other))),
        };

        let implementations = match root.remove("implementations") {
            Some(Value::Object(map)) => parse_implementations(map)?,
            Some(other) => return Err(ModuleError::InvalidImplementations(json_type_name(&other))),
            None => return Err(ModuleError::InvalidImplementations("nothing")),
        };

        let test_data = match root.remove("testData") {
            Some(data) => data,
            None if requirements.require_test_data => return Err(ModuleError::MissingTestData),
            None => Value::Null,
        };

        let entry_point = match root.remove("entryPointName") {
            Some(Value::String(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
            Some(other) if requirements.require_entry_point => {
                return Err(ModuleError::InvalidEntryPoint(json_type_name(&other)));
            }
            Some(other) => {
                tracing::warn!(found = json_type_name(&other), "ignoring unusable entryPointName");
                None
            }
            None if requirements.require_entry_point => return Err(ModuleError::MissingEntryPoint),
            None => None,
        };

        Ok(Self {
            implementations,
            test_data,
            entry_point,
        })
    }

    /// Keep only the implementations whose name satisfies `keep`.
    pub fn retain_implementations<F>(&mut self, mut keep: F) -> Result<(), ModuleError>
    where
        F: FnMut(&str) -> bool,
    {
        self.implementations.retain(|(name, _)| keep(name));
        if self.implementations.is_empty() {
            return Err(ModuleError::NoneMatchFilter);
        }
        Ok(())
    }

    /// Number of implementations
    pub fn len(&self) -> usize {
        self.implementations.len()
    }

    /// Always false for a validated module
    pub fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }

    /// Serialize back to the JSON description format.
    pub fn to_json(&self) -> Value {
        let implementations: Map<String, Value> = self
            .implementations
            .iter()
            .map(|(name, source)| (name.clone(), Value::String(source.clone())))
            .collect();

        let mut root = Map::new();
        root.insert("implementations".into(), Value::Object(implementations));
        root.insert("testData".into(), self.test_data.clone());
        if let Some(entry) = &self.entry_point {
            root.insert("entryPointName".into(), Value::String(entry.clone()));
        }
        Value::Object(root)
    }
}

fn parse_implementations(map: Map<String, Value>) -> Result<Vec<(String, String)>, ModuleError> {
    if map.is_empty() {
        return Err(ModuleError::NoImplementations);
    }
    map.into_iter()
        .map(|(name, source)| match source {
            Value::String(code) => Ok((name, code)),
            other => Err(ModuleError::InvalidImplementation {
                name,
                found: json_type_name(&other),
            }),
        })
        .collect()
}

/// JSON type name used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn evaluate_script(text: &str) -> Result<Value, ModuleError> {
    // Scripts cannot use `export`; treat a default export as module.exports
    let default_export = Regex::new(r"(?m)^\s*export\s+default\s+")
        .map_err(|e| ModuleError::Parse(e.to_string()))?;
    let body = default_export.replace_all(text, "module.exports = ");
    let literal = serde_json::to_string(body.as_ref()).map_err(|e| ModuleError::Parse(e.to_string()))?;

    // Functions are exported as their source text.
    let script = format!(
        "var module = {{ exports: {{}} }};\n\
         var exports = module.exports;\n\
         var __completion = (0, eval)({literal});\n\
         var __chosen = (module.exports !== exports || Object.keys(module.exports).length > 0)\n\
           ? module.exports : __completion;\n\
         JSON.stringify(__chosen, function (key, value) {{\n\
           return typeof value === 'function' ? value.toString() : value;\n\
         }});"
    );

    let sandbox = Sandbox::new(&SandboxConfig::default()).map_err(|e| ModuleError::Parse(e.to_string()))?;
    let json = sandbox
        .evaluate_to_string(&script)
        .map_err(|e| ModuleError::Parse(e.to_string()))?
        .ok_or(ModuleError::NotAnObject("undefined"))?;

    serde_json::from_str(&json).map_err(|e| ModuleError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn strict() -> LoadRequirements {
        LoadRequirements {
            require_test_data: true,
            require_entry_point: true,
        }
    }

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_json_keeps_order() {
        let file = write_temp(
            ".json",
            r#"{"implementations": {"Zeta": "function f(){}", "Alpha": "function f(){}", "Mid": "function f(){}"},
                "testData": [1, 2], "entryPointName": "f"}"#,
        );
        let module = BenchmarkModule::load(Some(file.path()), &strict()).unwrap();

        let names: Vec<_> = module.implementations.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(module.test_data, json!([1, 2]));
        assert_eq!(module.entry_point.as_deref(), Some("f"));
    }

    #[test]
    fn test_missing_path_and_file() {
        assert!(matches!(
            BenchmarkModule::load(None, &strict()),
            Err(ModuleError::MissingPath)
        ));
        let missing = Path::new("/definitely/not/here/module.json");
        assert!(matches!(
            BenchmarkModule::load(Some(missing), &strict()),
            Err(ModuleError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_implementations() {
        let err = BenchmarkModule::from_value(json!({"implementations": {}}), &Default::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "no implementations found");
    }

    #[test]
    fn test_mistyped_fields() {
        let reqs = LoadRequirements::default();
        assert!(matches!(
            BenchmarkModule::from_value(json!([1]), &reqs),
            Err(ModuleError::NotAnObject("array"))
        ));
        assert!(matches!(
            BenchmarkModule::from_value(json!({"implementations": ["a"]}), &reqs),
            Err(ModuleError::InvalidImplementations("array"))
        ));
        assert!(matches!(
            BenchmarkModule::from_value(json!({"testData": 1}), &reqs),
            Err(ModuleError::InvalidImplementations("nothing"))
        ));
        assert!(matches!(
            BenchmarkModule::from_value(json!({"implementations": {"A": 5}}), &reqs),
            Err(ModuleError::InvalidImplementation { found: "number", .. })
        ));
    }

    #[test]
    fn test_requirements() {
        let value = json!({"implementations": {"A": "function f(){}"}});
        let module = BenchmarkModule::from_value(value.clone(), &Default::default()).unwrap();
        assert_eq!(module.test_data, Value::Null);
        assert_eq!(module.entry_point, None);

        let needs_data = LoadRequirements {
            require_test_data: true,
            ..Default::default()
        };
        assert!(matches!(
            BenchmarkModule::from_value(value.clone(), &needs_data),
            Err(ModuleError::MissingTestData)
        ));

        let needs_entry = LoadRequirements {
            require_entry_point: true,
            ..Default::default()
        };
        assert!(matches!(
            BenchmarkModule::from_value(value, &needs_entry),
            Err(ModuleError::MissingEntryPoint)
        ));
        assert!(matches!(
            BenchmarkModule::from_value(
                json!({"implementations": {"A": "x"}, "entryPointName": 7}),
                &needs_entry
            ),
            Err(ModuleError::InvalidEntryPoint("number"))
        ));
    }

    #[test]
    fn test_filter_and_round_trip() {
        let mut module = BenchmarkModule::from_value(
            json!({"implementations": {"Original": "a", "Alt1": "b", "Alt2": "c"}, "testData": {"k": 1}, "entryPointName": "f"}),
            &strict(),
        )
        .unwrap();

        module.retain_implementations(|name| name.starts_with("Alt")).unwrap();
        assert_eq!(module.len(), 2);

        let reloaded = BenchmarkModule::from_value(module.to_json(), &strict()).unwrap();
        assert_eq!(reloaded, module);

        assert!(matches!(
            module.retain_implementations(|_| false),
            Err(ModuleError::NoneMatchFilter)
        ));
    }

    #[test]
    fn test_load_commonjs_module() {
        let file = write_temp(
            ".js",
            r#"
            module.exports = {
              implementations: {
                Original: "function sum(xs) { return xs.reduce((a, b) => a + b, 0); }",
                Loop: function sum(xs) { let t = 0; for (const x of xs) t += x; return t; },
              },
              testData: [1, 2, 3],
              entryPointName: "sum",
            };
            "#,
        );
        let module = BenchmarkModule::load(Some(file.path()), &strict()).unwrap();

        assert_eq!(module.len(), 2);
        assert!(module.implementations[1].1.starts_with("function sum(xs)"));
        assert_eq!(module.test_data, json!([1, 2, 3]));
    }

    #[test]
    fn test_load_default_export_and_exports_object() {
        let file = write_temp(
            ".mjs",
            "export default { implementations: { A: 'function f() {}' }, testData: null };",
        );
        let module = BenchmarkModule::load(Some(file.path()), &Default::default()).unwrap();
        assert_eq!(module.implementations[0].0, "A");

        let file = write_temp(".cjs", "exports.implementations = { B: 'function f() {}' };");
        let module = BenchmarkModule::load(Some(file.path()), &Default::default()).unwrap();
        assert_eq!(module.implementations[0].0, "B");
    }

    #[test]
    fn test_script_errors() {
        let file = write_temp(".js", "throw new Error('broken module');");
        let err = BenchmarkModule::load(Some(file.path()), &Default::default()).unwrap_err();
        assert!(matches!(&err, ModuleError::Parse(msg) if msg.contains("broken module")));

        let file = write_temp(".js", "42");
        assert!(matches!(
            BenchmarkModule::load(Some(file.path()), &Default::default()),
            Err(ModuleError::NotAnObject("number"))
        ));

        let file = write_temp(".json", "{not json");
        assert!(matches!(
            BenchmarkModule::load(Some(file.path()), &Default::default()),
            Err(ModuleError::Parse(_))
        ));
    }
}
