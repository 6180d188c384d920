//! Request contract for the REST surface.
//!
//! The contract is an OpenAPI-style document keyed by path template and
//! method. Only the `parameters` section is consulted: each operation lists
//! its path and query parameters with a small scalar/array schema.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use serde::Deserialize;
use thiserror::Error;

/// The contract shipped with the service
pub const DEFAULT_SPEC: &str = include_str!("openapi.yaml");

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unable to parse request schema: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("No schema for {method} {path}")]
    MissingOperation { method: Method, path: String },
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field_errors: HashMap<String, String>,
}

impl ValidationError {
    fn new(field_errors: HashMap<String, String>) -> Self {
        Self {
            message: "Request does not match the API schema".to_string(),
            field_errors,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpecDocument {
    paths: HashMap<String, HashMap<String, Operation>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterSchema {
    String {
        #[serde(rename = "minLength", default)]
        min_length: Option<usize>,
    },
    Integer,
    Number,
    Boolean,
    Array {
        items: Box<ParameterSchema>,
    },
}

impl ParameterSchema {
    fn check_scalar(&self, value: &str) -> Result<(), String> {
        match self {
            ParameterSchema::String { min_length } => match min_length {
                Some(min) if value.chars().count() < *min => {
                    Err(format!("Must be at least {} character(s)", min))
                }
                _ => Ok(()),
            },
            ParameterSchema::Integer => value
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| format!("Expected an integer, got '{}'", value)),
            ParameterSchema::Number => value
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("Expected a number, got '{}'", value)),
            ParameterSchema::Boolean => match value {
                "true" | "false" => Ok(()),
                _ => Err(format!("Expected a boolean, got '{}'", value)),
            },
            ParameterSchema::Array { .. } => Err("Nested arrays are not supported".to_string()),
        }
    }

    fn check(&self, values: &[String]) -> Result<(), String> {
        match self {
            ParameterSchema::Array { items } => values.iter().try_for_each(|v| items.check_scalar(v)),
            scalar => match values {
                [single] => scalar.check_scalar(single),
                _ => Err("Expected a single value".to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    pub schema: ParameterSchema,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Arguments that passed validation, available to handlers as a request extension
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    values: HashMap<String, Vec<String>>,
}

impl RequestArgs {
    /// Parse an `application/x-www-form-urlencoded` query string. Repeated keys accumulate.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(query) = query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                values.entry(key.into_owned()).or_default().push(value.into_owned());
            }
        }
        Self { values }
    }

    /// Last value given for `name`
    pub fn get_argument(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.last()).map(String::as_str)
    }

    /// Every value given for `name`, in request order
    pub fn get_arguments(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Operation {
    /// Check path and query parameters against this operation's declared parameters
    pub fn validate(
        &self,
        path_params: &HashMap<String, String>,
        query: Option<&str>,
    ) -> Result<RequestArgs, ValidationError> {
        let args = RequestArgs::from_query(query);
        let mut field_errors = HashMap::new();

        for param in &self.parameters {
            let result = match param.location {
                ParameterLocation::Path => match path_params.get(&param.name) {
                    Some(value) => param.schema.check(std::slice::from_ref(value)),
                    None => Err("This path segment is required".to_string()),
                },
                ParameterLocation::Query => match args.values.get(&param.name) {
                    Some(values) => param.schema.check(values),
                    None if param.required => Err("This argument is required".to_string()),
                    None => Ok(()),
                },
            };

            if let Err(reason) = result {
                field_errors.insert(param.name.clone(), reason);
            }
        }

        if field_errors.is_empty() {
            Ok(args)
        } else {
            Err(ValidationError::new(field_errors))
        }
    }
}

#[derive(Debug)]
pub struct RequestSchema {
    paths: HashMap<String, HashMap<String, Operation>>,
}

impl RequestSchema {
    pub fn from_yaml(text: &str) -> Result<Self, SchemaError> {
        let doc: SpecDocument = serde_yaml::from_str(text)?;
        Ok(Self { paths: doc.paths })
    }

    pub fn bundled() -> Result<Self, SchemaError> {
        Self::from_yaml(DEFAULT_SPEC)
    }

    /// Look up the contract for a path template such as `/mq-profiles/{mqid}`
    pub fn operation(&self, path: &str, method: &Method) -> Result<Arc<Operation>, SchemaError> {
        let key = method.as_str().to_ascii_lowercase();
        self.paths
            .get(path)
            .and_then(|ops| ops.get(&key))
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| SchemaError::MissingOperation {
                method: method.clone(),
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_op() -> Arc<Operation> {
        RequestSchema::bundled()
            .unwrap()
            .operation("/mq-profiles/public/activated", &Method::GET)
            .unwrap()
    }

    #[test]
    fn bundled_schema_has_both_operations() {
        let schema = RequestSchema::bundled().unwrap();
        let get = schema.operation("/mq-profiles/{mqid}", &Method::GET).unwrap();
        assert_eq!(get.operation_id.as_deref(), Some("getMqProfile"));
        assert!(schema.operation("/mq-profiles/{mqid}", &Method::DELETE).is_err());
        assert!(schema.operation("/mq-profiles", &Method::GET).is_err());
    }

    #[test]
    fn missing_required_argument_is_rejected() {
        let err = list_op().validate(&HashMap::new(), Some("projection=mqid")).unwrap_err();
        assert!(err.field_errors.contains_key("workflow_id"));
        assert!(!err.field_errors.contains_key("projection"));
    }

    #[test]
    fn empty_and_repeated_scalar_arguments_are_rejected() {
        let op = list_op();
        let err = op.validate(&HashMap::new(), Some("workflow_id=")).unwrap_err();
        assert!(err.field_errors.contains_key("workflow_id"));

        let err = op.validate(&HashMap::new(), Some("workflow_id=a&workflow_id=b")).unwrap_err();
        assert_eq!(err.field_errors["workflow_id"], "Expected a single value");
    }

    #[test]
    fn repeated_array_arguments_keep_order() {
        let args = list_op()
            .validate(&HashMap::new(), Some("workflow_id=wf%201&projection=mqid&projection=workflow_id"))
            .unwrap();
        assert_eq!(args.get_argument("workflow_id"), Some("wf 1"));
        assert_eq!(args.get_arguments("projection"), ["mqid", "workflow_id"]);
        assert!(args.get_arguments("missing").is_empty());
    }

    #[test]
    fn scalar_types_are_checked() {
        let yaml = r#"
paths:
  /things:
    get:
      parameters:
        - name: limit
          in: query
          schema: { type: integer }
        - name: deep
          in: query
          schema: { type: boolean }
"#;
        let op = RequestSchema::from_yaml(yaml).unwrap().operation("/things", &Method::GET).unwrap();
        assert!(op.validate(&HashMap::new(), Some("limit=10&deep=true")).is_ok());
        assert!(op.validate(&HashMap::new(), None).is_ok());
        let err = op.validate(&HashMap::new(), Some("limit=ten&deep=yes")).unwrap_err();
        assert_eq!(err.field_errors.len(), 2);
    }
}
