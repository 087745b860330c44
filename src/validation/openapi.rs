//! Structural OpenAPI 3.0/3.1 validator
//!
//! Catches the mistakes an LLM typically makes when writing a definition:
//! broken YAML, missing required fields, undeclared path parameters,
//! duplicate operation ids and dangling local references.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use serde_yaml::{Mapping, Value};

use crate::document::SpecDocument;
use crate::error::Result;
use crate::validation::traits::{DocumentValidator, ValidationOutcome};

const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

const PATH_ITEM_FIELDS: [&str; 5] = ["summary", "description", "servers", "parameters", "$ref"];

const PARAMETER_LOCATIONS: [&str; 4] = ["query", "header", "path", "cookie"];

/// Validator that checks a YAML document against the OpenAPI 3.x structure
#[derive(Debug, Clone, Default)]
pub struct OpenApiValidator;

impl OpenApiValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a document synchronously. Pure: equal input gives equal output.
    pub fn check(&self, text: &str) -> ValidationOutcome {
        let root: Value = match serde_yaml::from_str(text) {
            Ok(root) => root,
            Err(e) => return ValidationOutcome::invalid(format!("It is NOT a valid YAML string: {}", e)),
        };

        let errors = Checker::new(&root).run();
        if errors.is_empty() {
            ValidationOutcome::Valid
        } else {
            ValidationOutcome::invalid(format!(
                "It is NOT a valid OpenAPI Specification: {}",
                errors.join("; ")
            ))
        }
    }
}

#[async_trait]
impl DocumentValidator for OpenApiValidator {
    async fn validate(&self, document: &SpecDocument) -> Result<ValidationOutcome> {
        Ok(self.check(document.as_str()))
    }

    fn description(&self) -> &str {
        "openapi structural validator"
    }
}

struct Checker<'a> {
    root: &'a Value,
    errors: Vec<String>,
    operation_ids: HashSet<String>,
}

impl<'a> Checker<'a> {
    fn new(root: &'a Value) -> Self {
        Self {
            root,
            errors: Vec::new(),
            operation_ids: HashSet::new(),
        }
    }

    fn run(mut self) -> Vec<String> {
        let document = self.root;
        let Some(root) = document.as_mapping() else {
            self.errors.push("document root must be a mapping".to_string());
            return self.errors;
        };

        let minor = self.check_version(root);
        self.check_info(root);
        self.check_paths(root, minor);
        self.check_refs();
        self.errors
    }

    fn check_version(&mut self, root: &Mapping) -> Option<u64> {
        match root.get("openapi") {
            None => {
                self.errors.push("missing required field 'openapi'".to_string());
                None
            }
            Some(Value::String(version)) => {
                let parsed = parse_version(version);
                if parsed.is_none() {
                    self.errors.push(format!(
                        "unsupported openapi version '{}', expected 3.0.x or 3.1.x",
                        version
                    ));
                }
                parsed
            }
            Some(_) => {
                self.errors.push("'openapi' must be a string".to_string());
                None
            }
        }
    }

    fn check_info(&mut self, root: &Mapping) {
        let info = match root.get("info") {
            None => {
                self.errors.push("missing required field 'info'".to_string());
                return;
            }
            Some(Value::Mapping(info)) => info,
            Some(_) => {
                self.errors.push("'info' must be a mapping".to_string());
                return;
            }
        };

        for field in ["title", "version"] {
            match info.get(field) {
                None => self.errors.push(format!("missing required field 'info.{}'", field)),
                Some(Value::String(_)) => {}
                Some(_) => self.errors.push(format!("'info.{}' must be a string", field)),
            }
        }
    }

    fn check_paths(&mut self, root: &Mapping, minor: Option<u64>) {
        let paths = match root.get("paths") {
            None => {
                if minor == Some(1) {
                    if !root.contains_key("components") && !root.contains_key("webhooks") {
                        self.errors
                            .push("one of 'paths', 'components' or 'webhooks' is required".to_string());
                    }
                } else {
                    self.errors.push("missing required field 'paths'".to_string());
                }
                return;
            }
            Some(Value::Mapping(paths)) => paths,
            Some(_) => {
                self.errors.push("'paths' must be a mapping".to_string());
                return;
            }
        };

        for (key, item) in paths {
            let Some(path) = key.as_str() else {
                self.errors.push(format!("path key {:?} must be a string", key));
                continue;
            };
            if path.starts_with("x-") {
                continue;
            }
            if !path.starts_with('/') {
                self.errors.push(format!("path '{}' must begin with '/'", path));
            }
            match item {
                Value::Mapping(item) => self.check_path_item(path, item),
                _ => self.errors.push(format!("path '{}' must be a mapping", path)),
            }
        }
    }

    fn check_path_item(&mut self, path: &str, item: &Mapping) {
        let shared = self.check_parameters(item.get("parameters"), path);
        let templated = template_names(path);

        for (key, value) in item {
            let Some(key) = key.as_str() else {
                self.errors.push(format!("path '{}' has a non-string field {:?}", path, key));
                continue;
            };
            if HTTP_METHODS.contains(&key) {
                self.check_operation(path, key, value, &shared, &templated);
            } else if !PATH_ITEM_FIELDS.contains(&key) && !key.starts_with("x-") {
                self.errors.push(format!("unexpected field '{}' in path '{}'", key, path));
            }
        }
    }

    fn check_operation(
        &mut self,
        path: &str,
        method: &str,
        value: &Value,
        shared: &HashSet<String>,
        templated: &[String],
    ) {
        let label = format!("{} {}", method.to_uppercase(), path);
        let Some(operation) = value.as_mapping() else {
            self.errors.push(format!("{}: operation must be a mapping", label));
            return;
        };

        match operation.get("operationId") {
            Some(Value::String(id)) => {
                if !self.operation_ids.insert(id.clone()) {
                    self.errors.push(format!("duplicate operationId '{}'", id));
                }
            }
            Some(_) => self.errors.push(format!("{}: 'operationId' must be a string", label)),
            None => {}
        }

        let own = self.check_parameters(operation.get("parameters"), &label);
        for name in templated {
            if !shared.contains(name) && !own.contains(name) {
                self.errors.push(format!(
                    "{}: path parameter '{}' is not declared",
                    label, name
                ));
            }
        }

        match operation.get("responses") {
            None => self.errors.push(format!("{}: missing required field 'responses'", label)),
            Some(Value::Mapping(responses)) if responses.is_empty() => {
                self.errors.push(format!("{}: 'responses' must define at least one response", label));
            }
            Some(Value::Mapping(responses)) => self.check_responses(&label, responses),
            Some(_) => self.errors.push(format!("{}: 'responses' must be a mapping", label)),
        }
    }

    fn check_responses(&mut self, label: &str, responses: &Mapping) {
        for (key, response) in responses {
            let Some(code) = response_key(key) else {
                if !key.as_str().is_some_and(|k| k.starts_with("x-")) {
                    self.errors.push(format!("{}: invalid response code {:?}", label, key));
                }
                continue;
            };
            match response {
                Value::Mapping(response) if response.contains_key("$ref") => {}
                Value::Mapping(response) => {
                    if !matches!(response.get("description"), Some(Value::String(_))) {
                        self.errors.push(format!(
                            "{}: response {} is missing required field 'description'",
                            label, code
                        ));
                    }
                }
                _ => self.errors.push(format!("{}: response {} must be a mapping", label, code)),
            }
        }
    }

    /// Validate a parameter list and return the names of its path parameters
    fn check_parameters(&mut self, value: Option<&Value>, label: &str) -> HashSet<String> {
        let mut path_params = HashSet::new();
        let params = match value {
            None => return path_params,
            Some(Value::Sequence(params)) => params,
            Some(_) => {
                self.errors.push(format!("{}: 'parameters' must be a list", label));
                return path_params;
            }
        };

        for param in params {
            // Dangling references are reported once by check_refs
            let Some(param) = resolve_local(self.root, param) else {
                continue;
            };
            let Some(param) = param.as_mapping() else {
                self.errors.push(format!("{}: parameter must be a mapping", label));
                continue;
            };

            let name = match param.get("name") {
                Some(Value::String(name)) => name.clone(),
                _ => {
                    self.errors.push(format!("{}: parameter is missing required field 'name'", label));
                    continue;
                }
            };

            match param.get("in").and_then(Value::as_str) {
                Some(location) if PARAMETER_LOCATIONS.contains(&location) => {
                    if location == "path" {
                        if param.get("required").and_then(Value::as_bool) != Some(true) {
                            self.errors.push(format!(
                                "{}: path parameter '{}' must set 'required: true'",
                                label, name
                            ));
                        }
                        path_params.insert(name);
                    }
                }
                Some(location) => self.errors.push(format!(
                    "{}: parameter '{}' has invalid location '{}'",
                    label, name, location
                )),
                None => self.errors.push(format!(
                    "{}: parameter '{}' is missing required field 'in'",
                    label, name
                )),
            }
        }

        path_params
    }

    fn check_refs(&mut self) {
        let mut refs = BTreeSet::new();
        collect_refs(self.root, &mut refs);
        for reference in refs {
            if resolve_pointer(self.root, &reference).is_none() {
                self.errors.push(format!("unresolvable reference '{}'", reference));
            }
        }
    }
}

/// Parse "3.0.x"/"3.1.x" and return the minor version
fn parse_version(version: &str) -> Option<u64> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    let numbers: Vec<u64> = parts.iter().map(|p| p.parse().ok()).collect::<Option<_>>()?;
    match (numbers[0], numbers[1]) {
        (3, minor @ (0 | 1)) => Some(minor),
        _ => None,
    }
}

/// Names inside `{...}` in a path template
fn template_names(path: &str) -> Vec<String> {
    path.split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name.to_string()))
        .collect()
}

fn response_key(key: &Value) -> Option<String> {
    match key {
        Value::String(code) => {
            if code == "default" {
                return Some(code.clone());
            }
            let bytes = code.as_bytes();
            let valid = bytes.len() == 3
                && (b'1'..=b'5').contains(&bytes[0])
                && (bytes[1..].iter().all(u8::is_ascii_digit) || &bytes[1..] == b"XX");
            valid.then(|| code.clone())
        }
        Value::Number(n) => n.as_u64().filter(|c| (100..=599).contains(c)).map(|c| c.to_string()),
        _ => None,
    }
}

fn collect_refs(value: &Value, refs: &mut BTreeSet<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                if key.as_str() == Some("$ref") {
                    if let Some(reference) = child.as_str().filter(|r| r.starts_with('#')) {
                        refs.insert(reference.to_string());
                    }
                } else {
                    collect_refs(child, refs);
                }
            }
        }
        Value::Sequence(items) => items.iter().for_each(|item| collect_refs(item, refs)),
        _ => {}
    }
}

/// Follow a local `$ref` if present; `None` when it dangles
fn resolve_local<'a>(root: &'a Value, value: &'a Value) -> Option<&'a Value> {
    match value.get("$ref").and_then(Value::as_str) {
        Some(reference) if reference.starts_with('#') => resolve_pointer(root, reference),
        _ => Some(value),
    }
}

/// Resolve a `#/a/b` JSON pointer against the document root
fn resolve_pointer<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(root);
    }
    let pointer = pointer.strip_prefix('/')?;

    let mut current = root;
    for raw in pointer.split('/') {
        let token = raw.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Mapping(map) => map.get(token.as_str())?,
            Value::Sequence(items) => items.get(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
