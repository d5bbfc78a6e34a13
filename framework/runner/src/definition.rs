use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use stampede_core::prelude::{ConfigError, HttpMethod, HttpRequest};

use crate::check::Predicate;
use crate::config::parse_duration;
use crate::pacing::{next_delay, validate_range};
use crate::template::{JsonTemplate, Template, Variables, BUILTIN_VARS};

/// A request as written in a scenario file, before templates are parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestDefinition {
    /// The label that latencies are reported under. Defaults to `<METHOD> <path>`.
    pub name: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// A raw body
    pub body: Option<String>,
    /// A JSON body. String values may contain placeholders.
    pub json: Option<serde_json::Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestDefinition {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            name: None,
            method: method.to_string(),
            path: path.to_string(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            json: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn with_json(mut self, json: serde_json::Value) -> Self {
        self.json = Some(json);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckDefinition {
    pub name: String,
    pub predicate: Predicate,
}

/// Think-time in seconds. If only one bound is given the delay is fixed.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaceDefinition {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDefinition {
    Request(RequestDefinition),
    Check(CheckDefinition),
    Pace(PaceDefinition),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Seconds(f64),
    Text(String),
}

impl DurationValue {
    fn to_duration(&self) -> Result<Duration, ConfigError> {
        match self {
            DurationValue::Seconds(seconds) => parse_duration(&seconds.to_string()),
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}

/// The on-disk layout of a scenario file.
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    name: String,
    vus: Option<usize>,
    duration: Option<DurationValue>,
    #[serde(default)]
    vars: HashMap<String, String>,
    #[serde(default)]
    steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyTemplate {
    Text(Template),
    Json(JsonTemplate),
}

#[derive(Debug, Clone)]
pub struct RequestStep {
    pub label: String,
    pub method: HttpMethod,
    pub path: Template,
    pub query: Vec<(String, Template)>,
    pub headers: Vec<(String, Template)>,
    pub body: Option<BodyTemplate>,
}

impl RequestStep {
    fn templates(&self) -> Vec<&Template> {
        let mut templates = vec![&self.path];
        templates.extend(self.query.iter().map(|(_, t)| t));
        templates.extend(self.headers.iter().map(|(_, t)| t));
        match &self.body {
            Some(BodyTemplate::Text(t)) => templates.push(t),
            Some(BodyTemplate::Json(json)) => templates.extend(json.templates()),
            None => {}
        }
        templates
    }

    /// Render the request for one virtual user. Paths are appended to the base URL unless they
    /// are already absolute URLs.
    pub fn render(&self, base_url: &str, variables: &Variables) -> HttpRequest {
        let path = self.path.render(variables);
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path
        } else if path.starts_with('/') {
            format!("{}{}", base_url.trim_end_matches('/'), path)
        } else {
            format!("{}/{}", base_url.trim_end_matches('/'), path)
        };

        let mut request = HttpRequest::new(self.method, url);
        request.query = render_pairs(&self.query, variables);
        request.headers = render_pairs(&self.headers, variables);
        request.body = match &self.body {
            Some(BodyTemplate::Text(t)) => Some(t.render(variables)),
            Some(BodyTemplate::Json(json)) => {
                if request.header("content-type").is_none() {
                    request
                        .headers
                        .push(("Content-Type".to_string(), "application/json".to_string()));
                }
                Some(json.render(variables).to_string())
            }
            None => None,
        };

        request
    }
}

fn render_pairs(pairs: &[(String, Template)], variables: &Variables) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(name, template)| (name.clone(), template.render(variables)))
        .collect()
}

#[derive(Debug, Clone)]
pub struct CheckStep {
    pub name: String,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaceStep {
    pub min: Duration,
    pub max: Duration,
}

impl PaceStep {
    pub fn delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        next_delay(self.min, self.max, rng).unwrap_or_else(|e| {
            log::warn!("Using minimum pace delay: {e}");
            self.min
        })
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    Request(RequestStep),
    Check(CheckStep),
    Pace(PaceStep),
}

/// A validated scenario. Immutable once built and shared by every virtual user.
#[derive(Debug, Clone)]
pub struct ScenarioDefinition {
    pub name: String,
    pub default_vus: Option<usize>,
    pub default_duration: Option<Duration>,
    pub vars: HashMap<String, String>,
    pub steps: Vec<Step>,
}

impl ScenarioDefinition {
    /// Make sure every placeholder can be filled from the built in variables, the scenario's
    /// variables or the given overrides.
    pub fn validate_variables(&self, overrides: &HashMap<String, String>) -> Result<(), ConfigError> {
        let known = BUILTIN_VARS
            .iter()
            .copied()
            .chain(self.vars.keys().map(String::as_str))
            .chain(overrides.keys().map(String::as_str))
            .collect::<HashSet<_>>();

        for step in &self.steps {
            let Step::Request(request) = step else {
                continue;
            };
            for template in request.templates() {
                if let Some(unknown) = template.variables().find(|name| !known.contains(name)) {
                    return Err(ConfigError::UnknownVariable {
                        name: unknown.to_string(),
                        template: template.source().to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn request_labels(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            Step::Request(request) => Some(request.label.as_str()),
            _ => None,
        })
    }
}

/// The builder for a scenario definition.
///
/// Scenarios can be assembled in code or loaded from a TOML or YAML file with
/// [ScenarioDefinitionBuilder::from_file]. Either way, [ScenarioDefinitionBuilder::build] checks
/// every step before a run can start.
#[derive(Debug, Clone)]
pub struct ScenarioDefinitionBuilder {
    /// The name of the scenario, used in reports.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")` for scenarios defined in code.
    name: String,
    default_vus: Option<usize>,
    default_duration: Option<Duration>,
    vars: HashMap<String, String>,
    steps: Vec<StepDefinition>,
}

impl ScenarioDefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default_vus: None,
            default_duration: None,
            vars: HashMap::new(),
            steps: Vec::new(),
        }
    }

    /// Load a scenario from a `.toml`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadScenario {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |reason: String| ConfigError::ParseScenario {
            path: path.to_path_buf(),
            reason,
        };
        let file: ScenarioFile = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?
            }
            _ => return Err(ConfigError::UnsupportedScenarioFormat(path.to_path_buf())),
        };

        Self::from_scenario_file(file)
    }

    /// Parse a scenario from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ScenarioFile = toml::from_str(content).map_err(|e| ConfigError::ParseScenario {
            path: Default::default(),
            reason: e.to_string(),
        })?;

        Self::from_scenario_file(file)
    }

    fn from_scenario_file(file: ScenarioFile) -> Result<Self, ConfigError> {
        Ok(Self {
            name: file.name,
            default_vus: file.vus,
            default_duration: file.duration.map(|d| d.to_duration()).transpose()?,
            vars: file.vars,
            steps: file.steps,
        })
    }

    /// Set the default number of virtual users, used when the run configuration doesn't set one.
    pub fn with_default_vus(mut self, vus: usize) -> Self {
        self.default_vus = Some(vus);
        self
    }

    /// Set the default run duration, used when the run configuration doesn't set one.
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = Some(duration);
        self
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn use_request(mut self, request: RequestDefinition) -> Self {
        self.steps.push(StepDefinition::Request(request));
        self
    }

    pub fn use_check(mut self, name: &str, predicate: Predicate) -> Self {
        self.steps.push(StepDefinition::Check(CheckDefinition {
            name: name.to_string(),
            predicate,
        }));
        self
    }

    /// Pause for a random delay between `min_s` and `max_s` seconds.
    pub fn use_pace(mut self, min_s: f64, max_s: f64) -> Self {
        self.steps.push(StepDefinition::Pace(PaceDefinition {
            min: Some(min_s),
            max: Some(max_s),
        }));
        self
    }

    /// Pause for a fixed number of seconds.
    pub fn use_fixed_pace(self, seconds: f64) -> Self {
        self.use_pace(seconds, seconds)
    }

    pub fn build(self) -> Result<ScenarioDefinition, ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::EmptyScenario(self.name));
        }

        let steps = self
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| build_step(index, step))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScenarioDefinition {
            name: self.name,
            default_vus: self.default_vus,
            default_duration: self.default_duration,
            vars: self.vars,
            steps,
        })
    }
}

fn build_step(index: usize, step: StepDefinition) -> Result<Step, ConfigError> {
    match step {
        StepDefinition::Request(request) => build_request(index, request).map(Step::Request),
        StepDefinition::Check(check) => {
            if check.name.trim().is_empty() {
                return Err(ConfigError::EmptyName { step: index });
            }
            Ok(Step::Check(CheckStep {
                name: check.name,
                predicate: check.predicate,
            }))
        }
        StepDefinition::Pace(pace) => build_pace(index, pace).map(Step::Pace),
    }
}

fn build_request(index: usize, request: RequestDefinition) -> Result<RequestStep, ConfigError> {
    let method: HttpMethod = request.method.parse()?;

    let body = match (request.body, request.json) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingBody { step: index }),
        (Some(body), None) => Some(BodyTemplate::Text(Template::parse(&body)?)),
        (None, Some(json)) => Some(BodyTemplate::Json(JsonTemplate::parse(&json)?)),
        (None, None) => None,
    };

    let label = match request.name {
        Some(name) if name.trim().is_empty() => return Err(ConfigError::EmptyName { step: index }),
        Some(name) => name,
        None => format!("{} {}", method, request.path),
    };

    Ok(RequestStep {
        label,
        method,
        path: Template::parse(&request.path)?,
        query: parse_pairs(request.query)?,
        headers: parse_pairs(request.headers)?,
        body,
    })
}

fn parse_pairs(pairs: BTreeMap<String, String>) -> Result<Vec<(String, Template)>, ConfigError> {
    pairs
        .into_iter()
        .map(|(name, value)| Ok((name, Template::parse(&value)?)))
        .collect()
}

fn build_pace(index: usize, pace: PaceDefinition) -> Result<PaceStep, ConfigError> {
    let to_duration = |seconds: f64| {
        Duration::try_from_secs_f64(seconds).map_err(|e| ConfigError::InvalidPace {
            step: index,
            reason: format!("{seconds} is not a valid number of seconds: {e}"),
        })
    };

    let (min, max) = match (pace.min, pace.max) {
        (Some(min), Some(max)) => (to_duration(min)?, to_duration(max)?),
        (Some(fixed), None) | (None, Some(fixed)) => {
            let fixed = to_duration(fixed)?;
            (fixed, fixed)
        }
        (None, None) => {
            return Err(ConfigError::InvalidPace {
                step: index,
                reason: "at least one of `min` or `max` must be set".to_string(),
            })
        }
    };
    validate_range(min, max)?;

    Ok(PaceStep { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    const CHAT_SCENARIO: &str = r#"
name = "chat"
vus = 5
duration = "30s"

[vars]
message = "hello"

[[steps]]
type = "request"
name = "chat"
method = "post"
path = "/chat"
headers = { "X-Vu" = "{{vu}}" }
json = { message = "{{message}}" }

[[steps]]
type = "check"
name = "chat status 2xx"
predicate = { status_range = { min = 200, max = 300 } }

[[steps]]
type = "pace"
min = 0.5
max = 1.5

[[steps]]
type = "request"
path = "/summary"
query = { class = "5", unit = "air" }

[[steps]]
type = "pace"
min = 1
"#;

    #[test]
    fn test_should_load_scenario_from_toml() {
        let definition = ScenarioDefinitionBuilder::from_toml_str(CHAT_SCENARIO)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!("chat", definition.name);
        assert_eq!(Some(5), definition.default_vus);
        assert_eq!(Some(Duration::from_secs(30)), definition.default_duration);
        assert_eq!(5, definition.steps.len());
        assert_eq!(
            vec!["chat", "GET /summary"],
            definition.request_labels().collect::<Vec<_>>()
        );
        assert!(matches!(
            definition.steps[2],
            Step::Pace(PaceStep { min, max }) if min == Duration::from_millis(500) && max == Duration::from_millis(1500)
        ));
        assert!(matches!(
            definition.steps[4],
            Step::Pace(PaceStep { min, max }) if min == Duration::from_secs(1) && max == min
        ));
        definition.validate_variables(&HashMap::new()).unwrap();
    }

    #[test]
    fn test_should_render_request_from_templates() {
        let definition = ScenarioDefinitionBuilder::from_toml_str(CHAT_SCENARIO)
            .unwrap()
            .build()
            .unwrap();
        let Step::Request(request) = &definition.steps[0] else {
            panic!("expected a request step");
        };

        let mut variables = Variables::new(Arc::new(definition.vars.clone()));
        variables.set("vu", "7".to_string());
        let http_request = request.render("http://localhost:8080/", &variables);

        assert_eq!(HttpMethod::Post, http_request.method);
        assert_eq!("http://localhost:8080/chat", http_request.url);
        assert_eq!(Some("7"), http_request.header("x-vu"));
        assert_eq!(Some("application/json"), http_request.header("content-type"));
        assert_eq!(
            serde_json::json!({ "message": "hello" }),
            serde_json::from_str::<serde_json::Value>(http_request.body.as_deref().unwrap())
                .unwrap()
        );
    }

    #[test]
    fn test_should_load_scenario_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
name: yaml-chat
steps:
  - type: request
    method: GET
    path: /health
  - type: check
    name: healthy
    predicate:
      status_in: [200, 204]
"#
        )
        .unwrap();

        let definition = ScenarioDefinitionBuilder::from_file(file.path())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!("yaml-chat", definition.name);
        assert_eq!(2, definition.steps.len());
    }

    #[test]
    fn test_should_reject_unsupported_file_extension() {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();

        assert!(matches!(
            ScenarioDefinitionBuilder::from_file(file.path()),
            Err(ConfigError::UnsupportedScenarioFormat(_))
        ));
    }

    #[test]
    fn test_should_reject_inverted_pace_at_load_time() {
        let result = ScenarioDefinitionBuilder::new("inverted")
            .use_request(RequestDefinition::new("GET", "/"))
            .use_pace(2.0, 1.0)
            .build();

        assert!(matches!(result, Err(ConfigError::PaceRangeInverted { .. })));
    }

    #[test]
    fn test_should_reject_negative_pace() {
        let result = ScenarioDefinitionBuilder::new("negative")
            .use_fixed_pace(-1.0)
            .build();

        assert!(matches!(result, Err(ConfigError::InvalidPace { step: 0, .. })));
    }

    #[test]
    fn test_should_reject_pace_without_bounds() {
        let toml = r#"
name = "no-bounds"

[[steps]]
type = "pace"
"#;
        let result = ScenarioDefinitionBuilder::from_toml_str(toml)
            .unwrap()
            .build();

        assert!(matches!(result, Err(ConfigError::InvalidPace { .. })));
    }

    #[test]
    fn test_should_reject_conflicting_bodies() {
        let result = ScenarioDefinitionBuilder::new("bodies")
            .use_request(
                RequestDefinition::new("POST", "/chat")
                    .with_body("raw")
                    .with_json(serde_json::json!({})),
            )
            .build();

        assert!(matches!(result, Err(ConfigError::ConflictingBody { step: 0 })));
    }

    #[test]
    fn test_should_reject_unknown_method() {
        let result = ScenarioDefinitionBuilder::new("method")
            .use_request(RequestDefinition::new("FETCH", "/chat"))
            .build();

        assert!(matches!(result, Err(ConfigError::InvalidMethod(_))));
    }

    #[test]
    fn test_should_reject_empty_scenario() {
        assert!(matches!(
            ScenarioDefinitionBuilder::new("empty").build(),
            Err(ConfigError::EmptyScenario(_))
        ));
    }

    #[test]
    fn test_should_find_unknown_variables() {
        let definition = ScenarioDefinitionBuilder::new("vars")
            .use_request(RequestDefinition::new("GET", "/users/{{user}}"))
            .build()
            .unwrap();

        assert!(matches!(
            definition.validate_variables(&HashMap::new()),
            Err(ConfigError::UnknownVariable { ref name, .. }) if name == "user"
        ));

        let overrides = HashMap::from([("user".to_string(), "alice".to_string())]);
        definition.validate_variables(&overrides).unwrap();
    }
}
