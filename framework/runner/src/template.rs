use std::collections::HashMap;
use std::sync::Arc;

use stampede_core::prelude::ConfigError;

pub const BASE_URL_VAR: &str = "base_url";
pub const VU_VAR: &str = "vu";
pub const ITERATION_VAR: &str = "iteration";

/// Variables that are always available to templates, in addition to the scenario's own.
pub const BUILTIN_VARS: [&str; 3] = [BASE_URL_VAR, VU_VAR, ITERATION_VAR];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A string with `{{name}}` placeholders, parsed once when the scenario is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or_else(|| ConfigError::UnterminatedPlaceholder(source.to_string()))?;
            let name = after_open[..close].trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyPlaceholder(source.to_string()));
            }
            segments.push(Segment::Variable(name.to_string()));
            rest = &after_open[close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of every variable this template refers to, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder. Placeholders without a value are left as written; scenarios
    /// are checked for unknown variables before a run starts.
    pub fn render(&self, variables: &Variables) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => match variables.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                },
            }
        }
        out
    }
}

/// A JSON document whose string values, but not keys, are templates.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonTemplate {
    Literal(serde_json::Value),
    String(Template),
    Array(Vec<JsonTemplate>),
    Object(Vec<(String, JsonTemplate)>),
}

impl JsonTemplate {
    pub fn parse(value: &serde_json::Value) -> Result<Self, ConfigError> {
        Ok(match value {
            serde_json::Value::String(s) => JsonTemplate::String(Template::parse(s)?),
            serde_json::Value::Array(items) => JsonTemplate::Array(
                items
                    .iter()
                    .map(JsonTemplate::parse)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(fields) => JsonTemplate::Object(
                fields
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), JsonTemplate::parse(v)?)))
                    .collect::<Result<_, ConfigError>>()?,
            ),
            other => JsonTemplate::Literal(other.clone()),
        })
    }

    pub fn templates(&self) -> Vec<&Template> {
        let mut out = Vec::new();
        self.collect_templates(&mut out);
        out
    }

    fn collect_templates<'a>(&'a self, out: &mut Vec<&'a Template>) {
        match self {
            JsonTemplate::Literal(_) => {}
            JsonTemplate::String(template) => out.push(template),
            JsonTemplate::Array(items) => items.iter().for_each(|item| item.collect_templates(out)),
            JsonTemplate::Object(fields) => fields
                .iter()
                .for_each(|(_, value)| value.collect_templates(out)),
        }
    }

    pub fn render(&self, variables: &Variables) -> serde_json::Value {
        match self {
            JsonTemplate::Literal(value) => value.clone(),
            JsonTemplate::String(template) => serde_json::Value::String(template.render(variables)),
            JsonTemplate::Array(items) => {
                serde_json::Value::Array(items.iter().map(|item| item.render(variables)).collect())
            }
            JsonTemplate::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.render(variables)))
                    .collect(),
            ),
        }
    }
}

/// Template values visible to one virtual user: values shared by the whole run, overlaid with
/// values private to this virtual user.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    shared: Arc<HashMap<String, String>>,
    local: HashMap<String, String>,
}

impl Variables {
    pub fn new(shared: Arc<HashMap<String, String>>) -> Self {
        Self {
            shared,
            local: HashMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: String) {
        self.local.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.local
            .get(name)
            .or_else(|| self.shared.get(name))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        Variables::new(Arc::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn test_should_render_placeholders() {
        let template = Template::parse("{{base_url}}/summary?unit={{ unit }}").unwrap();

        assert_eq!(vec!["base_url", "unit"], template.variables().collect::<Vec<_>>());
        assert_eq!(
            "http://localhost:8080/summary?unit=air",
            template.render(&vars(&[("base_url", "http://localhost:8080"), ("unit", "air")]))
        );
    }

    #[test]
    fn test_should_keep_plain_text() {
        let template = Template::parse("/chat").unwrap();

        assert_eq!(0, template.variables().count());
        assert_eq!("/chat", template.render(&Variables::default()));
    }

    #[test]
    fn test_should_reject_malformed_placeholders() {
        assert!(matches!(
            Template::parse("/chat/{{vu"),
            Err(ConfigError::UnterminatedPlaceholder(_))
        ));
        assert!(matches!(
            Template::parse("/chat/{{ }}"),
            Err(ConfigError::EmptyPlaceholder(_))
        ));
    }

    #[test]
    fn test_should_prefer_local_values() {
        let mut variables = vars(&[("vu", "shared")]);
        variables.set("vu", "3".to_string());

        assert_eq!(Some("3"), variables.get("vu"));
    }

    #[test]
    fn test_should_render_json_string_leaves() {
        let template = JsonTemplate::parse(&serde_json::json!({
            "message": "{{message}}",
            "metadata": { "vu": "{{vu}}", "attempt": 1 },
            "tags": ["{{message}}", true]
        }))
        .unwrap();

        assert_eq!(3, template.templates().len());

        let mut variables = vars(&[("message", "test")]);
        variables.set("vu", "0".to_string());
        assert_eq!(
            serde_json::json!({
                "message": "test",
                "metadata": { "vu": "0", "attempt": 1 },
                "tags": ["test", true]
            }),
            template.render(&variables)
        );
    }
}
