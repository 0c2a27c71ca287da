use crate::config::ConfigSnapshot;
use crate::utils::error::{CharmError, Result};
use regex::Regex;
use std::path::PathBuf;

pub const CONFIG_TEMPLATE: &str = "errbot_config.py.j2";
pub const UNIT_TEMPLATE: &str = "errbot.service.j2";
pub const PLUGINS_CONFIG_TEMPLATE: &str = "errbot_plugins_config.py.j2";
pub const PERU_TEMPLATE: &str = "errbot_peru.yaml.j2";

const EMBEDDED: [(&str, &str); 4] = [
    (CONFIG_TEMPLATE, include_str!("../../templates/errbot_config.py.j2")),
    (UNIT_TEMPLATE, include_str!("../../templates/errbot.service.j2")),
    (
        PLUGINS_CONFIG_TEMPLATE,
        include_str!("../../templates/errbot_plugins_config.py.j2"),
    ),
    (PERU_TEMPLATE, include_str!("../../templates/errbot_peru.yaml.j2")),
];

/// Template lookup: a file in the override directory wins over the built-in copy.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    override_dir: Option<PathBuf>,
}

impl Templates {
    pub fn embedded() -> Self {
        Self { override_dir: None }
    }

    pub fn with_overrides(dir: impl Into<PathBuf>) -> Self {
        Self {
            override_dir: Some(dir.into()),
        }
    }

    pub fn source(&self, name: &str) -> Result<String> {
        if let Some(dir) = &self.override_dir {
            let candidate = dir.join(name);
            if candidate.is_file() {
                tracing::debug!("Using template override {}", candidate.display());
                return Ok(std::fs::read_to_string(candidate)?);
            }
        }

        EMBEDDED
            .iter()
            .find(|(embedded, _)| *embedded == name)
            .map(|(_, body)| body.to_string())
            .ok_or_else(|| CharmError::TemplateError {
                template: name.to_string(),
                message: "no such template".to_string(),
            })
    }

    pub fn render(&self, name: &str, context: &ConfigSnapshot) -> Result<String> {
        render_str(name, &self.source(name)?, context)
    }
}

/// Substitutes `{{ key }}` placeholders from `context`.
pub fn render_str(name: &str, template: &str, context: &ConfigSnapshot) -> Result<String> {
    let re = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").map_err(|e| {
        CharmError::TemplateError {
            template: name.to_string(),
            message: e.to_string(),
        }
    })?;

    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for caps in re.captures_iter(template) {
        let (whole, key) = match (caps.get(0), caps.get(1)) {
            (Some(whole), Some(key)) => (whole, key.as_str()),
            _ => continue,
        };
        let value = context.get(key).ok_or_else(|| CharmError::TemplateError {
            template: name.to_string(),
            message: format!("unknown placeholder `{}`", key),
        })?;

        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&display_value(value));
        last = whole.end();
    }
    rendered.push_str(&template[last..]);

    Ok(rendered)
}

// Templates produce Python, so booleans follow Python spelling.
fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(true) => "True".to_string(),
        serde_json::Value::Bool(false) => "False".to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
