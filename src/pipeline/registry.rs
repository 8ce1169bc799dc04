//! Directive whitelist
//!
//! The set of recognized directive names and their argument shapes is
//! policy, so it lives in data: a [`DirectiveRegistry`] can be built in code,
//! loaded from YAML and merged over the built-in table.

use super::options::{Directive, DirectiveSection};
use super::steps::ArgValue;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Accepted argument shape of one directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DirectiveSpec {
    /// Directive name
    pub name: String,

    /// Minimum number of positional arguments
    #[serde(default)]
    pub min_positional: usize,

    /// Maximum number of positional arguments
    #[serde(default)]
    pub max_positional: usize,

    /// Keywords that must be present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Keywords that may be present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional: Vec<String>,

    /// Call that wraps the keyword arguments in the script,
    /// e.g. `logRotator` for `buildDiscarder`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<String>,
}

impl DirectiveSpec {
    /// A directive without arguments
    #[must_use]
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_positional: 0,
            max_positional: 0,
            required: Vec::new(),
            optional: Vec::new(),
            wrap: None,
        }
    }

    /// Sets the accepted positional arity
    #[must_use]
    pub fn positional(mut self, min: usize, max: usize) -> Self {
        self.min_positional = min;
        self.max_positional = max;
        self
    }

    /// Adds required keywords
    #[must_use]
    pub fn required(mut self, keywords: &[&str]) -> Self {
        self.required.extend(keywords.iter().map(ToString::to_string));
        self
    }

    /// Adds optional keywords
    #[must_use]
    pub fn optional(mut self, keywords: &[&str]) -> Self {
        self.optional.extend(keywords.iter().map(ToString::to_string));
        self
    }

    /// Wraps keyword arguments in another call
    #[must_use]
    pub fn wrap(mut self, call: impl Into<String>) -> Self {
        self.wrap = Some(call.into());
        self
    }

    /// Checks a directive's arguments against this shape.
    ///
    /// # Errors
    ///
    /// Returns the reason the arguments do not fit.
    pub fn check(&self, directive: &Directive) -> Result<(), String> {
        let positional = directive.args.iter().filter(|a| a.is_positional()).count();
        if positional < self.min_positional || positional > self.max_positional {
            return Err(if self.min_positional == self.max_positional {
                format!(
                    "expected {} positional argument(s), got {positional}",
                    self.min_positional
                )
            } else {
                format!(
                    "expected {} to {} positional arguments, got {positional}",
                    self.min_positional, self.max_positional
                )
            });
        }

        let mut seen = HashSet::new();
        for arg in &directive.args {
            if matches!(arg.value, ArgValue::Block(_)) {
                return Err("blocks are not allowed in directives".to_string());
            }
            let Some(keyword) = &arg.keyword else {
                continue;
            };
            if !self.required.contains(keyword) && !self.optional.contains(keyword) {
                return Err(format!("unknown keyword '{keyword}'"));
            }
            if !seen.insert(keyword.as_str()) {
                return Err(format!("keyword '{keyword}' given more than once"));
            }
        }

        if let Some(missing) = self.required.iter().find(|k| !seen.contains(k.as_str())) {
            return Err(format!("missing keyword '{missing}'"));
        }

        Ok(())
    }
}

/// Whitelist of recognized directives per section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectiveRegistry {
    /// `options` entries
    #[serde(default)]
    pub options: Vec<DirectiveSpec>,
    /// `triggers` entries
    #[serde(default)]
    pub triggers: Vec<DirectiveSpec>,
    /// `parameters` entries
    #[serde(default)]
    pub parameters: Vec<DirectiveSpec>,
    /// `tools` entries
    #[serde(default)]
    pub tools: Vec<DirectiveSpec>,
}

/// A build parameter: `name` plus the given optional keywords
fn parameter(kind: &str, keywords: &[&str]) -> DirectiveSpec {
    DirectiveSpec::flag(kind).required(&["name"]).optional(keywords)
}

const PARAMETER_KEYWORDS: &[&str] = &["defaultValue", "description"];

static BUILTIN: Lazy<DirectiveRegistry> = Lazy::new(|| {
    DirectiveRegistry {
        options: vec![
            DirectiveSpec::flag("buildDiscarder")
                .optional(&[
                    "numToKeepStr",
                    "daysToKeepStr",
                    "artifactNumToKeepStr",
                    "artifactDaysToKeepStr",
                ])
                .wrap("logRotator"),
            DirectiveSpec::flag("checkoutToSubdirectory").positional(1, 1),
            DirectiveSpec::flag("disableConcurrentBuilds").optional(&["abortPrevious"]),
            DirectiveSpec::flag("disableResume"),
            DirectiveSpec::flag("newContainerPerStage"),
            DirectiveSpec::flag("overrideIndexTriggers").positional(1, 1),
            DirectiveSpec::flag("parallelsAlwaysFailFast"),
            DirectiveSpec::flag("preserveStashes").optional(&["buildCount"]),
            DirectiveSpec::flag("quietPeriod").positional(1, 1),
            DirectiveSpec::flag("retry").positional(1, 1),
            DirectiveSpec::flag("skipDefaultCheckout").positional(0, 1),
            DirectiveSpec::flag("skipStagesAfterUnstable"),
            DirectiveSpec::flag("timeout")
                .required(&["time"])
                .optional(&["unit", "activity"]),
            DirectiveSpec::flag("timestamps"),
            DirectiveSpec::flag("ansiColor").positional(1, 1),
        ],
        triggers: vec![
            DirectiveSpec::flag("cron").positional(1, 1),
            DirectiveSpec::flag("pollSCM").positional(1, 1),
            DirectiveSpec::flag("upstream")
                .required(&["upstreamProjects"])
                .optional(&["threshold"]),
        ],
        parameters: vec![
            parameter("string", PARAMETER_KEYWORDS).optional(&["trim"]),
            parameter("text", PARAMETER_KEYWORDS),
            parameter("booleanParam", PARAMETER_KEYWORDS),
            parameter("password", PARAMETER_KEYWORDS),
            parameter("choice", &["choices", "description"]),
        ],
        tools: ["maven", "jdk", "gradle", "nodejs", "go", "ant"]
            .into_iter()
            .map(|tool| DirectiveSpec::flag(tool).positional(1, 1))
            .collect(),
    }
});

impl DirectiveRegistry {
    /// The built-in Jenkins declarative directive table
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Loads a registry from YAML.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error for malformed tables.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Entries of one section
    #[must_use]
    pub fn section(&self, section: DirectiveSection) -> &[DirectiveSpec] {
        match section {
            DirectiveSection::Options => &self.options,
            DirectiveSection::Triggers => &self.triggers,
            DirectiveSection::Parameters => &self.parameters,
            DirectiveSection::Tools => &self.tools,
        }
    }

    fn section_mut(&mut self, section: DirectiveSection) -> &mut Vec<DirectiveSpec> {
        match section {
            DirectiveSection::Options => &mut self.options,
            DirectiveSection::Triggers => &mut self.triggers,
            DirectiveSection::Parameters => &mut self.parameters,
            DirectiveSection::Tools => &mut self.tools,
        }
    }

    /// Looks up a directive by section and name
    #[must_use]
    pub fn get(&self, section: DirectiveSection, name: &str) -> Option<&DirectiveSpec> {
        self.section(section).iter().find(|spec| spec.name == name)
    }

    /// Adds or replaces an entry
    pub fn register(&mut self, section: DirectiveSection, spec: DirectiveSpec) {
        let entries = self.section_mut(section);
        match entries.iter_mut().find(|existing| existing.name == spec.name) {
            Some(existing) => *existing = spec,
            None => entries.push(spec),
        }
    }

    /// Merges another registry over this one; entries with the same name
    /// are replaced
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        for section in DirectiveSection::ALL {
            for spec in other.section(section).iter().cloned() {
                self.register(section, spec);
            }
        }
        self
    }
}
