//! Matrix stages
//!
//! A matrix runs its nested stages once per combination of axis values,
//! minus the combinations removed by `excludes`.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use super::agent::AgentType;
use super::stage::Stage;
use serde::{Deserialize, Serialize};

/// A single axis of the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixAxis {
    /// Name of the axis
    pub name: String,
    /// Values for this axis
    pub values: Vec<String>,
}

impl MatrixAxis {
    /// Creates an axis
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// How an exclude entry matches an axis value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisFilter {
    /// Matches any of the listed values
    Values(Vec<String>),
    /// Matches any value except the listed ones
    NotValues(Vec<String>),
}

impl AxisFilter {
    /// Returns true when `value` is selected by this filter
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Values(values) => values.iter().any(|v| v == value),
            Self::NotValues(values) => values.iter().all(|v| v != value),
        }
    }

    /// The listed values
    pub fn values(&self) -> &[String] {
        match self {
            Self::Values(values) | Self::NotValues(values) => values,
        }
    }
}

/// One axis reference inside an exclude
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeAxis {
    /// Referenced axis name
    pub name: String,
    /// Value filter
    pub filter: AxisFilter,
}

/// Exclusion rule: a combination is removed when every axis reference matches
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatrixExclude {
    /// Axis references
    pub axes: Vec<ExcludeAxis>,
}

impl MatrixExclude {
    /// Adds a `values` reference
    pub fn values(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.axes.push(ExcludeAxis {
            name: name.into(),
            filter: AxisFilter::Values(values),
        });
        self
    }

    /// Adds a `notValues` reference
    pub fn not_values(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.axes.push(ExcludeAxis {
            name: name.into(),
            filter: AxisFilter::NotValues(values),
        });
        self
    }

    /// Returns true when this rule removes the combination
    pub fn excludes(&self, combination: &[(String, String)]) -> bool {
        self.axes.iter().all(|reference| {
            combination
                .iter()
                .find(|(name, _)| *name == reference.name)
                .is_some_and(|(_, value)| reference.filter.matches(value))
        })
    }
}

/// Configuration for matrix execution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matrix {
    /// Axes of the matrix
    pub axes: Vec<MatrixAxis>,

    /// Exclusions from the matrix
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<MatrixExclude>,

    /// Agent for every cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentType>,

    /// Abort remaining cells when one fails
    #[serde(default)]
    pub fail_fast: bool,

    /// Stages run in every cell
    pub stages: Vec<Stage>,
}

impl Matrix {
    /// Creates a new empty matrix configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an axis to the matrix
    pub fn axis(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.axes.push(MatrixAxis::new(name, values));
        self
    }

    /// Adds an exclusion rule
    pub fn exclude(mut self, exclude: MatrixExclude) -> Self {
        self.excludes.push(exclude);
        self
    }

    /// Sets the cell agent
    pub fn agent(mut self, agent: AgentType) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Adds a cell stage
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Looks up an axis by name
    pub fn find_axis(&self, name: &str) -> Option<&MatrixAxis> {
        self.axes.iter().find(|axis| axis.name == name)
    }

    /// Generates every combination left after exclusions, in axis order
    pub fn combinations(&self) -> Vec<Vec<(String, String)>> {
        if self.axes.is_empty() {
            return vec![];
        }

        let mut combinations = vec![vec![]];

        for axis in &self.axes {
            let mut next = Vec::with_capacity(combinations.len() * axis.values.len());
            for combo in &combinations {
                for value in &axis.values {
                    let mut extended: Vec<(String, String)> = combo.clone();
                    extended.push((axis.name.clone(), value.clone()));
                    next.push(extended);
                }
            }
            combinations = next;
        }

        combinations
            .into_iter()
            .filter(|combo| !self.excludes.iter().any(|exclude| exclude.excludes(combo)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::steps::Step;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn platform_browser() -> Matrix {
        Matrix::new()
            .axis("PLATFORM", strings(&["linux", "windows"]))
            .axis("BROWSER", strings(&["chrome", "firefox", "safari"]))
            .stage(Stage::new("Test", vec![Step::echo("test")]))
    }

    #[test]
    fn test_combinations_cartesian_product() {
        let combos = platform_browser().combinations();
        assert_eq!(combos.len(), 6);
        assert_eq!(
            combos[0],
            vec![
                ("PLATFORM".to_string(), "linux".to_string()),
                ("BROWSER".to_string(), "chrome".to_string()),
            ]
        );
    }

    #[test]
    fn test_combinations_with_values_exclude() {
        let matrix = platform_browser().exclude(
            MatrixExclude::default()
                .values("PLATFORM", strings(&["linux"]))
                .values("BROWSER", strings(&["safari"])),
        );
        assert_eq!(matrix.combinations().len(), 5);
    }

    #[test]
    fn test_combinations_with_not_values_exclude() {
        // drops every windows cell except chrome
        let matrix = platform_browser().exclude(
            MatrixExclude::default()
                .values("PLATFORM", strings(&["windows"]))
                .not_values("BROWSER", strings(&["chrome"])),
        );
        let combos = matrix.combinations();
        assert_eq!(combos.len(), 4);
        assert!(combos.iter().any(|c| c[0].1 == "windows" && c[1].1 == "chrome"));
    }

    #[test]
    fn test_combinations_empty_axes() {
        assert!(Matrix::new().combinations().is_empty());
    }

    #[test]
    fn test_axis_filter() {
        let filter = AxisFilter::NotValues(strings(&["a"]));
        assert!(!filter.matches("a"));
        assert!(filter.matches("b"));
        assert_eq!(filter.values(), strings(&["a"]).as_slice());
    }
}
