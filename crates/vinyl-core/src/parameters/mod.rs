//! Tunable parameters owned by a calculator.
//!
//! A parameter carries an optional value plus legality constraints:
//! closed intervals and option lists, each declared either all legal or
//! all illegal. Constraint priority on lookup: options, then intervals,
//! then the fall-through rule over the declared validities.

use crate::domain::{VinylError, VinylResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
    Flag(bool),
    NumberList(Vec<f64>),
}

impl ParameterValue {
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl Display for ParameterValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Flag(value) => write!(f, "{value}"),
            Self::NumberList(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<f64>> for ParameterValue {
    fn from(values: Vec<f64>) -> Self {
        Self::NumberList(values)
    }
}

/// Closed interval; an absent bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Interval {
    pub fn contains(self, value: f64) -> bool {
        self.min.map_or(true, |min| min <= value) && self.max.map_or(true, |max| value <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    name: String,
    unit: Option<String>,
    comment: Option<String>,
    value: Option<ParameterValue>,
    intervals: Vec<Interval>,
    intervals_are_legal: Option<bool>,
    options: Vec<ParameterValue>,
    options_are_legal: Option<bool>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, unit: Option<&str>, comment: Option<&str>) -> Self {
        Self {
            name: name.into(),
            unit: unit.map(str::to_string),
            comment: comment.map(str::to_string),
            value: None,
            intervals: Vec::new(),
            intervals_are_legal: None,
            options: Vec::new(),
            options_are_legal: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn value(&self) -> Option<&ParameterValue> {
        self.value.as_ref()
    }

    /// Adds a closed interval `[min, max]`; `None` bounds are unbounded.
    /// All intervals of one parameter must share the same validity.
    pub fn add_interval(
        &mut self,
        min: Option<f64>,
        max: Option<f64>,
        intervals_are_legal: bool,
    ) -> VinylResult<()> {
        match self.intervals_are_legal {
            None => self.intervals_are_legal = Some(intervals_are_legal),
            Some(declared) if declared != intervals_are_legal => {
                return Err(VinylError::MixedConstraintValidity {
                    name: self.name.clone(),
                    constraint: "intervals",
                });
            }
            Some(_) => {}
        }
        self.intervals.push(Interval { min, max });
        Ok(())
    }

    /// Adds an allowed (or forbidden) discrete value. Same validity rule
    /// as intervals.
    pub fn add_option(
        &mut self,
        option: impl Into<ParameterValue>,
        options_are_legal: bool,
    ) -> VinylResult<()> {
        match self.options_are_legal {
            None => self.options_are_legal = Some(options_are_legal),
            Some(declared) if declared != options_are_legal => {
                return Err(VinylError::MixedConstraintValidity {
                    name: self.name.clone(),
                    constraint: "options",
                });
            }
            Some(_) => {}
        }
        self.options.push(option.into());
        Ok(())
    }

    pub fn clear_intervals(&mut self) {
        self.intervals.clear();
        self.intervals_are_legal = None;
    }

    pub fn clear_options(&mut self) {
        self.options.clear();
        self.options_are_legal = None;
    }

    pub fn set_value(&mut self, value: impl Into<ParameterValue>) -> VinylResult<()> {
        let value = value.into();
        if !self.is_legal(&value) {
            return Err(VinylError::IllegalParameterValue {
                name: self.name.clone(),
                value: value.to_string(),
            });
        }
        self.value = Some(value);
        Ok(())
    }

    /// A list value is legal iff every element is legal.
    pub fn is_legal(&self, value: &ParameterValue) -> bool {
        match value {
            ParameterValue::NumberList(values) => values
                .iter()
                .all(|element| self.scalar_is_legal(&ParameterValue::Number(*element))),
            scalar => self.scalar_is_legal(scalar),
        }
    }

    fn scalar_is_legal(&self, value: &ParameterValue) -> bool {
        if let Some(options_are_legal) = self.options_are_legal {
            if self.options.iter().any(|option| option == value) {
                return options_are_legal;
            }
        }
        if let (Some(number), Some(intervals_are_legal)) =
            (value.as_number(), self.intervals_are_legal)
        {
            if self.intervals.iter().any(|interval| interval.contains(number)) {
                return intervals_are_legal;
            }
        }
        // Fall-through: a value outside every interval is legal only when
        // the intervals were forbidden ones; with no intervals at all it
        // is legal unless the options were an exhaustive allow-list.
        (self.intervals_are_legal == Some(false) && !self.intervals.is_empty())
            || (self.intervals.is_empty()
                && (self.options_are_legal != Some(true) || self.options.is_empty()))
    }

    /// One-line rendering for human-facing listings.
    pub fn summary_line(&self) -> String {
        let mut line = format!("{:<20}", self.name);
        if let Some(value) = &self.value {
            line.push_str(&format!("{:<12}", value.to_string()));
        }
        if let Some(unit) = &self.unit {
            line.push_str(&format!("[{unit}] "));
        }
        if let Some(comment) = &self.comment {
            line.push_str(comment);
        }
        line.trim_end().to_string()
    }
}

/// Ordered, name-unique bag of parameters owned by one calculator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, parameter: Parameter) -> VinylResult<()> {
        if self.contains(parameter.name()) {
            return Err(VinylError::DuplicateParameter {
                name: parameter.name().to_string(),
            });
        }
        self.parameters.push(parameter);
        Ok(())
    }

    /// Appends a fresh parameter and hands back a mutable handle for
    /// constraint and value setup.
    pub fn new_parameter(
        &mut self,
        name: &str,
        unit: Option<&str>,
        comment: Option<&str>,
    ) -> VinylResult<&mut Parameter> {
        self.add(Parameter::new(name, unit, comment))?;
        let index = self.parameters.len() - 1;
        Ok(&mut self.parameters[index])
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|parameter| parameter.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters
            .iter_mut()
            .find(|parameter| parameter.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.iter().any(|parameter| parameter.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Parameter, ParameterSet, ParameterValue};
    use crate::domain::{VinylError, VinylErrorKind};

    #[test]
    fn unconstrained_parameter_accepts_any_value() {
        let mut parameter = Parameter::new("photon_energy", Some("eV"), None);
        parameter.set_value(10.0).expect("value should be accepted");
        assert_eq!(parameter.value(), Some(&ParameterValue::Number(10.0)));
    }

    #[test]
    fn legal_interval_bounds_are_inclusive() {
        let mut parameter = Parameter::new("fraction", None, None);
        parameter
            .add_interval(Some(0.0), Some(1.0), true)
            .expect("first interval sets the validity");

        assert!(parameter.is_legal(&ParameterValue::Number(0.0)));
        assert!(parameter.is_legal(&ParameterValue::Number(1.0)));
        assert!(!parameter.is_legal(&ParameterValue::Number(1.5)));

        let error = parameter
            .set_value(-0.5)
            .expect_err("out-of-interval value must be rejected");
        assert_eq!(error.kind(), VinylErrorKind::Type);
    }

    #[test]
    fn open_ended_interval_is_unbounded_on_that_side() {
        let mut parameter = Parameter::new("temperature", Some("K"), None);
        parameter
            .add_interval(Some(0.0), None, true)
            .expect("interval should be registered");

        assert!(parameter.is_legal(&ParameterValue::Number(1.0e9)));
        assert!(!parameter.is_legal(&ParameterValue::Number(-1.0)));
    }

    #[test]
    fn illegal_interval_forbids_only_its_range() {
        let mut parameter = Parameter::new("gap", None, None);
        parameter
            .add_interval(Some(2.0), Some(3.0), false)
            .expect("interval should be registered");

        assert!(!parameter.is_legal(&ParameterValue::Number(2.5)));
        assert!(parameter.is_legal(&ParameterValue::Number(4.0)));
    }

    #[test]
    fn mixed_interval_validity_is_rejected() {
        let mut parameter = Parameter::new("mode", None, None);
        parameter
            .add_interval(Some(0.0), Some(1.0), true)
            .expect("first interval is fine");

        let error = parameter
            .add_interval(Some(2.0), Some(3.0), false)
            .expect_err("conflicting validity must fail");
        assert_eq!(
            error,
            VinylError::MixedConstraintValidity {
                name: "mode".to_string(),
                constraint: "intervals",
            }
        );
    }

    #[test]
    fn legal_options_form_an_allow_list() {
        let mut parameter = Parameter::new("detector", None, None);
        parameter
            .add_option("pnCCD", true)
            .expect("option should be registered");
        parameter
            .add_option("AGIPD", true)
            .expect("option should be registered");

        assert!(parameter.is_legal(&ParameterValue::Text("AGIPD".to_string())));
        assert!(!parameter.is_legal(&ParameterValue::Text("Jungfrau".to_string())));
    }

    #[test]
    fn number_list_is_legal_only_when_every_element_is() {
        let mut parameter = Parameter::new("samples", None, None);
        parameter
            .add_interval(Some(0.0), Some(10.0), true)
            .expect("interval should be registered");

        assert!(parameter.is_legal(&ParameterValue::NumberList(vec![1.0, 2.0, 3.0])));
        assert!(!parameter.is_legal(&ParameterValue::NumberList(vec![1.0, 11.0])));
    }

    #[test]
    fn parameter_set_rejects_duplicate_names() {
        let mut parameters = ParameterSet::new();
        parameters
            .new_parameter("times", None, Some("how many times to run"))
            .expect("first registration succeeds");

        let error = parameters
            .new_parameter("times", None, None)
            .expect_err("duplicate registration must fail");
        assert_eq!(
            error,
            VinylError::DuplicateParameter {
                name: "times".to_string()
            }
        );
        assert_eq!(parameters.len(), 1);
    }

    #[test]
    fn parameter_set_lookup_returns_registered_handles() {
        let mut parameters = ParameterSet::new();
        parameters
            .new_parameter("photon_energy", Some("eV"), Some("Photon energy"))
            .expect("registration succeeds")
            .set_value(6000.0)
            .expect("value is legal");

        let photon_energy = parameters.get("photon_energy").expect("parameter present");
        assert_eq!(photon_energy.value(), Some(&ParameterValue::Number(6000.0)));
        assert!(parameters.get("missing").is_none());
    }

    #[test]
    fn summary_line_lists_name_value_and_unit() {
        let mut parameter = Parameter::new("pulse_energy", Some("joule"), Some("Pulse energy"));
        parameter.set_value(0.001).expect("value is legal");

        let line = parameter.summary_line();
        assert!(line.starts_with("pulse_energy"));
        assert!(line.contains("0.001"));
        assert!(line.contains("[joule]"));
        assert!(line.ends_with("Pulse energy"));
    }
}
