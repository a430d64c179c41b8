//! Strategy parameter schema and resolution.
//!
//! A strategy declares its tunable knobs as a map of [`ParamSpec`]s; the
//! dashboard and sweep tooling consume that map as plain data. At
//! construction the declared defaults are merged with per-run overrides into
//! a [`ResolvedParams`] bag the strategy reads through typed getters.

use std::collections::BTreeMap;

use serde::Serialize;

/// A parameter value: the closed set of kinds a strategy knob can take.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    Flag(bool),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Text(_) => ParamKind::Text,
            ParamValue::Flag(_) => ParamKind::Flag,
        }
    }

    fn as_numeric(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Int,
    Float,
    Text,
    Flag,
}

/// Declaration of one tunable parameter: default plus optional constraints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParamSpec {
    pub default: ParamValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub choices: Option<Vec<ParamValue>>,
}

impl ParamSpec {
    pub fn new(default: ParamValue) -> Self {
        Self {
            default,
            min: None,
            max: None,
            step: None,
            choices: None,
        }
    }

    pub fn int(default: i64) -> Self {
        Self::new(ParamValue::Int(default))
    }

    pub fn float(default: f64) -> Self {
        Self::new(ParamValue::Float(default))
    }

    pub fn text(default: impl Into<String>) -> Self {
        Self::new(ParamValue::Text(default.into()))
    }

    pub fn flag(default: bool) -> Self {
        Self::new(ParamValue::Flag(default))
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn choices(mut self, choices: Vec<ParamValue>) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn kind(&self) -> ParamKind {
        self.default.kind()
    }
}

/// Parameter schema and resolution failures.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamError {
    UnknownParameter(String),
    KindMismatch {
        name: String,
        expected: ParamKind,
        got: ParamKind,
    },
    OutOfRange {
        name: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    NotAChoice(String),
    Missing(String),
}

impl std::fmt::Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamError::UnknownParameter(name) => write!(f, "unknown parameter: {name}"),
            ParamError::KindMismatch {
                name,
                expected,
                got,
            } => write!(f, "parameter {name}: expected {expected:?}, got {got:?}"),
            ParamError::OutOfRange {
                name,
                value,
                min,
                max,
            } => write!(
                f,
                "parameter {name}: value {value} outside [{min:?}, {max:?}]"
            ),
            ParamError::NotAChoice(name) => {
                write!(f, "parameter {name}: value not in declared choices")
            }
            ParamError::Missing(name) => write!(f, "parameter not declared: {name}"),
        }
    }
}

impl std::error::Error for ParamError {}

/// Fully-resolved parameter values for one strategy instance.
#[derive(Clone, Debug, Default)]
pub struct ResolvedParams {
    values: BTreeMap<String, ParamValue>,
}

impl ResolvedParams {
    /// Merge `overrides` into the declared `specs`, validating kind, range,
    /// and choices. An `Int` override is accepted for a `Float` parameter.
    pub fn resolve(
        specs: &BTreeMap<String, ParamSpec>,
        overrides: &BTreeMap<String, ParamValue>,
    ) -> Result<ResolvedParams, ParamError> {
        for name in overrides.keys() {
            if !specs.contains_key(name) {
                return Err(ParamError::UnknownParameter(name.clone()));
            }
        }

        let mut values = BTreeMap::new();
        for (name, spec) in specs {
            let value = match overrides.get(name) {
                Some(v) => coerce(name, spec, v)?,
                None => spec.default.clone(),
            };
            check_constraints(name, spec, &value)?;
            values.insert(name.clone(), value);
        }
        Ok(ResolvedParams { values })
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn int(&self, name: &str) -> Result<i64, ParamError> {
        match self.values.get(name) {
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(v) => Err(ParamError::KindMismatch {
                name: name.to_string(),
                expected: ParamKind::Int,
                got: v.kind(),
            }),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, ParamError> {
        match self.values.get(name) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(v) => Err(ParamError::KindMismatch {
                name: name.to_string(),
                expected: ParamKind::Float,
                got: v.kind(),
            }),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, ParamError> {
        match self.values.get(name) {
            Some(ParamValue::Text(v)) => Ok(v),
            Some(v) => Err(ParamError::KindMismatch {
                name: name.to_string(),
                expected: ParamKind::Text,
                got: v.kind(),
            }),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool, ParamError> {
        match self.values.get(name) {
            Some(ParamValue::Flag(v)) => Ok(*v),
            Some(v) => Err(ParamError::KindMismatch {
                name: name.to_string(),
                expected: ParamKind::Flag,
                got: v.kind(),
            }),
            None => Err(ParamError::Missing(name.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }
}

fn coerce(name: &str, spec: &ParamSpec, value: &ParamValue) -> Result<ParamValue, ParamError> {
    match (spec.kind(), value) {
        (ParamKind::Float, ParamValue::Int(v)) => Ok(ParamValue::Float(*v as f64)),
        (expected, v) if v.kind() == expected => Ok(v.clone()),
        (expected, v) => Err(ParamError::KindMismatch {
            name: name.to_string(),
            expected,
            got: v.kind(),
        }),
    }
}

fn check_constraints(name: &str, spec: &ParamSpec, value: &ParamValue) -> Result<(), ParamError> {
    if let Some(numeric) = value.as_numeric() {
        let below = spec.min.is_some_and(|min| numeric < min);
        let above = spec.max.is_some_and(|max| numeric > max);
        if below || above {
            return Err(ParamError::OutOfRange {
                name: name.to_string(),
                value: numeric,
                min: spec.min,
                max: spec.max,
            });
        }
    }
    if let Some(choices) = &spec.choices {
        if !choices.contains(value) {
            return Err(ParamError::NotAChoice(name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> BTreeMap<String, ParamSpec> {
        BTreeMap::from([
            (
                "fast".to_string(),
                ParamSpec::int(20).range(2.0, 200.0).step(1.0),
            ),
            ("quantity".to_string(), ParamSpec::float(1.0)),
            (
                "mode".to_string(),
                ParamSpec::text("long_only").choices(vec![
                    ParamValue::Text("long_only".into()),
                    ParamValue::Text("long_short".into()),
                ]),
            ),
        ])
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let resolved = ResolvedParams::resolve(&specs(), &BTreeMap::new()).unwrap();
        assert_eq!(resolved.int("fast").unwrap(), 20);
        assert_eq!(resolved.float("quantity").unwrap(), 1.0);
        assert_eq!(resolved.text("mode").unwrap(), "long_only");
    }

    #[test]
    fn overrides_replace_defaults() {
        let overrides = BTreeMap::from([("fast".to_string(), ParamValue::Int(50))]);
        let resolved = ResolvedParams::resolve(&specs(), &overrides).unwrap();
        assert_eq!(resolved.int("fast").unwrap(), 50);
    }

    #[test]
    fn unknown_override_is_rejected() {
        let overrides = BTreeMap::from([("nope".to_string(), ParamValue::Int(1))]);
        let err = ResolvedParams::resolve(&specs(), &overrides).unwrap_err();
        assert_eq!(err, ParamError::UnknownParameter("nope".to_string()));
    }

    #[test]
    fn out_of_range_override_is_rejected() {
        let overrides = BTreeMap::from([("fast".to_string(), ParamValue::Int(1))]);
        let err = ResolvedParams::resolve(&specs(), &overrides).unwrap_err();
        assert!(matches!(err, ParamError::OutOfRange { .. }));
    }

    #[test]
    fn choice_constraint_is_enforced() {
        let overrides =
            BTreeMap::from([("mode".to_string(), ParamValue::Text("sideways".into()))]);
        let err = ResolvedParams::resolve(&specs(), &overrides).unwrap_err();
        assert_eq!(err, ParamError::NotAChoice("mode".to_string()));
    }

    #[test]
    fn int_override_coerces_to_float_parameter() {
        let overrides = BTreeMap::from([("quantity".to_string(), ParamValue::Int(3))]);
        let resolved = ResolvedParams::resolve(&specs(), &overrides).unwrap();
        assert_eq!(resolved.float("quantity").unwrap(), 3.0);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let overrides = BTreeMap::from([("fast".to_string(), ParamValue::Flag(true))]);
        let err = ResolvedParams::resolve(&specs(), &overrides).unwrap_err();
        assert!(matches!(err, ParamError::KindMismatch { .. }));
    }
}
