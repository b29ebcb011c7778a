//! Tunable hyperparameter ranges and the values drawn from them

use crate::error::{InsightError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Range a hyperparameter is drawn from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Uniform float in `[low, high]`, optionally uniform in log space
    Float { low: f64, high: f64, log_scale: bool },
    /// Uniform integer in `[low, high]`
    Int { low: i64, high: i64 },
    Categorical { choices: Vec<String> },
    Boolean,
}

/// A named hyperparameter range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

impl Parameter {
    fn with_type(name: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }

    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self::with_type(name, ParameterType::Float { low, high, log_scale: false })
    }

    pub fn log_float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self::with_type(name, ParameterType::Float { low, high, log_scale: true })
    }

    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self::with_type(name, ParameterType::Int { low, high })
    }

    pub fn categorical(name: impl Into<String>, choices: Vec<&str>) -> Self {
        let choices = choices.into_iter().map(str::to_string).collect();
        Self::with_type(name, ParameterType::Categorical { choices })
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::with_type(name, ParameterType::Boolean)
    }

    /// Reject empty or inverted ranges before any trial runs
    pub fn validate(&self) -> Result<()> {
        let reason = match &self.param_type {
            ParameterType::Float { low, high, .. } if !(low <= high) => Some("low must not exceed high"),
            ParameterType::Float { low, log_scale: true, .. } if *low <= 0.0 => {
                Some("log-scale ranges must be positive")
            }
            ParameterType::Int { low, high } if low > high => Some("low must not exceed high"),
            ParameterType::Categorical { choices } if choices.is_empty() => Some("no choices given"),
            _ => None,
        };
        match reason {
            Some(reason) => Err(InsightError::InvalidParameter {
                name: self.name.clone(),
                value: format!("{:?}", self.param_type),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Draw one value; the range must already be valid
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParameterValue {
        match &self.param_type {
            ParameterType::Float { low, high, log_scale: false } => {
                ParameterValue::Float(low + rng.gen::<f64>() * (high - low))
            }
            ParameterType::Float { low, high, log_scale: true } => {
                let (a, b) = (low.ln(), high.ln());
                ParameterValue::Float((a + rng.gen::<f64>() * (b - a)).exp())
            }
            ParameterType::Int { low, high } => ParameterValue::Int(rng.gen_range(*low..=*high)),
            ParameterType::Categorical { choices } => {
                ParameterValue::String(choices[rng.gen_range(0..choices.len())].clone())
            }
            ParameterType::Boolean => ParameterValue::Bool(rng.gen_bool(0.5)),
        }
    }
}

/// Value drawn for one hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    String(String),
    Bool(bool),
}

impl ParameterValue {
    /// Numeric value; integers widen
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            ParameterValue::Float(v) => Some(v),
            ParameterValue::Int(v) => Some(v as f64),
            _ => None,
        }
    }

    /// Integer value; floats round to the nearest integer
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            ParameterValue::Int(v) => Some(v),
            ParameterValue::Float(v) if v.is_finite() => Some(v.round() as i64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        if let ParameterValue::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let ParameterValue::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

/// Hyperparameter name to drawn value
pub type TrialParams = HashMap<String, ParameterValue>;

/// Ordered collection of hyperparameter ranges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range, replacing any existing range with the same name
    pub fn add(mut self, param: Parameter) -> Self {
        match self.parameters.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.parameters.push(param),
        }
        self
    }

    pub fn float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::float(name, low, high))
    }

    pub fn log_float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::log_float(name, low, high))
    }

    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(Parameter::int(name, low, high))
    }

    pub fn categorical(self, name: impl Into<String>, choices: Vec<&str>) -> Self {
        self.add(Parameter::categorical(name, choices))
    }

    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.add(Parameter::boolean(name))
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.parameters.iter().try_for_each(Parameter::validate)
    }

    /// Draw one value per range
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TrialParams {
        let mut trial = TrialParams::with_capacity(self.parameters.len());
        for param in &self.parameters {
            trial.insert(param.name.clone(), param.sample(rng));
        }
        trial
    }
}
