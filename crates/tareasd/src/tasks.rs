//! Pure task execution.
//!
//! A task descriptor names one of a small fixed set of computations and
//! carries its arguments. Descriptors arrive as loosely typed JSON; [`Task`]
//! validates them into a typed value once. The only failure left at execution
//! is a sum that overflows to infinity, since JSON cannot carry it.
//! Nothing here performs I/O or touches shared state.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while validating a task descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The descriptor was not a JSON object.
    #[error("invalid task: task must be an object")]
    InvalidDescriptor,
    /// The task name is known but its arguments have the wrong shape.
    #[error("invalid argument for {task}: {message}")]
    InvalidArgument {
        /// Task whose arguments were rejected.
        task: &'static str,
        /// Description of the offending argument.
        message: String,
    },
    /// The task name is not one of `sum`, `upper`, `lower`.
    #[error("unknown task name: {name}")]
    UnknownTask {
        /// Lower-cased name as received.
        name: String,
    },
}

impl TaskError {
    fn invalid_argument(task: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            task,
            message: message.into(),
        }
    }
}

/// A validated unit of pure computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Arithmetic sum of the operands.
    Sum(Vec<f64>),
    /// Upper-cased text.
    Upper(String),
    /// Lower-cased text.
    Lower(String),
}

impl Task {
    /// Validates a JSON task descriptor.
    ///
    /// The name is matched case-insensitively. `sum` reads its operands from
    /// `args`; `upper` and `lower` read their text from `s`, falling back to
    /// `args`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] when the descriptor is not an object, names an
    /// unknown task, or carries arguments of the wrong kind.
    pub fn from_descriptor(descriptor: &Value) -> Result<Self, TaskError> {
        let Value::Object(fields) = descriptor else {
            return Err(TaskError::InvalidDescriptor);
        };
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        match name.as_str() {
            "sum" => parse_operands(fields.get("args")).map(Self::Sum),
            "upper" => Ok(Self::Upper(text_argument(fields))),
            "lower" => Ok(Self::Lower(text_argument(fields))),
            _ => Err(TaskError::UnknownTask { name }),
        }
    }

    /// Runs the computation.
    ///
    /// An empty sum is the integer `0`; any other sum is a float.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidArgument`] when a sum of finite operands
    /// overflows.
    pub fn execute(&self) -> Result<Value, TaskError> {
        match self {
            Self::Sum(operands) if operands.is_empty() => Ok(Value::from(0)),
            Self::Sum(operands) => {
                let total = operands.iter().fold(0.0_f64, |acc, value| acc + value);
                if total.is_finite() {
                    Ok(Value::from(total))
                } else {
                    Err(TaskError::invalid_argument("sum", "result is not finite"))
                }
            }
            Self::Upper(text) => Ok(Value::String(text.to_uppercase())),
            Self::Lower(text) => Ok(Value::String(text.to_lowercase())),
        }
    }
}

/// Validates and runs a descriptor in one step.
///
/// # Errors
///
/// See [`Task::from_descriptor`].
pub fn execute_task(descriptor: &Value) -> Result<Value, TaskError> {
    Task::from_descriptor(descriptor)?.execute()
}

fn parse_operands(args: Option<&Value>) -> Result<Vec<f64>, TaskError> {
    let items = match args {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(TaskError::invalid_argument("sum", "args must be a list")),
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            coerce_number(item).ok_or_else(|| {
                TaskError::invalid_argument(
                    "sum",
                    format!("element {index} is not a finite number: {item}"),
                )
            })
        })
        .collect()
}

/// `"nan"` and `"inf"` parse as floats but are not operands.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    number.filter(|value| value.is_finite())
}

fn text_argument(fields: &Map<String, Value>) -> String {
    match fields.get("s").or_else(|| fields.get("args")) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
