//! # Condition Module / 条件模块
//!
//! A small predicate algebra gating whether a step runs for a job. Conditions
//! are parsed from their textual form once, at configuration load time, and
//! evaluated by a pure function over the job's axis values and the trigger
//! context.
//!
//! 一个小型谓词代数，用于决定某个步骤是否在某个作业中运行。
//! 条件在配置加载时从文本形式解析一次，并由一个纯函数
//! 基于作业的轴取值和触发上下文进行求值。
//!
//! ## Syntax / 语法
//!
//! ```text
//! platform contains ubuntu && python-version !starts-with pypy
//! event == push
//! ```

use std::fmt;

use crate::core::error::ConfigError;
use crate::core::models::JobInstance;
use crate::core::trigger::{TriggerContext, TriggerEvent};

/// Name reserved for the trigger context on the left-hand side of a clause.
pub const EVENT_OPERAND: &str = "event";

/// A single primitive test.
/// 单个基本测试。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The job's value for `axis` contains `needle`.
    Contains { axis: String, needle: String },
    /// The job's value for `axis` starts with `prefix`.
    StartsWith { axis: String, prefix: String },
    /// The job's value for `axis` does not start with `prefix`.
    NotStartsWith { axis: String, prefix: String },
    /// The job's value for `axis` equals `value`.
    Equals { axis: String, value: String },
    /// The run was triggered by `event`.
    EventIs(TriggerEvent),
}

impl Predicate {
    fn axis(&self) -> Option<&str> {
        match self {
            Predicate::Contains { axis, .. }
            | Predicate::StartsWith { axis, .. }
            | Predicate::NotStartsWith { axis, .. }
            | Predicate::Equals { axis, .. } => Some(axis),
            Predicate::EventIs(_) => None,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Contains { axis, needle } => write!(f, "{axis} contains {}", quote(needle)),
            Predicate::StartsWith { axis, prefix } => {
                write!(f, "{axis} starts-with {}", quote(prefix))
            }
            Predicate::NotStartsWith { axis, prefix } => {
                write!(f, "{axis} !starts-with {}", quote(prefix))
            }
            Predicate::Equals { axis, value } => write!(f, "{axis} == {}", quote(value)),
            Predicate::EventIs(event) => write!(f, "{EVENT_OPERAND} == {event}"),
        }
    }
}

fn quote(s: &str) -> String {
    shlex::try_quote(s)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// A predicate or a conjunction of conditions.
/// 一个谓词或多个条件的合取。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Predicate(Predicate),
    All(Vec<Condition>),
}

impl Condition {
    /// Parses the textual form of a condition.
    ///
    /// `context` names the owner of the expression (usually the step) and is
    /// used in error messages only.
    ///
    /// # Errors
    /// * `ConfigError::UnknownPredicate` for an unrecognized operator
    /// * `ConfigError::MalformedCondition` for anything else that cannot be parsed
    pub fn parse(expr: &str, context: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: String| ConfigError::MalformedCondition {
            context: context.to_string(),
            expr: expr.to_string(),
            reason,
        };

        if expr.trim().is_empty() {
            return Err(malformed("empty expression".into()));
        }
        let parts = split_conjunction(expr).ok_or_else(|| malformed("unbalanced quotes".into()))?;

        let mut clauses = Vec::new();
        for part in parts {
            let clause = shlex::split(part).ok_or_else(|| malformed("unbalanced quotes".into()))?;
            let [lhs, op, rhs] = clause.as_slice() else {
                return Err(malformed(format!(
                    "expected '<operand> <operator> <value>', found {} token(s)",
                    clause.len()
                )));
            };
            clauses.push(Condition::Predicate(parse_clause(lhs, op, rhs, context, &malformed)?));
        }

        Ok(match clauses.len() {
            1 => clauses.remove(0),
            _ => Condition::All(clauses),
        })
    }

    /// Every axis name this condition reads, in order of appearance.
    pub fn referenced_axes(&self) -> Vec<&str> {
        match self {
            Condition::Predicate(p) => p.axis().into_iter().collect(),
            Condition::All(all) => all.iter().flat_map(|c| c.referenced_axes()).collect(),
        }
    }
}

/// Splits `expr` on every `&&` outside of quotes. `None` if a quote is left
/// open.
fn split_conjunction(expr: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = expr.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match quote {
            _ if escaped => escaped = false,
            Some('\'') if c == '\'' => quote = None,
            Some('\'') => {}
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\\' => escaped = true,
                '\'' | '"' => quote = Some(c),
                '&' if chars.peek().is_some_and(|(_, next)| *next == '&') => {
                    chars.next();
                    parts.push(&expr[start..i]);
                    start = i + 2;
                }
                _ => {}
            },
        }
    }

    if quote.is_some() {
        return None;
    }
    parts.push(&expr[start..]);
    Some(parts)
}

fn parse_clause(
    lhs: &str,
    op: &str,
    rhs: &str,
    context: &str,
    malformed: &dyn Fn(String) -> ConfigError,
) -> Result<Predicate, ConfigError> {
    if lhs == EVENT_OPERAND {
        if op != "==" {
            return Err(ConfigError::UnknownPredicate {
                context: context.to_string(),
                predicate: format!("{lhs} {op}"),
            });
        }
        let event = rhs
            .parse::<TriggerEvent>()
            .map_err(|e| malformed(e.to_string()))?;
        return Ok(Predicate::EventIs(event));
    }

    let axis = lhs.to_string();
    let value = rhs.to_string();
    match op {
        "contains" => Ok(Predicate::Contains { axis, needle: value }),
        "starts-with" => Ok(Predicate::StartsWith { axis, prefix: value }),
        "!starts-with" => Ok(Predicate::NotStartsWith { axis, prefix: value }),
        "==" => Ok(Predicate::Equals { axis, value }),
        other => Err(ConfigError::UnknownPredicate {
            context: context.to_string(),
            predicate: other.to_string(),
        }),
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Predicate(p) => write!(f, "{p}"),
            Condition::All(all) => {
                let parts: Vec<String> = all.iter().map(|c| c.to_string()).collect();
                f.write_str(&parts.join(" && "))
            }
        }
    }
}

/// Evaluates `condition` for `job` under `trigger`.
///
/// Pure: the result depends only on the arguments. Every clause of a
/// conjunction is evaluated so a reference to a missing axis is always
/// reported, never masked by an earlier false clause.
///
/// 在 `trigger` 下为 `job` 求值 `condition`。纯函数：结果只取决于参数。
///
/// # Errors
/// `ConfigError::UnknownAxis` if the condition reads an axis the job lacks.
pub fn evaluate(
    condition: &Condition,
    job: &JobInstance,
    trigger: &TriggerContext,
) -> Result<bool, ConfigError> {
    match condition {
        Condition::Predicate(p) => evaluate_predicate(p, job, trigger),
        Condition::All(all) => {
            let mut result = true;
            for c in all {
                result &= evaluate(c, job, trigger)?;
            }
            Ok(result)
        }
    }
}

fn evaluate_predicate(
    predicate: &Predicate,
    job: &JobInstance,
    trigger: &TriggerContext,
) -> Result<bool, ConfigError> {
    let lookup = |axis: &str| {
        job.value(axis).ok_or_else(|| ConfigError::UnknownAxis {
            context: format!("job {}", job.label()),
            axis: axis.to_string(),
        })
    };

    Ok(match predicate {
        Predicate::Contains { axis, needle } => lookup(axis)?.contains(needle.as_str()),
        Predicate::StartsWith { axis, prefix } => lookup(axis)?.starts_with(prefix.as_str()),
        Predicate::NotStartsWith { axis, prefix } => !lookup(axis)?.starts_with(prefix.as_str()),
        Predicate::Equals { axis, value } => lookup(axis)? == value,
        Predicate::EventIs(event) => trigger.event == *event,
    })
}
