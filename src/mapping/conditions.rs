//! Mapper conditions: placeholder pipelines gating whether a mapper runs
//!
//! A condition is an expression such as
//! `fn:filter(header:channel,'eq','live')` or
//! `{{ header:qos | fn:default('0') | fn:filter('ne','2') }}`. The pipeline
//! starts with a placeholder, a quoted literal, or a function that names its
//! own subject, and may be followed by functions. A condition holds iff the
//! pipeline resolves to `true` (case-insensitive). A mapper runs only if
//! every one of its conditions holds.
//!
//! Expressions are parsed once when the mapper is built, so a syntax error
//! is a configuration error rather than a per-message failure.

use super::error::ConfigurationError;
use super::placeholders::strip_braces;
use crate::classify;
use crate::model::{ConnectionId, MappableSignal, Signal, TopicPath};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a condition expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionSyntaxError {
    #[error("empty expression")]
    Empty,

    #[error("unclosed quote in: {0}")]
    UnclosedQuote(String),

    #[error("unbalanced parentheses in: {0}")]
    UnbalancedParentheses(String),

    #[error("only functions may follow the first stage, got '{0}'")]
    MisplacedStage(String),

    #[error("a pipeline must start with a value or fn:filter(subject, ...)")]
    MissingSubject,

    #[error("malformed function call: {0}")]
    MalformedFunction(String),

    #[error("unknown function: fn:{0}")]
    UnknownFunction(String),

    #[error("wrong number of arguments ({count}) for fn:{function}")]
    WrongArity { function: String, count: usize },

    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    #[error("filter operator must be a quoted literal")]
    OperatorNotLiteral,

    #[error("fn:filter needs an operator")]
    MissingOperator,

    #[error("too many arguments for fn:filter")]
    TooManyArguments,

    #[error("filter operator '{0}' needs a value to compare")]
    MissingComparand(String),

    #[error("not a placeholder or quoted literal: '{0}'")]
    NotAnOperand(String),

    #[error("unknown placeholder '{0}'")]
    UnknownPlaceholder(String),
}

// ---------------------------------------------------------------------------
// Resolution context
// ---------------------------------------------------------------------------

/// What a condition can see: the group's source signal, the topic it was
/// adapted to, and the connection it is leaving through.
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    pub signal: &'a Signal,
    pub topic_path: &'a TopicPath,
    pub connection_id: &'a ConnectionId,
}

impl<'a> ConditionContext<'a> {
    pub fn for_outbound(
        mappable: &'a MappableSignal,
        topic_path: &'a TopicPath,
        connection_id: &'a ConnectionId,
    ) -> Self {
        Self {
            signal: &mappable.source,
            topic_path,
            connection_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Expression tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum TopicField {
    Full,
    Namespace,
    EntityName,
    Group,
    Channel,
    Criterion,
    Action,
}

#[derive(Debug, Clone, PartialEq)]
enum EntityField {
    Id,
    Namespace,
    Name,
}

#[derive(Debug, Clone, PartialEq)]
enum Placeholder {
    Header(String),
    Topic(TopicField),
    Entity(EntityField),
    ConnectionId,
    SignalType,
    LiveCommand,
    LiveCommandResponse,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Literal(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FilterOp {
    Eq,
    Ne,
    Exists,
    Like,
}

#[derive(Debug, Clone, PartialEq)]
enum Function {
    /// Reduces the pipeline to `true`/`false`
    Filter {
        subject: Option<Operand>,
        op: FilterOp,
        compared: Option<Operand>,
    },
    Default(Operand),
    Lower,
    Upper,
}

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    Operand(Operand),
    Function(Function),
}

/// One named, parsed condition expression.
#[derive(Debug, Clone)]
pub struct Condition {
    label: String,
    expression: String,
    stages: Vec<Stage>,
}

impl Condition {
    pub fn parse(
        label: impl Into<String>,
        expression: impl Into<String>,
    ) -> Result<Self, ConditionSyntaxError> {
        let label = label.into();
        let expression = expression.into();
        let stages = parse_pipeline(strip_braces(&expression))?;
        Ok(Self {
            label,
            expression,
            stages,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Resolve the pipeline and test for `true`.
    pub fn holds(&self, ctx: &ConditionContext<'_>) -> bool {
        matches!(run_pipeline(&self.stages, ctx), Some(v) if v.eq_ignore_ascii_case("true"))
    }
}

/// The ordered condition set of one mapper direction.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    conditions: Vec<Condition>,
}

impl Conditions {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse label → expression pairs, in label order.
    pub fn parse(
        mapper_id: &str,
        expressions: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigurationError> {
        let conditions = expressions
            .iter()
            .map(|(label, expr)| {
                Condition::parse(label.as_str(), expr.as_str()).map_err(|reason| {
                    ConfigurationError::InvalidCondition {
                        mapper_id: mapper_id.to_string(),
                        label: label.clone(),
                        reason,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { conditions })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Conjunction of all conditions; an empty set is an open gate.
    pub fn evaluate(&self, ctx: &ConditionContext<'_>) -> bool {
        self.conditions.iter().all(|c| c.holds(ctx))
    }
}

impl std::fmt::Display for Conditions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .conditions
            .iter()
            .map(|c| format!("{}={}", c.label, c.expression))
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

/// Evaluate a condition set against a context.
pub fn evaluate(conditions: &Conditions, ctx: &ConditionContext<'_>) -> bool {
    conditions.evaluate(ctx)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split on `sep` outside quotes and parentheses.
fn split_top_level(input: &str, sep: char) -> Result<Vec<&str>, ConditionSyntaxError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ConditionSyntaxError::UnbalancedParentheses(input.to_string()))?;
            }
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(ConditionSyntaxError::UnclosedQuote(input.to_string()));
    }
    if depth != 0 {
        return Err(ConditionSyntaxError::UnbalancedParentheses(input.to_string()));
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn parse_pipeline(expression: &str) -> Result<Vec<Stage>, ConditionSyntaxError> {
    if expression.trim().is_empty() {
        return Err(ConditionSyntaxError::Empty);
    }

    let mut stages = Vec::new();
    for (i, raw) in split_top_level(expression, '|')?.into_iter().enumerate() {
        let raw = raw.trim();
        let stage = if raw.starts_with("fn:") {
            Stage::Function(parse_function(raw, i == 0)?)
        } else if i == 0 {
            Stage::Operand(parse_operand(raw)?)
        } else {
            return Err(ConditionSyntaxError::MisplacedStage(raw.to_string()));
        };
        stages.push(stage);
    }

    if let Some(Stage::Function(f)) = stages.first() {
        let has_subject = matches!(f, Function::Filter { subject: Some(_), .. });
        if !has_subject {
            return Err(ConditionSyntaxError::MissingSubject);
        }
    }

    Ok(stages)
}

fn parse_function(raw: &str, first: bool) -> Result<Function, ConditionSyntaxError> {
    let body = &raw["fn:".len()..];
    let open = body
        .find('(')
        .ok_or_else(|| ConditionSyntaxError::MalformedFunction(raw.to_string()))?;
    let args_str = body[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| ConditionSyntaxError::MalformedFunction(raw.to_string()))?;
    let name = body[..open].trim();

    let args: Vec<Operand> = if args_str.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(args_str, ',')?
            .into_iter()
            .map(|a| parse_operand(a.trim()))
            .collect::<Result<_, _>>()?
    };

    match (name, args.len()) {
        ("filter", _) => parse_filter(args, first),
        ("default", 1) => args
            .into_iter()
            .next()
            .map(Function::Default)
            .ok_or_else(|| ConditionSyntaxError::WrongArity {
                function: name.to_string(),
                count: 0,
            }),
        ("lower", 0) => Ok(Function::Lower),
        ("upper", 0) => Ok(Function::Upper),
        ("default" | "lower" | "upper", count) => Err(ConditionSyntaxError::WrongArity {
            function: name.to_string(),
            count,
        }),
        _ => Err(ConditionSyntaxError::UnknownFunction(name.to_string())),
    }
}

fn parse_filter(args: Vec<Operand>, first: bool) -> Result<Function, ConditionSyntaxError> {
    let mut args = args.into_iter();
    let subject = if first { args.next() } else { None };
    if first && subject.is_none() {
        return Err(ConditionSyntaxError::MissingSubject);
    }

    let op = match args.next() {
        Some(Operand::Literal(op)) => match op.as_str() {
            "eq" => FilterOp::Eq,
            "ne" => FilterOp::Ne,
            "exists" => FilterOp::Exists,
            "like" => FilterOp::Like,
            other => return Err(ConditionSyntaxError::UnknownOperator(other.to_string())),
        },
        Some(Operand::Placeholder(_)) => return Err(ConditionSyntaxError::OperatorNotLiteral),
        None => return Err(ConditionSyntaxError::MissingOperator),
    };

    let compared = args.next();
    if args.next().is_some() {
        return Err(ConditionSyntaxError::TooManyArguments);
    }
    if compared.is_none() && op != FilterOp::Exists {
        return Err(ConditionSyntaxError::MissingComparand(format!("{:?}", op).to_lowercase()));
    }

    Ok(Function::Filter {
        subject,
        op,
        compared,
    })
}

fn parse_operand(raw: &str) -> Result<Operand, ConditionSyntaxError> {
    for q in ['\'', '"'] {
        if let Some(inner) = raw.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return Ok(Operand::Literal(inner.to_string()));
        }
    }
    parse_placeholder(raw).map(Operand::Placeholder)
}

fn parse_placeholder(raw: &str) -> Result<Placeholder, ConditionSyntaxError> {
    let (prefix, name) = raw
        .split_once(':')
        .ok_or_else(|| ConditionSyntaxError::NotAnOperand(raw.to_string()))?;

    let placeholder = match (prefix, name) {
        ("header", name) if !name.is_empty() => Placeholder::Header(name.to_string()),
        ("topic", "full") => Placeholder::Topic(TopicField::Full),
        ("topic", "namespace") => Placeholder::Topic(TopicField::Namespace),
        ("topic", "entity-name") => Placeholder::Topic(TopicField::EntityName),
        ("topic", "group") => Placeholder::Topic(TopicField::Group),
        ("topic", "channel") => Placeholder::Topic(TopicField::Channel),
        ("topic", "criterion") => Placeholder::Topic(TopicField::Criterion),
        ("topic", "action") => Placeholder::Topic(TopicField::Action),
        ("entity", "id") => Placeholder::Entity(EntityField::Id),
        ("entity", "namespace") => Placeholder::Entity(EntityField::Namespace),
        ("entity", "name") => Placeholder::Entity(EntityField::Name),
        ("connection", "id") => Placeholder::ConnectionId,
        ("signal", "type") => Placeholder::SignalType,
        ("signal", "live-command") => Placeholder::LiveCommand,
        ("signal", "live-command-response") => Placeholder::LiveCommandResponse,
        _ => return Err(ConditionSyntaxError::UnknownPlaceholder(raw.to_string())),
    };
    Ok(placeholder)
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn resolve_placeholder(placeholder: &Placeholder, ctx: &ConditionContext<'_>) -> Option<String> {
    let topic = ctx.topic_path;
    match placeholder {
        Placeholder::Header(name) => ctx.signal.headers.get(name).map(str::to_string),
        Placeholder::Topic(field) => match field {
            TopicField::Full => Some(topic.path()),
            TopicField::Namespace => Some(topic.namespace.clone()),
            TopicField::EntityName => Some(topic.entity_name.clone()),
            TopicField::Group => Some(topic.group.clone()),
            TopicField::Channel => Some(topic.channel.clone()),
            TopicField::Criterion => Some(topic.criterion.clone()),
            TopicField::Action => topic.action.clone(),
        },
        Placeholder::Entity(field) => {
            let id = classify::entity_id(ctx.signal)?;
            Some(
                match field {
                    EntityField::Id => id.as_str(),
                    EntityField::Namespace => id.namespace(),
                    EntityField::Name => id.name(),
                }
                .to_string(),
            )
        }
        Placeholder::ConnectionId => Some(ctx.connection_id.to_string()),
        Placeholder::SignalType => Some(ctx.signal.kind.clone()),
        Placeholder::LiveCommand => Some(classify::is_live_command(ctx.signal).to_string()),
        Placeholder::LiveCommandResponse => {
            Some(classify::is_live_command_response(ctx.signal).to_string())
        }
    }
}

fn resolve_operand(operand: &Operand, ctx: &ConditionContext<'_>) -> Option<String> {
    match operand {
        Operand::Literal(s) => Some(s.clone()),
        Operand::Placeholder(p) => resolve_placeholder(p, ctx),
    }
}

fn run_pipeline(stages: &[Stage], ctx: &ConditionContext<'_>) -> Option<String> {
    let mut value: Option<String> = None;
    for stage in stages {
        value = match stage {
            Stage::Operand(operand) => resolve_operand(operand, ctx),
            Stage::Function(Function::Filter {
                subject,
                op,
                compared,
            }) => {
                let subject_value = match subject {
                    Some(s) => resolve_operand(s, ctx),
                    None => value,
                };
                let compared_value = compared.as_ref().and_then(|c| resolve_operand(c, ctx));
                Some(apply_filter(*op, subject_value.as_deref(), compared_value.as_deref()).to_string())
            }
            Stage::Function(Function::Default(fallback)) => {
                value.or_else(|| resolve_operand(fallback, ctx))
            }
            Stage::Function(Function::Lower) => value.map(|v| v.to_lowercase()),
            Stage::Function(Function::Upper) => value.map(|v| v.to_uppercase()),
        };
    }
    value
}

fn apply_filter(op: FilterOp, value: Option<&str>, compared: Option<&str>) -> bool {
    match op {
        FilterOp::Eq => value.is_some() && value == compared,
        FilterOp::Ne => value != compared,
        FilterOp::Exists => {
            let expect_present = !matches!(compared, Some(c) if c.eq_ignore_ascii_case("false"));
            value.is_some() == expect_present
        }
        FilterOp::Like => match (value, compared) {
            (Some(v), Some(pattern)) => wildcard_match(pattern, v),
            _ => false,
        },
    }
}

/// Glob match with `*` (any run) and `?` (any single char).
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
