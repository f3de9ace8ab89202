/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Condition expressions.
//!
//! ```
//! use dynamap_expressions::Condition;
//!
//! let compiled = Condition::new()
//!     .attribute("age")
//!     .not()
//!     .lt(5)
//!     .compile(None)
//!     .unwrap();
//! assert_eq!(compiled.expression, "#ca0 >= :cv0");
//! ```

use aws_sdk_dynamodb::types::AttributeValue;
use dynamap_core::marshal::infer_wire;
use dynamap_core::{AttributePath, Error, Marshaller, Schema, Value};

use crate::placeholder::{ExpressionAttributes, PlaceholderStyle, Placeholders};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `attribute_exists`
    Exists,
    /// `attribute_not_exists`
    NotExists,
    /// `begins_with`
    BeginsWith,
    /// `contains`
    Contains,
    /// `NOT contains`
    NotContains,
    /// `IN`
    In,
    /// `BETWEEN`
    Between,
}

impl Operator {
    /// The operator's logical complement, if it has one.
    pub fn complement(&self) -> Option<Operator> {
        use Operator::*;
        match self {
            Eq => Some(Ne),
            Ne => Some(Eq),
            Lt => Some(Ge),
            Ge => Some(Lt),
            Le => Some(Gt),
            Gt => Some(Le),
            Exists => Some(NotExists),
            NotExists => Some(Exists),
            Contains => Some(NotContains),
            NotContains => Some(Contains),
            BeginsWith | In | Between => None,
        }
    }

    fn type_name(&self) -> &'static str {
        use Operator::*;
        match self {
            Eq => "EQ",
            Ne => "NE",
            Lt => "LT",
            Le => "LE",
            Gt => "GT",
            Ge => "GE",
            Exists => "EXISTS",
            NotExists => "NOT_EXISTS",
            BeginsWith => "BEGINS_WITH",
            Contains => "CONTAINS",
            NotContains => "NOT_CONTAINS",
            In => "IN",
            Between => "BETWEEN",
        }
    }

    fn symbol(&self) -> Option<&'static str> {
        use Operator::*;
        match self {
            Eq => Some("="),
            Ne => Some("<>"),
            Lt => Some("<"),
            Le => Some("<="),
            Gt => Some(">"),
            Ge => Some(">="),
            _ => None,
        }
    }
}

const DANGLING_NOT: &str = "not() must be followed by an operator";

/// How a clause is joined to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

#[derive(Debug, Clone)]
enum Node {
    Clause {
        path: AttributePath,
        operator: Operator,
        values: Vec<Value>,
    },
    Group(Vec<(Connective, Node)>),
}

/// A condition expression under construction.
///
/// Builder errors, such as a `not()` before an operator without a complement or an empty `IN`
/// list, are kept and reported by [`compile`](Condition::compile).
#[derive(Debug, Clone, Default)]
pub struct Condition {
    nodes: Vec<(Connective, Node)>,
    attribute: Option<AttributePath>,
    negate: bool,
    or_next: bool,
    error: Option<String>,
}

/// The output of [`Condition::compile`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    /// The condition expression.
    pub expression: String,
    /// Placeholders used by `expression`.
    pub attributes: ExpressionAttributes,
}

impl Condition {
    /// Creates an empty condition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the attribute the next operator applies to. Dotted paths address nested values.
    pub fn attribute(mut self, name: impl Into<AttributePath>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    /// Alias of [`attribute`](Condition::attribute).
    pub fn filter(self, name: impl Into<AttributePath>) -> Self {
        self.attribute(name)
    }

    /// Joins the next clause with `AND`. This is the default.
    pub fn and(mut self) -> Self {
        self.or_next = false;
        self
    }

    /// Joins the next clause with `OR`.
    pub fn or(mut self) -> Self {
        self.or_next = true;
        self
    }

    /// Replaces the next operator with its complement.
    pub fn not(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// `attribute = value`
    pub fn eq(self, value: impl Into<Value>) -> Self {
        self.push(Operator::Eq, vec![value.into()])
    }

    /// `attribute <> value`
    pub fn ne(self, value: impl Into<Value>) -> Self {
        self.push(Operator::Ne, vec![value.into()])
    }

    /// `attribute < value`
    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.push(Operator::Lt, vec![value.into()])
    }

    /// `attribute <= value`
    pub fn le(self, value: impl Into<Value>) -> Self {
        self.push(Operator::Le, vec![value.into()])
    }

    /// `attribute > value`
    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.push(Operator::Gt, vec![value.into()])
    }

    /// `attribute >= value`
    pub fn ge(self, value: impl Into<Value>) -> Self {
        self.push(Operator::Ge, vec![value.into()])
    }

    /// `attribute_exists (attribute)`
    pub fn exists(self) -> Self {
        self.push(Operator::Exists, Vec::new())
    }

    /// `begins_with (attribute, value)`
    pub fn begins_with(self, value: impl Into<Value>) -> Self {
        self.push(Operator::BeginsWith, vec![value.into()])
    }

    /// `contains (attribute, value)`
    pub fn contains(self, value: impl Into<Value>) -> Self {
        self.push(Operator::Contains, vec![value.into()])
    }

    /// `attribute IN (values...)`
    pub fn is_in<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(Operator::In, values.into_iter().map(Into::into).collect())
    }

    /// `attribute BETWEEN low AND high`
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push(Operator::Between, vec![low.into(), high.into()])
    }

    /// Adds a parenthesized sub-condition.
    pub fn group<F>(mut self, build: F) -> Self
    where
        F: FnOnce(Condition) -> Condition,
    {
        let inner = build(Condition::new());
        if let Some(message) = inner.error {
            self.fail(message);
        } else if inner.negate {
            self.fail(DANGLING_NOT.to_string());
        }
        let connective = self.take_connective();
        self.nodes.push((connective, Node::Group(inner.nodes)));
        self
    }

    /// True when no clause has been added.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn take_connective(&mut self) -> Connective {
        let connective = if self.or_next {
            Connective::Or
        } else {
            Connective::And
        };
        self.or_next = false;
        connective
    }

    fn push(mut self, operator: Operator, values: Vec<Value>) -> Self {
        let operator = if std::mem::take(&mut self.negate) {
            match operator.complement() {
                Some(complement) => complement,
                None => {
                    self.fail(format!("{} can not follow not()", operator.type_name()));
                    return self;
                }
            }
        } else {
            operator
        };
        let Some(path) = self.attribute.clone() else {
            self.fail(format!("{} must follow an attribute selection", operator.type_name()));
            return self;
        };
        if operator == Operator::In && values.is_empty() {
            self.fail("IN requires at least one value".to_string());
            return self;
        }
        let connective = self.take_connective();
        self.nodes.push((
            connective,
            Node::Clause {
                path,
                operator,
                values,
            },
        ));
        self
    }

    /// Keeps the first builder error.
    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    /// Compiles the condition with `#ca`/`:cv` placeholders.
    ///
    /// When `schema` declares the attribute a value is compared against, the value is converted
    /// with that attribute's type; otherwise its wire type is inferred.
    pub fn compile(&self, schema: Option<&Schema>) -> Result<CompiledCondition, Error> {
        if let Some(message) = &self.error {
            return Err(Error::invalid_parameter(message.clone()));
        }
        if self.negate {
            return Err(Error::invalid_parameter(DANGLING_NOT));
        }
        let mut placeholders = Placeholders::new(PlaceholderStyle::Condition);
        let expression = render_nodes(&self.nodes, &mut placeholders, schema)?;
        Ok(CompiledCondition {
            expression,
            attributes: placeholders.into_attributes(),
        })
    }
}

fn render_nodes(
    nodes: &[(Connective, Node)],
    placeholders: &mut Placeholders,
    schema: Option<&Schema>,
) -> Result<String, Error> {
    let mut out = String::new();
    for (i, (connective, node)) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str(match connective {
                Connective::And => " AND ",
                Connective::Or => " OR ",
            });
        }
        match node {
            Node::Clause {
                path,
                operator,
                values,
            } => out.push_str(&render_clause(path, *operator, values, placeholders, schema)?),
            Node::Group(inner) => {
                out.push('(');
                out.push_str(&render_nodes(inner, placeholders, schema)?);
                out.push(')');
            }
        }
    }
    Ok(out)
}

fn render_clause(
    path: &AttributePath,
    operator: Operator,
    values: &[Value],
    placeholders: &mut Placeholders,
    schema: Option<&Schema>,
) -> Result<String, Error> {
    let name = placeholders.path(path);
    let mut value_placeholders = Vec::with_capacity(values.len());
    for value in values {
        let av = condition_value(path, operator, value, schema)?;
        value_placeholders.push(placeholders.value(av));
    }
    let v = |i: usize| value_placeholders[i].as_str();
    let rendered = match operator {
        Operator::Exists => format!("attribute_exists ({})", name),
        Operator::NotExists => format!("attribute_not_exists ({})", name),
        Operator::BeginsWith => format!("begins_with ({}, {})", name, v(0)),
        Operator::Contains => format!("contains ({}, {})", name, v(0)),
        Operator::NotContains => format!("NOT contains ({}, {})", name, v(0)),
        Operator::In => format!("{} IN ({})", name, value_placeholders.join(", ")),
        Operator::Between => format!("{} BETWEEN {} AND {}", name, v(0), v(1)),
        comparison => format!(
            "{} {} {}",
            name,
            comparison.symbol().unwrap_or("="),
            v(0)
        ),
    };
    Ok(rendered)
}

fn condition_value(
    path: &AttributePath,
    operator: Operator,
    value: &Value,
    schema: Option<&Schema>,
) -> Result<AttributeValue, Error> {
    let element_operand = matches!(operator, Operator::Contains | Operator::NotContains);
    match schema.and_then(|s| s.attribute_at(path).map(|a| (s, a))) {
        Some((schema, attribute)) if !element_operand => {
            Marshaller::new(schema).to_wire_at(attribute, value, path)
        }
        _ => infer_wire(value, path),
    }
}
