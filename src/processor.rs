/*!
Trigger processors: the strategies an option delegates to when one of its
triggers fires.

A processor owns its own subset of trigger strings and splits its work in
two steps, mirroring the two ways binding can fail:

- [`bind`][TriggerProcessor::bind] consumes the value tokens the
  converter's arity demands and stashes them, returning the leftover;
- [`apply`][TriggerProcessor::apply] converts the stashed tokens and
  combines the result with whatever the option accumulated so far.

The combination policy is the processor kind: `Store` replaces once (a
second bind is an error unless `replace` was requested), `Append` grows a
sequence across repeated uses, and `Constant` ignores tokens entirely and
always wins.
*/

use core::fmt;
use std::rc::Rc;

use crate::convert::{Arity, Convert};
use crate::errors::ConvertError;
use crate::value::Value;

/// How a processor turns bound tokens into the new accumulated value.
#[derive(Debug, Clone)]
pub enum ProcessorKind {
    Store {
        converter: Rc<dyn Convert>,
        replace: bool,
    },
    Append {
        converter: Rc<dyn Convert>,
    },
    Constant {
        value: Value,
    },
}

/// Why [`TriggerProcessor::apply`] refused to produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApplyError {
    Convert(ConvertError),
    Repeated,
}

impl From<ConvertError> for ApplyError {
    fn from(error: ConvertError) -> Self {
        Self::Convert(error)
    }
}

#[derive(Debug, Clone)]
pub struct TriggerProcessor {
    triggers: Vec<String>,
    kind: ProcessorKind,
    bound: Vec<String>,
}

impl TriggerProcessor {
    pub fn new<I, S>(triggers: I, kind: ProcessorKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            triggers: triggers.into_iter().map(Into::into).collect(),
            kind,
            bound: Vec::new(),
        }
    }

    /// A single-value processor: converts once, errors on reuse.
    pub fn store<I, S>(triggers: I, converter: Rc<dyn Convert>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            triggers,
            ProcessorKind::Store {
                converter,
                replace: false,
            },
        )
    }

    /// Like [`store`][Self::store], but a later use silently replaces
    /// the earlier value.
    pub fn store_replacing<I, S>(triggers: I, converter: Rc<dyn Convert>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            triggers,
            ProcessorKind::Store {
                converter,
                replace: true,
            },
        )
    }

    /// Appends one converted element per use, accumulating a sequence.
    pub fn append<I, S>(triggers: I, converter: Rc<dyn Convert>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(triggers, ProcessorKind::Append { converter })
    }

    /// Consumes no value tokens and always yields `value` (boolean
    /// positive/negative triggers are two of these on one option).
    pub fn constant<I, S>(triggers: I, value: Value) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(triggers, ProcessorKind::Constant { value })
    }

    #[inline]
    #[must_use]
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    /// The token arity this processor consumes after its trigger.
    #[must_use]
    pub fn arity(&self) -> Arity {
        match &self.kind {
            ProcessorKind::Store { converter, .. } | ProcessorKind::Append { converter } => {
                converter.arity()
            }
            ProcessorKind::Constant { .. } => Arity::fixed(0),
        }
    }

    /// Short type description for help output.
    #[must_use]
    pub fn type_descr(&self) -> String {
        match &self.kind {
            ProcessorKind::Store { converter, .. } => converter.spec().to_string(),
            ProcessorKind::Append { converter } => format!("{}*", converter.spec()),
            ProcessorKind::Constant { value } => value.kind_str().to_string(),
        }
    }

    /// Consume this processor's value tokens (the trigger itself has
    /// already been stripped by the owning option) and stash them.
    /// Returns the tokens left over for re-queueing.
    pub(crate) fn bind(&mut self, tokens: &[String]) -> Result<Vec<String>, ConvertError> {
        match &self.kind {
            ProcessorKind::Store { converter, .. } | ProcessorKind::Append { converter } => {
                let (bound, leftover) = converter.arity().split(tokens)?;
                self.bound = bound.to_vec();
                Ok(leftover.to_vec())
            }
            ProcessorKind::Constant { .. } => {
                self.bound.clear();
                Ok(tokens.to_vec())
            }
        }
    }

    /// Convert the stashed tokens and combine them with the accumulated
    /// value.
    pub(crate) fn apply(&self, current: Option<&Value>) -> Result<Value, ApplyError> {
        match &self.kind {
            ProcessorKind::Store { converter, replace } => {
                if current.is_some() && !replace {
                    return Err(ApplyError::Repeated);
                }
                Ok(converter.convert(&self.bound)?)
            }
            ProcessorKind::Append { converter } => {
                let element = converter.convert(&self.bound)?;
                Ok(match current {
                    Some(Value::Seq(items)) => {
                        let mut items = items.clone();
                        items.push(element);
                        Value::Seq(items)
                    }
                    _ => Value::Seq(vec![element]),
                })
            }
            ProcessorKind::Constant { value } => Ok(value.clone()),
        }
    }
}

impl fmt::Display for TriggerProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use joinery::JoinableIterator;

        write!(f, "{}", self.triggers.iter().join_with(", "))
    }
}
