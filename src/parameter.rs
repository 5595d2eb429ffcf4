/*!
Bindable leaves: options (trigger-activated) and positional arguments.

Both kinds follow the same tri-state protocol. Structural failures — a
missing or unrecognized trigger — abort the bind step immediately.
Everything that merely makes *this parameter* unusable (too few value
tokens, a conversion failure, an illegal repeat) is **deferred**: stored
on the leaf, surfaced only when the value is read, so one pass over the
argument vector collects every broken parameter instead of stopping at
the first.

A leaf is *unset* iff it has no bound value and no deferred error.
*/

use std::rc::Rc;

use crate::convert::Convert;
use crate::errors::{Error, ParameterError, TriggerError};
use crate::group::ParamGroup;
use crate::processor::{ApplyError, TriggerProcessor};
use crate::signature::ParamKind;
use crate::value::{DefaultValue, Value};

/// Mutable binding state shared by both leaf kinds.
#[derive(Debug, Clone, Default)]
struct BindState {
    value: Option<Value>,
    errors: Vec<ParameterError>,
    bound_groups: usize,
}

/**
A trigger-activated parameter.

An option owns an ordered list of [`TriggerProcessor`]s, each with its
own trigger subset; the option's final trigger set is the union over its
processors, adjusted by the group-derived prefix. Under a prefix only
`--long` triggers survive, rewritten to `--prefix-rest`; short triggers
would be ambiguous between sibling groups and are dropped.
*/
#[derive(Debug, Clone)]
pub struct Opt {
    name: String,
    descr: Option<String>,
    kind: ParamKind,
    prefix: String,
    default: DefaultValue,
    processors: Vec<TriggerProcessor>,
    state: BindState,
}

impl Opt {
    pub fn new(
        name: &str,
        descr: Option<String>,
        default: DefaultValue,
        processors: Vec<TriggerProcessor>,
    ) -> Self {
        Self {
            name: name.to_string(),
            descr,
            kind: ParamKind::PositionalOrKeyword,
            prefix: String::new(),
            default,
            processors,
            state: BindState::default(),
        }
    }

    /// A boolean flag option: positive triggers bind `true`, negative
    /// triggers bind `false`, later uses replace earlier ones.
    pub fn flag<P, N, S, T>(
        name: &str,
        pos_triggers: P,
        neg_triggers: N,
        descr: Option<String>,
        default: DefaultValue,
    ) -> Self
    where
        P: IntoIterator<Item = S>,
        N: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self::new(
            name,
            descr,
            default,
            vec![
                TriggerProcessor::constant(pos_triggers, Value::Bool(true)),
                TriggerProcessor::constant(neg_triggers, Value::Bool(false)),
            ],
        )
    }

    pub fn with_kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn descr(&self) -> Option<&str> {
        self.descr.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn default(&self) -> &DefaultValue {
        &self.default
    }

    pub fn set_default(&mut self, value: Value) {
        self.default = DefaultValue::Set(value);
    }

    #[inline]
    #[must_use]
    pub fn processors(&self) -> &[TriggerProcessor] {
        &self.processors
    }

    pub(crate) fn set_prefix(&mut self, prefix: String) {
        self.prefix = prefix;
    }

    /// Adjust one raw trigger for this option's prefix. Returns `None`
    /// for triggers that do not survive prefixing.
    fn adjusted(&self, trigger: &str) -> Option<String> {
        if self.prefix.is_empty() {
            Some(trigger.to_string())
        } else {
            trigger
                .strip_prefix("--")
                .map(|rest| format!("--{}-{}", self.prefix, rest))
        }
    }

    /// The final (prefix-adjusted) trigger set, unioned over processors.
    #[must_use]
    pub fn final_triggers(&self) -> Vec<String> {
        self.processors
            .iter()
            .flat_map(|processor| processor.triggers())
            .filter_map(|trigger| self.adjusted(trigger))
            .collect()
    }

    /// The final triggers of each processor, aligned with
    /// [`processors`][Self::processors]; used by help rendering.
    #[must_use]
    pub fn final_trigger_sets(&self) -> Vec<Vec<String>> {
        self.processors
            .iter()
            .map(|processor| {
                processor
                    .triggers()
                    .iter()
                    .filter_map(|trigger| self.adjusted(trigger))
                    .collect()
            })
            .collect()
    }

    fn processor_for(&self, trigger: &str) -> Option<usize> {
        self.processors.iter().position(|processor| {
            processor
                .triggers()
                .iter()
                .any(|raw| self.adjusted(raw).is_some_and(|t| t == trigger))
        })
    }

    fn defer(&mut self, error: ParameterError) {
        self.state.errors.push(error);
    }

    /**
    Bind one token group to this option.

    `tokens[0]` must be one of the final triggers (a structural error
    otherwise, consuming nothing). Arity and conversion failures are
    deferred on the leaf and an empty leftover is returned, letting the
    overall pass continue. On success, returns the tokens the processor
    did not consume.
    */
    pub fn process(&mut self, tokens: &[String]) -> Result<Vec<String>, TriggerError> {
        let Some(first) = tokens.first() else {
            return Err(TriggerError::Expected);
        };

        let Some(index) = self.processor_for(first) else {
            return Err(TriggerError::Unknown(first.clone()));
        };

        let leftover = match self.processors[index].bind(&tokens[1..]) {
            Ok(leftover) => leftover,
            Err(source) => {
                self.defer(ParameterError::Invalid {
                    name: self.name.clone(),
                    source,
                });
                return Ok(Vec::new());
            }
        };

        match self.processors[index].apply(self.state.value.as_ref()) {
            Ok(value) => {
                self.state.value = Some(value);
                self.state.bound_groups += 1;
            }
            Err(ApplyError::Repeated) => self.defer(ParameterError::Repeated {
                name: self.name.clone(),
            }),
            Err(ApplyError::Convert(source)) => self.defer(ParameterError::Invalid {
                name: self.name.clone(),
                source,
            }),
        }

        Ok(leftover)
    }

    #[must_use]
    pub fn unset(&self) -> bool {
        self.state.value.is_none() && self.state.errors.is_empty()
    }

    /// Token groups successfully bound to this option so far.
    #[inline]
    #[must_use]
    pub fn bound_groups(&self) -> usize {
        self.state.bound_groups
    }

    pub(crate) fn deferred(&self) -> &[ParameterError] {
        &self.state.errors
    }

    /// Read the bound value: the first deferred error if any, the
    /// accumulated value, the default, or an unspecified-option error.
    pub fn value(&self) -> Result<Value, ParameterError> {
        if let Some(error) = self.state.errors.first() {
            return Err(error.clone());
        }

        if let Some(value) = &self.state.value {
            return Ok(value.clone());
        }

        match self.default.get() {
            Some(default) => Ok(default.clone()),
            None => Err(ParameterError::UnspecifiedOption {
                name: self.name.clone(),
            }),
        }
    }
}

/**
A positional parameter: bound from the front of a trigger-less token
group according to its converter's arity. A variadic argument consumes
its whole group; a fixed-arity argument takes exactly its share and the
rest spills over to the next unset argument.
*/
#[derive(Debug, Clone)]
pub struct PosArg {
    name: String,
    descr: Option<String>,
    kind: ParamKind,
    default: DefaultValue,
    converter: Rc<dyn Convert>,
    state: BindState,
}

impl PosArg {
    pub fn new(
        name: &str,
        descr: Option<String>,
        default: DefaultValue,
        converter: Rc<dyn Convert>,
    ) -> Self {
        Self {
            name: name.to_string(),
            descr,
            kind: ParamKind::PositionalOnly,
            default,
            converter,
            state: BindState::default(),
        }
    }

    pub fn with_kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn descr(&self) -> Option<&str> {
        self.descr.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn default(&self) -> &DefaultValue {
        &self.default
    }

    pub fn set_default(&mut self, value: Value) {
        self.default = DefaultValue::Set(value);
    }

    #[inline]
    #[must_use]
    pub fn converter(&self) -> &Rc<dyn Convert> {
        &self.converter
    }

    fn defer(&mut self, error: ParameterError) {
        self.state.errors.push(error);
    }

    /// Bind tokens positionally. All failures are deferred; returns the
    /// tokens this argument did not claim.
    pub fn process(&mut self, tokens: &[String]) -> Vec<String> {
        if self.state.value.is_some() {
            self.defer(ParameterError::Repeated {
                name: self.name.clone(),
            });
            return tokens.to_vec();
        }

        let arity = self.converter.arity();

        let (bound, leftover) = if arity.is_variadic() {
            (tokens, &[][..])
        } else {
            match arity.split(tokens) {
                Ok(split) => split,
                Err(source) => {
                    self.defer(ParameterError::Invalid {
                        name: self.name.clone(),
                        source,
                    });
                    return Vec::new();
                }
            }
        };

        match self.converter.convert(bound) {
            Ok(value) => {
                self.state.value = Some(value);
                self.state.bound_groups += 1;
            }
            Err(source) => self.defer(ParameterError::Invalid {
                name: self.name.clone(),
                source,
            }),
        }

        leftover.to_vec()
    }

    #[must_use]
    pub fn unset(&self) -> bool {
        self.state.value.is_none() && self.state.errors.is_empty()
    }

    /// Token groups successfully bound to this argument so far.
    #[inline]
    #[must_use]
    pub fn bound_groups(&self) -> usize {
        self.state.bound_groups
    }

    pub(crate) fn deferred(&self) -> &[ParameterError] {
        &self.state.errors
    }

    pub fn value(&self) -> Result<Value, ParameterError> {
        if let Some(error) = self.state.errors.first() {
            return Err(error.clone());
        }

        if let Some(value) = &self.state.value {
            return Ok(value.clone());
        }

        match self.default.get() {
            Some(default) => Ok(default.clone()),
            None => Err(ParameterError::UnspecifiedArgument {
                name: self.name.clone(),
            }),
        }
    }
}

/**
Anything a parameter group can contain: an option, a positional
argument, or a nested group. The three share the uniform
`process(tokens) -> leftover` contract.
*/
#[derive(Debug, Clone)]
pub enum Param {
    Opt(Opt),
    Arg(PosArg),
    Group(ParamGroup),
}

impl Param {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Opt(opt) => opt.name(),
            Self::Arg(arg) => arg.name(),
            Self::Group(group) => group.name(),
        }
    }

    #[must_use]
    pub fn descr(&self) -> Option<&str> {
        match self {
            Self::Opt(opt) => opt.descr(),
            Self::Arg(arg) => arg.descr(),
            Self::Group(group) => group.descr(),
        }
    }

    #[must_use]
    pub fn unset(&self) -> bool {
        match self {
            Self::Opt(opt) => opt.unset(),
            Self::Arg(arg) => arg.unset(),
            Self::Group(group) => group.unset(),
        }
    }

    pub fn set_default(&mut self, value: Value) {
        match self {
            Self::Opt(opt) => opt.set_default(value),
            Self::Arg(arg) => arg.set_default(value),
            Self::Group(group) => group.set_default(value),
        }
    }

    /// Resolve this parameter's value, whatever its shape.
    pub fn value(&self) -> Result<Value, Error> {
        match self {
            Self::Opt(opt) => opt.value().map_err(Error::from),
            Self::Arg(arg) => arg.value().map_err(Error::from),
            Self::Group(group) => group.value(),
        }
    }

    #[must_use]
    pub fn as_opt(&self) -> Option<&Opt> {
        match self {
            Self::Opt(opt) => Some(opt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_arg(&self) -> Option<&PosArg> {
        match self {
            Self::Arg(arg) => Some(arg),
            _ => None,
        }
    }

    pub fn as_arg_mut(&mut self) -> Option<&mut PosArg> {
        match self {
            Self::Arg(arg) => Some(arg),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_group(&self) -> Option<&ParamGroup> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut ParamGroup> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }
}
