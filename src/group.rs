/*!
Parameter groups: the recursive container corresponding to one callable's
full parameter set.

A group owns named [`Param`]s — options, positional arguments, nested
groups — plus the handler it will invoke once everything is resolved. It
computes the merged trigger map across all nesting levels (flat: dispatch
goes straight to the leaf, a nested group's own lookup is not re-entered),
routes positional token groups to the first unset argument in declaration
order, and aggregates every deferred leaf error when its value is read.
*/

use core::fmt;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;

use crate::command::ReturnSpec;
use crate::errors::{
    DuplicatedTriggerError, Error, MultiParameterError, ParameterError, SchemaError, TriggerError,
};
use crate::parameter::Param;
use crate::signature::ParamKind;
use crate::value::{DefaultValue, Value};

/// The values gathered for one handler invocation.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
}

impl CallArgs {
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    #[must_use]
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// The wrapped callable of a group. Handler failures are wrapped
/// distinctly from parameter errors, with the causal chain preserved.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Handler = Rc<dyn Fn(CallArgs) -> Result<Value, HandlerError>>;

#[derive(Clone)]
pub struct ParamGroup {
    name: String,
    descr: Option<String>,
    prefix: String,
    omit_name_in_child_prefix: bool,
    params: Vec<Param>,
    handler: Handler,
    return_spec: ReturnSpec,
    default: DefaultValue,
    bound_groups: usize,
    trigger_cache: Option<HashMap<String, Vec<usize>>>,
}

impl ParamGroup {
    pub fn new(name: &str, descr: Option<String>, handler: Handler) -> Self {
        Self {
            name: name.to_string(),
            descr,
            prefix: String::new(),
            omit_name_in_child_prefix: false,
            params: Vec::new(),
            handler,
            return_spec: ReturnSpec::default(),
            default: DefaultValue::Unset,
            bound_groups: 0,
            trigger_cache: None,
        }
    }

    /// Skip this group's own name when deriving its children's trigger
    /// prefix. A top-level group does this so that its options keep
    /// their plain `--name` triggers.
    pub fn with_omitted_name(mut self) -> Self {
        self.omit_name_in_child_prefix = true;
        self
    }

    pub fn with_return(mut self, return_spec: ReturnSpec) -> Self {
        self.return_spec = return_spec;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = default;
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
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[inline]
    #[must_use]
    pub fn return_spec(&self) -> &ReturnSpec {
        &self.return_spec
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Token groups successfully routed through this group so far.
    #[inline]
    #[must_use]
    pub fn bound_groups(&self) -> usize {
        self.bound_groups
    }

    pub fn set_default(&mut self, value: Value) {
        self.default = DefaultValue::Set(value);
    }

    /// The trigger prefix this group hands to its children.
    #[must_use]
    pub fn child_prefix(&self) -> String {
        if self.omit_name_in_child_prefix {
            self.prefix.clone()
        } else if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}-{}", self.prefix, self.name)
        }
    }

    /// Re-prefix this group and, recursively, everything below it.
    pub fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
        self.propagate_prefix();
    }

    /// Rename this group. The new name flows into every nested trigger.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.propagate_prefix();
    }

    fn propagate_prefix(&mut self) {
        let child_prefix = self.child_prefix();

        for param in &mut self.params {
            match param {
                Param::Opt(opt) => opt.set_prefix(child_prefix.clone()),
                Param::Group(group) => group.set_prefix(&child_prefix),
                Param::Arg(_) => {}
            }
        }

        self.trigger_cache = None;
    }

    /**
    Add a parameter to this group.

    The new member is re-prefixed to fit, its name must be unique within
    the group, and the merged trigger namespace is re-validated so that a
    collision anywhere in the tree fails here, at construction, never at
    bind time.
    */
    pub fn add_param(&mut self, mut param: Param) -> Result<(), SchemaError> {
        if self.params.iter().any(|p| p.name() == param.name()) {
            return Err(SchemaError::DuplicatedName {
                group: self.name.clone(),
                name: param.name().to_string(),
            });
        }

        let child_prefix = self.child_prefix();
        match &mut param {
            Param::Opt(opt) => opt.set_prefix(child_prefix),
            Param::Group(group) => group.set_prefix(&child_prefix),
            Param::Arg(_) => {}
        }

        self.params.push(param);
        self.trigger_cache = None;

        if let Err(error) = self.compute_trigger_map() {
            self.params.pop();
            return Err(SchemaError::DuplicatedTrigger(error));
        }

        Ok(())
    }

    fn leaf_name<'a>(params: &'a [Param], path: &[usize]) -> &'a str {
        match path {
            [] => "",
            [index] => params.get(*index).map(Param::name).unwrap_or(""),
            [index, rest @ ..] => match params.get(*index) {
                Some(Param::Group(group)) => Self::leaf_name(&group.params, rest),
                Some(param) => param.name(),
                None => "",
            },
        }
    }

    /// The merged trigger map: every final trigger of every option, at
    /// every nesting level, pointing at the path of its leaf.
    fn compute_trigger_map(&self) -> Result<HashMap<String, Vec<usize>>, DuplicatedTriggerError> {
        fn insert(
            map: &mut HashMap<String, Vec<usize>>,
            params: &[Param],
            trigger: String,
            path: Vec<usize>,
        ) -> Result<(), DuplicatedTriggerError> {
            match map.entry(trigger) {
                Entry::Occupied(entry) => Err(DuplicatedTriggerError {
                    trigger: entry.key().clone(),
                    first: ParamGroup::leaf_name(params, entry.get()).to_string(),
                    second: ParamGroup::leaf_name(params, &path).to_string(),
                }),
                Entry::Vacant(slot) => {
                    slot.insert(path);
                    Ok(())
                }
            }
        }

        let mut map = HashMap::new();

        for (i, param) in self.params.iter().enumerate() {
            match param {
                Param::Opt(opt) => {
                    for trigger in opt.final_triggers() {
                        insert(&mut map, &self.params, trigger, vec![i])?;
                    }
                }
                Param::Group(group) => {
                    for (trigger, mut path) in group.compute_trigger_map()? {
                        path.insert(0, i);
                        insert(&mut map, &self.params, trigger, path)?;
                    }
                }
                Param::Arg(_) => {}
            }
        }

        Ok(map)
    }

    /// Every final trigger known below this group.
    #[must_use]
    pub fn final_triggers(&self) -> Vec<String> {
        self.compute_trigger_map()
            .map(|map| map.into_keys().collect())
            .unwrap_or_default()
    }

    fn process_at(&mut self, path: &[usize], tokens: &[String]) -> Result<Vec<String>, TriggerError> {
        let Some((&head, rest)) = path.split_first() else {
            return Err(TriggerError::Unknown(
                tokens.first().cloned().unwrap_or_default(),
            ));
        };

        let result = match self.params.get_mut(head) {
            Some(Param::Opt(opt)) if rest.is_empty() => opt.process(tokens),
            Some(Param::Group(group)) if !rest.is_empty() => group.process_at(rest, tokens),
            _ => Err(TriggerError::Unknown(
                tokens.first().cloned().unwrap_or_default(),
            )),
        };

        if result.is_ok() {
            self.bound_groups += 1;
        }

        result
    }

    fn first_unset_arg(&mut self) -> Option<&mut crate::parameter::PosArg> {
        self.params.iter_mut().find_map(|param| match param {
            Param::Arg(arg) if arg.unset() => Some(arg),
            Param::Group(group) => group.first_unset_arg(),
            _ => None,
        })
    }

    /**
    Route one token group.

    A dash-led group is dispatched through the merged trigger map
    straight to the owning option leaf; an unknown trigger is a
    structural error. A positional group goes to the first unset
    argument in declaration order, nested arguments included. If no
    argument is unset the tokens come back *completely unconsumed* —
    the caller decides whether that head token is a subcommand.
    */
    pub fn process(&mut self, tokens: &[String]) -> Result<Vec<String>, Error> {
        let Some(first) = tokens.first() else {
            return Ok(Vec::new());
        };

        if first.starts_with('-') {
            if self.trigger_cache.is_none() {
                self.trigger_cache = Some(self.compute_trigger_map()?);
            }

            let path = self
                .trigger_cache
                .as_ref()
                .and_then(|map| map.get(first))
                .cloned()
                .ok_or_else(|| TriggerError::Unknown(first.clone()))?;

            return self.process_at(&path, tokens).map_err(Error::from);
        }

        match self.first_unset_arg() {
            Some(arg) => {
                let leftover = arg.process(tokens);
                self.bound_groups += 1;
                Ok(leftover)
            }
            None => Ok(tokens.to_vec()),
        }
    }

    /// True while no descendant leaf has a bound value or deferred error.
    #[must_use]
    pub fn unset(&self) -> bool {
        self.params.iter().all(Param::unset)
    }

    /// Positional arguments declared directly at this level (nested ones
    /// excluded); a command with subcommands must not have any.
    #[must_use]
    pub fn has_own_positionals(&self) -> bool {
        self.params
            .iter()
            .any(|param| matches!(param, Param::Arg(_)))
    }

    /// Find a member by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|param| param.name() == name)
    }

    /// Find a member by name, for mutation. Conservatively invalidates
    /// the trigger cache, since the caller may re-trigger the leaf.
    pub fn param_mut(&mut self, name: &str) -> Option<&mut Param> {
        self.trigger_cache = None;
        self.params.iter_mut().find(|param| param.name() == name)
    }

    /// Walk a dotted path (`nested.a`) down the hierarchy.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Param> {
        match path.split_once('.') {
            None => self.param(path),
            Some((head, rest)) => self.param(head)?.as_group()?.lookup(rest),
        }
    }

    pub fn lookup_mut(&mut self, path: &str) -> Option<&mut Param> {
        self.trigger_cache = None;
        match path.split_once('.') {
            None => self.param_mut(path),
            Some((head, rest)) => self.param_mut(head)?.as_group_mut()?.lookup_mut(rest),
        }
    }

    pub(crate) fn params_mut(&mut self) -> &mut [Param] {
        self.trigger_cache = None;
        &mut self.params
    }

    /// Collect every deferred error below this group, leaf reads
    /// included, with dotted paths.
    fn gather(
        &self,
        args: &mut Vec<Value>,
        kwargs: &mut Vec<(String, Value)>,
        failures: &mut Vec<(String, ParameterError)>,
    ) -> Result<(), Error> {
        fn all_deferred(
            name: &str,
            deferred: &[ParameterError],
            failures: &mut Vec<(String, ParameterError)>,
        ) {
            failures.extend(
                deferred
                    .iter()
                    .cloned()
                    .map(|error| (name.to_string(), error)),
            );
        }

        for param in &self.params {
            match param {
                Param::Arg(arg) if !arg.deferred().is_empty() => {
                    all_deferred(arg.name(), arg.deferred(), failures);
                }
                Param::Arg(arg) => match arg.value() {
                    Ok(Value::Seq(items)) if arg.kind() == ParamKind::VariadicPositional => {
                        args.extend(items);
                    }
                    Ok(value) => args.push(value),
                    Err(error) => failures.push((arg.name().to_string(), error)),
                },
                Param::Opt(opt) if !opt.deferred().is_empty() => {
                    all_deferred(opt.name(), opt.deferred(), failures);
                }
                Param::Opt(opt) => match opt.value() {
                    Ok(value) => kwargs.push((opt.name().to_string(), value)),
                    Err(error) => failures.push((opt.name().to_string(), error)),
                },
                Param::Group(group) => match group.value() {
                    Ok(value) => kwargs.push((group.name().to_string(), value)),
                    Err(Error::MultiParameter(multi)) => {
                        failures.extend(multi.errors.into_iter().map(|(path, error)| {
                            (format!("{}.{}", group.name(), path), error)
                        }));
                    }
                    Err(other) => return Err(other),
                },
            }
        }

        Ok(())
    }

    /**
    Resolve this group: gather every member's value and invoke the
    wrapped handler with them.

    If the group is still completely unset and carries a default, the
    default is returned and nothing is invoked. If any member is in
    error state the handler is *not* invoked; instead every deferred
    error is raised together as a [`MultiParameterError`], so one run
    reports all malformed parameters at once.
    */
    pub fn value(&self) -> Result<Value, Error> {
        if self.unset() {
            if let Some(default) = self.default.get() {
                return Ok(default.clone());
            }
        }

        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        let mut failures = Vec::new();

        self.gather(&mut args, &mut kwargs, &mut failures)?;

        if !failures.is_empty() {
            return Err(MultiParameterError { errors: failures }.into());
        }

        (self.handler)(CallArgs { args, kwargs }).map_err(|source| Error::Invoke {
            name: self.name.clone(),
            source,
        })
    }
}

impl fmt::Debug for ParamGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamGroup")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("params", &self.params)
            .field("default", &self.default)
            .field("bound_groups", &self.bound_groups)
            .finish_non_exhaustive()
    }
}
