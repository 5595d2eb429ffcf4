/*!
Commands: a parameter group plus the subcommand surface derived from its
declared return interface.

One `Command` exists per level of subcommand nesting. Processing drives
the group over the tokenizer's deque until either everything is consumed
or a token group comes back untouched — at which point the leftover head
is a candidate subcommand name. Descending executes the current group
and binds the chosen attribute of the resulting object as the child
command's handler.

Eager callbacks (`--help`, `--defaults-file`, the `--0` delimiter) are
consulted before regular dispatch and consume their declared arity.
*/

use core::fmt;
use std::rc::Rc;

use smelter_tokens::split_and_expand;

use crate::convert::{Arity, ConverterStore};
use crate::errors::{Error, ParameterError, SchemaError};
use crate::group::{Handler, ParamGroup};
use crate::presets::{self, PresetConfig};
use crate::signature::{ObjSignature, group_from_signature, kebab};
use crate::value::Value;

/**
The executed result of a parameter group, as seen by the command layer.

Subcommand *names* come statically from the [`InterfaceSpec`] a group
declares as its return; the object produced at runtime only has to hand
out a bound handler per attribute.
*/
pub trait CommandObject: fmt::Debug {
    /// The handler for one of the declared attributes, bound to this
    /// object. `None` if the attribute is not actually available.
    fn method(&self, attr: &str) -> Option<Handler>;
}

/// What a group's handler is declared to produce.
#[derive(Debug, Clone, Default)]
pub enum ReturnSpec {
    /// Nothing of further interest; no subcommands.
    #[default]
    Unit,
    /// A plain value; no subcommands.
    Value(crate::value::TypeSpec),
    /// An object whose attributes become subcommands.
    Interface(Rc<InterfaceSpec>),
}

/// The attribute surface of a returned object.
#[derive(Debug, Clone)]
pub struct InterfaceSpec {
    pub name: String,
    pub short_descr: Option<String>,
    pub attrs: Vec<AttrSpec>,
}

impl InterfaceSpec {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            short_descr: None,
            attrs: Vec::new(),
        }
    }

    pub fn described(mut self, descr: &str) -> Self {
        self.short_descr = Some(descr.to_string());
        self
    }

    pub fn attr(mut self, attr: AttrSpec) -> Self {
        self.attrs.push(attr);
        self
    }
}

/// One attribute of an interface: the method signature a subcommand
/// binds against.
#[derive(Debug, Clone)]
pub struct AttrSpec {
    pub name: String,
    pub descr: Option<String>,
    pub sig: ObjSignature,
}

impl AttrSpec {
    #[must_use]
    pub fn new(name: &str, sig: ObjSignature) -> Self {
        Self {
            name: name.to_string(),
            descr: None,
            sig,
        }
    }

    pub fn described(mut self, descr: &str) -> Self {
        self.descr = Some(descr.to_string());
        self
    }
}

/// A derived subcommand: the kebab-cased CLI name and the attribute it
/// resolves to.
#[derive(Debug, Clone)]
pub struct Subcommand {
    pub name: String,
    pub attr: String,
    pub descr: Option<String>,
}

/// Everything shared down a command chain: the converter store and the
/// eager callbacks.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: ConverterStore,
    pub callbacks: Vec<CliCallback>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: ConverterStore::with_defaults(),
            callbacks: Vec::new(),
        }
    }
}

impl Config {
    pub fn add_callback(&mut self, callback: CliCallback) {
        self.callbacks.push(callback);
    }
}

pub type CallbackAction = dyn Fn(&mut Command, &[String]) -> Result<(), Error>;

/**
An eager trigger handled ahead of regular parameter dispatch, such as
`--help`. Consumes its trigger plus the declared arity of value tokens;
anything further is re-queued like any other leftover.
*/
#[derive(Clone)]
pub struct CliCallback {
    triggers: Vec<String>,
    descr: String,
    arity: Arity,
    action: Rc<CallbackAction>,
}

impl CliCallback {
    pub fn new<I, S>(
        triggers: I,
        descr: &str,
        arity: Arity,
        action: impl Fn(&mut Command, &[String]) -> Result<(), Error> + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            triggers: triggers.into_iter().map(Into::into).collect(),
            descr: descr.to_string(),
            arity,
            action: Rc::new(action),
        }
    }

    #[inline]
    #[must_use]
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    #[inline]
    #[must_use]
    pub fn descr(&self) -> &str {
        &self.descr
    }

    fn matches(&self, token: &str) -> bool {
        self.triggers.iter().any(|trigger| trigger == token)
    }

    fn execute(&self, cmd: &mut Command, tokens: &[String]) -> Result<Vec<String>, Error> {
        let used = self
            .arity
            .used(tokens.len() - 1)
            .map_err(|source| ParameterError::Invalid {
                name: tokens[0].clone(),
                source,
            })?;

        (self.action)(cmd, &tokens[1..1 + used])?;
        Ok(tokens[1 + used..].to_vec())
    }
}

impl fmt::Debug for CliCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliCallback")
            .field("triggers", &self.triggers)
            .field("descr", &self.descr)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Command {
    pub group: ParamGroup,
    pub config: Config,
    subcommands: Vec<Subcommand>,
    local_callbacks: Vec<CliCallback>,
    history: Vec<String>,
    /// Arena index of the superseded parent command, if any. Purely a
    /// navigational link for hierarchy reconstruction; ownership lives
    /// with the driver's chain.
    pub prev: Option<usize>,
    /// Preset defaults still applicable from this command downwards.
    pub presets: Option<PresetConfig>,
}

impl Command {
    /**
    Wrap a fully-built group.

    The subcommand table is derived from the group's return interface.
    A group that exposes its own positional arguments cannot also have
    subcommands — a bare token would be ambiguous between the two.
    */
    pub fn new(group: ParamGroup, config: Config) -> Result<Self, SchemaError> {
        let subcommands = match group.return_spec() {
            ReturnSpec::Interface(interface) => interface
                .attrs
                .iter()
                .map(|attr| Subcommand {
                    name: kebab(&attr.name),
                    attr: attr.name.clone(),
                    descr: attr.descr.clone(),
                })
                .collect(),
            _ => Vec::new(),
        };

        if group.has_own_positionals() && !subcommands.is_empty() {
            return Err(SchemaError::ArgumentsWithSubcommands);
        }

        Ok(Self {
            group,
            config,
            subcommands,
            local_callbacks: Vec::new(),
            history: Vec::new(),
            prev: None,
            presets: None,
        })
    }

    /// Build the group from a signature and wrap it in one step.
    pub fn from_signature(
        name: &str,
        sig: &ObjSignature,
        handler: Handler,
        config: Config,
    ) -> Result<Self, Error> {
        let group = group_from_signature(name, sig, handler, &config.store)?;
        Self::new(group, config).map_err(Error::from)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.group.name()
    }

    #[inline]
    #[must_use]
    pub fn subcommands(&self) -> &[Subcommand] {
        &self.subcommands
    }

    pub fn subcommand_names(&self) -> impl Iterator<Item = &str> {
        self.subcommands.iter().map(|sub| sub.name.as_str())
    }

    /// Tokens consumed by this command so far, subcommand descents
    /// included.
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Callbacks that apply to this command only.
    pub fn add_callback(&mut self, callback: CliCallback) {
        self.local_callbacks.push(callback);
    }

    /// Every eager callback in effect here: shared ones first, then the
    /// command-local ones.
    pub fn callbacks(&self) -> impl Iterator<Item = &CliCallback> {
        self.config.callbacks.iter().chain(&self.local_callbacks)
    }

    fn record(&mut self, input: &[String], leftover: &[String]) {
        if !leftover.is_empty() {
            let tail_start = input.len().saturating_sub(leftover.len());
            if input[tail_start..] != *leftover {
                tracing::warn!(
                    ?input,
                    ?leftover,
                    "non-processed arguments changed during processing",
                );
            }
        }

        let consumed = input.len().saturating_sub(leftover.len());
        self.history.extend_from_slice(&input[..consumed]);
    }

    pub(crate) fn note_descent(&mut self, name: &str) {
        self.history.push(name.to_string());
    }

    /**
    Bind as much of `args` as this command can.

    Token groups are consumed front to back; eager callbacks win over
    regular dispatch; leftover tokens are re-queued at the front. The
    pass ends early when a group comes back completely untouched — the
    remaining flattened tokens are returned so the caller can try them
    as a subcommand selection.
    */
    pub fn process(&mut self, args: &[String]) -> Result<Vec<String>, Error> {
        let mut splitter = split_and_expand(args.iter().map(String::as_str));
        let callbacks: Vec<CliCallback> = self
            .config
            .callbacks
            .iter()
            .chain(&self.local_callbacks)
            .cloned()
            .collect();

        while let Some(group_tokens) = splitter.next_group() {
            let matched = group_tokens
                .first()
                .and_then(|first| callbacks.iter().find(|cb| cb.matches(first)));

            if let Some(callback) = matched {
                let leftover = callback.execute(self, &group_tokens)?;
                self.record(&group_tokens, &leftover);
                splitter.requeue(leftover);
            } else {
                let leftover = self.group.process(&group_tokens)?;
                self.record(&group_tokens, &leftover);

                if leftover.len() == group_tokens.len() {
                    splitter.requeue(leftover);
                    return Ok(splitter.into_flat());
                }

                splitter.requeue(leftover);
            }
        }

        Ok(Vec::new())
    }

    /**
    Construct the command for one of the derived subcommands.

    This requires the current group to be fully resolved: its handler
    runs, and the chosen attribute of the resulting object becomes the
    child's handler. Preset-default sections for the subcommand descend
    with it.
    */
    pub fn build_subcommand(&self, name: &str) -> Result<Command, Error> {
        let Some(sub) = self.subcommands.iter().find(|sub| sub.name == name) else {
            return Err(Error::UnknownSubcommand {
                name: name.to_string(),
                expected: self.subcommand_names().map(str::to_string).collect(),
            });
        };

        let ReturnSpec::Interface(interface) = self.group.return_spec() else {
            return Err(Error::SubcommandTarget {
                name: self.group.name().to_string(),
            });
        };
        let interface = Rc::clone(interface);

        let Value::Obj(object) = self.group.value()? else {
            return Err(Error::SubcommandTarget {
                name: self.group.name().to_string(),
            });
        };

        let attr = interface
            .attrs
            .iter()
            .find(|attr| attr.name == sub.attr)
            .ok_or_else(|| Error::SubcommandTarget {
                name: sub.attr.clone(),
            })?;

        let handler = object
            .0
            .method(&sub.attr)
            .ok_or_else(|| Error::SubcommandTarget {
                name: sub.attr.clone(),
            })?;

        let group = group_from_signature(&sub.name, &attr.sig, handler, &self.config.store)?;
        let mut child = Command::new(group, self.config.clone())?;

        if let Some(config) = &self.presets {
            if let Some(sub_config) = config.cmds.get(name) {
                presets::apply(&mut child.group, sub_config)?;
                child.presets = Some(sub_config.clone());
            }
        }

        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::group::CallArgs;
    use crate::signature::ParamSignature;
    use crate::value::TypeSpec;

    fn tokens(toks: &[&str]) -> Vec<String> {
        toks.iter().map(|t| t.to_string()).collect()
    }

    #[derive(Debug)]
    struct Pair {
        integer: i64,
        string: String,
    }

    impl CommandObject for Pair {
        fn method(&self, attr: &str) -> Option<Handler> {
            match attr {
                "show_integer" => {
                    let integer = self.integer;
                    Some(Rc::new(move |_| Ok(Value::Int(integer))))
                }
                "show_string" => {
                    let string = self.string.clone();
                    Some(Rc::new(move |_| Ok(Value::Str(string.clone()))))
                }
                _ => None,
            }
        }
    }

    fn pair_interface() -> Rc<InterfaceSpec> {
        Rc::new(
            InterfaceSpec::new("Pair")
                .attr(AttrSpec::new("show_integer", ObjSignature::new()))
                .attr(AttrSpec::new("show_string", ObjSignature::new())),
        )
    }

    fn pair_sig() -> ObjSignature {
        ObjSignature::new()
            .param(ParamSignature::option("integer", TypeSpec::Int))
            .param(ParamSignature::option("string", TypeSpec::Str))
            .returns(ReturnSpec::Interface(pair_interface()))
    }

    fn pair_handler() -> Handler {
        Rc::new(|call: CallArgs| {
            Ok(Value::obj(Pair {
                integer: call.kwarg("integer").and_then(Value::as_int).unwrap_or(0),
                string: call
                    .kwarg("string")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }))
        })
    }

    #[test]
    fn subcommand_names_are_kebab_cased() {
        let cmd =
            Command::from_signature("test", &pair_sig(), pair_handler(), Config::default())
                .unwrap();

        let names: Vec<&str> = cmd.subcommand_names().collect();
        assert_eq!(names, vec!["show-integer", "show-string"]);
    }

    #[test]
    fn positionals_and_subcommands_are_mutually_exclusive() {
        let sig = pair_sig().param(ParamSignature::argument("pos", TypeSpec::Str));

        assert!(matches!(
            Command::from_signature("test", &sig, pair_handler(), Config::default()),
            Err(Error::Schema(SchemaError::ArgumentsWithSubcommands)),
        ));
    }

    #[test]
    fn descent_binds_the_attribute_of_the_executed_object() {
        let mut cmd =
            Command::from_signature("test", &pair_sig(), pair_handler(), Config::default())
                .unwrap();

        let leftover = cmd
            .process(&tokens(&["--integer", "1", "--string", "x", "show-integer"]))
            .unwrap();
        assert_eq!(leftover, tokens(&["show-integer"]));

        let child = cmd.build_subcommand("show-integer").unwrap();
        assert_eq!(child.group.value().unwrap(), Value::Int(1));
    }

    #[test]
    fn unknown_subcommand_lists_the_expected_names() {
        let mut cmd =
            Command::from_signature("test", &pair_sig(), pair_handler(), Config::default())
                .unwrap();
        cmd.process(&tokens(&["--integer", "1", "--string", "x"]))
            .unwrap();

        let Err(Error::UnknownSubcommand { name, expected }) = cmd.build_subcommand("nope") else {
            panic!("expected an unknown-subcommand error");
        };
        assert_eq!(name, "nope");
        assert_eq!(expected, tokens(&["show-integer", "show-string"]));
    }

    #[test]
    fn callbacks_run_before_dispatch() {
        let mut config = Config::default();
        config.add_callback(CliCallback::new(
            ["--0"],
            "Works as a delimiter; no other operation",
            Arity::fixed(0),
            |_, _| Ok(()),
        ));

        let mut cmd = Command::from_signature(
            "test",
            &ObjSignature::new().param(ParamSignature::option("a", TypeSpec::Int)),
            Rc::new(|call: CallArgs| Ok(call.kwarg("a").cloned().unwrap_or(Value::None))),
            config,
        )
        .unwrap();

        let leftover = cmd.process(&tokens(&["--0", "--a", "1"])).unwrap();
        assert_eq!(leftover, Vec::<String>::new());
        assert_eq!(cmd.group.value().unwrap(), Value::Int(1));
    }
}
