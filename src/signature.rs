/*!
The schema contract between the binding engine and whatever produces
parameter descriptions.

The engine never inspects callables itself. Anything that can describe
its parameters as an [`ObjSignature`] — a hand-written builder chain,
generated code, a config file — gets a fully wired [`ParamGroup`] out of
[`group_from_signature`].
*/

use crate::command::ReturnSpec;
use crate::convert::ConverterStore;
use crate::errors::{Error, SchemaError};
use crate::group::{Handler, ParamGroup};
use crate::parameter::{Opt, Param, PosArg};
use crate::processor::TriggerProcessor;
use crate::value::{DefaultValue, TypeSpec, Value};

/// The role a parameter plays in its callable's parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    KeywordOnly,
    VariadicPositional,
    /// Accepted in the schema for completeness, rejected at group
    /// construction.
    VariadicKeyword,
}

/// How a parameter surfaces on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliKind {
    Option,
    Argument,
}

/// One parameter of a callable, as declared.
#[derive(Debug, Clone)]
pub struct ParamSignature {
    pub name: String,
    pub kind: ParamKind,
    pub cli_kind: CliKind,
    pub descr: Option<String>,
    pub default: DefaultValue,
    pub ty: TypeSpec,
}

impl ParamSignature {
    /// A keyword parameter exposed as `--name`.
    pub fn option(name: &str, ty: TypeSpec) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::PositionalOrKeyword,
            cli_kind: CliKind::Option,
            descr: None,
            default: DefaultValue::Unset,
            ty,
        }
    }

    /// A positional-only parameter, bound without a trigger.
    pub fn argument(name: &str, ty: TypeSpec) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::PositionalOnly,
            cli_kind: CliKind::Argument,
            descr: None,
            default: DefaultValue::Unset,
            ty,
        }
    }

    /// A variadic positional parameter; `element` is the per-item type.
    pub fn variadic(name: &str, element: TypeSpec) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamKind::VariadicPositional,
            cli_kind: CliKind::Argument,
            descr: None,
            default: DefaultValue::Unset,
            ty: element,
        }
    }

    pub fn keyword_only(mut self) -> Self {
        self.kind = ParamKind::KeywordOnly;
        self
    }

    pub fn described(mut self, descr: &str) -> Self {
        self.descr = Some(descr.to_string());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = DefaultValue::Set(value);
        self
    }
}

/// The full declared surface of one callable.
#[derive(Debug, Clone, Default)]
pub struct ObjSignature {
    pub short_descr: Option<String>,
    pub long_descr: Option<String>,
    pub params: Vec<ParamSignature>,
    pub return_spec: ReturnSpec,
}

impl ObjSignature {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn described(mut self, short: &str) -> Self {
        self.short_descr = Some(short.to_string());
        self
    }

    pub fn long_described(mut self, long: &str) -> Self {
        self.long_descr = Some(long.to_string());
        self
    }

    pub fn param(mut self, param: ParamSignature) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, return_spec: ReturnSpec) -> Self {
        self.return_spec = return_spec;
        self
    }
}

/// Parameter names become triggers in kebab case.
#[must_use]
pub fn kebab(name: &str) -> String {
    name.replace('_', "-")
}

fn build_param(sig: &ParamSignature, store: &ConverterStore) -> Result<Param, Error> {
    if sig.kind == ParamKind::VariadicKeyword {
        return Err(SchemaError::VariadicKeyword {
            name: sig.name.clone(),
        }
        .into());
    }

    let positional = sig.cli_kind == CliKind::Argument
        || matches!(
            sig.kind,
            ParamKind::PositionalOnly | ParamKind::VariadicPositional,
        );

    if positional {
        // a variadic argument converts the whole run, so the declared
        // per-item type is lifted into a list
        let ty = match sig.kind {
            ParamKind::VariadicPositional => TypeSpec::List(Box::new(sig.ty.clone())),
            _ => sig.ty.clone(),
        };

        let converter = store.converter(&ty)?;
        return Ok(Param::Arg(
            PosArg::new(&sig.name, sig.descr.clone(), sig.default.clone(), converter)
                .with_kind(sig.kind),
        ));
    }

    let trigger = format!("--{}", kebab(&sig.name));

    let opt = match &sig.ty {
        TypeSpec::Bool => Opt::flag(
            &sig.name,
            [trigger],
            [format!("--no-{}", kebab(&sig.name))],
            sig.descr.clone(),
            sig.default.clone(),
        ),
        TypeSpec::List(inner) => {
            // repeated uses accumulate; each use converts one element
            let converter = store.converter(inner)?;
            Opt::new(
                &sig.name,
                sig.descr.clone(),
                sig.default.clone(),
                vec![TriggerProcessor::append([trigger], converter)],
            )
        }
        TypeSpec::Object(object) => {
            let mut nested = build_group(
                &sig.name,
                sig.descr.clone().or_else(|| object.sig.short_descr.clone()),
                &object.sig,
                object.construct.clone(),
                store,
                false,
            )?;
            if let DefaultValue::Set(default) = &sig.default {
                nested.set_default(default.clone());
            }
            return Ok(Param::Group(nested));
        }
        other => {
            let converter = store.converter(other)?;
            Opt::new(
                &sig.name,
                sig.descr.clone(),
                sig.default.clone(),
                vec![TriggerProcessor::store([trigger], converter)],
            )
        }
    };

    Ok(Param::Opt(opt.with_kind(sig.kind)))
}

fn build_group(
    name: &str,
    descr: Option<String>,
    sig: &ObjSignature,
    handler: Handler,
    store: &ConverterStore,
    top_level: bool,
) -> Result<ParamGroup, Error> {
    let mut group = ParamGroup::new(name, descr, handler).with_return(sig.return_spec.clone());

    if top_level {
        group = group.with_omitted_name();
    }

    for param in &sig.params {
        group.add_param(build_param(param, store)?)?;
    }

    Ok(group)
}

/**
Construct the parameter group for a callable.

Options get a `--kebab-name` trigger (bool options additionally their
automatic `--no-` negative), list options accumulate one element per
use, object-typed parameters become nested groups whose options carry a
`--name-` prefix, and positional parameters bind in declaration order.
*/
pub fn group_from_signature(
    name: &str,
    sig: &ObjSignature,
    handler: Handler,
    store: &ConverterStore,
) -> Result<ParamGroup, Error> {
    build_group(name, sig.short_descr.clone(), sig, handler, store, true)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::group::CallArgs;
    use crate::value::ObjectSpec;

    fn tokens(toks: &[&str]) -> Vec<String> {
        toks.iter().map(|t| t.to_string()).collect()
    }

    fn echo_handler() -> Handler {
        Rc::new(|call: CallArgs| {
            let mut out = call.args;
            out.extend(call.kwargs.into_iter().map(|(_, value)| value));
            Ok(Value::Tuple(out))
        })
    }

    #[test]
    fn options_get_kebab_triggers() {
        let sig = ObjSignature::new()
            .param(ParamSignature::option("some_value", TypeSpec::Int))
            .param(ParamSignature::option("flag", TypeSpec::Bool));

        let group =
            group_from_signature("test", &sig, echo_handler(), &ConverterStore::with_defaults())
                .unwrap();

        let mut triggers = group.final_triggers();
        triggers.sort();
        assert_eq!(triggers, vec!["--flag", "--no-flag", "--some-value"]);
    }

    #[test]
    fn bool_negative_trigger_binds_false() {
        let sig = ObjSignature::new().param(ParamSignature::option("flag", TypeSpec::Bool));
        let mut group =
            group_from_signature("test", &sig, echo_handler(), &ConverterStore::with_defaults())
                .unwrap();

        group.process(&tokens(&["--no-flag"])).unwrap();
        assert_eq!(
            group.value().unwrap(),
            Value::Tuple(vec![Value::Bool(false)]),
        );
    }

    #[test]
    fn list_options_append_per_use() {
        let sig = ObjSignature::new().param(ParamSignature::option(
            "x",
            TypeSpec::List(Box::new(TypeSpec::Int)),
        ));
        let mut group =
            group_from_signature("test", &sig, echo_handler(), &ConverterStore::with_defaults())
                .unwrap();

        group.process(&tokens(&["--x", "1"])).unwrap();
        group.process(&tokens(&["--x", "2"])).unwrap();

        assert_eq!(
            group.value().unwrap(),
            Value::Tuple(vec![Value::Seq(vec![Value::Int(1), Value::Int(2)])]),
        );
    }

    #[test]
    fn variadic_positional_lifts_to_a_list() {
        let sig = ObjSignature::new()
            .param(ParamSignature::argument("first", TypeSpec::Int))
            .param(ParamSignature::variadic("rest", TypeSpec::Int));
        let mut group =
            group_from_signature("test", &sig, echo_handler(), &ConverterStore::with_defaults())
                .unwrap();

        let leftover = group.process(&tokens(&["1", "2", "3"])).unwrap();
        let leftover = group.process(&leftover).unwrap();
        assert_eq!(leftover, Vec::<String>::new());

        // the variadic argument's elements are splatted into the args
        assert_eq!(
            group.value().unwrap(),
            Value::Tuple(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        );
    }

    #[test]
    fn variadic_keyword_is_rejected() {
        let mut param = ParamSignature::option("kw", TypeSpec::Int);
        param.kind = ParamKind::VariadicKeyword;
        let sig = ObjSignature::new().param(param);

        assert!(matches!(
            group_from_signature("test", &sig, echo_handler(), &ConverterStore::with_defaults()),
            Err(Error::Schema(SchemaError::VariadicKeyword { .. })),
        ));
    }

    #[test]
    fn object_parameters_become_prefixed_groups() {
        let klass = ObjSignature::new()
            .param(ParamSignature::option("a", TypeSpec::Int))
            .param(
                ParamSignature::option("b", TypeSpec::Str).with_default(Value::Str("test".into())),
            );

        let sig = ObjSignature::new()
            .param(ParamSignature::option(
                "nested",
                TypeSpec::Object(ObjectSpec {
                    name: "Klass".to_string(),
                    sig: Rc::new(klass),
                    construct: echo_handler(),
                }),
            ))
            .param(ParamSignature::option("integer", TypeSpec::Int));

        let mut group =
            group_from_signature("test", &sig, echo_handler(), &ConverterStore::with_defaults())
                .unwrap();

        group.process(&tokens(&["--nested-a", "1"])).unwrap();
        group.process(&tokens(&["--nested-b", "t"])).unwrap();
        group.process(&tokens(&["--integer", "2"])).unwrap();

        assert_eq!(
            group.value().unwrap(),
            Value::Tuple(vec![
                Value::Tuple(vec![Value::Int(1), Value::Str("t".to_string())]),
                Value::Int(2),
            ]),
        );
    }
}
