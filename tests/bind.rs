//! End-to-end binding scenarios: schema construction, token routing,
//! subcommand dispatch, deferred error aggregation, preset defaults.

use std::io::Write as _;
use std::path::PathBuf;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use smelter::errors::{ParameterError, TriggerError};
use smelter::help::help_callback;
use smelter::presets::defaults_callback;
use smelter::{
    AttrSpec, CallArgs, Command, CommandObject, Config, ConverterStore, DefaultValue, Error,
    Handler, InterfaceSpec, ObjSignature, Opt, Param, ParamSignature, ReturnSpec, TypeSpec, Value,
    split_and_expand, try_run,
};

fn tokens(toks: &[&str]) -> Vec<String> {
    toks.iter().map(|t| t.to_string()).collect()
}

/// A handler that returns its inputs as a tuple, positionals first,
/// then keyword values in declaration order.
fn echo_handler() -> Handler {
    Rc::new(|call: CallArgs| {
        let mut out = call.args;
        out.extend(call.kwargs.into_iter().map(|(_, value)| value));
        Ok(Value::Tuple(out))
    })
}

#[test]
fn simple_options_bind_typed_values() {
    let sig = ObjSignature::new()
        .param(ParamSignature::option("param1", TypeSpec::Str))
        .param(ParamSignature::option("param2", TypeSpec::Float));

    let cmd = Command::from_signature("simple", &sig, echo_handler(), Config::default()).unwrap();

    let value = try_run(cmd, &tokens(&["--param1", "x", "--param2", "1.5"])).unwrap();
    assert_eq!(
        value,
        Value::Tuple(vec![Value::Str("x".to_string()), Value::Float(1.5)]),
    );
}

#[test]
fn repeated_list_option_accumulates() {
    let sig = ObjSignature::new().param(ParamSignature::option(
        "x",
        TypeSpec::List(Box::new(TypeSpec::Int)),
    ));

    let cmd = Command::from_signature("f", &sig, echo_handler(), Config::default()).unwrap();

    let value = try_run(cmd, &tokens(&["--x", "1", "--x", "2"])).unwrap();
    assert_eq!(
        value,
        Value::Tuple(vec![Value::Seq(vec![Value::Int(1), Value::Int(2)])]),
    );
}

#[test]
fn bool_flag_with_short_triggers() {
    let build = || {
        let mut group =
            smelter::ParamGroup::new("flags", None, echo_handler()).with_omitted_name();
        group
            .add_param(Param::Opt(Opt::flag(
                "answer",
                ["-y", "--yes"],
                ["-n", "--no"],
                None,
                DefaultValue::Unset,
            )))
            .unwrap();
        group
    };

    let mut group = build();
    group.process(&tokens(&["-n"])).unwrap();
    assert_eq!(
        group.value().unwrap(),
        Value::Tuple(vec![Value::Bool(false)]),
    );

    let mut group = build();
    assert!(matches!(
        group.process(&tokens(&["-a"])),
        Err(Error::Trigger(TriggerError::Unknown(_))),
    ));
}

#[test]
fn nested_class_parameter_binds_with_prefixed_triggers() {
    let klass = ObjSignature::new()
        .param(ParamSignature::option("a", TypeSpec::Int))
        .param(ParamSignature::option("b", TypeSpec::Str));

    let sig = ObjSignature::new()
        .param(ParamSignature::option(
            "nested",
            TypeSpec::Object(smelter::ObjectSpec {
                name: "Klass".to_string(),
                sig: Rc::new(klass),
                construct: echo_handler(),
            }),
        ))
        .param(ParamSignature::option("integer", TypeSpec::Int));

    let cmd = Command::from_signature("f", &sig, echo_handler(), Config::default()).unwrap();

    let value = try_run(
        cmd,
        &tokens(&["--nested-a", "1", "--nested-b", "t", "--integer", "2"]),
    )
    .unwrap();

    assert_eq!(
        value,
        Value::Tuple(vec![
            Value::Tuple(vec![Value::Int(1), Value::Str("t".to_string())]),
            Value::Int(2),
        ]),
    );
}

#[test]
fn tokenizer_explodes_and_groups() {
    let groups: Vec<Vec<String>> = split_and_expand(["-vvf", "test", "--this", "other"])
        .iter()
        .map(<[String]>::to_vec)
        .collect();

    assert_eq!(
        groups,
        vec![
            tokens(&["-v"]),
            tokens(&["-v"]),
            tokens(&["-f", "test"]),
            tokens(&["--this", "other"]),
        ],
    );
}

#[derive(Debug)]
struct Root {
    prefix: String,
}

impl CommandObject for Root {
    fn method(&self, attr: &str) -> Option<Handler> {
        match attr {
            "example1" => {
                let prefix = self.prefix.clone();
                Some(Rc::new(move |call: CallArgs| {
                    let param1 = call
                        .kwarg("param1")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    Ok(Value::Str(format!("{prefix}{param1}")))
                }))
            }
            _ => None,
        }
    }
}

fn root_sig() -> ObjSignature {
    let interface = InterfaceSpec::new("Root").attr(AttrSpec::new(
        "example1",
        ObjSignature::new().param(ParamSignature::option("param1", TypeSpec::Str)),
    ));

    ObjSignature::new()
        .param(ParamSignature::option("prefix", TypeSpec::Str).with_default(Value::Str("".into())))
        .returns(ReturnSpec::Interface(Rc::new(interface)))
}

fn root_handler() -> Handler {
    Rc::new(|call: CallArgs| {
        Ok(Value::obj(Root {
            prefix: call
                .kwarg("prefix")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }))
    })
}

#[test]
fn leftover_tokens_resolve_to_a_subcommand() {
    let cmd = Command::from_signature("root", &root_sig(), root_handler(), Config::default())
        .unwrap();

    let value = try_run(cmd, &tokens(&["example1", "--param1", "z"])).unwrap();
    assert_eq!(value, Value::Str("z".to_string()));
}

#[test]
fn two_malformed_options_surface_together() {
    let sig = ObjSignature::new()
        .param(ParamSignature::option("a", TypeSpec::Int))
        .param(ParamSignature::option("b", TypeSpec::Int));

    let cmd = Command::from_signature("f", &sig, echo_handler(), Config::default()).unwrap();

    let Err(Error::MultiParameter(multi)) = try_run(cmd, &tokens(&["--a", "x", "--b"])) else {
        panic!("expected an aggregated parameter error");
    };

    assert_eq!(multi.errors.len(), 2);
    assert!(matches!(
        multi.errors[0].1,
        ParameterError::Invalid { .. },
    ));
    assert_eq!(multi.errors[0].0, "a");
    assert_eq!(multi.errors[1].0, "b");
}

#[test]
fn equals_form_binds_like_separate_tokens() {
    let sig = ObjSignature::new().param(ParamSignature::option("param1", TypeSpec::Str));
    let cmd = Command::from_signature("f", &sig, echo_handler(), Config::default()).unwrap();

    let value = try_run(cmd, &tokens(&["--param1=x"])).unwrap();
    assert_eq!(value, Value::Tuple(vec![Value::Str("x".to_string())]));
}

#[test]
fn help_request_carries_the_snapshot() {
    let mut config = Config::default();
    config.add_callback(help_callback());

    let sig = ObjSignature::new()
        .described("A documented command")
        .param(ParamSignature::option("a", TypeSpec::Int));
    let cmd = Command::from_signature("f", &sig, echo_handler(), config).unwrap();

    let Err(Error::HelpRequested(help)) = try_run(cmd, &tokens(&["--help"])) else {
        panic!("expected a help request");
    };

    assert_eq!(help.descr.as_deref(), Some("A documented command"));
    assert_eq!(help.opts.opts[0].processors[0].triggers, "--a");
}

#[test]
fn defaults_file_presets_lose_to_real_input() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "opts:\n  - [--a, '5']\n  - [--b, preset]\ncmds:\n  example1:\n    opts:\n      - [--param1, from-preset]\n",
    )
    .unwrap();

    let sig = ObjSignature::new()
        .param(ParamSignature::option("a", TypeSpec::Int))
        .param(ParamSignature::option("b", TypeSpec::Str));
    let mut config = Config::default();
    config.add_callback(defaults_callback());

    let cmd = Command::from_signature("f", &sig, echo_handler(), config).unwrap();

    let mut args = vec![
        "--defaults-file".to_string(),
        file.path().display().to_string(),
    ];
    args.extend(tokens(&["--b", "real"]));

    let value = try_run(cmd, &args).unwrap();
    assert_eq!(
        value,
        Value::Tuple(vec![Value::Int(5), Value::Str("real".to_string())]),
    );
}

#[test]
fn preset_sections_descend_into_subcommands() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"cmds": {{"example1": {{"opts": [["--param1", "from-preset"]]}}}}}}"#,
    )
    .unwrap();

    let mut config = Config::default();
    config.add_callback(defaults_callback());

    let cmd = Command::from_signature("root", &root_sig(), root_handler(), config).unwrap();

    let args = vec![
        "--defaults-file".to_string(),
        file.path().display().to_string(),
        "example1".to_string(),
    ];

    let value = try_run(cmd, &args).unwrap();
    assert_eq!(value, Value::Str("from-preset".to_string()));
}

#[test]
fn positional_arguments_fill_left_to_right() {
    let sig = ObjSignature::new()
        .param(ParamSignature::argument("a", TypeSpec::Int))
        .param(ParamSignature::argument("b", TypeSpec::Path));

    let cmd = Command::from_signature("f", &sig, echo_handler(), Config::default()).unwrap();

    let value = try_run(cmd, &tokens(&["1", "/a/b"])).unwrap();
    assert_eq!(
        value,
        Value::Tuple(vec![Value::Int(1), Value::Path(PathBuf::from("/a/b"))]),
    );
}

#[test]
fn converter_store_resolution_is_priority_ordered() {
    let store = ConverterStore::with_defaults();

    let union = store
        .converter(&TypeSpec::Union(vec![TypeSpec::Str, TypeSpec::Int]))
        .unwrap();

    assert_eq!(union.convert(&tokens(&["2"])).unwrap(), Value::Int(2));
    assert_eq!(
        union.convert(&tokens(&["two"])).unwrap(),
        Value::Str("two".to_string()),
    );
}
