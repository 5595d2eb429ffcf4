//! A small CLI with nested options, subcommands and preset defaults.
//!
//! Try:
//!
//! ```text
//! smelter-demo --help
//! smelter-demo --global-param1 /tmp --global-param2 a --global-param2 b \
//!     example1 --param1 hello
//! smelter-demo --defaults-file defaults.yaml example2
//! ```

use std::path::PathBuf;
use std::rc::Rc;

use smelter::help::{help_callback, noop_callback, show_bindings_callback};
use smelter::presets::defaults_callback;
use smelter::{
    AttrSpec, CallArgs, Command, CommandObject, Config, Handler, InterfaceSpec, ObjSignature,
    ParamSignature, ReturnSpec, TypeSpec, Value,
};

#[derive(Debug)]
struct App {
    global_param1: PathBuf,
    global_param2: Vec<String>,
}

impl CommandObject for App {
    fn method(&self, attr: &str) -> Option<Handler> {
        match attr {
            "example1" => {
                let base = self.global_param1.clone();
                Some(Rc::new(move |call: CallArgs| {
                    let param1 = call
                        .kwarg("param1")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    println!("example1: {param1} (base {})", base.display());
                    Ok(Value::None)
                }))
            }
            "example2" => {
                let tags = self.global_param2.clone();
                Some(Rc::new(move |call: CallArgs| {
                    let param = call.kwarg("param").and_then(Value::as_int).unwrap_or(0);
                    println!("example2: {param} (tags {tags:?})");
                    Ok(Value::None)
                }))
            }
            _ => None,
        }
    }
}

fn app_signature() -> ObjSignature {
    let interface = InterfaceSpec::new("App")
        .attr(
            AttrSpec::new(
                "example1",
                ObjSignature::new()
                    .param(ParamSignature::option("param1", TypeSpec::Str).described("A string")),
            )
            .described("First example"),
        )
        .attr(
            AttrSpec::new(
                "example2",
                ObjSignature::new().param(
                    ParamSignature::option("param", TypeSpec::Int)
                        .with_default(Value::Int(0))
                        .described("An integer"),
                ),
            )
            .described("Second example"),
        );

    ObjSignature::new()
        .described("Demonstration of subcommands")
        .param(
            ParamSignature::option("global_param1", TypeSpec::Path).described("A base directory"),
        )
        .param(
            ParamSignature::option(
                "global_param2",
                TypeSpec::List(Box::new(TypeSpec::Str)),
            )
            .with_default(Value::Seq(Vec::new()))
            .described("Repeatable tags"),
        )
        .returns(ReturnSpec::Interface(Rc::new(interface)))
}

fn build_app(call: CallArgs) -> Result<Value, smelter::HandlerError> {
    let global_param1 = call
        .kwarg("global_param1")
        .and_then(Value::as_path)
        .ok_or("global_param1 must be a path")?
        .to_path_buf();

    let global_param2 = call
        .kwarg("global_param2")
        .and_then(Value::as_seq)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    Ok(Value::obj(App {
        global_param1,
        global_param2,
    }))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = Config::default();
    config.add_callback(help_callback());
    config.add_callback(noop_callback());
    config.add_callback(show_bindings_callback());
    config.add_callback(defaults_callback());

    let cmd = Command::from_signature("smelter-demo", &app_signature(), Rc::new(build_app), config)?;

    let value = smelter::run(cmd);
    if value != Value::None {
        println!("{value}");
    }

    Ok(())
}
