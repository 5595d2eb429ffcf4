/*!
The top-level driver: feed the whole argument vector through a command
chain and hand back the final executed value.

The state machine is simple. A command binds what it can; leftover
tokens whose head names a known subcommand cause a descent (the current
group executes, and the chosen attribute of its result becomes the child
command); leftover tokens that name nothing are fatal; an exhausted
input resolves the innermost command. Superseded commands are kept in an
arena so the chain of `prev` indices can reconstruct the call hierarchy
without owning back-pointers.
*/

use std::io::{self, Write as _};
use std::process;

use crate::command::Command;
use crate::errors::Error;
use crate::printers::{print_help, write_error};
use crate::value::Value;

/// A finished invocation: the resolved value plus the superseded
/// command chain, for callers that want to inspect the hierarchy.
#[derive(Debug)]
pub struct Resolved {
    pub value: Value,
    pub chain: Vec<Command>,
    pub last: Command,
}

/// Reconstruct the subcommand path that led to `last`, following the
/// non-owning `prev` indices through the arena.
#[must_use]
pub fn hierarchy(chain: &[Command], last: &Command) -> Vec<String> {
    let mut names = Vec::new();
    let mut prev = last.prev;

    while let Some(index) = prev {
        let Some(cmd) = chain.get(index) else { break };
        if let Some(name) = cmd.history().last() {
            names.insert(0, name.clone());
        }
        prev = cmd.prev;
    }

    names
}

/// Process every input token against a command chain, descending into
/// subcommands as they are selected, and resolve the innermost command.
pub fn process_to_end(root: Command, args: &[String]) -> Result<Resolved, Error> {
    let mut chain: Vec<Command> = Vec::new();
    let mut cmd = root;
    let mut input = args.to_vec();

    loop {
        if !input.is_empty() {
            input = cmd.process(&input)?;
        }

        if input.is_empty() {
            let value = cmd.group.value()?;
            return Ok(Resolved {
                value,
                chain,
                last: cmd,
            });
        }

        let name = input.remove(0);

        if cmd.subcommands().is_empty() {
            let mut unprocessed = vec![name];
            unprocessed.extend(input);
            return Err(Error::UnprocessedArguments(unprocessed));
        }

        let mut child = cmd.build_subcommand(&name)?;
        tracing::debug!(subcommand = %name, path = ?hierarchy(&chain, &cmd), "descending");

        cmd.note_descent(&name);
        child.prev = Some(chain.len());
        chain.push(cmd);
        cmd = child;
    }
}

/// Like [`process_to_end`], returning only the value.
pub fn try_run(root: Command, args: &[String]) -> Result<Value, Error> {
    process_to_end(root, args).map(|resolved| resolved.value)
}

/**
Run against the process argument vector, mapping failures the way a CLI
user expects: help requests render to stdout and exit zero, usage errors
get a one-line message on stderr and exit code 2, anything else is a
real fault and exits 1 with its error chain.
*/
pub fn run(root: Command) -> Value {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match try_run(root, &args) {
        Ok(value) => value,
        Err(Error::HelpRequested(help)) => {
            let mut out = io::stdout().lock();
            let _ = print_help(&mut out, &help);
            let _ = out.flush();
            process::exit(0);
        }
        Err(error) if error.is_usage_error() => {
            let _ = write_error(&mut io::stderr().lock(), &error);
            process::exit(2);
        }
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "error: {error}");

            let mut source = std::error::Error::source(&error);
            while let Some(cause) = source {
                let _ = writeln!(err, "  caused by: {cause}");
                source = cause.source();
            }

            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::command::{
        AttrSpec, CommandObject, Config, InterfaceSpec, ReturnSpec,
    };
    use crate::group::{CallArgs, Handler};
    use crate::signature::{ObjSignature, ParamSignature};
    use crate::value::TypeSpec;

    fn tokens(toks: &[&str]) -> Vec<String> {
        toks.iter().map(|t| t.to_string()).collect()
    }

    #[derive(Debug)]
    struct Subcommands {
        integer: i64,
    }

    impl CommandObject for Subcommands {
        fn method(&self, attr: &str) -> Option<Handler> {
            match attr {
                "example1" => {
                    let base = self.integer;
                    Some(Rc::new(move |call: CallArgs| {
                        let param = call
                            .kwarg("param1")
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        Ok(Value::Str(format!("{base}:{param}")))
                    }))
                }
                _ => None,
            }
        }
    }

    fn root_command() -> Command {
        let interface = Rc::new(InterfaceSpec::new("Subcommands").attr(AttrSpec::new(
            "example1",
            ObjSignature::new().param(ParamSignature::option("param1", TypeSpec::Str)),
        )));

        let sig = ObjSignature::new()
            .param(ParamSignature::option("integer", TypeSpec::Int))
            .returns(ReturnSpec::Interface(interface));

        Command::from_signature(
            "test",
            &sig,
            Rc::new(|call: CallArgs| {
                Ok(Value::obj(Subcommands {
                    integer: call.kwarg("integer").and_then(Value::as_int).unwrap_or(0),
                }))
            }),
            Config::default(),
        )
        .unwrap()
    }

    #[test]
    fn leftover_tokens_select_a_subcommand() {
        let resolved = process_to_end(
            root_command(),
            &tokens(&["--integer", "1", "example1", "--param1", "z"]),
        )
        .unwrap();

        assert_eq!(resolved.value, Value::Str("1:z".to_string()));
        assert_eq!(hierarchy(&resolved.chain, &resolved.last), tokens(&["example1"]));
    }

    #[test]
    fn unknown_leftover_is_fatal() {
        let err = try_run(
            root_command(),
            &tokens(&["--integer", "1", "bogus"]),
        )
        .unwrap_err();

        assert!(matches!(err, Error::UnknownSubcommand { .. }));
    }

    #[test]
    fn leftovers_without_subcommands_are_unprocessed() {
        let sig = ObjSignature::new().param(ParamSignature::option("a", TypeSpec::Int));
        let cmd = Command::from_signature(
            "test",
            &sig,
            Rc::new(|_: CallArgs| Ok(Value::None)),
            Config::default(),
        )
        .unwrap();

        let err = try_run(cmd, &tokens(&["--a", "1", "stray"])).unwrap_err();
        assert!(matches!(err, Error::UnprocessedArguments(stray) if stray == tokens(&["stray"])));
    }
}
