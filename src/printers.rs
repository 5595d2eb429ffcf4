/*!
Plain-text rendering of help snapshots and error messages.

Overall structure:

```text
DESCRIPTION

Synopsis:
  command [OPTIONS] ARGS

Arguments:
  <input>  path
        Input file

Options:
  --count <int>  [default: 3]
        How many

nested:
  --nested-a <int>
```
*/

use std::fmt::Display;
use std::io;

use indent_write::io::IndentWriter;
use joinery::JoinableIterator;
use lazy_format::lazy_format;

use crate::errors::Error;
use crate::help::{ArgHelp, CbHelp, CommandHelp, OptHelp, OptionGroupHelp};

const WRAP_WIDTH: usize = 64;

/// Write a section: a newline, the `header`, then an indented `body`.
fn section<O: io::Write + ?Sized, T>(
    out: &mut O,
    header: &str,
    body: impl FnOnce(IndentWriter<&mut O>) -> io::Result<T>,
) -> io::Result<T> {
    writeln!(out, "\n{header}:")?;
    body(IndentWriter::new("  ", out))
}

/// Write an optional section, only if the iterator is not empty.
fn maybe_section<O: io::Write + ?Sized, I: IntoIterator>(
    out: &mut O,
    header: &str,
    items: I,
    body: impl Fn(&mut IndentWriter<&mut O>, I::Item) -> io::Result<()>,
) -> io::Result<()> {
    let mut items = items.into_iter();

    match items.next() {
        None => Ok(()),
        Some(first) => section(out, header, |mut out| {
            body(&mut out, first)?;
            items.try_for_each(|item| body(&mut out, item))
        }),
    }
}

/// Print an item line, then its wrapped description indented below it.
fn describe(
    out: &mut (impl io::Write + ?Sized),
    item: impl Display,
    descr: &str,
) -> io::Result<()> {
    writeln!(out, "{item}")?;

    if !descr.is_empty() {
        let mut indented = IndentWriter::new("      ", out);
        writeln!(indented, "{}", textwrap::fill(descr, WRAP_WIDTH))?;
    }

    Ok(())
}

fn print_arg(out: &mut (impl io::Write + ?Sized), arg: &ArgHelp) -> io::Result<()> {
    let line = lazy_format!("<{name}>  {ty}", name = arg.name, ty = arg.type_descr);

    if arg.default.is_empty() {
        describe(out, line, &arg.descr)
    } else {
        let line = lazy_format!("{line}  [default: {default}]", default = arg.default);
        describe(out, line, &arg.descr)
    }
}

fn print_opt(out: &mut (impl io::Write + ?Sized), opt: &OptHelp) -> io::Result<()> {
    for (i, processor) in opt.processors.iter().enumerate() {
        let line = lazy_format!(
            "{triggers} <{ty}>",
            triggers = processor.triggers,
            ty = processor.type_descr,
        );

        // default and description belong to the option as a whole;
        // they are attached to the first processor row only
        if i > 0 {
            writeln!(out, "{line}")?;
        } else if opt.default.is_empty() {
            describe(out, line, &opt.descr)?;
        } else {
            let line = lazy_format!("{line}  [default: {default}]", default = opt.default);
            describe(out, line, &opt.descr)?;
        }
    }

    Ok(())
}

fn print_opt_group(
    out: &mut dyn io::Write,
    group: &OptionGroupHelp,
    top_level: bool,
) -> io::Result<()> {
    if top_level {
        maybe_section(out, "Options", &group.opts, |out, opt| print_opt(out, opt))?;
    } else if !group.opts.is_empty() || group.descr.is_some() {
        let header = group.name.as_deref().unwrap_or("Options");
        section(out, header, |mut out| {
            if let Some(descr) = &group.descr {
                writeln!(out, "{}", textwrap::fill(descr, WRAP_WIDTH))?;
            }
            group
                .opts
                .iter()
                .try_for_each(|opt| print_opt(&mut out, opt))
        })?;
    }

    group
        .groups
        .iter()
        .try_for_each(|nested| print_opt_group(out, nested, false))
}

fn print_callback(out: &mut (impl io::Write + ?Sized), callback: &CbHelp) -> io::Result<()> {
    describe(out, &callback.triggers, &callback.descr)
}

/// Render a full help snapshot.
pub fn print_help(out: &mut impl io::Write, help: &CommandHelp) -> io::Result<()> {
    if let Some(descr) = &help.descr {
        writeln!(out, "{}", textwrap::fill(descr, WRAP_WIDTH))?;
    }

    section(out, "Synopsis", |mut out| writeln!(out, "{}", help.usage))?;

    maybe_section(out, "Arguments", &help.args, |out, arg| print_arg(out, arg))?;

    print_opt_group(out, &help.opts, true)?;

    maybe_section(out, "Commands", &help.subcommands, |out, (name, descr)| {
        describe(out, name, descr)
    })?;

    maybe_section(out, "Eager options", &help.callbacks, |out, callback| {
        print_callback(out, callback)
    })
}

/// Write the one-line (or, for aggregates, one-line-per-parameter)
/// user-facing rendering of an error.
pub fn write_error(out: &mut (impl io::Write + ?Sized), error: &Error) -> io::Result<()> {
    match error {
        Error::MultiParameter(multi) => {
            writeln!(out, "could not resolve {} parameter(s):", multi.errors.len())?;
            let mut indented = IndentWriter::new("  ", out);
            multi
                .errors
                .iter()
                .try_for_each(|(path, error)| writeln!(indented, "{path}: {error}"))
        }
        Error::UnknownSubcommand { name, expected } => {
            writeln!(
                out,
                "unknown subcommand {name:?}; expected one of: {}",
                expected.iter().join_with(", "),
            )
        }
        other => writeln!(out, "{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ConvertError, MultiParameterError, ParameterError};
    use crate::help::{OptHelp, ProcessorHelp};

    fn render_help(help: &CommandHelp) -> String {
        let mut out = Vec::new();
        print_help(&mut out, help).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn help_renders_sections_in_order() {
        let help = CommandHelp {
            descr: Some("A demonstration".to_string()),
            usage: "demo [OPTIONS] ARGS".to_string(),
            subcommands: vec![("show".to_string(), "Show things".to_string())],
            args: vec![ArgHelp {
                name: "input".to_string(),
                type_descr: "path".to_string(),
                default: String::new(),
                descr: "Input file".to_string(),
            }],
            callbacks: vec![CbHelp {
                triggers: "--help".to_string(),
                descr: "Display the help message".to_string(),
            }],
            opts: OptionGroupHelp {
                name: None,
                descr: None,
                opts: vec![OptHelp {
                    processors: vec![ProcessorHelp {
                        triggers: "--count".to_string(),
                        type_descr: "int".to_string(),
                    }],
                    default: "3".to_string(),
                    descr: "How many".to_string(),
                }],
                groups: Vec::new(),
            },
        };

        let text = render_help(&help);

        let synopsis = text.find("Synopsis:").unwrap();
        let arguments = text.find("Arguments:").unwrap();
        let options = text.find("Options:").unwrap();
        let commands = text.find("Commands:").unwrap();

        assert!(synopsis < arguments && arguments < options && options < commands);
        assert!(text.contains("--count <int>  [default: 3]"));
        assert!(text.contains("<input>  path"));
    }

    #[test]
    fn aggregate_errors_list_each_parameter() {
        let error = Error::MultiParameter(MultiParameterError {
            errors: vec![
                (
                    "a".to_string(),
                    ParameterError::Invalid {
                        name: "a".to_string(),
                        source: ConvertError::Parse {
                            token: "x".to_string(),
                            target: "int".to_string(),
                        },
                    },
                ),
                (
                    "nested.b".to_string(),
                    ParameterError::UnspecifiedOption {
                        name: "b".to_string(),
                    },
                ),
            ],
        });

        let mut out = Vec::new();
        write_error(&mut out, &error).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("a: "));
        assert!(text.contains("nested.b: "));
    }
}
