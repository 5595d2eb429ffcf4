/*!
Read-only help snapshots of a command's surface.

Help rendering never touches binding state: these types are plain data,
built from the schema side of options, arguments, subcommands and eager
callbacks. The text renderer lives in [`printers`][crate::printers].
*/

use joinery::JoinableIterator;

use crate::command::{CliCallback, Command};
use crate::convert::Arity;
use crate::errors::Error;
use crate::group::ParamGroup;
use crate::parameter::{Opt, Param, PosArg};
use crate::value::DefaultValue;

/// One trigger processor of an option: its (final) triggers and the
/// type it consumes.
#[derive(Debug, Clone)]
pub struct ProcessorHelp {
    pub triggers: String,
    pub type_descr: String,
}

#[derive(Debug, Clone)]
pub struct OptHelp {
    pub processors: Vec<ProcessorHelp>,
    pub default: String,
    pub descr: String,
}

#[derive(Debug, Clone)]
pub struct ArgHelp {
    pub name: String,
    pub type_descr: String,
    pub default: String,
    pub descr: String,
}

#[derive(Debug, Clone)]
pub struct CbHelp {
    pub triggers: String,
    pub descr: String,
}

/// The option surface of one group, with nested groups as sub-entries.
#[derive(Debug, Clone)]
pub struct OptionGroupHelp {
    pub name: Option<String>,
    pub descr: Option<String>,
    pub opts: Vec<OptHelp>,
    pub groups: Vec<OptionGroupHelp>,
}

impl OptionGroupHelp {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opts.is_empty() && self.groups.is_empty() && self.descr.is_none()
    }

    #[must_use]
    pub fn has_options(&self) -> bool {
        !self.opts.is_empty() || self.groups.iter().any(Self::has_options)
    }
}

/// Everything the renderer needs for one command.
#[derive(Debug, Clone)]
pub struct CommandHelp {
    pub descr: Option<String>,
    pub usage: String,
    pub subcommands: Vec<(String, String)>,
    pub args: Vec<ArgHelp>,
    pub callbacks: Vec<CbHelp>,
    pub opts: OptionGroupHelp,
}

fn default_str(default: &DefaultValue) -> String {
    default.get().map(ToString::to_string).unwrap_or_default()
}

#[must_use]
pub fn opt_help(opt: &Opt) -> OptHelp {
    let processors = opt
        .processors()
        .iter()
        .zip(opt.final_trigger_sets())
        .map(|(processor, triggers)| ProcessorHelp {
            triggers: triggers.iter().join_with(", ").to_string(),
            type_descr: processor.type_descr(),
        })
        .collect();

    OptHelp {
        processors,
        default: default_str(opt.default()),
        descr: opt.descr().unwrap_or_default().to_string(),
    }
}

#[must_use]
pub fn arg_help(arg: &PosArg) -> ArgHelp {
    ArgHelp {
        name: arg.name().to_string(),
        type_descr: arg.converter().spec().to_string(),
        default: default_str(arg.default()),
        descr: arg.descr().unwrap_or_default().to_string(),
    }
}

/// Snapshot a group: its positional arguments (nested ones flattened in)
/// and its recursive option surface.
#[must_use]
pub fn group_help(group: &ParamGroup) -> (Vec<ArgHelp>, OptionGroupHelp) {
    let mut args = Vec::new();
    let mut opts = Vec::new();
    let mut groups = Vec::new();

    for param in group.params() {
        match param {
            Param::Opt(opt) => opts.push(opt_help(opt)),
            Param::Arg(arg) => args.push(arg_help(arg)),
            Param::Group(nested) => {
                let (nested_args, nested_opts) = group_help(nested);
                args.extend(nested_args);
                groups.push(nested_opts);
            }
        }
    }

    (
        args,
        OptionGroupHelp {
            name: Some(group.name().to_string()),
            descr: group.descr().map(str::to_string),
            opts,
            groups,
        },
    )
}

fn cb_help(callback: &CliCallback) -> CbHelp {
    CbHelp {
        triggers: callback.triggers().iter().join_with(", ").to_string(),
        descr: callback.descr().to_string(),
    }
}

/// Snapshot a whole command, usage line included.
#[must_use]
pub fn command_help(cmd: &Command) -> CommandHelp {
    let (args, opts) = group_help(&cmd.group);

    let mut usage = cmd.name().to_string();
    if opts.has_options() {
        usage.push_str(" [OPTIONS]");
    }
    if !cmd.subcommands().is_empty() {
        usage.push_str(" SUBCOMMAND");
    }
    if !args.is_empty() {
        usage.push_str(" ARGS");
    }

    CommandHelp {
        descr: cmd.group.descr().map(str::to_string),
        usage,
        subcommands: cmd
            .subcommands()
            .iter()
            .map(|sub| (sub.name.clone(), sub.descr.clone().unwrap_or_default()))
            .collect(),
        args,
        callbacks: cmd.callbacks().map(cb_help).collect(),
        opts,
    }
}

/// The `--help` eager callback: surfaces the snapshot as
/// [`Error::HelpRequested`] for the driver to render.
#[must_use]
pub fn help_callback() -> CliCallback {
    CliCallback::new(
        ["--help"],
        "Display the help message",
        Arity::fixed(0),
        |cmd, _| Err(Error::HelpRequested(Box::new(command_help(cmd)))),
    )
}

/// The `--0` delimiter: consumes itself and does nothing, ending an
/// open-ended token group early.
#[must_use]
pub fn noop_callback() -> CliCallback {
    CliCallback::new(
        ["--0"],
        "Works as a delimiter; no other operation",
        Arity::fixed(0),
        |_, _| Ok(()),
    )
}

/// Dump the current binding state of the command tree.
#[must_use]
pub fn show_bindings_callback() -> CliCallback {
    CliCallback::new(
        ["--show-bindings"],
        "Show the binding state of the command",
        Arity::fixed(0),
        |cmd, _| {
            println!("{cmd:#?}");
            Ok(())
        },
    )
}
