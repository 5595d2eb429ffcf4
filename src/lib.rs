/*!
A declarative, schema-driven command-line binding engine.

`smelter` takes a description of a callable — its parameters, their
types, defaults and roles — and binds a process argument vector against
it: options by trigger, positionals in declaration order, nested option
groups by prefixed triggers, subcommands by descending into the executed
result. Failures that concern a single parameter are deferred and
reported together at the end of the pass; structural failures abort
immediately.

The moving parts, leaf first:

- [`smelter_tokens`]: raw argument vector → deque of token groups;
- [`convert`]: type converters and the priority-ordered store;
- [`processor`] and [`parameter`]: trigger processors and the
  option/argument leaves with their deferred-error cells;
- [`group`]: the recursive parameter group that dispatches token groups
  and executes the wrapped handler;
- [`signature`]: the schema contract and the schema → group builder;
- [`command`] and [`run`]: subcommand derivation and the driver loop;
- [`help`] / [`printers`]: read-only help snapshots and their text
  rendering;
- [`presets`]: defaults overridden from a JSON/YAML file by trial
  binding.
*/

pub mod command;
pub mod convert;
pub mod errors;
pub mod group;
pub mod help;
pub mod parameter;
pub mod presets;
pub mod printers;
pub mod processor;
pub mod run;
pub mod signature;
pub mod value;

pub use smelter_tokens::{GroupDeque, split_and_expand};

pub use command::{
    AttrSpec, CliCallback, Command, CommandObject, Config, InterfaceSpec, ReturnSpec, Subcommand,
};
pub use convert::{Arity, Convert, ConverterStore};
pub use errors::Error;
pub use group::{CallArgs, Handler, HandlerError, ParamGroup};
pub use parameter::{Opt, Param, PosArg};
pub use processor::TriggerProcessor;
pub use run::{run, try_run};
pub use signature::{CliKind, ObjSignature, ParamKind, ParamSignature, group_from_signature};
pub use value::{Choices, DefaultValue, ObjectSpec, TypeSpec, Value};
