/*!
The error taxonomy of the binding engine.

There are two cleanly separated families:

- **structural** errors abort the current binding pass immediately:
  unknown or missing triggers, schema construction conflicts, leftover
  tokens that resolve to nothing;
- **per-parameter** errors are *deferred*: they are stored on the leaf
  that failed and only surface when the leaf's value is read, so a single
  pass over the argument vector reports every malformed parameter at
  once instead of stopping at the first.

[`Error::is_usage_error`] is the marker the presentation boundary keys
off: everything in the usage family maps to a short message and a
non-zero exit, anything else is a real fault and gets a diagnostic.
*/

use core::fmt;
use std::path::PathBuf;

use joinery::JoinableIterator;
use thiserror::Error;

use crate::help::CommandHelp;

/// Conversion failures raised by a type converter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConvertError {
    #[error("expected {required} value tokens but got {offered}")]
    TooFewArgs { required: usize, offered: usize },

    #[error("can use {accepted} value tokens but got {offered}")]
    TooManyArgs { accepted: usize, offered: usize },

    #[error("cannot convert {token:?} to {target}")]
    Parse { token: String, target: String },

    #[error("no member of {target} matched {tokens:?}")]
    NoUnionMatch { target: String, tokens: Vec<String> },
}

/// Failures of the converter store: either no factory matched a type, or
/// a compound converter violated a construction invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("no converter available for type {0}")]
    NoConverter(String),

    #[error("the element type of a list must take a fixed number of tokens")]
    VariadicListElement,

    #[error("every element type of a tuple must take a fixed number of tokens")]
    VariadicTupleElement,

    #[error("all members of a union must take the same number of tokens")]
    MixedUnionArity,

    #[error("{ty} has members with colliding string forms")]
    DuplicatedChoice { ty: String },
}

/**
A deferred, per-parameter error.

These are stored on the leaf at bind time and re-raised, unchanged, every
time the leaf's value is read; [`MultiParameterError`] gathers them when
a whole group resolves.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParameterError {
    #[error("option {name} was not specified and has no default")]
    UnspecifiedOption { name: String },

    #[error("argument {name} was not specified and has no default")]
    UnspecifiedArgument { name: String },

    #[error("parameter {name}: {source}")]
    Invalid {
        name: String,
        source: ConvertError,
    },

    #[error("parameter {name} was already given and cannot be repeated")]
    Repeated { name: String },
}

impl ParameterError {
    /// The parameter the error is attached to.
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::UnspecifiedOption { name }
            | Self::UnspecifiedArgument { name }
            | Self::Invalid { name, .. }
            | Self::Repeated { name } => name,
        }
    }
}

/**
Every deferred error of a group, gathered at resolution time.

Each entry keeps the dotted path of the leaf it came from, so reporting
can name `nested.a` and `integer` separately rather than flattening the
failures into one message.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiParameterError {
    pub errors: Vec<(String, ParameterError)>,
}

impl fmt::Display for MultiParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parameter(s) could not be resolved: {}",
            self.errors.len(),
            self.errors
                .iter()
                .map(|(path, error)| lazy_format::lazy_format!("{path}: {error}"))
                .join_with("; "),
        )
    }
}

impl std::error::Error for MultiParameterError {}

/// A trigger reference that cannot be bound: structural, never deferred.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TriggerError {
    #[error("a trigger is expected")]
    Expected,

    #[error("trigger {0} is not known")]
    Unknown(String),
}

/// Two options (possibly in different nested groups) claim the same
/// trigger after prefix adjustment. Raised while the schema is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("trigger {trigger} is declared by both {first} and {second}")]
pub struct DuplicatedTriggerError {
    pub trigger: String,
    pub first: String,
    pub second: String,
}

/// Schema construction conflicts beyond trigger collisions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error(transparent)]
    DuplicatedTrigger(#[from] DuplicatedTriggerError),

    #[error("{group} already contains a parameter named {name}")]
    DuplicatedName { group: String, name: String },

    #[error("a command cannot expose both positional arguments and subcommands")]
    ArgumentsWithSubcommands,

    #[error("variadic keyword parameter {name} is not supported")]
    VariadicKeyword { name: String },
}

/// Failures of the preset-defaults plugin.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PresetError {
    #[error("could not read preset file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse preset file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("preset files must end in .json, .yaml or .yml: {0}")]
    UnknownExtension(PathBuf),

    #[error("no section named {section} in {path}")]
    UnknownSection { path: PathBuf, section: String },

    #[error("preset option entries must start with a trigger: {0:?}")]
    NotATrigger(Vec<String>),

    #[error("preset tokens {tokens:?} left {leftover:?} unconsumed")]
    Leftover {
        tokens: Vec<String>,
        leftover: Vec<String>,
    },

    #[error("{0} does not name a positional argument")]
    NotAnArgument(String),
}

/// Top-level error for one CLI invocation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    MultiParameter(#[from] MultiParameterError),

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error("unknown subcommand {name:?}")]
    UnknownSubcommand {
        name: String,
        expected: Vec<String>,
    },

    #[error("arguments could not be processed: {0:?}")]
    UnprocessedArguments(Vec<String>),

    #[error("the result of {name} does not expose subcommands")]
    SubcommandTarget { name: String },

    /// The wrapped handler itself failed; this is deliberately distinct
    /// from every parameter error, and keeps the causal chain.
    #[error("error while invoking {name}")]
    Invoke {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("usage message was requested")]
    HelpRequested(Box<CommandHelp>),
}

impl Error {
    /**
    True for the family of errors caused by what the user typed (or by a
    schema that cannot be bound), as opposed to faults inside handlers or
    the embedding program. The presentation boundary maps this family to
    a one-line message and a usage exit code.
    */
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        match self {
            Self::Trigger(_)
            | Self::Schema(_)
            | Self::Store(_)
            | Self::Parameter(_)
            | Self::MultiParameter(_)
            | Self::Preset(_)
            | Self::UnknownSubcommand { .. }
            | Self::UnprocessedArguments(_)
            | Self::SubcommandTarget { .. } => true,
            Self::Invoke { .. } | Self::HelpRequested(_) => false,
        }
    }
}

impl From<DuplicatedTriggerError> for Error {
    fn from(error: DuplicatedTriggerError) -> Self {
        Self::Schema(SchemaError::DuplicatedTrigger(error))
    }
}
