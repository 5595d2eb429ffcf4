/*!
The dynamic value and type layer.

The binding engine works against a declared schema rather than against
concrete Rust types, so converted command-line input is carried in
[`Value`], and declared parameter types are described by [`TypeSpec`].
Both are deliberately closed enums: the extension point is the converter
store, not the value representation.
*/

use core::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use joinery::JoinableIterator;

use crate::command::CommandObject;
use crate::errors::StoreError;
use crate::group::Handler;
use crate::signature::ObjSignature;

/**
A named, closed set of member names: the schema analogue of an enum type.

Construction fails if two members collide, since triggers and conversion
both match members by their string form.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choices {
    name: String,
    members: Vec<String>,
}

impl Choices {
    pub fn new<I, S>(name: &str, members: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: Vec<String> = members.into_iter().map(Into::into).collect();

        for (i, member) in members.iter().enumerate() {
            if members[..i].contains(member) {
                return Err(StoreError::DuplicatedChoice {
                    ty: name.to_string(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            members,
        })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Look up a member by its exact string form.
    #[must_use]
    pub fn member(&self, token: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|member| member.as_str() == token)
            .map(String::as_str)
    }
}

/// An object value: the executed result of a parameter group, reachable
/// from the command layer for subcommand dispatch. Equality is identity.
#[derive(Clone)]
pub struct Obj(pub Rc<dyn CommandObject>);

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for Obj {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/**
A converted command-line value.

`None` is a real value (a parameter whose default is "nothing"), distinct
from the *unset* state tracked by [`DefaultValue`] and by the parameters
themselves.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    /// A member of a [`Choices`] set, stored by name.
    Member { choices: Rc<Choices>, member: String },
    Seq(Vec<Value>),
    Tuple(Vec<Value>),
    Obj(Obj),
}

impl Value {
    /// Wrap a command object.
    pub fn obj(object: impl CommandObject + 'static) -> Self {
        Self::Obj(Obj(Rc::new(object)))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Self::Float(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Short name for the kind of value, used in help output.
    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Path(_) => "path",
            Self::Member { .. } => "member",
            Self::Seq(_) => "seq",
            Self::Tuple(_) => "tuple",
            Self::Obj(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Member { member, .. } => write!(f, "{member}"),
            Self::Seq(items) => write!(f, "[{}]", items.iter().join_with(", ")),
            Self::Tuple(items) => write!(f, "({})", items.iter().join_with(", ")),
            Self::Obj(obj) => write!(f, "{obj:?}"),
        }
    }
}

/**
The declared type of a parameter, as handed over by a signature.

Converter resolution matches on these variants; `Object` is the one type
no converter serves — it becomes a nested parameter group instead.
*/
#[derive(Debug, Clone)]
pub enum TypeSpec {
    Str,
    Path,
    Bool,
    Float,
    Int,
    Enum(Rc<Choices>),
    /// A closed set of literal string values.
    Literal(Vec<String>),
    Union(Vec<TypeSpec>),
    List(Box<TypeSpec>),
    Tuple(Vec<TypeSpec>),
    /// A class-like parameter with its own signature; bound as a nested
    /// option group and constructed through its handler.
    Object(ObjectSpec),
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => f.write_str("str"),
            Self::Path => f.write_str("path"),
            Self::Bool => f.write_str("bool"),
            Self::Float => f.write_str("float"),
            Self::Int => f.write_str("int"),
            Self::Enum(choices) => f.write_str(choices.name()),
            Self::Literal(values) => write!(f, "{}", values.iter().join_with("|")),
            Self::Union(members) => write!(f, "{}", members.iter().join_with(" | ")),
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Tuple(elems) => write!(f, "tuple[{}]", elems.iter().join_with(", ")),
            Self::Object(object) => f.write_str(&object.name),
        }
    }
}

/// The schema of an object-typed parameter: its own signature plus the
/// handler that constructs the object from bound values.
#[derive(Clone)]
pub struct ObjectSpec {
    pub name: String,
    pub sig: Rc<ObjSignature>,
    pub construct: Handler,
}

impl fmt::Debug for ObjectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSpec")
            .field("name", &self.name)
            .field("sig", &self.sig)
            .finish_non_exhaustive()
    }
}

/**
A default value slot that distinguishes "no default declared" from
"the default is [`Value::None`]".
*/
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DefaultValue {
    #[default]
    Unset,
    Set(Value),
}

impl DefaultValue {
    #[inline]
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&Value> {
        match self {
            Self::Unset => None,
            Self::Set(value) => Some(value),
        }
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        Self::Set(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_choices_are_rejected() {
        let err = Choices::new("color", ["red", "green", "red"]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicatedChoice { .. }));
    }

    #[test]
    fn default_slot_distinguishes_unset_from_none() {
        assert!(DefaultValue::Unset.is_unset());
        assert!(!DefaultValue::Set(Value::None).is_unset());
        assert_eq!(DefaultValue::Set(Value::None).get(), Some(&Value::None));
    }

    #[test]
    fn display_renders_compound_values() {
        let value = Value::Seq(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(value.to_string(), "[1, 2]");

        let value = Value::Tuple(vec![Value::Str("a".into()), Value::Bool(true)]);
        assert_eq!(value.to_string(), "(a, true)");
    }
}
