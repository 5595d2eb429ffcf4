/*!
Type converters: the machinery that turns a run of raw string tokens into
a typed [`Value`].

A [`Convert`] implementation is bound to one declared type and knows how
many tokens it needs ([`Arity`]). Compound converters (union, list,
tuple) recursively own sub-converters and enforce their construction
invariants eagerly: a list or tuple element must be fixed-arity, and all
members of a union must agree on arity.

The [`ConverterStore`] resolves a [`TypeSpec`] to a converter by trying
registered factories in descending priority order. Priority models
specificity, so a generic matcher never pre-empts a more specific one.
*/

use core::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::errors::{ConvertError, StoreError};
use crate::value::{Choices, TypeSpec, Value};

/**
How many string tokens a converter requires.

A fixed arity takes exactly `min == max` tokens. A variadic arity
(`max: None`, the spec's `max = -1`) takes any number of full `chunk`s
of tokens, which is how a list of pairs consumes tokens two at a time.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
    pub chunk: usize,
}

impl Arity {
    #[must_use]
    pub const fn fixed(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
            chunk: 1,
        }
    }

    #[must_use]
    pub const fn variadic(chunk: usize) -> Self {
        Self {
            min: 0,
            max: None,
            chunk,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        self.max.is_none()
    }

    /// How many of `offered` tokens this arity would consume.
    pub fn used(&self, offered: usize) -> Result<usize, ConvertError> {
        if offered < self.min {
            return Err(ConvertError::TooFewArgs {
                required: self.min,
                offered,
            });
        }

        let surplus = offered - self.min;
        let used = self.min + (surplus / self.chunk) * self.chunk;

        Ok(match self.max {
            Some(max) => used.min(max),
            None => used,
        })
    }

    /// Check that `offered` tokens would be consumed exactly, with
    /// nothing left over.
    pub fn check_exact(&self, offered: usize) -> Result<(), ConvertError> {
        let used = self.used(offered)?;

        if used < offered {
            Err(ConvertError::TooManyArgs {
                accepted: used,
                offered,
            })
        } else {
            Ok(())
        }
    }

    /// Split tokens into the consumed head and the leftover tail.
    pub fn split<'t>(
        &self,
        tokens: &'t [String],
    ) -> Result<(&'t [String], &'t [String]), ConvertError> {
        let used = self.used(tokens.len())?;
        Ok(tokens.split_at(used))
    }
}

/**
A converter bound to one declared target type.

[`convert`][Convert::convert] is the public entry point: it enforces the
exact arity before handing the tokens to the implementation, so
implementations may index into their declared token count freely.
*/
pub trait Convert: fmt::Debug {
    /// The declared type this converter produces.
    fn spec(&self) -> TypeSpec;

    fn arity(&self) -> Arity;

    /// Convert a token run whose length has already been checked.
    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError>;

    fn convert(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        self.arity().check_exact(tokens.len())?;
        self.convert_tokens(tokens)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StrConverter;

impl Convert for StrConverter {
    fn spec(&self) -> TypeSpec {
        TypeSpec::Str
    }

    fn arity(&self) -> Arity {
        Arity::fixed(1)
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        Ok(Value::Str(tokens[0].clone()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PathConverter;

impl Convert for PathConverter {
    fn spec(&self) -> TypeSpec {
        TypeSpec::Path
    }

    fn arity(&self) -> Arity {
        Arity::fixed(1)
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        Ok(Value::Path(PathBuf::from(&tokens[0])))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoolConverter;

impl Convert for BoolConverter {
    fn spec(&self) -> TypeSpec {
        TypeSpec::Bool
    }

    fn arity(&self) -> Arity {
        Arity::fixed(1)
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        match tokens[0].to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" => Ok(Value::Bool(true)),
            "false" | "f" | "no" => Ok(Value::Bool(false)),
            _ => Err(ConvertError::Parse {
                token: tokens[0].clone(),
                target: "bool".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FloatConverter;

impl Convert for FloatConverter {
    fn spec(&self) -> TypeSpec {
        TypeSpec::Float
    }

    fn arity(&self) -> Arity {
        Arity::fixed(1)
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        tokens[0]
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ConvertError::Parse {
                token: tokens[0].clone(),
                target: "float".to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IntConverter;

impl Convert for IntConverter {
    fn spec(&self) -> TypeSpec {
        TypeSpec::Int
    }

    fn arity(&self) -> Arity {
        Arity::fixed(1)
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        tokens[0]
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ConvertError::Parse {
                token: tokens[0].clone(),
                target: "int".to_string(),
            })
    }
}

/// Maps tokens onto the members of a [`Choices`] set by exact name.
#[derive(Debug, Clone)]
pub struct EnumConverter {
    choices: Rc<Choices>,
}

impl Convert for EnumConverter {
    fn spec(&self) -> TypeSpec {
        TypeSpec::Enum(Rc::clone(&self.choices))
    }

    fn arity(&self) -> Arity {
        Arity::fixed(1)
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        match self.choices.member(&tokens[0]) {
            Some(member) => Ok(Value::Member {
                choices: Rc::clone(&self.choices),
                member: member.to_string(),
            }),
            None => Err(ConvertError::Parse {
                token: tokens[0].clone(),
                target: self.choices.name().to_string(),
            }),
        }
    }
}

/// Maps tokens onto a closed set of literal string values.
#[derive(Debug, Clone)]
pub struct LiteralConverter {
    values: Vec<String>,
}

impl Convert for LiteralConverter {
    fn spec(&self) -> TypeSpec {
        TypeSpec::Literal(self.values.clone())
    }

    fn arity(&self) -> Arity {
        Arity::fixed(1)
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        if self.values.contains(&tokens[0]) {
            Ok(Value::Str(tokens[0].clone()))
        } else {
            Err(ConvertError::Parse {
                token: tokens[0].clone(),
                target: self.spec().to_string(),
            })
        }
    }
}

/**
Tries each member converter in descending priority order, keeping the
first that succeeds. All members share one arity, checked at
construction.
*/
#[derive(Debug, Clone)]
pub struct UnionConverter {
    spec: TypeSpec,
    members: Vec<Rc<dyn Convert>>,
    arity: Arity,
}

impl Convert for UnionConverter {
    fn spec(&self) -> TypeSpec {
        self.spec.clone()
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        for member in &self.members {
            if let Ok(value) = member.convert(tokens) {
                return Ok(value);
            }
        }

        Err(ConvertError::NoUnionMatch {
            target: self.spec.to_string(),
            tokens: tokens.to_vec(),
        })
    }
}

/// Consumes any number of full element-arity chunks and converts each
/// through the inner converter.
#[derive(Debug, Clone)]
pub struct ListConverter {
    spec: TypeSpec,
    inner: Rc<dyn Convert>,
}

impl ListConverter {
    /// The inner converter must be fixed-arity (and consume at least one
    /// token); nesting a variadic converter inside a list is a
    /// construction error.
    pub fn new(inner: Rc<dyn Convert>) -> Result<Self, StoreError> {
        let arity = inner.arity();
        if arity.is_variadic() || arity.min == 0 {
            return Err(StoreError::VariadicListElement);
        }

        Ok(Self {
            spec: TypeSpec::List(Box::new(inner.spec())),
            inner,
        })
    }
}

impl Convert for ListConverter {
    fn spec(&self) -> TypeSpec {
        self.spec.clone()
    }

    fn arity(&self) -> Arity {
        Arity::variadic(self.inner.arity().min)
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        let chunk = self.inner.arity().min;

        tokens
            .chunks(chunk)
            .map(|group| self.inner.convert(group))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Seq)
    }
}

/// A fixed sequence of converters, each consuming its own token count.
#[derive(Debug, Clone)]
pub struct TupleConverter {
    spec: TypeSpec,
    elements: Vec<Rc<dyn Convert>>,
    arity: Arity,
}

impl TupleConverter {
    pub fn new(elements: Vec<Rc<dyn Convert>>) -> Result<Self, StoreError> {
        let mut total = 0;
        for element in &elements {
            if element.arity().is_variadic() {
                return Err(StoreError::VariadicTupleElement);
            }
            total += element.arity().min;
        }

        Ok(Self {
            spec: TypeSpec::Tuple(elements.iter().map(|e| e.spec()).collect()),
            arity: Arity::fixed(total),
            elements,
        })
    }
}

impl Convert for TupleConverter {
    fn spec(&self) -> TypeSpec {
        self.spec.clone()
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn convert_tokens(&self, tokens: &[String]) -> Result<Value, ConvertError> {
        let mut out = Vec::with_capacity(self.elements.len());
        let mut pos = 0;

        for element in &self.elements {
            let take = element.arity().min;
            out.push(element.convert(&tokens[pos..pos + take])?);
            pos += take;
        }

        Ok(Value::Tuple(out))
    }
}

/**
A converter factory: builds a converter for a type, or reports that the
type is not its business (`Ok(None)`), letting resolution move on to the
next factory. Hard construction failures (`Err`) abort resolution.
*/
pub type ConverterFactory =
    fn(&TypeSpec, &ConverterStore) -> Result<Option<Rc<dyn Convert>>, StoreError>;

fn str_factory(ty: &TypeSpec, _: &ConverterStore) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    Ok(match ty {
        TypeSpec::Str => Some(Rc::new(StrConverter)),
        _ => None,
    })
}

fn path_factory(ty: &TypeSpec, _: &ConverterStore) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    Ok(match ty {
        TypeSpec::Path => Some(Rc::new(PathConverter)),
        _ => None,
    })
}

fn bool_factory(ty: &TypeSpec, _: &ConverterStore) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    Ok(match ty {
        TypeSpec::Bool => Some(Rc::new(BoolConverter)),
        _ => None,
    })
}

fn float_factory(ty: &TypeSpec, _: &ConverterStore) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    Ok(match ty {
        TypeSpec::Float => Some(Rc::new(FloatConverter)),
        _ => None,
    })
}

fn int_factory(ty: &TypeSpec, _: &ConverterStore) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    Ok(match ty {
        TypeSpec::Int => Some(Rc::new(IntConverter)),
        _ => None,
    })
}

fn enum_factory(ty: &TypeSpec, _: &ConverterStore) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    Ok(match ty {
        TypeSpec::Enum(choices) => Some(Rc::new(EnumConverter {
            choices: Rc::clone(choices),
        })),
        _ => None,
    })
}

fn literal_factory(
    ty: &TypeSpec,
    _: &ConverterStore,
) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    let TypeSpec::Literal(values) = ty else {
        return Ok(None);
    };

    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            return Err(StoreError::DuplicatedChoice { ty: ty.to_string() });
        }
    }

    Ok(Some(Rc::new(LiteralConverter {
        values: values.clone(),
    })))
}

fn union_factory(
    ty: &TypeSpec,
    store: &ConverterStore,
) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    let TypeSpec::Union(member_types) = ty else {
        return Ok(None);
    };

    let members = store.sorted_converters(member_types)?;

    let arity = match members.first() {
        Some(first) => first.arity(),
        None => return Err(StoreError::NoConverter(ty.to_string())),
    };

    if members.iter().any(|member| member.arity() != arity) {
        return Err(StoreError::MixedUnionArity);
    }

    Ok(Some(Rc::new(UnionConverter {
        spec: ty.clone(),
        members,
        arity,
    })))
}

fn list_factory(
    ty: &TypeSpec,
    store: &ConverterStore,
) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    let TypeSpec::List(inner) = ty else {
        return Ok(None);
    };

    let inner = store.converter(inner)?;
    ListConverter::new(inner).map(|conv| Some(Rc::new(conv) as Rc<dyn Convert>))
}

fn tuple_factory(
    ty: &TypeSpec,
    store: &ConverterStore,
) -> Result<Option<Rc<dyn Convert>>, StoreError> {
    let TypeSpec::Tuple(element_types) = ty else {
        return Ok(None);
    };

    let elements = element_types
        .iter()
        .map(|element| store.converter(element))
        .collect::<Result<Vec<_>, _>>()?;

    TupleConverter::new(elements).map(|conv| Some(Rc::new(conv) as Rc<dyn Convert>))
}

/**
The registry resolving declared types to converters.

Factories are tried in descending priority order; the first one that
accepts the type wins. The built-in priorities put scalars lowest and
compound types highest, so (for instance) a union never swallows a type
one of the scalar factories serves directly.
*/
#[derive(Clone)]
pub struct ConverterStore {
    factories: Vec<(u32, ConverterFactory)>,
}

impl ConverterStore {
    /// A store with no factories registered at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// A store with the built-in converters registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut store = Self::empty();

        store.register(1, str_factory);
        store.register(2, path_factory);
        store.register(3, bool_factory);
        store.register(4, float_factory);
        store.register(5, int_factory);
        store.register(6, enum_factory);
        store.register(7, literal_factory);
        store.register(8, union_factory);
        store.register(9, list_factory);
        store.register(10, tuple_factory);

        store
    }

    /// Register a factory. Higher priorities are tried first; ties keep
    /// registration order.
    pub fn register(&mut self, priority: u32, factory: ConverterFactory) {
        self.factories.push((priority, factory));
        self.factories.sort_by(|a, b| b.0.cmp(&a.0));
    }

    pub fn converter(&self, ty: &TypeSpec) -> Result<Rc<dyn Convert>, StoreError> {
        self.converter_with_priority(ty)
            .map(|(converter, _)| converter)
    }

    pub fn converter_with_priority(
        &self,
        ty: &TypeSpec,
    ) -> Result<(Rc<dyn Convert>, u32), StoreError> {
        for &(priority, factory) in &self.factories {
            if let Some(converter) = factory(ty, self)? {
                return Ok((converter, priority));
            }
        }

        Err(StoreError::NoConverter(ty.to_string()))
    }

    /// Resolve several types and return their converters ordered by
    /// descending priority; used by unions to decide trial order.
    pub fn sorted_converters(
        &self,
        types: &[TypeSpec],
    ) -> Result<Vec<Rc<dyn Convert>>, StoreError> {
        let mut resolved = types
            .iter()
            .map(|ty| self.converter_with_priority(ty))
            .collect::<Result<Vec<_>, _>>()?;

        resolved.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(resolved.into_iter().map(|(converter, _)| converter).collect())
    }
}

impl Default for ConverterStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ConverterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterStore")
            .field("factories", &self.factories.len())
            .finish()
    }
}
