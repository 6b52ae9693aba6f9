//! Dynamic argument values.
//!
//! The interception layer records call arguments without static knowledge of
//! their types, so the engine models one argument as an [`ArgValue`]: either
//! an explicit null, a type-erased payload, or a variadic group (the trailing
//! argument pack of a variable-arity call, kept as one physical value).
//!
//! Equality and formatting are captured as monomorphized function pointers at
//! construction time, so no runtime reflection is needed to compare or render
//! a value later.

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

type EqFn = fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> bool;
type FmtFn = fn(&(dyn Any + Send + Sync), &mut fmt::Formatter<'_>) -> fmt::Result;

/// One recorded argument value.
#[derive(Clone)]
pub struct ArgValue {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    /// Explicit null. The engine never panics on it; matchers decide.
    Null,
    /// Trailing variadic pack as physically passed.
    Group(Arc<Vec<ArgValue>>),
    /// Type-erased payload with captured comparison and formatting.
    Value {
        payload: Arc<dyn Any + Send + Sync>,
        type_id: TypeId,
        type_name: &'static str,
        eq: EqFn,
        fmt: FmtFn,
    },
}

fn eq_impl<T: PartialEq + Send + Sync + 'static>(
    a: &(dyn Any + Send + Sync),
    b: &(dyn Any + Send + Sync),
) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn fmt_impl<T: fmt::Debug + Send + Sync + 'static>(
    v: &(dyn Any + Send + Sync),
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match v.downcast_ref::<T>() {
        Some(value) => write!(f, "{value:?}"),
        None => f.write_str("<opaque>"),
    }
}

impl ArgValue {
    /// Wrap a concrete value.
    pub fn of<T>(value: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            repr: Repr::Value {
                payload: Arc::new(value),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                eq: eq_impl::<T>,
                fmt: fmt_impl::<T>,
            },
        }
    }

    /// The explicit null value.
    pub fn null() -> Self {
        Self { repr: Repr::Null }
    }

    /// Wrap a trailing variadic pack as one physical value.
    pub fn group(elements: Vec<ArgValue>) -> Self {
        Self { repr: Repr::Group(Arc::new(elements)) }
    }

    /// The `TypeId` used when a variadic group is treated as one value.
    pub fn group_type_id() -> TypeId {
        TypeId::of::<Vec<ArgValue>>()
    }

    /// True for the explicit null value.
    pub fn is_null(&self) -> bool {
        matches!(self.repr, Repr::Null)
    }

    /// Runtime type of the payload. `None` for null.
    pub fn type_id(&self) -> Option<TypeId> {
        match &self.repr {
            Repr::Null => None,
            Repr::Group(_) => Some(Self::group_type_id()),
            Repr::Value { type_id, .. } => Some(*type_id),
        }
    }

    /// Human-readable type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match &self.repr {
            Repr::Null => "null",
            Repr::Group(_) => "variadic group",
            Repr::Value { type_name, .. } => type_name,
        }
    }

    /// Borrow the payload as `T`, if this is a non-null value of that type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match &self.repr {
            Repr::Value { payload, .. } => payload.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Borrow the elements of a variadic group value.
    pub fn as_group(&self) -> Option<&[ArgValue]> {
        match &self.repr {
            Repr::Group(elements) => Some(elements),
            _ => None,
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Null, Repr::Null) => true,
            (Repr::Group(a), Repr::Group(b)) => a.as_slice() == b.as_slice(),
            (
                Repr::Value { payload: a, type_id: ta, eq, .. },
                Repr::Value { payload: b, type_id: tb, .. },
            ) => ta == tb && eq(a.as_ref(), b.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Null => f.write_str("null"),
            Repr::Group(elements) => f.debug_list().entries(elements.iter()).finish(),
            Repr::Value { payload, fmt, .. } => fmt(payload.as_ref(), f),
        }
    }
}
