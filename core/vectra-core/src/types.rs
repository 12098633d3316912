//! Element types, scalar values, and host-side columns.
//!
//! The engine supports a closed set of numeric element types. Runtime type
//! tags (`ElementType`) drive kernel specialization: every kernel is
//! monomorphized per concrete type combination, and the tag tuple is the
//! monomorphization key.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{VectraError, VectraResult};

/// Closed enumeration of supported element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ElementType {
    /// Short lowercase name, also used in generated kernel names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        }
    }

    /// Size of one element in bytes.
    pub fn size_of(&self) -> usize {
        match self {
            ElementType::I8 | ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::F32 | ElementType::F64)
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Additive identity of the type.
    pub fn zero(&self) -> Scalar {
        Scalar::U8(0).cast(*self)
    }

    /// Multiplicative identity of the type.
    pub fn one(&self) -> Scalar {
        Scalar::U8(1).cast(*self)
    }

    /// Smallest representable value (identity of `max`).
    pub fn min_value(&self) -> Scalar {
        match self {
            ElementType::I8 => Scalar::I8(i8::MIN),
            ElementType::I16 => Scalar::I16(i16::MIN),
            ElementType::I32 => Scalar::I32(i32::MIN),
            ElementType::I64 => Scalar::I64(i64::MIN),
            ElementType::U8 => Scalar::U8(u8::MIN),
            ElementType::U16 => Scalar::U16(u16::MIN),
            ElementType::U32 => Scalar::U32(u32::MIN),
            ElementType::U64 => Scalar::U64(u64::MIN),
            ElementType::F32 => Scalar::F32(f32::MIN),
            ElementType::F64 => Scalar::F64(f64::MIN),
        }
    }

    /// Largest representable value (identity of `min`).
    pub fn max_value(&self) -> Scalar {
        match self {
            ElementType::I8 => Scalar::I8(i8::MAX),
            ElementType::I16 => Scalar::I16(i16::MAX),
            ElementType::I32 => Scalar::I32(i32::MAX),
            ElementType::I64 => Scalar::I64(i64::MAX),
            ElementType::U8 => Scalar::U8(u8::MAX),
            ElementType::U16 => Scalar::U16(u16::MAX),
            ElementType::U32 => Scalar::U32(u32::MAX),
            ElementType::U64 => Scalar::U64(u64::MAX),
            ElementType::F32 => Scalar::F32(f32::MAX),
            ElementType::F64 => Scalar::F64(f64::MAX),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single value of one of the supported element types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

macro_rules! cast_to {
    ($v:expr, $target:expr) => {
        match $target {
            ElementType::I8 => Scalar::I8($v as i8),
            ElementType::I16 => Scalar::I16($v as i16),
            ElementType::I32 => Scalar::I32($v as i32),
            ElementType::I64 => Scalar::I64($v as i64),
            ElementType::U8 => Scalar::U8($v as u8),
            ElementType::U16 => Scalar::U16($v as u16),
            ElementType::U32 => Scalar::U32($v as u32),
            ElementType::U64 => Scalar::U64($v as u64),
            ElementType::F32 => Scalar::F32($v as f32),
            ElementType::F64 => Scalar::F64($v as f64),
        }
    };
}

macro_rules! scalar_combine {
    ($a:expr, $b:expr, $method:ident) => {{
        let b = $b.cast($a.element_type());
        match ($a, b) {
            (Scalar::I8(x), Scalar::I8(y)) => Scalar::I8(x.$method(y)),
            (Scalar::I16(x), Scalar::I16(y)) => Scalar::I16(x.$method(y)),
            (Scalar::I32(x), Scalar::I32(y)) => Scalar::I32(x.$method(y)),
            (Scalar::I64(x), Scalar::I64(y)) => Scalar::I64(x.$method(y)),
            (Scalar::U8(x), Scalar::U8(y)) => Scalar::U8(x.$method(y)),
            (Scalar::U16(x), Scalar::U16(y)) => Scalar::U16(x.$method(y)),
            (Scalar::U32(x), Scalar::U32(y)) => Scalar::U32(x.$method(y)),
            (Scalar::U64(x), Scalar::U64(y)) => Scalar::U64(x.$method(y)),
            (Scalar::F32(x), Scalar::F32(y)) => Scalar::F32(x.$method(y)),
            (Scalar::F64(x), Scalar::F64(y)) => Scalar::F64(x.$method(y)),
            _ => unreachable!(),
        }
    }};
}

impl Scalar {
    pub fn element_type(&self) -> ElementType {
        match self {
            Scalar::I8(_) => ElementType::I8,
            Scalar::I16(_) => ElementType::I16,
            Scalar::I32(_) => ElementType::I32,
            Scalar::I64(_) => ElementType::I64,
            Scalar::U8(_) => ElementType::U8,
            Scalar::U16(_) => ElementType::U16,
            Scalar::U32(_) => ElementType::U32,
            Scalar::U64(_) => ElementType::U64,
            Scalar::F32(_) => ElementType::F32,
            Scalar::F64(_) => ElementType::F64,
        }
    }

    /// Numeric conversion to the target element type (`as`-cast semantics).
    pub fn cast(self, target: ElementType) -> Scalar {
        match self {
            Scalar::I8(v) => cast_to!(v, target),
            Scalar::I16(v) => cast_to!(v, target),
            Scalar::I32(v) => cast_to!(v, target),
            Scalar::I64(v) => cast_to!(v, target),
            Scalar::U8(v) => cast_to!(v, target),
            Scalar::U16(v) => cast_to!(v, target),
            Scalar::U32(v) => cast_to!(v, target),
            Scalar::U64(v) => cast_to!(v, target),
            Scalar::F32(v) => cast_to!(v, target),
            Scalar::F64(v) => cast_to!(v, target),
        }
    }

    /// Same-type total ordering. Floats compare via `total_cmp`.
    pub fn compare(&self, other: &Scalar) -> VectraResult<Ordering> {
        match (self, other) {
            (Scalar::I8(a), Scalar::I8(b)) => Ok(a.cmp(b)),
            (Scalar::I16(a), Scalar::I16(b)) => Ok(a.cmp(b)),
            (Scalar::I32(a), Scalar::I32(b)) => Ok(a.cmp(b)),
            (Scalar::I64(a), Scalar::I64(b)) => Ok(a.cmp(b)),
            (Scalar::U8(a), Scalar::U8(b)) => Ok(a.cmp(b)),
            (Scalar::U16(a), Scalar::U16(b)) => Ok(a.cmp(b)),
            (Scalar::U32(a), Scalar::U32(b)) => Ok(a.cmp(b)),
            (Scalar::U64(a), Scalar::U64(b)) => Ok(a.cmp(b)),
            (Scalar::F32(a), Scalar::F32(b)) => Ok(a.total_cmp(b)),
            (Scalar::F64(a), Scalar::F64(b)) => Ok(a.total_cmp(b)),
            _ => Err(VectraError::TypeMismatch {
                expected: self.element_type().to_string(),
                actual: other.element_type().to_string(),
            }),
        }
    }

    /// Addition in `self`'s type; `other` is cast first. Integers wrap.
    pub fn add(self, other: Scalar) -> Scalar {
        scalar_combine!(self, other, elem_add)
    }

    /// Subtraction in `self`'s type; `other` is cast first. Integers wrap.
    pub fn sub(self, other: Scalar) -> Scalar {
        scalar_combine!(self, other, elem_sub)
    }

    /// Multiplication in `self`'s type; `other` is cast first. Integers wrap.
    pub fn mul(self, other: Scalar) -> Scalar {
        scalar_combine!(self, other, elem_mul)
    }

    /// Division in `self`'s type. `None` on integer division by zero.
    pub fn checked_div(self, other: Scalar) -> Option<Scalar> {
        let b = other.cast(self.element_type());
        if b.element_type().is_integer() && b == b.element_type().zero() {
            return None;
        }
        Some(scalar_combine!(self, b, elem_div))
    }

    /// Elementwise minimum in `self`'s type.
    pub fn min_of(self, other: Scalar) -> Scalar {
        scalar_combine!(self, other, elem_min)
    }

    /// Elementwise maximum in `self`'s type.
    pub fn max_of(self, other: Scalar) -> Scalar {
        scalar_combine!(self, other, elem_max)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::I8(v) => write!(f, "{v}"),
            Scalar::I16(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::U8(v) => write!(f, "{v}"),
            Scalar::U16(v) => write!(f, "{v}"),
            Scalar::U32(v) => write!(f, "{v}"),
            Scalar::U64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
        }
    }
}

/// Monomorphization seam: one implementation per supported primitive.
///
/// Kernel bodies are generic over `Element` and selected once per call via
/// the column's runtime type tag.
pub(crate) trait Element: Copy + Send + Sync + 'static {
    const TYPE: ElementType;
    fn from_scalar(s: Scalar) -> Self;
    fn to_scalar(self) -> Scalar;
    fn elem_add(self, other: Self) -> Self;
    fn elem_sub(self, other: Self) -> Self;
    fn elem_mul(self, other: Self) -> Self;
    fn elem_div(self, other: Self) -> Self;
    fn elem_min(self, other: Self) -> Self;
    fn elem_max(self, other: Self) -> Self;
    fn cmp_total(self, other: Self) -> Ordering;
}

macro_rules! int_element {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl Element for $t {
            const TYPE: ElementType = ElementType::$variant;
            fn from_scalar(s: Scalar) -> Self {
                match s.cast(ElementType::$variant) {
                    Scalar::$variant(v) => v,
                    _ => unreachable!(),
                }
            }
            fn to_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }
            fn elem_add(self, other: Self) -> Self {
                self.wrapping_add(other)
            }
            fn elem_sub(self, other: Self) -> Self {
                self.wrapping_sub(other)
            }
            fn elem_mul(self, other: Self) -> Self {
                self.wrapping_mul(other)
            }
            fn elem_div(self, other: Self) -> Self {
                self.wrapping_div(other)
            }
            fn elem_min(self, other: Self) -> Self {
                Ord::min(self, other)
            }
            fn elem_max(self, other: Self) -> Self {
                Ord::max(self, other)
            }
            fn cmp_total(self, other: Self) -> Ordering {
                self.cmp(&other)
            }
        }

        impl From<$t> for Scalar {
            fn from(v: $t) -> Scalar {
                Scalar::$variant(v)
            }
        }
    )*};
}

macro_rules! float_element {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl Element for $t {
            const TYPE: ElementType = ElementType::$variant;
            fn from_scalar(s: Scalar) -> Self {
                match s.cast(ElementType::$variant) {
                    Scalar::$variant(v) => v,
                    _ => unreachable!(),
                }
            }
            fn to_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }
            fn elem_add(self, other: Self) -> Self {
                self + other
            }
            fn elem_sub(self, other: Self) -> Self {
                self - other
            }
            fn elem_mul(self, other: Self) -> Self {
                self * other
            }
            fn elem_div(self, other: Self) -> Self {
                self / other
            }
            fn elem_min(self, other: Self) -> Self {
                self.min(other)
            }
            fn elem_max(self, other: Self) -> Self {
                self.max(other)
            }
            fn cmp_total(self, other: Self) -> Ordering {
                self.total_cmp(&other)
            }
        }

        impl From<$t> for Scalar {
            fn from(v: $t) -> Scalar {
                Scalar::$variant(v)
            }
        }
    )*};
}

int_element! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

float_element! {
    f32 => F32,
    f64 => F64,
}

/// A host-side, contiguously stored column of one element type.
#[derive(Debug, Clone, PartialEq)]
pub enum HostColumn {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Dispatch a type-generic body over the concrete variant of a `HostColumn`.
macro_rules! dispatch_host {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            $crate::types::HostColumn::I8($v) => $body,
            $crate::types::HostColumn::I16($v) => $body,
            $crate::types::HostColumn::I32($v) => $body,
            $crate::types::HostColumn::I64($v) => $body,
            $crate::types::HostColumn::U8($v) => $body,
            $crate::types::HostColumn::U16($v) => $body,
            $crate::types::HostColumn::U32($v) => $body,
            $crate::types::HostColumn::U64($v) => $body,
            $crate::types::HostColumn::F32($v) => $body,
            $crate::types::HostColumn::F64($v) => $body,
        }
    };
}

pub(crate) use dispatch_host;

macro_rules! host_column_from {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl From<Vec<$t>> for HostColumn {
            fn from(v: Vec<$t>) -> HostColumn {
                HostColumn::$variant(v)
            }
        }
    )*};
}

host_column_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl HostColumn {
    /// Zero-initialized column of `len` elements.
    pub fn zeros(dtype: ElementType, len: usize) -> HostColumn {
        match dtype {
            ElementType::I8 => HostColumn::I8(vec![0; len]),
            ElementType::I16 => HostColumn::I16(vec![0; len]),
            ElementType::I32 => HostColumn::I32(vec![0; len]),
            ElementType::I64 => HostColumn::I64(vec![0; len]),
            ElementType::U8 => HostColumn::U8(vec![0; len]),
            ElementType::U16 => HostColumn::U16(vec![0; len]),
            ElementType::U32 => HostColumn::U32(vec![0; len]),
            ElementType::U64 => HostColumn::U64(vec![0; len]),
            ElementType::F32 => HostColumn::F32(vec![0.0; len]),
            ElementType::F64 => HostColumn::F64(vec![0.0; len]),
        }
    }

    /// Column built from scalars, each cast to `dtype`.
    pub fn from_scalars(dtype: ElementType, values: &[Scalar]) -> HostColumn {
        let mut out = HostColumn::zeros(dtype, values.len());
        for (i, v) in values.iter().enumerate() {
            out.set(i, *v);
        }
        out
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            HostColumn::I8(_) => ElementType::I8,
            HostColumn::I16(_) => ElementType::I16,
            HostColumn::I32(_) => ElementType::I32,
            HostColumn::I64(_) => ElementType::I64,
            HostColumn::U8(_) => ElementType::U8,
            HostColumn::U16(_) => ElementType::U16,
            HostColumn::U32(_) => ElementType::U32,
            HostColumn::U64(_) => ElementType::U64,
            HostColumn::F32(_) => ElementType::F32,
            HostColumn::F64(_) => ElementType::F64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch_host!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `i`, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<Scalar> {
        if i < self.len() {
            Some(self.scalar_at(i))
        } else {
            None
        }
    }

    /// Unchecked-index read; callers validate bounds first.
    pub(crate) fn scalar_at(&self, i: usize) -> Scalar {
        dispatch_host!(self, v => Scalar::from(v[i]))
    }

    /// Write `value` at `i`, cast to the column's element type.
    pub(crate) fn set(&mut self, i: usize, value: Scalar) {
        dispatch_host!(self, v => v[i] = Element::from_scalar(value))
    }

    /// Write without a bounds check.
    ///
    /// # Safety
    /// `i` must be less than `self.len()`.
    pub(crate) unsafe fn set_unchecked(&mut self, i: usize, value: Scalar) {
        dispatch_host!(self, v => unsafe { *v.get_unchecked_mut(i) = Element::from_scalar(value) })
    }

    /// Copy of `len` elements starting at `first`; callers validate bounds.
    pub(crate) fn slice(&self, first: usize, len: usize) -> HostColumn {
        dispatch_host!(self, v => HostColumn::from(v[first..first + len].to_vec()))
    }

    /// Write all of `values` starting at `first`, casting element types if
    /// they differ. Callers validate bounds.
    pub(crate) fn write_at(&mut self, first: usize, values: &HostColumn) {
        use HostColumn::*;
        match (self, values) {
            (I8(d), I8(s)) => d[first..first + s.len()].copy_from_slice(s),
            (I16(d), I16(s)) => d[first..first + s.len()].copy_from_slice(s),
            (I32(d), I32(s)) => d[first..first + s.len()].copy_from_slice(s),
            (I64(d), I64(s)) => d[first..first + s.len()].copy_from_slice(s),
            (U8(d), U8(s)) => d[first..first + s.len()].copy_from_slice(s),
            (U16(d), U16(s)) => d[first..first + s.len()].copy_from_slice(s),
            (U32(d), U32(s)) => d[first..first + s.len()].copy_from_slice(s),
            (U64(d), U64(s)) => d[first..first + s.len()].copy_from_slice(s),
            (F32(d), F32(s)) => d[first..first + s.len()].copy_from_slice(s),
            (F64(d), F64(s)) => d[first..first + s.len()].copy_from_slice(s),
            (dst, src) => {
                for i in 0..src.len() {
                    dst.set(first + i, src.scalar_at(i));
                }
            }
        }
    }

    /// Broadcast `value` across `len` elements starting at `first`.
    pub(crate) fn fill_at(&mut self, first: usize, len: usize, value: Scalar) {
        dispatch_host!(self, v => {
            let x = Element::from_scalar(value);
            for slot in &mut v[first..first + len] {
                *slot = x;
            }
        })
    }

    /// Gather by index (permutation apply).
    pub(crate) fn take(&self, indices: &[usize]) -> HostColumn {
        dispatch_host!(self, v => {
            HostColumn::from(indices.iter().map(|&i| v[i]).collect::<Vec<_>>())
        })
    }

    /// Total ordering of two rows of this column.
    pub(crate) fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        dispatch_host!(self, v => v[a].cmp_total(v[b]))
    }

    /// Elementwise cast; a same-type cast is a plain clone.
    pub(crate) fn cast(&self, dtype: ElementType) -> HostColumn {
        if self.element_type() == dtype {
            return self.clone();
        }
        let mut out = HostColumn::zeros(dtype, self.len());
        for i in 0..self.len() {
            out.set(i, self.scalar_at(i));
        }
        out
    }
}

/// An ordered, name-keyed set of host columns.
///
/// Column order is preserved and significant: it determines the column order
/// of collections created from the table.
#[derive(Debug, Clone, Default)]
pub struct HostTable {
    columns: Vec<(String, HostColumn)>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named column. Fails on duplicate names.
    pub fn push(&mut self, name: &str, column: impl Into<HostColumn>) -> VectraResult<()> {
        if self.columns.iter().any(|(n, _)| n == name) {
            return Err(VectraError::DuplicateColumn(name.to_string()));
        }
        self.columns.push((name.to_string(), column.into()));
        Ok(())
    }

    /// Builder-style `push`.
    pub fn with(mut self, name: &str, column: impl Into<HostColumn>) -> VectraResult<Self> {
        self.push(name, column)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&HostColumn> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostColumn)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }
}
