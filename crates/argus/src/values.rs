//! Abstract values attached to expression tokens by value-flow.
//!
//! A value pairs a payload variant ([`ValueData`]) with certainty metadata:
//! the [`ValueKind`] tier, a range [`Bound`], an inconclusive flag marking
//! heuristic origin, the condition token that introduced the value, and an
//! error path of breadcrumbs used to explain diagnostics.
//!
//! Invariants enforced by the merge logic in `valueflow`:
//! a token carries at most one Known value of a given variant; Known and
//! Impossible are mutually exclusive meanings for the same payload; joins
//! demote disagreeing Knowns to Possibles.

use std::mem::discriminant;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use smallvec::SmallVec;

use crate::{symbols::ExprId, token::TokenId};

/// Certainty tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    /// Holds on every path reaching the token.
    Known,
    /// Holds on at least one path.
    #[default]
    Possible,
    /// Can not hold on any path.
    Impossible,
    /// Produced by a heuristic that may be wrong.
    Inconclusive,
}

/// Range approximation for integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bound {
    /// Exactly this value.
    #[default]
    Point,
    /// This value or anything greater.
    Lower,
    /// This value or anything smaller.
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimeScope {
    Local,
    Argument,
    SubFunction,
    Thread,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifetimeKind {
    Object,
    Lambda,
    Iterator,
    Address,
}

/// Payload variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    /// Integer, wider than any platform word so analysis arithmetic never
    /// overflows.
    Int(BigInt),
    Float(f64),
    /// Symbolic: equal to the expression rooted at this token.
    Tok(TokenId),
    /// Element count of a standard-library container.
    ContainerSize(BigInt),
    Iterator {
        container: ExprId,
        position: i64,
    },
    /// This value refers to storage named by `target`.
    Lifetime {
        target: ExprId,
        scope: LifetimeScope,
        kind: LifetimeKind,
    },
    Uninit,
    /// Byte count of an allocation.
    BufferSize(BigInt),
    /// Symbolic with offset: `token + delta`.
    Symbolic {
        token: TokenId,
        delta: i64,
    },
}

/// One abstract value.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractValue {
    pub data: ValueData,
    pub kind: ValueKind,
    pub bound: Bound,
    /// Heuristic origin; distinct from the `Inconclusive` kind.
    pub inconclusive: bool,
    /// The value came from a default function argument.
    pub default_arg: bool,
    /// Condition token that introduced the value, if any.
    pub condition: Option<TokenId>,
    /// Path tag distinguishing values from different branch joins.
    pub path: u32,
    /// Breadcrumbs: (token, explanation) pairs leading to the value.
    pub error_path: SmallVec<[(TokenId, String); 2]>,
}

impl AbstractValue {
    #[must_use]
    pub fn new(data: ValueData) -> Self {
        Self {
            data,
            kind: ValueKind::default(),
            bound: Bound::default(),
            inconclusive: false,
            default_arg: false,
            condition: None,
            path: 0,
            error_path: SmallVec::new(),
        }
    }

    /// Possible integer value.
    #[must_use]
    pub fn int(n: impl Into<BigInt>) -> Self {
        Self::new(ValueData::Int(n.into()))
    }

    /// Known integer value.
    #[must_use]
    pub fn known_int(n: impl Into<BigInt>) -> Self {
        let mut v = Self::int(n);
        v.kind = ValueKind::Known;
        v
    }

    #[must_use]
    pub fn float(f: f64) -> Self {
        Self::new(ValueData::Float(f))
    }

    #[must_use]
    pub fn tok(token: TokenId) -> Self {
        Self::new(ValueData::Tok(token))
    }

    #[must_use]
    pub fn container_size(n: impl Into<BigInt>) -> Self {
        Self::new(ValueData::ContainerSize(n.into()))
    }

    #[must_use]
    pub fn buffer_size(n: impl Into<BigInt>) -> Self {
        Self::new(ValueData::BufferSize(n.into()))
    }

    #[must_use]
    pub fn uninit() -> Self {
        Self::new(ValueData::Uninit)
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: TokenId) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn push_breadcrumb(&mut self, token: TokenId, note: impl Into<String>) {
        self.error_path.push((token, note.into()));
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        self.kind == ValueKind::Known
    }

    #[must_use]
    pub fn is_possible(&self) -> bool {
        self.kind == ValueKind::Possible
    }

    #[must_use]
    pub fn is_impossible(&self) -> bool {
        self.kind == ValueKind::Impossible
    }

    /// Downgrades Known to Possible; used at control-flow joins and for
    /// overridable callees.
    pub fn set_possible(&mut self) {
        if self.kind == ValueKind::Known {
            self.kind = ValueKind::Possible;
        }
    }

    pub fn set_known(&mut self) {
        if self.kind != ValueKind::Impossible {
            self.kind = ValueKind::Known;
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&BigInt> {
        match &self.data {
            ValueData::Int(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_int().and_then(ToPrimitive::to_i64)
    }

    #[must_use]
    pub fn is_int_zero(&self) -> bool {
        self.as_int().is_some_and(|n| n.bits() == 0)
    }

    /// Same payload variant (for the one-Known-per-variant rule).
    #[must_use]
    pub fn same_variant(&self, other: &Self) -> bool {
        discriminant(&self.data) == discriminant(&other.data)
    }

    /// Payload equality, ignoring certainty metadata.
    #[must_use]
    pub fn equal_data(&self, other: &Self) -> bool {
        self.data == other.data
    }

    /// Short rendering used inside diagnostic messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.data {
            ValueData::Int(n) => n.to_string(),
            ValueData::Float(f) => format!("{f}"),
            ValueData::Tok(_) | ValueData::Symbolic { .. } => "symbolic".to_owned(),
            ValueData::ContainerSize(n) => format!("size={n}"),
            ValueData::Iterator { position, .. } => format!("iterator:{position}"),
            ValueData::Lifetime { .. } => "lifetime".to_owned(),
            ValueData::Uninit => "uninitialized".to_owned(),
            ValueData::BufferSize(n) => format!("buffer-size={n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_possible() {
        let mut v = AbstractValue::known_int(3);
        assert!(v.is_known());
        v.set_possible();
        assert!(v.is_possible());
        assert_eq!(v.as_i64(), Some(3));
    }

    #[test]
    fn variant_discrimination() {
        let a = AbstractValue::int(0);
        let b = AbstractValue::int(7);
        let c = AbstractValue::container_size(0);
        assert!(a.same_variant(&b));
        assert!(!a.same_variant(&c));
        assert!(a.is_int_zero());
        assert!(!b.is_int_zero());
    }

    #[test]
    fn impossible_never_becomes_known() {
        let mut v = AbstractValue::int(1).with_kind(ValueKind::Impossible);
        v.set_known();
        assert!(v.is_impossible());
    }
}
