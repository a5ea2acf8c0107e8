use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Run-time type identity of an aggregated value. Built-in constants share their numbering with
/// the PostgreSQL catalog so values coming from a host can be tagged without translation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeOid(pub u32);

impl TypeOid {
    pub const BOOL: TypeOid = TypeOid(16);
    pub const INT8: TypeOid = TypeOid(20);
    pub const INT2: TypeOid = TypeOid(21);
    pub const INT4: TypeOid = TypeOid(23);
    pub const TEXT: TypeOid = TypeOid(25);
    pub const BYTEA: TypeOid = TypeOid(17);
    pub const FLOAT4: TypeOid = TypeOid(700);
    pub const FLOAT8: TypeOid = TypeOid(701);
    pub const TIMESTAMP: TypeOid = TypeOid(1114);

    pub const BUILTIN: [TypeOid; 9] = [
        Self::BOOL,
        Self::INT8,
        Self::INT2,
        Self::INT4,
        Self::TEXT,
        Self::BYTEA,
        Self::FLOAT4,
        Self::FLOAT8,
        Self::TIMESTAMP,
    ];
}

impl fmt::Display for TypeOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque payload. Carries no ordering of its own that callers should rely on; ordering is
/// supplied by a resolved comparator.
#[derive(Debug, Clone)]
pub enum Datum {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Arc<str>),
    Bytes(Arc<[u8]>),
}

impl Datum {
    fn rank(&self) -> u8 {
        match self {
            Datum::Bool(_) => 0,
            Datum::Int(_) => 1,
            Datum::Float(_) => 2,
            Datum::Text(_) => 3,
            Datum::Bytes(_) => 4,
        }
    }

    /// Total order used by the built-in comparators. Floats follow `total_cmp`, so NaN sorts above
    /// every other value. Mismatched payload kinds order by kind.
    pub fn total_cmp(&self, other: &Datum) -> Ordering {
        match (self, other) {
            (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
            (Datum::Int(a), Datum::Int(b)) => a.cmp(b),
            (Datum::Float(a), Datum::Float(b)) => a.total_cmp(b),
            (Datum::Text(a), Datum::Text(b)) => a.cmp(b),
            (Datum::Bytes(a), Datum::Bytes(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Datum::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Datum::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Datum::Text(v) => Some(&v[..]),
            _ => None,
        }
    }
}

/// A datum tagged with its type identity. The feed represents a missing value as `None`.
#[derive(Debug, Clone)]
pub struct Value {
    pub type_oid: TypeOid,
    pub datum: Datum,
}

impl Value {
    pub fn new(type_oid: TypeOid, datum: Datum) -> Self {
        Self { type_oid, datum }
    }

    pub fn bool(v: bool) -> Self {
        Self::new(TypeOid::BOOL, Datum::Bool(v))
    }

    pub fn int2(v: i16) -> Self {
        Self::new(TypeOid::INT2, Datum::Int(v as i64))
    }

    pub fn int4(v: i32) -> Self {
        Self::new(TypeOid::INT4, Datum::Int(v as i64))
    }

    pub fn int8(v: i64) -> Self {
        Self::new(TypeOid::INT8, Datum::Int(v))
    }

    pub fn float4(v: f32) -> Self {
        Self::new(TypeOid::FLOAT4, Datum::Float(v as f64))
    }

    pub fn float8(v: f64) -> Self {
        Self::new(TypeOid::FLOAT8, Datum::Float(v))
    }

    pub fn text(v: &str) -> Self {
        Self::new(TypeOid::TEXT, Datum::Text(Arc::from(v)))
    }

    pub fn bytea(v: &[u8]) -> Self {
        Self::new(TypeOid::BYTEA, Datum::Bytes(Arc::from(v)))
    }

    /// Microseconds since the epoch.
    pub fn timestamp(micros: i64) -> Self {
        Self::new(TypeOid::TIMESTAMP, Datum::Int(micros))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_nan_sorts_last() {
        let nan = Datum::Float(f64::NAN);
        let inf = Datum::Float(f64::INFINITY);
        assert_eq!(nan.total_cmp(&inf), Ordering::Greater);
        assert_eq!(Datum::Float(-0.5).total_cmp(&Datum::Float(0.5)), Ordering::Less);
    }

    #[test]
    fn typed_constructors_tag_oid() {
        assert_eq!(Value::int4(3).type_oid, TypeOid::INT4);
        assert_eq!(Value::int8(3).type_oid, TypeOid::INT8);
        assert_eq!(Value::timestamp(3).type_oid, TypeOid::TIMESTAMP);
        assert_eq!(Value::text("a").datum.as_text(), Some("a"));
        assert_eq!(Value::int2(-4).datum.as_int(), Some(-4));
    }
}
