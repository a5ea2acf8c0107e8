use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use tracing::trace;

use crate::datum::{Datum, TypeOid};
use crate::error::{MedianError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Lt,
    Eq,
    Le,
    /// Combined three-way comparison.
    Cmp,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Le => "<=",
            Operator::Cmp => "cmp",
        }
    }

    pub fn is_predicate(&self) -> bool {
        !matches!(self, Operator::Cmp)
    }

    fn from_three_way(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Lt => ordering == Ordering::Less,
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Le => ordering != Ordering::Greater,
            Operator::Cmp => unreachable!("three-way comparison is not a predicate"),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

pub type PredicateFn = Arc<dyn Fn(&Datum, &Datum) -> bool + Send + Sync>;
pub type ThreeWayFn = Arc<dyn Fn(&Datum, &Datum) -> Ordering + Send + Sync>;

#[derive(Clone)]
pub enum ComparatorFn {
    Predicate(PredicateFn),
    ThreeWay(ThreeWayFn),
}

/// An operator resolved for one type identity. Cloning shares the underlying callable.
#[derive(Clone)]
pub struct Comparator {
    type_oid: TypeOid,
    operator: Operator,
    func: ComparatorFn,
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("type_oid", &self.type_oid)
            .field("operator", &self.operator)
            .finish()
    }
}

impl Comparator {
    pub fn predicate<F>(type_oid: TypeOid, operator: Operator, f: F) -> Result<Self>
    where
        F: Fn(&Datum, &Datum) -> bool + Send + Sync + 'static,
    {
        if !operator.is_predicate() {
            return Err(MedianError::NotAPredicate { operator });
        }
        Ok(Self { type_oid, operator, func: ComparatorFn::Predicate(Arc::new(f)) })
    }

    pub fn three_way<F>(type_oid: TypeOid, f: F) -> Self
    where
        F: Fn(&Datum, &Datum) -> Ordering + Send + Sync + 'static,
    {
        Self { type_oid, operator: Operator::Cmp, func: ComparatorFn::ThreeWay(Arc::new(f)) }
    }

    pub fn type_oid(&self) -> TypeOid {
        self.type_oid
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn as_predicate(&self) -> Option<&PredicateFn> {
        match &self.func {
            ComparatorFn::Predicate(f) => Some(f),
            ComparatorFn::ThreeWay(_) => None,
        }
    }

    pub fn as_three_way(&self) -> Option<&ThreeWayFn> {
        match &self.func {
            ComparatorFn::ThreeWay(f) => Some(f),
            ComparatorFn::Predicate(_) => None,
        }
    }

    /// Applies the comparator as a predicate. A three-way comparator answers `a < b`.
    pub fn test(&self, a: &Datum, b: &Datum) -> bool {
        match &self.func {
            ComparatorFn::Predicate(f) => f(a, b),
            ComparatorFn::ThreeWay(f) => f(a, b) == Ordering::Less,
        }
    }

    /// Values bound to another type identity must never reach this comparator.
    pub fn check_type(&self, type_oid: TypeOid) -> Result<()> {
        if self.type_oid != type_oid {
            return Err(MedianError::TypeMismatch { expected: type_oid, found: self.type_oid });
        }
        Ok(())
    }
}

/// Resolves relational operators for a type identity. Callers resolve once per aggregation and
/// reuse the returned comparator for every element.
pub trait OperatorCatalog: Send + Sync {
    fn resolve(&self, type_oid: TypeOid, operator: Operator) -> Result<Comparator>;
}

/// In-memory operator table. Built-in types get a three-way comparator backed by
/// [`Datum::total_cmp`]; relational predicates are derived from whichever form is registered.
pub struct BuiltinCatalog {
    entries: HashMap<(TypeOid, Operator), ComparatorFn, FnvBuildHasher>,
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinCatalog {
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        for type_oid in TypeOid::BUILTIN {
            catalog.register_three_way(type_oid, |a, b| a.total_cmp(b));
        }
        catalog
    }

    pub fn empty() -> Self {
        Self { entries: HashMap::default() }
    }

    pub fn register_three_way<F>(&mut self, type_oid: TypeOid, f: F)
    where
        F: Fn(&Datum, &Datum) -> Ordering + Send + Sync + 'static,
    {
        self.entries.insert((type_oid, Operator::Cmp), ComparatorFn::ThreeWay(Arc::new(f)));
    }

    pub fn register_predicate<F>(&mut self, type_oid: TypeOid, operator: Operator, f: F) -> Result<()>
    where
        F: Fn(&Datum, &Datum) -> bool + Send + Sync + 'static,
    {
        if !operator.is_predicate() {
            return Err(MedianError::NotAPredicate { operator });
        }
        self.entries.insert((type_oid, operator), ComparatorFn::Predicate(Arc::new(f)));
        Ok(())
    }

    pub fn contains(&self, type_oid: TypeOid, operator: Operator) -> bool {
        self.entries.contains_key(&(type_oid, operator))
    }
}

impl OperatorCatalog for BuiltinCatalog {
    fn resolve(&self, type_oid: TypeOid, operator: Operator) -> Result<Comparator> {
        if let Some(func) = self.entries.get(&(type_oid, operator)) {
            return Ok(Comparator { type_oid, operator, func: func.clone() });
        }

        // Fall back to deriving the requested form from one that is registered.
        let derived = match operator {
            Operator::Cmp => match self.entries.get(&(type_oid, Operator::Lt)) {
                Some(ComparatorFn::Predicate(lt)) => {
                    let lt = lt.clone();
                    Some(Comparator::three_way(type_oid, move |a, b| {
                        if lt(a, b) {
                            Ordering::Less
                        } else if lt(b, a) {
                            Ordering::Greater
                        } else {
                            Ordering::Equal
                        }
                    }))
                }
                _ => None,
            },
            _ => match self.entries.get(&(type_oid, Operator::Cmp)) {
                Some(ComparatorFn::ThreeWay(cmp)) => {
                    let cmp = cmp.clone();
                    let derive = move |a: &Datum, b: &Datum| operator.from_three_way(cmp(a, b));
                    Some(Comparator { type_oid, operator, func: ComparatorFn::Predicate(Arc::new(derive)) })
                }
                _ => None,
            },
        };

        match derived {
            Some(comparator) => {
                trace!(%type_oid, %operator, "derived comparator from registered operator");
                Ok(comparator)
            }
            None => Err(MedianError::OperatorNotFound { operator, type_oid }),
        }
    }
}

impl<C: OperatorCatalog + ?Sized> OperatorCatalog for Arc<C> {
    fn resolve(&self, type_oid: TypeOid, operator: Operator) -> Result<Comparator> {
        (**self).resolve(type_oid, operator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_predicates_are_derived() {
        let catalog = BuiltinCatalog::new();
        let lt = catalog.resolve(TypeOid::INT4, Operator::Lt).unwrap();
        let le = catalog.resolve(TypeOid::INT4, Operator::Le).unwrap();
        let eq = catalog.resolve(TypeOid::INT4, Operator::Eq).unwrap();

        let (one, two) = (Datum::Int(1), Datum::Int(2));
        assert!(lt.as_predicate().unwrap()(&one, &two));
        assert!(!lt.as_predicate().unwrap()(&two, &two));
        assert!(le.as_predicate().unwrap()(&two, &two));
        assert!(eq.as_predicate().unwrap()(&two, &two));
        assert!(!eq.as_predicate().unwrap()(&one, &two));
        assert!(lt.as_three_way().is_none());
    }

    #[test]
    fn three_way_derived_from_lt() {
        let mut catalog = BuiltinCatalog::empty();
        let custom = TypeOid(90_001);
        // Reverse order to make sure the registered predicate is what gets used.
        catalog.register_predicate(custom, Operator::Lt, |a, b| a.as_int() > b.as_int()).unwrap();
        assert!(catalog.contains(custom, Operator::Lt));
        assert!(!catalog.contains(custom, Operator::Cmp));

        let cmp = catalog.resolve(custom, Operator::Cmp).unwrap();
        let cmp = cmp.as_three_way().unwrap();
        assert_eq!(cmp(&Datum::Int(1), &Datum::Int(2)), Ordering::Greater);
        assert_eq!(cmp(&Datum::Int(2), &Datum::Int(2)), Ordering::Equal);
    }

    #[test]
    fn missing_operator() {
        let catalog = BuiltinCatalog::new();
        let err = catalog.resolve(TypeOid(4242), Operator::Le).unwrap_err();
        assert_eq!(err, MedianError::OperatorNotFound { operator: Operator::Le, type_oid: TypeOid(4242) });

        let mut catalog = BuiltinCatalog::empty();
        catalog.register_predicate(TypeOid(7), Operator::Eq, |a, b| a.as_int() == b.as_int()).unwrap();
        assert!(catalog.resolve(TypeOid(7), Operator::Lt).is_err());
        assert!(catalog.resolve(TypeOid(7), Operator::Cmp).is_err());
    }

    #[test]
    fn three_way_is_not_a_predicate() {
        let mut catalog = BuiltinCatalog::empty();
        let err = catalog.register_predicate(TypeOid(8), Operator::Cmp, |_, _| true).unwrap_err();
        assert_eq!(err, MedianError::NotAPredicate { operator: Operator::Cmp });
        assert!(!catalog.contains(TypeOid(8), Operator::Cmp));

        let err = Comparator::predicate(TypeOid(8), Operator::Cmp, |_, _| true).unwrap_err();
        assert_eq!(err, MedianError::NotAPredicate { operator: Operator::Cmp });

        let le = Comparator::predicate(TypeOid(8), Operator::Le, |a, b| a.as_int() <= b.as_int()).unwrap();
        assert_eq!(le.operator(), Operator::Le);
        assert!(le.test(&Datum::Int(2), &Datum::Int(2)));
    }

    #[test]
    fn builtin_types_registered() {
        let catalog = BuiltinCatalog::new();
        for type_oid in TypeOid::BUILTIN {
            assert!(catalog.contains(type_oid, Operator::Cmp));
            assert!(!catalog.contains(type_oid, Operator::Lt));
        }
    }

    #[test]
    fn type_check() {
        let catalog = BuiltinCatalog::new();
        let lt = catalog.resolve(TypeOid::INT8, Operator::Lt).unwrap();
        assert!(lt.check_type(TypeOid::INT8).is_ok());
        assert_eq!(
            lt.check_type(TypeOid::TEXT).unwrap_err(),
            MedianError::TypeMismatch { expected: TypeOid::TEXT, found: TypeOid::INT8 }
        );
    }
}
