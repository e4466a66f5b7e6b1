//! Block types and fall-down behaviors
//!
//! A block is an immutable unit of work. Each block type exposes exactly one
//! behavior, its "fall down", which runs with the dependencies placed for that
//! type and may touch follow-up blocks while it runs.
//!
//! Blocks implement [`Block`] plus one of [`FallDown`] (non-blocking) or
//! [`FallDownBlocking`] (runs on the worker pool). Anything the scheduler holds
//! onto without knowing the concrete type is a [`AnyBlock`].

use std::any::TypeId;
use std::fmt::Debug;

use async_trait::async_trait;
use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::DynClone;

/// Error type returned by block behaviors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Core trait for every block type
///
/// Identity for placement and dispatch is the concrete type: all instances of
/// one block type share the action and dependencies placed for it.
pub trait Block: Debug + Clone + PartialEq + Send + Sync + 'static {
    /// Dependencies bound to this block type when it is placed
    type Deps: Send + Sync + 'static;

    /// Value produced by a successful fall down
    type Output: Send + Sync + 'static;

    /// Short name of this block type, used in logs, events and message headers
    fn type_name() -> &'static str {
        short_type_name::<Self>()
    }
}

/// Non-blocking fall-down behavior
///
/// Runs directly on the scheduler's runtime, so it must not block the thread.
#[async_trait]
pub trait FallDown: Block {
    async fn fall_down(&self, deps: &Self::Deps) -> Result<Self::Output, BoxError>;
}

/// Blocking fall-down behavior
///
/// Runs on the bounded worker pool so it cannot stall the scheduler.
pub trait FallDownBlocking: Block {
    fn fall_down(&self, deps: &Self::Deps) -> Result<Self::Output, BoxError>;
}

/// Object-safe view of a block whose concrete type has been erased
pub trait AnyBlock: Downcast + DynClone + Debug + Send + Sync + 'static {
    /// Type id of the concrete block type
    fn block_type_id(&self) -> TypeId;

    /// Short name of the concrete block type
    fn block_type_name(&self) -> &'static str;

    /// Compare with another erased block, false when the types differ
    fn dyn_eq(&self, other: &dyn AnyBlock) -> bool;
}
impl_downcast!(AnyBlock);
dyn_clone::clone_trait_object!(AnyBlock);

impl<B: Block> AnyBlock for B {
    fn block_type_id(&self) -> TypeId {
        TypeId::of::<B>()
    }

    fn block_type_name(&self) -> &'static str {
        B::type_name()
    }

    fn dyn_eq(&self, other: &dyn AnyBlock) -> bool {
        other.downcast_ref::<B>().is_some_and(|other| other == self)
    }
}

impl PartialEq for dyn AnyBlock {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

/// Last path segment of a type name, e.g. `Fetch` for `my_app::blocks::Fetch`
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Fetch {
        url: String,
    }

    impl Block for Fetch {
        type Deps = ();
        type Output = usize;
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Notify;

    impl Block for Notify {
        type Deps = ();
        type Output = ();
    }

    #[test]
    fn test_block_type_name_is_short() {
        assert_eq!(Fetch::type_name(), "Fetch");
        assert_eq!(Notify::type_name(), "Notify");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }

    #[test]
    fn test_dyn_eq_compares_type_and_value() {
        let a: Box<dyn AnyBlock> = Box::new(Fetch {
            url: "a".to_string(),
        });
        let a2: Box<dyn AnyBlock> = Box::new(Fetch {
            url: "a".to_string(),
        });
        let b: Box<dyn AnyBlock> = Box::new(Fetch {
            url: "b".to_string(),
        });
        let n: Box<dyn AnyBlock> = Box::new(Notify);

        assert!(a.dyn_eq(&*a2));
        assert!(!a.dyn_eq(&*b));
        assert!(!a.dyn_eq(&*n));

        let n2: Box<dyn AnyBlock> = Box::new(Notify);
        assert!(n == n2);
        assert!(a != n);
    }

    #[test]
    fn test_erased_block_downcasts_and_clones() {
        let erased: Box<dyn AnyBlock> = Box::new(Fetch {
            url: "x".to_string(),
        });
        assert_eq!(erased.block_type_id(), TypeId::of::<Fetch>());
        assert_eq!(erased.block_type_name(), "Fetch");

        let cloned = dyn_clone::clone_box(&*erased);
        let fetch = cloned.downcast::<Fetch>().unwrap();
        assert_eq!(fetch.url, "x");
        assert!(erased.downcast_ref::<Notify>().is_none());
    }
}
