//! Strategy object discovery
//!
//! Computed targets and wrap strategies are named by *type*; the object
//! itself is obtained through a fixed sequence of steps, each of which a
//! provider may skip:
//!
//! | Order | Step             | Typical implementation                     |
//! |-------|------------------|--------------------------------------------|
//! | 1     | `factory`        | an associated constructor function         |
//! | 2     | `singleton`      | the single value of a one-variant type     |
//! | 3     | `instance_field` | a `static` / `Lazy` instance               |
//! | 4     | `construct`      | `Self::default()` or a bare unit struct    |
//!
//! The first step that yields an object wins. If all are skipped the
//! discovery fails with [`BindError::StrategyInstantiation`].

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{BindError, BindResult};

/// Discovery step names, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStep {
    /// Zero-argument factory function
    Factory,
    /// Single-instance type
    Singleton,
    /// Named singleton value
    InstanceField,
    /// Bare construction
    Construct,
}

impl DiscoveryStep {
    /// All steps in discovery order
    pub const ORDER: [DiscoveryStep; 4] = [
        DiscoveryStep::Factory,
        DiscoveryStep::Singleton,
        DiscoveryStep::InstanceField,
        DiscoveryStep::Construct,
    ];

    /// Step name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            DiscoveryStep::Factory => "factory",
            DiscoveryStep::Singleton => "singleton",
            DiscoveryStep::InstanceField => "instance_field",
            DiscoveryStep::Construct => "construct",
        }
    }
}

/// A type that can produce a strategy object of type `F`.
///
/// Every step defaults to "not available"; implement the ones that apply.
pub trait Provide<F: ?Sized>: 'static {
    /// Zero-argument factory
    fn factory() -> Option<Arc<F>> {
        None
    }

    /// The only value of a single-instance type
    fn singleton() -> Option<Arc<F>> {
        None
    }

    /// A named shared instance
    fn instance_field() -> Option<Arc<F>> {
        None
    }

    /// Bare construction
    fn construct() -> Option<Arc<F>> {
        None
    }
}

fn attempt<P: Provide<F>, F: ?Sized>(step: DiscoveryStep) -> Option<Arc<F>> {
    match step {
        DiscoveryStep::Factory => P::factory(),
        DiscoveryStep::Singleton => P::singleton(),
        DiscoveryStep::InstanceField => P::instance_field(),
        DiscoveryStep::Construct => P::construct(),
    }
}

/// Obtain a strategy object from `P`, trying each step in order
pub fn discover<P: Provide<F>, F: ?Sized>() -> BindResult<Arc<F>> {
    let provider = std::any::type_name::<P>();
    let mut attempted = Vec::with_capacity(DiscoveryStep::ORDER.len());

    for step in DiscoveryStep::ORDER {
        attempted.push(step.name());
        if let Some(found) = attempt::<P, F>(step) {
            tracing::trace!(provider, step = step.name(), "discovered strategy object");
            return Ok(found);
        }
    }

    Err(BindError::StrategyInstantiation {
        provider: provider.to_string(),
        attempted,
    })
}

/// A strategy object given directly or obtained lazily by discovery.
///
/// A discovered object is kept once obtained; a failed discovery is not
/// remembered and runs again on the next request.
pub enum Provider<F: ?Sized> {
    /// Object supplied by the caller
    Instance(Arc<F>),
    /// Object obtained on first use
    Discovered {
        /// Provider type name
        provider: &'static str,
        /// Discovery routine
        discover: fn() -> BindResult<Arc<F>>,
        /// Object once discovered
        cell: Arc<OnceCell<Arc<F>>>,
    },
}

impl<F: ?Sized + 'static> Provider<F> {
    /// Wrap an existing object
    pub fn instance(object: Arc<F>) -> Self {
        Provider::Instance(object)
    }

    /// Discover the object from `P` on first use
    pub fn discover<P: Provide<F>>() -> Self {
        Provider::Discovered {
            provider: std::any::type_name::<P>(),
            discover: discover::<P, F>,
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Get the object, discovering it if needed
    pub fn get(&self) -> BindResult<Arc<F>> {
        match self {
            Provider::Instance(object) => Ok(Arc::clone(object)),
            Provider::Discovered { discover, cell, .. } => cell.get_or_try_init(*discover).map(Arc::clone),
        }
    }

    /// Name of the provider, for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Instance(_) => "instance",
            Provider::Discovered { provider, .. } => *provider,
        }
    }
}

impl<F: ?Sized> Clone for Provider<F> {
    fn clone(&self) -> Self {
        match self {
            Provider::Instance(object) => Provider::Instance(Arc::clone(object)),
            Provider::Discovered {
                provider,
                discover,
                cell,
            } => Provider::Discovered {
                provider: *provider,
                discover: *discover,
                cell: Arc::clone(cell),
            },
        }
    }
}

impl<F: ?Sized> fmt::Debug for Provider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Instance(_) => f.write_str("Provider::Instance"),
            Provider::Discovered { provider, .. } => write!(f, "Provider::Discovered({})", provider),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Hello;

    impl Greeter for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    struct FromFactory;

    impl Provide<dyn Greeter> for FromFactory {
        fn factory() -> Option<Arc<dyn Greeter>> {
            Some(Arc::new(Hello))
        }

        fn construct() -> Option<Arc<dyn Greeter>> {
            panic!("factory must win over construct")
        }
    }

    struct FromConstruct;

    impl Provide<dyn Greeter> for FromConstruct {
        fn construct() -> Option<Arc<dyn Greeter>> {
            Some(Arc::new(Hello))
        }
    }

    struct Nothing;

    impl Provide<dyn Greeter> for Nothing {}

    static COUNTED_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Provide<dyn Greeter> for Counted {
        fn instance_field() -> Option<Arc<dyn Greeter>> {
            COUNTED_CALLS.fetch_add(1, Ordering::SeqCst);
            Some(Arc::new(Hello))
        }
    }

    #[test]
    fn test_first_available_step_wins() {
        assert_eq!(discover::<FromFactory, dyn Greeter>().unwrap().greet(), "hello");
        assert_eq!(discover::<FromConstruct, dyn Greeter>().unwrap().greet(), "hello");
    }

    #[test]
    fn test_all_steps_skipped() {
        match discover::<Nothing, dyn Greeter>() {
            Err(BindError::StrategyInstantiation { provider, attempted }) => {
                assert!(provider.ends_with("Nothing"));
                assert_eq!(attempted, vec!["factory", "singleton", "instance_field", "construct"]);
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_provider_discovers_once() {
        let provider = Provider::<dyn Greeter>::discover::<Counted>();
        let copy = provider.clone();
        provider.get().unwrap();
        copy.get().unwrap();
        assert_eq!(COUNTED_CALLS.load(Ordering::SeqCst), 1);
        assert!(provider.name().ends_with("Counted"));
    }

    #[test]
    fn test_failed_discovery_is_retried() {
        let provider = Provider::<dyn Greeter>::discover::<Nothing>();
        assert!(provider.get().is_err());
        assert!(provider.get().is_err());
    }
}
