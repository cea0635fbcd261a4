//! Built-in resolvers

use umbra_sdk::{ClassId, ClassInfo, HostContext, HostResult};

use crate::capability::{CapabilityType, Member, NameMarker, TargetMarker};
use crate::error::{BindError, BindResult, CallSite, HostResultExt};

use super::TargetResolver;

/// Computes the target type of a capability on demand
pub trait ClassFunction: Send + Sync {
    /// Compute the target class
    fn compute_class(&self, capability: &CapabilityType, host: &dyn HostContext) -> HostResult<ClassId>;
}

impl<F> ClassFunction for F
where
    F: Fn(&CapabilityType, &dyn HostContext) -> HostResult<ClassId> + Send + Sync,
{
    fn compute_class(&self, capability: &CapabilityType, host: &dyn HostContext) -> HostResult<ClassId> {
        self(capability, host)
    }
}

/// Computes the real name of a capability member on demand
pub trait NameFunction: Send + Sync {
    /// Compute the real member name
    fn compute_name(&self, member: &Member, capability: &CapabilityType, target: &ClassInfo) -> String;
}

impl<F> NameFunction for F
where
    F: Fn(&Member, &CapabilityType, &ClassInfo) -> String + Send + Sync,
{
    fn compute_name(&self, member: &Member, capability: &CapabilityType, target: &ClassInfo) -> String {
        self(member, capability, target)
    }
}

/// Answers the target type from a constant class marker
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantTarget;

impl TargetResolver for ConstantTarget {
    fn lookup_class(&self, capability: &CapabilityType, _host: &dyn HostContext) -> BindResult<Option<ClassId>> {
        Ok(match capability.target_marker() {
            Some(TargetMarker::Class(class)) => Some(*class),
            _ => None,
        })
    }
}

/// Answers from string markers: class names go through the host's name
/// lookup, member names are taken as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedTarget;

impl TargetResolver for NamedTarget {
    fn lookup_class(&self, capability: &CapabilityType, host: &dyn HostContext) -> BindResult<Option<ClassId>> {
        let Some(TargetMarker::Named(name)) = capability.target_marker() else {
            return Ok(None);
        };
        host.class_by_name(name)
            .map(Some)
            .map_err(|e| BindError::UnresolvedTarget {
                site: CallSite::new(capability.name()),
                detail: e.to_string(),
            })
    }

    fn lookup_method(
        &self,
        member: &Member,
        _capability: &CapabilityType,
        _target: &ClassInfo,
    ) -> BindResult<Option<String>> {
        Ok(named(member))
    }

    fn lookup_field(
        &self,
        member: &Member,
        _capability: &CapabilityType,
        _target: &ClassInfo,
    ) -> BindResult<Option<String>> {
        Ok(named(member))
    }
}

fn named(member: &Member) -> Option<String> {
    match member.target_name() {
        Some(NameMarker::Named(name)) => Some(name.clone()),
        _ => None,
    }
}

/// Answers from computed markers, obtaining the function objects through
/// discovery on first use
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputedTarget;

impl ComputedTarget {
    fn compute_name(member: &Member, capability: &CapabilityType, target: &ClassInfo) -> BindResult<Option<String>> {
        match member.target_name() {
            Some(NameMarker::Computed(provider)) => {
                let function = provider.get()?;
                Ok(Some(function.compute_name(member, capability, target)))
            }
            _ => Ok(None),
        }
    }
}

impl TargetResolver for ComputedTarget {
    fn lookup_class(&self, capability: &CapabilityType, host: &dyn HostContext) -> BindResult<Option<ClassId>> {
        let Some(TargetMarker::Computed(provider)) = capability.target_marker() else {
            return Ok(None);
        };
        let function = provider.get()?;
        function
            .compute_class(capability, host)
            .map(Some)
            .at(|| CallSite::new(capability.name()))
    }

    fn lookup_method(
        &self,
        member: &Member,
        capability: &CapabilityType,
        target: &ClassInfo,
    ) -> BindResult<Option<String>> {
        Self::compute_name(member, capability, target)
    }

    fn lookup_field(
        &self,
        member: &Member,
        capability: &CapabilityType,
        target: &ClassInfo,
    ) -> BindResult<Option<String>> {
        Self::compute_name(member, capability, target)
    }
}

/// Maps `getFoo` / `isFoo` / `setFoo` accessors to the field `foo`
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyAccessorNames;

impl FuzzyAccessorNames {
    /// Field name implied by an accessor name, if it follows the pattern
    pub fn field_name(accessor: &str) -> Option<String> {
        ["get", "is", "set"].iter().find_map(|prefix| {
            let rest = accessor.strip_prefix(*prefix)?;
            let mut chars = rest.chars();
            let first = chars.next().filter(char::is_ascii_uppercase)?;
            Some(first.to_ascii_lowercase().to_string() + chars.as_str())
        })
    }
}

impl TargetResolver for FuzzyAccessorNames {
    fn lookup_field(
        &self,
        member: &Member,
        _capability: &CapabilityType,
        _target: &ClassInfo,
    ) -> BindResult<Option<String>> {
        Ok(Self::field_name(member.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use umbra_heap::Heap;
    use umbra_sdk::HostError;

    fn target() -> ClassInfo {
        ClassInfo {
            id: ClassId::new(40),
            name: "app.Person".to_string(),
            kind: Default::default(),
            superclass: Some(ClassId::OBJECT),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    #[test]
    fn test_fuzzy_field_names() {
        assert_eq!(FuzzyAccessorNames::field_name("getAge").as_deref(), Some("age"));
        assert_eq!(FuzzyAccessorNames::field_name("isAlive").as_deref(), Some("alive"));
        assert_eq!(FuzzyAccessorNames::field_name("setFullName").as_deref(), Some("fullName"));
        assert_eq!(FuzzyAccessorNames::field_name("getaway"), None);
        assert_eq!(FuzzyAccessorNames::field_name("get"), None);
        assert_eq!(FuzzyAccessorNames::field_name("age"), None);
    }

    #[test]
    fn test_fuzzy_only_answers_fields() {
        let capability = CapabilityType::builder("Person").build().unwrap();
        let member = Member::method("getAge");
        let resolver = FuzzyAccessorNames;
        assert_eq!(resolver.lookup_method(&member, &capability, &target()).unwrap(), None);
        assert_eq!(
            resolver.lookup_field(&member, &capability, &target()).unwrap().as_deref(),
            Some("age")
        );
    }

    #[test]
    fn test_named_member() {
        let capability = CapabilityType::builder("Person").build().unwrap();
        let member = Member::field("years").named("age");
        assert_eq!(
            NamedTarget.lookup_field(&member, &capability, &target()).unwrap().as_deref(),
            Some("age")
        );
        assert_eq!(ConstantTarget.lookup_field(&member, &capability, &target()).unwrap(), None);
    }

    #[test]
    fn test_computed_name_with_closure() {
        let capability = CapabilityType::builder("Person").build().unwrap();
        let function: Arc<dyn NameFunction> =
            Arc::new(|member: &Member, _: &CapabilityType, target: &ClassInfo| format!("{}_{}", target.name, member.name()));
        let member = Member::method("run").named_computed_with(function);
        assert_eq!(
            ComputedTarget.lookup_method(&member, &capability, &target()).unwrap().as_deref(),
            Some("app.Person_run")
        );
    }

    #[test]
    fn test_computed_class_errors_carry_site() {
        let function: Arc<dyn ClassFunction> = Arc::new(|_: &CapabilityType, _: &dyn HostContext| -> HostResult<ClassId> {
            Err(HostError::UnknownClass("nowhere".to_string()))
        });
        let capability = CapabilityType::builder("Lost").target_computed_with(function).build().unwrap();

        let heap = Heap::new();
        let err = ComputedTarget.lookup_class(&capability, &heap).unwrap_err();
        assert!(matches!(err, BindError::Host { .. }));
        assert_eq!(err.site().map(|s| s.capability.as_str()), Some("Lost"));

        let named = CapabilityType::builder("Missing").target_named("app.Gone").build().unwrap();
        assert!(matches!(
            NamedTarget.lookup_class(&named, &heap),
            Err(BindError::UnresolvedTarget { .. })
        ));
    }
}
