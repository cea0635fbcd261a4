//! Member matcher
//!
//! Picks the real method or constructor that best fits a name and a list of
//! argument types, independent of any caching:
//!
//! 1. An exact signature match wins outright at zero cost.
//! 2. Otherwise every declared member with that name and arity whose
//!    parameters all accept the arguments is scored with
//!    [`assign::total_cost`]; the cheapest wins, and among equally cheap
//!    candidates the first declared wins.
//! 3. Methods (not constructors) that find nothing on a type retry on its
//!    superclass, then on each declared interface.

pub mod assign;

use umbra_sdk::{
    ClassId, ConstructorInfo, ConstructorRef, FieldInfo, FieldRef, HostContext, HostResult, MethodInfo, MethodRef,
    TypeRef,
};

/// A matched method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodMatch {
    /// Method handle
    pub method: MethodRef,
    /// Method descriptor
    pub info: MethodInfo,
    /// Transformation cost of the match
    pub cost: f32,
}

/// A matched constructor
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorMatch {
    /// Constructor handle
    pub constructor: ConstructorRef,
    /// Constructor descriptor
    pub info: ConstructorInfo,
    /// Transformation cost of the match
    pub cost: f32,
}

/// A matched field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    /// Field handle
    pub field: FieldRef,
    /// Field descriptor
    pub info: FieldInfo,
}

/// Check that every parameter accepts its argument
fn accepts(host: &dyn HostContext, params: &[TypeRef], args: &[TypeRef]) -> HostResult<bool> {
    if params.len() != args.len() {
        return Ok(false);
    }
    for (param, arg) in params.iter().zip(args) {
        if !assign::is_assignable(host, param, arg)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Find the best method named `name` for `args` on `class` or its supertypes
pub fn find_method(host: &dyn HostContext, class: ClassId, name: &str, args: &[TypeRef]) -> HostResult<Option<MethodMatch>> {
    let info = host.class_info(class)?;

    if let Some((method, exact)) = info.declared_method(name, args) {
        return Ok(Some(MethodMatch {
            method,
            info: exact.clone(),
            cost: 0.0,
        }));
    }

    let mut best: Option<MethodMatch> = None;
    for (method, candidate) in info.declared_methods_named(name) {
        if !accepts(host, &candidate.parameters, args)? {
            continue;
        }
        let cost = assign::total_cost(host, args, &candidate.parameters)?;
        if best.as_ref().map_or(true, |b| cost < b.cost) {
            best = Some(MethodMatch {
                method,
                info: candidate.clone(),
                cost,
            });
        }
    }
    if best.is_some() {
        return Ok(best);
    }

    if let Some(superclass) = info.superclass {
        if let Some(found) = find_method(host, superclass, name, args)? {
            return Ok(Some(found));
        }
    }
    for interface in &info.interfaces {
        if let Some(found) = find_method(host, *interface, name, args)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Find the best constructor of `class` for `args`; only `class` itself is
/// searched
pub fn find_constructor(host: &dyn HostContext, class: ClassId, args: &[TypeRef]) -> HostResult<Option<ConstructorMatch>> {
    let info = host.class_info(class)?;

    if let Some((constructor, exact)) = info.declared_constructor(args) {
        return Ok(Some(ConstructorMatch {
            constructor,
            info: exact.clone(),
            cost: 0.0,
        }));
    }

    let mut best: Option<ConstructorMatch> = None;
    for (constructor, candidate) in info.declared_constructors() {
        if !accepts(host, &candidate.parameters, args)? {
            continue;
        }
        let cost = assign::total_cost(host, args, &candidate.parameters)?;
        if best.as_ref().map_or(true, |b| cost < b.cost) {
            best = Some(ConstructorMatch {
                constructor,
                info: candidate.clone(),
                cost,
            });
        }
    }
    Ok(best)
}

/// Find the field `name` declared on `class` or the nearest superclass.
///
/// The walk stops below the universal base type.
pub fn find_field(host: &dyn HostContext, class: ClassId, name: &str) -> HostResult<Option<FieldMatch>> {
    let mut current = Some(class);
    while let Some(id) = current.filter(|id| *id != ClassId::OBJECT) {
        let info = host.class_info(id)?;
        if let Some((field, found)) = info.declared_field(name) {
            return Ok(Some(FieldMatch {
                field,
                info: found.clone(),
            }));
        }
        current = info.superclass;
    }
    Ok(None)
}
