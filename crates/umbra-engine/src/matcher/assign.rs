//! Assignability and transformation cost between host types

use umbra_sdk::{ClassId, HostContext, HostResult, TypeRef};

/// Cost of passing a value through its boxed/unboxed counterpart
pub const BOXING_COST: f32 = 0.25;
/// Cost of satisfying an interface parameter
pub const INTERFACE_COST: f32 = 0.25;
/// Cost of each superclass step walked towards the parameter type
pub const SUPERCLASS_STEP_COST: f32 = 1.0;
/// Extra cost when the walk runs past the universal base type
pub const EXHAUSTED_WALK_COST: f32 = 1.5;

/// Check whether class `sub` is `sup` or inherits from it
pub fn is_subclass(host: &dyn HostContext, sub: ClassId, sup: ClassId) -> HostResult<bool> {
    if sub == sup || sup == ClassId::OBJECT {
        return Ok(true);
    }
    let info = host.class_info(sub)?;
    for parent in info.superclass.iter().chain(info.interfaces.iter()) {
        if is_subclass(host, *parent, sup)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Check whether a value of type `arg` may be passed where `param` is
/// declared.
///
/// Plain subtyping counts, arrays are covariant over reference components,
/// and a primitive parameter accepts exactly its boxed counterpart.
pub fn is_assignable(host: &dyn HostContext, param: &TypeRef, arg: &TypeRef) -> HostResult<bool> {
    if param == arg {
        return Ok(true);
    }
    Ok(match (param, arg) {
        (TypeRef::Class(p), TypeRef::Class(a)) => is_subclass(host, *a, *p)?,
        (TypeRef::Class(p), TypeRef::Array(_)) => *p == ClassId::OBJECT,
        (TypeRef::Array(p), TypeRef::Array(a)) => {
            !p.is_primitive() && !a.is_primitive() && is_assignable(host, p, a)?
        }
        (TypeRef::Primitive(p), TypeRef::Class(a)) => p.boxed() == *a,
        _ => false,
    })
}

fn is_interface(host: &dyn HostContext, ty: &TypeRef) -> HostResult<bool> {
    match ty {
        TypeRef::Class(id) => Ok(host.class_info(*id)?.is_interface()),
        _ => Ok(false),
    }
}

/// Direct superclass of a type; arrays extend the universal base type
fn superclass_of(host: &dyn HostContext, ty: &TypeRef) -> HostResult<Option<TypeRef>> {
    Ok(match ty {
        TypeRef::Class(id) => host.class_info(*id)?.superclass.map(TypeRef::Class),
        TypeRef::Array(_) => Some(TypeRef::object()),
        TypeRef::Primitive(_) | TypeRef::Void => None,
    })
}

/// Cost of passing an `arg`-typed value to a `param`-typed parameter.
///
/// Walks up from `arg` one superclass at a time until it reaches `param`.
/// A boxed counterpart or an interface match ends the walk early at a
/// quarter step; running off the top of the hierarchy adds
/// [`EXHAUSTED_WALK_COST`].
pub fn transformation_cost(host: &dyn HostContext, arg: &TypeRef, param: &TypeRef) -> HostResult<f32> {
    let param_is_interface = is_interface(host, param)?;
    let mut cost = 0.0;
    let mut current = Some(arg.clone());

    while let Some(src) = current.take() {
        if &src == param {
            return Ok(cost);
        }
        if let TypeRef::Primitive(p) = param {
            if src == TypeRef::Class(p.boxed()) {
                return Ok(cost + BOXING_COST);
            }
        }
        if param_is_interface && is_assignable(host, param, &src)? {
            return Ok(cost + INTERFACE_COST);
        }
        cost += SUPERCLASS_STEP_COST;
        current = superclass_of(host, &src)?;
    }

    Ok(cost + EXHAUSTED_WALK_COST)
}

/// Summed cost of passing `args` to `params`
pub fn total_cost(host: &dyn HostContext, args: &[TypeRef], params: &[TypeRef]) -> HostResult<f32> {
    args.iter()
        .zip(params)
        .try_fold(0.0, |total, (arg, param)| Ok(total + transformation_cost(host, arg, param)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_heap::{ClassDefinition, Heap};
    use umbra_sdk::Primitive;

    #[test]
    fn test_assignability() {
        let heap = Heap::new();
        let int = TypeRef::Class(ClassId::INTEGER);
        assert!(is_assignable(&heap, &TypeRef::Class(ClassId::NUMBER), &int).unwrap());
        assert!(is_assignable(&heap, &TypeRef::object(), &int).unwrap());
        assert!(is_assignable(&heap, &TypeRef::Primitive(Primitive::Int), &int).unwrap());
        assert!(!is_assignable(&heap, &TypeRef::Primitive(Primitive::Long), &int).unwrap());
        assert!(!is_assignable(&heap, &int, &TypeRef::Class(ClassId::NUMBER)).unwrap());
        assert!(is_assignable(&heap, &TypeRef::Class(ClassId::COMPARABLE), &TypeRef::string()).unwrap());

        let strings = TypeRef::array_of(TypeRef::string());
        assert!(is_assignable(&heap, &TypeRef::array_of(TypeRef::object()), &strings).unwrap());
        assert!(is_assignable(&heap, &TypeRef::object(), &strings).unwrap());
        assert!(!is_assignable(
            &heap,
            &TypeRef::array_of(TypeRef::Primitive(Primitive::Long)),
            &TypeRef::array_of(TypeRef::Primitive(Primitive::Int))
        )
        .unwrap());
    }

    #[test]
    fn test_costs() {
        let heap = Heap::new();
        let int = TypeRef::Class(ClassId::INTEGER);

        assert_eq!(transformation_cost(&heap, &int, &int).unwrap(), 0.0);
        assert_eq!(
            transformation_cost(&heap, &int, &TypeRef::Primitive(Primitive::Int)).unwrap(),
            BOXING_COST
        );
        assert_eq!(
            transformation_cost(&heap, &int, &TypeRef::Class(ClassId::COMPARABLE)).unwrap(),
            INTERFACE_COST
        );
        assert_eq!(transformation_cost(&heap, &int, &TypeRef::Class(ClassId::NUMBER)).unwrap(), 1.0);
        assert_eq!(transformation_cost(&heap, &int, &TypeRef::object()).unwrap(), 2.0);
    }

    #[test]
    fn test_interface_through_superclass() {
        let heap = Heap::new();
        let named = heap.define_class(ClassDefinition::interface("test.Named")).unwrap();
        let base = heap
            .define_class(ClassDefinition::new("test.Base").implements(named))
            .unwrap();
        let derived = heap.define_class(ClassDefinition::new("test.Derived").extends(base)).unwrap();

        // Derived is not itself declared Named, but is assignable to it at step zero.
        assert_eq!(
            transformation_cost(&heap, &TypeRef::Class(derived), &TypeRef::Class(named)).unwrap(),
            INTERFACE_COST
        );
        assert_eq!(
            total_cost(
                &heap,
                &[TypeRef::Class(derived), TypeRef::Class(derived)],
                &[TypeRef::Class(base), TypeRef::object()]
            )
            .unwrap(),
            3.0
        );
    }

    #[test]
    fn test_exhausted_walk() {
        let heap = Heap::new();
        let unrelated = heap.define_class(ClassDefinition::interface("test.Unrelated")).unwrap();
        assert_eq!(
            transformation_cost(&heap, &TypeRef::Class(ClassId::INTEGER), &TypeRef::Class(unrelated)).unwrap(),
            3.0 + EXHAUSTED_WALK_COST
        );
    }
}
