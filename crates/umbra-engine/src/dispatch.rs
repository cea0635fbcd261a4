//! Call dispatch
//!
//! Every call on a [`LiveBinding`] is classified in a fixed order:
//!
//! 1. `target`, `capability`: answered from the binding itself
//! 2. `toString`, `equals`, `hashCode`: answered by the binding's own
//!    equality rule, never delegated
//! 3. provided members: the member's own body runs
//! 4. field accessors: getter with no argument, setter with one
//! 5. everything else described on the capability: a delegated method call
//!
//! A name that fits none of these is an [`BindError::UnclassifiedMember`].

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;
use umbra_sdk::{TypeRef, Value};

use crate::binding::{BoundValue, LiveBinding};
use crate::capability::{Member, MemberKind};
use crate::error::{BindError, BindResult, CallSite, HostResultExt};
use crate::wrap::{Unwrapper, WrapContext, Wrapper};

pub(crate) fn dispatch(binding: &LiveBinding, name: &str, args: Vec<BoundValue>) -> BindResult<BoundValue> {
    let site = binding.definition().site(name);

    if let Some(result) = intrinsic(binding, name, &args, &site)? {
        return Ok(result);
    }

    let Some((index, member)) = binding.capability().member(name) else {
        return Err(BindError::UnclassifiedMember { site });
    };

    match member.kind() {
        MemberKind::Provided(body) => body(binding, &args),
        MemberKind::Field => access_field(binding, index, member, args, &site),
        MemberKind::Method => call_method(binding, index, member, args, &site),
    }
}

fn expect_args(args: &[BoundValue], expected: usize, site: &CallSite) -> BindResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(BindError::ArgumentCount {
            site: site.clone(),
            expected,
            got: args.len(),
        })
    }
}

fn intrinsic(binding: &LiveBinding, name: &str, args: &[BoundValue], site: &CallSite) -> BindResult<Option<BoundValue>> {
    let result = match name {
        "target" => {
            expect_args(args, 0, site)?;
            BoundValue::Value(binding.target().cloned().unwrap_or(Value::Null))
        }
        "capability" => {
            expect_args(args, 0, site)?;
            BoundValue::Value(Value::string(binding.capability().name()))
        }
        "toString" => {
            expect_args(args, 0, site)?;
            BoundValue::Value(Value::string(binding.to_string()))
        }
        "equals" => {
            expect_args(args, 1, site)?;
            let equal = matches!(&args[0], BoundValue::Binding(other) if other == binding);
            BoundValue::Value(Value::Boolean(equal))
        }
        "hashCode" => {
            expect_args(args, 0, site)?;
            let mut hasher = FxHasher::default();
            binding.hash(&mut hasher);
            BoundValue::Value(Value::Int(hasher.finish() as i32))
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn check_scope(binding: &LiveBinding, member: &Member, site: &CallSite) -> BindResult<()> {
    if binding.is_static() && !member.is_static() {
        return Err(BindError::Scope {
            site: site.clone(),
            reason: format!("{} is not static-scope and the binding has no target", member.name()),
        });
    }
    Ok(())
}

fn wrapper_for(binding: &LiveBinding, member: &Member) -> BindResult<Arc<dyn Wrapper>> {
    match member.wrapper_override() {
        Some(provider) => provider.get(),
        None => Ok(binding.registry().default_wrapper()),
    }
}

fn unwrapper_for(binding: &LiveBinding, member: &Member) -> BindResult<Arc<dyn Unwrapper>> {
    match member.unwrapper_override() {
        Some(provider) => provider.get(),
        None => Ok(binding.registry().default_unwrapper()),
    }
}

fn access_field(
    binding: &LiveBinding,
    index: usize,
    member: &Member,
    mut args: Vec<BoundValue>,
    site: &CallSite,
) -> BindResult<BoundValue> {
    if args.len() > 1 {
        return Err(BindError::AccessorArity {
            site: site.clone(),
            got: args.len(),
        });
    }
    expect_args(&args, member.params().len(), site)?;
    check_scope(binding, member, site)?;

    let registry = binding.registry();
    let host = registry.host();
    let field = binding.definition().field(host, registry.resolvers(), index)?;
    let cx = WrapContext::new(registry, site);
    let wrapper = wrapper_for(binding, member)?;

    let Some(arg) = args.pop() else {
        let raw = field.get(host, binding.target()).at(|| site.clone())?;
        return wrapper.wrap(raw, member.return_shape(), &cx);
    };

    let unwrapper = unwrapper_for(binding, member)?;
    let param = unwrapper.unwrap_shape(&member.params()[0], &cx)?;
    let raw = unwrapper.unwrap(arg, &param, &cx)?;
    field.set(host, binding.target(), raw).at(|| site.clone())?;

    if member.return_shape().is_void() {
        return Ok(BoundValue::default());
    }
    let handle = binding.target().cloned().unwrap_or(Value::Null);
    wrapper.wrap(handle, member.return_shape(), &cx)
}

fn call_method(
    binding: &LiveBinding,
    index: usize,
    member: &Member,
    args: Vec<BoundValue>,
    site: &CallSite,
) -> BindResult<BoundValue> {
    expect_args(&args, member.params().len(), site)?;
    check_scope(binding, member, site)?;

    let registry = binding.registry();
    let host = registry.host();
    let cx = WrapContext::new(registry, site);
    let unwrapper = unwrapper_for(binding, member)?;

    let params = unwrapper.unwrap_shapes(member.params(), &cx)?;
    let raw_args = unwrapper.unwrap_all(args, &params, &cx)?;
    let arg_types = raw_args
        .iter()
        .zip(&params)
        .map(|(value, param)| {
            let ty = host.type_of_value(value).at(|| site.clone())?;
            Ok(ty.unwrap_or_else(|| param.clone()))
        })
        .collect::<BindResult<Vec<TypeRef>>>()?;

    let method = binding.definition().method(host, registry.resolvers(), index, &arg_types)?;
    let raw = method
        .invoke(host, binding.target(), &raw_args)
        .at(|| site.clone())?;

    wrapper_for(binding, member)?.wrap(raw, member.return_shape(), &cx)
}
