//! Capability members and their access markers

use std::fmt;
use std::sync::Arc;

use crate::binding::{BoundValue, LiveBinding};
use crate::error::BindResult;
use crate::strategy::{NameFunction, Provide, Provider};
use crate::wrap::{ForBindingArrays, Unwrapper, Wrapper};

use super::shape::Shape;

/// Body of a member implemented on the capability itself
pub type DefaultBody = Arc<dyn Fn(&LiveBinding, &[BoundValue]) -> BindResult<BoundValue> + Send + Sync>;

/// How calls to a member are serviced
#[derive(Clone)]
pub enum MemberKind {
    /// Delegated to a real method
    Method,
    /// Getter or setter of a real field
    Field,
    /// Run on the binding itself, never delegated
    Provided(DefaultBody),
}

impl fmt::Debug for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Method => f.write_str("Method"),
            MemberKind::Field => f.write_str("Field"),
            MemberKind::Provided(_) => f.write_str("Provided"),
        }
    }
}

/// Explicit override of the real member name
#[derive(Debug, Clone)]
pub enum NameMarker {
    /// Constant name
    Named(String),
    /// Name computed from the member, capability and target type
    Computed(Provider<dyn NameFunction>),
}

/// One member of a capability type
#[derive(Clone)]
pub struct Member {
    name: String,
    kind: MemberKind,
    is_static: bool,
    params: Vec<Shape>,
    returns: Shape,
    target_name: Option<NameMarker>,
    wrapper: Option<Provider<dyn Wrapper>>,
    unwrapper: Option<Provider<dyn Unwrapper>>,
}

impl Member {
    fn new(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_static: false,
            params: Vec::new(),
            returns: Shape::Void,
            target_name: None,
            wrapper: None,
            unwrapper: None,
        }
    }

    /// A member delegated to a real method
    pub fn method(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Method)
    }

    /// A member accessing a real field: called with no argument it reads
    /// the field, with one argument it writes it
    pub fn field(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Field)
    }

    /// A member with a body of its own
    pub fn provided<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&LiveBinding, &[BoundValue]) -> BindResult<BoundValue> + Send + Sync + 'static,
    {
        Self::new(name, MemberKind::Provided(Arc::new(body)))
    }

    /// Mark as static-scope
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Map to a real member with a different name
    pub fn named(mut self, real_name: impl Into<String>) -> Self {
        self.target_name = Some(NameMarker::Named(real_name.into()));
        self
    }

    /// Compute the real member name with a function discovered from `P`
    pub fn named_computed<P: Provide<dyn NameFunction>>(mut self) -> Self {
        self.target_name = Some(NameMarker::Computed(Provider::<dyn NameFunction>::discover::<P>()));
        self
    }

    /// Compute the real member name with the given function
    pub fn named_computed_with(mut self, function: Arc<dyn NameFunction>) -> Self {
        self.target_name = Some(NameMarker::Computed(Provider::<dyn NameFunction>::instance(function)));
        self
    }

    /// Add a parameter
    pub fn param(mut self, shape: impl Into<Shape>) -> Self {
        self.params.push(shape.into());
        self
    }

    /// Set the return shape
    pub fn returns(mut self, shape: impl Into<Shape>) -> Self {
        self.returns = shape.into();
        self
    }

    /// Override the wrap strategy for return values
    pub fn wrapper(mut self, wrapper: impl Wrapper + 'static) -> Self {
        self.wrapper = Some(Provider::<dyn Wrapper>::instance(Arc::new(wrapper)));
        self
    }

    /// Override the unwrap strategy for arguments
    pub fn unwrapper(mut self, unwrapper: impl Unwrapper + 'static) -> Self {
        self.unwrapper = Some(Provider::<dyn Unwrapper>::instance(Arc::new(unwrapper)));
        self
    }

    /// Override the wrap strategy with one discovered from `P`
    pub fn wrapper_from<P: Provide<dyn Wrapper>>(mut self) -> Self {
        self.wrapper = Some(Provider::<dyn Wrapper>::discover::<P>());
        self
    }

    /// Override the unwrap strategy with one discovered from `P`
    pub fn unwrapper_from<P: Provide<dyn Unwrapper>>(mut self) -> Self {
        self.unwrapper = Some(Provider::<dyn Unwrapper>::discover::<P>());
        self
    }

    /// Wrap and unwrap one-dimensional arrays element by element
    pub fn array_wrapping(self) -> Self {
        self.wrapper(ForBindingArrays).unwrapper(ForBindingArrays)
    }

    /// Member name as called
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How calls are serviced
    pub fn kind(&self) -> &MemberKind {
        &self.kind
    }

    /// Check if this is a field accessor
    pub fn is_field(&self) -> bool {
        matches!(self.kind, MemberKind::Field)
    }

    /// Check if the member is static-scope
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Declared parameter shapes
    pub fn params(&self) -> &[Shape] {
        &self.params
    }

    /// Declared return shape
    pub fn return_shape(&self) -> &Shape {
        &self.returns
    }

    /// Explicit real-name override, if any
    pub fn target_name(&self) -> Option<&NameMarker> {
        self.target_name.as_ref()
    }

    pub(crate) fn wrapper_override(&self) -> Option<&Provider<dyn Wrapper>> {
        self.wrapper.as_ref()
    }

    pub(crate) fn unwrapper_override(&self) -> Option<&Provider<dyn Unwrapper>> {
        self.unwrapper.as_ref()
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("is_static", &self.is_static)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("target_name", &self.target_name)
            .finish_non_exhaustive()
    }
}
