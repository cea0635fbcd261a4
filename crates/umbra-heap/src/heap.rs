//! Managed object heap
//!
//! Classes are registered once and never unloaded. Objects live in a
//! concurrent map keyed by handle until [`Heap::release`] drops them; there
//! is no collector. Each object guards its own field storage, so two threads
//! touching the same object interleave at field granularity and nothing
//! coarser.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use umbra_sdk::{
    ClassId, ClassInfo, ClassKind, ConstructorRef, FieldRef, HostContext, HostError, HostResult,
    MethodRef, ObjectRef, TypeRef, Value,
};

use crate::class::{ClassDefinition, NativeConstructor, NativeMethod};

/// A registered class with its executable members
struct LoadedClass {
    info: Arc<ClassInfo>,
    /// Zero value per declared field, indexed like `info.fields`
    field_defaults: Vec<Value>,
    methods: Vec<NativeMethod>,
    constructors: Vec<NativeConstructor>,
    statics: RwLock<FxHashMap<usize, Value>>,
}

impl LoadedClass {
    fn load(id: ClassId, def: ClassDefinition) -> Self {
        let field_defaults: Vec<Value> = def.fields.iter().map(|f| f.zero_value()).collect();
        let statics = def
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.modifiers.is_static)
            .map(|(index, _)| (index, field_defaults[index].clone()))
            .collect();

        let info = ClassInfo {
            id,
            name: def.name,
            kind: def.kind,
            superclass: def.superclass,
            interfaces: def.interfaces,
            fields: def.fields.iter().map(|f| f.info()).collect(),
            methods: def.methods.iter().map(|m| m.info()).collect(),
            constructors: def.constructors.iter().map(|c| c.info()).collect(),
        };

        Self {
            info: Arc::new(info),
            field_defaults,
            methods: def.methods.into_iter().map(|m| m.body).collect(),
            constructors: def.constructors.into_iter().map(|c| c.body).collect(),
            statics: RwLock::new(statics),
        }
    }

    fn member_name(&self, member: &str) -> String {
        format!("{}.{}", self.info.name, member)
    }

    fn no_such(&self, member: impl std::fmt::Display) -> HostError {
        HostError::NoSuchMember {
            class: self.info.name.clone(),
            member: member.to_string(),
        }
    }
}

/// Classes indexed by id, plus the name index
#[derive(Default)]
struct ClassTable {
    classes: Vec<Arc<LoadedClass>>,
    name_to_id: FxHashMap<String, ClassId>,
}

impl ClassTable {
    fn next_class_id(&self) -> ClassId {
        ClassId::new(self.classes.len())
    }

    fn get(&self, id: ClassId) -> Option<&Arc<LoadedClass>> {
        self.classes.get(id.index())
    }

    fn register(&mut self, def: ClassDefinition) -> ClassId {
        let id = self.next_class_id();
        self.name_to_id.insert(def.name.clone(), id);
        self.classes.push(Arc::new(LoadedClass::load(id, def)));
        id
    }

    fn validate(&self, def: &ClassDefinition) -> HostResult<()> {
        let invalid = |reason: String| HostError::InvalidDefinition {
            class: def.name.clone(),
            reason,
        };

        if self.name_to_id.contains_key(&def.name) {
            return Err(invalid("a class with this name is already defined".to_string()));
        }

        match (def.kind, def.superclass) {
            (ClassKind::Interface, Some(_)) => {
                return Err(invalid("interfaces cannot extend a class".to_string()));
            }
            (ClassKind::Class, None) => {
                return Err(invalid("classes must have a superclass".to_string()));
            }
            (ClassKind::Class, Some(superclass)) => match self.get(superclass) {
                Some(parent) if parent.info.is_interface() => {
                    return Err(invalid(format!("cannot extend interface {}", parent.info.name)));
                }
                Some(_) => {}
                None => return Err(invalid(format!("unknown superclass #{}", superclass.index()))),
            },
            (ClassKind::Interface, None) => {}
        }

        for interface in &def.interfaces {
            match self.get(*interface) {
                Some(iface) if iface.info.is_interface() => {}
                Some(other) => return Err(invalid(format!("{} is not an interface", other.info.name))),
                None => return Err(invalid(format!("unknown interface #{}", interface.index()))),
            }
        }

        if def.kind == ClassKind::Interface {
            if !def.constructors.is_empty() {
                return Err(invalid("interfaces cannot declare constructors".to_string()));
            }
            if def.fields.iter().any(|f| !f.modifiers.is_static) {
                return Err(invalid("interfaces cannot declare instance fields".to_string()));
            }
        }

        for (i, field) in def.fields.iter().enumerate() {
            if def.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(invalid(format!("duplicate field '{}'", field.name)));
            }
        }

        Ok(())
    }
}

/// Heap object storage
enum HeapObject {
    Instance {
        class: ClassId,
        fields: RwLock<FxHashMap<FieldRef, Value>>,
    },
    Array {
        component: TypeRef,
        elements: RwLock<Vec<Value>>,
    },
}

/// Managed object heap with runtime-defined classes
pub struct Heap {
    classes: RwLock<ClassTable>,
    objects: DashMap<ObjectRef, Arc<HeapObject>>,
    next_object: AtomicU64,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    /// Create a heap with the well-known classes registered
    pub fn new() -> Self {
        let heap = Self {
            classes: RwLock::new(ClassTable::default()),
            objects: DashMap::new(),
            next_object: AtomicU64::new(1),
        };
        crate::bootstrap::install_core_classes(&heap);
        heap
    }

    /// Register a well-known class without validation; the bootstrap order
    /// defines interfaces after the classes that implement them.
    pub(crate) fn install(&self, def: ClassDefinition) -> ClassId {
        self.classes.write().register(def)
    }

    /// Define a new class
    pub fn define_class(&self, def: ClassDefinition) -> HostResult<ClassId> {
        let mut table = self.classes.write();
        table.validate(&def)?;
        let name = def.name.clone();
        let id = table.register(def);
        tracing::debug!(class = %name, id = id.index(), "defined class");
        Ok(id)
    }

    /// Number of registered classes, including the well-known ones
    pub fn class_count(&self) -> usize {
        self.classes.read().classes.len()
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Drop `object` from the heap. Handles still pointing at it fail with
    /// [`HostError::UnknownObject`] afterwards.
    pub fn release(&self, object: ObjectRef) -> bool {
        let released = self.objects.remove(&object).is_some();
        if released {
            tracing::trace!(object = ?object, "released object");
        }
        released
    }

    fn class(&self, id: ClassId) -> HostResult<Arc<LoadedClass>> {
        self.classes
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| HostError::UnknownClass(format!("#{}", id.index())))
    }

    fn object(&self, object: ObjectRef) -> HostResult<Arc<HeapObject>> {
        self.objects
            .get(&object)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(HostError::UnknownObject(object))
    }

    fn next_ref(&self) -> ObjectRef {
        ObjectRef::from_raw(self.next_object.fetch_add(1, Ordering::Relaxed))
    }

    /// Check whether `sub` is `sup` or inherits from it through superclasses
    /// or interfaces
    pub fn is_subtype(&self, sub: ClassId, sup: ClassId) -> bool {
        if sub == sup || sup == ClassId::OBJECT {
            return true;
        }
        let Ok(class) = self.class(sub) else {
            return false;
        };
        class
            .info
            .superclass
            .into_iter()
            .chain(class.info.interfaces.iter().copied())
            .any(|parent| self.is_subtype(parent, sup))
    }

    // ========================================================================
    // Object helpers
    // ========================================================================

    /// Allocate an instance with every field at its zero value, without
    /// running a constructor
    pub fn alloc(&self, class: ClassId) -> HostResult<ObjectRef> {
        let mut fields = FxHashMap::default();
        let mut current = Some(class);
        while let Some(id) = current {
            let loaded = self.class(id)?;
            if id == class && loaded.info.is_interface() {
                return Err(HostError::InvalidDefinition {
                    class: loaded.info.name.clone(),
                    reason: "interfaces cannot be instantiated".to_string(),
                });
            }
            for (index, field) in loaded.info.fields.iter().enumerate() {
                if !field.modifiers.is_static {
                    fields.insert(FieldRef::new(id, index), loaded.field_defaults[index].clone());
                }
            }
            current = loaded.info.superclass;
        }

        let object = self.next_ref();
        self.objects.insert(
            object,
            Arc::new(HeapObject::Instance {
                class,
                fields: RwLock::new(fields),
            }),
        );
        Ok(object)
    }

    /// Allocate a one-dimensional array
    pub fn alloc_array(&self, component: TypeRef, elements: Vec<Value>) -> ObjectRef {
        let object = self.next_ref();
        self.objects.insert(
            object,
            Arc::new(HeapObject::Array {
                component,
                elements: RwLock::new(elements),
            }),
        );
        object
    }

    /// Find the instance field `name` visible on `class`; the nearest
    /// declaration wins
    fn instance_field(&self, class: ClassId, name: &str) -> HostResult<FieldRef> {
        let mut current = Some(class);
        while let Some(id) = current {
            let loaded = self.class(id)?;
            if let Some((field, info)) = loaded.info.declared_field(name) {
                if !info.modifiers.is_static {
                    return Ok(field);
                }
            }
            current = loaded.info.superclass;
        }
        Err(self.class(class)?.no_such(name))
    }

    fn instance_class(&self, object: ObjectRef) -> HostResult<ClassId> {
        match &*self.object(object)? {
            HeapObject::Instance { class, .. } => Ok(*class),
            HeapObject::Array { .. } => Err(HostError::NoSuchMember {
                class: "array".to_string(),
                member: "fields".to_string(),
            }),
        }
    }

    /// Read an instance field by name
    pub fn read(&self, object: ObjectRef, name: &str) -> HostResult<Value> {
        let field = self.instance_field(self.instance_class(object)?, name)?;
        self.get_field(field, Some(&Value::Object(object)))
    }

    /// Write an instance field by name
    pub fn write(&self, object: ObjectRef, name: &str, value: impl Into<Value>) -> HostResult<()> {
        let field = self.instance_field(self.instance_class(object)?, name)?;
        self.set_field(field, Some(&Value::Object(object)), value.into())
    }

    /// Receiver object for an instance member; `member` describes the member
    /// for error messages
    fn instance_fields(&self, receiver: Option<&Value>, member: &str) -> HostResult<Arc<HeapObject>> {
        match receiver {
            None | Some(Value::Null) => Err(HostError::MissingReceiver(member.to_string())),
            Some(Value::Object(object)) => self.object(*object),
            Some(other) => Err(HostError::NoSuchMember {
                class: other.kind_name().to_string(),
                member: member.to_string(),
            }),
        }
    }

    /// Check that `receiver` may run an instance method of `class`
    fn check_receiver(&self, class: &LoadedClass, receiver: Option<&Value>, member: &str) -> HostResult<()> {
        let ty = match receiver {
            None | Some(Value::Null) => return Err(HostError::MissingReceiver(member.to_string())),
            Some(value) => self.type_of_value(value)?,
        };
        let compatible = match ty {
            Some(TypeRef::Class(id)) => self.is_subtype(id, class.info.id),
            Some(TypeRef::Array(_)) => class.info.id == ClassId::OBJECT,
            _ => false,
        };
        if compatible {
            Ok(())
        } else {
            Err(class.no_such(member))
        }
    }
}

fn arity(member: String, expected: usize, got: usize) -> HostResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(HostError::ArgumentCount { member, expected, got })
    }
}

impl HostContext for Heap {
    fn class_info(&self, class: ClassId) -> HostResult<Arc<ClassInfo>> {
        self.class(class).map(|loaded| Arc::clone(&loaded.info))
    }

    fn class_by_name(&self, name: &str) -> HostResult<ClassId> {
        self.classes
            .read()
            .name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| HostError::UnknownClass(name.to_string()))
    }

    fn type_of(&self, object: ObjectRef) -> HostResult<TypeRef> {
        Ok(match &*self.object(object)? {
            HeapObject::Instance { class, .. } => TypeRef::Class(*class),
            HeapObject::Array { component, .. } => TypeRef::array_of(component.clone()),
        })
    }

    fn get_field(&self, field: FieldRef, receiver: Option<&Value>) -> HostResult<Value> {
        let class = self.class(field.class)?;
        let info = class.info.fields.get(field.index).ok_or_else(|| class.no_such(field))?;
        let member = class.member_name(&info.name);

        if info.modifiers.is_static {
            return Ok(class.statics.read().get(&field.index).cloned().unwrap_or_default());
        }

        match &*self.instance_fields(receiver, &member)? {
            HeapObject::Instance { fields, .. } => fields
                .read()
                .get(&field)
                .cloned()
                .ok_or_else(|| class.no_such(&info.name)),
            HeapObject::Array { .. } => Err(class.no_such(&info.name)),
        }
    }

    fn set_field(&self, field: FieldRef, receiver: Option<&Value>, value: Value) -> HostResult<()> {
        let class = self.class(field.class)?;
        let info = class.info.fields.get(field.index).ok_or_else(|| class.no_such(field))?;
        let member = class.member_name(&info.name);

        if info.modifiers.is_static {
            class.statics.write().insert(field.index, value);
            return Ok(());
        }

        match &*self.instance_fields(receiver, &member)? {
            HeapObject::Instance { fields, .. } => {
                let mut fields = fields.write();
                match fields.get_mut(&field) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(class.no_such(&info.name)),
                }
            }
            HeapObject::Array { .. } => Err(class.no_such(&info.name)),
        }
    }

    fn invoke(&self, method: MethodRef, receiver: Option<&Value>, args: &[Value]) -> HostResult<Value> {
        let class = self.class(method.class)?;
        let info = class.info.methods.get(method.index).ok_or_else(|| class.no_such(method))?;
        let member = class.member_name(&info.name);
        arity(member.clone(), info.parameters.len(), args.len())?;

        let receiver = if info.modifiers.is_static {
            None
        } else {
            self.check_receiver(&class, receiver, &member)?;
            receiver
        };

        let body = Arc::clone(&class.methods[method.index]);
        body(self, receiver, args)
    }

    fn construct(&self, constructor: ConstructorRef, args: &[Value]) -> HostResult<ObjectRef> {
        let class = self.class(constructor.class)?;
        let info = class
            .info
            .constructors
            .get(constructor.index)
            .ok_or_else(|| class.no_such(constructor))?;
        arity(class.member_name("<init>"), info.parameters.len(), args.len())?;

        let object = self.alloc(constructor.class)?;
        let body = Arc::clone(&class.constructors[constructor.index]);
        if let Err(e) = body(self, object, args) {
            self.objects.remove(&object);
            return Err(e);
        }
        Ok(object)
    }

    fn new_array(&self, component: &TypeRef, elements: Vec<Value>) -> HostResult<ObjectRef> {
        Ok(self.alloc_array(component.clone(), elements))
    }

    fn array_elements(&self, array: ObjectRef) -> HostResult<Vec<Value>> {
        match &*self.object(array)? {
            HeapObject::Array { elements, .. } => Ok(elements.read().clone()),
            HeapObject::Instance { class, .. } => Err(HostError::NotAnArray(self.type_name(&TypeRef::Class(*class)))),
        }
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("classes", &self.class_count())
            .field("objects", &self.object_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ConstructorDefinition, FieldDefinition, MethodDefinition};
    use umbra_sdk::Primitive;

    fn counter_class(heap: &Heap) -> ClassId {
        heap.define_class(
            ClassDefinition::new("test.Counter")
                .field(FieldDefinition::new("count", Primitive::Int))
                .static_field(FieldDefinition::new("created", Primitive::Int))
                .method(
                    MethodDefinition::new("bump", |heap, this, args| {
                        let this = this.and_then(Value::as_object).ok_or("no receiver")?;
                        let count = heap.read(this, "count")?.as_i32().unwrap_or(0);
                        let by = args[0].as_i32().unwrap_or(0);
                        heap.write(this, "count", count + by)?;
                        Ok(Value::Int(count + by))
                    })
                    .param(Primitive::Int)
                    .returns(Primitive::Int),
                )
                .constructor(
                    ConstructorDefinition::new(|heap, this, args| heap.write(this, "count", args[0].clone()))
                        .param(Primitive::Int),
                ),
        )
        .unwrap()
    }

    #[test]
    fn test_construct_and_invoke() {
        let heap = Heap::new();
        let class = counter_class(&heap);
        let info = heap.class_info(class).unwrap();

        let (ctor, _) = info.declared_constructor(&[TypeRef::Primitive(Primitive::Int)]).unwrap();
        let obj = heap.construct(ctor, &[Value::Int(3)]).unwrap();
        assert_eq!(heap.read(obj, "count").unwrap(), Value::Int(3));

        let (bump, _) = info.declared_method("bump", &[TypeRef::Primitive(Primitive::Int)]).unwrap();
        let result = heap.invoke(bump, Some(&Value::Object(obj)), &[Value::Int(4)]).unwrap();
        assert_eq!(result, Value::Int(7));
        assert_eq!(heap.type_of(obj).unwrap(), TypeRef::Class(class));
    }

    #[test]
    fn test_invoke_checks_receiver_and_arity() {
        let heap = Heap::new();
        let class = counter_class(&heap);
        let info = heap.class_info(class).unwrap();
        let (bump, _) = info.declared_method("bump", &[TypeRef::Primitive(Primitive::Int)]).unwrap();

        assert!(matches!(
            heap.invoke(bump, None, &[Value::Int(1)]),
            Err(HostError::MissingReceiver(_))
        ));
        let obj = heap.alloc(class).unwrap();
        assert!(matches!(
            heap.invoke(bump, Some(&Value::Object(obj)), &[]),
            Err(HostError::ArgumentCount { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            heap.invoke(bump, Some(&Value::string("nope")), &[Value::Int(1)]),
            Err(HostError::NoSuchMember { .. })
        ));
    }

    #[test]
    fn test_static_fields() {
        let heap = Heap::new();
        let class = counter_class(&heap);
        let info = heap.class_info(class).unwrap();
        let (created, _) = info.declared_field("created").unwrap();

        assert_eq!(heap.get_field(created, None).unwrap(), Value::Int(0));
        heap.set_field(created, None, Value::Int(9)).unwrap();
        assert_eq!(heap.get_field(created, None).unwrap(), Value::Int(9));
    }

    #[test]
    fn test_inherited_fields_are_allocated() {
        let heap = Heap::new();
        let base = heap
            .define_class(ClassDefinition::new("test.Base").field(FieldDefinition::new("id", Primitive::Long)))
            .unwrap();
        let derived = heap
            .define_class(
                ClassDefinition::new("test.Derived")
                    .extends(base)
                    .field(FieldDefinition::new("label", TypeRef::string())),
            )
            .unwrap();

        let obj = heap.alloc(derived).unwrap();
        heap.write(obj, "id", 12i64).unwrap();
        heap.write(obj, "label", "twelve").unwrap();
        assert_eq!(heap.read(obj, "id").unwrap(), Value::Long(12));
        assert_eq!(heap.read(obj, "label").unwrap(), Value::string("twelve"));
        assert!(heap.is_subtype(derived, base));
        assert!(!heap.is_subtype(base, derived));
    }

    #[test]
    fn test_define_class_validation() {
        let heap = Heap::new();
        counter_class(&heap);
        assert!(matches!(
            heap.define_class(ClassDefinition::new("test.Counter")),
            Err(HostError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            heap.define_class(ClassDefinition::new("test.Bad").extends(ClassId::CHAR_SEQUENCE)),
            Err(HostError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            heap.define_class(ClassDefinition::new("test.Bad2").implements(ClassId::STRING)),
            Err(HostError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_failed_constructor_frees_object() {
        let heap = Heap::new();
        let class = heap
            .define_class(
                ClassDefinition::new("test.Fails")
                    .constructor(ConstructorDefinition::new(|_, _, _| Err("boom".into()))),
            )
            .unwrap();
        let before = heap.object_count();
        let ctor = ConstructorRef::new(class, 0);
        assert_eq!(heap.construct(ctor, &[]), Err(HostError::Invocation("boom".to_string())));
        assert_eq!(heap.object_count(), before);
    }

    #[test]
    fn test_arrays() {
        let heap = Heap::new();
        let array = heap
            .new_array(&TypeRef::Primitive(Primitive::Int), vec![Value::Int(1), Value::Int(2)])
            .unwrap();
        assert_eq!(heap.type_of(array).unwrap(), TypeRef::array_of(TypeRef::Primitive(Primitive::Int)));
        assert_eq!(heap.array_elements(array).unwrap(), vec![Value::Int(1), Value::Int(2)]);

        let class = counter_class(&heap);
        let obj = heap.alloc(class).unwrap();
        assert!(matches!(heap.array_elements(obj), Err(HostError::NotAnArray(_))));
    }

    #[test]
    fn test_release() {
        let heap = Heap::new();
        let class = counter_class(&heap);
        let kept = heap.alloc(class).unwrap();
        let dropped = heap.alloc(class).unwrap();
        let array = heap.alloc_array(TypeRef::Class(class), vec![Value::Object(kept)]);
        assert_eq!(heap.object_count(), 3);

        assert!(heap.release(dropped));
        assert!(!heap.release(dropped));
        assert!(heap.release(array));
        assert_eq!(heap.object_count(), 1);
        assert_eq!(heap.type_of(dropped), Err(HostError::UnknownObject(dropped)));
        assert!(heap.type_of(kept).is_ok());
    }
}
