//! Core class bootstrap
//!
//! Registers the well-known classes at the ids [`ClassId`] reserves for
//! them, in id order:
//!
//! | ID | Class            | Parent   | Interfaces                 |
//! |----|------------------|----------|----------------------------|
//! | 0  | `Object`         | -        | -                          |
//! | 1  | `Number`         | Object   | -                          |
//! | 2  | `String`         | Object   | CharSequence, Comparable   |
//! | 3  | `Boolean`        | Object   | Comparable                 |
//! | 4  | `Byte`           | Number   | Comparable                 |
//! | 5  | `Short`          | Number   | Comparable                 |
//! | 6  | `Character`      | Object   | Comparable                 |
//! | 7  | `Integer`        | Number   | Comparable                 |
//! | 8  | `Long`           | Number   | Comparable                 |
//! | 9  | `Float`          | Number   | Comparable                 |
//! | 10 | `Double`         | Number   | Comparable                 |
//! | 11 | `CharSequence`   | -        | -                          |
//! | 12 | `Comparable`     | -        | -                          |

use umbra_sdk::{ClassId, HostError, Primitive, Value, Visibility};

use crate::class::{ClassDefinition, MethodDefinition};
use crate::heap::Heap;

fn public(method: MethodDefinition) -> MethodDefinition {
    method.visibility(Visibility::Public)
}

fn receiver_str(receiver: Option<&Value>) -> Result<&str, HostError> {
    receiver
        .and_then(Value::as_str)
        .ok_or_else(|| HostError::MissingReceiver("core.String".to_string()))
}

fn receiver_number(receiver: Option<&Value>) -> Result<f64, HostError> {
    receiver
        .and_then(Value::as_f64)
        .ok_or_else(|| HostError::MissingReceiver("core.Number".to_string()))
}

fn object() -> ClassDefinition {
    ClassDefinition {
        superclass: None,
        ..ClassDefinition::new("core.Object")
    }
}

fn number() -> ClassDefinition {
    ClassDefinition::new("core.Number")
        .method(public(
            MethodDefinition::new("intValue", |_, this, _| {
                let this = receiver_number(this)?;
                Ok(Value::Int(this as i32))
            })
            .returns(Primitive::Int),
        ))
        .method(public(
            MethodDefinition::new("longValue", |_, this, _| {
                let this = receiver_number(this)?;
                Ok(Value::Long(this as i64))
            })
            .returns(Primitive::Long),
        ))
        .method(public(
            MethodDefinition::new("doubleValue", |_, this, _| Ok(Value::Double(receiver_number(this)?)))
                .returns(Primitive::Double),
        ))
}

fn string() -> ClassDefinition {
    ClassDefinition::new("core.String")
        .implements(ClassId::CHAR_SEQUENCE)
        .implements(ClassId::COMPARABLE)
        .method(public(
            MethodDefinition::new("length", |_, this, _| {
                Ok(Value::Int(receiver_str(this)?.chars().count() as i32))
            })
            .returns(Primitive::Int),
        ))
        .method(public(
            MethodDefinition::new("isEmpty", |_, this, _| Ok(Value::Boolean(receiver_str(this)?.is_empty())))
                .returns(Primitive::Boolean),
        ))
}

fn boxed(primitive: Primitive) -> ClassDefinition {
    let name = match primitive {
        Primitive::Boolean => "core.Boolean",
        Primitive::Byte => "core.Byte",
        Primitive::Short => "core.Short",
        Primitive::Char => "core.Character",
        Primitive::Int => "core.Integer",
        Primitive::Long => "core.Long",
        Primitive::Float => "core.Float",
        Primitive::Double => "core.Double",
    };
    let parent = match primitive {
        Primitive::Boolean | Primitive::Char => ClassId::OBJECT,
        _ => ClassId::NUMBER,
    };
    ClassDefinition::new(name)
        .extends(parent)
        .implements(ClassId::COMPARABLE)
}

/// Install the well-known classes into an empty heap
pub(crate) fn install_core_classes(heap: &Heap) {
    let core = [
        (ClassId::OBJECT, object()),
        (ClassId::NUMBER, number()),
        (ClassId::STRING, string()),
        (ClassId::BOOLEAN, boxed(Primitive::Boolean)),
        (ClassId::BYTE, boxed(Primitive::Byte)),
        (ClassId::SHORT, boxed(Primitive::Short)),
        (ClassId::CHARACTER, boxed(Primitive::Char)),
        (ClassId::INTEGER, boxed(Primitive::Int)),
        (ClassId::LONG, boxed(Primitive::Long)),
        (ClassId::FLOAT, boxed(Primitive::Float)),
        (ClassId::DOUBLE, boxed(Primitive::Double)),
        (ClassId::CHAR_SEQUENCE, ClassDefinition::interface("core.CharSequence")),
        (ClassId::COMPARABLE, ClassDefinition::interface("core.Comparable")),
    ];

    for (expected, def) in core {
        let id = heap.install(def);
        debug_assert_eq!(id, expected, "core class registered out of order");
    }
    tracing::trace!(count = ClassId::FIRST_USER_ID, "installed core classes");
}
