use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use umbra_engine::{BoundValue, CapabilityType, LiveBinding, Member, Registry};
use umbra_heap::{ClassDefinition, FieldDefinition, Heap, MethodDefinition};
use umbra_sdk::{ClassId, HostContext, Primitive, Value};

fn point() -> CapabilityType {
    CapabilityType::builder("Point")
        .target_named("geo.Point")
        .member(Member::field("getX").returns(Primitive::Int))
        .member(Member::field("setX").param(Primitive::Int))
        .member(Member::method("translate").param(Primitive::Int).param(Primitive::Int))
        .member(Member::method("describe").returns(ClassId::STRING))
        .build()
        .unwrap()
}

fn setup() -> (Arc<Heap>, Registry, CapabilityType, LiveBinding) {
    let heap = Arc::new(Heap::new());
    let class = heap
        .define_class(
            ClassDefinition::new("geo.Point")
                .field(FieldDefinition::new("x", Primitive::Int))
                .field(FieldDefinition::new("y", Primitive::Int))
                .method(
                    MethodDefinition::new("translate", |heap, this, args| {
                        let this = this.and_then(Value::as_object).ok_or("no receiver")?;
                        let x = heap.read(this, "x")?.as_i32().unwrap_or(0);
                        let y = heap.read(this, "y")?.as_i32().unwrap_or(0);
                        heap.write(this, "x", x + args[0].as_i32().unwrap_or(0))?;
                        heap.write(this, "y", y + args[1].as_i32().unwrap_or(0))?;
                        Ok(Value::Null)
                    })
                    .param(Primitive::Int)
                    .param(Primitive::Int),
                )
                .method(
                    MethodDefinition::new("describe", |_, _, _| Ok(Value::string("point")))
                        .returns(ClassId::STRING),
                ),
        )
        .unwrap();
    let registry = Registry::new(heap.clone());
    let capability = point();
    let binding = registry.bind(&capability, heap.alloc(class).unwrap()).unwrap();
    (heap, registry, capability, binding)
}

fn bench_dispatch(c: &mut Criterion) {
    let (_heap, _registry, _capability, binding) = setup();
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("getter", |b| {
        b.iter(|| binding.invoke(black_box("getX"), Vec::new()).unwrap());
    });

    group.bench_function("setter", |b| {
        b.iter(|| binding.invoke(black_box("setX"), vec![BoundValue::from(black_box(3i32))]).unwrap());
    });

    group.bench_function("method", |b| {
        b.iter(|| binding.call::<_, ()>(black_box("translate"), (1i32, 2i32)).unwrap());
    });

    group.bench_function("intrinsic", |b| {
        b.iter(|| binding.invoke(black_box("hashCode"), Vec::new()).unwrap());
    });

    group.finish();
}

fn bench_bind(c: &mut Criterion) {
    let (heap, registry, capability, binding) = setup();
    let class = heap.class_by_name("geo.Point").unwrap();

    let mut group = c.benchmark_group("bind");
    for count in [1usize, 16, 256] {
        let objects: Vec<_> = (0..count).map(|_| heap.alloc(class).unwrap()).collect();
        group.bench_with_input(BenchmarkId::new("objects", count), &objects, |b, objects| {
            b.iter(|| {
                for object in objects {
                    black_box(registry.bind(&capability, *object).unwrap());
                }
            });
        });
    }

    group.bench_function("rebind", |b| {
        b.iter(|| registry.bind(&capability, black_box(binding.clone())).unwrap());
    });

    group.finish();
}

fn bench_first_resolution(c: &mut Criterion) {
    let (heap, _registry, _capability, binding) = setup();
    let object = binding.target_object().unwrap();

    // A fresh registry per iteration, so every call resolves from scratch.
    c.bench_function("first_call", |b| {
        b.iter(|| {
            let registry = Registry::new(heap.clone());
            let binding = registry.bind(&point(), object).unwrap();
            binding.invoke(black_box("describe"), Vec::new()).unwrap()
        });
    });
}

criterion_group!(benches, bench_dispatch, bench_bind, bench_first_resolution);
criterion_main!(benches);
