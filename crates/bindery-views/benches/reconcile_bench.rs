//! Benchmarks for list reconciliation and slot swapping.
//!
//! Run with: cargo bench -p bindery-views --bench reconcile_bench

use std::hint::black_box;
use std::rc::Rc;

use bindery_core::memory::{MemoryTree, NodeId};
use bindery_core::timer::ManualScheduler;
use bindery_core::tree::ViewTree;
use bindery_runtime::bind::{BindingTarget, bind};
use bindery_runtime::reactive::{Observable, ReadProperty};
use bindery_views::list::show_in;
use bindery_views::swap::{SlotSwapper, SwapContext};
use bindery_views::transition::Transition;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

fn row(tree: &MemoryTree, value: ReadProperty<u32>) -> NodeId {
    let node = tree.create_element("li");
    bind(tree, &node, BindingTarget::field("n"), &value);
    node
}

fn bench_update_in_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile/update_in_place");

    for len in [10u32, 100, 1_000] {
        group.throughput(Throughput::Elements(u64::from(len)));
        let tree = MemoryTree::new();
        let ul = tree.create_element("ul");
        let source = Observable::new((0..len).collect::<Vec<_>>());
        let _view = show_in(&tree, &ul, &source, row);
        let reversed: Vec<u32> = (0..len).rev().collect();
        let forward: Vec<u32> = (0..len).collect();
        let mut flip = false;
        group.bench_with_input(BenchmarkId::new("permute", len), &(), |b, _| {
            b.iter(|| {
                flip = !flip;
                source.set(black_box(if flip { reversed.clone() } else { forward.clone() }));
                tree.take_journal();
            });
        });
    }

    group.finish();
}

fn bench_grow_shrink(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile/grow_shrink");

    for len in [10u32, 100, 1_000] {
        group.throughput(Throughput::Elements(u64::from(len)));
        let tree = MemoryTree::new();
        let root = tree.create_element("body");
        let ul = tree.create_element("ul");
        tree.append_child(&root, &ul);
        let source = Observable::new(Vec::new());
        let _view = show_in(&tree, &ul, &source, row);
        let full: Vec<u32> = (0..len).collect();
        group.bench_with_input(BenchmarkId::new("fill_then_clear", len), &(), |b, _| {
            b.iter(|| {
                source.set(black_box(full.clone()));
                source.set(Vec::new());
                tree.take_journal();
            });
        });
    }

    group.finish();
}

fn bench_slot_swap(c: &mut Criterion) {
    let mut group = c.benchmark_group("swap/slot");
    let tree = MemoryTree::new();
    let scheduler = Rc::new(ManualScheduler::new());
    let ctx = SwapContext::new(&tree, scheduler.clone());
    let container = tree.create_element("main");
    let slot = SlotSwapper::new(&ctx, &container);
    let a = tree.create_element("a");
    let b = tree.create_element("b");

    for (name, transition) in [("instant", Transition::NONE), ("animated", Transition::FADE)] {
        group.bench_function(name, |bench| {
            let mut flip = false;
            bench.iter(|| {
                flip = !flip;
                slot.show(Some(if flip { a } else { b }), black_box(&transition));
                scheduler.run_all();
                tree.take_journal();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_update_in_place, bench_grow_shrink, bench_slot_swap);
criterion_main!(benches);
