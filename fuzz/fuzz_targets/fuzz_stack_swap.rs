#![no_main]

use std::rc::Rc;
use std::time::Duration;

use arbitrary::Arbitrary;
use bindery_core::config::StackConfig;
use bindery_core::memory::MemoryTree;
use bindery_core::timer::{ManualScheduler, Scheduler};
use bindery_core::tree::ViewTree;
use bindery_runtime::stack::StackProperty;
use bindery_views::generator::GeneratorHandle;
use bindery_views::stack_swap::show_in_swap;
use bindery_views::swap::SwapContext;
use bindery_views::transition::StackTransition;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Push(u8),
    Pop,
    Dismiss,
    PopTo(u8),
    Root,
    Advance(u8),
    AnimationEnd,
}

fuzz_target!(|ops: Vec<Op>| {
    let tree = MemoryTree::new();
    let scheduler = Rc::new(ManualScheduler::new());
    let ctx = SwapContext::new(&tree, scheduler.clone());
    let body = tree.create_element("body");
    let main = tree.create_element("main");
    tree.append_child(&body, &main);

    let pages: Vec<GeneratorHandle<MemoryTree>> = (0..4)
        .map(|i| GeneratorHandle::from_fn(format!("page{i}"), |t: &MemoryTree| t.create_element("section")))
        .collect();
    let stack = StackProperty::new();
    let swapper = show_in_swap(&ctx, &main, &stack, StackTransition::PUSH_POP, StackConfig::default());

    for op in ops.into_iter().take(128) {
        match op {
            Op::Push(i) => stack.push(pages[usize::from(i) % pages.len()].clone()),
            Op::Pop => {
                stack.pop();
            }
            Op::Dismiss => {
                stack.dismiss();
            }
            Op::PopTo(i) => {
                stack.pop_to(&pages[usize::from(i) % pages.len()]);
            }
            Op::Root => {
                stack.root();
            }
            Op::Advance(ms) => {
                scheduler.advance(Duration::from_millis(u64::from(ms)));
            }
            Op::AnimationEnd => {
                for child in tree.children(&main) {
                    for name in ["push-in", "push-out", "pop-in", "pop-out", "fade-in", "fade-out"] {
                        tree.dispatch(child, &bindery_core::tree::EventData::animation_end(name));
                    }
                }
            }
        }
    }

    scheduler.run_all();
    assert_eq!(scheduler.pending(), 0);
    assert_eq!(ctx.pending_animations(), 0);
    assert_eq!(swapper.current(), stack.top());
    let children = tree.children(&main);
    assert_eq!(children.len(), usize::from(stack.top().is_some()));
    assert_eq!(tree.is_hidden(&main), stack.is_empty());
});
