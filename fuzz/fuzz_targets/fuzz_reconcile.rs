#![no_main]

use arbitrary::Arbitrary;
use bindery_core::memory::{MemoryTree, NodeId};
use bindery_core::tree::ViewTree;
use bindery_runtime::bind::{BindingTarget, bind};
use bindery_runtime::reactive::{Observable, ReadProperty};
use bindery_views::list::show_in_typed;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Emission {
    Set(Vec<i8>),
    Push(i8),
    Truncate(u8),
    Reverse,
}

fn row(tree: &MemoryTree, negative: &bool, value: ReadProperty<i32>) -> NodeId {
    let node = tree.create_element(if *negative { "neg" } else { "pos" });
    bind(tree, &node, BindingTarget::field("n"), &value);
    node
}

fuzz_target!(|input: Vec<Emission>| {
    let tree = MemoryTree::new();
    let root = tree.create_element("body");
    let ul = tree.create_element("ul");
    tree.append_child(&root, &ul);
    let source: Observable<Vec<i32>> = Observable::new(Vec::new());
    let view = show_in_typed(&tree, &ul, &source, |n: &i32| *n < 0, row);

    for emission in input.into_iter().take(64) {
        match emission {
            Emission::Set(items) => source.set(items.into_iter().take(64).map(i32::from).collect()),
            Emission::Push(n) => source.update(|v| v.push(i32::from(n))),
            Emission::Truncate(len) => source.update(|v| v.truncate(usize::from(len))),
            Emission::Reverse => source.update(|v| v.reverse()),
        }
        let expected: Vec<String> = source.get().iter().map(ToString::to_string).collect();
        assert_eq!(tree.children(&ul), view.nodes());
        assert_eq!(tree.children_text(ul, "n"), expected);
    }
});
