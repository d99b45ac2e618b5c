//! Property-based invariant tests for `StackProperty`.
//!
//! For any sequence of operations:
//!
//! 1. The stack matches a plain `Vec` model after every step.
//! 2. `pop` never takes the stack below one element.
//! 3. Each successful operation emits exactly once, carrying the full
//!    sequence; rejected operations emit nothing.

use std::cell::RefCell;
use std::rc::Rc;

use bindery_runtime::stack::StackProperty;
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Push(u8),
    Swap(u8),
    Pop,
    Dismiss,
    PopTo(u8),
    Root,
    Reset(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6).prop_map(Op::Push),
        (0u8..6).prop_map(Op::Swap),
        Just(Op::Pop),
        Just(Op::Dismiss),
        (0u8..6).prop_map(Op::PopTo),
        Just(Op::Root),
        (0u8..6).prop_map(Op::Reset),
    ]
}

/// Apply `op` to the model. Returns whether the operation succeeds.
fn apply_model(model: &mut Vec<u8>, op: &Op) -> bool {
    match *op {
        Op::Push(v) => {
            model.push(v);
            true
        }
        Op::Swap(v) => {
            model.pop();
            model.push(v);
            true
        }
        Op::Pop => {
            if model.len() <= 1 {
                return false;
            }
            model.pop();
            true
        }
        Op::Dismiss => model.pop().is_some(),
        Op::PopTo(v) => match model.iter().position(|x| *x == v) {
            Some(i) => {
                model.truncate(i + 1);
                true
            }
            None => false,
        },
        Op::Root => {
            if model.is_empty() {
                return false;
            }
            model.truncate(1);
            true
        }
        Op::Reset(v) => {
            model.clear();
            model.push(v);
            true
        }
    }
}

fn apply_stack(stack: &StackProperty<u8>, op: &Op) -> bool {
    match *op {
        Op::Push(v) => {
            stack.push(v);
            true
        }
        Op::Swap(v) => {
            stack.swap(v);
            true
        }
        Op::Pop => stack.pop(),
        Op::Dismiss => stack.dismiss(),
        Op::PopTo(v) => stack.pop_to(&v),
        Op::Root => stack.root(),
        Op::Reset(v) => {
            stack.reset(v);
            true
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1–3. Model equivalence and emission discipline
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn stack_matches_model(
        initial in proptest::collection::vec(0u8..6, 0..4),
        ops in proptest::collection::vec(op(), 0..40),
    ) {
        let stack = StackProperty::new();
        for v in &initial {
            stack.push(*v);
        }
        let mut model = initial.clone();

        let emissions: Rc<RefCell<Vec<Vec<u8>>>> = Rc::new(RefCell::new(Vec::new()));
        let e = Rc::clone(&emissions);
        let _sub = stack.subscribe(move |items| e.borrow_mut().push(items.clone()));

        for op in &ops {
            let before_len = model.len();
            let expected = apply_model(&mut model, op);
            let emitted_before = emissions.borrow().len();
            let actual = apply_stack(&stack, op);

            prop_assert_eq!(actual, expected, "result mismatch for {:?}", op);
            prop_assert_eq!(stack.items(), model.clone());

            let emitted = emissions.borrow().len() - emitted_before;
            if actual {
                prop_assert_eq!(emitted, 1, "success emits once: {:?}", op);
                let last = emissions.borrow().last().cloned();
                prop_assert_eq!(last, Some(model.clone()));
            } else {
                prop_assert_eq!(emitted, 0, "rejection emits nothing: {:?}", op);
            }

            if matches!(op, Op::Pop) && before_len >= 1 {
                prop_assert!(stack.len() >= 1, "pop never empties a non-empty stack");
            }
        }
    }
}
