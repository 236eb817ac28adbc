//! Integration coverage for §4.4 (frame & block): `RaiseType`'s
//! traceback attachment, the recursion-depth guard, the `reprEnter`/
//! `reprLeave` self-reference stack, and a block's checkpoint-retry
//! unwind.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pyrt::exceptions::PyBaseException;
use pyrt::frame::{Block, Frame};
use pyrt::object::PyObjectRef;
use pyrt::{RuntimeOptions, VirtualMachine};

#[test]
fn raise_type_installs_exc_info_and_a_traceback_naming_the_frame() {
    let vm = VirtualMachine::default();
    let frame = Frame::new("eggs".to_owned(), "spam.py".to_owned());
    let exc = frame.raise_type(&vm.ctx.exceptions.value_error_type, "bad value".to_owned(), &vm);

    assert!(frame.exc_info().is_some());
    let base = exc.downcast_ref::<PyBaseException>().unwrap();
    let tb = base.traceback.read();
    let tb = tb.as_ref().unwrap();
    assert_eq!(tb.frame_name, "eggs");
    assert_eq!(tb.filename, "spam.py");
}

#[test]
fn restore_exc_overwrites_the_current_exception() {
    let vm = VirtualMachine::default();
    let frame = Frame::new("f".to_owned(), "f.py".to_owned());
    frame.raise_type(&vm.ctx.exceptions.value_error_type, "first".to_owned(), &vm);
    assert!(frame.exc_info().is_some());

    frame.restore_exc(None);
    assert!(frame.exc_info().is_none());
}

#[test]
fn exceeding_the_recursion_limit_raises_runtime_error() {
    let vm = VirtualMachine::new(RuntimeOptions { initial_dict_capacity: 8, recursion_limit: 3 });
    let frame = Frame::new("recur".to_owned(), "recur.py".to_owned());

    let _g1 = frame.enter(&vm).unwrap();
    let _g2 = frame.enter(&vm).unwrap();
    let _g3 = frame.enter(&vm).unwrap();
    let err = frame.enter(&vm).unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("recursion"));
}

#[test]
fn the_depth_counter_is_released_when_a_guard_drops() {
    let vm = VirtualMachine::new(RuntimeOptions { initial_dict_capacity: 8, recursion_limit: 1 });
    let frame = Frame::new("recur".to_owned(), "recur.py".to_owned());
    {
        let _g = frame.enter(&vm).unwrap();
        assert_eq!(frame.depth(), 1);
    }
    assert_eq!(frame.depth(), 0);
    frame.enter(&vm).unwrap();
}

#[test]
fn repr_enter_detects_a_container_already_being_formatted() {
    let frame = Frame::new("r".to_owned(), "r.py".to_owned());
    assert!(!frame.repr_enter(42));
    assert!(frame.repr_enter(42));
    frame.repr_leave(42);
    assert!(!frame.repr_enter(42));
}

#[test]
fn a_block_retries_through_its_checkpoint_stack_until_one_succeeds() {
    let vm = VirtualMachine::default();
    let frame = Frame::new("blk".to_owned(), "blk.py".to_owned());
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts2 = attempts.clone();

    let body = Arc::new(move |frame: &Frame, _sent: Option<PyObjectRef>, vm: &VirtualMachine| {
        let n = attempts2.fetch_add(1, Ordering::SeqCst);
        if n < 2 {
            Err(vm.new_value_error(format!("attempt {n} failed")))
        } else {
            Ok(frame.state().unwrap_or_else(|| vm.none()))
        }
    });
    let checkpoints = vec![vm.new_str("checkpoint-a".to_owned()), vm.new_str("checkpoint-b".to_owned())];
    let block = Block::new(body, checkpoints);

    let result = block.run(&frame, None, &vm).unwrap();
    // Block::run pops checkpoints off the end, so the two failures consume
    // "checkpoint-b" then "checkpoint-a" in that order; the body reads the
    // last one set before it finally succeeds.
    assert_eq!(vm.str_of(&result).unwrap(), "checkpoint-a");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(block.checkpoints_remaining(), 0);
    // a successful run restores exc_info to what it was before entry.
    assert!(frame.exc_info().is_none());
}

#[test]
fn a_block_propagates_the_last_failure_once_checkpoints_are_exhausted() {
    let vm = VirtualMachine::default();
    let frame = Frame::new("blk".to_owned(), "blk.py".to_owned());
    let body = Arc::new(|_frame: &Frame, _sent: Option<PyObjectRef>, vm: &VirtualMachine| {
        Err(vm.new_value_error("always fails".to_owned()))
    });
    let block = Block::new(body, Vec::new());

    let err = block.run(&frame, None, &vm).unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("always fails"));
    assert!(frame.exc_info().is_some());
}
