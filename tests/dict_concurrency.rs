//! Integration coverage for §4.5 (the concurrent open-addressing dict):
//! S1 "Dict grow" and S2 "Dict concurrent writers" from §8.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pyrt::builtins::dict::PyDict;
use pyrt::VirtualMachine;

#[test]
fn s1_dict_grow_through_one_hundred_keys() {
    let vm = VirtualMachine::default();
    let dict = PyDict::new_ref(&vm);

    for i in 0..100i64 {
        let key = vm.new_str(format!("k{}", i));
        dict.set_item(key, vm.new_int(i), &vm).unwrap();
    }

    assert_eq!(dict.len(), 100);

    let seen: HashSet<String> = dict
        .items(&vm)
        .unwrap()
        .into_iter()
        .map(|(k, _)| vm.str_of(&k).unwrap())
        .collect();
    let expected: HashSet<String> = (0..100).map(|i| format!("k{}", i)).collect();
    assert_eq!(seen, expected);

    for i in 0..100i64 {
        let key = vm.new_str(format!("k{}", i));
        let value = dict.get_item(&key, &vm).unwrap().unwrap();
        assert_eq!(value.downcast_ref::<pyrt::builtins::PyInt>().unwrap().value(), i);
    }
}

#[test]
fn s2_eight_threads_insert_concurrently_for_about_a_second() {
    let vm = Arc::new(VirtualMachine::default());
    let dict = Arc::new(PyDict::new_ref(&vm));

    let deadline = Instant::now() + Duration::from_secs(1);
    let mut handles = Vec::new();
    for t in 0..8 {
        let vm = Arc::clone(&vm);
        let dict = Arc::clone(&dict);
        handles.push(std::thread::spawn(move || {
            let mut inserted = 0usize;
            while Instant::now() < deadline {
                for k in 0..24 {
                    let key = vm.new_str(format!("t{}-k{}", t, k));
                    dict.set_item(key, vm.new_int((t * 24 + k) as i64), &vm).unwrap();
                    inserted += 1;
                }
            }
            inserted
        }));
    }

    let mut total_inserts = 0usize;
    for h in handles {
        total_inserts += h.join().unwrap();
    }
    assert!(total_inserts > 0);

    // Every thread writes the same 8*24 key set repeatedly (no deletes in
    // this scenario), so the dict should settle at exactly that many
    // distinct keys, and each one observable via `get_item`.
    assert_eq!(dict.len(), 8 * 24);
    for t in 0..8 {
        for k in 0..24 {
            let key = vm.new_str(format!("t{}-k{}", t, k));
            assert!(dict.get_item(&key, &vm).unwrap().is_some());
        }
    }
}

#[test]
fn concurrent_writers_with_deletes_keep_len_consistent() {
    let vm = Arc::new(VirtualMachine::default());
    let dict = Arc::new(PyDict::new_ref(&vm));

    // Pre-seed so the deleting thread has something to remove.
    for k in 0..24 {
        let key = vm.new_str(format!("seed-k{}", k));
        dict.set_item(key, vm.new_int(k), &vm).unwrap();
    }

    let inserter = {
        let vm = Arc::clone(&vm);
        let dict = Arc::clone(&dict);
        std::thread::spawn(move || {
            for k in 0..24 {
                let key = vm.new_str(format!("fresh-k{}", k));
                dict.set_item(key, vm.new_int(k), &vm).unwrap();
            }
        })
    };
    let deleter = {
        let vm = Arc::clone(&vm);
        let dict = Arc::clone(&dict);
        std::thread::spawn(move || {
            let mut deleted = 0usize;
            for k in 0..24 {
                let key = vm.new_str(format!("seed-k{}", k));
                if dict.del_item(&key, &vm).unwrap() {
                    deleted += 1;
                }
            }
            deleted
        })
    };

    inserter.join().unwrap();
    let deleted = deleter.join().unwrap();

    assert_eq!(dict.len(), 24 + 24 - deleted);
    for k in 0..24 {
        let key = vm.new_str(format!("fresh-k{}", k));
        assert!(dict.get_item(&key, &vm).unwrap().is_some());
    }
}
