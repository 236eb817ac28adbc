//! Integration coverage for §4.13 (module & import coordinator):
//! dotted-name chain construction, circular-import visibility of a
//! partially-built module, and the handle-self-removal `ImportError`.

use std::sync::Arc;

use pyrt::import::{import_module, ImportHandle};
use pyrt::VirtualMachine;

fn noop_handle() -> ImportHandle {
    Arc::new(|_m, _vm| Ok(()))
}

#[test]
fn importing_a_dotted_name_installs_every_prefix_in_sys_modules() {
    let vm = VirtualMachine::default();
    let handles = vec![noop_handle(), noop_handle()];
    let chain = import_module("pkg.sub", &handles, &vm).unwrap();
    assert_eq!(chain.len(), 2);

    assert!(vm.ctx.sys_modules.get_item_str("pkg", &vm).is_some());
    assert!(vm.ctx.sys_modules.get_item_str("pkg.sub", &vm).is_some());
}

#[test]
fn a_module_already_registered_is_reused_rather_than_rebuilt() {
    let vm = VirtualMachine::default();
    let first = import_module("solo", &[noop_handle()], &vm).unwrap();
    let second = import_module("solo", &[noop_handle()], &vm).unwrap();
    assert_eq!(first[0].as_object().get_id(), second[0].as_object().get_id());
}

#[test]
fn a_handle_sees_the_other_sides_partial_module_during_a_circular_import() {
    let vm = VirtualMachine::default();

    // module "a"'s handle imports "b" before finishing; "b"'s handle
    // looks back at sys.modules for "a" and must find the (still
    // empty) module object "a" already installed there, not a miss.
    let a_handle: ImportHandle = Arc::new(|_m, vm| {
        let b_handle: ImportHandle = Arc::new(|_m, vm| {
            assert!(vm.ctx.sys_modules.get_item_str("a", vm).is_some(), "circular import must see partial 'a'");
            Ok(())
        });
        import_module("b", &[b_handle], vm).map(|_| ())
    });

    let chain = import_module("a", &[a_handle], &vm).unwrap();
    assert_eq!(chain.len(), 1);
    assert!(vm.ctx.sys_modules.get_item_str("b", &vm).is_some());
}

#[test]
fn a_handle_that_deletes_its_own_module_entry_raises_import_error() {
    let vm = VirtualMachine::default();
    let vanishing: ImportHandle = Arc::new(|_m, vm| {
        vm.ctx.sys_modules.del_item_str("vanishes", vm);
        Ok(())
    });
    let err = import_module("vanishes", &[vanishing], &vm).unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("not found in sys.modules"));
}

#[test]
fn a_failing_handle_propagates_and_leaves_earlier_prefixes_installed() {
    let vm = VirtualMachine::default();
    let failing: ImportHandle = Arc::new(|_m, vm| Err(vm.new_runtime_error("boom".to_owned())));
    let handles = vec![noop_handle(), failing];
    let err = import_module("ok.broken", &handles, &vm).unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("boom"));
    assert!(vm.ctx.sys_modules.get_item_str("ok", &vm).is_some());
    assert!(vm.ctx.sys_modules.get_item_str("ok.broken", &vm).is_some());
}
