//! Integration Tests for Change Propagation
//!
//! These tests verify that the graph and the manager work together on
//! realistic derived-property setups.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use propagation_core::graph::DependencyGraph;
use propagation_core::{GraphConfig, NodeIndex, PropagationError, PropagationManager};

/// A small data model with derived fields.
struct Cart {
    price: Mutex<i32>,
    quantity: Mutex<i32>,
    total: Mutex<i32>,
    label: Mutex<String>,
}

impl Cart {
    fn new(price: i32, quantity: i32) -> Arc<Self> {
        Arc::new(Self {
            price: Mutex::new(price),
            quantity: Mutex::new(quantity),
            total: Mutex::new(0),
            label: Mutex::new(String::new()),
        })
    }
}

/// Test the defining boundary: A.x -> B.y -> C.z fires B.y only.
#[test]
fn change_propagates_one_hop() {
    struct Holder;

    let manager = PropagationManager::new();
    let a = Arc::new(Holder);
    let b = Arc::new(Holder);
    let c = Arc::new(Holder);

    let b_calls = Arc::new(AtomicI32::new(0));
    let c_calls = Arc::new(AtomicI32::new(0));

    let ax = manager.add_node(a.clone(), "x", None);
    let counter = b_calls.clone();
    let by = manager.add_node_with_update(b.clone(), "y", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = c_calls.clone();
    let cz = manager.add_node_with_update(c.clone(), "z", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    manager.add_dependency(ax, by).unwrap();
    manager.add_dependency(by, cz).unwrap();

    manager.notify_dependents(&a, "x").unwrap();

    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c_calls.load(Ordering::SeqCst), 0);
}

/// Test a derived field recomputed from two inputs.
#[test]
fn derived_field_recomputes_from_its_inputs() {
    let manager = PropagationManager::new();
    let cart = Cart::new(5, 3);

    let price = manager.add_node(cart.clone(), "price", None);
    let quantity = manager.add_node(cart.clone(), "quantity", None);

    let target = cart.clone();
    let total = manager.add_node_with_update(cart.clone(), "total", move || {
        let value = *target.price.lock() * *target.quantity.lock();
        *target.total.lock() = value;
    });

    manager.add_dependency(price, total).unwrap();
    manager.add_dependency(quantity, total).unwrap();

    *cart.price.lock() = 7;
    manager.notify_dependents(&cart, "price").unwrap();
    assert_eq!(*cart.total.lock(), 21);

    *cart.quantity.lock() = 10;
    manager.notify_dependents(&cart, "quantity").unwrap();
    assert_eq!(*cart.total.lock(), 70);

    assert_eq!(manager.get_notifiers(total).unwrap(), vec![price, quantity]);
}

/// Test chaining a second hop explicitly from inside a callback.
#[test]
fn callbacks_chain_changes_explicitly() {
    let manager = Arc::new(PropagationManager::new());
    let cart = Cart::new(2, 4);

    let price = manager.add_node(cart.clone(), "price", None);
    let total = manager.add_node(cart.clone(), "total", None);

    let target = cart.clone();
    let label = manager.add_node_with_update(cart.clone(), "label", move || {
        let text = format!("total: {}", *target.total.lock());
        *target.label.lock() = text;
    });

    let weak = Arc::downgrade(&manager);
    let target = cart.clone();
    manager
        .set_update_method(
            total,
            Some(Arc::new(move || {
                let value = *target.price.lock() * *target.quantity.lock();
                *target.total.lock() = value;
                if let Some(manager) = weak.upgrade() {
                    manager.notify_dependents(&target, "total").unwrap();
                }
            })),
        )
        .unwrap();

    manager.add_dependency(price, total).unwrap();
    manager.add_dependency(total, label).unwrap();

    *cart.price.lock() = 3;
    manager.notify_dependents(&cart, "price").unwrap();

    assert_eq!(*cart.total.lock(), 12);
    assert_eq!(*cart.label.lock(), "total: 12");
}

/// Test that objects with identical values are never confused.
#[test]
fn lookups_use_reference_identity() {
    let manager = PropagationManager::new();
    let first = Cart::new(1, 1);
    let twin = Cart::new(1, 1);
    let calls = Arc::new(AtomicI32::new(0));

    let source = manager.add_node(first.clone(), "price", None);
    let counter = calls.clone();
    let dependent = manager.add_node_with_update(first.clone(), "total", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    manager.add_dependency(source, dependent).unwrap();

    assert!(matches!(
        manager.notify_dependents(&twin, "price"),
        Err(PropagationError::NodeNotFound { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    manager.notify_dependents(&first, "price").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Test that the graph keeps working well past a hundred nodes.
#[test]
fn large_graph_notifies_every_direct_dependent() {
    let manager = PropagationManager::with_config(GraphConfig {
        node_capacity: 8,
        edge_capacity: 2,
    });
    let cart = Cart::new(0, 0);
    let calls = Arc::new(AtomicI32::new(0));

    let source = manager.add_node(cart.clone(), "price", None);
    for i in 0..300 {
        let counter = calls.clone();
        let dependent = manager.add_node_with_update(cart.clone(), format!("derived{i}"), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        manager.add_dependency(source, dependent).unwrap();
    }

    assert_eq!(manager.notify_dependents(&cart, "price").unwrap(), 300);
    assert_eq!(calls.load(Ordering::SeqCst), 300);
    assert_eq!(manager.node_count(), 301);
}

/// Test the graph directly, without a manager.
#[test]
fn graph_reports_structure_through_snapshots() {
    let mut graph = DependencyGraph::new();
    let cart = Cart::new(1, 1);

    let price = graph.add_node(cart.clone(), "price", None);
    let total = graph.add_node_with_update(cart.clone(), "total", || {});
    graph.add_dependency(price, total).unwrap();
    graph.add_dependency(price, total).unwrap();

    let snapshot = graph.snapshot();
    assert_eq!(snapshot.nodes.len(), 2);
    assert!(!snapshot.nodes[0].has_update_method);
    assert!(snapshot.nodes[1].has_update_method);
    assert_eq!(snapshot.dependencies, vec![(NodeIndex::new(0), NodeIndex::new(1))]);

    let json = snapshot.to_json().unwrap();
    assert!(json.contains("\"property_name\": \"total\""));
}

/// Test registering nodes from several threads at once.
#[test]
fn concurrent_registration_keeps_indices_contiguous() {
    struct Widget;

    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let manager = Arc::new(PropagationManager::<Widget>::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let manager = manager.clone();
            std::thread::spawn(move || {
                let obj = Arc::new(Widget);
                (0..PER_THREAD)
                    .map(|i| manager.add_node(obj.clone(), format!("t{t}p{i}"), None).raw())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut indices: Vec<usize> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    indices.sort_unstable();

    assert_eq!(indices, (0..THREADS * PER_THREAD).collect::<Vec<_>>());
    assert_eq!(manager.node_count(), THREADS * PER_THREAD);
    assert_eq!(manager.snapshot().nodes.len(), THREADS * PER_THREAD);
}

/// Test a property that depends on itself.
#[test]
fn self_loop_runs_own_callback_once() {
    let manager = PropagationManager::new();
    let cart = Cart::new(1, 1);
    let calls = Arc::new(AtomicI32::new(0));

    let counter = calls.clone();
    let total = manager.add_node_with_update(cart.clone(), "total", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    manager.add_dependency(total, total).unwrap();

    // A second registration under the same key does not take over lookups
    let duplicate = manager.add_node(cart.clone(), "total", None);
    assert_ne!(duplicate, total);
    assert_eq!(manager.find_node(&cart, "total").unwrap(), total);

    assert_eq!(manager.notify_dependents(&cart, "total").unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.get_dependents(total).unwrap(), vec![total]);
    assert_eq!(manager.get_notifiers(total).unwrap(), vec![total]);
}
