#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::*;

    /// Generator that counts its runs and logs "dispose N" into `log`.
    fn counting(
        created: &Rc<Cell<u32>>,
        log: &Rc<RefCell<Vec<String>>>,
    ) -> impl FnOnce() -> Dispose + 'static {
        let created = created.clone();
        let log = log.clone();
        move || {
            created.set(created.get() + 1);
            let n = created.get();
            log.borrow_mut().push(format!("create {n}"));
            Dispose::new(move || log.borrow_mut().push(format!("dispose {n}")))
        }
    }

    fn probes() -> (Rc<Cell<u32>>, Rc<RefCell<Vec<String>>>) {
        (Rc::new(Cell::new(0)), Rc::new(RefCell::new(Vec::new())))
    }

    #[test]
    fn test_dispose_runs_once() {
        let hits = Rc::new(Cell::new(0));
        let d = {
            let hits = hits.clone();
            Dispose::new(move || hits.set(hits.get() + 1))
        };
        let d2 = d.clone();

        assert!(!d.is_disposed());
        d.run();
        d2.run();
        assert_eq!(hits.get(), 1);
        assert!(d2.is_disposed());
        assert!(d.ptr_eq(&d2));
        assert!(!d.ptr_eq(&Dispose::noop()));
    }

    #[test]
    fn test_binder_single_creation() {
        let (created, log) = probes();
        let mut binder = DisposableBinder::new();

        let d = binder.activate([1], counting(&created, &log)).unwrap();
        assert_eq!(created.get(), 1);
        assert_eq!(binder.state(), BinderState::Active);
        let held = binder.current().unwrap();
        assert!(d.unwrap().ptr_eq(held));
    }

    #[test]
    fn test_binder_stable_deps_do_not_recreate() {
        let (created, log) = probes();
        let mut binder = DisposableBinder::new();

        let first = binder.activate(vec![1, 2], counting(&created, &log)).unwrap().unwrap();
        assert!(!binder.is_stale(&vec![1, 2]));
        let second = binder.activate(vec![1, 2], counting(&created, &log)).unwrap().unwrap();

        assert_eq!(created.get(), 1);
        assert!(first.ptr_eq(&second));
        assert_eq!(binder.generation(), 1);
        assert_eq!(*log.borrow(), vec!["create 1"]);
    }

    #[test]
    fn test_binder_changed_deps_teardown_before_recreate() {
        let (created, log) = probes();
        let mut binder = DisposableBinder::new();

        let first = binder.activate([1], counting(&created, &log)).unwrap().unwrap();
        assert!(binder.is_stale(&[2]));
        let second = binder.activate([2], counting(&created, &log)).unwrap().unwrap();

        assert_eq!(*log.borrow(), vec!["create 1", "dispose 1", "create 2"]);
        assert!(first.is_disposed());
        assert!(!second.is_disposed());
        assert!(binder.current().unwrap().ptr_eq(&second));
        assert_eq!(binder.generation(), 2);
    }

    #[test]
    fn test_binder_dispose_runs_last_disposer_once() {
        let (created, log) = probes();
        let mut binder = DisposableBinder::new();

        binder.activate((), counting(&created, &log)).unwrap();
        binder.dispose();
        binder.dispose();

        assert_eq!(binder.state(), BinderState::Disposed);
        assert_eq!(*log.borrow(), vec!["create 1", "dispose 1"]);
        assert_eq!(
            binder.activate((), counting(&created, &log)).unwrap_err(),
            BindError::Disposed
        );
        assert_eq!(created.get(), 1);
    }

    #[test]
    fn test_binder_empty_slot_is_skipped() {
        let mut binder = DisposableBinder::new();
        let ran = Rc::new(Cell::new(false));

        let held = binder
            .activate(0, {
                let ran = ran.clone();
                move || ran.set(true)
            })
            .unwrap();
        assert!(ran.get());
        assert!(held.is_none());

        // Explicit None behaves the same and recreation still happens.
        let held = binder.activate(1, || None::<Dispose>).unwrap();
        assert!(held.is_none());
        assert_eq!(binder.generation(), 2);

        binder.teardown();
        binder.dispose();
        assert_eq!(binder.state(), BinderState::Disposed);
    }

    #[test]
    fn test_binder_drop_disposes() {
        let (created, log) = probes();
        {
            let mut binder = DisposableBinder::new();
            binder.activate("a", counting(&created, &log)).unwrap();
        }
        assert_eq!(*log.borrow(), vec!["create 1", "dispose 1"]);
    }

    #[test]
    fn test_binder_early_manual_disposal() {
        let (created, log) = probes();
        let mut binder = DisposableBinder::new();

        let d = binder.activate((), counting(&created, &log)).unwrap().unwrap();
        d.run();
        assert_eq!(*log.borrow(), vec!["create 1", "dispose 1"]);

        // The scheduled teardown still happens, and finds nothing left to do.
        binder.dispose();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_binder_retries_after_generator_panic() {
        let mut binder = DisposableBinder::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = binder.activate(1, || -> Dispose { panic!("setup failed") });
        }));
        assert!(result.is_err());
        assert!(binder.is_stale(&1));

        let (created, log) = probes();
        binder.activate(1, counting(&created, &log)).unwrap();
        assert_eq!(created.get(), 1);
    }

    #[test]
    fn test_use_disposable_lifecycle() {
        let (created, log) = probes();
        let mut comp = Composition::new();
        let dep = Cell::new(1);

        let pass = |comp: &mut Composition, dep: i32| {
            comp.compose(|| use_disposable([dep], counting(&created, &log)))
        };

        let d1 = pass(&mut comp, dep.get());
        let d1_again = pass(&mut comp, dep.get());
        assert!(d1.ptr_eq(&d1_again));
        assert_eq!(created.get(), 1);

        dep.set(2);
        let d2 = pass(&mut comp, dep.get());
        assert!(!d2.ptr_eq(&d1));
        assert_eq!(*log.borrow(), vec!["create 1", "dispose 1", "create 2"]);

        comp.dispose();
        assert_eq!(
            *log.borrow(),
            vec!["create 1", "dispose 1", "create 2", "dispose 2"]
        );
        assert_eq!(created.get(), 2);
    }

    #[test]
    fn test_use_disposable_open_closed_example() {
        let x = Rc::new(RefCell::new(String::new()));
        let created = Rc::new(Cell::new(0));
        let mut comp = Composition::new();

        let generator = || {
            let x = x.clone();
            let created = created.clone();
            move || {
                created.set(created.get() + 1);
                *x.borrow_mut() = "open".to_string();
                Dispose::new(move || *x.borrow_mut() = "closed".to_string())
            }
        };

        comp.compose(|| use_disposable_once(generator()));
        assert_eq!(*x.borrow(), "open");
        comp.compose(|| use_disposable_once(generator()));
        assert_eq!(created.get(), 1);

        comp.dispose();
        assert_eq!(*x.borrow(), "closed");
    }

    #[test]
    fn test_use_disposable_none_is_noop() {
        let mut comp = Composition::new();
        let d = comp.compose(|| use_disposable_once(|| None::<Dispose>));
        assert!(d.is_disposed());
        d.run();
        comp.dispose();
    }

    #[test]
    fn test_use_disposable_early_disposal_then_unmount() {
        let (created, log) = probes();
        let mut comp = Composition::new();

        let d = comp.compose(|| use_disposable_once(counting(&created, &log)));
        d.run();
        assert_eq!(*log.borrow(), vec!["create 1", "dispose 1"]);

        // Stable deps: no recreation even though the disposer already ran.
        comp.compose(|| use_disposable_once(counting(&created, &log)));
        assert_eq!(created.get(), 1);

        comp.dispose();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_use_disposable_with_key_survives_branches() {
        let (created, log) = probes();
        let mut comp = Composition::new();

        for show_banner in [true, false, true] {
            comp.compose(|| {
                if show_banner {
                    let _ = remember(|| "banner");
                }
                use_disposable_with_key("feed", 7u8, counting(&created, &log))
            });
        }
        assert_eq!(created.get(), 1);

        drop(comp);
        assert_eq!(*log.borrow(), vec!["create 1", "dispose 1"]);
    }

    #[test]
    fn test_disposable_effect_cleans_on_key_change() {
        let (created, log) = probes();
        let mut comp = Composition::new();

        for key in ["a", "a", "b"] {
            comp.compose(|| disposable_effect(key, counting(&created, &log)));
        }
        comp.dispose();
        assert_eq!(
            *log.borrow(),
            vec!["create 1", "dispose 1", "create 2", "dispose 2"]
        );
    }

    #[test]
    fn test_child_composition_disposed_with_parent() {
        let (created, log) = probes();
        let parent = Composition::new();
        let mut child = parent.child();

        child.compose(|| use_disposable_once(counting(&created, &log)));
        parent.dispose();

        assert!(child.is_disposed());
        assert_eq!(*log.borrow(), vec!["create 1", "dispose 1"]);
        drop(child);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_nested_compose_keeps_slots_apart() {
        let mut outer = Composition::new();
        let mut inner = outer.child();

        let (a, b) = outer.compose(|| {
            let a = *remember(|| 1);
            let b = inner.compose(|| *remember(|| 2));
            (a, b)
        });
        assert_eq!((a, b), (1, 2));

        let again = outer.compose(|| *remember(|| 99));
        assert_eq!(again, 1);
        assert_eq!(outer.passes(), 2);
        assert_eq!(inner.passes(), 1);
    }

    #[test]
    fn test_remember_outside_composition_is_fresh() {
        let a = remember(|| 1);
        let b = remember(|| 2);
        assert_eq!((*a, *b), (1, 2));
    }

    #[test]
    fn test_memo_recomputes_on_change() {
        let runs = Cell::new(0);
        let mut comp = Composition::new();
        let mut pass = |n: i32| {
            comp.compose(|| {
                memo(n, || {
                    runs.set(runs.get() + 1);
                    n * 10
                })
            })
        };

        assert_eq!(pass(1), 10);
        assert_eq!(pass(1), 10);
        assert_eq!(pass(2), 20);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_key_based_remember() {
        let mut comp = Composition::new();
        let (val1, val2) = comp.compose(|| {
            let val1 = remember_with_key("test", || 42);
            let val2 = remember_with_key("test", || 100);
            (*val1, *val2)
        });

        assert_eq!(val1, 42);
        assert_eq!(val2, 42); // Not 100, because key exists
    }

    #[test]
    fn test_scope_explicit_dispose() {
        let cleaned_up = Rc::new(RefCell::new(false));

        let scope = Scope::new();
        let cleaned_up_clone = cleaned_up.clone();
        scope.add_disposer(move || {
            *cleaned_up_clone.borrow_mut() = true;
        });

        assert!(!*cleaned_up.borrow());
        assert_eq!(scope.pending_disposers(), 1);
        scope.dispose();
        assert!(*cleaned_up.borrow());
        assert!(scope.is_disposed());
    }

    #[test]
    fn test_scope_drop_runs_disposers() {
        let cleaned_up = Rc::new(Cell::new(false));
        {
            let scope = Scope::new();
            let c = cleaned_up.clone();
            scope.add_disposer(move || c.set(true));
        }
        assert!(cleaned_up.get());
    }

    #[test]
    fn test_scope_teardown_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let register = |scope: &Scope| {
            for i in 0..3 {
                let order = order.clone();
                scope.add_disposer(move || order.borrow_mut().push(i));
            }
        };

        let fifo = Scope::new();
        register(&fifo);
        fifo.dispose();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);

        order.borrow_mut().clear();
        let lifo = with_lifecycle(
            Lifecycle {
                teardown_order: TeardownOrder::Reverse,
                ..Lifecycle::default()
            },
            Scope::new,
        );
        assert_eq!(lifecycle(), Lifecycle::default());
        assert_eq!(lifo.child().teardown_order(), TeardownOrder::Reverse);
        register(&lifo);
        lifo.dispose();
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn test_scope_children_first() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let parent = Scope::new();
        let child = parent.child();

        let o = order.clone();
        parent.add_disposer(move || o.borrow_mut().push("parent"));
        let o = order.clone();
        child.add_disposer(move || o.borrow_mut().push("child"));

        parent.dispose();
        assert_eq!(*order.borrow(), vec!["child", "parent"]);
    }

    #[test]
    fn test_disposer_added_after_dispose_runs_now() {
        let scope = Scope::new();
        scope.dispose();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        scope.add_disposer(move || r.set(true));
        assert!(ran.get());
    }

    #[test]
    fn test_effect_registers_with_current_scope() {
        let ran = Rc::new(Cell::new(false));
        let scope = Scope::new();
        scope.run(|| {
            let ran = ran.clone();
            effect(move || on_unmount(move || ran.set(true)))
        });
        assert!(current_scope().is_none());
        scope.dispose();
        assert!(ran.get());
    }

    #[test]
    fn test_signal_basic() {
        let sig = signal(42);
        assert_eq!(sig.get(), 42);

        sig.set(100);
        assert_eq!(sig.get(), 100);

        sig.update(|v| *v += 1);
        assert_eq!(sig.get(), 101);
        assert_eq!(sig.with(|v| v * 2), 202);
    }

    #[test]
    fn test_signal_watch_unsubscribes() {
        let sig = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let stop = {
            let seen = seen.clone();
            sig.watch(move |v| seen.borrow_mut().push(*v))
        };
        sig.set(1);
        stop.run();
        sig.set(2);

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(sig.subscriber_count(), 0);
    }

    #[test]
    fn test_signal_unsubscribe_inside_callback() {
        let sig = signal(0);
        let hits = Rc::new(Cell::new(0));
        let id: Rc<Cell<Option<SubId>>> = Rc::new(Cell::new(None));

        let sub = {
            let (sig2, hits, id) = (sig.clone(), hits.clone(), id.clone());
            sig.subscribe(move |_| {
                hits.set(hits.get() + 1);
                if let Some(id) = id.take() {
                    sig2.unsubscribe(id);
                }
            })
        };
        id.set(Some(sub));

        sig.set(1);
        sig.set(2);
        assert_eq!(hits.get(), 1);
        assert!(!sig.unsubscribe(sub));
    }

    #[test]
    fn test_autorun_tracks_and_stops() {
        let a = signal(1);
        let b = signal(10);
        let sum = Rc::new(Cell::new(0));

        let stop = autorun({
            let (a, b, sum) = (a.clone(), b.clone(), sum.clone());
            move || sum.set(a.get() + b.get())
        });
        assert_eq!(sum.get(), 11);
        b.set(20);
        assert_eq!(sum.get(), 21);

        assert_eq!(crate::reactive::observer_count(), 1);
        stop.run();
        assert_eq!(crate::reactive::observer_count(), 0);
        a.set(100);
        assert_eq!(sum.get(), 21);
    }

    #[test]
    fn test_untracked_read_does_not_subscribe() {
        let a = signal(1);
        let runs = Rc::new(Cell::new(0));

        let stop = autorun({
            let (a, runs) = (a.clone(), runs.clone());
            move || {
                runs.set(runs.get() + 1);
                let _ = untracked(|| a.get());
            }
        });
        a.set(2);
        assert_eq!(runs.get(), 1);
        stop.run();
    }

    #[test]
    fn test_reaction_fires_on_change_only() {
        let n = signal(3);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let stop = reaction(
            {
                let n = n.clone();
                move || n.get() % 2
            },
            {
                let seen = seen.clone();
                move |parity: &i32| seen.borrow_mut().push(*parity)
            },
        );
        n.set(5);
        n.set(6);
        n.set(8);
        n.set(9);
        stop.run();
        n.set(10);

        assert_eq!(*seen.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_autorun_bound_to_composition() {
        let room = signal("lobby".to_string());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut comp = Composition::new();

        comp.compose(|| {
            let (room, seen) = (room.clone(), seen.clone());
            use_disposable_once(move || autorun(move || seen.borrow_mut().push(room.get())))
        });
        room.set("kitchen".to_string());
        comp.dispose();
        room.set("garden".to_string());

        assert_eq!(*seen.borrow(), vec!["lobby", "kitchen"]);
    }

    #[test]
    fn test_signal_subscriber_writes_back() {
        let level = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        {
            let (clamp, seen) = (level.clone(), seen.clone());
            level.subscribe(move |v: &i32| {
                seen.borrow_mut().push(*v);
                if *v > 10 {
                    clamp.set(10);
                }
            });
        }
        level.set(20);

        assert_eq!(level.get(), 10);
        assert_eq!(*seen.borrow(), vec![20, 10]);
    }

    #[test]
    fn test_disposed_child_scopes_unlink() {
        let parent = Scope::new();
        for _ in 0..1000 {
            let child = parent.child();
            child.add_disposer(|| {});
            child.dispose();
        }
        assert_eq!(parent.child_count(), 0);

        let live = parent.child();
        drop(live);
        // Still owned by the parent until disposed.
        assert_eq!(parent.child_count(), 1);
    }

    #[test]
    fn test_child_compositions_mount_and_unmount() {
        let parent = Composition::new();
        let (created, log) = probes();

        for _ in 0..100 {
            let mut item = parent.child();
            item.compose(|| use_disposable_once(counting(&created, &log)));
            item.dispose();
        }

        assert_eq!(parent.scope().child_count(), 0);
        assert_eq!(created.get(), 100);
        assert_eq!(log.borrow().len(), 200);
    }

    #[test]
    fn test_slot_type_change_keeps_one_teardown() {
        let (created, log) = probes();
        let mut comp = Composition::new();

        for pass in 0..100u32 {
            comp.compose(|| {
                if pass % 2 == 0 {
                    use_disposable(pass, counting(&created, &log))
                } else {
                    use_disposable(u64::from(pass), counting(&created, &log))
                }
            });
            assert_eq!(comp.scope().pending_disposers(), 1);
        }
        assert_eq!(created.get(), 100);

        comp.dispose();
        let disposed = log.borrow().iter().filter(|l| l.starts_with("dispose")).count();
        assert_eq!(disposed, 100);
    }

    #[test]
    fn test_remove_disposer_skips_it() {
        let ran = Rc::new(Cell::new(false));
        let scope = Scope::new();
        let id = {
            let ran = ran.clone();
            scope.add_disposer(move || ran.set(true))
        };

        assert!(scope.remove_disposer(id));
        assert!(!scope.remove_disposer(id));
        scope.dispose();
        assert!(!ran.get());
    }

    #[test]
    fn test_scoped_effect_cleans_up_with_scope() {
        let ran = Rc::new(Cell::new(false));
        let scope = Scope::new();
        scope.run(|| {
            let ran = ran.clone();
            scoped_effect(move || -> Box<dyn FnOnce()> { Box::new(move || ran.set(true)) })
        });

        assert_eq!(scope.pending_disposers(), 1);
        scope.dispose();
        assert!(ran.get());
    }

    #[test]
    fn test_use_disposable_outside_composition_disposes_immediately() {
        let (created, log) = probes();
        let d = use_disposable_once(counting(&created, &log));

        assert!(d.is_disposed());
        assert_eq!(*log.borrow(), vec!["create 1", "dispose 1"]);
    }

    #[test]
    fn test_remember_state_persists() {
        let mut comp = Composition::new();
        let mut pass = || {
            comp.compose(|| {
                let clicks = remember_state(|| 0);
                let label = remember_state_with_key("label", String::new);
                *clicks.borrow_mut() += 1;
                label.borrow_mut().push('x');
                (*clicks.borrow(), label.borrow().clone())
            })
        };

        assert_eq!(pass(), (1, "x".to_string()));
        assert_eq!(pass(), (2, "xx".to_string()));
    }
}
