//! Property test: under any sequence of borrows and returns the pool never
//! tracks more than `max_size` resources, and every returned lease is
//! accepted exactly once.

use proptest::prelude::*;

use resource_pool::{IdleTimeout, Lease, PoolConfig, WaitPolicy};

mod utils;
use utils::CountingManager;

#[derive(Clone, Debug)]
enum Op {
    Borrow,
    Return(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Borrow), (0usize..8).prop_map(Op::Return)]
}

fn idle_timeout() -> impl Strategy<Value = IdleTimeout> {
    prop_oneof![Just(IdleTimeout::Never), Just(IdleTimeout::Always)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn size_never_exceeds_max(
        max_size in 1usize..5,
        timeout in idle_timeout(),
        ops in proptest::collection::vec(op(), 1..60),
    ) {
        let pool = PoolConfig::new()
            .max_size(max_size)
            .idle_timeout(timeout)
            .build(CountingManager::new())
            .unwrap();
        let mut held = Vec::new();

        for op in ops {
            match op {
                Op::Borrow => {
                    let lease = pool.borrow(WaitPolicy::NoWait).unwrap();
                    prop_assert_eq!(lease.is_none(), held.len() == max_size);
                    held.extend(lease);
                }
                Op::Return(idx) if !held.is_empty() => {
                    let lease = held.remove(idx % held.len());
                    prop_assert!(pool.release(lease).is_ok());
                }
                Op::Return(_) => {}
            }
            prop_assert!(pool.size() <= max_size);
            prop_assert!(pool.size() >= held.len());
            prop_assert!(pool.manager().live() <= max_size);
        }

        let ids: std::collections::HashSet<_> = held.iter().map(|lease| Lease::id(lease)).collect();
        prop_assert_eq!(ids.len(), held.len());

        let outstanding = held.len();
        pool.close();
        prop_assert_eq!(pool.size(), outstanding);
        drop(held);
        prop_assert_eq!(pool.size(), 0);
        prop_assert_eq!(pool.manager().live(), 0);
    }
}
