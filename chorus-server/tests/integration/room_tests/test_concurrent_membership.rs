use std::collections::BTreeSet;

use crate::integration::{cid, create_test_router, init_tracing, room};

const WORKERS: usize = 8;
const ROUNDS: usize = 50;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_joins_and_leaves_settle_on_net_membership() {
    init_tracing();

    let (router, _signal_rx, output) = create_test_router();
    let r1 = room("r1");

    let handles: Vec<_> = (0..WORKERS)
        .map(|n| {
            let router = router.clone();
            let r1 = r1.clone();
            tokio::spawn(async move {
                let me = cid(&format!("peer-{n}"));
                for _ in 0..ROUNDS {
                    router.join(&r1, &me).await;
                    router.join(&r1, &me).await;
                    router.leave(&r1, &me).await;
                }
                if n % 2 == 0 {
                    router.join(&r1, &me).await;
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.expect("worker panicked");
    }

    let room = router.registry().try_get(&r1).expect("room exists");
    let members = room.members();

    let expected: BTreeSet<_> = (0..WORKERS)
        .filter(|n| n % 2 == 0)
        .map(|n| cid(&format!("peer-{n}")))
        .collect();
    assert_eq!(members.iter().cloned().collect::<BTreeSet<_>>(), expected);
    assert_eq!(members.len(), expected.len());

    for member in &members {
        assert_eq!(
            output.last_roster_for(member).await.as_ref(),
            Some(&members),
            "{member} should have been told the final roster last"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_to_new_room_share_one_room() {
    init_tracing();

    let (router, _signal_rx, output) = create_test_router();
    let r1 = room("fresh");

    let handles: Vec<_> = (0..WORKERS)
        .map(|n| {
            let router = router.clone();
            let r1 = r1.clone();
            tokio::spawn(async move { router.join(&r1, &cid(&format!("peer-{n}"))).await })
        })
        .collect();
    for handle in handles {
        handle.await.expect("worker panicked");
    }

    assert_eq!(router.registry().room_count(), 1);
    let members = router.registry().try_get(&r1).expect("room exists").members();
    assert_eq!(members.len(), WORKERS);
    for member in &members {
        assert_eq!(output.last_roster_for(member).await.as_ref(), Some(&members));
    }
}
