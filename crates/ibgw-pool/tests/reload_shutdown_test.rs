//! Roster reload and shutdown integration tests.

mod common;

use common::{harness, tenant, test_config, wait_for_client, wait_for_status};
use ibgw_core::GatewayStatus;
use ibgw_pool::PoolError;
use std::time::Duration;
use std::time::Instant;

const WAIT: Duration = Duration::from_secs(3);

#[tokio::test]
async fn test_reload_is_idempotent_for_unchanged_roster() {
    let h = harness(test_config());
    h.roster.set(&["f1", "f2"]);

    let first = h.manager.start().await.unwrap();
    assert_eq!(first.started.len(), 2);

    for id in ["f1", "f2"] {
        assert!(wait_for_status(&h.manager, &tenant(id), GatewayStatus::Running, WAIT).await);
    }
    let creates = h.runtime.create_count();
    let ports = h.manager.stats().ports_allocated;

    // Same roster again: no new processes, no new allocations.
    let second = h.manager.reload_tenants().await.unwrap();
    assert!(second.is_noop());
    assert_eq!(second.unchanged, 2);
    assert_eq!(h.runtime.create_count(), creates);
    assert_eq!(h.manager.stats().ports_allocated, ports);

    h.manager.stop().await;
}

#[tokio::test]
async fn test_tenant_removal_frees_resources_and_leaves_peer_untouched() {
    let h = harness(test_config());
    h.roster.set(&["a", "b"]);
    h.manager.start().await.unwrap();

    let a = tenant("a");
    let b = tenant("b");
    assert!(wait_for_status(&h.manager, &a, GatewayStatus::Running, WAIT).await);
    assert!(wait_for_status(&h.manager, &b, GatewayStatus::Running, WAIT).await);

    let a_token = wait_for_client(&h.manager, &a, WAIT)
        .await
        .expect("client handle for a")
        .session_token;

    // Roster shrinks to {a}.
    h.roster.set(&["a"]);
    let summary = h.manager.reload_tenants().await.unwrap();
    assert_eq!(summary.removed, vec![b.clone()]);
    assert!(summary.started.is_empty());

    // B is gone and its resources are free again.
    assert!(h.manager.status(&b).is_none());
    let stats = h.manager.stats();
    assert_eq!(stats.instances, 1);
    assert_eq!(stats.ports_allocated, 1);
    assert_eq!(stats.client_ids_allocated, 1);

    // A never noticed: still running on the same session.
    assert_eq!(h.manager.status(&a).unwrap().status, GatewayStatus::Running);
    assert_eq!(h.manager.get_client(&a).unwrap().session_token, a_token);

    h.manager.stop().await;
}

#[tokio::test]
async fn test_resource_exhaustion_surfaces_per_tenant() {
    let mut config = test_config();
    config.port_range_end = config.port_range_start; // one port only
    let h = harness(config);
    h.roster.set(&["a", "b"]);

    let summary = h.manager.start().await.unwrap();
    assert_eq!(summary.started.len(), 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(matches!(
        summary.failed[0].1,
        PoolError::ResourceExhausted(_)
    ));

    // The failed tenant holds nothing and is absent from the registry.
    assert_eq!(h.manager.stats().instances, 1);
    assert_eq!(h.manager.stats().ports_allocated, 1);

    h.manager.stop().await;
}

#[tokio::test]
async fn test_released_values_are_not_reused_before_termination_confirmed() {
    let h = harness(test_config());
    h.roster.set(&["a", "b"]);
    h.manager.start().await.unwrap();

    let b = tenant("b");
    assert!(wait_for_status(&h.manager, &b, GatewayStatus::Running, WAIT).await);

    // B's container ignores its graceful stop.
    h.runtime.hang_on_stop("ibgw-b");

    let manager = h.manager.clone();
    let b_clone = b.clone();
    let stop_task = tokio::spawn(async move { manager.stop_tenant(&b_clone).await });

    // While the stop is still waiting on the container, B's port and
    // client id must not be back in the pools.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!stop_task.is_finished());
    assert_eq!(h.manager.stats().ports_allocated, 2);
    assert_eq!(h.manager.stats().client_ids_allocated, 2);

    // Once the stop path completes (force removal), the values free up.
    stop_task.await.unwrap().unwrap();
    assert_eq!(h.manager.stats().ports_allocated, 1);
    assert_eq!(h.manager.stats().client_ids_allocated, 1);

    h.manager.stop().await;
}

#[tokio::test]
async fn test_shutdown_completes_with_hanging_instances() {
    let h = harness(test_config());
    let ids: Vec<String> = (1..=10).map(|i| format!("f{i}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    h.roster.set(&id_refs);
    h.manager.start().await.unwrap();

    for id in &ids {
        assert!(wait_for_status(&h.manager, &tenant(id), GatewayStatus::Running, WAIT).await);
    }

    // Two containers ignore their graceful stop entirely.
    h.runtime.hang_on_stop("ibgw-f3");
    h.runtime.hang_on_stop("ibgw-f7");

    let started = Instant::now();
    h.manager.stop().await;
    let elapsed = started.elapsed();

    // Bounded by the grace period plus force-termination overhead, not
    // by the hanging containers' 5s stops.
    assert!(
        elapsed < Duration::from_secs(2),
        "shutdown took {elapsed:?}, expected to be bounded by the grace period"
    );

    // Total cleanup: empty registry, everything released, nothing running.
    assert!(h.manager.list().is_empty());
    let stats = h.manager.stats();
    assert_eq!(stats.instances, 0);
    assert_eq!(stats.ports_allocated, 0);
    assert_eq!(stats.client_ids_allocated, 0);
    assert_eq!(h.runtime.running_count(), 0);
}

#[tokio::test]
async fn test_stop_tenant_unknown_errors() {
    let h = harness(test_config());
    let err = h.manager.stop_tenant(&tenant("ghost")).await.unwrap_err();
    assert!(matches!(err, PoolError::UnknownTenant(_)));
}
