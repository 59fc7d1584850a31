//! Lifecycle scenarios driven through the public orchestrator API

mod common;

use std::time::Duration;

use common::{orchestrator, FakeKafkaTools, FakeLauncher};
use kraftlab::cluster::{ClusterState, StartOutcome};
use kraftlab::config::{ConfigGenerator, Topology, Workspace};
use kraftlab::runtime::StopReport;

#[test]
fn test_topology_endpoints_for_three_nodes() {
    let topology = Topology::new(3, 9092, 9029).unwrap();

    assert_eq!(
        topology.broker_endpoints(),
        vec!["localhost:9092", "localhost:9093", "localhost:9094"]
    );
    assert_eq!(
        topology.quorum_voters(),
        "1@localhost:9029,2@localhost:9030,3@localhost:9031"
    );
}

#[test]
fn test_generated_voter_lists_are_deterministic() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let topology = Topology::new(4, 19092, 19029).unwrap();

    let first = ConfigGenerator::new(Workspace::new(a.path()))
        .generate(&topology)
        .unwrap();
    let second = ConfigGenerator::new(Workspace::new(b.path()))
        .generate(&topology)
        .unwrap();

    let voters: Vec<_> = first.iter().map(|c| c.controller_quorum_voters.clone()).collect();
    assert!(voters.iter().all(|v| *v == voters[0]));
    assert_eq!(
        voters,
        second
            .iter()
            .map(|c| c.controller_quorum_voters.clone())
            .collect::<Vec<_>>()
    );
}

#[tokio::test(start_paused = true)]
async fn test_init_twice_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let h = orchestrator(tmp.path(), FakeKafkaTools::healthy(), FakeLauncher::new());
    let ws = h.orchestrator.workspace().clone();

    let first = h.orchestrator.init().await.unwrap();
    let configs: Vec<String> = (1..=3)
        .map(|n| std::fs::read_to_string(ws.node_config_path(n)).unwrap())
        .collect();
    let second = h.orchestrator.init().await.unwrap();

    assert_eq!(first.cluster_id, "q1Sh-9_ISia_zwGINzRvyQ");
    assert_eq!(first.cluster_id, second.cluster_id);
    assert_eq!(
        std::fs::read_to_string(ws.cluster_id_file()).unwrap().trim(),
        first.cluster_id
    );
    for (n, before) in (1..=3).zip(configs) {
        assert_eq!(std::fs::read_to_string(ws.node_config_path(n)).unwrap(), before);
    }
    assert_eq!(h.tools.uuid_calls(), 1);
    assert!(second.format.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_start_status_stop_from_fresh_orchestrator() {
    let tmp = tempfile::tempdir().unwrap();
    let h = orchestrator(tmp.path(), FakeKafkaTools::healthy(), FakeLauncher::new());
    h.orchestrator.init().await.unwrap();

    let outcome = h.orchestrator.start().await.unwrap();
    match &outcome {
        StartOutcome::Running {
            leader_id,
            spawn_failures,
            ..
        } => {
            assert_eq!(*leader_id, 2);
            assert!(spawn_failures.is_empty());
        }
        other => panic!("expected a running cluster, got {:?}", other),
    }

    // A second invocation only sees the workspace on disk
    let other = orchestrator(tmp.path(), FakeKafkaTools::healthy(), FakeLauncher::new());
    let status = other.orchestrator.status().unwrap();
    assert_eq!(status.state, ClusterState::Running);
    let registry = status.registry.unwrap();
    let ids: Vec<u16> = registry.records().map(|r| r.node_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let report = other.orchestrator.stop().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(
        *other.launcher.terminated.lock().unwrap(),
        vec![40_000, 40_001, 40_002]
    );
    assert_eq!(other.orchestrator.state(), ClusterState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_without_registry_is_noop() {
    let tmp = tempfile::tempdir().unwrap();
    let h = orchestrator(tmp.path(), FakeKafkaTools::healthy(), FakeLauncher::new());

    assert_eq!(h.orchestrator.stop().await.unwrap(), StopReport::NothingToStop);
    assert!(h.launcher.terminated.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_partial_start_without_quorum_rolls_back() {
    let tmp = tempfile::tempdir().unwrap();
    let h = orchestrator(
        tmp.path(),
        FakeKafkaTools::without_leader(),
        FakeLauncher::failing(2),
    );
    h.orchestrator.init().await.unwrap();

    let started = tokio::time::Instant::now();
    let outcome = h.orchestrator.start().await.unwrap();

    assert_eq!(*h.launcher.launched.lock().unwrap(), vec![1, 2, 3]);
    match outcome {
        StartOutcome::RolledBack {
            spawn_failures,
            last_error,
            stop,
        } => {
            assert_eq!(spawn_failures.len(), 1);
            assert_eq!(spawn_failures[0].0, 2);
            assert!(last_error.unwrap().contains("TimeoutException"));
            assert!(stop.is_clean());
        }
        other => panic!("expected rollback, got {:?}", other),
    }
    // Two 500 ms spawn gaps plus the full 5 s quorum timeout
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert_eq!(*h.launcher.terminated.lock().unwrap(), vec![40_000, 40_001]);
    assert!(!h.orchestrator.workspace().registry_file().exists());
    assert_eq!(h.orchestrator.state(), ClusterState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_clean_removes_workspace() {
    let tmp = tempfile::tempdir().unwrap();
    let h = orchestrator(tmp.path(), FakeKafkaTools::healthy(), FakeLauncher::new());
    h.orchestrator.init().await.unwrap();
    h.orchestrator.start().await.unwrap();

    let outcome = h.orchestrator.clean().await.unwrap();

    assert!(outcome.clean.is_complete());
    assert!(outcome.clean.removed > 0);
    assert_eq!(h.launcher.terminated.lock().unwrap().len(), 3);
    assert!(!tmp.path().join("itest").exists());
    assert!(tmp.path().exists());
}
