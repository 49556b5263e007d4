//! Multi-service scenarios over real sockets

use std::net::TcpListener;
use std::time::Duration;

use kube_status::prelude::*;

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn address(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

fn config(port: u16, dependencies: &[u16]) -> Config {
    let mut config = Config::default();
    config.service.hostname = "127.0.0.1".to_string();
    config.service.port = port;
    config.service.start_wait_ms = 50;
    config.service.dependencies = dependencies.iter().copied().map(address).collect();
    config.probe.timeout_ms = Some(5_000);
    config
}

fn service(config: Config, ready: Option<&'static str>) -> Service {
    Service::builder()
        .with_config(config)
        .health_fn(|| Ok(()))
        .readiness_fn(move || match ready {
            None => Ok(()),
            Some(reason) => Err(reason.into()),
        })
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_two_hop_chain_is_ready() {
    let (a, b, c) = (free_port(), free_port(), free_port());
    let leaf = service(config(c, &[]), None);
    let middle = service(config(b, &[c]), None);
    let top = service(config(a, &[b]), None);

    for svc in [&leaf, &middle, &top] {
        svc.start().await.unwrap();
    }

    let status = top.readiness(&[]).await;
    assert!(status.success, "{:?}", status);
    assert_eq!(status.code, 200);
    assert_eq!(status.message, "OK");
    assert_eq!(status.uuid, top.id().to_string());

    // Same answer over HTTP
    let report = DependencyClient::new([address(a)]).readiness().await;
    let statuses = report.into_result().unwrap();
    let remote = statuses[0].as_ref().unwrap();
    assert!(remote.success);
    assert_eq!(remote.uuid, top.id().to_string());

    for svc in [&leaf, &middle, &top] {
        svc.shutdown();
    }
}

#[tokio::test]
async fn test_dependency_failure_message_propagates() {
    let (a, b, c) = (free_port(), free_port(), free_port());
    let leaf = service(config(c, &[]), Some("TWO"));
    let middle = service(config(b, &[c]), None);
    let top = service(config(a, &[b]), None);

    for svc in [&leaf, &middle, &top] {
        svc.start().await.unwrap();
    }

    let status = middle.readiness(&[]).await;
    assert_eq!(status.code, 503);
    assert!(!status.success);
    assert_eq!(status.message, "503 Service Unavailable: TWO");

    let status = top.readiness(&[]).await;
    assert_eq!(status.code, 503);
    assert_eq!(
        status.message,
        "503 Service Unavailable: 503 Service Unavailable: TWO"
    );

    // Readiness failures never touch liveness
    assert!(top.health().await.success);
    assert!(leaf.health().await.success);

    for svc in [&leaf, &middle, &top] {
        svc.shutdown();
    }
}

#[tokio::test]
async fn test_mutual_dependency_reports_loop_detected() {
    let (a, b) = (free_port(), free_port());
    let first = service(config(a, &[b]), None);
    let second = service(config(b, &[a]), None);

    first.start().await.unwrap();
    second.start().await.unwrap();

    let status = tokio::time::timeout(Duration::from_secs(10), first.readiness(&[]))
        .await
        .expect("cycle must terminate");
    assert_eq!(status.code, 508);
    assert!(!status.success);
    assert!(status.message.starts_with("508 Loop Detected"));
    assert!(status
        .message
        .contains("cyclic dependency detected for UUID list"));
    assert!(status.message.contains(&first.id().to_string()));
    assert!(status.message.contains(&second.id().to_string()));

    // Every service on the cycle sees it
    let status = second.readiness(&[]).await;
    assert_eq!(status.code, 508);

    first.shutdown();
    second.shutdown();
}

#[tokio::test]
async fn test_self_dependency_is_a_cycle() {
    let port = free_port();
    let svc = service(config(port, &[port]), None);
    svc.start().await.unwrap();

    let status = svc.readiness(&[]).await;
    assert_eq!(status.code, 508);

    svc.shutdown();
}

#[tokio::test]
async fn test_forwarded_chain_over_http() {
    let port = free_port();
    let svc = service(config(port, &[]), None);
    svc.start().await.unwrap();

    let report = DependencyClient::new([address(port)])
        .chain(vec!["upstream".to_string()])
        .readiness()
        .await;
    assert!(report.is_ok());

    let report = DependencyClient::new([address(port)])
        .chain(vec![svc.id().to_string(), "upstream".to_string()])
        .readiness()
        .await;
    let err = report.error.unwrap();
    assert!(err.is_loop_detected());
    assert_eq!(report.statuses[0].as_ref().unwrap().code, 508);

    svc.shutdown();
}

#[tokio::test]
async fn test_unreachable_dependency_is_not_ready() {
    let (a, missing) = (free_port(), free_port());
    let svc = service(config(a, &[missing]), None);
    svc.start().await.unwrap();

    let status = svc.readiness(&[]).await;
    assert_eq!(status.code, 503);
    assert!(!status.message.is_empty());
    assert!(svc.fatal().is_none());
    assert!(svc.health().await.success);

    svc.shutdown();
}

#[tokio::test]
async fn test_probe_all_reports_first_error() {
    let (a, good, missing) = (free_port(), free_port(), free_port());
    let dependency = service(config(good, &[]), Some("draining"));
    dependency.start().await.unwrap();

    let mut cfg = config(a, &[good, missing]);
    cfg.probe.all = true;
    let svc = service(cfg, None);
    svc.start().await.unwrap();

    let status = svc.readiness(&[]).await;
    assert_eq!(status.message, "503 Service Unavailable: draining");

    svc.shutdown();
    dependency.shutdown();
}

#[tokio::test]
async fn test_bind_failure_is_latched() {
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let svc = service(config(port, &[]), None);
    let err = svc.start().await.unwrap_err();
    match &err {
        Error::Fatal(ServeError::Bind { addr, .. }) => {
            assert_eq!(addr, &format!("127.0.0.1:{}", port))
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert!(svc.stopped().is_cancelled());
    assert_eq!(svc.lifecycle().phase, Phase::Fatal);

    let fatal = svc.fatal().unwrap();
    assert!(fatal.time.is_some());

    let health = svc.health().await;
    assert_eq!(health.code, 503);
    assert!(health.message.starts_with("failed to bind 127.0.0.1:"));

    let readiness = svc.readiness(&[]).await;
    assert_eq!(readiness.message, health.message);

    // Latched for good
    assert!(matches!(svc.start().await, Err(Error::AlreadyStarted)));
    assert_eq!(svc.fatal().unwrap().error, fatal.error);

    drop(taken);
}

#[tokio::test]
async fn test_start_twice() {
    let svc = service(config(free_port(), &[]), None);
    svc.start().await.unwrap();
    assert!(matches!(svc.start().await, Err(Error::AlreadyStarted)));
    assert!(svc.health().await.success);
    svc.shutdown();
}

#[tokio::test]
async fn test_shutdown_then_checks_fail() {
    let svc = service(config(free_port(), &[]), None);
    svc.start().await.unwrap();
    let started = svc.health().await.started;

    svc.shutdown();
    svc.stopped().cancelled().await;

    let health = svc.health().await;
    assert_eq!(health.code, 503);
    assert_eq!(health.message, ServeError::Stopped.to_string());
    assert_eq!(health.started, started);
}
