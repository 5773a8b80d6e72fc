mod common;
use crate::common::{CommandConfigBuilder, ConfigFileBuilder, TestResult, TestServer, init_tracing};

use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use command_server::config::ConfigFile;
use command_server::server::handlers::NewCommandRequest;
use command_server::status::ExecutionStatus;
use reqwest::StatusCode;

fn server_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_command(CommandConfigBuilder::new("test", &["echo", "ok"]).build())
        .with_command(
            CommandConfigBuilder::new("timeout", &["sleep", "2"])
                .timeout(1)
                .build(),
        )
        .with_command(CommandConfigBuilder::new("unknown", &["command-not-found"]).build())
        .with_command(
            CommandConfigBuilder::new("slow-output", &["sh", "-c", "echo first; sleep 2; echo second"])
                .build(),
        )
        .with_command(CommandConfigBuilder::new("dup", &["echo", "first"]).build())
        .with_command(CommandConfigBuilder::new("dup", &["echo", "second"]).build())
        .with_reaper_interval(1)
        .build()
}

async fn post_new(
    client: &reqwest::Client,
    server: &TestServer,
    name: &str,
    args: &[&str],
) -> reqwest::Result<reqwest::Response> {
    client
        .post(server.url("/new"))
        .json(&NewCommandRequest {
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        })
        .send()
        .await
}

fn status_id(res: &reqwest::Response) -> u64 {
    res.headers()
        .get("x-status-id")
        .expect("X-Status-Id header")
        .to_str()
        .expect("ascii header")
        .parse()
        .expect("integer status id")
}

#[tokio::test]
async fn execute_command_streams_output_with_headers() -> TestResult {
    init_tracing();
    let server = TestServer::start(&server_config()).await?;
    let client = reqwest::Client::new();

    let res = post_new(&client, &server, "test", &["good"]).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").map(|v| v.to_str().unwrap()),
        Some("application/octet-stream")
    );
    assert_eq!(status_id(&res), 1);
    assert_eq!(res.text().await?, "ok good\n");

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn status_is_served_as_json_after_completion() -> TestResult {
    init_tracing();
    let server = TestServer::start(&server_config()).await?;
    let client = reqwest::Client::new();

    let res = post_new(&client, &server, "test", &[]).await?;
    let id = status_id(&res);
    res.bytes().await?;

    // The ledger is written right after the body ends; allow for that race.
    let mut status = None;
    for _ in 0..50 {
        let res = client
            .post(server.url(&format!("/status/{id}")))
            .send()
            .await?;
        if res.status() == StatusCode::OK {
            status = Some(res.json::<ExecutionStatus>().await?);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let status = status.expect("status became available");
    assert_eq!(status.name, "test");
    assert!(status.args.is_empty());
    assert!(status.success);
    assert_eq!(status.exit_code, 0);

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn timeout_completes_quickly_without_server_error() -> TestResult {
    init_tracing();
    let server = TestServer::start(&server_config()).await?;
    let client = reqwest::Client::new();

    let started = Instant::now();
    let res = post_new(&client, &server, "timeout", &[]).await?;
    assert_eq!(res.status(), StatusCode::OK);
    res.bytes().await?;
    assert!(started.elapsed() < Duration::from_millis(1800));

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn output_arrives_before_process_exits() -> TestResult {
    init_tracing();
    let server = TestServer::start(&server_config()).await?;
    let client = reqwest::Client::new();

    let started = Instant::now();
    let mut res = post_new(&client, &server, "slow-output", &[]).await?;
    let first = res.chunk().await?.expect("first chunk");
    assert_eq!(&first[..], b"first\n");
    assert!(
        started.elapsed() < Duration::from_millis(1500),
        "first chunk was buffered until exit"
    );

    let mut rest = Vec::new();
    while let Some(chunk) = res.chunk().await? {
        rest.extend_from_slice(&chunk);
    }
    assert_eq!(rest, b"second\n");

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn error_statuses() -> TestResult {
    init_tracing();
    let server = TestServer::start(&server_config()).await?;
    let client = reqwest::Client::new();

    let res = post_new(&client, &server, "not-exist", &[]).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = post_new(&client, &server, "unknown", &[]).await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.text().await?;
    assert!(!body.contains("command-not-found"), "cause leaked: {body}");

    let res = client
        .post(server.url("/new"))
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    for target in ["/new", "/status/1"] {
        let res = client.get(server.url(target)).send().await?;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "GET {target}");
    }

    for (target, expected) in [
        ("/status/", StatusCode::BAD_REQUEST),
        ("/status", StatusCode::BAD_REQUEST),
        ("/status/hoge", StatusCode::BAD_REQUEST),
        ("/status/abc/def", StatusCode::BAD_REQUEST),
        ("/status/1/extra", StatusCode::BAD_REQUEST),
        ("/status/-1", StatusCode::NOT_FOUND),
        ("/status/10000000", StatusCode::NOT_FOUND),
        ("/status/18446744073709551615", StatusCode::NOT_FOUND),
    ] {
        let res = client.post(server.url(target)).send().await?;
        assert_eq!(res.status(), expected, "POST {target}");
    }

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn duplicate_name_resolves_to_later_definition() -> TestResult {
    init_tracing();
    let server = TestServer::start(&server_config()).await?;
    let client = reqwest::Client::new();

    let res = post_new(&client, &server, "dup", &[]).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "second\n");

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn reaper_expires_old_statuses() -> TestResult {
    init_tracing();
    let server = TestServer::start(&server_config()).await?;
    let client = reqwest::Client::new();

    let ledger = server.state.engine.ledger();
    let two_hours_ago = Utc::now() - TimeDelta::hours(2);
    let old = ledger.allocate();
    ledger.record(
        old,
        ExecutionStatus {
            name: "test".to_string(),
            args: vec![],
            success: true,
            exit_code: 0,
            start_at: two_hours_ago,
            finished_at: two_hours_ago,
        },
    );

    // Reaper interval is one second in this config.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let res = client
        .post(server.url(&format!("/status/{old}")))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.stop().await?;
    Ok(())
}
