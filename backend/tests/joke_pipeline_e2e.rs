//! End-to-end behaviour of the pipeline over the real HTTP adapters, with
//! both upstreams served by wiremock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use laff::domain::ports::JokeQuery;
use laff::domain::{
    ExitReason, JokeOrigin, JokePipeline, JokePipelinePorts, PipelineConfig, PipelineReport,
};
use laff::outbound::jokes::JokeHttpSource;
use laff::outbound::names::NameHttpSource;
use regex::Regex;
use rstest::rstest;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves `Name<k>`/`Surname<k>` and records when each request arrived.
/// The first `throttled` requests are answered with 429.
#[derive(Clone, Default)]
struct NameResponder {
    throttled: usize,
    retry_after_secs: u64,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl NameResponder {
    fn throttling(throttled: usize, retry_after_secs: u64) -> Self {
        Self {
            throttled,
            retry_after_secs,
            ..Self::default()
        }
    }

    fn arrivals(&self) -> Vec<Instant> {
        self.arrivals.lock().expect("arrivals lock").clone()
    }
}

impl Respond for NameResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let k = {
            let mut arrivals = self.arrivals.lock().expect("arrivals lock");
            arrivals.push(Instant::now());
            arrivals.len()
        };
        if k <= self.throttled {
            return ResponseTemplate::new(429)
                .insert_header("Retry-After", self.retry_after_secs.to_string().as_str());
        }
        ResponseTemplate::new(200).set_body_json(json!({
            "name": format!("Name{k}"),
            "surname": format!("Surname{k}"),
            "gender": "female",
            "region": "England",
        }))
    }
}

/// Echoes the requested name into `"<first> <last> made joke <k>"`.
#[derive(Clone, Default)]
struct JokeResponder {
    calls: Arc<AtomicUsize>,
}

impl Respond for JokeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let k = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let param = |key: &str| {
            request
                .url
                .query_pairs()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default()
        };
        ResponseTemplate::new(200).set_body_json(json!({
            "type": "success",
            "value": {
                "id": k,
                "joke": format!("{} {} made joke {k}", param("firstName"), param("lastName")),
                "categories": ["nerdy"],
            },
        }))
    }
}

async fn mount(server: &MockServer, route: &str, responder: impl Respond + 'static) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(responder)
        .mount(server)
        .await;
}

fn pipeline(server: &MockServer, config: PipelineConfig) -> Arc<JokePipeline> {
    let base = Url::parse(&server.uri()).expect("mock url");
    let names = NameHttpSource::new(base.join("/api/").expect("name url"), CLIENT_TIMEOUT)
        .expect("name client");
    let jokes = JokeHttpSource::new(base.join("/jokes/random").expect("joke url"), CLIENT_TIMEOUT)
        .expect("joke client");
    let ports = JokePipelinePorts::new(Arc::new(names), Arc::new(jokes));
    Arc::new(JokePipeline::new(ports, config).expect("valid config"))
}

fn fast_config(workers: usize) -> PipelineConfig {
    PipelineConfig {
        requests_per_minute: 60_000,
        rate_limit_slop: Duration::from_secs(1),
        ..PipelineConfig::uniform(workers, 10)
    }
}

fn spawn_run(pipeline: &Arc<JokePipeline>, cancel: &CancellationToken) -> JoinHandle<PipelineReport> {
    let pipeline = Arc::clone(pipeline);
    let cancel = cancel.clone();
    tokio::spawn(async move { pipeline.run(cancel).await })
}

async fn stop(runner: JoinHandle<PipelineReport>, cancel: &CancellationToken) -> PipelineReport {
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("pipeline stops promptly")
        .expect("pipeline task joins")
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_receive_personalised_jokes() {
    let server = MockServer::start().await;
    mount(&server, "/api/", NameResponder::default()).await;
    mount(&server, "/jokes/random", JokeResponder::default()).await;
    let pipeline = pipeline(&server, fast_config(3));
    let cancel = CancellationToken::new();
    let runner = spawn_run(&pipeline, &cancel);
    tokio::time::timeout(Duration::from_secs(5), async {
        while pipeline.status().cached_jokes < 10 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("pipeline warms the joke cache");

    let callers: Vec<_> = (0..10)
        .map(|_| {
            let service = pipeline.service();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut jokes = Vec::new();
                for _ in 0..3 {
                    jokes.push(service.serve(&cancel).await);
                }
                jokes
            })
        })
        .collect();
    let mut served = Vec::new();
    for caller in callers {
        served.extend(caller.await.expect("caller joins"));
    }
    let report = stop(runner, &cancel).await;

    let shape = Regex::new(r"^\S+ \S+ made joke \d+$").expect("regex");
    assert_eq!(served.len(), 30);
    let served: Vec<_> = served
        .into_iter()
        .map(|outcome| outcome.expect("joke served"))
        .collect();
    for joke in &served {
        assert!(shape.is_match(&joke.joke), "unexpected joke {:?}", joke.joke);
    }
    assert!(served.iter().any(|joke| joke.origin == JokeOrigin::CacheHit));
    assert!(report.exits.iter().all(|exit| exit.reason == ExitReason::Cancelled));
    assert_eq!(report.exits.len(), 6);
}

#[rstest]
#[tokio::test]
async fn cold_cache_makes_one_request_per_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(NameResponder::default())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jokes/random"))
        .respond_with(JokeResponder::default())
        .expect(1)
        .mount(&server)
        .await;
    let pipeline = pipeline(&server, fast_config(1));

    let served = pipeline
        .service()
        .serve(&CancellationToken::new())
        .await
        .expect("joke served");

    assert_eq!(served.origin, JokeOrigin::Miss);
    assert_eq!(served.joke, "Name1 Surname1 made joke 1");
    server.verify().await;
}

#[rstest]
#[tokio::test]
async fn rate_limited_producer_waits_for_retry_after_plus_slop() {
    let server = MockServer::start().await;
    let names = NameResponder::throttling(1, 2);
    mount(&server, "/api/", names.clone()).await;
    mount(&server, "/jokes/random", JokeResponder::default()).await;
    let pipeline = pipeline(&server, fast_config(1));
    let cancel = CancellationToken::new();
    let runner = spawn_run(&pipeline, &cancel);

    tokio::time::timeout(Duration::from_secs(10), async {
        while names.arrivals().len() < 2 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("producer retries after the delay");
    let status = pipeline.status();
    stop(runner, &cancel).await;

    let arrivals = names.arrivals();
    assert!(arrivals[1].duration_since(arrivals[0]) >= Duration::from_secs(3));
    assert_eq!(status.name_errors, 0);
}

#[rstest]
#[tokio::test]
async fn front_door_surfaces_upstream_rate_limit() {
    let server = MockServer::start().await;
    mount(&server, "/api/", NameResponder::throttling(usize::MAX, 7)).await;
    let pipeline = pipeline(&server, fast_config(1));

    let err = JokeQuery::joke(&pipeline.service(), &CancellationToken::new())
        .await
        .expect_err("rate limited");

    assert_eq!(
        err,
        laff::domain::Error::RateLimited {
            retry_after: Duration::from_secs(7)
        }
    );
}
