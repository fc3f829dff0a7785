use super::http_server::{Route, TestServer};
use std::sync::atomic::{AtomicUsize, Ordering};
use strmsync::core::config::ProbeSettings;
use strmsync::core::prober::LivenessProber;

fn fast_settings() -> ProbeSettings {
    ProbeSettings {
        concurrency: 4,
        head_timeout_ms: 2000,
        get_timeout_ms: 2000,
        retries: 2,
        backoff_ms: 10,
        ..ProbeSettings::default()
    }
}

#[tokio::test]
async fn test_file_confirmed_by_head_and_get() {
    let server = TestServer::start(vec![("/movie/u/p/1.mp4", Route::file())]);
    let prober = LivenessProber::new(fast_settings()).unwrap();

    let verdict = prober.probe(&server.url("/movie/u/p/1.mp4")).await;

    assert!(verdict.is_live);
    assert_eq!(verdict.reason, "HEAD+GET bytes");
    assert_eq!(server.hits("/movie/u/p/1.mp4"), 2);
}

#[tokio::test]
async fn test_html_page_is_offline_after_every_tier() {
    let server = TestServer::start(vec![("/movie/u/p/gone.mp4", Route::html())]);
    let prober = LivenessProber::new(fast_settings()).unwrap();

    let verdict = prober.probe(&server.url("/movie/u/p/gone.mp4")).await;

    assert!(!verdict.is_live);
    assert_eq!(verdict.reason, "GET html-or-empty");
    // HEAD, confirmation GET, range GET, plain GET
    assert_eq!(server.hits("/movie/u/p/gone.mp4"), 4);
}

#[tokio::test]
async fn test_missing_file_reports_status() {
    let server = TestServer::start(vec![]);
    let prober = LivenessProber::new(fast_settings()).unwrap();

    let verdict = prober.probe(&server.url("/movie/u/p/missing.mkv")).await;

    assert!(!verdict.is_live);
    assert_eq!(verdict.reason, "GET status 404");
}

#[tokio::test]
async fn test_range_tier_used_when_head_rejected() {
    let server = TestServer::start(vec![("/series/u/p/7.mkv", Route::file().no_head().ranged())]);
    let prober = LivenessProber::new(fast_settings()).unwrap();

    let verdict = prober.probe(&server.url("/series/u/p/7.mkv")).await;

    assert!(verdict.is_live);
    assert_eq!(verdict.reason, "RANGE bytes");
}

#[tokio::test]
async fn test_transient_503_is_retried() {
    let server = TestServer::start(vec![("/movie/u/p/busy.mp4", Route::file().flaky(2))]);
    let prober = LivenessProber::new(fast_settings()).unwrap();

    let verdict = prober.probe(&server.url("/movie/u/p/busy.mp4")).await;

    assert!(verdict.is_live);
    assert_eq!(verdict.reason, "HEAD+GET bytes");
    assert_eq!(server.hits("/movie/u/p/busy.mp4"), 4);
}

#[tokio::test]
async fn test_exhausted_retries_fall_through_to_offline() {
    let server = TestServer::start(vec![("/movie/u/p/down.mp4", Route::file().flaky(100))]);
    let settings = ProbeSettings {
        retries: 1,
        ..fast_settings()
    };
    let prober = LivenessProber::new(settings).unwrap();

    let verdict = prober.probe(&server.url("/movie/u/p/down.mp4")).await;

    assert!(!verdict.is_live);
    assert_eq!(verdict.reason, "GET status 503");
}

#[tokio::test]
async fn test_unreachable_host_is_offline_not_error() {
    let settings = ProbeSettings {
        retries: 0,
        ..fast_settings()
    };
    let prober = LivenessProber::new(settings).unwrap();

    // Port 9 (discard) is not served on loopback
    let verdict = prober.probe("http://127.0.0.1:9/movie/u/p/1.mp4").await;

    assert!(!verdict.is_live);
    assert!(verdict.reason.starts_with("exception: "));
}

#[tokio::test]
async fn test_shared_url_probed_once() {
    let server = TestServer::start(vec![
        ("/movie/u/p/a.mp4", Route::file()),
        ("/movie/u/p/b.mp4", Route::html()),
    ]);
    let prober = LivenessProber::new(fast_settings()).unwrap();
    let a = server.url("/movie/u/p/a.mp4");
    let b = server.url("/movie/u/p/b.mp4");
    let urls = vec![a.clone(), b.clone(), a.clone(), a.clone(), b.clone()];
    let callbacks = AtomicUsize::new(0);

    let verdicts = prober
        .probe_all(urls, |_| {
            callbacks.fetch_add(1, Ordering::Relaxed);
        })
        .await;

    assert_eq!(verdicts.len(), 2);
    assert!(verdicts[&a].is_live);
    assert!(!verdicts[&b].is_live);
    assert_eq!(callbacks.load(Ordering::Relaxed), 2);
    assert_eq!(prober.network_probes(), 2);
    assert_eq!(server.hits("/movie/u/p/a.mp4"), 2);
    assert_eq!(server.hits("/movie/u/p/b.mp4"), 4);

    // A later lookup is answered from the cache
    let again = prober.probe(&a).await;
    assert!(again.is_live);
    assert_eq!(server.hits("/movie/u/p/a.mp4"), 2);
}

#[tokio::test]
async fn test_concurrent_probes_of_one_url_agree() {
    let server = TestServer::start(vec![("/movie/u/p/same.mp4", Route::file())]);
    let prober = LivenessProber::new(fast_settings()).unwrap();
    let url = server.url("/movie/u/p/same.mp4");

    let (first, second, third) = tokio::join!(prober.probe(&url), prober.probe(&url), prober.probe(&url));

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(prober.network_probes(), 1);
    assert_eq!(server.hits("/movie/u/p/same.mp4"), 2);
}
