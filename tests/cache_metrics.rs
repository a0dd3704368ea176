mod support;

use std::{collections::HashSet, sync::Arc, time::Duration};

use feedline::{application::source::FetchError, infra::telemetry};
use metrics_util::debugging::DebuggingRecorder;
use support::{ScriptedSource, posts_service, sample_feed};

#[tokio::test(start_paused = true)]
async fn post_cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    // miss + coalesced, then hit
    let source = Arc::new(
        ScriptedSource::always(Ok(sample_feed())).with_delay(Duration::from_millis(50)),
    );
    let posts = posts_service(Arc::clone(&source), Duration::from_secs(60));
    let (first, second) = tokio::join!(posts.list_all(), posts.list_all());
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert_eq!(posts.list_all().await.len(), 3);
    assert_eq!(source.calls(), 1);

    // fetch failure
    let failing = Arc::new(ScriptedSource::always(Err(FetchError::UpstreamHttp {
        status: 503,
    })));
    let degraded = posts_service(failing, Duration::from_secs(60));
    assert!(degraded.list_all().await.is_empty());

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "feedline_cache_hit_total",
        "feedline_cache_miss_total",
        "feedline_cache_coalesced_total",
        "feedline_feed_fetch_ms",
        "feedline_feed_fetch_error_total",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let error_kinds: Vec<String> = snapshot
        .iter()
        .filter(|(composite_key, _, _, _)| {
            composite_key.key().name() == "feedline_feed_fetch_error_total"
        })
        .flat_map(|(composite_key, _, _, _)| {
            composite_key
                .key()
                .labels()
                .filter(|label| label.key() == "kind")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(error_kinds, vec!["upstream_http"]);
}
