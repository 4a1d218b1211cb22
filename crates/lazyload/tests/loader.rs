use lazyload::testing::{Behavior, FakeDocument, FakeFetcher, Trace};
use lazyload::{
    Attempts, CompileError, ElementEvent, Ledger, LoadError, Loader, LoaderBuilder, LoaderConfig,
    Outcome, RetryConfig, TransportCause,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

fn builder(doc: &Arc<FakeDocument>) -> LoaderBuilder {
    Loader::builder(doc.clone()).ledger(Arc::new(Ledger::new()))
}

fn uppercase_compiler() -> Arc<dyn lazyload::LessCompiler> {
    Arc::new(|src: &str| -> Result<String, CompileError> { Ok(src.to_uppercase()) })
}

#[tokio::test(start_paused = true)]
async fn test_batch_callback_fires_once_after_all_entries() {
    let doc = FakeDocument::new();
    doc.script("a.js", Behavior::after(Duration::from_millis(200), ElementEvent::Load));
    doc.probe("b.css", Behavior::after(Duration::from_millis(50), ElementEvent::Error));
    let loader = builder(&doc).build();

    let calls = Arc::new(AtomicU32::new(0));
    let (tx, rx) = oneshot::channel();
    let c = calls.clone();
    loader.load(vec!["a.js", "b.css"], move |report| {
        c.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(report);
    });

    let report = rx.await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(report.all_satisfied());
    assert_eq!(report.entries[0].request, "a.js");
    assert_eq!(report.entries[1].request, "b.css");
    assert_eq!(report.elapsed_ms, 200);
}

#[tokio::test(start_paused = true)]
async fn test_same_path_loaded_once() {
    let doc = FakeDocument::new();
    let loader = builder(&doc).build();

    let first = loader.load_all(["lib.js", "lib.js?v=2"]).await;
    let second = loader.load_all("lib.js#again").await;

    assert_eq!(doc.appended_sources(), vec!["lib.js"]);
    let skipped = first
        .entries
        .iter()
        .filter(|e| e.outcome == Outcome::AlreadyRequested { path: "lib.js".into() })
        .count();
    assert_eq!(skipped, 1);
    assert!(first.all_satisfied());
    assert_eq!(
        second.entries[0].outcome,
        Outcome::AlreadyRequested { path: "lib.js".into() }
    );
}

#[tokio::test(start_paused = true)]
async fn test_dependents_wait_for_shared_dependency() {
    let doc = FakeDocument::new();
    doc.script("jq.js", Behavior::after(Duration::from_millis(500), ElementEvent::Load));
    let loader = builder(&doc).build();

    let report = loader.load_all(["a.js < jq.js", "b.js < jq.js"]).await;

    assert!(report.all_satisfied());
    assert_eq!(doc.appended_sources().iter().filter(|s| *s == "jq.js").count(), 1);
    let jq_done = doc
        .position(&Trace::Fired("jq.js".into(), ElementEvent::Load))
        .unwrap();
    for dependent in ["a.js", "b.js"] {
        let start = doc.position(&Trace::Appended(dependent.into())).unwrap();
        assert!(jq_done < start, "{dependent} injected before jq.js loaded");
    }
    assert_eq!(report.elapsed_ms, 500);
}

#[tokio::test(start_paused = true)]
async fn test_dependent_skipped_when_shared_dependency_fails() {
    let doc = FakeDocument::new();
    doc.script("dep.js", Behavior::after(Duration::from_millis(100), ElementEvent::Error));
    let loader = builder(&doc).build();

    let report = loader.load_all(["dep.js", "app.js < dep.js"]).await;

    assert!(report.entries[0].outcome.is_dropped());
    assert_eq!(
        report.entries[1].outcome,
        Outcome::Dropped {
            errors: vec![LoadError::Transport {
                path: "dep.js".into(),
                cause: TransportCause::EarlierAttemptFailed
            }]
        }
    );
    assert_eq!(doc.appended_sources(), vec!["dep.js"]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_fallback_does_not_block_batch() {
    let doc = FakeDocument::new();
    for src in ["x.js", "y.js", "z.js"] {
        doc.script(src, Behavior::after(Duration::from_millis(10), ElementEvent::Error));
    }
    let loader = builder(&doc).build();

    let (tx, rx) = oneshot::channel();
    loader.load(["x.js|y.js|z.js", "ok.js"], move |report| {
        let _ = tx.send(report);
    });
    let report = rx.await.unwrap();

    assert!(!report.all_satisfied());
    assert_eq!(report.dropped().count(), 1);
    match &report.entries[0].outcome {
        Outcome::Dropped { errors } => assert_eq!(errors.len(), 3),
        other => panic!("expected drop, got {other:?}"),
    }
    assert_eq!(report.entries[1].outcome, Outcome::Loaded { address: "ok.js".into() });
}

#[tokio::test(start_paused = true)]
async fn test_silent_fallback_exhausts_by_poll() {
    let doc = FakeDocument::new();
    doc.script("cdn/a.js", Behavior::Silent);
    let config = LoaderConfig {
        script_retry: RetryConfig {
            times: Attempts::Limited(2),
            delay_ms: 50,
            delay_more_ms: 0,
            budget_ms: None,
        },
        ..LoaderConfig::default()
    };
    let loader = builder(&doc).config(config).build();

    let report = loader.load_all("cdn/a.js|local/a.js").await;

    assert_eq!(
        report.entries[0].outcome,
        Outcome::Loaded { address: "local/a.js".into() }
    );
    assert_eq!(report.elapsed_ms, 100);
}

#[tokio::test(start_paused = true)]
async fn test_chain_and_plain_entries_together() {
    let doc = FakeDocument::new();
    doc.script("base.js", Behavior::after(Duration::from_millis(100), ElementEvent::Load));
    let loader = builder(&doc).build();

    let report = loader.load_all(["app.js < base.js", "solo.js"]).await;

    assert!(report.all_satisfied());
    assert_eq!(report.entries[0].links.len(), 2);
    assert_eq!(report.entries[0].links[0].link, "base.js");
    let base_done = doc
        .position(&Trace::Fired("base.js".into(), ElementEvent::Load))
        .unwrap();
    let app_start = doc.position(&Trace::Appended("app.js".into())).unwrap();
    let solo_start = doc.position(&Trace::Appended("solo.js".into())).unwrap();
    assert!(base_done < app_start);
    assert!(solo_start < base_done);
}

#[tokio::test(start_paused = true)]
async fn test_less_never_injects_link() {
    let doc = FakeDocument::new();
    let fetcher = FakeFetcher::new();
    fetcher.serve("theme.less", "a{}", Duration::from_millis(5));
    let loader = builder(&doc)
        .fetcher(fetcher.clone())
        .less_compiler(uppercase_compiler())
        .build();

    let report = loader.load_all("theme.less").await;

    assert!(report.all_satisfied());
    assert_eq!(fetcher.requests(), vec!["theme.less"]);
    assert_eq!(doc.style_text("lazyload-style").as_deref(), Some("A{}"));
    assert!(doc.appended_sources().is_empty());
    assert!(doc.probed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_less_appends_in_completion_order() {
    let doc = FakeDocument::new();
    let fetcher = FakeFetcher::new();
    fetcher.serve("slow.less", "slow;", Duration::from_millis(80));
    fetcher.serve("fast.less", "fast;", Duration::from_millis(10));
    let loader = builder(&doc)
        .fetcher(fetcher.clone())
        .less_compiler(uppercase_compiler())
        .build();

    loader.load_all(["slow.less", "fast.less"]).await;

    assert_eq!(doc.style_text("lazyload-style").as_deref(), Some("FAST;SLOW;"));
    let containers = doc
        .appended()
        .into_iter()
        .filter(|el| matches!(el, lazyload::Element::Style { .. }))
        .count();
    assert_eq!(containers, 1);
}

#[tokio::test(start_paused = true)]
async fn test_less_without_compiler_still_completes() {
    let doc = FakeDocument::new();
    let loader = builder(&doc).build();

    let report = loader.load_all(["theme.less", "app.js"]).await;

    assert_eq!(
        report.entries[0].outcome,
        Outcome::Dropped {
            errors: vec![LoadError::MissingCompiler("theme.less".into())]
        }
    );
    assert!(report.entries[1].outcome.is_satisfied());
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch_completes_immediately() {
    let doc = FakeDocument::new();
    let loader = builder(&doc).build();

    let (tx, rx) = oneshot::channel();
    loader.load(Vec::<String>::new(), move |report| {
        let _ = tx.send(report);
    });
    let report = rx.await.unwrap();
    assert!(report.entries.is_empty());
    assert_eq!(report.elapsed_ms, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_settles_unbounded_polls() {
    let doc = FakeDocument::new();
    doc.script("hang.js", Behavior::Silent);
    let config = LoaderConfig {
        script_retry: RetryConfig {
            times: Attempts::Unlimited,
            delay_ms: 1000,
            delay_more_ms: 0,
            budget_ms: None,
        },
        ..LoaderConfig::default()
    };
    let loader = builder(&doc).config(config).build();

    let (tx, rx) = oneshot::channel();
    loader.load("hang.js|never-tried.js", move |report| {
        let _ = tx.send(report);
    });

    tokio::time::sleep(Duration::from_secs(60)).await;
    loader.cancel();
    let report = rx.await.unwrap();

    assert_eq!(
        report.entries[0].outcome,
        Outcome::Dropped {
            errors: vec![LoadError::Transport {
                path: "hang.js".into(),
                cause: TransportCause::Cancelled
            }]
        }
    );
    assert_eq!(doc.appended_sources(), vec!["hang.js"]);
}

#[tokio::test(start_paused = true)]
async fn test_observer_reports_every_leaf() {
    let doc = FakeDocument::new();
    doc.script("broken.js", Behavior::immediate(ElementEvent::Error));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let loader = builder(&doc)
        .on_asset(move |spec, outcome| {
            s.lock()
                .unwrap()
                .push((spec.to_string(), outcome.is_satisfied()));
        })
        .build();

    loader.load_all(["main.js < dep.css", "broken.js"]).await;

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("broken.js".to_string(), false),
            ("dep.css".to_string(), true),
            ("main.js".to_string(), true),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_default_loader_uses_global_ledger() {
    let doc = FakeDocument::new();
    let first = Loader::builder(doc.clone()).build();
    let second = Loader::builder(doc.clone()).build();
    assert!(Arc::ptr_eq(first.ledger(), &Ledger::global()));

    first.load_all("global-ledger-7f3a.js").await;
    let report = second.load_all("global-ledger-7f3a.js").await;

    assert_eq!(
        report.entries[0].outcome,
        Outcome::AlreadyRequested {
            path: "global-ledger-7f3a.js".into()
        }
    );
}
