use super::*;
use hookscope_flood::{Inbound, TargetPolicy};
use hookscope_search::{Console, ConsoleEvent, ExecutionCounts, MemoryConsole, RecordStore};
use hookscope_types::{Record, RecordValue, SearchPattern};
use std::sync::Arc;
use std::time::Duration;

const START_MS: u64 = 1_760_000_000_000;

fn record(name: &str, value: &str, order: u64) -> Record {
    Record {
        name: name.to_string(),
        value: RecordValue::from(value),
        r#type: "string".to_string(),
        code_location: format!("at {name} (http://x/{name}.js:{order}:1)"),
        exec_order: order,
    }
}

fn options(console: &Arc<MemoryConsole>, address: &str, records: Vec<Record>) -> ContextOptions {
    ContextOptions::new(console.clone())
        .address(address)
        .store(RecordStore::from_records(records))
}

fn manual_mesh() -> (Mesh, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MS));
    (Mesh::new(TargetPolicy::Any, clock.clone()), clock)
}

async fn settle(mesh: &Mesh) {
    tokio::time::timeout(Duration::from_secs(5), mesh.settle())
        .await
        .expect("flood should settle");
}

#[tokio::test]
async fn originating_context_is_first_recipient() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let page = mesh.spawn_page(options(&console, "http://top.test/", vec![record("count", "5", 1)]));

    let id = page
        .search_by_message("5", None)
        .expect("local inbox is open");
    settle(&mesh).await;

    assert_eq!(id.get(), START_MS);
    assert_eq!(page.processed_queries(), 1);
    assert_eq!(console.group_labels(), vec!["http://top.test/\tresults: 1"]);
    mesh.shutdown().await;
}

#[tokio::test]
async fn omitted_field_searches_value() {
    let (mesh, clock) = manual_mesh();
    let implicit = Arc::new(MemoryConsole::new());
    let explicit = Arc::new(MemoryConsole::new());
    let records = vec![record("count", "5", 1), record("five", "6", 2)];
    let a = mesh.spawn_page(options(&implicit, "http://a.test/", records.clone()));
    let b = mesh.spawn_page(options(&explicit, "http://a.test/", records));

    a.search_by_message("5", None).expect("inbox open");
    clock.advance(1);
    b.search_by_message("5", Some("value")).expect("inbox open");
    settle(&mesh).await;

    assert_eq!(implicit.events(), explicit.events());
    assert!(!implicit.is_empty());
    mesh.shutdown().await;
}

#[tokio::test]
async fn name_search_uses_name_field() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let page = mesh.spawn_page(options(
        &console,
        "http://top.test/",
        vec![record("count", "5", 1), record("total", "5", 2)],
    ));

    page.search_by_name_message(SearchPattern::regex("^c"))
        .expect("inbox open");
    settle(&mesh).await;

    let table = console
        .events()
        .into_iter()
        .find_map(|event| match event {
            ConsoleEvent::Table { rows, .. } => Some(rows),
            _ => None,
        })
        .expect("matches are tabulated");
    assert_eq!(table.len(), 1);
    assert_eq!(table[0][0], "count");
    assert_eq!(table[0][3], "count ");
    mesh.shutdown().await;
}

#[tokio::test]
async fn flood_reaches_every_context_once() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let top = mesh.spawn_page(options(&console, "http://top.test/", vec![record("a", "hit", 1)]));
    let frame = mesh
        .spawn_frame(&top, options(&console, "http://frame.test/", vec![record("b", "hit", 1)]))
        .expect("top has a document");
    let nested = mesh
        .spawn_frame(&frame, options(&console, "http://nested.test/", vec![]))
        .expect("frame has a document");
    let worker = mesh.spawn_worker(&frame, options(&console, "http://frame.test/w.js", vec![]));
    let sub_worker = mesh.spawn_worker(
        &worker,
        options(&console, "http://frame.test/sub.js", vec![record("c", "hit", 1)]),
    );

    nested
        .search_by_message("hit", None)
        .expect("inbox open");
    settle(&mesh).await;

    for context in [&top, &frame, &nested, &worker, &sub_worker] {
        assert_eq!(context.processed_queries(), 1, "{}", context.id());
    }
    let mut labels = console.group_labels();
    labels.sort();
    assert_eq!(
        labels,
        vec![
            "http://frame.test/\tresults: 1",
            "http://frame.test/sub.js\tresults: 1",
            "http://top.test/\tresults: 1",
        ]
    );
    assert_eq!(mesh.pending(), 0);
    mesh.shutdown().await;
}

#[tokio::test]
async fn worker_origin_stays_within_its_workers() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let top = mesh.spawn_page(options(&console, "http://top.test/", vec![]));
    let frame = mesh
        .spawn_frame(&top, options(&console, "http://frame.test/", vec![]))
        .expect("top has a document");
    let worker = mesh.spawn_worker(&top, options(&console, "http://top.test/w.js", vec![]));
    let nested = mesh.spawn_worker(&worker, options(&console, "http://top.test/n.js", vec![]));

    worker.search_by_message("x", None).expect("inbox open");
    settle(&mesh).await;

    assert_eq!(worker.kind(), ContextKind::Worker);
    assert_eq!(worker.processed_queries(), 1);
    assert_eq!(nested.processed_queries(), 1);
    assert_eq!(top.processed_queries(), 0);
    assert_eq!(frame.processed_queries(), 0);
    mesh.shutdown().await;
}

#[tokio::test]
async fn same_millisecond_queries_collide() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let page = mesh.spawn_page(options(
        &console,
        "http://top.test/",
        vec![record("count", "5", 1), record("total", "9", 2)],
    ));

    let first = page.search_by_message("5", None).expect("inbox open");
    let second = page.search_by_message("9", None).expect("inbox open");
    settle(&mesh).await;

    assert_eq!(first, second);
    assert_eq!(page.processed_queries(), 1);
    let ConsoleEvent::Table { rows, .. } = &console.events()[2] else {
        panic!("expected the first query's table");
    };
    assert_eq!(rows[0][0], "count", "second query was dropped as a duplicate");
    mesh.shutdown().await;
}

#[tokio::test]
async fn closed_worker_does_not_stall_the_flood() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let top = mesh.spawn_page(options(&console, "http://top.test/", vec![]));
    let gone = mesh.spawn_worker(&top, options(&console, "http://top.test/gone.js", vec![]));
    let alive = mesh.spawn_worker(&top, options(&console, "http://top.test/alive.js", vec![]));
    gone.close();

    top.search_by_message("x", None).expect("inbox open");
    settle(&mesh).await;

    assert_eq!(gone.processed_queries(), 0);
    assert_eq!(alive.processed_queries(), 1);
    assert!(matches!(
        gone.search_by_message("x", None),
        Err(SendError::Closed(id)) if id == gone.id()
    ));
    mesh.shutdown().await;
}

#[tokio::test]
async fn foreign_payloads_are_ignored() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let page = mesh.spawn_page(options(&console, "http://top.test/", vec![record("a", "undefined", 1)]));

    page.post_local(Inbound::Raw(b"null".to_vec())).expect("inbox open");
    page.post_local(Inbound::Raw(br#"{"type":"webpackHotUpdate"}"#.to_vec()))
        .expect("inbox open");
    settle(&mesh).await;

    assert_eq!(page.processed_queries(), 0);
    assert!(console.is_empty());
    mesh.shutdown().await;
}

#[tokio::test]
async fn unknown_thread_label_without_address() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let worker = mesh.spawn_detached_worker(
        ContextOptions::new(console.clone())
            .store(RecordStore::from_records(vec![record("a", "1", 1)]))
            .counts(ExecutionCounts::new()),
    );

    worker.search_by_message("1", None).expect("inbox open");
    settle(&mesh).await;

    assert_eq!(console.group_labels(), vec!["unknown thread\tresults: 1"]);
    mesh.shutdown().await;
}

#[tokio::test]
async fn records_appended_after_start_are_searched() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let page = mesh.spawn_page(options(&console, "http://top.test/", vec![]));
    page.store().push(record("late", "7", 3));
    page.counts().increment("at late (http://x/late.js:3:1)");

    page.search_by_message("7", None).expect("inbox open");
    settle(&mesh).await;

    let ConsoleEvent::Table { rows, .. } = &console.events()[2] else {
        panic!("expected a table");
    };
    assert_eq!(rows[0], vec!["late", "7", "string", "late ", "1", "3"]);
    mesh.shutdown().await;
}

#[tokio::test]
async fn topology_builds_frames_and_workers() {
    let json = r#"{
        "contexts": [
            {"name": "top", "kind": "page", "address": "http://top.test/",
             "records": [{"name": "a", "value": {"text": "hit"}, "type": "string",
                          "code_location": "at a (http://top.test/a.js:1:1)", "exec_order": 1}],
             "execution_counts": [{"code_location": "at a (http://top.test/a.js:1:1)", "count": 4}]},
            {"name": "frame", "kind": "page", "address": "http://frame.test/", "embedded_in": "top"},
            {"name": "worker", "kind": "worker", "spawned_by": "frame"}
        ]
    }"#;
    let topology = Topology::from_json(json).expect("topology decodes");
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let contexts = mesh
        .build(&topology, |_| console.clone() as Arc<dyn Console>)
        .expect("topology is well-formed");

    contexts["worker"]
        .search_by_message("hit", None)
        .expect("inbox open");
    settle(&mesh).await;
    assert_eq!(contexts["worker"].processed_queries(), 1);
    assert_eq!(contexts["top"].processed_queries(), 0);

    // Same clock reading, so the same uid: only the worker has seen it.
    contexts["frame"]
        .search_by_message("hit", None)
        .expect("inbox open");
    settle(&mesh).await;
    assert_eq!(contexts["frame"].processed_queries(), 1);
    assert_eq!(contexts["top"].processed_queries(), 1);
    assert_eq!(contexts["worker"].processed_queries(), 1);

    let ConsoleEvent::Table { rows, .. } = &console.events()[2] else {
        panic!("expected the top page's table");
    };
    assert_eq!(rows[0], vec!["a", "hit", "string", "a ", "4", "1"]);
    mesh.shutdown().await;
}

#[tokio::test]
async fn topology_rejects_bad_wiring() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let entry = |name: &str, kind: ContextKind| ContextEntry {
        name: name.to_string(),
        kind,
        address: None,
        embedded_in: None,
        spawned_by: None,
        records: Vec::new(),
        execution_counts: Vec::new(),
    };

    let mut orphan = entry("frame", ContextKind::Page);
    orphan.embedded_in = Some("missing".to_string());
    let err = mesh
        .build(&Topology { contexts: vec![orphan] }, |_| console.clone() as Arc<dyn Console>)
        .expect_err("unknown parent");
    assert_eq!(err, TopologyError::UnknownContext("missing".to_string()));

    let mut frame_in_worker = entry("frame", ContextKind::Page);
    frame_in_worker.embedded_in = Some("w".to_string());
    let err = mesh
        .build(
            &Topology {
                contexts: vec![entry("w", ContextKind::Worker), frame_in_worker],
            },
            |_| console.clone() as Arc<dyn Console>,
        )
        .expect_err("workers have no document");
    assert!(matches!(err, TopologyError::NoDocument(_)));

    let err = mesh
        .build(
            &Topology {
                contexts: vec![entry("x", ContextKind::Page), entry("x", ContextKind::Page)],
            },
            |_| console.clone() as Arc<dyn Console>,
        )
        .expect_err("duplicate names");
    assert_eq!(err, TopologyError::DuplicateName("x".to_string()));

    let mut both = entry("y", ContextKind::Page);
    both.embedded_in = Some("top".to_string());
    both.spawned_by = Some("top".to_string());
    let err = mesh
        .build(
            &Topology {
                contexts: vec![entry("top", ContextKind::Page), both],
            },
            |_| console.clone() as Arc<dyn Console>,
        )
        .expect_err("frame and worker at once");
    assert_eq!(err, TopologyError::ConflictingParents("y".to_string()));

    let mut spawned_page = entry("p", ContextKind::Page);
    spawned_page.spawned_by = Some("top".to_string());
    let err = mesh
        .build(
            &Topology {
                contexts: vec![entry("top", ContextKind::Page), spawned_page],
            },
            |_| console.clone() as Arc<dyn Console>,
        )
        .expect_err("pages are not spawned");
    assert_eq!(
        err,
        TopologyError::KindMismatch {
            name: "p".to_string(),
            expected: ContextKind::Worker,
        }
    );

    let mut embedded_worker = entry("w", ContextKind::Worker);
    embedded_worker.embedded_in = Some("top".to_string());
    let err = mesh
        .build(
            &Topology {
                contexts: vec![entry("top", ContextKind::Page), embedded_worker],
            },
            |_| console.clone() as Arc<dyn Console>,
        )
        .expect_err("workers are not embedded");
    assert_eq!(
        err,
        TopologyError::KindMismatch {
            name: "w".to_string(),
            expected: ContextKind::Page,
        }
    );
    mesh.shutdown().await;
}

#[tokio::test]
async fn handle_debug_names_the_context() {
    let (mesh, _clock) = manual_mesh();
    let console = Arc::new(MemoryConsole::new());
    let page = mesh.spawn_page(options(&console, "http://top.test/", vec![]));

    let rendered = format!("{page:?}");

    assert!(rendered.starts_with("ContextHandle"), "{rendered}");
    assert!(rendered.contains(&format!("{:?}", page.id())), "{rendered}");
    assert!(rendered.contains("Page"), "{rendered}");
    assert!(rendered.contains("http://top.test/"), "{rendered}");
    mesh.shutdown().await;
}
