//! End-to-end owner lifecycle scenarios against the in-memory store.

use kvattr_codec::Value;
use kvattr_core::{AttributeHost, CoreError, Touch};
use kvattr_store::{Command, StoreError};
use kvattr_testkit::prelude::*;
use serde_json::json;

#[test]
fn default_is_written_on_create() {
    init_test_logging();
    let test = TestStore::new();
    let mut post = Post::build(1, &test.registry);
    post.on_create().unwrap();

    assert_eq!(test.store.peek("posts:1:content").as_deref(), Some(""));
    assert_eq!(test.store.peek("posts:1:published").as_deref(), Some("f"));
    assert!(!test.store.contains("posts:1:count"));
    assert!(!test.store.contains("posts:1:rankings"));
}

#[test]
fn same_value_twice_is_one_entry() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    test.store.clear_commands();

    post.write("count", 5);
    post.write("count", 5);
    post.on_commit().unwrap();

    assert_eq!(
        test.store.writes(),
        vec![Command::MultiSet {
            pairs: vec![("posts:1:count".to_string(), "5".to_string())]
        }]
    );
}

#[test]
fn invalid_json_reads_back_as_default() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);

    post.write("payload", "not-an-array");
    assert_eq!(post.read("payload"), Value::Null);

    post.on_commit().unwrap();
    let mut reloaded = Post::find(1, &test.registry);
    assert_eq!(reloaded.read("payload"), Value::Null);
    assert!(!test.store.contains("posts:1:payload"));
}

#[test]
fn json_containers_round_trip() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    post.write("payload", json!({"tags": ["a", "b"], "n": 1}));
    post.on_commit().unwrap();

    let mut reloaded = Post::find(1, &test.registry);
    assert_eq!(
        reloaded.read("payload"),
        Value::Json(json!({"tags": ["a", "b"], "n": 1}))
    );
}

#[test]
fn persist_is_one_batch_for_many_attributes() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    test.store.clear_commands();
    let opened = test.store.connections_opened();

    post.write("content", "body");
    post.write("count", 7);
    post.write("published", true);
    post.write("payload", json!([1, 2]));
    post.on_commit().unwrap();

    let writes = test.store.writes();
    assert_eq!(writes.len(), 1);
    let Command::MultiSet { pairs } = &writes[0] else {
        panic!("expected one multi_set, got {writes:?}");
    };
    assert_eq!(pairs.len(), 4);
    assert!(pairs.contains(&("posts:1:published".to_string(), "t".to_string())));
    assert_eq!(test.store.connections_opened(), opened);
}

#[test]
fn clean_attributes_are_not_written() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    test.store.clear_commands();

    post.write("content", "");
    assert!(post.on_commit().unwrap().is_empty());
    assert!(test.store.commands().is_empty());
}

#[test]
fn failed_persist_stays_dirty() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    post.write("count", 3);

    test.store.set_unavailable(true);
    let err = post.on_commit().unwrap_err();
    assert!(matches!(err, CoreError::Store(StoreError::Unavailable { .. })));
    assert_eq!(post.attrs.changed_names(), vec!["count"]);
    assert!(post.touched.is_empty());

    test.store.set_unavailable(false);
    assert_eq!(post.on_commit().unwrap(), vec!["count"]);
    assert_eq!(test.store.peek("posts:1:count").as_deref(), Some("3"));
}

#[test]
fn reload_discards_edits() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    post.write("content", "unsaved");

    post.on_reload().unwrap();
    assert_eq!(post.read("content"), Value::from(""));
    assert!(post.attrs.changed_names().is_empty());
}

#[test]
fn reload_sees_writes_from_other_instances() {
    let test = TestStore::new();
    let mut first = Post::create(1, &test.registry);
    let mut second = Post::find(1, &test.registry);
    assert_eq!(second.read("count"), Value::Null);

    first.write("count", 10);
    first.on_commit().unwrap();
    assert_eq!(second.read("count"), Value::Null);

    second.on_reload().unwrap();
    assert_eq!(second.read("count"), Value::Integer(10));
}

#[test]
fn destroy_clears_every_key() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    post.write("count", 4);
    post.write("payload", json!([1]));
    post.on_commit().unwrap();
    post.sorted_set("rankings")
        .unwrap()
        .rebuild_with(["x", "y"])
        .unwrap();

    post.on_destroy().unwrap();
    for name in ["content", "count", "published", "payload"] {
        assert!(!test.store.contains(&post.key(name)), "{name} survived destroy");
    }
    assert_eq!(post.sorted_set("rankings").unwrap().count().unwrap(), 0);
}

#[test]
fn rebuild_with_ranks_by_position() {
    let test = TestStore::new();
    let post = Post::create(1, &test.registry);
    let rankings = post.sorted_set("rankings").unwrap();

    rankings.rebuild_with(["a", "b", "c", "d"]).unwrap();
    for (score, member) in ["a", "b", "c", "d"].into_iter().enumerate() {
        assert_eq!(rankings.score(member).unwrap(), Some(score as i64));
    }
    assert_eq!(rankings.count().unwrap(), 4);
}

#[test]
fn commit_runs_touch_hooks() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    post.write("content", "x");
    post.write("payload", json!({}));
    post.write("count", 1);
    post.on_commit().unwrap();

    assert_eq!(
        post.touched,
        vec![Touch::Timestamps, Touch::Columns(vec!["payload_at".to_string()])]
    );
}

#[test]
fn update_attributes_writes_immediately() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    let written = post
        .update_attributes(vec![
            ("count".to_string(), Value::Integer(2)),
            ("unknown".to_string(), Value::from("skip")),
        ])
        .unwrap();

    assert_eq!(written, vec!["count"]);
    assert_eq!(test.store.peek("posts:1:count").as_deref(), Some("2"));
    assert!(post.attrs.changed_names().is_empty());
}

#[test]
fn update_attributes_keeps_other_edits_for_commit() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    post.write("content", "draft");

    let written = post
        .update_attributes(vec![("count".to_string(), Value::Integer(2))])
        .unwrap();
    assert_eq!(written, vec!["count"]);
    assert_eq!(test.store.peek("posts:1:content").as_deref(), Some(""));
    assert!(post.touched.is_empty());

    assert_eq!(post.on_commit().unwrap(), vec!["content"]);
    assert_eq!(test.store.peek("posts:1:content").as_deref(), Some("draft"));
    assert_eq!(post.touched, vec![Touch::Timestamps]);
}

#[test]
fn failed_reload_keeps_unsaved_edits() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    post.write("content", "unsaved");

    test.store.set_unavailable(true);
    assert!(matches!(
        post.on_reload(),
        Err(CoreError::Store(StoreError::Unavailable { .. }))
    ));
    test.store.set_unavailable(false);
    assert_eq!(post.read("content"), Value::from("unsaved"));
    assert_eq!(post.attrs.changed_names(), vec!["content"]);
}

#[test]
fn failed_destroy_leaves_keys_in_place() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);

    test.store.set_unavailable(true);
    assert!(matches!(
        post.on_destroy(),
        Err(CoreError::Store(StoreError::Unavailable { .. }))
    ));
    assert_eq!(test.store.peek("posts:1:content").as_deref(), Some(""));
}

#[test]
fn sorted_set_attributes_cannot_be_assigned() {
    let test = TestStore::new();
    let mut post = Post::create(1, &test.registry);
    assert!(matches!(
        post.write_attribute("rankings", Value::Integer(1)),
        Err(CoreError::NotScalar { .. })
    ));
}

#[test]
fn custom_identity_and_pool() {
    let test = TestStore::with_pools(&["main", "stats"], "main");
    let mut counter = Counter::build(5, &test.registry);
    counter.on_create().unwrap();

    let key = format!("metrics/counters:{}:hits", counter.uuid);
    assert_eq!(test.store.peek(&key).as_deref(), Some("0"));

    let leaders = counter.sorted_set("leaders").unwrap();
    assert_eq!(leaders.increment("ann").unwrap(), 1);
    assert_eq!(leaders.all().unwrap(), vec!["ann"]);
}
