//! End-to-end tests for the resolution engine
//!
//! These tests verify:
//! - Fallback substitution for missing, undefined and invalid values
//! - Breaker semantics (nothing runs after the first failure)
//! - Nested and array-of-nested delegation through `Deserializable`
//! - Copy-on-write resolver lists

use fieldmap::{
    resolve, steps, Deserializable, Deserializer, DeserializerConfig, ReportSink, Severity,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cell::Cell;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// Fixtures
// =============================================================================

thread_local! {
    /// Per-test-thread id counter, bumped once per `User` deserialization
    static UID: Cell<i64> = const { Cell::new(0) };
}

fn next_uid() -> i64 {
    UID.with(|uid| {
        uid.set(uid.get() + 1);
        uid.get()
    })
}

fn current_uid() -> i64 {
    UID.with(Cell::get)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct User {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<String>,
    id: i64,
}

impl Deserializable for User {
    fn deserialize(self, source: &Value) -> fieldmap::Result<Self> {
        let deserializer = Deserializer::new(
            DeserializerConfig::new(vec![
                resolve("name").fallback(""),
                resolve("info").fallback_undefined(),
                resolve("id")
                    .tap(|_| {
                        next_uid();
                    })
                    .fallback_with(|| json!(current_uid())),
            ])
            .with_severity(Severity::None),
        )?;
        deserializer.deserialize_into(source, self)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Group {
    title: String,
    #[serde(rename = "primaryUser", skip_serializing_if = "Option::is_none")]
    primary_user: Option<User>,
    users: Vec<User>,
}

impl Deserializable for Group {
    fn deserialize(self, source: &Value) -> fieldmap::Result<Self> {
        let deserializer = Deserializer::new(
            DeserializerConfig::new(vec![
                resolve("title")
                    .map(|t| t.and_then(|t| t.as_str().map(|s| json!(format!("{}!", s)))))
                    .fallback("Test"),
                resolve("primaryUser")
                    .deserialize_to::<User>()
                    .fallback_undefined(),
                resolve("users")
                    .deserialize_to_array_of::<User>()
                    .fallback(json!([])),
            ])
            .with_severity(Severity::None),
        )?;
        deserializer.deserialize_into(source, self)
    }
}

/// Captures diagnostics instead of logging them
#[derive(Default)]
struct Recorder {
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl ReportSink for Recorder {
    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

impl Recorder {
    fn warning_count(&self) -> usize {
        self.warnings.lock().unwrap().len()
    }
}

fn basic_chain(sink: Arc<Recorder>) -> Deserializer {
    Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("a.b")
                .to("val")
                .step(steps::parse_int())
                .validate_number()
                .fallback(0),
        ])
        .with_sink(sink),
    )
    .unwrap()
}

// =============================================================================
// Fallbacks
// =============================================================================

#[test]
fn test_missing_field_takes_fallback() {
    let deserializer =
        Deserializer::new(DeserializerConfig::new(vec![resolve("name").fallback("")])).unwrap();
    let mut target = json!({});
    deserializer.deserialize(&json!({}), &mut target).unwrap();
    assert_eq!(target["name"], json!(""));
}

#[test]
fn test_user_fallbacks() {
    let t1 = User::default().deserialize(&json!({"name": "Bob", "id": 10})).unwrap();
    let t2 = User::default().deserialize(&json!({})).unwrap();

    assert_eq!(t1.name, "Bob");
    assert_eq!(t1.id, 10);
    assert_eq!(t2.name, "");
    assert_eq!(t2.id, 2);
    assert!(t2.info.is_none());
}

#[test]
fn test_counter_fallback_strictly_increases() {
    let counter = Arc::new(AtomicI64::new(0));
    let c = Arc::clone(&counter);
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("id").fallback_with(move || json!(c.fetch_add(1, Ordering::SeqCst) + 1)),
        ])
        .with_severity(Severity::None),
    )
    .unwrap();

    let ids: Vec<i64> = (0..3)
        .map(|_| {
            let mut target = json!({});
            deserializer.deserialize(&json!({}), &mut target).unwrap();
            target["id"].as_i64().unwrap()
        })
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_null_source_value_is_not_missing() {
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![resolve("info").fallback("fb")]).with_severity(Severity::None),
    )
    .unwrap();
    let mut target = json!({});
    deserializer.deserialize(&json!({"info": null}), &mut target).unwrap();
    assert_eq!(target["info"], Value::Null);
}

#[test]
fn test_falsy_intermediate_is_passed_through() {
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![resolve("a.b").to("out").fallback("fb")])
            .with_severity(Severity::None),
    )
    .unwrap();
    let mut target = json!({});
    deserializer.deserialize(&json!({"a": 0}), &mut target).unwrap();
    assert_eq!(target["out"], json!(0));
}

// =============================================================================
// Chains
// =============================================================================

#[test]
fn test_chain_resolves_without_diagnostics() {
    let sink = Arc::new(Recorder::default());
    let deserializer = basic_chain(sink.clone());

    let mut target = json!({});
    deserializer.deserialize(&json!({"a": {"b": "42"}}), &mut target).unwrap();
    assert_eq!(target["val"], json!(42));
    assert_eq!(sink.warning_count(), 0);
}

#[test]
fn test_chain_falls_back_with_one_diagnostic() {
    let sink = Arc::new(Recorder::default());
    let deserializer = basic_chain(sink.clone());

    let mut target = json!({});
    deserializer.deserialize(&json!({}), &mut target).unwrap();
    assert_eq!(target["val"], json!(0));
    assert_eq!(sink.warning_count(), 1);
    assert!(sink.warnings.lock().unwrap()[0].contains("a.b was undefined"));
}

#[test]
fn test_operator_returning_none_uses_fallback() {
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("a").map(|_| None).map(|_| Some(json!("never"))).fallback("fb"),
        ])
        .with_severity(Severity::None),
    )
    .unwrap();
    let mut target = json!({});
    deserializer.deserialize(&json!({"a": 1}), &mut target).unwrap();
    assert_eq!(target["a"], json!("fb"));
}

#[test]
fn test_failed_validator_skips_later_tap() {
    let taps = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&taps);
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("prop")
                .validate(|_| false)
                .tap(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                })
                .fallback(""),
        ])
        .with_severity(Severity::None),
    )
    .unwrap();

    let mut target = json!({});
    deserializer.deserialize(&json!({"prop": "value"}), &mut target).unwrap();
    assert_eq!(target["prop"], json!(""));
    assert_eq!(taps.load(Ordering::SeqCst), 0);
}

#[test]
fn test_raising_validator_counts_as_invalid() {
    let sink = Arc::new(Recorder::default());
    let taps = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&taps);
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("a")
                .try_validate(|_| Err(anyhow::anyhow!("boom")))
                .tap(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                })
                .fallback(7),
        ])
        .with_sink(sink.clone()),
    )
    .unwrap();

    let mut target = json!({});
    deserializer.deserialize(&json!({"a": 1}), &mut target).unwrap();
    assert_eq!(target, json!({"a": 7}));
    assert_eq!(taps.load(Ordering::SeqCst), 0);

    let warnings = sink.warnings.lock().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("did not pass validation (try_validate)"));
    assert!(warnings[0].contains("boom"));
}

#[test]
fn test_raising_operator_counts_as_unresolved() {
    let sink = Arc::new(Recorder::default());
    let taps = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&taps);
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("a")
                .try_map(|_| Err(anyhow::anyhow!("bad input")))
                .tap(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                })
                .fallback(7),
        ])
        .with_sink(sink.clone()),
    )
    .unwrap();

    let mut target = json!({});
    deserializer.deserialize(&json!({"a": 1}), &mut target).unwrap();
    assert_eq!(target, json!({"a": 7}));
    assert_eq!(taps.load(Ordering::SeqCst), 0);

    let warnings = sink.warnings.lock().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("a was 1 but failed deserialization"));
    assert!(warnings[0].contains("bad input"));
}

#[test]
fn test_producer_may_leave_field_undefined() {
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("a").validate_number().fallback_optional_with(|| None),
            resolve("b").validate_number().fallback_optional_with(|| Some(json!(-1))),
        ])
        .with_severity(Severity::None),
    )
    .unwrap();

    let mut target = json!({"a": "stale"});
    deserializer.deserialize(&json!({"a": "x", "b": "y"}), &mut target).unwrap();
    assert_eq!(target, json!({"b": -1}));
}

#[test]
fn test_builtin_validators() {
    let sink = Arc::new(Recorder::default());
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("s").validate_string().fallback("fb"),
            resolve("n").validate_number().fallback(-1),
            resolve("b").validate_boolean().fallback(false),
            resolve("l").validate_array().fallback(json!([])),
        ])
        .with_sink(sink.clone()),
    )
    .unwrap();

    let mut good = json!({});
    deserializer
        .deserialize(&json!({"s": "x", "n": 3, "b": true, "l": [1]}), &mut good)
        .unwrap();
    assert_eq!(good, json!({"s": "x", "n": 3, "b": true, "l": [1]}));
    assert_eq!(sink.warning_count(), 0);

    let mut bad = json!({});
    deserializer
        .deserialize(&json!({"s": 1, "n": "3", "b": "true", "l": {}}), &mut bad)
        .unwrap();
    assert_eq!(bad, json!({"s": "fb", "n": -1, "b": false, "l": []}));
    assert_eq!(sink.warning_count(), 4);
}

#[test]
fn test_renamed_and_nested_source_paths() {
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("optionA").to("option1").fallback(""),
            resolve("optionB").to("option2").fallback(""),
            resolve("extras.optionC").to("option3").fallback(""),
        ])
        .with_severity(Severity::None),
    )
    .unwrap();

    let mut target = json!({});
    deserializer
        .deserialize(
            &json!({"optionA": "A", "optionB": "B", "extras": {"optionC": "C"}}),
            &mut target,
        )
        .unwrap();
    assert_eq!(target, json!({"option1": "A", "option2": "B", "option3": "C"}));
}

// =============================================================================
// Nested delegation
// =============================================================================

#[test]
fn test_group_maps_nested_users() {
    let group = Group::default()
        .deserialize(&json!({
            "title": "My Users",
            "primaryUser": {},
            "users": [{}, {}]
        }))
        .unwrap();

    assert_eq!(group.title, "My Users!");
    let primary = group.primary_user.expect("primary user");
    assert_eq!(primary.name, "");
    assert_eq!(primary.id, 1);
    assert_eq!(group.users.len(), 2);
    assert_eq!(group.users[0].id, 2);
    assert_eq!(group.users[1].id, 3);
    assert!(group.users.iter().all(|u| u.name.is_empty()));
}

#[test]
fn test_array_delegation_rejects_non_array() {
    let group = Group::default()
        .deserialize(&json!({"title": "T", "users": "nope"}))
        .unwrap();
    assert!(group.users.is_empty());
    assert!(group.primary_user.is_some());
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Strict {
    code: i64,
}

impl Deserializable for Strict {
    fn deserialize(self, source: &Value) -> fieldmap::Result<Self> {
        Deserializer::new(
            DeserializerConfig::new(vec![resolve("code").validate_number().fallback(0)])
                .with_severity(Severity::Throw),
        )?
        .deserialize_into(source, self)
    }
}

#[test]
fn test_nested_throw_becomes_outer_fallback() {
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![
            resolve("inner").deserialize_to::<Strict>().fallback(Value::Null),
        ])
        .with_severity(Severity::None),
    )
    .unwrap();

    let mut ok = json!({});
    deserializer.deserialize(&json!({"inner": {"code": 7}}), &mut ok).unwrap();
    assert_eq!(ok, json!({"inner": {"code": 7}}));

    let mut failed = json!({});
    deserializer
        .deserialize(&json!({"inner": {"code": "7"}}), &mut failed)
        .unwrap();
    assert_eq!(failed, json!({"inner": null}));
}

// =============================================================================
// Engine behaviour
// =============================================================================

#[test]
fn test_target_fields_without_resolvers_are_kept() {
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![resolve("name").fallback("")]).with_severity(Severity::None),
    )
    .unwrap();
    let mut target = json!({"name": "old", "other": 5});
    deserializer.deserialize(&json!({"name": "new"}), &mut target).unwrap();
    assert_eq!(target, json!({"name": "new", "other": 5}));
}

#[test]
fn test_assignment_into_scalar_is_an_error() {
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![resolve("x").to("meta.x").fallback(0)])
            .with_severity(Severity::None),
    )
    .unwrap();
    let mut target = json!({"meta": 3});
    let err = deserializer.deserialize(&json!({"x": 1}), &mut target).unwrap_err();
    assert!(matches!(err, fieldmap::DeserializeError::Assignment { .. }));
}

#[test]
fn test_earlier_snapshot_keeps_resolving_after_replacement() {
    let mut deserializer = Deserializer::new(
        DeserializerConfig::new(vec![resolve("a").fallback(0)]).with_severity(Severity::None),
    )
    .unwrap();
    let snapshot = deserializer.resolvers();
    deserializer.set_resolvers(vec![resolve("b").fallback(0)]).unwrap();

    let previous = Deserializer::new(
        DeserializerConfig::new(snapshot.to_vec()).with_severity(Severity::None),
    )
    .unwrap();
    let mut target = json!({});
    previous.deserialize(&json!({"a": 1, "b": 2}), &mut target).unwrap();
    assert_eq!(target, json!({"a": 1}));

    let mut target = json!({});
    deserializer.deserialize(&json!({"a": 1, "b": 2}), &mut target).unwrap();
    assert_eq!(target, json!({"b": 2}));
}

#[test]
fn test_shared_deserializer_across_threads() {
    let deserializer = Deserializer::new(
        DeserializerConfig::new(vec![resolve("n").step(steps::parse_int()).fallback(-1)])
            .with_severity(Severity::None),
    )
    .unwrap();

    std::thread::scope(|scope| {
        for i in 0..4 {
            let deserializer = &deserializer;
            scope.spawn(move || {
                let mut target = json!({});
                deserializer
                    .deserialize(&json!({"n": i.to_string()}), &mut target)
                    .unwrap();
                assert_eq!(target["n"], json!(i));
            });
        }
    });
}
