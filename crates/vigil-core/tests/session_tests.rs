mod common;

use async_trait::async_trait;
use common::{count, counter, counting, required, session};
use http::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use vigil_core::test_utils::MockTransport;
use vigil_core::{
    Disabler, ExceptionHandling, FieldResult, Hooks, Model, NodeState, Options, RemoteCheck,
    ResultHandler, Rule, RuleError, RuleOutput, RuleSet, RuleSetRegistry, ServerResponse,
    StaleResultPolicy, Status, ValidationSession, ValidationTrigger, VALIDATION_FAILED,
};

#[tokio::test]
async fn no_validators_means_success_without_hooks() {
    let session = ValidationSession::new(RuleSet::new(), Options::default()).unwrap();
    let model = session
        .wrap(json!({ "a": 1, "b": { "c": 2 } }))
        .await
        .unwrap();

    let result = model.validate().await.unwrap();

    assert!(!result.has_errors);
    assert!(!result.has_warnings);
    assert!(result.results.is_empty());
    assert!(model.is_valid());
    assert_eq!(model.value_node("b.c").unwrap().status(), Some(Status::Success));
}

#[tokio::test]
async fn name_is_required() {
    let rules = RuleSet::new().validator("name", required("name", "Name is required"));
    let session = ValidationSession::new(rules, Options::default()).unwrap();
    let person = session.wrap(json!({ "name": "" })).await.unwrap();
    let name = person.value_node("name").unwrap();

    assert!(name.required());
    assert_eq!(name.status(), None);

    let result = person.validate().await.unwrap();
    assert!(result.has_errors);
    assert_eq!(result.get("name").unwrap().text.as_deref(), Some("Name is required"));
    assert_eq!(name.status(), Some(Status::Error));
    assert_eq!(name.text().as_deref(), Some("Name is required"));
    assert!(!person.is_valid());
    assert_eq!(person.node().status(), Some(Status::Error));

    person.set("name", "Ada").await.unwrap();

    assert_eq!(name.status(), Some(Status::Success));
    assert_eq!(name.text(), None);
    assert!(person.is_valid());
    assert_eq!(
        session.field_result("name").unwrap().status,
        Some(Status::Success)
    );
}

#[tokio::test]
async fn manual_policy_validates_only_explicitly() {
    let calls = counter();
    let rules = RuleSet::new().validator("name", counting(&calls, RuleOutput::Pass));
    let session = session(rules, ValidationTrigger::Manual);
    let model = session.wrap(json!({ "name": "x" })).await.unwrap();

    model.set("name", "y").await.unwrap();
    assert_eq!(count(&calls), 0);

    model.validate().await.unwrap();
    assert_eq!(count(&calls), 1);

    model.set("name", "z").await.unwrap();
    assert_eq!(count(&calls), 1);

    model.value_node("name").unwrap().validate().await.unwrap();
    assert_eq!(count(&calls), 2);
}

#[tokio::test]
async fn auto_policy_skips_the_population_pass() {
    let calls = counter();
    let rules = RuleSet::new().validator("name", counting(&calls, RuleOutput::Pass));
    let session = session(rules, ValidationTrigger::Auto);
    let model = session.wrap(json!({ "name": "x" })).await.unwrap();

    assert_eq!(count(&calls), 0);

    model.set("name", "y").await.unwrap();
    assert_eq!(count(&calls), 1);
}

#[tokio::test]
async fn immediate_policy_validates_the_population_pass() {
    let calls = counter();
    let rules = RuleSet::new().validator("name", counting(&calls, RuleOutput::Pass));
    let session = session(rules, ValidationTrigger::Immediate);

    session.wrap(json!({ "name": "x" })).await.unwrap();

    assert_eq!(count(&calls), 1);
}

#[tokio::test]
async fn auto_after_manual_waits_for_the_first_explicit_validation() {
    let calls = counter();
    let rules = RuleSet::new().validator("name", counting(&calls, RuleOutput::Pass));
    let session = session(rules, ValidationTrigger::AutoAfterManual);
    let model = session.wrap(json!({ "name": "x" })).await.unwrap();

    model.set("name", "y").await.unwrap();
    assert_eq!(count(&calls), 0);
    assert!(!session.is_triggered());

    model.validate().await.unwrap();
    assert_eq!(count(&calls), 1);
    assert!(session.is_triggered());

    model.set("name", "z").await.unwrap();
    assert_eq!(count(&calls), 2);
}

#[tokio::test]
async fn disablers_take_precedence() {
    let calls = counter();
    let rules = RuleSet::new()
        .validator("name", counting(&calls, RuleOutput::message("Invalid")))
        .disabler(
            "name",
            Disabler::from_fn(|model, _| Ok(model.get("skip") == Some(json!(true)))),
        );
    let session = session(rules, ValidationTrigger::Immediate);
    let model = session
        .wrap(json!({ "name": "", "skip": true }))
        .await
        .unwrap();

    let name = model.value_node("name").unwrap();
    assert_eq!(count(&calls), 0);
    assert_eq!(name.status(), Some(Status::Success));

    model.set("skip", false).await.unwrap();
    model.set("name", "").await.unwrap();

    assert_eq!(count(&calls), 1);
    assert_eq!(name.text().as_deref(), Some("Invalid"));
}

#[tokio::test]
async fn first_failing_validator_wins() {
    let second = counter();
    let rules = RuleSet::new()
        .validator("name", Rule::from_fn(|_, _| Ok(RuleOutput::message("first"))))
        .validator("name", counting(&second, RuleOutput::message("second")));
    let session = session(rules, ValidationTrigger::Manual);
    let model = session.wrap(json!({ "name": "" })).await.unwrap();

    model.validate().await.unwrap();

    assert_eq!(count(&second), 0);
    assert_eq!(
        model.value_node("name").unwrap().text().as_deref(),
        Some("first")
    );
}

#[tokio::test]
async fn passing_validators_continue_the_scan() {
    let last = counter();
    let rules = RuleSet::new()
        .validator("name", Rule::from_fn(|_, _| Ok(RuleOutput::Pass)))
        .validator("name", Rule::from_fn(|_, _| Ok(RuleOutput::message(""))))
        .validator(
            "name",
            Rule::from_fn(|_, _| Ok(RuleOutput::Result(FieldResult::success()))),
        )
        .validator("name", counting(&last, RuleOutput::Pass));
    let session = session(rules, ValidationTrigger::Manual);
    let model = session.wrap(json!({ "name": "" })).await.unwrap();

    let result = model.validate().await.unwrap();

    assert_eq!(count(&last), 1);
    assert!(result.results.is_empty());
}

#[tokio::test]
async fn related_fields_cascade_once() {
    let from_calls = counter();
    let to_calls = counter();
    let rules = RuleSet::new()
        .validator(
            "from",
            counting(&from_calls, RuleOutput::Pass).with_related(["to"]),
        )
        .validator(
            "to",
            counting(&to_calls, RuleOutput::Pass).with_related(["from"]),
        );
    let session = session(rules, ValidationTrigger::Immediate);
    let model = session.wrap(json!({ "from": 1, "to": 2 })).await.unwrap();
    let (from_before, to_before) = (count(&from_calls), count(&to_calls));

    model.set("from", 5).await.unwrap();

    assert_eq!(count(&from_calls) - from_before, 1);
    assert_eq!(count(&to_calls) - to_before, 1);
    assert_eq!(
        model.value_node("to").unwrap().status(),
        Some(Status::Success)
    );
}

#[tokio::test]
async fn related_cascade_reports_errors_on_the_related_field() {
    let rules = RuleSet::new()
        .validator(
            "password",
            Rule::from_fn(|_, _| Ok(RuleOutput::Pass)).with_related(["confirmation"]),
        )
        .validator(
            "confirmation",
            Rule::from_fn(|model, _| {
                Ok(if model.get("password") == model.get("confirmation") {
                    RuleOutput::Pass
                } else {
                    RuleOutput::message("Passwords differ")
                })
            }),
        );
    let session = session(rules, ValidationTrigger::Immediate);
    let model = session
        .wrap(json!({ "password": "a", "confirmation": "a" }))
        .await
        .unwrap();

    model.set("password", "b").await.unwrap();

    let confirmation = model.value_node("confirmation").unwrap();
    assert_eq!(confirmation.text().as_deref(), Some("Passwords differ"));
}

#[tokio::test]
async fn failing_rules_succeed_by_default() {
    let rules = RuleSet::new().validator(
        "name",
        Rule::from_fn(|_, _| Err(RuleError::new("boom"))),
    );
    let session = session(rules, ValidationTrigger::Manual);
    let model = session.wrap(json!({ "name": "x" })).await.unwrap();

    let result = model.validate().await.unwrap();

    assert!(result.results.is_empty());
    assert_eq!(
        model.value_node("name").unwrap().status(),
        Some(Status::Success)
    );
}

#[tokio::test]
async fn failing_rules_fail_validation_when_configured() {
    let rules = RuleSet::new()
        .validator("name", Rule::from_fn(|_, _| Err(RuleError::new("boom"))))
        .validator("email", Rule::from_fn(|_, _| Ok(RuleOutput::Pass)))
        .disabler("email", Disabler::from_fn(|_, _| Err(RuleError::new("broken"))));
    let options = Options::default()
        .validation_trigger(ValidationTrigger::Manual)
        .exception_handling(ExceptionHandling::FailValidation);
    let session = ValidationSession::new(rules, options).unwrap();
    let model = session
        .wrap(json!({ "name": "x", "email": "a@b.c" }))
        .await
        .unwrap();

    let result = model.validate().await.unwrap();

    assert!(result.has_errors);
    for field in ["name", "email"] {
        let node = model.value_node(field).unwrap();
        assert_eq!(node.status(), Some(Status::Error));
        assert_eq!(node.text().as_deref(), Some(VALIDATION_FAILED));
    }
}

#[tokio::test]
async fn structured_results_default_to_error_and_rule_group() {
    let rules = RuleSet::new()
        .validator(
            "a",
            Rule::from_fn(|_, _| {
                Ok(RuleOutput::Result(FieldResult {
                    text: Some("No status".into()),
                    ..FieldResult::default()
                }))
            })
            .in_group("g"),
        )
        .validator(
            "b",
            Rule::from_fn(|_, _| Ok(RuleOutput::message("Plain"))).in_group("g"),
        )
        .validator(
            "c",
            Rule::from_fn(|_, _| Ok(RuleOutput::Result(FieldResult::warning("Own").with_group("h"))))
                .in_group("g"),
        );
    let session = session(rules, ValidationTrigger::Manual);
    let model = session
        .wrap(json!({ "a": 1, "b": 2, "c": 3 }))
        .await
        .unwrap();

    model.validate().await.unwrap();

    let a = model.value_node("a").unwrap();
    assert_eq!(a.status(), Some(Status::Error));
    assert_eq!(a.group().as_deref(), Some("g"));
    assert_eq!(model.value_node("b").unwrap().group().as_deref(), Some("g"));
    assert_eq!(model.value_node("c").unwrap().group().as_deref(), Some("h"));
}

#[tokio::test]
async fn groups_aggregate_errors_and_warnings() {
    let rules = RuleSet::new()
        .validator(
            "from",
            Rule::from_fn(|model, _| {
                Ok(if model.get("from").and_then(|v| v.as_i64()) > Some(10) {
                    RuleOutput::message("Start is too late")
                } else {
                    RuleOutput::Pass
                })
            })
            .in_group("dates"),
        )
        .validator(
            "to",
            Rule::from_fn(|_, _| Ok(RuleOutput::warning("End is far away"))).in_group("dates"),
        );
    let session = session(rules, ValidationTrigger::AutoAfterManual);
    let model = session.wrap(json!({ "from": 20, "to": 1 })).await.unwrap();

    model.validate().await.unwrap();

    let group = session.group("dates").unwrap();
    assert_eq!(group.results.len(), 2);
    assert_eq!(group.status(), Status::Error);
    assert_eq!(group.texts(&Status::Error), ["Start is too late".to_string()]);
    assert_eq!(group.texts(&Status::Warning), ["End is far away".to_string()]);

    model.set("from", 5).await.unwrap();

    let group = session.group("dates").unwrap();
    assert_eq!(group.results.len(), 1);
    assert_eq!(group.status(), Status::Warning);
    assert_eq!(session.groups().len(), 1);
}

#[tokio::test]
async fn server_results_apply_idempotently() {
    let session = session(RuleSet::new(), ValidationTrigger::Manual);
    let model = session
        .wrap(json!({ "name": "Ada", "address": { "city": "Atlantis" } }))
        .await
        .unwrap();
    let response: ServerResponse = serde_json::from_value(json!({
        "success": false,
        "messages": {
            "address.city": { "status": "error", "text": "Unknown city", "group": "address" }
        }
    }))
    .unwrap();

    let first = model.node().apply(&response);
    let city = model.value_node("address.city").unwrap();
    let name = model.value_node("name").unwrap();
    let states = (city.state(), name.state());

    let second = model.node().apply(&response);

    assert!(!first);
    assert_eq!(first, second);
    assert_eq!((city.state(), name.state()), states);
    assert_eq!(city.text().as_deref(), Some("Unknown city"));
    assert_eq!(name.state(), NodeState::success());
    assert_eq!(session.group("address").unwrap().text(), Some("Unknown city"));

    let clean: ServerResponse = serde_json::from_value(json!({})).unwrap();
    assert!(model.node().apply(&clean));
    assert_eq!(city.status(), Some(Status::Success));
    assert!(session.group("address").is_none());
}

#[tokio::test]
async fn clear_resets_nodes_and_results() {
    let rules = RuleSet::new().validator("name", required("name", "Name is required"));
    let session = session(rules, ValidationTrigger::Manual);
    let model = session.wrap(json!({ "name": "" })).await.unwrap();
    model.validate().await.unwrap();

    model.clear();

    let name = model.value_node("name").unwrap();
    assert_eq!(name.state(), NodeState::default());
    assert!(session.field_result("name").is_none());
    assert!(model.is_valid());
}

#[tokio::test]
async fn replacing_an_object_drops_its_results() {
    let rules = RuleSet::new().validator(
        "address.city",
        required("address.city", "City is required").in_group("address"),
    );
    let session = session(rules, ValidationTrigger::Manual);
    let model = session
        .wrap(json!({ "address": { "city": "" } }))
        .await
        .unwrap();

    model.validate().await.unwrap();
    assert!(session.group("address").is_some());
    assert!(!model.is_valid());

    model.set("address", json!({ "city": "" })).await.unwrap();

    assert!(session.field_result("address.city").is_none());
    assert!(session.group("address").is_none());
    assert!(model.is_valid());

    model.validate().await.unwrap();
    assert!(session.group("address").is_some());

    model.set("address", Value::Null).await.unwrap();

    assert!(session.field_result("address.city").is_none());
    assert!(session.group("address").is_none());
    assert!(session.groups().is_empty());
    assert!(model.is_valid());
}

#[tokio::test]
async fn panicking_rules_follow_the_exception_policy() {
    let parse = || {
        Rule::from_fn(|_, _| {
            let limit: usize = "abc".parse().unwrap();
            Ok(if limit > 0 { RuleOutput::Pass } else { RuleOutput::message("never") })
        })
    };

    let lenient = session(RuleSet::new().validator("name", parse()), ValidationTrigger::Manual);
    let model = lenient.wrap(json!({ "name": "x" })).await.unwrap();
    let result = model.validate().await.unwrap();
    assert!(result.results.is_empty());
    assert_eq!(model.value_node("name").unwrap().status(), Some(Status::Success));

    let rules = RuleSet::new()
        .validator("name", parse())
        .validator("email", Rule::from_fn(|_, _| Ok(RuleOutput::Pass)))
        .disabler("email", Disabler::from_fn(|_, _| panic!("disabler exploded")));
    let options = Options::default()
        .validation_trigger(ValidationTrigger::Manual)
        .exception_handling(ExceptionHandling::FailValidation);
    let strict = ValidationSession::new(rules, options).unwrap();
    let model = strict
        .wrap(json!({ "name": "x", "email": "a@b.c" }))
        .await
        .unwrap();

    let result = model.validate().await.unwrap();

    assert!(result.has_errors);
    for field in ["name", "email"] {
        let node = model.value_node(field).unwrap();
        assert_eq!(node.status(), Some(Status::Error));
        assert_eq!(node.text().as_deref(), Some(VALIDATION_FAILED));
    }
}

#[tokio::test]
async fn remote_check_resolving_to_null_is_success() {
    let transport = Arc::new(MockTransport::new());
    let rules = RuleSet::new().validator(
        "email",
        Rule::remote(RemoteCheck::get("/api/email", "email")),
    );
    let session = ValidationSession::builder()
        .rule_set(rules)
        .hooks(Hooks::new().transport_arc(transport.clone()))
        .build()
        .unwrap();
    let model = session.wrap(json!({ "email": "a@b.c" })).await.unwrap();

    let result = model.validate().await.unwrap();

    let email = model.value_node("email").unwrap();
    assert!(result.results.is_empty());
    assert_eq!(email.status(), Some(Status::Success));
    assert_eq!(email.text(), None);

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "/api/email?email=a%40b.c");
    assert_eq!(calls[0].method, Method::GET);
    assert_eq!(calls[0].payload, None);
}

#[tokio::test]
async fn remote_check_reports_error_message() {
    let transport = Arc::new(
        MockTransport::new().respond("/api/email", json!({ "errorMessage": "Email is taken" })),
    );
    let rules = RuleSet::new().validator(
        "email",
        Rule::remote(RemoteCheck::post("/api/email", "email")),
    );
    let session = ValidationSession::builder()
        .rule_set(rules)
        .hooks(Hooks::new().transport_arc(transport.clone()))
        .build()
        .unwrap();
    let model = session.wrap(json!({ "email": "a@b.c" })).await.unwrap();

    model.validate().await.unwrap();

    assert_eq!(
        model.value_node("email").unwrap().text().as_deref(),
        Some("Email is taken")
    );
    assert_eq!(transport.calls()[0].payload, Some(json!({ "email": "a@b.c" })));
}

struct Describe;

#[async_trait]
impl ResultHandler for Describe {
    async fn handle(
        &self,
        _session: &ValidationSession,
        _model: &Model,
        field: &str,
        rule: &RemoteCheck,
        response: Value,
    ) -> Result<Value, RuleError> {
        let status = response["status"].as_str().unwrap_or_default().to_string();
        Ok(json!({
            "errorMessage": format!("{} {} {} {status}", rule.method(), rule.url(), field)
        }))
    }
}

#[tokio::test]
async fn result_handler_sees_the_issuing_rule() {
    let transport = Arc::new(MockTransport::new().respond("/api/email", json!({ "status": "taken" })));
    let rules = RuleSet::new().validator(
        "email",
        Rule::remote(RemoteCheck::post("/api/email", "email")),
    );
    let session = ValidationSession::builder()
        .rule_set(rules)
        .hooks(
            Hooks::new()
                .transport_arc(transport.clone())
                .result_handler(Describe),
        )
        .build()
        .unwrap();
    let model = session.wrap(json!({ "email": "a@b.c" })).await.unwrap();

    model.validate().await.unwrap();

    assert_eq!(
        model.value_node("email").unwrap().text().as_deref(),
        Some("POST /api/email email taken")
    );
}

#[tokio::test]
async fn rules_see_parameters_and_dates() {
    let rules = RuleSet::new()
        .with_parameters(json!({ "minLength": 3 }))
        .validator(
            "name",
            Rule::from_fn(|model, session| {
                let min = session.parameters()["minLength"].as_u64().unwrap_or(0) as usize;
                let name = model.get_str("name").unwrap_or_default();
                Ok(if name.len() < min {
                    RuleOutput::message("Too short")
                } else {
                    RuleOutput::Pass
                })
            }),
        )
        .validator(
            "to",
            Rule::from_fn(|model, session| {
                let from = model.get_str("from").and_then(|d| session.value_of_date(&d, "", ""));
                let to = model.get_str("to").and_then(|d| session.value_of_date(&d, "", ""));
                Ok(if to < from {
                    RuleOutput::message("End before start")
                } else {
                    RuleOutput::Pass
                })
            }),
        );
    let session = session(rules, ValidationTrigger::Manual);
    let model = session
        .wrap(json!({ "name": "Al", "from": "2024-05-02", "to": "2024-05-01" }))
        .await
        .unwrap();

    let result = model.validate().await.unwrap();

    assert_eq!(result.results.len(), 2);
    assert_eq!(result.get("name").unwrap().text.as_deref(), Some("Too short"));
    assert_eq!(result.get("to").unwrap().text.as_deref(), Some("End before start"));
}

#[tokio::test]
async fn rule_set_resolved_by_name() {
    let mut registry = RuleSetRegistry::new();
    registry.insert(
        "person",
        RuleSet::new().validator("name", required("name", "Name is required")),
    );
    let session = ValidationSession::builder()
        .rule_set_named("person", &registry)
        .build()
        .unwrap();
    let model = session.wrap(json!({ "name": "" })).await.unwrap();

    let result = model.validate().await.unwrap();

    assert!(result.has_errors);
}

#[tokio::test]
async fn nested_fields_use_path_then_field_name_rules() {
    let rules = RuleSet::new()
        .validator("address.city", required("address.city", "City is required"))
        .validator("name", Rule::from_fn(|_, _| Ok(RuleOutput::warning("Check name"))));
    let session = session(rules, ValidationTrigger::Manual);
    let model = session
        .wrap(json!({ "address": { "city": "" }, "children": [{ "name": "Ada" }] }))
        .await
        .unwrap();

    let result = model.validate().await.unwrap();

    assert!(result.has_errors);
    assert!(result.has_warnings);
    assert_eq!(
        result.get("address.city").unwrap().text.as_deref(),
        Some("City is required")
    );
    assert_eq!(
        result.get("children.0.name").unwrap().status,
        Some(Status::Warning)
    );
    assert_eq!(
        model.object("address").unwrap().node().status(),
        Some(Status::Error)
    );
    assert_eq!(model.node().status(), Some(Status::Error));
}

fn slow_rule() -> Rule {
    Rule::from_async(|model, _| async move {
        let code = model.get_str("code").unwrap_or_default();
        if code == "slow" {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(RuleOutput::message("Slow code rejected"))
        } else {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(RuleOutput::Pass)
        }
    })
}

async fn race(policy: StaleResultPolicy) -> NodeState {
    let options = Options::default()
        .validation_trigger(ValidationTrigger::Immediate)
        .stale_results(policy);
    let session = ValidationSession::new(RuleSet::new().validator("code", slow_rule()), options).unwrap();
    let model = session.wrap(json!({ "code": "" })).await.unwrap();

    let (slow, fast) = tokio::join!(model.set("code", "slow"), async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        model.set("code", "fast").await
    });
    slow.unwrap();
    fast.unwrap();

    model.value_node("code").unwrap().state()
}

#[tokio::test(start_paused = true)]
async fn last_completed_keeps_the_late_result() {
    let state = race(StaleResultPolicy::LastCompleted).await;
    assert_eq!(state.text.as_deref(), Some("Slow code rejected"));
}

#[tokio::test(start_paused = true)]
async fn last_issued_discards_stale_results() {
    let state = race(StaleResultPolicy::LastIssued).await;
    assert_eq!(state, NodeState::success());
}
