use std::sync::Arc;

use automation_api::{ExampleApi, LoopbackApi};
use automation_engine::{BufferedOutput, ConsoleDispatcher, DispatchOutcome, InteractiveConsole, Session, SyncError};
use automation_registry::{ApiImplementation, CapabilityRegistry, OperationArguments, config};
use automation_types::{CascadeLevel, ConfigTree};
use serde_json::{Value, json};
use tempfile::tempdir;

struct C;

impl C {
    fn call_get_data(&self, _: &OperationArguments) -> anyhow::Result<Value> {
        Ok(json!({ "data": [1, 2, 3] }))
    }
}

impl ApiImplementation for C {
    fn instantiate() -> anyhow::Result<Self> {
        Ok(C)
    }
}

fn scenario_session() -> Session {
    let dir = tempdir().unwrap();
    let path = dir.path().join("apis.json");
    std::fs::write(
        &path,
        r#"{"apis":{"Ex":{"module":"m","class":"C","environments":{"qa":{"tenants":{"t":{"region":"eu-west"}}}}},"Other":{"module":"m","class":"C"},"Y":{}}}"#,
    )
    .unwrap();
    let tree = config::load(&path);

    let mut registry = CapabilityRegistry::new();
    registry.register_api::<C>("C").operation("call_get_data", C::call_get_data);
    Session::new(Arc::new(registry), Arc::new(tree))
}

#[test]
fn end_to_end_selection_catalog_and_sync() {
    let mut session = scenario_session();
    assert!(session.catalog().is_empty());

    session.select(CascadeLevel::Api, Some("Ex")).unwrap();
    assert_eq!(session.options_for(CascadeLevel::Environment), vec!["qa"]);
    assert_eq!(session.catalog(), ["Call Get Data"]);

    session.select(CascadeLevel::Environment, Some("qa")).unwrap();
    assert_eq!(session.options_for(CascadeLevel::Tenant), vec!["t"]);
    session.select(CascadeLevel::Tenant, Some("t")).unwrap();
    assert_eq!(session.catalog(), ["Call Get Data"]);

    assert!(session.can_sync());
    let binding = session.sync_selected().unwrap();
    assert_eq!(binding.api_name(), "Ex");
    assert!(!session.can_sync());
    assert_eq!(
        session.invoke("call_get_data", &OperationArguments::new()).unwrap(),
        json!({ "data": [1, 2, 3] })
    );
}

#[test]
fn reselecting_a_different_api_reenables_sync() {
    let mut session = scenario_session();
    session.select(CascadeLevel::Api, Some("Ex")).unwrap();
    session.sync_selected().unwrap();
    assert_eq!(
        session.sync_selected().unwrap_err(),
        SyncError::AlreadyBound { api: "Ex".into() }
    );

    session.select(CascadeLevel::Api, Some("Y")).unwrap();
    assert!(session.can_sync());
    assert!(session.catalog().is_empty());
    assert!(matches!(session.sync_selected(), Err(SyncError::Resolution(_))));
    assert_eq!(session.binding().map(|binding| binding.api_name()), Some("Ex"));

    session.select(CascadeLevel::Api, Some("Ex")).unwrap();
    assert!(session.can_sync());
    assert_eq!(session.sync_selected().unwrap().api_name(), "Ex");
    assert!(!session.can_sync());

    session.select(CascadeLevel::Api, Some("Other")).unwrap();
    assert!(session.can_sync());
}

#[test]
fn leaving_and_returning_to_the_bound_api_offers_sync_again() {
    let mut session = scenario_session();
    session.select(CascadeLevel::Api, Some("Ex")).unwrap();
    session.sync_selected().unwrap();
    session.select(CascadeLevel::Environment, Some("qa")).unwrap();
    session.select(CascadeLevel::Api, Some("Ex")).unwrap();
    assert!(!session.can_sync());

    session.select(CascadeLevel::Api, None).unwrap();
    assert!(!session.can_sync());
    session.select(CascadeLevel::Api, Some("Ex")).unwrap();
    assert!(session.can_sync());
}

#[test]
fn rejected_selection_still_refreshes_catalog() {
    let mut session = scenario_session();
    session.select(CascadeLevel::Api, Some("Ex")).unwrap();
    assert!(!session.catalog().is_empty());

    assert!(session.select(CascadeLevel::Api, Some("Missing")).is_err());
    assert_eq!(session.selection().api, None);
    assert!(session.catalog().is_empty());
}

#[test]
fn console_commands_drive_the_session() {
    let mut session = scenario_session();
    let dispatcher = ConsoleDispatcher::new();
    let mut output = BufferedOutput::default();

    for line in [
        "echo Hello World",
        "select api Ex",
        "select env qa",
        "select tenant t",
        "ops",
        "sync",
        "place \"Call Get Data\" 12 -4",
        "frobnicate",
        "",
    ] {
        assert_eq!(dispatcher.submit_blocking(line, &mut session, &mut output), DispatchOutcome::Continue);
    }

    let lines = output.lines;
    assert!(lines.contains(&"> echo Hello World".to_string()));
    assert!(lines.contains(&"Hello World".to_string()));
    assert!(lines.contains(&"Call Get Data [call_get_data]".to_string()));
    assert!(lines.contains(&"Synced 'Ex' (1 operations)".to_string()));
    assert!(lines.contains(&"Node 'Call Get Data' added at (12, -4)".to_string()));
    assert_eq!(lines.last(), Some(&"Unknown command: frobnicate".to_string()));
    assert!(!lines.iter().any(|line| line == "> "));
    assert_eq!(session.nodes().len(), 1);
}

#[test]
fn console_reports_failures_as_lines() {
    let mut session = scenario_session();
    let dispatcher = ConsoleDispatcher::new();
    let mut output = BufferedOutput::default();

    assert_eq!(dispatcher.dispatch("sync", &mut session, &mut output), DispatchOutcome::Continue);
    assert_eq!(output.lines, vec!["error: no API is selected"]);

    output.lines.clear();
    dispatcher.dispatch("select env qa", &mut session, &mut output);
    assert_eq!(output.lines[0], "error: 'qa' is not a valid environment selection");

    output.lines.clear();
    dispatcher.dispatch("call call_get_data", &mut session, &mut output);
    assert_eq!(output.lines, vec!["error: no API is synced"]);

    dispatcher.dispatch("clear", &mut session, &mut output);
    assert!(output.lines.is_empty());
    assert_eq!(dispatcher.dispatch("quit", &mut session, &mut output), DispatchOutcome::Exit);
}

#[test]
fn console_places_multi_word_names_and_manages_nodes() {
    let mut session = scenario_session();
    let dispatcher = ConsoleDispatcher::new();
    let mut output = BufferedOutput::default();

    for line in ["place Call Get Data", "place Call Get Data 3 4", "place Call Get Data 3", "nodes"] {
        dispatcher.dispatch(line, &mut session, &mut output);
    }
    assert_eq!(
        output.lines,
        vec![
            "Node 'Call Get Data' added at (0, 0)",
            "Node 'Call Get Data' added at (3, 4)",
            "Node 'Call Get Data 3' added at (0, 0)",
            "#1 Call Get Data at (0, 0)",
            "#2 Call Get Data at (3, 4)",
            "#3 Call Get Data 3 at (0, 0)",
        ]
    );

    output.lines.clear();
    dispatcher.dispatch("nodes --json", &mut session, &mut output);
    let nodes: Value = serde_json::from_str(&output.lines[0]).unwrap();
    assert_eq!(nodes[1]["position"], json!({ "x": 3.0, "y": 4.0 }));

    output.lines.clear();
    dispatcher.dispatch("nodes clear", &mut session, &mut output);
    dispatcher.dispatch("nodes", &mut session, &mut output);
    assert_eq!(output.lines, vec!["Canvas cleared", "(no nodes)"]);
    assert!(session.nodes().is_empty());
}

#[test]
fn console_reports_status_as_json_and_tenant_settings() {
    let mut session = scenario_session();
    let dispatcher = ConsoleDispatcher::new();
    let mut output = BufferedOutput::default();

    dispatcher.dispatch("settings", &mut session, &mut output);
    assert_eq!(output.lines, vec!["(no tenant selected)"]);

    for line in ["select api Ex", "select env qa", "select tenant t"] {
        dispatcher.submit_blocking(line, &mut session, &mut output);
    }
    output.lines.clear();
    dispatcher.dispatch("settings", &mut session, &mut output);
    let settings: Value = serde_json::from_str(&output.lines.join("\n")).unwrap();
    assert_eq!(settings, json!({ "region": "eu-west" }));

    output.lines.clear();
    dispatcher.dispatch("status --json", &mut session, &mut output);
    let status: Value = serde_json::from_str(&output.lines[0]).unwrap();
    assert_eq!(
        status,
        json!({
            "selection": { "api": "Ex", "environment": "qa", "tenant": "t" },
            "synced": null,
            "can_sync": true
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn commands_keep_running_while_a_sync_is_pending() {
    let mut session = scenario_session();
    let mut console = InteractiveConsole::new();
    let mut output = BufferedOutput::default();

    console.submit("select api Ex", &mut session, &mut output);
    assert_eq!(console.submit("sync", &mut session, &mut output), DispatchOutcome::Continue);
    assert_eq!(console.syncing(), Some("Ex"));

    console.submit("select api Other", &mut session, &mut output);
    console.submit("ops", &mut session, &mut output);
    assert_eq!(console.syncing(), Some("Ex"));
    assert!(session.binding().is_none());

    let completion = console.sync_finished().await;
    console.apply_sync(completion, &mut session, &mut output);
    assert_eq!(console.syncing(), None);
    assert!(session.binding().is_none());
    assert_eq!(
        output.lines.last(),
        Some(&"error: sync of 'Ex' was superseded by a newer selection".to_string())
    );
    assert!(output.lines.contains(&"Syncing 'Ex'...".to_string()));
    assert!(output.lines.contains(&"Call Get Data [call_get_data]".to_string()));

    console.submit("sync", &mut session, &mut output);
    let completion = console.sync_finished().await;
    console.apply_sync(completion, &mut session, &mut output);
    assert_eq!(output.lines.last(), Some(&"Synced 'Other' (1 operations)".to_string()));
    assert_eq!(session.binding().map(|binding| binding.api_name()), Some("Other"));
}

#[tokio::test(flavor = "multi_thread")]
async fn background_sync_loses_to_a_newer_selection() {
    let mut session = scenario_session();
    session.select(CascadeLevel::Api, Some("Ex")).unwrap();
    let ticket = session.begin_sync_selected().unwrap();

    session.select(CascadeLevel::Api, Some("Other")).unwrap();
    let completion = ticket.wait().await;
    assert!(matches!(session.finish_sync(completion), Err(SyncError::Superseded { .. })));
    assert!(session.binding().is_none());

    let completion = session.begin_sync_selected().unwrap().wait().await;
    assert_eq!(session.finish_sync(completion).unwrap().api_name(), "Other");
}

#[test]
fn bundled_apis_resolve_from_configuration() {
    let mut registry = CapabilityRegistry::new();
    automation_api::register_builtin_apis(&mut registry);
    let tree = ConfigTree::from_document(json!({
        "apis": {
            "Example": { "module": "apis.example", "class": "ExampleApi" },
            "Loopback": { "module": "apis.loopback", "class": "LoopbackApi", "environments": { "local": {} } }
        }
    }))
    .unwrap();
    let mut session = Session::new(Arc::new(registry), Arc::new(tree));

    session.select(CascadeLevel::Api, Some("Example")).unwrap();
    assert_eq!(session.catalog(), ["Call Delete Data", "Call Get Data", "Call Put Data"]);

    session.select(CascadeLevel::Api, Some("Loopback")).unwrap();
    assert_eq!(session.catalog(), ["Call Echo", "Call Ping"]);
    session.sync_selected().unwrap();

    let mut arguments = OperationArguments::new();
    arguments.insert("greeting".into(), json!("hi"));
    let direct = LoopbackApi::instantiate().unwrap().call_echo(&arguments).unwrap();
    assert_eq!(session.invoke("call_echo", &arguments).unwrap(), direct);
    assert!(
        session
            .binding()
            .and_then(|binding| binding.instance().downcast_ref::<ExampleApi>())
            .is_none()
    );
}
