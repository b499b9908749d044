//! Instance power actions and security list rules against the recording
//! in-memory provider

use net_teardown::instance::apply_instance_action;
use net_teardown::security_list::{self, AddRuleOutcome};
use net_teardown::{InstanceActionError, SecurityRuleError};
use net_teardown_common::{
    CommonService, InstanceAction, PortRange, PowerState, ResourceKind, RuleDirection,
    SecurityRule,
};
use net_teardown_test_utils::fixtures::{
    allow_all_egress, dependent, instance, network, security_list, stopped_instance, tcp_ingress,
};
use net_teardown_test_utils::{Call, FakeProvider};
use std::cell::Cell;

fn instances() -> FakeProvider {
    FakeProvider::new()
        .with_instance(instance("i-web", "web"))
        .with_instance(stopped_instance("i-batch", "batch"))
}

#[tokio::test]
async fn test_start_stopped_instance() {
    let provider = instances();

    let before = apply_instance_action(&provider, "i-batch", InstanceAction::Start, |_| false)
        .await
        .unwrap();

    assert_eq!(before.power, PowerState::Stopped);
    assert_eq!(provider.power_state("i-batch"), Some(PowerState::Running));
    assert_eq!(
        provider.mutations(),
        vec![Call::InstanceAction("i-batch".into(), InstanceAction::Start)]
    );
}

#[tokio::test]
async fn test_state_mismatch_sends_nothing() {
    let provider = instances();

    for (id, action) in [
        ("i-web", InstanceAction::Start),
        ("i-batch", InstanceAction::Stop),
        ("i-batch", InstanceAction::SoftReset),
    ] {
        let err = apply_instance_action(&provider, id, action, |_| true)
            .await
            .unwrap_err();
        assert!(
            matches!(err, InstanceActionError::NotApplicable { action: a, .. } if a == action),
            "{id} {action}: {err:?}"
        );
    }
    assert!(provider.mutations().is_empty());
}

#[tokio::test]
async fn test_stop_asks_and_respects_decline() {
    let provider = instances();
    let asked = Cell::new(0);

    let err = apply_instance_action(&provider, "i-web", InstanceAction::Stop, |instance| {
        asked.set(asked.get() + 1);
        assert_eq!(instance.display_name, "web");
        false
    })
    .await
    .unwrap_err();

    assert_eq!(asked.get(), 1);
    assert!(matches!(err, InstanceActionError::Declined { .. }));
    assert_eq!(provider.power_state("i-web"), Some(PowerState::Running));
    assert!(provider.mutations().is_empty());

    apply_instance_action(&provider, "i-web", InstanceAction::Stop, |_| true)
        .await
        .unwrap();
    assert_eq!(provider.power_state("i-web"), Some(PowerState::Stopped));
}

#[tokio::test]
async fn test_soft_reset_does_not_ask() {
    let provider = instances();

    apply_instance_action(&provider, "i-web", InstanceAction::SoftReset, |_| {
        panic!("soft reset should not ask")
    })
    .await
    .unwrap();

    assert_eq!(
        provider.mutations(),
        vec![Call::InstanceAction("i-web".into(), InstanceAction::SoftReset)]
    );
}

#[tokio::test]
async fn test_unknown_instance() {
    let provider = instances();

    let err = apply_instance_action(&provider, "i-404", InstanceAction::Start, |_| true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InstanceActionError::NotFound { ref instance_id } if instance_id == "i-404"
    ));
    assert!(provider.mutations().is_empty());
}

#[tokio::test]
async fn test_instance_action_failure_is_reported() {
    let provider = instances().failing("i-batch", "InsufficientInstanceCapacity");

    let err = apply_instance_action(&provider, "i-batch", InstanceAction::Start, |_| true)
        .await
        .unwrap_err();

    match err {
        InstanceActionError::Provider { source, .. } => {
            assert!(format!("{source:#}").contains("InsufficientInstanceCapacity"));
        }
        other => panic!("expected Provider, got {other:?}"),
    }
    assert_eq!(provider.power_state("i-batch"), Some(PowerState::Stopped));
}

fn lists() -> FakeProvider {
    FakeProvider::new()
        .with_network(network("vcn-1", "main"))
        .with_dependent(security_list("sl-app", "app", "vcn-1"))
        .with_security_rule("sl-app", allow_all_egress())
        .with_security_rule("sl-app", tcp_ingress("0.0.0.0/0", "22"))
        .with_security_rule("sl-app", tcp_ingress("10.0.0.0/8", "5432"))
}

#[tokio::test]
async fn test_rules_list_ingress_first() {
    let provider = lists();

    let rules = security_list::list_rules(&provider, "sl-app").await.unwrap();

    let directions: Vec<RuleDirection> = rules.iter().map(|r| r.direction).collect();
    assert_eq!(
        directions,
        vec![
            RuleDirection::Ingress,
            RuleDirection::Ingress,
            RuleDirection::Egress
        ]
    );
    assert_eq!(rules[0].ports, Some(PortRange::single(22)));
    assert!(provider.mutations().is_empty());
}

#[tokio::test]
async fn test_add_service_rule() {
    let provider = lists();
    let rule = security_list::service_rule(CommonService::Https, "0.0.0.0/0");

    let outcome = security_list::add_ingress_rule(&provider, "sl-app", rule)
        .await
        .unwrap();

    let AddRuleOutcome::Added { rule } = outcome else {
        panic!("expected the rule to be added");
    };
    assert_eq!(rule.ports, Some(PortRange::single(443)));
    assert_eq!(rule.description.as_deref(), Some("HTTPS access from 0.0.0.0/0"));

    let stored = provider.security_rules("sl-app");
    assert_eq!(stored.len(), 4);
    assert_eq!(stored.last(), Some(&rule));
    assert_eq!(provider.mutations(), vec![Call::AddIngressRule("sl-app".into())]);
}

#[tokio::test]
async fn test_covered_rule_is_not_added_again() {
    let provider = lists().with_security_rule("sl-app", tcp_ingress("0.0.0.0/0", "8000-8100"));
    let rule = security_list::custom_rule(
        "8080-8090".parse().unwrap(),
        "0.0.0.0/0",
        Some("admin"),
    );

    let outcome = security_list::add_ingress_rule(&provider, "sl-app", rule)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        AddRuleOutcome::AlreadyCovered {
            existing: tcp_ingress("0.0.0.0/0", "8000-8100")
        }
    );
    assert!(provider.mutations().is_empty());
}

#[tokio::test]
async fn test_invalid_rules_are_rejected_before_any_call() {
    let provider = lists();

    let bad_cidr = security_list::service_rule(CommonService::Ssh, "office");
    let err = security_list::add_ingress_rule(&provider, "sl-app", bad_cidr)
        .await
        .unwrap_err();
    assert!(matches!(err, SecurityRuleError::InvalidCidr(ref c) if c == "office"));

    let egress = SecurityRule {
        direction: RuleDirection::Egress,
        ..tcp_ingress("0.0.0.0/0", "443")
    };
    let err = security_list::add_ingress_rule(&provider, "sl-app", egress)
        .await
        .unwrap_err();
    assert!(matches!(err, SecurityRuleError::NotIngress { .. }));

    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_missing_security_list() {
    let provider = lists();

    let err = security_list::add_ingress_rule(
        &provider,
        "sl-404",
        security_list::service_rule(CommonService::Http, "0.0.0.0/0"),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        SecurityRuleError::NotFound { ref security_list_id } if security_list_id == "sl-404"
    ));
    assert!(provider.mutations().is_empty());
}

#[tokio::test]
async fn test_summaries_flag_internet_ports() {
    let provider = lists()
        .with_dependent(dependent(ResourceKind::SecurityList, "sl-empty", "vcn-1"))
        .with_dependent(security_list("sl-other", "other", "vcn-9"));

    let summaries = security_list::summarize(&provider, "vcn-1").await.unwrap();

    assert_eq!(summaries.len(), 2);
    let app = &summaries[0];
    assert_eq!(app.security_list.id, "sl-app");
    assert_eq!((app.ingress, app.egress), (2, 1));
    assert_eq!(app.open_to_internet, vec!["TCP:22".to_string()]);

    let empty = &summaries[1];
    assert_eq!(empty.security_list.id, "sl-empty");
    assert_eq!((empty.ingress, empty.egress), (0, 0));
    assert!(empty.open_to_internet.is_empty());
}
