//! Terminal tables for networks, plans, teardown results, instances and
//! security list rules

use crate::orchestrator::{TeardownOutcome, TeardownPlan, TeardownResult};
use crate::security_list::SecurityListSummary;
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use net_teardown_common::{InstanceInfo, NetworkResource, Phase, ResourceKind, SecurityRule};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(Cell::new).collect::<Vec<_>>());
    table
}

pub fn networks_table(networks: &[NetworkResource]) -> Table {
    let mut table = new_table(&["ID", "Name", "CIDR", "State"]);
    for network in networks {
        table.add_row(vec![
            Cell::new(&network.id),
            Cell::new(&network.display_name),
            Cell::new(network.cidr_block.as_deref().unwrap_or("-")),
            Cell::new(network.state.as_str()),
        ]);
    }
    table
}

/// One row per discovered resource with the action the teardown will take
pub fn plan_table(plan: &TeardownPlan) -> Table {
    let mut table = new_table(&["Phase", "Kind", "ID", "Name", "State", "Action"]);

    for instance in &plan.in_use {
        table.add_row(vec![
            Cell::new(Phase::ImpactDiscovery.number()),
            Cell::new(ResourceKind::Instance.label()),
            Cell::new(instance.id()),
            Cell::new(instance.display_name()),
            Cell::new(instance.state().as_str()),
            Cell::new("attached, will lose connectivity"),
        ]);
    }

    for table_with_rules in plan.route_tables_with_rules() {
        let rules = table_with_rules.route_rules().map_or(0, <[_]>::len);
        table.add_row(vec![
            Cell::new(Phase::RouteRuleClearing.number()),
            Cell::new(ResourceKind::RouteTable.label()),
            Cell::new(table_with_rules.id()),
            Cell::new(table_with_rules.display_name()),
            Cell::new(table_with_rules.state().as_str()),
            Cell::new(format!("clear {rules} rule(s)")),
        ]);
    }

    for step in &plan.steps {
        for resource in &step.resources {
            let action = match plan.skip_reason(resource) {
                Some(reason) => format!("skip ({})", reason.as_str()),
                None => "delete".to_string(),
            };
            table.add_row(vec![
                Cell::new(step.kind.phase().number()),
                Cell::new(step.kind.label()),
                Cell::new(resource.id()),
                Cell::new(resource.display_name()),
                Cell::new(resource.state().as_str()),
                Cell::new(action),
            ]);
        }
    }

    for failure in &plan.listing_failures {
        table.add_row(vec![
            Cell::new(failure.phase.number()),
            Cell::new(failure.kind.label()),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new(format!("listing failed: {}", failure.error)),
        ]);
    }

    table
}

pub fn result_table(result: &TeardownResult) -> Table {
    let mut table = new_table(&["Kind", "ID", "Name", "Result"]);

    for id in &result.cleared_route_tables {
        table.add_row(vec![
            Cell::new(ResourceKind::RouteTable.label()),
            Cell::new(id),
            Cell::new(""),
            Cell::new("rules cleared"),
        ]);
    }
    for resource in &result.deleted {
        table.add_row(vec![
            Cell::new(resource.kind.label()),
            Cell::new(&resource.id),
            Cell::new(&resource.display_name),
            Cell::new("deleted"),
        ]);
    }
    for skipped in &result.skipped {
        table.add_row(vec![
            Cell::new(skipped.resource.kind.label()),
            Cell::new(&skipped.resource.id),
            Cell::new(&skipped.resource.display_name),
            Cell::new(format!("skipped ({})", skipped.reason.as_str())),
        ]);
    }
    for failure in &result.failures {
        table.add_row(vec![
            Cell::new(failure.kind.label()),
            Cell::new(&failure.resource_id),
            Cell::new(""),
            Cell::new(format!("FAILED: {}", failure.error)),
        ]);
    }

    let network_result = if result.network_deleted {
        "deleted".to_string()
    } else if let Some(err) = &result.terminal_error {
        format!("FAILED: {err}")
    } else {
        "not deleted".to_string()
    };
    table.add_row(vec![
        Cell::new("network"),
        Cell::new(&result.network_id),
        Cell::new(&result.network_name),
        Cell::new(network_result),
    ]);

    table
}

pub fn instances_table(instances: &[InstanceInfo]) -> Table {
    let mut table = new_table(&["ID", "Name", "Power", "Lifecycle"]);
    for instance in instances {
        table.add_row(vec![
            Cell::new(&instance.id),
            Cell::new(&instance.display_name),
            Cell::new(instance.power),
            Cell::new(instance.state.as_str()),
        ]);
    }
    table
}

/// Rules in the order given, with internet-facing ingress called out
pub fn rules_table(rules: &[SecurityRule]) -> Table {
    let mut table = new_table(&["#", "Direction", "CIDR", "Protocol", "Ports", "Description"]);
    for (i, rule) in rules.iter().enumerate() {
        let description = rule.description.as_deref().unwrap_or("-");
        let description = if rule.is_open_to_internet() {
            format!("{description} [open to internet]")
        } else {
            description.to_string()
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(rule.direction),
            Cell::new(&rule.cidr),
            Cell::new(&rule.protocol),
            Cell::new(rule.ports_label()),
            Cell::new(description),
        ]);
    }
    table
}

pub fn security_lists_table(summaries: &[SecurityListSummary]) -> Table {
    let mut table = new_table(&["ID", "Name", "Default", "Ingress", "Egress", "Open to internet"]);
    for summary in summaries {
        table.add_row(vec![
            Cell::new(&summary.security_list.id),
            Cell::new(&summary.security_list.display_name),
            Cell::new(match summary.is_default {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            }),
            Cell::new(summary.ingress),
            Cell::new(summary.egress),
            Cell::new(if summary.open_to_internet.is_empty() {
                "-".to_string()
            } else {
                summary.open_to_internet.join(", ")
            }),
        ]);
    }
    table
}

pub fn print_networks(networks: &[NetworkResource]) {
    if networks.is_empty() {
        println!("No networks found.");
        return;
    }
    println!("{}", networks_table(networks));
}

pub fn print_plan(plan: &TeardownPlan) {
    println!(
        "\n=== Teardown plan for {} ({}) ===\n",
        plan.network.id, plan.network.display_name
    );
    if plan.has_no_dependents() && plan.in_use.is_empty() {
        println!("No dependent resources; only the network itself will be deleted.");
    } else {
        println!("{}", plan_table(plan));
    }
    println!(
        "\n{} delete request(s), {} instance(s) attached",
        plan.deletion_count(),
        plan.in_use.len()
    );
    for resource in &plan.defaults_by_name {
        println!(
            "Note: {} {} ({}) is kept as a default by its name only",
            resource.kind.label(),
            resource.id,
            resource.display_name
        );
    }
}

pub fn print_instances(instances: &[InstanceInfo]) {
    if instances.is_empty() {
        println!("No instances found.");
        return;
    }
    println!("{}", instances_table(instances));
}

pub fn print_rules(security_list_id: &str, rules: &[SecurityRule]) {
    println!("\n=== Rules of {security_list_id} ===\n");
    if rules.is_empty() {
        println!("No rules.");
        return;
    }
    println!("{}", rules_table(rules));

    let open: Vec<String> = rules
        .iter()
        .filter(|r| r.is_open_to_internet() && r.protocol.has_ports())
        .map(|r| format!("{}:{}", r.protocol, r.ports_label()))
        .collect();
    if !open.is_empty() {
        println!("\nWarning: ports open to the internet: {}", open.join(", "));
    }
}

pub fn print_result(result: &TeardownResult) {
    println!("\n=== Teardown of {} ===\n", result.network_id);
    println!("{}", result_table(result));

    if result.subnet_drain_timed_out {
        println!("\nWarning: subnets were still present when the drain wait timed out");
    }
    if let Some(phase) = result.cancelled_at {
        println!("\nCancelled before phase {phase}");
    }

    let secs = result.duration().num_milliseconds() as f64 / 1000.0;
    match result.outcome() {
        TeardownOutcome::Success => println!("\nOutcome: success ({secs:.1}s)"),
        outcome => println!(
            "\nOutcome: {} ({} failure(s), {secs:.1}s)",
            outcome.as_str(),
            result.failures.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net_teardown_common::{LifecycleState, PortRange, PowerState, ResourceRef};

    #[test]
    fn networks_table_lists_every_network() {
        let networks = vec![
            NetworkResource {
                id: "vpc-1".into(),
                display_name: "main".into(),
                cidr_block: Some("10.0.0.0/16".into()),
                state: LifecycleState::Available,
            },
            NetworkResource {
                id: "vpc-2".into(),
                display_name: "scratch".into(),
                cidr_block: None,
                state: LifecycleState::Creating,
            },
        ];
        let rendered = networks_table(&networks).to_string();
        assert!(rendered.contains("vpc-1"));
        assert!(rendered.contains("10.0.0.0/16"));
        assert!(rendered.contains("CREATING"));
    }

    #[test]
    fn rules_table_flags_internet_ingress() {
        let rules = vec![
            SecurityRule::tcp_ingress("0.0.0.0/0", PortRange::single(22))
                .with_description("SSH access from 0.0.0.0/0"),
            SecurityRule::tcp_ingress("10.0.0.0/8", PortRange::single(5432)),
        ];
        let rendered = rules_table(&rules).to_string();

        assert!(rendered.contains("SSH access from 0.0.0.0/0 [open to internet]"));
        assert!(rendered.contains("5432"));
        assert_eq!(rendered.matches("[open to internet]").count(), 1);
    }

    #[test]
    fn instances_table_shows_power_state() {
        let instances = vec![InstanceInfo {
            id: "i-1".into(),
            display_name: "web".into(),
            state: LifecycleState::Available,
            power: PowerState::Stopped,
        }];
        let rendered = instances_table(&instances).to_string();
        assert!(rendered.contains("stopped"));
        assert!(rendered.contains("web"));
    }

    #[test]
    fn result_table_shows_network_failure() {
        let mut result = TeardownResult::new("vpc-1", "main", vec![]);
        result.deleted.push(ResourceRef {
            kind: ResourceKind::Subnet,
            id: "subnet-1".into(),
            display_name: "a".into(),
        });
        result.terminal_error = Some("DependencyViolation".into());
        let rendered = result_table(&result.finish()).to_string();

        assert!(rendered.contains("subnet-1"));
        assert!(rendered.contains("DependencyViolation"));
    }
}
