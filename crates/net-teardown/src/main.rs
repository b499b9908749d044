//! net-teardown: delete an AWS VPC together with everything that blocks it
//!
//! Lists VPCs, previews a teardown plan, or runs the ordered teardown with an
//! explicit confirmation phrase. Also starts, stops and reboots instances and
//! opens TCP ports in network ACLs.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input};
use net_teardown::aws::{AwsContext, Ec2NetworkClient, FromAwsContext};
use net_teardown::config::AwsConfig;
use net_teardown::instance::apply_instance_action;
use net_teardown::orchestrator::TeardownOutcome;
use net_teardown::security_list::{self, AddRuleOutcome, DEFAULT_SOURCE};
use net_teardown::wait::PollConfig;
use net_teardown::{
    InUseGate, InUsePolicy, NetworkProvider, TeardownConfig, TeardownOrchestrator, report,
};
use net_teardown_common::defaults::{
    DEFAULT_CONFIRMATION_PHRASE, DEFAULT_DELETE_PACING_MILLIS, DEFAULT_DISCOVERY_CONCURRENCY,
    DEFAULT_FINAL_SETTLE_SECS, DEFAULT_NAME_PREFIX, DEFAULT_REGION,
    DEFAULT_ROUTE_SETTLE_DELAY_SECS, DEFAULT_SUBNET_DRAIN_TIMEOUT_SECS,
    DEFAULT_SUBNET_POLL_INTERVAL_SECS,
};
use net_teardown_common::{
    CommonService, DependentResource, InstanceAction, InstanceInfo, NetworkResource, PortRange,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "net-teardown")]
#[command(about = "Ordered teardown of an AWS VPC and its dependent resources")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// AWS connection flags shared by every command
#[derive(clap::Args, Debug)]
struct AwsArgs {
    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long)]
    aws_profile: Option<String>,
}

impl From<AwsArgs> for AwsConfig {
    fn from(args: AwsArgs) -> Self {
        Self {
            region: args.region,
            aws_profile: args.aws_profile,
        }
    }
}

/// Arguments for the teardown command (extracted to reduce enum size)
#[derive(clap::Args, Debug)]
struct TeardownArgs {
    #[command(flatten)]
    aws: AwsArgs,

    /// VPC to delete
    #[arg(long)]
    network_id: String,

    /// Confirmation phrase (prompted for when absent)
    #[arg(long)]
    confirm: Option<String>,

    /// Phrase that must be typed to authorize the teardown
    #[arg(
        long,
        env = "NET_TEARDOWN_CONFIRMATION_PHRASE",
        default_value = DEFAULT_CONFIRMATION_PHRASE
    )]
    confirmation_phrase: String,

    /// Proceed without asking when instances are still attached
    #[arg(long)]
    force: bool,

    /// Print the result as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Seconds to wait after clearing a route table's rules
    #[arg(long, default_value_t = DEFAULT_ROUTE_SETTLE_DELAY_SECS)]
    route_settle_secs: u64,

    /// Milliseconds to pause after each delete request
    #[arg(long, default_value_t = DEFAULT_DELETE_PACING_MILLIS)]
    delete_pacing_millis: u64,

    /// Seconds between subnet drain checks
    #[arg(long, default_value_t = DEFAULT_SUBNET_POLL_INTERVAL_SECS)]
    subnet_poll_secs: u64,

    /// Seconds to wait for subnets to disappear before moving on
    #[arg(long, default_value_t = DEFAULT_SUBNET_DRAIN_TIMEOUT_SECS)]
    subnet_drain_timeout_secs: u64,

    /// Seconds to wait before deleting the VPC itself
    #[arg(long, default_value_t = DEFAULT_FINAL_SETTLE_SECS)]
    final_settle_secs: u64,

    /// Maximum concurrent instance lookups during discovery
    #[arg(long, default_value_t = DEFAULT_DISCOVERY_CONCURRENCY)]
    discovery_concurrency: usize,

    /// Name prefix treated as a default resource when AWS gives no flag
    #[arg(long, default_value = DEFAULT_NAME_PREFIX)]
    default_name_prefix: String,
}

impl TeardownArgs {
    fn teardown_config(&self) -> TeardownConfig {
        TeardownConfig {
            confirmation_phrase: self.confirmation_phrase.clone(),
            route_settle_delay: Duration::from_secs(self.route_settle_secs),
            delete_pacing: Duration::from_millis(self.delete_pacing_millis),
            subnet_drain: PollConfig::new(
                Duration::from_secs(self.subnet_poll_secs),
                Duration::from_secs(self.subnet_drain_timeout_secs),
            ),
            final_settle_delay: Duration::from_secs(self.final_settle_secs),
            discovery_concurrency: self.discovery_concurrency,
            default_name_prefix: self.default_name_prefix.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List VPCs in the region
    List {
        #[command(flatten)]
        aws: AwsArgs,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show what a teardown would do, without changing anything
    Plan {
        #[command(flatten)]
        aws: AwsArgs,

        /// VPC to inspect
        #[arg(long)]
        network_id: String,

        /// Print the plan as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Maximum concurrent instance lookups during discovery
        #[arg(long, default_value_t = DEFAULT_DISCOVERY_CONCURRENCY)]
        discovery_concurrency: usize,
    },

    /// Delete a VPC and every resource that depends on it
    Teardown(Box<TeardownArgs>),

    /// List instances or change their power state
    Instance {
        #[command(flatten)]
        aws: AwsArgs,

        #[command(subcommand)]
        command: InstanceCommand,
    },

    /// Show network ACL rules or open TCP ports in one
    SecurityList {
        #[command(flatten)]
        aws: AwsArgs,

        #[command(subcommand)]
        command: SecurityListCommand,
    },
}

#[derive(Subcommand, Debug)]
enum InstanceCommand {
    /// List instances with their power state
    List {
        #[arg(long)]
        json: bool,
    },

    /// Start a stopped instance
    Start {
        #[arg(long)]
        instance_id: String,
    },

    /// Stop a running instance
    Stop {
        #[arg(long)]
        instance_id: String,

        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Reboot a running instance, letting the OS shut down cleanly
    Reset {
        #[arg(long)]
        instance_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum SecurityListCommand {
    /// List the network ACLs of a VPC with rule counts
    List {
        #[arg(long)]
        network_id: String,

        #[arg(long)]
        json: bool,
    },

    /// Show every rule of a network ACL
    Rules {
        #[arg(long)]
        security_list_id: String,

        #[arg(long)]
        json: bool,
    },

    /// Allow TCP ingress for a well-known service or a port range
    AddRule {
        #[arg(long)]
        security_list_id: String,

        /// http, https, ssh, rdp, mysql, postgresql, mongodb or redis
        #[arg(long, conflicts_with = "ports", required_unless_present = "ports")]
        service: Option<CommonService>,

        /// Port or range, e.g. 8080 or 8000-8090
        #[arg(long)]
        ports: Option<PortRange>,

        /// Source CIDR
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: String,

        /// Rule description (with --ports)
        #[arg(long, requires = "ports")]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so --json output stays machine readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("aws_config=warn".parse()?)
                .add_directive("aws_smithy_runtime=warn".parse()?)
                .add_directive("aws_sdk_ec2=warn".parse()?),
        )
        .init();

    match args.command {
        Command::List { aws, format } => handle_list(aws.into(), &format).await,
        Command::Plan {
            aws,
            network_id,
            json,
            discovery_concurrency,
        } => handle_plan(aws.into(), &network_id, json, discovery_concurrency).await,
        Command::Teardown(teardown_args) => handle_teardown(*teardown_args).await,
        Command::Instance { aws, command } => handle_instance(aws.into(), command).await,
        Command::SecurityList { aws, command } => handle_security_list(aws.into(), command).await,
    }
}

async fn provider_for(aws: &AwsConfig) -> Ec2NetworkClient {
    if let Some(profile) = &aws.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }
    let ctx = AwsContext::from_config(aws).await;
    Ec2NetworkClient::from_context(&ctx)
}

/// Handle the list command
async fn handle_list(aws: AwsConfig, format: &str) -> Result<()> {
    let provider = provider_for(&aws).await;
    let networks = provider.list_networks().await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&networks)?);
    } else {
        report::print_networks(&networks);
    }
    Ok(())
}

/// Handle the plan command
async fn handle_plan(
    aws: AwsConfig,
    network_id: &str,
    json: bool,
    discovery_concurrency: usize,
) -> Result<()> {
    let provider = provider_for(&aws).await;
    let config = TeardownConfig {
        discovery_concurrency,
        ..TeardownConfig::default()
    };
    let plan = TeardownOrchestrator::new(&provider, config)
        .plan(network_id)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        report::print_plan(&plan);
    }
    Ok(())
}

/// Handle the teardown command
async fn handle_teardown(args: TeardownArgs) -> Result<()> {
    let config = args.teardown_config();
    let confirmation = match &args.confirm {
        Some(phrase) => phrase.clone(),
        None => prompt_confirmation(&args.network_id, &config.confirmation_phrase)?,
    };

    let aws = AwsConfig {
        region: args.aws.region.clone(),
        aws_profile: args.aws.aws_profile.clone(),
    };
    let provider = provider_for(&aws).await;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current phase");
            signal_token.cancel();
        }
    });

    let gate: &dyn InUseGate = if args.force {
        &InUsePolicy::Proceed
    } else {
        &confirm_in_use
    };

    info!(network_id = %args.network_id, region = %aws.region, "Starting teardown");
    let result = TeardownOrchestrator::new(&provider, config)
        .with_cancellation(cancel)
        .teardown(&args.network_id, &confirmation, gate)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        report::print_result(&result);
    }

    match result.outcome() {
        TeardownOutcome::Success => Ok(()),
        outcome => bail!(
            "Teardown of '{}' ended with {}",
            result.network_id,
            outcome.as_str()
        ),
    }
}

/// Handle the instance commands
async fn handle_instance(aws: AwsConfig, command: InstanceCommand) -> Result<()> {
    let provider = provider_for(&aws).await;

    let (instance_id, action, skip_prompt) = match command {
        InstanceCommand::List { json } => {
            let instances = provider.list_instances().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&instances)?);
            } else {
                report::print_instances(&instances);
            }
            return Ok(());
        }
        InstanceCommand::Start { instance_id } => (instance_id, InstanceAction::Start, false),
        InstanceCommand::Stop { instance_id, yes } => (instance_id, InstanceAction::Stop, yes),
        InstanceCommand::Reset { instance_id } => (instance_id, InstanceAction::SoftReset, false),
    };

    let instance = apply_instance_action(&provider, &instance_id, action, |instance| {
        skip_prompt || confirm_instance_action(instance, action)
    })
    .await?;
    println!(
        "{action} requested for {} ({})",
        instance.id, instance.display_name
    );
    Ok(())
}

/// Handle the security list commands
async fn handle_security_list(aws: AwsConfig, command: SecurityListCommand) -> Result<()> {
    let provider = provider_for(&aws).await;

    match command {
        SecurityListCommand::List { network_id, json } => {
            let summaries = security_list::summarize(&provider, &network_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("No network ACLs found.");
            } else {
                println!("{}", report::security_lists_table(&summaries));
            }
        }
        SecurityListCommand::Rules {
            security_list_id,
            json,
        } => {
            let rules = security_list::list_rules(&provider, &security_list_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else {
                report::print_rules(&security_list_id, &rules);
            }
        }
        SecurityListCommand::AddRule {
            security_list_id,
            service,
            ports,
            source,
            description,
        } => {
            let rule = match (service, ports) {
                (Some(service), None) => security_list::service_rule(service, &source),
                (None, Some(ports)) => {
                    security_list::custom_rule(ports, &source, description.as_deref())
                }
                _ => bail!("Pass exactly one of --service or --ports"),
            };

            match security_list::add_ingress_rule(&provider, &security_list_id, rule).await? {
                AddRuleOutcome::Added { rule } => println!(
                    "Allowed {}:{} from {} in {security_list_id}",
                    rule.protocol,
                    rule.ports_label(),
                    rule.cidr
                ),
                AddRuleOutcome::AlreadyCovered { existing } => println!(
                    "Already allowed by {}:{} from {} in {security_list_id}; nothing changed",
                    existing.protocol,
                    existing.ports_label(),
                    existing.cidr
                ),
            }
        }
    }
    Ok(())
}

fn prompt_confirmation(network_id: &str, phrase: &str) -> Result<String> {
    let input: String = tokio::task::block_in_place(|| {
        Input::new()
            .with_prompt(format!(
                "This deletes '{network_id}' and everything in it. Type {phrase} to continue"
            ))
            .allow_empty(true)
            .interact_text()
    })?;
    Ok(input)
}

/// Ask the operator whether to continue while instances are still attached
fn confirm_in_use(network: &NetworkResource, in_use: &[DependentResource]) -> bool {
    eprintln!(
        "\n{} instance(s) still attached to {} ({}):",
        in_use.len(),
        network.id,
        network.display_name
    );
    for instance in in_use {
        eprintln!("  - {} ({})", instance.id(), instance.display_name());
    }

    tokio::task::block_in_place(|| {
        Confirm::new()
            .with_prompt("They will lose network connectivity. Continue?")
            .default(false)
            .interact()
    })
    .unwrap_or_else(|e| {
        warn!(error = %e, "Prompt failed, not proceeding");
        false
    })
}

/// Ask before an action that interrupts a running instance
fn confirm_instance_action(instance: &InstanceInfo, action: InstanceAction) -> bool {
    tokio::task::block_in_place(|| {
        Confirm::new()
            .with_prompt(format!(
                "{action} {} ({})?",
                instance.display_name, instance.id
            ))
            .default(false)
            .interact()
    })
    .unwrap_or_else(|e| {
        warn!(error = %e, "Prompt failed, not proceeding");
        false
    })
}
