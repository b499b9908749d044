//! VPC integration tests - actually call AWS APIs
//!
//! These tests are marked `#[ignore]` and only run with:
//! ```
//! AWS_PROFILE=your_profile cargo test --test aws_vpc_integration -- --ignored
//! ```

use aws_sdk_ec2::types::{ResourceType, Tag, TagSpecification};
use net_teardown::aws::{AwsContext, Ec2NetworkClient, FromAwsContext};
use net_teardown::{
    InUsePolicy, NetworkProvider, TeardownConfig, TeardownOrchestrator, TeardownOutcome,
};
use net_teardown_common::ResourceKind;
use net_teardown_common::defaults::DEFAULT_CONFIRMATION_PHRASE;
use net_teardown_test_utils::{get_test_region, test_name};

fn name_tag(resource_type: ResourceType, name: &str) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Tag::builder().key("Name").value(name).build())
        .build()
}

#[tokio::test]
#[ignore]
async fn test_list_networks() {
    let client = Ec2NetworkClient::new(&get_test_region()).await;

    let networks = client
        .list_networks()
        .await
        .expect("AWS credentials required - set AWS_PROFILE or AWS_ACCESS_KEY_ID");

    for network in &networks {
        assert!(
            network.id.starts_with("vpc-"),
            "VPC ID should start with 'vpc-', got: {}",
            network.id
        );
    }
}

#[tokio::test]
#[ignore]
async fn test_get_missing_network() {
    let client = Ec2NetworkClient::new(&get_test_region()).await;

    let network = client
        .get_network("vpc-0000000000000000f")
        .await
        .expect("Missing VPC should not be an error");
    assert!(network.is_none());
}

/// Build a small public VPC and tear it down again
#[tokio::test]
#[ignore]
async fn test_teardown_public_vpc() {
    let ctx = AwsContext::new(&get_test_region()).await;
    let ec2 = ctx.ec2_client();
    let name = test_name();

    let vpc_id = ec2
        .create_vpc()
        .cidr_block("10.250.0.0/16")
        .tag_specifications(name_tag(ResourceType::Vpc, &name))
        .send()
        .await
        .expect("AWS credentials required")
        .vpc()
        .and_then(|v| v.vpc_id())
        .expect("VPC ID in response")
        .to_string();

    let subnet_id = ec2
        .create_subnet()
        .vpc_id(&vpc_id)
        .cidr_block("10.250.1.0/24")
        .send()
        .await
        .expect("Should create subnet")
        .subnet()
        .and_then(|s| s.subnet_id())
        .expect("Subnet ID in response")
        .to_string();

    let igw_id = ec2
        .create_internet_gateway()
        .send()
        .await
        .expect("Should create internet gateway")
        .internet_gateway()
        .and_then(|g| g.internet_gateway_id())
        .expect("Gateway ID in response")
        .to_string();
    ec2.attach_internet_gateway()
        .internet_gateway_id(&igw_id)
        .vpc_id(&vpc_id)
        .send()
        .await
        .expect("Should attach internet gateway");

    let rt_id = ec2
        .create_route_table()
        .vpc_id(&vpc_id)
        .send()
        .await
        .expect("Should create route table")
        .route_table()
        .and_then(|r| r.route_table_id())
        .expect("Route table ID in response")
        .to_string();
    ec2.create_route()
        .route_table_id(&rt_id)
        .destination_cidr_block("0.0.0.0/0")
        .gateway_id(&igw_id)
        .send()
        .await
        .expect("Should create default route");

    ec2.create_security_group()
        .group_name(&name)
        .description("net-teardown integration test")
        .vpc_id(&vpc_id)
        .send()
        .await
        .expect("Should create security group");

    let client = Ec2NetworkClient::from_context(&ctx);
    let plan = TeardownOrchestrator::new(&client, TeardownConfig::default())
        .plan(&vpc_id)
        .await
        .expect("Should plan teardown");
    assert!(plan.in_use.is_empty());
    assert_eq!(plan.resources(ResourceKind::Subnet)[0].id(), subnet_id);
    assert!(plan.route_tables_with_rules().any(|rt| rt.id() == rt_id));

    let result = TeardownOrchestrator::new(&client, TeardownConfig::default())
        .teardown(&vpc_id, DEFAULT_CONFIRMATION_PHRASE, &InUsePolicy::Abort)
        .await
        .expect("Teardown should start");

    assert_eq!(
        result.outcome(),
        TeardownOutcome::Success,
        "failures: {:?}, terminal: {:?}",
        result.failures,
        result.terminal_error
    );
    assert!(result.cleared_route_tables.contains(&rt_id));
    assert!(result.deleted_of(ResourceKind::InternetGateway).any(|r| r.id == igw_id));

    let gone = client
        .get_network(&vpc_id)
        .await
        .expect("Should describe VPCs");
    assert!(gone.is_none(), "VPC {vpc_id} still exists");
}
