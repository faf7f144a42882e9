//! Registers an OpenStack cloud, adds a scaler and a user, then lists them.
//!
//! Reads `FAYTHE_ENDPOINT`, `FAYTHE_USERNAME` and `FAYTHE_PASSWORD`; set
//! `RUST_LOG=faythe_core=debug` to see every request.
//!
//! The service derives a cloud's id from the MD5 digest of its `auth.auth_url`.
//! This demo reads the id from the registration response instead of hashing
//! locally, so it needs a service version that echoes the `id` back.

use anyhow::Context;
use faythe_client::{
    Action, AutomationEngine, CloudAuth, CloudId, CloudRegistration, FaytheClient,
    FaytheClientConfig, ListFilter, MonitorBackend, NewUser, Provider, ScalerSpec,
};
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = FaytheClientConfig::from_env().context("reading FAYTHE_* variables")?;
    let client = FaytheClient::builder(&config)
        .connect()
        .await
        .context("logging into Faythe")?;

    let registration = CloudRegistration {
        auth: CloudAuth {
            auth_url: "http://192.169.1.2:5000/v3".into(),
            username: "admin".into(),
            password: "fakepassword".into(),
            project_name: Some("admin".into()),
            domain_name: Some("Default".into()),
            region_name: Some("RegionOne".into()),
        },
        monitor: MonitorBackend {
            backend: "prometheus".into(),
            address: "http://192.169.1.3:9091/".into(),
            username: Some("admin".into()),
            password: Some("fakepassword".into()),
        },
        atengine: Some(AutomationEngine {
            backend: "stackstorm".into(),
            address: "http://192.169.1.4".into(),
            apikey: "fakepassword".into(),
        }),
        provider: "openstack".into(),
        tags: vec!["test".into()],
    };

    let created = client
        .register_cloud(&Provider::new("openstack"), &registration)
        .await?;
    println!("{created}");
    println!("{}", client.list_clouds(None, &ListFilter::new()).await?);

    let cloud_id = created
        .get("id")
        .and_then(|id| id.as_str())
        .map(CloudId::new)
        .context("registration response carried no `id`; derive it as md5(auth_url)")?;
    println!(
        "{}",
        client
            .list_clouds(Some(&cloud_id), &ListFilter::new())
            .await?
    );

    let mut actions = BTreeMap::new();
    actions.insert(
        "scale_out".to_string(),
        Action {
            kind: "http".into(),
            url: Some("http://192.169.1.2:8000/v1/signal/fakeactionurl".into()),
            method: Some("POST".into()),
            attempts: Some(4),
            delay: Some("50ms".into()),
            delay_type: Some("backoff".into()),
        },
    );
    let scaler = ScalerSpec {
        query: r#"asg:memory:avg{stack_asg_name="cloud-portal-autoscaling"} > 75"#.into(),
        duration: "5m".into(),
        interval: "60s".into(),
        actions,
        cooldown: Some("10m".into()),
        metadata: BTreeMap::from([("group".to_string(), "cloud_portal".to_string())]),
        active: true,
        tags: Vec::new(),
        description: None,
    };
    println!("{}", client.create_scaler(&cloud_id, &scaler).await?);
    println!(
        "{}",
        client.list_scalers(&cloud_id, &ListFilter::new()).await?
    );

    let user = NewUser {
        username: "newuser".into(),
        password: "newpassword".into(),
    };
    println!("{}", client.create_user(&user).await?);
    println!("{}", client.list_users(&ListFilter::new()).await?);

    Ok(())
}
