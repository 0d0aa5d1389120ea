use cloud_provider_observer::{
    controller::{self, Context},
    crd::{FeatureGate, Infrastructure},
    events::run_event_emitter,
    init_metrics, manifests,
    observer::WATCHED_CONFIG_NAMESPACES,
    Config, ConfigMapSyncer, KubeListers, KubeRecorder,
};
use futures::{stream::StreamExt, Stream};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::Api,
    runtime::{reflector, watcher, WatchStreamExt},
    Client, Resource,
};
use serde::de::DeserializeOwned;
use std::{collections::BTreeMap, fmt::Debug, hash::Hash, sync::Arc};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

/// Start a reflector for `api` on its own task and return its store.
fn spawn_reflector<K>(api: Api<K>) -> reflector::Store<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default + Eq + Hash + Clone,
{
    let (reader, writer) = reflector::store();
    let stream = reflector(writer, watcher(api, watcher::Config::default()))
        .default_backoff()
        .touched_objects();
    tokio::spawn(drain(stream));
    reader
}

async fn drain<S, K, E>(stream: S)
where
    S: Stream<Item = Result<K, E>>,
    E: Debug,
{
    stream
        .for_each(|res| async move {
            if let Err(e) = res {
                warn!("Watch error: {:?}", e);
            }
        })
        .await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::filter::Targets::new()
        .with_target("cloud_provider_observer", tracing::Level::DEBUG);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    init_metrics();
    let config = Config::from_env()?;
    let client = Client::try_default().await?;

    if config.apply_flow_control {
        manifests::apply_flow_control(&client).await?;
    }

    let infrastructures = spawn_reflector(Api::<Infrastructure>::all(client.clone()));
    let feature_gates = spawn_reflector(Api::<FeatureGate>::all(client.clone()));
    let mut config_maps = BTreeMap::new();
    for namespace in WATCHED_CONFIG_NAMESPACES {
        let store = spawn_reflector(Api::<ConfigMap>::namespaced(client.clone(), namespace));
        config_maps.insert(namespace.to_string(), store);
    }

    infrastructures.wait_until_ready().await?;
    feature_gates.wait_until_ready().await?;
    for store in config_maps.values() {
        store.wait_until_ready().await?;
    }

    let syncer = Arc::new(ConfigMapSyncer::new());
    let listers = KubeListers::new(infrastructures, feature_gates, config_maps, syncer.clone());

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_event_emitter(
        client.clone(),
        config.target_namespace.clone(),
        rx,
    ));

    let existing = controller::load_observed(&client, &config.target_namespace).await?;
    let context = Arc::new(Context::new(
        client.clone(),
        &config,
        listers,
        syncer,
        KubeRecorder::new(tx),
        existing,
    ));

    info!(
        "Starting cloud provider observer for namespace {}, observing every {}s...",
        config.target_namespace,
        config.observe_interval.as_secs()
    );

    controller::run(context).await;
    Ok(())
}
