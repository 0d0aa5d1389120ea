use crate::{
    config::Config,
    events::KubeRecorder,
    listers::KubeListers,
    observer::CloudProviderObserver,
    sync::ConfigMapSyncer,
    Error, Result, ERRORS_TOTAL, OBSERVATIONS_TOTAL, SERVICE_NAME,
};
use k8s_openapi::{api::core::v1::ConfigMap, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use kube::{
    api::{Api, Patch, PatchParams},
    Client,
};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Config map in the target namespace holding the last observed configuration.
pub const OBSERVED_CONFIG_MAP: &str = "cloud-provider-observed-config";
pub const OBSERVED_CONFIG_KEY: &str = "config.json";
const REQUEUE_TIME: Duration = Duration::from_secs(2);
const MAX_RETRY_TIME: Duration = Duration::from_secs(3600);

/// State shared by the observation loop
pub struct Context {
    client: Client,
    observer: CloudProviderObserver,
    listers: KubeListers,
    syncer: Arc<ConfigMapSyncer>,
    recorder: KubeRecorder,
    observed: Mutex<Value>,
    attempt: AtomicU32,
    interval: Duration,
}

impl Context {
    pub fn new(
        client: Client,
        config: &Config,
        listers: KubeListers,
        syncer: Arc<ConfigMapSyncer>,
        recorder: KubeRecorder,
        existing: Value,
    ) -> Self {
        Self {
            client,
            observer: CloudProviderObserver::new(
                config.target_namespace.clone(),
                config.paths.clone(),
            ),
            listers,
            syncer,
            recorder,
            observed: Mutex::new(existing),
            attempt: AtomicU32::new(0),
            interval: config.observe_interval,
        }
    }

    fn cm_api(&self) -> Api<ConfigMap> {
        Api::<ConfigMap>::namespaced(self.client.clone(), self.observer.target_namespace())
    }
}

/// Load the previously persisted observed configuration, or an empty tree.
pub async fn load_observed(client: &Client, namespace: &str) -> Result<Value> {
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let Some(cm) = api.get_opt(OBSERVED_CONFIG_MAP).await? else {
        debug!("No observed config found in namespace '{}'", namespace);
        return Ok(Value::Object(Default::default()));
    };
    match cm.data.as_ref().and_then(|data| data.get(OBSERVED_CONFIG_KEY)) {
        Some(raw) => Ok(serde_json::from_str(raw)?),
        None => Ok(Value::Object(Default::default())),
    }
}

/// Run one observation pass: observe, carry out config map syncs and persist
/// the result if it changed.
pub async fn observe_once(ctx: &Context) -> Result<()> {
    let mut observed = ctx.observed.lock().await;

    let observation = ctx
        .observer
        .observe(&ctx.listers, &ctx.recorder, &*observed);
    let rendered = observation.render(ctx.observer.paths())?;

    if rendered != *observed {
        persist_observed(ctx, &rendered).await?;
        info!("Observed config changed to {}", rendered);
        *observed = rendered;
    }

    ctx.syncer.reconcile(&ctx.client).await?;

    if observation.errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Observation(observation.errors))
    }
}

async fn persist_observed(ctx: &Context, rendered: &Value) -> Result<()> {
    let mut data = BTreeMap::new();
    data.insert(
        OBSERVED_CONFIG_KEY.to_string(),
        serde_json::to_string(rendered).map_err(Error::Serialization)?,
    );

    let cm = ConfigMap {
        metadata: ObjectMeta {
            name: Some(OBSERVED_CONFIG_MAP.to_string()),
            namespace: Some(ctx.observer.target_namespace().to_string()),
            ..Default::default()
        },
        data: Some(data),
        binary_data: None,
        immutable: None,
    };

    let patch_params = PatchParams::apply(SERVICE_NAME).force();
    ctx.cm_api()
        .patch(OBSERVED_CONFIG_MAP, &patch_params, &Patch::Apply(&cm))
        .await
        .map_err(|e| {
            ERRORS_TOTAL
                .with_label_values(&["configmap", "patch_error"])
                .inc();
            Error::Kube(e)
        })?;
    Ok(())
}

/// Observe forever, backing off exponentially while passes fail.
pub async fn run(ctx: Arc<Context>) {
    loop {
        let delay = match observe_once(&ctx).await {
            Ok(()) => {
                OBSERVATIONS_TOTAL.with_label_values(&["ok"]).inc();
                ctx.attempt.store(0, Ordering::SeqCst);
                ctx.interval
            }
            Err(e) => {
                OBSERVATIONS_TOTAL.with_label_values(&["error"]).inc();
                error_policy(&e, &ctx)
            }
        };
        debug!("Next observation in {}s", delay.as_secs());
        tokio::time::sleep(delay).await;
    }
}

/// Exponential backoff on error
fn error_policy(error: &Error, ctx: &Context) -> Duration {
    error!("Observation failed: {}", error);
    let attempt = ctx.attempt.fetch_add(1, Ordering::SeqCst) + 1;
    let delay = next_delay(attempt);
    if delay == MAX_RETRY_TIME {
        warn!("Observation has failed {} times in a row", attempt);
    }
    delay
}

/// Delay before retrying after `attempt` consecutive failures.
pub fn next_delay(attempt: u32) -> Duration {
    let base_secs = REQUEUE_TIME.as_secs();
    let max_secs = MAX_RETRY_TIME.as_secs();
    let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(base_secs.saturating_mul(factor).min(max_secs))
}
