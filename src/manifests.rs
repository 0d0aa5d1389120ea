use crate::{Result, SERVICE_NAME};
use k8s_openapi::api::flowcontrol::v1::{FlowSchema, PriorityLevelConfiguration};
use kube::{
    api::{Api, Patch, PatchParams, ResourceExt},
    Client,
};
use serde::de::DeserializeOwned;
use tracing::info;

pub const PRIORITY_LEVEL_YAML: &str = include_str!("../manifests/priority-level.yaml");
pub const FLOW_SCHEMAS_YAML: &str = include_str!("../manifests/flowschemas.yaml");

pub fn priority_levels() -> Result<Vec<PriorityLevelConfiguration>> {
    parse_documents(PRIORITY_LEVEL_YAML)
}

pub fn flow_schemas() -> Result<Vec<FlowSchema>> {
    parse_documents(FLOW_SCHEMAS_YAML)
}

fn parse_documents<T: DeserializeOwned>(yaml: &str) -> Result<Vec<T>> {
    serde_yaml::Deserializer::from_str(yaml)
        .map(|document| serde::Deserialize::deserialize(document).map_err(Into::into))
        .collect()
}

/// Server-side apply the bundled flow-control objects.
pub async fn apply_flow_control(client: &Client) -> Result<()> {
    let patch_params = PatchParams::apply(SERVICE_NAME).force();

    let priority_level_api: Api<PriorityLevelConfiguration> = Api::all(client.clone());
    for priority_level in priority_levels()? {
        let name = priority_level.name_any();
        priority_level_api
            .patch(&name, &patch_params, &Patch::Apply(&priority_level))
            .await?;
        info!("Applied PriorityLevelConfiguration '{}'", name);
    }

    let flow_schema_api: Api<FlowSchema> = Api::all(client.clone());
    for flow_schema in flow_schemas()? {
        let name = flow_schema.name_any();
        flow_schema_api
            .patch(&name, &patch_params, &Patch::Apply(&flow_schema))
            .await?;
        info!("Applied FlowSchema '{}'", name);
    }

    Ok(())
}
