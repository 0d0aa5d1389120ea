#[cfg(test)]
mod tests {
    use cloud_provider_observer::{ConfigMapSyncer, ResourceLocation, ResourceSyncer};
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::api::{Api, DeleteParams, PostParams};
    use kube::Client;
    use rand::{distr::Alphanumeric, rng, Rng};
    use std::collections::BTreeMap;

    const NAMESPACE: &str = "default";

    /// Generate a random config map name suffix
    fn random_suffix(length: usize) -> String {
        rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    /// Create a config map holding a cloud config
    async fn create_config_map(
        client: &Client,
        name: &str,
        contents: &str,
    ) -> Result<(), anyhow::Error> {
        let cms: Api<ConfigMap> = Api::namespaced(client.clone(), NAMESPACE);
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                "cloud.conf".to_string(),
                contents.to_string(),
            )])),
            ..Default::default()
        };
        cms.create(&PostParams::default(), &cm).await?;
        Ok(())
    }

    /// Poll until a config map does or does not exist
    async fn wait_for_config_map(
        client: &Client,
        name: &str,
        should_exist: bool,
    ) -> Result<Option<ConfigMap>, anyhow::Error> {
        let cms: Api<ConfigMap> = Api::namespaced(client.clone(), NAMESPACE);
        let interval = std::time::Duration::from_millis(200);
        let timeout = std::time::Duration::from_secs(15);
        let start = std::time::Instant::now();
        loop {
            let cm = cms.get_opt(name).await?;
            if cm.is_some() == should_exist {
                return Ok(cm);
            }
            if start.elapsed() > timeout {
                anyhow::bail!(
                    "Timeout waiting for config map {} (should_exist: {})",
                    name,
                    should_exist
                );
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Syncing copies the source and an empty source removes the copy
    #[tokio::test]
    #[ignore = "requires a Kubernetes cluster"]
    async fn test_sync_and_remove() {
        let client = Client::try_default().await.unwrap();
        let suffix = random_suffix(10);
        let source_name = format!("test-source-{}", suffix);
        let destination_name = format!("test-cloud-config-{}", suffix);

        create_config_map(&client, &source_name, "[Global]\nregion = eu-west-1\n")
            .await
            .unwrap();

        let syncer = ConfigMapSyncer::new();
        let destination = ResourceLocation::new(NAMESPACE, destination_name.clone());
        syncer
            .sync_config_map(
                destination.clone(),
                ResourceLocation::new(NAMESPACE, source_name.clone()),
            )
            .unwrap();
        syncer.reconcile(&client).await.unwrap();

        let copied = wait_for_config_map(&client, &destination_name, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            copied
                .data
                .as_ref()
                .and_then(|data| data.get("cloud.conf"))
                .map(String::as_str),
            Some("[Global]\nregion = eu-west-1\n")
        );

        // Reconciling again is a no-op
        syncer.reconcile(&client).await.unwrap();

        syncer
            .sync_config_map(destination, ResourceLocation::default())
            .unwrap();
        syncer.reconcile(&client).await.unwrap();
        wait_for_config_map(&client, &destination_name, false)
            .await
            .unwrap();

        // Removing a config map that is already gone succeeds
        syncer.reconcile(&client).await.unwrap();

        // Cleanup
        let cms: Api<ConfigMap> = Api::namespaced(client.clone(), NAMESPACE);
        cms.delete(&source_name, &DeleteParams::default()).await.ok();
    }
}
