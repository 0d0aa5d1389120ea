#[cfg(test)]
mod tests {
    use cloud_provider_observer::manifests::{flow_schemas, priority_levels};
    use kube::ResourceExt;

    /// The control plane operator priority level queues requests
    #[test]
    fn test_priority_level() {
        let levels = priority_levels().unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].name_any(), "openshift-control-plane-operators");

        let spec = levels[0].spec.as_ref().unwrap();
        assert_eq!(spec.type_, "Limited");
        let queuing = spec
            .limited
            .as_ref()
            .and_then(|limited| limited.limit_response.as_ref())
            .and_then(|response| response.queuing.as_ref())
            .unwrap();
        assert_eq!(queuing.queue_length_limit, Some(50));
        assert_eq!(queuing.queues, Some(128));
        assert_eq!(queuing.hand_size, Some(6));
    }

    /// Each flow schema routes one service account to its priority level
    #[test]
    fn test_flow_schemas() {
        let schemas = flow_schemas().unwrap();
        let routes: Vec<(String, String, String)> = schemas
            .iter()
            .map(|schema| {
                let spec = schema.spec.as_ref().unwrap();
                let rules = spec.rules.as_ref().unwrap();
                assert_eq!(rules.len(), 1);
                let account = rules[0].subjects[0].service_account.as_ref().unwrap();
                (
                    account.namespace.clone(),
                    account.name.clone(),
                    spec.priority_level_configuration.name.clone(),
                )
            })
            .collect();

        assert_eq!(
            routes,
            vec![
                (
                    "openshift-kube-apiserver-operator".to_string(),
                    "kube-apiserver-operator".to_string(),
                    "openshift-control-plane-operators".to_string(),
                ),
                (
                    "openshift-monitoring".to_string(),
                    "prometheus-k8s".to_string(),
                    "workload-high".to_string(),
                ),
            ]
        );
    }
}
