//! Kubernetes manifest rendering.
//!
//! Produces a `v1/List` with one `apps/v1 Deployment` and one `v1 Service`,
//! ready for `kubectl apply -f -`. kubectl accepts JSON as readily as YAML.

use serde_json::{json, Value};

use super::{DeploymentDescriptor, Routing};

/// Seconds before the first TCP health check; the service binds within a few seconds
const CHECK_INITIAL_DELAY_SECS: u32 = 2;

/// Seconds between TCP health checks
const CHECK_PERIOD_SECS: u32 = 10;

/// Render the descriptor as Kubernetes objects.
pub fn render(descriptor: &DeploymentDescriptor) -> Value {
    let name = descriptor.name();
    let port = descriptor.container_port();
    let tcp_check = json!({
        "tcpSocket": { "port": port },
        "initialDelaySeconds": CHECK_INITIAL_DELAY_SECS,
        "periodSeconds": CHECK_PERIOD_SECS,
    });

    let deployment = json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name, "labels": { "app": name } },
        "spec": {
            "replicas": descriptor.replicas(),
            "selector": { "matchLabels": { "app": name } },
            "template": {
                "metadata": { "labels": { "app": name } },
                "spec": {
                    "containers": [{
                        "name": name,
                        "image": descriptor.image(),
                        "ports": [{ "containerPort": port, "protocol": "TCP" }],
                        "env": [{ "name": "PORT", "value": port.to_string() }],
                        "readinessProbe": tcp_check,
                        "livenessProbe": tcp_check,
                    }]
                }
            }
        }
    });

    let service_spec = descriptor.service();
    let mut service_port = json!({
        "port": service_spec.exposed_port(),
        "targetPort": port,
        "protocol": "TCP",
    });
    if let Some(node_port) = service_spec.node_port() {
        service_port["nodePort"] = json!(node_port);
    }
    let service_type = match service_spec.routing() {
        Routing::ClusterLocal => "ClusterIP",
        Routing::NodeExposed => "NodePort",
    };

    let service = json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": name, "labels": { "app": name } },
        "spec": {
            "type": service_type,
            "selector": { "app": name },
            "ports": [service_port],
        }
    });

    json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [deployment, service],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(routing: &str, extra: &str) -> DeploymentDescriptor {
        format!(
            r#"
            name = "hello"
            replicas = 3
            image = "hello-service:1.0"
            containerPort = 3000

            [service]
            exposedPort = 8080
            routing = "{}"
            {}
            "#,
            routing, extra
        )
        .parse()
        .unwrap()
    }

    #[test]
    fn deployment_carries_replicas_image_and_port() {
        let list = render(&descriptor("ClusterLocal", ""));
        let deployment = &list["items"][0];
        assert_eq!(deployment["kind"], "Deployment");
        assert_eq!(deployment["spec"]["replicas"], 3);

        let container = &deployment["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["image"], "hello-service:1.0");
        assert_eq!(container["ports"][0]["containerPort"], 3000);
        assert_eq!(container["env"][0]["value"], "3000");
        assert_eq!(container["readinessProbe"]["tcpSocket"]["port"], 3000);
        assert_eq!(container["livenessProbe"]["tcpSocket"]["port"], 3000);
    }

    #[test]
    fn selector_matches_pod_labels() {
        let list = render(&descriptor("ClusterLocal", ""));
        let pod_labels = &list["items"][0]["spec"]["template"]["metadata"]["labels"];
        assert_eq!(&list["items"][0]["spec"]["selector"]["matchLabels"], pod_labels);
        assert_eq!(&list["items"][1]["spec"]["selector"], pod_labels);
    }

    #[test]
    fn cluster_local_is_cluster_ip() {
        let list = render(&descriptor("ClusterLocal", ""));
        let service = &list["items"][1];
        assert_eq!(service["spec"]["type"], "ClusterIP");
        assert_eq!(service["spec"]["ports"][0]["port"], 8080);
        assert_eq!(service["spec"]["ports"][0]["targetPort"], 3000);
        assert!(service["spec"]["ports"][0].get("nodePort").is_none());
    }

    #[test]
    fn node_exposed_is_node_port() {
        let list = render(&descriptor("NodeExposed", "nodePort = 30080"));
        let service = &list["items"][1];
        assert_eq!(service["spec"]["type"], "NodePort");
        assert_eq!(service["spec"]["ports"][0]["nodePort"], 30080);
    }
}
