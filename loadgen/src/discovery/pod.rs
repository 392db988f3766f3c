use core::{future::Future, net::IpAddr};

use super::{endpoints, Candidate, DiscoveryError, Port, Protocol, Resolve};

/// Pod phase of pods eligible for traffic.
const RUNNING: &str = "Running";

pub const DEFAULT_SELECTOR: &str = "app=veneur-global";

#[derive(Debug, Clone, Default)]
pub struct Container {
    pub ports: Vec<Port>,
}

/// Orchestrator pod, as reported by the inventory.
#[derive(Debug, Clone)]
pub struct Pod {
    pub name: String,
    pub ip: Option<IpAddr>,
    pub phase: String,
    pub containers: Vec<Container>,
}

/// Orchestration platform pod inventory.
pub trait PodInventory {
    /// Returns pods across all namespaces matching the label selector.
    fn pods(&self, selector: &str) -> impl Future<Output = Result<Vec<Pod>, DiscoveryError>> + Send;
}

/// Resolves services into pods matching a label selector.
///
/// Pods advertise their ports, which are searched across all containers.
#[derive(Debug)]
pub struct PodResolver<I> {
    inventory: I,
    selector: String,
}

impl<I> PodResolver<I> {
    pub fn new(inventory: I) -> Self {
        Self {
            inventory,
            selector: DEFAULT_SELECTOR.to_string(),
        }
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.selector = selector.to_string();
        self
    }
}

impl<I> Resolve for PodResolver<I>
where
    I: PodInventory + Sync,
{
    async fn resolve(&self, service: &str) -> Result<Vec<String>, DiscoveryError> {
        let protocol = Protocol::from_service(service);
        let pods = self.inventory.pods(&self.selector).await?;

        let ports: Vec<Vec<Port>> = pods
            .iter()
            .map(|pod| pod.containers.iter().flat_map(|c| c.ports.iter().cloned()).collect())
            .collect();

        let candidates = pods.iter().zip(&ports).map(|(pod, ports)| Candidate {
            id: &pod.name,
            addr: pod.ip,
            ready: pod.phase == RUNNING,
            ports,
        });

        Ok(endpoints(candidates, protocol))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use super::*;
    use crate::discovery::Transport;

    #[derive(Default)]
    struct StaticInventory {
        pods: Vec<Pod>,
        selectors: Mutex<Vec<String>>,
    }

    impl PodInventory for StaticInventory {
        async fn pods(&self, selector: &str) -> Result<Vec<Pod>, DiscoveryError> {
            self.selectors.lock().unwrap().push(selector.to_string());
            Ok(self.pods.clone())
        }
    }

    fn pod(name: &str, ip: Option<&str>, phase: &str, ports: Vec<Port>) -> Pod {
        Pod {
            name: name.to_string(),
            ip: ip.map(|v| v.parse().unwrap()),
            phase: phase.to_string(),
            containers: vec![Container { ports }],
        }
    }

    fn inventory() -> StaticInventory {
        let ports = || vec![Port::tcp("http", 8127), Port::tcp("grpc", 8128)];

        let pods = vec![
            pod("global-b", Some("10.1.0.2"), "Running", ports()),
            pod("global-a", Some("10.1.0.1"), "Running", ports()),
            pod("global-pending", Some("10.1.0.3"), "Pending", ports()),
            pod("global-no-ip", None, "Running", ports()),
            pod("global-no-port", Some("10.1.0.5"), "Running", Vec::new()),
            pod(
                "global-tcp-only",
                Some("10.1.0.6"),
                "Running",
                vec![
                    Port {
                        name: "statsd".to_string(),
                        port: 8125,
                        transport: Transport::Udp,
                    },
                    Port::tcp("import", 8200),
                ],
            ),
        ];

        StaticInventory { pods, ..Default::default() }
    }

    #[tokio::test]
    async fn test_resolve_http() {
        let resolver = PodResolver::new(inventory());
        let out = resolver.resolve("veneur-global").await.unwrap();

        assert_eq!(
            vec!["http://10.1.0.1:8127", "http://10.1.0.2:8127", "http://10.1.0.6:8200"],
            out
        );
    }

    #[tokio::test]
    async fn test_resolve_grpc() {
        let resolver = PodResolver::new(inventory());
        let out = resolver.resolve("global-GRPC").await.unwrap();

        assert_eq!(vec!["10.1.0.1:8128", "10.1.0.2:8128", "10.1.0.6:8200"], out);
    }

    #[tokio::test]
    async fn test_ports_across_containers() {
        let mut p = pod("multi", Some("10.1.0.9"), "Running", vec![Port::tcp("admin", 9000)]);
        p.containers.push(Container { ports: vec![Port::tcp("grpc", 8128)] });
        let resolver = PodResolver::new(StaticInventory { pods: vec![p], ..Default::default() });

        assert_eq!(vec!["10.1.0.9:8128"], resolver.resolve("grpc").await.unwrap());
    }

    #[tokio::test]
    async fn test_selector() {
        let resolver = PodResolver::new(StaticInventory::default()).with_selector("app=ingest");
        let out = resolver.resolve("veneur-global").await.unwrap();

        assert!(out.is_empty());
        assert_eq!(vec!["app=ingest".to_string()], *resolver.inventory.selectors.lock().unwrap());
    }
}
