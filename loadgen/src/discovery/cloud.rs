use core::{future::Future, net::IpAddr};

use super::{endpoints, Candidate, DiscoveryError, Port, Protocol, Resolve};

/// Lifecycle state of instances eligible for traffic.
const IN_SERVICE: &str = "InService";

/// Cloud instance, as reported by the inventory.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: String,
    pub private_ip: Option<IpAddr>,
    /// Lifecycle state within its scaling group.
    pub lifecycle_state: String,
}

/// Cloud inventory service.
pub trait InstanceInventory {
    /// Returns instances carrying the given tag key.
    fn instances(&self, tag_key: &str) -> impl Future<Output = Result<Vec<Instance>, DiscoveryError>> + Send;
}

/// Resolves services into cloud instances tagged with the service name.
///
/// Instances do not advertise ports, so all of them are assumed to listen on
/// the same, configured ones.
#[derive(Debug)]
pub struct CloudInventoryResolver<I> {
    inventory: I,
    ports: Vec<Port>,
}

impl<I> CloudInventoryResolver<I> {
    pub fn new(inventory: I) -> Self {
        let ports = vec![Port::tcp("http", 8127), Port::tcp("grpc", 8128)];

        Self { inventory, ports }
    }

    pub fn with_ports(mut self, ports: Vec<Port>) -> Self {
        self.ports = ports;
        self
    }
}

impl<I> Resolve for CloudInventoryResolver<I>
where
    I: InstanceInventory + Sync,
{
    async fn resolve(&self, service: &str) -> Result<Vec<String>, DiscoveryError> {
        let protocol = Protocol::from_service(service);
        let instances = self.inventory.instances(service).await?;

        let candidates = instances.iter().map(|v| Candidate {
            id: &v.id,
            addr: v.private_ip,
            ready: v.lifecycle_state == IN_SERVICE,
            ports: &self.ports,
        });

        Ok(endpoints(candidates, protocol))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct StaticInventory(Vec<Instance>);

    impl InstanceInventory for StaticInventory {
        async fn instances(&self, _tag_key: &str) -> Result<Vec<Instance>, DiscoveryError> {
            Ok(self.0.clone())
        }
    }

    struct FailingInventory;

    impl InstanceInventory for FailingInventory {
        async fn instances(&self, _tag_key: &str) -> Result<Vec<Instance>, DiscoveryError> {
            Err(DiscoveryError::Inventory("access denied".into()))
        }
    }

    fn instance(id: &str, ip: Option<&str>, state: &str) -> Instance {
        Instance {
            id: id.to_string(),
            private_ip: ip.map(|v| v.parse().unwrap()),
            lifecycle_state: state.to_string(),
        }
    }

    fn inventory() -> StaticInventory {
        StaticInventory(vec![
            instance("i-3", Some("10.0.0.3"), "InService"),
            instance("i-1", Some("10.0.0.1"), "InService"),
            instance("i-2", Some("10.0.0.2"), "Terminating"),
            instance("i-4", None, "InService"),
        ])
    }

    #[tokio::test]
    async fn test_resolve_http() {
        let resolver = CloudInventoryResolver::new(inventory());
        let out = resolver.resolve("veneur-global").await.unwrap();

        assert_eq!(vec!["http://10.0.0.1:8127", "http://10.0.0.3:8127"], out);
    }

    #[tokio::test]
    async fn test_resolve_grpc() {
        let resolver = CloudInventoryResolver::new(inventory());
        let out = resolver.resolve("veneur-gRPC-global").await.unwrap();

        assert_eq!(vec!["10.0.0.1:8128", "10.0.0.3:8128"], out);
    }

    #[tokio::test]
    async fn test_resolve_custom_ports() {
        let resolver = CloudInventoryResolver::new(inventory()).with_ports(vec![Port::tcp("http", 80)]);
        let out = resolver.resolve("grpc").await.unwrap();

        // No "grpc" port, so the first TCP one is used.
        assert_eq!(vec!["10.0.0.1:80", "10.0.0.3:80"], out);
    }

    #[tokio::test]
    async fn test_resolve_nothing() {
        let resolver = CloudInventoryResolver::new(StaticInventory(Vec::new()));

        assert!(resolver.resolve("veneur-global").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inventory_error_is_propagated() {
        let resolver = CloudInventoryResolver::new(FailingInventory);

        assert!(resolver.resolve("veneur-global").await.is_err());
    }
}
