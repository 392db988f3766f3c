//! Destination discovery.
//!
//! Resolves a service name into the list of endpoints currently eligible to
//! receive traffic, using an external inventory of instances. The load
//! generator itself always targets a fixed endpoint, resolvers are meant for
//! deployments forwarding to a fleet of ingestion servers.

use core::{
    error::Error as StdError,
    future::Future,
    net::{IpAddr, SocketAddr},
};

use thiserror::Error;

pub use self::{
    cloud::{CloudInventoryResolver, Instance, InstanceInventory},
    pod::{Container, Pod, PodInventory, PodResolver},
};

mod cloud;
mod pod;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("inventory request failed: {0}")]
    Inventory(#[source] Box<dyn StdError + Send + Sync>),
}

/// Service name to endpoints resolution.
pub trait Resolve {
    /// Returns endpoints of ready instances of the given service, sorted.
    ///
    /// No matching instances is not an error, an empty list is returned
    /// instead.
    fn resolve(&self, service: &str) -> impl Future<Output = Result<Vec<String>, DiscoveryError>> + Send;
}

/// Protocol expected by the consumer of resolved endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Binary protocol, endpoints are formatted as "host:port".
    Grpc,
    /// Textual protocol, endpoints are formatted as "http://host:port".
    Http,
}

impl Protocol {
    /// Picks the protocol by looking for a "grpc" hint in the service name,
    /// ignoring case.
    pub fn from_service(service: &str) -> Self {
        if service.to_ascii_lowercase().contains("grpc") {
            Self::Grpc
        } else {
            Self::Http
        }
    }

    /// Name of the port serving this protocol.
    #[inline]
    pub const fn port_name(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::Http => "http",
        }
    }

    pub fn endpoint(&self, addr: SocketAddr) -> String {
        match self {
            Self::Grpc => addr.to_string(),
            Self::Http => format!("http://{addr}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

/// Port declared by an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub port: u16,
    pub transport: Transport,
}

impl Port {
    pub fn tcp(name: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            port,
            transport: Transport::Tcp,
        }
    }
}

/// Selects the port to forward to.
///
/// A port named after the protocol wins, otherwise the first TCP port is
/// taken. Zero ports are never valid.
pub fn select_port(ports: &[Port], protocol: Protocol) -> Option<u16> {
    let valid = || ports.iter().filter(|p| p.port != 0);

    valid()
        .find(|p| p.name == protocol.port_name())
        .or_else(|| valid().find(|p| p.transport == Transport::Tcp))
        .map(|p| p.port)
}

/// Inventory-agnostic view of an instance.
#[derive(Debug)]
struct Candidate<'a> {
    id: &'a str,
    addr: Option<IpAddr>,
    ready: bool,
    ports: &'a [Port],
}

/// Turns candidates into sorted endpoints, skipping those that are not ready
/// or lack either a port or an address.
fn endpoints<'a, I>(candidates: I, protocol: Protocol) -> Vec<String>
where
    I: IntoIterator<Item = Candidate<'a>>,
{
    let mut out = Vec::new();

    for candidate in candidates {
        if !candidate.ready {
            continue;
        }

        let Some(port) = select_port(candidate.ports, protocol) else {
            log::error!("could not find valid port for forwarding to {}", candidate.id);
            continue;
        };
        let Some(addr) = candidate.addr else {
            log::error!("could not find valid address for forwarding to {}", candidate.id);
            continue;
        };

        log::debug!("found {} port {port} for {}", protocol.port_name(), candidate.id);
        out.push(protocol.endpoint(SocketAddr::new(addr, port)));
    }

    out.sort();
    out
}
