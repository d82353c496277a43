//! Metadata provider contracts.
//!
//! Every provider is optional; a missing provider (or a miss on a present
//! one) degrades the flow to empty strings and absent fields, never to an
//! error. Implementations must be thread-safe: the parser holds them by
//! shared reference and is itself shared across decoder threads.

use std::net::IpAddr;
use std::sync::Arc;

use flowscope_proto::flow;

/// A datapath-managed workload known to this node.
#[derive(Clone, Debug, Default)]
pub struct EndpointInfo {
    pub id: u32,
    pub identity: u32,
    pub namespace: String,
    pub pod_name: String,
    pub labels: Vec<String>,
    pub workloads: Vec<Workload>,
}

#[derive(Clone, Debug, Default)]
pub struct Workload {
    pub name: String,
    pub kind: String,
}

/// A security identity and its label set.
#[derive(Clone, Debug, Default)]
pub struct IdentityInfo {
    pub id: u32,
    pub labels: Vec<String>,
}

/// Identity metadata attached to an IP in the agent's IP cache.
#[derive(Clone, Debug, Default)]
pub struct IpIdentity {
    pub id: u32,
    pub namespace: String,
    pub pod_name: String,
}

/// Lookup of locally-managed endpoints.
pub trait EndpointGetter: Send + Sync {
    fn endpoint_by_ip(&self, ip: IpAddr) -> Option<EndpointInfo>;
    fn endpoint_by_id(&self, id: u32) -> Option<EndpointInfo>;
}

/// Lookup of security identities by numeric id.
pub trait IdentityGetter: Send + Sync {
    fn identity(&self, id: u32) -> Option<IdentityInfo>;
}

/// Lookup of DNS names an endpoint has resolved for a peer IP.
pub trait DnsGetter: Send + Sync {
    fn names_of(&self, endpoint_id: u32, ip: IpAddr) -> Vec<String>;
}

/// Lookup of IP-to-identity mappings for remote peers.
pub trait IpGetter: Send + Sync {
    fn ip_identity(&self, ip: IpAddr) -> Option<IpIdentity>;
}

/// Lookup of services by frontend address.
pub trait ServiceGetter: Send + Sync {
    fn service_by_addr(&self, ip: IpAddr, port: u16) -> Option<flow::Service>;
}

/// Cached interface-index-to-name lookup.
pub trait LinkGetter: Send + Sync {
    /// Returns `None` when the index is not cached; the flow then carries
    /// an empty name.
    fn if_name_cached(&self, ifindex: u32) -> Option<String>;
}

/// The full set of metadata providers handed to the parser at construction.
/// Every slot may be left `None`.
#[derive(Clone, Default)]
pub struct Getters {
    pub endpoints: Option<Arc<dyn EndpointGetter>>,
    pub identities: Option<Arc<dyn IdentityGetter>>,
    pub dns: Option<Arc<dyn DnsGetter>>,
    pub ips: Option<Arc<dyn IpGetter>>,
    pub services: Option<Arc<dyn ServiceGetter>>,
    pub links: Option<Arc<dyn LinkGetter>>,
}
