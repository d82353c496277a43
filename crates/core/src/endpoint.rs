//! Canonical endpoint resolution.
//!
//! Locally-managed endpoints resolve through the endpoint store and carry
//! full workload metadata. Everything else is assembled best-effort from
//! the IP cache and the identity store. The datapath's own view of the
//! security identity wins over cached state when the two disagree.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::debug;

use flowscope_proto::flow;

use crate::getters::{EndpointGetter, IdentityGetter, IpGetter};

/// Datapath-derived context for one event, threaded through resolution so
/// identity-conflict logs carry both peers and the observation point.
#[derive(Clone, Debug, Default)]
pub struct DatapathContext {
    pub src_ip: Option<IpAddr>,
    pub src_label: u32,
    pub dst_ip: Option<IpAddr>,
    pub dst_label: u32,
    pub trace_observation_point: flow::TraceObservationPoint,
}

pub(crate) struct EndpointResolver {
    endpoints: Option<Arc<dyn EndpointGetter>>,
    identities: Option<Arc<dyn IdentityGetter>>,
    ips: Option<Arc<dyn IpGetter>>,
}

impl EndpointResolver {
    pub(crate) fn new(
        endpoints: Option<Arc<dyn EndpointGetter>>,
        identities: Option<Arc<dyn IdentityGetter>>,
        ips: Option<Arc<dyn IpGetter>>,
    ) -> Self {
        Self {
            endpoints,
            identities,
            ips,
        }
    }

    /// Resolve one side of a flow to an endpoint descriptor. Never fails;
    /// with no providers the result carries just the datapath identity.
    pub(crate) fn resolve(
        &self,
        ip: Option<IpAddr>,
        datapath_identity: u32,
        context: &DatapathContext,
    ) -> flow::Endpoint {
        if let (Some(getter), Some(addr)) = (&self.endpoints, ip) {
            if let Some(ep) = getter.endpoint_by_ip(addr) {
                let identity =
                    resolve_identity_conflict(datapath_identity, ep.identity, addr, true, context);
                return flow::Endpoint {
                    id: ep.id,
                    identity,
                    namespace: ep.namespace,
                    labels: sort_labels(ep.labels),
                    pod_name: ep.pod_name,
                    workloads: ep
                        .workloads
                        .into_iter()
                        .map(|w| flow::Workload {
                            name: w.name,
                            kind: w.kind,
                        })
                        .collect(),
                };
            }
        }

        let mut identity = datapath_identity;
        let mut namespace = String::new();
        let mut pod_name = String::new();
        if let (Some(getter), Some(addr)) = (&self.ips, ip) {
            if let Some(ip_identity) = getter.ip_identity(addr) {
                identity = resolve_identity_conflict(
                    datapath_identity,
                    ip_identity.id,
                    addr,
                    false,
                    context,
                );
                namespace = ip_identity.namespace;
                pod_name = ip_identity.pod_name;
            }
        }

        let labels = self
            .identities
            .as_ref()
            .and_then(|getter| getter.identity(identity))
            .map(|info| sort_labels(info.labels))
            .unwrap_or_default();

        flow::Endpoint {
            id: 0,
            identity,
            namespace,
            labels,
            pod_name,
            workloads: Vec::new(),
        }
    }
}

/// Prefer the datapath identity when it is set; a zero datapath identity
/// means the datapath did not classify the peer and the stored identity
/// stands.
fn resolve_identity_conflict(
    datapath_identity: u32,
    stored_identity: u32,
    ip: IpAddr,
    local_endpoint: bool,
    context: &DatapathContext,
) -> u32 {
    if datapath_identity == 0 {
        return stored_identity;
    }
    if datapath_identity != stored_identity {
        debug!(
            ip = %ip,
            datapath_identity,
            stored_identity,
            local_endpoint,
            src_ip = ?context.src_ip,
            src_label = context.src_label,
            dst_ip = ?context.dst_ip,
            dst_label = context.dst_label,
            observation_point = ?context.trace_observation_point,
            "stale identity observed, using datapath identity"
        );
    }
    datapath_identity
}

fn sort_labels(mut labels: Vec<String>) -> Vec<String> {
    labels.sort();
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::getters::{EndpointInfo, IdentityInfo, IpIdentity, Workload};
    use std::collections::HashMap;
    use std::net::Ipv4Addr;

    struct StubEndpoints(HashMap<IpAddr, EndpointInfo>);

    impl EndpointGetter for StubEndpoints {
        fn endpoint_by_ip(&self, ip: IpAddr) -> Option<EndpointInfo> {
            self.0.get(&ip).cloned()
        }

        fn endpoint_by_id(&self, id: u32) -> Option<EndpointInfo> {
            self.0.values().find(|ep| ep.id == id).cloned()
        }
    }

    struct StubIps(HashMap<IpAddr, IpIdentity>);

    impl IpGetter for StubIps {
        fn ip_identity(&self, ip: IpAddr) -> Option<IpIdentity> {
            self.0.get(&ip).cloned()
        }
    }

    struct StubIdentities;

    impl IdentityGetter for StubIdentities {
        fn identity(&self, id: u32) -> Option<IdentityInfo> {
            Some(IdentityInfo {
                id,
                labels: vec![format!("id={id}"), "app=server".into()],
            })
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn local_endpoint_carries_full_metadata() {
        let mut endpoints = HashMap::new();
        endpoints.insert(
            ip("10.0.0.1"),
            EndpointInfo {
                id: 42,
                identity: 100,
                namespace: "default".into(),
                pod_name: "client-abc".into(),
                labels: vec!["tier=frontend".into(), "app=client".into()],
                workloads: vec![Workload {
                    name: "client".into(),
                    kind: "Deployment".into(),
                }],
            },
        );
        let resolver =
            EndpointResolver::new(Some(Arc::new(StubEndpoints(endpoints))), None, None);

        let ep = resolver.resolve(Some(ip("10.0.0.1")), 100, &DatapathContext::default());
        assert_eq!(ep.id, 42);
        assert_eq!(ep.identity, 100);
        assert_eq!(ep.namespace, "default");
        assert_eq!(ep.pod_name, "client-abc");
        assert_eq!(ep.labels, vec!["app=client", "tier=frontend"]);
        assert_eq!(ep.workloads.len(), 1);
        assert_eq!(ep.workloads[0].name, "client");
    }

    #[test]
    fn datapath_identity_wins_over_cached() {
        let mut ips = HashMap::new();
        ips.insert(
            ip("10.0.0.2"),
            IpIdentity {
                id: 7777,
                namespace: "backend".into(),
                pod_name: "server-xyz".into(),
            },
        );
        let resolver = EndpointResolver::new(None, None, Some(Arc::new(StubIps(ips))));

        let ep = resolver.resolve(Some(ip("10.0.0.2")), 200, &DatapathContext::default());
        assert_eq!(ep.identity, 200);
        assert_eq!(ep.namespace, "backend");
        assert_eq!(ep.pod_name, "server-xyz");
    }

    #[test]
    fn cached_identity_used_when_datapath_is_zero() {
        let mut ips = HashMap::new();
        ips.insert(
            ip("10.0.0.2"),
            IpIdentity {
                id: 7777,
                namespace: String::new(),
                pod_name: String::new(),
            },
        );
        let resolver = EndpointResolver::new(None, None, Some(Arc::new(StubIps(ips))));

        let ep = resolver.resolve(Some(ip("10.0.0.2")), 0, &DatapathContext::default());
        assert_eq!(ep.identity, 7777);
    }

    #[test]
    fn remote_peer_labels_come_from_identity_store() {
        let resolver = EndpointResolver::new(None, Some(Arc::new(StubIdentities)), None);

        let ep = resolver.resolve(
            Some(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4))),
            5000,
            &DatapathContext::default(),
        );
        assert_eq!(ep.id, 0);
        assert_eq!(ep.identity, 5000);
        assert_eq!(ep.labels, vec!["app=server", "id=5000"]);
    }

    #[test]
    fn no_providers_yields_bare_identity() {
        let resolver = EndpointResolver::new(None, None, None);
        let ep = resolver.resolve(None, 123, &DatapathContext::default());
        assert_eq!(ep.identity, 123);
        assert!(ep.labels.is_empty());
        assert!(ep.namespace.is_empty());
    }
}
