//! L3/L4 monitor event parser.
//!
//! `Parser::decode` turns one raw monitor event into a flow record: it
//! classifies the event by its leading tag byte, decodes the matching
//! header, decodes the embedded packet bytes through the shared layer
//! workspace, and derives every flow field from the header variant plus
//! the decoded layers. Metadata lookups are best-effort throughout.
//!
//! A parser is long-lived and may be shared by reference across decoder
//! threads; only the packet workspace is serialized, behind its mutex.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use tracing::debug;

use flowscope_proto::flow;

use crate::correlation::PolicyCorrelator;
use crate::endpoint::{DatapathContext, EndpointResolver};
use crate::errors::{EventVariant, ParseError};
use crate::event::{
    DebugCapture, DropNotify, MonitorEvent, PolicyVerdictNotify, TraceNotify, DBG_CAPTURE_AFTER_V46,
    DBG_CAPTURE_AFTER_V64, DBG_CAPTURE_DELIVERY, DBG_CAPTURE_FROM_LB, DBG_CAPTURE_PROXY_POST,
    DBG_CAPTURE_PROXY_PRE, DBG_CAPTURE_SNAT_POST, DBG_CAPTURE_SNAT_PRE, DEBUG_CAPTURE_LEN,
    MESSAGE_TYPE_CAPTURE, MESSAGE_TYPE_DROP, MESSAGE_TYPE_POLICY_VERDICT, MESSAGE_TYPE_TRACE,
    POLICY_VERDICT_NOTIFY_LEN, TRACE_REASON_CT_ESTABLISHED, TRACE_REASON_CT_RELATED,
    TRACE_REASON_CT_REOPENED, TRACE_REASON_CT_REPLY, TRACE_REASON_ENCRYPT_OVERLAY,
    TRACE_REASON_POLICY, TRACE_REASON_SRV6_DECAP, TRACE_REASON_SRV6_ENCAP, TRACE_TO_PROXY,
};
use crate::getters::{
    DnsGetter, EndpointGetter, Getters, LinkGetter, ServiceGetter,
};
use crate::layers::{decode_layers, PacketWorkspace};
use crate::options::Options;

/// Parser for L3/L4 monitor events.
pub struct Parser {
    endpoints: Option<Arc<dyn EndpointGetter>>,
    dns: Option<Arc<dyn DnsGetter>>,
    services: Option<Arc<dyn ServiceGetter>>,
    links: Option<Arc<dyn LinkGetter>>,
    correlator: Option<Arc<dyn PolicyCorrelator>>,

    resolver: EndpointResolver,
    correlate_l3l4_policy: bool,

    packet: Mutex<PacketWorkspace>,
}

impl Parser {
    pub fn new(
        getters: Getters,
        correlator: Option<Arc<dyn PolicyCorrelator>>,
        options: Options,
    ) -> Self {
        let resolver = EndpointResolver::new(
            getters.endpoints.clone(),
            getters.identities.clone(),
            getters.ips.clone(),
        );
        Self {
            endpoints: getters.endpoints,
            dns: getters.dns,
            services: getters.services,
            links: getters.links,
            correlator,
            resolver,
            correlate_l3l4_policy: options.enable_network_policy_correlation,
            packet: Mutex::new(PacketWorkspace::default()),
        }
    }

    /// Decode one monitor event into `flow`.
    ///
    /// On error the flow is left partially populated and must not be
    /// consumed.
    pub fn decode(&self, data: &[u8], flow: &mut flow::Flow) -> Result<(), ParseError> {
        if data.is_empty() {
            return Err(ParseError::EmptyData);
        }

        let event_type = data[0];
        let (event, packet_offset, event_sub_type) = match event_type {
            MESSAGE_TYPE_DROP => {
                let dn = DropNotify::decode(data)
                    .map_err(|e| ParseError::header(EventVariant::Drop, e))?;
                let offset = dn.data_offset();
                let sub_type = dn.sub_type;
                (MonitorEvent::Drop(dn), offset, sub_type)
            }
            MESSAGE_TYPE_TRACE => {
                let tn = TraceNotify::decode(data)
                    .map_err(|e| ParseError::header(EventVariant::Trace, e))?;
                // The datapath reports "to endpoint" as zero; substitute the
                // explicit value so zero never doubles as "unset".
                flow.trace_observation_point = if tn.obs_point != 0 {
                    i32::from(tn.obs_point)
                } else {
                    flow::TraceObservationPoint::ToEndpoint.into()
                };
                let offset = tn.data_offset();
                let sub_type = tn.obs_point;
                (MonitorEvent::Trace(tn), offset, sub_type)
            }
            MESSAGE_TYPE_POLICY_VERDICT => {
                let pvn = PolicyVerdictNotify::decode(data)
                    .map_err(|e| ParseError::header(EventVariant::PolicyVerdict, e))?;
                flow.auth_type = i32::from(pvn.auth_type);
                let sub_type = pvn.sub_type;
                (
                    MonitorEvent::PolicyVerdict(pvn),
                    POLICY_VERDICT_NOTIFY_LEN,
                    sub_type,
                )
            }
            MESSAGE_TYPE_CAPTURE => {
                let dbg = DebugCapture::decode(data)
                    .map_err(|e| ParseError::header(EventVariant::DebugCapture, e))?;
                let sub_type = dbg.sub_type;
                (MonitorEvent::DebugCapture(dbg), DEBUG_CAPTURE_LEN, sub_type)
            }
            other => return Err(ParseError::InvalidType(other)),
        };

        if data.len() < packet_offset {
            return Err(ParseError::Truncated {
                len: data.len(),
                offset: packet_offset,
            });
        }

        let (is_l3_device, is_ipv6, is_vxlan, is_geneve) = match &event {
            MonitorEvent::Drop(dn) => {
                (dn.is_l3_device(), dn.is_ipv6(), dn.is_vxlan(), dn.is_geneve())
            }
            MonitorEvent::Trace(tn) => {
                (tn.is_l3_device(), tn.is_ipv6(), tn.is_vxlan(), tn.is_geneve())
            }
            _ => (false, false, false, false),
        };

        let mut decoded = {
            let mut workspace = self.packet.lock().expect("lock poisoned");
            decode_layers(
                &data[packet_offset..],
                &mut workspace,
                is_l3_device,
                is_ipv6,
                is_vxlan,
                is_geneve,
            )?
        };

        let mut src_ip = decoded.src_ip;
        let dst_ip = decoded.dst_ip;

        if let MonitorEvent::Trace(tn) = &event {
            if let Some(ip) = decoded.ip.as_mut() {
                if let Some(orig) = tn.original_ip() {
                    // On SNAT the header carries the post-translation source
                    // and the notification the pre-translation one. Lookups
                    // use the original; the flow keeps both when they differ.
                    src_ip = Some(orig);
                    let orig_str = orig.to_string();
                    if ip.source != orig_str {
                        ip.source_xlated = std::mem::replace(&mut ip.source, orig_str);
                    }
                }
                ip.encrypted = tn.is_encrypted();
            }
        }

        let (src_label, dst_label) = decode_security_identities(&event);
        let context = DatapathContext {
            src_ip,
            src_label,
            dst_ip,
            dst_label,
            trace_observation_point: flow.trace_observation_point(),
        };
        let src_endpoint = self.resolver.resolve(src_ip, src_label, &context);
        let dst_endpoint = self.resolver.resolve(dst_ip, dst_label, &context);
        let (src_endpoint_id, dst_endpoint_id) = (src_endpoint.id, dst_endpoint.id);

        let (source_service, destination_service) = match &self.services {
            Some(getter) => (
                src_ip.and_then(|ip| getter.service_by_addr(ip, decoded.src_port)),
                dst_ip.and_then(|ip| getter.service_by_addr(ip, decoded.dst_port)),
            ),
            None => (None, None),
        };

        flow.verdict = decode_verdict(&event).into();
        flow.drop_reason = decode_drop_reason(&event);
        flow.drop_reason_desc = flow.drop_reason as i32;
        flow.file = decode_file_info(&event);
        flow.ethernet = decoded.ethernet.take();
        flow.ip = decoded.ip.take();
        flow.l4 = decoded.l4.take();
        flow.tunnel = decoded.tunnel.take();
        flow.source = Some(src_endpoint);
        flow.destination = Some(dst_endpoint);
        flow.r#type = flow::FlowType::L3L4.into();
        // Each endpoint's DNS cache holds the names it resolved for its
        // peer, so the lookups cross sides on purpose.
        flow.source_names = self.resolve_names(dst_endpoint_id, src_ip);
        flow.destination_names = self.resolve_names(src_endpoint_id, dst_ip);
        flow.l7 = None;
        flow.is_reply = decode_is_reply(&event);
        flow.reply = flow.is_reply.unwrap_or_default();
        flow.traffic_direction = decode_traffic_direction(src_endpoint_id, &event).into();
        flow.event_type = Some(flow::DatapathEventType {
            r#type: i32::from(event_type),
            sub_type: i32::from(event_sub_type),
        });
        flow.trace_reason = decode_trace_reason(&event).into();
        flow.source_service = source_service;
        flow.destination_service = destination_service;
        flow.policy_match_type = decode_policy_match_type(&event);
        flow.debug_capture_point = decode_debug_capture_point(&event).into();
        flow.interface = self.decode_network_interface(&event);
        flow.proxy_port = decode_proxy_port(&event);
        flow.summary = std::mem::take(&mut decoded.summary);

        if self.correlate_l3l4_policy {
            if let (Some(correlator), Some(endpoints)) = (&self.correlator, &self.endpoints) {
                if let Err(error) = correlator.correlate(endpoints.as_ref(), flow) {
                    debug!(error = %error, "policy correlation failed");
                }
            }
        }

        Ok(())
    }

    fn resolve_names(&self, endpoint_id: u32, ip: Option<IpAddr>) -> Vec<String> {
        match (&self.dns, ip) {
            (Some(getter), Some(ip)) => getter.names_of(endpoint_id, ip),
            _ => Vec::new(),
        }
    }

    fn decode_network_interface(&self, event: &MonitorEvent) -> Option<flow::NetworkInterface> {
        let ifindex = match event {
            MonitorEvent::Trace(tn) => tn.ifindex,
            MonitorEvent::DebugCapture(dbg) => match dbg.sub_type {
                DBG_CAPTURE_DELIVERY
                | DBG_CAPTURE_FROM_LB
                | DBG_CAPTURE_AFTER_V46
                | DBG_CAPTURE_AFTER_V64
                | DBG_CAPTURE_SNAT_PRE
                | DBG_CAPTURE_SNAT_POST => dbg.arg1,
                _ => 0,
            },
            _ => 0,
        };
        if ifindex == 0 {
            return None;
        }

        let name = self
            .links
            .as_ref()
            .and_then(|getter| getter.if_name_cached(ifindex))
            .unwrap_or_default();
        Some(flow::NetworkInterface {
            index: ifindex,
            name,
        })
    }
}

fn decode_verdict(event: &MonitorEvent) -> flow::Verdict {
    match event {
        MonitorEvent::Drop(_) => flow::Verdict::Dropped,
        MonitorEvent::Trace(_) => flow::Verdict::Forwarded,
        MonitorEvent::PolicyVerdict(pvn) => {
            if pvn.verdict < 0 {
                flow::Verdict::Dropped
            } else if pvn.verdict > 0 {
                flow::Verdict::Redirected
            } else if pvn.is_audited() {
                flow::Verdict::Audit
            } else {
                flow::Verdict::Forwarded
            }
        }
        MonitorEvent::DebugCapture(_) => flow::Verdict::VerdictUnknown,
    }
}

fn decode_drop_reason(event: &MonitorEvent) -> u32 {
    match event {
        MonitorEvent::Drop(dn) => u32::from(dn.sub_type),
        // A dropped flow's verdict equals the negative of the drop reason.
        MonitorEvent::PolicyVerdict(pvn) if pvn.verdict < 0 => pvn.verdict.unsigned_abs(),
        _ => 0,
    }
}

fn decode_file_info(event: &MonitorEvent) -> Option<flow::FileInfo> {
    match event {
        MonitorEvent::Drop(dn) => Some(flow::FileInfo {
            name: datapath_file_name(dn.file).to_string(),
            line: u32::from(dn.line),
        }),
        _ => None,
    }
}

/// Map a drop notification's numeric file id to the datapath object name.
fn datapath_file_name(file: u8) -> &'static str {
    match file {
        1 => "bpf_host.c",
        2 => "bpf_lxc.c",
        3 => "bpf_network.c",
        4 => "bpf_overlay.c",
        5 => "bpf_sock.c",
        6 => "bpf_xdp.c",
        7 => "bpf_wireguard.c",
        _ => "",
    }
}

fn decode_security_identities(event: &MonitorEvent) -> (u32, u32) {
    match event {
        MonitorEvent::Drop(dn) => (dn.src_label, dn.dst_label),
        MonitorEvent::Trace(tn) => (tn.src_label, tn.dst_label),
        // A verdict only names the remote peer; the local side stays zero.
        MonitorEvent::PolicyVerdict(pvn) => {
            if pvn.is_ingress() {
                (pvn.remote_label, 0)
            } else {
                (0, pvn.remote_label)
            }
        }
        MonitorEvent::DebugCapture(_) => (0, 0),
    }
}

fn decode_traffic_direction(src_endpoint_id: u32, event: &MonitorEvent) -> flow::TrafficDirection {
    match event {
        // A drop at the endpoint that also sent the packet is an egress
        // flow. Drops are assumed not to be replies of ongoing connections.
        MonitorEvent::Drop(dn) if dn.source != 0 => {
            if u32::from(dn.source) == src_endpoint_id {
                flow::TrafficDirection::Egress
            } else {
                flow::TrafficDirection::Ingress
            }
        }
        // Traces may be replies; the connection-tracking reason inverts the
        // direction for those.
        MonitorEvent::Trace(tn) if tn.source != 0 && tn.reason_is_known() => {
            let is_source_endpoint = u32::from(tn.source) == src_endpoint_id;
            let is_snated = tn.original_ip().is_some();
            let is_reply = tn.reason_is_reply();

            // Encrypt-overlay traces sit on the to-stack path but originate
            // from this node and leave it; expose them as egress.
            if tn.trace_reason() == TRACE_REASON_ENCRYPT_OVERLAY
                || is_source_endpoint != is_reply
                || is_snated
            {
                flow::TrafficDirection::Egress
            } else {
                flow::TrafficDirection::Ingress
            }
        }
        MonitorEvent::PolicyVerdict(pvn) => {
            if pvn.is_ingress() {
                flow::TrafficDirection::Ingress
            } else {
                flow::TrafficDirection::Egress
            }
        }
        _ => flow::TrafficDirection::TrafficDirectionUnknown,
    }
}

fn decode_is_reply(event: &MonitorEvent) -> Option<bool> {
    match event {
        MonitorEvent::Trace(tn) if tn.reason_is_known() => {
            // Encap/decap traces carry tunnel CT state, not the flow's own.
            if tn.reason_is_encap() || tn.reason_is_decap() {
                None
            } else {
                Some(tn.reason_is_reply())
            }
        }
        // Forwarded verdicts are emitted for the first packet of a
        // connection, so they are never replies.
        MonitorEvent::PolicyVerdict(pvn) if pvn.verdict >= 0 => Some(false),
        _ => None,
    }
}

fn decode_trace_reason(event: &MonitorEvent) -> flow::TraceReason {
    let MonitorEvent::Trace(tn) = event else {
        return flow::TraceReason::Unknown;
    };
    // The flow enum reserves zero for unknown while the datapath uses 5:
    // states below the datapath sentinel shift up by one, the rest map
    // through unchanged.
    match tn.trace_reason() {
        TRACE_REASON_POLICY => flow::TraceReason::New,
        TRACE_REASON_CT_ESTABLISHED => flow::TraceReason::Established,
        TRACE_REASON_CT_REPLY => flow::TraceReason::Reply,
        TRACE_REASON_CT_RELATED => flow::TraceReason::Related,
        TRACE_REASON_CT_REOPENED => flow::TraceReason::Reopened,
        TRACE_REASON_SRV6_ENCAP => flow::TraceReason::Srv6Encap,
        TRACE_REASON_SRV6_DECAP => flow::TraceReason::Srv6Decap,
        TRACE_REASON_ENCRYPT_OVERLAY => flow::TraceReason::EncryptOverlay,
        _ => flow::TraceReason::Unknown,
    }
}

fn decode_policy_match_type(event: &MonitorEvent) -> u32 {
    match event {
        MonitorEvent::PolicyVerdict(pvn) => pvn.match_type(),
        _ => 0,
    }
}

fn decode_debug_capture_point(event: &MonitorEvent) -> flow::DebugCapturePoint {
    let MonitorEvent::DebugCapture(dbg) = event else {
        return flow::DebugCapturePoint::DbgCapturePointUnknown;
    };
    flow::DebugCapturePoint::try_from(i32::from(dbg.sub_type)).unwrap_or_default()
}

fn decode_proxy_port(event: &MonitorEvent) -> u32 {
    match event {
        MonitorEvent::Trace(tn) if tn.obs_point == TRACE_TO_PROXY => u32::from(tn.dst_id),
        MonitorEvent::DebugCapture(dbg)
            if matches!(dbg.sub_type, DBG_CAPTURE_PROXY_PRE | DBG_CAPTURE_PROXY_POST) =>
        {
            // arg1 is in network byte order for the proxy capture points.
            u32::from_be(dbg.arg1)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        CLS_FLAG_IPV6, CLS_FLAG_L3_DEVICE, CLS_FLAG_VXLAN, TRACE_FROM_ENDPOINT,
        TRACE_REASON_UNKNOWN, TRACE_TO_NETWORK,
    };
    use crate::getters::EndpointInfo;
    use std::collections::HashMap;
    use std::net::Ipv6Addr;
    use std::sync::atomic::{AtomicU32, Ordering};

    // ── Event builders ───────────────────────────────────────────────

    fn make_drop(sub_type: u8, source: u16, src_label: u32, dst_label: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(MESSAGE_TYPE_DROP);
        buf.push(sub_type);
        buf.extend_from_slice(&source.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // hash
        buf.extend_from_slice(&0u32.to_le_bytes()); // orig_len
        buf.extend_from_slice(&0u16.to_le_bytes()); // cap_len
        buf.extend_from_slice(&0u16.to_le_bytes()); // version 0
        buf.extend_from_slice(&src_label.to_le_bytes());
        buf.extend_from_slice(&dst_label.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // dst_id
        buf.extend_from_slice(&17u16.to_le_bytes()); // line
        buf.push(2); // file = bpf_lxc.c
        buf.push(0); // ext_error
        buf.extend_from_slice(&0u32.to_le_bytes()); // ifindex
        buf
    }

    #[allow(clippy::too_many_arguments)]
    fn make_trace(
        obs_point: u8,
        source: u16,
        dst_id: u16,
        reason: u8,
        flags: u8,
        ifindex: u32,
        orig_ip: [u8; 16],
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(MESSAGE_TYPE_TRACE);
        buf.push(obs_point);
        buf.extend_from_slice(&source.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // hash
        buf.extend_from_slice(&0u32.to_le_bytes()); // orig_len
        buf.extend_from_slice(&0u16.to_le_bytes()); // cap_len
        buf.extend_from_slice(&1u16.to_le_bytes()); // version 1
        buf.extend_from_slice(&100u32.to_le_bytes()); // src_label
        buf.extend_from_slice(&200u32.to_le_bytes()); // dst_label
        buf.extend_from_slice(&dst_id.to_le_bytes());
        buf.push(reason);
        buf.push(flags);
        buf.extend_from_slice(&ifindex.to_le_bytes());
        buf.extend_from_slice(&orig_ip);
        buf
    }

    fn make_verdict(verdict: i32, flags: u8, auth_type: u8, remote_label: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(MESSAGE_TYPE_POLICY_VERDICT);
        buf.push(0); // sub_type
        buf.extend_from_slice(&9u16.to_le_bytes()); // source
        buf.extend_from_slice(&0u32.to_le_bytes()); // hash
        buf.extend_from_slice(&0u32.to_le_bytes()); // orig_len
        buf.extend_from_slice(&0u16.to_le_bytes()); // cap_len
        buf.extend_from_slice(&0u16.to_le_bytes()); // version
        buf.extend_from_slice(&remote_label.to_le_bytes());
        buf.extend_from_slice(&verdict.to_le_bytes());
        buf.extend_from_slice(&80u16.to_le_bytes()); // dst_port
        buf.push(6); // proto
        buf.push(flags);
        buf.push(auth_type);
        buf.push(0);
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf
    }

    fn make_capture(sub_type: u8, arg1: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(MESSAGE_TYPE_CAPTURE);
        buf.push(sub_type);
        buf.extend_from_slice(&0u16.to_le_bytes()); // source
        buf.extend_from_slice(&0u32.to_le_bytes()); // hash
        buf.extend_from_slice(&0u32.to_le_bytes()); // len
        buf.extend_from_slice(&0u32.to_le_bytes()); // orig_len
        buf.extend_from_slice(&arg1.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // arg2
        buf
    }

    // ── Packet builders ──────────────────────────────────────────────

    fn eth_ipv4_tcp(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16, tcp_flags: u8) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0x00, 0x00, 0x01]); // dst MAC
        p.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0x00, 0x00, 0x02]); // src MAC
        p.extend_from_slice(&0x0800u16.to_be_bytes());
        p.extend(ipv4(src, dst, 6));
        p.extend(tcp(sport, dport, tcp_flags));
        p
    }

    fn ipv4(src: [u8; 4], dst: [u8; 4], proto: u8) -> Vec<u8> {
        let mut p = vec![0x45, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x40, proto, 0x00, 0x00];
        p.extend_from_slice(&src);
        p.extend_from_slice(&dst);
        p
    }

    fn ipv6(src: &Ipv6Addr, dst: &Ipv6Addr, next_header: u8) -> Vec<u8> {
        let mut p = vec![0x60, 0x00, 0x00, 0x00, 0x00, 0x00, next_header, 0x40];
        p.extend_from_slice(&src.octets());
        p.extend_from_slice(&dst.octets());
        p
    }

    fn tcp(sport: u16, dport: u16, flags: u8) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&sport.to_be_bytes());
        p.extend_from_slice(&dport.to_be_bytes());
        p.extend_from_slice(&[0; 8]); // seq + ack
        p.push(0x50);
        p.push(flags);
        p.extend_from_slice(&[0x20, 0x00, 0x00, 0x00, 0x00, 0x00]);
        p
    }

    fn udp(sport: u16, dport: u16, length: u16) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&sport.to_be_bytes());
        p.extend_from_slice(&dport.to_be_bytes());
        p.extend_from_slice(&length.to_be_bytes());
        p.extend_from_slice(&[0x00, 0x00]);
        p
    }

    // ── Stub providers ───────────────────────────────────────────────

    struct StubEndpoints(HashMap<IpAddr, EndpointInfo>);

    impl EndpointGetter for StubEndpoints {
        fn endpoint_by_ip(&self, ip: IpAddr) -> Option<EndpointInfo> {
            self.0.get(&ip).cloned()
        }

        fn endpoint_by_id(&self, id: u32) -> Option<EndpointInfo> {
            self.0.values().find(|ep| ep.id == id).cloned()
        }
    }

    struct StubDns(HashMap<(u32, IpAddr), Vec<String>>);

    impl DnsGetter for StubDns {
        fn names_of(&self, endpoint_id: u32, ip: IpAddr) -> Vec<String> {
            self.0.get(&(endpoint_id, ip)).cloned().unwrap_or_default()
        }
    }

    struct StubLinks;

    impl LinkGetter for StubLinks {
        fn if_name_cached(&self, ifindex: u32) -> Option<String> {
            Some(format!("eth{ifindex}"))
        }
    }

    struct StubServices;

    impl ServiceGetter for StubServices {
        fn service_by_addr(&self, ip: IpAddr, port: u16) -> Option<flow::Service> {
            (port == 80).then(|| flow::Service {
                name: format!("svc-{ip}"),
                namespace: "default".into(),
            })
        }
    }

    struct CountingCorrelator(AtomicU32);

    impl PolicyCorrelator for CountingCorrelator {
        fn correlate(
            &self,
            _endpoints: &dyn EndpointGetter,
            _flow: &mut flow::Flow,
        ) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn endpoint_at(addr: &str, id: u32, identity: u32) -> (IpAddr, EndpointInfo) {
        (
            ip(addr),
            EndpointInfo {
                id,
                identity,
                namespace: "default".into(),
                pod_name: format!("pod-{id}"),
                labels: vec![],
                workloads: vec![],
            },
        )
    }

    fn bare_parser() -> Parser {
        Parser::new(Getters::default(), None, Options::default())
    }

    fn decode_ok(parser: &Parser, data: &[u8]) -> flow::Flow {
        let mut flow = flow::Flow::default();
        parser.decode(data, &mut flow).unwrap();
        flow
    }

    // ── Boundary behaviors ───────────────────────────────────────────

    #[test]
    fn empty_event_is_an_error() {
        let parser = bare_parser();
        let mut flow = flow::Flow::default();
        assert_eq!(parser.decode(&[], &mut flow), Err(ParseError::EmptyData));
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let parser = bare_parser();
        let mut flow = flow::Flow::default();
        assert_eq!(
            parser.decode(&[0xff], &mut flow),
            Err(ParseError::InvalidType(0xff))
        );
    }

    #[test]
    fn event_with_no_packet_bytes_decodes_empty() {
        let parser = bare_parser();
        let flow = decode_ok(&parser, &make_verdict(0, 0x02, 0, 1));
        assert!(flow.ethernet.is_none());
        assert!(flow.ip.is_none());
        assert!(flow.l4.is_none());
        assert_eq!(flow.verdict(), flow::Verdict::Forwarded);
    }

    #[test]
    fn event_shorter_than_header_is_an_error() {
        let parser = bare_parser();
        let mut flow = flow::Flow::default();
        let data = make_verdict(0, 0, 0, 1);
        let err = parser.decode(&data[..data.len() - 1], &mut flow).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Header {
                variant: EventVariant::PolicyVerdict,
                ..
            }
        ));
    }

    // ── End-to-end scenarios ─────────────────────────────────────────

    #[test]
    fn drop_ipv4_tcp_at_receiving_endpoint() {
        let mut endpoints = HashMap::new();
        endpoints.extend([endpoint_at("10.0.0.1", 42, 100)]);
        let parser = Parser::new(
            Getters {
                endpoints: Some(Arc::new(StubEndpoints(endpoints))),
                ..Default::default()
            },
            None,
            Options::default(),
        );

        let mut data = make_drop(132, 7, 100, 200);
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 5555, 80, 0x02));
        let flow = decode_ok(&parser, &data);

        assert_eq!(flow.verdict(), flow::Verdict::Dropped);
        assert_eq!(flow.drop_reason, 132);
        assert_eq!(
            flow.drop_reason_desc,
            i32::from(flow::DropReason::InvalidSourceIp)
        );
        // Drop source (7) differs from the resolved source endpoint (42).
        assert_eq!(flow.traffic_direction(), flow::TrafficDirection::Ingress);
        assert_eq!(flow.is_reply, None);
        assert!(!flow.reply);
        assert_eq!(flow.summary, "TCP Flags: SYN");
        let ip_header = flow.ip.unwrap();
        assert_eq!(ip_header.source, "10.0.0.1");
        assert_eq!(ip_header.destination, "10.0.0.2");
        let Some(flow::layer4::Protocol::Tcp(tcp)) = flow.l4.unwrap().protocol else {
            panic!("expected TCP");
        };
        assert!(tcp.flags.unwrap().syn);
        let file = flow.file.unwrap();
        assert_eq!(file.name, "bpf_lxc.c");
        assert_eq!(file.line, 17);
        let event_type = flow.event_type.unwrap();
        assert_eq!(event_type.r#type, i32::from(MESSAGE_TYPE_DROP));
        assert_eq!(event_type.sub_type, 132);
        assert_eq!(flow.source.unwrap().id, 42);
        assert_eq!(flow.destination.unwrap().identity, 200);
        assert_eq!(flow.r#type, i32::from(flow::FlowType::L3L4));
    }

    #[test]
    fn drop_at_sending_endpoint_is_egress() {
        let mut endpoints = HashMap::new();
        endpoints.extend([endpoint_at("10.0.0.1", 7, 100)]);
        let parser = Parser::new(
            Getters {
                endpoints: Some(Arc::new(StubEndpoints(endpoints))),
                ..Default::default()
            },
            None,
            Options::default(),
        );

        let mut data = make_drop(133, 7, 100, 200);
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 5555, 80, 0x02));
        let flow = decode_ok(&parser, &data);
        assert_eq!(flow.traffic_direction(), flow::TrafficDirection::Egress);
    }

    #[test]
    fn trace_ipv6_udp_snat_egress() {
        let orig: Ipv6Addr = "fd00::1".parse().unwrap();
        let translated: Ipv6Addr = "fd00::abcd".parse().unwrap();
        let peer: Ipv6Addr = "fd00::9".parse().unwrap();

        let mut endpoints = HashMap::new();
        endpoints.extend([endpoint_at("fd00::1", 42, 100)]);
        let parser = Parser::new(
            Getters {
                endpoints: Some(Arc::new(StubEndpoints(endpoints))),
                links: Some(Arc::new(StubLinks)),
                ..Default::default()
            },
            None,
            Options::default(),
        );

        let mut data = make_trace(
            TRACE_TO_NETWORK,
            42,
            0,
            TRACE_REASON_CT_ESTABLISHED,
            CLS_FLAG_IPV6 | CLS_FLAG_L3_DEVICE,
            3,
            orig.octets(),
        );
        data.extend(ipv6(&translated, &peer, 17));
        data.extend(udp(1000, 2000, 8));
        let flow = decode_ok(&parser, &data);

        assert_eq!(flow.verdict(), flow::Verdict::Forwarded);
        assert_eq!(flow.traffic_direction(), flow::TrafficDirection::Egress);
        assert_eq!(flow.is_reply, Some(false));
        assert!(!flow.reply);
        assert_eq!(flow.trace_reason(), flow::TraceReason::Established);
        let ip_header = flow.ip.unwrap();
        assert_eq!(ip_header.source, "fd00::1");
        assert_eq!(ip_header.source_xlated, "fd00::abcd");
        assert_eq!(ip_header.destination, "fd00::9");
        let interface = flow.interface.unwrap();
        assert_eq!(interface.index, 3);
        assert_eq!(interface.name, "eth3");
        // Lookups used the pre-translation source.
        assert_eq!(flow.source.unwrap().id, 42);
    }

    #[test]
    fn trace_without_orig_ip_has_no_xlated_source() {
        let parser = bare_parser();
        let mut data = make_trace(
            TRACE_FROM_ENDPOINT,
            42,
            0,
            TRACE_REASON_CT_ESTABLISHED,
            0,
            0,
            [0u8; 16],
        );
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 1, 2, 0x10));
        let flow = decode_ok(&parser, &data);
        let ip_header = flow.ip.unwrap();
        assert_eq!(ip_header.source, "10.0.0.1");
        assert!(ip_header.source_xlated.is_empty());
        assert!(flow.interface.is_none());
    }

    #[test]
    fn trace_vxlan_encapsulation() {
        let parser = bare_parser();

        // Outer Ethernet/IPv4/UDP to the tunnel port, inner pod-to-pod TCP.
        let mut inner = eth_ipv4_tcp([10, 244, 1, 10], [10, 244, 2, 20], 4321, 8080, 0x10);
        let mut overlay = vec![0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2a, 0x00]; // VXLAN, VNI 42
        overlay.append(&mut inner);

        let mut packet = Vec::new();
        packet.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0x00, 0x00, 0x01]);
        packet.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0x00, 0x00, 0x02]);
        packet.extend_from_slice(&0x0800u16.to_be_bytes());
        packet.extend(ipv4([172, 16, 0, 1], [172, 16, 0, 2], 17));
        packet.extend(udp(49152, 8472, (8 + overlay.len()) as u16));
        packet.extend(&overlay);

        let mut data = make_trace(TRACE_TO_NETWORK, 0, 0, TRACE_REASON_UNKNOWN, CLS_FLAG_VXLAN, 0, [0u8; 16]);
        data.extend(&packet);
        let flow = decode_ok(&parser, &data);

        let tunnel = flow.tunnel.unwrap();
        assert_eq!(tunnel.protocol, i32::from(flow::tunnel::Protocol::Vxlan));
        assert_eq!(tunnel.ip.unwrap().source, "172.16.0.1");
        let Some(flow::layer4::Protocol::Udp(tunnel_udp)) = tunnel.l4.unwrap().protocol else {
            panic!("expected outer UDP in tunnel");
        };
        assert_eq!(tunnel_udp.destination_port, 8472);

        let ip_header = flow.ip.unwrap();
        assert_eq!(ip_header.source, "10.244.1.10");
        assert_eq!(ip_header.destination, "10.244.2.20");
        let Some(flow::layer4::Protocol::Tcp(tcp)) = flow.l4.unwrap().protocol else {
            panic!("expected inner TCP");
        };
        assert_eq!(tcp.source_port, 4321);
        assert_eq!(flow.summary, "TCP Flags: ACK");
    }

    #[test]
    fn policy_verdict_ingress_drop() {
        let parser = bare_parser();
        let flow = decode_ok(&parser, &make_verdict(-7, 0x01, 0, 5000));

        assert_eq!(flow.verdict(), flow::Verdict::Dropped);
        assert_eq!(flow.drop_reason, 7);
        assert_eq!(flow.traffic_direction(), flow::TrafficDirection::Ingress);
        assert_eq!(flow.is_reply, None);
        assert!(!flow.reply);
        assert_eq!(flow.source.unwrap().identity, 5000);
        assert_eq!(flow.destination.unwrap().identity, 0);
    }

    #[test]
    fn policy_verdict_egress_redirect_with_auth() {
        let parser = bare_parser();
        let flow = decode_ok(&parser, &make_verdict(1, 0x02, 2, 5000));

        assert_eq!(flow.verdict(), flow::Verdict::Redirected);
        assert_eq!(flow.auth_type(), flow::AuthType::TestAlwaysFail);
        assert_eq!(flow.is_reply, Some(false));
        assert!(!flow.reply);
        assert_eq!(flow.traffic_direction(), flow::TrafficDirection::Egress);
        assert_eq!(flow.drop_reason, 0);
        // The remote peer sits on the destination side for egress.
        assert_eq!(flow.source.unwrap().identity, 0);
        assert_eq!(flow.destination.unwrap().identity, 5000);
    }

    #[test]
    fn policy_verdict_audit() {
        let parser = bare_parser();
        let flow = decode_ok(&parser, &make_verdict(0, 0x01 | 0x40, 0, 1));
        assert_eq!(flow.verdict(), flow::Verdict::Audit);
        assert_eq!(flow.drop_reason, 0);
    }

    #[test]
    fn capture_proxy_port_is_byte_swapped() {
        let parser = bare_parser();
        let flow = decode_ok(&parser, &make_capture(DBG_CAPTURE_PROXY_PRE, 0x5000_0000));

        assert_eq!(flow.proxy_port, u32::from_be(0x5000_0000));
        assert_eq!(
            flow.debug_capture_point(),
            flow::DebugCapturePoint::DbgCaptureProxyPre
        );
        assert_eq!(flow.verdict(), flow::Verdict::VerdictUnknown);
        assert!(flow.interface.is_none());
        assert_eq!(
            flow.traffic_direction(),
            flow::TrafficDirection::TrafficDirectionUnknown
        );
    }

    #[test]
    fn capture_delivery_resolves_interface() {
        let parser = Parser::new(
            Getters {
                links: Some(Arc::new(StubLinks)),
                ..Default::default()
            },
            None,
            Options::default(),
        );
        let flow = decode_ok(&parser, &make_capture(DBG_CAPTURE_DELIVERY, 4));
        let interface = flow.interface.unwrap();
        assert_eq!(interface.index, 4);
        assert_eq!(interface.name, "eth4");
        assert_eq!(flow.proxy_port, 0);
    }

    #[test]
    fn trace_zero_observation_point_becomes_to_endpoint() {
        let parser = bare_parser();
        let data = make_trace(0, 0, 0, TRACE_REASON_UNKNOWN, 0, 0, [0u8; 16]);
        let flow = decode_ok(&parser, &data);
        assert_eq!(
            flow.trace_observation_point(),
            flow::TraceObservationPoint::ToEndpoint
        );
        let event_type = flow.event_type.unwrap();
        assert_eq!(event_type.sub_type, 0);
    }

    #[test]
    fn trace_to_proxy_reports_proxy_port() {
        let parser = bare_parser();
        let data = make_trace(TRACE_TO_PROXY, 0, 15006, TRACE_REASON_UNKNOWN, 0, 0, [0u8; 16]);
        let flow = decode_ok(&parser, &data);
        assert_eq!(flow.proxy_port, 15006);
        assert_eq!(
            flow.trace_observation_point(),
            flow::TraceObservationPoint::ToProxy
        );
    }

    #[test]
    fn trace_reply_at_source_endpoint_is_ingress() {
        let mut endpoints = HashMap::new();
        endpoints.extend([endpoint_at("10.0.0.1", 42, 100)]);
        let parser = Parser::new(
            Getters {
                endpoints: Some(Arc::new(StubEndpoints(endpoints))),
                ..Default::default()
            },
            None,
            Options::default(),
        );

        let mut data = make_trace(
            TRACE_FROM_ENDPOINT,
            42,
            0,
            TRACE_REASON_CT_REPLY,
            0,
            0,
            [0u8; 16],
        );
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 80, 5555, 0x10));
        let flow = decode_ok(&parser, &data);

        // Source endpoint and reply cancel out: the packet enters the node.
        assert_eq!(flow.traffic_direction(), flow::TrafficDirection::Ingress);
        assert_eq!(flow.is_reply, Some(true));
        assert!(flow.reply);
        assert_eq!(flow.trace_reason(), flow::TraceReason::Reply);
    }

    #[test]
    fn encrypt_overlay_trace_is_egress() {
        let parser = bare_parser();
        let mut data = make_trace(
            TRACE_TO_NETWORK,
            9,
            0,
            TRACE_REASON_ENCRYPT_OVERLAY,
            0,
            0,
            [0u8; 16],
        );
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 1, 2, 0x10));
        let flow = decode_ok(&parser, &data);
        assert_eq!(flow.traffic_direction(), flow::TrafficDirection::Egress);
        assert_eq!(flow.trace_reason(), flow::TraceReason::EncryptOverlay);
    }

    #[test]
    fn trace_unknown_reason_leaves_reply_unknown() {
        let parser = bare_parser();
        let mut data = make_trace(
            TRACE_FROM_ENDPOINT,
            9,
            0,
            TRACE_REASON_UNKNOWN,
            0,
            0,
            [0u8; 16],
        );
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 1, 2, 0x10));
        let flow = decode_ok(&parser, &data);
        assert_eq!(flow.is_reply, None);
        assert!(!flow.reply);
        assert_eq!(flow.trace_reason(), flow::TraceReason::Unknown);
        assert_eq!(
            flow.traffic_direction(),
            flow::TrafficDirection::TrafficDirectionUnknown
        );
    }

    #[test]
    fn srv6_encap_trace_has_no_reply_state() {
        let parser = bare_parser();
        let data = make_trace(
            TRACE_TO_NETWORK,
            9,
            0,
            TRACE_REASON_SRV6_ENCAP,
            0,
            0,
            [0u8; 16],
        );
        let flow = decode_ok(&parser, &data);
        assert_eq!(flow.is_reply, None);
        assert_eq!(flow.trace_reason(), flow::TraceReason::Srv6Encap);
    }

    #[test]
    fn dns_lookups_cross_sides() {
        let mut endpoints = HashMap::new();
        endpoints.extend([
            endpoint_at("10.0.0.1", 42, 100),
            endpoint_at("10.0.0.2", 77, 200),
        ]);
        let mut names = HashMap::new();
        // The destination endpoint (77) resolved a name for the source IP,
        // and the source endpoint (42) for the destination IP.
        names.insert((77, ip("10.0.0.1")), vec!["client.example.com".to_string()]);
        names.insert((42, ip("10.0.0.2")), vec!["server.example.com".to_string()]);
        let parser = Parser::new(
            Getters {
                endpoints: Some(Arc::new(StubEndpoints(endpoints))),
                dns: Some(Arc::new(StubDns(names))),
                ..Default::default()
            },
            None,
            Options::default(),
        );

        let mut data = make_trace(
            TRACE_FROM_ENDPOINT,
            42,
            0,
            TRACE_REASON_CT_ESTABLISHED,
            0,
            0,
            [0u8; 16],
        );
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 5555, 80, 0x18));
        let flow = decode_ok(&parser, &data);

        assert_eq!(flow.source_names, vec!["client.example.com"]);
        assert_eq!(flow.destination_names, vec!["server.example.com"]);
    }

    #[test]
    fn services_resolved_by_address_and_port() {
        let parser = Parser::new(
            Getters {
                services: Some(Arc::new(StubServices)),
                ..Default::default()
            },
            None,
            Options::default(),
        );

        let mut data = make_drop(133, 0, 0, 0);
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 80, 9999, 0x10));
        let flow = decode_ok(&parser, &data);

        // Only the source side matches the stub's port-80 rule.
        assert_eq!(flow.source_service.unwrap().name, "svc-10.0.0.1");
        assert!(flow.destination_service.is_none());
    }

    #[test]
    fn correlation_runs_only_when_enabled() {
        let correlator = Arc::new(CountingCorrelator(AtomicU32::new(0)));
        let endpoints: Arc<dyn EndpointGetter> = Arc::new(StubEndpoints(HashMap::new()));

        let mut data = make_drop(133, 0, 0, 0);
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 1, 2, 0x02));

        let parser = Parser::new(
            Getters {
                endpoints: Some(endpoints.clone()),
                ..Default::default()
            },
            Some(correlator.clone()),
            Options::default(),
        );
        decode_ok(&parser, &data);
        assert_eq!(correlator.0.load(Ordering::Relaxed), 1);

        let parser = Parser::new(
            Getters {
                endpoints: Some(endpoints),
                ..Default::default()
            },
            Some(correlator.clone()),
            Options {
                enable_network_policy_correlation: false,
            },
        );
        decode_ok(&parser, &data);
        assert_eq!(correlator.0.load(Ordering::Relaxed), 1);
    }

    // ── Determinism ──────────────────────────────────────────────────

    #[test]
    fn decoding_twice_is_idempotent() {
        let parser = bare_parser();
        let mut data = make_drop(132, 7, 100, 200);
        data.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 5555, 80, 0x02));

        let first = decode_ok(&parser, &data);
        let second = decode_ok(&parser, &data);
        assert_eq!(first, second);

        let other_parser = bare_parser();
        let third = decode_ok(&other_parser, &data);
        assert_eq!(first, third);
    }

    #[test]
    fn concurrent_decodes_match_serial_results() {
        use std::sync::Barrier;

        let parser = Arc::new(bare_parser());

        let mut drop_event = make_drop(132, 7, 100, 200);
        drop_event.extend(eth_ipv4_tcp([10, 0, 0, 1], [10, 0, 0, 2], 5555, 80, 0x02));
        let mut trace_event = make_trace(
            TRACE_FROM_ENDPOINT,
            42,
            0,
            TRACE_REASON_CT_REPLY,
            0,
            3,
            [0u8; 16],
        );
        trace_event.extend(eth_ipv4_tcp([10, 0, 0, 2], [10, 0, 0, 1], 80, 5555, 0x10));
        let verdict_event = make_verdict(-7, 0x01, 0, 5000);

        let events: Arc<Vec<Vec<u8>>> = Arc::new(vec![drop_event, trace_event, verdict_event]);
        let expected: Vec<flow::Flow> = events.iter().map(|e| decode_ok(&parser, e)).collect();
        let expected = Arc::new(expected);

        let num_threads = 4;
        let barrier = Arc::new(Barrier::new(num_threads));
        let handles: Vec<_> = (0..num_threads)
            .map(|t| {
                let parser = parser.clone();
                let events = events.clone();
                let expected = expected.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    for i in 0..200 {
                        let idx = (t + i) % events.len();
                        let mut flow = flow::Flow::default();
                        parser.decode(&events[idx], &mut flow).unwrap();
                        assert_eq!(flow, expected[idx]);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
