//! Packet layer decoding over a reusable workspace.
//!
//! The decoder walks a frame layer by layer, recording the layer types it
//! recognized into a reusable tag list and the decoded header fields into
//! per-layer scratch slots. Unsupported layers end the walk silently; IPv6
//! extension headers are skipped since they carry their own length. A second
//! layer set exists for the inner frame of VXLAN/Geneve-encapsulated
//! packets: when an overlay hint is set, the outer UDP payload is decoded
//! again from the tunnel header down, the outer IP/L4 are snapshotted into
//! the tunnel descriptor, and the inner layers replace them in the output.
//!
//! Scratch slots are overwritten on every decode, so a workspace must never
//! be shared without exclusive access; only values copied out of it escape.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;

use flowscope_proto::flow;

use crate::errors::ParseError;

// ── Ether types ──────────────────────────────────────────────────────

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86DD;
/// Transparent Ethernet bridging, used by Geneve for L2 payloads.
const ETHERTYPE_TEB: u16 = 0x6558;

// ── IP protocol numbers ──────────────────────────────────────────────

const IPPROTO_ICMP: u8 = 1;
const IPPROTO_IPIP: u8 = 4;
const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;
const IPPROTO_IPV6: u8 = 41;
const IPPROTO_ICMPV6: u8 = 58;
const IPPROTO_SCTP: u8 = 132;

// IPv6 extension headers the decoder can step over.
const IPPROTO_HOPOPTS: u8 = 0;
const IPPROTO_ROUTING: u8 = 43;
const IPPROTO_FRAGMENT: u8 = 44;
const IPPROTO_DSTOPTS: u8 = 60;

// ── Header lengths ───────────────────────────────────────────────────

const ETHERNET_LEN: usize = 14;
const IPV4_MIN_LEN: usize = 20;
const IPV6_LEN: usize = 40;
const IPV6_EXT_MIN_LEN: usize = 8;
const TCP_MIN_LEN: usize = 20;
const UDP_LEN: usize = 8;
const SCTP_LEN: usize = 12;
const ICMPV4_LEN: usize = 8;
const ICMPV6_LEN: usize = 4;
const VXLAN_LEN: usize = 8;
const GENEVE_LEN: usize = 8;

// ── TCP flag bits (16-bit view of bytes 12-13, NS in bit 8) ──────────

pub const TCP_FIN: u16 = 0x01;
pub const TCP_SYN: u16 = 0x02;
pub const TCP_RST: u16 = 0x04;
pub const TCP_PSH: u16 = 0x08;
pub const TCP_ACK: u16 = 0x10;
pub const TCP_URG: u16 = 0x20;
pub const TCP_ECE: u16 = 0x40;
pub const TCP_CWR: u16 = 0x80;
pub const TCP_NS: u16 = 0x100;

/// Layer types the decoder recognizes, in wire terminology.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerType {
    Ethernet,
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Sctp,
    Icmpv4,
    Icmpv6,
    Vxlan,
    Geneve,
}

impl LayerType {
    pub fn name(self) -> &'static str {
        match self {
            LayerType::Ethernet => "Ethernet",
            LayerType::Ipv4 => "IPv4",
            LayerType::Ipv6 => "IPv6",
            LayerType::Tcp => "TCP",
            LayerType::Udp => "UDP",
            LayerType::Sctp => "SCTP",
            LayerType::Icmpv4 => "ICMPv4",
            LayerType::Icmpv6 => "ICMPv6",
            LayerType::Vxlan => "VXLAN",
            LayerType::Geneve => "Geneve",
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A packet layer decode failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LayerError {
    #[error("truncated {0} header")]
    Truncated(LayerType),

    #[error("malformed {0} header")]
    Malformed(LayerType),
}

// ── Per-layer scratch slots ──────────────────────────────────────────

#[derive(Default)]
struct EthernetScratch {
    src: [u8; 6],
    dst: [u8; 6],
    ethertype: u16,
}

#[derive(Default)]
struct Ipv4Scratch {
    src: [u8; 4],
    dst: [u8; 4],
    protocol: u8,
}

#[derive(Default)]
struct Ipv6Scratch {
    src: [u8; 16],
    dst: [u8; 16],
    next_header: u8,
}

#[derive(Default)]
struct TcpScratch {
    src_port: u16,
    dst_port: u16,
    flags: u16,
}

#[derive(Default)]
struct UdpScratch {
    src_port: u16,
    dst_port: u16,
    /// Payload bounds within the decode input, from the UDP length field
    /// when valid, else the remaining capture.
    payload: (usize, usize),
}

#[derive(Default)]
struct SctpScratch {
    src_port: u16,
    dst_port: u16,
}

#[derive(Default)]
struct IcmpScratch {
    typ: u8,
    code: u8,
}

#[derive(Default)]
struct VxlanScratch {
    flags: u8,
    vni: u32,
}

#[derive(Default)]
struct GeneveScratch {
    protocol: u16,
    vni: u32,
}

/// One pass worth of decoder state: the recognized-layer tag list plus the
/// scratch slot for each decodable layer.
#[derive(Default)]
struct LayerSet {
    layers: Vec<LayerType>,
    ethernet: EthernetScratch,
    ipv4: Ipv4Scratch,
    ipv6: Ipv6Scratch,
    tcp: TcpScratch,
    udp: UdpScratch,
    sctp: SctpScratch,
    icmpv4: IcmpScratch,
    icmpv6: IcmpScratch,
    vxlan: VxlanScratch,
    geneve: GeneveScratch,
}

fn ether_type_layer(ethertype: u16) -> Option<LayerType> {
    match ethertype {
        ETHERTYPE_IPV4 => Some(LayerType::Ipv4),
        ETHERTYPE_IPV6 => Some(LayerType::Ipv6),
        _ => None,
    }
}

fn ip_proto_layer(proto: u8) -> Option<LayerType> {
    match proto {
        IPPROTO_TCP => Some(LayerType::Tcp),
        IPPROTO_UDP => Some(LayerType::Udp),
        IPPROTO_SCTP => Some(LayerType::Sctp),
        IPPROTO_ICMP => Some(LayerType::Icmpv4),
        IPPROTO_ICMPV6 => Some(LayerType::Icmpv6),
        IPPROTO_IPIP => Some(LayerType::Ipv4),
        IPPROTO_IPV6 => Some(LayerType::Ipv6),
        _ => None,
    }
}

impl LayerSet {
    fn clear(&mut self) {
        self.layers.clear();
        self.udp.payload = (0, 0);
    }

    /// Decode `data` starting at `first`, appending recognized layer tags
    /// until an unsupported layer or the end of the capture.
    fn decode(&mut self, data: &[u8], first: LayerType) -> Result<(), LayerError> {
        self.clear();
        let mut off = 0usize;
        let mut next = Some(first);
        while let Some(layer) = next {
            next = match layer {
                LayerType::Ethernet => self.decode_ethernet(data, &mut off)?,
                LayerType::Ipv4 => self.decode_ipv4(data, &mut off)?,
                LayerType::Ipv6 => self.decode_ipv6(data, &mut off)?,
                LayerType::Tcp => self.decode_tcp(data, &mut off)?,
                LayerType::Udp => self.decode_udp(data, &mut off)?,
                LayerType::Sctp => self.decode_sctp(data, &mut off)?,
                LayerType::Icmpv4 => self.decode_icmpv4(data, &mut off)?,
                LayerType::Icmpv6 => self.decode_icmpv6(data, &mut off)?,
                LayerType::Vxlan => self.decode_vxlan(data, &mut off)?,
                LayerType::Geneve => self.decode_geneve(data, &mut off)?,
            };
            self.layers.push(layer);
        }
        Ok(())
    }

    fn decode_ethernet(
        &mut self,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < ETHERNET_LEN {
            return Err(LayerError::Truncated(LayerType::Ethernet));
        }
        self.ethernet.dst.copy_from_slice(&rest[0..6]);
        self.ethernet.src.copy_from_slice(&rest[6..12]);
        self.ethernet.ethertype = u16::from_be_bytes([rest[12], rest[13]]);
        *off += ETHERNET_LEN;
        Ok(ether_type_layer(self.ethernet.ethertype))
    }

    fn decode_ipv4(
        &mut self,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < IPV4_MIN_LEN {
            return Err(LayerError::Truncated(LayerType::Ipv4));
        }
        let header_len = usize::from(rest[0] & 0x0f) * 4;
        if header_len < IPV4_MIN_LEN {
            return Err(LayerError::Malformed(LayerType::Ipv4));
        }
        if rest.len() < header_len {
            return Err(LayerError::Truncated(LayerType::Ipv4));
        }
        self.ipv4.protocol = rest[9];
        self.ipv4.src.copy_from_slice(&rest[12..16]);
        self.ipv4.dst.copy_from_slice(&rest[16..20]);
        *off += header_len;
        Ok(ip_proto_layer(self.ipv4.protocol))
    }

    fn decode_ipv6(
        &mut self,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < IPV6_LEN {
            return Err(LayerError::Truncated(LayerType::Ipv6));
        }
        let mut next_header = rest[6];
        self.ipv6.src.copy_from_slice(&rest[8..24]);
        self.ipv6.dst.copy_from_slice(&rest[24..40]);
        *off += IPV6_LEN;

        // Step over extension headers; a truncated extension just ends the
        // walk, matching the silent-skip contract for intermediate layers.
        loop {
            match next_header {
                IPPROTO_HOPOPTS | IPPROTO_ROUTING | IPPROTO_DSTOPTS => {
                    let rest = &data[*off..];
                    if rest.len() < IPV6_EXT_MIN_LEN {
                        self.ipv6.next_header = next_header;
                        return Ok(None);
                    }
                    let ext_len = (usize::from(rest[1]) + 1) * 8;
                    if rest.len() < ext_len {
                        self.ipv6.next_header = next_header;
                        return Ok(None);
                    }
                    next_header = rest[0];
                    *off += ext_len;
                }
                IPPROTO_FRAGMENT => {
                    let rest = &data[*off..];
                    if rest.len() < IPV6_EXT_MIN_LEN {
                        self.ipv6.next_header = next_header;
                        return Ok(None);
                    }
                    next_header = rest[0];
                    *off += IPV6_EXT_MIN_LEN;
                }
                _ => break,
            }
        }

        self.ipv6.next_header = next_header;
        Ok(ip_proto_layer(next_header))
    }

    fn decode_tcp(&mut self, data: &[u8], off: &mut usize) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < TCP_MIN_LEN {
            return Err(LayerError::Truncated(LayerType::Tcp));
        }
        let data_offset = usize::from(rest[12] >> 4) * 4;
        if data_offset < TCP_MIN_LEN {
            return Err(LayerError::Malformed(LayerType::Tcp));
        }
        if rest.len() < data_offset {
            return Err(LayerError::Truncated(LayerType::Tcp));
        }
        self.tcp.src_port = u16::from_be_bytes([rest[0], rest[1]]);
        self.tcp.dst_port = u16::from_be_bytes([rest[2], rest[3]]);
        self.tcp.flags = u16::from(rest[13]) | (u16::from(rest[12] & 0x01) << 8);
        *off += data_offset;
        Ok(None)
    }

    fn decode_udp(&mut self, data: &[u8], off: &mut usize) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < UDP_LEN {
            return Err(LayerError::Truncated(LayerType::Udp));
        }
        self.udp.src_port = u16::from_be_bytes([rest[0], rest[1]]);
        self.udp.dst_port = u16::from_be_bytes([rest[2], rest[3]]);
        let length = usize::from(u16::from_be_bytes([rest[4], rest[5]]));
        let start = *off + UDP_LEN;
        let end = if length >= UDP_LEN {
            (*off + length).min(data.len())
        } else {
            data.len()
        };
        self.udp.payload = (start, end.max(start));
        *off = start;
        Ok(None)
    }

    fn decode_sctp(
        &mut self,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < SCTP_LEN {
            return Err(LayerError::Truncated(LayerType::Sctp));
        }
        self.sctp.src_port = u16::from_be_bytes([rest[0], rest[1]]);
        self.sctp.dst_port = u16::from_be_bytes([rest[2], rest[3]]);
        *off += SCTP_LEN;
        Ok(None)
    }

    fn decode_icmpv4(
        &mut self,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < ICMPV4_LEN {
            return Err(LayerError::Truncated(LayerType::Icmpv4));
        }
        self.icmpv4.typ = rest[0];
        self.icmpv4.code = rest[1];
        *off += ICMPV4_LEN;
        Ok(None)
    }

    fn decode_icmpv6(
        &mut self,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < ICMPV6_LEN {
            return Err(LayerError::Truncated(LayerType::Icmpv6));
        }
        self.icmpv6.typ = rest[0];
        self.icmpv6.code = rest[1];
        *off += ICMPV6_LEN;
        Ok(None)
    }

    fn decode_vxlan(
        &mut self,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < VXLAN_LEN {
            return Err(LayerError::Truncated(LayerType::Vxlan));
        }
        self.vxlan.flags = rest[0];
        self.vxlan.vni = u32::from_be_bytes([0, rest[4], rest[5], rest[6]]);
        *off += VXLAN_LEN;
        // VXLAN always carries an Ethernet frame.
        Ok(Some(LayerType::Ethernet))
    }

    fn decode_geneve(
        &mut self,
        data: &[u8],
        off: &mut usize,
    ) -> Result<Option<LayerType>, LayerError> {
        let rest = &data[*off..];
        if rest.len() < GENEVE_LEN {
            return Err(LayerError::Truncated(LayerType::Geneve));
        }
        let opt_len = usize::from(rest[0] & 0x3f) * 4;
        let total_len = GENEVE_LEN + opt_len;
        if rest.len() < total_len {
            return Err(LayerError::Truncated(LayerType::Geneve));
        }
        self.geneve.protocol = u16::from_be_bytes([rest[2], rest[3]]);
        self.geneve.vni = u32::from_be_bytes([0, rest[4], rest[5], rest[6]]);
        *off += total_len;
        Ok(match self.geneve.protocol {
            ETHERTYPE_TEB => Some(LayerType::Ethernet),
            other => ether_type_layer(other),
        })
    }
}

/// Reusable decode state for one in-flight event: outer frame plus overlay.
#[derive(Default)]
pub(crate) struct PacketWorkspace {
    outer: LayerSet,
    overlay: LayerSet,
}

/// Values derived from one decode pass. Everything here is copied out of
/// the workspace; nothing borrows it.
#[derive(Debug, Default)]
pub(crate) struct DecodedLayers {
    pub ethernet: Option<flow::Ethernet>,
    pub ip: Option<flow::Ip>,
    pub l4: Option<flow::Layer4>,
    pub tunnel: Option<flow::Tunnel>,
    pub src_ip: Option<IpAddr>,
    pub dst_ip: Option<IpAddr>,
    pub src_port: u16,
    pub dst_port: u16,
    pub summary: String,
}

/// Decode the packet payload of an event into flow values.
///
/// The caller must hold the workspace exclusively for the whole call.
pub(crate) fn decode_layers(
    payload: &[u8],
    ws: &mut PacketWorkspace,
    is_l3_device: bool,
    is_ipv6: bool,
    is_vxlan: bool,
    is_geneve: bool,
) -> Result<DecodedLayers, ParseError> {
    let mut out = DecodedLayers::default();

    // An event may carry no packet bytes at all; empty both layer lists so
    // nothing stale from the previous decode leaks into this one.
    if payload.is_empty() {
        ws.outer.clear();
        ws.overlay.clear();
        return Ok(out);
    }

    let first = if !is_l3_device {
        LayerType::Ethernet
    } else if is_ipv6 {
        LayerType::Ipv6
    } else {
        LayerType::Ipv4
    };
    ws.outer.decode(payload, first)?;
    populate(&ws.outer, 0, &mut out);

    if !is_vxlan && !is_geneve {
        ws.overlay.clear();
        return Ok(out);
    }

    let (start, end) = ws.outer.udp.payload;
    let overlay_payload = &payload[start..end];
    if overlay_payload.is_empty() {
        // Flagged as overlay but nothing to decode; keep the outer layers.
        ws.overlay.clear();
        return Ok(out);
    }

    let first = if is_vxlan {
        LayerType::Vxlan
    } else {
        LayerType::Geneve
    };
    ws.overlay
        .decode(overlay_payload, first)
        .map_err(ParseError::Overlay)?;

    // The first inner layer must be the tunnel itself; anything else keeps
    // the outer view.
    let protocol = match ws.overlay.layers.first() {
        Some(LayerType::Vxlan) => flow::tunnel::Protocol::Vxlan,
        Some(LayerType::Geneve) => flow::tunnel::Protocol::Geneve,
        _ => return Ok(out),
    };

    // Snapshot the outer addressing into the tunnel, then clear the outer
    // view so the flow never mixes underlay and overlay. Even if the inner
    // decode produced nothing past the tunnel header, the tunnel itself is
    // still surfaced.
    out.tunnel = Some(flow::Tunnel {
        protocol: protocol.into(),
        ip: out.ip.take(),
        l4: out.l4.take(),
    });
    out.ethernet = None;
    out.src_ip = None;
    out.dst_ip = None;
    out.src_port = 0;
    out.dst_port = 0;
    out.summary.clear();

    populate(&ws.overlay, 1, &mut out);
    Ok(out)
}

/// Fill flow values from the recognized layers, skipping the first `skip`
/// tags. The summary reflects the last recognized layer.
fn populate(set: &LayerSet, skip: usize, out: &mut DecodedLayers) {
    for &typ in set.layers.iter().skip(skip) {
        out.summary = typ.name().to_string();
        match typ {
            LayerType::Ethernet => {
                out.ethernet = Some(flow::Ethernet {
                    source: mac_string(&set.ethernet.src),
                    destination: mac_string(&set.ethernet.dst),
                });
            }
            LayerType::Ipv4 => {
                let src = Ipv4Addr::from(set.ipv4.src);
                let dst = Ipv4Addr::from(set.ipv4.dst);
                out.ip = Some(flow::Ip {
                    source: src.to_string(),
                    destination: dst.to_string(),
                    ip_version: flow::IpVersion::IPv4.into(),
                    ..Default::default()
                });
                out.src_ip = Some(IpAddr::V4(src));
                out.dst_ip = Some(IpAddr::V4(dst));
            }
            LayerType::Ipv6 => {
                let src = Ipv6Addr::from(set.ipv6.src);
                let dst = Ipv6Addr::from(set.ipv6.dst);
                out.ip = Some(flow::Ip {
                    source: src.to_string(),
                    destination: dst.to_string(),
                    ip_version: flow::IpVersion::IPv6.into(),
                    ..Default::default()
                });
                out.src_ip = Some(IpAddr::V6(src));
                out.dst_ip = Some(IpAddr::V6(dst));
            }
            LayerType::Tcp => {
                let flags = tcp_flags_to_proto(set.tcp.flags);
                out.l4 = Some(flow::Layer4 {
                    protocol: Some(flow::layer4::Protocol::Tcp(flow::Tcp {
                        source_port: u32::from(set.tcp.src_port),
                        destination_port: u32::from(set.tcp.dst_port),
                        flags: Some(flags),
                    })),
                });
                out.src_port = set.tcp.src_port;
                out.dst_port = set.tcp.dst_port;
                out.summary = tcp_flags_summary(&flags);
            }
            LayerType::Udp => {
                out.l4 = Some(flow::Layer4 {
                    protocol: Some(flow::layer4::Protocol::Udp(flow::Udp {
                        source_port: u32::from(set.udp.src_port),
                        destination_port: u32::from(set.udp.dst_port),
                    })),
                });
                out.src_port = set.udp.src_port;
                out.dst_port = set.udp.dst_port;
            }
            LayerType::Sctp => {
                out.l4 = Some(flow::Layer4 {
                    protocol: Some(flow::layer4::Protocol::Sctp(flow::Sctp {
                        source_port: u32::from(set.sctp.src_port),
                        destination_port: u32::from(set.sctp.dst_port),
                    })),
                });
                out.src_port = set.sctp.src_port;
                out.dst_port = set.sctp.dst_port;
            }
            LayerType::Icmpv4 => {
                out.l4 = Some(flow::Layer4 {
                    protocol: Some(flow::layer4::Protocol::IcmpV4(flow::IcmpV4 {
                        r#type: u32::from(set.icmpv4.typ),
                        code: u32::from(set.icmpv4.code),
                    })),
                });
                out.summary = format!(
                    "ICMPv4 {}",
                    icmpv4_type_code_string(set.icmpv4.typ, set.icmpv4.code)
                );
            }
            LayerType::Icmpv6 => {
                out.l4 = Some(flow::Layer4 {
                    protocol: Some(flow::layer4::Protocol::IcmpV6(flow::IcmpV6 {
                        r#type: u32::from(set.icmpv6.typ),
                        code: u32::from(set.icmpv6.code),
                    })),
                });
                out.summary = format!(
                    "ICMPv6 {}",
                    icmpv6_type_code_string(set.icmpv6.typ, set.icmpv6.code)
                );
            }
            // Tunnel headers are recorded in the tunnel descriptor, not as
            // flow layers.
            LayerType::Vxlan | LayerType::Geneve => {}
        }
    }
}

fn mac_string(mac: &[u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

/// Expand a TCP flag bitmask into the flow representation.
pub fn tcp_flags_to_proto(flags: u16) -> flow::TcpFlags {
    flow::TcpFlags {
        fin: flags & TCP_FIN != 0,
        syn: flags & TCP_SYN != 0,
        rst: flags & TCP_RST != 0,
        psh: flags & TCP_PSH != 0,
        ack: flags & TCP_ACK != 0,
        urg: flags & TCP_URG != 0,
        ece: flags & TCP_ECE != 0,
        cwr: flags & TCP_CWR != 0,
        ns: flags & TCP_NS != 0,
    }
}

/// Render the set TCP flags as `"TCP Flags: SYN, ACK"`, in the fixed
/// SYN-first order consumers rely on.
pub fn tcp_flags_summary(flags: &flow::TcpFlags) -> String {
    let mut parts: [&str; 9] = [""; 9];
    let mut n = 0;
    let mut push = |cond: bool, s: &'static str| {
        if cond {
            parts[n] = s;
            n += 1;
        }
    };
    push(flags.syn, "SYN");
    push(flags.ack, "ACK");
    push(flags.rst, "RST");
    push(flags.fin, "FIN");
    push(flags.psh, "PSH");
    push(flags.urg, "URG");
    push(flags.ece, "ECE");
    push(flags.cwr, "CWR");
    push(flags.ns, "NS");

    let mut s = String::with_capacity(11 + n * 5);
    s.push_str("TCP Flags: ");
    for (i, part) in parts[..n].iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        s.push_str(part);
    }
    s
}

fn icmpv4_type_code_string(typ: u8, code: u8) -> String {
    let name = match typ {
        0 => "EchoReply",
        3 => "DestinationUnreachable",
        4 => "SourceQuench",
        5 => "Redirect",
        8 => "EchoRequest",
        9 => "RouterAdvertisement",
        10 => "RouterSolicitation",
        11 => "TimeExceeded",
        12 => "ParameterProblem",
        13 => "Timestamp",
        14 => "TimestampReply",
        _ => return format!("{typ}({code})"),
    };
    if typ == 3 {
        let code_name = match code {
            0 => "Net",
            1 => "Host",
            2 => "Protocol",
            3 => "Port",
            4 => "FragmentationNeeded",
            5 => "SourceRoutingFailed",
            _ => return format!("{name}({code})"),
        };
        return format!("{name}({code_name})");
    }
    if code == 0 {
        name.to_string()
    } else {
        format!("{name}({code})")
    }
}

fn icmpv6_type_code_string(typ: u8, code: u8) -> String {
    let name = match typ {
        1 => "DestinationUnreachable",
        2 => "PacketTooBig",
        3 => "TimeExceeded",
        4 => "ParameterProblem",
        128 => "EchoRequest",
        129 => "EchoReply",
        133 => "RouterSolicitation",
        134 => "RouterAdvertisement",
        135 => "NeighborSolicitation",
        136 => "NeighborAdvertisement",
        _ => return format!("{typ}({code})"),
    };
    if code == 0 {
        name.to_string()
    } else {
        format!("{name}({code})")
    }
}
