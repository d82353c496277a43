//! Wire contract for flowscope flow records.
//!
//! These bindings are hand-maintained `prost` types rather than build-time
//! codegen: the crate ships no services, and keeping the message definitions
//! in Rust avoids a protoc toolchain dependency for downstream builds. Field
//! numbers and enum values are part of the public contract with consumers of
//! the exported flow stream and must not change without coordination.

#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod flow {
    /// A single observed flow: one datapath event decoded through L2-L4 and
    /// correlated with endpoint, identity, DNS, service, and link metadata.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Flow {
        #[prost(message, optional, tag = "1")]
        pub time: ::core::option::Option<::prost_types::Timestamp>,
        #[prost(enumeration = "Verdict", tag = "2")]
        pub verdict: i32,
        /// Numeric datapath drop reason; 0 unless the flow was dropped.
        #[prost(uint32, tag = "3")]
        pub drop_reason: u32,
        #[prost(message, optional, tag = "4")]
        pub ethernet: ::core::option::Option<Ethernet>,
        #[prost(message, optional, tag = "5")]
        pub ip: ::core::option::Option<Ip>,
        #[prost(message, optional, tag = "6")]
        pub l4: ::core::option::Option<Layer4>,
        #[prost(message, optional, tag = "9")]
        pub source: ::core::option::Option<Endpoint>,
        #[prost(message, optional, tag = "10")]
        pub destination: ::core::option::Option<Endpoint>,
        #[prost(enumeration = "FlowType", tag = "11")]
        pub r#type: i32,
        #[prost(string, tag = "12")]
        pub node_name: ::prost::alloc::string::String,
        /// DNS names the destination endpoint resolved for the source IP.
        #[prost(string, repeated, tag = "15")]
        pub source_names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        /// DNS names the source endpoint resolved for the destination IP.
        #[prost(string, repeated, tag = "16")]
        pub destination_names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        #[prost(message, optional, tag = "17")]
        pub l7: ::core::option::Option<Layer7>,
        /// Mirrors `is_reply` when known; false when unknown.
        #[prost(bool, tag = "18")]
        pub reply: bool,
        #[prost(message, optional, tag = "21")]
        pub event_type: ::core::option::Option<DatapathEventType>,
        #[prost(message, optional, tag = "24")]
        pub source_service: ::core::option::Option<Service>,
        #[prost(message, optional, tag = "25")]
        pub destination_service: ::core::option::Option<Service>,
        #[prost(enumeration = "TrafficDirection", tag = "26")]
        pub traffic_direction: i32,
        #[prost(uint32, tag = "27")]
        pub policy_match_type: u32,
        #[prost(enumeration = "TraceObservationPoint", tag = "28")]
        pub trace_observation_point: i32,
        /// Tri-state reply indicator; unset when connection state is unknown.
        #[prost(bool, optional, tag = "29")]
        pub is_reply: ::core::option::Option<bool>,
        #[prost(enumeration = "DebugCapturePoint", tag = "30")]
        pub debug_capture_point: i32,
        #[prost(message, optional, tag = "31")]
        pub interface: ::core::option::Option<NetworkInterface>,
        #[prost(uint32, tag = "32")]
        pub proxy_port: u32,
        #[prost(enumeration = "DropReason", tag = "33")]
        pub drop_reason_desc: i32,
        #[prost(string, tag = "34")]
        pub uuid: ::prost::alloc::string::String,
        #[prost(enumeration = "AuthType", tag = "35")]
        pub auth_type: i32,
        #[prost(enumeration = "TraceReason", tag = "36")]
        pub trace_reason: i32,
        /// Datapath source file/line that emitted a drop.
        #[prost(message, optional, tag = "38")]
        pub file: ::core::option::Option<FileInfo>,
        /// Outer encapsulation at the moment the inner frame was decoded.
        #[prost(message, optional, tag = "39")]
        pub tunnel: ::core::option::Option<Tunnel>,
        #[prost(string, tag = "100000")]
        pub summary: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Ethernet {
        #[prost(string, tag = "1")]
        pub source: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub destination: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Ip {
        #[prost(string, tag = "1")]
        pub source: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub destination: ::prost::alloc::string::String,
        /// Pre-translation source address when the flow was SNATed.
        #[prost(string, tag = "5")]
        pub source_xlated: ::prost::alloc::string::String,
        #[prost(enumeration = "IpVersion", tag = "3")]
        pub ip_version: i32,
        #[prost(bool, tag = "4")]
        pub encrypted: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Layer4 {
        #[prost(oneof = "layer4::Protocol", tags = "1, 2, 3, 4, 5")]
        pub protocol: ::core::option::Option<layer4::Protocol>,
    }

    pub mod layer4 {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Protocol {
            #[prost(message, tag = "1")]
            Tcp(super::Tcp),
            #[prost(message, tag = "2")]
            Udp(super::Udp),
            #[prost(message, tag = "3")]
            IcmpV4(super::IcmpV4),
            #[prost(message, tag = "4")]
            IcmpV6(super::IcmpV6),
            #[prost(message, tag = "5")]
            Sctp(super::Sctp),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Tcp {
        #[prost(uint32, tag = "1")]
        pub source_port: u32,
        #[prost(uint32, tag = "2")]
        pub destination_port: u32,
        #[prost(message, optional, tag = "3")]
        pub flags: ::core::option::Option<TcpFlags>,
    }

    #[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
    pub struct TcpFlags {
        #[prost(bool, tag = "1")]
        pub fin: bool,
        #[prost(bool, tag = "2")]
        pub syn: bool,
        #[prost(bool, tag = "3")]
        pub rst: bool,
        #[prost(bool, tag = "4")]
        pub psh: bool,
        #[prost(bool, tag = "5")]
        pub ack: bool,
        #[prost(bool, tag = "6")]
        pub urg: bool,
        #[prost(bool, tag = "7")]
        pub ece: bool,
        #[prost(bool, tag = "8")]
        pub cwr: bool,
        #[prost(bool, tag = "9")]
        pub ns: bool,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Udp {
        #[prost(uint32, tag = "1")]
        pub source_port: u32,
        #[prost(uint32, tag = "2")]
        pub destination_port: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Sctp {
        #[prost(uint32, tag = "1")]
        pub source_port: u32,
        #[prost(uint32, tag = "2")]
        pub destination_port: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct IcmpV4 {
        #[prost(uint32, tag = "1")]
        pub r#type: u32,
        #[prost(uint32, tag = "2")]
        pub code: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct IcmpV6 {
        #[prost(uint32, tag = "1")]
        pub r#type: u32,
        #[prost(uint32, tag = "2")]
        pub code: u32,
    }

    /// Outer encapsulation of a tunneled flow. `ip` and `l4` describe the
    /// underlay packet, captured before the inner frame replaces them in the
    /// flow proper.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Tunnel {
        #[prost(enumeration = "tunnel::Protocol", tag = "1")]
        pub protocol: i32,
        #[prost(message, optional, tag = "2")]
        pub ip: ::core::option::Option<Ip>,
        #[prost(message, optional, tag = "3")]
        pub l4: ::core::option::Option<Layer4>,
    }

    pub mod tunnel {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum Protocol {
            Unknown = 0,
            Vxlan = 1,
            Geneve = 2,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Endpoint {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(uint32, tag = "2")]
        pub identity: u32,
        #[prost(string, tag = "3")]
        pub namespace: ::prost::alloc::string::String,
        #[prost(string, repeated, tag = "4")]
        pub labels: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        #[prost(string, tag = "5")]
        pub pod_name: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "6")]
        pub workloads: ::prost::alloc::vec::Vec<Workload>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Workload {
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub kind: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Service {
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub namespace: ::prost::alloc::string::String,
    }

    /// Raw datapath event type and sub-type that produced a flow.
    #[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
    pub struct DatapathEventType {
        #[prost(int32, tag = "1")]
        pub r#type: i32,
        #[prost(int32, tag = "2")]
        pub sub_type: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FileInfo {
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
        #[prost(uint32, tag = "2")]
        pub line: u32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NetworkInterface {
        #[prost(uint32, tag = "1")]
        pub index: u32,
        /// Empty when the link name is not cached; omitted on the wire.
        #[prost(string, tag = "2")]
        pub name: ::prost::alloc::string::String,
    }

    /// Application-layer record. The L3/L4 parser never populates this; it
    /// exists so L7-producing parsers share one flow message.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Layer7 {
        #[prost(enumeration = "L7FlowType", tag = "1")]
        pub r#type: i32,
        #[prost(uint64, tag = "2")]
        pub latency_ns: u64,
    }

    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum FlowType {
        UnknownType = 0,
        L3L4 = 1,
        L7 = 2,
        Sock = 3,
    }

    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum Verdict {
        VerdictUnknown = 0,
        Forwarded = 1,
        Dropped = 2,
        Error = 3,
        /// Policy said drop, but audit mode forwarded the packet.
        Audit = 4,
        Redirected = 5,
        Traced = 6,
        Translated = 7,
    }

    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum TrafficDirection {
        TrafficDirectionUnknown = 0,
        Ingress = 1,
        Egress = 2,
    }

    #[allow(clippy::upper_case_acronyms)]
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum IpVersion {
        IpNotUsed = 0,
        IPv4 = 1,
        IPv6 = 2,
    }

    /// Where in the datapath pipeline a trace event was emitted. Values
    /// match the datapath observation points, except that `ToEndpoint`
    /// replaces the ambiguous on-wire zero.
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum TraceObservationPoint {
        UnknownPoint = 0,
        ToProxy = 1,
        ToHost = 2,
        ToStack = 3,
        ToOverlay = 4,
        FromEndpoint = 5,
        FromProxy = 6,
        FromHost = 7,
        FromStack = 8,
        FromOverlay = 9,
        FromNetwork = 10,
        ToNetwork = 11,
        FromCrypto = 12,
        ToCrypto = 13,
        ToEndpoint = 101,
    }

    /// Connection-tracking state behind a trace event. Zero is reserved for
    /// "unknown", so datapath values below its unknown sentinel shift up by
    /// one and values above it map through unchanged.
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum TraceReason {
        Unknown = 0,
        New = 1,
        Established = 2,
        Reply = 3,
        Related = 4,
        Reopened = 5,
        Srv6Encap = 6,
        Srv6Decap = 7,
        EncryptOverlay = 8,
    }

    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum AuthType {
        Disabled = 0,
        Spire = 1,
        TestAlwaysFail = 2,
    }

    /// Descriptive counterpart of the numeric drop reason. Values mirror the
    /// datapath error codes; unknown codes stay purely numeric in
    /// `Flow.drop_reason`.
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum DropReason {
        DropReasonUnknown = 0,
        InvalidSourceMac = 130,
        InvalidDestinationMac = 131,
        InvalidSourceIp = 132,
        PolicyDenied = 133,
        InvalidPacketDropped = 134,
        CtTruncatedOrInvalidHeader = 135,
        CtMissingTcpAckFlag = 136,
        CtUnknownL4Protocol = 137,
        UnsupportedL3Protocol = 139,
        MissedTailCall = 140,
        ErrorWritingToPacket = 141,
        UnknownL4Protocol = 142,
        UnknownIcmpv4Code = 143,
        UnknownIcmpv4Type = 144,
        UnknownIcmpv6Code = 145,
        UnknownIcmpv6Type = 146,
        StaleOrUnroutableIp = 148,
        AuthRequired = 166,
    }

    /// Datapath debug capture points. Gaps correspond to retired points.
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum DebugCapturePoint {
        DbgCapturePointUnknown = 0,
        DbgCaptureDelivery = 4,
        DbgCaptureFromLb = 5,
        DbgCaptureAfterV46 = 6,
        DbgCaptureAfterV64 = 7,
        DbgCaptureProxyPre = 8,
        DbgCaptureProxyPost = 9,
        DbgCaptureSnatPre = 10,
        DbgCaptureSnatPost = 11,
    }

    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum L7FlowType {
        UnknownL7Type = 0,
        Request = 1,
        Response = 2,
        Sample = 3,
    }
}
