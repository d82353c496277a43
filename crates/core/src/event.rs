//! Datapath monitor event ABI.
//!
//! Events arrive as contiguous little-endian byte buffers whose first byte
//! selects one of four fixed-layout headers. Layouts are bit-exact with the
//! datapath; drop and trace notifications are versioned, and their packet
//! payload starts at a version-dependent `data_offset`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::Buf;
use thiserror::Error;

// ── Monitor message types ────────────────────────────────────────────

pub const MESSAGE_TYPE_DROP: u8 = 1;
pub const MESSAGE_TYPE_CAPTURE: u8 = 3;
pub const MESSAGE_TYPE_TRACE: u8 = 4;
pub const MESSAGE_TYPE_POLICY_VERDICT: u8 = 5;

// ── Classifier flags (drop v2 and trace notifications) ───────────────

pub const CLS_FLAG_IPV6: u8 = 1 << 0;
pub const CLS_FLAG_L3_DEVICE: u8 = 1 << 1;
pub const CLS_FLAG_VXLAN: u8 = 1 << 2;
pub const CLS_FLAG_GENEVE: u8 = 1 << 3;

// ── Trace observation points ─────────────────────────────────────────

pub const TRACE_TO_ENDPOINT: u8 = 0;
pub const TRACE_TO_PROXY: u8 = 1;
pub const TRACE_TO_HOST: u8 = 2;
pub const TRACE_TO_STACK: u8 = 3;
pub const TRACE_TO_OVERLAY: u8 = 4;
pub const TRACE_FROM_ENDPOINT: u8 = 5;
pub const TRACE_FROM_PROXY: u8 = 6;
pub const TRACE_FROM_HOST: u8 = 7;
pub const TRACE_FROM_STACK: u8 = 8;
pub const TRACE_FROM_OVERLAY: u8 = 9;
pub const TRACE_FROM_NETWORK: u8 = 10;
pub const TRACE_TO_NETWORK: u8 = 11;
pub const TRACE_FROM_CRYPTO: u8 = 12;
pub const TRACE_TO_CRYPTO: u8 = 13;

// ── Trace reasons (bit 7 carries the encryption flag) ────────────────

pub const TRACE_REASON_POLICY: u8 = 0;
pub const TRACE_REASON_CT_ESTABLISHED: u8 = 1;
pub const TRACE_REASON_CT_REPLY: u8 = 2;
pub const TRACE_REASON_CT_RELATED: u8 = 3;
pub const TRACE_REASON_CT_REOPENED: u8 = 4;
pub const TRACE_REASON_UNKNOWN: u8 = 5;
pub const TRACE_REASON_SRV6_ENCAP: u8 = 6;
pub const TRACE_REASON_SRV6_DECAP: u8 = 7;
pub const TRACE_REASON_ENCRYPT_OVERLAY: u8 = 8;
pub const TRACE_REASON_ENCRYPT_MASK: u8 = 0x80;

// ── Debug capture points ─────────────────────────────────────────────

pub const DBG_CAPTURE_DELIVERY: u8 = 4;
pub const DBG_CAPTURE_FROM_LB: u8 = 5;
pub const DBG_CAPTURE_AFTER_V46: u8 = 6;
pub const DBG_CAPTURE_AFTER_V64: u8 = 7;
pub const DBG_CAPTURE_PROXY_PRE: u8 = 8;
pub const DBG_CAPTURE_PROXY_POST: u8 = 9;
pub const DBG_CAPTURE_SNAT_PRE: u8 = 10;
pub const DBG_CAPTURE_SNAT_POST: u8 = 11;

// ── Policy verdict flag bits ─────────────────────────────────────────

const VERDICT_FLAG_DIRECTION_MASK: u8 = 0b11;
const VERDICT_FLAG_INGRESS: u8 = 1;
const VERDICT_FLAG_MATCH_TYPE_MASK: u8 = 0x38;
const VERDICT_FLAG_MATCH_TYPE_OFFSET: u8 = 3;
const VERDICT_FLAG_AUDITED: u8 = 0x40;

// ── Header lengths ───────────────────────────────────────────────────

const DROP_NOTIFY_V0_LEN: usize = 36;
const DROP_NOTIFY_V2_LEN: usize = 40;
const DROP_NOTIFY_VERSION_2: u16 = 2;

const TRACE_NOTIFY_V0_LEN: usize = 32;
const TRACE_NOTIFY_V1_LEN: usize = 48;
const TRACE_NOTIFY_VERSION_1: u16 = 1;

pub const POLICY_VERDICT_NOTIFY_LEN: usize = 32;
pub const DEBUG_CAPTURE_LEN: usize = 24;

/// A monitor event header decode failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    #[error("unexpected length: expected at least {expected} bytes but got {len}")]
    TooShort { expected: usize, len: usize },

    #[error("unrecognized version {0}")]
    UnknownVersion(u16),
}

fn check_len(data: &[u8], expected: usize) -> Result<(), HeaderError> {
    if data.len() < expected {
        return Err(HeaderError::TooShort {
            expected,
            len: data.len(),
        });
    }
    Ok(())
}

/// Exactly one monitor header variant per decoded event.
#[derive(Clone, Debug)]
pub enum MonitorEvent {
    Drop(DropNotify),
    Trace(TraceNotify),
    PolicyVerdict(PolicyVerdictNotify),
    DebugCapture(DebugCapture),
}

/// Drop notification: a packet the datapath discarded, with the reason in
/// `sub_type` and the emitting source file/line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DropNotify {
    pub sub_type: u8,
    pub source: u16,
    pub hash: u32,
    pub orig_len: u32,
    pub cap_len: u16,
    pub version: u16,
    pub src_label: u32,
    pub dst_label: u32,
    pub dst_id: u32,
    pub line: u16,
    pub file: u8,
    pub ext_error: i8,
    pub ifindex: u32,
    /// Classifier flags; only present from version 2 onwards.
    pub flags: u8,
}

impl DropNotify {
    pub fn decode(data: &[u8]) -> Result<Self, HeaderError> {
        check_len(data, DROP_NOTIFY_V0_LEN)?;
        let version = u16::from_le_bytes([data[14], data[15]]);
        match version {
            0 | 1 => {}
            DROP_NOTIFY_VERSION_2 => check_len(data, DROP_NOTIFY_V2_LEN)?,
            _ => return Err(HeaderError::UnknownVersion(version)),
        }

        let mut buf = data;
        buf.advance(1); // event type tag
        let sub_type = buf.get_u8();
        let source = buf.get_u16_le();
        let hash = buf.get_u32_le();
        let orig_len = buf.get_u32_le();
        let cap_len = buf.get_u16_le();
        let version = buf.get_u16_le();
        let src_label = buf.get_u32_le();
        let dst_label = buf.get_u32_le();
        let dst_id = buf.get_u32_le();
        let line = buf.get_u16_le();
        let file = buf.get_u8();
        let ext_error = buf.get_i8();
        let ifindex = buf.get_u32_le();
        let flags = if version >= DROP_NOTIFY_VERSION_2 {
            buf.get_u8()
        } else {
            0
        };

        Ok(Self {
            sub_type,
            source,
            hash,
            orig_len,
            cap_len,
            version,
            src_label,
            dst_label,
            dst_id,
            line,
            file,
            ext_error,
            ifindex,
            flags,
        })
    }

    /// Offset of the captured packet bytes within the event buffer.
    pub fn data_offset(&self) -> usize {
        match self.version {
            DROP_NOTIFY_VERSION_2 => DROP_NOTIFY_V2_LEN,
            _ => DROP_NOTIFY_V0_LEN,
        }
    }

    pub fn is_ipv6(&self) -> bool {
        self.flags & CLS_FLAG_IPV6 != 0
    }

    pub fn is_l3_device(&self) -> bool {
        self.flags & CLS_FLAG_L3_DEVICE != 0
    }

    pub fn is_vxlan(&self) -> bool {
        self.flags & CLS_FLAG_VXLAN != 0
    }

    pub fn is_geneve(&self) -> bool {
        self.flags & CLS_FLAG_GENEVE != 0
    }
}

/// Trace notification: a packet observed at a datapath observation point,
/// with connection-tracking state in `reason`.
#[derive(Clone, Debug, Default)]
pub struct TraceNotify {
    pub obs_point: u8,
    pub source: u16,
    pub hash: u32,
    pub orig_len: u32,
    pub cap_len: u16,
    pub version: u16,
    pub src_label: u32,
    pub dst_label: u32,
    pub dst_id: u16,
    pub reason: u8,
    pub flags: u8,
    pub ifindex: u32,
    /// Pre-SNAT source address; all zeroes when not translated. Only the
    /// first four bytes are meaningful for IPv4 flows.
    pub orig_ip: [u8; 16],
}

impl TraceNotify {
    pub fn decode(data: &[u8]) -> Result<Self, HeaderError> {
        check_len(data, TRACE_NOTIFY_V0_LEN)?;
        let version = u16::from_le_bytes([data[14], data[15]]);
        match version {
            0 => {}
            TRACE_NOTIFY_VERSION_1 => check_len(data, TRACE_NOTIFY_V1_LEN)?,
            _ => return Err(HeaderError::UnknownVersion(version)),
        }

        let mut buf = data;
        buf.advance(1);
        let obs_point = buf.get_u8();
        let source = buf.get_u16_le();
        let hash = buf.get_u32_le();
        let orig_len = buf.get_u32_le();
        let cap_len = buf.get_u16_le();
        let version = buf.get_u16_le();
        let src_label = buf.get_u32_le();
        let dst_label = buf.get_u32_le();
        let dst_id = buf.get_u16_le();
        let reason = buf.get_u8();
        let flags = buf.get_u8();
        let ifindex = buf.get_u32_le();
        let mut orig_ip = [0u8; 16];
        if version >= TRACE_NOTIFY_VERSION_1 {
            buf.copy_to_slice(&mut orig_ip);
        }

        Ok(Self {
            obs_point,
            source,
            hash,
            orig_len,
            cap_len,
            version,
            src_label,
            dst_label,
            dst_id,
            reason,
            flags,
            ifindex,
            orig_ip,
        })
    }

    pub fn data_offset(&self) -> usize {
        match self.version {
            TRACE_NOTIFY_VERSION_1 => TRACE_NOTIFY_V1_LEN,
            _ => TRACE_NOTIFY_V0_LEN,
        }
    }

    /// Connection-tracking reason with the encryption bit stripped.
    pub fn trace_reason(&self) -> u8 {
        self.reason & !TRACE_REASON_ENCRYPT_MASK
    }

    pub fn is_encrypted(&self) -> bool {
        self.reason & TRACE_REASON_ENCRYPT_MASK != 0
    }

    pub fn reason_is_known(&self) -> bool {
        self.trace_reason() != TRACE_REASON_UNKNOWN
    }

    pub fn reason_is_reply(&self) -> bool {
        self.trace_reason() == TRACE_REASON_CT_REPLY
    }

    pub fn reason_is_encap(&self) -> bool {
        self.trace_reason() == TRACE_REASON_SRV6_ENCAP
    }

    pub fn reason_is_decap(&self) -> bool {
        self.trace_reason() == TRACE_REASON_SRV6_DECAP
    }

    /// Pre-translation source IP, or `None` when unspecified.
    pub fn original_ip(&self) -> Option<IpAddr> {
        let ip = if self.is_ipv6() {
            IpAddr::V6(Ipv6Addr::from(self.orig_ip))
        } else {
            IpAddr::V4(Ipv4Addr::new(
                self.orig_ip[0],
                self.orig_ip[1],
                self.orig_ip[2],
                self.orig_ip[3],
            ))
        };
        if ip.is_unspecified() {
            None
        } else {
            Some(ip)
        }
    }

    pub fn is_ipv6(&self) -> bool {
        self.flags & CLS_FLAG_IPV6 != 0
    }

    pub fn is_l3_device(&self) -> bool {
        self.flags & CLS_FLAG_L3_DEVICE != 0
    }

    pub fn is_vxlan(&self) -> bool {
        self.flags & CLS_FLAG_VXLAN != 0
    }

    pub fn is_geneve(&self) -> bool {
        self.flags & CLS_FLAG_GENEVE != 0
    }
}

/// Policy verdict notification. `verdict` is signed: negative values carry
/// the drop reason, zero is forwarded, positive is a proxy redirect.
#[derive(Clone, Debug, Default)]
pub struct PolicyVerdictNotify {
    pub sub_type: u8,
    pub source: u16,
    pub hash: u32,
    pub orig_len: u32,
    pub cap_len: u16,
    pub version: u16,
    pub remote_label: u32,
    pub verdict: i32,
    pub dst_port: u16,
    pub proto: u8,
    pub flags: u8,
    pub auth_type: u8,
}

impl PolicyVerdictNotify {
    pub fn decode(data: &[u8]) -> Result<Self, HeaderError> {
        check_len(data, POLICY_VERDICT_NOTIFY_LEN)?;

        let mut buf = data;
        buf.advance(1);
        let sub_type = buf.get_u8();
        let source = buf.get_u16_le();
        let hash = buf.get_u32_le();
        let orig_len = buf.get_u32_le();
        let cap_len = buf.get_u16_le();
        let version = buf.get_u16_le();
        let remote_label = buf.get_u32_le();
        let verdict = buf.get_i32_le();
        let dst_port = buf.get_u16_le();
        let proto = buf.get_u8();
        let flags = buf.get_u8();
        let auth_type = buf.get_u8();

        Ok(Self {
            sub_type,
            source,
            hash,
            orig_len,
            cap_len,
            version,
            remote_label,
            verdict,
            dst_port,
            proto,
            flags,
            auth_type,
        })
    }

    pub fn is_ingress(&self) -> bool {
        self.flags & VERDICT_FLAG_DIRECTION_MASK == VERDICT_FLAG_INGRESS
    }

    pub fn is_audited(&self) -> bool {
        self.flags & VERDICT_FLAG_AUDITED != 0
    }

    pub fn match_type(&self) -> u32 {
        u32::from((self.flags & VERDICT_FLAG_MATCH_TYPE_MASK) >> VERDICT_FLAG_MATCH_TYPE_OFFSET)
    }
}

/// Debug capture: a packet snapshot taken at one of the capture points.
/// The meaning of `arg1` depends on `sub_type` (interface index or proxy
/// port).
#[derive(Clone, Debug, Default)]
pub struct DebugCapture {
    pub sub_type: u8,
    pub source: u16,
    pub hash: u32,
    pub len: u32,
    pub orig_len: u32,
    pub arg1: u32,
    pub arg2: u32,
}

impl DebugCapture {
    pub fn decode(data: &[u8]) -> Result<Self, HeaderError> {
        check_len(data, DEBUG_CAPTURE_LEN)?;

        let mut buf = data;
        buf.advance(1);
        let sub_type = buf.get_u8();
        let source = buf.get_u16_le();
        let hash = buf.get_u32_le();
        let len = buf.get_u32_le();
        let orig_len = buf.get_u32_le();
        let arg1 = buf.get_u32_le();
        let arg2 = buf.get_u32_le();

        Ok(Self {
            sub_type,
            source,
            hash,
            len,
            orig_len,
            arg1,
            arg2,
        })
    }
}
