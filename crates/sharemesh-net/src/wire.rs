//! Wire codec for the gossip protocol
//!
//! Two message kinds travel over a peer channel:
//!
//! ```text
//! shareId|senderId|timestamp_seconds|parentId|refCount|ref1,ref2,...,refN
//! REGISTER:<nodeId>
//! ```
//!
//! All numeric fields are base-10 unsigned except the timestamp, a
//! floating-point seconds value. The trailing reference list is omitted
//! entirely when `refCount` is zero. Malformed input is a typed error the
//! receiving layer drops, never a crash.

use sharemesh_core::{NodeId, Share, ShareError, ShareId, SimTime};
use thiserror::Error;

/// Prefix announcing a peer's identity on a newly opened channel
const REGISTER_PREFIX: &str = "REGISTER:";

/// Minimum pipe-separated fields in a share payload
const MIN_SHARE_FIELDS: usize = 5;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, WireError>;

/// A decoded gossip payload
#[derive(Clone, Debug, PartialEq)]
pub enum WireMessage {
    /// A peer announcing its identity on a channel
    Register(NodeId),

    /// A share flooded through the mesh
    Share(Share),
}

/// Errors produced while decoding a payload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    /// Payload is not valid UTF-8
    #[error("payload is not valid utf-8")]
    NotText,

    /// Fewer pipe-separated fields than a share needs
    #[error("share payload has only {got} fields")]
    MissingFields { got: usize },

    /// A numeric field failed to parse
    #[error("invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// Declared reference count disagrees with the list
    #[error("declared {declared} references, found {actual}")]
    ReferenceCountMismatch { declared: usize, actual: usize },

    /// Fields parsed but violate share construction rules
    #[error("malformed share: {0}")]
    InvalidShare(#[from] ShareError),
}

impl WireMessage {
    /// Serialize for transmission
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Register(node) => format!("{REGISTER_PREFIX}{node}").into_bytes(),
            Self::Share(share) => encode_share(share).into_bytes(),
        }
    }

    /// Parse a received payload
    ///
    /// Control messages are recognized by prefix before any share parsing
    /// is attempted.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        // tolerate a trailing NUL or newline from the transport
        let text = std::str::from_utf8(payload)
            .map_err(|_| WireError::NotText)?
            .trim_end_matches(['\0', '\n', '\r']);

        if let Some(raw) = text.strip_prefix(REGISTER_PREFIX) {
            let id = raw.parse::<u32>().map_err(|_| WireError::InvalidField {
                field: "node id",
                value: raw.to_string(),
            })?;
            return Ok(Self::Register(NodeId::new(id)));
        }

        decode_share(text).map(Self::Share)
    }
}

fn encode_share(share: &Share) -> String {
    let mut out = format!(
        "{}|{}|{}|{}|{}",
        share.id(),
        share.creator(),
        share.timestamp(),
        share.parent(),
        share.references().len(),
    );

    for (i, reference) in share.references().iter().enumerate() {
        out.push(if i == 0 { '|' } else { ',' });
        out.push_str(&reference.to_string());
    }
    out
}

fn decode_share(text: &str) -> Result<Share> {
    let fields: Vec<&str> = text.split('|').collect();
    if fields.len() < MIN_SHARE_FIELDS {
        return Err(WireError::MissingFields { got: fields.len() });
    }

    let id = parse_u32("share id", fields[0])?;
    let creator = parse_u32("sender id", fields[1])?;
    let timestamp = fields[2]
        .parse::<f64>()
        .map_err(|_| WireError::InvalidField {
            field: "timestamp",
            value: fields[2].to_string(),
        })?;
    let parent = parse_u32("parent id", fields[3])?;
    let declared = parse_u32("reference count", fields[4])? as usize;

    let mut references = Vec::with_capacity(declared);
    if let Some(list) = fields.get(MIN_SHARE_FIELDS) {
        for token in list.split(',').filter(|token| !token.is_empty()) {
            references.push(ShareId::new(parse_u32("reference", token)?));
        }
    }
    if references.len() != declared {
        return Err(WireError::ReferenceCountMismatch {
            declared,
            actual: references.len(),
        });
    }

    Ok(Share::new(
        ShareId::new(id),
        NodeId::new(creator),
        SimTime::from_secs(timestamp),
        ShareId::new(parent),
        references,
    )?)
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32> {
    value.parse::<u32>().map_err(|_| WireError::InvalidField {
        field,
        value: value.to_string(),
    })
}
