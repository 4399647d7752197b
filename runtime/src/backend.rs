//! Backend device record parser.
//!
//! Backend attachments are declared as textual records of the form
//! `key=['attr1=val1, attr2=val2, ...']` with `key` either `disk` or `vif`.
//! Parsing is a pure transform: one record in, one [`BackendRecord`] out,
//! or a parse error reported to the caller.

use warden_core::{Result, WardenError};

/// Disk access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskAccess {
    ReadWrite,
    ReadOnly,
}

impl std::fmt::Display for DiskAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadWrite => write!(f, "rw"),
            Self::ReadOnly => write!(f, "ro"),
        }
    }
}

/// One parsed backend device attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRecord {
    /// Virtual block device served by another domain.
    Disk {
        backend_id: u32,
        device_name: String,
        access_mode: DiskAccess,
        target_path: String,
    },
    /// Virtual network interface bridged in the backend domain.
    NetworkInterface {
        backend_id: u32,
        bridge_name: String,
        mac_address: String,
        ip_address: String,
        netmask: String,
        gateway: Option<String>,
    },
}

impl BackendRecord {
    /// Id of the domain serving this device.
    pub fn backend_id(&self) -> u32 {
        match self {
            Self::Disk { backend_id, .. } | Self::NetworkInterface { backend_id, .. } => {
                *backend_id
            }
        }
    }
}

/// Parse one textual backend record.
///
/// Unknown attribute names are ignored so that records written for newer
/// hosts keep parsing on older ones. A missing required attribute for the
/// record's kind is an error, and nothing is produced.
pub fn parse_record(record: &str) -> Result<BackendRecord> {
    let record = record.trim();
    let (key, rest) = record
        .split_once('=')
        .ok_or_else(|| WardenError::Parse(format!("missing '=' in record: {record}")))?;

    let inner = rest
        .strip_prefix("['")
        .and_then(|r| r.strip_suffix("']"))
        .ok_or_else(|| {
            WardenError::Parse(format!("record body must be bracketed as ['...']: {rest}"))
        })?;

    let attrs = parse_attributes(inner)?;

    match key.trim() {
        "disk" => parse_disk(&attrs),
        "vif" => parse_vif(&attrs),
        other => Err(WardenError::Parse(format!("unknown record key '{other}'"))),
    }
}

fn parse_attributes(inner: &str) -> Result<Vec<(&str, &str)>> {
    let mut attrs = Vec::new();
    for part in inner.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (name, value) = part
            .split_once('=')
            .ok_or_else(|| WardenError::Parse(format!("attribute without value: '{part}'")))?;
        attrs.push((name.trim(), value.trim()));
    }
    Ok(attrs)
}

fn lookup<'a>(attrs: &[(&'a str, &'a str)], name: &str) -> Option<&'a str> {
    attrs.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

fn required<'a>(attrs: &[(&'a str, &'a str)], name: &str) -> Result<&'a str> {
    lookup(attrs, name)
        .ok_or_else(|| WardenError::Parse(format!("missing required attribute '{name}'")))
}

fn parse_backend_id(attrs: &[(&str, &str)]) -> Result<u32> {
    let raw = required(attrs, "backend")?;
    raw.parse::<u32>()
        .map_err(|_| WardenError::Parse(format!("backend id is not an unsigned integer: '{raw}'")))
}

fn parse_disk(attrs: &[(&str, &str)]) -> Result<BackendRecord> {
    let backend_id = parse_backend_id(attrs)?;
    let device_name = required(attrs, "vdev")?.to_string();
    let access_mode = match required(attrs, "access")? {
        "rw" => DiskAccess::ReadWrite,
        "ro" => DiskAccess::ReadOnly,
        other => {
            return Err(WardenError::Parse(format!(
                "disk access must be 'rw' or 'ro', got '{other}'"
            )))
        }
    };
    let target_path = required(attrs, "target")?.to_string();

    Ok(BackendRecord::Disk {
        backend_id,
        device_name,
        access_mode,
        target_path,
    })
}

fn parse_vif(attrs: &[(&str, &str)]) -> Result<BackendRecord> {
    let backend_id = parse_backend_id(attrs)?;
    let bridge_name = required(attrs, "bridge")?.to_string();
    let mac_address = required(attrs, "mac")?.to_string();

    // The ip attribute packs "address netmask [gateway]" into one value.
    let ip_raw = required(attrs, "ip")?;
    let mut parts = ip_raw.split_whitespace();
    let ip_address = parts
        .next()
        .ok_or_else(|| WardenError::Parse("empty 'ip' attribute".to_string()))?
        .to_string();
    let netmask = parts
        .next()
        .ok_or_else(|| WardenError::Parse(format!("'ip' attribute missing netmask: '{ip_raw}'")))?
        .to_string();
    let gateway = parts.next().map(str::to_string);

    Ok(BackendRecord::NetworkInterface {
        backend_id,
        bridge_name,
        mac_address,
        ip_address,
        netmask,
        gateway,
    })
}
