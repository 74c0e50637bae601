//! Deployment descriptor: how many replicas run and how traffic reaches them.
//!
//! The descriptor is data for an external orchestrator. This module only parses
//! and validates it; `manifest` renders it into Kubernetes objects. A validated
//! [`DeploymentDescriptor`] has no setters, so changing a deployment means
//! loading a new descriptor.

mod manifest;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use manifest::render;

/// Name used for labels and object names when the descriptor omits one
pub const DEFAULT_APP_NAME: &str = "hello-service";

/// Kubernetes default NodePort range
pub const NODE_PORT_RANGE: std::ops::RangeInclusive<u16> = 30000..=32767;

/// Longest tag accepted by container registries
const MAX_TAG_LEN: usize = 128;

/// Shortest hex digest accepted (128-bit)
const MIN_DIGEST_HEX_LEN: usize = 32;

/// Longest DNS-1123 label
const MAX_NAME_LEN: usize = 63;

/// How traffic reaches the replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Routing {
    /// Reachable only from inside the cluster network.
    ClusterLocal,
    /// Reachable through a port opened on every cluster node.
    NodeExposed,
}

impl fmt::Display for Routing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Routing::ClusterLocal => f.write_str("ClusterLocal"),
            Routing::NodeExposed => f.write_str("NodeExposed"),
        }
    }
}

/// Service section of a validated descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    exposed_port: u16,
    routing: Routing,
    node_port: Option<u16>,
}

impl ServiceSpec {
    pub fn exposed_port(&self) -> u16 {
        self.exposed_port
    }

    pub fn routing(&self) -> Routing {
        self.routing
    }

    /// Fixed node port; `None` lets the orchestrator pick one.
    pub fn node_port(&self) -> Option<u16> {
        self.node_port
    }
}

/// A validated deployment descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    name: String,
    replicas: u32,
    image: String,
    container_port: u16,
    service: ServiceSpec,
}

impl DeploymentDescriptor {
    /// Read and validate a descriptor file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DescriptorError> {
        let contents = std::fs::read_to_string(path)?;
        contents.parse()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn container_port(&self) -> u16 {
        self.container_port
    }

    pub fn service(&self) -> &ServiceSpec {
        &self.service
    }

    /// Check that the service process binds the port the orchestrator routes to.
    pub fn ensure_port_matches(&self, bind_port: u16) -> Result<(), DescriptorError> {
        if self.container_port == bind_port {
            Ok(())
        } else {
            Err(DescriptorError::PortMismatch {
                descriptor: self.container_port,
                bound: bind_port,
            })
        }
    }
}

impl FromStr for DeploymentDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawDescriptor = toml::from_str(s)?;
        DeploymentDescriptor::try_from(raw)
    }
}

impl fmt::Display for DeploymentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} replicas={} image={} containerPort={} exposedPort={} routing={}",
            self.name,
            self.replicas,
            self.image,
            self.container_port,
            self.service.exposed_port,
            self.service.routing
        )?;
        if let Some(node_port) = self.service.node_port {
            write!(f, " nodePort={}", node_port)?;
        }
        Ok(())
    }
}

/// Descriptor as written on disk, before range checks.
///
/// Integers are read wide so that `replicas = 0` or `containerPort = 70000`
/// reach validation and get a field-specific message instead of a generic
/// type error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawDescriptor {
    name: Option<String>,
    replicas: i64,
    image: String,
    container_port: i64,
    service: RawService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawService {
    exposed_port: i64,
    routing: Routing,
    node_port: Option<i64>,
}

impl TryFrom<RawDescriptor> for DeploymentDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        let name = raw.name.unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        validate_name(&name)?;

        let replicas = u32::try_from(raw.replicas)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| invalid("replicas", format!("must be at least 1, got {}", raw.replicas)))?;

        validate_image(&raw.image)?;

        let container_port = port("containerPort", raw.container_port)?;
        let exposed_port = port("service.exposedPort", raw.service.exposed_port)?;

        let node_port = match (raw.service.routing, raw.service.node_port) {
            (_, None) => None,
            (Routing::ClusterLocal, Some(_)) => {
                return Err(invalid(
                    "service.nodePort",
                    "only valid with NodeExposed routing".to_string(),
                ));
            }
            (Routing::NodeExposed, Some(value)) => {
                let node_port = port("service.nodePort", value)?;
                if !NODE_PORT_RANGE.contains(&node_port) {
                    return Err(invalid(
                        "service.nodePort",
                        format!(
                            "must be within {}-{}, got {}",
                            NODE_PORT_RANGE.start(),
                            NODE_PORT_RANGE.end(),
                            node_port
                        ),
                    ));
                }
                Some(node_port)
            }
        };

        Ok(Self {
            name,
            replicas,
            image: raw.image,
            container_port,
            service: ServiceSpec {
                exposed_port,
                routing: raw.service.routing,
                node_port,
            },
        })
    }
}

fn invalid(field: &'static str, reason: String) -> DescriptorError {
    DescriptorError::Invalid { field, reason }
}

fn port(field: &'static str, value: i64) -> Result<u16, DescriptorError> {
    u16::try_from(value)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| invalid(field, format!("must be within 1-65535, got {}", value)))
}

/// DNS-1123 label: lowercase alphanumerics and '-', alphanumeric at both ends.
fn validate_name(name: &str) -> Result<(), DescriptorError> {
    let well_formed = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if well_formed {
        Ok(())
    } else {
        Err(invalid(
            "name",
            format!("{:?} is not a DNS-1123 label", name),
        ))
    }
}

/// `algorithm:hex`, e.g. `sha256:` followed by 64 hex digits.
fn is_digest(digest: &str) -> bool {
    let Some((algorithm, encoded)) = digest.split_once(':') else {
        return false;
    };
    let algorithm_ok = !algorithm.is_empty()
        && algorithm.bytes().all(|b| {
            b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'+' | b'.' | b'_' | b'-')
        });
    let encoded_ok = encoded.len() >= MIN_DIGEST_HEX_LEN
        && encoded.bytes().all(|b| b.is_ascii_hexdigit());
    algorithm_ok && encoded_ok
}

/// Accepts `[registry[:port]/]path[:tag][@digest]`.
fn validate_image(image: &str) -> Result<(), DescriptorError> {
    let fail = |reason: &str| Err(invalid("image", format!("{:?}: {}", image, reason)));

    if image.is_empty() {
        return fail("must not be empty");
    }
    if image.chars().any(char::is_whitespace) {
        return fail("must not contain whitespace");
    }

    let without_digest = match image.split_once('@') {
        Some((rest, digest)) => {
            if !is_digest(digest) {
                return fail("digest must be algorithm:hex, e.g. sha256:<64 hex digits>");
            }
            rest
        }
        None => image,
    };

    // A ':' after the last '/' starts the tag; earlier ones belong to a registry port.
    let last_slash = without_digest.rfind('/').map_or(0, |i| i + 1);
    let (repository, tag) = match without_digest[last_slash..].find(':') {
        Some(i) => {
            let split = last_slash + i;
            (&without_digest[..split], Some(&without_digest[split + 1..]))
        }
        None => (without_digest, None),
    };

    if let Some(tag) = tag {
        let tag_ok = !tag.is_empty()
            && tag.len() <= MAX_TAG_LEN
            && tag
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));
        if !tag_ok {
            return fail("tag must be 1-128 characters of [A-Za-z0-9_.-]");
        }
    }

    let mut components = repository.split('/').peekable();
    let first = components.next().unwrap_or_default();
    let has_registry = components.peek().is_some()
        && (first.contains('.') || first.contains(':') || first == "localhost");
    let path: Vec<&str> = if has_registry {
        if first.is_empty() {
            return fail("empty registry");
        }
        components.collect()
    } else {
        std::iter::once(first).chain(components).collect()
    };

    let path_ok = path.iter().all(|component| {
        !component.is_empty()
            && component.bytes().all(|b| {
                b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-')
            })
    });
    if !path_ok {
        return fail("repository path must be non-empty lowercase components");
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("Failed to read descriptor: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse descriptor: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Descriptor containerPort {descriptor} does not match bound port {bound}")]
    PortMismatch { descriptor: u16, bound: u16 },
}
