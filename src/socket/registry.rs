use crate::error::RegistryError;
use ahash::{AHashMap, AHashSet};

pub const TEXT: &str = "Text";
pub const NUMBER: &str = "Number";
pub const BOOLEAN: &str = "Boolean";
pub const NONE: &str = "None";
pub const LIST: &str = "List";
pub const DICTIONARY: &str = "Dictionary";
pub const ANY: &str = "Any";

/// The full primitive type list, in the order options appear when a node
/// has no propagated type restriction.
pub const DEFAULT_TYPE_OPTIONS: [&str; 7] =
    [TEXT, NUMBER, BOOLEAN, NONE, LIST, DICTIONARY, ANY];

/// Cyclic colour palette for sockets registered without an explicit colour.
/// Assignment order follows registration order, so a given sequence of
/// `register` calls always produces the same colouring.
const PALETTE: [&str; 10] = [
    "#96ceb4", "#ffcc5c", "#ff6f69", "#88d8b0", "#6c88c4", "#c38d9e", "#41b3a3",
    "#e8a87c", "#85cdca", "#c1c8e4",
];

/// A named compatibility type. Every port in the graph carries exactly one
/// socket name; two ports may be wired together only if their sockets are
/// compatible.
#[derive(Debug, Clone, PartialEq)]
pub struct Socket {
    pub name: String,
    pub colour: String,
    /// Names of other sockets this one may connect to. Kept symmetric: if
    /// A lists B, B lists A.
    pub compatible: AHashSet<String>,
}

impl Socket {
    fn new(name: &str, colour: String) -> Self {
        Self {
            name: name.to_string(),
            colour,
            compatible: AHashSet::new(),
        }
    }
}

/// Session-scoped table of socket types.
///
/// Sockets are append-only: primitives are seeded at session startup, one
/// socket per schema definition follows, and composite sockets are created
/// lazily as the resolver encounters container and union schemas. Nothing
/// is ever removed for the lifetime of the session.
#[derive(Debug, Default)]
pub struct SocketRegistry {
    sockets: AHashMap<String, Socket>,
    palette_cursor: usize,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the seven primitive sockets registered, each
    /// reciprocally compatible with `Any`.
    pub fn with_defaults() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for name in DEFAULT_TYPE_OPTIONS {
            registry.register(name, None)?;
        }
        for name in DEFAULT_TYPE_OPTIONS {
            if name != ANY {
                registry.link(name, ANY);
            }
        }
        Ok(registry)
    }

    /// Registers a new socket under a globally unique name.
    pub fn register(&mut self, name: &str, colour: Option<&str>) -> Result<&Socket, RegistryError> {
        if self.sockets.contains_key(name) {
            return Err(RegistryError::DuplicateSocket {
                name: name.to_string(),
            });
        }
        let colour = match colour {
            Some(c) => c.to_string(),
            None => self.next_palette_colour(),
        };
        log::debug!("registered socket '{}' ({})", name, colour);
        Ok(self
            .sockets
            .entry(name.to_string())
            .or_insert_with(|| Socket::new(name, colour)))
    }

    /// Looks the socket up, registering it with an auto-assigned colour if
    /// missing. Used for `$ref` sockets, which carry no compatibility union.
    pub(crate) fn ensure(&mut self, name: &str) -> &Socket {
        if !self.sockets.contains_key(name) {
            let colour = self.next_palette_colour();
            log::debug!("registered socket '{}' ({})", name, colour);
            self.sockets.insert(name.to_string(), Socket::new(name, colour));
        }
        &self.sockets[name]
    }

    pub fn get(&self, name: &str) -> Option<&Socket> {
        self.sockets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sockets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    /// Returns the composite socket named after its constituents, creating
    /// it on first request.
    ///
    /// The name is `explicit_name` if given, otherwise the constituent
    /// names joined with `" | "`. A repeat request for an existing name is
    /// a pure lookup; no compatibility is recombined. The compatibility set
    /// is the union of every constituent plus each constituent's compatible
    /// set *as registered right now* - if a constituent's set grows later,
    /// the composite keeps its original set. Connection-validity checks
    /// depend on these exact sets, so this staleness is deliberate.
    pub fn resolve_or_create_composite(
        &mut self,
        constituents: &[String],
        explicit_name: Option<&str>,
    ) -> Result<String, RegistryError> {
        let name = match explicit_name {
            Some(n) => n.to_string(),
            None => constituents.join(" | "),
        };
        if self.sockets.contains_key(&name) {
            return Ok(name);
        }
        for constituent in constituents {
            if !self.sockets.contains_key(constituent) {
                return Err(RegistryError::UnknownSocket {
                    name: constituent.clone(),
                });
            }
        }

        // Colour comes from the first constituent with a colour of its own,
        // skipping the null-like None socket.
        let colour = constituents
            .iter()
            .filter(|c| c.as_str() != NONE)
            .find_map(|c| self.sockets.get(c).map(|s| s.colour.clone()))
            .unwrap_or_else(|| self.next_palette_colour());

        let mut compatible = AHashSet::new();
        for constituent in constituents {
            compatible.insert(constituent.clone());
            if let Some(socket) = self.sockets.get(constituent) {
                compatible.extend(socket.compatible.iter().cloned());
            }
        }
        compatible.remove(&name);

        for constituent in constituents {
            if let Some(socket) = self.sockets.get_mut(constituent) {
                socket.compatible.insert(name.clone());
            }
        }

        log::debug!("created composite socket '{}' ({})", name, colour);
        let mut socket = Socket::new(&name, colour);
        socket.compatible = compatible;
        self.sockets.insert(name.clone(), socket);
        Ok(name)
    }

    /// Whether a port typed `source` may be wired to a port typed `target`.
    /// `Any` is a wildcard on either side.
    pub fn compatible(&self, source: &str, target: &str) -> bool {
        if source == target || source == ANY || target == ANY {
            return true;
        }
        self.sockets
            .get(source)
            .is_some_and(|s| s.compatible.contains(target))
            || self
                .sockets
                .get(target)
                .is_some_and(|s| s.compatible.contains(source))
    }

    /// Makes two existing sockets reciprocally compatible.
    fn link(&mut self, a: &str, b: &str) {
        if let Some(socket) = self.sockets.get_mut(a) {
            socket.compatible.insert(b.to_string());
        }
        if let Some(socket) = self.sockets.get_mut(b) {
            socket.compatible.insert(a.to_string());
        }
    }

    fn next_palette_colour(&mut self) -> String {
        let colour = PALETTE[self.palette_cursor % PALETTE.len()];
        self.palette_cursor += 1;
        colour.to_string()
    }
}
