//! Process-wide cache of packet schemas.
//!
//! Schemas are built from a packet type's static declaration the first time
//! they are needed, either in bulk through a [`PacketFamily`] or lazily when
//! the codec meets a type it has not seen. A schema is built completely
//! before it is inserted, so readers only ever see finished schemas; two
//! threads racing on the same type may both build it, and the first insert
//! wins.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::schema::{FieldKind, PacketRef, PacketSchema};
use crate::{Packet, PacketFamily, ProtocolError};

static GLOBAL: LazyLock<Arc<SchemaRegistry>> = LazyLock::new(|| Arc::new(SchemaRegistry::new()));

/// Maps packet types and header tokens to their schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<TypeId, Arc<PacketSchema>>>,
    headers: RwLock<HashMap<&'static str, PacketRef>>,
    families: RwLock<HashSet<TypeId>>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Registers every packet type of family `F`.
    ///
    /// Idempotent: once a family has been registered, later calls return
    /// immediately.
    ///
    /// # Errors
    /// The configuration error of the first member whose declaration is
    /// invalid. Nothing from the family is registered in that case.
    pub fn initialize<F: PacketFamily>(&self) -> Result<(), ProtocolError> {
        if self.is_initialized::<F>() {
            return Ok(());
        }

        let members = F::members();
        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        for member in &members {
            self.collect(*member, &mut pending, &mut seen)?;
        }
        for (packet, schema) in pending.into_iter().rev() {
            self.publish(packet, schema);
        }

        self.families
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<F>());
        tracing::info!(
            family = std::any::type_name::<F>(),
            packets = members.len(),
            "packet family registered"
        );
        Ok(())
    }

    /// Returns `true` once family `F` has been registered.
    pub fn is_initialized<F: PacketFamily>(&self) -> bool {
        self.families
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&TypeId::of::<F>())
    }

    /// Registers a single packet type and returns its schema.
    pub fn register<P: Packet>(&self) -> Result<Arc<PacketSchema>, ProtocolError> {
        self.schema_of_ref(PacketRef::of::<P>())
    }

    /// The schema of `P`, built on first use.
    pub fn schema_of<P: Packet>(&self) -> Result<Arc<PacketSchema>, ProtocolError> {
        self.schema_of_ref(PacketRef::of::<P>())
    }

    /// The schema of the referenced packet type, built on first use.
    ///
    /// Building a schema also registers the types of its nested
    /// sub-packet fields, so a bad nested declaration fails here rather
    /// than in the middle of a message. The whole tree is validated
    /// before any of it is published: a failed call leaves the registry
    /// unchanged.
    ///
    /// # Errors
    /// [`ProtocolError::MissingHeader`] or [`ProtocolError::DuplicateIndex`]
    /// when the declaration, or that of a nested type, is invalid.
    pub fn schema_of_ref(&self, packet: PacketRef) -> Result<Arc<PacketSchema>, ProtocolError> {
        if let Some(schema) = self.cached(packet.type_id()) {
            return Ok(schema);
        }

        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        self.collect(packet, &mut pending, &mut seen)?;

        // Nested types first, so the root becomes visible last.
        let mut root = None;
        for (built_for, schema) in pending.into_iter().rev() {
            root = Some(self.publish(built_for, schema));
        }
        match root {
            Some(schema) => Ok(schema),
            // Another thread published the root while this one was building.
            None => self.schema_of_ref(packet),
        }
    }

    /// The packet type registered for a header token.
    pub fn lookup_header(&self, header: &str) -> Option<PacketRef> {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(header)
            .copied()
    }

    /// Number of schemas built so far.
    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no schema has been built yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, id: TypeId) -> Option<Arc<PacketSchema>> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(Arc::clone)
    }

    /// Builds `packet` and every uncached type nested in it, root first.
    fn collect(
        &self,
        packet: PacketRef,
        pending: &mut Vec<(PacketRef, PacketSchema)>,
        seen: &mut HashSet<TypeId>,
    ) -> Result<(), ProtocolError> {
        let id = packet.type_id();
        if !seen.insert(id) || self.cached(id).is_some() {
            return Ok(());
        }

        let schema = packet.build_schema()?;
        let nested: Vec<PacketRef> = schema
            .fields()
            .iter()
            .filter_map(|field| nested_packet(&field.kind))
            .collect();
        pending.push((packet, schema));
        for inner in nested {
            self.collect(inner, pending, seen)?;
        }
        Ok(())
    }

    fn publish(&self, packet: PacketRef, built: PacketSchema) -> Arc<PacketSchema> {
        let schema = Arc::clone(
            self.schemas
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(packet.type_id())
                .or_insert_with(|| Arc::new(built)),
        );
        self.index_header(packet);
        tracing::debug!(
            packet = packet.type_name(),
            header = packet.header(),
            fields = schema.field_count(),
            "schema built"
        );
        schema
    }

    fn index_header(&self, packet: PacketRef) {
        let mut headers = self.headers.write().unwrap_or_else(PoisonError::into_inner);
        let existing = headers.entry(packet.header()).or_insert(packet);
        if *existing != packet {
            tracing::warn!(
                header = packet.header(),
                kept = existing.type_name(),
                ignored = packet.type_name(),
                "header token declared by two packet types"
            );
        }
    }
}

fn nested_packet(kind: &FieldKind) -> Option<PacketRef> {
    match kind {
        FieldKind::SubPacket(packet) | FieldKind::SubPacketList(packet) => Some(*packet),
        FieldKind::Nullable(inner) | FieldKind::ScalarList(inner) => nested_packet(inner),
        FieldKind::Scalar(_) | FieldKind::Bool | FieldKind::Enum(_) => None,
    }
}
