//! Codec catalog and registry.
//!
//! # Responsibilities
//! - Hold the static namespace → codec table declared by the embedding code
//! - Select the codecs of the configured namespaces at initialisation
//! - Answer type → codec lookups from any thread
//!
//! # Design Decisions
//! - A namespace selects itself and everything nested under `namespace.`
//! - Later registrations for the same type replace earlier ones (logged)

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::HttpCodec;
use crate::runtime::message::MessageType;

/// Startup-time table of codecs grouped by namespace.
#[derive(Default, Clone)]
pub struct CodecCatalog {
    namespaces: Vec<(String, Vec<Arc<dyn HttpCodec>>)>,
}

impl CodecCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a codec under `namespace`.
    pub fn register(&mut self, namespace: &str, codec: Arc<dyn HttpCodec>) {
        match self.namespaces.iter_mut().find(|(ns, _)| ns == namespace) {
            Some((_, codecs)) => codecs.push(codec),
            None => self.namespaces.push((namespace.to_string(), vec![codec])),
        }
    }

    /// Builder-style [`CodecCatalog::register`].
    pub fn with_codec(mut self, namespace: &str, codec: Arc<dyn HttpCodec>) -> Self {
        self.register(namespace, codec);
        self
    }

    /// Codecs whose namespace equals `namespace` or is nested under it.
    fn codecs_in<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a Arc<dyn HttpCodec>> + 'a {
        self.namespaces
            .iter()
            .filter(move |(ns, _)| is_within(ns, namespace))
            .flat_map(|(_, codecs)| codecs.iter())
    }
}

fn is_within(candidate: &str, namespace: &str) -> bool {
    candidate == namespace
        || (candidate.starts_with(namespace) && candidate[namespace.len()..].starts_with('.'))
}

impl fmt::Debug for CodecCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (ns, codecs) in &self.namespaces {
            let types: Vec<_> = codecs.iter().map(|c| c.message_type()).collect();
            map.entry(ns, &types);
        }
        map.finish()
    }
}

/// Read-only map from declared message type to its codec.
#[derive(Default, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<MessageType, Arc<dyn HttpCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the codecs of the given namespaces.
    pub fn scan<S: AsRef<str>>(catalog: &CodecCatalog, namespaces: &[S]) -> Self {
        let mut registry = Self::new();
        for namespace in namespaces {
            let namespace = namespace.as_ref();
            let mut found = 0usize;
            for codec in catalog.codecs_in(namespace) {
                registry.insert(Arc::clone(codec));
                found += 1;
            }
            if found == 0 {
                tracing::warn!(namespace, "No codecs registered under namespace");
            } else {
                tracing::debug!(namespace, codecs = found, "Codec namespace scanned");
            }
        }
        registry
    }

    pub fn insert(&mut self, codec: Arc<dyn HttpCodec>) {
        let ty = codec.message_type();
        if self.codecs.insert(ty, codec).is_some() {
            tracing::warn!(message_type = %ty, "Codec replaced by a later registration");
        }
    }

    pub fn get(&self, ty: &MessageType) -> Option<&Arc<dyn HttpCodec>> {
        self.codecs.get(ty)
    }

    pub fn contains(&self, ty: &MessageType) -> bool {
        self.codecs.contains_key(ty)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.codecs.keys()).finish()
    }
}
