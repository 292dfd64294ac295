//! Header-based dispatch of inbound messages to typed handlers.
//!
//! A [`Router`] maps the header token of a message to the packet type
//! declared for it. The message is decoded into that type and handed to
//! the handler together with an [`Outbox`] that collects the replies.
//!
//! A header can also carry a raw handler that receives the message text
//! as is. It runs when no typed handler exists, or when the typed decode
//! fails and the packet is declared `pass_non_parseable`.

use std::collections::HashMap;
use std::sync::Arc;

use packetforge_protocol::{Codec, Packet, ProtocolError, SchemaRegistry, TextCodec};
use packetforge_transport::ConnectionId;

type TypedHandler =
    Box<dyn Fn(&str, &TextCodec, &mut Outbox<'_>) -> Result<(), ProtocolError> + Send + Sync>;
type RawHandler = Box<dyn Fn(&str, &mut Outbox<'_>) + Send + Sync>;

#[derive(Default)]
struct Route {
    typed: Option<TypedHandler>,
    pass_non_parseable: bool,
    raw: Option<RawHandler>,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Decoded and passed to its handler, or passed as text to a raw
    /// handler.
    Handled,
    /// A handler exists but the message did not decode and no raw handler
    /// took it. Nothing was sent.
    Dropped,
    /// No handler for the header, or no header at all.
    Unknown,
}

/// Replies produced while handling one message.
pub struct Outbox<'c> {
    connection: ConnectionId,
    codec: &'c TextCodec,
    messages: Vec<String>,
}

impl<'c> Outbox<'c> {
    /// An empty outbox for a message received on `connection`.
    pub fn new(connection: ConnectionId, codec: &'c TextCodec) -> Self {
        Self {
            connection,
            codec,
            messages: Vec::new(),
        }
    }

    /// The connection the message arrived on.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Encodes a reply. A packet that fails to encode is logged by the
    /// codec and not queued.
    pub fn push<P: Packet>(&mut self, packet: &P) {
        let text = self.codec.serialize(packet);
        if !text.is_empty() {
            self.messages.push(text);
        }
    }

    /// Queues an already encoded reply. Empty text is ignored.
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.messages.push(text);
        }
    }

    /// Number of queued replies.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been queued.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The queued replies, in push order.
    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// Maps header tokens to packet handlers.
///
/// # Example
///
/// ```
/// use packetforge::prelude::*;
///
/// packet! {
///     #[derive(Debug, Default)]
///     pub struct Ping => "ping" {
///         #[index(0)]
///         pub nonce: u32,
///     }
/// }
///
/// packet! {
///     #[derive(Debug, Default)]
///     pub struct Pong => "pong" {
///         #[index(0)]
///         pub nonce: u32,
///     }
/// }
///
/// let router = Router::new()
///     .route(|ping: Ping, outbox: &mut Outbox<'_>| {
///         outbox.push(&Pong { nonce: ping.nonce });
///     })
///     .unwrap();
///
/// let mut outbox = Outbox::new(ConnectionId::new(1), router.codec());
/// assert_eq!(router.dispatch("ping 7", &mut outbox), Dispatch::Handled);
/// assert_eq!(outbox.into_messages(), vec!["pong 7".to_string()]);
/// ```
pub struct Router {
    codec: TextCodec,
    routes: HashMap<&'static str, Route>,
}

impl Router {
    /// A router over the process-wide schema registry.
    pub fn new() -> Self {
        Self::with_codec(TextCodec::new())
    }

    /// A router over its own schema registry.
    pub fn with_registry(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_codec(TextCodec::with_registry(registry))
    }

    /// A router that decodes and encodes with `codec`.
    pub fn with_codec(codec: TextCodec) -> Self {
        Self {
            codec,
            routes: HashMap::new(),
        }
    }

    /// Registers `handler` for messages whose header is `P::HEADER`.
    ///
    /// The schema of `P` is built here, so a bad declaration fails when
    /// the router is assembled rather than on the first message. A second
    /// route for the same header replaces the first.
    ///
    /// # Errors
    /// The configuration error of `P` or one of its nested packets.
    pub fn route<P, F>(mut self, handler: F) -> Result<Self, ProtocolError>
    where
        P: Packet,
        F: Fn(P, &mut Outbox<'_>) + Send + Sync + 'static,
    {
        let schema = self.codec.registry().register::<P>()?;
        let typed: TypedHandler =
            Box::new(move |text: &str, codec: &TextCodec, outbox: &mut Outbox<'_>| {
                let packet = codec.decode::<P>(text)?;
                handler(packet, outbox);
                Ok(())
            });

        let route = self.routes.entry(P::HEADER).or_default();
        if route.typed.replace(typed).is_some() {
            tracing::warn!(header = P::HEADER, "route replaced");
        }
        route.pass_non_parseable = schema.pass_non_parseable();
        tracing::debug!(
            header = P::HEADER,
            packet = std::any::type_name::<P>(),
            pass_non_parseable = route.pass_non_parseable,
            "route added"
        );
        Ok(self)
    }

    /// Registers `handler` for the raw text of messages whose header is
    /// `header`, leading counter included.
    ///
    /// Without a typed route for the header, every such message goes to
    /// `handler`. Next to a typed route it only receives the messages
    /// that fail to decode, and only if the packet type is declared
    /// `pass_non_parseable`.
    pub fn route_raw<F>(mut self, header: &'static str, handler: F) -> Self
    where
        F: Fn(&str, &mut Outbox<'_>) + Send + Sync + 'static,
    {
        let route = self.routes.entry(header).or_default();
        if route.raw.replace(Box::new(handler)).is_some() {
            tracing::warn!(header, "raw route replaced");
        }
        tracing::debug!(header, "raw route added");
        self
    }

    /// Sets whether inbound messages carry a sequence counter.
    pub fn leading_counter(mut self, includes_leading_counter: bool) -> Self {
        self.codec = self.codec.with_leading_counter(includes_leading_counter);
        self
    }

    /// The codec used for inbound messages and replies.
    pub fn codec(&self) -> &TextCodec {
        &self.codec
    }

    /// Returns `true` if a handler is registered for `header`.
    pub fn handles(&self, header: &str) -> bool {
        self.routes.contains_key(header)
    }

    /// Decodes `text` and runs the handler for its header.
    pub fn dispatch(&self, text: &str, outbox: &mut Outbox<'_>) -> Dispatch {
        let Some(header) = self.codec.header_of(text) else {
            tracing::debug!("message without a header token");
            return Dispatch::Unknown;
        };
        let Some(route) = self.routes.get(header) else {
            tracing::debug!(header, "no handler for header");
            return Dispatch::Unknown;
        };

        let Some(typed) = &route.typed else {
            return match &route.raw {
                Some(raw) => {
                    raw(text, outbox);
                    Dispatch::Handled
                }
                None => Dispatch::Unknown,
            };
        };

        match typed(text, &self.codec, outbox) {
            Ok(()) => Dispatch::Handled,
            Err(e) => match &route.raw {
                Some(raw) if route.pass_non_parseable => {
                    tracing::debug!(packet = text, error = %e, "passing non-parseable packet");
                    raw(text, outbox);
                    Dispatch::Handled
                }
                _ => {
                    tracing::warn!(packet = text, error = %e, "the serialized packet has the wrong format");
                    Dispatch::Dropped
                }
            },
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
