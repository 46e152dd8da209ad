use thiserror::Error;

use super::{resolve, type_name, Resolved};
use crate::json::{JsonErrorKind, MarshalProtoJson, MarshalState, UnmarshalProtoJson, UnmarshalState};
use crate::{DecodeError, EncodeError, Message, Name};

/// `google.protobuf.Any`: a message of any type with the URL naming it.
#[derive(Clone, Debug, Default, PartialEq, Message)]
#[protolite(name = "google.protobuf.Any")]
pub struct Any {
    /// `type.googleapis.com/<full name>`.
    #[protolite(tag = 1, string)]
    pub type_url: String,
    /// Binary encoding of the message.
    #[protolite(tag = 2, bytes)]
    pub value: Vec<u8>,
}

/// Error returned by [`Any::unpack`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AnyError {
    /// The `Any` holds another type.
    #[error("Any holds {actual:?}, not {expected:?}")]
    TypeMismatch {
        /// Requested type.
        expected: &'static str,
        /// Type named by the type URL.
        actual: String,
    },
    /// The payload does not decode as the requested type.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Any {
    /// Pack `msg`.
    pub fn pack<M: Message + Name>(msg: &M) -> Result<Self, EncodeError> {
        Ok(Self {
            type_url: M::type_url(),
            value: msg.marshal_vt()?,
        })
    }

    /// Decode the payload as `M`.
    pub fn unpack<M: Message + Name>(&self) -> Result<M, AnyError> {
        if !self.is::<M>() {
            return Err(AnyError::TypeMismatch {
                expected: M::FULL_NAME,
                actual: self.type_name().to_owned(),
            });
        }
        Ok(crate::read(&self.value)?)
    }

    /// Full name of the packed type.
    pub fn type_name(&self) -> &str {
        type_name(&self.type_url)
    }

    /// Whether the packed type is `M`.
    pub fn is<M: Name>(&self) -> bool {
        self.type_name() == M::FULL_NAME
    }
}

impl MarshalProtoJson for Any {
    fn marshal_protojson(&self, s: &mut MarshalState) {
        if self.type_url.is_empty() {
            s.write_object_start();
            s.write_object_end();
            return;
        }

        let registry = s.config().registry.clone();
        let Some(resolved) = resolve(&self.type_url, registry.as_deref()) else {
            tracing::debug!(type_url = %self.type_url, "unresolvable Any type URL");
            return s.set_error(JsonErrorKind::UnresolvableTypeUrl(self.type_url.clone()));
        };

        s.write_object_start();
        s.write_object_field("@type");
        s.write_string(&self.type_url);
        match resolved {
            Resolved::WellKnown(codec) => {
                s.write_more();
                s.write_object_field("value");
                let mut sub = s.sub_message();
                codec.marshal(&self.value, &mut sub);
                s.write_raw(sub.as_str());
                s.write_object_end();
            }
            Resolved::Message(codec) => {
                // The message's own object, minus its opening brace, follows
                // the "@type" field.
                let mut sub = s.sub_message();
                codec.marshal(&self.value, &mut sub);
                if s.has_error() {
                    return;
                }
                let Some(rest) = sub.as_str().strip_prefix('{') else {
                    return s.set_error(JsonErrorKind::Custom(format!(
                        "{} did not marshal to a JSON object",
                        codec.full_name()
                    )));
                };
                if rest != "}" {
                    s.write_more();
                }
                s.write_raw(rest);
            }
        }
    }
}

impl UnmarshalProtoJson for Any {
    fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>) {
        let Some(raw) = s.read_raw_value() else {
            return;
        };
        let mut sub = s.sub(raw);
        if !sub.enter_object() {
            return;
        }

        let type_url = match sub.next_key() {
            None => return,
            Some(key) if key == "@type" => sub.read_string(),
            Some(_) => {
                sub.skip_value();
                let mut misplaced = false;
                while let Some(key) = sub.next_key() {
                    misplaced |= key == "@type";
                    sub.skip_value();
                }
                return s.set_error(if misplaced {
                    JsonErrorKind::MisplacedAnyType
                } else {
                    JsonErrorKind::MissingAnyType
                });
            }
        };
        if s.has_error() {
            return;
        }
        if !self.type_url.is_empty() && self.type_url != type_url {
            return s.set_error(JsonErrorKind::AnyTypeMismatch {
                expected: self.type_url.clone(),
                actual: type_url,
            });
        }

        let registry = s.config().registry.clone();
        let value = match resolve(&type_url, registry.as_deref()) {
            Some(Resolved::WellKnown(codec)) => {
                let mut value = Vec::new();
                while let Some(key) = sub.next_key() {
                    match key.as_str() {
                        "value" => value = codec.unmarshal(&mut sub),
                        _ => sub.skip_unknown_field(&key),
                    }
                }
                value
            }
            Some(Resolved::Message(codec)) => {
                // The message reads the whole object and skips "@type" as an
                // unknown key.
                codec.unmarshal(&mut s.sub(raw))
            }
            None => {
                tracing::debug!(%type_url, "unresolvable Any type URL");
                return s.set_error(JsonErrorKind::UnresolvableTypeUrl(type_url));
            }
        };
        if s.has_error() {
            return;
        }
        self.type_url = type_url;
        self.value.extend_from_slice(&value);
    }
}
