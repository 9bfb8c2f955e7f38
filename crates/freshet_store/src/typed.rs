// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed projections over stores of encoded values.
//!
//! Stores hold [`Envelope`]s: an encoded payload tagged with the name of the type it was
//! encoded from. Reading a value back as a specific type first checks the tag, which
//! separates "this is somebody else's value" ([`ErrorKind::TypeMismatch`]) from "this
//! value is damaged" ([`ErrorKind::CorruptEntry`]).

use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{EntryStore, Error, ErrorKind};

/// A type that can be persisted in an [`Envelope`].
///
/// The tag must be unique among the types sharing a store and should change whenever
/// the encoded layout of the type changes incompatibly.
///
/// # Examples
///
/// ```
/// use freshet_store::{Envelope, StoreType};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Session {
///     user: String,
/// }
///
/// impl StoreType for Session {
///     const TYPE_TAG: &'static str = "session.v1";
/// }
///
/// let envelope = Envelope::encode(&Session { user: "ana".into() })?;
/// assert_eq!(envelope.type_tag(), "session.v1");
/// assert_eq!(envelope.decode::<Session>()?.user, "ana");
/// # Ok::<(), freshet_store::Error>(())
/// ```
pub trait StoreType: Serialize + DeserializeOwned {
    /// The tag identifying this type inside an envelope.
    const TYPE_TAG: &'static str;
}

/// An encoded value tagged with its type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    type_tag: String,
    payload: Bytes,
}

impl Envelope {
    /// Encodes a value into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::CorruptEntry`] if the value cannot be encoded.
    pub fn encode<T: StoreType>(value: &T) -> Result<Self, Error> {
        let payload = bincode::serialize(value).map_err(Error::corrupt_entry)?;
        Ok(Self {
            type_tag: T::TYPE_TAG.to_owned(),
            payload: Bytes::from(payload),
        })
    }

    /// Reassembles an envelope from a tag and a payload, as read back from a backend.
    #[must_use]
    pub fn from_parts(type_tag: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            type_tag: type_tag.into(),
            payload: payload.into(),
        }
    }

    /// Returns the type tag.
    #[must_use]
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Returns the encoded payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns `true` if the envelope was produced from `T`.
    #[must_use]
    pub fn is<T: StoreType>(&self) -> bool {
        self.type_tag == T::TYPE_TAG
    }

    /// Decodes the payload as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TypeMismatch`] if the envelope holds another type and
    /// [`ErrorKind::CorruptEntry`] if the payload cannot be decoded.
    pub fn decode<T: StoreType>(&self) -> Result<T, Error> {
        if !self.is::<T>() {
            return Err(Error::type_mismatch(T::TYPE_TAG, &self.type_tag));
        }
        bincode::deserialize(&self.payload).map_err(Error::corrupt_entry)
    }
}

/// How a typed read treats a stored value of the wrong type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MismatchPolicy {
    /// Report the mismatch as an [`ErrorKind::TypeMismatch`] error.
    #[default]
    Raise,
    /// Treat the read as a miss.
    TreatAsMiss,
}

/// Typed reads and writes for any store of [`Envelope`]s.
///
/// This trait is automatically implemented for every `EntryStore<K, Envelope>`.
pub trait TypedStoreExt<K>: EntryStore<K, Envelope> {
    /// Reads the value under `key` as `T`.
    ///
    /// # Errors
    ///
    /// Propagates store failures, returns [`ErrorKind::CorruptEntry`] for undecodable
    /// payloads and [`ErrorKind::TypeMismatch`] for foreign values unless `policy`
    /// suppresses it.
    fn get_typed<T>(&self, key: &K, policy: MismatchPolicy) -> impl Future<Output = Result<Option<T>, Error>> + Send
    where
        T: StoreType + Send;

    /// Encodes `value` and writes it under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the store write fails.
    fn insert_typed<T>(&self, key: &K, value: &T) -> impl Future<Output = Result<(), Error>> + Send
    where
        T: StoreType + Sync;
}

impl<K, S> TypedStoreExt<K> for S
where
    K: Sync,
    S: EntryStore<K, Envelope>,
{
    async fn get_typed<T>(&self, key: &K, policy: MismatchPolicy) -> Result<Option<T>, Error>
    where
        T: StoreType + Send,
    {
        let Some(envelope) = self.get(key).await? else {
            return Ok(None);
        };

        match envelope.decode::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::TypeMismatch && policy == MismatchPolicy::TreatAsMiss => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn insert_typed<T>(&self, key: &K, value: &T) -> Result<(), Error>
    where
        T: StoreType + Sync,
    {
        let envelope = Envelope::encode(value)?;
        self.insert(key, envelope).await
    }
}
