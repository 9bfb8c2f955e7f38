// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeSet;

use freshet_store::{Error, VaryProvider};

use crate::key::ResourceId;

/// Records which request headers each resource's responses varied on.
///
/// Names are lowercased and de-duplicated before they reach the provider. `Vary: *`
/// never gets here: the cache refuses to store such responses.
#[derive(Debug, Clone)]
pub struct VaryResolver<V> {
    provider: V,
}

impl<V> VaryResolver<V>
where
    V: VaryProvider,
{
    /// Wraps a vary provider.
    #[must_use]
    pub fn new(provider: V) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    #[must_use]
    pub fn provider(&self) -> &V {
        &self.provider
    }

    /// Replaces the recorded header names for `resource`.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn record_vary<I, S>(&self, resource: &ResourceId, names: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        self.provider.set_vary(resource.as_str(), names).await
    }

    /// Returns the recorded header names for `resource`, empty if none were recorded.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn get_vary(&self, resource: &ResourceId) -> Result<BTreeSet<String>, Error> {
        self.provider.get_vary(resource.as_str()).await
    }

    /// Forgets every record.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn clear(&self) -> Result<(), Error> {
        self.provider.clear().await
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use http::Method;

    use super::*;

    #[test]
    fn names_are_normalized_before_recording() {
        block_on(async {
            let resolver = VaryResolver::new(freshet_memory::InMemoryVaryProvider::new());
            let resource = ResourceId::new(&Method::GET, &"https://a.com/x".parse().unwrap());

            resolver
                .record_vary(&resource, ["Accept-Language", " accept ", "ACCEPT", ""])
                .await
                .unwrap();

            let expected: BTreeSet<String> = ["accept".to_owned(), "accept-language".to_owned()].into();
            assert_eq!(resolver.get_vary(&resource).await.unwrap(), expected);
        });
    }

    #[test]
    fn unknown_resource_is_empty() {
        block_on(async {
            let resolver = VaryResolver::new(freshet_memory::InMemoryVaryProvider::new());
            let resource = ResourceId::new(&Method::GET, &"https://a.com/y".parse().unwrap());
            assert!(resolver.get_vary(&resource).await.unwrap().is_empty());
        });
    }
}
