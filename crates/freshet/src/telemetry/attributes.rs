// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub(crate) const EVENT_NAME: &str = "freshet.event";

pub(crate) const CACHE_NAME: &str = "cache.name";

pub(crate) const CACHE_OPERATION_NAME: &str = "cache.operation";

pub(crate) const CACHE_ACTIVITY_NAME: &str = "cache.activity";

#[cfg(test)]
pub(crate) const CACHE_DURATION_NAME: &str = "cache.duration_ns";
