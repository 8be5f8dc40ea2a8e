// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./threadline.toml` > `~/.config/threadline/threadline.toml`
//! > `/etc/threadline/threadline.toml` with environment variable overrides via
//! the `THREADLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ThreadlineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/threadline/threadline.toml`
/// 3. `~/.config/threadline/threadline.toml`
/// 4. `./threadline.toml`
/// 5. `THREADLINE_*` environment variables
pub fn load_config() -> Result<ThreadlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ThreadlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ThreadlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ThreadlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ThreadlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ThreadlineConfig::default()))
        .merge(Toml::file("/etc/threadline/threadline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("threadline/threadline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("threadline.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `THREADLINE_ENGINE_BASE_URL` must become `engine.base_url`.
fn env_provider() -> Env {
    Env::prefixed("THREADLINE_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("engine_", "engine.", 1)
            .replacen("conversation_", "conversation.", 1);
        mapped.into()
    })
}
