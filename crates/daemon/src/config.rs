// SPDX-License-Identifier: MIT

//! Environment-derived control-plane configuration. Spec.md §6 names the
//! environment variables the whole system reads; `DATABASE_URL`, `PORT`
//! and `MIGRATIONS_PATH` are control-plane specific.

pub struct DaemonConfig {
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub port: u16,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").ok();
        let nats_url = std::env::var("NATS_URL").ok();
        let port = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);

        if std::env::var("MIGRATIONS_PATH").is_ok() {
            tracing::warn!(
                "MIGRATIONS_PATH is set but ignored: migrations are embedded into the \
                 binary at compile time from crates/store/migrations"
            );
        }

        Self { database_url, nats_url, port }
    }
}
