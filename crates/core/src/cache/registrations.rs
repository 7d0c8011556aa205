//! Persisted lifecycle slots.
//!
//! The host records which bucket holds the active and waiting versions next
//! to the buckets themselves, so a restart resumes serving without a reinstall.

use tokio_rusqlite::params;

use super::connection::CacheDb;
use crate::Error;

/// Cache names occupying the active and waiting slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registrations {
    pub active: Option<String>,
    pub waiting: Option<String>,
}

/// Durable record of the host's lifecycle slots.
#[async_trait::async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn load_registrations(&self) -> Result<Registrations, Error>;

    /// Replace both slots at once.
    async fn save_registrations(&self, registrations: &Registrations) -> Result<(), Error>;
}

#[async_trait::async_trait]
impl RegistrationStore for CacheDb {
    async fn load_registrations(&self) -> Result<Registrations, Error> {
        self.conn
            .call(|conn| -> Result<Registrations, Error> {
                let mut stmt = conn.prepare("SELECT slot, cache_name FROM registrations")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut registrations = Registrations::default();
                for (slot, cache_name) in rows {
                    match slot.as_str() {
                        "active" => registrations.active = Some(cache_name),
                        "waiting" => registrations.waiting = Some(cache_name),
                        other => return Err(Error::CorruptEntry(format!("unknown registration slot: {other}"))),
                    }
                }
                Ok(registrations)
            })
            .await
            .map_err(Error::from)
    }

    async fn save_registrations(&self, registrations: &Registrations) -> Result<(), Error> {
        let registrations = registrations.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                tx.execute("DELETE FROM registrations", [])?;
                for (slot, cache_name) in [("active", &registrations.active), ("waiting", &registrations.waiting)] {
                    if let Some(cache_name) = cache_name {
                        tx.execute(
                            "INSERT INTO registrations (slot, cache_name, updated_at) VALUES (?1, ?2, ?3)",
                            params![slot, cache_name, &now],
                        )?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
