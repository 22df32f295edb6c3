use super::{CacheBackend, CacheError, Ttl};
use std::sync::{Mutex, PoisonError};

/// Networked backend storing entries in a Redis database
///
/// Expiry is delegated to Redis (`PSETEX`). Entries without a ttl are written with a plain
/// `SET`. The connection is held for a single command at a time.
pub struct RedisBackend {
    connection: Mutex<redis::Connection>,
}

impl RedisBackend {
    pub fn connect(host: &str, port: u16, db: i64) -> Result<Self, CacheError> {
        let url = format!("redis://{host}:{port}/{db}");
        tracing::info!(%host, port, db, "connecting to redis cache backend");

        let client = redis::Client::open(url.as_str())?;
        let connection = client.get_connection()?;

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

impl CacheBackend for RedisBackend {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let value = redis::cmd("GET")
            .arg(key)
            .query::<Option<String>>(&mut *connection)?;
        Ok(value)
    }

    fn set(&self, key: &str, value: String, ttl: Ttl) -> Result<(), CacheError> {
        let command = set_command(key, &value, ttl);
        let mut connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        command.query::<()>(&mut *connection)?;
        Ok(())
    }
}

fn set_command(key: &str, value: &str, ttl: Ttl) -> redis::Cmd {
    match ttl {
        Ttl::Never => {
            let mut command = redis::cmd("SET");
            command.arg(key).arg(value);
            command
        }
        Ttl::After(duration) => {
            // PSETEX rejects 0
            let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1);
            let mut command = redis::cmd("PSETEX");
            command.arg(key).arg(millis).arg(value);
            command
        }
    }
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend").finish_non_exhaustive()
    }
}
