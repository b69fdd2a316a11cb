//! Configuration repository.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StorageError};
use crate::models::Config;

/// Repository for configuration operations.
pub struct ConfigRepo;

impl ConfigRepo {
    /// Get a configuration value.
    ///
    /// A stored value that is not valid JSON is reported as `Null`.
    pub fn get(conn: &Connection, key: &str) -> Result<Option<Config>> {
        let value_str: Option<String> = conn
            .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(value_str.map(|value_str| Config {
            key: key.to_string(),
            value: serde_json::from_str(&value_str).unwrap_or(serde_json::Value::Null),
        }))
    }

    /// Set a configuration value (insert or update).
    pub fn set(conn: &Connection, key: &str, value: &serde_json::Value) -> Result<()> {
        let value_json = serde_json::to_string(value)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO config (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value_json, now],
        )?;

        Ok(())
    }

    /// Get a typed configuration value.
    ///
    /// Unlike [`ConfigRepo::get_or_default`], a value of the wrong shape is an
    /// error, so callers can keep their previous state instead of silently
    /// falling back.
    pub fn get_typed<T: serde::de::DeserializeOwned>(
        conn: &Connection,
        key: &str,
    ) -> Result<Option<T>> {
        match Self::get(conn, key)? {
            Some(config) => serde_json::from_value(config.value)
                .map(Some)
                .map_err(|source| StorageError::CorruptSetting {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Get a typed configuration value with a default.
    pub fn get_or_default<T: serde::de::DeserializeOwned>(
        conn: &Connection,
        key: &str,
        default: T,
    ) -> Result<T> {
        match Self::get(conn, key)? {
            Some(config) => Ok(serde_json::from_value(config.value).unwrap_or(default)),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::init_schema;
    use serde_json::json;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_set_and_get() {
        let conn = setup_db();

        ConfigRepo::set(&conn, "test_key", &json!("test_value")).unwrap();
        let config = ConfigRepo::get(&conn, "test_key").unwrap().unwrap();

        assert_eq!(config.key, "test_key");
        assert_eq!(config.value, json!("test_value"));
    }

    #[test]
    fn test_update_existing() {
        let conn = setup_db();

        ConfigRepo::set(&conn, "key", &json!("original")).unwrap();
        ConfigRepo::set(&conn, "key", &json!("updated")).unwrap();

        let config = ConfigRepo::get(&conn, "key").unwrap().unwrap();
        assert_eq!(config.value, json!("updated"));
    }

    #[test]
    fn test_get_nonexistent() {
        let conn = setup_db();
        assert!(ConfigRepo::get(&conn, "nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_get_typed_rejects_wrong_shape() {
        let conn = setup_db();

        ConfigRepo::set(&conn, "list", &json!(["a.com", "b.com"])).unwrap();
        let list: Option<Vec<String>> = ConfigRepo::get_typed(&conn, "list").unwrap();
        assert_eq!(list, Some(vec!["a.com".to_string(), "b.com".to_string()]));

        ConfigRepo::set(&conn, "list", &json!({"not": "a list"})).unwrap();
        assert!(matches!(
            ConfigRepo::get_typed::<Vec<String>>(&conn, "list"),
            Err(StorageError::CorruptSetting { key, .. }) if key == "list"
        ));

        let missing: Option<bool> = ConfigRepo::get_typed(&conn, "missing").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_get_or_default() {
        let conn = setup_db();

        let value: bool = ConfigRepo::get_or_default(&conn, "missing", true).unwrap();
        assert!(value);

        ConfigRepo::set(&conn, "existing", &json!(false)).unwrap();
        let value: bool = ConfigRepo::get_or_default(&conn, "existing", true).unwrap();
        assert!(!value);

        ConfigRepo::set(&conn, "garbled", &json!("yes")).unwrap();
        let value: bool = ConfigRepo::get_or_default(&conn, "garbled", true).unwrap();
        assert!(value);
    }
}
