pub mod schema;

use crate::error::AppError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub const DATABASE_FILE_NAME: &str = "talk-tv.db";

/// Directory holding everything the app persists: `talk-tv.toml` and the
/// account database.
///
/// On Android this is the app's private files dir, elsewhere `./data`.
pub fn app_directory() -> Result<PathBuf, AppError> {
    #[cfg(target_os = "android")]
    {
        android::files_dir()
    }

    #[cfg(not(target_os = "android"))]
    {
        Ok(PathBuf::from("./data"))
    }
}

#[cfg(target_os = "android")]
mod android {
    use crate::error::AppError;
    use jni::objects::{JObject, JString};
    use jni::JavaVM;
    use std::path::PathBuf;

    fn jni_error(step: &str, e: jni::errors::Error) -> AppError {
        AppError::Other(format!("{} failed: {}", step, e))
    }

    /// `Context.getFilesDir().getAbsolutePath()`
    pub(super) fn files_dir() -> Result<PathBuf, AppError> {
        let context = ndk_context::android_context();
        let vm = unsafe { JavaVM::from_raw(context.vm().cast()) }
            .map_err(|e| jni_error("JavaVM::from_raw", e))?;
        let mut env = vm
            .attach_current_thread()
            .map_err(|e| jni_error("attach_current_thread", e))?;
        let activity = unsafe { JObject::from_raw(context.context().cast()) };

        let dir = env
            .call_method(&activity, "getFilesDir", "()Ljava/io/File;", &[])
            .and_then(|value| value.l())
            .map_err(|e| jni_error("getFilesDir", e))?;
        let path = env
            .call_method(&dir, "getAbsolutePath", "()Ljava/lang/String;", &[])
            .and_then(|value| value.l())
            .map_err(|e| jni_error("getAbsolutePath", e))?;
        let path: String = env
            .get_string(&JString::from(path))
            .map_err(|e| jni_error("get_string", e))?
            .into();

        Ok(PathBuf::from(path))
    }
}

/// Opens the account database in the app directory
pub fn init_database() -> Result<Connection, AppError> {
    open_database_in(&app_directory()?)
}

/// Opens `talk-tv.db` inside `dir`, creating both as needed, and brings the
/// schema up to date
pub fn open_database_in(dir: &Path) -> Result<Connection, AppError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(DATABASE_FILE_NAME);
    log::debug!("Opening account database {}", path.display());

    let conn = Connection::open(&path)?;
    schema::init_schema(&conn)?;
    Ok(conn)
}

/// Opens a fresh in-memory database with the full schema
#[cfg(test)]
pub fn init_test_database() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    schema::init_schema(&conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir()
            .join(format!("talk-tv-{}", uuid::Uuid::new_v4()))
            .join("nested")
    }

    #[test]
    fn test_open_database_creates_directory_and_schema() {
        let dir = scratch_dir();
        let conn = open_database_in(&dir).unwrap();

        assert!(dir.join(DATABASE_FILE_NAME).is_file());
        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='accounts'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);

        drop(conn);
        std::fs::remove_dir_all(dir.parent().unwrap()).unwrap();
    }
}
