use std::path::Path;

use tokio::fs;

use crate::output::error::OutputError;

pub(crate) async fn write_json<T>(path: &Path, data: &T, pretty: bool) -> Result<(), OutputError>
where
    T: serde::Serialize + ?Sized,
{
    let encoded = if pretty {
        serde_json::to_vec_pretty(data)?
    } else {
        serde_json::to_vec(data)?
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| OutputError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    fs::write(path, encoded)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}
