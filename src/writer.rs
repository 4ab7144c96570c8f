use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn write_key_material(dir: &Path, name: &str, material: &str) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}.pem", name));

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // `mode` only applies when the file is created
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(material.as_bytes())?;

    return Ok(path);
}
