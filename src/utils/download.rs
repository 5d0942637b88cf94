use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use log::info;
use reqwest::{
    blocking::Client,
    header::{UPGRADE_INSECURE_REQUESTS, USER_AGENT},
};

use crate::errors::EtlError;

/// Upper bound for a single request, connect and body included.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub fn http_client(url: &str) -> Result<Client, EtlError> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| EtlError::Fetch {
            url: url.to_string(),
            source,
        })
}

/// Issue one GET request and return the response body.  A non-success
/// status is reported as an error, the body is not returned in that case.
pub fn get_bytes(url: &str) -> Result<Vec<u8>, EtlError> {
    let client = http_client(url)?;
    let response = client
        .get(url)
        .header(USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36")
        .header(UPGRADE_INSECURE_REQUESTS, "1")
        .send()
        .map_err(|source| EtlError::Fetch {
            url: url.to_string(),
            source,
        })?;
    if !response.status().is_success() {
        return Err(EtlError::HttpStatus {
            url: url.to_string(),
            status: response.status(),
        });
    }
    let body = response.bytes().map_err(|source| EtlError::Fetch {
        url: url.to_string(),
        source,
    })?;
    Ok(body.to_vec())
}

/// Download `url` and overwrite `file_path` with the response bytes.
/// Nothing is written if the download fails.
pub fn download_file(url: &str, file_path: &Path) -> Result<(), EtlError> {
    let body = get_bytes(url)?;
    if let Some(dir) = file_path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    // write next to the target, then rename over it
    let mut tmp_name = file_path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    let written = File::create(&tmp_path).and_then(|mut out| {
        io::copy(&mut body.as_slice(), &mut out)?;
        out.flush()?;
        out.sync_all()
    });
    if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, file_path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    info!("Downloaded {} to {:?}", url, file_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::utils::test_server::{closed_url, serve};

    #[test]
    fn download_file_test() -> Result<(), Box<dyn Error>> {
        let base = serve(vec![("/rates.csv", 200, "Currency,Rate\nGBP,0.8\n")]);
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("rates.csv");
        download_file(&format!("{}/rates.csv", base), &path)?;
        assert_eq!(fs::read_to_string(&path)?, "Currency,Rate\nGBP,0.8\n");
        assert!(!dir.path().join("nested").join("rates.csv.tmp").exists());
        Ok(())
    }

    #[test]
    fn replaces_existing_file() -> Result<(), Box<dyn Error>> {
        let base = serve(vec![("/rates.csv", 200, "Currency,Rate\nEUR,0.93\n")]);
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rates.csv");
        fs::write(&path, "Currency,Rate\nEUR,0.5\nGBP,0.8\nINR,80.0\n")?;
        download_file(&format!("{}/rates.csv", base), &path)?;
        assert_eq!(fs::read_to_string(&path)?, "Currency,Rate\nEUR,0.93\n");
        assert!(!dir.path().join("rates.csv.tmp").exists());
        Ok(())
    }

    #[test]
    fn failed_write_cleans_up() -> Result<(), Box<dyn Error>> {
        let base = serve(vec![("/rates.csv", 200, "Currency,Rate\nEUR,0.93\n")]);
        let dir = tempfile::tempdir()?;
        // a directory can't be replaced by the downloaded file
        let path = dir.path().join("rates.csv");
        fs::create_dir(&path)?;
        let res = download_file(&format!("{}/rates.csv", base), &path);
        assert!(matches!(res, Err(EtlError::Io(_))));
        assert!(path.is_dir());
        assert!(!dir.path().join("rates.csv.tmp").exists());
        Ok(())
    }

    #[test]
    fn bad_status_leaves_file_alone() -> Result<(), Box<dyn Error>> {
        let base = serve(vec![]);
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rates.csv");
        fs::write(&path, "old")?;
        let res = download_file(&format!("{}/missing.csv", base), &path);
        assert!(matches!(res, Err(EtlError::HttpStatus { .. })));
        assert_eq!(fs::read_to_string(&path)?, "old");
        Ok(())
    }

    #[test]
    fn connection_refused() {
        let res = get_bytes(&closed_url("/page.html"));
        match res {
            Err(e) => assert!(matches!(e, EtlError::Fetch { .. })),
            Ok(_) => panic!("expected a fetch error"),
        }
    }
}
