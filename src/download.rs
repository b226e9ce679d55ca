use crate::config::{dump_filename, DUMP_BASE_URL, USER_AGENT, WRITE_BUFFER_SIZE};
use crate::error::DumpError;
use crate::progress::make_byte_bar;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Accepts `YYYYMMDD` or the mirror's `latest` alias.
pub fn validate_date(date: &str) -> Result<(), DumpError> {
    let is_stamp = date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit());
    if is_stamp || date == "latest" {
        Ok(())
    } else {
        Err(DumpError::InvalidDate(date.to_string()))
    }
}

/// Where the dump for `date` lives inside `dir`; rejects malformed dates first.
pub fn local_dump_path(date: &str, dir: &Path) -> Result<PathBuf, DumpError> {
    validate_date(date)?;
    Ok(dir.join(dump_filename(date)))
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

/// Fetches pages-articles dumps from the Wikimedia mirror.
///
/// Data lands in `<file>.part` first; an interrupted download is resumed with a
/// `Range` request on the next call. There is no retry loop.
pub struct DumpDownloader {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl DumpDownloader {
    pub fn new() -> Result<Self, DumpError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self {
            client,
            base_url: DUMP_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn url_for(&self, date: &str) -> String {
        format!("{}/{}/{}", self.base_url, date, dump_filename(date))
    }

    /// Returns the local path of the dump for `date`, downloading it into `dir` if needed.
    pub fn fetch(&self, date: &str, dir: &Path) -> Result<PathBuf, DumpError> {
        let target = local_dump_path(date, dir)?;
        if target.exists() {
            info!(path = ?target, "Dump file already exists");
            return Ok(target);
        }

        fs::create_dir_all(dir)?;
        let partial = partial_path(&target);
        let resume_from = fs::metadata(&partial).map(|m| m.len()).unwrap_or(0);
        let url = self.url_for(date);

        info!(url = %url, resume_from, "Downloading Wikipedia dump");

        let mut request = self.client.get(&url);
        if resume_from > 0 {
            request = request.header(RANGE, format!("bytes={}-", resume_from));
        }
        let response = request.send()?;

        let append = match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(DumpError::ResourceUnavailable {
                    date: date.to_string(),
                    url,
                });
            }
            StatusCode::RANGE_NOT_SATISFIABLE if resume_from > 0 => {
                debug!(path = ?partial, "Partial download already complete");
                fs::rename(&partial, &target)?;
                return Ok(target);
            }
            StatusCode::PARTIAL_CONTENT => true,
            status if status.is_success() => false,
            status => {
                return Err(DumpError::HttpStatus {
                    status: status.as_u16(),
                    url,
                });
            }
        };

        let start = if append { resume_from } else { 0 };
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&partial)?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

        let pb = make_byte_bar(response.content_length().map(|len| len + start));
        pb.set_position(start);
        let copied = io::copy(&mut pb.wrap_read(response), &mut writer)?;
        writer.flush()?;
        pb.finish_and_clear();

        fs::rename(&partial, &target)?;
        info!(path = ?target, bytes = start + copied, "Download complete");
        Ok(target)
    }
}

/// Downloads the dump for `date` into `dir` from the default mirror.
pub fn download_dump(date: &str, dir: &Path) -> Result<PathBuf, DumpError> {
    DumpDownloader::new()?.fetch(date, dir)
}
