//! stat command - Show metadata for a key
//!
//! Files are described from their object metadata; folders only report
//! that at least one key exists below them.

use clap::Args;
use serde::Serialize;

use bm_core::{Entry, EntryKind, ObjectInfo};

use super::{find_profile, load_config, open_session};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Show metadata for a key
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Profile naming the bucket
    pub profile: String,

    /// File key (e.g., "poze/lp/cover.jpeg") or folder key ending in '/'
    pub key: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    id: String,
    name: String,
    kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

impl StatOutput {
    fn new(entry: Entry, info: Option<ObjectInfo>) -> Self {
        let info = info.unwrap_or_else(|| ObjectInfo::dir(&entry.id));
        Self {
            id: entry.id,
            name: entry.name,
            kind: entry.kind,
            last_modified: info.last_modified.map(|t| t.to_string()),
            size_bytes: info.size_bytes,
            size_human: info.size_human,
            etag: info.etag,
            content_type: info.content_type,
        }
    }

    fn print(&self, formatter: &Formatter) {
        formatter.println(&format!("Key       : {}", self.id));
        formatter.println(&format!("Name      : {}", self.name));
        let kind = match self.kind {
            EntryKind::File => "file",
            EntryKind::Folder => "folder",
        };
        formatter.println(&format!("Kind      : {kind}"));
        if let Some(modified) = &self.last_modified {
            formatter.println(&format!("Date      : {modified}"));
        }
        if let (Some(bytes), Some(human)) = (self.size_bytes, &self.size_human) {
            formatter.println(&format!("Size      : {human} ({bytes} bytes)"));
        }
        if let Some(etag) = &self.etag {
            formatter.println(&format!("ETag      : {etag}"));
        }
        if let Some(ct) = &self.content_type {
            formatter.println(&format!("Type      : {ct}"));
        }
    }
}

/// Execute the stat command
pub async fn execute(args: StatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let config = match load_config(&formatter) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let profile = match find_profile(&config, &args.profile, &formatter) {
        Ok(profile) => profile,
        Err(code) => return code,
    };
    let session = match open_session(&profile, &config.download, &formatter).await {
        Ok(session) => session,
        Err(code) => return code,
    };

    let result = async {
        let entry = session.get_resource(&args.key).await?;
        let info = if entry.is_folder() {
            None
        } else {
            Some(session.store().head_object(&entry.id).await?)
        };
        Ok::<_, bm_core::Error>(StatOutput::new(entry, info))
    }
    .await;

    let code = match result {
        Ok(output) => {
            if formatter.is_json() {
                formatter.json(&output);
            } else {
                output.print(&formatter);
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail(&format!("Cannot stat '{}'", args.key), &e),
    };

    session.shutdown(config.download.shutdown_grace()).await;
    code
}
