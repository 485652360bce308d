//! ls command - List every key below a prefix
//!
//! Walks the recursive listing page by page and prints entries as they arrive.

use clap::Args;
use futures::{TryStreamExt, pin_mut};
use serde::Serialize;

use bm_core::{Entry, Error};

use super::{find_profile, load_config, open_session};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List keys in a bucket
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Profile naming the bucket
    pub profile: String,

    /// Folder prefix to list (e.g., "photos/"); the whole bucket when omitted
    pub prefix: Option<String>,

    /// Keys requested per listing page
    #[arg(long)]
    pub page_size: Option<i32>,

    /// Show totals only
    #[arg(long)]
    pub summarize: bool,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    entries: Vec<Entry>,
    summary: Summary,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    pages: usize,
    files: usize,
    folders: usize,
}

impl Summary {
    fn add(&mut self, entry: &Entry) {
        if entry.is_folder() {
            self.folders += 1;
        } else {
            self.files += 1;
        }
    }
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let config = match load_config(&formatter) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let profile = match find_profile(&config, &args.profile, &formatter) {
        Ok(profile) => profile,
        Err(code) => return code,
    };

    let mut settings = config.download;
    if args.page_size.is_some() {
        settings.page_size = args.page_size;
    }

    let session = match open_session(&profile, &settings, &formatter).await {
        Ok(session) => session,
        Err(code) => return code,
    };

    let folder = args.prefix.as_deref().map(Entry::from_key);
    let code = list(&session, folder.as_ref(), &args, &formatter).await;
    session.shutdown(settings.shutdown_grace()).await;
    code
}

async fn list(
    session: &bm_core::Session,
    folder: Option<&Entry>,
    args: &LsArgs,
    formatter: &Formatter,
) -> ExitCode {
    let walker = match session.list_folder(folder) {
        Ok(walker) => walker,
        Err(e) => return formatter.fail("Cannot list", &e),
    };

    let pages = walker.into_stream();
    pin_mut!(pages);

    let mut summary = Summary::default();
    let mut collected = Vec::new();
    loop {
        match pages.try_next().await {
            Ok(Some(page)) => {
                summary.pages += 1;
                for entry in page.entries {
                    summary.add(&entry);
                    if args.summarize {
                        continue;
                    }
                    if formatter.is_json() {
                        collected.push(entry);
                    } else {
                        formatter.println(&entry.to_string());
                    }
                }
            }
            Ok(None) => break,
            Err(Error::EmptyResult(prefix)) => {
                formatter.error(&format!("No keys found under '{prefix}'"));
                return ExitCode::NotFound;
            }
            Err(e) => return formatter.fail("Listing failed", &e),
        }
    }

    if formatter.is_json() {
        formatter.json(&LsOutput {
            entries: collected,
            summary,
        });
    } else {
        formatter.println(&format!(
            "\nTotal: {} files, {} folders in {} pages",
            summary.files, summary.folders, summary.pages
        ));
    }
    ExitCode::Success
}
