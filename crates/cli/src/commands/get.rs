//! get command - Download a file, a folder or a whole bucket
//!
//! Files land at `<download folder>/<bucket>/<key>`. Folder downloads keep
//! going when single files fail; those are listed at the end and the
//! command exits with `PartialFailure`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use bm_core::{DownloadReport, DownloadSettings, Entry, Session};

use super::{find_profile, load_config, open_session};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Download from a bucket
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Profile naming the bucket
    pub profile: String,

    /// File or folder key; the whole bucket when omitted
    pub key: Option<String>,

    /// Number of concurrent downloads
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Maximum number of scheduled but unfinished downloads
    #[arg(long)]
    pub queue_limit: Option<usize>,

    /// Download folder (the bucket name is appended)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,
}

impl GetArgs {
    /// Configured settings with command line overrides applied
    fn settings(&self, mut settings: DownloadSettings) -> DownloadSettings {
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency.max(1);
        }
        if self.queue_limit.is_some() {
            settings.queue_limit = self.queue_limit;
        }
        if let Some(dest) = &self.dest {
            settings.folder = dest.to_string_lossy().into_owned();
        }
        settings
    }
}

/// Execute the get command
pub async fn execute(args: GetArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let config = match load_config(&formatter) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let profile = match find_profile(&config, &args.profile, &formatter) {
        Ok(profile) => profile,
        Err(code) => return code,
    };
    let settings = args.settings(config.download);
    tracing::debug!(
        "Using profile {} with concurrency {} and queue limit {:?}",
        profile.name,
        settings.concurrency,
        settings.queue_limit
    );

    let progress = ProgressBar::new(formatter.config());
    let session = match open_session(&profile, &settings, &formatter).await {
        Ok(session) => session.with_progress(progress.callback()),
        Err(code) => {
            progress.finish_and_clear();
            return code;
        }
    };

    let outcome = tokio::select! {
        result = download(&session, args.key.as_deref()) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    progress.finish_and_clear();

    let (code, grace) = match outcome {
        Some(Ok(report)) => (print_report(&report, &formatter), settings.shutdown_grace()),
        Some(Err(e)) => (formatter.fail("Download failed", &e), settings.shutdown_grace()),
        None => {
            formatter.error("Interrupted, unfinished downloads were dropped");
            (ExitCode::Interrupted, Duration::ZERO)
        }
    };

    session.shutdown(grace).await;
    code
}

async fn download(session: &Session, key: Option<&str>) -> bm_core::Result<DownloadReport> {
    match key {
        Some(key) => {
            let entry = session.get_resource(key).await?;
            session.get_as_file(Some(&entry)).await
        }
        None => session.get_as_file(Some(&Entry::root())).await,
    }
}

fn print_report(report: &DownloadReport, formatter: &Formatter) -> ExitCode {
    if formatter.is_json() {
        formatter.json(report);
    } else {
        formatter.success(&format!(
            "Downloaded {} of {} files to {} ({} folders created)",
            report.downloaded,
            report.total_seen,
            report.local_path.display(),
            report.folders_created
        ));
        for failure in &report.failures {
            formatter.warning(&format!("{}: {}", failure.key, failure.error));
        }
    }

    if report.is_complete() {
        ExitCode::Success
    } else {
        ExitCode::PartialFailure
    }
}
