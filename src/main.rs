mod cli;

use std::{process::ExitCode, sync::Arc, time::Duration};

use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};
use log::{error, info, LevelFilter};
use tokio_util::sync::CancellationToken;

use litres_dl::{
    batch::{read_url_list, BatchOptions, BatchRunner},
    client::{Endpoints, LitresClient},
    credentials::{CookieFile, CredentialSource, InlineCookies},
    downloader::{BookDownloader, DownloadOptions},
    error::{LitresError, Result},
    fetch::until_cancelled,
    notify::{self, Notifier},
    progress::{NoProgress, ProgressBars, ProgressReporter},
};

use crate::cli::Args;

fn setup_logger(
    level: LevelFilter,
    bars: Option<Arc<ProgressBars>>,
) -> std::result::Result<(), log::SetLoggerError> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {:5} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("rustls", LevelFilter::Warn);

    match bars {
        Some(bars) => dispatch.chain(fern::Output::call(move |record| {
            bars.suspend(|| eprintln!("{}", record.args()))
        })),
        None => dispatch.chain(std::io::stderr()),
    }
    .apply()
}

fn exit_code(err: &LitresError) -> ExitCode {
    match err {
        LitresError::Credentials(_) => ExitCode::from(2),
        LitresError::Cancelled => ExitCode::from(130),
        _ => ExitCode::FAILURE,
    }
}

async fn run(
    args: Args,
    progress: &dyn ProgressReporter,
    notifier: &dyn Notifier,
    cancel: CancellationToken,
) -> Result<()> {
    let source: Box<dyn CredentialSource> = match &args.cookies {
        Some(header) => Box::new(InlineCookies::new(header.clone(), args.browser.into())),
        None => Box::new(CookieFile::new(
            &args.cookies_file,
            args.cookie_format.into(),
            args.browser.into(),
        )),
    };
    info!("Loading {}", source.describe());
    let credentials = source.load().await?;
    if let Some(path) = &args.save_cookies {
        credentials.save(path).await?;
    }

    let client = LitresClient::new(
        credentials,
        Endpoints::default(),
        args.timeout.map(Duration::from_secs),
    )?;
    let client = until_cancelled(&cancel, client.check_session()).await?;

    let options = DownloadOptions {
        output: args.output.clone(),
        fix_permissions: !args.no_chmod && cfg!(unix),
    };
    let downloader = BookDownloader::new(
        &client,
        &options,
        progress,
        notifier,
        cancel.clone(),
    );

    if let Some(input) = &args.input {
        let urls = read_url_list(input).await?;
        let summary = BatchRunner::new(&downloader, BatchOptions { jobs: args.jobs })
            .run(&urls)
            .await;
        notifier
            .notify(&format!(
                "All downloads finished\nsucceeded: {}\nfailed: {}",
                summary.succeeded, summary.failed
            ))
            .await;
        if cancel.is_cancelled() {
            return Err(LitresError::Cancelled);
        }
        return Ok(());
    }

    if let Some(url) = &args.url {
        let report = downloader.download(url).await.map_err(|failure| {
            info!("Book {} aborted while {}", failure.url, failure.stage);
            failure.source
        })?;
        info!(
            "Downloaded {} files ({} bytes) into {}",
            report.files,
            report.bytes,
            report.folder.display()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let bars = args.progress.then(|| Arc::new(ProgressBars::new()));
    if let Err(err) = setup_logger(args.log_level(), bars.clone()) {
        eprintln!("{}", err);
    }
    let progress: &dyn ProgressReporter = match &bars {
        Some(bars) => bars.as_ref(),
        None => &NoProgress,
    };

    let notifier = notify::from_settings(
        args.telegram_token.as_deref(),
        args.telegram_chat_id.as_deref(),
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Interrupted, press Ctrl-C again to quit immediately");
        on_ctrl_c.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    match run(args, progress, notifier.as_ref(), cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            notifier.notify(&format!("Error: {}", err)).await;
            exit_code(&err)
        }
    }
}
