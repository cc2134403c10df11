use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};
use litres_dl::credentials::{Browser, CookieFormat};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Download audiobooks available with your litres.ru subscription"
)]
#[command(group(ArgGroup::new("source").required(true).args(["url", "input"])))]
pub struct Args {
    /// Book page url
    #[arg(long)]
    pub url: Option<String>,

    /// File with book page urls, one per line
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Download folder
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Json file with session cookies
    #[arg(long, default_value = "cookies.json")]
    pub cookies_file: PathBuf,

    /// Layout of the cookie file
    #[arg(long, value_enum, default_value_t = CookieFormatArg::Auto)]
    pub cookie_format: CookieFormatArg,

    /// Session cookies as `name=value; name2=value2`, used instead of the cookie file
    #[arg(long, env = "LITRES_COOKIES", hide_env_values = true)]
    pub cookies: Option<String>,

    /// Store the cookies in use to this file as a plain json object
    #[arg(long, value_name = "FILE")]
    pub save_cookies: Option<PathBuf>,

    /// Browser to impersonate
    #[arg(short, long, value_enum, default_value_t = BrowserArg::Firefox)]
    pub browser: BrowserArg,

    /// Show a progress bar for every file
    #[arg(long)]
    pub progress: bool,

    /// Number of books downloaded at the same time in list mode
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Request timeout in seconds, no timeout by default
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Leave file permissions of downloaded books as they are
    #[arg(long)]
    pub no_chmod: bool,

    /// Telegram bot token for status messages
    #[arg(long, env = "LITRES_TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Telegram chat that receives status messages
    #[arg(long, env = "LITRES_TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// More logging, repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrowserArg {
    Chrome,
    Firefox,
    Edge,
    Safari,
}

impl From<BrowserArg> for Browser {
    fn from(value: BrowserArg) -> Self {
        match value {
            BrowserArg::Chrome => Browser::Chrome,
            BrowserArg::Firefox => Browser::Firefox,
            BrowserArg::Edge => Browser::Edge,
            BrowserArg::Safari => Browser::Safari,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookieFormatArg {
    Auto,
    Dict,
    EditThisCookie,
}

impl From<CookieFormatArg> for CookieFormat {
    fn from(value: CookieFormatArg) -> Self {
        match value {
            CookieFormatArg::Auto => CookieFormat::Auto,
            CookieFormatArg::Dict => CookieFormat::Dict,
            CookieFormatArg::EditThisCookie => CookieFormat::EditThisCookie,
        }
    }
}
