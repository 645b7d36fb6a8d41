//! Command line arguments

use clap::Parser;
use mailbackup_auth::{CredentialInput, DEFAULT_NAMESPACE};
use mailbackup_core::{ArchiveConfig, ServerConfig};
use mailbackup_imap::DEFAULT_IMAP_PORT;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "mailbackup",
    version,
    about = "Incrementally archive every IMAP folder into .eml files"
)]
pub struct Cli {
    /// IMAP host, like imap.gmail.com
    #[arg(short = 's', long = "server", env = "MAILBACKUP_HOST")]
    pub host: Option<String>,

    /// IMAP port (implicit TLS)
    #[arg(long, env = "MAILBACKUP_PORT", default_value_t = DEFAULT_IMAP_PORT)]
    pub port: u16,

    /// IMAP username
    #[arg(short, long, env = "MAILBACKUP_USER")]
    pub username: Option<String>,

    /// IMAP password
    #[arg(short, long, env = "MAILBACKUP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Local folder where the .eml files are saved
    #[arg(
        short = 'l',
        long = "localfolder",
        env = "MAILBACKUP_OUTPUT",
        default_value = "data"
    )]
    pub output: PathBuf,

    /// Re-fetch and overwrite already downloaded messages
    #[arg(short, long)]
    pub overwrite: bool,

    /// Save host, user and password in the keyring
    #[arg(short = 'c', long)]
    pub save_credentials: bool,

    /// Only archive this folder (repeatable)
    #[arg(long = "folder", value_name = "NAME")]
    pub folders: Vec<String>,

    /// Deadline in seconds for each IMAP operation
    #[arg(long, env = "MAILBACKUP_TIMEOUT", default_value_t = 120)]
    pub timeout: u64,

    /// Keyring namespace holding the saved credentials
    #[arg(long, env = "MAILBACKUP_KEYRING_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub keyring_namespace: String,

    /// Never read from or write to the keyring
    #[arg(long, conflicts_with = "save_credentials")]
    pub no_keyring: bool,

    /// Verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn credential_input(&self) -> CredentialInput {
        CredentialInput {
            host: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig { port: self.port }
    }

    pub fn archive_config(&self) -> ArchiveConfig {
        let mut config = ArchiveConfig::new(&self.output);
        config.overwrite = self.overwrite;
        config.op_timeout = Duration::from_secs(self.timeout);
        config.folders = self.folders.clone();
        config
    }

    /// Filter directive for the `mailbackup*` crates
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "mailbackup=debug"
        } else {
            "mailbackup=info"
        }
    }

    /// `RUST_LOG` wins when set and valid, otherwise [`Cli::log_directive`]
    pub fn log_filter(&self, rust_log: Option<&str>) -> EnvFilter {
        rust_log
            .filter(|value| !value.trim().is_empty())
            .and_then(|value| EnvFilter::try_new(value).ok())
            .unwrap_or_else(|| EnvFilter::new(self.log_directive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mailbackup", "-s", "imap.example.com"]).unwrap();

        assert_eq!(cli.host.as_deref(), Some("imap.example.com"));
        assert_eq!(cli.port, 993);
        assert!(!cli.overwrite);
        assert!(!cli.save_credentials);
        assert!(cli.folders.is_empty());
        assert_eq!(cli.log_directive(), "mailbackup=info");

        let config = cli.archive_config();
        assert_eq!(config.output_root, PathBuf::from("data"));
        assert_eq!(config.op_timeout, Duration::from_secs(120));
        assert_eq!(config.progress_path(), PathBuf::from("data").join(".downloaded"));
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "mailbackup",
            "-s",
            "imap.example.com",
            "-u",
            "me@example.com",
            "-p",
            "hunter2",
            "-l",
            "/tmp/mail",
            "-o",
            "-c",
            "-v",
        ])
        .unwrap();

        let input = cli.credential_input();
        assert_eq!(input.username.as_deref(), Some("me@example.com"));
        assert_eq!(input.password.as_deref(), Some("hunter2"));
        assert!(cli.overwrite);
        assert!(cli.save_credentials);
        assert_eq!(cli.log_directive(), "mailbackup=debug");
        assert_eq!(cli.archive_config().output_root, PathBuf::from("/tmp/mail"));
        assert!(cli.archive_config().overwrite);
    }

    #[test]
    fn test_folder_filter_and_timeout() {
        let cli = Cli::try_parse_from([
            "mailbackup",
            "--folder",
            "INBOX",
            "--folder",
            "Sent Items",
            "--timeout",
            "30",
            "--port",
            "1993",
        ])
        .unwrap();

        let config = cli.archive_config();
        assert_eq!(config.folders, vec!["INBOX", "Sent Items"]);
        assert_eq!(config.op_timeout, Duration::from_secs(30));
        assert_eq!(cli.server_config().port, 1993);
    }

    #[test]
    fn test_rust_log_overrides_verbosity() {
        let cli = Cli::try_parse_from(["mailbackup", "-v"]).unwrap();

        let filter = cli.log_filter(None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = cli.log_filter(Some("mailbackup=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

        let filter = cli.log_filter(Some(""));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_save_credentials_needs_keyring() {
        let result = Cli::try_parse_from(["mailbackup", "--no-keyring", "-c"]);
        assert!(result.is_err());
    }
}
