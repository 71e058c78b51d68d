//! cenet - command-line front end for FTP and file web requests
//!
//! Commands:
//! - `cenet get <uri>` - download to stdout or `--output`
//! - `cenet put <file> <uri>` - upload (`--unique` for STOU, `--append` for APPE)
//! - `cenet ls <uri>` - list a directory (`--details` for LIST)
//! - `cenet rm|mkdir|rmdir|size|mdtm|pwd|rename` - single-verb FTP requests

use anyhow::Context;
use cenet::{
    FtpMethod, FtpWebRequest, NetworkCredential, WebClient, WebClientConfig,
};
use cenet::ftp::{DataChannelMode, FtpSecurityMode};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "cenet")]
#[command(version)]
#[command(about = "FTP and file web requests", long_about = None)]
struct Cli {
    #[command(flatten)]
    conn: ConnArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnArgs {
    /// User name (anonymous when omitted)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Password for --user
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Use active (PORT) data connections
    #[arg(long, global = true)]
    active: bool,

    /// FTPS mode
    #[arg(long, global = true, value_enum)]
    tls: Option<TlsMode>,

    /// Accept untrusted server certificates
    #[arg(long, global = true)]
    insecure: bool,

    /// JSON client configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TlsMode {
    Explicit,
    Implicit,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a resource
    Get {
        uri: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a local file
    Put {
        file: PathBuf,
        uri: String,
        /// Let the server pick the name (STOU)
        #[arg(long, conflicts_with = "append")]
        unique: bool,
        /// Append to the remote file (APPE)
        #[arg(long)]
        append: bool,
    },

    /// List a directory
    Ls {
        uri: String,
        /// Long listing (LIST instead of NLST)
        #[arg(short, long)]
        details: bool,
    },

    /// Delete a file
    Rm { uri: String },

    /// Create a directory
    Mkdir { uri: String },

    /// Remove a directory
    Rmdir { uri: String },

    /// Show a file's size
    Size { uri: String },

    /// Show a file's modification time
    Mdtm { uri: String },

    /// Show the working directory after entering the URI path
    Pwd { uri: String },

    /// Rename a file
    Rename { uri: String, to: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = build_config(&cli.conn)?;

    match cli.command {
        Commands::Get { uri, output } => {
            let client = WebClient::with_config(config);
            match output {
                Some(path) => {
                    let n = client.download_file(&uri, &path).await?;
                    log::info!("Saved {} bytes to {}", n, path.display());
                }
                None => {
                    let body = client.download_data(&uri).await?;
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&body).await?;
                    stdout.flush().await?;
                }
            }
        }

        Commands::Put {
            file,
            uri,
            unique,
            append,
        } => {
            let method = if unique {
                Some("STOU")
            } else if append {
                Some("APPE")
            } else {
                None
            };
            let client = WebClient::with_config(config);
            let response = client.upload_file(&uri, method, &file).await?;
            println!("{}", response.response_uri());
            if let Some(status) = response.status_description() {
                log::info!("{}", status);
            }
        }

        Commands::Ls { uri, details } => {
            let method = if details {
                FtpMethod::ListDirectoryDetails
            } else {
                FtpMethod::ListDirectory
            };
            let response = ftp_request(&uri, method, &config)?.get_response().await?;
            if details {
                for entry in response.read_listing().await? {
                    println!("{:>12} {:?} {}", entry.size, entry.kind, entry.name);
                }
            } else {
                for name in response.read_names().await? {
                    println!("{}", name);
                }
            }
        }

        Commands::Rm { uri } => simple(&uri, FtpMethod::DeleteFile, &config).await?,
        Commands::Mkdir { uri } => simple(&uri, FtpMethod::MakeDirectory, &config).await?,
        Commands::Rmdir { uri } => simple(&uri, FtpMethod::RemoveDirectory, &config).await?,

        Commands::Size { uri } => {
            let response = ftp_request(&uri, FtpMethod::GetFileSize, &config)?
                .get_response()
                .await?;
            let size = response
                .content_length()
                .with_context(|| format!("Server reply had no size: {}", response.status_description()))?;
            println!("{}", size);
        }

        Commands::Mdtm { uri } => {
            let response = ftp_request(&uri, FtpMethod::GetDateTimestamp, &config)?
                .get_response()
                .await?;
            let when = response.last_modified().with_context(|| {
                format!("Server reply had no timestamp: {}", response.status_description())
            })?;
            println!("{}", when.to_rfc3339());
        }

        Commands::Pwd { uri } => {
            let response = ftp_request(&uri, FtpMethod::PrintWorkingDirectory, &config)?
                .get_response()
                .await?;
            println!(
                "{}",
                response
                    .reported_path()
                    .unwrap_or_else(|| response.status_description())
            );
        }

        Commands::Rename { uri, to } => {
            let mut config = config;
            config.ftp.rename_to = Some(to);
            simple(&uri, FtpMethod::Rename, &config).await?
        }
    }

    Ok(())
}

fn build_config(args: &ConnArgs) -> anyhow::Result<WebClientConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Parsing {}", path.display()))?
        }
        None => WebClientConfig::default(),
    };

    if let Some(user) = &args.user {
        config.credentials = Some(NetworkCredential::new(
            user.clone(),
            args.password.clone().unwrap_or_default(),
        ));
    }
    if args.active {
        config.ftp.data_channel_mode = DataChannelMode::Active;
    }
    match args.tls {
        Some(TlsMode::Explicit) => config.ftp.security = FtpSecurityMode::Explicit,
        Some(TlsMode::Implicit) => config.ftp.security = FtpSecurityMode::Implicit,
        None => {}
    }
    if args.insecure {
        config.ftp.accept_invalid_certs = true;
    }
    Ok(config)
}

fn ftp_request(
    uri: &str,
    method: FtpMethod,
    config: &WebClientConfig,
) -> anyhow::Result<FtpWebRequest> {
    let mut request = FtpWebRequest::create(uri)?.with_method(method);
    let uri_credentials = request.options().credentials.clone();
    let has_user_info = !request.uri().username().is_empty();
    *request.options_mut() = config.ftp.clone();
    request.set_credentials(match (&config.credentials, has_user_info) {
        (Some(credentials), false) => credentials.clone(),
        _ => uri_credentials,
    });
    Ok(request)
}

async fn simple(uri: &str, method: FtpMethod, config: &WebClientConfig) -> anyhow::Result<()> {
    let response = ftp_request(uri, method, config)?.get_response().await?;
    println!("{}", response.status_description());
    Ok(())
}
