//! `sitectl`: command-line client for Siteframe servers.
//!
//! - **`health`**: check that a server is up.
//! - **`call`**: send params to any endpoint and print the envelope.
//! - **`site`**: read, list, create, save, and delete sites.
//!
//! File arguments accept `-` for stdin. The server URL and bearer token come
//! from `--url`/`--token` or `SITECTL_URL`/`SITECTL_TOKEN`.

mod client;
mod store;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use siteframe::{
    save_site, RemoteError, SaveError, SaveOptions, Site, SiteConfig, SiteHandle, SiteKey,
    SiteSettings,
};
use siteframe_api::{Envelope, ManageSiteParams, SiteWhere};

use client::{ApiClient, HttpSiteRemote};
use store::FileLocalStore;

/// sitectl: Siteframe CLI
///
/// Call endpoints and manage sites on a Siteframe server.
#[derive(Parser)]
#[command(name = "sitectl", version, about, long_about = None)]
struct Cli {
    /// Server URL.
    #[arg(long, env = "SITECTL_URL", default_value = "http://localhost:3210", global = true)]
    url: String,

    /// Bearer token sent with every request.
    #[arg(long, env = "SITECTL_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Prefix of the endpoint routes.
    #[arg(long, default_value = "/api", global = true)]
    base_path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the server is up.
    Health,

    /// Send params to an endpoint and print the response envelope.
    ///
    /// Exits 1 when the envelope status is not `success`.
    ///
    /// Example:
    ///   echo '{"_action":"current"}' | sitectl call user -
    Call {
        /// Endpoint key, e.g. `site`.
        key: String,

        /// JSON params file, or `-` for stdin. Defaults to `{}`.
        params: Option<PathBuf>,
    },

    /// Manage sites.
    Site {
        #[command(subcommand)]
        command: SiteCommand,
    },
}

#[derive(Subcommand)]
enum SiteCommand {
    /// Print a site by id or sub-domain.
    Get {
        #[arg(long, required_unless_present = "sub_domain", conflicts_with = "sub_domain")]
        site_id: Option<String>,

        #[arg(long)]
        sub_domain: Option<String>,
    },

    /// Create a site from a JSON config file.
    Create {
        /// Site config file, or `-` for stdin.
        file: PathBuf,
    },

    /// Save a site config file to the server.
    ///
    /// The file must carry `siteId`, and should carry the `changeId` last
    /// returned by the server; an outdated one is rejected with STALE_CHANGE.
    ///
    /// Examples:
    ///   sitectl site save acme.json --write-back
    ///   sitectl site save acme.json --only title,subDomain
    Save {
        /// Site config file.
        file: PathBuf,

        /// Save only these keys (comma separated, camelCase).
        #[arg(long, value_delimiter = ',')]
        only: Vec<SiteKey>,

        /// Save to the local store instead of the server.
        #[arg(long = "static")]
        local: bool,

        /// Directory of the local store used with `--static`.
        #[arg(long, default_value = ".sitectl")]
        store: PathBuf,

        /// Rewrite FILE with the reconciled config, including the new changeId.
        #[arg(long)]
        write_back: bool,
    },

    /// List sites owned by a user (the caller by default).
    List {
        #[arg(long)]
        user_id: Option<String>,
    },

    /// Delete a site.
    Delete {
        #[arg(long)]
        site_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let client = ApiClient::new(&cli.url, &cli.base_path, cli.token.clone())
        .unwrap_or_else(|e| fatal(&format!("failed to build HTTP client: {e}")));

    match cli.command {
        Command::Health => {
            let env = client.health().await.unwrap_or_else(|e| fatal(&e.to_string()));
            finish(&env);
        }

        Command::Call { key, params } => {
            let params: Value = match params {
                Some(path) => parse_json(&read_input(&path)),
                None => Value::Object(Default::default()),
            };
            let env = client
                .call(&key, &params)
                .await
                .unwrap_or_else(|e| fatal(&e.to_string()));
            finish(&env);
        }

        Command::Site { command } => site(client, command).await,
    }
}

async fn site(client: ApiClient, command: SiteCommand) {
    let params = match command {
        SiteCommand::Get {
            site_id,
            sub_domain,
        } => ManageSiteParams::Retrieve {
            selector: SiteWhere {
                site_id,
                sub_domain,
            },
        },
        SiteCommand::Create { file } => ManageSiteParams::Create {
            fields: parse_json(&read_input(&file)),
        },
        SiteCommand::Delete { site_id } => ManageSiteParams::Delete {
            selector: SiteWhere::site_id(site_id),
        },
        SiteCommand::List { user_id } => ManageSiteParams::List { user_id },
        SiteCommand::Save {
            file,
            only,
            local,
            store,
            write_back,
        } => {
            return save(client, &file, only, local, store, write_back).await;
        }
    };

    let env = client
        .call("site", &params)
        .await
        .unwrap_or_else(|e| fatal(&e.to_string()));
    finish(&env);
}

async fn save(
    client: ApiClient,
    file: &Path,
    only: Vec<SiteKey>,
    local: bool,
    store: PathBuf,
    write_back: bool,
) {
    let config: SiteConfig = parse_json(&read_input(file));
    let settings = SiteSettings {
        is_static: local,
        ..Default::default()
    };
    let site = Site::new(config, settings).unwrap_or_else(|e| fatal(&e.to_string()));
    let handle = SiteHandle::new(site);

    let options = SaveOptions {
        only_keys: (!only.is_empty()).then_some(only),
        delay_until_save_config: None,
    };
    let remote = HttpSiteRemote::new(client);
    let store = FileLocalStore::new(store);

    match save_site(&handle, &remote, &store, options).await {
        Ok(stored) => {
            if write_back {
                let text = to_pretty(&handle.snapshot());
                fs::write(file, text + "\n").unwrap_or_else(|e| {
                    fatal(&format!("failed to write {}: {e}", file.display()))
                });
            }
            println!("{}", to_pretty(&stored));
        }
        Err(SaveError::Remote(RemoteError::Rejected { code, message })) => {
            eprintln!("sitectl: {code}: {message}");
            process::exit(1);
        }
        Err(e) => fatal(&e.to_string()),
    }
}

/// Print the envelope; exit 1 unless it is a success.
fn finish(env: &Envelope) {
    println!("{}", to_pretty(env));
    if !env.is_success() {
        process::exit(1);
    }
}

fn to_pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| fatal(&format!("failed to serialise output: {e}")))
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {e}")));
        buf
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {e}", path.display())))
    }
}

fn parse_json<T: DeserializeOwned>(json: &str) -> T {
    serde_json::from_str(json).unwrap_or_else(|e| fatal(&format!("invalid JSON input: {e}")))
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("sitectl: {msg}");
    process::exit(2);
}
