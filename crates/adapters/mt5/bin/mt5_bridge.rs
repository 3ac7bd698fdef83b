// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Command-line access to an MT5 bridge.
//!
//! Bridge settings come from the same environment variables as the library.
//! The session token is kept in a JSON file between invocations.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mt5_bridge_gateway::{FileSessionStore, Mt5Credential, Mt5Gateway, OrderRequest, OrderSide};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "mt5-bridge")]
#[command(about = "Inspect and trade an MT5 account through its HTTP bridge")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// File holding the persisted session token
    #[arg(long, env = "MT5_SESSION_FILE", default_value = ".mt5_session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a session and persist its token
    Connect {
        /// Account number
        #[arg(long, env = "MT5_LOGIN")]
        login: String,

        #[arg(long, env = "MT5_PASSWORD", hide_env_values = true)]
        password: String,

        /// Broker trading server
        #[arg(long, env = "MT5_SERVER")]
        server: String,
    },
    /// Probe the persisted session
    Check,
    /// Show balances
    Account,
    /// List open positions
    Positions,
    /// Show quotes for one or more symbols
    Quote {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// List broker symbols, or resolve one
    Symbols {
        /// Logical symbol to resolve (e.g. "XAUUSD")
        #[arg(long)]
        resolve: Option<String>,
    },
    /// Send a market order
    Order {
        #[arg(short, long)]
        symbol: String,

        /// buy or sell
        #[arg(long)]
        side: OrderSide,

        /// Volume in lots
        #[arg(short, long)]
        volume: f64,

        #[arg(long)]
        stop_loss: Option<f64>,

        #[arg(long)]
        take_profit: Option<f64>,

        #[arg(long)]
        comment: Option<String>,
    },
    /// Close a position by ticket
    Close {
        ticket: u64,

        /// Volume to close, in lots; defaults to the position's volume
        #[arg(short, long)]
        volume: Option<f64>,
    },
    /// End the session and clear the persisted token
    Disconnect,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    let store = Arc::new(FileSessionStore::new(&cli.session_file));
    let gateway = Mt5Gateway::from_env(store)
        .await
        .context("failed to configure the MT5 bridge")?;

    match cli.command {
        Commands::Connect {
            login,
            password,
            server,
        } => {
            let credential = Mt5Credential::builder()
                .login(login)
                .password(password)
                .server(server)
                .build()?;
            gateway.connect(&credential).await?;
            println!("connected, session saved to {}", cli.session_file.display());
        }
        Commands::Check => {
            if !gateway.check_connection().await {
                bail!("session is not alive ({}), run `mt5-bridge connect`", gateway.status().await);
            }
            println!("session alive");
        }
        Commands::Account => match gateway.get_account_info().await? {
            Some(info) => print_json(&info)?,
            None => bail!("account information unavailable"),
        },
        Commands::Positions => print_json(&gateway.get_positions().await?)?,
        Commands::Quote { symbols } => print_json(&gateway.get_quotes(&symbols).await?)?,
        Commands::Symbols { resolve: Some(symbol) } => {
            print_json(&gateway.resolve_symbol(&symbol).await?)?;
        }
        Commands::Symbols { resolve: None } => print_json(&gateway.get_symbol_list().await?)?,
        Commands::Order {
            symbol,
            side,
            volume,
            stop_loss,
            take_profit,
            comment,
        } => {
            let mut builder = OrderRequest::builder();
            builder.symbol(symbol).side(side).volume(volume);
            if let Some(stop_loss) = stop_loss {
                builder.stop_loss(stop_loss);
            }
            if let Some(take_profit) = take_profit {
                builder.take_profit(take_profit);
            }
            if let Some(comment) = comment {
                builder.comment(comment);
            }
            let outcome = gateway.send_order(&builder.build()?).await;
            print_json(&outcome)?;
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Close { ticket, volume } => {
            let outcome = gateway.close_position(ticket, volume).await?;
            print_json(&outcome)?;
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Disconnect => {
            gateway.disconnect().await;
            println!("disconnected");
        }
    }

    Ok(())
}
