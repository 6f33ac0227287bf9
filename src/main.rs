// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use clap::Parser;
use fleet_smi::cli::Cli;
use fleet_smi::fleet::Fleet;
use fleet_smi::remote::SshSession;
use fleet_smi::ui::{render_json, TextRenderer};
use fleet_smi::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "fleet_smi=debug"
    } else {
        "fleet_smi=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let targets = cli.targets(cli.server_addresses()?)?;
    let options = cli.gather_options();

    let mut fleet = Fleet::new(Arc::new(SshSession::new(cli.ssh_timeout())))
        .with_identity_source(cli.identity_source);
    if let Some(max_connections) = cli.max_connections {
        fleet = fleet.with_max_in_flight(max_connections);
    }

    let report = fleet.gather(&targets, &options, cli.cmd_timeout()).await;

    let mut stdout = io::stdout().lock();
    if cli.json {
        render_json(&mut stdout, &report)?;
    } else {
        let color = stdout.is_terminal();
        TextRenderer::new(options.list_all, color).render(&mut stdout, &report)?;
    }
    Ok(())
}
