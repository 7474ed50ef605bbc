use {
    crate::{
        domain::{
            asset::Assets,
            authorization::{self, Resolver},
            confirmation::Waiter,
            flow,
            migration::{self, Migrator},
        },
        infra::{cli, config, flow as access, free_gas, metrics, payer, prompt, signer},
    },
    anyhow::Context,
    clap::Parser,
    std::{process::ExitCode, sync::Arc},
    tracing_subscriber::EnvFilter,
};

/// Exit code of a migration whose transaction was sealed but where some
/// transfers failed.
const PARTIAL_FAILURE: u8 = 2;

pub async fn start(args: impl IntoIterator<Item = String>) -> ExitCode {
    let args = cli::Args::parse_from(args);
    initialize_tracing(&args.log);
    tracing::debug!(config = ?args.config, command = ?args.command, "starting migrator");

    let print_metrics = args.print_metrics;
    let code = match run(args).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(?err, "migrator failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    };
    if print_metrics {
        eprintln!("{}", metrics::encode());
    }
    code
}

fn initialize_tracing(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: cli::Args) -> anyhow::Result<ExitCode> {
    let config = config::file::load(&args.config).await;
    let chain = Arc::new(access::Client::new(access::Config {
        endpoint: config.access_node.clone(),
        network: config.network,
    }));

    match args.command {
        cli::Command::Migrate {
            assets,
            sender,
            receiver,
            approve_surge,
            decline_surge,
        } => {
            let assets = tokio::fs::read_to_string(&assets)
                .await
                .with_context(|| format!("reading {assets:?}"))?;
            let assets = serde_json::from_str::<Assets>(&assets).context("parsing assets")?;
            let private_key = args
                .private_key
                .or(config.private_key.clone())
                .context("no private key configured for the signing account")?;
            let prompt: Arc<dyn authorization::SurgePrompt> = match (approve_surge, decline_surge)
            {
                (true, _) => Arc::new(prompt::Fixed(true)),
                (_, true) => Arc::new(prompt::Fixed(false)),
                _ => Arc::new(prompt::Terminal),
            };
            let resolver = resolver(&config, &private_key, prompt)?;
            let migrator = Migrator::new(config.migration.clone(), resolver, chain);
            migrate(&migrator, &assets, &sender, &receiver).await
        }
        cli::Command::Wait {
            transaction,
            timeout,
            poll_interval,
        } => {
            let id = transaction
                .parse::<flow::TransactionId>()
                .with_context(|| format!("invalid transaction ID {transaction:?}"))?;
            let result = Waiter::new(chain)
                .wait(
                    id,
                    timeout.unwrap_or(config.migration.timeout),
                    poll_interval.unwrap_or(config.migration.poll_interval),
                )
                .await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "transaction": id.to_string(),
                    "status": result.status,
                    "statusCode": result.status_code,
                    "errorMessage": result.error_message,
                }))?
            );
            Ok(if result.is_successful() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn resolver(
    config: &config::Config,
    private_key: &str,
    prompt: Arc<dyn authorization::SurgePrompt>,
) -> anyhow::Result<Resolver> {
    let proposer = signer::Local::from_private_key(private_key)?;
    let fee_payer = Arc::new(signer::Remote::new(signer::remote::Config {
        endpoint: config.fee_payer.clone(),
    }));
    let bridge_payer = signer::Remote::new(signer::remote::Config {
        endpoint: config.bridge_payer.clone(),
    });
    let payer_status = payer::Cached::new(
        Arc::new(payer::Api::new(config.payer_status.clone())),
        config.payer_status_ttl,
    );
    let free_gas = match &config.free_gas {
        config::FreeGas::Fixed(allowed) => free_gas::Policy::Fixed(*allowed),
        config::FreeGas::Api(url) => free_gas::Policy::api(url.clone()),
    };

    Ok(Resolver::new(
        config.network,
        config.account,
        authorization::Backends {
            proposer: Arc::new(proposer),
            fee_payer: fee_payer.clone(),
            fee_payer_authorizer: fee_payer,
            bridge_payer: Arc::new(bridge_payer),
            payer_status: Arc::new(payer_status),
            free_gas: Arc::new(free_gas),
            prompt,
        },
    ))
}

/// Submits the migration and prints its report. Interrupting the wait leaves
/// the submitted transaction untouched; its ID is logged so that it can be
/// tracked with the `wait` command.
async fn migrate(
    migrator: &Migrator,
    assets: &Assets,
    sender: &str,
    receiver: &str,
) -> anyhow::Result<ExitCode> {
    let submitted = migrator.submit(assets, sender, receiver).await?;
    eprintln!("submitted transaction {}", submitted.id);

    let migration = tokio::select! {
        migration = migrator.report(assets, &submitted) => migration,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(
                transaction = %submitted.id,
                "interrupted while waiting for transaction"
            );
            return Ok(ExitCode::FAILURE);
        }
    };
    let migration = match migration {
        Ok(migration) => migration,
        Err(err @ migration::Error::Confirmation(_)) => {
            tracing::warn!(transaction = %submitted.id, "transaction outcome unknown");
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    println!("{}", serde_json::to_string_pretty(&migration)?);
    Ok(if migration.failures().next().is_none() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(PARTIAL_FAILURE)
    })
}
