use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tellerflow::application::controller::WorkflowController;
use tellerflow::config::PolicyConfig;
use tellerflow::domain::channels::{DestinationType, recommend_channels};
use tellerflow::domain::charges::compute_charges;
use tellerflow::domain::customer::{Account, AccountStatus, AccountType, CustomerProfile, Segment};
use tellerflow::domain::money::{Amount, Balance};
use tellerflow::domain::rates::{Direction, compute_dynamic_rate, rate_corridor};
use tellerflow::domain::service::ServiceId;
use tellerflow::domain::workflow::Stage;
use tellerflow::infrastructure::in_memory::InMemorySessionStore;
use tellerflow::infrastructure::local::{LocalVerifier, RuleBasedAdvisor};
use tellerflow::interfaces::csv::report_writer::ReportWriter;
use tellerflow::interfaces::json::scenario_reader::{Scenario, ScenarioReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Policy file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Price a counter FX exchange and print the quote with its corridor.
    Quote {
        #[arg(long)]
        pair: String,
        #[arg(long)]
        direction: Direction,
        /// Amount in the foreign currency.
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "retail")]
        segment: Segment,
        /// The customer holds an FX account.
        #[arg(long)]
        fx_account: bool,
        /// Number of accounts the customer holds.
        #[arg(long, default_value_t = 1)]
        accounts: usize,
    },
    /// List payment channels for a transfer.
    Channels {
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        destination: DestinationType,
    },
    /// Compute the charge breakdown for a service.
    Charges {
        #[arg(long)]
        service: ServiceId,
        #[arg(long)]
        segment: Segment,
        #[arg(long)]
        amount: Option<Decimal>,
    },
    /// Drive a complete workflow from a scenario file and print its summary.
    Run { scenario: PathBuf },
}

fn load_policy(path: Option<&PathBuf>) -> Result<PolicyConfig> {
    let policy = match path {
        Some(path) => PolicyConfig::load(path).into_diagnostic()?,
        None => PolicyConfig::default(),
    }
    .with_env_override();
    policy.validate().into_diagnostic()?;
    Ok(policy)
}

/// A stand-in profile carrying only what the engagement discount reads.
fn engagement_profile(accounts: usize, fx_account: bool) -> CustomerProfile {
    let account = |i: usize, account_type| Account {
        number: format!("{:010}", i + 1),
        account_type,
        currency: "KES".to_string(),
        balance: Balance::ZERO,
        status: AccountStatus::Active,
        overdraft_limit: Balance::ZERO,
    };
    let mut all: Vec<Account> = (0..accounts).map(|i| account(i, AccountType::Savings)).collect();
    if fx_account {
        match all.first_mut() {
            Some(first) => first.account_type = AccountType::Fx,
            None => all.push(account(0, AccountType::Fx)),
        }
    }
    CustomerProfile {
        id: "walk-in".to_string(),
        full_name: "Walk-in customer".to_string(),
        contact: Default::default(),
        accounts: all,
    }
}

async fn run_scenario(scenario: Scenario, policy: PolicyConfig) -> Result<()> {
    let controller = WorkflowController::new(
        Box::new(InMemorySessionStore::new()),
        Box::new(LocalVerifier),
        Box::new(RuleBasedAdvisor),
        policy,
    );

    let id = controller
        .open(scenario.service, scenario.customer)
        .await
        .into_diagnostic()?;

    let mut instance = controller.snapshot(id).await.into_diagnostic()?;
    for input in &scenario.inputs {
        instance = controller.submit_input(id, input).await.into_diagnostic()?;
        if instance.stage() != Stage::Input {
            break;
        }
    }
    if instance.stage() == Stage::Input {
        let errors: Vec<String> = instance
            .validation_errors()
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        return Err(miette!("input was not accepted: {}", errors.join("; ")));
    }

    if let Some(notes) = scenario.notes {
        controller.with_notes(id, notes).await.into_diagnostic()?;
    }
    let processing = controller.proceed_to_processing(id).await.into_diagnostic()?;
    if processing.stage() == Stage::Processing {
        controller
            .adjust_rate(id, scenario.officer_rate)
            .await
            .into_diagnostic()?;
    }
    controller.acknowledge_summary(id).await.into_diagnostic()?;
    controller.confirm_verification(id).await.into_diagnostic()?;
    let authorized = controller
        .authorize(id, scenario.sign_off)
        .await
        .into_diagnostic()?;
    let summary = authorized.summary();
    controller
        .conclude_cross_sell(id, scenario.accepted_offers)
        .await
        .into_diagnostic()?;
    controller
        .complete(id, scenario.feedback)
        .await
        .into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_summary(&summary).into_diagnostic()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let policy = load_policy(cli.config.as_ref())?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());

    match cli.command {
        Command::Quote {
            pair,
            direction,
            amount,
            segment,
            fx_account,
            accounts,
        } => {
            let rate = policy
                .rates
                .get(&pair.to_ascii_uppercase())
                .into_diagnostic()?;
            let kes_equivalent = rate
                .kes_equivalent(amount)
                .ok_or_else(|| miette!("amount {amount} is too large to quote"))?;
            let profile = engagement_profile(accounts, fx_account);
            let quote = compute_dynamic_rate(rate, direction, segment, kes_equivalent, &profile);
            if !quote.is_offerable() {
                return Err(miette!("amount {amount} is too small to quote"));
            }
            writer
                .write_quote(&quote, &rate_corridor(&quote))
                .into_diagnostic()?;
        }
        Command::Channels {
            amount,
            destination,
        } => {
            let amount = Amount::new(amount).into_diagnostic()?;
            writer
                .write_channels(&recommend_channels(amount.value(), destination))
                .into_diagnostic()?;
        }
        Command::Charges {
            service,
            segment,
            amount,
        } => {
            writer
                .write_charges(service, segment, &compute_charges(service, segment, amount))
                .into_diagnostic()?;
        }
        Command::Run { scenario } => {
            drop(writer);
            let file = File::open(&scenario).into_diagnostic()?;
            let scenario = ScenarioReader::new(file).scenario().into_diagnostic()?;
            info!(service = %scenario.service, customer = %scenario.customer.id, "running scenario");
            run_scenario(scenario, policy).await?;
        }
    }

    Ok(())
}
