mod commands;

use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine as _};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use commands::{Cli, Commands, ConfigCommands};
use estate_core::native::{HttpFileService, JsonRpcProvider, OperatorCredentials};
use estate_core::params::FunctionParameter;
use estate_core::{
    AccountId, ContractFunctionParameterBuilder, ContractId, CoreError, FileService, GasLimit, Hbar,
    InjectedProvider, PropertyForm, Settings, TokenId, TransactionResult, WalletContext, WalletInterface, WalletKind,
};
use log::info;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    if let Err(error) = handle_command(cli).await {
        eprintln!("{} {}", "ERROR:".red(), error);
        std::process::exit(1);
    }

    Ok(())
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .or_else(|| std::env::var("ESTATE_CONFIG_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn load_settings(cli: &Cli) -> Result<Settings, CoreError> {
    let path = config_path(cli);
    let settings = Settings::from_file(&path.to_string_lossy())?;
    settings.validate()?;
    Ok(settings)
}

/// Upload client signed with the operator key. Missing credentials are fatal.
fn file_service(settings: &Settings) -> Result<HttpFileService, CoreError> {
    let operator = OperatorCredentials::from_env()?;
    info!("Uploading as operator {}", operator.account_id);
    Ok(HttpFileService::new(settings.upload_endpoint.clone()).with_operator(operator))
}

/// Wallet context backed by the JSON-RPC relay, connected and ready.
async fn connected_context(settings: &Settings) -> Result<WalletContext, CoreError> {
    let provider: Rc<dyn InjectedProvider> = Rc::new(JsonRpcProvider::new(settings.network.json_rpc_url.clone()));
    let ctx = WalletContext::new(settings, Some(provider), None)?;
    match ctx.connect(WalletKind::Injected).await? {
        Some(account) => {
            info!("Connected as {}", account);
            Ok(ctx)
        }
        None => Err(CoreError::NoActiveSigner),
    }
}

fn active_wallet(ctx: &WalletContext) -> Result<&dyn WalletInterface, CoreError> {
    ctx.active_wallet().ok_or(CoreError::NoActiveSigner)
}

fn print_result(operation: &str, result: TransactionResult) -> Result<(), CoreError> {
    match result {
        Some(tx) => {
            println!("{} {} {}", "✓".green(), operation, tx.bold());
            Ok(())
        }
        None => Err(CoreError::Transaction(format!("{} was not submitted (see log)", operation))),
    }
}

fn mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// `data:<mime>;base64,<contents>`
fn image_data_url(path: &Path) -> Result<String, CoreError> {
    let bytes = std::fs::read(path)?;
    Ok(format!("data:{};base64,{}", mime_type(path), Base64Engine.encode(bytes)))
}

fn parse_params(json: &str) -> Result<ContractFunctionParameterBuilder, CoreError> {
    let params: Vec<FunctionParameter> = serde_json::from_str(json)?;
    Ok(params
        .into_iter()
        .fold(ContractFunctionParameterBuilder::new(), |builder, p| builder.add_param(p.ty, p.name, p.value)))
}

async fn handle_command(cli: Cli) -> Result<(), CoreError> {
    match &cli.command {
        Commands::Config { command } => handle_config_command(command, &cli),

        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }

        Commands::Account => {
            let settings = load_settings(&cli)?;
            let ctx = connected_context(&settings).await?;
            let session = ctx.session();
            if let Some(account) = session.account {
                println!("{} {}", "Account:".bold(), account);
                println!("{} {}", "EVM address:".bold(), account.to_solidity_address());
                println!("{} {}", "Network:".bold(), settings.network.chain_name());
            }
            Ok(())
        }

        Commands::Upload { file } => {
            let settings = load_settings(&cli)?;
            let service = file_service(&settings)?;
            let contents = std::fs::read_to_string(file)?;
            let file_id = service.upload(&contents).await?;
            println!("{} {}", "File ID:".bold(), file_id);
            Ok(())
        }

        Commands::Register { form, image } => {
            let settings = load_settings(&cli)?;
            let service = file_service(&settings)?;
            let form: PropertyForm = serde_json::from_str(&std::fs::read_to_string(form)?)?;
            let image = image_data_url(image)?;
            let ctx = connected_context(&settings).await?;

            let status = ctx
                .register_property(&service, &form, &image, |status| println!("{}", status.to_string().dimmed()))
                .await;
            if status.is_success() {
                println!("{} {}", "✓".green(), status);
                Ok(())
            } else {
                Err(CoreError::Transaction(status.to_string()))
            }
        }

        Commands::TransferHbar { to, amount } => {
            let settings = load_settings(&cli)?;
            let to: AccountId = to.parse()?;
            let amount: Hbar = amount.parse()?;
            let ctx = connected_context(&settings).await?;
            let result = active_wallet(&ctx)?.transfer_hbar(&to, amount).await;
            print_result(&format!("Sent {} to {}:", amount, to), result)
        }

        Commands::TransferToken { to, token, amount } => {
            let settings = load_settings(&cli)?;
            let to: AccountId = to.parse()?;
            let token: TokenId = token.parse()?;
            let ctx = connected_context(&settings).await?;
            let result = active_wallet(&ctx)?.transfer_fungible_token(&to, token, *amount).await;
            print_result(&format!("Sent {} of {} to {}:", amount, token, to), result)
        }

        Commands::TransferNft { to, token, serial } => {
            let settings = load_settings(&cli)?;
            let to: AccountId = to.parse()?;
            let token: TokenId = token.parse()?;
            let ctx = connected_context(&settings).await?;
            let result = active_wallet(&ctx)?.transfer_non_fungible_token(&to, token, *serial).await;
            print_result(&format!("Sent {} #{} to {}:", token, serial, to), result)
        }

        Commands::Associate { token } => {
            let settings = load_settings(&cli)?;
            let token: TokenId = token.parse()?;
            let ctx = connected_context(&settings).await?;
            let result = active_wallet(&ctx)?.associate_token(token).await;
            print_result(&format!("Associated {}:", token), result)
        }

        Commands::Call { contract, function, params, gas } => {
            let settings = load_settings(&cli)?;
            let contract: ContractId = contract.parse()?;
            let params = parse_params(params)?;
            let gas = GasLimit::try_from(*gas)?;
            let ctx = connected_context(&settings).await?;
            let result = active_wallet(&ctx)?
                .execute_contract_function(contract, function, params, gas)
                .await;
            print_result(&format!("{}() on {}:", function, contract), result)
        }
    }
}

fn handle_config_command(command: &ConfigCommands, cli: &Cli) -> Result<(), CoreError> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        ConfigCommands::Validate => {
            let path = config_path(cli);
            load_settings(cli)?;
            println!("{} {} is valid", "✓".green(), path.display());
            Ok(())
        }
        ConfigCommands::Init { output, force } => {
            if output.exists() && !force {
                return Err(CoreError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    output.display()
                )));
            }
            Settings::default().save_to_file(&output.to_string_lossy())?;
            println!("{} Wrote {}", "✓".green(), output.display());
            Ok(())
        }
    }
}
