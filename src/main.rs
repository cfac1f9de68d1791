use anyhow::Context;
use clap::Parser;
use group_text::adapters::dispatch::DeliveryReport;
use group_text::config::toml_config::parse_origin_number;
use group_text::config::{Command, DispatchMode};
use group_text::core::{Dispatcher, ExceptionLog};
use group_text::domain::model::{GroupId, PersonAliasId};
use group_text::utils::error::{ErrorSeverity, GroupTextError};
use group_text::utils::{logger, validation::Validate};
use group_text::{
    ChannelDispatcher, CliConfig, DeliveryWorker, FileExceptionLog, FileStore, GroupMessenger,
    HttpDispatcher, LoggingTransport, SendGroupMessage, TomlConfig,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

fn exit_with(e: &GroupTextError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = cli.validate() {
        exit_with(&e);
    }

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            TomlConfig::from_file(path).unwrap_or_else(|e| exit_with(&e))
        }
        None => TomlConfig::default(),
    };
    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data_dir().to_string());
    let store = Arc::new(
        FileStore::open(&data_dir)
            .await
            .unwrap_or_else(|e| exit_with(&e)),
    );

    let exception_log_path = config.exception_log_path(store.data_dir());
    tracing::debug!("Exception log: {}", exception_log_path.display());
    let exception_log: Arc<dyn ExceptionLog> = Arc::new(FileExceptionLog::new(exception_log_path));

    let (dispatcher, worker): (Arc<dyn Dispatcher>, Option<JoinHandle<DeliveryReport>>) =
        match config.dispatch_mode() {
            DispatchMode::Channel => {
                let (dispatcher, receiver) = ChannelDispatcher::channel(config.queue_capacity());
                let worker =
                    DeliveryWorker::new(store.clone(), store.clone(), Arc::new(LoggingTransport));
                (
                    Arc::new(dispatcher) as Arc<dyn Dispatcher>,
                    Some(tokio::spawn(worker.run(receiver))),
                )
            }
            DispatchMode::Http => {
                let endpoint = config.dispatch.endpoint.clone().unwrap_or_default();
                let dispatcher = HttpDispatcher::new(endpoint, config.dispatch_timeout())
                    .context("failed to build HTTP dispatcher")?;
                (Arc::new(dispatcher) as Arc<dyn Dispatcher>, None)
            }
        };

    let messenger = GroupMessenger::new(
        store.clone(),
        store.clone(),
        store.clone(),
        dispatcher,
        exception_log,
    );

    let mut exit_code = 0;
    match cli.command {
        Command::Preview {
            group,
            include_inactive,
        } => {
            let include_inactive = include_inactive.unwrap_or(config.include_inactive_members());
            match messenger
                .preview_group(GroupId(group), include_inactive)
                .await
                .unwrap_or_else(|e| exit_with(&e))
            {
                Some(preview) => {
                    println!("Members:             {}", preview.total_member_count);
                    println!("With mobile numbers: {}", preview.mobile_eligible_count);
                }
                None => {
                    eprintln!("⚠️ Group {} was not found.", group);
                    exit_code = 1;
                }
            }
        }
        Command::Send {
            group,
            message,
            from,
            include_inactive,
            sender,
        } => {
            let origin_number_id = match from {
                Some(raw) => parse_origin_number(Some(&raw)),
                None => config.origin_number_id(),
            }
            .unwrap_or_else(|e| exit_with(&e));

            let request = SendGroupMessage {
                group_id: group.map(GroupId),
                include_inactive_members: include_inactive
                    .unwrap_or(config.include_inactive_members()),
                body: message,
                origin_number_id,
                sender_alias_id: sender.map(PersonAliasId).or(config.sender_alias_id()),
            };

            let outcome = messenger.send_group_message(request).await;
            if outcome.is_success() {
                println!("✅ {}", outcome.user_message());
            } else {
                eprintln!("⚠️ {}", outcome.user_message());
                exit_code = 1;
            }
        }
    }

    // 關閉 channel，等 worker 把已排入的訊息送完
    drop(messenger);
    if let Some(worker) = worker {
        let report = worker.await.context("delivery worker panicked")?;
        tracing::debug!("Delivery report: {:?}", report);
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
