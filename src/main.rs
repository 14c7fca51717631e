use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::sync::broadcast;

use safedrive_lib::drive::filter_files;
use safedrive_lib::{
    ArtifactSink, CandidateFile, ClientConfig, DecryptOutcome, DecryptionOrchestrator, DownloadDirSink, DriveClient,
    DriveFilter, IntakeOutcome, Notice, PathMaterialProvider, RemediationAction, ReqwestTransport, Transport,
    WorkflowStateMachine,
};

#[derive(Debug, Parser)]
#[command(name = "safedrive")]
#[command(about = "Scan files for sensitive data before they reach the drive", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan a file and optionally remediate and upload it
    Scan {
        file: PathBuf,
        /// mask, encrypt or upload
        #[arg(long)]
        action: Option<String>,
    },
    /// List files in the drive
    Files {
        /// all, flagged or safe
        #[arg(long, default_value = "all")]
        filter: DriveFilter,
        #[arg(long)]
        search: Option<String>,
    },
    /// Decrypt an encrypted drive file with its key or context file
    Decrypt {
        file_id: String,
        #[arg(long)]
        material: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    safedrive_lib::load_dotenv();
    safedrive_lib::init_tracing();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    if let Err(e) = run(command).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(command: Commands) -> Result<(), String> {
    let config = ClientConfig::from_env().map_err(|e| e.to_string())?;
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config).map_err(|e| e.to_string())?);
    let sink: Arc<dyn ArtifactSink> = Arc::new(DownloadDirSink::new(&config.download_dir));

    match command {
        Commands::Scan { file, action } => {
            let action = action
                .map(|a| RemediationAction::parse(&a).ok_or_else(|| format!("Unknown action '{}'", a)))
                .transpose()?;
            scan(&config, transport, sink, file, action).await
        }
        Commands::Files { filter, search } => list_files(transport, sink, filter, search.unwrap_or_default()).await,
        Commands::Decrypt { file_id, material } => decrypt(transport, sink, &file_id, material).await,
    }
}

async fn scan(
    config: &ClientConfig,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ArtifactSink>,
    path: PathBuf,
    action: Option<RemediationAction>,
) -> Result<(), String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| format!("Not a file: {}", path.display()))?;

    let workflow = WorkflowStateMachine::new(config, transport, sink);
    let mut notices = workflow.notices();

    let outcome = workflow
        .submit(CandidateFile {
            name,
            declared_media_type: None,
            bytes,
        })
        .await;
    print_notices(&mut notices);

    let result = match outcome {
        IntakeOutcome::Scanned(result) => result,
        IntakeOutcome::Rejected(rejection) => return Err(rejection.to_string()),
        IntakeOutcome::Failed(e) => return Err(e.to_string()),
        IntakeOutcome::Superseded => return Err("Scan was superseded".to_string()),
    };

    println!("{}", result.summary());
    for (index, zone) in result.zones().iter().enumerate() {
        println!(
            "  [{}] {:<16} {:>3.0}%  {}",
            index,
            zone.label,
            zone.confidence * 100.0,
            zone.text
        );
    }

    let Some(action) = action else {
        if result.is_safe() {
            println!("Run again with --action upload to upload it.");
        } else {
            println!("Run again with --action mask or --action encrypt to remediate it.");
        }
        return Ok(());
    };

    let report = workflow.remediate(action).await;
    print_notices(&mut notices);
    let report = report.map_err(|e| e.to_string())?;
    if let Some(path) = &report.recovery_file {
        println!("Keep {} to decrypt this file later.", path.display());
    }
    Ok(())
}

async fn list_files(
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ArtifactSink>,
    filter: DriveFilter,
    search: String,
) -> Result<(), String> {
    let files = DriveClient::new(transport, sink)
        .list()
        .await
        .map_err(|e| e.user_message())?;

    let shown = filter_files(&files, filter, &search);
    if shown.is_empty() {
        println!("No files found");
        return Ok(());
    }
    for file in shown {
        let mut badges = vec![file.status.to_string()];
        if file.encrypted {
            badges.push("encrypted".to_string());
        }
        if file.flags > 0 {
            badges.push(format!("{} flags", file.flags));
        }
        println!(
            "{:<24} {:<32} {:>10}  {}  {}",
            file.id,
            file.name,
            file.size,
            file.upload_date,
            badges.join(", ")
        );
    }
    Ok(())
}

async fn decrypt(
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ArtifactSink>,
    file_id: &str,
    material: PathBuf,
) -> Result<(), String> {
    let files = DriveClient::new(Arc::clone(&transport), Arc::clone(&sink))
        .list()
        .await
        .map_err(|e| e.user_message())?;
    let file = files
        .iter()
        .find(|f| f.id == file_id)
        .ok_or_else(|| format!("No drive file with id {}", file_id))?;
    let target = file
        .decrypt_target()
        .ok_or_else(|| format!("{} is not encrypted", file.name))?;

    let provider = PathMaterialProvider::new(Some(material));
    match DecryptionOrchestrator::new(transport, sink)
        .decrypt(&target, &provider)
        .await
        .map_err(|e| e.to_string())?
    {
        DecryptOutcome::Restored { saved_to } => println!("File decrypted successfully: {}", saved_to.display()),
        DecryptOutcome::Dismissed => println!("No recovery material supplied"),
    }
    Ok(())
}

/// Rejections and failures come back as errors, so only the rest is printed
fn print_notices(notices: &mut broadcast::Receiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        match notice {
            Notice::Rejected { .. } | Notice::Failed { .. } => {}
            Notice::ScanDegraded { .. } | Notice::RecoveryMaterialUnavailable { .. } => {
                eprintln!("Warning: {}", notice)
            }
            _ => println!("{}", notice),
        }
    }
}
