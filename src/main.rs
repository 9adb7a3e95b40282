use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;

use essay_writer::config::{AgentConfig, CheckpointBackend, LogFormat, LoggingSettings, Secrets};
use essay_writer::engine::{ExecutionError, WorkflowExecutor, WorkflowResult};
use essay_writer::error::ConfigError;

const LOG_FILE_PREFIX: &str = "essay-writer.log";

#[derive(Parser, Debug)]
#[command(
    name = "essay-writer",
    version,
    about = "計画・調査・執筆・講評を繰り返してエッセイのドラフトを作成します"
)]
struct Cli {
    /// 設定ファイル（TOML）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// チェックポイントの保存先ディレクトリ（指定するとファイルストアを使う）
    #[arg(long, global = true)]
    checkpoint_dir: Option<PathBuf>,

    /// ログレベル（trace/debug/info/warn/error）
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 新しいスレッドでドラフトを作成する
    Run {
        /// エッセイのお題
        #[arg(short, long)]
        task: String,

        /// ドラフト数の上限
        #[arg(long)]
        max_revision: Option<u32>,

        /// スレッドID
        #[arg(long, default_value = "1")]
        thread_id: String,

        /// 実行結果を JSON で出力する
        #[arg(long)]
        json: bool,
    },

    /// 最新のチェックポイントから再開する
    Resume {
        #[arg(long)]
        thread_id: String,

        #[arg(long)]
        json: bool,
    },

    /// スレッドのチェックポイント履歴を表示する
    History {
        #[arg(long)]
        thread_id: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("ロガーの初期化に失敗しました: {0}")]
    Logging(String),

    #[error("結果の出力に失敗しました: {0}")]
    Output(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("エラー: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    // ガードが drop されるとファイルへの書き込みが止まるため最後まで保持する
    let _guard = init_logging(config.logging())?;

    let secrets = Secrets::load(config.secrets().resolved_path());
    let executor = WorkflowExecutor::from_config(&config, &secrets);

    match cli.command {
        Command::Run {
            task,
            max_revision,
            thread_id,
            json,
        } => {
            let max_revision = max_revision.unwrap_or(config.run().max_revision);
            info!(thread_id = %thread_id, max_revision, "エッセイの作成を開始");
            let result = executor.run(&thread_id, &task, max_revision).await?;
            print_result(&result, json)?;
        }
        Command::Resume { thread_id, json } => {
            let result = executor.resume(&thread_id).await?;
            print_result(&result, json)?;
        }
        Command::History { thread_id } => {
            let history = executor.history(&thread_id).await?;
            if history.is_empty() {
                println!("スレッド '{thread_id}' の履歴はありません");
            }
            for checkpoint in history {
                println!(
                    "#{:<3} {:<18} -> {:<18} revision={} content={}",
                    checkpoint.sequence,
                    checkpoint.step.map(|s| s.as_str()).unwrap_or("(input)"),
                    checkpoint.next.map(|s| s.as_str()).unwrap_or("DONE"),
                    checkpoint.state.revision_number,
                    checkpoint.state.content.len(),
                );
            }
        }
    }

    Ok(())
}

/// 設定ファイルを読み込み、コマンドライン引数で上書きする
fn load_config(cli: &Cli) -> Result<AgentConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => AgentConfig::from_file(path)?,
        None => AgentConfig::default(),
    };

    if let Some(dir) = &cli.checkpoint_dir {
        let checkpoint = config.checkpoint_mut();
        checkpoint.backend = CheckpointBackend::File;
        checkpoint.path = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging_mut().level = level.to_lowercase();
    }

    Ok(config)
}

fn init_logging(settings: &LoggingSettings) -> Result<Option<WorkerGuard>, CliError> {
    let level: Level = settings
        .level
        .parse()
        .map_err(|_| CliError::Logging(format!("不明なログレベル '{}'", settings.level)))?;

    match &settings.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(writer)
                .with_ansi(false);
            let installed = match settings.format {
                LogFormat::Json => builder.json().try_init(),
                LogFormat::Pretty => builder.try_init(),
            };
            installed.map_err(|e| CliError::Logging(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            let builder = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr);
            let installed = match settings.format {
                LogFormat::Json => builder.json().try_init(),
                LogFormat::Pretty => builder.try_init(),
            };
            installed.map_err(|e| CliError::Logging(e.to_string()))?;
            Ok(None)
        }
    }
}

fn print_result(result: &WorkflowResult, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", result.to_json()?);
        return Ok(());
    }

    println!("# Essay Draft");
    println!();
    println!("{}", result.draft());
    println!();
    println!(
        "-- thread {} / drafts {} / steps {} / tokens {}",
        result.thread_id,
        result.final_state.revision_number,
        result.steps.len(),
        result.total_tokens_used
    );
    Ok(())
}
