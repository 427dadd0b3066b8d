// ==========================================
// 零件目录导入 - 命令行入口
// ==========================================
// 子命令: validate / preview / execute / rollback / history / init-db
// 输出: JSON 到 stdout，日志到 stderr
// ==========================================

use anyhow::{Context, Result};
use catalog_import::api::{ApiError, ImportApi};
use catalog_import::db::get_default_db_path;
use catalog_import::logging;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "catalog-import", version, about = "零件目录批量导入")]
struct Cli {
    /// SQLite 数据库路径（默认: CATALOG_IMPORT_DB_PATH 或用户数据目录）
    #[arg(long, global = true)]
    db: Option<String>,

    /// 以 JSON 行输出日志
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 仅校验工作簿
    Validate { file: String },

    /// 校验并预览差异（不写入）
    Preview { file: String },

    /// 执行导入
    Execute {
        file: String,

        /// 已确认的警告编码，逗号分隔（如 W3,W9）
        #[arg(long, value_delimiter = ',')]
        ack: Vec<String>,
    },

    /// 回滚一次导入
    Rollback { import_id: String },

    /// 列出导入历史
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// 初始化数据库表结构
    InitDb,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("JSON 序列化失败")?;
    println!("{}", text);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    tracing::info!(db_path = %db_path, version = catalog_import::VERSION, "使用数据库");
    let api = ImportApi::new(db_path);

    let outcome: Result<(), ApiError> = async {
        match cli.command {
            Command::Validate { file } => {
                let report = api.validate(&file).await?;
                print_json(&report).map_err(|e| ApiError::Internal(e.to_string()))
            }
            Command::Preview { file } => {
                let preview = api.preview(&file).await?;
                print_json(&preview).map_err(|e| ApiError::Internal(e.to_string()))
            }
            Command::Execute { file, ack } => {
                let response = api.execute(&file, &ack).await?;
                print_json(&response).map_err(|e| ApiError::Internal(e.to_string()))
            }
            Command::Rollback { import_id } => {
                let response = api.rollback(&import_id).await?;
                print_json(&response).map_err(|e| ApiError::Internal(e.to_string()))
            }
            Command::History { limit } => {
                let history = api.history(limit).await?;
                print_json(&history).map_err(|e| ApiError::Internal(e.to_string()))
            }
            Command::InitDb => api.init_db(),
        }
    }
    .await;

    outcome.context("命令执行失败")
}
