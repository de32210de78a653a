// ==========================================
// 管道材料导入系统 - 命令行入口
// ==========================================
// 用法: takeoff-import <project_id> <file>... [--db <path>] [--preview]
// 输出: 每个文件一条 JSON 结果（ImportResult / ImportPreview）
// ==========================================

use std::process::ExitCode;
use takeoff_import::api::{status_for, ImportApi};
use takeoff_import::db::get_default_db_path;
use takeoff_import::logging;

struct CliArgs {
    project_id: String,
    files: Vec<String>,
    db_path: String,
    preview: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut positional = Vec::new();
    let mut db_path = None;
    let mut preview = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                db_path = Some(args.next().ok_or("--db 缺少路径参数")?);
            }
            "--preview" => preview = true,
            _ => positional.push(arg),
        }
    }

    if positional.len() < 2 {
        return Err("用法: takeoff-import <project_id> <file>... [--db <path>] [--preview]".to_string());
    }
    let project_id = positional.remove(0);

    Ok(CliArgs {
        project_id,
        files: positional,
        db_path: db_path.unwrap_or_else(get_default_db_path),
        preview,
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("结果序列化失败: {}", e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };

    tracing::info!("==================================================");
    tracing::info!("{} v{}", takeoff_import::APP_NAME, takeoff_import::VERSION);
    tracing::info!("使用数据库: {}", args.db_path);
    tracing::info!("==================================================");

    let api = ImportApi::new(args.db_path);

    if args.preview {
        let mut failed = false;
        for file in &args.files {
            match api.preview_file(file).await {
                Ok(preview) => print_json(&preview),
                Err(e) => {
                    eprintln!("{}: {}", file, e);
                    failed = true;
                }
            }
        }
        return if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS };
    }

    match api.batch_import(&args.project_id, &args.files).await {
        Ok(results) => {
            let all_ok = results.iter().all(|r| status_for(r) == 200);
            for result in &results {
                print_json(result);
            }
            if all_ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
