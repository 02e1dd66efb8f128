//! # SnipShare 快照导出：命令行入口
//!
//! 本文件仅负责参数解析、设置加载与组件装配。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use serde::Serialize;

use snipshare::capture::{FrameRasterizer, SnapshotCapturer, StaticPage};
use snipshare::device::{DeviceProfile, SharedConnectivity, Viewport};
use snipshare::error::{ErrorReport, SnapError};
use snipshare::export::{
    ActionButton, ActionSpec, DiskFileSaver, ExportOptions, Exporter, OperationMode,
    SystemClipboard,
};
use snipshare::net::{ReqwestTransport, ResilientFetcher, SnippetClient};
use snipshare::settings::AppSettings;
use snipshare::status::StatusReporter;
use snipshare::storage;

/// 没有帧文件时（仅复制链接）使用的占位目标尺寸。
const PLACEHOLDER_TARGET: (u32, u32) = (800, 400);

#[derive(Parser)]
#[command(name = "snipshare", about = "Snapshot and share code snippets")]
struct Args {
    /// Settings file (JSON)
    #[arg(long, default_value = "snipshare.json")]
    settings: PathBuf,

    /// Viewport size, e.g. 1280x720
    #[arg(long, default_value = "1280x720", value_parser = parse_viewport)]
    viewport: Viewport,

    /// Device pixel ratio
    #[arg(long)]
    dpr: Option<f64>,

    /// User-Agent used for device detection
    #[arg(long, default_value = "")]
    user_agent: String,

    /// Treat the network as unavailable
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy the snippet page URL to the clipboard
    CopyLink {
        /// Rendered frame of the snippet (PNG)
        #[arg(long)]
        frame: Option<PathBuf>,
    },
    /// Capture the snippet and copy the image to the clipboard
    CopyImage {
        #[arg(long)]
        frame: PathBuf,
    },
    /// Capture the snippet and save it as a PNG file
    DownloadImage {
        #[arg(long)]
        frame: PathBuf,

        /// Title used for the file name
        #[arg(long)]
        title: Option<String>,
    },
    /// Create a new snippet through the persistence API
    CreateSnippet {
        /// Number of snippets the user already owns
        #[arg(long, default_value = "0")]
        count: u32,
    },
    /// Delete a snippet through the persistence API
    DeleteSnippet { id: String },
}

fn parse_viewport(value: &str) -> Result<Viewport, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width = width.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let height = height.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if width == 0 || height == 0 {
        return Err("viewport dimensions must be positive".to_string());
    }
    Ok(Viewport { width, height })
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();
    let settings = AppSettings::load_from_path(&args.settings);
    if let Err(e) = settings.validate() {
        return report_failure(&e);
    }

    let status = StatusReporter::global();
    let result = match &args.command {
        Command::CopyLink { frame } => {
            let mode = OperationMode::CopyLink;
            run_export(&args, &settings, &status, mode, frame.clone(), None).await
        }
        Command::CopyImage { frame } => {
            let mode = OperationMode::CopyImage;
            run_export(&args, &settings, &status, mode, Some(frame.clone()), None).await
        }
        Command::DownloadImage { frame, title } => {
            run_export(
                &args,
                &settings,
                &status,
                OperationMode::DownloadImage,
                Some(frame.clone()),
                title.clone(),
            )
            .await
        }
        Command::CreateSnippet { count } => match snippet_client(&args, &settings, &status) {
            Ok(client) => client.create_snippet(*count).await.and_then(|s| print_json(&s)),
            Err(e) => Err(e),
        },
        Command::DeleteSnippet { id } => match snippet_client(&args, &settings, &status) {
            Ok(client) => client.delete_snippet(id).await.and_then(|d| print_json(&d)),
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => {
            let code = status.current();
            if !code.is_empty() {
                println!("{code}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => report_failure(&e),
    }
}

fn device_profile(args: &Args) -> DeviceProfile {
    DeviceProfile {
        viewport: args.viewport,
        user_agent: args.user_agent.clone(),
        device_pixel_ratio: args.dpr,
        online: !args.offline,
        class_override: None,
    }
}

async fn run_export(
    args: &Args,
    settings: &AppSettings,
    status: &StatusReporter,
    mode: OperationMode,
    frame: Option<PathBuf>,
    title: Option<String>,
) -> Result<(), SnapError> {
    let (rasterizer, (width, height)) = match frame {
        Some(path) => {
            let rasterizer = FrameRasterizer::from_path(path);
            let dimensions = rasterizer.frame_dimensions()?;
            (rasterizer, dimensions)
        }
        None => (FrameRasterizer::from_bytes(Bytes::new()), PLACEHOLDER_TARGET),
    };

    let page = StaticPage::new(args.viewport, settings.page_url.clone())
        .with_target(settings.target_element_id.clone(), width, height)
        .with_overlay(settings.overlay_element_id.clone(), "block");
    let download_dir = storage::resolve_download_dir(settings.download_dir.as_deref())?;
    let capturer = SnapshotCapturer::new(status.clone())
        .with_overlay_element(settings.overlay_element_id.clone())
        .with_settle_delay(settings.settle_delay());

    let exporter = Exporter::new(
        page,
        rasterizer,
        SystemClipboard::detect(settings.clipboard),
        DiskFileSaver::new(download_dir),
        status.clone(),
        device_profile(args),
    )
    .with_capturer(capturer)
    .with_options(ExportOptions {
        target_element_id: settings.target_element_id.clone(),
        padding: settings.padding,
        guard_timeout: settings.guard_timeout(),
        title,
    });

    let button = ActionButton::new(ActionSpec::for_mode(mode))
        .with_reset_delay(settings.button_reset_delay());
    match button.click(settings.is_authenticated(), || exporter.snap(mode)).await {
        Some(outcome) => {
            let outcome = outcome?;
            log::info!("🔘 {} -> {:?}", button.label(), outcome);
            Ok(())
        }
        None => Err(SnapError::InvalidConfig(format!(
            "操作 {} 需要登录会话（session_token 为空）",
            button.spec().id
        ))),
    }
}

fn snippet_client(
    args: &Args,
    settings: &AppSettings,
    status: &StatusReporter,
) -> Result<SnippetClient<ReqwestTransport, SharedConnectivity>, SnapError> {
    let transport =
        ReqwestTransport::new(settings.request_timeout(), settings.connect_timeout())?;
    let connectivity = SharedConnectivity::new(!args.offline);
    let fetcher = ResilientFetcher::new(transport, connectivity, status.clone())
        .with_timeout(settings.request_timeout())
        .with_retry_delay_ms(settings.retry_delay_ms);
    let client = SnippetClient::new(fetcher, settings.api_base_url.clone())
        .with_session(settings.session_token.clone())
        .with_max_retries(settings.max_retries);
    if !client.has_session() {
        log::warn!("⚠️ 未配置 session_token，持久化接口可能返回 UNAUTHORIZED");
    }
    Ok(client)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), SnapError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| SnapError::InvalidResponse(format!("序列化结果失败：{}", e)))?;
    println!("{json}");
    Ok(())
}

fn report_failure(error: &SnapError) -> ExitCode {
    log::error!("❌ {}", error);
    match serde_json::to_string(&ErrorReport::from(error)) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{}", error.code()),
    }
    ExitCode::FAILURE
}
