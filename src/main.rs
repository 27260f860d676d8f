use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use getfavicon_rust::{FaviconConfig, FaviconFetcher};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

/// 网站图标获取工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 目标网址，可省略协议
    url: String,

    /// 配置文件路径
    #[arg(short = 'f', long, default_value = "config/config.yaml")]
    config: String,

    /// 忽略缓存重新获取
    #[arg(long)]
    refresh: bool,

    /// 将图标写入文件
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// 输出 data URL
    #[arg(long)]
    data_url: bool,

    /// 输出 JSON 摘要
    #[arg(long)]
    json: bool,

    /// 缓存目录
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// 超时时间（毫秒）
    #[arg(long)]
    timeout: Option<u64>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 详细输出
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 先读取配置，fetch.debug 会影响日志级别
    let loaded = Path::new(&args.config)
        .exists()
        .then(|| FaviconConfig::load_from_file(&args.config));
    let debug = args.verbose || matches!(&loaded, Some(Ok(c)) if c.fetch.debug);
    let level = if debug { "debug" } else { args.log_level.as_str() };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match loaded {
        Some(Ok(config)) => {
            log::debug!("从配置文件加载设置: {}", args.config);
            config
        }
        Some(Err(e)) => {
            log::warn!("配置文件加载失败: {}，使用默认配置", e);
            FaviconConfig::default()
        }
        None => {
            log::debug!("配置文件不存在: {}，使用默认配置", args.config);
            FaviconConfig::default()
        }
    };
    if let Some(dir) = args.cache_dir {
        config.cache.dir = dir;
    }
    if let Some(timeout) = args.timeout {
        config.fetch.timeout_ms = timeout;
    }
    if args.verbose {
        config.fetch.debug = true;
    }

    let url = args.url.trim();
    if url.is_empty() {
        bail!("URL 不能为空");
    }

    let fetcher = FaviconFetcher::new(config)?;
    let icon = fetcher.fetch(url, args.refresh).await;

    if let Some(output) = &args.output {
        fs::write(output, icon.content())?;
        eprintln!("💾 已保存到 {}", output);
    }

    if args.json {
        let summary = json!({
            "url": url,
            "mime": icon.mime(),
            "cached": icon.is_cached(),
            "bytes": icon.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if args.data_url {
        println!("data:{};base64,{}", icon.mime(), STANDARD.encode(icon.content()));
    } else if args.output.is_none() {
        println!("{:=<60}", "");
        println!("网址: {}", url);
        println!("类型: {}", icon.mime());
        println!("大小: {} 字节", icon.len());
        println!("X-Cache: {}", if icon.is_cached() { "HIT" } else { "MISS" });
    }

    Ok(())
}
