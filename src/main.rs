use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docvfs::archive::{split_at_existing, ArchiveClassifier, ArchiveMaterializer};
use docvfs::config::AppConfig;
use docvfs::core::{relative_path, resolve};
use docvfs::crawl::list_tree;
use docvfs::query::build_query_in;
use docvfs::storage::ScratchSpace;
use docvfs::vfs::{VirtualFs, ZipFs};

#[derive(Parser, Debug)]
#[command(name = "docvfs")]
#[command(about = "Archive-transparent paths and query parsing for document indexing")]
struct Args {
    /// 配置文件（默认 <config_dir>/docvfs/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 以 JSON 输出
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 判断路径是文件、目录、归档还是归档条目
    Classify { path: String },
    /// 找出复合路径中最长的真实文件前缀
    Split { path: String },
    /// 把归档条目解包成真实文件
    Extract {
        path: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// 计算 src 到 dst 的相对路径
    Relpath { src: String, dst: String },
    /// 用相对路径从 src 还原绝对路径
    Resolve { src: String, rel: String },
    /// 解析查询
    Query {
        text: String,
        /// 默认运算符用 OR（覆盖配置）
        #[arg(long)]
        or: bool,
    },
    /// 列出目录树（含归档内部）
    Ls { root: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;
    let vfs: Arc<dyn VirtualFs> = Arc::new(ZipFs::new(config.detector()));
    let classifier = ArchiveClassifier::new(vfs.clone());

    match args.command {
        Command::Classify { path } => {
            let node = classifier
                .classify(&path)
                .with_context(|| format!("file not found: {path}"))?;
            if args.json {
                print_json(&node)?;
            } else {
                println!("{}\t{}", node.kind_name(), node.path());
            }
        }
        Command::Split { path } => {
            let r = split_at_existing(&path)?;
            if args.json {
                print_json(&r)?;
            } else {
                println!("{}\t{}", r.existing, r.suffix);
            }
        }
        Command::Extract { path, out_dir } => {
            let node = classifier
                .classify(&path)
                .with_context(|| format!("file not found: {path}"))?;
            let scratch = Arc::new(ScratchSpace::open(&config.scratch_dir(), config.quota_bytes())?);
            let materializer = ArchiveMaterializer::new(vfs.clone(), scratch.clone());
            let Some(tmp) = materializer.materialize(&node)? else {
                anyhow::bail!("not an archive entry: {} ({})", node.path(), node.kind_name());
            };
            let name = node.as_entry().map(|e| e.name()).unwrap_or("entry");
            let dst = copy_out(&tmp, &out_dir, name)?;
            info!("Extracted {} -> {:?}", node.path(), dst);
            if args.json {
                print_json(&ExtractOutput {
                    entry: node.path(),
                    output: &dst,
                    scratch: scratch.report(),
                })?;
            } else {
                println!("{}", dst.display());
                eprint!("{}", scratch.report());
            }
        }
        Command::Relpath { src, dst } => {
            let rel = relative_path(&src, &dst);
            if args.json {
                print_json(&rel)?;
            } else {
                println!("{rel}");
            }
        }
        Command::Resolve { src, rel } => {
            let abs = resolve(&src, &rel);
            if args.json {
                print_json(&abs)?;
            } else {
                println!("{abs}");
            }
        }
        Command::Query { text, or } => {
            let use_or = or || config.search.use_or_operator;
            let parsed = build_query_in(&text, use_or, &config.search.default_field)?;
            if args.json {
                print_json(&parsed)?;
            } else {
                println!("{}", parsed.query);
                println!("phrase: {}", parsed.is_phrase_query);
            }
        }
        Command::Ls { root } => {
            let nodes = list_tree(vfs.as_ref(), &classifier, &root);
            if args.json {
                let rows: Vec<_> = nodes.iter().map(|(_, n)| n).collect();
                print_json(&rows)?;
            } else {
                for (p, n) in &nodes {
                    println!("{:<18}{}", n.kind_name(), p);
                }
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ExtractOutput<'a> {
    entry: &'a str,
    output: &'a Path,
    scratch: docvfs::stats::ScratchReport,
}

/// scratch 会话结束时会被清空，结果需要复制到目标目录
fn copy_out(tmp: &Path, out_dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {:?}", out_dir))?;
    let dst = out_dir.join(name);
    std::fs::copy(tmp, &dst).with_context(|| format!("failed to write {:?}", dst))?;
    Ok(dst)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
