/*!
 * sandboxfs - Operator CLI
 *
 * Inspects and maintains one tenant data directory through the sandbox
 * engine, so every path an operator types is confined exactly as the
 * daemon's own collaborators are.
 */

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, warn};

use sandbox_fs::core::limits::{DEFAULT_FILE_MODE, MAX_SYMLINK_EXPANSIONS};
use sandbox_fs::{
    init_tracing, CancelToken, DirEntry, FileType, OpenFlags, SandboxConfig, SandboxFs, Stat,
    Visit,
};

#[derive(Debug, Parser)]
#[command(name = "sandboxfs", version, about = "Confined file operations on a tenant directory")]
struct Cli {
    /// Tenant data directory every path is confined to
    #[arg(long, env = "SANDBOX_ROOT")]
    root: PathBuf,

    /// Relative-open resolution (falls back automatically where unsupported)
    #[arg(long, env = "SANDBOX_STRICT_RESOLUTION", default_value_t = true, action = ArgAction::Set)]
    strict: bool,

    /// Symlink expansions allowed per path
    #[arg(long, env = "SANDBOX_MAX_SYMLINKS", default_value_t = MAX_SYMLINK_EXPANSIONS)]
    max_symlinks: u32,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Show metadata
    Stat {
        path: String,
        /// Do not follow a symlink in the final component
        #[arg(long)]
        no_follow: bool,
    },
    /// Apparent size of directory trees, hardlinks counted once
    Du { paths: Vec<String> },
    /// Create a directory
    Mkdir {
        path: String,
        /// Create missing parents
        #[arg(short, long)]
        parents: bool,
        /// Octal mode
        #[arg(long, default_value = "755", value_parser = parse_mode)]
        mode: u32,
    },
    /// Create missing parents, then create or truncate a file
    Touch { path: String },
    /// Remove a file or directory
    Rm {
        path: String,
        #[arg(short, long)]
        recursive: bool,
    },
    /// Rename within the root
    Mv { from: String, to: String },
    /// Create a link
    Ln {
        /// Create a symbolic link (the only kind supported)
        #[arg(short, long)]
        symbolic: bool,
        target: String,
        link: String,
    },
    /// Print a directory tree
    Tree {
        #[arg(default_value = "")]
        path: String,
    },
}

fn parse_mode(value: &str) -> Result<u32, String> {
    u32::from_str_radix(value.trim_start_matches("0o"), 8)
        .map_err(|e| format!("invalid octal mode {:?}: {}", value, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = SandboxConfig {
        root: cli.root.clone(),
        strict_resolution: cli.strict,
        max_symlink_expansions: cli.max_symlinks,
    };
    config.validate()?;
    let fs = SandboxFs::with_config(&config)
        .with_context(|| format!("opening sandbox root {}", cli.root.display()))?;
    debug!(root = %fs.root().display(), mode = %fs.mode(), "sandbox opened");

    match cli.command {
        Command::Ls { path } => {
            let entries = fs.read_dir(&path)?;
            if cli.json {
                println!("{}", serde_json::to_string(&entries)?);
            } else {
                for entry in &entries {
                    println!("{}", format_entry(entry));
                }
            }
        }
        Command::Stat { path, no_follow } => {
            let stat = if no_follow { fs.lstat(&path)? } else { fs.stat(&path)? };
            if cli.json {
                println!("{}", serde_json::to_string(&stat)?);
            } else {
                print_stat(&stat);
            }
        }
        Command::Du { paths } => du(fs, paths, cli.json).await?,
        Command::Mkdir {
            path,
            parents,
            mode,
        } => {
            if parents {
                fs.mkdir_all(&path, mode)?;
            } else {
                fs.mkdir(&path, mode)?;
            }
        }
        Command::Touch { path } => {
            fs.touch(&path, OpenFlags::write_only(), DEFAULT_FILE_MODE)?;
        }
        Command::Rm { path, recursive } => {
            if recursive {
                fs.remove_all(&path)?;
            } else {
                fs.remove(&path)?;
            }
        }
        Command::Mv { from, to } => fs.rename(&from, &to)?,
        Command::Ln {
            symbolic,
            target,
            link,
        } => {
            if !symbolic {
                bail!("hard links are not supported; use -s");
            }
            fs.symlink(&target, &link)?;
        }
        Command::Tree { path } => tree(&fs, &path)?,
    }
    Ok(())
}

/// Size several trees in parallel on the blocking pool; Ctrl-C cancels all
async fn du(fs: SandboxFs, paths: Vec<String>, json: bool) -> Result<()> {
    let paths = if paths.is_empty() {
        vec![String::new()]
    } else {
        paths
    };

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let tasks: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let fs = fs.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                let size = fs.directory_size_with(&path, &cancel);
                (path, size)
            })
        })
        .collect();

    for task in tasks {
        let (path, size) = task.await.context("size task failed")?;
        let size = size?;
        let shown = if path.is_empty() { "." } else { path.as_str() };
        if json {
            println!("{}", serde_json::json!({ "path": shown, "bytes": size }));
        } else {
            println!("{}\t{}", size, shown);
        }
    }
    Ok(())
}

fn tree(fs: &SandboxFs, path: &str) -> Result<()> {
    let mut lines = Vec::new();
    fs.walk(path, |entry| {
        if let Err(err) = entry.metadata() {
            warn!(path = %entry.logical_path(), error = %err, "skipping unreadable entry");
            return Ok(Visit::Continue);
        }
        let depth = entry.relative_path().components().count();
        let marker = match entry.file_type() {
            Some(FileType::Directory) => "/",
            Some(FileType::Symlink) => "@",
            _ => "",
        };
        lines.push((
            entry.relative_path().to_path_buf(),
            format!(
                "{}{}{}",
                "  ".repeat(depth.saturating_sub(1)),
                entry.name().to_string_lossy(),
                marker
            ),
        ));
        Ok(Visit::Continue)
    })?;

    // Host order is unspecified; sort by path for stable output.
    lines.sort_by(|a, b| a.0.cmp(&b.0));
    println!("{}", if path.is_empty() { "." } else { path });
    for (_, line) in lines {
        println!("{}", line);
    }
    Ok(())
}

fn format_entry(entry: &DirEntry) -> String {
    let kind = match entry.file_type {
        FileType::Directory => 'd',
        FileType::Symlink => 'l',
        FileType::File => '-',
        FileType::Other => '?',
    };
    match &entry.stat {
        Some(stat) => format!("{}{} {:>12} {}", kind, stat.mode, stat.size, entry.name),
        None => format!("{}????????? {:>12} {}", kind, "-", entry.name),
    }
}

fn print_stat(stat: &Stat) {
    println!("  Name: {}", stat.name);
    println!("  Type: {}", stat.file_type);
    println!("  Size: {}", stat.size);
    println!("  Mode: {} ({:o})", stat.mode, stat.mode.mode);
    if let Ok(since) = stat.modified.duration_since(std::time::UNIX_EPOCH) {
        println!("Modify: {}", since.as_secs());
    }
    #[cfg(unix)]
    println!(
        " Inode: {}  Links: {}  Uid: {}  Gid: {}",
        stat.raw.ino, stat.raw.nlink, stat.raw.uid, stat.raw.gid
    );
}
