mod runtime;

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::runtime::copy_runtime;

/// TypeNative to C++ transpiler.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transpile a source file to C++ and build it with a C++ compiler
    Compile {
        file: PathBuf,

        #[arg(long, value_name = "PROGRAM", default_value = "clang++-20")]
        compiler: String,

        #[arg(long, value_name = "DIR", default_value = "build")]
        build_dir: PathBuf,

        #[arg(long, value_name = "DIR", default_value = "dist")]
        dist_dir: PathBuf,

        #[arg(
            long,
            value_name = "DIR",
            default_value = "src",
            help = "Root of the C++ runtime support tree"
        )]
        runtime: PathBuf,

        #[arg(long, help = "Write the C++ artifact and stop")]
        emit_only: bool,
    },
    /// Print the canonical, fully parenthesised form of a source file
    Render { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Compile {
            file,
            compiler,
            build_dir,
            dist_dir,
            runtime,
            emit_only,
        } => {
            let relative = mirrored_path(&file)?;
            let source = read_source(&file)?;
            let artifact = tn_core::transpile(&source)
                .with_context(|| format!("failed to transpile {}", file.display()))?;

            let cpp_path = build_dir.join(relative.with_extension("cpp"));
            write_output(&cpp_path, artifact.cpp.as_bytes())?;
            info!(path = %cpp_path.display(), "wrote C++ artifact");
            if emit_only {
                return Ok(());
            }

            let copied = copy_runtime(&runtime, &build_dir.join("src"))?;
            info!(files = copied, "copied runtime support tree");

            let binary = dist_dir.join(relative.with_extension(""));
            run_compiler(&compiler, &cpp_path, &build_dir, &binary)?;
            info!(path = %binary.display(), "built executable");
        }
        Commands::Render { file } => {
            let source = read_source(&file)?;
            let rendered = tn_core::render(&source)
                .with_context(|| format!("failed to render {}", file.display()))?;
            println!("{rendered}");
        }
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))
}

/// Relative form of `file` used under the build and dist directories.
///
/// Only normal components are kept, so absolute paths and `..` segments
/// can never escape the output directory.
fn mirrored_path(file: &Path) -> Result<PathBuf> {
    let relative: PathBuf = file
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    if relative.as_os_str().is_empty() {
        bail!("input path {} does not name a file", file.display());
    }
    Ok(relative)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

fn run_compiler(compiler: &str, cpp_path: &Path, build_dir: &Path, binary: &Path) -> Result<()> {
    if let Some(parent) = binary.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    info!(compiler, "invoking C++ compiler");
    let output = process::Command::new(compiler)
        .arg(cpp_path)
        .args(["-std=c++20", "-Wall", "-I"])
        .arg(build_dir)
        .arg("-o")
        .arg(binary)
        .output()
        .with_context(|| format!("failed to run C++ compiler `{compiler}`"))?;
    if !output.status.success() {
        bail!(
            "C++ compiler `{compiler}` failed ({}):\n{}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_only_normal_components() {
        assert_eq!(
            mirrored_path(Path::new("demo/points.tn")).expect("mirror"),
            PathBuf::from("demo/points.tn")
        );
        assert_eq!(
            mirrored_path(Path::new("/tmp/../x/./y.tn")).expect("mirror"),
            PathBuf::from("tmp/x/y.tn")
        );
    }

    #[test]
    fn rejects_paths_without_a_file_component() {
        for path in [".", "/", "./..", ""] {
            let err = mirrored_path(Path::new(path)).unwrap_err();
            assert!(err.to_string().contains("does not name a file"), "{path}: {err}");
        }
    }
}
