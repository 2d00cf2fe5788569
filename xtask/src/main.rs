use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "x")]
#[command(about = "Workspace tasks for the gbacore emulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Everything CI runs: format check, clippy, build and the full test suite
    Ci {
        #[arg(long)]
        verbose: bool,
    },
    /// Format check and clippy only
    Check {
        #[arg(long)]
        verbose: bool,
    },
    /// Format the workspace
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Lint with clippy, warnings denied
    Clippy {
        #[arg(long)]
        fix: bool,
    },
    /// Build the emulator
    Build {
        #[arg(long)]
        release: bool,
    },
    /// Run tests, optionally limited to some suites
    Test {
        /// Doc tests only
        #[arg(long)]
        doc: bool,
        #[arg(long)]
        ignored: bool,
        /// Suite to run; repeat for several
        #[arg(short, long = "suite", value_enum)]
        suites: Vec<Suite>,
    },
    /// Run criterion benchmarks
    Bench {
        /// Only benchmarks whose name contains this
        filter: Option<String>,
    },
    /// Check a cartridge header and run the image headless
    RunRom {
        rom_path: String,
        /// Frames to emulate
        #[arg(short = 'n', long, default_value = "600")]
        frames: u64,
        /// BIOS image to boot through instead of the built-in services
        #[arg(long)]
        bios: Option<String>,
        /// Where to write a save state at the end of the run
        #[arg(long)]
        save_state: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// What the git hook runs: format check, clippy and tests
    PreCommit,
    /// Write the pre-commit hook into .git/hooks
    InstallHooks,
}

/// Test suites selectable with `cargo x test -s <suite>`
#[derive(Clone, Copy, ValueEnum)]
enum Suite {
    Cpu,
    Dma,
    Timer,
    Interrupt,
    Memory,
    System,
    /// Whole-machine tests under tests/
    Integration,
}

impl Suite {
    fn label(self) -> &'static str {
        match self {
            Suite::Cpu => "CPU",
            Suite::Dma => "DMA",
            Suite::Timer => "Timer",
            Suite::Interrupt => "Interrupt",
            Suite::Memory => "Memory",
            Suite::System => "System",
            Suite::Integration => "Integration",
        }
    }

    fn cargo_args(self) -> Vec<&'static str> {
        let filter = match self {
            Suite::Cpu => "core::cpu",
            Suite::Dma => "core::dma",
            Suite::Timer => "core::timer",
            Suite::Interrupt => "core::interrupt",
            Suite::Memory => "core::memory",
            Suite::System => "core::system",
            Suite::Integration => return vec!["--test", "integration_test"],
        };
        vec!["--lib", filter]
    }
}

/// One stage of a composite command
#[derive(Clone, Copy)]
enum Step {
    FmtCheck,
    Clippy,
    Build,
    Test,
}

impl Step {
    fn name(self) -> &'static str {
        match self {
            Step::FmtCheck => "Format check",
            Step::Clippy => "Clippy",
            Step::Build => "Build",
            Step::Test => "Tests",
        }
    }

    fn run(self) -> Result<()> {
        match self {
            Step::FmtCheck => run_fmt(true),
            Step::Clippy => run_clippy(false),
            Step::Build => run_build(false),
            Step::Test => run_test(false, false, &[]),
        }
    }
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Ci { verbose } => run_steps(
            "CI",
            &[Step::FmtCheck, Step::Clippy, Step::Build, Step::Test],
            verbose,
        ),
        Commands::Check { verbose } => {
            run_steps("Quick checks", &[Step::FmtCheck, Step::Clippy], verbose)
        }
        Commands::Fmt { check } => run_fmt(check),
        Commands::Clippy { fix } => run_clippy(fix),
        Commands::Build { release } => run_build(release),
        Commands::Test {
            doc,
            ignored,
            suites,
        } => run_test(doc, ignored, &suites),
        Commands::Bench { filter } => run_bench(filter.as_deref()),
        Commands::RunRom {
            rom_path,
            frames,
            bios,
            save_state,
            release,
        } => run_rom(
            &rom_path,
            frames,
            bios.as_deref(),
            save_state.as_deref(),
            release,
        ),
        Commands::PreCommit => run_steps(
            "Pre-commit",
            &[Step::FmtCheck, Step::Clippy, Step::Test],
            false,
        ),
        Commands::InstallHooks => install_hooks(),
    }
}

fn cargo() -> Command {
    Command::new(env!("CARGO"))
}

fn run_steps(title: &str, steps: &[Step], verbose: bool) -> Result<()> {
    println!("{}", format!("=== {} ===", title).bold().blue());
    let start = Instant::now();

    for &step in steps {
        print!("{} {} ... ", "→".blue(), step.name());
        let step_start = Instant::now();
        if let Err(e) = step.run() {
            println!("{}", "✗".red().bold());
            return Err(e.context(format!("{} failed", step.name())));
        }
        if verbose {
            println!(
                "{} ({:.2}s)",
                "✓".green().bold(),
                step_start.elapsed().as_secs_f64()
            );
        } else {
            println!("{}", "✓".green().bold());
        }
    }

    println!(
        "\n{} {}",
        format!("✓ {} passed in", title).green().bold(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );
    Ok(())
}

fn run_fmt(check: bool) -> Result<()> {
    let mut cmd = cargo();
    cmd.args(["fmt", "--all"]);
    if check {
        cmd.args(["--", "--check"]);
    }
    execute_command(&mut cmd)
}

fn run_clippy(fix: bool) -> Result<()> {
    let mut cmd = cargo();
    cmd.args(["clippy", "--workspace", "--all-targets", "--all-features"]);
    if fix {
        cmd.args(["--fix", "--allow-dirty"]);
    } else {
        cmd.args(["--", "-D", "warnings"]);
    }
    execute_command(&mut cmd)
}

fn run_build(release: bool) -> Result<()> {
    let mut cmd = cargo();
    cmd.arg("build");
    if release {
        cmd.arg("--release");
    }
    execute_command(&mut cmd)
}

fn test_command(extra: &[&str], ignored: bool) -> Command {
    let mut cmd = cargo();
    cmd.args(["test", "--all-features"]).args(extra);
    if ignored {
        cmd.args(["--", "--ignored"]);
    }
    cmd
}

fn run_test(doc: bool, ignored: bool, suites: &[Suite]) -> Result<()> {
    if doc {
        return execute_command(&mut test_command(&["--doc"], ignored));
    }
    if suites.is_empty() {
        return execute_command(&mut test_command(&[], ignored));
    }

    // Keep going after a failing suite so every requested one reports
    let mut failed = Vec::new();
    for &suite in suites {
        println!("{} {} tests", "→".blue(), suite.label().bold());
        match execute_command(&mut test_command(&suite.cargo_args(), ignored)) {
            Ok(()) => println!("{} {} passed\n", "✓".green(), suite.label()),
            Err(_) => {
                println!("{} {} failed\n", "✗".red(), suite.label());
                failed.push(suite.label());
            }
        }
    }

    if !failed.is_empty() {
        bail!("failing suites: {}", failed.join(", "));
    }
    Ok(())
}

fn run_bench(filter: Option<&str>) -> Result<()> {
    let mut cmd = cargo();
    cmd.arg("bench");
    if let Some(filter) = filter {
        cmd.args(["--", filter]);
    }
    execute_command(&mut cmd)
}

/// Title and game code from a cartridge header, or an error if the
/// image could not boot
fn inspect_header(path: &Path) -> Result<(String, String)> {
    let image = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if image.len() < 0xC0 {
        bail!("{} bytes is smaller than a cartridge header", image.len());
    }
    if image.len() > 32 * 1024 * 1024 {
        bail!("{} bytes is larger than the 32MB cartridge space", image.len());
    }
    if image[0xB2] != 0x96 {
        bail!("header byte 0xB2 is 0x{:02X}, expected 0x96", image[0xB2]);
    }

    let text = |range: std::ops::Range<usize>| {
        image[range]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect::<String>()
    };
    Ok((text(0xA0..0xAC), text(0xAC..0xB0)))
}

fn run_rom(
    rom_path: &str,
    frames: u64,
    bios: Option<&str>,
    save_state: Option<&str>,
    release: bool,
) -> Result<()> {
    println!("{}", "=== Headless run ===".bold().blue());

    let (title, code) = match inspect_header(Path::new(rom_path)) {
        Ok(header) => header,
        Err(e) => {
            println!("{} {}: {}", "✗".red().bold(), rom_path.yellow(), e);
            return Err(e);
        }
    };
    println!("{} {} [{}] {}", "✓".green(), title.cyan(), code, rom_path);
    println!(
        "{} {} frames, {} build, {}",
        "→".blue(),
        frames.to_string().bold(),
        if release { "release".green() } else { "debug".yellow() },
        match bios {
            Some(path) => format!("BIOS {}", path),
            None => "built-in BIOS services".to_string(),
        }
    );
    println!();

    let mut cmd = cargo();
    cmd.arg("run");
    if release {
        cmd.arg("--release");
    }
    cmd.args(["--bin", "gbacore", "--", rom_path, "--no-audio", "-n"])
        .arg(frames.to_string());
    if let Some(path) = bios {
        cmd.args(["--bios", path]);
    }
    if let Some(path) = save_state {
        cmd.args(["--save-state", path]);
    }

    let start = Instant::now();
    execute_command(&mut cmd).context("emulator exited with an error")?;
    println!(
        "\n{} {} frames in {}",
        "✓".green().bold(),
        frames,
        format!("{:.2}s", start.elapsed().as_secs_f64()).bold()
    );
    Ok(())
}

fn install_hooks() -> Result<()> {
    let hook_path = Path::new(".git/hooks/pre-commit");
    if !hook_path.parent().is_some_and(Path::exists) {
        bail!("no .git/hooks directory; run from the repository root");
    }

    fs::write(hook_path, "#!/bin/sh\nset -e\nexec cargo x pre-commit\n")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(hook_path, fs::Permissions::from_mode(0o755))?;
    }

    println!("{} pre-commit hook installed", "✓".green());
    Ok(())
}

fn execute_command(cmd: &mut Command) -> Result<()> {
    let status = cmd
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .context("failed to spawn cargo")?;
    if !status.success() {
        bail!("command failed: {}", status);
    }
    Ok(())
}
