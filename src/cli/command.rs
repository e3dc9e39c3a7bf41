use super::suite;
use crate::assembler;
use crate::assets;
use crate::report::Report;
use crate::spec::hw::{self, CodeWord};
use crate::vm::{Emulator, LogLevel, State};
use anyhow::{anyhow, Context, Result};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use structopt::StructOpt;

#[cfg(windows)]
pub fn terminal_init() {
    ansi_term::enable_ansi_support().expect("Could enable terminal ANSI support");
}

#[cfg(not(windows))]
pub fn terminal_init() {}

pub fn assemble_path(path: &Path) -> Result<Vec<CodeWord>> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("could not read source '{}'", path.display()))?;

    let mut report = Report::new();
    let code = assembler::assemble(&src, &mut report);
    if !report.is_empty() {
        return Err(anyhow!(
            "assembly of '{}' failed:\n{}",
            path.display(),
            report
        ));
    }

    Ok(code)
}

#[derive(StructOpt, Debug)]
#[structopt(name = "dcpu16")]
pub enum CommandRoot {
    Vm(SubcommandVm),
    Asm(SubcommandAsm),
    Run(SubcommandRun),
    Suite(SubcommandSuite),
}

#[derive(StructOpt, Debug)]
#[structopt(name = "dasm")]
pub struct SubcommandAsm {
    #[structopt(name = "in.das", parse(from_os_str))]
    in_src: PathBuf,

    #[structopt(name = "out.dcb", parse(from_os_str))]
    out_bin: Option<PathBuf>,
}

#[derive(StructOpt, Debug)]
struct VmOpts {
    #[structopt(short, long, name = "max-steps")]
    max_steps: Option<StepLimit>,

    #[structopt(short, long)]
    verbose: bool,
}

#[derive(StructOpt, Debug)]
#[structopt(name = "dcpu-vm")]
pub struct SubcommandVm {
    #[structopt(flatten)]
    vm_opts: VmOpts,

    #[structopt(name = "prog.dcb", parse(from_os_str))]
    in_prog_bin: PathBuf,
}

#[derive(StructOpt, Debug)]
pub struct SubcommandRun {
    #[structopt(flatten)]
    vm_opts: VmOpts,

    #[structopt(name = "prog.das", parse(from_os_str))]
    in_prog_src: PathBuf,
}

#[derive(StructOpt, Debug)]
pub struct SubcommandSuite {
    #[structopt(name = "suite/dir", parse(from_os_str))]
    suite_dir: Option<PathBuf>,

    #[structopt(short, long, name = "max-steps")]
    max_steps: Option<StepLimit>,
}

#[derive(Debug, Clone, Copy)]
pub struct StepLimit(Option<u64>);

impl Display for StepLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0.map(|lim| lim.to_string()).as_deref().unwrap_or("∞")
        )
    }
}

impl FromStr for StepLimit {
    type Err = <u64 as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("unlimited") || s.eq_ignore_ascii_case("infinity") || s.eq("∞")
        {
            Ok(StepLimit(None))
        } else {
            Ok(StepLimit(Some(u64::from_str(s)?)))
        }
    }
}

impl Default for StepLimit {
    fn default() -> Self {
        StepLimit(Some(50_000_000))
    }
}

impl StepLimit {
    pub fn into_option(self) -> Option<u64> {
        self.0
    }
}

pub fn root(cmd: CommandRoot) -> ! {
    match cmd {
        CommandRoot::Asm(scmd) => asm(scmd),
        CommandRoot::Vm(scmd) => vm(scmd),
        CommandRoot::Run(scmd) => run(scmd),
        CommandRoot::Suite(scmd) => suite(scmd),
    }
}

pub fn asm(cmd: SubcommandAsm) -> ! {
    exit_with(try_asm(cmd))
}

pub fn vm(cmd: SubcommandVm) -> ! {
    exit_with(try_vm(cmd))
}

pub fn run(cmd: SubcommandRun) -> ! {
    exit_with(try_run(cmd))
}

pub fn suite(cmd: SubcommandSuite) -> ! {
    exit_with(try_suite(cmd))
}

fn exit_with(result: Result<i32>) -> ! {
    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(2);
        }
    }
}

fn try_asm(cmd: SubcommandAsm) -> Result<i32> {
    let code = assemble_path(&cmd.in_src)?;

    let out_name = match cmd.out_bin {
        Some(outfile) => outfile,
        None => PathBuf::from(
            cmd.in_src
                .file_stem()
                .context("source path has no file name")?,
        )
        .with_extension(assets::DEFAULT_BINARY_EXT),
    };

    std::fs::write(&out_name, hw::code_to_bytes(&code))
        .with_context(|| format!("could not write binary '{}'", out_name.display()))?;

    Ok(0)
}

fn try_vm(cmd: SubcommandVm) -> Result<i32> {
    let bytes = std::fs::read(&cmd.in_prog_bin)
        .with_context(|| format!("could not read binary '{}'", cmd.in_prog_bin.display()))?;
    let code = hw::bytes_to_code(&bytes).ok_or_else(|| {
        anyhow!(
            "binary '{}' is not a whole number of code words",
            cmd.in_prog_bin.display()
        )
    })?;

    Ok(state_to_exit_code(execute(&code, &cmd.vm_opts)))
}

fn try_run(cmd: SubcommandRun) -> Result<i32> {
    let code = assemble_path(&cmd.in_prog_src)?;

    Ok(state_to_exit_code(execute(&code, &cmd.vm_opts)))
}

fn try_suite(cmd: SubcommandSuite) -> Result<i32> {
    let suite_dir = cmd.suite_dir.unwrap_or_else(assets::default_suite_dir);
    let success = suite::run_suite(&suite_dir, cmd.max_steps.unwrap_or_default().into_option())?;

    Ok(if success { 0 } else { 1 })
}

fn state_to_exit_code(state: State) -> i32 {
    match state {
        State::Halted => 0,
        State::Running => 1,
    }
}

fn execute(code: &[CodeWord], opts: &VmOpts) -> State {
    let mut vm = Emulator::new(LogLevel {
        dump_steps: opts.verbose,
    });
    vm.load(code);

    let state = run_to_halt(&mut vm, opts.max_steps.unwrap_or_default().into_option());
    if opts.verbose {
        println!("{}", vm);
    }

    state
}

/// Steps the machine until it halts or the limit is spent. The emulator has
/// no run loop of its own; this is the external driver.
pub fn run_to_halt(vm: &mut Emulator, max_steps: Option<u64>) -> State {
    let mut steps = 0u64;
    while vm.state() == State::Running {
        if let Some(max) = max_steps {
            if steps >= max {
                break;
            }
        }
        vm.step();
        steps += 1;
    }

    vm.state()
}
