use super::command;
use crate::assembler;
use crate::assets;
use crate::report::Report;
use crate::spec::hw::CodeWord;
use crate::vm::{Emulator, LogLevel, State};
use ansi_term::Color::{Green, Red};
use anyhow::{Context, Result};
use derive_more::Constructor;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Constructor)]
struct UnitSrc {
    name: OsString,
    prog_src: PathBuf,
}

enum UnitOutcome {
    AssemblyError(Report),
    Finished { state: State, steps: u64 },
}

impl UnitSrc {
    fn assemble(&self) -> Result<(Vec<CodeWord>, Report)> {
        let src = std::fs::read_to_string(&self.prog_src)
            .with_context(|| format!("could not read source '{}'", self.prog_src.display()))?;

        let mut report = Report::new();
        let code = assembler::assemble(&src, &mut report);
        Ok((code, report))
    }

    fn execute(&self, max_steps: Option<u64>) -> Result<UnitOutcome> {
        let (code, report) = self.assemble()?;
        if !report.is_empty() {
            return Ok(UnitOutcome::AssemblyError(report));
        }

        let mut vm = Emulator::new(LogLevel::default());
        vm.load(&code);
        let state = command::run_to_halt(&mut vm, max_steps);

        Ok(UnitOutcome::Finished {
            state,
            steps: vm.total_steps(),
        })
    }
}

/// Runs every source unit in a directory; a unit passes when it assembles
/// cleanly and the machine halts within the step limit.
pub fn run_suite(suite_dir: &Path, max_steps: Option<u64>) -> Result<bool> {
    let mut units = find_units(suite_dir)?;
    units.sort_unstable_by(|unit1, unit2| unit1.name.cmp(&unit2.name));

    run_units(&suite_dir.display().to_string(), max_steps, &units)
}

fn find_units(suite_dir: &Path) -> Result<Vec<UnitSrc>> {
    let entries = suite_dir
        .read_dir()
        .with_context(|| format!("could not read suite directory '{}'", suite_dir.display()))?;

    let mut units = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type()?.is_file()
            && path
                .extension()
                .map_or(false, |ext| ext == assets::DEFAULT_SOURCE_EXT)
        {
            let name = path.file_stem().map(OsString::from).unwrap_or_default();
            units.push(UnitSrc::new(name, path));
        }
    }

    Ok(units)
}

fn run_units(name: &str, max_steps: Option<u64>, units: &[UnitSrc]) -> Result<bool> {
    let name_pad = units.iter().map(|unit| unit.name.len()).max().unwrap_or(0);

    println!("Running suite: '{}' ({} units)", name, units.len());
    println!("{:-<line_len$}", "", line_len = name_pad + 45);

    let mut passes = 0;
    for (num, unit) in units.iter().enumerate() {
        if run_unit(unit, num + 1, name_pad, max_steps)? {
            passes += 1;
        }
    }
    let success = passes == units.len();

    println!("{:-<line_len$}", "", line_len = name_pad + 45);
    println!(
        "Suite Result: {}, {}/{} passes",
        if success {
            Green.bold().paint("SUCCESS")
        } else {
            Red.bold().paint("FAILED")
        },
        passes,
        units.len()
    );

    Ok(success)
}

fn run_unit(src: &UnitSrc, num: usize, name_pad: usize, max_steps: Option<u64>) -> Result<bool> {
    let (success, msg) = match src.execute(max_steps)? {
        UnitOutcome::AssemblyError(report) => (
            false,
            format!(
                "{}:\n\t{}",
                Red.bold().paint("FAIL: ASSEMBLY ERROR"),
                report.to_string().replace('\n', "\n\t")
            ),
        ),
        UnitOutcome::Finished {
            state: State::Running,
            steps,
        } => (
            false,
            format!("{} after {} steps", Red.bold().paint("FAIL: STEP LIMIT"), steps),
        ),
        UnitOutcome::Finished {
            state: State::Halted,
            steps,
        } => (true, format!("{} {:7} steps", Green.bold().paint("PASS"), steps)),
    };

    println!(
        "Unit {:2}: {} {}{}",
        num,
        src.name.to_string_lossy(),
        " ".repeat(name_pad - src.name.len()),
        msg
    );

    Ok(success)
}
