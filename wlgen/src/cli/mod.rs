//! Command-line interface
//!
//! Flags override the values of the `--config` file, which in turn override
//! the built-in defaults.

pub mod args;

pub use args::Args;

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::target::parse_cpu_list;
use crate::workload::{SystraceSettings, WorkloadConfig, WorkloadSpec};

/// Merge the config file named by `args` (if any) with the CLI overrides.
///
/// # Errors
/// Fails if the config file cannot be loaded or `--cpus` is malformed
pub fn build_config(args: &Args) -> Result<WorkloadConfig> {
    let mut config = match &args.config {
        Some(path) => WorkloadConfig::from_file(path)?,
        None => WorkloadConfig::default(),
    };

    let workload = &mut config.workload;
    if !args.command.is_empty() {
        workload.command = Some(args.command.join(" "));
    }
    if let Some(name) = &args.name {
        workload.name.clone_from(name);
    }
    if let Some(kind) = &args.kind {
        workload.kind.clone_from(kind);
    }
    if let Some(cpus) = &args.cpus {
        workload.cpus = Some(parse_cpu_list(cpus)?.into_iter().map(|cpu| cpu.0).collect());
    }
    if args.cgroup.is_some() {
        workload.cgroup.clone_from(&args.cgroup);
    }
    if args.executor.is_some() {
        workload.executor.clone_from(&args.executor);
    }

    let run = &mut config.run;
    run.background |= args.background;
    run.as_root |= args.as_root;
    if let Some(out_dir) = &args.out_dir {
        run.out_dir.clone_from(out_dir);
    }
    if args.start_pause.is_some() {
        run.start_pause_s = args.start_pause;
    }
    if args.end_pause.is_some() {
        run.end_pause_s = args.end_pause;
    }
    if args.ftrace {
        run.ftrace = true;
        run.systrace = None;
    }
    if let Some(output) = &args.systrace {
        run.ftrace = false;
        let settings = run.systrace.take().unwrap_or_default();
        run.systrace = Some(SystraceSettings { output: output.clone(), ..settings });
    }
    if !args.events.is_empty() {
        run.events.clone_from(&args.events);
    }
    if let Some(kb) = args.buffer_kb {
        run.buffer_kb = kb;
    }

    Ok(config)
}

/// Folder the workload runs from: its configured run folder, else `--workdir`
pub fn working_directory(args: &Args, config: &WorkloadConfig) -> PathBuf {
    config.workload.run_dir.clone().unwrap_or_else(|| args.workdir.clone())
}

/// Create the run folder of `spec` if it is missing
///
/// # Errors
/// Fails if the folder cannot be created
pub fn prepare_run_dir(spec: &WorkloadSpec) -> Result<()> {
    let run_dir = spec.run_dir();
    fs::create_dir_all(run_dir)
        .with_context(|| format!("Failed to create run folder {}", run_dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use crate::workload::KindRegistry;
    use std::io::Write;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("wlgen").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_command_and_flags() {
        let args = parse(&["--cpus", "0,2", "--cgroup", "g1", "--ftrace", "--", "echo", "-n", "hi"]);
        let config = build_config(&args).unwrap();

        assert_eq!(config.workload.command.as_deref(), Some("echo -n hi"));
        assert_eq!(config.workload.cpus, Some(vec![0, 2]));
        assert_eq!(config.workload.cgroup.as_deref(), Some("g1"));
        assert!(config.run.ftrace);
        assert!(config.run.systrace.is_none());
    }

    #[test]
    fn test_cpu_ranges() {
        let config = build_config(&parse(&["--cpus", "0-2,8", "true"])).unwrap();
        assert_eq!(config.workload.cpus, Some(vec![0, 1, 2, 8]));
    }

    #[test]
    fn test_bad_cpu_list() {
        assert!(build_config(&parse(&["--cpus", "x", "true"])).is_err());
    }

    #[test]
    fn test_ftrace_conflicts_with_systrace() {
        let result = Args::try_parse_from(["wlgen", "--ftrace", "--systrace", "t.html", "true"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_kill_all_requires_executor() {
        assert!(Args::try_parse_from(["wlgen", "--kill-all"]).is_err());
        assert!(Args::try_parse_from(["wlgen", "--kill-all", "--executor", "rt-app"]).is_ok());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "workload": {{ "name": "bench", "command": "./bench", "cpus": [1] }},
                "run": {{ "out_dir": "from-file", "ftrace": true, "end_pause_s": 1.5 }}
            }}"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let args = parse(&["--config", path, "--out-dir", "from-cli", "--systrace", "t.html"]);
        let config = build_config(&args).unwrap();

        assert_eq!(config.workload.name, "bench");
        assert_eq!(config.workload.command.as_deref(), Some("./bench"));
        assert_eq!(config.workload.cpus, Some(vec![1]));
        assert_eq!(config.run.out_dir, PathBuf::from("from-cli"));
        assert_eq!(config.run.end_pause_s, Some(1.5));
        assert!(!config.run.ftrace);
        assert_eq!(config.run.systrace.unwrap().output, PathBuf::from("t.html"));
    }

    #[test]
    fn test_run_folder_overrides_workdir() {
        let args = parse(&["--workdir", "/srv/wl", "true"]);
        let mut config = build_config(&args).unwrap();
        assert_eq!(working_directory(&args, &config), PathBuf::from("/srv/wl"));

        config.workload.run_dir = Some(PathBuf::from("/data/run"));
        assert_eq!(working_directory(&args, &config), PathBuf::from("/data/run"));
    }

    #[test]
    fn test_prepare_creates_missing_run_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = tmp.path().join("runs").join("bench");
        let mut config = build_config(&parse(&["true"])).unwrap();
        config.workload.run_dir = Some(run_dir.clone());

        let spec =
            WorkloadSpec::configure(config.workload, KindRegistry::builtin(), tmp.path()).unwrap();
        prepare_run_dir(&spec).unwrap();
        assert!(run_dir.is_dir());
    }
}
