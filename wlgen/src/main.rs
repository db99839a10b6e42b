//! # wlgen - Main Entry Point
//!
//! Runs one workload on the local host:
//! - **Foreground** (default): execute, then print the command output and
//!   the pulled trace artifact
//! - **Background** (`--background`): dispatch and return; an armed trace is
//!   stopped after the workload duration, when one is configured
//! - **Kill** (`--kill-all --executor NAME`): kill running executor instances

use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use std::thread;

use wlgen::callbacks::{CallbackArgs, Step};
use wlgen::cli::{build_config, prepare_run_dir, working_directory, Args};
use wlgen::controller::{ExecutionController, RunOutcome};
use wlgen::domain::{ConfigError, WorkloadError};
use wlgen::target::LocalTarget;
use wlgen::tasks::ProcessTable;
use wlgen::workload::WorkloadSpec;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<WorkloadError>().is_some_and(WorkloadError::is_configuration)
        || err.is::<ConfigError>()
    {
        return EXIT_USAGE;
    }
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("permission denied") || msg.contains("password is required") {
        EXIT_NOPERM
    } else if msg.contains("missing required argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;
    let config = build_config(&args)?;

    if config.workload.command.is_none() && !args.kill_all {
        bail!(
            "Missing required argument: COMMAND or --config\n\n\
             Usage:\n  \
             wlgen -- ./bench             Run a command\n  \
             wlgen --config wl.json       Run a configured workload\n\n\
             Run 'wlgen --help' for more options"
        );
    }

    let target = LocalTarget::new(&args.exec_dir, working_directory(&args, &config));
    let mut controller = ExecutionController::new(target);
    prepare_run_dir(controller.configure(config.workload)?)?;

    if args.kill_all {
        let killed = controller.kill_all()?;
        if !quiet {
            println!("killed: {}", killed.len());
        }
        return Ok(());
    }

    let options = config.run.to_run_options()?;
    let out_dir = options.out_dir.clone();

    controller.set_callback(Step::PostRun, |cb: &CallbackArgs<'_>| {
        info!("Workload results collected in {}", cb.destdir.display());
    });

    match controller.run(options)? {
        RunOutcome::Completed(run) => {
            if !quiet {
                print!("{}", run.output);
            }
            if let Some(trace) = run.trace_file {
                println!("trace: {}", trace.display());
            }
        }
        RunOutcome::Detached(mut run) => {
            if !quiet {
                println!("dispatched: {}", run.command());
            }
            if run.is_tracing() {
                match controller.spec().and_then(WorkloadSpec::duration) {
                    Some(duration) => {
                        info!("Tracing for {:.1} seconds", duration.as_secs_f64());
                        thread::sleep(duration);
                        if let Some(trace) = run.stop_trace(controller.target(), &out_dir)? {
                            println!("trace: {}", trace.display());
                        }
                    }
                    None => {
                        eprintln!("warning: trace left running (no workload duration configured)");
                    }
                }
            }
        }
    }

    if !args.tasks.is_empty() {
        let snapshot = ProcessTable::from_proc()?;
        let names: Vec<&str> = args.tasks.iter().map(String::as_str).collect();
        for (name, pids) in controller.resolve_tasks(Some(&snapshot), Some(&names))? {
            let pids: Vec<String> = pids.iter().map(|pid| pid.0.to_string()).collect();
            println!("{name}: {}", pids.join(" "));
        }
    }

    Ok(())
}
