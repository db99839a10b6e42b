//! # wlgen - Workload Execution and Trace Capture
//!
//! wlgen runs a single workload command on a target device, optionally pinned
//! to a CPU subset and placed in a resource group, with kernel (ftrace) or
//! system (systrace) trace capture bracketing the execution.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              WorkloadConfig (JSON file + CLI flags)             │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ configure()
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     ExecutionController                         │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Command    │──▶│    Trace     │──▶│   Callback   │         │
//! │  │  Composer    │   │ Coordinator  │   │   Registry   │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │   taskset mask        arm / disarm       postrun hook           │
//! │   cgroup wrapper      ftrace|systrace                           │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐                            │
//! │  │     Task     │   │  Instances   │                            │
//! │  │   Resolver   │   │ (ps / kill)  │                            │
//! │  └──────────────┘   └──────────────┘                            │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ execute / kick_off / pull
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Target (LocalTarget, MockTarget)                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`compose`]: affinity prefix, resource group wrapper, final command line
//! - [`capture`]: trace mechanisms and the coordinator that brackets a run
//! - [`callbacks`]: per-step user hooks (only `postrun` today)
//! - [`controller`]: the run state machine and its outcomes
//! - [`tasks`]: task name to PID resolution from process snapshots
//! - [`instances`]: listing and killing running executor instances
//! - [`workload`]: workload descriptions, kinds and config files
//! - [`target`]: the device abstraction, a local implementation and test doubles
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: core types (`CpuId`, `CpuMask`, `Pid`) and errors
//!
//! ## Run Lifecycle
//!
//! 1. Compose the command (affinity innermost, resource group outermost)
//! 2. Arm the trace, if one was requested
//! 3. Pause (`start_pause`)
//! 4. Execute, or dispatch in the background and return
//! 5. Pause (`end_pause`)
//! 6. Disarm the trace and pull the artifact into `out_dir`
//! 7. Invoke the `postrun` callback with `out_dir`
//!
//! ## Typical Usage
//!
//! ```bash
//! # Run pinned to CPUs 0 and 2, capturing an ftrace
//! wlgen --cpus 0,2 --ftrace --out-dir results -- ./bench --iterations 10
//!
//! # Run from a config file
//! wlgen --config workload.json
//! ```

pub mod callbacks;
pub mod capture;
pub mod cli;
pub mod compose;
pub mod controller;
pub mod domain;
pub mod instances;
pub mod target;
pub mod tasks;
pub mod workload;
