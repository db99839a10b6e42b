//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "wlgen",
    about = "Run a workload with CPU affinity, resource group placement and trace capture",
    after_help = "\
EXAMPLES:
    wlgen -- ./bench -n 10                       Run in the foreground
    wlgen --cpus 0,2 --ftrace -- ./bench         Pin to CPUs 0 and 2, capture an ftrace
    wlgen --cgroup g1 --background -- ./bench    Dispatch inside resource group g1
    wlgen --config workload.json                 Run a workload described in JSON"
)]
pub struct Args {
    /// Command to run (overrides the config file)
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// JSON workload configuration
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Workload name, used to label trace artifacts
    #[arg(long)]
    pub name: Option<String>,

    /// Workload kind (profile, custom)
    #[arg(long)]
    pub kind: Option<String>,

    /// CPUs to pin the workload to, e.g. "0,2" or "0-3,8"
    #[arg(long, value_name = "LIST")]
    pub cpus: Option<String>,

    /// Resource group (cgroup) to run the workload in
    #[arg(long)]
    pub cgroup: Option<String>,

    /// Dispatch the workload without waiting for it
    #[arg(long)]
    pub background: bool,

    /// Run the workload with root privileges
    #[arg(long)]
    pub as_root: bool,

    /// Folder receiving trace artifacts
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Seconds to wait after arming the trace, before executing
    #[arg(long, value_name = "SECS")]
    pub start_pause: Option<f64>,

    /// Seconds to wait after executing, before stopping the trace
    #[arg(long, value_name = "SECS")]
    pub end_pause: Option<f64>,

    /// Capture a kernel trace with trace-cmd
    #[arg(long, conflicts_with = "systrace")]
    pub ftrace: bool,

    /// Capture a systrace into FILE
    #[arg(long, value_name = "FILE")]
    pub systrace: Option<PathBuf>,

    /// Comma-separated ftrace events (default: scheduler and power events)
    #[arg(long, value_delimiter = ',')]
    pub events: Vec<String>,

    /// Ftrace buffer size per CPU in KB
    #[arg(long, value_name = "KB")]
    pub buffer_kb: Option<u32>,

    /// Directory holding taskset and shutils
    #[arg(long, value_name = "DIR", default_value = "/usr/bin")]
    pub exec_dir: PathBuf,

    /// Default run directory on the target
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Executor binary name, for instance management
    #[arg(long)]
    pub executor: Option<String>,

    /// Kill every running instance of the executor and exit
    #[arg(long, requires = "executor")]
    pub kill_all: bool,

    /// Comma-separated task names to resolve to PIDs after the run
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub tasks: Vec<String>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
