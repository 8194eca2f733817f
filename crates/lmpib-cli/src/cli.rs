use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "lmpib - Compile declarative simulation workflows into LAMMPS input scripts.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to a configuration file in TOML format
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a workflow document into a new job folder.
    Compile(CompileArgs),
    /// Print the compiled sections of a workflow document to stdout.
    Render(RenderArgs),
    /// List every registered node class, grouped by family.
    Classes,
}

/// Arguments for the `compile` subcommand.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Path to the workflow document (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub workflow: PathBuf,

    /// Directory to create the job folder in. Defaults to the system temporary directory.
    #[arg(short = 'p', long, value_name = "DIR")]
    pub job_prefix: Option<PathBuf>,

    /// Extra unit definitions in TOML format (`[units] name = "expression"`).
    #[arg(short, long, value_name = "PATH")]
    pub units: Option<PathBuf>,

    /// Omit the comment banners around sections.
    #[arg(long)]
    pub no_annotate: bool,
}

/// Arguments for the `render` subcommand.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Path to the workflow document (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub workflow: PathBuf,

    /// Unit convention to render quantities in.
    #[arg(long, value_enum, value_name = "STYLE")]
    pub unit_system: Option<UnitSystemArg>,

    /// Element symbol of an atom type. Can be used multiple times. Example: --element 1=C
    #[arg(short, long = "element", value_name = "INDEX=SYMBOL")]
    pub elements: Vec<String>,

    /// Omit the comment banners around sections.
    #[arg(long)]
    pub no_annotate: bool,

    /// Extra unit definitions in TOML format (`[units] name = "expression"`).
    #[arg(short, long, value_name = "PATH")]
    pub units: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystemArg {
    Real,
    Metal,
}

impl From<UnitSystemArg> for lmpib::core::units::UnitSystem {
    fn from(arg: UnitSystemArg) -> Self {
        match arg {
            UnitSystemArg::Real => Self::Real,
            UnitSystemArg::Metal => Self::Metal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_accepts_repeated_elements() {
        let cli = Cli::parse_from([
            "lmpib", "render", "-w", "flow.json", "--element", "1=C", "--element", "2=H",
            "--unit-system", "metal",
        ]);
        let Commands::Render(args) = cli.command else {
            panic!("expected the render command");
        };
        assert_eq!(args.elements, ["1=C", "2=H"]);
        assert_eq!(args.unit_system, Some(UnitSystemArg::Metal));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["lmpib", "-q", "-v", "classes"]).is_err());
    }
}
