use super::group::Group;
use crate::core::context::CompileContext;
use crate::core::io::dict::{LegacyShape, LoadContext, decode, with_class};
use crate::core::io::loader::{Loader, load_as};
use crate::core::io::traits::DictNode;
use crate::core::utils::identifiers::Identifier;
use crate::core::utils::text::{command_lines, fmt_number};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Drives the run phase of an integrator section.
#[derive(Debug, Clone, PartialEq)]
pub enum Integrator {
    RunZero(RunZeroIntegrator),
    Nve(NveIntegrator),
    Minimize(MinimizeIntegrator),
    MultipassMinimize(MultipassMinimizeIntegrator),
    Manual(ManualIntegrator),
}

pub static INTEGRATOR_LOADER: Loader<Integrator> = Loader::new(
    "Integrator",
    &[
        (RunZeroIntegrator::CLASS, load_as::<RunZeroIntegrator, Integrator>),
        (NveIntegrator::CLASS, load_as::<NveIntegrator, Integrator>),
        (MinimizeIntegrator::CLASS, load_as::<MinimizeIntegrator, Integrator>),
        (MultipassMinimizeIntegrator::CLASS, load_as::<MultipassMinimizeIntegrator, Integrator>),
        (ManualIntegrator::CLASS, load_as::<ManualIntegrator, Integrator>),
    ],
);

impl Integrator {
    pub fn id(&self) -> &Identifier {
        match self {
            Integrator::RunZero(i) => &i.name,
            Integrator::Nve(i) => &i.name,
            Integrator::Minimize(i) => &i.name,
            Integrator::MultipassMinimize(i) => &i.name,
            Integrator::Manual(i) => &i.name,
        }
    }

    pub fn do_commands(&self, _ctx: &CompileContext) -> Result<String> {
        Ok(match self {
            Integrator::Nve(i) => format!("fix {} {} nve\n", i.name, i.group_name),
            Integrator::Manual(i) => command_lines(&i.cmd_do),
            Integrator::RunZero(_) | Integrator::Minimize(_) | Integrator::MultipassMinimize(_) => {
                String::new()
            }
        })
    }

    pub fn run_commands(&self) -> String {
        match self {
            Integrator::RunZero(_) => "run 0\n".to_string(),
            Integrator::Nve(i) => format!("run {}\n", i.nb_steps),
            Integrator::Minimize(i) => i.run_commands(),
            Integrator::MultipassMinimize(_) => MULTIPASS_SCRIPT.to_string(),
            Integrator::Manual(i) => command_lines(&i.cmd_run),
        }
    }

    pub fn undo_commands(&self) -> String {
        match self {
            Integrator::Nve(i) => format!("unfix {}\n", i.name),
            Integrator::Manual(i) => command_lines(&i.cmd_undo),
            Integrator::RunZero(_) | Integrator::Minimize(_) | Integrator::MultipassMinimize(_) => {
                String::new()
            }
        }
    }

    pub fn to_dict(&self) -> Value {
        match self {
            Integrator::RunZero(i) => i.to_dict(),
            Integrator::Nve(i) => i.to_dict(),
            Integrator::Minimize(i) => i.to_dict(),
            Integrator::MultipassMinimize(i) => i.to_dict(),
            Integrator::Manual(i) => i.to_dict(),
        }
    }

    pub fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        INTEGRATOR_LOADER.load(dict, cx)
    }
}

impl From<RunZeroIntegrator> for Integrator {
    fn from(i: RunZeroIntegrator) -> Self {
        Integrator::RunZero(i)
    }
}

impl From<NveIntegrator> for Integrator {
    fn from(i: NveIntegrator) -> Self {
        Integrator::Nve(i)
    }
}

impl From<MinimizeIntegrator> for Integrator {
    fn from(i: MinimizeIntegrator) -> Self {
        Integrator::Minimize(i)
    }
}

impl From<MultipassMinimizeIntegrator> for Integrator {
    fn from(i: MultipassMinimizeIntegrator) -> Self {
        Integrator::MultipassMinimize(i)
    }
}

impl From<ManualIntegrator> for Integrator {
    fn from(i: ManualIntegrator) -> Self {
        Integrator::Manual(i)
    }
}

#[derive(Deserialize)]
struct RawNamed {
    integrator_name: Identifier,
}

/// A zero-step run that evaluates energies and forces once.
#[derive(Debug, Clone, PartialEq)]
pub struct RunZeroIntegrator {
    name: Identifier,
}

impl RunZeroIntegrator {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
        })
    }
}

impl DictNode for RunZeroIntegrator {
    const CLASS: &'static str = "RunZeroIntegrator";

    fn to_dict(&self) -> Value {
        with_class(Self::CLASS, json!({ "integrator_name": self.name }))
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawNamed = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.integrator_name,
        })
    }
}

/// Constant-energy velocity-Verlet stepping of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct NveIntegrator {
    name: Identifier,
    group_name: Identifier,
    nb_steps: u64,
}

#[derive(Deserialize)]
struct RawNve {
    integrator_name: Identifier,
    group_name: Identifier,
    #[serde(default = "default_nb_steps")]
    nb_steps: u64,
}

fn default_nb_steps() -> u64 {
    5000
}

impl NveIntegrator {
    pub fn new(name: &str, group: &Group, nb_steps: u64) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            group_name: Identifier::new(group.handle())?,
            nb_steps,
        })
    }
}

impl DictNode for NveIntegrator {
    const CLASS: &'static str = "NVEIntegrator";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "integrator_name": self.name,
                "group_name": self.group_name,
                "nb_steps": self.nb_steps,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawNve = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.integrator_name,
            group_name: raw.group_name,
            nb_steps: raw.nb_steps,
        })
    }
}

/// Minimization algorithms accepted by `min_style`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinimizeStyle {
    #[serde(rename = "cg")]
    Cg, // Polak-Ribiere conjugate gradient
    #[serde(rename = "sd")]
    Sd, // Steepest descent
    #[serde(rename = "hftn")]
    Hftn, // Hessian-free truncated Newton
    #[serde(rename = "fire")]
    Fire, // Damped dynamics
    #[serde(rename = "spin/lbfgs")]
    SpinLbfgs, // Spin configurations only
}

pub(crate) const MINIMIZE_STYLE_LEGACY_CODES: &[&str] = &["cg", "sd", "spin/lbfgs"];

impl MinimizeStyle {
    pub fn keyword(&self) -> &'static str {
        match self {
            MinimizeStyle::Cg => "cg",
            MinimizeStyle::Sd => "sd",
            MinimizeStyle::Hftn => "hftn",
            MinimizeStyle::Fire => "fire",
            MinimizeStyle::SpinLbfgs => "spin/lbfgs",
        }
    }
}

impl fmt::Display for MinimizeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Stopping criteria and algorithm of an energy minimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizeSettings {
    pub style: MinimizeStyle,
    pub etol: f64,
    pub ftol: f64,
    pub maxiter: u64,
    pub maxeval: u64,
}

impl Default for MinimizeSettings {
    fn default() -> Self {
        Self {
            style: MinimizeStyle::Cg,
            etol: 0.01,
            ftol: 0.01,
            maxiter: 100,
            maxeval: 10000,
        }
    }
}

impl MinimizeSettings {
    pub(crate) fn validate(&self, node: &str) -> Result<()> {
        if self.etol < 0.0 || self.ftol < 0.0 {
            return Err(Error::configuration(
                node,
                format!(
                    "minimization tolerances must not be negative (etol {}, ftol {})",
                    self.etol, self.ftol
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn commands(&self) -> String {
        format!(
            "min_style {}\nminimize {} {} {} {}\n",
            self.style,
            fmt_number(self.etol),
            fmt_number(self.ftol),
            self.maxiter,
            self.maxeval
        )
    }
}

/// A single energy minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeIntegrator {
    name: Identifier,
    settings: MinimizeSettings,
}

#[derive(Deserialize)]
struct RawMinimize {
    integrator_name: Identifier,
    #[serde(flatten)]
    settings: MinimizeSettings,
}

const MINIMIZE_LEGACY: LegacyShape = LegacyShape {
    renames: &[],
    codes: &[("style", MINIMIZE_STYLE_LEGACY_CODES)],
};

impl MinimizeIntegrator {
    /// Fails if either tolerance is negative.
    pub fn new(name: &str, settings: MinimizeSettings) -> Result<Self> {
        let name = Identifier::new(name)?;
        settings.validate(name.as_str())?;
        Ok(Self { name, settings })
    }

    pub fn settings(&self) -> &MinimizeSettings {
        &self.settings
    }

    fn run_commands(&self) -> String {
        self.settings.commands()
    }
}

impl DictNode for MinimizeIntegrator {
    const CLASS: &'static str = "MinimizeIntegrator";

    fn to_dict(&self) -> Value {
        let mut dict = with_class(Self::CLASS, json!({ "integrator_name": self.name }));
        if let (Value::Object(map), Value::Object(settings)) = (&mut dict, json!(self.settings)) {
            map.extend(settings);
        }
        dict
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawMinimize = decode(Self::CLASS, dict, cx, &MINIMIZE_LEGACY)?;
        Self::new(raw.integrator_name.as_str(), raw.settings)
    }
}

const MULTIPASS_SCRIPT: &str = concat!(
    "min_style cg\n",
    "minimize 1.0e-10 1.0e-10 10000 100000\n",
    "min_style hftn\n",
    "minimize 1.0e-10 1.0e-10 10000 100000\n",
    "min_style sd\n",
    "minimize 1.0e-10 1.0e-10 10000 100000\n",
    "variable i loop 100\n",
    "label loop1\n",
    "variable ene_min equal pe\n",
    "variable ene_min_i equal ${ene_min}\n",
    "min_style cg\n",
    "minimize 1.0e-10 1.0e-10 10000 100000\n",
    "min_style hftn\n",
    "minimize 1.0e-10 1.0e-10 10000 100000\n",
    "min_style sd\n",
    "minimize 1.0e-10 1.0e-10 10000 100000\n",
    "variable ene_min_f equal pe\n",
    "variable ene_diff equal ${ene_min_i}-${ene_min_f}\n",
    "print \"Delta_E = ${ene_diff}\"\n",
    "if \"${ene_diff}<1e-6\" then \"jump SELF break1\"\n",
    "print \"Loop_id = $i\"\n",
    "next i\n",
    "jump SELF loop1\n",
    "label break1\n",
    "variable i delete\n",
);

/// Repeats cg, hftn and sd minimization passes until the energy change of a
/// full round drops below 1e-6, for at most 100 rounds.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipassMinimizeIntegrator {
    name: Identifier,
}

impl MultipassMinimizeIntegrator {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
        })
    }
}

impl DictNode for MultipassMinimizeIntegrator {
    const CLASS: &'static str = "MultipassMinimizeIntegrator";

    fn to_dict(&self) -> Value {
        with_class(Self::CLASS, json!({ "integrator_name": self.name }))
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawNamed = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.integrator_name,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManualIntegrator {
    name: Identifier,
    cmd_do: String,
    cmd_undo: String,
    cmd_run: String,
}

#[derive(Deserialize)]
struct RawManualIntegrator {
    integrator_name: Identifier,
    #[serde(default)]
    cmd_do: String,
    #[serde(default)]
    cmd_undo: String,
    #[serde(default)]
    cmd_run: String,
}

impl ManualIntegrator {
    pub fn new(name: &str, cmd_do: &str, cmd_undo: &str, cmd_run: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            cmd_do: cmd_do.to_string(),
            cmd_undo: cmd_undo.to_string(),
            cmd_run: cmd_run.to_string(),
        })
    }
}

impl DictNode for ManualIntegrator {
    const CLASS: &'static str = "ManualIntegrator";

    fn to_dict(&self) -> Value {
        with_class(
            Self::CLASS,
            json!({
                "integrator_name": self.name,
                "cmd_do": self.cmd_do,
                "cmd_undo": self.cmd_undo,
                "cmd_run": self.cmd_run,
            }),
        )
    }

    fn from_dict(dict: &Value, cx: &LoadContext) -> Result<Self> {
        let raw: RawManualIntegrator = decode(Self::CLASS, dict, cx, &LegacyShape::UNCHANGED)?;
        Ok(Self {
            name: raw.integrator_name,
            cmd_do: raw.cmd_do,
            cmd_undo: raw.cmd_undo,
            cmd_run: raw.cmd_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::dict::LEGACY_VERSION;
    use crate::core::models::group::AllGroup;
    use crate::core::units::{UnitRegistry, UnitSystem};

    const MULTIPASS_PASS: &str = "min_style cg\n\
minimize 1.0e-10 1.0e-10 10000 100000\n\
min_style hftn\n\
minimize 1.0e-10 1.0e-10 10000 100000\n\
min_style sd\n\
minimize 1.0e-10 1.0e-10 10000 100000\n";

    fn ctx() -> CompileContext {
        CompileContext::new(UnitSystem::Real)
    }

    #[test]
    fn nve_declares_runs_and_unfixes() {
        let nve: Integrator = NveIntegrator::new("NVE", &AllGroup::new().into(), 1000)
            .unwrap()
            .into();
        assert_eq!(nve.do_commands(&ctx()).unwrap(), "fix NVE all nve\n");
        assert_eq!(nve.run_commands(), "run 1000\n");
        assert_eq!(nve.undo_commands(), "unfix NVE\n");
    }

    #[test]
    fn run_zero_only_runs() {
        let probe: Integrator = RunZeroIntegrator::new("probe").unwrap().into();
        assert_eq!(probe.do_commands(&ctx()).unwrap(), "");
        assert_eq!(probe.run_commands(), "run 0\n");
        assert_eq!(probe.undo_commands(), "");
    }

    #[test]
    fn minimize_renders_style_and_criteria() {
        let settings = MinimizeSettings {
            style: MinimizeStyle::Hftn,
            etol: 1e-10,
            ftol: 0.01,
            maxiter: 500,
            maxeval: 5000,
        };
        let min: Integrator = MinimizeIntegrator::new("relax", settings).unwrap().into();
        assert_eq!(
            min.run_commands(),
            "min_style hftn\nminimize 1e-10 0.01 500 5000\n"
        );
    }

    #[test]
    fn minimize_rejects_negative_tolerances() {
        let settings = MinimizeSettings {
            etol: -1.0,
            ..MinimizeSettings::default()
        };
        assert!(matches!(
            MinimizeIntegrator::new("relax", settings),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn multipass_loops_and_releases_its_variable() {
        let multi: Integrator = MultipassMinimizeIntegrator::new("multi").unwrap().into();
        let run = multi.run_commands();
        assert!(run.starts_with(MULTIPASS_PASS));
        assert!(run.contains("variable i loop 100\n"));
        assert!(run.contains("if \"${ene_diff}<1e-6\" then \"jump SELF break1\"\n"));
        assert!(run.ends_with("label break1\nvariable i delete\n"));
        assert_eq!(run.matches("min_style").count(), 6);
    }

    #[test]
    fn manual_integrator_normalizes_each_phase() {
        let manual: Integrator = ManualIntegrator::new("m", "fix m all nvt temp 300 300 100", "unfix m", "run 10")
            .unwrap()
            .into();
        assert_eq!(manual.do_commands(&ctx()).unwrap(), "fix m all nvt temp 300 300 100\n");
        assert_eq!(manual.run_commands(), "run 10\n");
        assert_eq!(manual.undo_commands(), "unfix m\n");
    }

    #[test]
    fn integrator_dicts_round_trip_through_loader() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry);
        let integrators: Vec<Integrator> = vec![
            RunZeroIntegrator::new("z").unwrap().into(),
            NveIntegrator::new("n", &AllGroup::new().into(), 10).unwrap().into(),
            MinimizeIntegrator::new("m", MinimizeSettings::default()).unwrap().into(),
            MultipassMinimizeIntegrator::new("mm").unwrap().into(),
            ManualIntegrator::new("x", "a", "b", "c").unwrap().into(),
        ];
        for integrator in integrators {
            let dict = integrator.to_dict();
            let back = Integrator::from_dict(&dict, &cx).unwrap();
            assert_eq!(back.to_dict(), dict);
            assert_eq!(back, integrator);
        }
    }

    #[test]
    fn minimize_loads_legacy_style_codes() {
        let registry = UnitRegistry::new();
        let cx = LoadContext::new(&registry).with_version(LEGACY_VERSION);
        let legacy = json!({
            "class": "MinimizeIntegrator",
            "integrator_name": "relax",
            "style": 2,
            "etol": 0.0,
            "ftol": 1e-8,
            "maxiter": 10,
            "maxeval": 100,
        });
        let min = Integrator::from_dict(&legacy, &cx).unwrap();
        assert_eq!(min.run_commands(), "min_style spin/lbfgs\nminimize 0.0 1e-8 10 100\n");
    }
}
