use std::io::Write;

use analysis::solvers::SolveMonotone;
use clap::{ArgAction, Parser as CommandLineParser, ValueEnum};
use jir_lib::{
    analysis::{
        Analyses, cha, constprop, deadcode, inter_constprop, livevars, print_annotated,
        print_call_graph,
    },
    cfg::{MethodCfg, print_cfg},
    error::{AnalysisError, IrError, TaintConfigError},
    icfg::Icfg,
    ir::{self, MethodId, Program, Stmt, StmtId},
    pta::{self, ContextSelector, TaintConfig, print_points_to, print_taint_flows},
};
use log::info;
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum CLIAnalyses {
    Constprop,
    Livevar,
    Deadcode,
    Cha,
    Pta,
    Cspta,
    InterConstprop,
    Taint,
}

impl From<CLIAnalyses> for Analyses {
    fn from(value: CLIAnalyses) -> Self {
        match value {
            CLIAnalyses::Constprop => Analyses::ConstProp,
            CLIAnalyses::Livevar => Analyses::LiveVars,
            CLIAnalyses::Deadcode => Analyses::DeadCode,
            CLIAnalyses::Cha => Analyses::Cha,
            CLIAnalyses::Pta => Analyses::Pta,
            CLIAnalyses::Cspta => Analyses::CsPta,
            CLIAnalyses::InterConstprop => Analyses::InterConstProp,
            CLIAnalyses::Taint => Analyses::Taint,
        }
    }
}

#[derive(Debug, CommandLineParser, Default)]
#[command(
    name = "jir",
    version,
    about = "Run static analyses on serialized JIR programs."
)]
pub struct Opt {
    /// Dump the control flow graph of every method in graphviz format.
    #[arg(long)]
    pub dump_cfg: bool,

    /// Name of the analysis to execute
    #[arg(long, value_name = "ANALYSIS_NAME")]
    pub analysis: Option<CLIAnalyses>,

    /// Context sensitivity of the pointer analysis: ci, <k>-call, <k>-obj or <k>-type.
    #[arg(long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// JSON file describing the sources, sinks and transfers of the taint analysis.
    #[arg(long, value_name = "FILE")]
    pub taint_config: Option<String>,

    /// Give up on a dataflow analysis after visiting this many nodes, 0 means no limit.
    #[arg(long, default_value_t = 0)]
    pub node_limit: usize,

    /// Increase the verbosity of the logging, can be repeated.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// File containing the program in JSON.
    pub filename: String,
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load program: {0}")]
    Ir(#[from] IrError),

    #[error("invalid taint configuration: {0}")]
    TaintConfig(#[from] TaintConfigError),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("unknown context sensitivity `{0}`")]
    UnknownContext(String),

    #[error("the taint analysis needs a configuration, pass one with --taint-config")]
    MissingTaintConfig,
}

/// Read the program and the taint configuration named by `opts` and
/// process them.
pub fn run(opts: &Opt, out: &mut dyn Write) -> Result<(), DriverError> {
    let src = std::fs::read_to_string(&opts.filename)?;
    let taint_config = match &opts.taint_config {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None => None,
    };
    process_source(&src, taint_config.as_deref(), opts, out)
}

pub fn process_source(
    src: &str,
    taint_config: Option<&str>,
    opts: &Opt,
    out: &mut dyn Write,
) -> Result<(), DriverError> {
    let program = Program::from_json(src)?;
    info!(
        "Loaded {} classes and {} methods.",
        program.classes.len(),
        program.methods.len()
    );

    if opts.dump_cfg {
        for method in concrete_methods(&program) {
            writeln!(out, "{}", print_cfg(&program, &MethodCfg::new(&program, method)))?;
        }
    }

    let Some(analysis) = opts.analysis else {
        if !opts.dump_cfg {
            writeln!(out, "{}", ir::print(&program))?;
        }
        return Ok(());
    };

    let solver = SolveMonotone {
        node_limit: opts.node_limit,
    };
    let analysis = Analyses::from(analysis);
    info!("Running {analysis}.");
    let output = match analysis {
        Analyses::ConstProp => run_constprop(&program, &solver)?,
        Analyses::LiveVars => run_livevars(&program, &solver)?,
        Analyses::DeadCode => run_deadcode(&program, &solver)?,
        Analyses::Cha => print_call_graph(&program, &cha::build_call_graph(&program)?),
        Analyses::Pta | Analyses::CsPta => {
            let default = if analysis == Analyses::Pta { "ci" } else { "1-call" };
            let selector = selector(opts, default)?;
            let result = pta::analyze(&program, selector.as_ref())?;
            [
                print_points_to(&program, &result),
                print_call_graph(&program, result.call_graph()),
            ]
            .into_iter()
            .filter(|section| !section.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
        }
        Analyses::InterConstProp => {
            let selector = selector(opts, "ci")?;
            let result = pta::analyze(&program, selector.as_ref())?;
            run_inter_constprop(&program, &result, &solver)?
        }
        Analyses::Taint => {
            let config = taint_config.ok_or(DriverError::MissingTaintConfig)?;
            let rules = TaintConfig::from_json(config)?.resolve(&program)?;
            let selector = selector(opts, "ci")?;
            let result = pta::analyze_with_taint(&program, selector.as_ref(), &rules)?;
            print_taint_flows(&program, &result)
        }
    };
    if !output.is_empty() {
        writeln!(out, "{output}")?;
    }
    Ok(())
}

fn selector(opts: &Opt, default: &str) -> Result<Box<dyn ContextSelector>, DriverError> {
    let name = opts.context.as_deref().unwrap_or(default);
    pta::selector_from_name(name).ok_or_else(|| DriverError::UnknownContext(name.to_owned()))
}

fn concrete_methods(program: &Program) -> impl Iterator<Item = MethodId> + '_ {
    program
        .method_ids()
        .filter(|&m| !program.method(m).is_abstract)
}

fn stmt_id(program: &Program, stmt: &Stmt) -> StmtId {
    program.method(stmt.method).stmts[stmt.index]
}

fn run_constprop(program: &Program, solver: &SolveMonotone) -> Result<String, DriverError> {
    let mut printed = Vec::new();
    for method in concrete_methods(program) {
        let cfg = MethodCfg::new(program, method);
        let facts = constprop::analyze(program, &cfg, solver)?;
        printed.push(print_annotated(program, method, |stmt| {
            Some(constprop::print_fact(
                program,
                facts.out_fact(cfg.node(stmt.index)),
            ))
        }));
    }
    Ok(printed.join("\n"))
}

fn run_livevars(program: &Program, solver: &SolveMonotone) -> Result<String, DriverError> {
    let mut printed = Vec::new();
    for method in concrete_methods(program) {
        let cfg = MethodCfg::new(program, method);
        let facts = livevars::analyze(program, &cfg, solver)?;
        printed.push(print_annotated(program, method, |stmt| {
            Some(livevars::print_fact(
                program,
                method,
                facts.out_fact(cfg.node(stmt.index)),
            ))
        }));
    }
    Ok(printed.join("\n"))
}

fn run_deadcode(program: &Program, solver: &SolveMonotone) -> Result<String, DriverError> {
    let mut printed = Vec::new();
    for method in concrete_methods(program) {
        let cfg = MethodCfg::new(program, method);
        let constants = constprop::analyze(program, &cfg, solver)?;
        let live = livevars::analyze(program, &cfg, solver)?;
        let dead = deadcode::detect_dead_code(program, &cfg, &constants, &live);
        printed.push(print_annotated(program, method, |stmt| {
            dead.contains(&stmt_id(program, stmt))
                .then(|| "dead".to_owned())
        }));
    }
    Ok(printed.join("\n"))
}

fn run_inter_constprop(
    program: &Program,
    pta: &pta::PointerAnalysisResult,
    solver: &SolveMonotone,
) -> Result<String, DriverError> {
    let icfg = Icfg::new(program, pta.call_graph());
    let facts = inter_constprop::analyze(program, &icfg, Some(pta), solver)?;
    let printed: Vec<String> = icfg
        .methods()
        .map(|method| {
            print_annotated(program, method, |stmt| {
                let node = icfg.node_of(program, stmt_id(program, stmt))?;
                Some(constprop::print_fact(program, facts.out_fact(node)))
            })
        })
        .collect();
    Ok(printed.join("\n"))
}
