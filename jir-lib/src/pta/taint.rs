use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::TaintConfigError,
    ir::{Invoke, MethodId, Program, StmtId, Type, VarId, print_method_signature},
};

/// A taint position in the configuration: an argument index, `"base"` or
/// `"result"`. The numeric encodings -1 (base) and -2 (result) are accepted
/// as well.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionSpec {
    Index(i64),
    Name(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub method: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkSpec {
    pub method: String,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSpec {
    pub method: String,
    pub from: PositionSpec,
    pub to: PositionSpec,
    #[serde(rename = "type")]
    pub ty: String,
}

/// The taint configuration as written by the user. Methods are named by
/// signatures in the `<Class: RetType name(ParamType,...)>` format.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintConfig {
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub sinks: Vec<SinkSpec>,
    #[serde(default)]
    pub transfers: Vec<TransferSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaintPosition {
    Base,
    Result,
    Arg(usize),
}

impl TaintPosition {
    fn parse(spec: &PositionSpec) -> Result<Self, TaintConfigError> {
        match spec {
            PositionSpec::Index(-1) => Ok(TaintPosition::Base),
            PositionSpec::Index(-2) => Ok(TaintPosition::Result),
            PositionSpec::Index(i) if *i >= 0 => Ok(TaintPosition::Arg(*i as usize)),
            PositionSpec::Name(name) if name.eq_ignore_ascii_case("base") => Ok(TaintPosition::Base),
            PositionSpec::Name(name) if name.eq_ignore_ascii_case("result") => {
                Ok(TaintPosition::Result)
            }
            PositionSpec::Index(i) => Err(TaintConfigError::InvalidPosition(i.to_string())),
            PositionSpec::Name(name) => Err(TaintConfigError::InvalidPosition(name.clone())),
        }
    }

    /// The variable at this position of a call.
    pub fn var(self, invoke: &Invoke) -> Option<VarId> {
        match self {
            TaintPosition::Base => invoke.base,
            TaintPosition::Result => invoke.result_var(),
            TaintPosition::Arg(i) => invoke.args.get(i).copied(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaintTransfer {
    pub from: TaintPosition,
    pub to: TaintPosition,
    pub ty: Type,
}

/// A taint configuration resolved against a program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaintRules {
    sources: HashMap<MethodId, Type>,
    sinks: HashMap<MethodId, Vec<usize>>,
    transfers: HashMap<MethodId, Vec<TaintTransfer>>,
}

impl TaintConfig {
    pub fn from_json(source: &str) -> Result<Self, TaintConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Resolve the methods and types named in the configuration. Fails on
    /// the first entry that does not fit the program.
    pub fn resolve(&self, program: &Program) -> Result<TaintRules, TaintConfigError> {
        let mut rules = TaintRules::default();
        for source in &self.sources {
            let method = program.find_method(&source.method)?;
            check_position(program, method, TaintPosition::Result)?;
            rules.sources.insert(method, program.parse_type(&source.ty)?);
        }
        for sink in &self.sinks {
            let method = program.find_method(&sink.method)?;
            check_position(program, method, TaintPosition::Arg(sink.index))?;
            let indices = rules.sinks.entry(method).or_default();
            if !indices.contains(&sink.index) {
                indices.push(sink.index);
            }
        }
        for transfer in &self.transfers {
            let method = program.find_method(&transfer.method)?;
            let from = TaintPosition::parse(&transfer.from)?;
            let to = TaintPosition::parse(&transfer.to)?;
            check_position(program, method, from)?;
            check_position(program, method, to)?;
            rules.transfers.entry(method).or_default().push(TaintTransfer {
                from,
                to,
                ty: program.parse_type(&transfer.ty)?,
            });
        }
        Ok(rules)
    }
}

fn check_position(
    program: &Program,
    method: MethodId,
    position: TaintPosition,
) -> Result<(), TaintConfigError> {
    let name = || print_method_signature(program, method);
    let data = program.method(method);
    match position {
        TaintPosition::Base if data.is_static => Err(TaintConfigError::MissingPosition {
            method: name(),
            position: "base",
        }),
        TaintPosition::Result if data.subsig.ret == Type::Void => {
            Err(TaintConfigError::MissingPosition {
                method: name(),
                position: "result",
            })
        }
        TaintPosition::Arg(index) if index >= data.params.len() => {
            Err(TaintConfigError::IndexOutOfRange {
                method: name(),
                index,
            })
        }
        _ => Ok(()),
    }
}

impl TaintRules {
    pub fn source_type(&self, method: MethodId) -> Option<&Type> {
        self.sources.get(&method)
    }

    pub fn sink_indices(&self, method: MethodId) -> &[usize] {
        self.sinks.get(&method).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn transfers(&self, method: MethodId) -> &[TaintTransfer] {
        self.transfers.get(&method).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.sinks.is_empty() && self.transfers.is_empty()
    }
}

/// Tainted data created by the call `source` reaches the argument `index`
/// of the sink call `sink`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaintFlow {
    pub source: StmtId,
    pub sink: StmtId,
    pub index: usize,
}
