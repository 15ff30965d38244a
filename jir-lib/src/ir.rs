use core::fmt::Display;
use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::IrError;

pub const STRING_CLASS: &str = "java.lang.String";

macro_rules! define_id {
    ($name:ident, $kind:literal) => {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const KIND: &'static str = $kind;

            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn from_index(idx: usize) -> Self {
                Self(idx as u32)
            }
        }
    };
}

define_id!(ClassId, "class");
define_id!(FieldId, "field");
define_id!(MethodId, "method");
define_id!(VarId, "variable");
define_id!(StmtId, "statement");

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Void,
    Null,
    Class(ClassId),
    Array(Box<Type>),
}

impl Type {
    /// Whether values of this type are tracked by the constant propagation.
    pub fn can_hold_int(&self) -> bool {
        matches!(
            self,
            Type::Boolean | Type::Byte | Type::Short | Type::Char | Type::Int
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Or,
    And,
    Xor,
    Shl,
    Shr,
    Ushr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Or => "|",
            BinaryOp::And => "&",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
    Dynamic,
}

impl Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CallKind::Static => "invokestatic",
            CallKind::Special => "invokespecial",
            CallKind::Virtual => "invokevirtual",
            CallKind::Interface => "invokeinterface",
            CallKind::Dynamic => "invokedynamic",
        };
        write!(f, "{name}")
    }
}

/// The part of a method signature that is used for dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subsignature {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: ClassId,
    pub subsig: Subsignature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinaryExp {
    pub op: BinaryOp,
    pub lhs: VarId,
    pub rhs: VarId,
}

/// Right hand side of an assignment. Operands are always variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exp {
    IntLiteral(i32),
    StringLiteral(String),
    Null,
    Var(VarId),
    Binary(BinaryExp),
    /// Static field access when there is no base.
    Field {
        base: Option<VarId>,
        field: FieldId,
    },
    Array {
        base: VarId,
        index: VarId,
    },
    ArrayLength(VarId),
    InstanceOf {
        var: VarId,
        ty: Type,
    },
    /// Allocation of a class instance or an array.
    New(Type),
    Cast {
        ty: Type,
        var: VarId,
    },
}

impl Exp {
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            Exp::IntLiteral(_) | Exp::StringLiteral(_) | Exp::Null | Exp::New(_) => vec![],
            Exp::Var(v) | Exp::ArrayLength(v) => vec![*v],
            Exp::InstanceOf { var, .. } | Exp::Cast { var, .. } => vec![*var],
            Exp::Binary(b) => vec![b.lhs, b.rhs],
            Exp::Field { base, .. } => base.iter().copied().collect(),
            Exp::Array { base, index } => vec![*base, *index],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LValue {
    Var(VarId),
    /// Static field when there is no base.
    Field {
        base: Option<VarId>,
        field: FieldId,
    },
    Array {
        base: VarId,
        index: VarId,
    },
}

impl LValue {
    pub fn as_var(&self) -> Option<VarId> {
        match self {
            LValue::Var(v) => Some(*v),
            _ => None,
        }
    }

    /// The variables read when storing into this location.
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            LValue::Var(_) => vec![],
            LValue::Field { base, .. } => base.iter().copied().collect(),
            LValue::Array { base, index } => vec![*base, *index],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoke {
    pub kind: CallKind,
    pub method_ref: MethodRef,
    /// The receiver, absent for static calls.
    pub base: Option<VarId>,
    pub args: Vec<VarId>,
    pub result: Option<LValue>,
}

impl Invoke {
    pub fn result_var(&self) -> Option<VarId> {
        self.result.as_ref().and_then(LValue::as_var)
    }
}

/// Branch targets are statement indices within the enclosing method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StmtKind {
    Assign {
        lhs: LValue,
        rhs: Exp,
    },
    If {
        cond: BinaryExp,
        target: usize,
    },
    Goto(usize),
    Switch {
        var: VarId,
        cases: Vec<(i32, usize)>,
        default: usize,
    },
    Invoke(Invoke),
    Return(Option<VarId>),
    Nop,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stmt {
    pub method: MethodId,
    /// Position within the enclosing method.
    pub index: usize,
    /// Negative for synthetic statements.
    pub line: i32,
    pub kind: StmtKind,
}

impl Stmt {
    /// The variable defined by the statement, if any.
    pub fn def(&self) -> Option<VarId> {
        match &self.kind {
            StmtKind::Assign { lhs, .. } => lhs.as_var(),
            StmtKind::Invoke(invoke) => invoke.result_var(),
            _ => None,
        }
    }

    pub fn uses(&self) -> Vec<VarId> {
        match &self.kind {
            StmtKind::Assign { lhs, rhs } => {
                let mut uses = rhs.uses();
                uses.extend(lhs.uses());
                uses
            }
            StmtKind::If { cond, .. } => vec![cond.lhs, cond.rhs],
            StmtKind::Switch { var, .. } => vec![*var],
            StmtKind::Invoke(invoke) => {
                let mut uses: Vec<VarId> = invoke.base.iter().copied().collect();
                uses.extend(&invoke.args);
                if let Some(result) = &invoke.result {
                    uses.extend(result.uses());
                }
                uses
            }
            StmtKind::Return(v) => v.iter().copied().collect(),
            StmtKind::Goto(_) | StmtKind::Nop => vec![],
        }
    }

    pub fn as_invoke(&self) -> Option<&Invoke> {
        match &self.kind {
            StmtKind::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.line < 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Var {
    pub name: String,
    pub method: MethodId,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub class: ClassId,
    pub ty: Type,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub class: ClassId,
    pub subsig: Subsignature,
    pub is_static: bool,
    pub is_abstract: bool,
    pub this: Option<VarId>,
    pub params: Vec<VarId>,
    /// All local variables including `this` and the parameters.
    pub vars: Vec<VarId>,
    pub stmts: Vec<StmtId>,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.subsig.name
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    pub super_class: Option<ClassId>,
    /// Implemented interfaces for classes, super interfaces for interfaces.
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
}

/// The statements that use a variable as the base of a heap access or a
/// call, needed by the pointer analyses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VarRelations {
    pub load_fields: Vec<StmtId>,
    pub store_fields: Vec<StmtId>,
    pub load_arrays: Vec<StmtId>,
    pub store_arrays: Vec<StmtId>,
    pub invokes: Vec<StmtId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ProgramIndex {
    class_by_name: HashMap<String, ClassId>,
    subclasses: Vec<Vec<ClassId>>,
    subinterfaces: Vec<Vec<ClassId>>,
    implementors: Vec<Vec<ClassId>>,
    var_relations: Vec<VarRelations>,
    local_index: Vec<usize>,
    ret_vars: Vec<Vec<VarId>>,
    call_sites: Vec<Vec<StmtId>>,
}

/// A whole program in an arena representation. Entities refer to each other
/// through ids, the derived indexes are recomputed after building or loading.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub classes: Vec<Class>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub vars: Vec<Var>,
    pub stmts: Vec<Stmt>,
    pub entry: Option<MethodId>,
    #[serde(skip)]
    index: ProgramIndex,
}

impl Program {
    pub fn from_json(source: &str) -> Result<Self, IrError> {
        let mut program: Program = serde_json::from_str(source)?;
        program.reindex()?;
        Ok(program)
    }

    pub fn to_json(&self) -> Result<String, IrError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> {
        (0..self.methods.len()).map(MethodId::from_index)
    }

    pub fn entry_method(&self) -> Result<MethodId, IrError> {
        self.entry.ok_or(IrError::NoEntryMethod)
    }

    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.index.class_by_name.get(name).copied()
    }

    pub fn string_class(&self) -> Option<ClassId> {
        self.find_class(STRING_CLASS)
    }

    pub fn direct_subclasses(&self, class: ClassId) -> &[ClassId] {
        &self.index.subclasses[class.index()]
    }

    pub fn direct_subinterfaces(&self, iface: ClassId) -> &[ClassId] {
        &self.index.subinterfaces[iface.index()]
    }

    pub fn direct_implementors(&self, iface: ClassId) -> &[ClassId] {
        &self.index.implementors[iface.index()]
    }

    pub fn relations(&self, var: VarId) -> &VarRelations {
        &self.index.var_relations[var.index()]
    }

    /// Dense index of the variable within its method.
    pub fn local_index(&self, var: VarId) -> usize {
        self.index.local_index[var.index()]
    }

    /// The variables returned by the method.
    pub fn ret_vars(&self, method: MethodId) -> &[VarId] {
        &self.index.ret_vars[method.index()]
    }

    pub fn call_sites(&self, method: MethodId) -> &[StmtId] {
        &self.index.call_sites[method.index()]
    }

    pub fn method_stmts(&self, method: MethodId) -> impl Iterator<Item = &Stmt> {
        self.method(method).stmts.iter().map(|&s| self.stmt(s))
    }

    /// Validate the references of the program and recompute the derived
    /// indexes.
    pub fn reindex(&mut self) -> Result<(), IrError> {
        self.validate()?;

        let class_num = self.classes.len();
        let mut index = ProgramIndex {
            subclasses: vec![Vec::new(); class_num],
            subinterfaces: vec![Vec::new(); class_num],
            implementors: vec![Vec::new(); class_num],
            var_relations: vec![VarRelations::default(); self.vars.len()],
            local_index: vec![0; self.vars.len()],
            ret_vars: vec![Vec::new(); self.methods.len()],
            call_sites: vec![Vec::new(); self.methods.len()],
            ..Default::default()
        };

        for (idx, class) in self.classes.iter().enumerate() {
            let id = ClassId::from_index(idx);
            index.class_by_name.insert(class.name.clone(), id);
            if let Some(sup) = class.super_class {
                index.subclasses[sup.index()].push(id);
            }
            for &iface in &class.interfaces {
                if class.is_interface {
                    index.subinterfaces[iface.index()].push(id);
                } else {
                    index.implementors[iface.index()].push(id);
                }
            }
        }

        for (idx, method) in self.methods.iter().enumerate() {
            for (local, &var) in method.vars.iter().enumerate() {
                index.local_index[var.index()] = local;
            }
            for &stmt_id in &method.stmts {
                let stmt = self.stmt(stmt_id);
                let relations = &mut index.var_relations;
                match &stmt.kind {
                    StmtKind::Assign { lhs, rhs } => {
                        if let LValue::Field {
                            base: Some(base), ..
                        } = lhs
                        {
                            relations[base.index()].store_fields.push(stmt_id);
                        }
                        if let LValue::Array { base, .. } = lhs {
                            relations[base.index()].store_arrays.push(stmt_id);
                        }
                        if let Exp::Field {
                            base: Some(base), ..
                        } = rhs
                        {
                            relations[base.index()].load_fields.push(stmt_id);
                        }
                        if let Exp::Array { base, .. } = rhs {
                            relations[base.index()].load_arrays.push(stmt_id);
                        }
                    }
                    StmtKind::Invoke(invoke) => {
                        index.call_sites[idx].push(stmt_id);
                        if let Some(base) = invoke.base {
                            relations[base.index()].invokes.push(stmt_id);
                        }
                    }
                    StmtKind::Return(Some(v)) => {
                        if !index.ret_vars[idx].contains(v) {
                            index.ret_vars[idx].push(*v);
                        }
                    }
                    _ => {}
                }
            }
        }

        self.index = index;
        Ok(())
    }

    fn validate(&self) -> Result<(), IrError> {
        fn check<T>(kind: &'static str, id: usize, arena: &[T]) -> Result<(), IrError> {
            if id < arena.len() {
                Ok(())
            } else {
                Err(IrError::InvalidId { kind, id })
            }
        }

        let check_type = |ty: &Type| -> Result<(), IrError> {
            let mut ty = ty;
            while let Type::Array(elem) = ty {
                ty = elem;
            }
            match ty {
                Type::Class(c) => check(ClassId::KIND, c.index(), &self.classes),
                _ => Ok(()),
            }
        };

        for class in &self.classes {
            if let Some(sup) = class.super_class {
                check(ClassId::KIND, sup.index(), &self.classes)?;
            }
            for iface in &class.interfaces {
                check(ClassId::KIND, iface.index(), &self.classes)?;
            }
            for f in &class.fields {
                check(FieldId::KIND, f.index(), &self.fields)?;
            }
            for m in &class.methods {
                check(MethodId::KIND, m.index(), &self.methods)?;
            }
        }
        for (idx, class) in self.classes.iter().enumerate() {
            let mut seen = HashSet::from([idx]);
            let mut current = class.super_class;
            while let Some(sup) = current {
                if !seen.insert(sup.index()) {
                    return Err(IrError::CyclicHierarchy(class.name.clone()));
                }
                current = self.classes[sup.index()].super_class;
            }
        }
        for field in &self.fields {
            check(ClassId::KIND, field.class.index(), &self.classes)?;
            check_type(&field.ty)?;
        }
        for var in &self.vars {
            check(MethodId::KIND, var.method.index(), &self.methods)?;
            check_type(&var.ty)?;
        }
        if let Some(entry) = self.entry {
            check(MethodId::KIND, entry.index(), &self.methods)?;
        }

        let has_string_literal = self.stmts.iter().any(|s| {
            matches!(
                &s.kind,
                StmtKind::Assign {
                    rhs: Exp::StringLiteral(_),
                    ..
                }
            )
        });
        if has_string_literal && !self.classes.iter().any(|c| c.name == STRING_CLASS) {
            return Err(IrError::UnknownClass(STRING_CLASS.to_owned()));
        }

        for (idx, method) in self.methods.iter().enumerate() {
            let id = MethodId::from_index(idx);
            check(ClassId::KIND, method.class.index(), &self.classes)?;
            check_type(&method.subsig.ret)?;
            for ty in &method.subsig.params {
                check_type(ty)?;
            }
            let method_name = || method.subsig.name.clone();
            let check_var = |var: VarId| -> Result<(), IrError> {
                check(VarId::KIND, var.index(), &self.vars)?;
                if self.var(var).method != id {
                    return Err(IrError::ForeignVariable {
                        method: method_name(),
                        var: self.var(var).name.clone(),
                    });
                }
                Ok(())
            };

            for &var in &method.vars {
                check_var(var)?;
            }
            if method.params.len() != method.subsig.params.len() {
                return Err(IrError::SignatureMismatch(method_name()));
            }
            for (&param, ty) in method.params.iter().zip(&method.subsig.params) {
                check_var(param)?;
                if self.var(param).ty != *ty {
                    return Err(IrError::SignatureMismatch(method_name()));
                }
            }
            match method.this {
                Some(this) => check_var(this)?,
                None if !method.is_static => return Err(IrError::MissingThis(method_name())),
                None => {}
            }

            let stmt_num = method.stmts.len();
            let check_target = |target: usize| -> Result<(), IrError> {
                if target < stmt_num {
                    Ok(())
                } else {
                    Err(IrError::BranchTarget {
                        method: method_name(),
                        target,
                    })
                }
            };
            for (pos, &stmt_id) in method.stmts.iter().enumerate() {
                check(StmtId::KIND, stmt_id.index(), &self.stmts)?;
                let stmt = self.stmt(stmt_id);
                if stmt.method != id || stmt.index != pos {
                    return Err(IrError::InvalidId {
                        kind: StmtId::KIND,
                        id: stmt_id.index(),
                    });
                }
                for var in stmt.uses().into_iter().chain(stmt.def()) {
                    check_var(var)?;
                }
                match &stmt.kind {
                    StmtKind::If { target, .. } | StmtKind::Goto(target) => check_target(*target)?,
                    StmtKind::Switch { cases, default, .. } => {
                        for (_, target) in cases {
                            check_target(*target)?;
                        }
                        check_target(*default)?;
                    }
                    StmtKind::Invoke(invoke) => {
                        check(ClassId::KIND, invoke.method_ref.class.index(), &self.classes)?;
                        check_type(&invoke.method_ref.subsig.ret)?;
                        for ty in &invoke.method_ref.subsig.params {
                            check_type(ty)?;
                        }
                    }
                    StmtKind::Assign { lhs, rhs } => {
                        if let LValue::Field { field, .. } = lhs {
                            check(FieldId::KIND, field.index(), &self.fields)?;
                        }
                        match rhs {
                            Exp::Field { field, .. } => {
                                check(FieldId::KIND, field.index(), &self.fields)?
                            }
                            Exp::New(ty) | Exp::Cast { ty, .. } | Exp::InstanceOf { ty, .. } => {
                                check_type(ty)?
                            }
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

////////////////
// Printing.  //
////////////////

pub fn print_type(program: &Program, ty: &Type) -> String {
    match ty {
        Type::Boolean => "boolean".to_owned(),
        Type::Byte => "byte".to_owned(),
        Type::Short => "short".to_owned(),
        Type::Char => "char".to_owned(),
        Type::Int => "int".to_owned(),
        Type::Long => "long".to_owned(),
        Type::Float => "float".to_owned(),
        Type::Double => "double".to_owned(),
        Type::Void => "void".to_owned(),
        Type::Null => "null".to_owned(),
        Type::Class(c) => program.class(*c).name.clone(),
        Type::Array(elem) => format!("{}[]", print_type(program, elem)),
    }
}

pub fn print_subsignature(program: &Program, subsig: &Subsignature) -> String {
    format!(
        "{} {}({})",
        print_type(program, &subsig.ret),
        subsig.name,
        subsig.params.iter().map(|t| print_type(program, t)).join(",")
    )
}

/// The signature of a method in the `<Class: RetType name(ParamType,...)>`
/// format.
pub fn print_method_ref(program: &Program, method_ref: &MethodRef) -> String {
    format!(
        "<{}: {}>",
        program.class(method_ref.class).name,
        print_subsignature(program, &method_ref.subsig)
    )
}

pub fn print_method_signature(program: &Program, method: MethodId) -> String {
    let method = program.method(method);
    format!(
        "<{}: {}>",
        program.class(method.class).name,
        print_subsignature(program, &method.subsig)
    )
}

/// A statement as `<Class: RetType name(...)>[index@Lline]`.
pub fn print_stmt_location(program: &Program, stmt: StmtId) -> String {
    let stmt = program.stmt(stmt);
    format!(
        "{}[{}@L{}]",
        print_method_signature(program, stmt.method),
        stmt.index,
        stmt.line
    )
}

fn print_field_access(program: &Program, base: Option<VarId>, field: FieldId) -> String {
    let field = program.field(field);
    match base {
        Some(base) => format!("{}.{}", program.var(base).name, field.name),
        None => format!("{}.{}", program.class(field.class).name, field.name),
    }
}

pub fn print_lvalue(program: &Program, lvalue: &LValue) -> String {
    let name = |v: &VarId| program.var(*v).name.as_str();
    match lvalue {
        LValue::Var(v) => name(v).to_owned(),
        LValue::Field { base, field } => print_field_access(program, *base, *field),
        LValue::Array { base, index } => format!("{}[{}]", name(base), name(index)),
    }
}

pub fn print_exp(program: &Program, exp: &Exp) -> String {
    let name = |v: &VarId| program.var(*v).name.as_str();
    match exp {
        Exp::IntLiteral(i) => i.to_string(),
        Exp::StringLiteral(s) => format!("{s:?}"),
        Exp::Null => "null".to_owned(),
        Exp::Var(v) => name(v).to_owned(),
        Exp::Binary(b) => format!("{} {} {}", name(&b.lhs), b.op, name(&b.rhs)),
        Exp::Field { base, field } => print_field_access(program, *base, *field),
        Exp::Array { base, index } => format!("{}[{}]", name(base), name(index)),
        Exp::ArrayLength(v) => format!("{}.length", name(v)),
        Exp::InstanceOf { var, ty } => {
            format!("{} instanceof {}", name(var), print_type(program, ty))
        }
        Exp::New(Type::Array(elem)) => format!("newarray {}", print_type(program, elem)),
        Exp::New(ty) => format!("new {}", print_type(program, ty)),
        Exp::Cast { ty, var } => format!("({}) {}", print_type(program, ty), name(var)),
    }
}

pub fn print_stmt(program: &Program, stmt: &Stmt) -> String {
    let name = |v: &VarId| program.var(*v).name.as_str();
    match &stmt.kind {
        StmtKind::Assign { lhs, rhs } => {
            format!("{} = {};", print_lvalue(program, lhs), print_exp(program, rhs))
        }
        StmtKind::If { cond, target } => format!(
            "if ({} {} {}) goto {};",
            name(&cond.lhs),
            cond.op,
            name(&cond.rhs),
            target
        ),
        StmtKind::Goto(target) => format!("goto {target};"),
        StmtKind::Switch {
            var,
            cases,
            default,
        } => format!(
            "switch ({}) {{{}default: goto {};}};",
            name(var),
            cases
                .iter()
                .map(|(value, target)| format!("case {value}: goto {target}; "))
                .join(""),
            default
        ),
        StmtKind::Invoke(invoke) => {
            let result = invoke
                .result
                .as_ref()
                .map(|r| format!("{} = ", print_lvalue(program, r)))
                .unwrap_or_default();
            let base = invoke
                .base
                .map(|b| format!("{}.", name(&b)))
                .unwrap_or_default();
            format!(
                "{result}{} {base}{}({});",
                invoke.kind,
                print_method_ref(program, &invoke.method_ref),
                invoke.args.iter().map(name).join(", ")
            )
        }
        StmtKind::Return(Some(v)) => format!("return {};", name(v)),
        StmtKind::Return(None) => "return;".to_owned(),
        StmtKind::Nop => "nop;".to_owned(),
    }
}

pub fn print_method(program: &Program, method: MethodId) -> String {
    let mut result = format!("{} {{\n", print_method_signature(program, method));
    for stmt in program.method_stmts(method) {
        result.push_str(&format!("  {}: {}\n", stmt.index, print_stmt(program, stmt)));
    }
    result.push('}');
    result
}

pub fn print(program: &Program) -> String {
    program
        .method_ids()
        .filter(|&m| !program.method(m).is_abstract)
        .map(|m| print_method(program, m))
        .join("\n")
}
