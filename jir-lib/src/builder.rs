use crate::error::IrError;
use crate::ir::*;

/// Incrementally build a [`Program`]. Methods are declared first so they
/// can refer to each other, their bodies are filled in later with a
/// [`MethodBuilder`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_class(&mut self, class: Class) -> ClassId {
        self.program.classes.push(class);
        ClassId::from_index(self.program.classes.len() - 1)
    }

    pub fn class(&mut self, name: &str, super_class: Option<ClassId>) -> ClassId {
        self.add_class(Class {
            name: name.to_owned(),
            super_class,
            interfaces: Vec::new(),
            is_interface: false,
            is_abstract: false,
            fields: Vec::new(),
            methods: Vec::new(),
        })
    }

    pub fn abstract_class(&mut self, name: &str, super_class: Option<ClassId>) -> ClassId {
        let class = self.class(name, super_class);
        self.program.classes[class.index()].is_abstract = true;
        class
    }

    pub fn interface(&mut self, name: &str, super_interfaces: &[ClassId]) -> ClassId {
        self.add_class(Class {
            name: name.to_owned(),
            super_class: None,
            interfaces: super_interfaces.to_vec(),
            is_interface: true,
            is_abstract: true,
            fields: Vec::new(),
            methods: Vec::new(),
        })
    }

    pub fn implements(&mut self, class: ClassId, iface: ClassId) -> &mut Self {
        self.program.classes[class.index()].interfaces.push(iface);
        self
    }

    /// The class of string literals, created on first use.
    pub fn string_class(&mut self) -> ClassId {
        string_class(&mut self.program)
    }

    fn add_field(&mut self, class: ClassId, name: &str, ty: Type, is_static: bool) -> FieldId {
        self.program.fields.push(Field {
            name: name.to_owned(),
            class,
            ty,
            is_static,
        });
        let id = FieldId::from_index(self.program.fields.len() - 1);
        self.program.classes[class.index()].fields.push(id);
        id
    }

    pub fn field(&mut self, class: ClassId, name: &str, ty: Type) -> FieldId {
        self.add_field(class, name, ty, false)
    }

    pub fn static_field(&mut self, class: ClassId, name: &str, ty: Type) -> FieldId {
        self.add_field(class, name, ty, true)
    }

    fn add_method(
        &mut self,
        class: ClassId,
        name: &str,
        params: &[Type],
        ret: Type,
        is_static: bool,
        is_abstract: bool,
    ) -> MethodId {
        let id = MethodId::from_index(self.program.methods.len());
        let mut method = Method {
            class,
            subsig: Subsignature {
                name: name.to_owned(),
                params: params.to_vec(),
                ret,
            },
            is_static,
            is_abstract,
            this: None,
            params: Vec::new(),
            vars: Vec::new(),
            stmts: Vec::new(),
        };
        if !is_static {
            let this = new_var(&mut self.program, id, "this", Type::Class(class));
            method.this = Some(this);
            method.vars.push(this);
        }
        for (i, ty) in params.iter().enumerate() {
            let param = new_var(&mut self.program, id, &format!("p{i}"), ty.clone());
            method.params.push(param);
            method.vars.push(param);
        }
        self.program.methods.push(method);
        self.program.classes[class.index()].methods.push(id);
        id
    }

    pub fn method(&mut self, class: ClassId, name: &str, params: &[Type], ret: Type) -> MethodId {
        self.add_method(class, name, params, ret, false, false)
    }

    pub fn static_method(
        &mut self,
        class: ClassId,
        name: &str,
        params: &[Type],
        ret: Type,
    ) -> MethodId {
        self.add_method(class, name, params, ret, true, false)
    }

    pub fn abstract_method(
        &mut self,
        class: ClassId,
        name: &str,
        params: &[Type],
        ret: Type,
    ) -> MethodId {
        self.add_method(class, name, params, ret, false, true)
    }

    pub fn set_entry(&mut self, method: MethodId) -> &mut Self {
        self.program.entry = Some(method);
        self
    }

    pub fn method_ref(&self, method: MethodId) -> MethodRef {
        let method = self.program.method(method);
        MethodRef {
            class: method.class,
            subsig: method.subsig.clone(),
        }
    }

    pub fn body(&mut self, method: MethodId) -> MethodBuilder<'_> {
        MethodBuilder {
            program: &mut self.program,
            method,
            labels: Vec::new(),
            fixups: Vec::new(),
            line: None,
        }
    }

    pub fn build(mut self) -> Result<Program, IrError> {
        self.program.reindex()?;
        Ok(self.program)
    }
}

fn new_var(program: &mut Program, method: MethodId, name: &str, ty: Type) -> VarId {
    program.vars.push(Var {
        name: name.to_owned(),
        method,
        ty,
    });
    VarId::from_index(program.vars.len() - 1)
}

fn string_class(program: &mut Program) -> ClassId {
    if let Some(idx) = program.classes.iter().position(|c| c.name == STRING_CLASS) {
        return ClassId::from_index(idx);
    }
    program.classes.push(Class {
        name: STRING_CLASS.to_owned(),
        super_class: None,
        interfaces: Vec::new(),
        is_interface: false,
        is_abstract: false,
        fields: Vec::new(),
        methods: Vec::new(),
    });
    ClassId::from_index(program.classes.len() - 1)
}

/// A branch target that is bound to a statement later.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Label(usize);

/// Appends statements to the body of a method. Call [`MethodBuilder::finish`]
/// to resolve the labels.
pub struct MethodBuilder<'a> {
    program: &'a mut Program,
    method: MethodId,
    labels: Vec<Option<usize>>,
    /// The labels of the branch targets of a statement in the order of
    /// [`branch_targets_mut`].
    fixups: Vec<(StmtId, Vec<Label>)>,
    line: Option<i32>,
}

fn branch_targets_mut(kind: &mut StmtKind) -> Vec<&mut usize> {
    match kind {
        StmtKind::If { target, .. } | StmtKind::Goto(target) => vec![target],
        StmtKind::Switch { cases, default, .. } => {
            let mut targets: Vec<&mut usize> = cases.iter_mut().map(|(_, t)| t).collect();
            targets.push(default);
            targets
        }
        _ => vec![],
    }
}

impl MethodBuilder<'_> {
    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn this(&self) -> Option<VarId> {
        self.program.method(self.method).this
    }

    pub fn param(&self, idx: usize) -> VarId {
        self.program.method(self.method).params[idx]
    }

    pub fn var(&mut self, name: &str, ty: Type) -> VarId {
        let var = new_var(self.program, self.method, name, ty);
        self.program.methods[self.method.index()].vars.push(var);
        var
    }

    /// Set the line number of the next statement. By default the line of a
    /// statement is its index plus one.
    pub fn line(&mut self, line: i32) -> &mut Self {
        self.line = Some(line);
        self
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind the label to the next statement.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        let index = self.next_index();
        self.labels[label.0] = Some(index);
        self
    }

    fn next_index(&self) -> usize {
        self.program.method(self.method).stmts.len()
    }

    pub fn push(&mut self, kind: StmtKind) -> StmtId {
        let index = self.next_index();
        let line = self.line.take().unwrap_or(index as i32 + 1);
        self.program.stmts.push(Stmt {
            method: self.method,
            index,
            line,
            kind,
        });
        let id = StmtId::from_index(self.program.stmts.len() - 1);
        self.program.methods[self.method.index()].stmts.push(id);
        id
    }

    fn push_branch(&mut self, kind: StmtKind, labels: Vec<Label>) -> StmtId {
        let id = self.push(kind);
        self.fixups.push((id, labels));
        id
    }

    pub fn assign(&mut self, lhs: LValue, rhs: Exp) -> StmtId {
        self.push(StmtKind::Assign { lhs, rhs })
    }

    pub fn int(&mut self, lhs: VarId, value: i32) -> StmtId {
        self.assign(LValue::Var(lhs), Exp::IntLiteral(value))
    }

    pub fn string(&mut self, lhs: VarId, value: &str) -> StmtId {
        string_class(self.program);
        self.assign(LValue::Var(lhs), Exp::StringLiteral(value.to_owned()))
    }

    pub fn null(&mut self, lhs: VarId) -> StmtId {
        self.assign(LValue::Var(lhs), Exp::Null)
    }

    pub fn copy(&mut self, lhs: VarId, rhs: VarId) -> StmtId {
        self.assign(LValue::Var(lhs), Exp::Var(rhs))
    }

    pub fn binary(&mut self, lhs: VarId, op: BinaryOp, a: VarId, b: VarId) -> StmtId {
        self.assign(
            LValue::Var(lhs),
            Exp::Binary(BinaryExp {
                op,
                lhs: a,
                rhs: b,
            }),
        )
    }

    pub fn new_obj(&mut self, lhs: VarId, class: ClassId) -> StmtId {
        self.assign(LValue::Var(lhs), Exp::New(Type::Class(class)))
    }

    pub fn new_array(&mut self, lhs: VarId, elem: Type) -> StmtId {
        self.assign(LValue::Var(lhs), Exp::New(Type::Array(Box::new(elem))))
    }

    pub fn cast(&mut self, lhs: VarId, ty: Type, var: VarId) -> StmtId {
        self.assign(LValue::Var(lhs), Exp::Cast { ty, var })
    }

    pub fn load_field(&mut self, lhs: VarId, base: VarId, field: FieldId) -> StmtId {
        self.assign(
            LValue::Var(lhs),
            Exp::Field {
                base: Some(base),
                field,
            },
        )
    }

    pub fn store_field(&mut self, base: VarId, field: FieldId, rhs: VarId) -> StmtId {
        self.assign(
            LValue::Field {
                base: Some(base),
                field,
            },
            Exp::Var(rhs),
        )
    }

    pub fn load_static(&mut self, lhs: VarId, field: FieldId) -> StmtId {
        self.assign(LValue::Var(lhs), Exp::Field { base: None, field })
    }

    pub fn store_static(&mut self, field: FieldId, rhs: VarId) -> StmtId {
        self.assign(LValue::Field { base: None, field }, Exp::Var(rhs))
    }

    pub fn load_array(&mut self, lhs: VarId, base: VarId, index: VarId) -> StmtId {
        self.assign(LValue::Var(lhs), Exp::Array { base, index })
    }

    pub fn store_array(&mut self, base: VarId, index: VarId, rhs: VarId) -> StmtId {
        self.assign(LValue::Array { base, index }, Exp::Var(rhs))
    }

    pub fn if_(&mut self, op: BinaryOp, lhs: VarId, rhs: VarId, target: Label) -> StmtId {
        let kind = StmtKind::If {
            cond: BinaryExp { op, lhs, rhs },
            target: usize::MAX,
        };
        self.push_branch(kind, vec![target])
    }

    pub fn goto(&mut self, target: Label) -> StmtId {
        self.push_branch(StmtKind::Goto(usize::MAX), vec![target])
    }

    pub fn switch(&mut self, var: VarId, cases: &[(i32, Label)], default: Label) -> StmtId {
        let kind = StmtKind::Switch {
            var,
            cases: cases.iter().map(|&(value, _)| (value, usize::MAX)).collect(),
            default: usize::MAX,
        };
        let mut labels: Vec<Label> = cases.iter().map(|&(_, label)| label).collect();
        labels.push(default);
        self.push_branch(kind, labels)
    }

    pub fn invoke(
        &mut self,
        kind: CallKind,
        result: Option<LValue>,
        base: Option<VarId>,
        method_ref: MethodRef,
        args: &[VarId],
    ) -> StmtId {
        self.push(StmtKind::Invoke(Invoke {
            kind,
            method_ref,
            base,
            args: args.to_vec(),
            result,
        }))
    }

    fn method_ref(&self, method: MethodId) -> MethodRef {
        let method = self.program.method(method);
        MethodRef {
            class: method.class,
            subsig: method.subsig.clone(),
        }
    }

    pub fn call_static(&mut self, result: Option<VarId>, callee: MethodId, args: &[VarId]) -> StmtId {
        let method_ref = self.method_ref(callee);
        self.invoke(CallKind::Static, result.map(LValue::Var), None, method_ref, args)
    }

    /// A virtual call, or an interface call when the callee is declared in
    /// an interface.
    pub fn call_virtual(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        callee: MethodId,
        args: &[VarId],
    ) -> StmtId {
        let method_ref = self.method_ref(callee);
        let kind = if self.program.class(method_ref.class).is_interface {
            CallKind::Interface
        } else {
            CallKind::Virtual
        };
        self.invoke(kind, result.map(LValue::Var), Some(base), method_ref, args)
    }

    pub fn call_special(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        callee: MethodId,
        args: &[VarId],
    ) -> StmtId {
        let method_ref = self.method_ref(callee);
        self.invoke(CallKind::Special, result.map(LValue::Var), Some(base), method_ref, args)
    }

    pub fn ret(&mut self, var: Option<VarId>) -> StmtId {
        self.push(StmtKind::Return(var))
    }

    pub fn nop(&mut self) -> StmtId {
        self.push(StmtKind::Nop)
    }

    /// Resolve the branch targets.
    pub fn finish(self) -> Result<(), IrError> {
        let method_name = || self.program.method(self.method).name().to_owned();
        let mut resolved = Vec::with_capacity(self.fixups.len());
        for (stmt, labels) in &self.fixups {
            let targets = labels
                .iter()
                .map(|label| self.labels[label.0].ok_or_else(|| IrError::UnboundLabel(method_name())))
                .collect::<Result<Vec<_>, _>>()?;
            resolved.push((*stmt, targets));
        }
        for (stmt, targets) in resolved {
            let kind = &mut self.program.stmts[stmt.index()].kind;
            for (slot, target) in branch_targets_mut(kind).into_iter().zip(targets) {
                *slot = target;
            }
        }
        Ok(())
    }
}
