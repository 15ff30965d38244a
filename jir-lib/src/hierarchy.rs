use std::collections::{HashSet, VecDeque};

use crate::error::IrError;
use crate::ir::{ClassId, MethodId, MethodRef, Program, Subsignature, Type};

/// Class hierarchy queries over a program.
impl Program {
    /// The method with the given subsignature declared directly in `class`.
    pub fn declared_method(&self, class: ClassId, subsig: &Subsignature) -> Option<MethodId> {
        self.class(class)
            .methods
            .iter()
            .copied()
            .find(|&m| self.method(m).subsig == *subsig)
    }

    /// Find the method invoked on a receiver whose dynamic type is `class`:
    /// the first non-abstract method with a matching subsignature walking up
    /// the superclass chain.
    pub fn dispatch(&self, class: ClassId, subsig: &Subsignature) -> Option<MethodId> {
        let mut current = Some(class);
        while let Some(class) = current {
            if let Some(m) = self.declared_method(class, subsig) {
                if !self.method(m).is_abstract {
                    return Some(m);
                }
            }
            current = self.class(class).super_class;
        }
        None
    }

    /// Resolve a method reference to the declaration it names, looking at
    /// the superclasses and then the superinterfaces. The result might be
    /// abstract.
    pub fn resolve_method_ref(&self, method_ref: &MethodRef) -> Option<MethodId> {
        let mut current = Some(method_ref.class);
        while let Some(class) = current {
            if let Some(m) = self.declared_method(class, &method_ref.subsig) {
                return Some(m);
            }
            current = self.class(class).super_class;
        }

        let mut visited = HashSet::new();
        let mut queue: VecDeque<ClassId> = VecDeque::from([method_ref.class]);
        while let Some(class) = queue.pop_front() {
            if !visited.insert(class) {
                continue;
            }
            if self.class(class).is_interface {
                if let Some(m) = self.declared_method(class, &method_ref.subsig) {
                    return Some(m);
                }
            }
            queue.extend(self.class(class).super_class);
            queue.extend(self.class(class).interfaces.iter().copied());
        }
        None
    }

    /// Whether `sub` is `sup` or one of its (transitive) subtypes.
    pub fn is_subtype(&self, sub: ClassId, sup: ClassId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([sub]);
        while let Some(class) = queue.pop_front() {
            if class == sup {
                return true;
            }
            if !visited.insert(class) {
                continue;
            }
            queue.extend(self.class(class).super_class);
            queue.extend(self.class(class).interfaces.iter().copied());
        }
        false
    }

    pub fn parse_type(&self, name: &str) -> Result<Type, IrError> {
        let name = name.trim();
        if let Some(elem) = name.strip_suffix("[]") {
            return Ok(Type::Array(Box::new(self.parse_type(elem)?)));
        }
        Ok(match name {
            "boolean" => Type::Boolean,
            "byte" => Type::Byte,
            "short" => Type::Short,
            "char" => Type::Char,
            "int" => Type::Int,
            "long" => Type::Long,
            "float" => Type::Float,
            "double" => Type::Double,
            "void" => Type::Void,
            _ => Type::Class(
                self.find_class(name)
                    .ok_or_else(|| IrError::UnknownType(name.to_owned()))?,
            ),
        })
    }

    /// Parse a signature in the `<Class: RetType name(ParamType,...)>` format.
    pub fn parse_method_ref(&self, signature: &str) -> Result<MethodRef, IrError> {
        let malformed = || IrError::MalformedSignature(signature.to_owned());
        let inner = signature
            .trim()
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .ok_or_else(malformed)?;
        let (class_name, subsig) = inner.split_once(':').ok_or_else(malformed)?;
        let (ret, rest) = subsig.trim().split_once(' ').ok_or_else(malformed)?;
        let (name, params) = rest.split_once('(').ok_or_else(malformed)?;
        let params = params.strip_suffix(')').ok_or_else(malformed)?;

        let class = self
            .find_class(class_name.trim())
            .ok_or_else(|| IrError::UnknownClass(class_name.trim().to_owned()))?;
        let params = params
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| self.parse_type(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MethodRef {
            class,
            subsig: Subsignature {
                name: name.trim().to_owned(),
                params,
                ret: self.parse_type(ret)?,
            },
        })
    }

    /// Find the method declared with exactly the given signature.
    pub fn find_method(&self, signature: &str) -> Result<MethodId, IrError> {
        let method_ref = self.parse_method_ref(signature)?;
        self.declared_method(method_ref.class, &method_ref.subsig)
            .ok_or_else(|| IrError::UnknownMethod(signature.to_owned()))
    }
}
