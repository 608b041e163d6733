//! Code generation from class nodes to class files

use grove_bytecode::class_file::flags;
use grove_bytecode::{BytecodeWriter, ClassFile, ConstantPool, Method, Opcode};
use grove_parser::ast::utils::declared_names;
use grove_parser::ast::*;
use rustc_hash::FxHashMap;

use crate::class_node::ClassNode;
use crate::error::{CompileError, CompileResult};

/// Generates one class file per class node
pub struct CodeGenerator {
    debug: bool,
}

impl CodeGenerator {
    /// With `debug`, method declaration lines are kept in the class file.
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn generate(&self, node: &ClassNode) -> CompileResult<ClassFile> {
        let mut file = ClassFile::new(node.name.clone(), node.super_name.clone());
        if node.is_script {
            file.flags |= flags::SCRIPT;
        }
        if self.debug {
            file.flags |= flags::HAS_DEBUG_INFO;
        }

        for method in &node.methods {
            let compiled = self.compile_method(&mut file.constants, method)?;
            file.methods.push(compiled);
        }
        Ok(file)
    }

    fn compile_method(&self, constants: &mut ConstantPool, method: &MethodNode) -> CompileResult<Method> {
        let mut builder = MethodBuilder::new(&method.name, constants);
        for param in &method.parameters {
            builder.add_local(&param.name)?;
        }
        let param_count = builder.local_count;
        for name in declared_names(&method.body) {
            builder.add_local(&name)?;
        }

        for stmt in &method.body {
            builder.compile_stmt(stmt)?;
        }
        // the verifier requires every method to end in a terminator
        builder.writer.emit_opcode(Opcode::ReturnNull);

        Ok(Method {
            name: method.name.clone(),
            param_count,
            local_count: builder.local_count,
            line: if self.debug { method.span.line } else { 0 },
            code: builder.writer.into_bytes(),
        })
    }
}

/// Helper for building the bytecode of one method
struct MethodBuilder<'c> {
    name: String,
    constants: &'c mut ConstantPool,
    writer: BytecodeWriter,
    locals: FxHashMap<String, u16>,
    local_count: u16,
}

impl<'c> MethodBuilder<'c> {
    fn new(name: &str, constants: &'c mut ConstantPool) -> Self {
        Self {
            name: name.to_string(),
            constants,
            writer: BytecodeWriter::new(),
            locals: FxHashMap::default(),
            local_count: 0,
        }
    }

    /// Allocate a local slot, returning the existing one for known names
    fn add_local(&mut self, name: &str) -> CompileResult<u16> {
        if let Some(&index) = self.locals.get(name) {
            return Ok(index);
        }
        if self.local_count == u16::MAX {
            return Err(CompileError::TooManyLocals {
                method: self.name.clone(),
            });
        }
        let index = self.local_count;
        self.local_count += 1;
        self.locals.insert(name.to_string(), index);
        Ok(index)
    }

    fn emit_store(&mut self, name: &str) {
        match self.locals.get(name) {
            Some(&slot) => self.writer.emit_store_local(slot),
            None => {
                let index = self.constants.add_string(name);
                self.writer.emit_indexed(Opcode::StoreVar, index);
            }
        }
    }

    fn compile_stmt(&mut self, stmt: &Statement) -> CompileResult<()> {
        match stmt {
            Statement::Expression(s) => {
                self.compile_expr(&s.expression)?;
                self.writer.emit_opcode(Opcode::Pop);
            }
            Statement::Declaration(s) => {
                match &s.initializer {
                    Some(init) => self.compile_expr(init)?,
                    None => self.writer.emit_opcode(Opcode::ConstNull),
                }
                self.emit_store(&s.name);
            }
            Statement::If(s) => {
                self.compile_expr(&s.condition)?;
                let else_jump = self.writer.emit_jump(Opcode::JmpIfFalse);
                self.compile_stmt(&s.then_branch)?;
                match &s.else_branch {
                    Some(else_branch) => {
                        let end_jump = self.writer.emit_jump(Opcode::Jmp);
                        self.writer.patch_jump(else_jump);
                        self.compile_stmt(else_branch)?;
                        self.writer.patch_jump(end_jump);
                    }
                    None => self.writer.patch_jump(else_jump),
                }
            }
            Statement::While(s) => {
                let top = self.writer.offset();
                self.compile_expr(&s.condition)?;
                let exit = self.writer.emit_jump(Opcode::JmpIfFalse);
                self.compile_stmt(&s.body)?;
                self.writer.emit_jump_to(Opcode::Jmp, top);
                self.writer.patch_jump(exit);
            }
            Statement::Return(s) => {
                match &s.value {
                    Some(value) => self.compile_expr(value)?,
                    None => self.writer.emit_opcode(Opcode::ConstNull),
                }
                self.writer.emit_opcode(Opcode::Return);
            }
            Statement::Block(s) => {
                for stmt in &s.statements {
                    self.compile_stmt(stmt)?;
                }
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expression) -> CompileResult<()> {
        match expr {
            Expression::Constant(c) => self.compile_literal(&c.value),
            Expression::Variable(v) => match self.locals.get(&v.name) {
                Some(&slot) => self.writer.emit_load_local(slot),
                None => {
                    let index = self.constants.add_string(&v.name);
                    self.writer.emit_indexed(Opcode::LoadVar, index);
                }
            },
            Expression::Class(c) => {
                let index = self.constants.add_string(&c.name);
                self.writer.emit_indexed(Opcode::ConstClass, index);
            }
            Expression::Property(p) => {
                self.compile_expr(&p.object)?;
                let index = self.constants.add_string(&p.property);
                self.writer.emit_indexed(Opcode::GetProperty, index);
            }
            Expression::MethodCall(call) => {
                let opcode = match &call.receiver {
                    Some(receiver) => {
                        self.compile_expr(receiver)?;
                        Opcode::InvokeVirtual
                    }
                    None => Opcode::InvokeMethod,
                };
                for arg in &call.arguments {
                    self.compile_expr(arg)?;
                }
                let argc = u16::try_from(call.arguments.len()).map_err(|_| {
                    CompileError::TooManyArguments {
                        method: call.method.clone(),
                    }
                })?;
                let name = self.constants.add_string(&call.method);
                self.writer.emit_invoke(opcode, name, argc);
            }
            Expression::Binary(b) => match b.operator {
                BinaryOperator::And | BinaryOperator::Or => self.compile_logical(b)?,
                op => {
                    self.compile_expr(&b.left)?;
                    self.compile_expr(&b.right)?;
                    self.writer.emit_opcode(binary_opcode(op));
                }
            },
            Expression::Unary(u) => {
                self.compile_expr(&u.operand)?;
                self.writer.emit_opcode(match u.operator {
                    UnaryOperator::Negate => Opcode::Neg,
                    UnaryOperator::Not => Opcode::Not,
                });
            }
            Expression::Assignment(a) => {
                self.compile_expr(&a.value)?;
                self.writer.emit_opcode(Opcode::Dup);
                self.emit_store(&a.target);
            }
            Expression::List(l) => {
                for element in &l.elements {
                    self.compile_expr(element)?;
                }
                let count = u16::try_from(l.elements.len()).map_err(|_| CompileError::TooManyArguments {
                    method: "list literal".to_string(),
                })?;
                self.writer.emit_new_list(count);
            }
        }
        Ok(())
    }

    fn compile_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Null => self.writer.emit_opcode(Opcode::ConstNull),
            Literal::Boolean(true) => self.writer.emit_opcode(Opcode::ConstTrue),
            Literal::Boolean(false) => self.writer.emit_opcode(Opcode::ConstFalse),
            Literal::Integer(i) => {
                let index = self.constants.add_integer(*i);
                self.writer.emit_indexed(Opcode::ConstInt, index);
            }
            Literal::Float(f) => {
                let index = self.constants.add_float(*f);
                self.writer.emit_indexed(Opcode::ConstFloat, index);
            }
            Literal::String(s) => {
                let index = self.constants.add_string(s);
                self.writer.emit_indexed(Opcode::ConstStr, index);
            }
        }
    }

    /// `&&` and `||` short-circuit and always produce a boolean
    fn compile_logical(&mut self, b: &BinaryExpression) -> CompileResult<()> {
        let is_and = b.operator == BinaryOperator::And;
        let short = if is_and { Opcode::JmpIfFalse } else { Opcode::JmpIfTrue };

        self.compile_expr(&b.left)?;
        let first = self.writer.emit_jump(short);
        self.compile_expr(&b.right)?;
        let second = self.writer.emit_jump(short);
        self.writer
            .emit_opcode(if is_and { Opcode::ConstTrue } else { Opcode::ConstFalse });
        let end = self.writer.emit_jump(Opcode::Jmp);
        self.writer.patch_jump(first);
        self.writer.patch_jump(second);
        self.writer
            .emit_opcode(if is_and { Opcode::ConstFalse } else { Opcode::ConstTrue });
        self.writer.patch_jump(end);
        Ok(())
    }
}

fn binary_opcode(op: BinaryOperator) -> Opcode {
    match op {
        BinaryOperator::Add => Opcode::Add,
        BinaryOperator::Subtract => Opcode::Sub,
        BinaryOperator::Multiply => Opcode::Mul,
        BinaryOperator::Divide => Opcode::Div,
        BinaryOperator::Modulo => Opcode::Mod,
        BinaryOperator::Equal => Opcode::Eq,
        BinaryOperator::NotEqual => Opcode::Ne,
        BinaryOperator::Less => Opcode::Lt,
        BinaryOperator::LessEqual => Opcode::Le,
        BinaryOperator::Greater => Opcode::Gt,
        BinaryOperator::GreaterEqual => Opcode::Ge,
        // short-circuit operators are compiled by compile_logical
        BinaryOperator::And | BinaryOperator::Or => Opcode::Nop,
    }
}
