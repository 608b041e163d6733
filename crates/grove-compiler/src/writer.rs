//! Class visitors
//!
//! Generated class files are not encoded directly. They are replayed
//! through a [`ClassVisitor`] so that callers can decorate the output, for
//! example to stamp a different `SourceFile` attribute.

use grove_bytecode::{ClassFile, ConstantPool, Method};

/// Receives the parts of a class in order: header, source, constants,
/// methods, end. `to_byte_array` yields the encoded class.
pub trait ClassVisitor {
    fn visit(&mut self, name: &str, super_name: Option<&str>, flags: u32);

    fn visit_source(&mut self, source_file: Option<&str>);

    fn visit_constants(&mut self, constants: &ConstantPool);

    fn visit_method(&mut self, method: &Method);

    fn visit_end(&mut self) {}

    fn to_byte_array(self: Box<Self>) -> Vec<u8>;
}

/// Builds and encodes a [`ClassFile`] from visitor events
#[derive(Debug, Default)]
pub struct ClassWriter {
    class: Option<ClassFile>,
}

impl ClassWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn class_mut(&mut self) -> &mut ClassFile {
        self.class
            .get_or_insert_with(|| ClassFile::new(String::new(), None))
    }
}

impl ClassVisitor for ClassWriter {
    fn visit(&mut self, name: &str, super_name: Option<&str>, flags: u32) {
        let class = self.class_mut();
        class.name = name.to_string();
        class.super_name = super_name.map(str::to_string);
        class.flags = flags;
    }

    fn visit_source(&mut self, source_file: Option<&str>) {
        self.class_mut().source_file = source_file.map(str::to_string);
    }

    fn visit_constants(&mut self, constants: &ConstantPool) {
        self.class_mut().constants = constants.clone();
    }

    fn visit_method(&mut self, method: &Method) {
        self.class_mut().methods.push(method.clone());
    }

    fn to_byte_array(mut self: Box<Self>) -> Vec<u8> {
        self.class_mut().encode()
    }
}

/// Replay `class` into `visitor`
pub fn accept(class: &ClassFile, visitor: &mut dyn ClassVisitor) {
    visitor.visit(&class.name, class.super_name.as_deref(), class.flags);
    visitor.visit_source(class.source_file.as_deref());
    visitor.visit_constants(&class.constants);
    for method in &class.methods {
        visitor.visit_method(method);
    }
    visitor.visit_end();
}
