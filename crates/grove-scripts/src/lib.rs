//! Grove script cache
//!
//! Compiles build scripts into a directory of class files plus a small
//! metadata record, and later turns that directory back into a loadable
//! script class:
//! - [`DefaultScriptCompilationHandler::compile_to_dir`] runs the compiler
//!   with the default imports, the name prefilter and the AST detectors
//!   installed, then persists the metadata record
//! - [`DefaultScriptCompilationHandler::load_from_dir`] reads the record and
//!   returns a [`ClassesDirCompiledScript`] that loads its class through the
//!   shared classloader cache on first use

#![warn(rust_2018_idioms)]

pub mod compiled;
pub mod detectors;
pub mod error;
pub mod handler;
pub mod imports;
pub mod metadata;
pub mod operation;
pub mod prefilter;
pub mod serialize;
pub mod source;

pub use compiled::{ClassesDirCompiledScript, CompiledScript};
pub use detectors::{EmptyScriptDetector, PackageStatementDetector};
pub use error::{ScriptError, ScriptResult};
pub use handler::{DefaultScriptCompilationHandler, ScriptCompilationHandler, SCRIPT_CODE_BASE};
pub use imports::{DefaultImportsReader, ImportsError, ImportsReader};
pub use metadata::{read_metadata, write_metadata, MetadataError, MetadataReader, ScriptFlags, METADATA_FILE_NAME};
pub use operation::{CompileOperation, FactoryBackedCompileOperation, Transformer};
pub use prefilter::{can_skip_lookup, ShortcutClassNodeResolver};
pub use serialize::{
    BooleanSerializer, Decoder, Encoder, ListSerializer, SerializeError, SerializeResult, Serializer,
    StreamDecoder, StreamEncoder, StringSerializer,
};
pub use source::{FileScriptSource, FileTextResource, ScriptSource, StringScriptSource, StringTextResource, TextResource};
